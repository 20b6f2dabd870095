use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::domain::{normalize_identity, Decline, Loan, LoanId, LoanStatus, Recommendation, Region, Role};
use super::underwriting::UnderwritingCalculator;
use crate::error::ErrorKind;

/// Shared loan book. Each mutation runs under the owning shard's write lock,
/// so events for one loan are serialized while unrelated loans proceed.
#[derive(Debug)]
pub struct LoanLedger {
    loans: DashMap<LoanId, Loan>,
    sequence: AtomicU64,
    calculator: UnderwritingCalculator,
}

impl Default for LoanLedger {
    fn default() -> Self {
        Self::new(UnderwritingCalculator::default())
    }
}

impl LoanLedger {
    pub fn new(calculator: UnderwritingCalculator) -> Self {
        Self {
            loans: DashMap::new(),
            sequence: AtomicU64::new(1),
            calculator,
        }
    }

    pub fn calculator(&self) -> &UnderwritingCalculator {
        &self.calculator
    }

    /// Opens a pending application under the next sequence number.
    pub fn create(
        &self,
        applicant_name: &str,
        applicant_id: &str,
        region: Region,
        amount: Decimal,
    ) -> Loan {
        let id = LoanId::from_sequence(self.sequence.fetch_add(1, Ordering::Relaxed));
        let mut loan = Loan::pending(id, applicant_name, applicant_id, region, amount);
        self.calculator.recompute(&mut loan);
        self.loans.insert(id, loan.clone());

        info!(loan_id = %id, region = region.label(), %amount, "loan application created");
        loan
    }

    pub fn get(&self, loan_id: LoanId) -> Option<Loan> {
        self.loans.get(&loan_id).map(|entry| entry.value().clone())
    }

    pub fn recommend(
        &self,
        loan_id: LoanId,
        recommender: &str,
        recommender_region: Region,
        reason: Option<&str>,
    ) -> Result<RecommendOutcome, LedgerError> {
        self.mutate(loan_id, |loan, calculator| {
            ensure_open(loan)?;
            if loan.region != recommender_region {
                return Err(LedgerError::unauthorized(loan_id, Denial::RegionMismatch));
            }
            if loan.has_recommendation_from(recommender) {
                return Ok(RecommendOutcome::AlreadyRecommended(loan.clone()));
            }

            loan.recommendations.push(Recommendation {
                recommender: recommender.trim().to_string(),
                reason: reason
                    .map(str::trim)
                    .filter(|reason| !reason.is_empty())
                    .map(str::to_string),
            });
            calculator.recompute(loan);
            info!(%loan_id, limit = %loan.approved_limit, "recommendation recorded");
            Ok(RecommendOutcome::Recorded(loan.clone()))
        })
    }

    /// Records a Mufundisi or Elder approval. Only the Mufundisi flag moves the
    /// loan to approved; elder approvals raise the tier.
    pub fn approve(
        &self,
        loan_id: LoanId,
        approver: &str,
        role: Role,
        approver_region: Region,
    ) -> Result<Loan, LedgerError> {
        self.mutate(loan_id, |loan, calculator| {
            ensure_open(loan)?;
            if loan.region != approver_region {
                return Err(LedgerError::unauthorized(loan_id, Denial::RegionMismatch));
            }

            match role {
                Role::Mufundisi => loan.mufundisi_approved = true,
                Role::Elder => {
                    loan.elder_approvals.insert(normalize_identity(approver));
                }
                Role::Member => {
                    return Err(LedgerError::unauthorized(loan_id, Denial::RoleNotPermitted))
                }
            }

            calculator.recompute(loan);
            info!(
                %loan_id,
                role = role.label(),
                status = loan.status.label(),
                limit = %loan.approved_limit,
                term = loan.term_months,
                "loan approval recorded"
            );
            Ok(loan.clone())
        })
    }

    /// Declines a loan. Declined is terminal, and loans with disbursements
    /// cannot be declined.
    pub fn decline(&self, loan_id: LoanId, approver: &str, reason: &str) -> Result<Loan, LedgerError> {
        self.mutate(loan_id, |loan, calculator| {
            ensure_open(loan)?;
            if loan.borrowed > Decimal::ZERO {
                return Err(LedgerError::LoanClosed { loan_id });
            }

            loan.decline = Some(Decline {
                declined_by: approver.trim().to_string(),
                reason: reason.trim().to_string(),
            });
            calculator.recompute(loan);
            info!(%loan_id, "loan declined");
            Ok(loan.clone())
        })
    }

    /// Draws down against an approved limit. On success the caller credits the
    /// requester's wallet with [`Disbursement::amount`].
    pub fn borrow(
        &self,
        loan_id: LoanId,
        requester: &str,
        amount: Decimal,
    ) -> Result<Disbursement, LedgerError> {
        self.mutate(loan_id, |loan, _| {
            match loan.status {
                LoanStatus::Approved => {}
                LoanStatus::Declined => return Err(LedgerError::LoanClosed { loan_id }),
                LoanStatus::Pending => {
                    return Err(LedgerError::unauthorized(loan_id, Denial::NotApproved))
                }
            }
            if !loan.applicant_matches(requester) {
                return Err(LedgerError::unauthorized(loan_id, Denial::NotApplicant));
            }

            let available = loan.remaining_credit();
            if amount <= Decimal::ZERO || amount > available {
                return Err(LedgerError::InsufficientCredit {
                    loan_id,
                    requested: amount,
                    available,
                });
            }

            loan.borrowed += amount;
            info!(%loan_id, %amount, borrowed = %loan.borrowed, "loan disbursed");
            Ok(Disbursement {
                loan: loan.clone(),
                amount,
            })
        })
    }

    /// Loans belonging to `applicant_name`, compared case-insensitively.
    pub fn view(&self, applicant_name: &str) -> Vec<Loan> {
        self.collect(|loan| loan.applicant_matches(applicant_name))
    }

    pub fn list_pending(&self, region: Region) -> Vec<Loan> {
        self.collect(|loan| loan.region == region && loan.status == LoanStatus::Pending)
    }

    pub fn list_by_region(&self, region: Region) -> Vec<Loan> {
        self.collect(|loan| loan.region == region)
    }

    /// Pending applications opened by the given identity.
    pub fn pending_for_applicant(&self, applicant_id: &str) -> usize {
        let applicant_id = normalize_identity(applicant_id);
        self.loans
            .iter()
            .filter(|entry| {
                let loan = entry.value();
                loan.status == LoanStatus::Pending
                    && normalize_identity(&loan.applicant_id) == applicant_id
            })
            .count()
    }

    pub fn len(&self) -> usize {
        self.loans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loans.is_empty()
    }

    fn collect<F>(&self, predicate: F) -> Vec<Loan>
    where
        F: Fn(&Loan) -> bool,
    {
        let mut loans: Vec<Loan> = self
            .loans
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        loans.sort_by_key(|loan| loan.id);
        loans
    }

    fn mutate<T, F>(&self, loan_id: LoanId, apply: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Loan, &UnderwritingCalculator) -> Result<T, LedgerError>,
    {
        let mut entry = self
            .loans
            .get_mut(&loan_id)
            .ok_or(LedgerError::NotFound { loan_id })?;
        let result = apply(entry.value_mut(), &self.calculator);
        if let Err(err) = &result {
            warn!(%loan_id, kind = err.kind().label(), %err, "loan event rejected");
        }
        result
    }
}

fn ensure_open(loan: &Loan) -> Result<(), LedgerError> {
    if loan.is_declined() {
        Err(LedgerError::LoanClosed { loan_id: loan.id })
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecommendOutcome {
    Recorded(Loan),
    AlreadyRecommended(Loan),
}

impl RecommendOutcome {
    pub fn loan(&self) -> &Loan {
        match self {
            Self::Recorded(loan) | Self::AlreadyRecommended(loan) => loan,
        }
    }
}

/// Successful draw-down; `amount` is owed to the requester's wallet.
#[derive(Debug, Clone, PartialEq)]
pub struct Disbursement {
    pub loan: Loan,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    RegionMismatch,
    RoleNotPermitted,
    NotApplicant,
    NotApproved,
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Denial::RegionMismatch => "region does not match the loan",
            Denial::RoleNotPermitted => "role may not approve loans",
            Denial::NotApplicant => "only the applicant may borrow",
            Denial::NotApproved => "loan is not approved",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("loan {loan_id} not found")]
    NotFound { loan_id: LoanId },
    #[error("not permitted on loan {loan_id}: {denial}")]
    Unauthorized { loan_id: LoanId, denial: Denial },
    #[error("loan {loan_id} has {available} available, requested {requested}")]
    InsufficientCredit {
        loan_id: LoanId,
        requested: Decimal,
        available: Decimal,
    },
    #[error("loan {loan_id} is closed")]
    LoanClosed { loan_id: LoanId },
}

impl LedgerError {
    fn unauthorized(loan_id: LoanId, denial: Denial) -> Self {
        Self::Unauthorized { loan_id, denial }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Unauthorized { .. } | Self::LoanClosed { .. } => ErrorKind::Authorization,
            Self::InsufficientCredit { .. } => ErrorKind::InsufficientResource,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn ledger_with_loan() -> (LoanLedger, LoanId) {
        let ledger = LoanLedger::default();
        let loan = ledger.create("Tendai Moyo", "tendai", Region::RegionA, dec!(300));
        (ledger, loan.id)
    }

    #[test]
    fn create_starts_pending_with_zero_limit() {
        let ledger = LoanLedger::default();
        let first = ledger.create("Tendai", "tendai", Region::RegionA, dec!(300));
        let second = ledger.create("Rudo", "rudo", Region::RegionB, dec!(150));

        assert_eq!(first.id.to_string(), "LN0001");
        assert_eq!(second.id.to_string(), "LN0002");
        assert_eq!(first.status, LoanStatus::Pending);
        assert_eq!(first.approved_limit, Decimal::ZERO);
        assert_eq!(first.term_months, 0);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn mufundisi_approval_is_idempotent() {
        let (ledger, id) = ledger_with_loan();
        let once = ledger
            .approve(id, "pastor", Role::Mufundisi, Region::RegionA)
            .expect("approves");
        let twice = ledger
            .approve(id, "pastor-2", Role::Mufundisi, Region::RegionA)
            .expect("approves again");
        assert_eq!(once.approved_limit, dec!(300));
        assert_eq!(twice.approved_limit, dec!(300));
        assert_eq!(twice.status, LoanStatus::Approved);
    }

    #[test]
    fn member_cannot_approve() {
        let (ledger, id) = ledger_with_loan();
        let err = ledger
            .approve(id, "member", Role::Member, Region::RegionA)
            .expect_err("members cannot approve");
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert!(!ledger.get(id).expect("loan exists").mufundisi_approved);
    }

    #[test]
    fn approver_from_other_region_is_rejected() {
        let (ledger, id) = ledger_with_loan();
        let err = ledger
            .approve(id, "pastor", Role::Mufundisi, Region::RegionB)
            .expect_err("region gated");
        assert!(matches!(
            err,
            LedgerError::Unauthorized {
                denial: Denial::RegionMismatch,
                ..
            }
        ));
        assert_eq!(ledger.get(id).expect("loan exists").status, LoanStatus::Pending);
    }

    #[test]
    fn duplicate_elder_counts_once() {
        let (ledger, id) = ledger_with_loan();
        ledger.approve(id, "Elder-1", Role::Elder, Region::RegionA).expect("elder");
        ledger.approve(id, "elder-1 ", Role::Elder, Region::RegionA).expect("elder again");
        let loan = ledger
            .approve(id, "pastor", Role::Mufundisi, Region::RegionA)
            .expect("mufundisi");
        assert_eq!(loan.elder_approvals.len(), 1);
        assert_eq!(loan.approved_limit, dec!(500));
    }

    #[test]
    fn unknown_loan_is_not_found() {
        let ledger = LoanLedger::default();
        let missing = LoanId::from_sequence(99);
        let err = ledger
            .recommend(missing, "rudo", Region::RegionA, None)
            .expect_err("missing loan");
        assert_eq!(err, LedgerError::NotFound { loan_id: missing });
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn repeated_recommendation_is_reported_without_duplicate() {
        let (ledger, id) = ledger_with_loan();
        let first = ledger
            .recommend(id, "Rudo", Region::RegionA, Some("reliable"))
            .expect("recorded");
        let second = ledger
            .recommend(id, " rudo", Region::RegionA, None)
            .expect("reported");
        assert!(matches!(first, RecommendOutcome::Recorded(_)));
        assert!(matches!(second, RecommendOutcome::AlreadyRecommended(_)));
        assert_eq!(second.loan().recommendations.len(), 1);
        assert_eq!(
            second.loan().recommendations[0].reason.as_deref(),
            Some("reliable")
        );
    }

    #[test]
    fn declined_is_terminal() {
        let (ledger, id) = ledger_with_loan();
        let declined = ledger.decline(id, "elder", "incomplete").expect("declines");
        assert_eq!(declined.status, LoanStatus::Declined);
        assert_eq!(declined.decline_reason(), Some("incomplete"));

        let err = ledger
            .approve(id, "pastor", Role::Mufundisi, Region::RegionA)
            .expect_err("declined loans stay declined");
        assert_eq!(err, LedgerError::LoanClosed { loan_id: id });
        assert!(ledger.decline(id, "elder", "again").is_err());
        assert!(ledger.recommend(id, "rudo", Region::RegionA, None).is_err());
        let loan = ledger.get(id).expect("loan exists");
        assert_eq!(loan.status, LoanStatus::Declined);
        assert!(!loan.mufundisi_approved);
    }

    #[test]
    fn disbursed_loans_cannot_be_declined() {
        let (ledger, id) = ledger_with_loan();
        ledger.approve(id, "pastor", Role::Mufundisi, Region::RegionA).expect("approves");
        ledger.borrow(id, "Tendai Moyo", dec!(50)).expect("borrows");
        assert_eq!(
            ledger.decline(id, "elder", "late"),
            Err(LedgerError::LoanClosed { loan_id: id })
        );
    }

    #[test]
    fn borrow_requires_approval_and_applicant() {
        let (ledger, id) = ledger_with_loan();
        assert!(matches!(
            ledger.borrow(id, "Tendai Moyo", dec!(10)),
            Err(LedgerError::Unauthorized {
                denial: Denial::NotApproved,
                ..
            })
        ));

        ledger.approve(id, "pastor", Role::Mufundisi, Region::RegionA).expect("approves");
        assert!(matches!(
            ledger.borrow(id, "Rudo", dec!(10)),
            Err(LedgerError::Unauthorized {
                denial: Denial::NotApplicant,
                ..
            })
        ));
        assert_eq!(ledger.get(id).expect("loan").borrowed, Decimal::ZERO);
    }

    #[test]
    fn borrow_rejects_non_positive_and_excess_amounts() {
        let (ledger, id) = ledger_with_loan();
        ledger.approve(id, "pastor", Role::Mufundisi, Region::RegionA).expect("approves");

        for amount in [dec!(0), dec!(-5), dec!(300.01)] {
            let err = ledger
                .borrow(id, "tendai moyo", amount)
                .expect_err("rejected amount");
            assert_eq!(err.kind(), ErrorKind::InsufficientResource);
        }

        let disbursement = ledger.borrow(id, "tendai moyo", dec!(300)).expect("full draw");
        assert_eq!(disbursement.amount, dec!(300));
        assert_eq!(disbursement.loan.remaining_credit(), Decimal::ZERO);
    }

    #[test]
    fn listings_filter_and_order_by_id() {
        let ledger = LoanLedger::default();
        let a1 = ledger.create("Tendai", "tendai", Region::RegionA, dec!(100));
        let b1 = ledger.create("Rudo", "rudo", Region::RegionB, dec!(100));
        let a2 = ledger.create("tendai", "tendai", Region::RegionA, dec!(200));
        ledger.approve(a2.id, "pastor", Role::Mufundisi, Region::RegionA).expect("approves");

        let ids = |loans: Vec<Loan>| loans.into_iter().map(|loan| loan.id).collect::<Vec<_>>();
        assert_eq!(ids(ledger.view("TENDAI")), vec![a1.id, a2.id]);
        assert_eq!(ids(ledger.list_by_region(Region::RegionA)), vec![a1.id, a2.id]);
        assert_eq!(ids(ledger.list_pending(Region::RegionA)), vec![a1.id]);
        assert_eq!(ids(ledger.list_pending(Region::RegionB)), vec![b1.id]);
        assert_eq!(ledger.pending_for_applicant("tendai"), 1);
    }

    #[test]
    fn concurrent_creates_allocate_distinct_ids() {
        let ledger = Arc::new(LoanLedger::default());
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || {
                    (0..50)
                        .map(|n| {
                            ledger
                                .create(&format!("member-{worker}-{n}"), "id", Region::RegionA, dec!(10))
                                .id
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let ids: HashSet<LoanId> = handles
            .into_iter()
            .flat_map(|handle| handle.join().expect("worker finished"))
            .collect();
        assert_eq!(ids.len(), 400);
        assert_eq!(ledger.len(), 400);
    }

    #[test]
    fn concurrent_approvals_and_recommendations_converge() {
        let (ledger, id) = ledger_with_loan();
        let ledger = Arc::new(ledger);
        let handles: Vec<_> = (0..6)
            .map(|n| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || {
                    if n == 0 {
                        ledger.approve(id, "pastor", Role::Mufundisi, Region::RegionA).map(|_| ())
                    } else if n % 2 == 0 {
                        ledger.approve(id, &format!("elder-{n}"), Role::Elder, Region::RegionA).map(|_| ())
                    } else {
                        ledger.recommend(id, &format!("member-{n}"), Region::RegionA, None).map(|_| ())
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker finished").expect("event accepted");
        }

        let loan = ledger.get(id).expect("loan exists");
        assert_eq!(loan.elder_approvals.len(), 2);
        assert_eq!(loan.recommendations.len(), 3);
        assert_eq!(loan.approved_limit, dec!(1000));
        assert_eq!(loan.term_months, 9);
        assert_eq!(loan.status, LoanStatus::Approved);
    }
}
