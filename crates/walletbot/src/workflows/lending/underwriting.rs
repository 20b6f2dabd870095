use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::Serialize;

use super::domain::{normalize_identity, Loan, LoanStatus};

/// Credit tier unlocked by a given level of elder support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CreditTier {
    pub base_limit: Decimal,
    pub term_months: u8,
}

/// Underwriting rubric. The default is the community lending policy: 300/6,
/// 500/6, and 800/9 by elder support, 100 per recommendation for at most two
/// recommenders, and a hard ceiling of 1000.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnderwritingPolicy {
    pub mufundisi_only: CreditTier,
    pub one_elder: CreditTier,
    pub two_or_more_elders: CreditTier,
    pub recommendation_bonus: Decimal,
    pub max_bonus_recommendations: usize,
    pub limit_cap: Decimal,
}

impl Default for UnderwritingPolicy {
    fn default() -> Self {
        Self {
            mufundisi_only: CreditTier {
                base_limit: Decimal::from(300),
                term_months: 6,
            },
            one_elder: CreditTier {
                base_limit: Decimal::from(500),
                term_months: 6,
            },
            two_or_more_elders: CreditTier {
                base_limit: Decimal::from(800),
                term_months: 9,
            },
            recommendation_bonus: Decimal::from(100),
            max_bonus_recommendations: 2,
            limit_cap: Decimal::from(1000),
        }
    }
}

/// Derived fields for a loan at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Assessment {
    pub status: LoanStatus,
    pub approved_limit: Decimal,
    pub term_months: u8,
}

/// Stateless calculator that derives limit, term, and status from loan facts.
#[derive(Debug, Clone, Default)]
pub struct UnderwritingCalculator {
    policy: UnderwritingPolicy,
}

impl UnderwritingCalculator {
    pub fn new(policy: UnderwritingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &UnderwritingPolicy {
        &self.policy
    }

    pub fn assess(&self, loan: &Loan) -> Assessment {
        let tier = if loan.mufundisi_approved {
            Some(self.tier_for(loan.elder_approvals.len()))
        } else {
            None
        };

        let (base_limit, term_months) = tier
            .map(|tier| (tier.base_limit, tier.term_months))
            .unwrap_or((Decimal::ZERO, 0));

        let bonus_count = distinct_recommenders(loan).min(self.policy.max_bonus_recommendations);
        let bonus = self.policy.recommendation_bonus * Decimal::from(bonus_count as u64);
        let approved_limit = (base_limit + bonus).min(self.policy.limit_cap);

        let status = if loan.is_declined() {
            LoanStatus::Declined
        } else if loan.mufundisi_approved {
            LoanStatus::Approved
        } else {
            LoanStatus::Pending
        };

        Assessment {
            status,
            approved_limit,
            term_months,
        }
    }

    /// Overwrites the derived fields from the loan's current facts.
    pub fn recompute(&self, loan: &mut Loan) {
        let assessment = self.assess(loan);
        loan.status = assessment.status;
        loan.approved_limit = assessment.approved_limit;
        loan.term_months = assessment.term_months;
    }

    fn tier_for(&self, elders: usize) -> CreditTier {
        match elders {
            0 => self.policy.mufundisi_only,
            1 => self.policy.one_elder,
            _ => self.policy.two_or_more_elders,
        }
    }
}

/// Unique, non-empty recommenders after trimming and case folding.
pub fn distinct_recommenders(loan: &Loan) -> usize {
    loan.recommendations
        .iter()
        .map(|recommendation| normalize_identity(&recommendation.recommender))
        .filter(|identity| !identity.is_empty())
        .collect::<HashSet<_>>()
        .len()
}
