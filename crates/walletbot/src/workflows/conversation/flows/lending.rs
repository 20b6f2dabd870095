use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::{money, Outcome, Turn};
use crate::i18n::Localizer;
use crate::workflows::conversation::input::{parse_amount, parse_index, Input};
use crate::workflows::lending::domain::normalize_identity;
use crate::workflows::lending::{Denial, LedgerError, Loan, LoanId, LoanStatus, RecommendOutcome};
use crate::workflows::sessions::{ListKind, SelectionList, Stage, TransactionKind};

impl<L: Localizer> Turn<'_, L> {
    pub(crate) fn loan_menu(&mut self, input: &Input<'_>) -> Outcome {
        match input.choice() {
            Some(1) => {
                if let Some(refusal) = self.pending_cap_refusal() {
                    return Outcome::Reply(refusal);
                }
                self.session.advance(Stage::LoanAmount);
                self.reply("loan.ask_amount")
            }
            Some(2) => self.show_my_loans(),
            Some(3) => self.show_recommend_list(),
            Some(4) if self.session.role.can_approve() => self.show_review_list(),
            Some(4) => {
                let refusal = self.text("loan.review_forbidden");
                Outcome::Reply(format!("{refusal}\n\n{}", self.loan_menu_text()))
            }
            Some(0) => self.show_main_menu(),
            _ => {
                let invalid = self.text("loan.menu_invalid");
                Outcome::Reply(format!("{invalid}\n\n{}", self.loan_menu_text()))
            }
        }
    }

    pub(crate) fn loan_amount(&mut self, input: &Input<'_>) -> Outcome {
        let amount = match parse_amount(input.raw()) {
            Ok(amount) => amount,
            Err(err) => {
                debug!(kind = err.kind().label(), "loan amount rejected");
                return self.reply("loan.invalid_amount");
            }
        };
        if let Some(refusal) = self.pending_cap_refusal() {
            return self.finish(refusal);
        }

        let loan = self.ledger.create(
            &self.session.name,
            &self.session.identity,
            self.session.region,
            amount,
        );
        let body = self.text_with(
            "loan.created",
            &[
                ("loan_id", loan.id.to_string()),
                ("amount", money(loan.requested_amount)),
                ("region", loan.region.label().to_string()),
            ],
        );
        self.finish(body)
    }

    pub(crate) fn my_loans(&mut self, input: &Input<'_>) -> Outcome {
        let Some(loan) = self.select(ListKind::MyLoans, input) else {
            return self.selection_miss(input);
        };

        if loan.status == LoanStatus::Approved && loan.remaining_credit() > Decimal::ZERO {
            self.session.advance(Stage::BorrowAmount(loan.id));
            let summary = self.loan_summary(&loan);
            let prompt = self.text_with(
                "loan.borrow_prompt",
                &[("available", money(loan.remaining_credit()))],
            );
            return Outcome::Reply(format!("{summary}\n\n{prompt}"));
        }

        let body = self.loan_summary(&loan);
        self.finish(body)
    }

    pub(crate) fn borrow_amount(&mut self, loan_id: LoanId, input: &Input<'_>) -> Outcome {
        if input.choice() == Some(0) {
            return self.show_loan_menu();
        }
        let amount = match parse_amount(input.raw()) {
            Ok(amount) => amount,
            Err(err) => {
                debug!(kind = err.kind().label(), "borrow amount rejected");
                return self.reply("loan.invalid_amount");
            }
        };

        match self.ledger.borrow(loan_id, &self.session.name, amount) {
            Ok(disbursement) => {
                self.session.credit(disbursement.amount);
                self.session.record(
                    TransactionKind::LoanDisbursement,
                    disbursement.amount,
                    loan_id.to_string(),
                );
                let body = self.text_with(
                    "loan.disbursed",
                    &[
                        ("amount", money(disbursement.amount)),
                        ("loan_id", loan_id.to_string()),
                        ("balance", money(self.session.balance())),
                        ("available", money(disbursement.loan.remaining_credit())),
                    ],
                );
                self.finish(body)
            }
            Err(err @ LedgerError::InsufficientCredit { .. }) => {
                Outcome::Reply(self.ledger_refusal(&err))
            }
            Err(err) => {
                let body = self.ledger_refusal(&err);
                self.finish(body)
            }
        }
    }

    pub(crate) fn recommend_list(&mut self, input: &Input<'_>) -> Outcome {
        let Some(loan) = self.select(ListKind::Recommend, input) else {
            return self.selection_miss(input);
        };

        self.session.advance(Stage::RecommendConfirm(loan.id));
        let summary = self.loan_summary(&loan);
        let prompt = self.text("recommend.confirm");
        Outcome::Reply(format!("{summary}\n\n{prompt}"))
    }

    pub(crate) fn recommend_confirm(&mut self, loan_id: LoanId, input: &Input<'_>) -> Outcome {
        if input.is_affirmative() {
            self.session.advance(Stage::RecommendReason(loan_id));
            return self.reply("recommend.ask_reason");
        }
        if input.is_negative() {
            let body = self.text("recommend.cancelled");
            return self.finish(body);
        }
        self.reply("recommend.yes_no")
    }

    pub(crate) fn recommend_reason(&mut self, loan_id: LoanId, input: &Input<'_>) -> Outcome {
        let reason = match input.folded() {
            "" | "skip" | "-" => None,
            _ => Some(input.raw()),
        };

        let body = match self.ledger.recommend(
            loan_id,
            &self.session.identity,
            self.session.region,
            reason,
        ) {
            Ok(RecommendOutcome::Recorded(loan)) => self.text_with(
                "recommend.recorded",
                &[
                    ("loan_id", loan.id.to_string()),
                    ("name", loan.applicant_name.clone()),
                ],
            ),
            Ok(RecommendOutcome::AlreadyRecommended(loan)) => {
                self.text_with("recommend.duplicate", &[("loan_id", loan.id.to_string())])
            }
            Err(err) => self.ledger_refusal(&err),
        };
        self.finish(body)
    }

    pub(crate) fn review_list(&mut self, input: &Input<'_>) -> Outcome {
        let Some(loan) = self.select(ListKind::Review, input) else {
            return self.selection_miss(input);
        };

        self.session.advance(Stage::ApproverAction(loan.id));
        let summary = self.loan_summary(&loan);
        let prompt = self.text("review.action");
        Outcome::Reply(format!("{summary}\n\n{prompt}"))
    }

    pub(crate) fn approver_action(&mut self, loan_id: LoanId, input: &Input<'_>) -> Outcome {
        match input.choice() {
            Some(1) => {
                let body = match self.ledger.approve(
                    loan_id,
                    &self.session.identity,
                    self.session.role,
                    self.session.region,
                ) {
                    Ok(loan) => self.text_with(
                        "review.approved",
                        &[
                            ("loan_id", loan.id.to_string()),
                            ("status", self.status_label(loan.status)),
                            ("limit", money(loan.approved_limit)),
                            ("term", loan.term_months.to_string()),
                        ],
                    ),
                    Err(err) => self.ledger_refusal(&err),
                };
                self.finish(body)
            }
            Some(2) => match self.decline_refusal(loan_id) {
                Some(refusal) => self.finish(refusal),
                None => {
                    self.session.advance(Stage::DeclineReason(loan_id));
                    self.reply("review.ask_reason")
                }
            },
            Some(0) => self.show_loan_menu(),
            _ => self.reply("review.invalid"),
        }
    }

    pub(crate) fn decline_reason(&mut self, loan_id: LoanId, input: &Input<'_>) -> Outcome {
        if input.is_empty() {
            return self.reply("review.ask_reason");
        }
        if let Some(refusal) = self.decline_refusal(loan_id) {
            return self.finish(refusal);
        }

        let body = match self
            .ledger
            .decline(loan_id, &self.session.identity, input.raw())
        {
            Ok(loan) => self.text_with("review.declined", &[("loan_id", loan.id.to_string())]),
            Err(err) => self.ledger_refusal(&err),
        };
        self.finish(body)
    }

    fn show_my_loans(&mut self) -> Outcome {
        let loans = self.ledger.view(&self.session.name);
        self.show_list(
            Stage::MyLoans,
            ListKind::MyLoans,
            loans,
            "loan.list_mine",
            "loan.none_mine",
        )
    }

    fn show_recommend_list(&mut self) -> Outcome {
        let identity = normalize_identity(&self.session.identity);
        let loans = self
            .ledger
            .list_by_region(self.session.region)
            .into_iter()
            .filter(|loan| {
                !loan.is_declined() && normalize_identity(&loan.applicant_id) != identity
            })
            .collect();
        self.show_list(
            Stage::RecommendList,
            ListKind::Recommend,
            loans,
            "recommend.list",
            "recommend.none",
        )
    }

    fn show_review_list(&mut self) -> Outcome {
        let identity = normalize_identity(&self.session.identity);
        let loans = self
            .ledger
            .list_pending(self.session.region)
            .into_iter()
            .filter(|loan| normalize_identity(&loan.applicant_id) != identity)
            .collect();
        self.show_list(Stage::ReviewList, ListKind::Review, loans, "review.list", "review.none")
    }

    /// Renders a fresh numbered list and binds it to `stage`. Indexes from an
    /// earlier rendering stop resolving once this one replaces it.
    fn show_list(
        &mut self,
        stage: Stage,
        kind: ListKind,
        loans: Vec<Loan>,
        heading_key: &str,
        empty_key: &str,
    ) -> Outcome {
        if loans.is_empty() {
            let region = self.session.region.label().to_string();
            let empty = self.text_with(empty_key, &[("region", region)]);
            self.session.advance(Stage::LoanMenu);
            return Outcome::Reply(format!("{empty}\n\n{}", self.loan_menu_text()));
        }

        let entries: Vec<String> = loans
            .iter()
            .enumerate()
            .map(|(position, loan)| {
                format!(
                    "{}. {} · {} · {} ({})",
                    position + 1,
                    loan.id,
                    loan.applicant_name,
                    money(loan.requested_amount),
                    self.status_label(loan.status)
                )
            })
            .collect();

        self.session.advance(stage);
        self.session.present_selection(SelectionList::new(
            kind,
            loans.iter().map(|loan| loan.id).collect(),
        ));
        Outcome::Reply(self.text_with(
            heading_key,
            &[
                ("region", self.session.region.label().to_string()),
                ("entries", entries.join("\n")),
            ],
        ))
    }

    /// Resolves a list index against the current rendering only.
    fn select(&self, kind: ListKind, input: &Input<'_>) -> Option<Loan> {
        let index = parse_index(input).ok()?;
        let loan_id = self.session.resolve_selection(kind, index)?;
        self.ledger.get(loan_id)
    }

    fn selection_miss(&mut self, input: &Input<'_>) -> Outcome {
        if input.choice() == Some(0) {
            return self.show_loan_menu();
        }
        debug!(stage = self.session.stage().label(), "selection did not resolve");
        self.reply("list.not_found")
    }

    fn pending_cap_refusal(&self) -> Option<String> {
        let limit = self.config.max_pending_loans;
        if self.ledger.pending_for_applicant(&self.session.identity) < limit {
            return None;
        }
        warn!(identity = %self.session.identity, limit, "pending loan cap reached");
        Some(self.text_with("loan.too_many_pending", &[("limit", limit.to_string())]))
    }

    /// Declines need an approver role and a matching region. The ledger
    /// checks neither, so they are checked here before and at submission.
    fn decline_refusal(&self, loan_id: LoanId) -> Option<String> {
        let denial = if !self.session.role.can_approve() {
            Denial::RoleNotPermitted
        } else if self
            .ledger
            .get(loan_id)
            .is_some_and(|loan| loan.region != self.session.region)
        {
            Denial::RegionMismatch
        } else {
            return None;
        };
        warn!(%loan_id, ?denial, "decline refused");
        Some(self.ledger_refusal(&LedgerError::Unauthorized { loan_id, denial }))
    }

    fn loan_summary(&self, loan: &Loan) -> String {
        let mut summary = self.text_with(
            "loan.summary",
            &[
                ("loan_id", loan.id.to_string()),
                ("name", loan.applicant_name.clone()),
                ("region", loan.region.label().to_string()),
                ("status", self.status_label(loan.status)),
                ("requested", money(loan.requested_amount)),
                ("limit", money(loan.approved_limit)),
                ("term", loan.term_months.to_string()),
                ("borrowed", money(loan.borrowed)),
                ("recommendations", loan.recommendations.len().to_string()),
                ("elders", loan.elder_approvals.len().to_string()),
            ],
        );
        if let Some(reason) = loan.decline_reason() {
            summary.push('\n');
            let reason = self.text_with("loan.decline_reason", &[("reason", reason.to_string())]);
            summary.push_str(&reason);
        }
        summary
    }

    fn status_label(&self, status: LoanStatus) -> String {
        self.text(&format!("status.{}", status.label()))
    }

    fn ledger_refusal(&self, err: &LedgerError) -> String {
        let loan_id = match err {
            LedgerError::NotFound { loan_id }
            | LedgerError::Unauthorized { loan_id, .. }
            | LedgerError::InsufficientCredit { loan_id, .. }
            | LedgerError::LoanClosed { loan_id } => loan_id.to_string(),
        };
        match err {
            LedgerError::NotFound { .. } => {
                self.text_with("loan.not_found", &[("loan_id", loan_id)])
            }
            LedgerError::Unauthorized { denial, .. } => {
                let key = match denial {
                    Denial::RegionMismatch => "loan.wrong_region",
                    Denial::RoleNotPermitted => "loan.role_forbidden",
                    Denial::NotApplicant => "loan.not_applicant",
                    Denial::NotApproved => "loan.not_approved",
                };
                self.text_with(key, &[("loan_id", loan_id)])
            }
            LedgerError::InsufficientCredit { available, .. } => self.text_with(
                "loan.borrow_exceeds",
                &[("loan_id", loan_id), ("available", money(*available))],
            ),
            LedgerError::LoanClosed { .. } => {
                self.text_with("loan.closed", &[("loan_id", loan_id)])
            }
        }
    }
}
