//! Community lending: loan aggregates, the shared ledger, and the
//! underwriting rubric that derives limits and terms from approvals.

pub mod domain;
mod ledger;
pub mod underwriting;

pub use domain::{
    Decline, InvalidLoanId, Loan, LoanId, LoanStatus, LoanStatusView, Recommendation, Region, Role,
};
pub use ledger::{Denial, Disbursement, LedgerError, LoanLedger, RecommendOutcome};
pub use underwriting::{Assessment, CreditTier, UnderwritingCalculator, UnderwritingPolicy};
