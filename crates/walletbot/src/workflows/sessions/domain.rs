use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::WalletConfig;
use crate::error::ErrorKind;
use crate::i18n::Language;
use crate::workflows::lending::{LoanId, Region, Role};

/// Point in an identity's conversation. Loan-scoped stages carry the loan
/// they act on, so a reply can never address a different loan than the one
/// that was presented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Stage {
    #[default]
    AskPin,
    VerifyPin,
    AskName,
    MainMenu,
    SendTo,
    SendAmount,
    ConfirmSend,
    Airtime,
    Support,
    PostAction,
    LoanMenu,
    LoanAmount,
    MyLoans,
    BorrowAmount(LoanId),
    RecommendList,
    RecommendConfirm(LoanId),
    RecommendReason(LoanId),
    ReviewList,
    ApproverAction(LoanId),
    DeclineReason(LoanId),
}

impl Stage {
    pub const fn label(self) -> &'static str {
        match self {
            Self::AskPin => "ask_pin",
            Self::VerifyPin => "verify_pin",
            Self::AskName => "ask_name",
            Self::MainMenu => "main_menu",
            Self::SendTo => "send_to",
            Self::SendAmount => "send_amount",
            Self::ConfirmSend => "confirm_send",
            Self::Airtime => "airtime",
            Self::Support => "support",
            Self::PostAction => "post_action",
            Self::LoanMenu => "loan_menu",
            Self::LoanAmount => "loan_amount",
            Self::MyLoans => "my_loans",
            Self::BorrowAmount(_) => "borrow_amount",
            Self::RecommendList => "recommend_list",
            Self::RecommendConfirm(_) => "recommend_confirm",
            Self::RecommendReason(_) => "recommend_reason",
            Self::ReviewList => "review_list",
            Self::ApproverAction(_) => "approver_action",
            Self::DeclineReason(_) => "decline_reason",
        }
    }

    pub const fn loan_id(self) -> Option<LoanId> {
        match self {
            Self::BorrowAmount(id)
            | Self::RecommendConfirm(id)
            | Self::RecommendReason(id)
            | Self::ApproverAction(id)
            | Self::DeclineReason(id) => Some(id),
            _ => None,
        }
    }
}

/// Which list menu produced a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    MyLoans,
    Recommend,
    Review,
}

/// Numbered menu rendering. Indexes are 1-based, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionList {
    kind: ListKind,
    entries: Vec<LoanId>,
}

impl SelectionList {
    pub fn new(kind: ListKind, entries: Vec<LoanId>) -> Self {
        Self { kind, entries }
    }

    pub fn kind(&self) -> ListKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn resolve(&self, kind: ListKind, index: usize) -> Option<LoanId> {
        if kind != self.kind || index == 0 {
            return None;
        }
        self.entries.get(index - 1).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Sent,
    Airtime,
    LoanDisbursement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRecord {
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub detail: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    #[error("balance {balance} does not cover {requested}")]
    InsufficientFunds { balance: Decimal, requested: Decimal },
}

impl WalletError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientResource,
        }
    }
}

/// Values applied to every newly created session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDefaults {
    pub seed_balance: Decimal,
    pub language: Language,
    pub history_limit: usize,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self::from(&WalletConfig::default())
    }
}

impl From<&WalletConfig> for SessionDefaults {
    fn from(config: &WalletConfig) -> Self {
        Self {
            seed_balance: config.seed_balance,
            language: config.default_language,
            history_limit: config.history_limit,
        }
    }
}

/// Per-identity conversation state.
#[derive(Debug, Clone)]
pub struct Session {
    pub identity: String,
    pub name: String,
    pub pin: Option<String>,
    pub role: Role,
    pub region: Region,
    pub language: Language,
    pub pending_name: Option<String>,
    pub pending_amount: Option<Decimal>,
    stage: Stage,
    balance: Decimal,
    transactions: VecDeque<TransactionRecord>,
    history_limit: usize,
    selection: Option<SelectionList>,
    last_seen: DateTime<Utc>,
    retired: bool,
}

impl Session {
    pub fn new(identity: &str, defaults: &SessionDefaults, now: DateTime<Utc>) -> Self {
        Self {
            identity: identity.to_string(),
            name: String::new(),
            pin: None,
            role: Role::default(),
            region: Region::default(),
            language: defaults.language,
            pending_name: None,
            pending_amount: None,
            stage: Stage::default(),
            balance: defaults.seed_balance,
            transactions: VecDeque::new(),
            history_limit: defaults.history_limit,
            selection: None,
            last_seen: now,
            retired: false,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Moves to `next`. Any selection list belongs to the stage that rendered
    /// it and is dropped when the stage changes.
    pub fn advance(&mut self, next: Stage) {
        if next != self.stage {
            self.selection = None;
        }
        self.stage = next;
    }

    pub fn present_selection(&mut self, list: SelectionList) {
        self.selection = Some(list);
    }

    pub fn resolve_selection(&self, kind: ListKind, index: usize) -> Option<LoanId> {
        self.selection
            .as_ref()
            .and_then(|list| list.resolve(kind, index))
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn debit(&mut self, amount: Decimal) -> Result<(), WalletError> {
        if amount > self.balance {
            return Err(WalletError::InsufficientFunds {
                balance: self.balance,
                requested: amount,
            });
        }
        self.balance -= amount;
        Ok(())
    }

    pub fn credit(&mut self, amount: Decimal) {
        self.balance += amount;
    }

    pub fn record(&mut self, kind: TransactionKind, amount: Decimal, detail: impl Into<String>) {
        self.transactions.push_front(TransactionRecord {
            kind,
            amount,
            detail: detail.into(),
            at: Utc::now(),
        });
        self.transactions.truncate(self.history_limit);
    }

    /// Most recent first.
    pub fn transactions(&self) -> impl Iterator<Item = &TransactionRecord> {
        self.transactions.iter()
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_seen = now;
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.last_seen > ttl
    }

    pub fn retire(&mut self) {
        self.retired = true;
    }

    pub fn is_retired(&self) -> bool {
        self.retired
    }
}
