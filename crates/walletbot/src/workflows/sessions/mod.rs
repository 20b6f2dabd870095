//! Per-identity conversation state and the store that serializes access to it.

mod domain;
mod store;

pub use domain::{
    ListKind, SelectionList, Session, SessionDefaults, Stage, TransactionKind, TransactionRecord,
    WalletError,
};
pub use store::{SessionHandle, SessionSlot, SessionStore};
