//! Per-identity conversation state machine: menus, transfers, airtime, and
//! the lending flows layered on top of the shared loan ledger.

mod engine;
mod flows;
mod global;
mod input;

#[cfg(test)]
mod tests;

pub use engine::ConversationEngine;
pub use global::GlobalCommand;
pub use input::{Input, InputError};
