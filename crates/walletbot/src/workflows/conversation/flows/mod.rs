//! Stage handlers, grouped by flow. Each handler validates one input against
//! the current stage, applies its effects, and picks the next stage.

mod lending;
mod menus;
mod onboarding;
mod wallet;

use rust_decimal::Decimal;

use crate::config::WalletConfig;
use crate::i18n::Localizer;
use crate::workflows::lending::LoanLedger;
use crate::workflows::sessions::{Session, Stage};

/// What the engine does with the session after a handler ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outcome {
    Reply(String),
    /// The user left; the session is removed.
    Exit(String),
    /// The session can no longer be resolved and is discarded.
    Expired(String),
}

/// Everything one handler may touch while the session lock is held.
pub(crate) struct Turn<'a, L> {
    pub session: &'a mut Session,
    pub ledger: &'a LoanLedger,
    pub localizer: &'a L,
    pub config: &'a WalletConfig,
}

impl<L: Localizer> Turn<'_, L> {
    pub(crate) fn text(&self, key: &str) -> String {
        self.text_with(key, &[])
    }

    pub(crate) fn text_with(&self, key: &str, args: &[(&str, String)]) -> String {
        self.localizer.text(self.session.language, key, args)
    }

    pub(crate) fn reply(&self, key: &str) -> Outcome {
        Outcome::Reply(self.text(key))
    }

    pub(crate) fn expired(&self) -> Outcome {
        Outcome::Expired(self.text("session.expired"))
    }

    /// Ends a completed action and offers the main menu or exit.
    pub(crate) fn finish(&mut self, body: String) -> Outcome {
        self.session.advance(Stage::PostAction);
        Outcome::Reply(format!("{body}\n\n{}", self.text("post.prompt")))
    }
}

pub(crate) fn money(amount: Decimal) -> String {
    format!("${:.2}", amount.round_dp(2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn money_renders_two_decimals() {
        assert_eq!(money(dec!(500)), "$500.00");
        assert_eq!(money(dec!(2.5)), "$2.50");
        assert_eq!(money(dec!(0.125)), "$0.12");
    }
}
