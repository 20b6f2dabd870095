use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::flows::{Outcome, Turn};
use super::global::GlobalCommand;
use super::input::Input;
use crate::config::WalletConfig;
use crate::i18n::{Catalog, Localizer};
use crate::workflows::lending::LoanLedger;
use crate::workflows::sessions::{Session, SessionStore, Stage};

/// Routes one message at a time through the sender's conversation.
///
/// Messages from the same identity are serialized on that identity's session
/// lock. Messages from different identities only meet inside the ledger,
/// which serializes per loan.
pub struct ConversationEngine<L = Catalog> {
    sessions: Arc<SessionStore>,
    ledger: Arc<LoanLedger>,
    localizer: Arc<L>,
    config: WalletConfig,
}

impl<L: Localizer> ConversationEngine<L> {
    pub fn new(config: WalletConfig, localizer: Arc<L>) -> Self {
        let sessions = Arc::new(SessionStore::new(&config));
        let ledger = Arc::new(LoanLedger::default());
        Self::with_parts(config, sessions, ledger, localizer)
    }

    pub fn with_parts(
        config: WalletConfig,
        sessions: Arc<SessionStore>,
        ledger: Arc<LoanLedger>,
        localizer: Arc<L>,
    ) -> Self {
        Self {
            sessions,
            ledger,
            localizer,
            config,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn ledger(&self) -> &LoanLedger {
        &self.ledger
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    /// Handles one inbound message and returns the reply text.
    pub fn handle(&self, identity: &str, text: &str) -> String {
        let input = Input::new(text);

        loop {
            let slot = self.sessions.get_or_create(identity);
            let mut session = slot.lock();
            // Deleted while we waited for the lock; look up the replacement.
            if session.is_retired() {
                continue;
            }
            session.touch(Utc::now());

            match self.dispatch(&mut session, slot.created, &input) {
                Outcome::Reply(reply) => return reply,
                Outcome::Exit(reply) => {
                    session.retire();
                    drop(session);
                    self.sessions.discard(identity, &slot.handle);
                    info!(identity, "conversation closed by user");
                    return reply;
                }
                Outcome::Expired(reply) => {
                    session.retire();
                    drop(session);
                    self.sessions.discard(identity, &slot.handle);
                    return reply;
                }
            }
        }
    }

    fn dispatch(&self, session: &mut Session, created: bool, input: &Input<'_>) -> Outcome {
        let mut turn = Turn {
            session,
            ledger: &self.ledger,
            localizer: self.localizer.as_ref(),
            config: &self.config,
        };

        if !created {
            if let Some(command) = GlobalCommand::parse(input.folded()) {
                return switch(&mut turn, command);
            }
        }

        let stage = turn.session.stage();
        debug!(identity = %turn.session.identity, stage = stage.label(), "dispatching message");

        if let Some(loan_id) = stage.loan_id() {
            if self.ledger.get(loan_id).is_none() {
                warn!(
                    identity = %turn.session.identity,
                    %loan_id,
                    stage = stage.label(),
                    "stage refers to an unknown loan"
                );
                return turn.expired();
            }
        }

        match stage {
            Stage::AskPin => turn.ask_pin(),
            Stage::VerifyPin => turn.verify_pin(input),
            Stage::AskName => turn.ask_name(input),
            Stage::MainMenu => turn.main_menu(input),
            Stage::SendTo => turn.send_to(input),
            Stage::SendAmount => turn.send_amount(input),
            Stage::ConfirmSend => turn.confirm_send(input),
            Stage::Airtime => turn.airtime(input),
            Stage::Support => turn.support(input),
            Stage::PostAction => turn.post_action(input),
            Stage::LoanMenu => turn.loan_menu(input),
            Stage::LoanAmount => turn.loan_amount(input),
            Stage::MyLoans => turn.my_loans(input),
            Stage::BorrowAmount(loan_id) => turn.borrow_amount(loan_id, input),
            Stage::RecommendList => turn.recommend_list(input),
            Stage::RecommendConfirm(loan_id) => turn.recommend_confirm(loan_id, input),
            Stage::RecommendReason(loan_id) => turn.recommend_reason(loan_id, input),
            Stage::ReviewList => turn.review_list(input),
            Stage::ApproverAction(loan_id) => turn.approver_action(loan_id, input),
            Stage::DeclineReason(loan_id) => turn.decline_reason(loan_id, input),
        }
    }
}

/// Applies a profile switch. The stage is kept; any numbered list is not.
fn switch<L: Localizer>(turn: &mut Turn<'_, L>, command: GlobalCommand) -> Outcome {
    turn.session.clear_selection();
    let reply = match command {
        GlobalCommand::SwitchRole(role) => {
            turn.session.role = role;
            let label = role.label().to_string();
            turn.text_with("global.role_switched", &[("role", label)])
        }
        GlobalCommand::SwitchRegion(region) => {
            turn.session.region = region;
            let label = region.label().to_string();
            turn.text_with("global.region_switched", &[("region", label)])
        }
        GlobalCommand::SwitchLanguage(language) => {
            turn.session.language = language;
            let label = language.label().to_string();
            turn.text_with("global.language_switched", &[("language", label)])
        }
    };
    info!(
        identity = %turn.session.identity,
        role = turn.session.role.label(),
        region = turn.session.region.label(),
        language = %turn.session.language,
        "profile switched"
    );
    Outcome::Reply(reply)
}
