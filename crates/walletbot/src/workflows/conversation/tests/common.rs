use std::sync::Arc;

use crate::config::WalletConfig;
use crate::i18n::{Catalog, Language};
use crate::workflows::conversation::ConversationEngine;
use crate::workflows::lending::{LoanId, Region};
use crate::workflows::sessions::{Session, Stage};

pub(super) const APPLICANT: &str = "whatsapp:+263771000001";
pub(super) const MUFUNDISI: &str = "whatsapp:+263771000002";
pub(super) const ELDER: &str = "whatsapp:+263771000003";
pub(super) const NEIGHBOUR: &str = "whatsapp:+263771000004";
pub(super) const OUTSIDER: &str = "whatsapp:+263771000005";

pub(super) fn engine() -> ConversationEngine {
    engine_with(WalletConfig::default())
}

pub(super) fn engine_with(config: WalletConfig) -> ConversationEngine {
    let catalog = Catalog::bundled(Language::English).expect("bundled tables parse");
    ConversationEngine::new(config, Arc::new(catalog))
}

/// Sends each message in order and returns the last reply.
pub(super) fn say(engine: &ConversationEngine, identity: &str, messages: &[&str]) -> String {
    messages
        .iter()
        .map(|message| engine.handle(identity, message))
        .last()
        .expect("at least one message")
}

/// Runs PIN and name capture, leaving the session on the main menu.
pub(super) fn onboard(engine: &ConversationEngine, identity: &str, name: &str) -> String {
    say(engine, identity, &["hi", "1234", name])
}

/// Onboards a participant with the given role and region.
pub(super) fn member(
    engine: &ConversationEngine,
    identity: &str,
    name: &str,
    role: &str,
    region: &str,
) {
    onboard(engine, identity, name);
    let role = format!("role {role}");
    let region = format!("region {region}");
    say(engine, identity, &[role.as_str(), region.as_str()]);
}

pub(super) fn session(engine: &ConversationEngine, identity: &str) -> Session {
    engine
        .sessions()
        .snapshot(identity)
        .expect("session should exist")
}

pub(super) fn stage(engine: &ConversationEngine, identity: &str) -> Stage {
    session(engine, identity).stage()
}

/// Submits an application from the main menu and returns to it.
pub(super) fn apply(engine: &ConversationEngine, identity: &str, amount: &str) -> LoanId {
    let reply = say(engine, identity, &["7", "1", amount]);
    assert!(reply.contains("submitted"), "unexpected reply: {reply}");
    say(engine, identity, &["1"]);
    let name = session(engine, identity).name;
    engine
        .ledger()
        .view(&name)
        .last()
        .map(|loan| loan.id)
        .expect("application recorded")
}

/// Approves the first pending application in the reviewer's region.
pub(super) fn approve_first(engine: &ConversationEngine, identity: &str) -> String {
    let reply = say(engine, identity, &["7", "4", "1", "1"]);
    say(engine, identity, &["1"]);
    reply
}

/// Applicant, Mufundisi, Elder and a recommending neighbour in Region A, plus
/// an outsider in Region B.
pub(super) fn congregation(engine: &ConversationEngine) {
    onboard(engine, APPLICANT, "tendai moyo");
    member(engine, MUFUNDISI, "Pastor Chiweshe", "mufundisi", "a");
    member(engine, ELDER, "Elder Banda", "elder", "a");
    member(engine, NEIGHBOUR, "Rudo Ncube", "member", "a");
    member(engine, OUTSIDER, "Farai Dube", "member", "b");
    assert_eq!(session(engine, OUTSIDER).region, Region::RegionB);
}
