use rust_decimal_macros::dec;

use super::common::*;
use crate::config::WalletConfig;
use crate::workflows::sessions::{Stage, TransactionKind};

#[test]
fn balance_is_reported_then_post_action() {
    let engine = engine();
    onboard(&engine, APPLICANT, "Tendai");
    let reply = say(&engine, APPLICANT, &["1️⃣"]);
    assert!(reply.contains("balance is $500.00"), "{reply}");
    assert!(reply.ends_with("0️⃣ Exit"));
    assert_eq!(stage(&engine, APPLICANT), Stage::PostAction);
}

#[test]
fn seed_balance_comes_from_config() {
    let engine = engine_with(WalletConfig {
        seed_balance: dec!(75.5),
        ..WalletConfig::default()
    });
    onboard(&engine, APPLICANT, "Tendai");
    assert!(say(&engine, APPLICANT, &["1"]).contains("$75.50"));
}

#[test]
fn send_money_debits_and_records() {
    let engine = engine();
    onboard(&engine, APPLICANT, "Tendai");

    let reply = say(&engine, APPLICANT, &["2", "rudo ncube"]);
    assert!(reply.contains("send to Rudo Ncube?"), "{reply}");
    let reply = say(&engine, APPLICANT, &["$20 please"]);
    assert!(reply.contains("Send $20.00 to Rudo Ncube?"), "{reply}");
    let reply = say(&engine, APPLICANT, &["✅"]);
    assert!(reply.contains("New balance: $480.00"), "{reply}");

    let session = session(&engine, APPLICANT);
    assert_eq!(session.balance(), dec!(480));
    assert!(session.pending_amount.is_none());
    let latest = session.transactions().next().expect("recorded");
    assert_eq!(latest.kind, TransactionKind::Sent);
    assert_eq!(latest.detail, "Rudo Ncube");
}

#[test]
fn invalid_transfer_amount_reprompts() {
    let engine = engine();
    onboard(&engine, APPLICANT, "Tendai");
    let reply = say(&engine, APPLICANT, &["2", "Rudo", "twenty"]);
    assert!(reply.contains("Invalid amount"));
    assert_eq!(stage(&engine, APPLICANT), Stage::SendAmount);
}

#[test]
fn transfer_beyond_balance_is_refused() {
    let engine = engine();
    onboard(&engine, APPLICANT, "Tendai");
    let reply = say(&engine, APPLICANT, &["2", "Rudo", "600", "yes"]);
    assert!(reply.contains("Insufficient funds"), "{reply}");
    assert_eq!(session(&engine, APPLICANT).balance(), dec!(500));
    assert_eq!(stage(&engine, APPLICANT), Stage::PostAction);
}

#[test]
fn declining_confirmation_cancels() {
    let engine = engine();
    onboard(&engine, APPLICANT, "Tendai");
    let reply = say(&engine, APPLICANT, &["2", "Rudo", "10", "no"]);
    assert!(reply.contains("Transaction cancelled"));
    assert_eq!(session(&engine, APPLICANT).balance(), dec!(500));
    assert_eq!(session(&engine, APPLICANT).transactions().count(), 0);
}

#[test]
fn airtime_purchase_debits_balance() {
    let engine = engine();
    onboard(&engine, APPLICANT, "Tendai");
    let reply = say(&engine, APPLICANT, &["3", "$2 to 0772123456"]);
    assert!(reply.contains("New balance: $498.00"), "{reply}");

    let session = session(&engine, APPLICANT);
    let latest = session.transactions().next().expect("recorded");
    assert_eq!(latest.kind, TransactionKind::Airtime);
    assert_eq!(latest.detail, "0772123456");
}

#[test]
fn malformed_airtime_request_stays_on_airtime() {
    let engine = engine();
    onboard(&engine, APPLICANT, "Tendai");
    say(&engine, APPLICANT, &["3"]);
    for attempt in ["two dollars", "$2 to mum", "$0 to 0772123456"] {
        let reply = say(&engine, APPLICANT, &[attempt]);
        assert!(reply.contains("Invalid format"), "{attempt}: {reply}");
        assert_eq!(stage(&engine, APPLICANT), Stage::Airtime);
    }
    assert_eq!(session(&engine, APPLICANT).balance(), dec!(500));
}

#[test]
fn transaction_history_lists_newest_first() {
    let engine = engine();
    onboard(&engine, APPLICANT, "Tendai");
    say(&engine, APPLICANT, &["2", "Rudo", "10", "yes", "1"]);
    say(&engine, APPLICANT, &["3", "$5", "1"]);

    let reply = say(&engine, APPLICANT, &["5"]);
    let airtime = reply.find("Bought $5.00 airtime").expect("airtime listed");
    let sent = reply.find("Sent $10.00 to Rudo").expect("transfer listed");
    assert!(airtime < sent, "{reply}");
}

#[test]
fn empty_history_says_so() {
    let engine = engine();
    onboard(&engine, APPLICANT, "Tendai");
    assert!(say(&engine, APPLICANT, &["5"]).contains("No transactions yet"));
}

#[test]
fn support_options_and_reprompt() {
    let engine = engine();
    onboard(&engine, APPLICANT, "Tendai");
    let reply = say(&engine, APPLICANT, &["6", "9"]);
    assert!(reply.contains("choose 1, 2, or 3"));
    assert_eq!(stage(&engine, APPLICANT), Stage::Support);

    let reply = say(&engine, APPLICANT, &["1"]);
    assert!(reply.contains("0800 123 456"));
    assert_eq!(stage(&engine, APPLICANT), Stage::PostAction);
}

#[test]
fn out_of_range_menu_choice_reprompts() {
    let engine = engine();
    onboard(&engine, APPLICANT, "Tendai");
    let reply = say(&engine, APPLICANT, &["9"]);
    assert!(reply.contains("valid option (1–7)"));
    assert_eq!(stage(&engine, APPLICANT), Stage::MainMenu);
}
