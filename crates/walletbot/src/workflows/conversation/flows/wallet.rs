use tracing::{debug, info};

use super::{money, Outcome, Turn};
use crate::i18n::Localizer;
use crate::workflows::conversation::input::{airtime_recipient, parse_amount, title_case, Input};
use crate::workflows::sessions::{Stage, TransactionKind};

impl<L: Localizer> Turn<'_, L> {
    pub(crate) fn send_to(&mut self, input: &Input<'_>) -> Outcome {
        let recipient = title_case(input.raw());
        if recipient.is_empty() {
            return self.reply("send.ask_recipient");
        }
        self.session.pending_name = Some(recipient.clone());
        self.session.advance(Stage::SendAmount);
        Outcome::Reply(self.text_with("send.ask_amount", &[("name", recipient)]))
    }

    pub(crate) fn send_amount(&mut self, input: &Input<'_>) -> Outcome {
        let Some(recipient) = self.session.pending_name.clone() else {
            return self.expired();
        };
        let amount = match parse_amount(input.raw()) {
            Ok(amount) => amount,
            Err(err) => {
                debug!(kind = err.kind().label(), "transfer amount rejected");
                return self.reply("send.invalid_amount");
            }
        };

        self.session.pending_amount = Some(amount);
        self.session.advance(Stage::ConfirmSend);
        Outcome::Reply(self.text_with(
            "send.confirm",
            &[("amount", money(amount)), ("name", recipient)],
        ))
    }

    pub(crate) fn confirm_send(&mut self, input: &Input<'_>) -> Outcome {
        let (Some(recipient), Some(amount)) = (
            self.session.pending_name.take(),
            self.session.pending_amount.take(),
        ) else {
            return self.expired();
        };

        if !input.is_affirmative() {
            let body = self.text("send.cancelled");
            return self.finish(body);
        }

        let body = match self.session.debit(amount) {
            Ok(()) => {
                self.session.record(TransactionKind::Sent, amount, recipient.clone());
                info!(identity = %self.session.identity, %amount, "transfer sent");
                self.text_with("send.success", &[("balance", money(self.session.balance()))])
            }
            Err(err) => {
                debug!(kind = err.kind().label(), %err, "transfer refused");
                self.text_with("wallet.insufficient", &[("balance", money(self.session.balance()))])
            }
        };
        self.finish(body)
    }

    pub(crate) fn airtime(&mut self, input: &Input<'_>) -> Outcome {
        let parsed = parse_amount(input.raw())
            .and_then(|amount| airtime_recipient(input.raw()).map(|number| (amount, number)));
        let (amount, number) = match parsed {
            Ok(parsed) => parsed,
            Err(err) => {
                debug!(kind = err.kind().label(), "airtime request rejected");
                return self.reply("airtime.invalid");
            }
        };

        let body = match self.session.debit(amount) {
            Ok(()) => {
                let detail = number.unwrap_or_else(|| self.text("airtime.own_number"));
                self.session.record(TransactionKind::Airtime, amount, detail);
                info!(identity = %self.session.identity, %amount, "airtime purchased");
                self.text_with("airtime.success", &[("balance", money(self.session.balance()))])
            }
            Err(err) => {
                debug!(kind = err.kind().label(), %err, "airtime refused");
                self.text_with("wallet.insufficient", &[("balance", money(self.session.balance()))])
            }
        };
        self.finish(body)
    }

    pub(crate) fn transaction_history(&self) -> String {
        let lines: Vec<String> = self
            .session
            .transactions()
            .map(|record| {
                let key = match record.kind {
                    TransactionKind::Sent => "history.sent",
                    TransactionKind::Airtime => "history.airtime",
                    TransactionKind::LoanDisbursement => "history.loan",
                };
                self.text_with(
                    key,
                    &[
                        ("amount", money(record.amount)),
                        ("detail", record.detail.clone()),
                        ("date", record.at.format("%d %b %H:%M").to_string()),
                    ],
                )
            })
            .collect();

        if lines.is_empty() {
            return self.text("history.empty");
        }
        self.text_with("history.list", &[("entries", lines.join("\n"))])
    }
}
