use super::{money, Outcome, Turn};
use crate::i18n::Localizer;
use crate::workflows::conversation::input::Input;
use crate::workflows::sessions::Stage;

impl<L: Localizer> Turn<'_, L> {
    pub(crate) fn show_main_menu(&mut self) -> Outcome {
        self.session.advance(Stage::MainMenu);
        let name = self.session.name.clone();
        Outcome::Reply(self.text_with("menu.main", &[("name", name)]))
    }

    pub(crate) fn main_menu(&mut self, input: &Input<'_>) -> Outcome {
        match input.choice() {
            Some(1) => {
                let balance = money(self.session.balance());
                let body = self.text_with("wallet.balance", &[("balance", balance)]);
                self.finish(body)
            }
            Some(2) => {
                self.session.advance(Stage::SendTo);
                self.reply("send.ask_recipient")
            }
            Some(3) => {
                self.session.advance(Stage::Airtime);
                self.reply("airtime.prompt")
            }
            Some(4) => {
                let body = self.text("bills.unavailable");
                self.finish(body)
            }
            Some(5) => {
                let body = self.transaction_history();
                self.finish(body)
            }
            Some(6) => {
                self.session.advance(Stage::Support);
                self.reply("support.menu")
            }
            Some(7) => self.show_loan_menu(),
            _ => self.reply("menu.invalid"),
        }
    }

    pub(crate) fn support(&mut self, input: &Input<'_>) -> Outcome {
        let key = match input.choice() {
            Some(1) => "support.lost_card",
            Some(2) => "support.transaction_issue",
            Some(3) => "support.agent",
            _ => return self.reply("support.invalid"),
        };
        let body = self.text(key);
        self.finish(body)
    }

    pub(crate) fn post_action(&mut self, input: &Input<'_>) -> Outcome {
        if input.choice() == Some(1) {
            return self.show_main_menu();
        }
        if input.choice() == Some(0) || input.is_negative() {
            return Outcome::Exit(self.text("session.goodbye"));
        }
        self.reply("post.invalid")
    }

    pub(crate) fn show_loan_menu(&mut self) -> Outcome {
        self.session.advance(Stage::LoanMenu);
        Outcome::Reply(self.loan_menu_text())
    }

    pub(crate) fn loan_menu_text(&self) -> String {
        let mut text = self.text_with(
            "loan.menu",
            &[
                ("role", self.session.role.label().to_string()),
                ("region", self.session.region.label().to_string()),
            ],
        );
        if self.session.role.can_approve() {
            text.push('\n');
            text.push_str(&self.text("loan.menu_review"));
        }
        text.push('\n');
        text.push_str(&self.text("loan.menu_back"));
        text
    }
}
