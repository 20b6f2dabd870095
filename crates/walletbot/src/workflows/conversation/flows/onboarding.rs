use tracing::debug;

use super::{Outcome, Turn};
use crate::i18n::Localizer;
use crate::workflows::conversation::input::{parse_pin, title_case, Input};
use crate::workflows::sessions::Stage;

impl<L: Localizer> Turn<'_, L> {
    /// First exchange. Whatever was said, ask for the PIN.
    pub(crate) fn ask_pin(&mut self) -> Outcome {
        self.session.advance(Stage::VerifyPin);
        self.reply("pin.prompt")
    }

    pub(crate) fn verify_pin(&mut self, input: &Input<'_>) -> Outcome {
        match parse_pin(input.raw()) {
            Ok(pin) => {
                self.session.pin = Some(pin);
                self.session.advance(Stage::AskName);
                self.reply("pin.accepted")
            }
            Err(err) => {
                debug!(kind = err.kind().label(), "pin rejected");
                self.reply("pin.invalid")
            }
        }
    }

    pub(crate) fn ask_name(&mut self, input: &Input<'_>) -> Outcome {
        let name = title_case(input.raw());
        if name.is_empty() {
            return self.reply("name.empty");
        }
        self.session.name = name;
        self.show_main_menu()
    }
}
