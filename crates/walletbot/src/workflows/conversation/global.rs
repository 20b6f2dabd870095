use crate::i18n::Language;
use crate::workflows::lending::{Region, Role};

/// Commands honoured from any stage. They change the profile but never the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalCommand {
    SwitchRole(Role),
    SwitchRegion(Region),
    SwitchLanguage(Language),
}

impl GlobalCommand {
    /// Recognizes `role <name>`, `region <a|b>`, and `lang <code>`. Anything
    /// else, including unknown values, is left for the current stage.
    pub fn parse(folded: &str) -> Option<Self> {
        let mut tokens = folded.split_whitespace();
        let (Some(command), Some(value), None) = (tokens.next(), tokens.next(), tokens.next())
        else {
            return None;
        };

        match command {
            "role" => value.parse().ok().map(Self::SwitchRole),
            "region" => value.parse().ok().map(Self::SwitchRegion),
            "lang" | "language" => value.parse().ok().map(Self::SwitchLanguage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_three_switches() {
        assert_eq!(
            GlobalCommand::parse("role elder"),
            Some(GlobalCommand::SwitchRole(Role::Elder))
        );
        assert_eq!(
            GlobalCommand::parse("region b"),
            Some(GlobalCommand::SwitchRegion(Region::RegionB))
        );
        assert_eq!(
            GlobalCommand::parse("lang sn"),
            Some(GlobalCommand::SwitchLanguage(Language::Shona))
        );
    }

    #[test]
    fn ignores_unknown_values_and_extra_words() {
        assert_eq!(GlobalCommand::parse("role chief"), None);
        assert_eq!(GlobalCommand::parse("role"), None);
        assert_eq!(GlobalCommand::parse("role elder now"), None);
        assert_eq!(GlobalCommand::parse("roles elder"), None);
    }
}
