use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::ErrorKind;

const KEYCAP: [char; 2] = ['\u{fe0f}', '\u{20e3}'];

/// One inbound message. `raw` keeps the sender's casing for names and
/// free text, `folded` is what menus and commands match against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input<'a> {
    raw: &'a str,
    folded: String,
}

impl<'a> Input<'a> {
    pub fn new(text: &'a str) -> Self {
        let raw = text.trim();
        Self {
            raw,
            folded: raw.to_lowercase(),
        }
    }

    pub fn raw(&self) -> &'a str {
        self.raw
    }

    pub fn folded(&self) -> &str {
        &self.folded
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Menu digit, accepting keycap emoji such as `1️⃣`.
    pub fn choice(&self) -> Option<u32> {
        let digits = self.folded.trim_end_matches(&KEYCAP[..]);
        if digits.is_empty() || !digits.chars().all(|ch| ch.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    pub fn is_affirmative(&self) -> bool {
        let first = self.folded.split_whitespace().next().unwrap_or_default();
        self.folded.contains("yes")
            || self.folded.contains('✅')
            || matches!(first, "y" | "ok" | "hongu" | "ehe")
    }

    pub fn is_negative(&self) -> bool {
        let first = self.folded.split_whitespace().next().unwrap_or_default();
        self.folded.contains('❌') || matches!(first, "no" | "n" | "kwete" | "aiwa")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("PIN must be exactly four digits")]
    InvalidPin,
    #[error("'{0}' is not a valid amount")]
    InvalidAmount(String),
    #[error("'{0}' is not one of the listed options")]
    InvalidChoice(String),
    #[error("a reply is required")]
    EmptyText,
}

impl InputError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InputValidation
    }
}

pub fn parse_pin(text: &str) -> Result<String, InputError> {
    let pin = text.trim();
    if pin.len() == 4 && pin.bytes().all(|byte| byte.is_ascii_digit()) {
        Ok(pin.to_string())
    } else {
        Err(InputError::InvalidPin)
    }
}

/// Parses `20`, `$20`, or `$2 to 0772123456`. Only the first token counts,
/// and amounts must be positive with at most two decimal places.
pub fn parse_amount(text: &str) -> Result<Decimal, InputError> {
    let invalid = || InputError::InvalidAmount(text.trim().to_string());
    let stripped = text.replace('$', "");
    let token = stripped.split_whitespace().next().ok_or_else(invalid)?;
    let amount = Decimal::from_str(token).map_err(|_| invalid())?;
    if amount <= Decimal::ZERO || amount.normalize().scale() > 2 {
        return Err(invalid());
    }
    Ok(amount)
}

/// Parses a 1-based list index.
pub fn parse_index(input: &Input<'_>) -> Result<usize, InputError> {
    input
        .choice()
        .filter(|index| *index > 0)
        .map(|index| index as usize)
        .ok_or_else(|| InputError::InvalidChoice(input.raw().to_string()))
}

/// Phone number following `to` in an airtime request, if one was given.
pub fn airtime_recipient(text: &str) -> Result<Option<String>, InputError> {
    let mut tokens = text.split_whitespace().skip_while(|token| !token.eq_ignore_ascii_case("to"));
    if tokens.next().is_none() {
        return Ok(None);
    }
    let number = tokens
        .next()
        .ok_or_else(|| InputError::InvalidChoice(text.trim().to_string()))?;
    let digits = number.strip_prefix('+').unwrap_or(number);
    if digits.len() >= 7 && digits.bytes().all(|byte| byte.is_ascii_digit()) {
        Ok(Some(number.to_string()))
    } else {
        Err(InputError::InvalidChoice(number.to_string()))
    }
}

/// Capitalizes each word and leaves the rest as typed.
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
