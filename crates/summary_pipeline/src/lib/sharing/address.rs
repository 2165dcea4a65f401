use std::sync::LazyLock;

use lettre::Address;
use regex::Regex;

use crate::sharing::DeliveryFailure;

static RECIPIENT_SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,;\s]+").expect("valid recipient separator regex"));

/// Splits a free-form recipient list on commas, semicolons and whitespace
pub fn parse_recipient_list(input: &str) -> Vec<String> {
    RECIPIENT_SEPARATOR_RE
        .split(input.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_address(raw: &str) -> Result<Address, DeliveryFailure> {
    raw.trim()
        .parse::<Address>()
        .map_err(|_| DeliveryFailure::InvalidAddress)
}
