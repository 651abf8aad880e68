use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{Result, ValidationError};

const MAX_IDENTITY_LEN: usize = 255;

static IDENTITY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid regex pattern"));

/// Ticker symbols as Yahoo spells them: AAPL, ENI.MI, BTC-USD, EURUSD=X, ^GSPC.
static SYMBOL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9.^=-]{1,10}$").expect("Invalid regex pattern"));

pub fn validate_identity(identity: &str) -> Result<()> {
    if identity.is_empty() {
        return Err(ValidationError::MissingField("identity".to_string()).into());
    }
    if identity.len() > MAX_IDENTITY_LEN || !IDENTITY_REGEX.is_match(identity) {
        return Err(ValidationError::InvalidInput(format!(
            "'{}' is not a valid e-mail address",
            identity
        ))
        .into());
    }
    Ok(())
}

pub fn validate_symbol(symbol: &str) -> Result<()> {
    if symbol.is_empty() {
        return Err(ValidationError::MissingField("symbol".to_string()).into());
    }
    if !SYMBOL_REGEX.is_match(symbol) {
        return Err(
            ValidationError::InvalidInput(format!("'{}' is not a valid ticker symbol", symbol))
                .into(),
        );
    }
    Ok(())
}
