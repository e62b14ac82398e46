use crate::errors::{TrackerError, TrackerResult};

/// Maximum ticker length
pub const MAX_SYMBOL_LEN: usize = 5;

/// Check that `symbol` is 1-5 uppercase ASCII letters
pub fn validate_format(symbol: &str) -> TrackerResult<()> {
    let valid = (1..=MAX_SYMBOL_LEN).contains(&symbol.len())
        && symbol.bytes().all(|b| b.is_ascii_uppercase());

    if valid {
        Ok(())
    } else {
        Err(TrackerError::InvalidSymbol(symbol.to_string()))
    }
}

/// Uppercase a user-supplied ticker, then validate it
pub fn normalize(symbol: &str) -> TrackerResult<String> {
    let upper = symbol.trim().to_ascii_uppercase();
    validate_format(&upper)?;
    Ok(upper)
}
