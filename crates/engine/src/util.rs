//! Internal helpers for input validation.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation so every write path enforces the same invariants before
//! touching the store.

use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Trim a required text field, rejecting empty values.
pub(crate) fn normalize_required_text(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidInput(format!(
            "{label} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Checks that need no store access: positive amount, distinct parties.
pub(crate) fn validate_transfer_shape(
    sender_id: Uuid,
    recipient_id: Uuid,
    amount_minor: i64,
) -> ResultEngine<()> {
    if amount_minor <= 0 {
        return Err(EngineError::InvalidAmount(
            "amount_minor must be > 0".to_string(),
        ));
    }
    if sender_id == recipient_id {
        return Err(EngineError::InvalidTransfer(
            "sender and recipient must differ".to_string(),
        ));
    }
    Ok(())
}

/// Interval counts are persisted as `i32`.
pub(crate) fn validate_interval(interval: u32) -> ResultEngine<()> {
    if interval == 0 || i32::try_from(interval).is_err() {
        return Err(EngineError::InvalidSchedule(format!(
            "interval must be between 1 and {}",
            i32::MAX
        )));
    }
    Ok(())
}
