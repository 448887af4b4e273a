//! `expiresIn` parsing (`"90"`, `"30m"`, `"24h"`, `"7 days"`).

use chrono::Duration;

use crate::{AuthError, AuthResult};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

/// Parse a token lifetime.
///
/// A bare integer is seconds. Otherwise a number followed by a unit. The
/// result is always strictly positive.
pub fn parse_expires_in(input: &str) -> AuthResult<Duration> {
    let invalid = || AuthError::InvalidExpiresIn(input.to_string());

    let trimmed = input.trim();
    let split_at = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split_at);
    if digits.is_empty() {
        return Err(invalid());
    }

    let amount: i64 = digits.parse().map_err(|_| invalid())?;
    let multiplier = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => 1,
        "m" | "min" | "mins" | "minute" | "minutes" => MINUTE,
        "h" | "hr" | "hrs" | "hour" | "hours" => HOUR,
        "d" | "day" | "days" => DAY,
        "w" | "week" | "weeks" => 7 * DAY,
        "y" | "year" | "years" => 365 * DAY,
        _ => return Err(invalid()),
    };

    let seconds = amount.checked_mul(multiplier).ok_or_else(invalid)?;
    if seconds <= 0 {
        return Err(invalid());
    }
    Duration::try_seconds(seconds).ok_or_else(invalid)
}
