//! Text form of MySQL `TIME` values
//!
//! `[-]H:MM[:SS[.ffffff]]` where the hour field may exceed 23 and an optional
//! leading `D ` day count is accepted. Hours past a day are folded into days.

use chrono::Duration;

use super::ConversionError;

const TARGET: &str = "time span";

/// Largest hour magnitude a `TIME` column holds (`838:59:59`)
const MAX_HOURS: i64 = 838;

/// Parse a `TIME` text value into a signed duration
pub fn parse_time_text(text: &str) -> Result<Duration, ConversionError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ConversionError::new(TARGET, "empty time text"));
    }

    let (negative, body) = match trimmed.as_bytes()[0] {
        b'-' => (true, &trimmed[1..]),
        b'+' => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let (day_part, clock) = match body.split_once(' ') {
        Some((days, clock)) => (Some(days), clock.trim_start()),
        None => (None, body),
    };

    let days = match day_part {
        Some(days) => parse_number(days, text)?,
        None => 0,
    };

    let mut fields = clock.split(':');
    let hours = parse_number(fields.next().unwrap_or_default(), text)?;
    let minutes = match fields.next() {
        Some(minutes) => parse_number(minutes, text)?,
        None => return Err(malformed(text)),
    };
    let (seconds, micros) = match fields.next() {
        Some(seconds) => parse_seconds(seconds, text)?,
        None => (0, 0),
    };
    if fields.next().is_some() || minutes > 59 || seconds > 59 {
        return Err(malformed(text));
    }

    let total_hours = days
        .checked_mul(24)
        .and_then(|day_hours| day_hours.checked_add(hours))
        .filter(|total| *total <= MAX_HOURS)
        .ok_or_else(|| out_of_range(text))?;

    let span = Duration::days(total_hours / 24)
        + Duration::hours(total_hours % 24)
        + Duration::minutes(minutes)
        + Duration::seconds(seconds)
        + Duration::microseconds(micros);

    Ok(if negative { -span } else { span })
}

/// Format a signed duration as `TIME` text, hours unbounded
pub fn format_time_text(span: Duration) -> String {
    let total_micros = span.num_microseconds().unwrap_or_else(|| {
        // saturate spans past ~292k years; MySQL rejects them anyway
        if span < Duration::zero() {
            i64::MIN + 1
        } else {
            i64::MAX
        }
    });
    let sign = if total_micros < 0 { "-" } else { "" };
    let magnitude = total_micros.unsigned_abs();

    let micros = magnitude % 1_000_000;
    let total_seconds = magnitude / 1_000_000;
    let seconds = total_seconds % 60;
    let minutes = (total_seconds / 60) % 60;
    let hours = total_seconds / 3600;

    if micros == 0 {
        format!("{}{:02}:{:02}:{:02}", sign, hours, minutes, seconds)
    } else {
        format!("{}{:02}:{:02}:{:02}.{:06}", sign, hours, minutes, seconds, micros)
    }
}

fn parse_number(field: &str, text: &str) -> Result<i64, ConversionError> {
    let field = field.trim();
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed(text));
    }
    field.parse::<i64>().map_err(|_| malformed(text))
}

/// Seconds with an optional fraction of one to six digits; extra digits are truncated
fn parse_seconds(field: &str, text: &str) -> Result<(i64, i64), ConversionError> {
    let (whole, fraction) = match field.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (field, None),
    };
    let seconds = parse_number(whole, text)?;

    let micros = match fraction {
        None => 0,
        Some(digits) if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) => {
            return Err(malformed(text));
        }
        Some(digits) => {
            let mut padded: String = digits.chars().take(6).collect();
            while padded.len() < 6 {
                padded.push('0');
            }
            padded.parse::<i64>().map_err(|_| malformed(text))?
        }
    };

    Ok((seconds, micros))
}

fn malformed(text: &str) -> ConversionError {
    ConversionError::new(TARGET, format!("malformed time text '{}'", text))
}

fn out_of_range(text: &str) -> ConversionError {
    ConversionError::new(
        TARGET,
        format!("time text '{}' is outside -838:59:59..838:59:59", text),
    )
}
