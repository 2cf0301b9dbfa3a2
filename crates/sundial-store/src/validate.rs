//! Pure request validation.
//!
//! Each check either passes silently or fails with the exact user-facing
//! message for that field.  Validation is fail-fast: callers stop at the
//! first error and never reach the database.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::error::{Result, StoreError};

/// Check that every named field is present and non-blank after trimming.
///
/// The error message is chosen by a fixed field priority (name, email,
/// client_id, time), falling back to a generic listing for anything else.
pub fn required_fields(fields: &[(&str, Option<&str>)]) -> Result<()> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, value)| is_blank(*value))
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    let message = if missing.contains(&"name") {
        "Client name is required. Please enter a valid name.".to_string()
    } else if missing.contains(&"email") {
        "Client email is required. Please enter a valid email address.".to_string()
    } else if missing.contains(&"client_id") {
        "Please select a client before scheduling the appointment.".to_string()
    } else if missing.contains(&"time") {
        "Please select a valid date and time for the appointment.".to_string()
    } else {
        format!("Please fill in all required fields: {}", missing.join(", "))
    };

    Err(StoreError::Validation(message))
}

/// Validate an email address.
///
/// Accepts `local@domain` where the local part is word characters plus
/// `+ - .`, the domain is dot-separated alphanumeric/hyphen labels, and the
/// top-level label is purely alphabetic.  Case-insensitive.
pub fn email(email: &str) -> Result<()> {
    if is_valid_email(email.trim()) {
        Ok(())
    } else {
        Err(StoreError::Validation(
            "Please enter a valid email address (e.g., john@example.com).".to_string(),
        ))
    }
}

/// Validate a phone number if one was supplied; absent or blank passes.
///
/// Accepts an optional leading `+` followed by at least ten characters drawn
/// from digits, whitespace, `-`, `(`, `)`.
pub fn phone(phone: Option<&str>) -> Result<()> {
    let Some(raw) = phone else { return Ok(()) };
    let raw = raw.trim();
    if raw.is_empty() || is_valid_phone(raw) {
        Ok(())
    } else {
        Err(StoreError::Validation(
            "Please enter a valid phone number.".to_string(),
        ))
    }
}

/// Parse a raw date/time string and check it lies strictly in the future.
///
/// Accepts RFC 3339 as well as common naive formats (interpreted as UTC).
pub fn appointment_time(raw: &str) -> Result<DateTime<Utc>> {
    let parsed = parse_time(raw.trim()).ok_or_else(|| {
        StoreError::Validation("Please enter a valid date and time.".to_string())
    })?;

    if parsed <= Utc::now() {
        return Err(StoreError::Validation(
            "Cannot schedule appointments in the past. Please select a future date and time."
                .to_string(),
        ));
    }

    Ok(parsed)
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |s| s.trim().is_empty())
}

fn is_valid_email(email: &str) -> bool {
    let email = email.to_ascii_lowercase();
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty()
        || !local
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'+' | b'-' | b'.'))
    {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    let Some((tld, rest)) = labels.split_last() else {
        return false;
    };
    if tld.is_empty() || !tld.bytes().all(|b| b.is_ascii_lowercase()) {
        return false;
    }

    rest.iter().all(|label| {
        !label.is_empty()
            && label
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    })
}

fn is_valid_phone(raw: &str) -> bool {
    let body = raw.strip_prefix('+').unwrap_or(raw);
    body.len() >= 10
        && body
            .bytes()
            .all(|b| b.is_ascii_digit() || b.is_ascii_whitespace() || matches!(b, b'-' | b'(' | b')'))
}

fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn required_fields_pass_when_present() {
        assert!(required_fields(&[("name", Some("Ada")), ("email", Some("ada@x.com"))]).is_ok());
    }

    #[test]
    fn required_fields_priority_order() {
        // name outranks email even though both are missing
        let err = required_fields(&[("email", None), ("name", None)]).unwrap_err();
        assert!(err.to_string().contains("name is required"));

        let err = required_fields(&[("client_id", None), ("time", None)]).unwrap_err();
        assert!(err.to_string().contains("select a client"));

        let err = required_fields(&[("time", Some("   "))]).unwrap_err();
        assert!(err.to_string().contains("date and time"));
    }

    #[test]
    fn required_fields_generic_fallback() {
        let err = required_fields(&[("notes", None), ("room", None)]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Please fill in all required fields: notes, room"
        );
    }

    #[test]
    fn email_accepts_common_shapes() {
        for ok in [
            "john@example.com",
            "john.smith+tag@mail.example.co.uk",
            "UPPER.CASE@EXAMPLE.COM",
            "under_score@host-name.org",
        ] {
            assert!(email(ok).is_ok(), "{ok} should be accepted");
        }
    }

    #[test]
    fn email_rejects_malformed() {
        for bad in [
            "",
            "plain",
            "@example.com",
            "a@",
            "a@b",
            "a@b.",
            "a@b.c0m",
            "two@@example.com",
            "spaces in@example.com",
        ] {
            assert!(email(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn phone_optional_and_loose() {
        assert!(phone(None).is_ok());
        assert!(phone(Some("")).is_ok());
        assert!(phone(Some("   ")).is_ok());
        assert!(phone(Some("+1 (555) 123-4567")).is_ok());
        assert!(phone(Some("0701234567")).is_ok());
    }

    #[test]
    fn phone_rejects_short_or_lettered() {
        assert!(phone(Some("12345")).is_err());
        assert!(phone(Some("call me maybe")).is_err());
    }

    #[test]
    fn appointment_time_future_passes() {
        let tomorrow = (Utc::now() + Duration::days(1)).to_rfc3339();
        assert!(appointment_time(&tomorrow).is_ok());
    }

    #[test]
    fn appointment_time_past_and_now_fail() {
        let yesterday = (Utc::now() - Duration::days(1)).to_rfc3339();
        let err = appointment_time(&yesterday).unwrap_err();
        assert!(err.to_string().contains("in the past"));

        // "now" is not strictly in the future
        let now = Utc::now().to_rfc3339();
        assert!(appointment_time(&now).is_err());
    }

    #[test]
    fn appointment_time_unparseable_fails() {
        let err = appointment_time("next tuesday-ish").unwrap_err();
        assert!(err.to_string().contains("valid date and time"));
    }

    #[test]
    fn appointment_time_naive_formats() {
        let naive = (Utc::now() + Duration::days(2)).format("%Y-%m-%d %H:%M").to_string();
        assert!(appointment_time(&naive).is_ok());
    }
}
