//! Phone number normalization to a canonical E.164-ish form.
//!
//! We don't pull in a full libphonenumber port for this: the spec only
//! requires a normalized, comparable key, not full international
//! validation. Digits-only with a leading `+` and a plausible length is
//! good enough for a phone-keyed identity column.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{Error, Result};

fn digits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^0-9+]").unwrap())
}

/// Normalize a phone number to `+<country><subscriber>`, stripping
/// whitespace, punctuation and any leading `00` international prefix.
pub fn normalize(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let stripped = digits_re().replace_all(trimmed, "");
    let stripped = stripped.strip_prefix("00").unwrap_or(&stripped);
    let stripped = if let Some(rest) = stripped.strip_prefix('+') {
        rest
    } else {
        stripped
    };

    if stripped.len() < 8 || stripped.len() > 15 || !stripped.chars().all(|c| c.is_ascii_digit())
    {
        return Err(Error::MalformedPhone);
    }

    Ok(format!("+{stripped}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_common_formats() {
        assert_eq!(normalize("+256 700 123456").unwrap(), "+256700123456");
        assert_eq!(normalize("0256700123456").unwrap(), "+256700123456");
        assert_eq!(normalize("256-700-123-456").unwrap(), "+256700123456");
    }

    #[test]
    fn rejects_too_short() {
        assert!(normalize("12345").is_err());
    }

    #[test]
    fn rejects_non_digits() {
        assert!(normalize("+256abc123456").is_err());
    }
}
