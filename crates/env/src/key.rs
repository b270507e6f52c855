//! Key normalization.

use regex::Regex;
use std::sync::LazyLock;

// Keys should not be complicated. The host rejects anything outside this
// character set, so strip the rest before it ever reaches a lookup.
static INVALID_KEY_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9_.-]").unwrap());

/// Normalize a key to its canonical form: disallowed characters stripped,
/// remainder uppercased.
///
/// Two keys differing only by case or by disallowed characters collide to the
/// same canonical key. Returns `None` when nothing survives the stripping;
/// such a key must never be stored or looked up.
pub fn normalize(key: &str) -> Option<String> {
    let cleaned = INVALID_KEY_CHARS.replace_all(key, "").to_uppercase();
    if cleaned.is_empty() { None } else { Some(cleaned) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("MY_KEY", "MY_KEY")]
    #[case("my_key", "MY_KEY")]
    #[case("My!Key", "MYKEY")]
    #[case("  spaced out  ", "SPACEDOUT")]
    #[case("dots.and-dashes", "DOTS.AND-DASHES")]
    #[case("The.Perfect.Name.nzb", "THE.PERFECT.NAME.NZB")]
    fn test_normalize(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize(raw).as_deref(), Some(expected));
    }

    #[rstest]
    #[case("")]
    #[case("!!!")]
    #[case("   ")]
    #[case("%$#@")]
    fn test_normalize_rejects_empty(#[case] raw: &str) {
        assert_eq!(normalize(raw), None);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize("My!Key").unwrap();
        assert_eq!(normalize(&once).unwrap(), once);
    }
}
