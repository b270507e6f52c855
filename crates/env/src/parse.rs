//! Parsing helpers for option values.

use regex::Regex;
use std::sync::LazyLock;

// Delimiters used to separate values when a list is passed in as one string.
static LIST_DELIMITERS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\\/\[\]:;,\s]+").unwrap());

/// Split a delimited option string into its entries.
///
/// The host and its configuration UI are loose about separators; commas,
/// semicolons, colons, brackets, slashes and whitespace all count. Empty
/// entries are dropped.
pub fn parse_list(content: &str) -> Vec<String> {
    LIST_DELIMITERS
        .split(content)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse the spellings of a boolean the host and its users produce.
///
/// Returns `None` for anything unrecognized so the caller can apply its own
/// default.
pub fn parse_bool(content: &str) -> Option<bool> {
    match content.trim().to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" | "on" | "enable" | "enabled" => Some(true),
        "false" | "no" | "n" | "0" | "off" | "disable" | "disabled" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("a,b,c", &["a", "b", "c"])]
    #[case("a, b ;c", &["a", "b", "c"])]
    #[case("one/two\\three", &["one", "two", "three"])]
    #[case("[bracketed:entries]", &["bracketed", "entries"])]
    #[case("", &[])]
    #[case(",,;;", &[])]
    #[case("single", &["single"])]
    fn test_parse_list(#[case] content: &str, #[case] expected: &[&str]) {
        assert_eq!(parse_list(content), expected);
    }

    #[rstest]
    #[case("yes", Some(true))]
    #[case("Yes", Some(true))]
    #[case(" on ", Some(true))]
    #[case("1", Some(true))]
    #[case("enabled", Some(true))]
    #[case("no", Some(false))]
    #[case("OFF", Some(false))]
    #[case("0", Some(false))]
    #[case("disable", Some(false))]
    #[case("maybe", None)]
    #[case("", None)]
    fn test_parse_bool(#[case] content: &str, #[case] expected: Option<bool>) {
        assert_eq!(parse_bool(content), expected);
    }
}
