//! Value coercion for the environment wire format.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// A value on its way into the environment, the host message stream, or the
/// keystore.
///
/// Everything ends up as a string on the wire; the only interesting coercion
/// is that booleans travel as `0`/`1` so that every script in the chain parses
/// them the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Free-form text, stored as-is.
    Text(String),
    /// A boolean flag; serialized as `0`/`1`.
    Flag(bool),
    /// A signed integer; serialized in decimal.
    Int(i64),
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Value::Text(text) => f.write_str(text),
            Value::Flag(flag) => f.write_str(if *flag { "1" } else { "0" }),
            Value::Int(number) => write!(f, "{number}"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}
impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}
impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Flag(value)
    }
}
impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}
impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(i64::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Value::from("plain text"), "plain text")]
    #[case(Value::from(true), "1")]
    #[case(Value::from(false), "0")]
    #[case(Value::from(-42i64), "-42")]
    #[case(Value::from(7u32), "7")]
    fn test_wire_form(#[case] value: Value, #[case] expected: &str) {
        assert_eq!(value.to_string(), expected);
    }
}
