//! Weak coercion of raw layer values into leaf types.
//!
//! Files yield typed values, but environment variables and flags are plain
//! strings, and YAML happily produces a number where a string was meant. A
//! raw value is first deserialized as is; if that fails, a small set of
//! reinterpretations is tried before giving up with the original error.

use serde::de::DeserializeOwned;
use serde_json::{Number, Value};

/// Convert `raw` into `T`, trying weak reinterpretations on failure.
pub(crate) fn coerce<T: DeserializeOwned>(raw: &Value) -> Result<T, String> {
    let first = match T::deserialize(raw) {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };
    for candidate in candidates(raw) {
        if let Ok(value) = T::deserialize(&candidate) {
            return Ok(value);
        }
    }
    Err(first.to_string())
}

/// Parse a string into the most specific scalar it spells.
/// Tries: bool → integer → float → string.
pub(crate) fn parse_scalar(s: &str) -> Value {
    let trimmed = s.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Ok(u) = trimmed.parse::<u64>() {
        return Value::Number(u.into());
    }
    // Only floats with a dot, so "NaN" and "inf" stay strings.
    if trimmed.contains('.') {
        if let Some(n) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(n);
        }
    }
    Value::String(s.to_string())
}

fn candidates(raw: &Value) -> Vec<Value> {
    match raw {
        Value::String(s) => string_candidates(s),
        Value::Bool(b) => vec![Value::String(b.to_string()), Value::Array(vec![raw.clone()])],
        Value::Number(n) => {
            let mut out = vec![Value::String(n.to_string())];
            if let Some(i) = n.as_i64() {
                if i == 0 || i == 1 {
                    out.push(Value::Bool(i == 1));
                }
            }
            out.push(Value::Array(vec![raw.clone()]));
            out
        }
        Value::Array(items) => vec![Value::Array(items.iter().map(stringify).collect())],
        Value::Object(_) | Value::Null => Vec::new(),
    }
}

fn string_candidates(s: &str) -> Vec<Value> {
    let mut out = Vec::new();
    if s.trim().is_empty() {
        out.extend([
            Value::Null,
            Value::Bool(false),
            Value::Number(0.into()),
            Value::Array(Vec::new()),
        ]);
        return out;
    }

    let scalar = parse_scalar(s);
    if !scalar.is_string() {
        out.push(scalar);
    }
    match s.trim() {
        "1" | "t" | "T" => out.push(Value::Bool(true)),
        "0" | "f" | "F" => out.push(Value::Bool(false)),
        _ => {}
    }

    let trimmed = s.trim_start();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        if let Ok(parsed) = serde_json::from_str::<Value>(s) {
            out.push(parsed);
        }
    }

    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    out.push(Value::Array(
        parts.iter().map(|p| Value::String(p.to_string())).collect(),
    ));
    out.push(Value::Array(parts.iter().map(|p| parse_scalar(p)).collect()));
    out
}

fn stringify(value: &Value) -> Value {
    match value {
        Value::Bool(b) => Value::String(b.to_string()),
        Value::Number(n) => Value::String(n.to_string()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn exact_types_pass_through() {
        assert_eq!(coerce::<u16>(&json!(8080)).unwrap(), 8080);
        assert_eq!(coerce::<String>(&json!("x")).unwrap(), "x");
        assert_eq!(coerce::<Option<bool>>(&json!(null)).unwrap(), None);
    }

    #[test]
    fn strings_become_scalars() {
        assert_eq!(coerce::<u16>(&json!("8080")).unwrap(), 8080);
        assert_eq!(coerce::<i64>(&json!("-5")).unwrap(), -5);
        assert_eq!(coerce::<f64>(&json!("1.5")).unwrap(), 1.5);
        assert!(coerce::<bool>(&json!("TRUE")).unwrap());
        assert!(coerce::<bool>(&json!("1")).unwrap());
        assert_eq!(coerce::<Option<bool>>(&json!("false")).unwrap(), Some(false));
    }

    #[test]
    fn scalars_become_strings() {
        assert_eq!(coerce::<String>(&json!(42)).unwrap(), "42");
        assert_eq!(coerce::<String>(&json!(true)).unwrap(), "true");
    }

    #[test]
    fn comma_separated_string_becomes_sequence() {
        assert_eq!(coerce::<Vec<String>>(&json!("a, b,c")).unwrap(), ["a", "b", "c"]);
        assert_eq!(coerce::<Vec<u32>>(&json!("1,2,3")).unwrap(), [1, 2, 3]);
    }

    #[test]
    fn json_literal_string_becomes_sequence() {
        assert_eq!(coerce::<Vec<u32>>(&json!("[1, 2]")).unwrap(), [1, 2]);
    }

    #[test]
    fn empty_string_is_honored() {
        assert_eq!(coerce::<String>(&json!("")).unwrap(), "");
        assert_eq!(coerce::<Vec<String>>(&json!("")).unwrap(), Vec::<String>::new());
        assert_eq!(coerce::<Option<u8>>(&json!("")).unwrap(), None);
        assert_eq!(coerce::<u8>(&json!("")).unwrap(), 0);
    }

    #[test]
    fn numeric_sequence_into_strings() {
        assert_eq!(coerce::<Vec<String>>(&json!([1, 2])).unwrap(), ["1", "2"]);
    }

    #[test]
    fn single_scalar_wraps_into_sequence() {
        assert_eq!(coerce::<Vec<u8>>(&json!(7)).unwrap(), [7]);
    }

    #[test]
    fn failure_keeps_original_error() {
        let err = coerce::<u16>(&json!("not-a-port")).unwrap_err();
        assert!(err.contains("u16"), "unexpected error: {err}");
    }

    #[test]
    fn parse_scalar_prefers_bool_then_number() {
        assert_eq!(parse_scalar("false"), json!(false));
        assert_eq!(parse_scalar("3000"), json!(3000));
        assert_eq!(parse_scalar("1.25"), json!(1.25));
        assert_eq!(parse_scalar("NaN"), json!("NaN"));
        assert_eq!(parse_scalar("hello world"), json!("hello world"));
    }
}
