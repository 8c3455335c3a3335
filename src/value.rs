//! Value coercions between the JSON data graph and UI channels.
//!
//! The rules mirror what a script host does when a value lands in a text or
//! value channel: `null`/undefined render as nothing, integral numbers drop
//! their fraction, arrays join with commas.

use serde_json::{Number, Value};
use tracing::warn;

/// Most clones a single numeric expansion target may produce.
pub const MAX_EXPANSION_COUNT: usize = 10_000;

/// Text for a value channel. `None` is undefined and renders as nothing.
pub fn display_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => display_number(n),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| display_text(Some(item)))
            .collect::<Vec<_>>()
            .join(","),
        Some(Value::Object(_)) => "[object Object]".to_string(),
    }
}

fn display_number(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    let f = n.as_f64().unwrap_or(f64::NAN);
    let magnitude = f.abs();
    if f == 0.0 {
        "0".to_string()
    } else if magnitude >= 1e21 || magnitude < 1e-6 {
        exponent_form(f)
    } else if f.fract() == 0.0 {
        format!("{:.0}", f)
    } else {
        f.to_string()
    }
}

/// `1e-7`, `1.5e+21`: shortest digits, signed positive exponent.
fn exponent_form(f: f64) -> String {
    let formatted = format!("{:e}", f);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{}e+{}", mantissa, exponent)
        }
        _ => formatted,
    }
}

pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Applies a marker scale. Numbers are multiplied; anything else passes
/// through untouched. A product that JSON cannot hold becomes `None`.
pub fn scale(value: &Value, factor: f64) -> Option<Value> {
    match value {
        Value::Number(n) => {
            let product = n.as_f64()? * factor;
            Number::from_f64(product).map(Value::Number)
        }
        other => Some(other.clone()),
    }
}

/// Number of clones a numeric expansion target produces: round half up,
/// negative, NaN and infinite counts produce none. Capped at
/// [`MAX_EXPANSION_COUNT`].
pub fn expansion_count(target: f64) -> usize {
    if !target.is_finite() || target <= 0.0 {
        return 0;
    }
    let rounded = (target + 0.5).floor();
    if rounded > MAX_EXPANSION_COUNT as f64 {
        warn!(count = target, cap = MAX_EXPANSION_COUNT, "capping numeric expansion");
        return MAX_EXPANSION_COUNT;
    }
    rounded as usize
}

pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_text() {
        assert_eq!(display_text(None), "");
        assert_eq!(display_text(Some(&json!(null))), "");
        assert_eq!(display_text(Some(&json!(true))), "true");
        assert_eq!(display_text(Some(&json!(42))), "42");
        assert_eq!(display_text(Some(&json!(-7))), "-7");
        assert_eq!(display_text(Some(&json!(6.0))), "6");
        assert_eq!(display_text(Some(&json!(0.25))), "0.25");
        assert_eq!(display_text(Some(&json!("hi"))), "hi");
        assert_eq!(display_text(Some(&json!([1, null, "x"]))), "1,,x");
        assert_eq!(display_text(Some(&json!({"a": 1}))), "[object Object]");
    }

    #[test]
    fn test_extreme_floats_use_exponent_form() {
        assert_eq!(display_text(Some(&json!(1e-7))), "1e-7");
        assert_eq!(display_text(Some(&json!(-2.5e-9))), "-2.5e-9");
        assert_eq!(display_text(Some(&json!(0.000001))), "0.000001");
        assert_eq!(display_text(Some(&json!(1.5e21))), "1.5e+21");
        assert_eq!(display_text(Some(&json!(1e21))), "1e+21");
        assert_eq!(display_text(Some(&json!(1e20))), "100000000000000000000");
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(None));
        assert!(!is_truthy(Some(&json!(null))));
        assert!(!is_truthy(Some(&json!(false))));
        assert!(!is_truthy(Some(&json!(0))));
        assert!(!is_truthy(Some(&json!(0.0))));
        assert!(!is_truthy(Some(&json!(""))));
        assert!(is_truthy(Some(&json!("0"))));
        assert!(is_truthy(Some(&json!(3))));
        assert!(is_truthy(Some(&json!([]))));
        assert!(is_truthy(Some(&json!({}))));
    }

    #[test]
    fn test_scale_numbers() {
        assert_eq!(scale(&json!(3), 2.0), Some(json!(6.0)));
        assert_eq!(display_text(scale(&json!(0.5), 100.0).as_ref()), "50");
    }

    // Scaling a non-number is not coerced; the value comes back as it was.
    #[test]
    fn test_scale_non_numeric_passes_through() {
        assert_eq!(scale(&json!("12"), 2.0), Some(json!("12")));
        assert_eq!(scale(&json!(true), 2.0), Some(json!(true)));
        assert_eq!(scale(&json!({"a": 1}), 2.0), Some(json!({"a": 1})));
    }

    #[test]
    fn test_scale_overflow_is_undefined() {
        assert_eq!(scale(&json!(1e308), 1e10), None);
    }

    #[test]
    fn test_expansion_count_rounds_half_up() {
        assert_eq!(expansion_count(3.6), 4);
        assert_eq!(expansion_count(3.4), 3);
        assert_eq!(expansion_count(2.5), 3);
        assert_eq!(expansion_count(0.49), 0);
        assert_eq!(expansion_count(-2.0), 0);
        assert_eq!(expansion_count(f64::NAN), 0);
        assert_eq!(expansion_count(f64::INFINITY), 0);
    }

    #[test]
    fn test_expansion_count_is_capped() {
        assert_eq!(expansion_count(1e15), MAX_EXPANSION_COUNT);
        assert_eq!(expansion_count(MAX_EXPANSION_COUNT as f64), MAX_EXPANSION_COUNT);
        assert_eq!(expansion_count(MAX_EXPANSION_COUNT as f64 - 1.0), MAX_EXPANSION_COUNT - 1);
    }
}
