//! Value converters
//!
//! A converter adapts a source value to the tag of the target property.
//! Returning `None` skips the write, so a converter doubles as a
//! per-value filter. `SmartConvert` covers the common coercions between
//! primitive tags, strings and delimited lists.

use veneer_core::{TypeTag, Value};

/// Adapt a source value for a target property
pub trait Convert: Send + Sync {
    /// Produce the value to write, or `None` to skip the property.
    fn convert(&self, value: &Value, target: &TypeTag, property: &str) -> Option<Value>;
}

impl<F> Convert for F
where
    F: Fn(&Value, &TypeTag, &str) -> Option<Value> + Send + Sync,
{
    fn convert(&self, value: &Value, target: &TypeTag, property: &str) -> Option<Value> {
        self(value, target, property)
    }
}

/// Best-effort coercion between tags
///
/// Nulls are never written. Values already matching the target tag pass
/// through unchanged. Otherwise: int and float convert into each other,
/// strings parse into numbers, numbers become booleans by zero-test,
/// strings split on `,` into lists, and anything stringifies via
/// `Display`. Unconvertible pairs yield `None`.
pub struct SmartConvert;

impl SmartConvert {
    const DELIMITER: char = ',';
}

impl Convert for SmartConvert {
    fn convert(&self, value: &Value, target: &TypeTag, _property: &str) -> Option<Value> {
        if value.is_null() {
            return None;
        }
        if value.matches(target) {
            return Some(value.clone());
        }
        match (value, target) {
            (Value::Int(i), TypeTag::Float) => Some(Value::Float(*i as f64)),
            (Value::Float(x), TypeTag::Int) => Some(Value::Int(*x as i64)),
            (Value::Str(s), TypeTag::Int) => {
                let trimmed = s.trim();
                trimmed
                    .parse::<i64>()
                    .ok()
                    .or_else(|| trimmed.parse::<f64>().ok().map(|x| x as i64))
                    .map(Value::Int)
            }
            (Value::Str(s), TypeTag::Float) => s.trim().parse::<f64>().ok().map(Value::Float),
            (Value::Int(i), TypeTag::Bool) => Some(Value::Bool(*i != 0)),
            (Value::Float(x), TypeTag::Bool) => Some(Value::Bool(*x != 0.0)),
            (Value::Str(s), TypeTag::List) => {
                if s.is_empty() {
                    return Some(Value::List(Vec::new()));
                }
                let items = s
                    .split(Self::DELIMITER)
                    .map(|part| Value::Str(part.to_string()))
                    .collect();
                Some(Value::List(items))
            }
            (other, TypeTag::Str) => Some(Value::Str(other.to_string())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smart(value: Value, target: TypeTag) -> Option<Value> {
        SmartConvert.convert(&value, &target, "p")
    }

    #[test]
    fn test_null_is_skipped() {
        assert_eq!(smart(Value::Null, TypeTag::Str), None);
        assert_eq!(smart(Value::Null, TypeTag::Any), None);
    }

    #[test]
    fn test_matching_values_pass_through() {
        assert_eq!(smart(Value::Int(7), TypeTag::Int), Some(Value::Int(7)));
        assert_eq!(
            smart(Value::Str("x".into()), TypeTag::Any),
            Some(Value::Str("x".into()))
        );
    }

    #[test]
    fn test_numeric_coercions() {
        assert_eq!(smart(Value::Int(2), TypeTag::Float), Some(Value::Float(2.0)));
        assert_eq!(smart(Value::Float(2.9), TypeTag::Int), Some(Value::Int(2)));
        assert_eq!(smart(Value::Str(" 42 ".into()), TypeTag::Int), Some(Value::Int(42)));
        assert_eq!(smart(Value::Str("3.5".into()), TypeTag::Int), Some(Value::Int(3)));
        assert_eq!(
            smart(Value::Str("3.5".into()), TypeTag::Float),
            Some(Value::Float(3.5))
        );
        assert_eq!(smart(Value::Str("nope".into()), TypeTag::Int), None);
    }

    #[test]
    fn test_bool_by_zero_test() {
        assert_eq!(smart(Value::Int(0), TypeTag::Bool), Some(Value::Bool(false)));
        assert_eq!(smart(Value::Int(-3), TypeTag::Bool), Some(Value::Bool(true)));
        assert_eq!(smart(Value::Float(0.0), TypeTag::Bool), Some(Value::Bool(false)));
    }

    #[test]
    fn test_string_splits_into_list() {
        assert_eq!(
            smart(Value::Str("a,b".into()), TypeTag::List),
            Some(Value::List(vec![Value::Str("a".into()), Value::Str("b".into())]))
        );
        assert_eq!(
            smart(Value::Str(String::new()), TypeTag::List),
            Some(Value::List(Vec::new()))
        );
    }

    #[test]
    fn test_anything_stringifies() {
        assert_eq!(smart(Value::Int(5), TypeTag::Str), Some(Value::Str("5".into())));
        assert_eq!(
            smart(Value::List(vec![Value::Int(1), Value::Int(2)]), TypeTag::Str),
            Some(Value::Str("1,2".into()))
        );
        assert_eq!(smart(Value::Bool(true), TypeTag::Str), Some(Value::Str("true".into())));
    }

    #[test]
    fn test_unconvertible_pairs_skip() {
        assert_eq!(smart(Value::Bool(true), TypeTag::List), None);
        assert_eq!(smart(Value::List(vec![]), TypeTag::Int), None);
    }

    #[test]
    fn test_closure_converter() {
        let negate = |v: &Value, _: &TypeTag, _: &str| v.as_int().map(|i| Value::Int(-i));
        assert_eq!(negate.convert(&Value::Int(4), &TypeTag::Int, "n"), Some(Value::Int(-4)));
        assert_eq!(negate.convert(&Value::Str("x".into()), &TypeTag::Int, "n"), None);
    }
}
