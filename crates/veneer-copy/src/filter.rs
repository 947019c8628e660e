//! Property filters
//!
//! A filter decides, per planned step, whether the source value is written
//! to the target property. Filters compose with `and`/`or`/`negate`, and
//! any matching closure is a filter.

use veneer_core::Value;

/// Accept or reject one copy step
pub trait CopyFilter: Send + Sync {
    /// `true` keeps the step, `false` skips it.
    fn accept(
        &self,
        source_name: &str,
        source_value: &Value,
        target_name: &str,
        target_value: &Value,
    ) -> bool;

    /// Both filters must accept.
    fn and<F: CopyFilter>(self, other: F) -> And<Self, F>
    where
        Self: Sized,
    {
        And(self, other)
    }

    /// Either filter may accept.
    fn or<F: CopyFilter>(self, other: F) -> Or<Self, F>
    where
        Self: Sized,
    {
        Or(self, other)
    }

    /// Invert the decision.
    fn negate(self) -> Negate<Self>
    where
        Self: Sized,
    {
        Negate(self)
    }
}

impl<F> CopyFilter for F
where
    F: Fn(&str, &Value, &str, &Value) -> bool + Send + Sync,
{
    fn accept(&self, sn: &str, sv: &Value, tn: &str, tv: &Value) -> bool {
        self(sn, sv, tn, tv)
    }
}

pub struct And<A, B>(A, B);

impl<A: CopyFilter, B: CopyFilter> CopyFilter for And<A, B> {
    fn accept(&self, sn: &str, sv: &Value, tn: &str, tv: &Value) -> bool {
        self.0.accept(sn, sv, tn, tv) && self.1.accept(sn, sv, tn, tv)
    }
}

pub struct Or<A, B>(A, B);

impl<A: CopyFilter, B: CopyFilter> CopyFilter for Or<A, B> {
    fn accept(&self, sn: &str, sv: &Value, tn: &str, tv: &Value) -> bool {
        self.0.accept(sn, sv, tn, tv) || self.1.accept(sn, sv, tn, tv)
    }
}

pub struct Negate<A>(A);

impl<A: CopyFilter> CopyFilter for Negate<A> {
    fn accept(&self, sn: &str, sv: &Value, tn: &str, tv: &Value) -> bool {
        !self.0.accept(sn, sv, tn, tv)
    }
}

/// Always copies
pub struct Overwrite;

impl CopyFilter for Overwrite {
    fn accept(&self, _: &str, _: &Value, _: &str, _: &Value) -> bool {
        true
    }
}

/// Copies only when the target property is currently null
pub struct IfAbsent;

impl CopyFilter for IfAbsent {
    fn accept(&self, _: &str, _: &Value, _: &str, target_value: &Value) -> bool {
        target_value.is_null()
    }
}

/// Skips null source values
pub struct IgnoreNull;

impl CopyFilter for IgnoreNull {
    fn accept(&self, _: &str, source_value: &Value, _: &str, _: &Value) -> bool {
        !source_value.is_null()
    }
}

/// Skips source properties by name
pub struct IgnoreProperties(Vec<String>);

impl IgnoreProperties {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        IgnoreProperties(names.into_iter().map(Into::into).collect())
    }
}

impl CopyFilter for IgnoreProperties {
    fn accept(&self, source_name: &str, _: &Value, _: &str, _: &Value) -> bool {
        !self.0.iter().any(|n| n == source_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accepts(f: &dyn CopyFilter, sv: &Value, tv: &Value) -> bool {
        f.accept("a", sv, "a", tv)
    }

    #[test]
    fn test_stock_filters() {
        assert!(accepts(&Overwrite, &Value::Null, &Value::Int(1)));
        assert!(accepts(&IfAbsent, &Value::Int(1), &Value::Null));
        assert!(!accepts(&IfAbsent, &Value::Int(1), &Value::Int(2)));
        assert!(accepts(&IgnoreNull, &Value::Int(1), &Value::Null));
        assert!(!accepts(&IgnoreNull, &Value::Null, &Value::Null));
    }

    #[test]
    fn test_ignore_properties() {
        let f = IgnoreProperties::new(["secret"]);
        assert!(!f.accept("secret", &Value::Int(1), "secret", &Value::Null));
        assert!(f.accept("public", &Value::Int(1), "public", &Value::Null));
    }

    #[test]
    fn test_combinators() {
        let both = IgnoreNull.and(IfAbsent);
        assert!(both.accept("a", &Value::Int(1), "a", &Value::Null));
        assert!(!both.accept("a", &Value::Int(1), "a", &Value::Int(2)));
        assert!(!both.accept("a", &Value::Null, "a", &Value::Null));

        let either = IgnoreNull.or(IfAbsent);
        assert!(either.accept("a", &Value::Null, "a", &Value::Null));

        let inverted = IgnoreNull.negate();
        assert!(inverted.accept("a", &Value::Null, "a", &Value::Null));
        assert!(!inverted.accept("a", &Value::Int(1), "a", &Value::Null));
    }

    #[test]
    fn test_closure_filter() {
        let only_counters = |sn: &str, _: &Value, _: &str, _: &Value| sn.starts_with("count");
        assert!(only_counters.accept("count_a", &Value::Int(1), "count_a", &Value::Null));
        assert!(!only_counters.accept("name", &Value::Int(1), "name", &Value::Null));
    }
}
