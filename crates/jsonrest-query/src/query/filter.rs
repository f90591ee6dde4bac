//! Filter compilation and the filter stage

use std::cmp::Ordering;

use serde::Serialize;
use serde_json::Value;

use super::ast::{ComparisonOp, Filter, StringPredicate};
use super::operand::{evaluate_operand, Args};
use super::value::{partial_order, strict_eq};
use super::{Result, Staged};

/// A compiled filter, applied once per record
pub type Predicate<'f> = Box<dyn Fn(&Value) -> Result<bool> + Send + Sync + 'f>;

/// Summary fragment for the filter stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterSummary {
    /// The filter that was applied, `null` when none
    pub filter: Option<Filter>,
}

impl ComparisonOp {
    /// Apply the operator to two evaluated operands
    pub fn apply(&self, left: Option<&Value>, right: Option<&Value>) -> bool {
        match self {
            ComparisonOp::Eq => strict_eq(left, right),
            ComparisonOp::Ne => !strict_eq(left, right),
            ComparisonOp::Lt => partial_order(left, right) == Some(Ordering::Less),
            ComparisonOp::Le => matches!(
                partial_order(left, right),
                Some(Ordering::Less | Ordering::Equal)
            ),
            ComparisonOp::Gt => partial_order(left, right) == Some(Ordering::Greater),
            ComparisonOp::Ge => matches!(
                partial_order(left, right),
                Some(Ordering::Greater | Ordering::Equal)
            ),
        }
    }
}

impl StringPredicate {
    /// Apply the predicate to its two string arguments, in call order
    pub fn apply(&self, first: &str, second: &str) -> bool {
        match self {
            StringPredicate::StartsWith => first.starts_with(second),
            StringPredicate::EndsWith => first.ends_with(second),
            // needle first, haystack second
            StringPredicate::SubstringOf => second.contains(first),
        }
    }
}

/// Compile a filter tree into a reusable predicate
///
/// `and` skips its right side when the left side is false, and `or` skips
/// its right side when the left side is true, so errors on the skipped side
/// are never raised.
pub fn compile<'f>(filter: &'f Filter) -> Predicate<'f> {
    match filter {
        Filter::Comparison { op, left, right } => Box::new(move |record: &Value| {
            let l = evaluate_operand(record, left)?;
            let r = evaluate_operand(record, right)?;
            Ok(op.apply(l.as_deref(), r.as_deref()))
        }),
        Filter::And(left, right) => {
            let (left, right) = (compile(left), compile(right));
            Box::new(move |record: &Value| Ok(left(record)? && right(record)?))
        }
        Filter::Or(left, right) => {
            let (left, right) = (compile(left), compile(right));
            Box::new(move |record: &Value| Ok(left(record)? || right(record)?))
        }
        Filter::Predicate { func, args } => Box::new(move |record: &Value| {
            let values = args
                .iter()
                .map(|arg| evaluate_operand(record, arg))
                .collect::<Result<Vec<_>>>()?;
            let call = Args::new(func.name(), args, values);
            Ok(func.apply(call.string(0)?, call.string(1)?))
        }),
    }
}

/// Filter stage: keep the records the filter accepts, in input order
///
/// No filter passes every record through unchanged. The first evaluation
/// error aborts the stage.
pub fn filter_records(data: Vec<Value>, filter: Option<&Filter>) -> Result<Staged<FilterSummary>> {
    let Some(filter) = filter else {
        return Ok(Staged::new(data, FilterSummary { filter: None }));
    };

    let predicate = compile(filter);
    let mut kept = Vec::with_capacity(data.len());
    for record in data {
        if predicate(&record)? {
            kept.push(record);
        }
    }

    Ok(Staged::new(
        kept,
        FilterSummary {
            filter: Some(filter.clone()),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ast::{Function, Operand};
    use crate::query::QueryError;
    use serde_json::json;

    fn prop(path: &str) -> Operand {
        Operand::property(path).unwrap()
    }

    fn cmp(op: ComparisonOp, path: &str, value: Value) -> Filter {
        Filter::compare(op, prop(path), Operand::Literal(value))
    }

    /// A filter that fails with TypeMismatch on every record
    fn explosive() -> Filter {
        Filter::compare(
            ComparisonOp::Eq,
            Operand::call(Function::ToLower, vec![Operand::literal(42)]).unwrap(),
            Operand::literal("x"),
        )
    }

    fn always(value: bool) -> Filter {
        Filter::compare(ComparisonOp::Eq, Operand::literal(true), Operand::literal(value))
    }

    #[test]
    fn test_no_filter_is_identity() {
        let data = vec![json!({ "a": 2 }), json!({ "a": 1 })];
        let staged = filter_records(data.clone(), None).unwrap();
        assert_eq!(staged.data, data);
        assert_eq!(staged.summary.filter, None);
    }

    #[test]
    fn test_comparison_operators() {
        let record = json!({ "n": 5, "s": "b" });
        let check = |op, path: &str, v: Value| compile(&cmp(op, path, v))(&record).unwrap();
        assert!(check(ComparisonOp::Eq, "n", json!(5.0)));
        assert!(check(ComparisonOp::Ne, "n", json!("5")));
        assert!(check(ComparisonOp::Lt, "n", json!(6)));
        assert!(check(ComparisonOp::Le, "n", json!(5)));
        assert!(check(ComparisonOp::Gt, "s", json!("a")));
        assert!(check(ComparisonOp::Ge, "s", json!("b")));
        assert!(!check(ComparisonOp::Lt, "s", json!(10)));
        assert!(!check(ComparisonOp::Gt, "missing", json!(0)));
    }

    #[test]
    fn test_eq_null_and_absent() {
        let record = json!({ "a": null });
        assert!(compile(&cmp(ComparisonOp::Eq, "a", Value::Null))(&record).unwrap());
        assert!(!compile(&cmp(ComparisonOp::Eq, "b", Value::Null))(&record).unwrap());
        assert!(compile(&cmp(ComparisonOp::Ne, "b", Value::Null))(&record).unwrap());
    }

    #[test]
    fn test_and_short_circuits() {
        let filter = Filter::and(always(false), explosive());
        assert!(!compile(&filter)(&json!({})).unwrap());
    }

    #[test]
    fn test_or_short_circuits() {
        let filter = Filter::or(always(true), explosive());
        assert!(compile(&filter)(&json!({})).unwrap());
    }

    #[test]
    fn test_right_side_evaluated_when_needed() {
        let filter = Filter::and(always(true), explosive());
        assert!(matches!(
            compile(&filter)(&json!({})),
            Err(QueryError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_string_predicates() {
        let record = json!({ "name": "John" });
        let check = |func, first: Operand, second: Operand| {
            compile(&Filter::predicate(func, first, second))(&record).unwrap()
        };
        assert!(check(StringPredicate::StartsWith, prop("name"), Operand::literal("Jo")));
        assert!(check(StringPredicate::EndsWith, prop("name"), Operand::literal("hn")));
        assert!(check(StringPredicate::SubstringOf, Operand::literal("oh"), prop("name")));
        assert!(!check(StringPredicate::SubstringOf, prop("name"), Operand::literal("oh")));
    }

    #[test]
    fn test_string_predicate_requires_strings() {
        let filter = Filter::predicate(StringPredicate::StartsWith, prop("age"), Operand::literal("4"));
        let err = compile(&filter)(&json!({ "age": 42 })).unwrap_err();
        assert!(matches!(err, QueryError::TypeMismatch(_)));
        assert!(err.to_string().contains("startswith()"));
    }

    #[test]
    fn test_filter_records_keeps_order() {
        let data = vec![
            json!({ "name": "John" }),
            json!({ "name": "Amy" }),
            json!({ "name": "Joan" }),
        ];
        let filter = Filter::predicate(StringPredicate::StartsWith, prop("name"), Operand::literal("Jo"));
        let staged = filter_records(data, Some(&filter)).unwrap();
        assert_eq!(staged.data, vec![json!({ "name": "John" }), json!({ "name": "Joan" })]);
        assert_eq!(staged.summary.filter, Some(filter));
    }

    #[test]
    fn test_filter_records_propagates_errors() {
        let data = vec![json!({ "name": 1 })];
        let filter = Filter::predicate(StringPredicate::EndsWith, prop("name"), Operand::literal("x"));
        assert!(filter_records(data, Some(&filter)).is_err());
    }
}
