//! Operand evaluation against a single record

use std::borrow::Cow;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde_json::Value;

use super::ast::{Function, Operand};
use super::value::{kind_name, number_value};
use super::{QueryError, Result};

/// Evaluated operand: a value borrowed from the record or literal, a value
/// computed by a function, or `None` when a property is absent
pub type Evaluated<'a> = Option<Cow<'a, Value>>;

/// Largest magnitude a JavaScript-style date accepts, in milliseconds
const MAX_EPOCH_MILLIS: f64 = 8.64e15;

/// Evaluate an operand against a record
///
/// Function arguments are all evaluated, left to right, before the function
/// is applied.
pub fn evaluate_operand<'a>(record: &'a Value, operand: &'a Operand) -> Result<Evaluated<'a>> {
    match operand {
        Operand::Literal(value) => Ok(Some(Cow::Borrowed(value))),
        Operand::Property(path) => Ok(path.resolve(record).map(Cow::Borrowed)),
        Operand::Call { func, args } => {
            let values = args
                .iter()
                .map(|arg| evaluate_operand(record, arg))
                .collect::<Result<Vec<_>>>()?;
            let call = Args::new(func.name(), args, values);
            call.apply(*func).map(|v| Some(Cow::Owned(v)))
        }
    }
}

/// Evaluated arguments of one call, with typed accessors that fail with
/// `TypeMismatch`
pub(crate) struct Args<'a> {
    func: &'static str,
    operands: &'a [Operand],
    values: Vec<Evaluated<'a>>,
}

impl<'a> Args<'a> {
    pub(crate) fn new(func: &'static str, operands: &'a [Operand], values: Vec<Evaluated<'a>>) -> Self {
        Self {
            func,
            operands,
            values,
        }
    }

    fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index).and_then(|v| v.as_deref())
    }

    fn mismatch(&self, index: usize, expected: &str) -> QueryError {
        let shown = match self.operands.get(index) {
            Some(Operand::Property(path)) => format!(
                "{} ({})",
                self.value(index).map_or_else(|| "undefined".to_string(), Value::to_string),
                path
            ),
            Some(operand) => operand.to_string(),
            None => "missing argument".to_string(),
        };
        QueryError::TypeMismatch(format!(
            "{}() only works with {}; {} is {}",
            self.func,
            expected,
            shown,
            kind_name(self.value(index))
        ))
    }

    pub(crate) fn string(&self, index: usize) -> Result<&str> {
        match self.value(index) {
            Some(Value::String(s)) => Ok(s),
            _ => Err(self.mismatch(index, "strings")),
        }
    }

    fn number(&self, index: usize) -> Result<f64> {
        match self.value(index) {
            Some(Value::Number(n)) => n.as_f64().ok_or_else(|| self.mismatch(index, "numbers")),
            _ => Err(self.mismatch(index, "numbers")),
        }
    }

    fn date(&self, index: usize) -> Result<DateTime<Utc>> {
        let parsed = match self.value(index) {
            Some(Value::String(s)) => parse_date(s),
            Some(Value::Number(n)) => n.as_f64().and_then(date_from_millis),
            _ => return Err(self.mismatch(index, "strings or numbers")),
        };
        parsed.ok_or_else(|| self.mismatch(index, "valid dates"))
    }

    fn apply(&self, func: Function) -> Result<Value> {
        let value = match func {
            Function::ToLower => Value::String(self.string(0)?.to_lowercase()),
            Function::ToUpper => Value::String(self.string(0)?.to_uppercase()),
            Function::Trim => Value::String(self.string(0)?.trim().to_string()),
            Function::Length => Value::from(self.string(0)?.encode_utf16().count()),
            Function::Year => Value::from(self.date(0)?.year()),
            Function::Month => Value::from(self.date(0)?.month0()),
            Function::Day => Value::from(self.date(0)?.weekday().num_days_from_sunday()),
            Function::Hour => Value::from(self.date(0)?.hour()),
            Function::Minute => Value::from(self.date(0)?.minute()),
            Function::Second => Value::from(self.date(0)?.second()),
            Function::Round => {
                let x = self.number(0)?;
                let r = x.floor();
                number_value(if x - r >= 0.5 { r + 1.0 } else { r })
            }
            Function::Floor => number_value(self.number(0)?.floor()),
            Function::Ceiling => number_value(self.number(0)?.ceil()),
            Function::IndexOf => {
                let haystack = self.string(0)?;
                let needle = self.string(1)?;
                Value::from(utf16_index_of(haystack, needle))
            }
            Function::Concat | Function::Substring => {
                let mut joined = self.string(0)?.to_string();
                joined.push_str(self.string(1)?);
                Value::String(joined)
            }
            Function::Replace => {
                let subject = self.string(0)?;
                let from = self.string(1)?;
                let to = self.string(2)?;
                Value::String(subject.replace(from, to))
            }
        };
        Ok(value)
    }
}

/// Position of `needle` in `haystack` in UTF-16 code units, or -1
fn utf16_index_of(haystack: &str, needle: &str) -> i64 {
    haystack
        .find(needle)
        .map_or(-1, |byte| haystack[..byte].encode_utf16().count() as i64)
}

fn date_from_millis(millis: f64) -> Option<DateTime<Utc>> {
    if !millis.is_finite() || millis.abs() > MAX_EPOCH_MILLIS {
        return None;
    }
    DateTime::from_timestamp_millis(millis.trunc() as i64)
}

/// Parse RFC 3339 and the common ISO-8601 shapes; offset-less values are UTC
fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval(record: &Value, operand: &Operand) -> Result<Option<Value>> {
        evaluate_operand(record, operand).map(|v| v.map(Cow::into_owned))
    }

    fn call(func: Function, args: Vec<Operand>) -> Operand {
        Operand::call(func, args).unwrap()
    }

    fn prop(path: &str) -> Operand {
        Operand::property(path).unwrap()
    }

    #[test]
    fn test_literal_and_property() {
        let record = json!({ "a": { "b": 7 } });
        assert_eq!(eval(&record, &Operand::literal("x")).unwrap(), Some(json!("x")));
        assert_eq!(eval(&record, &prop("a/b")).unwrap(), Some(json!(7)));
        assert_eq!(eval(&record, &prop("a/missing/deep")).unwrap(), None);
    }

    #[test]
    fn test_string_functions() {
        let record = json!({ "name": "  Ada Lovelace " });
        let trimmed = call(Function::Trim, vec![prop("name")]);
        assert_eq!(eval(&record, &trimmed).unwrap(), Some(json!("Ada Lovelace")));
        assert_eq!(
            eval(&record, &call(Function::ToUpper, vec![trimmed.clone()])).unwrap(),
            Some(json!("ADA LOVELACE"))
        );
        assert_eq!(
            eval(&record, &call(Function::Length, vec![trimmed])).unwrap(),
            Some(json!(12))
        );
    }

    #[test]
    fn test_tolower_rejects_number() {
        let record = json!({});
        let err = eval(&record, &call(Function::ToLower, vec![Operand::literal(42)])).unwrap_err();
        assert!(matches!(err, QueryError::TypeMismatch(_)));
    }

    #[test]
    fn test_type_mismatch_names_property() {
        let record = json!({ "age": 42 });
        let err = eval(&record, &call(Function::ToUpper, vec![prop("age")])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Type mismatch: toupper() only works with strings; 42 (age) is number"
        );
    }

    #[test]
    fn test_missing_property_is_type_mismatch() {
        let record = json!({});
        let err = eval(&record, &call(Function::Trim, vec![prop("name")])).unwrap_err();
        assert!(matches!(err, QueryError::TypeMismatch(_)));
    }

    #[test]
    fn test_date_parts_use_zero_based_month_and_weekday() {
        // 2024-03-15 is a Friday
        let record = json!({ "at": "2024-03-15T10:20:30Z" });
        let part = |f| eval(&record, &call(f, vec![prop("at")])).unwrap();
        assert_eq!(part(Function::Year), Some(json!(2024)));
        assert_eq!(part(Function::Month), Some(json!(2)));
        assert_eq!(part(Function::Day), Some(json!(5)));
        assert_eq!(part(Function::Hour), Some(json!(10)));
        assert_eq!(part(Function::Minute), Some(json!(20)));
        assert_eq!(part(Function::Second), Some(json!(30)));
    }

    #[test]
    fn test_date_from_epoch_millis() {
        let record = json!({ "at": 0 });
        assert_eq!(
            eval(&record, &call(Function::Year, vec![prop("at")])).unwrap(),
            Some(json!(1970))
        );
        // 1970-01-01 was a Thursday
        assert_eq!(
            eval(&record, &call(Function::Day, vec![prop("at")])).unwrap(),
            Some(json!(4))
        );
    }

    #[test]
    fn test_invalid_date_is_type_mismatch() {
        let record = json!({ "at": "not a date", "flag": true });
        for path in ["at", "flag"] {
            let err = eval(&record, &call(Function::Year, vec![prop(path)])).unwrap_err();
            assert!(matches!(err, QueryError::TypeMismatch(_)));
        }
    }

    #[test]
    fn test_numeric_functions() {
        let record = json!({ "x": 2.5, "y": -2.5 });
        let apply = |f, p| eval(&record, &call(f, vec![prop(p)])).unwrap();
        assert_eq!(apply(Function::Round, "x"), Some(json!(3)));
        assert_eq!(apply(Function::Round, "y"), Some(json!(-2)));
        assert_eq!(apply(Function::Floor, "x"), Some(json!(2)));
        assert_eq!(apply(Function::Ceiling, "y"), Some(json!(-2)));

        let round = |x: f64| eval(&record, &call(Function::Round, vec![Operand::literal(x)])).unwrap();
        assert_eq!(round(4503599627370497.0), Some(json!(4503599627370497i64)));
        assert_eq!(round(0.49999999999999994), Some(json!(0)));
        assert_eq!(round(-0.5), Some(json!(0)));

        let err = eval(&record, &call(Function::Floor, vec![Operand::literal("2.5")])).unwrap_err();
        assert!(matches!(err, QueryError::TypeMismatch(_)));
    }

    #[test]
    fn test_two_and_three_argument_functions() {
        let record = json!({ "s": "banana" });
        let apply = |f, extra: Vec<Operand>| {
            let mut args = vec![prop("s")];
            args.extend(extra);
            eval(&record, &call(f, args)).unwrap()
        };
        assert_eq!(apply(Function::IndexOf, vec![Operand::literal("nan")]), Some(json!(2)));
        assert_eq!(apply(Function::IndexOf, vec![Operand::literal("x")]), Some(json!(-1)));
        assert_eq!(apply(Function::Concat, vec![Operand::literal("s")]), Some(json!("bananas")));
        assert_eq!(
            apply(Function::Replace, vec![Operand::literal("a"), Operand::literal("o")]),
            Some(json!("bonono"))
        );
    }

    #[test]
    fn test_substring_concatenates() {
        let record = json!({ "s": "abc" });
        let op = call(Function::Substring, vec![prop("s"), Operand::literal("1")]);
        assert_eq!(eval(&record, &op).unwrap(), Some(json!("abc1")));
    }

    #[test]
    fn test_arguments_evaluated_before_failing() {
        // second argument is evaluated even though the first already mismatches
        let record = json!({ "n": 1 });
        let inner = call(Function::ToLower, vec![Operand::literal(5)]);
        let op = call(Function::Concat, vec![prop("n"), inner]);
        let err = eval(&record, &op).unwrap_err();
        assert!(err.to_string().contains("tolower()"));
    }
}
