//! Filter expression AST
//!
//! Serializes to the JSON shape OData parsers conventionally emit
//! (`{"type": "eq", "left": ..., "right": ...}`), which is what the query
//! summary echoes back to clients.

use std::fmt;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use super::path::PropertyPath;
use super::{QueryError, Result};

/// A value-producing expression, evaluated against one record
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Property lookup: `address/city`
    Property(PropertyPath),
    /// Embedded scalar: `'text'`, `42`, `true`, `null`
    Literal(Value),
    /// Function applied to its arguments: `tolower(name)`
    Call {
        /// Function to apply
        func: Function,
        /// Arguments, arity already checked
        args: Vec<Operand>,
    },
}

impl Operand {
    /// Property operand from a slash-delimited path
    pub fn property(path: &str) -> Result<Self> {
        Ok(Operand::Property(PropertyPath::parse(path)?))
    }

    /// Literal operand
    pub fn literal(value: impl Into<Value>) -> Self {
        Operand::Literal(value.into())
    }

    /// Function call operand, checking the argument count
    pub fn call(func: Function, args: Vec<Operand>) -> Result<Self> {
        if args.len() != func.arity() {
            return Err(QueryError::Parse(format!(
                "{}() takes {} argument(s), got {}",
                func.name(),
                func.arity(),
                args.len()
            )));
        }
        Ok(Operand::Call { func, args })
    }
}

/// Functions usable inside operands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    /// Lower-case a string
    ToLower,
    /// Upper-case a string
    ToUpper,
    /// Strip surrounding whitespace
    Trim,
    /// String length
    Length,
    /// Full year of a date
    Year,
    /// Zero-based month of a date
    Month,
    /// Day of the week of a date, Sunday = 0
    Day,
    /// Hour of a date
    Hour,
    /// Minute of a date
    Minute,
    /// Second of a date
    Second,
    /// Round half up
    Round,
    /// Round down
    Floor,
    /// Round up
    Ceiling,
    /// Position of the second string in the first, or -1
    IndexOf,
    /// Concatenate two strings
    Concat,
    /// Two-argument form, behaves exactly like `Concat`
    Substring,
    /// Replace every occurrence of the second string with the third
    Replace,
}

impl Function {
    /// Look up a function by its OData name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "tolower" => Some(Self::ToLower),
            "toupper" => Some(Self::ToUpper),
            "trim" => Some(Self::Trim),
            "length" => Some(Self::Length),
            "year" => Some(Self::Year),
            "month" => Some(Self::Month),
            "day" => Some(Self::Day),
            "hour" => Some(Self::Hour),
            "minute" => Some(Self::Minute),
            "second" => Some(Self::Second),
            "round" => Some(Self::Round),
            "floor" => Some(Self::Floor),
            "ceiling" => Some(Self::Ceiling),
            "indexof" => Some(Self::IndexOf),
            "concat" => Some(Self::Concat),
            "substring" => Some(Self::Substring),
            "replace" => Some(Self::Replace),
            _ => None,
        }
    }

    /// OData name
    pub fn name(&self) -> &'static str {
        match self {
            Self::ToLower => "tolower",
            Self::ToUpper => "toupper",
            Self::Trim => "trim",
            Self::Length => "length",
            Self::Year => "year",
            Self::Month => "month",
            Self::Day => "day",
            Self::Hour => "hour",
            Self::Minute => "minute",
            Self::Second => "second",
            Self::Round => "round",
            Self::Floor => "floor",
            Self::Ceiling => "ceiling",
            Self::IndexOf => "indexof",
            Self::Concat => "concat",
            Self::Substring => "substring",
            Self::Replace => "replace",
        }
    }

    /// Number of arguments the function takes
    pub fn arity(&self) -> usize {
        match self {
            Self::ToLower
            | Self::ToUpper
            | Self::Trim
            | Self::Length
            | Self::Year
            | Self::Month
            | Self::Day
            | Self::Hour
            | Self::Minute
            | Self::Second
            | Self::Round
            | Self::Floor
            | Self::Ceiling => 1,
            Self::IndexOf | Self::Concat | Self::Substring => 2,
            Self::Replace => 3,
        }
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    /// `eq`
    Eq,
    /// `ne`
    Ne,
    /// `lt`
    Lt,
    /// `le`
    Le,
    /// `gt`
    Gt,
    /// `ge`
    Ge,
}

impl ComparisonOp {
    /// Look up an operator by keyword
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "eq" => Some(Self::Eq),
            "ne" => Some(Self::Ne),
            "lt" => Some(Self::Lt),
            "le" => Some(Self::Le),
            "gt" => Some(Self::Gt),
            "ge" => Some(Self::Ge),
            _ => None,
        }
    }

    /// Keyword
    pub fn name(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Lt => "lt",
            Self::Le => "le",
            Self::Gt => "gt",
            Self::Ge => "ge",
        }
    }
}

/// Boolean string functions usable directly as filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringPredicate {
    /// `startswith(value, prefix)`
    StartsWith,
    /// `endswith(value, suffix)`
    EndsWith,
    /// `substringof(needle, haystack)`
    SubstringOf,
}

impl StringPredicate {
    /// Look up a predicate by its OData name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "startswith" => Some(Self::StartsWith),
            "endswith" => Some(Self::EndsWith),
            "substringof" => Some(Self::SubstringOf),
            _ => None,
        }
    }

    /// OData name
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartsWith => "startswith",
            Self::EndsWith => "endswith",
            Self::SubstringOf => "substringof",
        }
    }
}

/// A boolean expression tree over operands
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `left op right`
    Comparison {
        /// Operator
        op: ComparisonOp,
        /// Left operand
        left: Operand,
        /// Right operand
        right: Operand,
    },
    /// Both sides hold; the right side is skipped when the left fails
    And(Box<Filter>, Box<Filter>),
    /// Either side holds; the right side is skipped when the left passes
    Or(Box<Filter>, Box<Filter>),
    /// String predicate call
    Predicate {
        /// Predicate to apply
        func: StringPredicate,
        /// Arguments in call order
        args: [Operand; 2],
    },
}

impl Filter {
    /// Comparison node
    pub fn compare(op: ComparisonOp, left: Operand, right: Operand) -> Self {
        Filter::Comparison { op, left, right }
    }

    /// Conjunction node
    pub fn and(left: Filter, right: Filter) -> Self {
        Filter::And(Box::new(left), Box::new(right))
    }

    /// Disjunction node
    pub fn or(left: Filter, right: Filter) -> Self {
        Filter::Or(Box::new(left), Box::new(right))
    }

    /// String predicate node
    pub fn predicate(func: StringPredicate, first: Operand, second: Operand) -> Self {
        Filter::Predicate {
            func,
            args: [first, second],
        }
    }
}

impl Serialize for Operand {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self {
            Operand::Property(path) => {
                map.serialize_entry("type", "property")?;
                map.serialize_entry("name", path)?;
            }
            Operand::Literal(value) => {
                map.serialize_entry("type", "literal")?;
                map.serialize_entry("value", value)?;
            }
            Operand::Call { func, args } => {
                map.serialize_entry("type", "functioncall")?;
                map.serialize_entry("func", func.name())?;
                map.serialize_entry("args", args)?;
            }
        }
        map.end()
    }
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self {
            Filter::Comparison { op, left, right } => {
                map.serialize_entry("type", op.name())?;
                map.serialize_entry("left", left)?;
                map.serialize_entry("right", right)?;
            }
            Filter::And(left, right) | Filter::Or(left, right) => {
                let kind = if matches!(self, Filter::And(..)) { "and" } else { "or" };
                map.serialize_entry("type", kind)?;
                map.serialize_entry("left", left)?;
                map.serialize_entry("right", right)?;
            }
            Filter::Predicate { func, args } => {
                map.serialize_entry("type", "functioncall")?;
                map.serialize_entry("func", func.name())?;
                map.serialize_entry("args", args)?;
            }
        }
        map.end()
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Property(path) => write!(f, "{}", path),
            Operand::Literal(Value::String(s)) => write!(f, "'{}'", s.replace('\'', "''")),
            Operand::Literal(value) => write!(f, "{}", value),
            Operand::Call { func, args } => {
                write!(f, "{}(", func.name())?;
                write_args(f, args)?;
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Comparison { op, left, right } => {
                write!(f, "{} {} {}", left, op.name(), right)
            }
            Filter::And(left, right) => write!(f, "{} and {}", Grouped(left), Grouped(right)),
            Filter::Or(left, right) => write!(f, "{} or {}", left, right),
            Filter::Predicate { func, args } => {
                write!(f, "{}(", func.name())?;
                write_args(f, args)?;
                write!(f, ")")
            }
        }
    }
}

/// Parenthesizes `or` nodes so `and` precedence survives a round trip
struct Grouped<'a>(&'a Filter);

impl fmt::Display for Grouped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Filter::Or(..) => write!(f, "({})", self.0),
            other => write!(f, "{}", other),
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Operand]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", arg)?;
    }
    Ok(())
}
