//! Expression parsers for `filter`, `orderby` and `select`

use serde_json::{Number, Value};

use super::ast::{ComparisonOp, Filter, Function, Operand, StringPredicate};
use super::path::PropertyPath;
use super::sort::{SortDirection, SortKey};
use super::{QueryError, Result};

/// Nesting limit for parentheses and function calls
const MAX_DEPTH: usize = 64;

/// Limit on `and`/`or` joins in one filter
const MAX_CLAUSES: usize = 1024;

/// OData operators the grammar recognizes but the engine does not implement
const UNSUPPORTED_OPERATORS: &[&str] = &["not", "add", "sub", "mul", "div", "mod"];

/// Literal prefixes whose quoted body is kept as a plain string
const TYPED_LITERALS: &[&str] = &["datetime", "datetimeoffset", "guid", "time"];

/// Parse a `filter` expression
///
/// ```rust
/// use jsonrest_query::query::parse_filter;
///
/// let filter = parse_filter("age ge 18 and startswith(tolower(name), 'jo')").unwrap();
/// assert_eq!(filter.to_string(), "age ge 18 and startswith(tolower(name), 'jo')");
/// ```
pub fn parse_filter(input: &str) -> Result<Filter> {
    let mut parser = Parser::new(input);
    parser.skip_whitespace();
    if parser.is_at_end() {
        return Err(QueryError::Parse("empty filter expression".into()));
    }

    let filter = parser.parse_or()?;
    parser.skip_whitespace();
    if !parser.is_at_end() {
        return Err(QueryError::Parse(format!(
            "unexpected '{}' at position {}",
            parser.remaining(),
            parser.pos
        )));
    }
    Ok(filter)
}

/// Parse an `orderby` list: comma-separated `path [asc|desc]`
///
/// Blank input gives no keys.
pub fn parse_orderby(input: &str) -> Result<Vec<SortKey>> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }

    input
        .split(',')
        .map(|item| {
            let mut words = item.split_whitespace();
            let path = words
                .next()
                .ok_or_else(|| QueryError::Parse(format!("empty orderby item in '{}'", input)))?;
            let direction = match words.next() {
                None | Some("asc") => SortDirection::Asc,
                Some("desc") => SortDirection::Desc,
                Some(other) => {
                    return Err(QueryError::Parse(format!(
                        "unknown sort direction '{}' for '{}'",
                        other, path
                    )))
                }
            };
            if let Some(extra) = words.next() {
                return Err(QueryError::Parse(format!(
                    "unexpected '{}' after orderby item '{}'",
                    extra,
                    item.trim()
                )));
            }
            Ok(SortKey::new(PropertyPath::parse(path)?, direction))
        })
        .collect()
}

/// Parse a `select` list: comma-separated paths
///
/// Blank input and a lone `*` mean no projection. Repeated paths keep their
/// first position.
pub fn parse_select(input: &str) -> Result<Option<Vec<PropertyPath>>> {
    let input = input.trim();
    if input.is_empty() || input == "*" {
        return Ok(None);
    }

    let mut paths: Vec<PropertyPath> = Vec::new();
    for item in input.split(',') {
        let item = item.trim();
        if item.is_empty() {
            return Err(QueryError::Parse(format!("empty select item in '{}'", input)));
        }
        if item == "*" {
            return Err(QueryError::Parse(
                "'*' cannot be combined with other select paths".into(),
            ));
        }
        let path = PropertyPath::parse(item)?;
        if !paths.contains(&path) {
            paths.push(path);
        }
    }
    Ok(Some(paths))
}

/// Left-hand side of a comparison before the operator is known
enum Term {
    Operand(Operand),
    Predicate(Filter),
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
    joins: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
            joins: 0,
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.advance(c.len_utf8());
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek().filter(|c| c.is_whitespace()) {
            self.advance(c.len_utf8());
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<()> {
        self.skip_whitespace();
        match self.peek() {
            Some(c) if c == expected => {
                self.advance(c.len_utf8());
                Ok(())
            }
            Some(c) => Err(QueryError::Parse(format!(
                "expected '{}' at position {}, got '{}'",
                expected, self.pos, c
            ))),
            None => Err(QueryError::Parse(format!(
                "expected '{}', got end of input",
                expected
            ))),
        }
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(QueryError::Parse("expression nested too deeply".into()));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Count one `and`/`or` join
    fn join(&mut self) -> Result<()> {
        self.joins += 1;
        if self.joins > MAX_CLAUSES {
            return Err(QueryError::Parse("filter has too many clauses".into()));
        }
        Ok(())
    }

    /// The identifier at the cursor, without consuming it
    fn peek_word(&mut self) -> Option<&'a str> {
        self.skip_whitespace();
        let rest = self.remaining();
        let end = rest
            .find(|c: char| !is_ident_char(c))
            .unwrap_or(rest.len());
        (end > 0).then(|| &rest[..end])
    }

    /// Consume `keyword` if it is the next whole word
    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_word() == Some(keyword) {
            self.advance(keyword.len());
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<Filter> {
        let mut left = self.parse_and()?;
        while self.eat_keyword("or") {
            self.join()?;
            let right = self.parse_and()?;
            left = Filter::or(left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Filter> {
        let mut left = self.parse_primary()?;
        while self.eat_keyword("and") {
            self.join()?;
            let right = self.parse_primary()?;
            left = Filter::and(left, right);
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Filter> {
        self.skip_whitespace();
        if self.peek() == Some('(') {
            self.advance(1);
            self.enter()?;
            let inner = self.parse_or()?;
            self.expect_char(')')?;
            self.leave();
            return Ok(inner);
        }

        match self.parse_term()? {
            Term::Predicate(filter) => self.parse_predicate_comparison(filter),
            Term::Operand(left) => {
                let op = self.parse_comparison_op()?;
                let right = self.parse_operand()?;
                self.reject_arithmetic()?;
                Ok(Filter::compare(op, left, right))
            }
        }
    }

    /// `startswith(a, 'b') eq true` is the predicate itself; negations need
    /// `not`, which is not supported
    fn parse_predicate_comparison(&mut self, filter: Filter) -> Result<Filter> {
        let Some(op) = self.peek_word().and_then(ComparisonOp::from_name) else {
            return Ok(filter);
        };
        self.advance(op.name().len());

        match (op, self.parse_operand()?) {
            (ComparisonOp::Eq, Operand::Literal(Value::Bool(true)))
            | (ComparisonOp::Ne, Operand::Literal(Value::Bool(false))) => Ok(filter),
            (ComparisonOp::Eq, Operand::Literal(Value::Bool(false)))
            | (ComparisonOp::Ne, Operand::Literal(Value::Bool(true))) => {
                Err(QueryError::UnsupportedOperator("not".into()))
            }
            (op, right) => Err(QueryError::Parse(format!(
                "{} can only be compared with true or false, got '{} {}'",
                filter,
                op.name(),
                right
            ))),
        }
    }

    fn parse_comparison_op(&mut self) -> Result<ComparisonOp> {
        self.reject_arithmetic()?;
        match self.peek_word() {
            Some(word) => match ComparisonOp::from_name(word) {
                Some(op) => {
                    self.advance(word.len());
                    Ok(op)
                }
                None => Err(QueryError::Parse(format!(
                    "expected comparison operator at position {}, got '{}'",
                    self.pos, word
                ))),
            },
            None if self.is_at_end() => Err(QueryError::Parse(
                "expected comparison operator, got end of input".into(),
            )),
            None => Err(QueryError::Parse(format!(
                "expected comparison operator at position {}",
                self.pos
            ))),
        }
    }

    fn reject_arithmetic(&mut self) -> Result<()> {
        match self.peek_word() {
            Some(word) if UNSUPPORTED_OPERATORS.contains(&word) => {
                Err(QueryError::UnsupportedOperator(word.to_string()))
            }
            _ => Ok(()),
        }
    }

    fn parse_term(&mut self) -> Result<Term> {
        if let Some(func) = self.peek_word().and_then(StringPredicate::from_name) {
            let save = self.pos;
            self.advance(func.name().len());
            self.skip_whitespace();
            if self.peek() == Some('(') {
                let args = self.parse_call_args()?;
                let [first, second]: [Operand; 2] = args.try_into().map_err(|args: Vec<Operand>| {
                    QueryError::Parse(format!(
                        "{}() takes 2 argument(s), got {}",
                        func.name(),
                        args.len()
                    ))
                })?;
                return Ok(Term::Predicate(Filter::predicate(func, first, second)));
            }
            // a property that happens to share the name
            self.pos = save;
        }
        self.parse_operand().map(Term::Operand)
    }

    fn parse_operand(&mut self) -> Result<Operand> {
        self.skip_whitespace();
        match self.peek() {
            Some('\'') => Ok(Operand::Literal(Value::String(self.parse_string()?))),
            Some(c) if c.is_ascii_digit() || c == '-' => self.parse_number(),
            Some(c) if is_ident_char(c) => self.parse_word_operand(),
            Some(c) => Err(QueryError::Parse(format!(
                "unexpected '{}' at position {}",
                c, self.pos
            ))),
            None => Err(QueryError::Parse("expected operand, got end of input".into())),
        }
    }

    /// Operand starting with a word: keyword literal, typed literal, call or
    /// property
    fn parse_word_operand(&mut self) -> Result<Operand> {
        let start = self.pos;
        let word = self.peek_word().unwrap_or_default();
        self.advance(word.len());

        if TYPED_LITERALS.contains(&word) && self.peek() == Some('\'') {
            return Ok(Operand::Literal(Value::String(self.parse_string()?)));
        }

        if self.peek() != Some('/') {
            match word {
                "true" => return Ok(Operand::literal(true)),
                "false" => return Ok(Operand::literal(false)),
                "null" => return Ok(Operand::Literal(Value::Null)),
                _ => {}
            }
        }

        let before_call = self.pos;
        self.skip_whitespace();
        if self.peek() == Some('(') {
            return self.parse_call(word);
        }
        self.pos = before_call;

        if UNSUPPORTED_OPERATORS.contains(&word) {
            return Err(QueryError::UnsupportedOperator(word.to_string()));
        }
        if matches!(word, "and" | "or") || ComparisonOp::from_name(word).is_some() {
            return Err(QueryError::Parse(format!(
                "expected operand at position {}, got keyword '{}'",
                start, word
            )));
        }

        while self.peek() == Some('/') {
            self.advance(1);
            let segment = self.peek_word_here();
            if segment.is_empty() {
                return Err(QueryError::Parse(format!(
                    "empty segment in property path '{}'",
                    &self.input[start..self.pos]
                )));
            }
            self.advance(segment.len());
        }

        Operand::property(&self.input[start..self.pos])
    }

    /// Identifier characters directly at the cursor, no whitespace skipped
    fn peek_word_here(&self) -> &'a str {
        let rest = self.remaining();
        let end = rest
            .find(|c: char| !is_ident_char(c))
            .unwrap_or(rest.len());
        &rest[..end]
    }

    fn parse_call(&mut self, name: &str) -> Result<Operand> {
        if StringPredicate::from_name(name).is_some() {
            return Err(QueryError::Parse(format!(
                "{}() is a condition and cannot be used as a value",
                name
            )));
        }
        let func = Function::from_name(name)
            .ok_or_else(|| QueryError::UnsupportedOperator(format!("function '{}'", name)))?;
        let args = self.parse_call_args()?;
        Operand::call(func, args)
    }

    /// `( operand ( , operand )* )`, cursor on the opening parenthesis
    fn parse_call_args(&mut self) -> Result<Vec<Operand>> {
        self.expect_char('(')?;
        self.enter()?;

        let mut args = Vec::new();
        self.skip_whitespace();
        if self.peek() != Some(')') {
            loop {
                args.push(self.parse_operand()?);
                self.skip_whitespace();
                if self.peek() == Some(',') {
                    self.advance(1);
                } else {
                    break;
                }
            }
        }

        self.expect_char(')')?;
        self.leave();
        Ok(args)
    }

    /// Quoted string, `''` inside the quotes is one quote
    fn parse_string(&mut self) -> Result<String> {
        let start = self.pos;
        self.expect_char('\'')?;
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('\'') if self.peek() == Some('\'') => {
                    self.advance(1);
                    out.push('\'');
                }
                Some('\'') => return Ok(out),
                Some(c) => out.push(c),
                None => {
                    return Err(QueryError::Parse(format!(
                        "unterminated string literal at position {}",
                        start
                    )))
                }
            }
        }
    }

    fn parse_number(&mut self) -> Result<Operand> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.advance(1);
        }
        let digits_start = self.pos;
        self.skip_digits();
        if self.pos == digits_start {
            return Err(QueryError::Parse(format!(
                "expected digits after '-' at position {}",
                start
            )));
        }

        let mut integral = true;
        if self.peek() == Some('.') {
            integral = false;
            self.advance(1);
            self.skip_digits();
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            integral = false;
            self.advance(1);
            if matches!(self.peek(), Some('+' | '-')) {
                self.advance(1);
            }
            self.skip_digits();
        }
        let text = &self.input[start..self.pos];

        // OData type suffixes: 1.5m, 2d, 3f, 4L
        if let Some(c) = self.peek().filter(|c| "mMdDfFlL".contains(*c)) {
            self.advance(c.len_utf8());
        }
        if self.peek().is_some_and(is_ident_char) {
            return Err(QueryError::Parse(format!(
                "invalid number literal at position {}",
                start
            )));
        }

        if integral {
            if let Ok(n) = text.parse::<i64>() {
                return Ok(Operand::literal(n));
            }
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(|n| Operand::Literal(Value::Number(n)))
            .ok_or_else(|| QueryError::Parse(format!("invalid number literal '{}'", text)))
    }

    fn skip_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance(1);
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
