//! Formula evaluation.
//!
//! A formula is free text such as `"strength + 2"` or
//! `"max(dexterityMod, 2) + fighterLevel"`. Evaluation runs in two steps:
//!
//! 1. Every alphanumeric run is offered to a [`Bindings`] implementation,
//!    case-folded. Runs it can bind are replaced by their numeric value;
//!    the rest are left as written.
//! 2. The substituted text is parsed and evaluated as arithmetic.
//!
//! If step 2 fails (an identifier survived, or the text is malformed) the
//! substituted text is returned instead of a number. Binding is where stat
//! resolution re-enters the evaluator, so step 1 may resolve other stats.

use crate::error::FormulaError;
use crate::stat_id::fold;
use regex_lite::{Captures, Regex};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;
use tracing::debug;

static IDENTIFIER: OnceLock<Regex> = OnceLock::new();

fn identifier_pattern() -> &'static Regex {
    IDENTIFIER.get_or_init(|| Regex::new(r"[A-Za-z0-9]+").expect("identifier pattern is valid"))
}

/// Supplies numeric values for identifiers found in a formula.
///
/// Identifiers are passed case-folded. Returning `None` leaves the
/// identifier in the text unsubstituted.
pub trait Bindings {
    fn bind(&mut self, identifier: &str) -> Option<f64>;
}

impl Bindings for HashMap<String, f64> {
    fn bind(&mut self, identifier: &str) -> Option<f64> {
        self.get(identifier).copied()
    }
}

/// Outcome of evaluating a formula, and the value an effect carries.
///
/// Text is either an unresolvable formula or an opaque conditional. Any
/// arithmetic consuming text treats it as `NaN`.
///
/// Serialized as a bare JSON number or string. Non-finite numbers use the
/// encoding of [`serde_number`], so the strings `"NaN"`, `"Infinity"` and
/// `"-Infinity"` read back as numbers, never as text.
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaValue {
    Number(f64),
    Text(String),
}

impl FormulaValue {
    /// Numeric view of this value; text is `NaN`.
    pub fn as_number(&self) -> f64 {
        match self {
            FormulaValue::Number(n) => *n,
            FormulaValue::Text(_) => f64::NAN,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FormulaValue::Number(_) => None,
            FormulaValue::Text(text) => Some(text),
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, FormulaValue::Number(_))
    }
}

impl Default for FormulaValue {
    fn default() -> Self {
        FormulaValue::Number(0.0)
    }
}

impl Serialize for FormulaValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            FormulaValue::Number(n) => serde_number::serialize(n, serializer),
            FormulaValue::Text(text) => serializer.serialize_str(text),
        }
    }
}

impl<'de> Deserialize<'de> for FormulaValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match NumberRepr::deserialize(deserializer)? {
            NumberRepr::Number(n) => FormulaValue::Number(n),
            NumberRepr::Text(text) => match parse_non_finite(&text) {
                Some(n) => FormulaValue::Number(n),
                None => FormulaValue::Text(text),
            },
        })
    }
}

impl fmt::Display for FormulaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaValue::Number(n) => f.write_str(&render_number(*n)),
            FormulaValue::Text(text) => f.write_str(text),
        }
    }
}

/// Substitute and evaluate `formula`.
///
/// # Examples
///
/// ```rust
/// use statsheet::formula::{evaluate, FormulaValue};
/// use std::collections::HashMap;
///
/// let mut vars = HashMap::from([("strength".to_string(), 14.0)]);
/// assert_eq!(evaluate("Strength + 2", &mut vars), FormulaValue::Number(16.0));
/// assert_eq!(
///     evaluate("foobar + 1", &mut vars),
///     FormulaValue::Text("foobar + 1".to_string())
/// );
/// ```
pub fn evaluate<B: Bindings + ?Sized>(formula: &str, bindings: &mut B) -> FormulaValue {
    let substituted = substitute(formula, bindings);
    match eval_arithmetic(&substituted) {
        Ok(value) => FormulaValue::Number(value),
        Err(err) => {
            debug!(formula, substituted = %substituted, error = %err, "formula left unevaluated");
            FormulaValue::Text(substituted)
        }
    }
}

/// Replace every bindable identifier in `formula` by its value.
///
/// Purely numeric runs are left alone. Negative values are parenthesized
/// so they keep their sign under `^`.
pub fn substitute<B: Bindings + ?Sized>(formula: &str, bindings: &mut B) -> String {
    identifier_pattern()
        .replace_all(formula, |caps: &Captures<'_>| {
            let word = &caps[0];
            if word.bytes().all(|b| b.is_ascii_digit()) {
                return word.to_string();
            }
            match bindings.bind(&fold(word)) {
                Some(value) if value < 0.0 => format!("({})", render_number(value)),
                Some(value) => render_number(value),
                None => word.to_string(),
            }
        })
        .into_owned()
}

/// Render a number the way the arithmetic parser reads it back.
pub fn render_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else {
        format!("{}", value)
    }
}

/// Inverse of [`render_number`] for the non-finite spellings.
fn parse_non_finite(text: &str) -> Option<f64> {
    match text {
        "NaN" => Some(f64::NAN),
        "Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        _ => None,
    }
}

/// Wire form of a possibly non-finite number.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberRepr {
    Number(f64),
    Text(String),
}

/// Serde support for `f64` fields that may hold `NaN` or an infinity.
///
/// JSON has no literal for either, and serde_json would write them as
/// `null`. They are written as the strings `"NaN"`, `"Infinity"` and
/// `"-Infinity"` instead; finite values stay plain numbers.
///
/// # Examples
///
/// ```rust
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Row {
///     #[serde(with = "statsheet::formula::serde_number")]
///     result: f64,
/// }
///
/// let json = serde_json::to_string(&Row { result: f64::NAN }).unwrap();
/// assert_eq!(json, r#"{"result":"NaN"}"#);
/// let row: Row = serde_json::from_str(&json).unwrap();
/// assert!(row.result.is_nan());
/// ```
pub mod serde_number {
    use super::{parse_non_finite, render_number, NumberRepr};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_str(&render_number(*value))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        from_repr(NumberRepr::deserialize(deserializer)?)
    }

    fn from_repr<E: Error>(repr: NumberRepr) -> Result<f64, E> {
        match repr {
            NumberRepr::Number(n) => Ok(n),
            NumberRepr::Text(text) => parse_non_finite(&text)
                .ok_or_else(|| E::custom(format!("expected a number, NaN or Infinity, got '{}'", text))),
        }
    }

    struct Encoded(f64);

    impl Serialize for Encoded {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serialize(&self.0, serializer)
        }
    }

    /// The same encoding for `Option<f64>`; `None` stays `null`.
    pub mod option {
        use super::{from_repr, Encoded, NumberRepr};
        use serde::{Deserialize, Deserializer, Serialize, Serializer};

        pub fn serialize<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            value.map(Encoded).serialize(serializer)
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<NumberRepr>::deserialize(deserializer)?
                .map(from_repr)
                .transpose()
        }
    }
}

/// Parse and evaluate a fully substituted arithmetic expression.
///
/// Supports `+ - * / % ^`, parentheses, unary signs, comparisons
/// (`< <= > >= == !=`, yielding 1 or 0), `cond ? a : b`, the constants
/// `NaN` and `Infinity`, and the functions `floor ceil round abs sqrt min max`.
pub fn eval_arithmetic(expression: &str) -> Result<f64, FormulaError> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err(FormulaError::Empty);
    }
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.ternary()?;
    match parser.peek() {
        None => Ok(value),
        Some((token, offset)) => Err(FormulaError::UnexpectedToken {
            token: token.to_string(),
            offset,
        }),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    LParen,
    RParen,
    Comma,
    Question,
    Colon,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Equal,
    NotEqual,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => f.write_str(&render_number(*n)),
            Token::Ident(name) => f.write_str(name),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Star => f.write_str("*"),
            Token::Slash => f.write_str("/"),
            Token::Percent => f.write_str("%"),
            Token::Caret => f.write_str("^"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Comma => f.write_str(","),
            Token::Question => f.write_str("?"),
            Token::Colon => f.write_str(":"),
            Token::Less => f.write_str("<"),
            Token::LessEq => f.write_str("<="),
            Token::Greater => f.write_str(">"),
            Token::GreaterEq => f.write_str(">="),
            Token::Equal => f.write_str("=="),
            Token::NotEqual => f.write_str("!="),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<(Token, usize)>, FormulaError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;

        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || c == b'.' {
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
            let literal = &input[start..i];
            let value = literal
                .parse::<f64>()
                .map_err(|_| FormulaError::UnexpectedToken {
                    token: literal.to_string(),
                    offset: start,
                })?;
            tokens.push((Token::Number(value), start));
            continue;
        }

        if c.is_ascii_alphabetic() || c == b'_' {
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            let token = match &input[start..i] {
                "NaN" => Token::Number(f64::NAN),
                "Infinity" => Token::Number(f64::INFINITY),
                word => Token::Ident(word.to_string()),
            };
            tokens.push((token, start));
            continue;
        }

        let next = bytes.get(i + 1).copied();
        let (token, width) = match (c, next) {
            (b'<', Some(b'=')) => (Token::LessEq, 2),
            (b'>', Some(b'=')) => (Token::GreaterEq, 2),
            (b'=', Some(b'=')) => (Token::Equal, 2),
            (b'!', Some(b'=')) => (Token::NotEqual, 2),
            (b'<', _) => (Token::Less, 1),
            (b'>', _) => (Token::Greater, 1),
            (b'+', _) => (Token::Plus, 1),
            (b'-', _) => (Token::Minus, 1),
            (b'*', _) => (Token::Star, 1),
            (b'/', _) => (Token::Slash, 1),
            (b'%', _) => (Token::Percent, 1),
            (b'^', _) => (Token::Caret, 1),
            (b'(', _) => (Token::LParen, 1),
            (b')', _) => (Token::RParen, 1),
            (b',', _) => (Token::Comma, 1),
            (b'?', _) => (Token::Question, 1),
            (b':', _) => (Token::Colon, 1),
            _ => {
                let token = input[start..].chars().next().map(String::from).unwrap_or_default();
                return Err(FormulaError::UnexpectedToken {
                    token,
                    offset: start,
                });
            }
        };
        tokens.push((token, start));
        i += width;
    }

    Ok(tokens)
}

fn truthy(value: f64) -> bool {
    value != 0.0 && !value.is_nan()
}

fn flag(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

/// Recursive descent over the token stream, lowest precedence first:
/// ternary, comparison, additive, multiplicative, unary, power, primary.
struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<(&Token, usize)> {
        self.tokens.get(self.pos).map(|(token, offset)| (token, *offset))
    }

    fn next(&mut self) -> Result<(Token, usize), FormulaError> {
        let item = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(FormulaError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(item)
    }

    fn eat(&mut self, expected: &Token) -> bool {
        match self.peek() {
            Some((token, _)) if token == expected => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), FormulaError> {
        let (token, offset) = self.next()?;
        if token == expected {
            Ok(())
        } else {
            Err(FormulaError::UnexpectedToken {
                token: token.to_string(),
                offset,
            })
        }
    }

    fn ternary(&mut self) -> Result<f64, FormulaError> {
        let condition = self.comparison()?;
        if !self.eat(&Token::Question) {
            return Ok(condition);
        }
        let when_true = self.ternary()?;
        self.expect(Token::Colon)?;
        let when_false = self.ternary()?;
        Ok(if truthy(condition) {
            when_true
        } else {
            when_false
        })
    }

    fn comparison(&mut self) -> Result<f64, FormulaError> {
        let mut left = self.additive()?;
        loop {
            let compare: fn(f64, f64) -> bool = match self.peek() {
                Some((Token::Less, _)) => |a, b| a < b,
                Some((Token::LessEq, _)) => |a, b| a <= b,
                Some((Token::Greater, _)) => |a, b| a > b,
                Some((Token::GreaterEq, _)) => |a, b| a >= b,
                Some((Token::Equal, _)) => |a, b| a == b,
                Some((Token::NotEqual, _)) => |a, b| a != b,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.additive()?;
            left = flag(compare(left, right));
        }
    }

    fn additive(&mut self) -> Result<f64, FormulaError> {
        let mut left = self.multiplicative()?;
        loop {
            if self.eat(&Token::Plus) {
                left += self.multiplicative()?;
            } else if self.eat(&Token::Minus) {
                left -= self.multiplicative()?;
            } else {
                return Ok(left);
            }
        }
    }

    fn multiplicative(&mut self) -> Result<f64, FormulaError> {
        let mut left = self.unary()?;
        loop {
            if self.eat(&Token::Star) {
                left *= self.unary()?;
            } else if self.eat(&Token::Slash) {
                left /= self.unary()?;
            } else if self.eat(&Token::Percent) {
                left %= self.unary()?;
            } else {
                return Ok(left);
            }
        }
    }

    fn unary(&mut self) -> Result<f64, FormulaError> {
        if self.eat(&Token::Minus) {
            return Ok(-self.unary()?);
        }
        if self.eat(&Token::Plus) {
            return self.unary();
        }
        self.power()
    }

    fn power(&mut self) -> Result<f64, FormulaError> {
        let base = self.primary()?;
        if self.eat(&Token::Caret) {
            // right-associative: 2^3^2 == 2^9
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<f64, FormulaError> {
        let (token, offset) = self.next()?;
        match token {
            Token::Number(value) => Ok(value),
            Token::LParen => {
                let value = self.ternary()?;
                self.expect(Token::RParen)?;
                Ok(value)
            }
            Token::Ident(name) => {
                if self.eat(&Token::LParen) {
                    let args = self.arguments()?;
                    call(&name, &args)
                } else {
                    Err(FormulaError::UnknownIdentifier(name))
                }
            }
            other => Err(FormulaError::UnexpectedToken {
                token: other.to_string(),
                offset,
            }),
        }
    }

    fn arguments(&mut self) -> Result<Vec<f64>, FormulaError> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.ternary()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(Token::RParen)?;
            return Ok(args);
        }
    }
}

fn call(name: &str, args: &[f64]) -> Result<f64, FormulaError> {
    let unary = |f: fn(f64) -> f64| -> Result<f64, FormulaError> {
        match args {
            [x] => Ok(f(*x)),
            _ => Err(FormulaError::Arity {
                name: name.to_string(),
                expected: 1,
                got: args.len(),
            }),
        }
    };
    let variadic = |fold_fn: fn(f64, f64) -> f64| -> Result<f64, FormulaError> {
        let (first, rest) = args.split_first().ok_or_else(|| FormulaError::Arity {
            name: name.to_string(),
            expected: 1,
            got: 0,
        })?;
        Ok(rest.iter().fold(*first, |acc, x| fold_fn(acc, *x)))
    };

    match fold(name).as_str() {
        "floor" => unary(f64::floor),
        "ceil" => unary(f64::ceil),
        "round" => unary(f64::round),
        "abs" => unary(f64::abs),
        "sqrt" => unary(f64::sqrt),
        // NaN-propagating, unlike f64::min/max
        "min" => variadic(|a, b| if a.is_nan() || b.is_nan() { f64::NAN } else { a.min(b) }),
        "max" => variadic(|a, b| if a.is_nan() || b.is_nan() { f64::NAN } else { a.max(b) }),
        _ => Err(FormulaError::UnknownFunction(name.to_string())),
    }
}
