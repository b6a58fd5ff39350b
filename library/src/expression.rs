//! Label templates.
//!
//! `{param}` is replaced by the parameter's value and `[expr]` by the result
//! of a small expression, e.g. `[upper(primName) + ' x' + round(scale)]`.
//! Anything that does not resolve is left in the label as written.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::model::value::Value;

static SUBSTITUTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_:.]*)\}").expect("valid substitution pattern"));

static COMPUTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\[\]]*)\]").expect("valid expression pattern"));

pub fn resolve_label(template: &str, lookup: impl Fn(&str) -> Option<Value>) -> String {
    let substituted = SUBSTITUTION.replace_all(template, |caps: &Captures| {
        match lookup(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        }
    });

    COMPUTED
        .replace_all(&substituted, |caps: &Captures| {
            match evaluate(&caps[1], &lookup) {
                Some(result) => result.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Evaluates a computed expression on its own.
pub fn evaluate(source: &str, lookup: &impl Fn(&str) -> Option<Value>) -> Option<Operand> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        lookup,
    };
    let result = parser.expression()?;
    if parser.pos != parser.tokens.len() {
        return None;
    }
    Some(result)
}

#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Number(f64),
    Text(String),
}

impl Operand {
    fn from_value(value: Value) -> Self {
        match value {
            Value::Float(f) => Operand::Number(f.into_inner()),
            Value::Int(i) => Operand::Number(i as f64),
            Value::Bool(b) => Operand::Number(if b { 1.0 } else { 0.0 }),
            Value::String(s) => Operand::Text(s),
            other => Operand::Text(other.to_string()),
        }
    }

    fn number(&self) -> Option<f64> {
        match self {
            Operand::Number(n) => Some(*n),
            Operand::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Operand::Number(n) => write!(f, "{}", n),
            Operand::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(f64),
    Text(String),
    Ident(String),
    Op(char),
    Open,
    Close,
    Comma,
}

fn tokenize(source: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '+' | '-' | '*' | '/' => {
                tokens.push(Token::Op(c));
                chars.next();
            }
            '(' => {
                tokens.push(Token::Open);
                chars.next();
            }
            ')' => {
                tokens.push(Token::Close);
                chars.next();
            }
            ',' => {
                tokens.push(Token::Comma);
                chars.next();
            }
            '\'' | '"' => {
                chars.next();
                let mut text = String::new();
                loop {
                    let (_, next) = chars.next()?;
                    if next == c {
                        break;
                    }
                    text.push(next);
                }
                tokens.push(Token::Text(text));
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut end = start;
                while let Some(&(i, d)) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        end = i + d.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Number(source[start..end].parse().ok()?));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut end = start;
                while let Some(&(i, d)) = chars.peek() {
                    if d.is_alphanumeric() || d == '_' || d == ':' {
                        end = i + d.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(source[start..end].to_string()));
            }
            _ => return None,
        }
    }
    Some(tokens)
}

struct Parser<'a, F> {
    tokens: Vec<Token>,
    pos: usize,
    lookup: &'a F,
}

impl<F: Fn(&str) -> Option<Value>> Parser<'_, F> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, token: Token) -> Option<()> {
        (self.next()? == token).then_some(())
    }

    fn expression(&mut self) -> Option<Operand> {
        let mut left = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek().cloned() {
            self.pos += 1;
            let right = self.term()?;
            left = match (op, left, right) {
                ('+', Operand::Number(a), Operand::Number(b)) => Operand::Number(a + b),
                ('+', a, b) => Operand::Text(format!("{}{}", a, b)),
                (_, a, b) => Operand::Number(a.number()? - b.number()?),
            };
        }
        Some(left)
    }

    fn term(&mut self) -> Option<Operand> {
        let mut left = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/'))) = self.peek().cloned() {
            self.pos += 1;
            let right = self.unary()?.number()?;
            let left_value = left.number()?;
            left = match op {
                '*' => Operand::Number(left_value * right),
                _ if right == 0.0 => return None,
                _ => Operand::Number(left_value / right),
            };
        }
        Some(left)
    }

    fn unary(&mut self) -> Option<Operand> {
        if self.peek() == Some(&Token::Op('-')) {
            self.pos += 1;
            return Some(Operand::Number(-self.unary()?.number()?));
        }
        self.primary()
    }

    fn primary(&mut self) -> Option<Operand> {
        match self.next()? {
            Token::Number(n) => Some(Operand::Number(n)),
            Token::Text(s) => Some(Operand::Text(s)),
            Token::Open => {
                let inner = self.expression()?;
                self.expect(Token::Close)?;
                Some(inner)
            }
            Token::Ident(name) if self.peek() == Some(&Token::Open) => {
                self.pos += 1;
                let mut args = Vec::new();
                if self.peek() != Some(&Token::Close) {
                    args.push(self.expression()?);
                    while self.peek() == Some(&Token::Comma) {
                        self.pos += 1;
                        args.push(self.expression()?);
                    }
                }
                self.expect(Token::Close)?;
                call(&name, args)
            }
            Token::Ident(name) => (self.lookup)(&name).map(Operand::from_value),
            _ => None,
        }
    }
}

fn call(name: &str, args: Vec<Operand>) -> Option<Operand> {
    match (name, args.as_slice()) {
        ("upper", [arg]) => Some(Operand::Text(arg.to_string().to_uppercase())),
        ("lower", [arg]) => Some(Operand::Text(arg.to_string().to_lowercase())),
        ("basename", [arg]) => {
            let text = arg.to_string();
            let base = text.rsplit(['/', '\\']).next().unwrap_or_default();
            Some(Operand::Text(base.to_string()))
        }
        ("len", [arg]) => Some(Operand::Number(arg.to_string().chars().count() as f64)),
        ("round", [arg]) => Some(Operand::Number(arg.number()?.round())),
        ("round", [arg, digits]) => {
            let factor = 10f64.powi(digits.number()? as i32);
            Some(Operand::Number((arg.number()? * factor).round() / factor))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<Value> {
        match name {
            "primName" => Some(Value::from("Sphere")),
            "assetPath" => Some(Value::from("assets/props/chair.json")),
            "scale" => Some(Value::from(2.5)),
            "count" => Some(Value::Int(3)),
            _ => None,
        }
    }

    #[test]
    fn test_value_substitution() {
        assert_eq!(resolve_label("{primName}", lookup), "Sphere");
        assert_eq!(resolve_label("Prim {primName} x{count}", lookup), "Prim Sphere x3");
    }

    #[test]
    fn test_unknown_parts_stay_verbatim() {
        assert_eq!(resolve_label("{missing} [nope(1)]", lookup), "{missing} [nope(1)]");
        assert_eq!(resolve_label("[1 / 0]", lookup), "[1 / 0]");
    }

    #[test]
    fn test_computed_substitution() {
        assert_eq!(resolve_label("[upper(primName)]", lookup), "SPHERE");
        assert_eq!(resolve_label("[basename(assetPath)]", lookup), "chair.json");
        assert_eq!(resolve_label("[(scale + 1.5) * 2]", lookup), "8");
        assert_eq!(resolve_label("[lower('A') + '-' + len(primName)]", lookup), "a-6");
        assert_eq!(resolve_label("[round(scale)]", lookup), "3");
        assert_eq!(resolve_label("[round(1.236, 2)]", lookup), "1.24");
    }

    #[test]
    fn test_substitution_feeds_expression() {
        assert_eq!(resolve_label("[len('{primName}')]", lookup), "6");
    }
}
