//! Recursive descent reader for Lambda DCS formulas.
//!
//! Two stages: tokens are read into a generic [`SExpr`] tree, then the tree
//! is interpreted as a [`Formula`] (or as a [`Value`] for graph files).
//! Supports:
//! - literals: `(number 3 kg)`, `(date 1926 -1 -1)`, `(string "x")`, `"x"`,
//!   `(name id "desc")`, `(boolean true)`, bare atoms (numbers or names)
//! - `(var x)`, `(lambda x body)`, `(mark x body)`, `(reverse r)`
//! - `(and a b ...)`, `(or a b ...)`, folded to the left
//! - `(count f)`, `(sum f)`, `(avg f)`, `(min f)`, `(max f)`
//! - `(argmax rank count head degree)`, `(argmin ...)`
//! - `(+ a b)`, `(- a b)`, `(* a b)`, `(/ a b)`
//! - `(filter base relation)` and `(relation child)` joins

use crate::model::value::looks_numeric;
use crate::model::{NumberValue, Value};
use crate::{Error, Result};
use super::ast::*;
use super::lexer::{Span, Token, TokenKind};

/// A generic s-expression.
#[derive(Debug, Clone, PartialEq)]
pub enum SExpr {
    Atom { text: String, span: Span },
    Str { text: String, span: Span },
    List { items: Vec<SExpr>, span: Span },
}

impl SExpr {
    pub fn span(&self) -> Span {
        match self {
            SExpr::Atom { span, .. } | SExpr::Str { span, .. } | SExpr::List { span, .. } => *span,
        }
    }

    pub fn atom(&self) -> Option<&str> {
        match self {
            SExpr::Atom { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Text of an atom or a string literal.
    pub fn text(&self) -> Option<&str> {
        match self {
            SExpr::Atom { text, .. } | SExpr::Str { text, .. } => Some(text),
            SExpr::List { .. } => None,
        }
    }

    pub fn items(&self) -> Option<&[SExpr]> {
        match self {
            SExpr::List { items, .. } => Some(items),
            _ => None,
        }
    }
}

/// Parser state: a token slice with a cursor.
struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn advance(&mut self) -> &Token {
        let tok = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&Token> {
        let tok = self.peek();
        if tok.kind == kind {
            Ok(self.advance())
        } else {
            Err(self.error(format!("Expected {:?}, got {:?} '{}'", kind, tok.kind, tok.text)))
        }
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn error(&self, msg: String) -> Error {
        Error::SyntaxError {
            position: self.peek().span.start,
            message: msg,
        }
    }

    fn parse_expr(&mut self) -> Result<SExpr> {
        match self.peek_kind() {
            TokenKind::LParen => {
                let start = self.advance().span.start;
                let mut items = Vec::new();
                while !self.at(TokenKind::RParen) {
                    if self.at(TokenKind::Eof) {
                        return Err(self.error("Unbalanced parentheses".into()));
                    }
                    items.push(self.parse_expr()?);
                }
                let end = self.expect(TokenKind::RParen)?.span.end;
                Ok(SExpr::List { items, span: Span { start, end } })
            }
            TokenKind::Atom => {
                let tok = self.advance();
                Ok(SExpr::Atom { text: tok.text.clone(), span: tok.span })
            }
            TokenKind::StringLiteral => {
                let tok = self.advance();
                Ok(SExpr::Str { text: tok.text.clone(), span: tok.span })
            }
            TokenKind::RParen => Err(self.error("Unexpected ')'".into())),
            TokenKind::Eof => Err(self.error("Unexpected end of input".into())),
        }
    }
}

/// Read exactly one s-expression from the token stream.
pub fn parse_sexpr(tokens: &[Token]) -> Result<SExpr> {
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expr()?;
    parser.expect(TokenKind::Eof)?;
    Ok(expr)
}

fn syntax(span: Span, message: impl Into<String>) -> Error {
    Error::SyntaxError { position: span.start, message: message.into() }
}

fn expect_arity(keyword: &str, args: &[SExpr], arity: usize, span: Span) -> Result<()> {
    if args.len() == arity {
        Ok(())
    } else {
        Err(syntax(span, format!("'{keyword}' takes {arity} argument(s), got {}", args.len())))
    }
}

fn boxed(expr: &SExpr) -> Result<Box<Formula>> {
    formula_from_sexpr(expr).map(Box::new)
}

fn var_name(expr: &SExpr) -> Result<String> {
    expr.text()
        .map(str::to_string)
        .ok_or_else(|| syntax(expr.span(), "Expected a variable name"))
}

// ============================================================================
// Formulas
// ============================================================================

/// Interpret an s-expression as a formula.
pub fn formula_from_sexpr(expr: &SExpr) -> Result<Formula> {
    match expr {
        SExpr::Atom { text, .. } => Ok(Formula::Value(atom_value(text))),
        SExpr::Str { text, .. } => Ok(Formula::Value(Value::String(text.clone()))),
        SExpr::List { items, span } => list_formula(items, *span),
    }
}

fn list_formula(items: &[SExpr], span: Span) -> Result<Formula> {
    let Some((head, args)) = items.split_first() else {
        return Err(syntax(span, "Empty formula"));
    };

    if let Some(keyword) = head.atom() {
        match keyword {
            "number" | "date" | "string" | "name" | "boolean" => {
                return literal_value(keyword, args, span).map(Formula::Value);
            }
            "var" => {
                expect_arity(keyword, args, 1, span)?;
                return Ok(Formula::Variable(var_name(&args[0])?));
            }
            "lambda" | "mark" => {
                expect_arity(keyword, args, 2, span)?;
                let var = var_name(&args[0])?;
                let body = boxed(&args[1])?;
                return Ok(if keyword == "lambda" {
                    Formula::Lambda { var, body }
                } else {
                    Formula::Mark { var, body }
                });
            }
            "reverse" => {
                expect_arity(keyword, args, 1, span)?;
                return Ok(Formula::Reverse(boxed(&args[0])?));
            }
            "filter" => {
                expect_arity(keyword, args, 2, span)?;
                return Ok(Formula::Filter { base: boxed(&args[0])?, relation: boxed(&args[1])? });
            }
            _ => {}
        }

        if let Some(mode) = MergeMode::from_keyword(keyword) {
            if args.len() < 2 {
                return Err(syntax(span, format!("'{keyword}' takes at least 2 arguments")));
            }
            let mut merged = formula_from_sexpr(&args[0])?;
            for arg in &args[1..] {
                merged = Formula::Merge { mode, left: Box::new(merged), right: boxed(arg)? };
            }
            return Ok(merged);
        }
        if let Some(mode) = AggregateMode::from_keyword(keyword) {
            expect_arity(keyword, args, 1, span)?;
            return Ok(Formula::Aggregate { mode, child: boxed(&args[0])? });
        }
        if let Some(mode) = SuperlativeMode::from_keyword(keyword) {
            expect_arity(keyword, args, 4, span)?;
            return Ok(Formula::Superlative {
                mode,
                rank: boxed(&args[0])?,
                count: boxed(&args[1])?,
                head: boxed(&args[2])?,
                relation: boxed(&args[3])?,
            });
        }
        if let Some(mode) = ArithmeticMode::from_keyword(keyword) {
            if args.len() == 2 {
                return Ok(Formula::Arithmetic {
                    mode,
                    left: boxed(&args[0])?,
                    right: boxed(&args[1])?,
                });
            }
        }
    }

    match args {
        [child] => Ok(Formula::Join { relation: boxed(head)?, child: boxed(child)? }),
        _ => Err(syntax(span, format!("Cannot interpret a list of {} items as a formula", items.len()))),
    }
}

// ============================================================================
// Values
// ============================================================================

/// Interpret an s-expression as a value (used for graph files).
pub fn value_from_sexpr(expr: &SExpr) -> Result<Value> {
    match expr {
        SExpr::Atom { text, .. } => Ok(atom_value(text)),
        SExpr::Str { text, .. } => Ok(Value::String(text.clone())),
        SExpr::List { items, span } => match items.split_first() {
            Some((head, args)) => match head.atom() {
                Some(keyword @ ("number" | "date" | "string" | "name" | "boolean")) => {
                    literal_value(keyword, args, *span)
                }
                _ => Err(syntax(*span, "Expected a value literal")),
            },
            None => Err(syntax(*span, "Empty value")),
        },
    }
}

/// Bare atoms are numbers when they look numeric, names otherwise.
fn atom_value(text: &str) -> Value {
    if looks_numeric(text) {
        if let Ok(v) = text.parse::<f64>() {
            return Value::number(v);
        }
    }
    Value::name(text)
}

fn literal_value(keyword: &str, args: &[SExpr], span: Span) -> Result<Value> {
    match keyword {
        "number" => {
            let (raw, unit) = match args {
                [raw] => (raw, None),
                [raw, unit] => (raw, unit.text().map(str::to_string)),
                _ => return Err(syntax(span, "'number' takes a value and an optional unit")),
            };
            let value = raw
                .atom()
                .and_then(|t| t.parse::<f64>().ok())
                .ok_or_else(|| syntax(raw.span(), "Invalid number"))?;
            Ok(Value::Number(NumberValue::new(value, unit)))
        }
        "date" => {
            expect_arity(keyword, args, 3, span)?;
            let mut parts = [0i32; 3];
            for (slot, arg) in parts.iter_mut().zip(args) {
                *slot = arg
                    .atom()
                    .and_then(|t| t.parse::<i32>().ok())
                    .ok_or_else(|| syntax(arg.span(), "Invalid date component"))?;
            }
            Ok(Value::date(parts[0], parts[1], parts[2]))
        }
        "string" => {
            expect_arity(keyword, args, 1, span)?;
            args[0].text()
                .map(Value::string)
                .ok_or_else(|| syntax(span, "Invalid string"))
        }
        "name" => {
            let id = args.first().and_then(SExpr::text)
                .ok_or_else(|| syntax(span, "'name' takes an id"))?;
            match args {
                [_] => Ok(Value::name(id)),
                [_, desc] => desc.text()
                    .map(|d| Value::described_name(id, d))
                    .ok_or_else(|| syntax(desc.span(), "Invalid description")),
                _ => Err(syntax(span, "'name' takes an id and an optional description")),
            }
        }
        "boolean" => {
            expect_arity(keyword, args, 1, span)?;
            match args[0].atom() {
                Some("true") => Ok(Value::Boolean(true)),
                Some("false") => Ok(Value::Boolean(false)),
                _ => Err(syntax(args[0].span(), "Invalid boolean")),
            }
        }
        other => Err(syntax(span, format!("Unknown literal '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::parse;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_join() {
        let f = parse("(place_of_birth honolulu)").unwrap();
        assert_eq!(f, Formula::join(Formula::name("place_of_birth"), Formula::name("honolulu")));
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(parse("(number 82 kg)").unwrap(), Formula::value(Value::number_with_unit(82.0, "kg")));
        assert_eq!(parse("(date 1926 -1 -1)").unwrap(), Formula::value(Value::date(1926, -1, -1)));
        assert_eq!(parse("\"hi\"").unwrap(), Formula::value(Value::string("hi")));
        assert_eq!(parse("3").unwrap(), Formula::value(3.0));
        assert_eq!(parse("*").unwrap(), Formula::everything());
    }

    #[test]
    fn test_parse_comparator_join() {
        let f = parse("((reverse >) (number 82))").unwrap();
        assert_eq!(f, Formula::join(Formula::reverse(Formula::name(">")), Formula::value(82.0)));
    }

    #[test]
    fn test_parse_superlative() {
        let f = parse("(argmax 1 1 * weight_kg)").unwrap();
        assert_eq!(f, Formula::superlative(
            SuperlativeMode::Argmax, 1, 1, Formula::everything(), Formula::name("weight_kg"),
        ));
    }

    #[test]
    fn test_parse_nary_and_folds_left() {
        let f = parse("(and a b c)").unwrap();
        let expected = Formula::merge(
            MergeMode::And,
            Formula::merge(MergeMode::And, Formula::name("a"), Formula::name("b")),
            Formula::name("c"),
        );
        assert_eq!(f, expected);
    }

    #[test]
    fn test_parse_lambda_and_arithmetic() {
        let f = parse("(lambda x (- (!height (var x)) (number 100)))").unwrap();
        let expected = Formula::lambda("x", Formula::arithmetic(
            ArithmeticMode::Sub,
            Formula::join(Formula::name("!height"), Formula::var("x")),
            Formula::value(100.0),
        ));
        assert_eq!(f, expected);
    }

    #[test]
    fn test_star_as_multiplication() {
        let f = parse("(* (number 2) (number 3))").unwrap();
        assert!(matches!(f, Formula::Arithmetic { mode: ArithmeticMode::Mul, .. }));
    }

    #[test]
    fn test_display_reparses() {
        let text = "(filter (weight *) (lambda x (and (!height (var x)) (> (+ (number 100) (!weight (var x)))))))";
        let f = parse(text).unwrap();
        assert_eq!(f.to_string(), text);
        assert_eq!(parse(&f.to_string()).unwrap(), f);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(parse("(a b"), Err(Error::SyntaxError { .. })));
        assert!(matches!(parse("(a b c)"), Err(Error::SyntaxError { .. })));
        assert!(matches!(parse("(count a b)"), Err(Error::SyntaxError { .. })));
        assert!(matches!(parse("()"), Err(Error::SyntaxError { .. })));
        assert!(matches!(parse("(a) (b)"), Err(Error::SyntaxError { .. })));
        assert!(matches!(parse("(date 2015 x 1)"), Err(Error::SyntaxError { .. })));
    }
}
