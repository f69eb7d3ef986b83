//! Parser for query expressions.
//!
//! Consumes the token stream produced by the lexer and builds an [`Expr`]
//! tree using precedence climbing. Binary operators sit in a fixed
//! precedence table; keyword-introduced forms (`if`/`then`/`elif`/`else`/
//! `end`, `try`/`catch`, `reduce`, `... as $x | ...`) are parsed as special
//! productions dispatched from primary position or, for `as`, from the
//! climbing loop.
//!
//! Precedence, lowest to highest:
//!
//! | prec | operators                    | assoc |
//! |------|------------------------------|-------|
//! | 0    | `=` `|=` `+=` `-=` `*=` `//=`| right |
//! | 1    | `|`                          | left  |
//! | 2    | `,`                          | left  |
//! | 3    | `as`                         | right |
//! | 4    | `//`                         | right |
//! | 5    | `or`                         | left  |
//! | 6    | `and`                        | left  |
//! | 7    | `==` `!=`                    | left  |
//! | 8    | `<` `>` `<=` `>=`            | left  |
//! | 9    | `+` `-`                      | left  |
//! | 10   | `*` `/` `%`                  | left  |

use std::fmt;

use super::expr::{
    AssignOp, BinOp, Expr, InterpPart, Literal, ObjectField, ObjectKey, Pattern, PatternEntry,
    UnaryOp,
};
use super::lexer::{Keyword, LexError, LexedToken, Lexer, Token};

/// Error raised when an expression fails to parse.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    fn new(message: impl Into<String>, position: usize) -> Self {
        ParseError {
            message: message.into(),
            position,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parse error at position {}: {}",
            self.position, self.message
        )
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError::new(err.message, err.offset)
    }
}

const PREC_ASSIGN: u8 = 0;
const PREC_PIPE: u8 = 1;
const PREC_COMMA: u8 = 2;
const PREC_AS: u8 = 3;
const PREC_ALT: u8 = 4;

/// Parse an expression string into an AST.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let tokens = Lexer::new(input).tokenize()?;
    if tokens.is_empty() {
        return Err(ParseError::new("empty expression", 0));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        end: input.len(),
    };
    let expr = parser.parse_expr(PREC_ASSIGN)?;

    if let Some(tok) = parser.peek() {
        return Err(ParseError::new(
            format!("unexpected {}", tok.describe()),
            parser.offset(),
        ));
    }

    Ok(expr)
}

struct Parser {
    tokens: Vec<LexedToken>,
    pos: usize,
    end: usize,
}

/// Precedence and right-associativity of an infix token.
fn infix_precedence(token: &Token) -> Option<(u8, bool)> {
    Some(match token {
        Token::Assign
        | Token::PipeEq
        | Token::PlusEq
        | Token::MinusEq
        | Token::StarEq
        | Token::SlashSlashEq => (PREC_ASSIGN, true),
        Token::Pipe => (PREC_PIPE, false),
        Token::Comma => (PREC_COMMA, false),
        Token::Keyword(Keyword::As) => (PREC_AS, true),
        Token::SlashSlash => (PREC_ALT, true),
        Token::Keyword(Keyword::Or) => (5, false),
        Token::Keyword(Keyword::And) => (6, false),
        Token::EqEq | Token::NotEq => (7, false),
        Token::Lt | Token::Gt | Token::LtEq | Token::GtEq => (8, false),
        Token::Plus | Token::Minus => (9, false),
        Token::Star | Token::Slash | Token::Percent => (10, false),
        _ => return None,
    })
}

/// True if a token can begin a primary expression. Used to decide whether a
/// bare `not` is the zero-argument form or a prefix negation.
fn can_start_primary(token: &Token) -> bool {
    matches!(
        token,
        Token::Dot
            | Token::DotDot
            | Token::LParen
            | Token::LBracket
            | Token::LBrace
            | Token::Str(_)
            | Token::Number(_)
            | Token::Minus
            | Token::Variable(_)
            | Token::Ident(_)
            | Token::Keyword(
                Keyword::True
                    | Keyword::False
                    | Keyword::Null
                    | Keyword::Not
                    | Keyword::If
                    | Keyword::Try
                    | Keyword::Reduce
                    | Keyword::Empty
            )
    )
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn peek_at(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n).map(|t| &t.token)
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    /// Byte offset of the current token, or of the end of input.
    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map(|t| t.offset).unwrap_or(self.end)
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), ParseError> {
        match self.peek() {
            Some(tok) if tok == expected => {
                self.bump();
                Ok(())
            }
            Some(tok) => Err(ParseError::new(
                format!("expected {}, found {}", what, tok.describe()),
                self.offset(),
            )),
            None => Err(ParseError::new(
                format!("expected {}, found end of expression", what),
                self.offset(),
            )),
        }
    }

    fn expect_keyword(&mut self, kw: Keyword) -> Result<(), ParseError> {
        self.expect(&Token::Keyword(kw), &format!("'{}'", kw.as_str()))
    }

    fn expect_variable(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some(Token::Variable(name)) => {
                let name = name.clone();
                self.bump();
                Ok(name)
            }
            Some(tok) => Err(ParseError::new(
                format!("expected '$name', found {}", tok.describe()),
                self.offset(),
            )),
            None => Err(ParseError::new(
                "expected '$name', found end of expression",
                self.offset(),
            )),
        }
    }

    fn parse_expr(&mut self, min_prec: u8) -> Result<Expr, ParseError> {
        self.parse_expr_inner(min_prec, true)
    }

    /// Precedence-climbing loop. `allow_comma` is cleared while parsing an
    /// object field value, where a top-level comma separates fields instead.
    fn parse_expr_inner(&mut self, min_prec: u8, allow_comma: bool) -> Result<Expr, ParseError> {
        let mut left = self.parse_postfix()?;

        loop {
            let Some(tok) = self.peek() else { break };
            let Some((prec, right_assoc)) = infix_precedence(tok) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            if *tok == Token::Comma && !allow_comma {
                break;
            }

            if *tok == Token::Keyword(Keyword::As) {
                self.bump();
                left = self.parse_binding(left, allow_comma)?;
                // The binding body swallowed the rest of this expression.
                break;
            }

            let tok = tok.clone();
            self.bump();
            let next_min = if right_assoc { prec } else { prec + 1 };

            left = match tok {
                Token::Pipe => {
                    Expr::pipe(left, self.parse_expr_inner(next_min, allow_comma)?)
                }
                Token::Comma => {
                    let right = self.parse_expr_inner(next_min, allow_comma)?;
                    match left {
                        Expr::Comma(mut exprs) => {
                            exprs.push(right);
                            Expr::Comma(exprs)
                        }
                        other => Expr::Comma(vec![other, right]),
                    }
                }
                Token::SlashSlash => Expr::Alternative {
                    left: Box::new(left),
                    right: Box::new(self.parse_expr_inner(next_min, allow_comma)?),
                },
                Token::Assign
                | Token::PipeEq
                | Token::PlusEq
                | Token::MinusEq
                | Token::StarEq
                | Token::SlashSlashEq => {
                    let op = match tok {
                        Token::Assign => AssignOp::Set,
                        Token::PipeEq => AssignOp::Update,
                        Token::PlusEq => AssignOp::Add,
                        Token::MinusEq => AssignOp::Sub,
                        Token::StarEq => AssignOp::Mul,
                        _ => AssignOp::Alternative,
                    };
                    Expr::Assign {
                        path: Box::new(left),
                        op,
                        value: Box::new(self.parse_expr_inner(next_min, allow_comma)?),
                    }
                }
                other => {
                    let op = match other {
                        Token::Keyword(Keyword::Or) => BinOp::Or,
                        Token::Keyword(Keyword::And) => BinOp::And,
                        Token::EqEq => BinOp::Eq,
                        Token::NotEq => BinOp::Ne,
                        Token::Lt => BinOp::Lt,
                        Token::LtEq => BinOp::Le,
                        Token::Gt => BinOp::Gt,
                        Token::GtEq => BinOp::Ge,
                        Token::Plus => BinOp::Add,
                        Token::Minus => BinOp::Sub,
                        Token::Star => BinOp::Mul,
                        Token::Slash => BinOp::Div,
                        Token::Percent => BinOp::Mod,
                        _ => unreachable!("non-operator in climbing loop"),
                    };
                    Expr::binary(op, left, self.parse_expr_inner(next_min, allow_comma)?)
                }
            };
        }

        Ok(left)
    }

    /// Parse the tail of `EXPR as ...`: a `$var` or `{...}` pattern, the
    /// mandatory `|`, and the body.
    fn parse_binding(&mut self, expr: Expr, allow_comma: bool) -> Result<Expr, ParseError> {
        match self.peek() {
            Some(Token::Variable(_)) => {
                let var = self.expect_variable()?;
                self.expect(&Token::Pipe, "'|' after binding")?;
                let body = self.parse_expr_inner(PREC_ASSIGN, allow_comma)?;
                Ok(Expr::Bind {
                    expr: Box::new(expr),
                    var,
                    body: Box::new(body),
                })
            }
            Some(Token::LBrace) => {
                let pattern = self.parse_pattern()?;
                self.expect(&Token::Pipe, "'|' after binding")?;
                let body = self.parse_expr_inner(PREC_ASSIGN, allow_comma)?;
                Ok(Expr::BindPattern {
                    expr: Box::new(expr),
                    pattern,
                    body: Box::new(body),
                })
            }
            _ => Err(ParseError::new(
                "expected '$name' or '{' pattern after 'as'",
                self.offset(),
            )),
        }
    }

    /// Parse a destructuring pattern: `{key: $var, "key": $var, ...}`.
    fn parse_pattern(&mut self) -> Result<Pattern, ParseError> {
        self.expect(&Token::LBrace, "'{'")?;
        let mut entries = Vec::new();

        if self.peek() == Some(&Token::RBrace) {
            self.bump();
            return Ok(Pattern { entries });
        }

        loop {
            let key = match self.peek() {
                Some(Token::Ident(name)) => {
                    let name = name.clone();
                    self.bump();
                    name
                }
                Some(Token::Str(raw)) => {
                    let raw = raw.clone();
                    let offset = self.offset();
                    self.bump();
                    match self.string_expr_from_raw(&raw, offset)? {
                        Expr::Literal(Literal::String(s)) => s,
                        _ => {
                            return Err(ParseError::new(
                                "pattern key must be a plain string",
                                offset,
                            ));
                        }
                    }
                }
                _ => {
                    return Err(ParseError::new(
                        "expected field name in pattern",
                        self.offset(),
                    ));
                }
            };

            self.expect(&Token::Colon, "':' in pattern")?;
            let var = self.expect_variable()?;
            entries.push(PatternEntry { key, var });

            match self.peek() {
                Some(Token::Comma) => self.bump(),
                Some(Token::RBrace) => {
                    self.bump();
                    break;
                }
                _ => {
                    return Err(ParseError::new(
                        "expected ',' or '}' in pattern",
                        self.offset(),
                    ));
                }
            }
        }

        Ok(Pattern { entries })
    }

    /// Parse a primary expression followed by its postfix chain:
    /// `.field`, `[...]` accesses, and trailing `?`.
    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.peek() {
                Some(Token::Dot) => match self.peek_at(1) {
                    Some(Token::Ident(_)) => {
                        self.bump();
                        let name = match self.peek() {
                            Some(Token::Ident(name)) => name.clone(),
                            _ => unreachable!(),
                        };
                        self.bump();
                        expr = Expr::Field {
                            name,
                            from: Some(Box::new(expr)),
                        };
                    }
                    Some(Token::LBracket) => {
                        self.bump();
                        expr = self.parse_bracket(Some(Box::new(expr)))?;
                    }
                    _ => break,
                },
                Some(Token::LBracket) => {
                    expr = self.parse_bracket(Some(Box::new(expr)))?;
                }
                Some(Token::Question) => {
                    self.bump();
                    expr = Expr::Optional(Box::new(expr));
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let offset = self.offset();
        let Some(tok) = self.peek() else {
            return Err(ParseError::new("unexpected end of expression", offset));
        };

        match tok.clone() {
            Token::Dot => {
                self.bump();
                match self.peek() {
                    Some(Token::Ident(name)) => {
                        let name = name.clone();
                        self.bump();
                        Ok(Expr::Field { name, from: None })
                    }
                    Some(Token::LBracket) => self.parse_bracket(None),
                    _ => Ok(Expr::Identity),
                }
            }

            Token::DotDot => {
                self.bump();
                Ok(Expr::RecursiveDescent { from: None })
            }

            Token::LParen => {
                self.bump();
                let inner = self.parse_expr(PREC_ASSIGN)?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }

            Token::LBracket => {
                self.bump();
                if self.peek() == Some(&Token::RBracket) {
                    self.bump();
                    return Ok(Expr::Array(None));
                }
                let inner = self.parse_expr(PREC_ASSIGN)?;
                self.expect(&Token::RBracket, "']'")?;
                Ok(Expr::Array(Some(Box::new(inner))))
            }

            Token::LBrace => self.parse_object(),

            Token::Str(raw) => {
                self.bump();
                self.string_expr_from_raw(&raw, offset)
            }

            Token::Number(text) => {
                self.bump();
                Ok(Expr::Literal(self.number_literal(&text, false, offset)?))
            }

            Token::Minus => {
                self.bump();
                if let Some(Token::Number(text)) = self.peek() {
                    let text = text.clone();
                    self.bump();
                    Ok(Expr::Literal(self.number_literal(&text, true, offset)?))
                } else {
                    let operand = self.parse_postfix()?;
                    Ok(Expr::Unary {
                        op: UnaryOp::Neg,
                        expr: Box::new(operand),
                    })
                }
            }

            Token::Variable(name) => {
                self.bump();
                Ok(Expr::Var(name))
            }

            Token::Keyword(Keyword::True) => {
                self.bump();
                Ok(Expr::Literal(Literal::Bool(true)))
            }
            Token::Keyword(Keyword::False) => {
                self.bump();
                Ok(Expr::Literal(Literal::Bool(false)))
            }
            Token::Keyword(Keyword::Null) => {
                self.bump();
                Ok(Expr::Literal(Literal::Null))
            }

            Token::Keyword(Keyword::Not) => {
                self.bump();
                // Bare `not` in trailing position is the zero-argument form
                // that negates the current value.
                let prefix = self.peek().is_some_and(can_start_primary);
                if prefix {
                    let operand = self.parse_postfix()?;
                    Ok(Expr::Unary {
                        op: UnaryOp::Not,
                        expr: Box::new(operand),
                    })
                } else {
                    Ok(Expr::Call {
                        name: "not".into(),
                        args: Vec::new(),
                    })
                }
            }

            Token::Keyword(Keyword::If) => self.parse_if(),
            Token::Keyword(Keyword::Try) => self.parse_try(),
            Token::Keyword(Keyword::Reduce) => self.parse_reduce(),

            Token::Keyword(Keyword::Empty) => {
                self.bump();
                Ok(Expr::Call {
                    name: "empty".into(),
                    args: Vec::new(),
                })
            }

            Token::Keyword(kw @ (Keyword::Foreach | Keyword::Def)) => Err(ParseError::new(
                format!("'{}' is reserved but not supported", kw.as_str()),
                offset,
            )),

            Token::Keyword(kw) => Err(ParseError::new(
                format!("unexpected keyword '{}'", kw.as_str()),
                offset,
            )),

            Token::Ident(name) => {
                self.bump();
                self.parse_call(name)
            }

            other => Err(ParseError::new(
                format!("unexpected {}", other.describe()),
                offset,
            )),
        }
    }

    /// Parse the inside of `[...]` after a navigation root. The opening
    /// bracket is the current token.
    fn parse_bracket(&mut self, from: Option<Box<Expr>>) -> Result<Expr, ParseError> {
        self.expect(&Token::LBracket, "'['")?;

        match self.peek() {
            // `[]` — iterate
            Some(Token::RBracket) => {
                self.bump();
                Ok(Expr::Iterate { from })
            }

            // `["key"]` — field access, or a dynamic interpolated key
            Some(Token::Str(raw)) if self.peek_at(1) == Some(&Token::RBracket) => {
                let raw = raw.clone();
                let offset = self.offset();
                self.bump();
                self.bump();
                match self.string_expr_from_raw(&raw, offset)? {
                    Expr::Literal(Literal::String(name)) => Ok(Expr::Field { name, from }),
                    key => Ok(Expr::DynamicIndex {
                        key: Box::new(key),
                        from,
                    }),
                }
            }

            // `[:n]` or `[:]` — slice with no start
            Some(Token::Colon) => {
                self.bump();
                if self.peek() == Some(&Token::RBracket) {
                    self.bump();
                    return Ok(Expr::Slice {
                        start: None,
                        end: None,
                        from,
                    });
                }
                let end = self.parse_integer()?;
                self.expect(&Token::RBracket, "']'")?;
                Ok(Expr::Slice {
                    start: None,
                    end: Some(end),
                    from,
                })
            }

            _ => {
                // Integer index or slice; anything else is a dynamic key.
                let mark = self.pos;
                if let Some(index) = self.try_parse_integer() {
                    match self.peek() {
                        Some(Token::RBracket) => {
                            self.bump();
                            return Ok(Expr::Index { index, from });
                        }
                        Some(Token::Colon) => {
                            self.bump();
                            if self.peek() == Some(&Token::RBracket) {
                                self.bump();
                                return Ok(Expr::Slice {
                                    start: Some(index),
                                    end: None,
                                    from,
                                });
                            }
                            let end = self.parse_integer()?;
                            self.expect(&Token::RBracket, "']'")?;
                            return Ok(Expr::Slice {
                                start: Some(index),
                                end: Some(end),
                                from,
                            });
                        }
                        _ => self.pos = mark,
                    }
                }

                let key = self.parse_expr(PREC_ASSIGN)?;
                self.expect(&Token::RBracket, "']'")?;
                Ok(Expr::DynamicIndex {
                    key: Box::new(key),
                    from,
                })
            }
        }
    }

    /// Consume an integer (with optional leading minus) if the next tokens
    /// form one; otherwise restore the position and return `None`.
    fn try_parse_integer(&mut self) -> Option<i64> {
        let mark = self.pos;
        let negative = if self.peek() == Some(&Token::Minus) {
            self.bump();
            true
        } else {
            false
        };

        if let Some(Token::Number(text)) = self.peek() {
            if !text.contains(['.', 'e', 'E']) {
                if let Ok(n) = text.parse::<i64>() {
                    self.bump();
                    return Some(if negative { -n } else { n });
                }
            }
        }

        self.pos = mark;
        None
    }

    fn parse_integer(&mut self) -> Result<i64, ParseError> {
        self.try_parse_integer()
            .ok_or_else(|| ParseError::new("expected integer", self.offset()))
    }

    fn number_literal(
        &self,
        text: &str,
        negative: bool,
        offset: usize,
    ) -> Result<Literal, ParseError> {
        if text.contains(['.', 'e', 'E']) {
            let f: f64 = text
                .parse()
                .map_err(|_| ParseError::new("invalid number literal", offset))?;
            Ok(Literal::Float(if negative { -f } else { f }))
        } else {
            match text.parse::<i64>() {
                Ok(n) => Ok(Literal::Int(if negative { -n } else { n })),
                // Out of i64 range; fall back to a float.
                Err(_) => {
                    let f: f64 = text
                        .parse()
                        .map_err(|_| ParseError::new("invalid number literal", offset))?;
                    Ok(Literal::Float(if negative { -f } else { f }))
                }
            }
        }
    }

    /// Parse `if COND then THEN (elif COND then THEN)* (else ELSE)? end`.
    fn parse_if(&mut self) -> Result<Expr, ParseError> {
        self.expect_keyword(Keyword::If)?;
        let cond = self.parse_expr(PREC_ASSIGN)?;
        self.expect_keyword(Keyword::Then)?;
        let then = self.parse_expr(PREC_ASSIGN)?;
        let otherwise = self.parse_else()?;
        Ok(Expr::If {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn parse_else(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Some(Token::Keyword(Keyword::Elif)) => {
                self.bump();
                let cond = self.parse_expr(PREC_ASSIGN)?;
                self.expect_keyword(Keyword::Then)?;
                let then = self.parse_expr(PREC_ASSIGN)?;
                let otherwise = self.parse_else()?;
                Ok(Expr::If {
                    cond: Box::new(cond),
                    then: Box::new(then),
                    otherwise: Box::new(otherwise),
                })
            }
            Some(Token::Keyword(Keyword::Else)) => {
                self.bump();
                let otherwise = self.parse_expr(PREC_ASSIGN)?;
                self.expect_keyword(Keyword::End)?;
                Ok(otherwise)
            }
            Some(Token::Keyword(Keyword::End)) => {
                self.bump();
                // No else branch: the input passes through unchanged.
                Ok(Expr::Identity)
            }
            _ => Err(ParseError::new(
                "expected 'elif', 'else', or 'end'",
                self.offset(),
            )),
        }
    }

    /// Parse `try EXPR (catch HANDLER)?`.
    fn parse_try(&mut self) -> Result<Expr, ParseError> {
        self.expect_keyword(Keyword::Try)?;
        let body = self.parse_postfix()?;
        let handler = if self.peek() == Some(&Token::Keyword(Keyword::Catch)) {
            self.bump();
            Some(Box::new(self.parse_postfix()?))
        } else {
            None
        };
        Ok(Expr::TryCatch {
            body: Box::new(body),
            handler,
        })
    }

    /// Parse `reduce EXPR as $var (INIT; UPDATE)`.
    fn parse_reduce(&mut self) -> Result<Expr, ParseError> {
        self.expect_keyword(Keyword::Reduce)?;
        let input = self.parse_expr(PREC_ALT)?;
        self.expect_keyword(Keyword::As)?;
        let var = self.expect_variable()?;
        self.expect(&Token::LParen, "'('")?;
        let init = self.parse_expr(PREC_ASSIGN)?;
        self.expect(&Token::Semi, "';'")?;
        let update = self.parse_expr(PREC_ASSIGN)?;
        self.expect(&Token::RParen, "')'")?;
        Ok(Expr::Reduce {
            input: Box::new(input),
            var,
            init: Box::new(init),
            update: Box::new(update),
        })
    }

    /// Parse a function call: zero-arg, or `name(arg; arg; ...)`.
    fn parse_call(&mut self, name: String) -> Result<Expr, ParseError> {
        if self.peek() != Some(&Token::LParen) {
            return Ok(Expr::Call {
                name,
                args: Vec::new(),
            });
        }
        self.bump();

        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.bump();
            return Ok(Expr::Call { name, args });
        }

        loop {
            args.push(self.parse_expr(PREC_ASSIGN)?);
            match self.peek() {
                Some(Token::Semi) => self.bump(),
                Some(Token::RParen) => {
                    self.bump();
                    break;
                }
                _ => {
                    return Err(ParseError::new(
                        "expected ';' or ')' in function arguments",
                        self.offset(),
                    ));
                }
            }
        }

        Ok(Expr::Call { name, args })
    }

    /// Parse object construction `{...}`. The opening brace is current.
    fn parse_object(&mut self) -> Result<Expr, ParseError> {
        self.expect(&Token::LBrace, "'{'")?;

        let mut fields = Vec::new();
        if self.peek() == Some(&Token::RBrace) {
            self.bump();
            return Ok(Expr::Object(fields));
        }

        loop {
            let field = match self.peek() {
                Some(Token::Ident(name)) => {
                    let name = name.clone();
                    self.bump();
                    if self.peek() == Some(&Token::Colon) {
                        self.bump();
                        let value = self.parse_expr_inner(PREC_ASSIGN, false)?;
                        ObjectField {
                            key: ObjectKey::Literal(name),
                            value,
                        }
                    } else {
                        // Shorthand: `{foo}` means `{foo: .foo}`.
                        ObjectField {
                            key: ObjectKey::Literal(name.clone()),
                            value: Expr::field(name),
                        }
                    }
                }
                Some(Token::Str(raw)) => {
                    let raw = raw.clone();
                    let offset = self.offset();
                    self.bump();
                    let key = match self.string_expr_from_raw(&raw, offset)? {
                        Expr::Literal(Literal::String(s)) => ObjectKey::Literal(s),
                        dynamic => ObjectKey::Expr(Box::new(dynamic)),
                    };
                    self.expect(&Token::Colon, "':' after object key")?;
                    let value = self.parse_expr_inner(PREC_ASSIGN, false)?;
                    ObjectField { key, value }
                }
                Some(Token::LParen) => {
                    self.bump();
                    let key_expr = self.parse_expr(PREC_ASSIGN)?;
                    self.expect(&Token::RParen, "')'")?;
                    self.expect(&Token::Colon, "':' after computed key")?;
                    let value = self.parse_expr_inner(PREC_ASSIGN, false)?;
                    ObjectField {
                        key: ObjectKey::Expr(Box::new(key_expr)),
                        value,
                    }
                }
                _ => {
                    return Err(ParseError::new("expected object key", self.offset()));
                }
            };

            fields.push(field);

            match self.peek() {
                Some(Token::Comma) => self.bump(),
                Some(Token::RBrace) => {
                    self.bump();
                    break;
                }
                _ => {
                    return Err(ParseError::new(
                        "expected ',' or '}' in object",
                        self.offset(),
                    ));
                }
            }
        }

        Ok(Expr::Object(fields))
    }

    /// Turn the raw text of a string token into either a plain string
    /// literal or a string-interpolation node. Escapes are processed here;
    /// `\(...)` fragments are re-parsed as expressions.
    fn string_expr_from_raw(&self, raw: &str, offset: usize) -> Result<Expr, ParseError> {
        let chars: Vec<char> = raw.chars().collect();
        let mut parts: Vec<InterpPart> = Vec::new();
        let mut lit = String::new();
        let mut i = 0;

        while i < chars.len() {
            if chars[i] != '\\' {
                lit.push(chars[i]);
                i += 1;
                continue;
            }

            // The lexer guarantees every backslash is followed by a char.
            let esc = chars[i + 1];
            i += 2;
            match esc {
                '(' => {
                    let start = i;
                    let mut depth = 1usize;
                    while i < chars.len() && depth > 0 {
                        match chars[i] {
                            '(' => depth += 1,
                            ')' => depth -= 1,
                            _ => {}
                        }
                        i += 1;
                    }
                    if depth > 0 {
                        return Err(ParseError::new("unterminated interpolation", offset));
                    }
                    let fragment: String = chars[start..i - 1].iter().collect();
                    let inner = parse(&fragment).map_err(|e| {
                        ParseError::new(format!("in interpolation: {}", e.message), offset)
                    })?;
                    if !lit.is_empty() {
                        parts.push(InterpPart::Literal(std::mem::take(&mut lit)));
                    }
                    parts.push(InterpPart::Expr(Box::new(inner)));
                }
                '"' => lit.push('"'),
                '\\' => lit.push('\\'),
                '/' => lit.push('/'),
                'n' => lit.push('\n'),
                'r' => lit.push('\r'),
                't' => lit.push('\t'),
                'b' => lit.push('\x08'),
                'f' => lit.push('\x0C'),
                'u' => {
                    if i + 4 > chars.len() {
                        return Err(ParseError::new("invalid unicode escape", offset));
                    }
                    let hex: String = chars[i..i + 4].iter().collect();
                    i += 4;
                    let code = u32::from_str_radix(&hex, 16)
                        .map_err(|_| ParseError::new("invalid unicode escape", offset))?;
                    let c = char::from_u32(code)
                        .ok_or_else(|| ParseError::new("invalid unicode code point", offset))?;
                    lit.push(c);
                }
                other => {
                    return Err(ParseError::new(
                        format!("invalid escape sequence '\\{}'", other),
                        offset,
                    ));
                }
            }
        }

        if parts.is_empty() {
            return Ok(Expr::Literal(Literal::String(lit)));
        }
        if !lit.is_empty() {
            parts.push(InterpPart::Literal(lit));
        }
        Ok(Expr::Interp(parts))
    }
}
