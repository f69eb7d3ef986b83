//! Lexer for query expressions.
//!
//! Turns source text into a flat token stream. Each token records its byte
//! offset so later stages can point at the offending spot. Whitespace is
//! skipped; multi-character operators win over their single-character
//! prefixes (`==` before `=`, `//=` before `//` before `/`, `..` before `.`).
//!
//! The lexer always emits `-` as an operator token; whether it denotes a
//! negative literal or a subtraction is the parser's call.

use std::fmt;

/// The fixed keyword set.
///
/// `foreach` and `def` are reserved here but rejected by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    If,
    Then,
    Elif,
    Else,
    End,
    As,
    And,
    Or,
    Not,
    True,
    False,
    Null,
    Try,
    Catch,
    Reduce,
    Foreach,
    Def,
    Empty,
}

impl Keyword {
    fn from_ident(s: &str) -> Option<Keyword> {
        Some(match s {
            "if" => Keyword::If,
            "then" => Keyword::Then,
            "elif" => Keyword::Elif,
            "else" => Keyword::Else,
            "end" => Keyword::End,
            "as" => Keyword::As,
            "and" => Keyword::And,
            "or" => Keyword::Or,
            "not" => Keyword::Not,
            "true" => Keyword::True,
            "false" => Keyword::False,
            "null" => Keyword::Null,
            "try" => Keyword::Try,
            "catch" => Keyword::Catch,
            "reduce" => Keyword::Reduce,
            "foreach" => Keyword::Foreach,
            "def" => Keyword::Def,
            "empty" => Keyword::Empty,
            _ => return None,
        })
    }

    /// The keyword's spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::If => "if",
            Keyword::Then => "then",
            Keyword::Elif => "elif",
            Keyword::Else => "else",
            Keyword::End => "end",
            Keyword::As => "as",
            Keyword::And => "and",
            Keyword::Or => "or",
            Keyword::Not => "not",
            Keyword::True => "true",
            Keyword::False => "false",
            Keyword::Null => "null",
            Keyword::Try => "try",
            Keyword::Catch => "catch",
            Keyword::Reduce => "reduce",
            Keyword::Foreach => "foreach",
            Keyword::Def => "def",
            Keyword::Empty => "empty",
        }
    }
}

/// A single token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A keyword from the fixed set
    Keyword(Keyword),
    /// A number literal, kept as its spelling
    Number(String),
    /// A string literal: the text between the quotes, escapes unprocessed
    Str(String),
    /// A variable reference, without the leading `$`
    Variable(String),
    /// An identifier (field name or function name)
    Ident(String),

    // Multi-character operators
    EqEq,
    NotEq,
    LtEq,
    GtEq,
    PipeEq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashSlashEq,
    SlashSlash,
    DotDot,

    // Single-character operators and punctuation
    Dot,
    Comma,
    Semi,
    Colon,
    Question,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    LParen,
    RParen,
    Lt,
    Gt,
    Pipe,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Assign,
}

impl Token {
    /// Human-readable description for error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Keyword(k) => format!("'{}'", k.as_str()),
            Token::Number(n) => format!("number {}", n),
            Token::Str(_) => "string".to_string(),
            Token::Variable(v) => format!("${}", v),
            Token::Ident(i) => format!("'{}'", i),
            Token::EqEq => "'=='".into(),
            Token::NotEq => "'!='".into(),
            Token::LtEq => "'<='".into(),
            Token::GtEq => "'>='".into(),
            Token::PipeEq => "'|='".into(),
            Token::PlusEq => "'+='".into(),
            Token::MinusEq => "'-='".into(),
            Token::StarEq => "'*='".into(),
            Token::SlashSlashEq => "'//='".into(),
            Token::SlashSlash => "'//'".into(),
            Token::DotDot => "'..'".into(),
            Token::Dot => "'.'".into(),
            Token::Comma => "','".into(),
            Token::Semi => "';'".into(),
            Token::Colon => "':'".into(),
            Token::Question => "'?'".into(),
            Token::LBracket => "'['".into(),
            Token::RBracket => "']'".into(),
            Token::LBrace => "'{'".into(),
            Token::RBrace => "'}'".into(),
            Token::LParen => "'('".into(),
            Token::RParen => "')'".into(),
            Token::Lt => "'<'".into(),
            Token::Gt => "'>'".into(),
            Token::Pipe => "'|'".into(),
            Token::Plus => "'+'".into(),
            Token::Minus => "'-'".into(),
            Token::Star => "'*'".into(),
            Token::Slash => "'/'".into(),
            Token::Percent => "'%'".into(),
            Token::Assign => "'='".into(),
        }
    }
}

/// A token together with its byte offset in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct LexedToken {
    pub token: Token,
    pub offset: usize,
}

/// Error produced when a byte cannot be consumed by any lexical rule.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub message: String,
    pub offset: usize,
}

impl LexError {
    fn new(message: impl Into<String>, offset: usize) -> Self {
        LexError {
            message: message.into(),
            offset,
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {}", self.message, self.offset)
    }
}

impl std::error::Error for LexError {}

/// The lexer: a byte cursor over the source text.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, pos: 0 }
    }

    /// Lex the whole input into a token stream.
    pub fn tokenize(mut self) -> Result<Vec<LexedToken>, LexError> {
        let mut tokens = Vec::new();
        while let Some(tok) = self.next_token()? {
            tokens.push(tok);
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn read_ident(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    /// Read a number spelling: digits, optional fraction, optional exponent.
    fn read_number(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        // Fractional part, but never eat the `..` operator.
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let mark = self.pos;
            self.bump();
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.bump();
            }
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
            } else {
                // Not an exponent after all, e.g. `1e` in `1elif`? back out.
                self.pos = mark;
            }
        }
        self.input[start..self.pos].to_string()
    }

    /// Read a string literal, returning the raw text between the quotes.
    /// Escape pairs (`\x` for any `x`) are carried through unprocessed.
    fn read_string(&mut self) -> Result<String, LexError> {
        let start = self.pos;
        self.bump(); // opening quote
        let mut raw = String::new();
        loop {
            match self.peek() {
                None => return Err(LexError::new("unterminated string", start)),
                Some('"') => {
                    self.bump();
                    return Ok(raw);
                }
                Some('\\') => {
                    raw.push('\\');
                    self.bump();
                    match self.bump() {
                        Some(c) => raw.push(c),
                        None => return Err(LexError::new("unterminated string", start)),
                    }
                }
                Some(c) => {
                    raw.push(c);
                    self.bump();
                }
            }
        }
    }

    /// Produce the next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Result<Option<LexedToken>, LexError> {
        self.skip_ws();
        let offset = self.pos;

        let Some(c) = self.peek() else {
            return Ok(None);
        };

        // Multi-character operators, longest match first.
        for (spelling, token) in [
            ("//=", Token::SlashSlashEq),
            ("==", Token::EqEq),
            ("!=", Token::NotEq),
            ("<=", Token::LtEq),
            (">=", Token::GtEq),
            ("|=", Token::PipeEq),
            ("+=", Token::PlusEq),
            ("-=", Token::MinusEq),
            ("*=", Token::StarEq),
            ("//", Token::SlashSlash),
            ("..", Token::DotDot),
        ] {
            if self.starts_with(spelling) {
                self.pos += spelling.len();
                return Ok(Some(LexedToken { token, offset }));
            }
        }

        let token = match c {
            '.' => {
                self.bump();
                Token::Dot
            }
            ',' => {
                self.bump();
                Token::Comma
            }
            ';' => {
                self.bump();
                Token::Semi
            }
            ':' => {
                self.bump();
                Token::Colon
            }
            '?' => {
                self.bump();
                Token::Question
            }
            '[' => {
                self.bump();
                Token::LBracket
            }
            ']' => {
                self.bump();
                Token::RBracket
            }
            '{' => {
                self.bump();
                Token::LBrace
            }
            '}' => {
                self.bump();
                Token::RBrace
            }
            '(' => {
                self.bump();
                Token::LParen
            }
            ')' => {
                self.bump();
                Token::RParen
            }
            '<' => {
                self.bump();
                Token::Lt
            }
            '>' => {
                self.bump();
                Token::Gt
            }
            '|' => {
                self.bump();
                Token::Pipe
            }
            '+' => {
                self.bump();
                Token::Plus
            }
            '-' => {
                self.bump();
                Token::Minus
            }
            '*' => {
                self.bump();
                Token::Star
            }
            '/' => {
                self.bump();
                Token::Slash
            }
            '%' => {
                self.bump();
                Token::Percent
            }
            '=' => {
                self.bump();
                Token::Assign
            }
            '"' => Token::Str(self.read_string()?),
            '$' => {
                self.bump();
                if self.peek().is_some_and(|c| c.is_alphabetic() || c == '_') {
                    Token::Variable(self.read_ident())
                } else {
                    return Err(LexError::new("expected identifier after '$'", offset));
                }
            }
            c if c.is_ascii_digit() => Token::Number(self.read_number()),
            c if c.is_alphabetic() || c == '_' => {
                let ident = self.read_ident();
                match Keyword::from_ident(&ident) {
                    Some(kw) => Token::Keyword(kw),
                    None => Token::Ident(ident),
                }
            }
            c => return Err(LexError::new(format!("unexpected character '{}'", c), offset)),
        };

        Ok(Some(LexedToken { token, offset }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<Token> {
        Lexer::new(input)
            .tokenize()
            .expect("lex failed")
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            lex("if then elif else end as and or not true false null try catch reduce foreach def empty"),
            vec![
                Token::Keyword(Keyword::If),
                Token::Keyword(Keyword::Then),
                Token::Keyword(Keyword::Elif),
                Token::Keyword(Keyword::Else),
                Token::Keyword(Keyword::End),
                Token::Keyword(Keyword::As),
                Token::Keyword(Keyword::And),
                Token::Keyword(Keyword::Or),
                Token::Keyword(Keyword::Not),
                Token::Keyword(Keyword::True),
                Token::Keyword(Keyword::False),
                Token::Keyword(Keyword::Null),
                Token::Keyword(Keyword::Try),
                Token::Keyword(Keyword::Catch),
                Token::Keyword(Keyword::Reduce),
                Token::Keyword(Keyword::Foreach),
                Token::Keyword(Keyword::Def),
                Token::Keyword(Keyword::Empty),
            ]
        );
    }

    #[test]
    fn test_keyword_prefix_is_ident() {
        assert_eq!(lex("iffy"), vec![Token::Ident("iffy".into())]);
        assert_eq!(lex("nottrue"), vec![Token::Ident("nottrue".into())]);
    }

    #[test]
    fn test_operators_longest_match() {
        assert_eq!(lex("=="), vec![Token::EqEq]);
        assert_eq!(lex("="), vec![Token::Assign]);
        assert_eq!(lex("//="), vec![Token::SlashSlashEq]);
        assert_eq!(lex("//"), vec![Token::SlashSlash]);
        assert_eq!(lex("/"), vec![Token::Slash]);
        assert_eq!(lex("|="), vec![Token::PipeEq]);
        assert_eq!(lex("|"), vec![Token::Pipe]);
        assert_eq!(lex(".."), vec![Token::DotDot]);
        assert_eq!(lex("."), vec![Token::Dot]);
        assert_eq!(lex("<= >= < >"), vec![Token::LtEq, Token::GtEq, Token::Lt, Token::Gt]);
        assert_eq!(lex("+= -= *="), vec![Token::PlusEq, Token::MinusEq, Token::StarEq]);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(lex("42"), vec![Token::Number("42".into())]);
        assert_eq!(lex("3.14"), vec![Token::Number("3.14".into())]);
        assert_eq!(lex("1e10"), vec![Token::Number("1e10".into())]);
        assert_eq!(lex("2.5e-3"), vec![Token::Number("2.5e-3".into())]);
        // Minus is always an operator token.
        assert_eq!(
            lex("-5"),
            vec![Token::Minus, Token::Number("5".into())]
        );
        // `1..2` must not eat the range dots as a fraction.
        assert_eq!(
            lex("1..2"),
            vec![
                Token::Number("1".into()),
                Token::DotDot,
                Token::Number("2".into())
            ]
        );
    }

    #[test]
    fn test_strings_are_raw() {
        assert_eq!(lex(r#""hello""#), vec![Token::Str("hello".into())]);
        // Escapes come through unprocessed.
        assert_eq!(lex(r#""a\nb""#), vec![Token::Str(r"a\nb".into())]);
        assert_eq!(lex(r#""say \"hi\"""#), vec![Token::Str(r#"say \"hi\""#.into())]);
        // Interpolation marker is just another escape pair at this level.
        assert_eq!(lex(r#""x \(.a)""#), vec![Token::Str(r"x \(.a)".into())]);
    }

    #[test]
    fn test_variables() {
        assert_eq!(lex("$foo"), vec![Token::Variable("foo".into())]);
        assert_eq!(lex("$_x1"), vec![Token::Variable("_x1".into())]);
        assert!(Lexer::new("$ ").tokenize().is_err());
    }

    #[test]
    fn test_offsets() {
        let tokens = Lexer::new(".foo | .bar").tokenize().unwrap();
        let offsets: Vec<usize> = tokens.iter().map(|t| t.offset).collect();
        assert_eq!(offsets, vec![0, 1, 5, 7, 8]);
    }

    #[test]
    fn test_expression_stream() {
        assert_eq!(
            lex(r#".users[0].name == "Alice""#),
            vec![
                Token::Dot,
                Token::Ident("users".into()),
                Token::LBracket,
                Token::Number("0".into()),
                Token::RBracket,
                Token::Dot,
                Token::Ident("name".into()),
                Token::EqEq,
                Token::Str("Alice".into()),
            ]
        );
    }

    #[test]
    fn test_unexpected_character() {
        let err = Lexer::new(".a & .b").tokenize().unwrap_err();
        assert_eq!(err.offset, 3);
        assert!(err.message.contains('&'));
    }

    #[test]
    fn test_unterminated_string() {
        assert!(Lexer::new(r#""oops"#).tokenize().is_err());
    }
}
