use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Plus,
    Minus,
    Star,
    Slash,
}

impl Op {
    pub fn symbol(self) -> char {
        match self {
            Op::Plus => '+',
            Op::Minus => '-',
            Op::Star => '*',
            Op::Slash => '/',
        }
    }

    /// `*` and `/` bind tighter than `+` and `-`.
    pub fn is_multiplicative(self) -> bool {
        matches!(self, Op::Star | Op::Slash)
    }

    pub fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            Op::Plus => lhs + rhs,
            Op::Minus => lhs - rhs,
            Op::Star => lhs * rhs,
            Op::Slash => lhs / rhs,
        }
    }
}

impl Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'de> {
    pub kind: TokenKind,
    pub literal: &'de str,
    pub offset: usize,
}

impl Token<'_> {
    pub fn span(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.literal.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Variable,
    Operator(Op),
    LeftParen,
    RightParen,
    Invalid,
}

impl Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lit = self.literal;
        match self.kind {
            TokenKind::LeftParen => write!(f, "LEFT_PAREN {lit} null"),
            TokenKind::RightParen => write!(f, "RIGHT_PAREN {lit} null"),
            TokenKind::Operator(Op::Plus) => write!(f, "PLUS {lit} null"),
            TokenKind::Operator(Op::Minus) => write!(f, "MINUS {lit} null"),
            TokenKind::Operator(Op::Star) => write!(f, "STAR {lit} null"),
            TokenKind::Operator(Op::Slash) => write!(f, "SLASH {lit} null"),
            TokenKind::Variable => write!(f, "VARIABLE {lit} null"),
            TokenKind::Number(n) => {
                if n == n.trunc() {
                    write!(f, "NUMBER {lit} {n}.0")
                } else {
                    write!(f, "NUMBER {lit} {n}")
                }
            }
            TokenKind::Invalid => write!(f, "INVALID {lit} null"),
        }
    }
}

/// Splits formula text into tokens, skipping whitespace.
///
/// Text that cannot start a token is not an error here; it comes out as a
/// [`TokenKind::Invalid`] token so the validator can report it with a span.
pub struct Lexer<'de> {
    whole: &'de str,
    rest: &'de str,
    byte: usize,
}

impl<'de> Lexer<'de> {
    pub fn new(input: &'de str) -> Self {
        Lexer {
            whole: input,
            rest: input,
            byte: 0,
        }
    }

    pub fn source(&self) -> &'de str {
        self.whole
    }
}

impl<'de> Iterator for Lexer<'de> {
    type Item = Token<'de>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let mut chars = self.rest.chars();
            let c = chars.next()?;
            let cur = self.rest;
            let offset = self.byte;

            enum Started {
                Single(TokenKind),
                Variable,
                Number,
                Invalid,
            }

            let started = match c {
                '(' => Started::Single(TokenKind::LeftParen),
                ')' => Started::Single(TokenKind::RightParen),
                '+' => Started::Single(TokenKind::Operator(Op::Plus)),
                '-' => Started::Single(TokenKind::Operator(Op::Minus)),
                '*' => Started::Single(TokenKind::Operator(Op::Star)),
                '/' => Started::Single(TokenKind::Operator(Op::Slash)),
                'a'..='z' | 'A'..='Z' => Started::Variable,
                '0'..='9' => Started::Number,
                '.' if chars.as_str().starts_with(|c: char| c.is_ascii_digit()) => {
                    Started::Number
                }
                c if c.is_whitespace() => {
                    self.rest = chars.as_str();
                    self.byte += c.len_utf8();
                    continue;
                }
                _ => Started::Invalid,
            };

            let (kind, len) = match started {
                Started::Single(kind) => (kind, c.len_utf8()),
                Started::Variable => {
                    let len = cur
                        .find(|c: char| !c.is_ascii_alphanumeric())
                        .unwrap_or(cur.len());
                    (TokenKind::Variable, len)
                }
                Started::Number => {
                    let len = number_len(cur);
                    match cur[..len].parse() {
                        Ok(n) => (TokenKind::Number(n), len),
                        Err(_) => (TokenKind::Invalid, len),
                    }
                }
                Started::Invalid => {
                    let len = cur
                        .char_indices()
                        .skip(1)
                        .find(|&(i, c)| c.is_whitespace() || starts_token(&cur[i..]))
                        .map_or(cur.len(), |(i, _)| i);
                    (TokenKind::Invalid, len)
                }
            };

            let literal = &cur[..len];
            self.rest = &cur[len..];
            self.byte += len;
            return Some(Token {
                kind,
                literal,
                offset,
            });
        }
    }
}

/// True when `s` begins with something other than an unrecognized symbol.
fn starts_token(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some('(' | ')' | '+' | '-' | '*' | '/') => true,
        Some(c) if c.is_ascii_alphanumeric() => true,
        Some('.') => chars.next().is_some_and(|c| c.is_ascii_digit()),
        _ => false,
    }
}

/// Length of the longest prefix matching
/// `(\d+\.\d* | \d*\.\d+ | \d+)([eE][+-]?\d+)?`.
fn number_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let digits_from = |start: usize| {
        bytes[start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    let mut len = digits_from(0);
    if bytes.get(len) == Some(&b'.') {
        let fraction = digits_from(len + 1);
        if len > 0 || fraction > 0 {
            len += 1 + fraction;
        }
    }

    if matches!(bytes.get(len), Some(b'e' | b'E')) {
        let mut exp = len + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_digits = digits_from(exp);
        if exp_digits > 0 {
            len = exp + exp_digits;
        }
    }
    len
}
