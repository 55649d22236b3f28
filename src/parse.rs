use std::{fmt::Display, str::FromStr};

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::{
    Lexer,
    lex::{Op, Token, TokenKind},
};

/// The grammar rule a formula broke.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatErrorKind {
    #[error("no tokens in formula")]
    EmptyFormula,
    #[error("unrecognized symbol `{0}`")]
    UnrecognizedSymbol(String),
    #[error("operand `{0}` follows another operand")]
    OperandFollowsOperand(String),
    #[error("operator `{0}` is missing its left operand")]
    OperatorMissingLeftOperand(Op),
    #[error("operator `{0}` directly follows another operator")]
    AdjacentOperators(Op),
    #[error("operator `{0}` is missing its right operand")]
    OperatorMissingRightOperand(Op),
    #[error("operand directly followed by an open parenthesis")]
    OperandBeforeOpenParen,
    #[error("unmatched closing parenthesis")]
    UnmatchedClosingParen,
    #[error("empty parenthesized group")]
    EmptyGroup,
    #[error("unbalanced parentheses: {0} left unclosed")]
    UnclosedParenthesis(usize),
    #[error("formula ends with an operator or open parenthesis")]
    DanglingEnd,
}

impl FormatErrorKind {
    fn help(&self) -> String {
        match self {
            FormatErrorKind::EmptyFormula => {
                "write a number, a variable or a parenthesized expression".into()
            }
            FormatErrorKind::UnrecognizedSymbol(token) => {
                format!("remove or correct the symbol: `{token}`")
            }
            FormatErrorKind::OperandFollowsOperand(_) => {
                "put an operator between the two operands".into()
            }
            FormatErrorKind::OperatorMissingLeftOperand(op) => format!(
                "`{op}` is always binary; negative numbers are written as `0 - x`"
            ),
            FormatErrorKind::AdjacentOperators(_) => "remove one of the operators".into(),
            FormatErrorKind::OperatorMissingRightOperand(op) => {
                format!("add an operand after `{op}`")
            }
            FormatErrorKind::OperandBeforeOpenParen => {
                "multiplication must be explicit, use `*` before `(`".into()
            }
            FormatErrorKind::UnmatchedClosingParen => {
                "remove the `)` or add a matching `(` before it".into()
            }
            FormatErrorKind::EmptyGroup => "put an expression between `(` and `)`".into(),
            FormatErrorKind::UnclosedParenthesis(n) => {
                format!("add {n} closing parenthes{}", if *n == 1 { "is" } else { "es" })
            }
            FormatErrorKind::DanglingEnd => {
                "finish the formula with a number or a variable".into()
            }
        }
    }
}

/// A formula that failed to parse, labelled at the offending token.
#[derive(Error, Debug, Diagnostic)]
#[error("{kind}")]
#[diagnostic(code(formula::syntax))]
pub struct FormulaFormatError {
    kind: FormatErrorKind,

    #[source_code]
    src: NamedSource<String>,

    #[label("here")]
    bad_bit: SourceSpan,

    #[help]
    help: String,
}

impl FormulaFormatError {
    fn build(kind: FormatErrorKind, whole: &str, span: std::ops::Range<usize>) -> Self {
        FormulaFormatError {
            help: kind.help(),
            kind,
            src: NamedSource::new("<formula>", whole.to_string()),
            bad_bit: SourceSpan::from(span),
        }
    }

    pub fn kind(&self) -> &FormatErrorKind {
        &self.kind
    }

    pub fn span(&self) -> SourceSpan {
        self.bad_bit
    }
}

/// A validated token. Unlike [`Token`] it owns its text, so a [`Formula`]
/// outlives the string it was parsed from.
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaToken {
    /// `literal` is the source spelling, kept so the formula prints back
    /// exactly as written.
    Number { value: f64, literal: String },
    Variable(String),
    Operator(Op),
    LeftParen,
    RightParen,
}

impl Display for FormulaToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormulaToken::Number { literal, .. } => write!(f, "{literal}"),
            FormulaToken::Variable(name) => write!(f, "{name}"),
            FormulaToken::Operator(op) => write!(f, "{op}"),
            FormulaToken::LeftParen => write!(f, "("),
            FormulaToken::RightParen => write!(f, ")"),
        }
    }
}

/// An arithmetic formula in infix notation that is known to be well formed.
///
/// The only way to get one is [`Formula::parse`] (or `str::parse`), which
/// checks the whole grammar up front; evaluation never re-validates.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    tokens: Vec<FormulaToken>,
}

impl Formula {
    pub fn parse(text: &str) -> Result<Formula, FormulaFormatError> {
        match Validator::new(Lexer::new(text)).run() {
            Ok(formula) => {
                tracing::debug!(%formula, tokens = formula.tokens.len(), "accepted formula");
                Ok(formula)
            }
            Err(e) => {
                tracing::debug!(input = text, error = %e, "rejected formula");
                Err(e)
            }
        }
    }

    pub fn tokens(&self) -> &[FormulaToken] {
        &self.tokens
    }

    /// Distinct variable names, in order of first appearance.
    pub fn variables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for token in &self.tokens {
            if let FormulaToken::Variable(name) = token {
                if !names.contains(&name.as_str()) {
                    names.push(name.as_str());
                }
            }
        }
        names
    }
}

impl FromStr for Formula {
    type Err = FormulaFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Formula::parse(s)
    }
}

/// Prints the tokens separated by single spaces; the output parses back to
/// an equal formula.
impl Display for Formula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tokens = self.tokens.iter();
        if let Some(first) = tokens.next() {
            write!(f, "{first}")?;
        }
        for token in tokens {
            write!(f, " {token}")?;
        }
        Ok(())
    }
}

/// What the previously accepted token allows next.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Prev {
    Start,
    Operand,
    Operator(Op),
    LeftParen,
}

struct Validator<'de> {
    whole: &'de str,
    lexer: Lexer<'de>,
    depth: usize,
    prev: Prev,
    last_span: std::ops::Range<usize>,
    tokens: Vec<FormulaToken>,
}

impl<'de> Validator<'de> {
    fn new(lexer: Lexer<'de>) -> Self {
        Validator {
            whole: lexer.source(),
            lexer,
            depth: 0,
            prev: Prev::Start,
            last_span: 0..0,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Formula, FormulaFormatError> {
        while let Some(token) = self.lexer.next() {
            self.accept(token)?;
            self.last_span = token.span();
        }

        if self.tokens.is_empty() {
            return Err(self.error_at_end(FormatErrorKind::EmptyFormula));
        }
        if self.depth != 0 {
            return Err(self.error_at_end(FormatErrorKind::UnclosedParenthesis(self.depth)));
        }
        if self.prev != Prev::Operand {
            return Err(self.error_at_end(FormatErrorKind::DanglingEnd));
        }

        Ok(Formula {
            tokens: self.tokens,
        })
    }

    fn accept(&mut self, token: Token<'de>) -> Result<(), FormulaFormatError> {
        let prev = self.prev;
        let whole = self.whole;
        let error = |kind| FormulaFormatError::build(kind, whole, token.span());

        let (accepted, next) = match token.kind {
            TokenKind::Invalid => {
                return Err(error(FormatErrorKind::UnrecognizedSymbol(
                    token.literal.to_string(),
                )));
            }
            TokenKind::Number(_) | TokenKind::Variable if prev == Prev::Operand => {
                return Err(error(FormatErrorKind::OperandFollowsOperand(
                    token.literal.to_string(),
                )));
            }
            TokenKind::Number(value) => (
                FormulaToken::Number {
                    value,
                    literal: token.literal.to_string(),
                },
                Prev::Operand,
            ),
            TokenKind::Variable => (
                FormulaToken::Variable(token.literal.to_string()),
                Prev::Operand,
            ),
            TokenKind::Operator(op) => match prev {
                Prev::Operand => (FormulaToken::Operator(op), Prev::Operator(op)),
                Prev::Operator(_) => return Err(error(FormatErrorKind::AdjacentOperators(op))),
                Prev::Start | Prev::LeftParen => {
                    return Err(error(FormatErrorKind::OperatorMissingLeftOperand(op)));
                }
            },
            TokenKind::LeftParen => {
                if prev == Prev::Operand {
                    return Err(error(FormatErrorKind::OperandBeforeOpenParen));
                }
                self.depth += 1;
                (FormulaToken::LeftParen, Prev::LeftParen)
            }
            TokenKind::RightParen => {
                if self.depth == 0 {
                    return Err(error(FormatErrorKind::UnmatchedClosingParen));
                }
                match prev {
                    Prev::Operand => {}
                    Prev::LeftParen => return Err(error(FormatErrorKind::EmptyGroup)),
                    Prev::Operator(op) => {
                        return Err(error(FormatErrorKind::OperatorMissingRightOperand(op)));
                    }
                    Prev::Start => unreachable!("depth is zero before the first token"),
                }
                self.depth -= 1;
                (FormulaToken::RightParen, Prev::Operand)
            }
        };

        self.tokens.push(accepted);
        self.prev = next;
        Ok(())
    }

    /// Errors found after the last token point at that token, or at the end
    /// of the input when there was none.
    fn error_at_end(&self, kind: FormatErrorKind) -> FormulaFormatError {
        let span = if self.tokens.is_empty() {
            self.whole.len()..self.whole.len()
        } else {
            self.last_span.clone()
        };
        FormulaFormatError::build(kind, self.whole, span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(input: &str) -> FormatErrorKind {
        match Formula::parse(input) {
            Ok(formula) => panic!("`{input}` parsed as `{formula}`"),
            Err(e) => e.kind().clone(),
        }
    }

    #[test]
    fn accepts_well_formed_formulas() {
        for input in [
            "2.5e9 + x5 / 17",
            "(5 * 2) + 8",
            "x*y-2+35/9",
            "x",
            "((1))",
            "(a + b) * (c - d) / 2",
        ] {
            assert!(Formula::parse(input).is_ok(), "`{input}` should parse");
        }
    }

    #[test]
    fn empty_input() {
        assert_eq!(rejected(""), FormatErrorKind::EmptyFormula);
        assert_eq!(rejected(" \t\n"), FormatErrorKind::EmptyFormula);
    }

    #[test]
    fn unrecognized_symbol() {
        assert_eq!(
            rejected("_"),
            FormatErrorKind::UnrecognizedSymbol("_".to_string())
        );
        assert_eq!(
            rejected("1 + $x"),
            FormatErrorKind::UnrecognizedSymbol("$".to_string())
        );
    }

    #[test]
    fn no_unary_minus() {
        assert_eq!(
            rejected("-5.3"),
            FormatErrorKind::OperatorMissingLeftOperand(Op::Minus)
        );
        assert_eq!(
            rejected("(+2)"),
            FormatErrorKind::OperatorMissingLeftOperand(Op::Plus)
        );
        assert_eq!(rejected("2 * -3"), FormatErrorKind::AdjacentOperators(Op::Minus));
    }

    #[test]
    fn adjacent_operands() {
        assert_eq!(
            rejected("2 5 + 3"),
            FormatErrorKind::OperandFollowsOperand("5".to_string())
        );
        assert_eq!(
            rejected("5 5"),
            FormatErrorKind::OperandFollowsOperand("5".to_string())
        );
        assert_eq!(
            rejected("(1) x"),
            FormatErrorKind::OperandFollowsOperand("x".to_string())
        );
        assert_eq!(rejected("2(3)"), FormatErrorKind::OperandBeforeOpenParen);
        assert_eq!(rejected("(1)(2)"), FormatErrorKind::OperandBeforeOpenParen);
    }

    #[test]
    fn parenthesis_rules() {
        assert_eq!(
            rejected("(5+)"),
            FormatErrorKind::OperatorMissingRightOperand(Op::Plus)
        );
        assert_eq!(rejected("()"), FormatErrorKind::EmptyGroup);
        assert_eq!(rejected(")"), FormatErrorKind::UnmatchedClosingParen);
        assert_eq!(rejected("1)"), FormatErrorKind::UnmatchedClosingParen);
        assert_eq!(rejected("((1)"), FormatErrorKind::UnclosedParenthesis(1));
        assert_eq!(rejected("(("), FormatErrorKind::UnclosedParenthesis(2));
    }

    #[test]
    fn dangling_end() {
        assert_eq!(rejected("1 +"), FormatErrorKind::DanglingEnd);
        assert_eq!(rejected("x /"), FormatErrorKind::DanglingEnd);
    }

    #[test]
    fn error_points_at_offending_token() {
        let err = Formula::parse("1 + * 2").unwrap_err();
        assert_eq!(err.span(), SourceSpan::from(4..5));
        assert_eq!(err.kind(), &FormatErrorKind::AdjacentOperators(Op::Star));

        let err = Formula::parse("").unwrap_err();
        assert_eq!(err.span(), SourceSpan::from(0..0));
    }

    #[test]
    fn display_round_trips() {
        for input in ["2.5e9+x5/17", "(5 * 2) + 8", "  x*y-2+35/9 ", ".5 * (a1 - 3.)"] {
            let formula = Formula::parse(input).unwrap();
            let printed = formula.to_string();
            assert_eq!(Formula::parse(&printed).unwrap(), formula, "{printed}");
        }
        assert_eq!(Formula::parse("(5*2)+8").unwrap().to_string(), "( 5 * 2 ) + 8");
    }

    #[test]
    fn variables_in_order_of_appearance() {
        let formula: Formula = "b + a * b / (c - a)".parse().unwrap();
        assert_eq!(formula.variables(), vec!["b", "a", "c"]);
        assert!(Formula::parse("1 + 2").unwrap().variables().is_empty());
    }

    #[test]
    fn tokens_exclude_whitespace() {
        let formula = Formula::parse(" ( x ) ").unwrap();
        assert_eq!(
            formula.tokens(),
            &[
                FormulaToken::LeftParen,
                FormulaToken::Variable("x".to_string()),
                FormulaToken::RightParen,
            ]
        );
    }
}
