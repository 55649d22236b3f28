//! Parsing and evaluation of spreadsheet-style infix formulas.
//!
//! A formula is built from non-negative numbers, variables (a letter
//! followed by letters or digits), parentheses and the binary operators
//! `+ - * /`. [`Formula::parse`] checks the grammar once; the resulting
//! [`Formula`] can then be evaluated any number of times, each time with a
//! caller-supplied function that resolves variable names.
//!
//! ```
//! use formulas::Formula;
//!
//! let formula: Formula = "(x + 2) * 3".parse().unwrap();
//! let value = formula.evaluate(&|name: &str| if name == "x" { Ok(1.0) } else { Err(()) });
//! assert_eq!(value, Ok(9.0));
//! ```

pub mod bindings;
pub mod eval;
pub mod lex;
pub mod parse;

pub use bindings::{Binding, BindingError, Bindings};
pub use eval::FormulaEvaluationError;
pub use lex::{Lexer, Op, Token, TokenKind};
pub use parse::{FormatErrorKind, Formula, FormulaFormatError, FormulaToken};
