use std::cell::Cell;
use std::collections::HashMap;

use formulas::{FormatErrorKind, Formula, FormulaEvaluationError, Lexer, TokenKind};

fn undefined(_: &str) -> Result<f64, ()> {
    Err(())
}

#[test]
fn documented_valid_formulas() {
    for input in ["2.5e9 + x5 / 17", "(5 * 2) + 8", "x*y-2+35/9"] {
        if let Err(e) = Formula::parse(input) {
            panic!("`{input}` failed to parse: {e:?}");
        }
    }
}

#[test]
fn documented_invalid_formulas() {
    for input in ["_", "", "-5.3", "2 5 + 3", "(5+)", "5 5"] {
        assert!(Formula::parse(input).is_err(), "`{input}` should be rejected");
    }
}

#[test]
fn reprinted_formula_tokenizes_the_same() {
    for input in [
        "2.5e9 + x5 / 17",
        "(5 * 2) + 8",
        "x*y-2+35/9",
        "((a1))/(b2*3.)-.5E+3",
    ] {
        let formula = Formula::parse(input).unwrap();
        let printed = formula.to_string();
        let original: Vec<(TokenKind, &str)> =
            Lexer::new(input).map(|t| (t.kind, t.literal)).collect();
        let reprinted: Vec<(TokenKind, &str)> =
            Lexer::new(&printed).map(|t| (t.kind, t.literal)).collect();
        assert_eq!(original, reprinted, "`{input}` reprinted as `{printed}`");
    }
}

#[test]
fn token_literals_rebuild_source_without_whitespace() {
    let input = " 2.5e9 +\tx5\n/ (17 - y) ";
    let joined: String = Lexer::new(input).map(|t| t.literal).collect();
    let stripped: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    assert_eq!(joined, stripped);
}

#[test]
fn evaluation_follows_precedence() {
    let cases = [
        ("2+3*4", 14.0),
        ("(2+3)*4", 20.0),
        ("8-3-2", 3.0),
        ("2 * (3 + 4) - 10 / 5", 12.0),
        ("1 - (2 - (3 - 4))", -2.0),
    ];
    for (input, expected) in cases {
        let value = Formula::parse(input).unwrap().evaluate(&undefined);
        assert_eq!(value, Ok(expected), "{input}");
    }
}

#[test]
fn evaluation_errors() {
    let formula = Formula::parse("x+1").unwrap();
    assert_eq!(
        formula.evaluate(&undefined),
        Err(FormulaEvaluationError::UndefinedVariable("x".to_string()))
    );

    let formula = Formula::parse("5/0").unwrap();
    assert_eq!(
        formula.evaluate(&undefined),
        Err(FormulaEvaluationError::DivisionByZero)
    );
}

#[test]
fn same_formula_succeeds_with_another_lookup() {
    let formula = Formula::parse("x + 1").unwrap();
    assert!(formula.evaluate(&undefined).is_err());
    assert_eq!(formula.evaluate(&|_: &str| Ok(41.0)), Ok(42.0));
}

#[test]
fn deterministic_given_deterministic_lookup() {
    let cells = HashMap::from([("a", 1.5), ("b", 4.0)]);
    let lookup = |name: &str| cells.get(name).copied().ok_or(());
    let formula = Formula::parse("a * b / (b - a) + a").unwrap();
    let first = formula.evaluate(&lookup);
    let second = formula.evaluate(&lookup);
    assert!(first.is_ok());
    assert_eq!(first, second);
}

#[test]
fn parsing_never_needs_a_lookup() {
    let calls = Cell::new(0);
    let lookup = |_: &str| -> Result<f64, ()> {
        calls.set(calls.get() + 1);
        Ok(1.0)
    };
    let formula = Formula::parse("a + b + c").unwrap();
    assert_eq!(calls.get(), 0);
    formula.evaluate(&lookup).unwrap();
    assert_eq!(calls.get(), 3);
}

#[test]
fn shared_across_threads() {
    let formula = Formula::parse("x * 2 + 1").unwrap();
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let formula = &formula;
                scope.spawn(move || formula.evaluate(&|_: &str| Ok(f64::from(i))))
            })
            .collect();
        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap(), Ok(i as f64 * 2.0 + 1.0));
        }
    });
}

#[test]
fn error_kinds_name_the_rule() {
    let kind = |input: &str| Formula::parse(input).unwrap_err().kind().clone();
    assert_eq!(kind("x + * y"), FormatErrorKind::AdjacentOperators(formulas::Op::Star));
    assert_eq!(kind("(x"), FormatErrorKind::UnclosedParenthesis(1));
    assert_eq!(kind("x)"), FormatErrorKind::UnmatchedClosingParen);
    assert_eq!(kind("x # y"), FormatErrorKind::UnrecognizedSymbol("#".to_string()));
}
