use miette::Diagnostic;
use thiserror::Error;

use crate::{
    lex::Op,
    parse::{Formula, FormulaToken},
};

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum FormulaEvaluationError {
    #[error("undefined variable `{0}`")]
    #[diagnostic(
        code(formula::eval::undefined_variable),
        help("bind the variable before evaluating")
    )]
    UndefinedVariable(String),

    #[error("division by zero")]
    #[diagnostic(code(formula::eval::division_by_zero))]
    DivisionByZero,
}

/// Operator stack entry; a barrier marks an open parenthesis.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Pending {
    Op(Op),
    Barrier,
}

struct Evaluator<'a> {
    lookup: &'a dyn Fn(&str) -> Result<f64, ()>,
    values: Vec<f64>,
    ops: Vec<Pending>,
}

impl<'a> Evaluator<'a> {
    fn new(lookup: &'a dyn Fn(&str) -> Result<f64, ()>) -> Self {
        Evaluator {
            lookup,
            values: Vec::new(),
            ops: Vec::new(),
        }
    }

    fn run(mut self, formula: &Formula) -> Result<f64, FormulaEvaluationError> {
        for token in formula.tokens() {
            match token {
                FormulaToken::Number { value, .. } => self.values.push(*value),
                FormulaToken::Variable(name) => {
                    let value = (self.lookup)(name.as_str())
                        .map_err(|()| FormulaEvaluationError::UndefinedVariable(name.clone()))?;
                    tracing::trace!(variable = %name, value, "resolved variable");
                    self.values.push(value);
                }
                FormulaToken::Operator(op) => {
                    while let Some(&Pending::Op(top)) = self.ops.last() {
                        let eager = top.is_multiplicative() || !op.is_multiplicative();
                        if !eager {
                            break;
                        }
                        self.ops.pop();
                        self.apply(top)?;
                    }
                    self.ops.push(Pending::Op(*op));
                }
                FormulaToken::LeftParen => self.ops.push(Pending::Barrier),
                FormulaToken::RightParen => loop {
                    match self.ops.pop() {
                        Some(Pending::Op(op)) => self.apply(op)?,
                        Some(Pending::Barrier) => break,
                        None => unreachable!("validated formula has balanced parentheses"),
                    }
                },
            }
        }

        while let Some(pending) = self.ops.pop() {
            match pending {
                Pending::Op(op) => self.apply(op)?,
                Pending::Barrier => unreachable!("validated formula has balanced parentheses"),
            }
        }

        match self.values.as_slice() {
            [result] => Ok(*result),
            values => unreachable!("validated formula left {} values", values.len()),
        }
    }

    fn apply(&mut self, op: Op) -> Result<(), FormulaEvaluationError> {
        let (Some(rhs), Some(lhs)) = (self.values.pop(), self.values.pop()) else {
            unreachable!("validated formula gives `{op}` two operands");
        };
        if op == Op::Slash && rhs == 0.0 {
            return Err(FormulaEvaluationError::DivisionByZero);
        }
        let result = op.apply(lhs, rhs);
        tracing::trace!(%op, lhs, rhs, result, "applied operator");
        self.values.push(result);
        Ok(())
    }
}

impl Formula {
    /// Evaluates the formula with standard precedence.
    ///
    /// `lookup` resolves a variable name to its current value, or fails when
    /// the name is undefined. It is asked once per variable occurrence and
    /// nothing is cached, so a variable used twice is looked up twice.
    pub fn evaluate(
        &self,
        lookup: &dyn Fn(&str) -> Result<f64, ()>,
    ) -> Result<f64, FormulaEvaluationError> {
        let result = Evaluator::new(lookup).run(self);
        match &result {
            Ok(value) => tracing::debug!(formula = %self, value, "evaluated formula"),
            Err(e) => tracing::debug!(formula = %self, error = %e, "evaluation failed"),
        }
        result
    }
}
