use std::{collections::HashMap, str::FromStr};

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum BindingError {
    #[error("expected `name=value`, got `{0}`")]
    #[diagnostic(code(formula::bindings::syntax))]
    MissingEquals(String),

    #[error("`{0}` is not a valid variable name")]
    #[diagnostic(
        code(formula::bindings::name),
        help("variable names are a letter followed by letters or digits")
    )]
    InvalidName(String),

    #[error("`{value}` is not a finite number for `{name}`")]
    #[diagnostic(code(formula::bindings::value))]
    InvalidValue { name: String, value: String },

    #[error("line {line}: {source}")]
    #[diagnostic(code(formula::bindings::file))]
    Line {
        line: usize,
        #[source]
        source: Box<BindingError>,
    },
}

/// Variable values owned by the caller, resolvable from a formula through
/// [`Bindings::lookup`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    values: HashMap<String, f64>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Binds `name`, replacing any earlier value.
    pub fn define(&mut self, name: impl Into<String>, value: f64) -> Result<(), BindingError> {
        let name = name.into();
        if !is_variable_name(&name) {
            return Err(BindingError::InvalidName(name));
        }
        if !value.is_finite() {
            return Err(BindingError::InvalidValue {
                name,
                value: value.to_string(),
            });
        }
        tracing::trace!(%name, value, "defined variable");
        self.values.insert(name, value);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<f64, ()> {
        self.get(name).ok_or(())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Reads one `name = value` per line. Blank lines and anything after a
    /// `#` are ignored.
    pub fn parse(text: &str) -> Result<Self, BindingError> {
        let mut bindings = Bindings::new();
        for (i, line) in text.lines().enumerate() {
            let line_content = line.split('#').next().unwrap_or_default().trim();
            if line_content.is_empty() {
                continue;
            }
            let Binding { name, value } =
                line_content
                    .parse()
                    .map_err(|e: BindingError| BindingError::Line {
                        line: i + 1,
                        source: Box::new(e),
                    })?;
            bindings.values.insert(name, value);
        }
        Ok(bindings)
    }

    pub fn extend(&mut self, other: impl IntoIterator<Item = Binding>) {
        for Binding { name, value } in other {
            self.values.insert(name, value);
        }
    }
}

/// A single validated `name=value` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub name: String,
    pub value: f64,
}

impl FromStr for Binding {
    type Err = BindingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((name, value)) = s.split_once('=') else {
            return Err(BindingError::MissingEquals(s.to_string()));
        };
        let (name, value) = (name.trim(), value.trim());
        if !is_variable_name(name) {
            return Err(BindingError::InvalidName(name.to_string()));
        }
        let invalid = || BindingError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        };
        let value: f64 = value.parse().map_err(|_| invalid())?;
        if !value.is_finite() {
            return Err(invalid());
        }
        Ok(Binding {
            name: name.to_string(),
            value,
        })
    }
}

fn is_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric())
}
