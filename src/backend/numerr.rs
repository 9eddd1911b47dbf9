//! Numeric-error policy: how a backend reacts to floating-point conditions

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Floating-point condition a backend can trap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumErrCondition {
    /// Every condition below
    All,
    /// Division by zero
    Divide,
    /// Overflow
    Over,
    /// Underflow
    Under,
    /// Invalid operation (NaN producing)
    Invalid,
}

/// Action taken when a condition is raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumErrAction {
    /// Do nothing
    Ignore,
    /// Emit a warning
    Warn,
    /// Abort with an error
    Raise,
    /// Invoke a handler
    Call,
    /// Print a message
    Print,
    /// Log a message
    Log,
}

/// Mapping of numeric conditions to actions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NumErrPolicy(BTreeMap<NumErrCondition, NumErrAction>);

impl NumErrPolicy {
    /// Parse a mapping literal such as `{'all': 'warn', divide: raise}`.
    ///
    /// Keys and values may be bare, single-quoted or double-quoted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when the literal is not a mapping or
    /// names an unknown condition or action.
    pub fn parse(literal: &str) -> Result<Self> {
        let trimmed = literal.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        if !trimmed.starts_with('{') {
            return Err(Error::Configuration(format!(
                "numerr_handling must be a mapping literal like {{'all': 'warn'}}, got '{literal}'"
            )));
        }
        serde_yaml::from_str(trimmed).map(Self).map_err(|e| {
            Error::Configuration(format!("malformed numerr_handling '{literal}': {e}"))
        })
    }

    /// Action for `condition`, falling back to the `all` entry.
    #[must_use]
    pub fn action(&self, condition: NumErrCondition) -> Option<NumErrAction> {
        self.0
            .get(&condition)
            .or_else(|| self.0.get(&NumErrCondition::All))
            .copied()
    }

    /// Whether no condition is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
