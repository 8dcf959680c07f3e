//! Per-dispatch variable binding table and checker argument lists.

use std::collections::BTreeMap;

use shellac_error::{Result, ShellacError};
use shellac_types::{MethodKey, Value};

/// Name → value table built once per dispatched call.
///
/// Lookups are exact string matches: `arr`, `arr'` and `arr[]` are three
/// unrelated keys as far as the table is concerned.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Bindings {
    vars: BTreeMap<String, Value>,
}

impl Bindings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`, replacing any earlier binding of the same name.
    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Build the argument list for `checker` from this table.
    ///
    /// # Errors
    /// [`ShellacError::UnboundCheckerParameter`] for the first parameter
    /// that has no binding.
    pub fn resolve(
        &self,
        checker: &MethodKey,
        satisfier: &MethodKey,
        params: &[String],
    ) -> Result<CheckArgs> {
        let mut entries = Vec::with_capacity(params.len());
        for param in params {
            let value = self
                .vars
                .get(param)
                .ok_or_else(|| ShellacError::UnboundCheckerParameter {
                    checker: checker.to_string(),
                    parameter: param.clone(),
                    satisfier: satisfier.to_string(),
                })?;
            entries.push((param.clone(), value.clone()));
        }
        Ok(CheckArgs { entries })
    }
}

/// Arguments handed to one checker, in its declared parameter order.
///
/// Each value is a private copy: a checker cannot disturb the binding table
/// or the satisfier's state through it.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckArgs {
    entries: Vec<(String, Value)>,
}

impl CheckArgs {
    /// Look a parameter up by its requirement-variable name.
    pub fn get(&self, name: &str) -> Result<&Value> {
        self.entries
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, value)| value)
            .ok_or_else(|| ShellacError::UnboundVariable {
                name: name.to_owned(),
            })
    }

    /// Positional access.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&Value> {
        self.entries.get(index).map(|(_, value)| value)
    }

    pub fn int(&self, name: &str) -> Result<i64> {
        self.get(name)?.expect_int(name)
    }

    pub fn float(&self, name: &str) -> Result<f64> {
        self.get(name)?.expect_float(name)
    }

    pub fn bool(&self, name: &str) -> Result<bool> {
        self.get(name)?.expect_bool(name)
    }

    pub fn text(&self, name: &str) -> Result<&str> {
        self.get(name)?.expect_text(name)
    }

    pub fn list(&self, name: &str) -> Result<&[Value]> {
        self.get(name)?.expect_list(name)
    }

    pub fn int_list(&self, name: &str) -> Result<Vec<i64>> {
        self.get(name)?.expect_int_list(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }
}
