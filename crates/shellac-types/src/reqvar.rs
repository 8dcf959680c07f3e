//! Requirement-variable declarations and their derived binding names.

use serde::{Deserialize, Serialize};

/// Suffix marking the post-call value of an output or instance variable.
pub const PRIME_SUFFIX: &str = "'";

/// Suffix marking the history ring of a variable.
pub const HISTORY_SUFFIX: &str = "[]";

/// Default history depth. A depth of 1 keeps no history.
pub const DEFAULT_HISTORY: usize = 1;

/// Binding name for the post-call value of `name`.
#[must_use]
pub fn primed(name: &str) -> String {
    format!("{name}{PRIME_SUFFIX}")
}

/// Binding name for the history ring of `name`.
#[must_use]
pub fn history_of(name: &str) -> String {
    format!("{name}{HISTORY_SUFFIX}")
}

const fn default_history() -> usize {
    DEFAULT_HISTORY
}

/// A requirement-variable marker on a parameter, return value, or
/// instance field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReqVarDecl {
    /// Logical name shared with checker parameters.
    pub name: String,
    /// The same variable is read before and after the call.
    #[serde(default)]
    pub is_output: bool,
    /// Bound through the declaring type's accessor instead of a parameter.
    #[serde(default)]
    pub is_instance: bool,
    /// Number of values remembered, most recent first.
    #[serde(default = "default_history")]
    pub history: usize,
}

impl ReqVarDecl {
    /// Plain input variable.
    pub fn input(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_output: false,
            is_instance: false,
            history: DEFAULT_HISTORY,
        }
    }

    /// Variable snapshotted before the call and re-read after it.
    pub fn output(name: impl Into<String>) -> Self {
        Self {
            is_output: true,
            ..Self::input(name)
        }
    }

    /// Instance field read through the declaring type's accessor.
    pub fn instance(name: impl Into<String>) -> Self {
        Self {
            is_instance: true,
            ..Self::input(name)
        }
    }

    #[must_use]
    pub fn with_history(mut self, depth: usize) -> Self {
        self.history = depth;
        self
    }

    /// A depth above one asks for a history ring.
    #[must_use]
    pub const fn keeps_history(&self) -> bool {
        self.history > DEFAULT_HISTORY
    }

    #[must_use]
    pub fn primed_name(&self) -> String {
        primed(&self.name)
    }

    #[must_use]
    pub fn history_name(&self) -> String {
        history_of(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_names() {
        let decl = ReqVarDecl::output("arr");
        assert_eq!(decl.primed_name(), "arr'");
        assert_eq!(decl.history_name(), "arr[]");
        assert!(!decl.keeps_history());
        assert!(decl.with_history(5).keeps_history());
    }

    #[test]
    fn serde_defaults_apply() {
        let decl: ReqVarDecl = serde_json::from_str(r#"{"name":"num"}"#).unwrap();
        assert_eq!(decl, ReqVarDecl::input("num"));
        assert_eq!(decl.history, DEFAULT_HISTORY);
    }
}
