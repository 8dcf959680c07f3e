//! Core type definitions for the protection-shell engine.

pub mod diagnostic;
pub mod reqvar;
pub mod value;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use diagnostic::{Diagnostic, DiagnosticKind, SourceSpan};
pub use reqvar::{DEFAULT_HISTORY, HISTORY_SUFFIX, PRIME_SUFFIX, ReqVarDecl, history_of, primed};
pub use value::Value;

/// Identity of a method: `DeclaringType.method`.
///
/// Registry entries, claims and call targets are all keyed by this.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MethodKey {
    pub type_name: String,
    pub method: String,
}

impl MethodKey {
    pub fn new(type_name: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            method: method.into(),
        }
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.type_name, self.method)
    }
}
