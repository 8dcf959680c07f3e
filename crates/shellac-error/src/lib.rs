//! Error taxonomy shared by every shellac crate.
//!
//! Errors fall into three families:
//! - **wiring** errors: the annotation graph itself is inconsistent
//!   (ambiguous checkers, unbound checker parameters, nested satisfiers,
//!   calls to unannotated methods). These are never retried.
//! - **verification** failures: a checker reported that its requirement
//!   was violated by the call it just observed.
//! - **invocation** failures: the wrapped method body itself failed, so no
//!   checker can be evaluated against it.
//!
//! Host I/O errors (JSON units, completion files) round out the enum.

use std::error::Error as StdError;

use thiserror::Error;

/// Boxed error returned by satisfier bodies.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Workspace-wide result alias.
pub type Result<T, E = ShellacError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ShellacError {
    // -- wiring ------------------------------------------------------------
    /// Two different methods claim to check the same requirement.
    #[error(
        "requirement \"{requirement}\" already has checker {existing}; cannot also register {incoming}"
    )]
    AmbiguousChecker {
        requirement: String,
        existing: String,
        incoming: String,
    },

    /// A checker parameter names a variable the satisfier never binds.
    #[error(
        "checker {checker} needs requirement variable \"{parameter}\", but no such variable is bound by {satisfier}"
    )]
    UnboundCheckerParameter {
        checker: String,
        parameter: String,
        satisfier: String,
    },

    /// A satisfier body declares another method.
    #[error("cannot handle nested method {nested} inside {method}")]
    NestedSatisfier { method: String, nested: String },

    /// A satisfier body calls a method that neither satisfies nor checks.
    #[error(
        "method calls to non-annotated methods are not allowed inside annotated methods: {method} calls {callee}"
    )]
    UnannotatedCall { method: String, callee: String },

    /// An instance-scoped variable has no accessor on its declaring type.
    #[error("instance requirement variable \"{variable}\" of {method} has no accessor")]
    MissingAccessor { method: String, variable: String },

    /// Dispatch targeted a method the declaring type does not know.
    #[error("no satisfier method named {method} on {type_name}")]
    UnknownMethod { type_name: String, method: String },

    /// The same method name was registered twice on one type.
    #[error("method {method} is declared more than once on {type_name}")]
    DuplicateMethod { type_name: String, method: String },

    /// The number of call arguments disagrees with the declared parameters.
    #[error("{method} declares {expected} parameters but was called with {actual}")]
    ArityMismatch {
        method: String,
        expected: usize,
        actual: usize,
    },

    // -- verification ------------------------------------------------------
    /// A checker signaled that its requirement does not hold.
    #[error("check failed for \"{requirement}\" ({checker}): {message}")]
    VerificationFailed {
        requirement: String,
        checker: String,
        message: String,
    },

    // -- invocation --------------------------------------------------------
    /// The wrapped method body failed before any checker could run.
    #[error("exception occurred while invoking {method}")]
    MethodFailed {
        method: String,
        #[source]
        source: BoxError,
    },

    // -- binding access ----------------------------------------------------
    /// A checker asked for a variable that is not in its argument list.
    #[error("requirement variable \"{name}\" is not bound")]
    UnboundVariable { name: String },

    /// A bound variable holds a different kind of value than requested.
    #[error("requirement variable \"{name}\" is {actual}, expected {expected}")]
    VariableTypeMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    // -- host I/O ----------------------------------------------------------
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ShellacError {
    /// Construct an [`ShellacError::Internal`] from any message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Wrap a failed method body, preserving the original error.
    pub fn method_failed(method: impl Into<String>, source: BoxError) -> Self {
        Self::MethodFailed {
            method: method.into(),
            source,
        }
    }

    /// The annotation graph is inconsistent; analysis or dispatch must abort.
    #[must_use]
    pub const fn is_wiring_error(&self) -> bool {
        matches!(
            self,
            Self::AmbiguousChecker { .. }
                | Self::UnboundCheckerParameter { .. }
                | Self::NestedSatisfier { .. }
                | Self::UnannotatedCall { .. }
                | Self::MissingAccessor { .. }
                | Self::UnknownMethod { .. }
                | Self::DuplicateMethod { .. }
                | Self::ArityMismatch { .. }
        )
    }

    /// A checker rejected the observed call.
    #[must_use]
    pub const fn is_verification_failure(&self) -> bool {
        matches!(self, Self::VerificationFailed { .. })
    }
}
