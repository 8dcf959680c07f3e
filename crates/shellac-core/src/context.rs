//! Shell context: the explicit owner of the requirement registry and the
//! history rings.
//!
//! Everything the engine remembers between calls lives here. A fresh
//! context starts empty; hosts keep one for as long as they want the
//! registry and histories to persist. The context itself is not
//! synchronized: hosts that dispatch from several threads share it through
//! [`SharedContext`] and hold the lock for the whole dispatch.

use std::sync::Arc;

use parking_lot::Mutex;
use shellac_error::Result;
use tracing::info;

use crate::history::HistoryStore;
use crate::registry::RequirementRegistry;
use crate::shell_type::ShellType;

/// Handle for hosts that dispatch from more than one thread.
pub type SharedContext = Arc<Mutex<ShellContext>>;

#[derive(Debug, Default)]
pub struct ShellContext {
    registry: RequirementRegistry,
    histories: HistoryStore,
}

impl ShellContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a fresh context for multi-threaded use.
    #[must_use]
    pub fn shared() -> SharedContext {
        Arc::new(Mutex::new(Self::new()))
    }

    #[must_use]
    pub const fn registry(&self) -> &RequirementRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut RequirementRegistry {
        &mut self.registry
    }

    #[must_use]
    pub const fn histories(&self) -> &HistoryStore {
        &self.histories
    }

    pub fn histories_mut(&mut self) -> &mut HistoryStore {
        &mut self.histories
    }

    /// Record the checkers and claims of a runtime type in the registry, so
    /// static analysis sees exactly the checkers dispatch will run.
    ///
    /// # Errors
    /// [`shellac_error::ShellacError::AmbiguousChecker`] if another type
    /// already registered a checker for one of this type's requirements.
    pub fn register_type<T>(&mut self, shell_type: &ShellType<T>) -> Result<()> {
        for checker in shell_type.checkers() {
            self.registry.register_checker(
                &checker.key,
                &checker.requirement,
                checker.params.clone(),
            )?;
        }
        for satisfier in shell_type.satisfiers() {
            self.registry
                .register_claims(&satisfier.key, satisfier.shape.satisfies.clone());
        }
        info!(
            type_name = shell_type.name(),
            checked = self.registry.checked_count(),
            "shell type registered"
        );
        Ok(())
    }
}
