//! Requirement registry: which requirements have a dynamic checker, which
//! method that checker is, and which requirements each satisfier claims.
//!
//! Re-analysis re-registers the same methods over and over, so every
//! operation here is keyed by [`MethodKey`] and replaces the method's own
//! previous record instead of conflicting with it.

use std::collections::BTreeMap;

use shellac_error::{Result, ShellacError};
use shellac_types::MethodKey;
use tracing::debug;

/// The dynamic checker registered for one requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckerEntry {
    pub method: MethodKey,
    /// Requirement-variable names the checker consumes, in parameter order.
    pub params: Vec<String>,
}

#[derive(Debug, Default, Clone)]
pub struct RequirementRegistry {
    /// requirement -> checker
    checkers: BTreeMap<String, CheckerEntry>,
    /// checker method -> requirement it checks
    checked_by_method: BTreeMap<MethodKey, String>,
    /// satisfier method -> requirements it last claimed
    claims: BTreeMap<MethodKey, Vec<String>>,
    /// checker method -> requirement it was refused for
    rejected: BTreeMap<MethodKey, String>,
}

impl RequirementRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `method` as the checker for `requirement`.
    ///
    /// # Errors
    /// [`ShellacError::AmbiguousChecker`] if a different method already
    /// checks `requirement`. The existing checker stays in place and
    /// `method` is remembered as a rejected checker.
    pub fn register_checker(
        &mut self,
        method: &MethodKey,
        requirement: &str,
        params: Vec<String>,
    ) -> Result<()> {
        if let Some(existing) = self.checkers.get(requirement) {
            if existing.method != *method {
                self.rejected
                    .insert(method.clone(), requirement.to_owned());
                return Err(ShellacError::AmbiguousChecker {
                    requirement: requirement.to_owned(),
                    existing: existing.method.to_string(),
                    incoming: method.to_string(),
                });
            }
        }

        // The method may have checked a different requirement last time.
        self.drop_checker_of(method);
        self.rejected.remove(method);

        debug!(method = %method, requirement, params = ?params, "checker registered");
        self.checkers.insert(
            requirement.to_owned(),
            CheckerEntry {
                method: method.clone(),
                params,
            },
        );
        self.checked_by_method
            .insert(method.clone(), requirement.to_owned());
        Ok(())
    }

    /// Record the requirements `method` currently claims to satisfy,
    /// replacing whatever it claimed before. An empty claim set removes the
    /// record.
    pub fn register_claims(&mut self, method: &MethodKey, requirements: Vec<String>) {
        if requirements.is_empty() {
            self.claims.remove(method);
        } else {
            self.claims.insert(method.clone(), requirements);
        }
    }

    /// Forget everything `method` registered. Returns whether anything was
    /// removed; calling it again is a no-op.
    pub fn unregister_method(&mut self, method: &MethodKey) -> bool {
        let had_checker = self.drop_checker_of(method);
        let was_rejected = self.rejected.remove(method).is_some();
        let had_claims = self.claims.remove(method).is_some();
        let removed = had_checker || was_rejected || had_claims;
        if removed {
            debug!(method = %method, "method unregistered");
        }
        removed
    }

    fn drop_checker_of(&mut self, method: &MethodKey) -> bool {
        let Some(requirement) = self.checked_by_method.remove(method) else {
            return false;
        };
        if self
            .checkers
            .get(&requirement)
            .is_some_and(|entry| entry.method == *method)
        {
            self.checkers.remove(&requirement);
        }
        true
    }

    #[must_use]
    pub fn has_checker(&self, requirement: &str) -> bool {
        self.checkers.contains_key(requirement)
    }

    #[must_use]
    pub fn checker(&self, requirement: &str) -> Option<&CheckerEntry> {
        self.checkers.get(requirement)
    }

    /// Requirement checked by `method`, if it is a checker.
    #[must_use]
    pub fn checked_by(&self, method: &MethodKey) -> Option<&str> {
        self.checked_by_method.get(method).map(String::as_str)
    }

    #[must_use]
    pub fn is_checker_method(&self, method: &MethodKey) -> bool {
        self.checked_by_method.contains_key(method)
    }

    /// Requirement `method` tried to check when another checker already
    /// held it.
    #[must_use]
    pub fn rejected_checker(&self, method: &MethodKey) -> Option<&str> {
        self.rejected.get(method).map(String::as_str)
    }

    #[must_use]
    pub fn is_satisfier(&self, method: &MethodKey) -> bool {
        self.claims.contains_key(method)
    }

    /// Requirements `method` last claimed; empty if unknown.
    #[must_use]
    pub fn claims(&self, method: &MethodKey) -> &[String] {
        self.claims.get(method).map_or(&[], Vec::as_slice)
    }

    /// Claims of `method` that no dynamic checker covers.
    #[must_use]
    pub fn unchecked_claims(&self, method: &MethodKey) -> Vec<String> {
        self.claims(method)
            .iter()
            .filter(|requirement| !self.has_checker(requirement))
            .cloned()
            .collect()
    }

    /// Number of requirements with a registered checker.
    #[must_use]
    pub fn checked_count(&self) -> usize {
        self.checkers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(method: &str) -> MethodKey {
        MethodKey::new("Sorter", method)
    }

    #[test]
    fn register_and_query_checker() {
        let mut registry = RequirementRegistry::new();
        registry
            .register_checker(&key("checkCopy"), "copy", vec!["input?".into(), "output!".into()])
            .unwrap();
        assert!(registry.has_checker("copy"));
        assert!(!registry.has_checker("permutation"));
        let entry = registry.checker("copy").unwrap();
        assert_eq!(entry.method, key("checkCopy"));
        assert_eq!(entry.params, vec!["input?", "output!"]);
        assert_eq!(registry.checked_by(&key("checkCopy")), Some("copy"));
    }

    #[test]
    fn second_checker_for_same_requirement_is_ambiguous() {
        let mut registry = RequirementRegistry::new();
        registry
            .register_checker(&key("checkSwap"), "swap", Vec::new())
            .unwrap();
        let err = registry
            .register_checker(&key("checkSwapAgain"), "swap", Vec::new())
            .unwrap_err();
        assert!(matches!(err, ShellacError::AmbiguousChecker { .. }));
        assert_eq!(registry.checker("swap").unwrap().method, key("checkSwap"));
        assert!(!registry.is_checker_method(&key("checkSwapAgain")));
        assert_eq!(registry.rejected_checker(&key("checkSwapAgain")), Some("swap"));

        // Once the requirement is free the second checker takes it.
        registry.unregister_method(&key("checkSwap"));
        registry
            .register_checker(&key("checkSwapAgain"), "swap", Vec::new())
            .unwrap();
        assert_eq!(registry.rejected_checker(&key("checkSwapAgain")), None);
        assert!(registry.unregister_method(&key("checkSwapAgain")));
        assert!(!registry.unregister_method(&key("checkSwapAgain")));
    }

    #[test]
    fn re_registering_same_method_replaces_itself() {
        let mut registry = RequirementRegistry::new();
        registry
            .register_checker(&key("checkSwap"), "swap", vec!["arr".into()])
            .unwrap();
        registry
            .register_checker(&key("checkSwap"), "swap", vec!["arr".into(), "arr'".into()])
            .unwrap();
        assert_eq!(registry.checker("swap").unwrap().params.len(), 2);

        // The method now checks something else: the old requirement is freed.
        registry
            .register_checker(&key("checkSwap"), "exchange", Vec::new())
            .unwrap();
        assert!(!registry.has_checker("swap"));
        assert!(registry.has_checker("exchange"));
        assert_eq!(registry.checked_count(), 1);
    }

    #[test]
    fn unregister_is_idempotent() {
        let mut registry = RequirementRegistry::new();
        registry
            .register_checker(&key("checkCopy"), "copy", Vec::new())
            .unwrap();
        registry.register_claims(&key("copy"), vec!["copy".into()]);

        assert!(registry.unregister_method(&key("checkCopy")));
        assert!(!registry.unregister_method(&key("checkCopy")));
        assert!(!registry.has_checker("copy"));
        assert!(registry.is_satisfier(&key("copy")));

        assert!(registry.unregister_method(&key("copy")));
        assert!(registry.claims(&key("copy")).is_empty());
    }

    #[test]
    fn unchecked_claims_filter_checked_requirements() {
        let mut registry = RequirementRegistry::new();
        registry.register_claims(
            &key("sort"),
            vec!["sortedOrder".into(), "permutation".into()],
        );
        registry
            .register_checker(&key("checkSortedOrder"), "sortedOrder", Vec::new())
            .unwrap();
        assert_eq!(registry.unchecked_claims(&key("sort")), vec!["permutation"]);

        registry.register_claims(&key("sort"), vec!["sortedOrder".into()]);
        assert!(registry.unchecked_claims(&key("sort")).is_empty());

        registry.register_claims(&key("sort"), Vec::new());
        assert!(!registry.is_satisfier(&key("sort")));
    }
}
