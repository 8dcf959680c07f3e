//! Knowledge base: per-unit re-analysis, diagnostics and proof completion.
//!
//! The host calls [`KnowledgeBase::reanalyze`] whenever a compilation unit
//! changes. Each re-analysis recomputes the unit's registry entries,
//! obligations and diagnostics from scratch; the only state that survives
//! is the set of obligation texts the user marked done, read back through
//! [`CompletionSource`].

use std::collections::{BTreeMap, BTreeSet};

use shellac_ast::{CompilationUnit, MethodDecl};
use shellac_types::{Diagnostic, MethodKey};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::context::ShellContext;
use crate::registry::RequirementRegistry;
use crate::synth::{ProofObligation, synthesize};

/// Host-side persistence of completion marks.
pub trait CompletionSource {
    /// Obligation text → done flag, for every mark the host keeps on `unit`.
    fn completion_marks(&self, unit: &str) -> BTreeMap<String, bool>;
}

/// unit → obligation text → done.
impl CompletionSource for BTreeMap<String, BTreeMap<String, bool>> {
    fn completion_marks(&self, unit: &str) -> BTreeMap<String, bool> {
        self.get(unit).cloned().unwrap_or_default()
    }
}

/// A host that never persisted anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCompletions;

impl CompletionSource for NoCompletions {
    fn completion_marks(&self, _unit: &str) -> BTreeMap<String, bool> {
        BTreeMap::new()
    }
}

#[derive(Debug, Default)]
pub struct KnowledgeBase {
    config: EngineConfig,
    diagnostics: BTreeMap<String, Vec<Diagnostic>>,
    obligations: BTreeMap<String, Vec<ProofObligation>>,
    /// unit -> obligation texts marked done
    completed: BTreeMap<String, BTreeSet<String>>,
    /// unit -> methods it declared at its last analysis
    declared: BTreeMap<String, Vec<MethodKey>>,
}

impl KnowledgeBase {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Re-analyze `unit` against the registry of `ctx` and return its fresh
    /// diagnostics.
    ///
    /// Wiring errors never abort the analysis; they become error
    /// diagnostics anchored at the offending node.
    pub fn reanalyze(
        &mut self,
        ctx: &mut ShellContext,
        unit: &CompilationUnit,
        completions: &dyn CompletionSource,
    ) -> &[Diagnostic] {
        let name = unit.name.as_str();
        self.diagnostics.remove(name);
        self.refresh_completions(name, completions);

        let current: Vec<MethodKey> = unit.methods().map(|(key, _)| key).collect();
        if let Some(previous) = self.declared.insert(name.to_owned(), current.clone()) {
            for stale in previous.iter().filter(|key| !current.contains(key)) {
                if ctx.registry_mut().unregister_method(stale) {
                    info!(unit = name, method = %stale, "removed method unregistered");
                }
            }
        }

        let mut diagnostics = Vec::new();
        let mut obligations = Vec::new();
        for pass in 1..=self.config.passes() {
            diagnostics.clear();
            obligations.clear();
            for (key, method) in unit.methods() {
                analyze_method(
                    ctx.registry_mut(),
                    name,
                    &key,
                    method,
                    &mut diagnostics,
                    &mut obligations,
                );
            }
            debug!(
                unit = name,
                pass,
                obligations = obligations.len(),
                errors = diagnostics.len(),
                "analysis pass finished"
            );
        }

        for obligation in &obligations {
            let done = self.is_completed(&obligation.text);
            diagnostics.push(Diagnostic::proof(
                name,
                obligation.span,
                obligation.text.clone(),
                done,
            ));
            if !done {
                diagnostics.push(Diagnostic::error(
                    name,
                    obligation.span,
                    self.config.incomplete_proof_message.clone(),
                ));
            }
        }

        info!(
            unit = name,
            obligations = obligations.len(),
            open = diagnostics.iter().filter(|d| d.is_open_obligation()).count(),
            errors = diagnostics.iter().filter(|d| d.is_error()).count(),
            "unit analyzed"
        );
        self.obligations.insert(name.to_owned(), obligations);
        self.diagnostics.insert(name.to_owned(), diagnostics);
        self.diagnostics(name)
    }

    fn refresh_completions(&mut self, unit: &str, completions: &dyn CompletionSource) {
        let done: BTreeSet<String> = completions
            .completion_marks(unit)
            .into_iter()
            .filter_map(|(text, done)| done.then_some(text))
            .collect();
        debug!(unit, done = done.len(), "completion marks loaded");
        if done.is_empty() {
            self.completed.remove(unit);
        } else {
            self.completed.insert(unit.to_owned(), done);
        }
    }

    /// Diagnostics of the last analysis of `unit`.
    #[must_use]
    pub fn diagnostics(&self, unit: &str) -> &[Diagnostic] {
        self.diagnostics.get(unit).map_or(&[], Vec::as_slice)
    }

    /// Obligations of the last analysis of `unit`.
    #[must_use]
    pub fn obligations(&self, unit: &str) -> &[ProofObligation] {
        self.obligations.get(unit).map_or(&[], Vec::as_slice)
    }

    /// Whether any unit's host marks `text` as done.
    #[must_use]
    pub fn is_completed(&self, text: &str) -> bool {
        self.completed.values().any(|texts| texts.contains(text))
    }

    /// Units analyzed so far.
    pub fn units(&self) -> impl Iterator<Item = &str> {
        self.declared.keys().map(String::as_str)
    }
}

fn analyze_method(
    registry: &mut RequirementRegistry,
    unit: &str,
    key: &MethodKey,
    method: &MethodDecl,
    diagnostics: &mut Vec<Diagnostic>,
    obligations: &mut Vec<ProofObligation>,
) {
    if let Some(requirement) = &method.checks {
        let params = method
            .params
            .iter()
            .map(|p| p.req_var.as_ref().map_or_else(|| p.name.clone(), |d| d.name.clone()))
            .collect();
        if let Err(err) = registry.register_checker(key, requirement, params) {
            warn!(unit, method = %key, error = %err, "checker rejected");
            diagnostics.push(Diagnostic::error(unit, method.span, err.to_string()));
        }
        return;
    }

    if registry.is_checker_method(key) || registry.rejected_checker(key).is_some() {
        registry.unregister_method(key);
    }
    registry.register_claims(key, method.satisfies.clone());
    if !method.is_satisfier() {
        return;
    }

    let bound = method.bound_variable_names();
    for requirement in &method.satisfies {
        let Some(checker) = registry.checker(requirement) else {
            continue;
        };
        if let Some(missing) = checker.params.iter().find(|p| !bound.contains(p)) {
            let err = shellac_error::ShellacError::UnboundCheckerParameter {
                checker: checker.method.to_string(),
                parameter: missing.clone(),
                satisfier: key.to_string(),
            };
            warn!(unit, method = %key, error = %err, "checker cannot be wired");
            diagnostics.push(Diagnostic::error(unit, method.span, err.to_string()));
        }
    }

    match synthesize(unit, key, method, registry) {
        Ok(found) => obligations.extend(found.into_values()),
        Err(err) => {
            warn!(unit, method = %key, error = %err, "obligation synthesis failed");
            diagnostics.push(Diagnostic::error(unit, err.span, err.to_string()));
        }
    }
}
