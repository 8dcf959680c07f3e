//! Obligation synthesis: from a satisfier body to proof obligations.
//!
//! Every call to another satisfier discharges that satisfier's unchecked
//! claims; the shape of the body decides how those discharges compose.
//! The resulting word, suffixed with `-> requirement`, is what the
//! developer still has to prove for each claimed requirement that has no
//! dynamic checker.
//!
//! | body shape                         | contribution           |
//! |------------------------------------|------------------------|
//! | call to satisfier                  | `( r1 || r2 )` / `r1`  |
//! | call to checker                    | nothing                |
//! | `if` without `else`, switch case   | `( … )?`               |
//! | `if`/`else`                        | `( a || b )`           |
//! | ternary                            | `( a || b )` or `( a )?` |
//! | any loop                           | `( … )*`               |
//! | statement sequence                 | `a ; b`                |
//!
//! A body that never calls a satisfier owes its claims outright:
//! `-> requirement`.

use std::collections::BTreeMap;

use shellac_ast::{Block, MethodDecl, Stmt};
use shellac_error::ShellacError;
use shellac_types::{MethodKey, SourceSpan};
use tracing::debug;

use crate::formula::Formula;
use crate::registry::RequirementRegistry;

/// One thing left to prove for a (unit, method, requirement) triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofObligation {
    pub unit: String,
    pub method: MethodKey,
    pub requirement: String,
    pub formula: Formula,
    /// `"{formula} -> {requirement}"`; also the completion key.
    pub text: String,
    /// Anchor of the satisfier declaration.
    pub span: SourceSpan,
}

/// A synthesis failure and the node it is anchored at.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct LocatedError {
    pub span: SourceSpan,
    #[source]
    pub error: ShellacError,
}

impl LocatedError {
    const fn new(span: SourceSpan, error: ShellacError) -> Self {
        Self { span, error }
    }
}

/// Obligations of `method`, keyed by requirement.
///
/// Checker methods, and satisfiers whose claims are all dynamically
/// checked, yield nothing. A body that calls satisfiers yet leaves an
/// empty word yields nothing as well: every path through it is guaranteed
/// at run time. A body that calls no satisfier at all owes each unchecked
/// claim directly, as `-> requirement`.
///
/// # Errors
/// [`ShellacError::UnannotatedCall`] or [`ShellacError::NestedSatisfier`],
/// anchored at the offending node.
pub fn synthesize(
    unit: &str,
    key: &MethodKey,
    method: &MethodDecl,
    registry: &RequirementRegistry,
) -> Result<BTreeMap<String, ProofObligation>, LocatedError> {
    let mut obligations = BTreeMap::new();
    if method.is_checker() {
        return Ok(obligations);
    }

    let mut targets: Vec<&str> = Vec::new();
    for requirement in &method.satisfies {
        if !registry.has_checker(requirement) && !targets.contains(&requirement.as_str()) {
            targets.push(requirement);
        }
    }
    if targets.is_empty() {
        return Ok(obligations);
    }

    let mut walker = Walker {
        key,
        registry,
        discharges: 0,
    };
    let word = walker.block(&method.body)?;
    if word.is_empty() && walker.discharges > 0 {
        debug!(method = %key, "body is dynamically guaranteed; no obligation");
        return Ok(obligations);
    }

    for requirement in targets {
        let text = obligation_text(&word, requirement);
        debug!(method = %key, requirement, obligation = %text, "obligation synthesized");
        obligations.insert(
            requirement.to_owned(),
            ProofObligation {
                unit: unit.to_owned(),
                method: key.clone(),
                requirement: requirement.to_owned(),
                formula: word.clone(),
                text,
                span: method.span,
            },
        );
    }
    Ok(obligations)
}

/// `"{word} -> {requirement}"`, or `"-> {requirement}"` for an empty word.
fn obligation_text(word: &Formula, requirement: &str) -> String {
    if word.is_empty() {
        format!("-> {requirement}")
    } else {
        format!("{word} -> {requirement}")
    }
}

struct Walker<'a> {
    key: &'a MethodKey,
    registry: &'a RequirementRegistry,
    /// Calls to satisfiers seen so far, checked or not.
    discharges: usize,
}

impl Walker<'_> {
    fn block(&mut self, block: &Block) -> Result<Formula, LocatedError> {
        let parts = block
            .iter()
            .map(|stmt| self.stmt(stmt))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Formula::seq(parts))
    }

    fn stmt(&mut self, stmt: &Stmt) -> Result<Formula, LocatedError> {
        match stmt {
            Stmt::Call { callee, span } => self.call(callee, *span),
            Stmt::Block { body } => self.block(body),
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                let condition = self.block(condition)?;
                let then_branch = self.block(then_branch)?;
                let branches = match else_branch {
                    None => Formula::optional(then_branch),
                    Some(else_branch) => Formula::choice([then_branch, self.block(else_branch)?]),
                };
                Ok(Formula::seq([condition, branches]))
            }
            Stmt::Ternary {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                let condition = self.block(condition)?;
                let branches = Formula::optional(Formula::choice([
                    self.block(then_branch)?,
                    self.block(else_branch)?,
                ]));
                Ok(Formula::seq([condition, branches]))
            }
            Stmt::Switch {
                selector, cases, ..
            } => {
                let mut parts = vec![self.block(selector)?];
                for case in cases {
                    parts.push(Formula::optional(self.block(case)?));
                }
                Ok(Formula::seq(parts))
            }
            Stmt::Loop { body, .. } => Ok(Formula::repeat(self.block(body)?)),
            Stmt::Method(nested) => Err(LocatedError::new(
                nested.span,
                ShellacError::NestedSatisfier {
                    method: self.key.to_string(),
                    nested: nested.name.clone(),
                },
            )),
        }
    }

    fn call(&mut self, callee: &MethodKey, span: SourceSpan) -> Result<Formula, LocatedError> {
        if self.registry.is_checker_method(callee) {
            return Ok(Formula::Empty);
        }
        if let Some(requirement) = self.registry.rejected_checker(callee) {
            // Its ambiguity is reported at its own declaration.
            debug!(method = %self.key, callee = %callee, requirement, "call to rejected checker");
            return Ok(Formula::Empty);
        }
        if self.registry.is_satisfier(callee) {
            self.discharges += 1;
            let unchecked = self.registry.unchecked_claims(callee);
            return Ok(Formula::choice(unchecked.into_iter().map(Formula::Atom)));
        }
        Err(LocatedError::new(
            span,
            ShellacError::UnannotatedCall {
                method: self.key.to_string(),
                callee: callee.to_string(),
            },
        ))
    }
}
