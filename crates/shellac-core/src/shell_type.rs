//! Runtime descriptors of annotated types.
//!
//! A [`ShellType`] is the dispatch-side rendition of the annotation surface
//! for one declaring type `T`: its satisfier methods (with their declared
//! requirement variables and bodies), its checker methods, and the
//! accessors used to read instance-scoped variables. The wiring between
//! them is validated once, in [`ShellTypeBuilder::build`], so an
//! inconsistent annotation graph is rejected before any call is dispatched.

use std::collections::BTreeMap;
use std::fmt;

use shellac_error::{BoxError, Result, ShellacError};
use shellac_types::{MethodKey, ReqVarDecl, Value};

use crate::bindings::CheckArgs;
use crate::dispatch::ShellCall;

/// Body of a satisfier. The call handle gives mutable access to the target
/// and the arguments, and dispatches nested satisfier calls.
pub type BodyFn<T> = Box<
    dyn Fn(&mut ShellCall<'_, T>) -> std::result::Result<Option<Value>, BoxError> + Send + Sync,
>;

/// A checker: `Err(message)` means the requirement does not hold.
pub type CheckFn<T> = Box<dyn Fn(&T, &CheckArgs) -> std::result::Result<(), String> + Send + Sync>;

/// Public accessor for an instance field.
pub type AccessorFn<T> = Box<dyn Fn(&T) -> Value + Send + Sync>;

/// Annotation data of one satisfier method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodShape {
    pub satisfies: Vec<String>,
    /// One entry per parameter; `None` for parameters without a variable.
    pub params: Vec<Option<ReqVarDecl>>,
    /// Return-value variable, or an instance variable if `is_instance`.
    pub result: Option<ReqVarDecl>,
}

impl MethodShape {
    pub fn satisfies<I, S>(requirements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            satisfies: requirements.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn param(mut self, decl: ReqVarDecl) -> Self {
        self.params.push(Some(decl));
        self
    }

    /// A parameter that carries no requirement variable.
    #[must_use]
    pub fn plain_param(mut self) -> Self {
        self.params.push(None);
        self
    }

    #[must_use]
    pub fn result(mut self, decl: ReqVarDecl) -> Self {
        self.result = Some(decl);
        self
    }

    /// Every binding name a dispatch of this shape produces.
    #[must_use]
    pub fn bound_variable_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for decl in self.params.iter().flatten() {
            names.push(decl.name.clone());
            if decl.is_output || decl.is_instance {
                names.push(decl.primed_name());
            }
            if decl.keeps_history() {
                names.push(decl.history_name());
            }
        }
        if let Some(decl) = &self.result {
            names.push(decl.name.clone());
            if decl.is_instance {
                names.push(decl.primed_name());
            }
            if decl.keeps_history() {
                names.push(decl.history_name());
            }
        }
        names
    }
}

pub struct SatisfierMethod<T> {
    pub key: MethodKey,
    pub shape: MethodShape,
    pub(crate) body: BodyFn<T>,
}

pub struct CheckerMethod<T> {
    pub key: MethodKey,
    pub requirement: String,
    pub params: Vec<String>,
    pub(crate) check: CheckFn<T>,
}

pub struct ShellType<T> {
    name: String,
    satisfiers: BTreeMap<String, SatisfierMethod<T>>,
    /// requirement -> checker
    checkers: BTreeMap<String, CheckerMethod<T>>,
    accessors: BTreeMap<String, AccessorFn<T>>,
}

impl<T> ShellType<T> {
    pub fn builder(name: impl Into<String>) -> ShellTypeBuilder<T> {
        ShellTypeBuilder {
            name: name.into(),
            satisfiers: Vec::new(),
            checkers: Vec::new(),
            accessors: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn satisfier(&self, method: &str) -> Option<&SatisfierMethod<T>> {
        self.satisfiers.get(method)
    }

    /// The sibling checker for `requirement`, if the type declares one.
    #[must_use]
    pub fn checker_for(&self, requirement: &str) -> Option<&CheckerMethod<T>> {
        self.checkers.get(requirement)
    }

    pub fn satisfiers(&self) -> impl Iterator<Item = &SatisfierMethod<T>> {
        self.satisfiers.values()
    }

    pub fn checkers(&self) -> impl Iterator<Item = &CheckerMethod<T>> {
        self.checkers.values()
    }

    /// Read the instance field `name` of `target` through its accessor.
    #[must_use]
    pub fn read(&self, name: &str, target: &T) -> Option<Value> {
        self.accessors.get(name).map(|read| read(target))
    }
}

impl<T> fmt::Debug for ShellType<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShellType")
            .field("name", &self.name)
            .field("satisfiers", &self.satisfiers.keys().collect::<Vec<_>>())
            .field("checkers", &self.checkers.keys().collect::<Vec<_>>())
            .field("accessors", &self.accessors.keys().collect::<Vec<_>>())
            .finish()
    }
}

pub struct ShellTypeBuilder<T> {
    name: String,
    satisfiers: Vec<SatisfierMethod<T>>,
    checkers: Vec<CheckerMethod<T>>,
    accessors: Vec<(String, AccessorFn<T>)>,
}

impl<T> ShellTypeBuilder<T> {
    #[must_use]
    pub fn satisfier<F>(mut self, method: &str, shape: MethodShape, body: F) -> Self
    where
        F: Fn(&mut ShellCall<'_, T>) -> std::result::Result<Option<Value>, BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.satisfiers.push(SatisfierMethod {
            key: MethodKey::new(&self.name, method),
            shape,
            body: Box::new(body),
        });
        self
    }

    #[must_use]
    pub fn checker<I, S, F>(mut self, method: &str, requirement: &str, params: I, check: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&T, &CheckArgs) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        self.checkers.push(CheckerMethod {
            key: MethodKey::new(&self.name, method),
            requirement: requirement.to_owned(),
            params: params.into_iter().map(Into::into).collect(),
            check: Box::new(check),
        });
        self
    }

    #[must_use]
    pub fn accessor<F>(mut self, field: &str, read: F) -> Self
    where
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        self.accessors.push((field.to_owned(), Box::new(read)));
        self
    }

    /// Validate the wiring and freeze the descriptor.
    ///
    /// # Errors
    /// - [`ShellacError::DuplicateMethod`] for a reused method name,
    /// - [`ShellacError::AmbiguousChecker`] for two checkers of one
    ///   requirement,
    /// - [`ShellacError::MissingAccessor`] for an instance variable with no
    ///   accessor,
    /// - [`ShellacError::UnboundCheckerParameter`] for a checker parameter
    ///   that some satisfier claiming the requirement never binds.
    pub fn build(self) -> Result<ShellType<T>> {
        let mut seen: Vec<&str> = Vec::new();
        let names = self
            .satisfiers
            .iter()
            .map(|m| m.key.method.as_str())
            .chain(self.checkers.iter().map(|m| m.key.method.as_str()));
        for method in names {
            if seen.contains(&method) {
                return Err(ShellacError::DuplicateMethod {
                    type_name: self.name.clone(),
                    method: method.to_owned(),
                });
            }
            seen.push(method);
        }

        let accessors: BTreeMap<String, AccessorFn<T>> = self.accessors.into_iter().collect();

        for satisfier in &self.satisfiers {
            let instance_vars = satisfier
                .shape
                .params
                .iter()
                .flatten()
                .chain(satisfier.shape.result.iter())
                .filter(|decl| decl.is_instance);
            for decl in instance_vars {
                if !accessors.contains_key(&decl.name) {
                    return Err(ShellacError::MissingAccessor {
                        method: satisfier.key.to_string(),
                        variable: decl.name.clone(),
                    });
                }
            }
        }

        for checker in &self.checkers {
            for satisfier in &self.satisfiers {
                if !satisfier.shape.satisfies.contains(&checker.requirement) {
                    continue;
                }
                let bound = satisfier.shape.bound_variable_names();
                if let Some(missing) = checker.params.iter().find(|p| !bound.contains(p)) {
                    return Err(ShellacError::UnboundCheckerParameter {
                        checker: checker.key.to_string(),
                        parameter: missing.clone(),
                        satisfier: satisfier.key.to_string(),
                    });
                }
            }
        }

        let mut checkers: BTreeMap<String, CheckerMethod<T>> = BTreeMap::new();
        for checker in self.checkers {
            if let Some(existing) = checkers.get(&checker.requirement) {
                return Err(ShellacError::AmbiguousChecker {
                    requirement: checker.requirement.clone(),
                    existing: existing.key.to_string(),
                    incoming: checker.key.to_string(),
                });
            }
            checkers.insert(checker.requirement.clone(), checker);
        }

        let satisfiers = self
            .satisfiers
            .into_iter()
            .map(|m| (m.key.method.clone(), m))
            .collect();

        Ok(ShellType {
            name: self.name,
            satisfiers,
            checkers,
            accessors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        value: i64,
    }

    fn noop(_: &mut ShellCall<'_, Counter>) -> std::result::Result<Option<Value>, BoxError> {
        Ok(None)
    }

    #[test]
    fn shape_bound_names() {
        let shape = MethodShape::satisfies(["swap"])
            .param(ReqVarDecl::output("arr"))
            .plain_param()
            .param(ReqVarDecl::input("pos2").with_history(2));
        assert_eq!(
            shape.bound_variable_names(),
            vec!["arr", "arr'", "pos2", "pos2[]"]
        );

        let shape = MethodShape::satisfies(["set"]).param(ReqVarDecl::instance("value"));
        assert_eq!(shape.bound_variable_names(), vec!["value", "value'"]);
    }

    #[test]
    fn build_accepts_consistent_wiring() {
        let ty = ShellType::<Counter>::builder("Counter")
            .satisfier(
                "setValue",
                MethodShape::satisfies(["valueUpdatedOkay"])
                    .plain_param()
                    .result(ReqVarDecl::instance("value")),
                noop,
            )
            .checker(
                "checkValueUpdated",
                "valueUpdatedOkay",
                ["value", "value'"],
                |_, _| Ok(()),
            )
            .accessor("value", |c: &Counter| Value::Int(c.value))
            .build()
            .unwrap();
        assert_eq!(ty.name(), "Counter");
        assert!(ty.satisfier("setValue").is_some());
        assert!(ty.checker_for("valueUpdatedOkay").is_some());
        assert_eq!(ty.read("value", &Counter { value: 7 }), Some(Value::Int(7)));
    }

    #[test]
    fn build_rejects_missing_accessor() {
        let err = ShellType::<Counter>::builder("Counter")
            .satisfier(
                "setValue",
                MethodShape::satisfies(["r"]).result(ReqVarDecl::instance("value")),
                noop,
            )
            .build()
            .unwrap_err();
        assert!(matches!(err, ShellacError::MissingAccessor { .. }));
    }

    #[test]
    fn build_rejects_unbound_checker_parameter() {
        let err = ShellType::<Counter>::builder("SimpleCheck")
            .satisfier(
                "addOne",
                MethodShape::satisfies(["adds_one"])
                    .param(ReqVarDecl::input("input?"))
                    .result(ReqVarDecl::input("output!")),
                noop,
            )
            .checker("checkAddsOne", "adds_one", ["input?", "result"], |_, _| Ok(()))
            .build()
            .unwrap_err();
        match err {
            ShellacError::UnboundCheckerParameter {
                parameter,
                satisfier,
                ..
            } => {
                assert_eq!(parameter, "result");
                assert_eq!(satisfier, "SimpleCheck.addOne");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn build_rejects_two_checkers_for_one_requirement() {
        let err = ShellType::<Counter>::builder("T")
            .checker("checkA", "a", Vec::<String>::new(), |_, _| Ok(()))
            .checker("checkA2", "a", Vec::<String>::new(), |_, _| Ok(()))
            .build()
            .unwrap_err();
        assert!(matches!(err, ShellacError::AmbiguousChecker { .. }));
    }

    #[test]
    fn build_rejects_duplicate_method_names() {
        let err = ShellType::<Counter>::builder("T")
            .satisfier("run", MethodShape::satisfies(["a"]), noop)
            .checker("run", "a", Vec::<String>::new(), |_, _| Ok(()))
            .build()
            .unwrap_err();
        assert!(matches!(err, ShellacError::DuplicateMethod { .. }));
    }
}
