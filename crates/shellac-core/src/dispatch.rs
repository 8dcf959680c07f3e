//! Dynamic dispatch: the protection shell around every satisfier call.
//!
//! [`Dispatcher::invoke`] snapshots the declared requirement variables of a
//! satisfier before and after running its body, then hands the snapshots to
//! the sibling checker of every requirement the satisfier claims. A checker
//! that rejects the call aborts it with
//! [`ShellacError::VerificationFailed`]; nothing is retried or downgraded.
//!
//! Satisfier bodies receive a [`ShellCall`] handle. Nested satisfier calls
//! made through [`ShellCall::invoke`] go through the same shell, so a `sort`
//! built out of `copy` and `swap` has every step checked.

use shellac_error::{BoxError, Result, ShellacError};
use shellac_types::{ReqVarDecl, Value};
use tracing::{debug, error, info};

use crate::bindings::Bindings;
use crate::context::ShellContext;
use crate::shell_type::{SatisfierMethod, ShellType};

// ---------------------------------------------------------------------------
// Call handle
// ---------------------------------------------------------------------------

/// What a satisfier body sees of its own invocation.
pub struct ShellCall<'a, T> {
    ctx: &'a mut ShellContext,
    shell_type: &'a ShellType<T>,
    target: &'a mut T,
    args: &'a mut [Value],
}

impl<T> ShellCall<'_, T> {
    #[must_use]
    pub fn target(&self) -> &T {
        &*self.target
    }

    pub fn target_mut(&mut self) -> &mut T {
        &mut *self.target
    }

    #[must_use]
    pub fn args(&self) -> &[Value] {
        &*self.args
    }

    pub fn args_mut(&mut self) -> &mut [Value] {
        &mut *self.args
    }

    /// Argument `index`, or an error naming the position.
    pub fn arg(&self, index: usize) -> std::result::Result<&Value, BoxError> {
        self.args
            .get(index)
            .ok_or_else(|| format!("missing argument {index}").into())
    }

    pub fn arg_mut(&mut self, index: usize) -> std::result::Result<&mut Value, BoxError> {
        self.args
            .get_mut(index)
            .ok_or_else(|| format!("missing argument {index}").into())
    }

    /// Dispatch another satisfier of the same type on the same target.
    ///
    /// # Errors
    /// Whatever the nested dispatch reports; bodies usually forward it with
    /// `?`, and the outer dispatch surfaces it unchanged.
    pub fn invoke(&mut self, method: &str, args: &mut [Value]) -> Result<Option<Value>> {
        Dispatcher::new(&mut *self.ctx).invoke(self.shell_type, method, &mut *self.target, args)
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct Dispatcher<'ctx> {
    ctx: &'ctx mut ShellContext,
}

impl<'ctx> Dispatcher<'ctx> {
    pub fn new(ctx: &'ctx mut ShellContext) -> Self {
        Self { ctx }
    }

    /// Run `method` of `shell_type` on `target` inside its protection shell.
    ///
    /// `args` is passed to the body mutably; output variables observe the
    /// mutation under their primed name. Instance variables, whether
    /// declared on a parameter or on the result, are read through the
    /// type's accessor before and after the body, never from `args`.
    ///
    /// # Errors
    /// - [`ShellacError::UnknownMethod`] / [`ShellacError::ArityMismatch`]
    ///   when the call does not match a declared satisfier,
    /// - [`ShellacError::MethodFailed`] when the body fails,
    /// - [`ShellacError::UnboundCheckerParameter`] when a checker asks for a
    ///   variable the call did not bind,
    /// - [`ShellacError::VerificationFailed`] when a checker rejects the call.
    pub fn invoke<T>(
        &mut self,
        shell_type: &ShellType<T>,
        method: &str,
        target: &mut T,
        args: &mut [Value],
    ) -> Result<Option<Value>> {
        let satisfier =
            shell_type
                .satisfier(method)
                .ok_or_else(|| ShellacError::UnknownMethod {
                    type_name: shell_type.name().to_owned(),
                    method: method.to_owned(),
                })?;
        let key = &satisfier.key;
        if args.len() != satisfier.shape.params.len() {
            return Err(ShellacError::ArityMismatch {
                method: key.to_string(),
                expected: satisfier.shape.params.len(),
                actual: args.len(),
            });
        }
        info!(method = %key, "dispatching through protection shell");

        let mut bindings = Bindings::new();
        self.bind_before(shell_type, satisfier, target, args, &mut bindings)?;

        let result = {
            let mut call = ShellCall {
                ctx: &mut *self.ctx,
                shell_type,
                target: &mut *target,
                args: &mut *args,
            };
            (satisfier.body)(&mut call).map_err(|source| {
                // A nested dispatch failure passes through as it was raised.
                match source.downcast::<ShellacError>() {
                    Ok(inner) => *inner,
                    Err(source) => {
                        error!(method = %key, error = %source, "satisfier body failed");
                        ShellacError::method_failed(key.to_string(), source)
                    }
                }
            })?
        };

        self.bind_after(shell_type, satisfier, target, args, result.as_ref(), &mut bindings)?;
        debug!(
            method = %key,
            bound = ?bindings.names().collect::<Vec<_>>(),
            "requirement variables bound"
        );

        let mut checked: Vec<&str> = Vec::new();
        for requirement in &satisfier.shape.satisfies {
            if checked.contains(&requirement.as_str()) {
                continue;
            }
            checked.push(requirement);
            let Some(checker) = shell_type.checker_for(requirement) else {
                info!(
                    method = %key,
                    requirement = %requirement,
                    "no dynamic checker; requirement must be discharged statically"
                );
                continue;
            };
            let check_args = bindings.resolve(&checker.key, key, &checker.params)?;
            info!(
                method = %key,
                checker = %checker.key,
                requirement = %requirement,
                "invoking checker"
            );
            if let Err(message) = (checker.check)(&*target, &check_args) {
                error!(
                    method = %key,
                    checker = %checker.key,
                    requirement = %requirement,
                    message = %message,
                    "dynamic check failed"
                );
                return Err(ShellacError::VerificationFailed {
                    requirement: requirement.clone(),
                    checker: checker.key.to_string(),
                    message,
                });
            }
        }

        Ok(result)
    }

    fn bind_before<T>(
        &mut self,
        shell_type: &ShellType<T>,
        satisfier: &SatisfierMethod<T>,
        target: &T,
        args: &[Value],
        bindings: &mut Bindings,
    ) -> Result<()> {
        if let Some(decl) = satisfier.shape.result.as_ref().filter(|d| d.is_instance) {
            let value = read_instance(shell_type, satisfier, decl, target)?;
            self.record_history(decl, &value, bindings);
            bindings.bind(decl.name.clone(), value);
        }
        for (decl, arg) in satisfier.shape.params.iter().zip(args) {
            let Some(decl) = decl else { continue };
            if decl.is_instance {
                let value = read_instance(shell_type, satisfier, decl, target)?;
                self.record_history(decl, &value, bindings);
                bindings.bind(decl.name.clone(), value);
            } else {
                self.record_history(decl, arg, bindings);
                bindings.bind(decl.name.clone(), arg.clone());
            }
        }
        Ok(())
    }

    fn bind_after<T>(
        &mut self,
        shell_type: &ShellType<T>,
        satisfier: &SatisfierMethod<T>,
        target: &T,
        args: &[Value],
        result: Option<&Value>,
        bindings: &mut Bindings,
    ) -> Result<()> {
        for (decl, arg) in satisfier.shape.params.iter().zip(args) {
            match decl {
                Some(decl) if decl.is_instance => {
                    let value = read_instance(shell_type, satisfier, decl, target)?;
                    self.record_history(decl, &value, bindings);
                    bindings.bind(decl.primed_name(), value);
                }
                Some(decl) if decl.is_output => {
                    bindings.bind(decl.primed_name(), arg.clone());
                }
                _ => {}
            }
        }
        match &satisfier.shape.result {
            Some(decl) if decl.is_instance => {
                let value = read_instance(shell_type, satisfier, decl, target)?;
                self.record_history(decl, &value, bindings);
                bindings.bind(decl.primed_name(), value);
            }
            Some(decl) => {
                let value = result.cloned().unwrap_or_default();
                self.record_history(decl, &value, bindings);
                bindings.bind(decl.name.clone(), value);
            }
            None => {}
        }
        Ok(())
    }

    fn record_history(&mut self, decl: &ReqVarDecl, value: &Value, bindings: &mut Bindings) {
        if decl.keeps_history() {
            let ring = self.ctx.histories_mut().record(decl, value);
            bindings.bind(decl.history_name(), ring);
        }
    }
}

fn read_instance<T>(
    shell_type: &ShellType<T>,
    satisfier: &SatisfierMethod<T>,
    decl: &ReqVarDecl,
    target: &T,
) -> Result<Value> {
    shell_type
        .read(&decl.name, target)
        .ok_or_else(|| ShellacError::MissingAccessor {
            method: satisfier.key.to_string(),
            variable: decl.name.clone(),
        })
}
