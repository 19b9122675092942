//! Closures and the parameter-forwarding call model (spec §4.1, §9 design note "Lambda parameter
//! substitution").
//!
//! Grounded on `crates/ouros/src/function.rs`'s `Function` (captured-environment closure) and
//! `crates/ouros/src/namespace.rs`'s slot-indexed scope stack, trimmed hard: a CUE lambda has no
//! cell variables, no generators, no `async`/`await` — it exists solely so a struct's optional
//! constraint (spec §3.5, §4.5 step 5) can be called with a field's label as its one argument and
//! produce a value to unify against that field.

use smallvec::SmallVec;

use crate::arena::Id;
use crate::expr::Params;
use crate::value::Value;

/// A lambda value (spec §3.6 `Lambda(params, body)`).
///
/// `body` is a node in the owning `Context`'s expression arena rather than an owned subtree: the
/// same lambda (e.g. one optional-constraint template) is invoked once per matching arc, and the
/// body must be re-evaluated fresh against each invocation's forwarded scope rather than cloned.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Lambda {
    pub params: Params,
    pub body: Id<Value>,
}

/// One entry on the forwarding stack (spec §9: "model as an environment stack
/// (`pushForwards`/`popForwards`)"). Maps each parameter name to the argument struct's arc set
/// visible while the lambda body is evaluated.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Forward {
    pub args: SmallVec<[Value; 2]>,
}

impl Lambda {
    #[must_use]
    pub fn new(params: Params, body: Id<Value>) -> Self {
        Self { params, body }
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.names.len()
    }
}
