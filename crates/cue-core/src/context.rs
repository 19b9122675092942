//! `Context`/`Index` (spec §4.1): label interning, evaluation stack, delayed constraints, decimal
//! configuration, and import-package lookup.
//!
//! Grounded on `crates/ouros/src/namespace.rs`'s forwarding-stack shape (`Namespaces::stack`
//! holding per-frame scopes indexed by position, exactly the push/pop-by-depth structure
//! `pushForwards`/`popForwards` need) combined with `crates/ouros/src/resource.rs`'s
//! limits-builder pattern for the evaluation-wide resource tracker this context owns.

use ahash::AHashMap;

use crate::arena::{Arena, Id};
use crate::error::Bottom;
use crate::expr::NodeRef;
use crate::label::{Interner, Label};
use crate::resource::{NoLimitTracker, ResourceError, ResourceTracker};
use crate::tracer::{NoopTracer, Tracer};
use crate::value::Value;

/// A delayed constraint: a bound that was unified against a non-ground numeric and must be
/// re-checked once that numeric becomes ground (spec §4.9 "Delayed constraints").
#[derive(Debug, Clone)]
pub struct DelayedConstraint {
    pub bound: crate::bound::Bound,
    pub target: Id<Value>,
}

/// One entry on the forwarding stack (spec §9 `pushForwards`/`popForwards`): the arc set a
/// lambda call's parameters resolve against, keyed by scope depth.
#[derive(Debug, Clone)]
pub struct ForwardFrame {
    pub bindings: Vec<(Label, Value)>,
}

/// Per-evaluation context (spec §4.1). Not `Clone`/`Sync`: the spec is explicit that "the context
/// is single-threaded; concurrent use requires distinct contexts derived from the same index."
#[derive(Debug)]
pub struct Context<T: ResourceTracker = NoLimitTracker> {
    pub interner: Interner,
    pub nodes: Arena<Value>,
    forwards: Vec<ForwardFrame>,
    eval_stack: Vec<Id<Value>>,
    pub eval_depth: usize,
    pub cycle_err: bool,
    delayed: Vec<DelayedConstraint>,
    pub(crate) imports: AHashMap<String, Value>,
    /// Monotonic counter tagging each arc-evaluation attempt (spec §4.9, §9 "dedicated
    /// `Evaluating(generation)` state"), so a re-entrant evaluation can be told apart from a
    /// stale `Cycle` left over from an earlier pass over the same arc.
    generation: u64,
    pub tracker: T,
    /// Observability hook (spec §10.2). Boxed rather than a second type parameter: tracing is an
    /// orthogonal, swappable-at-runtime concern, not a compile-time choice every `Context<T>` call
    /// site should have to spell out.
    pub tracer: Box<dyn Tracer>,
}

impl Context<NoLimitTracker> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_tracker(NoLimitTracker)
    }
}

impl Default for Context<NoLimitTracker> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ResourceTracker> Context<T> {
    #[must_use]
    pub fn with_tracker(tracker: T) -> Self {
        Self {
            interner: Interner::new(),
            nodes: Arena::new(),
            forwards: Vec::new(),
            eval_stack: Vec::new(),
            eval_depth: 0,
            cycle_err: false,
            delayed: Vec::new(),
            imports: AHashMap::new(),
            generation: 0,
            tracker,
            tracer: Box::new(NoopTracer),
        }
    }

    /// Installs a tracer, replacing the default no-op (spec §10.2).
    pub fn with_tracer_hook(mut self, tracer: impl Tracer + 'static) -> Self {
        self.tracer = Box::new(tracer);
        self
    }

    /// Issues a fresh generation id for a new arc-evaluation attempt (spec §4.9).
    pub fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Updates a binding already present in the innermost forwarding frame, or inserts it if
    /// absent. Used by struct evaluation to progressively reveal each field's value to its
    /// siblings as evaluation proceeds, rather than requiring every sibling up front.
    pub fn update_forward_binding(&mut self, label: Label, value: Value) {
        if let Some(frame) = self.forwards.last_mut() {
            if let Some(slot) = frame.bindings.iter_mut().find(|(l, _)| *l == label) {
                slot.1 = value;
            } else {
                frame.bindings.push((label, value));
            }
        }
    }

    pub fn label(&mut self, s: &str) -> Label {
        self.interner.label(s)
    }

    #[must_use]
    pub fn label_str(&self, l: Label) -> &str {
        self.interner.str(l)
    }

    /// Establishes parameter forwarding for a lambda call (spec §4.1, §9). References inside the
    /// body resolve against `bindings` before falling back to lexical enclosure.
    pub fn push_forwards(&mut self, bindings: Vec<(Label, Value)>) {
        self.forwards.push(ForwardFrame { bindings });
    }

    pub fn pop_forwards(&mut self) {
        self.forwards.pop();
    }

    /// Resolves a reference against the forwarding stack, innermost frame first, then against
    /// `depth` enclosing scopes per `NodeRef` (spec §3.6).
    #[must_use]
    pub fn resolve_forward(&self, node_ref: &NodeRef) -> Option<&Value> {
        let frame = self.forwards.iter().rev().nth(node_ref.depth as usize)?;
        frame
            .bindings
            .iter()
            .find(|(l, _)| *l == node_ref.label)
            .map(|(_, v)| v)
    }

    pub fn push_eval(&mut self, id: Id<Value>) -> Result<(), ResourceError> {
        self.eval_depth += 1;
        self.tracker.check_eval_depth(self.eval_depth)?;
        self.eval_stack.push(id);
        Ok(())
    }

    pub fn pop_eval(&mut self) {
        self.eval_stack.pop();
        self.eval_depth = self.eval_depth.saturating_sub(1);
    }

    #[must_use]
    pub fn is_on_stack(&self, id: Id<Value>) -> bool {
        self.eval_stack.contains(&id)
    }

    pub fn defer_constraint(&mut self, constraint: DelayedConstraint) {
        self.delayed.push(constraint);
    }

    /// Runs at the outermost `eval` exit (spec §4.1 `processDelayedConstraints`): re-checks every
    /// deferred bound against its now-ground target, producing an error for any violation.
    pub fn process_delayed_constraints(&mut self) -> Result<(), Bottom> {
        let pending = std::mem::take(&mut self.delayed);
        for constraint in pending {
            let target = self.nodes.get(constraint.target);
            if let Value::Num(n) = target {
                if !constraint.bound.test_number(n) {
                    return Err(Bottom::type_error("delayed constraint violated"));
                }
            }
        }
        Ok(())
    }

    pub fn register_import(&mut self, path: impl Into<String>, pkg: Value) {
        self.imports.insert(path.into(), pkg);
    }

    #[must_use]
    pub fn lookup_import(&self, path: &str) -> Option<&Value> {
        self.imports.get(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_forwards_restores_resolution_scope() {
        let mut ctx = Context::new();
        let name = ctx.label("x");
        ctx.push_forwards(vec![(name, Value::int(1))]);
        let node_ref = NodeRef { depth: 0, label: name };
        assert_eq!(ctx.resolve_forward(&node_ref), Some(&Value::int(1)));
        ctx.pop_forwards();
        assert_eq!(ctx.resolve_forward(&node_ref), None);
    }

    #[test]
    fn eval_stack_tracks_reentry_for_cycle_detection() {
        let mut ctx = Context::new();
        let id = ctx.nodes.alloc(Value::Null);
        assert!(!ctx.is_on_stack(id));
        ctx.push_eval(id).unwrap();
        assert!(ctx.is_on_stack(id));
        ctx.pop_eval();
        assert!(!ctx.is_on_stack(id));
    }

    #[test]
    fn delayed_constraints_are_cleared_after_processing() {
        let mut ctx = Context::new();
        let id = ctx.nodes.alloc(Value::int(10));
        ctx.defer_constraint(DelayedConstraint {
            bound: crate::bound::Bound::new(
                crate::bound::BoundOp::GreaterEqual,
                crate::bound::BoundOperand::Number(crate::number::Number::from_i64(5)),
            ),
            target: id,
        });
        assert!(ctx.process_delayed_constraints().is_ok());
    }
}
