//! Enforcement of the three configurable resource limits (spec §5 supplemental, §10.3): nested
//! struct depth, unification step count, and disjunction fan-out. Each limit is exercised against
//! a real evaluation rather than calling the tracker directly (`resource.rs`'s own unit tests
//! already cover the tracker in isolation), confirming the limit actually stops an evaluation that
//! would otherwise keep going, and that the same evaluation succeeds under `NoLimitTracker` or a
//! sufficiently high limit.

use cue_core::{Arc, Context, Disjunction, LimitedTracker, List, NoLimitTracker, Options, ResourceLimits, Struct, Value};

fn nested_struct(ctx: &mut Context<LimitedTracker>, depth: usize) -> Value {
    let label = ctx.label("inner");
    let mut v = Value::int(1);
    for _ in 0..depth {
        let mut s = Struct::new();
        s.insert(Arc::new(label, v));
        v = Value::Struct(s);
    }
    v
}

/// The depth check trips on the arc that is too deep, not on the outermost struct (each
/// `eval_struct` call only checks its own level), so the failure surfaces as a `Bottom` nested
/// inside an otherwise-ordinary `Value::Struct` chain rather than as the root result itself.
/// `validate` is what a caller actually uses to notice a buried failure like this one (spec §7),
/// so that is what this test drives instead of asserting on `evaluate`'s top-level `is_bottom`.
#[test]
fn eval_depth_limit_rejects_a_tree_deeper_than_the_configured_maximum() {
    let mut limited: Context<LimitedTracker> =
        Context::with_tracker(LimitedTracker::new(ResourceLimits::new().max_eval_depth(5)));
    let value = nested_struct(&mut limited, 20);
    let id = limited.nodes.alloc(value);
    let errors = cue_core::validate(&mut limited, id, Options::new());
    assert!(!errors.is_empty(), "expected the shallow limit to surface a buried resource-limit error");

    let mut unlimited: Context<LimitedTracker> =
        Context::with_tracker(LimitedTracker::new(ResourceLimits::new()));
    let value = nested_struct(&mut unlimited, 20);
    let id = unlimited.nodes.alloc(value);
    let errors = cue_core::validate(&mut unlimited, id, Options::new());
    assert!(errors.is_empty(), "the same tree must succeed with no depth limit configured");
}

#[test]
fn eval_depth_limit_accepts_a_tree_within_the_configured_maximum() {
    let mut ctx: Context<LimitedTracker> = Context::with_tracker(LimitedTracker::new(ResourceLimits::new().max_eval_depth(10)));
    let value = nested_struct(&mut ctx, 3);
    let id = ctx.nodes.alloc(value);
    let result = cue_core::evaluate(&mut ctx, id, Options::new().final_value());
    assert!(!result.is_bottom());
}

#[test]
fn unify_step_limit_rejects_a_chain_longer_than_the_configured_maximum() {
    let parts: Vec<Value> = (0..50).map(|_| Value::Top).collect();
    let value = Value::Unification(parts);

    let mut limited: Context<LimitedTracker> =
        Context::with_tracker(LimitedTracker::new(ResourceLimits::new().max_unify_steps(5)));
    let id = limited.nodes.alloc(value.clone());
    let result = cue_core::evaluate(&mut limited, id, Options::new().final_value());
    assert!(result.is_bottom(), "expected the step limit to reject a 50-part unification chain");
    assert!(limited.tracker.unify_steps() > 5);

    let mut unlimited: Context<NoLimitTracker> = Context::new();
    let id = unlimited.nodes.alloc(value);
    let result = cue_core::evaluate(&mut unlimited, id, Options::new().final_value());
    assert!(!result.is_bottom());
}

#[test]
fn disjunction_element_limit_rejects_a_wider_fan_out_than_the_configured_maximum() {
    let elements: Vec<(Value, bool)> = (0..20i64).map(|i| (Value::int(i), i == 0)).collect();
    let value = Value::Disjunction(Disjunction::new(elements));

    let mut limited: Context<LimitedTracker> =
        Context::with_tracker(LimitedTracker::new(ResourceLimits::new().max_disjunction_elements(5)));
    let id = limited.nodes.alloc(value.clone());
    let result = cue_core::evaluate(&mut limited, id, Options::new().final_value());
    assert!(result.is_bottom(), "expected the fan-out limit to reject a 20-element disjunction");

    let mut unlimited: Context<NoLimitTracker> = Context::new();
    let id = unlimited.nodes.alloc(value);
    let result = cue_core::evaluate(&mut unlimited, id, Options::new().final_value());
    assert!(!result.is_bottom());
}

#[test]
fn a_closed_tailed_list_still_evaluates_under_a_generous_depth_limit() {
    let value = Value::List(List::closed(vec![Value::int(1), Value::int(2), Value::int(3)]));
    let mut ctx: Context<LimitedTracker> = Context::with_tracker(LimitedTracker::new(ResourceLimits::new().max_eval_depth(64)));
    let id = ctx.nodes.alloc(value);
    let result = cue_core::evaluate(&mut ctx, id, Options::new().final_value());
    assert!(!result.is_bottom());
}
