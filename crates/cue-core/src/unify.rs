//! The meet/unification engine (spec §4.4, §4.5) — the workhorse of the lattice.
//!
//! Core original logic; the double-dispatch-by-kind-pair shape is grounded on the per-kind-pair
//! match cascades used throughout `ouros` (e.g. `crates/ouros/src/value.rs::py_eq`'s `(Self::X,
//! Self::Y)` arms, `bytecode/vm/binary.rs`'s per-op dunder dispatch): both pick behaviour by
//! matching a pair of tags before touching payload data, which is exactly what `unify(x, y)`'s
//! "dispatch per category" step (spec §4.4 step 4) asks for.
//!
//! `unify` itself is infallible: per spec §3.2/§7, a type conflict is not an exception but an
//! ordinary `Bottom`-tagged `Value` returned like any other result (see `error.rs`'s doc comment
//! — `CueResult` is reserved for true API-boundary failures, not lattice conflicts).

use indexmap::IndexMap;

use crate::binop::{match_bin_op_kind, BinOp};
use crate::bound::{Bound, BoundOp, BoundOperand};
use crate::context::Context;
use crate::error::Bottom;
use crate::list::{LenConstraint, List};
use crate::resource::ResourceTracker;
use crate::structure::{Arc, ArcFlags, Struct};
use crate::value::Value;

fn bail(b: Bottom) -> Value {
    Value::bottom(b)
}

/// `unify(x, y)` (spec §4.4): commutative, associative, idempotent meet over the lattice.
pub fn unify<T: ResourceTracker>(ctx: &mut Context<T>, x: &Value, y: &Value) -> Value {
    if let Err(e) = ctx.tracker.on_unify_step() {
        return bail(Bottom::fatal("resource limit exceeded").with_arg(e.to_string()));
    }
    ctx.tracer.on_unify(ctx.eval_depth);

    // Step 1: bottom is absorbing, earliest first.
    if let Value::Bottom(_) = x {
        return x.clone();
    }
    if let Value::Bottom(_) = y {
        return y.clone();
    }

    // Step 2: top is identity.
    if x.is_top() {
        return y.clone();
    }
    if y.is_top() {
        return x.clone();
    }

    // Disjunctions distribute before anything else touches kind compatibility.
    if let Value::Disjunction(d) = x {
        return d.distribute(y, |a, b| unify(ctx, a, b));
    }
    if let Value::Disjunction(d) = y {
        return d.distribute(x, |a, b| unify(ctx, a, b));
    }

    // Unresolved conjunctions flatten and re-unify.
    if let Value::Unification(parts) = x {
        return unify_all(ctx, parts, std::slice::from_ref(y));
    }
    if let Value::Unification(parts) = y {
        return unify_all(ctx, std::slice::from_ref(x), parts);
    }

    match (x, y) {
        (Value::BasicType(ka), other) | (other, Value::BasicType(ka)) => unify_basic_type(*ka, other),
        (Value::Bound(ba), Value::Bound(bb)) => unify_bound_bound(ba, bb),
        (Value::Bound(b), other) | (other, Value::Bound(b)) => unify_bound_atom(b, other),
        (Value::List(a), Value::List(b)) => unify_lists(ctx, a, b),
        (Value::Struct(a), Value::Struct(b)) => unify_structs(ctx, a, b),
        _ => unify_ground(x, y),
    }
}

fn unify_all<T: ResourceTracker>(ctx: &mut Context<T>, a: &[Value], b: &[Value]) -> Value {
    let mut acc = Value::Top;
    for v in a.iter().chain(b.iter()) {
        acc = unify(ctx, &acc, v);
        if acc.is_bottom() {
            return acc;
        }
    }
    acc
}

fn kind_conflict(x: &Value, y: &Value) -> Bottom {
    match match_bin_op_kind(BinOp::Unify, x.kind(), y.kind()) {
        Err(e) => e,
        Ok(_) => Bottom::type_error("conflicting values"),
    }
}

/// Two atoms of the same ground category (spec §4.4 step 4, first bullet): equal yields the
/// value (preferring the more specific numeric tag); otherwise bottom.
fn unify_ground(x: &Value, y: &Value) -> Value {
    match (x, y) {
        (Value::Num(a), Value::Num(b)) => {
            if a != b {
                return bail(Bottom::type_error("conflicting values").with_arg(a.to_string()).with_arg(b.to_string()));
            }
            match a.tag().meet(b.tag()) {
                Some(tag) => Value::Num(a.clone().with_tag(tag)),
                None => bail(Bottom::type_error("conflicting values: int vs float")
                    .with_arg(a.to_string())
                    .with_arg(b.to_string())),
            }
        }
        (Value::Str(a), Value::Str(b)) if a == b => Value::Str(a.clone()),
        (Value::Bytes(a), Value::Bytes(b)) if a == b => Value::Bytes(a.clone()),
        (Value::Bool(a), Value::Bool(b)) if a == b => Value::Bool(*a),
        (Value::Null, Value::Null) => Value::Null,
        (Value::Duration(a), Value::Duration(b)) if a == b => Value::Duration(*a),
        (Value::Lambda(_), Value::Lambda(_)) => bail(Bottom::type_error("lambdas cannot be unified")),
        _ => bail(kind_conflict(x, y)),
    }
}

/// `BasicType` vs anything in its kind (spec §4.4 step 4): the other side, tagged with the
/// intersected kind.
fn unify_basic_type(k: crate::kind::Kind, other: &Value) -> Value {
    if let Value::BasicType(other_k) = other {
        let meet = k.ground() & other_k.ground();
        return if meet.is_bottom() {
            bail(Bottom::type_error("conflicting types"))
        } else {
            Value::BasicType(meet)
        };
    }
    if k.ground().contains(other.kind().ground()) {
        other.clone()
    } else {
        bail(Bottom::type_error("value not of required type").with_arg(k.to_string()))
    }
}

/// Bound vs atom (spec §4.4 step 4): test the bound against the atom.
fn unify_bound_atom(bound: &Bound, other: &Value) -> Value {
    let ok = match other {
        Value::Num(n) => bound.test_number(n),
        Value::Str(s) => bound.test_str(s),
        Value::Null => matches!(bound.op, BoundOp::NotEqual) && !matches!(bound.operand, BoundOperand::Null),
        _ => false,
    };
    if ok {
        other.clone()
    } else {
        bail(Bottom::type_error("value not within bound"))
    }
}

/// Bound vs bound (spec §4.4 step 4): intersect, detecting incompatible ranges.
fn unify_bound_bound(a: &Bound, b: &Bound) -> Value {
    if a == b {
        return Value::Bound(a.clone());
    }
    if let (BoundOperand::Number(na), BoundOperand::Number(nb)) = (&a.operand, &b.operand) {
        use BoundOp::{Greater, GreaterEqual, Less, LessEqual};
        // `>=n & <=n` simplifies to the ground value `n` (spec §4.4).
        if matches!((a.op, b.op), (GreaterEqual, LessEqual) | (LessEqual, GreaterEqual)) && na == nb {
            return Value::Num(na.clone());
        }
        let lower = match a.op {
            GreaterEqual | Greater => Some((na, a.op == Greater)),
            _ => match b.op {
                GreaterEqual | Greater => Some((nb, b.op == Greater)),
                _ => None,
            },
        };
        let upper = match a.op {
            LessEqual | Less => Some((na, a.op == Less)),
            _ => match b.op {
                LessEqual | Less => Some((nb, b.op == Less)),
                _ => None,
            },
        };
        if let (Some((lo, lo_strict)), Some((hi, hi_strict))) = (lower, upper) {
            let incompatible = if lo_strict || hi_strict { lo >= hi } else { lo > hi };
            if incompatible {
                return bail(Bottom::type_error("incompatible bounds")
                    .with_arg(format!("{:?}", a.op))
                    .with_arg(format!("{:?}", b.op)));
            }
        }
    }
    // No further simplification: keep as an unresolved conjunction of the two bounds.
    Value::Unification(vec![Value::Bound(a.clone()), Value::Bound(b.clone())])
}

/// List unification (spec §4.4 step 4, §8 boundary cases): unify lengths, pairwise-unify
/// overlapping cells, pair the shorter list's element type against the longer's extra cells.
fn unify_lists<T: ResourceTracker>(ctx: &mut Context<T>, a: &List, b: &List) -> Value {
    if !a.is_open() && !b.is_open() && a.explicit_len() != b.explicit_len() {
        return bail(Bottom::type_error("length mismatch")
            .with_arg(a.explicit_len() as i64)
            .with_arg(b.explicit_len() as i64));
    }

    let min_len = a.explicit_len().min(b.explicit_len());
    let max_len = a.explicit_len().max(b.explicit_len());
    let mut cells = Vec::with_capacity(max_len);
    for i in 0..min_len {
        let cell = unify(ctx, &a.cells[i], &b.cells[i]);
        if cell.is_bottom() {
            return cell;
        }
        cells.push(cell);
    }

    let (longer, shorter_elem_type, shorter_is_open) = if a.explicit_len() >= b.explicit_len() {
        (a, &b.elem_type, b.is_open())
    } else {
        (b, &a.elem_type, a.is_open())
    };
    for i in min_len..longer.explicit_len() {
        let cell_src = &longer.cells[i];
        match shorter_elem_type {
            Some(elem_ty) => {
                let cell = unify(ctx, elem_ty, cell_src);
                if cell.is_bottom() {
                    return cell;
                }
                cells.push(cell);
            }
            None if shorter_is_open => return bail(Bottom::type_error("length mismatch: open list has no element type")),
            None => return bail(Bottom::type_error("length mismatch: list too long")),
        }
    }

    let elem_type = match (&a.elem_type, &b.elem_type) {
        (Some(x), Some(y)) => {
            let merged = unify(ctx, x, y);
            if merged.is_bottom() {
                return merged;
            }
            Some(Box::new(merged))
        }
        (Some(x), None) if b.is_open() => Some(x.clone()),
        (None, Some(y)) if a.is_open() => Some(y.clone()),
        _ => None,
    };
    let len = match &elem_type {
        Some(_) => LenConstraint::Bound(Box::new(Bound::new(
            BoundOp::GreaterEqual,
            BoundOperand::Number(crate::number::Number::from_i64(cells.len() as i64)),
        ))),
        None => LenConstraint::Ground(cells.len() as u64),
    };
    Value::List(List { cells, elem_type, len })
}

/// Struct unification (spec §4.5): the richest merge in the lattice.
fn unify_structs<T: ResourceTracker>(ctx: &mut Context<T>, a: &Struct, b: &Struct) -> Value {
    ctx.tracker.on_unify_step().ok();

    let mut merged = Struct::new();
    merged.close_status = a.close_status.merge(b.close_status);
    merged.should_finalize = a.should_finalize || b.should_finalize;
    merged.optionals = a.optionals.iter().cloned().chain(b.optionals.iter().cloned()).collect();
    merged.comprehensions = a.comprehensions.iter().cloned().chain(b.comprehensions.iter().cloned()).collect();

    let mut labels: IndexMap<crate::label::Label, ()> = IndexMap::new();
    for l in a.arcs.keys().chain(b.arcs.keys()) {
        labels.insert(*l, ());
    }

    for label in labels.keys() {
        let in_a = a.arcs.get(label);
        let in_b = b.arcs.get(label);
        let merged_arc = match (in_a, in_b) {
            (Some(arc_a), Some(arc_b)) => {
                if arc_a.flags.definition != arc_b.flags.definition {
                    return bail(Bottom::type_error("declared as both definition and regular field"));
                }
                let value = unify(ctx, &arc_a.value, &arc_b.value);
                if value.is_bottom() {
                    return value;
                }
                let flags = ArcFlags {
                    optional: arc_a.flags.optional && arc_b.flags.optional,
                    definition: arc_a.flags.definition,
                    hidden: arc_a.flags.hidden || arc_b.flags.hidden,
                };
                let mut arc = Arc::new(*label, value);
                arc.flags = flags;
                arc.attrs = arc_a.attrs.iter().chain(arc_b.attrs.iter()).cloned().collect();
                arc.docs = arc_a.docs.iter().chain(arc_b.docs.iter()).cloned().collect();
                arc
            }
            (Some(arc), None) | (None, Some(arc)) => arc.clone(),
            (None, None) => unreachable!("label collected from one of the two arc maps"),
        };

        if merged.close_status.is_closed() {
            let label_text = ctx.label_str(*label).to_string();
            if a.close_status.is_closed() && in_a.is_none() && !a.accepts(*label, &label_text) {
                return bail(Bottom::type_error("field not allowed in closed struct").with_arg(label_text.clone()));
            }
            if b.close_status.is_closed() && in_b.is_none() && !b.accepts(*label, &label_text) {
                return bail(Bottom::type_error("field not allowed in closed struct").with_arg(label_text));
            }
        }

        merged.insert(merged_arc);
    }

    // Apply optional-constraint patterns from each side to the other side's labels (spec §4.5
    // step 5): a struct's constraint lambda is called with the field's label, and the result
    // unified with the arc value. Lambda invocation itself belongs to `eval.rs`; this module
    // only wires the pattern match and leaves lambda application as a hook for the evaluator to
    // fill in via `apply_templates`.
    if let Some(err) = apply_templates(ctx, &mut merged, a, &b.arcs) {
        return err;
    }
    if let Some(err) = apply_templates(ctx, &mut merged, b, &a.arcs) {
        return err;
    }

    merged.canonicalize_order();
    Value::Struct(merged)
}

/// Applies `source`'s optional-constraint patterns against `other_arcs`' labels, unifying any
/// match's resulting merged arc. Full lambda application (calling the template with the field
/// label as argument) is the evaluator's job (spec §4.5 step 5); here we only handle the common
/// case where the optional's `lambda` is already a plain `Value` (no-parameter constraint,
/// e.g. a bare type template `[string]: int`). Returns `Some(bottom)` on the first conflict.
fn apply_templates<T: ResourceTracker>(
    ctx: &mut Context<T>,
    merged: &mut Struct,
    source: &Struct,
    other_arcs: &IndexMap<crate::label::Label, Arc>,
) -> Option<Value> {
    for optional in &source.optionals {
        for (label, _) in other_arcs {
            let label_text = ctx.label_str(*label).to_string();
            if !optional.pattern.matches(*label, &label_text) {
                continue;
            }
            if let Value::Lambda(_) = optional.lambda.as_ref() {
                // Lambda-bodied templates require argument binding; left to eval.rs.
                continue;
            }
            if let Some(arc) = merged.arcs.get_mut(label) {
                let new_value = unify(ctx, &arc.value, &optional.lambda);
                if new_value.is_bottom() {
                    return Some(new_value);
                }
                arc.value = Box::new(new_value);
            }
        }
    }
    None
}

/// Checks whether a raw field could be accepted into struct `s`, as used by `struct closure`
/// error production (spec §8 boundary case, §4.5 step 6).
#[must_use]
pub fn closed_struct_rejects(s: &Struct, label: crate::label::Label, label_text: &str) -> bool {
    s.close_status.is_closed() && !s.accepts(label, label_text)
}
