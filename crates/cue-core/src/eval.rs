//! The evaluator (spec §4.9): forces unevaluated graph nodes into lattice values.
//!
//! Grounded on `crates/ouros/src/run.rs`'s `Runner`/`Executor` split between a cheap "just force
//! what's needed" path and a full-completion path, mapped here onto the spec's partial/final
//! evaluation modes (`deep: bool`), and on `heap.rs`'s cache-as-arena-slot pattern for the arc
//! memoization in `eval_struct` (`ArcCache` lives on the `Arc` itself, not in a side table, the
//! same way a `ouros` heap slot caches its own computed state).

use smallvec::SmallVec;

use crate::arena::Id;
use crate::binop::{eval_bin_op, match_bin_op_kind, BinOp, UnaryOp};
use crate::bound::{Bound, BoundOp, BoundOperand};
use crate::comprehension::{self, Yielded};
use crate::context::Context;
use crate::error::Bottom;
use crate::expr::Callee;
use crate::label::Label;
use crate::list::List;
use crate::resource::ResourceTracker;
use crate::structure::{Arc, ArcCache, Struct};
use crate::subsume::{subsume, SubsumeOptions};
use crate::unify::unify;
use crate::value::Value;

/// Forces the arena node `id` to a value (spec §4.9 `eval(node, deep)`).
///
/// `deep` selects partial (`false`, spec's `evalPartial`) vs final (`true`, spec's full
/// evaluation) mode: partial forcing stops at the first concrete constructor and leaves nested
/// struct fields lazy, while final forcing recurses all the way down and additionally enforces
/// delayed constraints once the whole tree is ground.
pub fn eval_node<T: ResourceTracker>(ctx: &mut Context<T>, id: Id<Value>, deep: bool) -> Value {
    let node = ctx.nodes.get(id).clone();
    eval_value(ctx, &node, deep)
}

/// Forces an already-materialised `Value` (as opposed to an arena node reached through an `Id`).
/// Ground atoms and lattice endpoints are returned unchanged; compound and reference-like
/// variants recurse or resolve against the evaluation context.
pub fn eval_value<T: ResourceTracker>(ctx: &mut Context<T>, v: &Value, deep: bool) -> Value {
    match v {
        Value::Top
        | Value::Bottom(_)
        | Value::BasicType(_)
        | Value::Num(_)
        | Value::Str(_)
        | Value::Bytes(_)
        | Value::Bool(_)
        | Value::Null
        | Value::Duration(_)
        | Value::Bound(_) => v.clone(),

        Value::List(list) => eval_list(ctx, list, deep),
        Value::Struct(s) => eval_struct(ctx, s, deep),
        Value::Disjunction(d) => eval_disjunction(ctx, d, deep),
        Value::Unification(parts) => eval_unification(ctx, parts, deep),

        Value::Ref(node_ref) => match ctx.resolve_forward(node_ref) {
            Some(bound) => {
                let bound = bound.clone();
                eval_value(ctx, &bound, deep)
            }
            None => Value::bottom(Bottom::not_exist("reference to an undeclared field")),
        },
        Value::Selector(base, label) => eval_selector(ctx, *base, *label, deep),
        Value::Index(base, index) => eval_index(ctx, *base, *index, deep),
        Value::Slice(base, lo, hi) => eval_slice(ctx, *base, *lo, *hi),
        Value::Call(callee, args) => eval_call(ctx, callee, args, deep),
        Value::Interp(parts) => eval_interp(ctx, parts),
        Value::Lambda(_) => v.clone(),
        Value::UnaryOp(op, id) => eval_unary_op(ctx, *op, *id),
        Value::BinaryOp(op, a, b) => eval_binary_op(ctx, *op, *a, *b, deep),
        Value::ListComp(comp) => eval_list_comp(ctx, comp),
        Value::FieldComp(comp) => eval_field_comp(ctx, comp),
        Value::CustomValidator(_, _) => Value::bottom(Bottom::fatal("custom validators require a host-provided resolver")),
    }
}

fn eval_list<T: ResourceTracker>(ctx: &mut Context<T>, list: &List, deep: bool) -> Value {
    let mut cells = Vec::with_capacity(list.cells.len());
    for cell in &list.cells {
        let v = eval_value(ctx, cell, deep);
        if v.is_bottom() {
            return v;
        }
        cells.push(v);
    }
    let elem_type = match &list.elem_type {
        Some(t) => {
            let v = eval_value(ctx, t, deep);
            if v.is_bottom() {
                return v;
            }
            Some(Box::new(v))
        }
        None => None,
    };
    Value::List(List {
        cells,
        elem_type,
        len: list.len.clone(),
    })
}

fn eval_disjunction<T: ResourceTracker>(ctx: &mut Context<T>, d: &crate::disjunction::Disjunction, deep: bool) -> Value {
    if !deep {
        return Value::Disjunction(d.clone());
    }
    let before = d.elements.len();
    if let Err(e) = ctx.tracker.check_disjunction_elements(before) {
        return Value::bottom(Bottom::fatal("resource limit exceeded").with_arg(e.to_string()));
    }
    let elements: Vec<(Value, bool)> = d
        .elements
        .iter()
        .map(|disjunct| (eval_value(ctx, &disjunct.value, deep), disjunct.is_default))
        .collect();
    let result = crate::disjunction::Disjunction::new(elements)
        .normalize_with(|a, b| subsume(a, b, SubsumeOptions::default()), |a, b| a == b);
    let after = match &result {
        Value::Disjunction(d) => d.elements.len(),
        _ => 1,
    };
    ctx.tracer.on_disjunction_normalize(before, after);
    result
}

fn eval_unification<T: ResourceTracker>(ctx: &mut Context<T>, parts: &[Value], deep: bool) -> Value {
    let mut acc = Value::Top;
    for part in parts {
        let v = eval_value(ctx, part, deep);
        acc = unify(ctx, &acc, &v);
        if acc.is_bottom() {
            return acc;
        }
    }
    acc
}

/// Expands a struct's field comprehensions into concrete arcs before evaluation (spec §4.6
/// "expanding an already-expanded struct returns the cached expansion", guarded by
/// `Struct::expanded`).
fn expand_struct<T: ResourceTracker>(ctx: &mut Context<T>, s: &mut Struct) -> Option<Value> {
    if s.expanded {
        return None;
    }
    let comprehensions = std::mem::take(&mut s.comprehensions);
    for comp in &comprehensions {
        let mut eval_clause = |ctx: &mut Context<T>, id: Id<Value>| -> Result<Value, Bottom> {
            let v = eval_node(ctx, id, true);
            match v.as_bottom() {
                Some(b) => Err(b.clone()),
                None => Ok(v),
            }
        };
        match comprehension::evaluate_field_comprehension(ctx, comp, &mut eval_clause) {
            Ok(yielded) => {
                for Yielded { key, value } in yielded {
                    let label = ctx.label(&key);
                    match s.arcs.get(&label) {
                        Some(existing) => {
                            let merged = unify(ctx, &existing.value, &value);
                            if merged.is_bottom() {
                                return Some(merged);
                            }
                            s.arcs.get_mut(&label).expect("label just looked up").value = Box::new(merged);
                        }
                        None => s.insert(Arc::new(label, value)),
                    }
                }
            }
            Err(b) if b.code.is_recoverable() => {
                // Retained for a later pass: put the comprehension back unexpanded.
                s.comprehensions.push(comp.clone());
            }
            Err(b) => return Some(Value::bottom(b)),
        }
    }
    if s.comprehensions.is_empty() {
        s.expanded = true;
    }
    None
}

/// Evaluates every arc of a struct (spec §4.9), forwarding each field's evaluated value to its
/// as-yet-unevaluated siblings (spec §9 `pushForwards`/`popForwards`) so mutual field references
/// see real values once available and a true self-cycle observes a `Bottom::cycle` sentinel
/// instead of recursing forever.
pub fn eval_struct<T: ResourceTracker>(ctx: &mut Context<T>, s: &Struct, deep: bool) -> Value {
    ctx.eval_depth += 1;
    if let Err(e) = ctx.tracker.check_eval_depth(ctx.eval_depth) {
        ctx.eval_depth -= 1;
        return Value::bottom(Bottom::fatal("resource limit exceeded").with_arg(e.to_string()));
    }

    let mut working = s.clone();
    if let Some(err) = expand_struct(ctx, &mut working) {
        ctx.eval_depth -= 1;
        return err;
    }

    let generation = ctx.next_generation();
    ctx.tracer.on_struct_expand(working.arcs.len());
    let placeholder = Value::bottom(Bottom::cycle("field depends on its own value"));
    let labels: Vec<Label> = working.arcs.keys().copied().collect();
    let bindings: Vec<(Label, Value)> = labels.iter().map(|l| (*l, placeholder.clone())).collect();
    ctx.push_forwards(bindings);

    for label in &labels {
        let already = match working.arcs.get(label).map(|arc| &arc.cache) {
            Some(ArcCache::Evaluated(v)) => Some((**v).clone()),
            _ => None,
        };
        let result = match already {
            Some(v) => v,
            None => {
                if let Some(arc) = working.arcs.get_mut(label) {
                    arc.cache = ArcCache::Evaluating(generation);
                }
                let raw = working.arcs.get(label).map(|arc| (*arc.value).clone());
                match raw {
                    Some(raw) => eval_value(ctx, &raw, deep),
                    None => continue,
                }
            }
        };

        if let Some(arc) = working.arcs.get_mut(label) {
            arc.cache = match result.as_bottom() {
                Some(b) if !b.code.caches() => {
                    ctx.tracer.on_cycle_detected(generation);
                    ArcCache::Cycle(generation)
                }
                _ => ArcCache::Evaluated(Box::new(result.clone())),
            };
            arc.value = Box::new(result.clone());
        }
        ctx.update_forward_binding(*label, result);
    }

    ctx.pop_forwards();
    working.canonicalize_order();
    ctx.eval_depth -= 1;
    Value::Struct(working)
}

fn eval_selector<T: ResourceTracker>(ctx: &mut Context<T>, base: Id<Value>, label: Label, deep: bool) -> Value {
    let base = eval_node(ctx, base, true);
    match base {
        Value::Bottom(_) => base,
        Value::Struct(s) => match s.get(label) {
            Some(arc) => match &arc.cache {
                ArcCache::Evaluated(v) => (**v).clone(),
                _ => eval_value(ctx, &arc.value, deep),
            },
            None => Value::bottom(Bottom::not_exist("field not present").with_arg(ctx.label_str(label).to_string())),
        },
        _ => Value::bottom(Bottom::type_error("selector requires a struct")),
    }
}

fn eval_index<T: ResourceTracker>(ctx: &mut Context<T>, base: Id<Value>, index: Id<Value>, deep: bool) -> Value {
    let base = eval_node(ctx, base, true);
    if base.is_bottom() {
        return base;
    }
    let idx = eval_node(ctx, index, true);
    if idx.is_bottom() {
        return idx;
    }
    match (&base, &idx) {
        (Value::List(list), Value::Num(n)) => match n.to_i64().0 {
            Some(i) if i >= 0 && (i as usize) < list.cells.len() => eval_value(ctx, &list.cells[i as usize], deep),
            _ => Value::bottom(Bottom::not_exist("index out of range")),
        },
        (Value::Struct(s), Value::Str(key)) => {
            let label = ctx.label(key);
            match s.get(label) {
                Some(arc) => eval_value(ctx, &arc.value, deep),
                None => Value::bottom(Bottom::not_exist("field not present").with_arg(key.clone())),
            }
        }
        (Value::Str(text), Value::Num(n)) => match n.to_i64().0 {
            Some(i) if i >= 0 && (i as usize) < text.len() => {
                Value::Bytes(vec![text.as_bytes()[i as usize]])
            }
            _ => Value::bottom(Bottom::not_exist("index out of range")),
        },
        (Value::Bytes(data), Value::Num(n)) => match n.to_i64().0 {
            Some(i) if i >= 0 && (i as usize) < data.len() => Value::Num(crate::number::Number::from_i64(i64::from(data[i as usize]))),
            _ => Value::bottom(Bottom::not_exist("index out of range")),
        },
        _ => Value::bottom(Bottom::type_error("value does not support indexing")),
    }
}

fn eval_slice<T: ResourceTracker>(ctx: &mut Context<T>, base: Id<Value>, lo: Option<Id<Value>>, hi: Option<Id<Value>>) -> Value {
    let base = eval_node(ctx, base, true);
    if base.is_bottom() {
        return base;
    }
    let bound = |ctx: &mut Context<T>, id: Option<Id<Value>>, default: usize| -> Result<usize, Value> {
        match id {
            None => Ok(default),
            Some(id) => {
                let v = eval_node(ctx, id, true);
                match v {
                    Value::Num(n) => match n.to_i64().0 {
                        Some(i) if i >= 0 => Ok(i as usize),
                        _ => Err(Value::bottom(Bottom::type_error("slice bound out of range"))),
                    },
                    Value::Bottom(_) => Err(v),
                    _ => Err(Value::bottom(Bottom::type_error("slice bound must be an integer"))),
                }
            }
        }
    };
    match &base {
        Value::List(list) => {
            let lo = match bound(ctx, lo, 0) {
                Ok(v) => v,
                Err(e) => return e,
            };
            let hi = match bound(ctx, hi, list.cells.len()) {
                Ok(v) => v,
                Err(e) => return e,
            };
            if lo > hi || hi > list.cells.len() {
                return Value::bottom(Bottom::not_exist("slice bounds out of range"));
            }
            Value::List(List::closed(list.cells[lo..hi].to_vec()))
        }
        Value::Str(s) => {
            let lo = match bound(ctx, lo, 0) {
                Ok(v) => v,
                Err(e) => return e,
            };
            let hi = match bound(ctx, hi, s.len()) {
                Ok(v) => v,
                Err(e) => return e,
            };
            match s.get(lo..hi) {
                Some(slice) => Value::Str(slice.to_string()),
                None => Value::bottom(Bottom::not_exist("slice bounds out of range")),
            }
        }
        Value::Bytes(b) => {
            let lo = match bound(ctx, lo, 0) {
                Ok(v) => v,
                Err(e) => return e,
            };
            let hi = match bound(ctx, hi, b.len()) {
                Ok(v) => v,
                Err(e) => return e,
            };
            if lo > hi || hi > b.len() {
                return Value::bottom(Bottom::not_exist("slice bounds out of range"));
            }
            Value::Bytes(b[lo..hi].to_vec())
        }
        _ => Value::bottom(Bottom::type_error("value does not support slicing")),
    }
}

fn eval_call<T: ResourceTracker>(ctx: &mut Context<T>, callee: &Callee, args: &SmallVec<[Id<Value>; 4]>, deep: bool) -> Value {
    match callee {
        Callee::Builtin(_) => Value::bottom(Bottom::fatal("builtin calls require a host-provided resolver")),
        Callee::Lambda(lambda_id) => {
            let lambda_val = eval_node(ctx, *lambda_id, true);
            let lambda = match &lambda_val {
                Value::Lambda(l) => l,
                Value::Bottom(_) => return lambda_val,
                _ => return Value::bottom(Bottom::type_error("call target is not a function")),
            };
            if lambda.params.names.len() != args.len() {
                return Value::bottom(Bottom::type_error("argument count mismatch"));
            }
            let mut bindings = Vec::with_capacity(args.len());
            for (name, arg_id) in lambda.params.names.iter().zip(args.iter()) {
                let v = eval_node(ctx, *arg_id, true);
                if v.is_bottom() {
                    return v;
                }
                bindings.push((*name, v));
            }
            ctx.push_forwards(bindings);
            let result = eval_node(ctx, lambda.body, deep);
            ctx.pop_forwards();
            result
        }
    }
}

fn eval_interp<T: ResourceTracker>(ctx: &mut Context<T>, parts: &[crate::expr::InterpPart]) -> Value {
    let mut out = String::new();
    for part in parts {
        match part {
            crate::expr::InterpPart::Literal(s) => out.push_str(s),
            crate::expr::InterpPart::Expr(id) => {
                let v = eval_node(ctx, *id, true);
                match v {
                    Value::Bottom(_) => return v,
                    Value::Str(s) => out.push_str(&s),
                    Value::Num(n) => out.push_str(&n.to_string()),
                    Value::Bool(b) => out.push_str(if b { "true" } else { "false" }),
                    Value::Null => out.push_str("null"),
                    _ => return Value::bottom(Bottom::type_error("interpolated value is not a ground scalar")),
                }
            }
        }
    }
    Value::Str(out)
}

fn eval_unary_op<T: ResourceTracker>(ctx: &mut Context<T>, op: UnaryOp, id: Id<Value>) -> Value {
    let v = eval_node(ctx, id, true);
    if v.is_bottom() {
        return v;
    }
    match (op, &v) {
        (UnaryOp::Neg, Value::Num(n)) => Value::Num(n.neg()),
        (UnaryOp::Plus, Value::Num(_)) => v,
        (UnaryOp::Not, Value::Bool(b)) => Value::Bool(!b),
        (UnaryOp::NotEqualBound, Value::Num(n)) => Value::Bound(Bound::new(BoundOp::NotEqual, BoundOperand::Number(n.clone()))),
        (UnaryOp::NotEqualBound, Value::Str(s)) => Value::Bound(Bound::new(BoundOp::NotEqual, BoundOperand::Str(s.clone()))),
        (UnaryOp::NotEqualBound, Value::Null) => Value::Bound(Bound::new(BoundOp::NotEqual, BoundOperand::Null)),
        _ => Value::bottom(Bottom::type_error("unary operator not defined for this value")),
    }
}

fn eval_binary_op<T: ResourceTracker>(ctx: &mut Context<T>, op: BinOp, a: Id<Value>, b: Id<Value>, deep: bool) -> Value {
    let a = eval_node(ctx, a, deep);
    if a.is_bottom() {
        return a;
    }
    let b = eval_node(ctx, b, deep);
    if b.is_bottom() {
        return b;
    }
    if op == BinOp::Unify {
        return unify(ctx, &a, &b);
    }
    match match_bin_op_kind(op, a.kind(), b.kind()) {
        Err(e) => Value::bottom(e),
        Ok(_) => match eval_bin_op(op, &a, &b) {
            Ok(v) => v,
            Err(e) => Value::bottom(e),
        },
    }
}

fn eval_list_comp<T: ResourceTracker>(ctx: &mut Context<T>, comp: &crate::expr::Comprehension) -> Value {
    let mut eval_clause = |ctx: &mut Context<T>, id: Id<Value>| -> Result<Value, Bottom> {
        let v = eval_node(ctx, id, true);
        match v.as_bottom() {
            Some(b) => Err(b.clone()),
            None => Ok(v),
        }
    };
    match comprehension::evaluate_list_comprehension(ctx, comp, &mut eval_clause) {
        Ok(values) => Value::List(List::closed(values)),
        Err(b) => Value::bottom(b),
    }
}

fn eval_field_comp<T: ResourceTracker>(ctx: &mut Context<T>, comp: &crate::expr::Comprehension) -> Value {
    let mut eval_clause = |ctx: &mut Context<T>, id: Id<Value>| -> Result<Value, Bottom> {
        let v = eval_node(ctx, id, true);
        match v.as_bottom() {
            Some(b) => Err(b.clone()),
            None => Ok(v),
        }
    };
    match comprehension::evaluate_field_comprehension(ctx, comp, &mut eval_clause) {
        Ok(yielded) => {
            let mut s = Struct::new();
            for Yielded { key, value } in yielded {
                let label = ctx.label(&key);
                match s.arcs.get(&label) {
                    Some(existing) => {
                        let merged = unify(ctx, &existing.value, &value);
                        if merged.is_bottom() {
                            return merged;
                        }
                        s.arcs.get_mut(&label).expect("label just looked up").value = Box::new(merged);
                    }
                    None => s.insert(Arc::new(label, value)),
                }
            }
            Value::Struct(s)
        }
        Err(b) => Value::bottom(b),
    }
}

/// `evalPartial` (spec §4.9): forces the node to its shallow head form, leaving nested struct
/// fields unevaluated until separately requested.
pub fn eval_partial<T: ResourceTracker>(ctx: &mut Context<T>, id: Id<Value>) -> Value {
    eval_node(ctx, id, false)
}

/// `evalFinal`/full evaluation (spec §4.9): forces the whole tree and re-checks every delayed
/// bound constraint before returning, since only a fully ground result can satisfy them.
pub fn eval_final<T: ResourceTracker>(ctx: &mut Context<T>, id: Id<Value>) -> Value {
    let result = eval_node(ctx, id, true);
    if result.is_bottom() {
        return result;
    }
    if let Err(e) = ctx.process_delayed_constraints() {
        return Value::bottom(e);
    }
    result
}
