//! The subsumption relation `⊑` (spec §4.8).
//!
//! Original logic — `ouros` has no instance/schema relation to ground this on — structured as a
//! mirror traversal of `unify.rs`'s per-kind-pair dispatch table, since subsumption and
//! unification both case-split on `(kind(a), kind(b))` the same way (spec §4.8's rules read as a
//! direct counterpart to §4.4's).

use crate::bound::{Bound, BoundOp};
use crate::structure::Struct;
use crate::value::Value;

/// Options controlling subsumption (spec §6 `Subsume` entry point options).
#[derive(Debug, Clone, Copy, Default)]
pub struct SubsumeOptions {
    /// When set, closedness differences between the two structs are ignored (spec §4.8, §9 open
    /// question). Resolved per DESIGN.md: suspends both the closedness check *and* the
    /// optional-pattern field-matching gate together.
    pub schema: bool,
    pub final_only: bool,
}

/// `subsume(a, b)`: is every instance of `b` also an instance of `a`?
#[must_use]
pub fn subsume(a: &Value, b: &Value, opts: SubsumeOptions) -> bool {
    match (a, b) {
        (Value::Top, _) => true,
        (_, Value::Bottom(_)) => true,
        (Value::Bottom(_), _) => false,

        (Value::Disjunction(da), _) => da.elements.iter().any(|d| subsume(&d.value, b, opts)),
        (_, Value::Disjunction(db)) => db.elements.iter().all(|d| subsume(a, &d.value, opts)),

        (Value::BasicType(ka), _) => ka.contains(b.kind().ground()) || *ka == b.kind().ground(),
        (_, Value::BasicType(kb)) => matches!(a, Value::BasicType(ka) if ka.contains(*kb)),

        (Value::Bound(ba), Value::Bound(bb)) => bound_subsumes_bound(ba, bb),
        (Value::Bound(ba), _) => value_satisfies_bound(ba, b),
        (_, Value::Bound(_)) => false,

        (Value::List(la), Value::List(lb)) => list_subsumes(la, lb, opts),
        (Value::Struct(sa), Value::Struct(sb)) => struct_subsumes(sa, sb, opts),

        (Value::Num(_) | Value::Str(_) | Value::Bytes(_) | Value::Bool(_) | Value::Null | Value::Duration(_), _) => a == b,

        _ => false,
    }
}

fn value_satisfies_bound(bound: &Bound, v: &Value) -> bool {
    match v {
        Value::Num(n) => bound.test_number(n),
        Value::Str(s) => bound.test_str(s),
        Value::Null => matches!(bound.op, crate::bound::BoundOp::NotEqual) && !matches!(bound.operand, crate::bound::BoundOperand::Null),
        _ => false,
    }
}

/// `a` subsumes `b` iff every point satisfying `b` also satisfies `a` (spec §4.8). For two
/// ordering bounds on the same direction this is a numeric/lexical comparison of their operands;
/// equality and regex bounds only subsume themselves.
fn bound_subsumes_bound(a: &Bound, b: &Bound) -> bool {
    if a == b {
        return true;
    }
    if !a.is_ordering() || !b.is_ordering() {
        return false;
    }
    match (&a.operand, &b.operand) {
        (crate::bound::BoundOperand::Number(av), crate::bound::BoundOperand::Number(bv)) => match (a.op, b.op) {
            (BoundOp::GreaterEqual | BoundOp::Greater, BoundOp::GreaterEqual | BoundOp::Greater) => av <= bv,
            (BoundOp::LessEqual | BoundOp::Less, BoundOp::LessEqual | BoundOp::Less) => av >= bv,
            _ => false,
        },
        _ => false,
    }
}

fn list_subsumes(a: &crate::list::List, b: &crate::list::List, opts: SubsumeOptions) -> bool {
    if a.explicit_len() > b.explicit_len() {
        return false;
    }
    for (ca, cb) in a.cells.iter().zip(b.cells.iter()) {
        if !subsume(ca, cb, opts) {
            return false;
        }
    }
    if let Some(elem_ty) = &a.elem_type {
        for cb in b.cells.iter().skip(a.explicit_len()) {
            if !subsume(elem_ty, cb, opts) {
                return false;
            }
        }
    } else if b.explicit_len() > a.explicit_len() && a.is_open() {
        return false;
    } else if b.explicit_len() != a.explicit_len() && !a.is_open() {
        return false;
    }
    true
}

/// Struct subsumption (spec §4.8): every required arc of `a` must be present in `b` with a
/// subsuming value; optional arcs of `a` missing from `b` are allowed only when closedness
/// permits (or always, under `schema`).
fn struct_subsumes(a: &Struct, b: &Struct, opts: SubsumeOptions) -> bool {
    for (label, arc_a) in &a.arcs {
        match b.get(*label) {
            Some(arc_b) => {
                if !subsume(&arc_a.value, &arc_b.value, opts) {
                    return false;
                }
            }
            None => {
                if !arc_a.flags.optional {
                    return false;
                }
            }
        }
    }
    if opts.schema {
        return true;
    }
    if a.close_status.is_closed() {
        for (label, _) in &b.arcs {
            if !a.accepts(*label, "") {
                return false;
            }
        }
    }
    true
}
