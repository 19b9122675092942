//! The value lattice's tagged-sum type (spec §3.2–§3.6, §9 design note "polymorphic value set").
//!
//! Grounded on `crates/ouros/src/value.rs`'s `Value` enum: a single match-dispatched sum type
//! covering both immediate atoms and the richer reference-like forms, the same shape the spec's
//! design note asks for. Unlike the teacher's `Value`, nothing here needs a `Ref(HeapId)`
//! indirection for heap-allocated data — CUE values are plain owned trees except where the
//! reference-like nodes explicitly point into the expression arena (`Id<Value>`), so most
//! variants carry their payload inline and this type derives `Clone` outright instead of the
//! teacher's manual `clone_with_heap`/`clone_immediate` split (which exists there only because
//! cloning a heap `Ref` must bump a refcount).

use smallvec::SmallVec;

use crate::arena::Id;
use crate::binop::{BinOp, UnaryOp};
use crate::bound::Bound;
use crate::disjunction::Disjunction;
use crate::error::Bottom;
use crate::expr::{BuiltinRef, Callee, Comprehension, InterpPart, NodeRef};
use crate::kind::Kind;
use crate::label::Label;
use crate::lambda::Lambda;
use crate::list::List;
use crate::number::Number;
use crate::structure::Struct;

/// A value in the lattice (spec §3.2–§3.6).
///
/// The first block of variants are lattice endpoints and ground atoms; the second block are the
/// compound structural values; the third block are the unevaluated reference-like graph nodes the
/// evaluator (`eval.rs`) lowers on demand.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Value {
    /// The greatest element — identity for unification (spec §3.2, §4.4).
    Top,
    /// The least element — also the carrier of errors (spec §3.2, §7).
    Bottom(Box<Bottom>),
    /// A non-ground placeholder for "any value of kind k" (spec §3.2).
    BasicType(Kind),
    Num(Number),
    Str(String),
    Bytes(Vec<u8>),
    Bool(bool),
    Null,
    /// Nanosecond count, mirroring the source language's `time.Duration` representation.
    Duration(i64),
    Bound(Bound),

    List(List),
    Struct(Struct),
    Disjunction(Disjunction),
    /// An unresolved conjunction awaiting re-unification (spec §3.6 `Unification(vs)`).
    Unification(Vec<Value>),

    Ref(NodeRef),
    Selector(Id<Value>, Label),
    Index(Id<Value>, Id<Value>),
    Slice(Id<Value>, Option<Id<Value>>, Option<Id<Value>>),
    Call(Callee, SmallVec<[Id<Value>; 4]>),
    Interp(SmallVec<[InterpPart; 4]>),
    Lambda(Lambda),
    UnaryOp(UnaryOp, Id<Value>),
    BinaryOp(BinOp, Id<Value>, Id<Value>),
    /// `ListComprehension(clauses)` (spec §3.6).
    ListComp(Comprehension),
    /// `FieldComprehension(…)` (spec §3.6). A bare struct-literal comprehension ("StructComp" in
    /// the design note's shorthand) is just a `Struct` whose sole content is one `FieldComp`
    /// entry in `comprehensions` — there is no separate node kind for it, since a struct already
    /// carries a comprehension list (spec §3.5).
    FieldComp(Comprehension),
    CustomValidator(BuiltinRef, SmallVec<[Id<Value>; 2]>),
}

impl Value {
    #[must_use]
    pub fn int(n: i64) -> Self {
        Self::Num(Number::from_i64(n))
    }

    #[must_use]
    pub fn bottom(b: Bottom) -> Self {
        Self::Bottom(Box::new(b))
    }

    /// The kind of this value (spec §3.1). Reference-like unevaluated nodes report
    /// `TOP | NON_GROUND | REFERENCE` since their eventual kind is not yet known.
    #[must_use]
    pub fn kind(&self) -> Kind {
        match self {
            Self::Top => Kind::TOP,
            Self::Bottom(_) => Kind::BOTTOM,
            Self::BasicType(k) => *k | Kind::NON_GROUND,
            Self::Num(n) => {
                use crate::number::NumberTag;
                match n.tag() {
                    NumberTag::IntOnly => Kind::INT,
                    NumberTag::FloatOnly => Kind::FLOAT,
                    NumberTag::Either => Kind::NUMBER,
                }
            }
            Self::Str(_) => Kind::STRING,
            Self::Bytes(_) => Kind::BYTES,
            Self::Bool(_) => Kind::BOOL,
            Self::Null => Kind::NULL,
            Self::Duration(_) => Kind::DURATION,
            Self::Bound(b) => b.kind(),
            Self::List(_) => Kind::LIST,
            Self::Struct(_) => Kind::STRUCT,
            Self::Disjunction(_) => Kind::NON_GROUND,
            Self::Unification(_) => Kind::NON_GROUND,
            Self::Lambda(_) => Kind::LAMBDA,
            _ => Kind::TOP | Kind::NON_GROUND | Kind::REFERENCE,
        }
    }

    #[must_use]
    pub fn is_bottom(&self) -> bool {
        matches!(self, Self::Bottom(_))
    }

    #[must_use]
    pub fn is_top(&self) -> bool {
        matches!(self, Self::Top)
    }

    #[must_use]
    pub fn as_bottom(&self) -> Option<&Bottom> {
        match self {
            Self::Bottom(b) => Some(b),
            _ => None,
        }
    }

    /// True iff this value is already a single concrete point, needing no further evaluation
    /// (spec §3.1 `kind.isGround()`).
    #[must_use]
    pub fn is_ground(&self) -> bool {
        self.kind().is_ground()
    }
}

/// Value equality used by the testable properties (spec §8): "equal" ignores error message text
/// and source positions, comparing only `code` for bottoms, and compares structural values
/// field-by-field. Reference-like unevaluated nodes are never compared directly — callers are
/// expected to evaluate first (spec §8 round-trip note: "ignoring source positions").
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Top, Self::Top) | (Self::Null, Self::Null) => true,
            (Self::Bottom(a), Self::Bottom(b)) => a.code == b.code,
            (Self::BasicType(a), Self::BasicType(b)) => a == b,
            (Self::Num(a), Self::Num(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Duration(a), Self::Duration(b)) => a == b,
            (Self::Bound(a), Self::Bound(b)) => a == b,
            (Self::List(a), Self::List(b)) => a.cells == b.cells && a.explicit_len() == b.explicit_len(),
            (Self::Struct(a), Self::Struct(b)) => {
                a.arcs.len() == b.arcs.len()
                    && a.arcs
                        .iter()
                        .all(|(label, arc)| b.arcs.get(label).is_some_and(|other_arc| arc.value == other_arc.value))
            }
            (Self::Lambda(a), Self::Lambda(b)) => a.body == b.body && a.params.names == b.params.names,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_compare_by_value_not_tag() {
        assert_eq!(Value::int(1), Value::Num(Number::int_literal(1)));
    }

    #[test]
    fn bottoms_compare_by_code_only() {
        let a = Value::bottom(Bottom::type_error("first"));
        let b = Value::bottom(Bottom::type_error("second"));
        assert_eq!(a, b);
    }

    #[test]
    fn kind_of_basic_type_carries_non_ground() {
        let v = Value::BasicType(Kind::INT);
        assert!(!v.is_ground());
        assert!(v.kind().contains(Kind::INT));
    }
}
