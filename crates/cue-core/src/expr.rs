//! Expression-node payloads for the reference-like value variants (spec §3.6, §9 design note
//! "polymorphic value set"). These are not evaluated values — they're the lowered graph nodes the
//! evaluator forces on demand; the unevaluated forms live as `Value` variants in `value.rs` and
//! borrow the supporting shapes defined here (argument lists, comprehension clause chains,
//! interpolation parts).
//!
//! Grounded on `crates/ouros/src/expressions.rs`'s node-struct style (small `Copy`/cheaply
//! cloneable structs carrying interned ids and child indices rather than owned trees), scaled
//! down: CUE expression nodes don't need `NameScope`/cell-capture bookkeeping since lambda
//! parameter binding is handled by `Context::push_forwards` (spec §4.1, §9) rather than by
//! compile-time local-slot assignment.

use smallvec::SmallVec;

use crate::arena::Id;
use crate::label::Label;
use crate::value::Value;

/// A reference to an enclosing scope's arc set, resolved against the evaluation-time forwarding
/// stack (spec §3.6 `NodeRef(scope)`, §9 `pushForwards`/`popForwards`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NodeRef {
    /// How many enclosing struct scopes to walk outward before resolving `label` (0 = innermost).
    pub depth: u32,
    pub label: Label,
}

/// One clause in a comprehension's clause chain (spec §4.6, §9 "coroutine-style yielders").
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Clause {
    /// `for k, v in src`. `key` is `None` for the single-variable form `for v in src`.
    For {
        key: Option<Label>,
        value: Label,
        src: Id<Value>,
    },
    If {
        cond: Id<Value>,
    },
}

/// The body a comprehension clause chain feeds into (spec §4.6).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum ComprehensionBody {
    /// List comprehension: each yielded value becomes a list element.
    List { value: Id<Value> },
    /// Struct/field comprehension: each yielded `(key, value)` pair becomes an arc. The key
    /// expression must evaluate to a ground string (spec §4.6).
    Field { key: Id<Value>, value: Id<Value> },
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Comprehension {
    pub clauses: SmallVec<[Clause; 4]>,
    pub body: ComprehensionBody,
}

/// One interpolation segment: either a literal run of text or an embedded expression to format
/// and splice in (spec §3.6 `Interpolation(parts)`).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum InterpPart {
    Literal(String),
    Expr(Id<Value>),
}

/// A lambda parameter list (spec §3.6 `Lambda(params, body)`). Each parameter is bound to the
/// argument's label when the optional-constraint pattern lambda is called (spec §4.5 step 5).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Params {
    pub names: SmallVec<[Label; 2]>,
}

/// An opaque handle to a host-registered builtin function or regex engine entry point (spec §1:
/// "builtin function libraries and the regex engine ... the core calls them through a narrow
/// interface"). The core never inspects what a `BuiltinRef` names; it just threads the handle
/// through `Value::Call`/`Value::CustomValidator` for the host to resolve and invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct BuiltinRef(pub u32);

/// The callee of a `Call` node: either a lambda expression or a host builtin (spec §3.6
/// `Call(fn, args)`).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Callee {
    Lambda(Id<Value>),
    Builtin(BuiltinRef),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::Interner;

    #[test]
    fn node_ref_depth_zero_is_innermost_scope() {
        let mut interner = Interner::new();
        let r = NodeRef {
            depth: 0,
            label: interner.label("x"),
        };
        assert_eq!(r.depth, 0);
    }
}
