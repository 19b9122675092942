//! Errors-as-values (spec §3.2, §7).
//!
//! Grounded on `crates/ouros/src/exception_private.rs`: `RunResult<T>` is carried over verbatim
//! as the return-type alias idiom, and `ErrorCode` takes the `strum`-derive stack
//! (`Display, EnumString, IntoStaticStr`) straight from `ExcType`. Unlike `ExcType`, `ErrorCode`
//! is a flat six-variant set with no subclass hierarchy (`is_subclass_of`) — a CUE bottom is
//! classified once by how it propagates, not matched by a user-extensible `except` clause.

use smallvec::SmallVec;
use std::sync::Arc;

use crate::value::Value;

/// How a bottom value propagates (spec §7).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
    serde::Serialize,
    serde::Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
pub enum ErrorCode {
    /// Unrecoverable engine fault; always surfaces and caches.
    Fatal,
    /// Lookup of a label/index that does not exist.
    NotExist,
    /// Kind mismatch or conflicting ground values.
    TypeError,
    /// Evaluation lacks information but may later succeed; must not be cached as a final result.
    Incomplete,
    /// Raised by a user-level custom validator.
    User,
    /// Structural cycle detected during evaluation.
    Cycle,
}

impl ErrorCode {
    /// Incomplete and cycle errors are recoverable: a parent may retry or discard them once more
    /// information becomes available (spec §7 propagation policy).
    #[must_use]
    pub fn is_recoverable(self) -> bool {
        matches!(self, Self::Incomplete | Self::Cycle)
    }

    /// True for error codes whose bottoms are cached as permanent arc results once produced.
    #[must_use]
    pub fn caches(self) -> bool {
        !self.is_recoverable()
    }
}

/// A source position attached to an error. Opaque to this crate beyond carrying the byte range a
/// caller supplied at expression-construction time; rendering source snippets is a concern of the
/// (out of scope, spec §1) printing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Position {
    pub file: u32,
    pub offset: u32,
}

/// Bound on `Bottom::positions` (spec §7: "bounded to 15 by the engine"). Keeps cycle-heavy
/// evaluations from growing an unbounded position trail across many re-entrant arcs.
pub const MAX_POSITIONS: usize = 15;

/// A lazily-expanded message argument. Carrying `Value`s (not pre-rendered strings) lets a
/// caller localize or re-render messages without re-running evaluation, per spec §7.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum MessageArg {
    Text(String),
    Val(Box<Value>),
    Int(i64),
}

impl From<&str> for MessageArg {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}
impl From<String> for MessageArg {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}
impl From<i64> for MessageArg {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}
impl From<Value> for MessageArg {
    fn from(v: Value) -> Self {
        Self::Val(Box::new(v))
    }
}

/// An error value — the least element of the lattice (spec §3.2, §7).
///
/// `wrapped` and `sub` are `Arc`-boxed rather than plain `Box`: unification frequently produces
/// one bottom that several sibling arcs all propagate unchanged (spec §7 "errors in one arc do
/// not block sibling arcs"), and cloning a `Bottom` to stash it in more than one arc cache should
/// not force a deep copy of its whole wrapped chain.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Bottom {
    pub code: ErrorCode,
    pub positions: SmallVec<[Position; 4]>,
    pub template: &'static str,
    pub args: SmallVec<[MessageArg; 2]>,
    pub wrapped: Option<Arc<Bottom>>,
    pub sub: SmallVec<[Arc<Bottom>; 2]>,
}

impl Bottom {
    #[must_use]
    pub fn new(code: ErrorCode, template: &'static str) -> Self {
        Self {
            code,
            positions: SmallVec::new(),
            template,
            args: SmallVec::new(),
            wrapped: None,
            sub: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<MessageArg>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn with_position(mut self, pos: Position) -> Self {
        if self.positions.len() < MAX_POSITIONS {
            self.positions.push(pos);
        }
        self
    }

    #[must_use]
    pub fn wrapping(mut self, parent: Bottom) -> Self {
        self.wrapped = Some(Arc::new(parent));
        self
    }

    #[must_use]
    pub fn with_sub(mut self, sibling: Bottom) -> Self {
        self.sub.push(Arc::new(sibling));
        self
    }

    /// Aggregates several bottoms into one "empty disjunction"-style error (spec §4.7), taking
    /// the first as primary and the rest as `sub`. Panics on an empty slice — callers only invoke
    /// this once they know at least one candidate failed.
    #[must_use]
    pub fn aggregate(code: ErrorCode, template: &'static str, mut candidates: Vec<Bottom>) -> Self {
        assert!(!candidates.is_empty(), "aggregate requires at least one bottom");
        let mut out = Self::new(code, template);
        let first = candidates.remove(0);
        out.sub.push(Arc::new(first));
        for c in candidates {
            out.sub.push(Arc::new(c));
        }
        out
    }

    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.code.is_recoverable()
    }

    pub fn fatal(template: &'static str) -> Self {
        Self::new(ErrorCode::Fatal, template)
    }

    pub fn not_exist(template: &'static str) -> Self {
        Self::new(ErrorCode::NotExist, template)
    }

    pub fn type_error(template: &'static str) -> Self {
        Self::new(ErrorCode::TypeError, template)
    }

    pub fn incomplete(template: &'static str) -> Self {
        Self::new(ErrorCode::Incomplete, template)
    }

    pub fn cycle(template: &'static str) -> Self {
        Self::new(ErrorCode::Cycle, template)
    }
}

/// Result type alias for operations over the value lattice (spec §7). `Bottom` is itself a value,
/// not an exception, so `CueResult` is used sparingly — mostly at API boundaries (snapshot
/// decoding, resource-limit checks) where an error is truly fatal to the call, rather than for
/// unification/evaluation which return `Bottom` as an ordinary `Value` variant.
pub type CueResult<T> = Result<T, Bottom>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_are_capped_at_the_engine_bound() {
        let mut b = Bottom::type_error("too many positions");
        for i in 0..20 {
            b = b.with_position(Position { file: 0, offset: i });
        }
        assert_eq!(b.positions.len(), MAX_POSITIONS);
    }

    #[test]
    fn incomplete_and_cycle_are_recoverable_others_are_not() {
        assert!(ErrorCode::Incomplete.is_recoverable());
        assert!(ErrorCode::Cycle.is_recoverable());
        assert!(!ErrorCode::TypeError.is_recoverable());
        assert!(!ErrorCode::Fatal.is_recoverable());
        assert!(!ErrorCode::NotExist.is_recoverable());
        assert!(!ErrorCode::User.is_recoverable());
    }

    #[test]
    fn aggregate_keeps_first_as_primary_rest_as_sub() {
        let a = Bottom::type_error("a");
        let b = Bottom::type_error("b");
        let agg = Bottom::aggregate(ErrorCode::TypeError, "empty disjunction", vec![a, b]);
        assert_eq!(agg.sub.len(), 2);
        assert_eq!(agg.sub[0].template, "a");
        assert_eq!(agg.sub[1].template, "b");
    }

    #[test]
    fn wrapping_preserves_parent_error() {
        let parent = Bottom::incomplete("missing value");
        let child = Bottom::type_error("conflict").wrapping(parent);
        assert!(child.wrapped.is_some());
        assert_eq!(child.wrapped.unwrap().code, ErrorCode::Incomplete);
    }
}
