//! `Struct`/`Arc` (spec §3.5): ordered labeled fields, optional-constraint templates, and
//! comprehension storage.
//!
//! Grounded on `crates/ouros/src/object.rs`'s `DictPairs` (an `IndexMap` backing an ordered,
//! O(1)-lookup field collection) for the arc map shape, and `crates/ouros/src/namespace.rs`'s
//! slot-vector style for keeping insertion order alongside lookup. Unlike a Python dict, CUE arcs
//! carry a flag set and a lazy evaluation cache, so `Arc` here is a richer cell than `Object`'s
//! plain key→value pair.

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::expr::Comprehension;
use crate::label::Label;
use crate::value::Value;

/// Per-arc flags (spec §3.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct ArcFlags {
    pub optional: bool,
    pub definition: bool,
    pub hidden: bool,
}

/// The lazy evaluation state of an arc (spec §4.9 state-machine table). `Evaluating` carries a
/// generation counter (spec §9: "use a dedicated `Evaluating(generation)` state rather than
/// reusing the error type") so the outer frame can tell "still evaluating this exact visit" apart
/// from "became an error produced during this visit".
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum ArcCache {
    Unevaluated,
    Evaluating(u64),
    Cycle(u64),
    Evaluated(Box<Value>),
}

impl Default for ArcCache {
    fn default() -> Self {
        Self::Unevaluated
    }
}

/// A single documentation comment attached to an arc or to the struct itself.
pub type Doc = String;

/// An attribute (`@foo(...)`) attached to an arc.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Attribute {
    pub name: String,
    pub body: String,
}

/// A labeled field within a struct (spec §3.5, GLOSSARY "Arc").
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Arc {
    pub label: Label,
    pub value: Box<Value>,
    pub flags: ArcFlags,
    pub attrs: SmallVec<[Attribute; 1]>,
    pub docs: SmallVec<[Doc; 1]>,
    #[serde(skip)]
    pub cache: ArcCache,
}

impl Arc {
    #[must_use]
    pub fn new(label: Label, value: Value) -> Self {
        Self {
            label,
            value: Box::new(value),
            flags: ArcFlags::default(),
            attrs: SmallVec::new(),
            docs: SmallVec::new(),
            cache: ArcCache::Unevaluated,
        }
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.flags.optional = true;
        self
    }

    #[must_use]
    pub fn definition(mut self) -> Self {
        self.flags.definition = true;
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.flags.hidden = true;
        self
    }
}

/// A field-name pattern in an optional-constraint/template declaration (spec §3.5).
///
/// `nil` in the spec prose corresponds to `Any`: a bare `[string]: value` template with no
/// explicit key-shape restriction beyond its declared key kind (every label matches).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum KeyPattern {
    Any,
    Exact(Label),
    Bound(Box<crate::bound::Bound>),
}

impl KeyPattern {
    #[must_use]
    pub fn matches(&self, label: Label, label_text: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(l) => *l == label,
            Self::Bound(b) => b.test_str(label_text),
        }
    }
}

/// An optional-constraint (template) pair: `{keyPattern, lambda(name) → value}` (spec §3.5, §4.6
/// "templated bulk-optional declaration").
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Optional {
    pub pattern: KeyPattern,
    pub lambda: Box<Value>,
}

/// Struct closedness (spec §3.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CloseStatus {
    Open,
    ShouldClose,
    Closed,
}

impl CloseStatus {
    #[must_use]
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Closed absorbs open (spec §4.5 step 6).
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        if self.is_closed() || other.is_closed() {
            Self::Closed
        } else if self == Self::ShouldClose || other == Self::ShouldClose {
            Self::ShouldClose
        } else {
            Self::Open
        }
    }
}

/// A struct value (spec §3.5).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Struct {
    /// Insertion-ordered arcs, keyed by label for O(1) lookup (spec §3.5: "arc order is stable by
    /// insertion but canonicalised"). `IndexMap` gives both properties without a separate Vec.
    pub arcs: IndexMap<Label, Arc>,
    pub optionals: SmallVec<[Optional; 2]>,
    pub emit: Option<Box<Value>>,
    pub comprehensions: SmallVec<[Comprehension; 1]>,
    pub close_status: CloseStatus,
    pub should_finalize: bool,
    /// Set once `expandFields` has run (spec §4.6: "expanding an already-expanded struct returns
    /// the cached expansion").
    #[serde(skip)]
    pub expanded: bool,
}

impl Default for Struct {
    fn default() -> Self {
        Self {
            arcs: IndexMap::new(),
            optionals: SmallVec::new(),
            emit: None,
            comprehensions: SmallVec::new(),
            close_status: CloseStatus::Open,
            should_finalize: false,
            expanded: false,
        }
    }
}

impl Struct {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn closed(mut self) -> Self {
        self.close_status = CloseStatus::Closed;
        self
    }

    pub fn insert(&mut self, arc: Arc) {
        self.arcs.insert(arc.label, arc);
    }

    #[must_use]
    pub fn get(&self, label: Label) -> Option<&Arc> {
        self.arcs.get(&label)
    }

    /// True iff `label` is accepted directly or through any optional pattern (spec §3.5
    /// invariant, §4.5 step 6). `label_text` is needed for regex-pattern matching.
    #[must_use]
    pub fn accepts(&self, label: Label, label_text: &str) -> bool {
        if self.arcs.contains_key(&label) {
            return true;
        }
        self.optionals.iter().any(|o| o.pattern.matches(label, label_text))
    }

    /// Canonicalises arc order by interned label, preserving stability for equal keys (spec §4.5
    /// step 7, §3.5 "stable sort by interned label").
    pub fn canonicalize_order(&mut self) {
        self.arcs.sort_by(|a_label, _, b_label, _| a_label.cmp(b_label));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::Interner;

    #[test]
    fn closed_absorbs_open_on_merge() {
        assert_eq!(CloseStatus::Open.merge(CloseStatus::Closed), CloseStatus::Closed);
        assert_eq!(CloseStatus::Closed.merge(CloseStatus::Open), CloseStatus::Closed);
        assert_eq!(CloseStatus::Open.merge(CloseStatus::Open), CloseStatus::Open);
    }

    #[test]
    fn accepts_checks_direct_arcs_and_optional_patterns() {
        let mut interner = Interner::new();
        let foo = interner.label("foo");
        let bar = interner.label("bar");
        let mut s = Struct::new();
        s.insert(Arc::new(foo, Value::int(1)));
        s.optionals.push(Optional {
            pattern: KeyPattern::Any,
            lambda: Box::new(Value::int(0)),
        });
        assert!(s.accepts(foo, "foo"));
        assert!(s.accepts(bar, "bar"));
    }

    #[test]
    fn canonicalize_order_sorts_by_label() {
        let mut interner = Interner::new();
        let z = interner.label("z");
        let a = interner.label("a");
        let mut s = Struct::new();
        s.insert(Arc::new(z, Value::int(1)));
        s.insert(Arc::new(a, Value::int(2)));
        s.canonicalize_order();
        let order: Vec<_> = s.arcs.keys().copied().collect();
        assert_eq!(order, vec![a.min(z), a.max(z)]);
    }
}
