//! Label interning (spec §3.7, §4.1).
//!
//! Grounded on `crates/ouros/src/intern.rs`'s `StringId`/interner pattern: a growable vector of
//! owned strings plus a reverse lookup map, returning small `Copy` ids instead of cloning
//! strings. Trimmed of the hundreds of pre-interned Python-dunder `StaticStrings` — CUE has no
//! fixed vocabulary of reserved identifiers to special-case.

use ahash::AHashMap;

/// An interned field label.
///
/// The low two bits are reserved flags (spec §3.7): bit 0 marks a `#Definition`, bit 1 marks a
/// `_hidden` field. The remaining bits index into the owning `Interner`'s table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct Label(u32);

const DEFINITION_BIT: u32 = 1 << 0;
const HIDDEN_BIT: u32 = 1 << 1;
const FLAG_BITS: u32 = 2;

impl Label {
    fn new(index: u32, definition: bool, hidden: bool) -> Self {
        let mut bits = index << FLAG_BITS;
        if definition {
            bits |= DEFINITION_BIT;
        }
        if hidden {
            bits |= HIDDEN_BIT;
        }
        Self(bits)
    }

    #[must_use]
    pub fn is_definition(self) -> bool {
        self.0 & DEFINITION_BIT != 0
    }

    #[must_use]
    pub fn is_hidden(self) -> bool {
        self.0 & HIDDEN_BIT != 0
    }

    /// Index into the owning `Interner`'s string table, ignoring flag bits. Two labels with the
    /// same index but different flags name the same text but are *distinct* struct fields
    /// (`foo` and `#foo` never unify as the same arc).
    #[must_use]
    fn index(self) -> usize {
        (self.0 >> FLAG_BITS) as usize
    }
}

/// Owns the mapping from label text to `Label` ids.
///
/// A single `Interner` is shared by every `Context` derived from the same index (spec §4.1:
/// "the index uses a mutex around shared label tables only" — here modeled as a plain owned
/// table since the crate doesn't yet expose multi-threaded contexts; callers wanting concurrent
/// contexts wrap this in their own `Mutex`, matching the teacher's "index uses a mutex ... only"
/// phrasing literally: the mutex lives at the boundary, not inside this type).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Interner {
    strings: Vec<String>,
    #[serde(skip)]
    lookup: AHashMap<String, u32>,
}

impl Interner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `text` as a plain field label (not a definition, not hidden).
    pub fn label(&mut self, text: &str) -> Label {
        self.label_with_flags(text, false, false)
    }

    pub fn label_with_flags(&mut self, text: &str, definition: bool, hidden: bool) -> Label {
        let index = self.intern_text(text);
        Label::new(index, definition, hidden)
    }

    fn intern_text(&mut self, text: &str) -> u32 {
        if let Some(&index) = self.lookup.get(text) {
            return index;
        }
        let index = u32::try_from(self.strings.len()).expect("label table overflow");
        self.strings.push(text.to_string());
        self.lookup.insert(text.to_string(), index);
        index
    }

    #[must_use]
    pub fn str(&self, label: Label) -> &str {
        &self.strings[label.index()]
    }

    /// Rebuilds the lookup map after deserializing (the map itself isn't serialized — see
    /// `#[serde(skip)]` above — since it's redundant with `strings` and only used to intern
    /// *new* text, never to replay interning history from a snapshot).
    pub fn rebuild_lookup(&mut self) {
        self.lookup.clear();
        for (index, text) in self.strings.iter().enumerate() {
            self.lookup
                .insert(text.clone(), u32::try_from(index).expect("label table overflow"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_same_flags_interns_once() {
        let mut interner = Interner::new();
        let a = interner.label("foo");
        let b = interner.label("foo");
        assert_eq!(a, b);
        assert_eq!(interner.strings.len(), 1);
    }

    #[test]
    fn definition_and_hidden_flags_distinguish_labels() {
        let mut interner = Interner::new();
        let plain = interner.label("foo");
        let def = interner.label_with_flags("foo", true, false);
        let hidden = interner.label_with_flags("foo", false, true);
        assert_ne!(plain, def);
        assert_ne!(plain, hidden);
        assert_ne!(def, hidden);
        assert_eq!(interner.str(plain), "foo");
        assert_eq!(interner.str(def), "foo");
        assert!(def.is_definition());
        assert!(hidden.is_hidden());
        assert!(!plain.is_definition() && !plain.is_hidden());
    }

    #[test]
    fn rebuild_lookup_after_snapshot_restore() {
        let mut interner = Interner::new();
        let original = interner.label("bar");
        interner.lookup.clear();
        interner.rebuild_lookup();
        let reinterned = interner.label("bar");
        assert_eq!(original, reinterned);
    }
}
