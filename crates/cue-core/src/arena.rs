//! A generic slab arena for value-graph nodes (spec §3.8, §9 design note on cyclic graphs).
//!
//! Grounded on `crates/ouros/src/heap.rs`'s `Heap<T>`/`HeapId`/free-list slot design, with the
//! manual reference counting (`inc_ref`/`drop_with_heap`, needed there because Python objects
//! can be handed back to the host and outlive any one evaluation) dropped: a CUE `Arena` is
//! owned by exactly one `Context` (spec §4.1) and is dropped as a whole when evaluation ends, so
//! nothing needs per-slot liveness tracking beyond "has this index ever been allocated".

use std::marker::PhantomData;

/// A typed index into an `Arena<T>`.
///
/// Untyped (`usize`) back-edges would let a struct's arc accidentally index into a different
/// arena; the phantom type parameter keeps `Id<Struct>` and `Id<Expr>` distinct at compile time
/// the way `HeapId` keeps `ouros`'s heap slots opaque to callers.
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(bound = "")]
pub struct Id<T>(u32, #[serde(skip)] PhantomData<fn() -> T>);

impl<T> Id<T> {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Id<T> {}
impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl<T> Eq for Id<T> {}
impl<T> std::hash::Hash for Id<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}
impl<T> std::fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Id({})", self.0)
    }
}

/// A growable slot arena. Slots are never freed individually — an evaluation's arena lives and
/// dies with its `Context` — so allocation is a plain `Vec::push`, unlike `ouros::heap::Heap`'s
/// free-list reuse (which exists there to keep long-running REPL sessions from growing
/// unboundedly across many discarded objects).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(bound = "T: serde::Serialize + serde::de::DeserializeOwned")]
pub struct Arena<T> {
    slots: Vec<T>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<T> Arena<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, value: T) -> Id<T> {
        let index = u32::try_from(self.slots.len()).expect("arena overflow");
        self.slots.push(value);
        Id(index, PhantomData)
    }

    #[must_use]
    pub fn get(&self, id: Id<T>) -> &T {
        &self.slots[id.index()]
    }

    pub fn get_mut(&mut self, id: Id<T>) -> &mut T {
        &mut self.slots[id.index()]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Id<T>, &T)> {
        self.slots.iter().enumerate().map(|(i, v)| {
            (
                Id(u32::try_from(i).expect("arena overflow"), PhantomData),
                v,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_returns_increasing_distinct_ids() {
        let mut arena: Arena<i32> = Arena::new();
        let a = arena.alloc(1);
        let b = arena.alloc(2);
        assert_ne!(a, b);
        assert_eq!(*arena.get(a), 1);
        assert_eq!(*arena.get(b), 2);
    }

    #[test]
    fn get_mut_allows_in_place_updates() {
        let mut arena: Arena<Vec<u8>> = Arena::new();
        let id = arena.alloc(vec![1, 2, 3]);
        arena.get_mut(id).push(4);
        assert_eq!(arena.get(id), &[1, 2, 3, 4]);
    }

    #[test]
    fn iter_yields_ids_paired_with_values() {
        let mut arena: Arena<&'static str> = Arena::new();
        arena.alloc("a");
        arena.alloc("b");
        let collected: Vec<_> = arena.iter().map(|(_, v)| *v).collect();
        assert_eq!(collected, vec!["a", "b"]);
    }
}
