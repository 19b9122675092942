//! The `List` value (spec §3.4): an ordered sequence of cells plus a trailing-element
//! constraint and a length constraint.
//!
//! Grounded on `crates/ouros/src/heap.rs`'s `List`/`Tuple` storage shape (a plain `Vec<Value>`
//! behind a heap id), generalized with the two CUE-specific constraint fields a Python list
//! doesn't need.

use crate::value::Value;

/// A length constraint (spec §3.4). `Ground(n)` is a closed list of exactly `n` cells;
/// `Bound` is an open-ended constraint such as `>=2` coming from `[string, ...]`'s implicit
/// "at least the explicit cells" length bound.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum LenConstraint {
    Ground(u64),
    Bound(Box<crate::bound::Bound>),
}

impl LenConstraint {
    /// Openness is `¬len.isGround()` (spec §3.4).
    #[must_use]
    pub fn is_ground(&self) -> bool {
        matches!(self, Self::Ground(_))
    }
}

/// Ordered sequence of value cells plus element/length constraints (spec §3.4).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct List {
    pub cells: Vec<Value>,
    /// Element constraint applied to trailing positions beyond `cells` (the `...int` tail of
    /// `[int, ...int]`). `None` for a list with no open tail.
    pub elem_type: Option<Box<Value>>,
    pub len: LenConstraint,
}

impl List {
    #[must_use]
    pub fn closed(cells: Vec<Value>) -> Self {
        let len = cells.len() as u64;
        Self {
            cells,
            elem_type: None,
            len: LenConstraint::Ground(len),
        }
    }

    #[must_use]
    pub fn open(cells: Vec<Value>, elem_type: Value) -> Self {
        let min_len = cells.len() as u64;
        Self {
            cells,
            elem_type: Some(Box::new(elem_type)),
            len: LenConstraint::Bound(Box::new(crate::bound::Bound::new(
                crate::bound::BoundOp::GreaterEqual,
                crate::bound::BoundOperand::Number(crate::number::Number::from_i64(min_len as i64)),
            ))),
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.len.is_ground()
    }

    #[must_use]
    pub fn explicit_len(&self) -> usize {
        self.cells.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_list_has_ground_length() {
        let l = List::closed(vec![Value::int(1), Value::int(2)]);
        assert!(!l.is_open());
        assert_eq!(l.explicit_len(), 2);
    }

    #[test]
    fn open_list_carries_elem_type_and_min_length() {
        let l = List::open(vec![Value::int(1)], Value::BasicType(crate::kind::Kind::INT));
        assert!(l.is_open());
        assert!(l.elem_type.is_some());
    }
}
