//! The kind bit-lattice (spec §3.1) and binary-operator kind compatibility (§4.2).
//!
//! Grounded on `crates/ouros/src/types/type.rs`'s closed `Type` enum and
//! `crates/ouros/src/value.rs::py_type`'s match-based dispatch, generalized into a bitset:
//! unlike a Python runtime type, a CUE kind composes (`int | string` is itself a kind).

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

/// A bit-set over CUE's value categories plus two auxiliary bits.
///
/// `NULL` through `LAMBDA` are the ten concrete category bits (spec §3.1); `NON_GROUND` and
/// `REFERENCE` mark values that aren't yet a single concrete point. The all-zero value is
/// `BOTTOM`, the least element of the lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub struct Kind(u16);

impl Kind {
    pub const NULL: Self = Self(1 << 0);
    pub const BOOL: Self = Self(1 << 1);
    pub const INT: Self = Self(1 << 2);
    pub const FLOAT: Self = Self(1 << 3);
    pub const STRING: Self = Self(1 << 4);
    pub const BYTES: Self = Self(1 << 5);
    pub const DURATION: Self = Self(1 << 6);
    pub const LIST: Self = Self(1 << 7);
    pub const STRUCT: Self = Self(1 << 8);
    pub const LAMBDA: Self = Self(1 << 9);
    pub const NON_GROUND: Self = Self(1 << 10);
    pub const REFERENCE: Self = Self(1 << 11);

    pub const BOTTOM: Self = Self(0);
    pub const NUMBER: Self = Self(Self::INT.0 | Self::FLOAT.0);
    pub const SCALAR: Self = Self(Self::NUMBER.0 | Self::DURATION.0);
    pub const ATOM: Self = Self(
        Self::NULL.0
            | Self::BOOL.0
            | Self::INT.0
            | Self::FLOAT.0
            | Self::STRING.0
            | Self::BYTES.0
            | Self::DURATION.0,
    );
    pub const ADDABLE: Self = Self(Self::SCALAR.0 | Self::STRING.0 | Self::BYTES.0 | Self::LIST.0);
    pub const COMPARABLE: Self = Self(Self::ATOM.0 | Self::LIST.0);
    /// All concrete category bits, no auxiliary bits — the greatest element of the lattice.
    pub const TOP: Self = Self(
        Self::NULL.0
            | Self::BOOL.0
            | Self::INT.0
            | Self::FLOAT.0
            | Self::STRING.0
            | Self::BYTES.0
            | Self::DURATION.0
            | Self::LIST.0
            | Self::STRUCT.0
            | Self::LAMBDA.0,
    );

    const AUX_MASK: u16 = Self::NON_GROUND.0 | Self::REFERENCE.0;
    const ALL_MASK: u16 = Self::TOP.0 | Self::AUX_MASK;

    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    #[must_use]
    pub fn insert(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub fn remove(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// The category bits only, with every auxiliary bit cleared.
    #[must_use]
    pub fn ground(self) -> Self {
        self.remove(Self(Self::AUX_MASK))
    }

    /// True iff this kind denotes a single concrete point in its category.
    #[must_use]
    pub fn is_ground(self) -> bool {
        self.0 & Self::AUX_MASK == 0
    }

    /// True iff this kind is ground and excludes lambdas — a value, not a type-level placeholder.
    #[must_use]
    pub fn is_concrete(self) -> bool {
        self.is_ground() && !self.contains(Self::LAMBDA)
    }

    #[must_use]
    pub fn is_bottom(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub fn is_number(self) -> bool {
        self.intersects(Self::NUMBER)
    }
}

impl BitAnd for Kind {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitOr for Kind {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Kind {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl Not for Kind {
    type Output = Self;
    fn not(self) -> Self {
        Self(!self.0 & Self::ALL_MASK)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bottom() {
            return write!(f, "_|_");
        }
        const NAMES: &[(Kind, &str)] = &[
            (Kind::NULL, "null"),
            (Kind::BOOL, "bool"),
            (Kind::INT, "int"),
            (Kind::FLOAT, "float"),
            (Kind::STRING, "string"),
            (Kind::BYTES, "bytes"),
            (Kind::DURATION, "duration"),
            (Kind::LIST, "list"),
            (Kind::STRUCT, "struct"),
            (Kind::LAMBDA, "lambda"),
        ];
        let mut first = true;
        for (bit, name) in NAMES {
            if self.contains(*bit) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ground_strips_auxiliary_bits() {
        let k = Kind::INT | Kind::NON_GROUND;
        assert!(!k.is_ground());
        assert_eq!(k.ground(), Kind::INT);
        assert!(k.ground().is_ground());
    }

    #[test]
    fn number_is_int_or_float() {
        assert!(Kind::NUMBER.contains(Kind::INT));
        assert!(Kind::NUMBER.contains(Kind::FLOAT));
        assert!(!Kind::NUMBER.contains(Kind::STRING));
    }

    #[test]
    fn concrete_excludes_lambda_and_non_ground() {
        assert!(Kind::INT.is_concrete());
        assert!(!Kind::LAMBDA.is_concrete());
        assert!(!(Kind::INT | Kind::NON_GROUND).is_concrete());
    }

    #[test]
    fn display_lists_set_categories() {
        assert_eq!((Kind::INT | Kind::STRING).to_string(), "int|string");
        assert_eq!(Kind::BOTTOM.to_string(), "_|_");
    }
}
