//! Bound predicates (spec §3.3): unary constraints over atoms such as `>3`, `!="foo"`, `=~"^a"`.
//!
//! Grounded on the per-kind comparison dispatch in `crates/ouros/src/bytecode/vm/compare.rs` for
//! the ordering operators, and `crates/ouros/src/modules/re.rs::build_regex` for the match
//! operators — trimmed to plain `regex` since CUE's `=~`/`!~` need no Python-style lookaround
//! that would require `fancy-regex`.

use std::sync::Arc;

use crate::kind::Kind;
use crate::number::Number;

/// The seven bound operators (spec §3.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BoundOp {
    NotEqual,
    Less,
    LessEqual,
    GreaterEqual,
    Greater,
    Match,
    NotMatch,
}

/// The ground operand of a bound. Regexes are stored pre-compiled and shared (`Arc`) since the
/// same pattern is frequently re-tested against many candidate values during unification and
/// disjunction normalisation.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum BoundOperand {
    Null,
    Number(Number),
    Str(String),
    Bytes(Vec<u8>),
    #[serde(skip)]
    Regex(Option<Arc<regex::Regex>>),
}

/// A non-ground placeholder standing for "every value satisfying `op` against `operand`"
/// (spec §3.3). Always carries the `non-ground` kind bit.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Bound {
    pub op: BoundOp,
    pub operand: BoundOperand,
}

impl Bound {
    #[must_use]
    pub fn new(op: BoundOp, operand: BoundOperand) -> Self {
        Self { op, operand }
    }

    pub fn match_regex(op: BoundOp, pattern: &str) -> Result<Self, regex::Error> {
        let re = regex::Regex::new(pattern)?;
        Ok(Self {
            op,
            operand: BoundOperand::Regex(Some(Arc::new(re))),
        })
    }

    /// The kind this bound ranges over, derived from its operand (spec §3.3: "kind is derived
    /// from op and v"). `≠null` is special-cased to range over every kind, since `!=null` must
    /// reject only the null value, not constrain to any one category.
    #[must_use]
    pub fn kind(&self) -> Kind {
        let base = match &self.operand {
            BoundOperand::Null => {
                return Kind::TOP | Kind::NON_GROUND;
            }
            BoundOperand::Number(n) => {
                if n.is_int_valued() {
                    Kind::NUMBER
                } else {
                    Kind::FLOAT
                }
            }
            BoundOperand::Str(_) => Kind::STRING,
            BoundOperand::Bytes(_) => Kind::BYTES,
            BoundOperand::Regex(_) => match self.op {
                BoundOp::Match | BoundOp::NotMatch => Kind::STRING | Kind::BYTES,
                _ => Kind::BOTTOM,
            },
        };
        base | Kind::NON_GROUND
    }

    /// Tests this bound's predicate against a ground string (spec §8 regex boundary case).
    #[must_use]
    pub fn test_str(&self, s: &str) -> bool {
        match (self.op, &self.operand) {
            (BoundOp::NotEqual, BoundOperand::Str(v)) => s != v,
            (BoundOp::Less, BoundOperand::Str(v)) => s < v.as_str(),
            (BoundOp::LessEqual, BoundOperand::Str(v)) => s <= v.as_str(),
            (BoundOp::GreaterEqual, BoundOperand::Str(v)) => s >= v.as_str(),
            (BoundOp::Greater, BoundOperand::Str(v)) => s > v.as_str(),
            (BoundOp::Match, BoundOperand::Regex(Some(re))) => re.is_match(s),
            (BoundOp::NotMatch, BoundOperand::Regex(Some(re))) => !re.is_match(s),
            _ => false,
        }
    }

    #[must_use]
    pub fn test_number(&self, n: &Number) -> bool {
        match (self.op, &self.operand) {
            (BoundOp::NotEqual, BoundOperand::Number(v)) => n != v,
            (BoundOp::Less, BoundOperand::Number(v)) => n < v,
            (BoundOp::LessEqual, BoundOperand::Number(v)) => n <= v,
            (BoundOp::GreaterEqual, BoundOperand::Number(v)) => n >= v,
            (BoundOp::Greater, BoundOperand::Number(v)) => n > v,
            _ => false,
        }
    }

    /// True iff this bound is an inequality (ordering) operator, as opposed to `≠`/`=~`/`!~`.
    #[must_use]
    pub fn is_ordering(&self) -> bool {
        matches!(
            self.op,
            BoundOp::Less | BoundOp::LessEqual | BoundOp::GreaterEqual | BoundOp::Greater
        )
    }

    /// The operator that reverses the inequality direction, used when intersecting two bounds
    /// that need to be compared on a common side (spec §4.4 bound-vs-bound).
    #[must_use]
    pub fn flip(op: BoundOp) -> BoundOp {
        match op {
            BoundOp::Less => BoundOp::Greater,
            BoundOp::LessEqual => BoundOp::GreaterEqual,
            BoundOp::GreaterEqual => BoundOp::LessEqual,
            BoundOp::Greater => BoundOp::Less,
            other => other,
        }
    }
}

impl PartialEq for Bound {
    fn eq(&self, other: &Self) -> bool {
        self.op == other.op
            && match (&self.operand, &other.operand) {
                (BoundOperand::Null, BoundOperand::Null) => true,
                (BoundOperand::Number(a), BoundOperand::Number(b)) => a == b,
                (BoundOperand::Str(a), BoundOperand::Str(b)) => a == b,
                (BoundOperand::Bytes(a), BoundOperand::Bytes(b)) => a == b,
                (BoundOperand::Regex(a), BoundOperand::Regex(b)) => match (a, b) {
                    (Some(a), Some(b)) => a.as_str() == b.as_str(),
                    (None, None) => true,
                    _ => false,
                },
                _ => false,
            }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn less_than_number_bound_rejects_equal_value() {
        let b = Bound::new(BoundOp::Less, BoundOperand::Number(Number::from_i64(5)));
        assert!(!b.test_number(&Number::from_i64(5)));
        assert!(b.test_number(&Number::from_i64(4)));
    }

    #[test]
    fn regex_bound_matches_and_rejects() {
        let b = Bound::match_regex(BoundOp::Match, "[a-z]").unwrap();
        assert!(b.test_str("a"));
        assert!(!b.test_str("Z"));
    }

    #[test]
    fn not_equal_null_ranges_over_every_kind() {
        let b = Bound::new(BoundOp::NotEqual, BoundOperand::Null);
        assert!(b.kind().contains(Kind::STRUCT));
        assert!(b.kind().contains(Kind::LIST));
    }

    #[test]
    fn flip_reverses_ordering_operators_only() {
        assert_eq!(Bound::flip(BoundOp::Less), BoundOp::Greater);
        assert_eq!(Bound::flip(BoundOp::NotEqual), BoundOp::NotEqual);
    }
}
