//! Operator kinds and `matchBinOpKind` (spec §4.2).
//!
//! Grounded on the per-op dispatch style of `crates/ouros/src/bytecode/vm/binary.rs` and
//! `vm/compare.rs`: both are table-shaped matches from an operator enum to per-kind behaviour.
//! Here the dispatch answers a narrower question up front — "is this operator even defined on
//! these two kinds, and what kind does it produce" — before `unify.rs`/`eval.rs` touch any
//! concrete value, mirroring the spec's two-phase "compute kind compatibility, then execute".

use crate::bound::{Bound, BoundOp};
use crate::error::Bottom;
use crate::kind::Kind;
use crate::number::{Number, NumberTag};
use crate::value::Value;

/// Binary operators (spec §3.6 `BinaryOp(op,x,y)`, §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BinOp {
    Unify,
    Or,
    And,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    GreaterEqual,
    Greater,
    Match,
    NotMatch,
    Add,
    Sub,
    Mul,
    Div,
    /// Truncating integer quotient (Go-style `quo`).
    Quo,
    /// Truncating integer remainder (Go-style `rem`).
    Rem,
    /// Euclidean integer quotient (non-negative remainder convention).
    IntDiv,
    /// Euclidean integer remainder (non-negative).
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    /// Unary `!` applied to a ground value that should instead produce `!=v` as a non-ground
    /// bound — CUE's "not" bound constructor, distinct from boolean negation.
    NotEqualBound,
}

/// Outcome of a kind-compatibility check (spec §4.2).
pub struct OpMatch {
    pub result_kind: Kind,
    pub swap: bool,
}

/// `matchBinOpKind(op, k_a, k_b)` (spec §4.2): decide whether `op` is defined on `k_a`/`k_b`
/// without touching concrete values, and what kind the result carries.
pub fn match_bin_op_kind(op: BinOp, k_a: Kind, k_b: Kind) -> Result<OpMatch, Bottom> {
    let conflict = || {
        Bottom::type_error("invalid operation: operator not defined for kinds")
            .with_arg(k_a.to_string())
            .with_arg(k_b.to_string())
    };
    match op {
        BinOp::Unify => {
            let meet = k_a & k_b;
            if meet.is_bottom() && !(k_a.is_bottom() || k_b.is_bottom()) {
                return Err(conflict());
            }
            Ok(OpMatch {
                result_kind: meet,
                swap: false,
            })
        }
        BinOp::And | BinOp::Or => {
            if k_a.contains(Kind::BOOL) && k_b.contains(Kind::BOOL) {
                Ok(OpMatch {
                    result_kind: Kind::BOOL,
                    swap: false,
                })
            } else {
                Err(conflict())
            }
        }
        BinOp::Equal | BinOp::NotEqual => {
            if k_a.intersects(k_b) || k_b.contains(Kind::NULL) || k_a.contains(Kind::NULL) {
                Ok(OpMatch {
                    result_kind: Kind::BOOL,
                    swap: false,
                })
            } else {
                Err(conflict())
            }
        }
        BinOp::Less | BinOp::LessEqual | BinOp::GreaterEqual | BinOp::Greater => {
            let ordered = Kind::NUMBER | Kind::STRING | Kind::BYTES | Kind::DURATION;
            if k_a.intersects(ordered) && k_b.intersects(ordered) && (k_a.ground() == k_b.ground() || k_a.is_number() && k_b.is_number())
            {
                Ok(OpMatch {
                    result_kind: Kind::BOOL,
                    swap: false,
                })
            } else {
                Err(conflict())
            }
        }
        BinOp::Match | BinOp::NotMatch => {
            if (k_a.contains(Kind::STRING) && k_b.contains(Kind::STRING))
                || (k_a.contains(Kind::BYTES) && k_b.contains(Kind::BYTES))
            {
                Ok(OpMatch {
                    result_kind: Kind::BOOL,
                    swap: false,
                })
            } else {
                Err(conflict())
            }
        }
        BinOp::Add => {
            let addable = Kind::ADDABLE;
            if k_a.intersects(addable) && k_b.intersects(addable) && kinds_compatible_for_add(k_a, k_b) {
                Ok(OpMatch {
                    result_kind: k_a & k_b | (k_a & addable) & (k_b & addable),
                    swap: false,
                })
            } else {
                Err(conflict())
            }
        }
        BinOp::Sub | BinOp::Div => {
            if k_a.is_number() && k_b.is_number() {
                Ok(OpMatch {
                    result_kind: Kind::NUMBER,
                    swap: false,
                })
            } else {
                Err(conflict())
            }
        }
        BinOp::Mul => {
            if k_a.is_number() && k_b.is_number() {
                Ok(OpMatch {
                    result_kind: Kind::NUMBER,
                    swap: false,
                })
            } else if k_a.contains(Kind::INT) && (k_b.contains(Kind::LIST) || k_b.contains(Kind::STRING) || k_b.contains(Kind::BYTES)) {
                Ok(OpMatch {
                    result_kind: k_b,
                    swap: true,
                })
            } else if k_b.contains(Kind::INT) && (k_a.contains(Kind::LIST) || k_a.contains(Kind::STRING) || k_a.contains(Kind::BYTES)) {
                Ok(OpMatch {
                    result_kind: k_a,
                    swap: false,
                })
            } else {
                Err(conflict())
            }
        }
        BinOp::Quo | BinOp::Rem | BinOp::IntDiv | BinOp::Mod => {
            if k_a.contains(Kind::INT) && !k_a.contains(Kind::FLOAT) && k_b.contains(Kind::INT) && !k_b.contains(Kind::FLOAT) {
                Ok(OpMatch {
                    result_kind: Kind::INT,
                    swap: false,
                })
            } else {
                Err(Bottom::type_error("integer operator requires int operands"))
            }
        }
    }
}

fn kinds_compatible_for_add(k_a: Kind, k_b: Kind) -> bool {
    if k_a.is_number() && k_b.is_number() {
        return true;
    }
    k_a.ground() == k_b.ground()
}

/// Executes a binary operator on two concrete atomic values, after `match_bin_op_kind` has
/// already confirmed the operator is defined (spec §4.2, §4.4 step 4 "two atoms of the same
/// ground category").
pub fn eval_bin_op(op: BinOp, a: &Value, b: &Value) -> Result<Value, Bottom> {
    use Value::{Bytes, Num, Str};
    match (op, a, b) {
        (BinOp::Add, Num(x), Num(y)) => Ok(Num(x.add(y))),
        (BinOp::Sub, Num(x), Num(y)) => Ok(Num(x.sub(y))),
        (BinOp::Mul, Num(x), Num(y)) => Ok(Num(x.mul(y))),
        (BinOp::Div, Num(x), Num(y)) => x
            .div(y)
            .map(Num)
            .ok_or_else(|| Bottom::type_error("division by zero")),
        (BinOp::Quo, Num(x), Num(y)) => int_op(x, y, Number::quo, "division by zero"),
        (BinOp::Rem, Num(x), Num(y)) => int_op(x, y, Number::rem, "division by zero"),
        (BinOp::IntDiv, Num(x), Num(y)) => int_op(x, y, Number::div_euclid, "division by zero"),
        (BinOp::Mod, Num(x), Num(y)) => int_op(x, y, Number::mod_euclid, "division by zero"),
        (BinOp::Add, Str(x), Str(y)) => Ok(Str(format!("{x}{y}"))),
        (BinOp::Add, Bytes(x), Bytes(y)) => {
            let mut out = x.clone();
            out.extend_from_slice(y);
            Ok(Bytes(out))
        }
        (BinOp::Equal, x, y) => Ok(Value::Bool(values_equal(x, y))),
        (BinOp::NotEqual, x, y) => Ok(Value::Bool(!values_equal(x, y))),
        (BinOp::Less, Num(x), Num(y)) => Ok(Value::Bool(x < y)),
        (BinOp::LessEqual, Num(x), Num(y)) => Ok(Value::Bool(x <= y)),
        (BinOp::GreaterEqual, Num(x), Num(y)) => Ok(Value::Bool(x >= y)),
        (BinOp::Greater, Num(x), Num(y)) => Ok(Value::Bool(x > y)),
        (BinOp::Less, Str(x), Str(y)) => Ok(Value::Bool(x < y)),
        (BinOp::LessEqual, Str(x), Str(y)) => Ok(Value::Bool(x <= y)),
        (BinOp::GreaterEqual, Str(x), Str(y)) => Ok(Value::Bool(x >= y)),
        (BinOp::Greater, Str(x), Str(y)) => Ok(Value::Bool(x > y)),
        (BinOp::And, Value::Bool(x), Value::Bool(y)) => Ok(Value::Bool(*x && *y)),
        (BinOp::Or, Value::Bool(x), Value::Bool(y)) => Ok(Value::Bool(*x || *y)),
        (BinOp::Match, Str(x), Str(y)) => {
            let bound = Bound::match_regex(BoundOp::Match, y).map_err(|e| Bottom::type_error("invalid regex").with_arg(e.to_string()))?;
            Ok(Value::Bool(bound.test_str(x)))
        }
        (BinOp::NotMatch, Str(x), Str(y)) => {
            let bound = Bound::match_regex(BoundOp::Match, y).map_err(|e| Bottom::type_error("invalid regex").with_arg(e.to_string()))?;
            Ok(Value::Bool(!bound.test_str(x)))
        }
        _ => Err(Bottom::type_error("operator not defined for these values")),
    }
}

fn int_op(
    x: &Number,
    y: &Number,
    f: impl Fn(&Number, &Number) -> Option<Number>,
    zero_msg: &'static str,
) -> Result<Value, Bottom> {
    if x.tag() == NumberTag::FloatOnly || y.tag() == NumberTag::FloatOnly {
        return Err(Bottom::type_error("integer operator requires int operands"));
    }
    f(x, y).map(Value::Num).ok_or_else(|| Bottom::type_error(zero_msg))
}

fn values_equal(a: &Value, b: &Value) -> bool {
    use Value::{Bool, Bytes, Duration, Null, Num, Str};
    match (a, b) {
        (Num(x), Num(y)) => x == y,
        (Str(x), Str(y)) => x == y,
        (Bytes(x), Bytes(y)) => x == y,
        (Bool(x), Bool(y)) => x == y,
        (Null, Null) => true,
        (Duration(x), Duration(y)) => x == y,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unify_kind_match_rejects_disjoint_kinds() {
        let r = match_bin_op_kind(BinOp::Unify, Kind::INT, Kind::STRING);
        assert!(r.is_err());
    }

    #[test]
    fn integer_operators_reject_float_operands() {
        let r = match_bin_op_kind(BinOp::Quo, Kind::INT, Kind::FLOAT);
        assert!(r.is_err());
    }

    #[test]
    fn add_is_defined_on_numbers_strings_bytes_and_lists() {
        assert!(match_bin_op_kind(BinOp::Add, Kind::INT, Kind::FLOAT).is_ok());
        assert!(match_bin_op_kind(BinOp::Add, Kind::STRING, Kind::STRING).is_ok());
        assert!(match_bin_op_kind(BinOp::Add, Kind::BYTES, Kind::BYTES).is_ok());
    }

    #[test]
    fn eval_add_on_numbers_matches_decimal_addition() {
        let v = eval_bin_op(BinOp::Add, &Value::Num(Number::from_i64(2)), &Value::Num(Number::from_i64(3))).unwrap();
        assert_eq!(v, Value::Num(Number::from_i64(5)));
    }

    #[test]
    fn eval_quo_and_div_euclid_differ_on_negative_operands() {
        let a = Value::Num(Number::from_i64(-7));
        let b = Value::Num(Number::from_i64(2));
        let quo = eval_bin_op(BinOp::Quo, &a, &b).unwrap();
        let div = eval_bin_op(BinOp::IntDiv, &a, &b).unwrap();
        assert_eq!(quo, Value::Num(Number::from_i64(-3)));
        assert_eq!(div, Value::Num(Number::from_i64(-4)));
    }
}
