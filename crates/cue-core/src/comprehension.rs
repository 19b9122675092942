//! Comprehension evaluation (spec §4.6, §9 design note "coroutine-style yielders").
//!
//! Grounded directly on the design note: modeled as a recursive clause-chain walker rather than
//! adapted from `crates/ouros/src/types/generator.rs`, since that file models Python generator
//! *suspension* (a coroutine state machine resumable across separate VM steps), which CUE doesn't
//! need — a comprehension here either runs to completion in one evaluator call or is deferred as
//! a whole when a clause depends on an incomplete value (spec §4.6: "retained for later passes").

use crate::context::Context;
use crate::error::{Bottom, ErrorCode};
use crate::expr::{Clause, Comprehension, ComprehensionBody};
use crate::resource::ResourceTracker;
use crate::value::Value;

/// One yielded result of a field comprehension: a key/value pair destined to become an arc.
pub struct Yielded {
    pub key: String,
    pub value: Value,
}

/// Drives a clause chain to completion, invoking `on_yield` for each `Yield` the body produces
/// once every enclosing `For`/`If` clause is satisfied (spec §4.6).
///
/// Returns `Ok(false)` (without calling `on_yield`) when some clause's source or condition is
/// still incomplete — the caller retains the comprehension for a later pass rather than treating
/// this as failure (spec §4.6 "retained for later passes").
pub fn drive<T: ResourceTracker>(
    ctx: &mut Context<T>,
    clauses: &[Clause],
    eval: &mut impl FnMut(&mut Context<T>, crate::arena::Id<Value>) -> Result<Value, Bottom>,
    on_yield: &mut impl FnMut(&mut Context<T>) -> Result<(), Bottom>,
) -> Result<bool, Bottom> {
    let Some((head, rest)) = clauses.split_first() else {
        on_yield(ctx)?;
        return Ok(true);
    };
    match head {
        Clause::If { cond } => {
            let v = eval(ctx, *cond)?;
            match v {
                Value::Bool(true) => drive(ctx, rest, eval, on_yield),
                Value::Bool(false) => Ok(true),
                Value::Bottom(b) if b.code == ErrorCode::Incomplete => Ok(false),
                _ => Err(Bottom::type_error("comprehension condition must be bool")),
            }
        }
        Clause::For { key, value, src } => {
            let v = eval(ctx, *src)?;
            match v {
                Value::List(list) => {
                    for (i, cell) in list.cells.iter().enumerate() {
                        let mut bindings = vec![(*value, cell.clone())];
                        if let Some(key) = key {
                            bindings.push((*key, Value::int(i as i64)));
                        }
                        ctx.push_forwards(bindings);
                        let proceed = drive(ctx, rest, eval, on_yield);
                        ctx.pop_forwards();
                        if !proceed? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                Value::Struct(s) => {
                    for (label, arc) in s.arcs.iter() {
                        let mut bindings = vec![(*value, (*arc.value).clone())];
                        if let Some(key) = key {
                            bindings.push((*key, Value::Str(ctx.label_str(*label).to_string())));
                        }
                        ctx.push_forwards(bindings);
                        let proceed = drive(ctx, rest, eval, on_yield);
                        ctx.pop_forwards();
                        if !proceed? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                Value::Bottom(b) if b.code == ErrorCode::Incomplete => Ok(false),
                _ => Err(Bottom::type_error("for clause source must be a list or struct")),
            }
        }
    }
}

/// Evaluates a full comprehension to its materialised result: a `List` value for
/// `ComprehensionBody::List`, or a list of `(key, value)` pairs for `ComprehensionBody::Field`
/// which the caller (struct expansion in `unify.rs`) inserts as arcs (spec §4.6: "key must be a
/// string; a non-string key is a type error").
pub fn evaluate_field_comprehension<T: ResourceTracker>(
    ctx: &mut Context<T>,
    comp: &Comprehension,
    eval: &mut impl FnMut(&mut Context<T>, crate::arena::Id<Value>) -> Result<Value, Bottom>,
) -> Result<Vec<Yielded>, Bottom> {
    let ComprehensionBody::Field { key, value } = &comp.body else {
        return Err(Bottom::fatal("evaluate_field_comprehension called on a non-field body"));
    };
    let mut out = Vec::new();
    let mut on_yield = |ctx: &mut Context<T>| -> Result<(), Bottom> {
        let key_val = eval(ctx, *key)?;
        let key_str = match key_val {
            Value::Str(s) => s,
            Value::Bottom(b) if b.code == ErrorCode::Incomplete => return Err(*b),
            _ => return Err(Bottom::type_error("comprehension key must be a string")),
        };
        let value_val = eval(ctx, *value)?;
        out.push(Yielded {
            key: key_str,
            value: value_val,
        });
        Ok(())
    };
    let completed = drive(ctx, &comp.clauses, eval, &mut on_yield)?;
    if !completed {
        return Err(Bottom::incomplete("comprehension source is not yet evaluable"));
    }
    Ok(out)
}

/// Evaluates a `ListComprehension` body to its yielded element sequence (spec §3.6
/// `ListComprehension(clauses)`, §4.6).
pub fn evaluate_list_comprehension<T: ResourceTracker>(
    ctx: &mut Context<T>,
    comp: &Comprehension,
    eval: &mut impl FnMut(&mut Context<T>, crate::arena::Id<Value>) -> Result<Value, Bottom>,
) -> Result<Vec<Value>, Bottom> {
    let ComprehensionBody::List { value } = &comp.body else {
        return Err(Bottom::fatal("evaluate_list_comprehension called on a non-list body"));
    };
    let mut out = Vec::new();
    let mut on_yield = |ctx: &mut Context<T>| -> Result<(), Bottom> {
        out.push(eval(ctx, *value)?);
        Ok(())
    };
    let completed = drive(ctx, &comp.clauses, eval, &mut on_yield)?;
    if !completed {
        return Err(Bottom::incomplete("comprehension source is not yet evaluable"));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::NoLimitTracker;

    #[test]
    fn no_clauses_yields_once() {
        let mut ctx: Context<NoLimitTracker> = Context::new();
        let mut calls = 0;
        let mut eval = |_: &mut Context<NoLimitTracker>, _: crate::arena::Id<Value>| Ok(Value::Null);
        let mut on_yield = |_: &mut Context<NoLimitTracker>| -> Result<(), Bottom> {
            calls += 1;
            Ok(())
        };
        let completed = drive(&mut ctx, &[], &mut eval, &mut on_yield).unwrap();
        assert!(completed);
        assert_eq!(calls, 1);
    }

    #[test]
    fn if_clause_false_suppresses_yield() {
        let mut ctx: Context<NoLimitTracker> = Context::new();
        let cond_id = ctx.nodes.alloc(Value::Bool(false));
        let mut calls = 0;
        let mut eval = |_: &mut Context<NoLimitTracker>, _: crate::arena::Id<Value>| Ok(Value::Bool(false));
        let mut on_yield = |_: &mut Context<NoLimitTracker>| -> Result<(), Bottom> {
            calls += 1;
            Ok(())
        };
        let clauses = [Clause::If { cond: cond_id }];
        drive(&mut ctx, &clauses, &mut eval, &mut on_yield).unwrap();
        assert_eq!(calls, 0);
    }
}
