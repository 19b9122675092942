//! Value lattice, unification engine, and structural evaluator for the CUE configuration
//! language (spec §6 external interfaces).
//!
//! Grounded on `crates/ouros/src/lib.rs`'s module-declaration-then-`pub use`-block shape. Unlike
//! the teacher, which is itself the embeddable runtime, this crate is the evaluator core one
//! layer down: parsing, printing, and builtin-function/regex-library implementations are a
//! host's job (spec §1 Non-goals) and this module exposes only the narrow seams a host needs —
//! the entry-point functions below, [`BuiltinResolver`] for builtin/validator dispatch, and the
//! import-resolver callback shape `build_package` takes.

mod arena;
mod binop;
mod bound;
mod comprehension;
mod context;
mod disjunction;
mod error;
mod eval;
mod expr;
mod kind;
mod label;
mod lambda;
mod list;
mod number;
mod resource;
mod snapshot;
mod structure;
mod subsume;
mod tracer;
mod unify;
mod value;

pub use crate::arena::{Arena, Id};
pub use crate::binop::{eval_bin_op, match_bin_op_kind, BinOp, OpMatch, UnaryOp};
pub use crate::bound::{Bound, BoundOp, BoundOperand};
pub use crate::context::{Context, DelayedConstraint, ForwardFrame};
pub use crate::disjunction::{Disjunct, Disjunction};
pub use crate::error::{Bottom, CueResult, ErrorCode, MessageArg, Position, MAX_POSITIONS};
pub use crate::expr::{BuiltinRef, Callee, Clause, Comprehension, ComprehensionBody, InterpPart, NodeRef, Params};
pub use crate::kind::Kind;
pub use crate::label::{Interner, Label};
pub use crate::lambda::{Forward, Lambda};
pub use crate::list::{LenConstraint, List};
pub use crate::number::{Number, NumberTag, Overflow};
pub use crate::resource::{LimitedTracker, NoLimitTracker, ResourceError, ResourceLimits, ResourceTracker};
pub use crate::structure::{Arc, ArcCache, ArcFlags, Attribute, CloseStatus, Doc, KeyPattern, Optional, Struct};
pub use crate::subsume::SubsumeOptions;
pub use crate::tracer::{NoopTracer, RecordingTracer, StderrTracer, TraceEvent, Tracer};
pub use crate::value::Value;

use ahash::AHashSet;

/// Flags controlling evaluation depth, concreteness, and the iteration/printing filters a host
/// applies over a struct's arcs (spec §6 `Options` enumeration). Every flag defaults to `false`;
/// [`Options::all`] is the shorthand that turns on every inclusion filter at once.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// Stop at partial evaluation: references and comprehensions may remain unresolved.
    pub raw: bool,
    /// Force full, deep evaluation (the default `evaluate` behavior when neither flag is set).
    pub final_: bool,
    /// Reject non-ground results (spec §6: "reject non-concrete results during validation").
    pub concrete: bool,
    /// Report cycle-coded bottoms as validation errors instead of treating them as still-pending.
    pub disallow_cycles: bool,
    pub optional: bool,
    pub definitions: bool,
    pub hidden: bool,
    pub attributes: bool,
    pub docs: bool,
    /// Always re-resolve references rather than trusting a cached arc (this crate's evaluator
    /// already does this on every `eval_final` call; the flag exists for interface parity with
    /// hosts that distinguish a staged "keep references live" mode).
    pub resolve_references: bool,
    /// Subsumption ignores closedness and optional-pattern gating (spec §4.8, `SubsumeOptions`).
    pub schema: bool,
}

impl Options {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn raw(mut self) -> Self {
        self.raw = true;
        self
    }

    #[must_use]
    pub fn final_value(mut self) -> Self {
        self.final_ = true;
        self
    }

    #[must_use]
    pub fn concrete(mut self, include: bool) -> Self {
        self.concrete = include;
        self
    }

    #[must_use]
    pub fn disallow_cycles(mut self, include: bool) -> Self {
        self.disallow_cycles = include;
        self
    }

    #[must_use]
    pub fn optional(mut self, include: bool) -> Self {
        self.optional = include;
        self
    }

    #[must_use]
    pub fn definitions(mut self, include: bool) -> Self {
        self.definitions = include;
        self
    }

    #[must_use]
    pub fn hidden(mut self, include: bool) -> Self {
        self.hidden = include;
        self
    }

    #[must_use]
    pub fn attributes(mut self, include: bool) -> Self {
        self.attributes = include;
        self
    }

    #[must_use]
    pub fn docs(mut self, include: bool) -> Self {
        self.docs = include;
        self
    }

    #[must_use]
    pub fn resolve_references(mut self, include: bool) -> Self {
        self.resolve_references = include;
        self
    }

    #[must_use]
    pub fn schema(mut self, include: bool) -> Self {
        self.schema = include;
        self
    }

    /// Turns on every inclusion filter (spec §6 `All()`): optional fields, definitions, hidden
    /// fields, attributes, and docs all become visible to a caller iterating a struct's arcs.
    #[must_use]
    pub fn all() -> Self {
        Self {
            optional: true,
            definitions: true,
            hidden: true,
            attributes: true,
            docs: true,
            ..Self::default()
        }
    }

    fn subsume_options(self) -> SubsumeOptions {
        SubsumeOptions {
            schema: self.schema,
            final_only: self.final_,
        }
    }
}

/// The narrow interface a host implements to supply builtin-function and regex-library behavior
/// (spec §1: "the core calls them through a narrow interface"). Implementing any actual builtin
/// is explicitly out of scope here — this trait only names the call shape `Value::Call(Callee::
/// Builtin(_), _)` and `Value::CustomValidator(_, _)` dispatch through once a host wires a
/// resolver into its own copy of the evaluation loop. This crate's own `eval.rs` does not hold a
/// `dyn BuiltinResolver` itself (that would force every `Context<T>` to carry and thread a second
/// trait object through code paths most callers never touch); instead it reports `Bottom::fatal`
/// for both call shapes, leaving it to the host to intercept at its own integration boundary.
pub trait BuiltinResolver {
    /// Invokes `builtin` with already-evaluated `args`.
    fn call(&mut self, builtin: BuiltinRef, args: &[Value]) -> Result<Value, Bottom>;
    /// Runs a custom validator against an already-evaluated candidate value.
    fn validate(&mut self, builtin: BuiltinRef, value: &Value) -> Result<Value, Bottom>;
}

/// Callback a host supplies to resolve one import path to a package value and its declared
/// package name (spec §6 "Build package" entry point). Imports arrive pre-evaluated: this crate
/// never reads source files itself (spec §1 Non-goals).
pub type ImportResolver<'a> = dyn FnMut(&str) -> Result<(Value, String), Bottom> + 'a;

/// Compile entry point (spec §6): lowers an already-constructed expression node to its root
/// value without forcing defaults or closing structs. Parsing an expression AST into arena nodes
/// is a host concern (spec §1 Non-goals); by the time a caller reaches this crate, "the AST" is
/// already the `Id<Value>` graph under `ctx.nodes`, so compiling is just a raw (non-final)
/// evaluation of that graph's root.
pub fn compile<T: ResourceTracker>(ctx: &mut Context<T>, root: Id<Value>) -> Value {
    eval::eval_partial(ctx, root)
}

/// Build package entry point (spec §6): resolves each of `import_paths` through `resolve_import`
/// and registers the results into `ctx`, then unifies every file root in `files` together into
/// one package value. Returns the unified root alongside any import-resolution diagnostics;
/// a failed import does not abort the build, matching spec §7's "errors in one arc do not block
/// sibling arcs" propagation policy applied at package scope.
pub fn build_package<T: ResourceTracker>(
    ctx: &mut Context<T>,
    files: &[Id<Value>],
    import_paths: &[&str],
    resolve_import: &mut ImportResolver<'_>,
) -> (Value, Vec<Bottom>) {
    let mut diagnostics = Vec::new();
    for &path in import_paths {
        match resolve_import(path) {
            Ok((pkg_value, _name)) => ctx.register_import(path, pkg_value),
            Err(e) => diagnostics.push(e),
        }
    }

    let mut root = Value::Top;
    for &file in files {
        let file_value = eval::eval_final(ctx, file);
        root = unify::unify(ctx, &root, &file_value);
        if root.is_bottom() {
            break;
        }
    }
    (root, diagnostics)
}

/// Evaluate entry point (spec §6): drives `root` to either a raw or fully final value depending
/// on `opts`, then rejects non-concrete results if `opts.concrete` was requested.
pub fn evaluate<T: ResourceTracker>(ctx: &mut Context<T>, root: Id<Value>, opts: Options) -> Value {
    let result = if opts.raw {
        eval::eval_partial(ctx, root)
    } else {
        eval::eval_final(ctx, root)
    };
    if opts.concrete && !result.is_bottom() && !result.is_ground() {
        return Value::bottom(Bottom::type_error("value is not concrete"));
    }
    result
}

/// Validate entry point (spec §6): fully evaluates `root` and collects every bottom reachable
/// through it, subject to `opts`'s visibility filters. Errors are de-duplicated by source
/// position (spec §7: "the first error at any previously unseen position is kept") and capped at
/// 50 per pass (spec §7 aggregation bound).
pub fn validate<T: ResourceTracker>(ctx: &mut Context<T>, root: Id<Value>, opts: Options) -> Vec<Bottom> {
    const MAX_VALIDATION_ERRORS: usize = 50;

    let result = eval::eval_final(ctx, root);
    let mut errors = Vec::new();
    collect_errors(&result, opts, &mut errors);

    let mut seen = AHashSet::new();
    errors.retain(|b| match b.positions.first() {
        Some(pos) => seen.insert(*pos),
        None => true,
    });
    errors.truncate(MAX_VALIDATION_ERRORS);
    errors
}

fn collect_errors(v: &Value, opts: Options, out: &mut Vec<Bottom>) {
    if out.len() >= 50 {
        return;
    }
    match v {
        Value::Bottom(b) => {
            if b.code != ErrorCode::Cycle || opts.disallow_cycles {
                out.push((**b).clone());
            }
        }
        Value::Struct(s) => {
            for arc in s.arcs.values() {
                if arc.flags.hidden && !opts.hidden {
                    continue;
                }
                if arc.flags.definition && !opts.definitions {
                    continue;
                }
                if arc.flags.optional && !opts.optional {
                    continue;
                }
                collect_errors(&arc.value, opts, out);
            }
        }
        Value::List(l) => {
            for cell in &l.cells {
                collect_errors(cell, opts, out);
            }
        }
        _ => {
            if opts.concrete && !v.is_ground() {
                out.push(Bottom::type_error("value is not concrete"));
            }
        }
    }
}

/// Lookup entry point (spec §6): walks `path` through an already-evaluated struct tree, returning
/// the sub-value at the end of the path or a `not-exist` error at the first missing label. Takes
/// a plain `Value` rather than a `Context` because struct arcs are evaluated in place by the time
/// `eval_final` returns (`eval_struct` recurses with `deep = true`), so no further evaluation is
/// needed to walk into them.
pub fn lookup(root: &Value, path: &[Label]) -> Result<Value, Bottom> {
    let mut current = root.clone();
    for &label in path {
        match current {
            Value::Struct(ref s) => match s.get(label) {
                Some(arc) => current = (*arc.value).clone(),
                None => return Err(Bottom::not_exist("field not present")),
            },
            Value::Bottom(ref b) => return Err((**b).clone()),
            _ => return Err(Bottom::type_error("lookup requires a struct")),
        }
    }
    Ok(current)
}

/// Unify entry point (spec §6): unifies two values drawn from the same context's index.
pub fn unify_values<T: ResourceTracker>(ctx: &mut Context<T>, a: &Value, b: &Value) -> Value {
    unify::unify(ctx, a, b)
}

/// Subsume entry point (spec §6): does every instance of `b` also satisfy `a`?
#[must_use]
pub fn subsume_values(a: &Value, b: &Value, opts: Options) -> bool {
    subsume::subsume(a, b, opts.subsume_options())
}

/// Default entry point (spec §6): the unique marked default of a disjunction, or the value
/// itself (trivially its own default) for anything that isn't a disjunction.
pub fn default_value(v: &Value) -> Result<(Value, bool), Bottom> {
    match v {
        Value::Disjunction(d) => d.default_value(),
        other => Ok((other.clone(), true)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::NoLimitTracker;

    #[test]
    fn evaluate_final_resolves_a_reference() {
        let mut ctx: Context<NoLimitTracker> = Context::new();
        let x = ctx.nodes.alloc(Value::int(5));
        let y = ctx.nodes.alloc(Value::Ref(NodeRef {
            depth: 0,
            label: ctx.label("unused"),
        }));
        let _ = y;
        assert_eq!(evaluate(&mut ctx, x, Options::new().final_value()), Value::int(5));
    }

    #[test]
    fn lookup_walks_nested_struct_fields() {
        let mut ctx: Context<NoLimitTracker> = Context::new();
        let inner_label = ctx.label("inner");
        let outer_label = ctx.label("outer");
        let mut inner = Struct::new();
        inner.insert(Arc::new(inner_label, Value::int(9)));
        let mut outer = Struct::new();
        outer.insert(Arc::new(outer_label, Value::Struct(inner)));

        let root = Value::Struct(outer);
        let found = lookup(&root, &[outer_label, inner_label]).unwrap();
        assert_eq!(found, Value::int(9));
    }

    #[test]
    fn lookup_reports_not_exist_for_a_missing_field() {
        let mut ctx: Context<NoLimitTracker> = Context::new();
        let present = ctx.label("present");
        let missing = ctx.label("missing");
        let mut s = Struct::new();
        s.insert(Arc::new(present, Value::int(1)));

        let err = lookup(&Value::Struct(s), &[missing]).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotExist);
    }

    #[test]
    fn validate_caps_errors_at_fifty_and_dedupes_by_position() {
        let mut ctx: Context<NoLimitTracker> = Context::new();
        let mut s = Struct::new();
        for i in 0..60 {
            let label = ctx.label(&format!("f{i}"));
            let mut b = Bottom::type_error("bad field").with_position(Position { file: 0, offset: 1 });
            if i % 2 == 0 {
                b = Bottom::type_error("bad field").with_position(Position { file: 0, offset: i });
            }
            s.insert(Arc::new(label, Value::bottom(b)));
        }
        let root = ctx.nodes.alloc(Value::Struct(s));
        let errors = validate(&mut ctx, root, Options::new());
        assert!(errors.len() <= 50);
    }

    #[test]
    fn validate_ignores_cycle_errors_unless_disallowed() {
        let mut ctx: Context<NoLimitTracker> = Context::new();
        let label = ctx.label("x");
        let mut s = Struct::new();
        s.insert(Arc::new(label, Value::bottom(Bottom::cycle("structural cycle"))));
        let root = ctx.nodes.alloc(Value::Struct(s));

        assert!(validate(&mut ctx, root, Options::new()).is_empty());
        assert_eq!(validate(&mut ctx, root, Options::new().disallow_cycles(true)).len(), 1);
    }

    #[test]
    fn default_value_passes_through_non_disjunctions() {
        let (v, had_default) = default_value(&Value::int(3)).unwrap();
        assert_eq!(v, Value::int(3));
        assert!(had_default);
    }

    #[test]
    fn subsume_values_respects_schema_option() {
        let open = Value::Struct(Struct::new());
        let mut closed_inner = Struct::new();
        let mut ctx: Context<NoLimitTracker> = Context::new();
        let field = ctx.label("extra");
        closed_inner.insert(Arc::new(field, Value::int(1)));
        let closed = Value::Struct(closed_inner.closed());

        assert!(subsume_values(&open, &closed, Options::new().schema(true)));
    }

    #[test]
    fn build_package_unifies_file_roots_and_reports_failed_imports() {
        let mut ctx: Context<NoLimitTracker> = Context::new();
        let a_label = ctx.label("a");
        let b_label = ctx.label("b");
        let mut sa = Struct::new();
        sa.insert(Arc::new(a_label, Value::int(1)));
        let mut sb = Struct::new();
        sb.insert(Arc::new(b_label, Value::int(2)));
        let file_a = ctx.nodes.alloc(Value::Struct(sa));
        let file_b = ctx.nodes.alloc(Value::Struct(sb));

        let mut resolver = |path: &str| -> Result<(Value, String), Bottom> { Err(Bottom::not_exist("no such import").with_arg(path.to_string())) };
        let (root, diagnostics) = build_package(&mut ctx, &[file_a, file_b], &["missing/pkg"], &mut resolver);

        assert_eq!(diagnostics.len(), 1);
        match root {
            Value::Struct(s) => assert_eq!(s.arcs.len(), 2),
            other => panic!("expected struct, got {other:?}"),
        }
    }
}
