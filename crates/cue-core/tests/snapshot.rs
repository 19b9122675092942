//! Round-tripping a fully evaluated value tree through the binary snapshot format (spec §8: "for
//! any closed, final value, exporting to the snapshot format and reloading must produce an equal
//! value, ignoring source positions"). `snapshot.rs`'s own unit tests already cover the format's
//! framing (version byte, empty buffer, unknown version, a flat struct); this file exercises the
//! round trip against a deeper nested tree shaped like an evaluated package (strings, numbers, a
//! list, a bound, a nested struct, a null and a bool), since the interner and node arena being
//! cloned whole into the snapshot body (rather than re-derived) means the `Label`s used to build
//! the original tree remain valid lookup keys into the restored one.

use cue_core::{Arc, Bound, BoundOp, BoundOperand, Context, List, NoLimitTracker, Number, Options, Struct, Value};

struct Labels {
    name: cue_core::Label,
    replicas: cue_core::Label,
    tags: cue_core::Label,
    quota: cue_core::Label,
    inner: cue_core::Label,
    enabled: cue_core::Label,
    note: cue_core::Label,
}

fn build_package(ctx: &mut Context<NoLimitTracker>) -> (cue_core::Id<Value>, Labels) {
    let labels = Labels {
        name: ctx.label("name"),
        replicas: ctx.label("replicas"),
        tags: ctx.label("tags"),
        quota: ctx.label("quota"),
        inner: ctx.label("inner"),
        enabled: ctx.label("enabled"),
        note: ctx.label("note"),
    };

    let mut inner = Struct::new();
    inner.insert(Arc::new(labels.enabled, Value::Bool(true)));
    inner.insert(Arc::new(labels.note, Value::Null));

    let mut root = Struct::new();
    root.insert(Arc::new(labels.name, Value::Str("checkout".to_string())));
    root.insert(Arc::new(labels.replicas, Value::int(3)));
    root.insert(Arc::new(
        labels.tags,
        Value::List(List::closed(vec![Value::Str("prod".to_string()), Value::Str("east".to_string())])),
    ));
    root.insert(Arc::new(
        labels.quota,
        Value::Bound(Bound::new(BoundOp::LessEqual, BoundOperand::Number(Number::from_i64(10)))),
    ));
    root.insert(Arc::new(labels.inner, Value::Struct(inner)));

    (ctx.nodes.alloc(Value::Struct(root)), labels)
}

#[test]
fn round_trips_a_nested_package_value_through_save_and_load() {
    let mut ctx: Context<NoLimitTracker> = Context::new();
    let (root_id, labels) = build_package(&mut ctx);
    let evaluated = cue_core::evaluate(&mut ctx, root_id, Options::new().final_value());
    assert!(!evaluated.is_bottom());
    let saved_root = ctx.nodes.alloc(evaluated);

    let bytes = ctx.save(saved_root).unwrap();
    let (restored, restored_root) = Context::load(&bytes, NoLimitTracker).unwrap();

    let top = match restored.nodes.get(restored_root) {
        Value::Struct(s) => s,
        other => panic!("expected struct, got {other:?}"),
    };

    assert_eq!(top.arcs.len(), 5);
    assert_eq!(top.get(labels.name).unwrap().value.as_ref(), &Value::Str("checkout".to_string()));
    assert_eq!(top.get(labels.replicas).unwrap().value.as_ref(), &Value::int(3));
    assert_eq!(
        top.get(labels.tags).unwrap().value.as_ref(),
        &Value::List(List::closed(vec![Value::Str("prod".to_string()), Value::Str("east".to_string())]))
    );

    match top.get(labels.quota).unwrap().value.as_ref() {
        Value::Bound(b) => assert_eq!(b.op, BoundOp::LessEqual),
        other => panic!("expected bound, got {other:?}"),
    }

    match top.get(labels.inner).unwrap().value.as_ref() {
        Value::Struct(inner) => {
            assert_eq!(inner.arcs.len(), 2);
            assert_eq!(inner.get(labels.enabled).unwrap().value.as_ref(), &Value::Bool(true));
            assert_eq!(inner.get(labels.note).unwrap().value.as_ref(), &Value::Null);
        }
        other => panic!("expected nested struct, got {other:?}"),
    }
}

#[test]
fn reloading_a_snapshot_preserves_label_flag_bits() {
    let mut ctx: Context<NoLimitTracker> = Context::new();
    let def_label = ctx.interner.label_with_flags("Schema", true, false);
    let mut s = Struct::new();
    s.insert(Arc::new(def_label, Value::BasicType(cue_core::Kind::INT)));
    let root = ctx.nodes.alloc(Value::Struct(s));

    let bytes = ctx.save(root).unwrap();
    let (restored, restored_root) = Context::load(&bytes, NoLimitTracker).unwrap();

    match restored.nodes.get(restored_root) {
        Value::Struct(s) => {
            let arc = s.arcs.values().next().expect("one arc");
            assert!(arc.label.is_definition());
        }
        other => panic!("expected struct, got {other:?}"),
    }
}

#[test]
fn registered_imports_remain_reachable_after_a_round_trip() {
    let mut ctx: Context<NoLimitTracker> = Context::new();
    let k = ctx.label("k");
    let mut pkg = Struct::new();
    pkg.insert(Arc::new(k, Value::int(1)));
    ctx.register_import("example.org/pkg", Value::Struct(pkg));

    let root = ctx.nodes.alloc(Value::Top);
    let bytes = ctx.save(root).unwrap();
    let (restored, _) = Context::load(&bytes, NoLimitTracker).unwrap();

    match restored.lookup_import("example.org/pkg") {
        Some(Value::Struct(s)) => {
            assert_eq!(s.get(k).unwrap().value.as_ref(), &Value::int(1));
        }
        other => panic!("expected a preserved import struct, got {other:?}"),
    }
}
