use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use cue_core::{Arc, Context, Disjunction, NoLimitTracker, Number, Options, Struct, Value};

/// Two open structs of `width` fields each, half the fields overlapping so the merge actually
/// does unification work on every shared arc instead of a pure set union.
fn struct_pair(width: usize) -> (Context<NoLimitTracker>, Value, Value) {
    let mut ctx = Context::new();
    let mut a = Struct::new();
    let mut b = Struct::new();
    for i in 0..width {
        let label = ctx.label(&format!("f{i}"));
        a.insert(Arc::new(label, Value::int(i as i64)));
        if i % 2 == 0 {
            b.insert(Arc::new(label, Value::int(i as i64)));
        } else {
            b.insert(Arc::new(label, Value::Top));
        }
    }
    (ctx, Value::Struct(a), Value::Struct(b))
}

fn bench_struct_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("struct_merge");
    for width in [8usize, 32, 128] {
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |bencher, &width| {
            let (mut ctx, a, b) = struct_pair(width);
            bencher.iter(|| black_box(cue_core::unify_values(&mut ctx, black_box(&a), black_box(&b))));
        });
    }
    group.finish();
}

/// A chain of `depth` nested single-field structs, the shape `eval_struct`'s per-level depth
/// check and forwarding-frame push/pop has to walk through on every evaluation.
fn nested_struct(ctx: &mut Context<NoLimitTracker>, depth: usize) -> cue_core::Id<Value> {
    let label = ctx.label("inner");
    let mut v = Value::int(1);
    for _ in 0..depth {
        let mut s = Struct::new();
        s.insert(Arc::new(label, v));
        v = Value::Struct(s);
    }
    ctx.nodes.alloc(v)
}

fn bench_nested_eval(c: &mut Criterion) {
    let mut group = c.benchmark_group("nested_struct_eval");
    for depth in [4usize, 16, 64] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |bencher, &depth| {
            bencher.iter_batched(
                || {
                    let mut ctx = Context::new();
                    let id = nested_struct(&mut ctx, depth);
                    (ctx, id)
                },
                |(mut ctx, id)| black_box(cue_core::evaluate(&mut ctx, id, Options::new().final_value())),
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

/// Unifying two disjunctions forces `Disjunction::distribute`'s cartesian product, the
/// quadratic-in-width hot path for `|`-heavy schemas.
fn disjunction_pair(width: usize) -> (Value, Value) {
    let a = Disjunction::new((0..width as i64).map(|i| (Value::Num(Number::from_i64(i)), i == 0)).collect());
    let b = Disjunction::new((0..width as i64).map(|i| (Value::Num(Number::from_i64(i * 2)), i == 0)).collect());
    (Value::Disjunction(a), Value::Disjunction(b))
}

fn bench_disjunction_distribute(c: &mut Criterion) {
    let mut group = c.benchmark_group("disjunction_distribute");
    for width in [4usize, 8, 16] {
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |bencher, &width| {
            let mut ctx: Context<NoLimitTracker> = Context::new();
            let (a, b) = disjunction_pair(width);
            bencher.iter(|| black_box(cue_core::unify_values(&mut ctx, black_box(&a), black_box(&b))));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_struct_merge, bench_nested_eval, bench_disjunction_distribute);
criterion_main!(benches);
