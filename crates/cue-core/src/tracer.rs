//! Evaluation tracing (spec §10.2 ambient observability).
//!
//! Grounded on `crates/ouros/src/tracer.rs`'s `VmTracer` trait family: default no-op methods with
//! monomorphization giving `NoopTracer` zero overhead, a `StderrTracer` for human debugging, and a
//! `RecordingTracer` for deterministic post-mortem replay. Hook names are CUE-specific
//! (`on_unify`, `on_struct_expand`, `on_cycle_detected`, ...) in place of the teacher's
//! bytecode-dispatch events; `ProfilingTracer`/`CoverageTracer` are dropped since there is no
//! opcode stream here to profile or cover.

/// Trace event emitted during evaluation, recorded by `RecordingTracer` for replay/debugging.
#[derive(Debug, Clone)]
pub enum TraceEvent {
    Unify { depth: usize },
    StructExpand { arc_count: usize },
    CycleDetected { generation: u64 },
    DisjunctionNormalize { before: usize, after: usize },
}

/// Hook points an embedder can observe during evaluation (spec §10.2).
pub trait Tracer: std::fmt::Debug {
    fn on_unify(&mut self, _depth: usize) {}
    fn on_struct_expand(&mut self, _arc_count: usize) {}
    fn on_cycle_detected(&mut self, _generation: u64) {}
    fn on_disjunction_normalize(&mut self, _before: usize, _after: usize) {}
}

/// Zero-cost default (spec §10.2: "production default").
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {}

/// Human-readable trace to stderr, for interactive debugging of unification order.
#[derive(Debug, Default)]
pub struct StderrTracer {
    indent: usize,
}

impl Tracer for StderrTracer {
    fn on_unify(&mut self, depth: usize) {
        self.indent = depth;
        eprintln!("{}unify at depth {depth}", "  ".repeat(depth));
    }

    fn on_struct_expand(&mut self, arc_count: usize) {
        eprintln!("{}expand struct ({arc_count} arcs)", "  ".repeat(self.indent));
    }

    fn on_cycle_detected(&mut self, generation: u64) {
        eprintln!("{}cycle detected (generation {generation})", "  ".repeat(self.indent));
    }

    fn on_disjunction_normalize(&mut self, before: usize, after: usize) {
        eprintln!("{}disjunction normalize: {before} -> {after}", "  ".repeat(self.indent));
    }
}

/// Full event recording for deterministic replay or post-mortem analysis.
#[derive(Debug, Default)]
pub struct RecordingTracer {
    pub events: Vec<TraceEvent>,
}

impl Tracer for RecordingTracer {
    fn on_unify(&mut self, depth: usize) {
        self.events.push(TraceEvent::Unify { depth });
    }

    fn on_struct_expand(&mut self, arc_count: usize) {
        self.events.push(TraceEvent::StructExpand { arc_count });
    }

    fn on_cycle_detected(&mut self, generation: u64) {
        self.events.push(TraceEvent::CycleDetected { generation });
    }

    fn on_disjunction_normalize(&mut self, before: usize, after: usize) {
        self.events.push(TraceEvent::DisjunctionNormalize { before, after });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_tracer_captures_events_in_order() {
        let mut t = RecordingTracer::default();
        t.on_unify(0);
        t.on_struct_expand(3);
        assert_eq!(t.events.len(), 2);
        assert!(matches!(t.events[0], TraceEvent::Unify { depth: 0 }));
    }

    #[test]
    fn noop_tracer_accepts_all_hooks_without_panicking() {
        let mut t = NoopTracer;
        t.on_unify(5);
        t.on_cycle_detected(1);
    }
}
