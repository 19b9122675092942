//! Resource limits on evaluation (spec §5 supplemental, §10.3): caps on evaluation depth,
//! unification steps, and disjunction fan-out, so a host embedding this crate on untrusted CUE
//! source can bound worst-case work the same way the spec's concurrency section describes
//! cancellation as host-driven rather than internal.
//!
//! Grounded on `crates/ouros/src/resource.rs`'s `ResourceLimits` builder and
//! `ResourceTracker`/`NoLimitTracker`/`LimitedTracker` family, trimmed to the three counters a CUE
//! evaluation actually needs (no allocation/memory/GC tracking — this crate has no heap of its
//! own to instrument, see `arena.rs`) and with time-based limits dropped since evaluation here is
//! synchronous and has no REPL-style "step" boundary to check a deadline at.

use std::fmt;

/// Error returned when a configured limit is exceeded during evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceError {
    EvalDepth { limit: usize, depth: usize },
    UnifyStep { limit: usize, count: usize },
    DisjunctionElements { limit: usize, count: usize },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EvalDepth { limit, depth } => write!(f, "max evaluation depth exceeded: {depth} > {limit}"),
            Self::UnifyStep { limit, count } => write!(f, "max unification steps exceeded: {count} > {limit}"),
            Self::DisjunctionElements { limit, count } => {
                write!(f, "max disjunction elements exceeded: {count} > {limit}")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

/// Builder for resource limits, mirroring the teacher's `ResourceLimits::new().max_x(n)` chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceLimits {
    max_eval_depth: Option<usize>,
    max_unify_steps: Option<usize>,
    max_disjunction_elements: Option<usize>,
}

impl ResourceLimits {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn max_eval_depth(mut self, limit: usize) -> Self {
        self.max_eval_depth = Some(limit);
        self
    }

    #[must_use]
    pub fn max_unify_steps(mut self, limit: usize) -> Self {
        self.max_unify_steps = Some(limit);
        self
    }

    #[must_use]
    pub fn max_disjunction_elements(mut self, limit: usize) -> Self {
        self.max_disjunction_elements = Some(limit);
        self
    }
}

pub trait ResourceTracker: fmt::Debug {
    fn check_eval_depth(&self, depth: usize) -> Result<(), ResourceError>;
    fn on_unify_step(&mut self) -> Result<(), ResourceError>;
    fn check_disjunction_elements(&self, count: usize) -> Result<(), ResourceError>;
}

/// A tracker that never rejects — the default for programmatic embedders who trust their own
/// CUE source (spec §5: resource limiting is a supplemental, opt-in concern).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLimitTracker;

impl ResourceTracker for NoLimitTracker {
    fn check_eval_depth(&self, _depth: usize) -> Result<(), ResourceError> {
        Ok(())
    }
    fn on_unify_step(&mut self) -> Result<(), ResourceError> {
        Ok(())
    }
    fn check_disjunction_elements(&self, _count: usize) -> Result<(), ResourceError> {
        Ok(())
    }
}

/// A tracker enforcing the configured `ResourceLimits`.
#[derive(Debug)]
pub struct LimitedTracker {
    limits: ResourceLimits,
    unify_steps: usize,
}

impl LimitedTracker {
    #[must_use]
    pub fn new(limits: ResourceLimits) -> Self {
        Self { limits, unify_steps: 0 }
    }

    #[must_use]
    pub fn unify_steps(&self) -> usize {
        self.unify_steps
    }
}

impl ResourceTracker for LimitedTracker {
    fn check_eval_depth(&self, depth: usize) -> Result<(), ResourceError> {
        match self.limits.max_eval_depth {
            Some(limit) if depth > limit => Err(ResourceError::EvalDepth { limit, depth }),
            _ => Ok(()),
        }
    }

    fn on_unify_step(&mut self) -> Result<(), ResourceError> {
        self.unify_steps += 1;
        match self.limits.max_unify_steps {
            Some(limit) if self.unify_steps > limit => Err(ResourceError::UnifyStep {
                limit,
                count: self.unify_steps,
            }),
            _ => Ok(()),
        }
    }

    fn check_disjunction_elements(&self, count: usize) -> Result<(), ResourceError> {
        match self.limits.max_disjunction_elements {
            Some(limit) if count > limit => Err(ResourceError::DisjunctionElements { limit, count }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_limit_tracker_never_rejects() {
        let t = NoLimitTracker;
        assert!(t.check_eval_depth(1_000_000).is_ok());
    }

    #[test]
    fn limited_tracker_rejects_past_configured_depth() {
        let t = LimitedTracker::new(ResourceLimits::new().max_eval_depth(10));
        assert!(t.check_eval_depth(10).is_ok());
        assert!(t.check_eval_depth(11).is_err());
    }

    #[test]
    fn limited_tracker_counts_unify_steps() {
        let mut t = LimitedTracker::new(ResourceLimits::new().max_unify_steps(2));
        assert!(t.on_unify_step().is_ok());
        assert!(t.on_unify_step().is_ok());
        assert!(t.on_unify_step().is_err());
    }
}
