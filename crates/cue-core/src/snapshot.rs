//! Persisted binary snapshot format (spec §6): a one-byte version prefix, gzip compression, and a
//! postcard-encoded payload.
//!
//! Grounded on `crates/ouros/src/session_manager.rs`'s `save_session`/`load_session` pair, which
//! delegates the actual encode/decode to `ReplSession::save()`/`ReplSession::load(bytes, limits)`
//! (in turn a thin wrapper over `postcard::to_allocvec`/`from_bytes`, per `run.rs`'s `Runner::dump`/
//! `load`). Unlike `Runner`, which snapshots itself wholesale, a `Context`'s node arena is keyed by
//! an `Interner` whose reverse-lookup map is deliberately not serialized (see `label.rs`), so
//! loading has to rebuild that map before the restored context is usable for further interning.
//!
//! A fully evaluated value doesn't stand alone as the unit of persistence: a final value may still
//! contain a `Lambda` whose body is an unevaluated `Id<Value>` into the arena (spec §3.6, a
//! function value is itself a legitimate final result), so the snapshot captures the whole
//! `Context` graph -- interner, node arena, and the named import table -- plus a designated root
//! id, rather than trying to serialize one self-contained `Value` tree.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::arena::{Arena, Id};
use crate::context::Context;
use crate::error::Bottom;
use crate::label::Interner;
use crate::resource::ResourceTracker;
use crate::value::Value;

/// Current snapshot format version (spec §6: "the tag byte is the format version; unknown
/// versions are rejected"). Bump when `SnapshotBody`'s wire shape changes incompatibly.
const SNAPSHOT_VERSION: u8 = 1;

/// One named import package captured alongside the root (spec §6: "root instances and their
/// transitive imports ... `{path, files: [{name, bytes}]}`"). This crate only ever sees imports
/// as already-evaluated package values handed back by a host resolver callback (spec §6), not raw
/// source files, so there is no per-file granularity to preserve: one value per import path is the
/// unit this crate's boundary actually deals with.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct ImportEntry {
    path: String,
    value: Value,
}

/// The serialized payload wrapped by the version byte and gzip framing.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct SnapshotBody {
    interner: Interner,
    nodes: Arena<Value>,
    root: Id<Value>,
    imports: Vec<ImportEntry>,
}

impl<T: ResourceTracker> Context<T> {
    /// Serializes `root` and everything reachable from it through this context -- the interned
    /// label table, the full node arena, and the named import table -- to the binary snapshot
    /// format (spec §6).
    ///
    /// # Errors
    ///
    /// Returns a `fatal`-kind `Bottom` if postcard encoding or gzip compression fails.
    pub fn save(&self, root: Id<Value>) -> Result<Vec<u8>, Bottom> {
        let body = SnapshotBody {
            interner: self.interner.clone(),
            nodes: self.nodes.clone(),
            root,
            imports: self
                .imports
                .iter()
                .map(|(path, value)| ImportEntry {
                    path: path.clone(),
                    value: value.clone(),
                })
                .collect(),
        };

        let encoded =
            postcard::to_allocvec(&body).map_err(|e| Bottom::fatal("snapshot encoding failed").with_arg(e.to_string()))?;

        let mut gz = GzEncoder::new(Vec::new(), Compression::default());
        gz.write_all(&encoded)
            .map_err(|e| Bottom::fatal("snapshot compression failed").with_arg(e.to_string()))?;
        let compressed = gz
            .finish()
            .map_err(|e| Bottom::fatal("snapshot compression failed").with_arg(e.to_string()))?;

        let mut out = Vec::with_capacity(compressed.len() + 1);
        out.push(SNAPSHOT_VERSION);
        out.extend_from_slice(&compressed);
        Ok(out)
    }

    /// Deserializes a snapshot produced by [`Context::save`], restoring a fresh context (built
    /// around `tracker`, which is not itself part of the persisted state -- resource limits are
    /// reapplied by the host the same way `load_session` takes `resource_limits` as a separate
    /// argument from the saved bytes) and the root id within it.
    ///
    /// # Errors
    ///
    /// Returns a `fatal`-kind `Bottom` if the buffer is empty, the version byte is unrecognised,
    /// or gzip/postcard decoding fails.
    pub fn load(bytes: &[u8], tracker: T) -> Result<(Self, Id<Value>), Bottom> {
        let (version, compressed) = bytes.split_first().ok_or_else(|| Bottom::fatal("snapshot buffer is empty"))?;
        if *version != SNAPSHOT_VERSION {
            return Err(Bottom::fatal("unsupported snapshot version").with_arg(i64::from(*version)));
        }

        let mut gz = GzDecoder::new(compressed);
        let mut encoded = Vec::new();
        gz.read_to_end(&mut encoded)
            .map_err(|e| Bottom::fatal("snapshot decompression failed").with_arg(e.to_string()))?;

        let body: SnapshotBody =
            postcard::from_bytes(&encoded).map_err(|e| Bottom::fatal("snapshot decoding failed").with_arg(e.to_string()))?;

        let mut interner = body.interner;
        interner.rebuild_lookup();

        let mut ctx = Self::with_tracker(tracker);
        ctx.interner = interner;
        ctx.nodes = body.nodes;
        ctx.imports = body.imports.into_iter().map(|e| (e.path, e.value)).collect();

        Ok((ctx, body.root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::NoLimitTracker;

    #[test]
    fn round_trips_a_struct_through_save_and_load() {
        let mut ctx: Context<NoLimitTracker> = Context::new();
        let x = ctx.label("x");
        let mut s = crate::structure::Struct::new();
        s.insert(crate::structure::Arc::new(x, Value::int(42)));
        let root = ctx.nodes.alloc(Value::Struct(s));

        let bytes = ctx.save(root).unwrap();
        let (restored, restored_root) = Context::load(&bytes, NoLimitTracker).unwrap();

        match restored.nodes.get(restored_root) {
            Value::Struct(s) => {
                let label = restored.interner.str(x) == "x";
                assert!(label);
                let arc = s.arcs.values().next().expect("one arc");
                assert_eq!(arc.value.as_ref(), &Value::int(42));
            }
            other => panic!("expected struct, got {other:?}"),
        }
    }

    #[test]
    fn rejects_an_unrecognised_version_byte() {
        let bytes = vec![255, 0, 0, 0];
        let err = Context::<NoLimitTracker>::load(&bytes, NoLimitTracker).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::Fatal);
    }

    #[test]
    fn rejects_an_empty_buffer() {
        let err = Context::<NoLimitTracker>::load(&[], NoLimitTracker).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::Fatal);
    }

    #[test]
    fn preserves_imports_across_a_round_trip() {
        let mut ctx: Context<NoLimitTracker> = Context::new();
        ctx.register_import("math", Value::int(7));
        let root = ctx.nodes.alloc(Value::Null);

        let bytes = ctx.save(root).unwrap();
        let (restored, _) = Context::load(&bytes, NoLimitTracker).unwrap();
        assert_eq!(restored.lookup_import("math"), Some(&Value::int(7)));
    }
}
