//! Ordered key-value engine encodings, type operators, and TTL subsystem
//! behind the data server's command layer (§2).
//!
//! `codec` and `range` are the pure data-model layer (§4.1–4.2); `engine`
//! and `lock_manager` adapt the storage collaborator and its concurrency
//! primitives (§5); `typecheck` and `ttl_manager` are the cross-cutting
//! subsystems every type operator composes; `kv_ops`/`hash_ops`/`list_ops`/
//! `zset_ops` are the four type operators (§4.3); `adapters` gives the
//! sweeper a uniform view across them; `db` is the façade (§4.5) tying it
//! all together.

pub mod adapters;
pub mod codec;
pub mod db;
pub mod engine;
pub mod error;
pub mod hash_ops;
pub mod kv_ops;
pub mod list_ops;
pub mod lock_manager;
pub mod range;
pub mod tag;
pub mod ttl_manager;
pub mod typecheck;
pub mod zset_ops;

pub use db::Db;
pub use db::Sweeper;
pub use engine::Engine;
pub use error::StorageError;
pub use hash_ops::HashOps;
pub use kv_ops::KvOps;
pub use list_ops::ListOps;
pub use tag::DataKind;
pub use zset_ops::{ScoreRange, ZSetOps};
