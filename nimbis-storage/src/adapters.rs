//! Per-type capability adapters used by the sweeper and shared test helpers.
//!
//! Grounded on the duck-typed adaptor pattern from LedisDB's `t_ttl_test.go`
//! (`examples/original_source/src/ledis/t_ttl_test.go`), which drives
//! `Expire`/`TTL` tests across every data type through one small capability
//! set (exists + destroy) rather than one code path per type. This module
//! sits above both the ops modules and `ttl_manager`, so it alone may depend
//! on all four; `ttl_manager` itself stays type-agnostic.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StorageError;
use crate::hash_ops::HashOps;
use crate::kv_ops::KvOps;
use crate::list_ops::ListOps;
use crate::tag::DataKind;
use crate::zset_ops::ZSetOps;

/// The capability set the sweeper needs from a data type: whether a key
/// currently holds it, and how to destroy it (`DEL`/`HCLEAR`/`LCLEAR`/`ZCLEAR`).
#[async_trait]
pub trait TypeAdapter: Send + Sync {
	fn kind(&self) -> DataKind;
	async fn exists(&self, db: u8, key: &Bytes) -> Result<bool, StorageError>;
	async fn destroy(&self, db: u8, key: Bytes) -> Result<(), StorageError>;
}

#[async_trait]
impl TypeAdapter for KvOps {
	fn kind(&self) -> DataKind {
		DataKind::Kv
	}

	async fn exists(&self, db: u8, key: &Bytes) -> Result<bool, StorageError> {
		KvOps::exists(self, db, key).await
	}

	async fn destroy(&self, db: u8, key: Bytes) -> Result<(), StorageError> {
		KvOps::del(self, db, &[key]).await.map(|_| ())
	}
}

#[async_trait]
impl TypeAdapter for HashOps {
	fn kind(&self) -> DataKind {
		DataKind::Hash
	}

	async fn exists(&self, db: u8, key: &Bytes) -> Result<bool, StorageError> {
		Ok(HashOps::hlen(self, db, key).await? > 0)
	}

	async fn destroy(&self, db: u8, key: Bytes) -> Result<(), StorageError> {
		HashOps::hclear(self, db, key).await
	}
}

#[async_trait]
impl TypeAdapter for ListOps {
	fn kind(&self) -> DataKind {
		DataKind::List
	}

	async fn exists(&self, db: u8, key: &Bytes) -> Result<bool, StorageError> {
		Ok(ListOps::llen(self, db, key).await? > 0)
	}

	async fn destroy(&self, db: u8, key: Bytes) -> Result<(), StorageError> {
		ListOps::lclear(self, db, key).await
	}
}

#[async_trait]
impl TypeAdapter for ZSetOps {
	fn kind(&self) -> DataKind {
		DataKind::ZSet
	}

	async fn exists(&self, db: u8, key: &Bytes) -> Result<bool, StorageError> {
		Ok(ZSetOps::zcard(self, db, key).await? > 0)
	}

	async fn destroy(&self, db: u8, key: Bytes) -> Result<(), StorageError> {
		ZSetOps::zclear(self, db, key).await
	}
}

/// Picks the adapter matching `kind` out of the four type operator sets.
pub fn adapter_for(kind: DataKind, kv: &KvOps, hash: &HashOps, list: &ListOps, zset: &ZSetOps) -> &dyn TypeAdapter {
	match kind {
		DataKind::Kv => kv,
		DataKind::Hash => hash,
		DataKind::List => list,
		DataKind::ZSet => zset,
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::*;
	use crate::engine::Engine;
	use crate::lock_manager::LockManager;

	async fn harness() -> (KvOps, HashOps, ListOps, ZSetOps) {
		let dir = tempfile::tempdir().unwrap();
		let engine = Engine::open(dir.into_path()).await.unwrap();
		let locks = Arc::new(LockManager::new());
		(KvOps::new(engine.clone(), locks.clone()), HashOps::new(engine.clone(), locks.clone()), ListOps::new(engine.clone(), locks.clone()), ZSetOps::new(engine, locks))
	}

	#[tokio::test]
	async fn adapter_destroy_clears_each_type() {
		let (kv, hash, list, zset) = harness().await;
		let key = Bytes::from_static(b"k");

		kv.set(0, key.clone(), Bytes::from_static(b"v")).await.unwrap();
		let adapter = adapter_for(DataKind::Kv, &kv, &hash, &list, &zset);
		assert!(adapter.exists(0, &key).await.unwrap());
		adapter.destroy(0, key.clone()).await.unwrap();
		assert!(!adapter.exists(0, &key).await.unwrap());

		hash.hset(0, key.clone(), Bytes::from_static(b"f"), Bytes::new()).await.unwrap();
		let adapter = adapter_for(DataKind::Hash, &kv, &hash, &list, &zset);
		assert!(adapter.exists(0, &key).await.unwrap());
		adapter.destroy(0, key.clone()).await.unwrap();
		assert!(!adapter.exists(0, &key).await.unwrap());

		list.rpush(0, key.clone(), Bytes::new()).await.unwrap();
		let adapter = adapter_for(DataKind::List, &kv, &hash, &list, &zset);
		assert!(adapter.exists(0, &key).await.unwrap());
		adapter.destroy(0, key.clone()).await.unwrap();
		assert!(!adapter.exists(0, &key).await.unwrap());

		zset.zadd(0, key.clone(), Bytes::from_static(b"m"), 1).await.unwrap();
		let adapter = adapter_for(DataKind::ZSet, &kv, &hash, &list, &zset);
		assert!(adapter.exists(0, &key).await.unwrap());
		adapter.destroy(0, key.clone()).await.unwrap();
		assert!(!adapter.exists(0, &key).await.unwrap());
	}
}
