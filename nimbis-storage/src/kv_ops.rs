//! KV operators (§4.3.1): `GET, SET, SETNX, GETSET, MGET, MSET, DEL, EXISTS,
//! INCR, DECR, INCRBY, DECRBY, EXPIRE, EXPIREAT, TTL, PERSIST`.

use std::sync::Arc;

use bytes::Bytes;
use slatedb::WriteBatch;
use slatedb::config::PutOptions;

use crate::codec::kv::KvKey;
use crate::engine::Engine;
use crate::error::StorageError;
use crate::lock_manager::LockManager;
use crate::tag::DataKind;
use crate::ttl_manager;
use crate::typecheck;

pub struct KvOps {
	engine: Engine,
	locks: Arc<LockManager>,
}

fn lock_token(db: u8, user_key: &Bytes) -> Bytes {
	let mut token = Vec::with_capacity(1 + user_key.len());
	token.push(db);
	token.extend_from_slice(user_key);
	Bytes::from(token)
}

fn parse_int(value: &[u8]) -> Result<i64, StorageError> {
	std::str::from_utf8(value).ok().and_then(|s| s.parse::<i64>().ok()).ok_or(StorageError::ValueNotInt)
}

impl KvOps {
	pub fn new(engine: Engine, locks: Arc<LockManager>) -> Self {
		Self { engine, locks }
	}

	pub async fn get(&self, db: u8, key: &Bytes) -> Result<Option<Bytes>, StorageError> {
		typecheck::ensure_kind(&self.engine, db, key, DataKind::Kv).await?;
		self.engine.get(&KvKey::new(db, key.clone())?.encode()).await.map_err(Into::into)
	}

	pub async fn set(&self, db: u8, key: Bytes, value: Bytes) -> Result<(), StorageError> {
		let _guard = self.locks.lock(&lock_token(db, &key)).await;
		typecheck::ensure_kind(&self.engine, db, &key, DataKind::Kv).await?;
		self.write_value(db, &key, value).await
	}

	pub async fn setnx(&self, db: u8, key: Bytes, value: Bytes) -> Result<i64, StorageError> {
		let _guard = self.locks.lock(&lock_token(db, &key)).await;
		typecheck::ensure_kind(&self.engine, db, &key, DataKind::Kv).await?;
		if self.engine.get(&KvKey::new(db, key.clone())?.encode()).await?.is_some() {
			return Ok(0);
		}
		self.write_value(db, &key, value).await?;
		Ok(1)
	}

	pub async fn getset(&self, db: u8, key: Bytes, value: Bytes) -> Result<Option<Bytes>, StorageError> {
		let _guard = self.locks.lock(&lock_token(db, &key)).await;
		typecheck::ensure_kind(&self.engine, db, &key, DataKind::Kv).await?;
		let old = self.engine.get(&KvKey::new(db, key.clone())?.encode()).await?;
		self.write_value(db, &key, value).await?;
		Ok(old)
	}

	/// Writes `value` and clears any pending TTL in one batch (SET resets TTL).
	async fn write_value(&self, db: u8, key: &Bytes, value: Bytes) -> Result<(), StorageError> {
		let old_deadline = ttl_manager::current_deadline(&self.engine, db, DataKind::Kv, key).await?;
		let mut batch = WriteBatch::new();
		batch.put_with_options(KvKey::new(db, key.clone())?.encode(), value, &PutOptions::default());
		ttl_manager::clear_deadline_in_batch(&mut batch, db, DataKind::Kv, key, old_deadline)?;
		self.engine.write(batch).await?;
		Ok(())
	}

	/// `MGET`: wrong-typed or absent keys come back as `None`, matching
	/// Redis's behavior of never failing a multi-get on a single bad key.
	///
	/// Known deviation from §4.3/§5 (documented in DESIGN.md): each key is
	/// read through an independent `engine.get`, not a single point-in-time
	/// view, because `Engine` (see `engine.rs`) exposes no snapshot/read-view
	/// handle over the pinned `slatedb` surface — only point get/put/delete
	/// and a materialized range scan. A writer committing between two of
	/// this loop's reads can therefore produce a torn view across keys.
	pub async fn mget(&self, db: u8, keys: &[Bytes]) -> Result<Vec<Option<Bytes>>, StorageError> {
		let mut out = Vec::with_capacity(keys.len());
		for key in keys {
			if typecheck::ensure_kind(&self.engine, db, key, DataKind::Kv).await.is_err() {
				out.push(None);
				continue;
			}
			out.push(self.engine.get(&KvKey::new(db, key.clone())?.encode()).await?);
		}
		Ok(out)
	}

	pub async fn mset(&self, db: u8, pairs: Vec<(Bytes, Bytes)>) -> Result<(), StorageError> {
		let tokens: Vec<Bytes> = pairs.iter().map(|(k, _)| lock_token(db, k)).collect();
		let _guard = self.locks.multi_lock(&tokens).await;

		for (key, _) in &pairs {
			typecheck::ensure_kind(&self.engine, db, key, DataKind::Kv).await?;
		}

		let mut batch = WriteBatch::new();
		for (key, value) in pairs {
			let old_deadline = ttl_manager::current_deadline(&self.engine, db, DataKind::Kv, &key).await?;
			batch.put_with_options(KvKey::new(db, key.clone())?.encode(), value, &PutOptions::default());
			ttl_manager::clear_deadline_in_batch(&mut batch, db, DataKind::Kv, &key, old_deadline)?;
		}
		self.engine.write(batch).await?;
		Ok(())
	}

	/// `DEL`: scoped to the KV tag namespace; a key holding another type has
	/// no KV record and is simply not deleted (returns 0 for it).
	pub async fn del(&self, db: u8, keys: &[Bytes]) -> Result<i64, StorageError> {
		let mut deleted = 0;
		for key in keys {
			let _guard = self.locks.lock(&lock_token(db, key)).await;
			let encoded = KvKey::new(db, key.clone())?.encode();
			if self.engine.get(&encoded).await?.is_none() {
				continue;
			}
			let old_deadline = ttl_manager::current_deadline(&self.engine, db, DataKind::Kv, key).await?;
			let mut batch = WriteBatch::new();
			batch.delete(encoded);
			ttl_manager::clear_deadline_in_batch(&mut batch, db, DataKind::Kv, key, old_deadline)?;
			self.engine.write(batch).await?;
			deleted += 1;
		}
		Ok(deleted)
	}

	pub async fn exists(&self, db: u8, key: &Bytes) -> Result<bool, StorageError> {
		Ok(self.engine.get(&KvKey::new(db, key.clone())?.encode()).await?.is_some())
	}

	pub async fn incr(&self, db: u8, key: Bytes) -> Result<i64, StorageError> {
		self.incrby(db, key, 1).await
	}

	pub async fn decr(&self, db: u8, key: Bytes) -> Result<i64, StorageError> {
		self.incrby(db, key, -1).await
	}

	pub async fn incrby(&self, db: u8, key: Bytes, delta: i64) -> Result<i64, StorageError> {
		let _guard = self.locks.lock(&lock_token(db, &key)).await;
		typecheck::ensure_kind(&self.engine, db, &key, DataKind::Kv).await?;

		let encoded = KvKey::new(db, key.clone())?.encode();
		let current = match self.engine.get(&encoded).await? {
			Some(bytes) => parse_int(&bytes)?,
			None => 0,
		};
		let next = current.checked_add(delta).ok_or(StorageError::Overflow)?;

		// INCR preserves an existing TTL (unlike SET), so the TTL records are
		// left untouched here.
		let mut batch = WriteBatch::new();
		batch.put_with_options(encoded, Bytes::from(next.to_string()), &PutOptions::default());
		self.engine.write(batch).await?;
		Ok(next)
	}

	pub async fn decrby(&self, db: u8, key: Bytes, delta: i64) -> Result<i64, StorageError> {
		let negated = delta.checked_neg().ok_or(StorageError::Overflow)?;
		self.incrby(db, key, negated).await
	}

	pub async fn expire(&self, db: u8, key: &Bytes, seconds: i64) -> Result<i64, StorageError> {
		let exists = self.exists(db, key).await?;
		ttl_manager::expire(&self.engine, db, DataKind::Kv, key, seconds, exists).await
	}

	pub async fn expire_at(&self, db: u8, key: &Bytes, epoch_seconds: i64) -> Result<i64, StorageError> {
		let exists = self.exists(db, key).await?;
		ttl_manager::expire_at(&self.engine, db, DataKind::Kv, key, epoch_seconds, exists).await
	}

	pub async fn ttl(&self, db: u8, key: &Bytes) -> Result<i64, StorageError> {
		let exists = self.exists(db, key).await?;
		ttl_manager::ttl(&self.engine, db, DataKind::Kv, key, exists).await
	}

	pub async fn persist(&self, db: u8, key: &Bytes) -> Result<i64, StorageError> {
		ttl_manager::persist(&self.engine, db, DataKind::Kv, key).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	async fn ops() -> KvOps {
		let dir = tempfile::tempdir().unwrap();
		let engine = Engine::open(dir.into_path()).await.unwrap();
		KvOps::new(engine, Arc::new(LockManager::new()))
	}

	#[tokio::test]
	async fn set_then_get() {
		let ops = ops().await;
		let key = Bytes::from_static(b"a");
		ops.set(0, key.clone(), Bytes::from_static(b"1234")).await.unwrap();
		assert_eq!(ops.get(0, &key).await.unwrap(), Some(Bytes::from_static(b"1234")));
	}

	#[tokio::test]
	async fn setnx_then_getset() {
		let ops = ops().await;
		let key = Bytes::from_static(b"a");
		ops.set(0, key.clone(), Bytes::from_static(b"1234")).await.unwrap();
		assert_eq!(ops.setnx(0, key.clone(), Bytes::from_static(b"123")).await.unwrap(), 0);
		assert_eq!(ops.getset(0, key.clone(), Bytes::from_static(b"123")).await.unwrap(), Some(Bytes::from_static(b"1234")));
		assert_eq!(ops.get(0, &key).await.unwrap(), Some(Bytes::from_static(b"123")));
	}

	#[tokio::test]
	async fn del_and_exists() {
		let ops = ops().await;
		let a = Bytes::from_static(b"a");
		let b = Bytes::from_static(b"b");
		ops.set(0, a.clone(), Bytes::from_static(b"1")).await.unwrap();
		assert_eq!(ops.del(0, &[a.clone(), b.clone()]).await.unwrap(), 1);
		assert!(!ops.exists(0, &a).await.unwrap());
	}

	#[tokio::test]
	async fn mset_then_mget_with_missing() {
		let ops = ops().await;
		let a = Bytes::from_static(b"a");
		let b = Bytes::from_static(b"b");
		let c = Bytes::from_static(b"c");
		ops.mset(0, vec![(a.clone(), Bytes::from_static(b"1")), (b.clone(), Bytes::from_static(b"2"))]).await.unwrap();
		let got = ops.mget(0, &[a, b, c]).await.unwrap();
		assert_eq!(got, vec![Some(Bytes::from_static(b"1")), Some(Bytes::from_static(b"2")), None]);
	}

	#[tokio::test]
	async fn incr_decr_family() {
		let ops = ops().await;
		let n = Bytes::from_static(b"n");
		assert_eq!(ops.incr(0, n.clone()).await.unwrap(), 1);
		assert_eq!(ops.incr(0, n.clone()).await.unwrap(), 2);
		assert_eq!(ops.decr(0, n.clone()).await.unwrap(), 1);
		assert_eq!(ops.incrby(0, n.clone(), 10).await.unwrap(), 11);
		assert_eq!(ops.decrby(0, n.clone(), 10).await.unwrap(), 1);
	}

	#[tokio::test]
	async fn incr_on_non_integer_fails() {
		let ops = ops().await;
		let key = Bytes::from_static(b"k");
		ops.set(0, key.clone(), Bytes::from_static(b"abc")).await.unwrap();
		assert!(matches!(ops.incr(0, key).await, Err(StorageError::ValueNotInt)));
	}

	#[tokio::test]
	async fn incr_overflow_is_rejected() {
		let ops = ops().await;
		let key = Bytes::from_static(b"k");
		ops.set(0, key.clone(), Bytes::from(i64::MAX.to_string())).await.unwrap();
		assert!(matches!(ops.incr(0, key).await, Err(StorageError::Overflow)));
	}

	#[tokio::test]
	async fn expire_ttl_persist_compose() {
		let ops = ops().await;
		let key = Bytes::from_static(b"k");
		ops.set(0, key.clone(), Bytes::from_static(b"1")).await.unwrap();
		assert_eq!(ops.expire(0, &key, 2).await.unwrap(), 1);
		let remaining = ops.ttl(0, &key).await.unwrap();
		assert!(remaining == 1 || remaining == 2);
		assert_eq!(ops.persist(0, &key).await.unwrap(), 1);
		assert_eq!(ops.ttl(0, &key).await.unwrap(), -1);
	}

	#[tokio::test]
	async fn expire_zero_or_negative_is_rejected() {
		let ops = ops().await;
		let key = Bytes::from_static(b"k");
		ops.set(0, key.clone(), Bytes::from_static(b"1")).await.unwrap();
		assert!(matches!(ops.expire(0, &key, 0).await, Err(StorageError::ExpireValue)));
		assert!(matches!(ops.expire(0, &key, -1).await, Err(StorageError::ExpireValue)));
	}
}
