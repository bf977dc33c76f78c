//! Unified TTL primitives shared by all four types (§4.4).
//!
//! This module only knows about the two TTL records themselves
//! (`ExpMeta`/`ExpTime`) and the engine; it has no notion of hashes, lists,
//! or sorted sets. Each type operator calls these functions with its own
//! [`DataKind`] to implement its `EXPIRE`/`TTL`/`PERSIST` family, and
//! composes the TTL mutation into its own write batch when the TTL change
//! rides along with a data mutation (e.g. `HCLEAR` clearing a pending TTL).

use bytes::Bytes;
use slatedb::WriteBatch;
use slatedb::config::PutOptions;

use crate::codec::ttl::ExpMetaKey;
use crate::codec::ttl::ExpMetaValue;
use crate::codec::ttl::ExpTimeKey;
use crate::engine::Engine;
use crate::error::StorageError;
use crate::tag::DataKind;

fn now_epoch_secs() -> u64 {
	chrono::Utc::now().timestamp().max(0) as u64
}

/// Reads the current deadline for `(kind, user_key)`, if any.
pub async fn current_deadline(engine: &Engine, db: u8, kind: DataKind, user_key: &Bytes) -> Result<Option<u64>, StorageError> {
	let meta_key = ExpMetaKey::new(db, kind, user_key.clone())?;
	match engine.get(&meta_key.encode()).await? {
		Some(bytes) => Ok(Some(ExpMetaValue::decode(&bytes)?.0)),
		None => Ok(None),
	}
}

/// Appends the mutations to move `(kind, user_key)`'s deadline from
/// `old_deadline` to `new_deadline` into `batch`. Both records are rewritten
/// atomically with whatever else is in the batch.
pub fn set_deadline_in_batch(batch: &mut WriteBatch, db: u8, kind: DataKind, user_key: &Bytes, old_deadline: Option<u64>, new_deadline: u64) -> Result<(), StorageError> {
	if let Some(old) = old_deadline {
		batch.delete(ExpTimeKey::new(db, old, kind, user_key.clone())?.encode());
	}
	let meta_key = ExpMetaKey::new(db, kind, user_key.clone())?;
	batch.put_with_options(meta_key.encode(), ExpMetaValue(new_deadline).encode(), &PutOptions::default());
	batch.put_with_options(ExpTimeKey::new(db, new_deadline, kind, user_key.clone())?.encode(), Bytes::new(), &PutOptions::default());
	Ok(())
}

/// Appends the mutations to remove `(kind, user_key)`'s TTL, if it has one,
/// into `batch`.
pub fn clear_deadline_in_batch(batch: &mut WriteBatch, db: u8, kind: DataKind, user_key: &Bytes, old_deadline: Option<u64>) -> Result<(), StorageError> {
	if let Some(old) = old_deadline {
		batch.delete(ExpMetaKey::new(db, kind, user_key.clone())?.encode());
		batch.delete(ExpTimeKey::new(db, old, kind, user_key.clone())?.encode());
	}
	Ok(())
}

/// `EXPIRE(type, userKey, seconds)`. `exists` must reflect whether the
/// logical key currently holds data of this kind (checked by the caller,
/// which already needs that answer to run its own operator).
pub async fn expire(engine: &Engine, db: u8, kind: DataKind, user_key: &Bytes, seconds: i64, exists: bool) -> Result<i64, StorageError> {
	if seconds <= 0 {
		return Err(StorageError::ExpireValue);
	}
	expire_at(engine, db, kind, user_key, now_epoch_secs() as i64 + seconds, exists).await
}

/// `EXPIREAT(type, userKey, epochSeconds)`.
pub async fn expire_at(engine: &Engine, db: u8, kind: DataKind, user_key: &Bytes, epoch_seconds: i64, exists: bool) -> Result<i64, StorageError> {
	if epoch_seconds <= now_epoch_secs() as i64 {
		return Err(StorageError::ExpireValue);
	}
	if !exists {
		return Ok(0);
	}
	let old = current_deadline(engine, db, kind, user_key).await?;
	let mut batch = WriteBatch::new();
	set_deadline_in_batch(&mut batch, db, kind, user_key, old, epoch_seconds as u64)?;
	engine.write(batch).await?;
	Ok(1)
}

/// `TTL(type, userKey)`. Returns `-1` if the key does not exist or has no
/// TTL; the two cases are indistinguishable here, matching §4.4.
pub async fn ttl(engine: &Engine, db: u8, kind: DataKind, user_key: &Bytes, exists: bool) -> Result<i64, StorageError> {
	if !exists {
		return Ok(-1);
	}
	match current_deadline(engine, db, kind, user_key).await? {
		Some(deadline) => Ok((deadline as i64 - now_epoch_secs() as i64).max(0)),
		None => Ok(-1),
	}
}

/// `PERSIST(type, userKey)`. Returns 1 if a TTL was removed, 0 otherwise.
pub async fn persist(engine: &Engine, db: u8, kind: DataKind, user_key: &Bytes) -> Result<i64, StorageError> {
	let Some(old) = current_deadline(engine, db, kind, user_key).await? else {
		return Ok(0);
	};
	let mut batch = WriteBatch::new();
	clear_deadline_in_batch(&mut batch, db, kind, user_key, Some(old))?;
	engine.write(batch).await?;
	Ok(1)
}

#[cfg(test)]
mod tests {
	use super::*;

	async fn test_engine() -> Engine {
		let dir = tempfile::tempdir().unwrap();
		Engine::open(dir.into_path()).await.unwrap()
	}

	#[tokio::test]
	async fn expire_rejects_non_positive_seconds() {
		let engine = test_engine().await;
		let key = Bytes::from_static(b"k");
		assert!(matches!(expire(&engine, 0, DataKind::Kv, &key, 0, true).await, Err(StorageError::ExpireValue)));
		assert!(matches!(expire(&engine, 0, DataKind::Kv, &key, -1, true).await, Err(StorageError::ExpireValue)));
	}

	#[tokio::test]
	async fn expire_on_absent_key_returns_zero() {
		let engine = test_engine().await;
		let key = Bytes::from_static(b"k");
		assert_eq!(expire(&engine, 0, DataKind::Kv, &key, 10, false).await.unwrap(), 0);
	}

	#[tokio::test]
	async fn round_trip_expire_ttl_persist() {
		let engine = test_engine().await;
		let key = Bytes::from_static(b"k");

		assert_eq!(expire(&engine, 0, DataKind::Kv, &key, 100, true).await.unwrap(), 1);
		let remaining = ttl(&engine, 0, DataKind::Kv, &key, true).await.unwrap();
		assert!(remaining > 90 && remaining <= 100);

		assert_eq!(persist(&engine, 0, DataKind::Kv, &key).await.unwrap(), 1);
		assert_eq!(ttl(&engine, 0, DataKind::Kv, &key, true).await.unwrap(), -1);
		assert_eq!(persist(&engine, 0, DataKind::Kv, &key).await.unwrap(), 0);
	}

	#[tokio::test]
	async fn ttl_on_nonexistent_key_is_negative_one() {
		let engine = test_engine().await;
		let key = Bytes::from_static(b"missing");
		assert_eq!(ttl(&engine, 0, DataKind::Kv, &key, false).await.unwrap(), -1);
	}
}
