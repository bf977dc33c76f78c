//! Hash operators (§4.3.2): `HSET, HGET, HMSET, HMGET, HDEL, HEXISTS, HLEN,
//! HINCRBY, HKEYS, HVALUES, HGETALL, HCLEAR, HSCAN, HEXPIRE/HTTL/HPERSIST`.

use std::sync::Arc;

use bytes::Bytes;
use slatedb::WriteBatch;
use slatedb::config::PutOptions;

use crate::codec::hash::HashFieldKey;
use crate::codec::hash::HashSizeKey;
use crate::codec::hash::HashSizeValue;
use crate::engine::Engine;
use crate::engine::prefix_upper_bound;
use crate::error::StorageError;
use crate::lock_manager::LockManager;
use crate::range::Direction;
use crate::range::Limit;
use crate::range::Range;
use crate::range::RangeLimitIterator;
use crate::range::RangeType;
use crate::tag::DataKind;
use crate::ttl_manager;
use crate::typecheck;

/// Default chunk size for `HCLEAR`'s batched range delete (§4.3.2).
const DEFAULT_CLEAR_BATCH_SIZE: usize = 1024;

pub struct HashOps {
	engine: Engine,
	locks: Arc<LockManager>,
	clear_batch_size: usize,
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

impl HashOps {
	pub fn new(engine: Engine, locks: Arc<LockManager>) -> Self {
		Self { engine, locks, clear_batch_size: DEFAULT_CLEAR_BATCH_SIZE }
	}

	async fn read_size(&self, db: u8, key: &Bytes) -> Result<Option<i64>, StorageError> {
		match self.engine.get(&HashSizeKey::new(db, key.clone())?.encode()).await? {
			Some(bytes) => Ok(Some(HashSizeValue::decode(&bytes)?.0)),
			None => Ok(None),
		}
	}

	pub async fn hset(&self, db: u8, key: Bytes, field: Bytes, value: Bytes) -> Result<i64, StorageError> {
		let _guard = self.locks.lock(&lock_token(db, &key)).await;
		typecheck::ensure_kind(&self.engine, db, &key, DataKind::Hash).await?;

		let field_key = HashFieldKey::new(db, key.clone(), field)?;
		let is_new = self.engine.get(&field_key.encode()).await?.is_none();
		let size = self.read_size(db, &key).await?.unwrap_or(0);

		let mut batch = WriteBatch::new();
		batch.put_with_options(field_key.encode(), value, &PutOptions::default());
		if is_new {
			batch.put_with_options(HashSizeKey::new(db, key)?.encode(), HashSizeValue(size + 1).encode(), &PutOptions::default());
		}
		self.engine.write(batch).await?;
		Ok(if is_new { 1 } else { 0 })
	}

	/// `HMSET`: per the Design Notes this returns no count, only success.
	pub async fn hmset(&self, db: u8, key: Bytes, fields: Vec<(Bytes, Bytes)>) -> Result<(), StorageError> {
		let _guard = self.locks.lock(&lock_token(db, &key)).await;
		typecheck::ensure_kind(&self.engine, db, &key, DataKind::Hash).await?;

		let mut size = self.read_size(db, &key).await?.unwrap_or(0);
		let mut batch = WriteBatch::new();
		for (field, value) in fields {
			let field_key = HashFieldKey::new(db, key.clone(), field)?;
			if self.engine.get(&field_key.encode()).await?.is_none() {
				size += 1;
			}
			batch.put_with_options(field_key.encode(), value, &PutOptions::default());
		}
		batch.put_with_options(HashSizeKey::new(db, key)?.encode(), HashSizeValue(size).encode(), &PutOptions::default());
		self.engine.write(batch).await?;
		Ok(())
	}

	pub async fn hget(&self, db: u8, key: &Bytes, field: Bytes) -> Result<Option<Bytes>, StorageError> {
		typecheck::ensure_kind(&self.engine, db, key, DataKind::Hash).await?;
		let field_key = HashFieldKey::new(db, key.clone(), field)?;
		self.engine.get(&field_key.encode()).await.map_err(Into::into)
	}

	/// Known deviation from §4.3/§5 (see `kv_ops::mget`'s doc comment and
	/// DESIGN.md): each field is read through an independent `engine.get`
	/// rather than one point-in-time view.
	pub async fn hmget(&self, db: u8, key: &Bytes, fields: &[Bytes]) -> Result<Vec<Option<Bytes>>, StorageError> {
		typecheck::ensure_kind(&self.engine, db, key, DataKind::Hash).await?;
		let mut out = Vec::with_capacity(fields.len());
		for field in fields {
			let field_key = HashFieldKey::new(db, key.clone(), field.clone())?;
			out.push(self.engine.get(&field_key.encode()).await?);
		}
		Ok(out)
	}

	pub async fn hdel(&self, db: u8, key: Bytes, fields: &[Bytes]) -> Result<i64, StorageError> {
		let _guard = self.locks.lock(&lock_token(db, &key)).await;
		let Some(mut size) = self.read_size(db, &key).await? else {
			return Ok(0);
		};

		let mut batch = WriteBatch::new();
		let mut deleted = 0;
		for field in fields {
			let field_key = HashFieldKey::new(db, key.clone(), field.clone())?;
			if self.engine.get(&field_key.encode()).await?.is_some() {
				batch.delete(field_key.encode());
				deleted += 1;
			}
		}
		if deleted == 0 {
			return Ok(0);
		}
		size -= deleted;
		let size_key = HashSizeKey::new(db, key.clone())?;
		if size <= 0 {
			batch.delete(size_key.encode());
			let old_deadline = ttl_manager::current_deadline(&self.engine, db, DataKind::Hash, &key).await?;
			ttl_manager::clear_deadline_in_batch(&mut batch, db, DataKind::Hash, &key, old_deadline)?;
		} else {
			batch.put_with_options(size_key.encode(), HashSizeValue(size).encode(), &PutOptions::default());
		}
		self.engine.write(batch).await?;
		Ok(deleted)
	}

	pub async fn hexists(&self, db: u8, key: &Bytes, field: Bytes) -> Result<bool, StorageError> {
		Ok(self.hget(db, key, field).await?.is_some())
	}

	pub async fn hlen(&self, db: u8, key: &Bytes) -> Result<i64, StorageError> {
		Ok(self.read_size(db, key).await?.unwrap_or(0))
	}

	pub async fn hincrby(&self, db: u8, key: Bytes, field: Bytes, delta: i64) -> Result<i64, StorageError> {
		let _guard = self.locks.lock(&lock_token(db, &key)).await;
		typecheck::ensure_kind(&self.engine, db, &key, DataKind::Hash).await?;

		let field_key = HashFieldKey::new(db, key.clone(), field)?;
		let existing = self.engine.get(&field_key.encode()).await?;
		let current = match &existing {
			Some(bytes) => parse_int(bytes)?,
			None => 0,
		};
		let next = current.checked_add(delta).ok_or(StorageError::Overflow)?;

		let mut batch = WriteBatch::new();
		batch.put_with_options(field_key.encode(), Bytes::from(next.to_string()), &PutOptions::default());
		if existing.is_none() {
			let size = self.read_size(db, &key).await?.unwrap_or(0);
			batch.put_with_options(HashSizeKey::new(db, key)?.encode(), HashSizeValue(size + 1).encode(), &PutOptions::default());
		}
		self.engine.write(batch).await?;
		Ok(next)
	}

	async fn scan_fields(&self, db: u8, key: &Bytes) -> Result<Vec<(Bytes, Bytes)>, StorageError> {
		let prefix = HashFieldKey::prefix(db, key);
		let upper = prefix_upper_bound(&prefix);
		Ok(self.engine.scan_prefix(prefix, upper).await?)
	}

	pub async fn hkeys(&self, db: u8, key: &Bytes) -> Result<Vec<Bytes>, StorageError> {
		typecheck::ensure_kind(&self.engine, db, key, DataKind::Hash).await?;
		let mut out = Vec::new();
		for (k, _) in self.scan_fields(db, key).await? {
			out.push(HashFieldKey::decode(&k)?.field);
		}
		Ok(out)
	}

	pub async fn hvalues(&self, db: u8, key: &Bytes) -> Result<Vec<Bytes>, StorageError> {
		typecheck::ensure_kind(&self.engine, db, key, DataKind::Hash).await?;
		Ok(self.scan_fields(db, key).await?.into_iter().map(|(_, v)| v).collect())
	}

	pub async fn hgetall(&self, db: u8, key: &Bytes) -> Result<Vec<(Bytes, Bytes)>, StorageError> {
		typecheck::ensure_kind(&self.engine, db, key, DataKind::Hash).await?;
		let mut out = Vec::new();
		for (k, v) in self.scan_fields(db, key).await? {
			out.push((HashFieldKey::decode(&k)?.field, v));
		}
		Ok(out)
	}

	/// `HSCAN(userKey, cursor, count, inclusiveStart)`: up to `count` fields
	/// in ascending byte order, starting after (or at, if inclusive) cursor.
	pub async fn hscan(&self, db: u8, key: &Bytes, cursor: Option<Bytes>, count: i64, inclusive_start: bool) -> Result<Vec<(Bytes, Bytes)>, StorageError> {
		typecheck::ensure_kind(&self.engine, db, key, DataKind::Hash).await?;
		let items = self.scan_fields(db, key).await?;
		let min = cursor.map(|c| HashFieldKey::new(db, key.clone(), c).map(|k| k.encode())).transpose()?;
		let range_type = if min.is_none() || inclusive_start { RangeType::Close } else { RangeType::LOpen };
		let range = Range { min, max: None, range_type };
		let limit = Limit { offset: 0, count };
		let mut out = Vec::new();
		for (k, v) in RangeLimitIterator::new(items, &range, &limit, Direction::Forward) {
			out.push((HashFieldKey::decode(&k)?.field, v));
		}
		Ok(out)
	}

	/// `HCLEAR`: range-deletes all fields plus the size record, splitting
	/// into successive batches of `clear_batch_size` when the hash is large.
	pub async fn hclear(&self, db: u8, key: Bytes) -> Result<(), StorageError> {
		let _guard = self.locks.lock(&lock_token(db, &key)).await;
		let Some(total) = self.read_size(db, &key).await? else {
			return Ok(());
		};

		let fields = self.scan_fields(db, &key).await?;
		let mut remaining = total;
		for chunk in fields.chunks(self.clear_batch_size) {
			let mut batch = WriteBatch::new();
			for (k, _) in chunk {
				batch.delete(k.clone());
			}
			remaining -= chunk.len() as i64;
			let size_key = HashSizeKey::new(db, key.clone())?;
			if remaining <= 0 {
				batch.delete(size_key.encode());
				let old_deadline = ttl_manager::current_deadline(&self.engine, db, DataKind::Hash, &key).await?;
				ttl_manager::clear_deadline_in_batch(&mut batch, db, DataKind::Hash, &key, old_deadline)?;
			} else {
				batch.put_with_options(size_key.encode(), HashSizeValue(remaining).encode(), &PutOptions::default());
			}
			self.engine.write(batch).await?;
		}
		Ok(())
	}

	pub async fn hexpire(&self, db: u8, key: &Bytes, seconds: i64) -> Result<i64, StorageError> {
		let exists = self.read_size(db, key).await?.is_some();
		ttl_manager::expire(&self.engine, db, DataKind::Hash, key, seconds, exists).await
	}

	pub async fn httl(&self, db: u8, key: &Bytes) -> Result<i64, StorageError> {
		let exists = self.read_size(db, key).await?.is_some();
		ttl_manager::ttl(&self.engine, db, DataKind::Hash, key, exists).await
	}

	pub async fn hpersist(&self, db: u8, key: &Bytes) -> Result<i64, StorageError> {
		ttl_manager::persist(&self.engine, db, DataKind::Hash, key).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	async fn ops() -> HashOps {
		let dir = tempfile::tempdir().unwrap();
		let engine = Engine::open(dir.into_path()).await.unwrap();
		HashOps::new(engine, Arc::new(LockManager::new()))
	}

	#[tokio::test]
	async fn hset_reports_new_vs_overwrite() {
		let ops = ops().await;
		let key = Bytes::from_static(b"h");
		assert_eq!(ops.hset(0, key.clone(), Bytes::from_static(b"f1"), Bytes::from_static(b"v1")).await.unwrap(), 1);
		assert_eq!(ops.hset(0, key.clone(), Bytes::from_static(b"f2"), Bytes::from_static(b"v2")).await.unwrap(), 1);
		assert_eq!(ops.hmget(0, &key, &[Bytes::from_static(b"f1"), Bytes::from_static(b"f2")]).await.unwrap(), vec![Some(Bytes::from_static(b"v1")), Some(Bytes::from_static(b"v2"))]);
		assert_eq!(ops.hlen(0, &key).await.unwrap(), 2);
	}

	#[tokio::test]
	async fn hscan_with_cursor_and_inclusivity() {
		let ops = ops().await;
		let key = Bytes::from_static(b"h");
		for f in ["a", "b", "c"] {
			ops.hset(0, key.clone(), Bytes::copy_from_slice(f.as_bytes()), Bytes::new()).await.unwrap();
		}
		let first = ops.hscan(0, &key, None, 1, true).await.unwrap();
		assert_eq!(first.len(), 1);
		assert_eq!(first[0].0, Bytes::from_static(b"a"));

		let rest = ops.hscan(0, &key, Some(Bytes::from_static(b"a")), 2, false).await.unwrap();
		assert_eq!(rest.len(), 2);
		assert_eq!(rest[0].0, Bytes::from_static(b"b"));
	}

	#[tokio::test]
	async fn hdel_removes_size_record_when_empty() {
		let ops = ops().await;
		let key = Bytes::from_static(b"h");
		ops.hset(0, key.clone(), Bytes::from_static(b"f"), Bytes::new()).await.unwrap();
		assert_eq!(ops.hdel(0, key.clone(), &[Bytes::from_static(b"f")]).await.unwrap(), 1);
		assert_eq!(ops.hlen(0, &key).await.unwrap(), 0);
		assert!(ops.hgetall(0, &key).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn hclear_splits_into_batches() {
		let mut ops = ops().await;
		ops.clear_batch_size = 2;
		let key = Bytes::from_static(b"h");
		for i in 0..5u32 {
			ops.hset(0, key.clone(), Bytes::from(i.to_string()), Bytes::new()).await.unwrap();
		}
		ops.hclear(0, key.clone()).await.unwrap();
		assert_eq!(ops.hlen(0, &key).await.unwrap(), 0);
	}

	#[tokio::test]
	async fn hexpire_httl_hpersist_compose() {
		let ops = ops().await;
		let key = Bytes::from_static(b"h");
		ops.hset(0, key.clone(), Bytes::from_static(b"f"), Bytes::new()).await.unwrap();
		assert_eq!(ops.hexpire(0, &key, 10).await.unwrap(), 1);
		assert!(ops.httl(0, &key).await.unwrap() > 0);
		assert_eq!(ops.hpersist(0, &key).await.unwrap(), 1);
		assert_eq!(ops.httl(0, &key).await.unwrap(), -1);
	}
}
