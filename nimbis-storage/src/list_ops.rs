//! List operators (§4.3.3): `LPUSH, RPUSH, LPOP, RPOP, LLEN, LINDEX, LRANGE,
//! LCLEAR, LEXPIRE/LTTL/LPERSIST`.

use std::sync::Arc;

use bytes::Bytes;
use slatedb::WriteBatch;
use slatedb::config::PutOptions;

use crate::codec::list::ListElemKey;
use crate::codec::list::ListMetaKey;
use crate::codec::list::ListMetaValue;
use crate::codec::list::INITIAL_SEQ;
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

const DEFAULT_CLEAR_BATCH_SIZE: usize = 1024;

pub struct ListOps {
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

enum Side {
	Left,
	Right,
}

impl ListOps {
	pub fn new(engine: Engine, locks: Arc<LockManager>) -> Self {
		Self { engine, locks, clear_batch_size: DEFAULT_CLEAR_BATCH_SIZE }
	}

	async fn read_meta(&self, db: u8, key: &Bytes) -> Result<Option<ListMetaValue>, StorageError> {
		match self.engine.get(&ListMetaKey::new(db, key.clone())?.encode()).await? {
			Some(bytes) => Ok(Some(ListMetaValue::decode(&bytes)?)),
			None => Ok(None),
		}
	}

	async fn push(&self, db: u8, key: Bytes, value: Bytes, side: Side) -> Result<i64, StorageError> {
		let _guard = self.locks.lock(&lock_token(db, &key)).await;
		typecheck::ensure_kind(&self.engine, db, &key, DataKind::List).await?;

		let mut meta = self.read_meta(db, &key).await?.unwrap_or(ListMetaValue { head: INITIAL_SEQ, tail: INITIAL_SEQ - 1 });
		let seq = match side {
			Side::Left => meta.push_left()?,
			Side::Right => meta.push_right()?,
		};

		let mut batch = WriteBatch::new();
		batch.put_with_options(ListElemKey::new(db, key.clone(), seq)?.encode(), value, &PutOptions::default());
		batch.put_with_options(ListMetaKey::new(db, key)?.encode(), meta.encode(), &PutOptions::default());
		self.engine.write(batch).await?;
		Ok(meta.len())
	}

	pub async fn lpush(&self, db: u8, key: Bytes, value: Bytes) -> Result<i64, StorageError> {
		self.push(db, key, value, Side::Left).await
	}

	pub async fn rpush(&self, db: u8, key: Bytes, value: Bytes) -> Result<i64, StorageError> {
		self.push(db, key, value, Side::Right).await
	}

	async fn pop(&self, db: u8, key: Bytes, side: Side) -> Result<Option<Bytes>, StorageError> {
		let _guard = self.locks.lock(&lock_token(db, &key)).await;
		let Some(mut meta) = self.read_meta(db, &key).await? else {
			return Ok(None);
		};
		let seq = match side {
			Side::Left => meta.head,
			Side::Right => meta.tail,
		};
		let elem_key = ListElemKey::new(db, key.clone(), seq)?;
		let Some(value) = self.engine.get(&elem_key.encode()).await? else {
			return Ok(None);
		};

		let mut batch = WriteBatch::new();
		batch.delete(elem_key.encode());
		if meta.len() == 1 {
			batch.delete(ListMetaKey::new(db, key.clone())?.encode());
			let old_deadline = ttl_manager::current_deadline(&self.engine, db, DataKind::List, &key).await?;
			ttl_manager::clear_deadline_in_batch(&mut batch, db, DataKind::List, &key, old_deadline)?;
		} else {
			match side {
				Side::Left => meta.head += 1,
				Side::Right => meta.tail -= 1,
			}
			batch.put_with_options(ListMetaKey::new(db, key)?.encode(), meta.encode(), &PutOptions::default());
		}
		self.engine.write(batch).await?;
		Ok(Some(value))
	}

	pub async fn lpop(&self, db: u8, key: Bytes) -> Result<Option<Bytes>, StorageError> {
		self.pop(db, key, Side::Left).await
	}

	pub async fn rpop(&self, db: u8, key: Bytes) -> Result<Option<Bytes>, StorageError> {
		self.pop(db, key, Side::Right).await
	}

	pub async fn llen(&self, db: u8, key: &Bytes) -> Result<i64, StorageError> {
		Ok(self.read_meta(db, key).await?.map_or(0, |m| m.len()))
	}

	/// `LINDEX(k, i)`: negative `i` counts from the tail. Out-of-range
	/// returns `None`, never an error.
	pub async fn lindex(&self, db: u8, key: &Bytes, index: i64) -> Result<Option<Bytes>, StorageError> {
		let Some(meta) = self.read_meta(db, key).await? else {
			return Ok(None);
		};
		let seq = if index >= 0 { meta.head + index } else { meta.tail + 1 + index };
		if seq < meta.head || seq > meta.tail {
			return Ok(None);
		}
		self.engine.get(&ListElemKey::new(db, key.clone(), seq)?.encode()).await.map_err(Into::into)
	}

	/// `LRANGE(k, start, stop)`: bounded subrange after normalizing negative
	/// indices against the tail; empty if `start > stop` after normalization.
	pub async fn lrange(&self, db: u8, key: &Bytes, start: i64, stop: i64) -> Result<Vec<Bytes>, StorageError> {
		let Some(meta) = self.read_meta(db, key).await? else {
			return Ok(Vec::new());
		};
		let len = meta.len();
		let normalize = |i: i64| -> i64 {
			let idx = if i < 0 { len + i } else { i };
			idx.clamp(0, len)
		};
		let start_idx = normalize(start);
		let stop_idx = (normalize(stop) + 1).min(len);
		if start_idx >= stop_idx {
			return Ok(Vec::new());
		}

		let prefix = ListElemKey::prefix(db, key);
		let upper = prefix_upper_bound(&prefix);
		let items = self.engine.scan_prefix(prefix, upper).await?;
		let min = ListElemKey::new(db, key.clone(), meta.head + start_idx)?.encode();
		let max = ListElemKey::new(db, key.clone(), meta.head + stop_idx - 1)?.encode();
		let range = Range { min: Some(min), max: Some(max), range_type: RangeType::Close };
		Ok(RangeLimitIterator::new(items, &range, &Limit::all(), Direction::Forward).map(|(_, v)| v).collect())
	}

	/// `LCLEAR`: range-deletes every element plus the meta record, splitting
	/// into successive batches of `clear_batch_size` for large lists.
	pub async fn lclear(&self, db: u8, key: Bytes) -> Result<(), StorageError> {
		let _guard = self.locks.lock(&lock_token(db, &key)).await;
		if self.read_meta(db, &key).await?.is_none() {
			return Ok(());
		}

		let prefix = ListElemKey::prefix(db, &key);
		let upper = prefix_upper_bound(&prefix);
		let elems = self.engine.scan_prefix(prefix, upper).await?;
		let total_chunks = elems.chunks(self.clear_batch_size).count().max(1);
		for (i, chunk) in elems.chunks(self.clear_batch_size).enumerate() {
			let mut batch = WriteBatch::new();
			for (k, _) in chunk {
				batch.delete(k.clone());
			}
			if i + 1 == total_chunks {
				batch.delete(ListMetaKey::new(db, key.clone())?.encode());
				let old_deadline = ttl_manager::current_deadline(&self.engine, db, DataKind::List, &key).await?;
				ttl_manager::clear_deadline_in_batch(&mut batch, db, DataKind::List, &key, old_deadline)?;
			}
			self.engine.write(batch).await?;
		}
		Ok(())
	}

	pub async fn lexpire(&self, db: u8, key: &Bytes, seconds: i64) -> Result<i64, StorageError> {
		let exists = self.read_meta(db, key).await?.is_some();
		ttl_manager::expire(&self.engine, db, DataKind::List, key, seconds, exists).await
	}

	pub async fn lttl(&self, db: u8, key: &Bytes) -> Result<i64, StorageError> {
		let exists = self.read_meta(db, key).await?.is_some();
		ttl_manager::ttl(&self.engine, db, DataKind::List, key, exists).await
	}

	pub async fn lpersist(&self, db: u8, key: &Bytes) -> Result<i64, StorageError> {
		ttl_manager::persist(&self.engine, db, DataKind::List, key).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	async fn ops() -> ListOps {
		let dir = tempfile::tempdir().unwrap();
		let engine = Engine::open(dir.into_path()).await.unwrap();
		ListOps::new(engine, Arc::new(LockManager::new()))
	}

	#[tokio::test]
	async fn lpush_rpush_build_expected_order() {
		let ops = ops().await;
		let key = Bytes::from_static(b"l");
		ops.rpush(0, key.clone(), Bytes::from_static(b"b")).await.unwrap();
		ops.rpush(0, key.clone(), Bytes::from_static(b"c")).await.unwrap();
		ops.lpush(0, key.clone(), Bytes::from_static(b"a")).await.unwrap();
		assert_eq!(ops.llen(0, &key).await.unwrap(), 3);
		assert_eq!(ops.lrange(0, &key, 0, -1).await.unwrap(), vec![Bytes::from_static(b"a"), Bytes::from_static(b"b"), Bytes::from_static(b"c")]);
	}

	#[tokio::test]
	async fn lindex_supports_negative_and_out_of_range() {
		let ops = ops().await;
		let key = Bytes::from_static(b"l");
		ops.rpush(0, key.clone(), Bytes::from_static(b"a")).await.unwrap();
		ops.rpush(0, key.clone(), Bytes::from_static(b"b")).await.unwrap();
		assert_eq!(ops.lindex(0, &key, -1).await.unwrap(), Some(Bytes::from_static(b"b")));
		assert_eq!(ops.lindex(0, &key, 5).await.unwrap(), None);
	}

	#[tokio::test]
	async fn lpop_rpop_drain_and_remove_meta() {
		let ops = ops().await;
		let key = Bytes::from_static(b"l");
		ops.rpush(0, key.clone(), Bytes::from_static(b"a")).await.unwrap();
		assert_eq!(ops.lpop(0, key.clone()).await.unwrap(), Some(Bytes::from_static(b"a")));
		assert_eq!(ops.llen(0, &key).await.unwrap(), 0);
		assert_eq!(ops.rpop(0, key.clone()).await.unwrap(), None);
	}

	#[tokio::test]
	async fn lrange_empty_when_start_after_stop() {
		let ops = ops().await;
		let key = Bytes::from_static(b"l");
		ops.rpush(0, key.clone(), Bytes::from_static(b"a")).await.unwrap();
		assert!(ops.lrange(0, &key, 2, 1).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn lclear_splits_into_batches() {
		let mut ops = ops().await;
		ops.clear_batch_size = 2;
		let key = Bytes::from_static(b"l");
		for i in 0..5u32 {
			ops.rpush(0, key.clone(), Bytes::from(i.to_string())).await.unwrap();
		}
		ops.lclear(0, key.clone()).await.unwrap();
		assert_eq!(ops.llen(0, &key).await.unwrap(), 0);
	}

	#[tokio::test]
	async fn lexpire_lttl_lpersist_compose() {
		let ops = ops().await;
		let key = Bytes::from_static(b"l");
		ops.rpush(0, key.clone(), Bytes::from_static(b"a")).await.unwrap();
		assert_eq!(ops.lexpire(0, &key, 10).await.unwrap(), 1);
		assert!(ops.lttl(0, &key).await.unwrap() > 0);
		assert_eq!(ops.lpersist(0, &key).await.unwrap(), 1);
		assert_eq!(ops.lttl(0, &key).await.unwrap(), -1);
	}
}
