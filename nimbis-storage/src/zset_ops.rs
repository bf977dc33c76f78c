//! Sorted-set operators (§4.3.4): `ZADD, ZREM, ZSCORE, ZCARD, ZINCRBY,
//! ZRANGE, ZREVRANGE, ZRANGEBYSCORE, ZREVRANGEBYSCORE, ZCOUNT, ZRANK,
//! ZREVRANK, ZREMRANGEBYRANK, ZREMRANGEBYSCORE, ZCLEAR,
//! ZEXPIRE/ZTTL/ZPERSIST`.

use std::sync::Arc;

use bytes::Bytes;
use slatedb::WriteBatch;
use slatedb::config::PutOptions;

use crate::codec::zset::decode_score;
use crate::codec::zset::encode_score;
use crate::codec::zset::ZSetFieldKey;
use crate::codec::zset::ZSetScoreKey;
use crate::codec::zset::ZSetSizeKey;
use crate::codec::zset::ZSetSizeValue;
use crate::engine::prefix_upper_bound;
use crate::engine::Engine;
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

pub struct ZSetOps {
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

/// A score range. `min`/`max` are both inclusive, matching `ZRANGEBYSCORE`.
#[derive(Debug, Clone, Copy)]
pub struct ScoreRange {
	pub min: i64,
	pub max: i64,
}

impl ZSetOps {
	pub fn new(engine: Engine, locks: Arc<LockManager>) -> Self {
		Self { engine, locks, clear_batch_size: DEFAULT_CLEAR_BATCH_SIZE }
	}

	async fn read_size(&self, db: u8, key: &Bytes) -> Result<Option<i64>, StorageError> {
		match self.engine.get(&ZSetSizeKey::new(db, key.clone())?.encode()).await? {
			Some(bytes) => Ok(Some(ZSetSizeValue::decode(&bytes)?.0)),
			None => Ok(None),
		}
	}

	async fn read_score(&self, db: u8, key: &Bytes, member: &Bytes) -> Result<Option<i64>, StorageError> {
		match self.engine.get(&ZSetFieldKey::new(db, key.clone(), member.clone())?.encode()).await? {
			Some(bytes) => Ok(Some(decode_score(&bytes)?)),
			None => Ok(None),
		}
	}

	/// All (member, score) pairs in ascending score order, decoded from the
	/// score index.
	async fn scan_by_score(&self, db: u8, key: &Bytes) -> Result<Vec<(Bytes, i64)>, StorageError> {
		let prefix = ZSetScoreKey::prefix(db, key);
		let upper = prefix_upper_bound(&prefix);
		let raw = self.engine.scan_prefix(prefix, upper).await?;
		let mut out = Vec::with_capacity(raw.len());
		for (k, _) in raw {
			let decoded = ZSetScoreKey::decode(&k)?;
			out.push((decoded.member, decoded.score));
		}
		Ok(out)
	}

	/// `ZADD(k, score, member)`. Returns `1` if `member` was newly added,
	/// `0` if an existing member's score was updated (cardinality unchanged).
	pub async fn zadd(&self, db: u8, key: Bytes, member: Bytes, score: i64) -> Result<i64, StorageError> {
		let _guard = self.locks.lock(&lock_token(db, &key)).await;
		typecheck::ensure_kind(&self.engine, db, &key, DataKind::ZSet).await?;

		let old_score = self.read_score(db, &key, &member).await?;
		let mut batch = WriteBatch::new();
		batch.put_with_options(ZSetFieldKey::new(db, key.clone(), member.clone())?.encode(), encode_score(score), &PutOptions::default());
		if old_score != Some(score) {
			if let Some(old) = old_score {
				batch.delete(ZSetScoreKey::new(db, key.clone(), old, member.clone())?.encode());
			}
			batch.put_with_options(ZSetScoreKey::new(db, key.clone(), score, member.clone())?.encode(), Bytes::new(), &PutOptions::default());
		}
		let is_new = old_score.is_none();
		if is_new {
			let size = self.read_size(db, &key).await?.unwrap_or(0);
			batch.put_with_options(ZSetSizeKey::new(db, key)?.encode(), ZSetSizeValue(size + 1).encode(), &PutOptions::default());
		}
		self.engine.write(batch).await?;
		Ok(if is_new { 1 } else { 0 })
	}

	pub async fn zincrby(&self, db: u8, key: Bytes, member: Bytes, delta: i64) -> Result<i64, StorageError> {
		let _guard = self.locks.lock(&lock_token(db, &key)).await;
		typecheck::ensure_kind(&self.engine, db, &key, DataKind::ZSet).await?;

		let old_score = self.read_score(db, &key, &member).await?;
		let next = old_score.unwrap_or(0).checked_add(delta).ok_or(StorageError::Overflow)?;

		let mut batch = WriteBatch::new();
		batch.put_with_options(ZSetFieldKey::new(db, key.clone(), member.clone())?.encode(), encode_score(next), &PutOptions::default());
		if let Some(old) = old_score {
			batch.delete(ZSetScoreKey::new(db, key.clone(), old, member.clone())?.encode());
		}
		batch.put_with_options(ZSetScoreKey::new(db, key.clone(), next, member.clone())?.encode(), Bytes::new(), &PutOptions::default());
		if old_score.is_none() {
			let size = self.read_size(db, &key).await?.unwrap_or(0);
			batch.put_with_options(ZSetSizeKey::new(db, key)?.encode(), ZSetSizeValue(size + 1).encode(), &PutOptions::default());
		}
		self.engine.write(batch).await?;
		Ok(next)
	}

	pub async fn zrem(&self, db: u8, key: Bytes, members: &[Bytes]) -> Result<i64, StorageError> {
		let _guard = self.locks.lock(&lock_token(db, &key)).await;
		let Some(mut size) = self.read_size(db, &key).await? else {
			return Ok(0);
		};

		let mut batch = WriteBatch::new();
		let mut deleted = 0;
		for member in members {
			if let Some(score) = self.read_score(db, &key, member).await? {
				batch.delete(ZSetFieldKey::new(db, key.clone(), member.clone())?.encode());
				batch.delete(ZSetScoreKey::new(db, key.clone(), score, member.clone())?.encode());
				deleted += 1;
			}
		}
		if deleted == 0 {
			return Ok(0);
		}
		size -= deleted;
		let size_key = ZSetSizeKey::new(db, key.clone())?;
		if size <= 0 {
			batch.delete(size_key.encode());
			let old_deadline = ttl_manager::current_deadline(&self.engine, db, DataKind::ZSet, &key).await?;
			ttl_manager::clear_deadline_in_batch(&mut batch, db, DataKind::ZSet, &key, old_deadline)?;
		} else {
			batch.put_with_options(size_key.encode(), ZSetSizeValue(size).encode(), &PutOptions::default());
		}
		self.engine.write(batch).await?;
		Ok(deleted)
	}

	pub async fn zscore(&self, db: u8, key: &Bytes, member: &Bytes) -> Result<Option<i64>, StorageError> {
		typecheck::ensure_kind(&self.engine, db, key, DataKind::ZSet).await?;
		self.read_score(db, key, member).await
	}

	pub async fn zcard(&self, db: u8, key: &Bytes) -> Result<i64, StorageError> {
		Ok(self.read_size(db, key).await?.unwrap_or(0))
	}

	fn normalize_rank(len: i64, idx: i64) -> i64 {
		let idx = if idx < 0 { len + idx } else { idx };
		idx.clamp(0, len)
	}

	async fn rank_slice(&self, db: u8, key: &Bytes, start: i64, stop: i64, descending: bool) -> Result<Vec<(Bytes, i64)>, StorageError> {
		let mut members = self.scan_by_score(db, key).await?;
		if descending {
			members.reverse();
		}
		let len = members.len() as i64;
		let start_idx = Self::normalize_rank(len, start);
		let stop_idx = (Self::normalize_rank(len, stop) + 1).min(len);
		if start_idx >= stop_idx {
			return Ok(Vec::new());
		}
		Ok(members[start_idx as usize..stop_idx as usize].to_vec())
	}

	pub async fn zrange(&self, db: u8, key: &Bytes, start: i64, stop: i64) -> Result<Vec<(Bytes, i64)>, StorageError> {
		typecheck::ensure_kind(&self.engine, db, key, DataKind::ZSet).await?;
		self.rank_slice(db, key, start, stop, false).await
	}

	pub async fn zrevrange(&self, db: u8, key: &Bytes, start: i64, stop: i64) -> Result<Vec<(Bytes, i64)>, StorageError> {
		typecheck::ensure_kind(&self.engine, db, key, DataKind::ZSet).await?;
		self.rank_slice(db, key, start, stop, true).await
	}

	fn score_range(db: u8, key: &Bytes, range: ScoreRange) -> Range {
		let min = ZSetScoreKey::score_prefix(db, key, range.min);
		let upper = prefix_upper_bound(&ZSetScoreKey::score_prefix(db, key, range.max));
		Range { min: Some(min), max: Some(upper), range_type: RangeType::ROpen }
	}

	async fn by_score(&self, db: u8, key: &Bytes, range: ScoreRange, descending: bool) -> Result<Vec<(Bytes, i64)>, StorageError> {
		typecheck::ensure_kind(&self.engine, db, key, DataKind::ZSet).await?;
		let prefix = ZSetScoreKey::prefix(db, key);
		let upper = prefix_upper_bound(&prefix);
		let raw = self.engine.scan_prefix(prefix, upper).await?;
		let bound = Self::score_range(db, key, range);
		let direction = if descending { Direction::Backward } else { Direction::Forward };
		let mut out = Vec::new();
		for (k, _) in RangeLimitIterator::new(raw, &bound, &Limit::all(), direction) {
			let decoded = ZSetScoreKey::decode(&k)?;
			out.push((decoded.member, decoded.score));
		}
		Ok(out)
	}

	pub async fn zrangebyscore(&self, db: u8, key: &Bytes, range: ScoreRange) -> Result<Vec<(Bytes, i64)>, StorageError> {
		self.by_score(db, key, range, false).await
	}

	pub async fn zrevrangebyscore(&self, db: u8, key: &Bytes, range: ScoreRange) -> Result<Vec<(Bytes, i64)>, StorageError> {
		self.by_score(db, key, range, true).await
	}

	pub async fn zcount(&self, db: u8, key: &Bytes, range: ScoreRange) -> Result<i64, StorageError> {
		Ok(self.zrangebyscore(db, key, range).await?.len() as i64)
	}

	async fn rank_of(&self, db: u8, key: &Bytes, member: &Bytes, descending: bool) -> Result<Option<i64>, StorageError> {
		typecheck::ensure_kind(&self.engine, db, key, DataKind::ZSet).await?;
		let mut members = self.scan_by_score(db, key).await?;
		if descending {
			members.reverse();
		}
		Ok(members.iter().position(|(m, _)| m == member).map(|i| i as i64))
	}

	pub async fn zrank(&self, db: u8, key: &Bytes, member: &Bytes) -> Result<Option<i64>, StorageError> {
		self.rank_of(db, key, member, false).await
	}

	pub async fn zrevrank(&self, db: u8, key: &Bytes, member: &Bytes) -> Result<Option<i64>, StorageError> {
		self.rank_of(db, key, member, true).await
	}

	async fn remove_members(&self, db: u8, key: Bytes, victims: Vec<(Bytes, i64)>) -> Result<i64, StorageError> {
		if victims.is_empty() {
			return Ok(0);
		}
		let Some(mut size) = self.read_size(db, &key).await? else {
			return Ok(0);
		};

		let mut batch = WriteBatch::new();
		for (member, score) in &victims {
			batch.delete(ZSetFieldKey::new(db, key.clone(), member.clone())?.encode());
			batch.delete(ZSetScoreKey::new(db, key.clone(), *score, member.clone())?.encode());
		}
		size -= victims.len() as i64;
		let size_key = ZSetSizeKey::new(db, key.clone())?;
		if size <= 0 {
			batch.delete(size_key.encode());
			let old_deadline = ttl_manager::current_deadline(&self.engine, db, DataKind::ZSet, &key).await?;
			ttl_manager::clear_deadline_in_batch(&mut batch, db, DataKind::ZSet, &key, old_deadline)?;
		} else {
			batch.put_with_options(size_key.encode(), ZSetSizeValue(size).encode(), &PutOptions::default());
		}
		self.engine.write(batch).await?;
		Ok(victims.len() as i64)
	}

	pub async fn zremrangebyrank(&self, db: u8, key: Bytes, start: i64, stop: i64) -> Result<i64, StorageError> {
		let _guard = self.locks.lock(&lock_token(db, &key)).await;
		let victims = self.rank_slice(db, &key, start, stop, false).await?;
		self.remove_members(db, key, victims).await
	}

	pub async fn zremrangebyscore(&self, db: u8, key: Bytes, range: ScoreRange) -> Result<i64, StorageError> {
		let _guard = self.locks.lock(&lock_token(db, &key)).await;
		let victims = self.by_score(db, &key, range, false).await?;
		self.remove_members(db, key, victims).await
	}

	/// `ZCLEAR`: range-deletes every (field, score) pair plus the size
	/// record, splitting into successive batches of `clear_batch_size`.
	pub async fn zclear(&self, db: u8, key: Bytes) -> Result<(), StorageError> {
		let _guard = self.locks.lock(&lock_token(db, &key)).await;
		if self.read_size(db, &key).await?.is_none() {
			return Ok(());
		}

		let field_prefix = ZSetFieldKey::prefix(db, &key);
		let field_upper = prefix_upper_bound(&field_prefix);
		let fields = self.engine.scan_prefix(field_prefix, field_upper).await?;
		let score_prefix = ZSetScoreKey::prefix(db, &key);
		let score_upper = prefix_upper_bound(&score_prefix);
		let scores = self.engine.scan_prefix(score_prefix, score_upper).await?;

		let all_keys: Vec<Bytes> = fields.into_iter().map(|(k, _)| k).chain(scores.into_iter().map(|(k, _)| k)).collect();
		let chunk_count = all_keys.chunks(self.clear_batch_size).count().max(1);
		for (i, chunk) in all_keys.chunks(self.clear_batch_size).enumerate() {
			let mut batch = WriteBatch::new();
			for k in chunk {
				batch.delete(k.clone());
			}
			if i + 1 == chunk_count {
				let size_key = ZSetSizeKey::new(db, key.clone())?;
				batch.delete(size_key.encode());
				let old_deadline = ttl_manager::current_deadline(&self.engine, db, DataKind::ZSet, &key).await?;
				ttl_manager::clear_deadline_in_batch(&mut batch, db, DataKind::ZSet, &key, old_deadline)?;
			}
			self.engine.write(batch).await?;
		}
		Ok(())
	}

	pub async fn zexpire(&self, db: u8, key: &Bytes, seconds: i64) -> Result<i64, StorageError> {
		let exists = self.read_size(db, key).await?.is_some();
		ttl_manager::expire(&self.engine, db, DataKind::ZSet, key, seconds, exists).await
	}

	pub async fn zttl(&self, db: u8, key: &Bytes) -> Result<i64, StorageError> {
		let exists = self.read_size(db, key).await?.is_some();
		ttl_manager::ttl(&self.engine, db, DataKind::ZSet, key, exists).await
	}

	pub async fn zpersist(&self, db: u8, key: &Bytes) -> Result<i64, StorageError> {
		ttl_manager::persist(&self.engine, db, DataKind::ZSet, key).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	async fn ops() -> ZSetOps {
		let dir = tempfile::tempdir().unwrap();
		let engine = Engine::open(dir.into_path()).await.unwrap();
		ZSetOps::new(engine, Arc::new(LockManager::new()))
	}

	#[tokio::test]
	async fn zadd_then_update_keeps_cardinality() {
		let ops = ops().await;
		let key = Bytes::from_static(b"z");
		assert_eq!(ops.zadd(0, key.clone(), Bytes::from_static(b"m"), 5).await.unwrap(), 1);
		assert_eq!(ops.zadd(0, key.clone(), Bytes::from_static(b"m"), 9).await.unwrap(), 0);
		assert_eq!(ops.zcard(0, &key).await.unwrap(), 1);
		assert_eq!(ops.zscore(0, &key, &Bytes::from_static(b"m")).await.unwrap(), Some(9));
	}

	#[tokio::test]
	async fn zrange_orders_by_score_then_member() {
		let ops = ops().await;
		let key = Bytes::from_static(b"z");
		ops.zadd(0, key.clone(), Bytes::from_static(b"b"), 1).await.unwrap();
		ops.zadd(0, key.clone(), Bytes::from_static(b"a"), 1).await.unwrap();
		ops.zadd(0, key.clone(), Bytes::from_static(b"c"), 2).await.unwrap();
		let got = ops.zrange(0, &key, 0, -1).await.unwrap();
		assert_eq!(got, vec![(Bytes::from_static(b"a"), 1), (Bytes::from_static(b"b"), 1), (Bytes::from_static(b"c"), 2)]);
	}

	#[tokio::test]
	async fn zrangebyscore_is_inclusive_both_ends() {
		let ops = ops().await;
		let key = Bytes::from_static(b"z");
		for (m, s) in [("a", 1), ("b", 2), ("c", 3)] {
			ops.zadd(0, key.clone(), Bytes::copy_from_slice(m.as_bytes()), s).await.unwrap();
		}
		let got = ops.zrangebyscore(0, &key, ScoreRange { min: 1, max: 2 }).await.unwrap();
		assert_eq!(got, vec![(Bytes::from_static(b"a"), 1), (Bytes::from_static(b"b"), 2)]);
		assert_eq!(ops.zcount(0, &key, ScoreRange { min: 1, max: 2 }).await.unwrap(), 2);
	}

	#[tokio::test]
	async fn zrank_and_zrevrank() {
		let ops = ops().await;
		let key = Bytes::from_static(b"z");
		ops.zadd(0, key.clone(), Bytes::from_static(b"a"), 1).await.unwrap();
		ops.zadd(0, key.clone(), Bytes::from_static(b"b"), 2).await.unwrap();
		assert_eq!(ops.zrank(0, &key, &Bytes::from_static(b"b")).await.unwrap(), Some(1));
		assert_eq!(ops.zrevrank(0, &key, &Bytes::from_static(b"b")).await.unwrap(), Some(0));
		assert_eq!(ops.zrank(0, &key, &Bytes::from_static(b"missing")).await.unwrap(), None);
	}

	#[tokio::test]
	async fn zrem_drops_size_record_when_empty() {
		let ops = ops().await;
		let key = Bytes::from_static(b"z");
		ops.zadd(0, key.clone(), Bytes::from_static(b"a"), 1).await.unwrap();
		assert_eq!(ops.zrem(0, key.clone(), &[Bytes::from_static(b"a")]).await.unwrap(), 1);
		assert_eq!(ops.zcard(0, &key).await.unwrap(), 0);
	}

	#[tokio::test]
	async fn zremrangebyscore_deletes_matching_members() {
		let ops = ops().await;
		let key = Bytes::from_static(b"z");
		for (m, s) in [("a", 1), ("b", 2), ("c", 3)] {
			ops.zadd(0, key.clone(), Bytes::copy_from_slice(m.as_bytes()), s).await.unwrap();
		}
		assert_eq!(ops.zremrangebyscore(0, key.clone(), ScoreRange { min: 1, max: 2 }).await.unwrap(), 2);
		assert_eq!(ops.zcard(0, &key).await.unwrap(), 1);
	}

	#[tokio::test]
	async fn zclear_removes_everything() {
		let ops = ops().await;
		let key = Bytes::from_static(b"z");
		for (m, s) in [("a", 1), ("b", 2)] {
			ops.zadd(0, key.clone(), Bytes::copy_from_slice(m.as_bytes()), s).await.unwrap();
		}
		ops.zclear(0, key.clone()).await.unwrap();
		assert_eq!(ops.zcard(0, &key).await.unwrap(), 0);
		assert!(ops.zrange(0, &key, 0, -1).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn zexpire_zttl_zpersist_compose() {
		let ops = ops().await;
		let key = Bytes::from_static(b"z");
		ops.zadd(0, key.clone(), Bytes::from_static(b"a"), 1).await.unwrap();
		assert_eq!(ops.zexpire(0, &key, 10).await.unwrap(), 1);
		assert!(ops.zttl(0, &key).await.unwrap() > 0);
		assert_eq!(ops.zpersist(0, &key).await.unwrap(), 1);
	}
}
