//! DB Façade (§4.5): sixteen logical databases sharing one engine handle,
//! a per-db write-serialization lane (§5), and the background TTL sweeper
//! (§4.4).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::sync::OwnedMutexGuard;
use tokio::task::JoinHandle;

use crate::adapters::adapter_for;
use crate::codec::ttl::ExpTimeKey;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::error::StorageError;
use crate::hash_ops::HashOps;
use crate::kv_ops::KvOps;
use crate::list_ops::ListOps;
use crate::lock_manager::LockManager;
use crate::zset_ops::ZSetOps;

/// `SELECT n` accepts `0..NUM_DATABASES`.
pub const NUM_DATABASES: u8 = 16;

fn now_epoch_secs() -> u64 {
	chrono::Utc::now().timestamp().max(0) as u64
}

/// Owns the engine, the four type operator sets, and one write lane per
/// logical database. Each operator call already takes a `db: u8` index, so a
/// single set of operators serves all sixteen databases — isolation between
/// them comes from the db-index byte prefixed before the type tag (§3.2).
pub struct Db {
	engine: Engine,
	pub kv: KvOps,
	pub hash: HashOps,
	pub list: ListOps,
	pub zset: ZSetOps,
	write_lanes: Vec<Arc<Mutex<()>>>,
}

impl Db {
	pub fn new(engine: Engine) -> Self {
		let locks = Arc::new(LockManager::new());
		let write_lanes = (0..NUM_DATABASES).map(|_| Arc::new(Mutex::new(()))).collect();
		Self {
			kv: KvOps::new(engine.clone(), locks.clone()),
			hash: HashOps::new(engine.clone(), locks.clone()),
			list: ListOps::new(engine.clone(), locks.clone()),
			zset: ZSetOps::new(engine.clone(), locks),
			engine,
			write_lanes,
		}
	}

	pub async fn open(path: impl AsRef<std::path::Path>) -> Result<Self, EngineError> {
		Ok(Self::new(Engine::open(path).await?))
	}

	fn check_index(db: u8) -> Result<(), StorageError> {
		if db >= NUM_DATABASES {
			return Err(StorageError::DbIndexOutOfRange);
		}
		Ok(())
	}

	/// Acquires `db`'s write lane (§5): every mutating operator call on this
	/// database must hold this guard for the duration of its batch commit,
	/// giving "whole-operator atomicity visible to other writers" on top of
	/// the engine's own per-batch atomicity. Reads never need it.
	pub async fn write_lane(&self, db: u8) -> Result<OwnedMutexGuard<()>, StorageError> {
		Self::check_index(db)?;
		Ok(self.write_lanes[db as usize].clone().lock_owned().await)
	}
}

/// Background task implementing the Sweeper (§4.4): periodically forward-
/// scans each database's `[ExpTime][deadline]…` range for entries due, and
/// invokes the matching type's destructor. Idempotent by construction: a
/// destructor only acts if the key's marker record still exists, so a
/// foreground `Persist` (or a later `Expire` rewriting the TTL record) that
/// wins the race leaves the sweeper with nothing to do.
pub struct Sweeper {
	db: Arc<Db>,
	interval: Duration,
}

impl Sweeper {
	pub fn new(db: Arc<Db>, interval: Duration) -> Self {
		Self { db, interval }
	}

	pub fn spawn(self) -> JoinHandle<()> {
		tokio::spawn(async move { self.run().await })
	}

	async fn run(&self) {
		let mut ticker = tokio::time::interval(self.interval);
		loop {
			ticker.tick().await;
			for db_index in 0..NUM_DATABASES {
				if let Err(err) = self.sweep_once(db_index).await {
					log::warn!("ttl sweep failed for db {db_index}: {err}");
				}
			}
		}
	}

	async fn sweep_once(&self, db_index: u8) -> Result<(), StorageError> {
		let now = now_epoch_secs();
		let start = ExpTimeKey::sweep_bound(db_index, 0);
		let end = ExpTimeKey::sweep_bound(db_index, now + 1);
		let due = self.db.engine.scan_prefix(start, end).await?;

		for (raw_key, _) in due {
			let entry = ExpTimeKey::decode(&raw_key)?;
			let _lane = self.db.write_lane(db_index).await?;
			let adapter = adapter_for(entry.kind, &self.db.kv, &self.db.hash, &self.db.list, &self.db.zset);
			if adapter.exists(db_index, &entry.user_key).await? {
				adapter.destroy(db_index, entry.user_key).await?;
			}
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use bytes::Bytes;

	use super::*;

	async fn test_db() -> Arc<Db> {
		let dir = tempfile::tempdir().unwrap();
		Arc::new(Db::open(dir.into_path()).await.unwrap())
	}

	#[tokio::test]
	async fn select_out_of_range_is_rejected() {
		let db = test_db().await;
		assert!(matches!(db.write_lane(16).await, Err(StorageError::DbIndexOutOfRange)));
		assert!(db.write_lane(15).await.is_ok());
	}

	#[tokio::test]
	async fn write_lane_serializes_concurrent_writers() {
		let db = test_db().await;
		let key = Bytes::from_static(b"k");
		db.kv.set(0, key.clone(), Bytes::from_static(b"1")).await.unwrap();

		let _guard = db.write_lane(0).await.unwrap();
		let db2 = db.clone();
		let key2 = key.clone();
		let handle = tokio::spawn(async move {
			let _lane = db2.write_lane(0).await.unwrap();
			db2.kv.set(0, key2, Bytes::from_static(b"2")).await.unwrap();
		});
		tokio::time::sleep(Duration::from_millis(20)).await;
		assert!(!handle.is_finished());
		drop(_guard);
		handle.await.unwrap();
		assert_eq!(db.kv.get(0, &key).await.unwrap(), Some(Bytes::from_static(b"2")));
	}

	#[tokio::test]
	async fn sweeper_destroys_expired_keys() {
		let db = test_db().await;
		let key = Bytes::from_static(b"k");
		db.kv.set(0, key.clone(), Bytes::from_static(b"v")).await.unwrap();
		db.kv.expire_at(0, &key, now_epoch_secs() as i64 + 1).await.unwrap();

		let sweeper = Sweeper::new(db.clone(), Duration::from_millis(50));
		sweeper.sweep_once(0).await.unwrap();
		assert!(db.kv.exists(0, &key).await.unwrap());

		tokio::time::sleep(Duration::from_secs(2)).await;
		sweeper.sweep_once(0).await.unwrap();
		assert!(!db.kv.exists(0, &key).await.unwrap());
	}
}
