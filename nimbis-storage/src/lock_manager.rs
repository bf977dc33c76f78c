use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::sync::OwnedMutexGuard;

/// Key-level lock manager providing the write-lane serialization of §5.
///
/// Every write operator locks the full set of encoded keys it touches
/// (meta record plus any subrecords) before reading, mutating, and writing
/// back a [`slatedb::WriteBatch`]. This gives whole-operator atomicity
/// without serializing writes across unrelated keys.
pub struct LockManager {
	locks: DashMap<Bytes, Arc<Mutex<()>>>,
}

impl LockManager {
	pub fn new() -> Self {
		Self { locks: DashMap::new() }
	}

	/// Acquires a lock for a single key. Held until the guard is dropped.
	pub async fn lock(&self, key: &Bytes) -> LockGuard {
		let mutex = self.get_or_create_lock(key);
		let guard = mutex.lock_owned().await;
		LockGuard { _guard: guard }
	}

	/// Acquires locks for multiple keys, sorted to keep lock ordering
	/// consistent across callers and avoid deadlocks.
	pub async fn multi_lock(&self, keys: &[Bytes]) -> MultiLockGuard {
		let mut sorted_keys: Vec<_> = keys.to_vec();
		sorted_keys.sort();
		sorted_keys.dedup();

		let mut guards = Vec::with_capacity(sorted_keys.len());
		for key in &sorted_keys {
			let mutex = self.get_or_create_lock(key);
			let guard = mutex.lock_owned().await;
			guards.push(guard);
		}

		MultiLockGuard { _guards: guards }
	}

	fn get_or_create_lock(&self, key: &Bytes) -> Arc<Mutex<()>> {
		self.locks.entry(key.clone()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
	}

	/// Drops locks that are not currently held and have no other references.
	pub fn cleanup_unused_locks(&self) {
		self.locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
	}
}

impl Default for LockManager {
	fn default() -> Self {
		Self::new()
	}
}

pub struct LockGuard {
	_guard: OwnedMutexGuard<()>,
}

pub struct MultiLockGuard {
	_guards: Vec<OwnedMutexGuard<()>>,
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use tokio::time::timeout;

	use super::*;

	#[tokio::test]
	async fn single_lock_excludes_concurrent_holders() {
		let manager = LockManager::new();
		let key = Bytes::from("test_key");

		let guard = manager.lock(&key).await;
		assert!(timeout(Duration::from_millis(10), manager.lock(&key)).await.is_err());

		drop(guard);
		timeout(Duration::from_millis(10), manager.lock(&key)).await.expect("should acquire lock");
	}

	#[tokio::test]
	async fn multi_lock_holds_every_key() {
		let manager = LockManager::new();
		let key1 = Bytes::from("key1");
		let key2 = Bytes::from("key2");

		let guard = manager.multi_lock(&[key1.clone(), key2.clone()]).await;
		assert!(timeout(Duration::from_millis(10), manager.lock(&key1)).await.is_err());
		assert!(timeout(Duration::from_millis(10), manager.lock(&key2)).await.is_err());

		drop(guard);
		timeout(Duration::from_millis(10), manager.lock(&key1)).await.expect("should acquire lock");
		timeout(Duration::from_millis(10), manager.lock(&key2)).await.expect("should acquire lock");
	}

	#[tokio::test]
	async fn multi_lock_ordering_avoids_deadlock() {
		let manager = LockManager::new();
		let key1 = Bytes::from("aaa");
		let key2 = Bytes::from("zzz");

		let guard1 = manager.multi_lock(&[key2.clone(), key1.clone()]).await;
		drop(guard1);
		let guard2 = manager.multi_lock(&[key1.clone(), key2.clone()]).await;
		drop(guard2);
	}

	#[tokio::test]
	async fn cleanup_removes_unheld_locks() {
		let manager = LockManager::new();
		let key = Bytes::from("test_key");

		{
			let _guard = manager.lock(&key).await;
			assert_eq!(manager.locks.len(), 1);
		}
		assert_eq!(manager.locks.len(), 1);

		manager.cleanup_unused_locks();
		assert_eq!(manager.locks.len(), 0);
	}

	#[tokio::test]
	async fn different_keys_do_not_block_each_other() {
		let manager = Arc::new(LockManager::new());
		let key1 = Bytes::from("key1");
		let key2 = Bytes::from("key2");

		let m1 = manager.clone();
		let k1 = key1.clone();
		let h1 = tokio::spawn(async move {
			let _guard = m1.lock(&k1).await;
			tokio::time::sleep(Duration::from_millis(50)).await;
		});

		let m2 = manager.clone();
		let k2 = key2.clone();
		let h2 = tokio::spawn(async move {
			let _guard = m2.lock(&k2).await;
			tokio::time::sleep(Duration::from_millis(50)).await;
		});

		let result = timeout(Duration::from_millis(100), async {
			h1.await.unwrap();
			h2.await.unwrap();
		})
		.await;
		assert!(result.is_ok(), "different keys should not block each other");
	}
}
