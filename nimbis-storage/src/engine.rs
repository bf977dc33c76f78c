//! Thin wrapper around the ordered key-value engine (§6.1). The engine
//! itself — SlateDB, an LSM store with snapshot isolation and a forward
//! range-scan cursor — is a black box collaborator; this module only adapts
//! its API to the shapes the rest of the crate needs: point get/put/delete,
//! atomic batches, and a materialized forward range scan capped by a
//! concurrent-iterator budget.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use slatedb::Db;
use slatedb::WriteBatch;
use slatedb::config::WriteOptions;
use slatedb::object_store::ObjectStore;
use slatedb::object_store::local::LocalFileSystem;
use tokio::sync::Semaphore;

use crate::error::EngineError;

/// How many range scans may be open against the engine at once. Bounds
/// memory used by materialized scans under concurrent load (§5).
const DEFAULT_MAX_OPEN_ITERATORS: usize = 64;

fn write_opts() -> WriteOptions {
	WriteOptions { await_durable: false }
}

/// Owns the single `Arc<Db>` handle for the whole keyspace. All sixteen
/// logical databases (§4.5) and all four data types share it; isolation
/// between them comes entirely from the key tag/db-index prefix, not from
/// separate column families.
#[derive(Clone)]
pub struct Engine {
	db: Arc<Db>,
	scan_permits: Arc<Semaphore>,
}

impl Engine {
	pub fn new(db: Arc<Db>) -> Self {
		Self { db, scan_permits: Arc::new(Semaphore::new(DEFAULT_MAX_OPEN_ITERATORS)) }
	}

	/// Opens a SlateDB instance backed by the local filesystem at `path`.
	pub async fn open(path: impl AsRef<Path>) -> Result<Self, EngineError> {
		let object_store: Arc<dyn ObjectStore> =
			Arc::new(LocalFileSystem::new_with_prefix(path).map_err(|e| EngineError::Backend(e.to_string()))?);
		let db_path = slatedb::object_store::path::Path::from("/");
		let db = Db::open(db_path, object_store).await.map_err(|e| EngineError::Backend(e.to_string()))?;
		Ok(Self::new(Arc::new(db)))
	}

	pub async fn get(&self, key: &[u8]) -> Result<Option<Bytes>, EngineError> {
		self.db.get(key).await.map_err(|e| EngineError::Backend(e.to_string()))
	}

	pub async fn put(&self, key: Bytes, value: Bytes) -> Result<(), EngineError> {
		self.db.put_with_options(key, value, &Default::default(), &write_opts()).await.map_err(|e| EngineError::Backend(e.to_string()))
	}

	pub async fn delete(&self, key: Bytes) -> Result<(), EngineError> {
		self.db.delete_with_options(key, &write_opts()).await.map_err(|e| EngineError::Backend(e.to_string()))
	}

	/// Applies a batch of puts/deletes atomically.
	pub async fn write(&self, batch: WriteBatch) -> Result<(), EngineError> {
		self.db.write_with_options(batch, &write_opts()).await.map_err(|e| EngineError::Backend(e.to_string()))
	}

	/// Scans every key in `[start, end)` and materializes the result,
	/// honoring the open-iterator budget for the duration of the scan.
	pub async fn scan_prefix(&self, start: Bytes, end: Bytes) -> Result<Vec<(Bytes, Bytes)>, EngineError> {
		let _permit = self.scan_permits.acquire().await.expect("semaphore never closed");
		let mut out = Vec::new();
		let mut stream = self.db.scan(start.as_ref()..end.as_ref()).await.map_err(|e| EngineError::Backend(e.to_string()))?;
		while let Some(kv) = stream.next().await.map_err(|e| EngineError::Backend(e.to_string()))? {
			out.push((kv.key, kv.value));
		}
		Ok(out)
	}
}

/// Lexicographically smallest byte string strictly greater than every
/// string with `prefix` as a prefix: `prefix` with its last byte
/// incremented, trimming trailing `0xff` bytes first. Used to turn a key
/// prefix into a scan's exclusive upper bound.
pub fn prefix_upper_bound(prefix: &[u8]) -> Bytes {
	let mut bound = prefix.to_vec();
	while let Some(&last) = bound.last() {
		if last == 0xff {
			bound.pop();
		} else {
			*bound.last_mut().unwrap() += 1;
			return Bytes::from(bound);
		}
	}
	// prefix was empty or all 0xff: unbounded above.
	Bytes::from(vec![0xff; prefix.len() + 1])
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn prefix_upper_bound_increments_last_byte() {
		assert_eq!(prefix_upper_bound(b"ab"), Bytes::from_static(b"ac"));
	}

	#[test]
	fn prefix_upper_bound_trims_trailing_ff() {
		assert_eq!(prefix_upper_bound(&[0x01, 0xff]), Bytes::from(vec![0x02]));
	}
}
