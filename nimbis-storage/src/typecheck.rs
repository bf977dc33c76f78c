//! Cross-type WRONGTYPE detection (§7: `ErrWrongType`).
//!
//! Each data type owns its own tag namespace rather than sharing one
//! value-tagged slot, so "does this key already hold a different type" is
//! answered by probing the other three types' marker records at the same
//! user key rather than reading a shared type byte.

use bytes::Bytes;

use crate::codec::hash::HashSizeKey;
use crate::codec::kv::KvKey;
use crate::codec::list::ListMetaKey;
use crate::codec::zset::ZSetSizeKey;
use crate::engine::Engine;
use crate::error::StorageError;
use crate::tag::DataKind;

/// Fails with `ErrWrongType` if `user_key` already holds a marker record for
/// any data kind other than `want`.
pub async fn ensure_kind(engine: &Engine, db: u8, user_key: &Bytes, want: DataKind) -> Result<(), StorageError> {
	if want != DataKind::Kv && engine.get(&KvKey::new(db, user_key.clone())?.encode()).await?.is_some() {
		return Err(StorageError::WrongType);
	}
	if want != DataKind::Hash && engine.get(&HashSizeKey::new(db, user_key.clone())?.encode()).await?.is_some() {
		return Err(StorageError::WrongType);
	}
	if want != DataKind::List && engine.get(&ListMetaKey::new(db, user_key.clone())?.encode()).await?.is_some() {
		return Err(StorageError::WrongType);
	}
	if want != DataKind::ZSet && engine.get(&ZSetSizeKey::new(db, user_key.clone())?.encode()).await?.is_some() {
		return Err(StorageError::WrongType);
	}
	Ok(())
}
