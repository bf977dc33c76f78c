use bytes::Bytes;

use super::common::check_key_len;
use super::common::header;
use super::common::split_header;
use crate::error::DecoderError;
use crate::error::StorageError;
use crate::tag::RecordTag;

/// `[db][Kv][userKey] -> value`. The value is stored verbatim; there is no
/// separate meta record for the KV type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvKey {
	pub db: u8,
	pub user_key: Bytes,
}

impl KvKey {
	pub fn new(db: u8, user_key: impl Into<Bytes>) -> Result<Self, StorageError> {
		let user_key = user_key.into();
		check_key_len(&user_key)?;
		Ok(Self { db, user_key })
	}

	pub fn encode(&self) -> Bytes {
		let mut buf = header(self.db, RecordTag::Kv, self.user_key.len());
		buf.extend_from_slice(&self.user_key);
		buf.freeze()
	}

	pub fn decode(bytes: &[u8]) -> Result<Self, DecoderError> {
		let (db, rest) = split_header(bytes, RecordTag::Kv)?;
		Ok(Self { db, user_key: Bytes::copy_from_slice(rest) })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trips() {
		let key = KvKey::new(3, Bytes::from_static(b"hello")).unwrap();
		let encoded = key.encode();
		let decoded = KvKey::decode(&encoded).unwrap();
		assert_eq!(decoded, key);
	}

	#[test]
	fn rejects_oversized_key() {
		let huge = vec![0u8; 70_000];
		assert!(matches!(KvKey::new(0, huge), Err(StorageError::KeyTooLarge)));
	}

	#[test]
	fn decode_rejects_wrong_tag() {
		let mut bytes = vec![0u8, b'h'];
		bytes.extend_from_slice(b"x");
		assert!(matches!(KvKey::decode(&bytes), Err(DecoderError::WrongTag)));
	}
}
