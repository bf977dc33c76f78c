use bytes::Buf;
use bytes::BufMut;
use bytes::Bytes;

use super::common::check_key_len;
use super::common::header;
use super::common::split_header;
use super::common::take_len_prefixed;
use crate::error::DecoderError;
use crate::error::StorageError;
use crate::tag::RecordTag;

/// `[db][HSize][userKey] -> HashSizeValue`. Absence means the hash does not
/// exist; a zero-length value is never stored (the record is deleted
/// instead, per the "size 0 => no record" invariant).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashSizeKey {
	pub db: u8,
	pub user_key: Bytes,
}

impl HashSizeKey {
	pub fn new(db: u8, user_key: impl Into<Bytes>) -> Result<Self, StorageError> {
		let user_key = user_key.into();
		check_key_len(&user_key)?;
		Ok(Self { db, user_key })
	}

	pub fn encode(&self) -> Bytes {
		let mut buf = header(self.db, RecordTag::HSize, self.user_key.len());
		buf.extend_from_slice(&self.user_key);
		buf.freeze()
	}

	pub fn decode(bytes: &[u8]) -> Result<Self, DecoderError> {
		let (db, rest) = split_header(bytes, RecordTag::HSize)?;
		Ok(Self { db, user_key: Bytes::copy_from_slice(rest) })
	}
}

/// Value of a [`HashSizeKey`]: the field count, as an 8-byte big-endian i64.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashSizeValue(pub i64);

impl HashSizeValue {
	pub fn encode(&self) -> Bytes {
		Bytes::copy_from_slice(&self.0.to_be_bytes())
	}

	pub fn decode(bytes: &[u8]) -> Result<Self, DecoderError> {
		let arr: [u8; 8] = bytes.try_into().map_err(|_| DecoderError::Malformed("hash size value must be 8 bytes"))?;
		Ok(Self(i64::from_be_bytes(arr)))
	}
}

/// `[db][HField][u16 len][userKey][field] -> fieldValue`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashFieldKey {
	pub db: u8,
	pub user_key: Bytes,
	pub field: Bytes,
}

impl HashFieldKey {
	pub fn new(db: u8, user_key: impl Into<Bytes>, field: impl Into<Bytes>) -> Result<Self, StorageError> {
		let user_key = user_key.into();
		check_key_len(&user_key)?;
		Ok(Self { db, user_key, field: field.into() })
	}

	pub fn encode(&self) -> Bytes {
		let mut buf = header(self.db, RecordTag::HField, 2 + self.user_key.len() + self.field.len());
		buf.put_u16(self.user_key.len() as u16);
		buf.extend_from_slice(&self.user_key);
		buf.extend_from_slice(&self.field);
		buf.freeze()
	}

	/// Prefix matching every field of `user_key`: `[db][HField][u16 len][userKey]`.
	pub fn prefix(db: u8, user_key: &[u8]) -> Bytes {
		let mut buf = header(db, RecordTag::HField, 2 + user_key.len());
		buf.put_u16(user_key.len() as u16);
		buf.extend_from_slice(user_key);
		buf.freeze()
	}

	pub fn decode(bytes: &[u8]) -> Result<Self, DecoderError> {
		let (db, rest) = split_header(bytes, RecordTag::HField)?;
		let (user_key, field) = take_len_prefixed(rest)?;
		Ok(Self { db, user_key, field: Bytes::copy_from_slice(field) })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn size_key_round_trips() {
		let key = HashSizeKey::new(1, Bytes::from_static(b"myhash")).unwrap();
		assert_eq!(HashSizeKey::decode(&key.encode()).unwrap(), key);
	}

	#[test]
	fn size_value_round_trips() {
		let value = HashSizeValue(42i64);
		assert_eq!(HashSizeValue::decode(&value.encode()).unwrap(), value);
	}

	#[test]
	fn field_key_round_trips() {
		let key = HashFieldKey::new(1, Bytes::from_static(b"myhash"), Bytes::from_static(b"field1")).unwrap();
		let decoded = HashFieldKey::decode(&key.encode()).unwrap();
		assert_eq!(decoded, key);
	}

	#[test]
	fn field_keys_sort_by_user_key_then_field() {
		let a = HashFieldKey::new(0, Bytes::from_static(b"a"), Bytes::from_static(b"z")).unwrap().encode();
		let b = HashFieldKey::new(0, Bytes::from_static(b"ab"), Bytes::from_static(b"a")).unwrap().encode();
		assert!(a < b);
	}
}
