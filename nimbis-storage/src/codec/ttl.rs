use bytes::Buf;
use bytes::BufMut;
use bytes::Bytes;

use super::common::check_key_len;
use super::common::header;
use super::common::split_header;
use crate::error::DecoderError;
use crate::error::StorageError;
use crate::tag::DataKind;
use crate::tag::RecordTag;

/// `[db][ExpMeta][kind][userKey] -> deadline`. Looked up by Expire/TTL/Persist
/// to find (and remove) the record's current deadline, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpMetaKey {
	pub db: u8,
	pub kind: DataKind,
	pub user_key: Bytes,
}

impl ExpMetaKey {
	pub fn new(db: u8, kind: DataKind, user_key: impl Into<Bytes>) -> Result<Self, StorageError> {
		let user_key = user_key.into();
		check_key_len(&user_key)?;
		Ok(Self { db, kind, user_key })
	}

	pub fn encode(&self) -> Bytes {
		let mut buf = header(self.db, RecordTag::ExpMeta, 1 + self.user_key.len());
		buf.put_u8(self.kind as u8);
		buf.extend_from_slice(&self.user_key);
		buf.freeze()
	}

	pub fn decode(bytes: &[u8]) -> Result<Self, DecoderError> {
		let (db, rest) = split_header(bytes, RecordTag::ExpMeta)?;
		if rest.is_empty() {
			return Err(DecoderError::Malformed("exp meta key missing kind byte"));
		}
		let kind = DataKind::from_u8(rest[0]).ok_or(DecoderError::Malformed("exp meta key has unknown kind byte"))?;
		Ok(Self { db, kind, user_key: Bytes::copy_from_slice(&rest[1..]) })
	}
}

/// Value of an [`ExpMetaKey`]: the absolute deadline, epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpMetaValue(pub u64);

impl ExpMetaValue {
	pub fn encode(&self) -> Bytes {
		Bytes::copy_from_slice(&self.0.to_be_bytes())
	}

	pub fn decode(bytes: &[u8]) -> Result<Self, DecoderError> {
		let arr: [u8; 8] = bytes.try_into().map_err(|_| DecoderError::Malformed("exp meta value must be 8 bytes"))?;
		Ok(Self(u64::from_be_bytes(arr)))
	}
}

/// `[db][ExpTime][deadline][kind][userKey] -> empty`. Unsigned big-endian
/// deadlines sort chronologically, so the Sweeper walks this record family
/// in order and stops at the first deadline still in the future.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpTimeKey {
	pub db: u8,
	pub deadline: u64,
	pub kind: DataKind,
	pub user_key: Bytes,
}

impl ExpTimeKey {
	pub fn new(db: u8, deadline: u64, kind: DataKind, user_key: impl Into<Bytes>) -> Result<Self, StorageError> {
		let user_key = user_key.into();
		check_key_len(&user_key)?;
		Ok(Self { db, deadline, kind, user_key })
	}

	pub fn encode(&self) -> Bytes {
		let mut buf = header(self.db, RecordTag::ExpTime, 8 + 1 + self.user_key.len());
		buf.put_u64(self.deadline);
		buf.put_u8(self.kind as u8);
		buf.extend_from_slice(&self.user_key);
		buf.freeze()
	}

	/// Prefix bounding the sweep to deadlines strictly before `deadline`.
	pub fn sweep_bound(db: u8, deadline: u64) -> Bytes {
		let mut buf = header(db, RecordTag::ExpTime, 8);
		buf.put_u64(deadline);
		buf.freeze()
	}

	pub fn decode(bytes: &[u8]) -> Result<Self, DecoderError> {
		let (db, rest) = split_header(bytes, RecordTag::ExpTime)?;
		if rest.len() < 9 {
			return Err(DecoderError::Malformed("exp time key too short"));
		}
		let mut buf = rest;
		let deadline = buf.get_u64();
		let kind_byte = buf.get_u8();
		let kind = DataKind::from_u8(kind_byte).ok_or(DecoderError::Malformed("exp time key has unknown kind byte"))?;
		Ok(Self { db, deadline, kind, user_key: Bytes::copy_from_slice(buf) })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn meta_key_round_trips() {
		let key = ExpMetaKey::new(4, DataKind::Hash, Bytes::from_static(b"myhash")).unwrap();
		assert_eq!(ExpMetaKey::decode(&key.encode()).unwrap(), key);
	}

	#[test]
	fn meta_value_round_trips() {
		let value = ExpMetaValue(1_800_000_000);
		assert_eq!(ExpMetaValue::decode(&value.encode()).unwrap(), value);
	}

	#[test]
	fn time_key_round_trips() {
		let key = ExpTimeKey::new(0, 42, DataKind::List, Bytes::from_static(b"mylist")).unwrap();
		assert_eq!(ExpTimeKey::decode(&key.encode()).unwrap(), key);
	}

	#[test]
	fn deadlines_sort_chronologically() {
		let earlier = ExpTimeKey::new(0, 10, DataKind::Kv, Bytes::from_static(b"a")).unwrap().encode();
		let later = ExpTimeKey::new(0, 20, DataKind::Kv, Bytes::from_static(b"a")).unwrap().encode();
		assert!(earlier < later);
	}
}
