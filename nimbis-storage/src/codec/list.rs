use bytes::Buf;
use bytes::BufMut;
use bytes::Bytes;

use super::common::bias_i64;
use super::common::check_key_len;
use super::common::header;
use super::common::split_header;
use super::common::take_len_prefixed;
use super::common::unbias_i64;
use crate::error::DecoderError;
use crate::error::StorageError;
use crate::tag::RecordTag;

/// Starting sequence number for a list's first element: the true midpoint of
/// the `i64` range, giving both LPUSH and RPUSH the maximum possible
/// headroom before [`StorageError::ListFull`].
pub const INITIAL_SEQ: i64 = 0;

/// `[db][LMeta][userKey] -> ListMetaValue`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListMetaKey {
	pub db: u8,
	pub user_key: Bytes,
}

impl ListMetaKey {
	pub fn new(db: u8, user_key: impl Into<Bytes>) -> Result<Self, StorageError> {
		let user_key = user_key.into();
		check_key_len(&user_key)?;
		Ok(Self { db, user_key })
	}

	pub fn encode(&self) -> Bytes {
		let mut buf = header(self.db, RecordTag::LMeta, self.user_key.len());
		buf.extend_from_slice(&self.user_key);
		buf.freeze()
	}

	pub fn decode(bytes: &[u8]) -> Result<Self, DecoderError> {
		let (db, rest) = split_header(bytes, RecordTag::LMeta)?;
		Ok(Self { db, user_key: Bytes::copy_from_slice(rest) })
	}
}

/// Value of a [`ListMetaKey`]: the inclusive `[head, tail]` sequence range
/// currently occupied, each an int64. Length is `tail - head + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListMetaValue {
	pub head: i64,
	pub tail: i64,
}

impl ListMetaValue {
	pub fn len(&self) -> i64 {
		self.tail - self.head + 1
	}

	pub fn encode(&self) -> Bytes {
		let mut buf = bytes::BytesMut::with_capacity(16);
		buf.put_i64(self.head);
		buf.put_i64(self.tail);
		buf.freeze()
	}

	pub fn decode(bytes: &[u8]) -> Result<Self, DecoderError> {
		if bytes.len() != 16 {
			return Err(DecoderError::Malformed("list meta value must be 16 bytes"));
		}
		let mut buf = bytes;
		let head = buf.get_i64();
		let tail = buf.get_i64();
		Ok(Self { head, tail })
	}

	/// Returns the sequence to assign to a new left-pushed element, or
	/// `ErrListFull` if the sequence space on that side is exhausted.
	pub fn push_left(&mut self) -> Result<i64, StorageError> {
		let next = self.head.checked_sub(1).ok_or(StorageError::ListFull)?;
		self.head = next;
		Ok(next)
	}

	/// Returns the sequence to assign to a new right-pushed element, or
	/// `ErrListFull` if the sequence space on that side is exhausted.
	pub fn push_right(&mut self) -> Result<i64, StorageError> {
		let next = self.tail.checked_add(1).ok_or(StorageError::ListFull)?;
		self.tail = next;
		Ok(next)
	}
}

/// `[db][LElem][u16 len][userKey][biased seq] -> element`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListElemKey {
	pub db: u8,
	pub user_key: Bytes,
	pub seq: i64,
}

impl ListElemKey {
	pub fn new(db: u8, user_key: impl Into<Bytes>, seq: i64) -> Result<Self, StorageError> {
		let user_key = user_key.into();
		check_key_len(&user_key)?;
		Ok(Self { db, user_key, seq })
	}

	pub fn encode(&self) -> Bytes {
		let mut buf = header(self.db, RecordTag::LElem, 2 + self.user_key.len() + 8);
		buf.put_u16(self.user_key.len() as u16);
		buf.extend_from_slice(&self.user_key);
		buf.extend_from_slice(&bias_i64(self.seq));
		buf.freeze()
	}

	/// Prefix matching every element of `user_key`: `[db][LElem][u16 len][userKey]`.
	pub fn prefix(db: u8, user_key: &[u8]) -> Bytes {
		let mut buf = header(db, RecordTag::LElem, 2 + user_key.len());
		buf.put_u16(user_key.len() as u16);
		buf.extend_from_slice(user_key);
		buf.freeze()
	}

	pub fn decode(bytes: &[u8]) -> Result<Self, DecoderError> {
		let (db, rest) = split_header(bytes, RecordTag::LElem)?;
		let (user_key, tail) = take_len_prefixed(rest)?;
		let seq_bytes: [u8; 8] = tail.try_into().map_err(|_| DecoderError::Malformed("list element key missing seq"))?;
		Ok(Self { db, user_key, seq: unbias_i64(seq_bytes) })
	}
}
