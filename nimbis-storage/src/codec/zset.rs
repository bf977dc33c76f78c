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

/// `[db][ZSize][userKey] -> ZSetSizeValue`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZSetSizeKey {
	pub db: u8,
	pub user_key: Bytes,
}

impl ZSetSizeKey {
	pub fn new(db: u8, user_key: impl Into<Bytes>) -> Result<Self, StorageError> {
		let user_key = user_key.into();
		check_key_len(&user_key)?;
		Ok(Self { db, user_key })
	}

	pub fn encode(&self) -> Bytes {
		let mut buf = header(self.db, RecordTag::ZSize, self.user_key.len());
		buf.extend_from_slice(&self.user_key);
		buf.freeze()
	}

	pub fn decode(bytes: &[u8]) -> Result<Self, DecoderError> {
		let (db, rest) = split_header(bytes, RecordTag::ZSize)?;
		Ok(Self { db, user_key: Bytes::copy_from_slice(rest) })
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZSetSizeValue(pub i64);

impl ZSetSizeValue {
	pub fn encode(&self) -> Bytes {
		Bytes::copy_from_slice(&self.0.to_be_bytes())
	}

	pub fn decode(bytes: &[u8]) -> Result<Self, DecoderError> {
		let arr: [u8; 8] = bytes.try_into().map_err(|_| DecoderError::Malformed("zset size value must be 8 bytes"))?;
		Ok(Self(i64::from_be_bytes(arr)))
	}
}

/// `[db][ZSetField][u16 len][userKey][member] -> biased score`. This is the
/// lookup direction: member -> score, used by ZSCORE/ZINCRBY/ZADD to find a
/// member's current score without a range scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZSetFieldKey {
	pub db: u8,
	pub user_key: Bytes,
	pub member: Bytes,
}

impl ZSetFieldKey {
	pub fn new(db: u8, user_key: impl Into<Bytes>, member: impl Into<Bytes>) -> Result<Self, StorageError> {
		let user_key = user_key.into();
		check_key_len(&user_key)?;
		Ok(Self { db, user_key, member: member.into() })
	}

	pub fn encode(&self) -> Bytes {
		let mut buf = header(self.db, RecordTag::ZSetField, 2 + self.user_key.len() + self.member.len());
		buf.put_u16(self.user_key.len() as u16);
		buf.extend_from_slice(&self.user_key);
		buf.extend_from_slice(&self.member);
		buf.freeze()
	}

	pub fn prefix(db: u8, user_key: &[u8]) -> Bytes {
		let mut buf = header(db, RecordTag::ZSetField, 2 + user_key.len());
		buf.put_u16(user_key.len() as u16);
		buf.extend_from_slice(user_key);
		buf.freeze()
	}

	pub fn decode(bytes: &[u8]) -> Result<Self, DecoderError> {
		let (db, rest) = split_header(bytes, RecordTag::ZSetField)?;
		let (user_key, member) = take_len_prefixed(rest)?;
		Ok(Self { db, user_key, member: Bytes::copy_from_slice(member) })
	}
}

/// Value of a [`ZSetFieldKey`]: the member's current score.
pub fn encode_score(score: i64) -> Bytes {
	Bytes::copy_from_slice(&score.to_be_bytes())
}

pub fn decode_score(bytes: &[u8]) -> Result<i64, DecoderError> {
	let arr: [u8; 8] = bytes.try_into().map_err(|_| DecoderError::Malformed("zset score value must be 8 bytes"))?;
	Ok(i64::from_be_bytes(arr))
}

/// `[db][ZSetScore][u16 len][userKey][biased score][member] -> empty`. This
/// is the range direction: iterating it in key order yields members ordered
/// by score, then by member for ties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZSetScoreKey {
	pub db: u8,
	pub user_key: Bytes,
	pub score: i64,
	pub member: Bytes,
}

impl ZSetScoreKey {
	pub fn new(db: u8, user_key: impl Into<Bytes>, score: i64, member: impl Into<Bytes>) -> Result<Self, StorageError> {
		let user_key = user_key.into();
		check_key_len(&user_key)?;
		Ok(Self { db, user_key, score, member: member.into() })
	}

	pub fn encode(&self) -> Bytes {
		let mut buf = header(self.db, RecordTag::ZSetScore, 2 + self.user_key.len() + 8 + self.member.len());
		buf.put_u16(self.user_key.len() as u16);
		buf.extend_from_slice(&self.user_key);
		buf.extend_from_slice(&bias_i64(self.score));
		buf.extend_from_slice(&self.member);
		buf.freeze()
	}

	/// Prefix matching every (score, member) pair of `user_key`.
	pub fn prefix(db: u8, user_key: &[u8]) -> Bytes {
		let mut buf = header(db, RecordTag::ZSetScore, 2 + user_key.len());
		buf.put_u16(user_key.len() as u16);
		buf.extend_from_slice(user_key);
		buf.freeze()
	}

	/// Prefix matching every (score, member) pair with a score of exactly
	/// `score`, used to build range-scan boundaries.
	pub fn score_prefix(db: u8, user_key: &[u8], score: i64) -> Bytes {
		let mut buf = header(db, RecordTag::ZSetScore, 2 + user_key.len() + 8);
		buf.put_u16(user_key.len() as u16);
		buf.extend_from_slice(user_key);
		buf.extend_from_slice(&bias_i64(score));
		buf.freeze()
	}

	pub fn decode(bytes: &[u8]) -> Result<Self, DecoderError> {
		let (db, rest) = split_header(bytes, RecordTag::ZSetScore)?;
		let (user_key, tail) = take_len_prefixed(rest)?;
		if tail.len() < 8 {
			return Err(DecoderError::Malformed("zset score key missing score"));
		}
		let (score_bytes, member) = tail.split_at(8);
		let score_arr: [u8; 8] = score_bytes.try_into().unwrap();
		Ok(Self { db, user_key, score: unbias_i64(score_arr), member: Bytes::copy_from_slice(member) })
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	#[test]
	fn field_key_round_trips() {
		let key = ZSetFieldKey::new(0, Bytes::from_static(b"z"), Bytes::from_static(b"m1")).unwrap();
		assert_eq!(ZSetFieldKey::decode(&key.encode()).unwrap(), key);
	}

	#[rstest]
	#[case(0)]
	#[case(-100)]
	#[case(100)]
	#[case(i64::MIN)]
	#[case(i64::MAX)]
	fn score_key_round_trips(#[case] score: i64) {
		let key = ZSetScoreKey::new(1, Bytes::from_static(b"z"), score, Bytes::from_static(b"m1")).unwrap();
		assert_eq!(ZSetScoreKey::decode(&key.encode()).unwrap(), key);
	}

	#[test]
	fn biased_score_preserves_numeric_order() {
		let low = ZSetScoreKey::new(0, Bytes::from_static(b"z"), -5, Bytes::from_static(b"a")).unwrap().encode();
		let high = ZSetScoreKey::new(0, Bytes::from_static(b"z"), 5, Bytes::from_static(b"a")).unwrap().encode();
		assert!(low < high);
	}

	#[test]
	fn ties_break_on_member() {
		let a = ZSetScoreKey::new(0, Bytes::from_static(b"z"), 5, Bytes::from_static(b"a")).unwrap().encode();
		let b = ZSetScoreKey::new(0, Bytes::from_static(b"z"), 5, Bytes::from_static(b"b")).unwrap().encode();
		assert!(a < b);
	}

	#[test]
	fn score_value_round_trips() {
		assert_eq!(decode_score(&encode_score(-42)).unwrap(), -42);
	}
}
