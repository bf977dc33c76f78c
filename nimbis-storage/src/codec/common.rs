use bytes::Buf;
use bytes::BufMut;
use bytes::Bytes;
use bytes::BytesMut;

use crate::error::DecoderError;
use crate::error::StorageError;
use crate::tag::MAX_USER_KEY_LEN;
use crate::tag::RecordTag;

/// Validates a user key against the §4.1 length bound before it is encoded.
pub fn check_key_len(user_key: &[u8]) -> Result<(), StorageError> {
	if user_key.len() > MAX_USER_KEY_LEN {
		return Err(StorageError::KeyTooLarge);
	}
	Ok(())
}

/// Starts a key buffer with the `[db][tag]` header shared by every record.
pub fn header(db: u8, tag: RecordTag, extra_capacity: usize) -> BytesMut {
	let mut buf = BytesMut::with_capacity(2 + extra_capacity);
	buf.put_u8(db);
	buf.put_u8(tag as u8);
	buf
}

/// Splits off and validates the `[db][tag]` header, returning the db index
/// and the remaining bytes.
pub fn split_header<'a>(bytes: &'a [u8], expected: RecordTag) -> Result<(u8, &'a [u8]), DecoderError> {
	if bytes.is_empty() {
		return Err(DecoderError::Empty);
	}
	if bytes.len() < 2 {
		return Err(DecoderError::Malformed("key shorter than header"));
	}
	let db = bytes[0];
	if bytes[1] != expected as u8 {
		return Err(DecoderError::WrongTag);
	}
	Ok((db, &bytes[2..]))
}

/// Reads a `[u16 len][bytes]` segment, returning the segment and the rest.
pub fn take_len_prefixed(mut rest: &[u8]) -> Result<(Bytes, &[u8]), DecoderError> {
	if rest.len() < 2 {
		return Err(DecoderError::Malformed("missing length prefix"));
	}
	let len = rest.get_u16() as usize;
	if rest.len() < len {
		return Err(DecoderError::Malformed("length prefix overruns buffer"));
	}
	let (head, tail) = rest.split_at(len);
	Ok((Bytes::copy_from_slice(head), tail))
}

/// Biases a signed 32-bit integer so unsigned lexical byte order matches
/// signed numeric order (flips the sign bit).
pub fn bias_i32(v: i32) -> [u8; 4] {
	((v as u32) ^ 0x8000_0000).to_be_bytes()
}

pub fn unbias_i32(bytes: [u8; 4]) -> i32 {
	(u32::from_be_bytes(bytes) ^ 0x8000_0000) as i32
}

/// Biases a signed 64-bit integer so unsigned lexical byte order matches
/// signed numeric order (flips the sign bit). Used for ZSet scores.
pub fn bias_i64(v: i64) -> [u8; 8] {
	((v as u64) ^ 0x8000_0000_0000_0000).to_be_bytes()
}

pub fn unbias_i64(bytes: [u8; 8]) -> i64 {
	(u64::from_be_bytes(bytes) ^ 0x8000_0000_0000_0000) as i64
}
