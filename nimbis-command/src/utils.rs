use bytes::Bytes;
use nimbis_storage::StorageError;
use resp::RespValue;

pub fn parse_int(arg: &Bytes) -> Result<i64, String> {
	std::str::from_utf8(arg).ok().and_then(|s| s.parse::<i64>().ok()).ok_or_else(|| "ERR value is not an integer or out of range".to_string())
}

/// Maps a `StorageError` to its RESP reply. `WRONGTYPE` carries its own
/// error code per the Redis convention; everything else gets the generic
/// `ERR` prefix.
pub fn storage_err(err: StorageError) -> RespValue {
	match err {
		StorageError::WrongType => RespValue::error(err.to_string()),
		other => RespValue::error(format!("ERR {other}")),
	}
}

pub fn bulk_or_null(value: Option<Bytes>) -> RespValue {
	match value {
		Some(bytes) => RespValue::bulk_string(bytes),
		None => RespValue::Null,
	}
}
