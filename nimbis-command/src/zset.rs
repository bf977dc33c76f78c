//! Sorted-set commands (§4.3.4): `ZADD, ZREM, ZSCORE, ZCARD, ZINCRBY, ZRANGE,
//! ZREVRANGE, ZRANGEBYSCORE, ZREVRANGEBYSCORE, ZCOUNT, ZRANK, ZREVRANK,
//! ZREMRANGEBYRANK, ZREMRANGEBYSCORE, ZCLEAR, ZEXPIRE, ZTTL, ZPERSIST`.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use nimbis_storage::Db;
use nimbis_storage::ScoreRange;
use resp::RespValue;

use crate::cmd_meta::CmdMeta;
use crate::cmd_trait::Cmd;
use crate::utils::parse_int;
use crate::utils::storage_err;

macro_rules! simple_cmd {
	($struct_name:ident, $name:literal, $arity:expr) => {
		pub struct $struct_name {
			meta: CmdMeta,
		}

		impl Default for $struct_name {
			fn default() -> Self {
				Self { meta: CmdMeta { name: $name.to_string(), arity: $arity } }
			}
		}
	};
}

fn members_with_scores(pairs: Vec<(Bytes, i64)>) -> RespValue {
	RespValue::array(pairs.into_iter().flat_map(|(member, score)| [RespValue::bulk_string(member), RespValue::bulk_string(score.to_string())]))
}

/// Parses one `ZRANGEBYSCORE`-family bound, mapping the `+inf`/`-inf`
/// sentinels (§4.3.4) to `i64::MAX`/`i64::MIN` rather than requiring a
/// literal integer.
fn parse_score_bound(raw: &Bytes) -> Result<i64, String> {
	match std::str::from_utf8(raw).ok() {
		Some("+inf") => Ok(i64::MAX),
		Some("-inf") => Ok(i64::MIN),
		_ => parse_int(raw),
	}
}

fn parse_score_range(min: &Bytes, max: &Bytes) -> Result<ScoreRange, String> {
	Ok(ScoreRange { min: parse_score_bound(min)?, max: parse_score_bound(max)? })
}

simple_cmd!(ZAddCmd, "ZADD", 4);

#[async_trait]
impl Cmd for ZAddCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		let score = match parse_int(&args[1]) {
			Ok(n) => n,
			Err(e) => return RespValue::error(e),
		};
		let _lane = match db.write_lane(db_index).await {
			Ok(lane) => lane,
			Err(e) => return storage_err(e),
		};
		match db.zset.zadd(db_index, args[0].clone(), args[2].clone(), score).await {
			Ok(n) => RespValue::integer(n),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(ZIncrByCmd, "ZINCRBY", 4);

#[async_trait]
impl Cmd for ZIncrByCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		let delta = match parse_int(&args[1]) {
			Ok(n) => n,
			Err(e) => return RespValue::error(e),
		};
		let _lane = match db.write_lane(db_index).await {
			Ok(lane) => lane,
			Err(e) => return storage_err(e),
		};
		match db.zset.zincrby(db_index, args[0].clone(), args[2].clone(), delta).await {
			Ok(n) => RespValue::integer(n),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(ZRemCmd, "ZREM", -3);

#[async_trait]
impl Cmd for ZRemCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		let _lane = match db.write_lane(db_index).await {
			Ok(lane) => lane,
			Err(e) => return storage_err(e),
		};
		match db.zset.zrem(db_index, args[0].clone(), &args[1..]).await {
			Ok(n) => RespValue::integer(n),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(ZScoreCmd, "ZSCORE", 3);

#[async_trait]
impl Cmd for ZScoreCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		match db.zset.zscore(db_index, &args[0], &args[1]).await {
			Ok(Some(score)) => RespValue::bulk_string(score.to_string()),
			Ok(None) => RespValue::Null,
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(ZCardCmd, "ZCARD", 2);

#[async_trait]
impl Cmd for ZCardCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		match db.zset.zcard(db_index, &args[0]).await {
			Ok(n) => RespValue::integer(n),
			Err(e) => storage_err(e),
		}
	}
}

macro_rules! rank_range_family {
	($struct_name:ident, $name:literal, $call:ident) => {
		simple_cmd!($struct_name, $name, 4);

		#[async_trait]
		impl Cmd for $struct_name {
			fn meta(&self) -> &CmdMeta {
				&self.meta
			}

			async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
				let start = match parse_int(&args[1]) {
					Ok(n) => n,
					Err(e) => return RespValue::error(e),
				};
				let stop = match parse_int(&args[2]) {
					Ok(n) => n,
					Err(e) => return RespValue::error(e),
				};
				match db.zset.$call(db_index, &args[0], start, stop).await {
					Ok(pairs) => members_with_scores(pairs),
					Err(e) => storage_err(e),
				}
			}
		}
	};
}

rank_range_family!(ZRangeCmd, "ZRANGE", zrange);
rank_range_family!(ZRevRangeCmd, "ZREVRANGE", zrevrange);

macro_rules! score_range_family {
	($struct_name:ident, $name:literal, $call:ident) => {
		simple_cmd!($struct_name, $name, 4);

		#[async_trait]
		impl Cmd for $struct_name {
			fn meta(&self) -> &CmdMeta {
				&self.meta
			}

			async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
				let range = match parse_score_range(&args[1], &args[2]) {
					Ok(r) => r,
					Err(e) => return RespValue::error(e),
				};
				match db.zset.$call(db_index, &args[0], range).await {
					Ok(pairs) => members_with_scores(pairs),
					Err(e) => storage_err(e),
				}
			}
		}
	};
}

score_range_family!(ZRangeByScoreCmd, "ZRANGEBYSCORE", zrangebyscore);

simple_cmd!(ZRevRangeByScoreCmd, "ZREVRANGEBYSCORE", 4);

#[async_trait]
impl Cmd for ZRevRangeByScoreCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	/// Wire order is `key max min` (Redis convention for the reverse
	/// variant), while `ZSetOps::zrevrangebyscore` takes an ascending
	/// `ScoreRange{min, max}` and only reverses traversal direction — so
	/// the first argument here is the upper bound and the second the lower.
	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		let range = match parse_score_range(&args[2], &args[1]) {
			Ok(r) => r,
			Err(e) => return RespValue::error(e),
		};
		match db.zset.zrevrangebyscore(db_index, &args[0], range).await {
			Ok(pairs) => members_with_scores(pairs),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(ZCountCmd, "ZCOUNT", 4);

#[async_trait]
impl Cmd for ZCountCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		let range = match parse_score_range(&args[1], &args[2]) {
			Ok(r) => r,
			Err(e) => return RespValue::error(e),
		};
		match db.zset.zcount(db_index, &args[0], range).await {
			Ok(n) => RespValue::integer(n),
			Err(e) => storage_err(e),
		}
	}
}

macro_rules! rank_of_family {
	($struct_name:ident, $name:literal, $call:ident) => {
		simple_cmd!($struct_name, $name, 3);

		#[async_trait]
		impl Cmd for $struct_name {
			fn meta(&self) -> &CmdMeta {
				&self.meta
			}

			async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
				match db.zset.$call(db_index, &args[0], &args[1]).await {
					Ok(Some(rank)) => RespValue::integer(rank),
					Ok(None) => RespValue::Null,
					Err(e) => storage_err(e),
				}
			}
		}
	};
}

rank_of_family!(ZRankCmd, "ZRANK", zrank);
rank_of_family!(ZRevRankCmd, "ZREVRANK", zrevrank);

simple_cmd!(ZRemRangeByRankCmd, "ZREMRANGEBYRANK", 4);

#[async_trait]
impl Cmd for ZRemRangeByRankCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		let start = match parse_int(&args[1]) {
			Ok(n) => n,
			Err(e) => return RespValue::error(e),
		};
		let stop = match parse_int(&args[2]) {
			Ok(n) => n,
			Err(e) => return RespValue::error(e),
		};
		let _lane = match db.write_lane(db_index).await {
			Ok(lane) => lane,
			Err(e) => return storage_err(e),
		};
		match db.zset.zremrangebyrank(db_index, args[0].clone(), start, stop).await {
			Ok(n) => RespValue::integer(n),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(ZRemRangeByScoreCmd, "ZREMRANGEBYSCORE", 4);

#[async_trait]
impl Cmd for ZRemRangeByScoreCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		let range = match parse_score_range(&args[1], &args[2]) {
			Ok(r) => r,
			Err(e) => return RespValue::error(e),
		};
		let _lane = match db.write_lane(db_index).await {
			Ok(lane) => lane,
			Err(e) => return storage_err(e),
		};
		match db.zset.zremrangebyscore(db_index, args[0].clone(), range).await {
			Ok(n) => RespValue::integer(n),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(ZClearCmd, "ZCLEAR", 2);

#[async_trait]
impl Cmd for ZClearCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		let _lane = match db.write_lane(db_index).await {
			Ok(lane) => lane,
			Err(e) => return storage_err(e),
		};
		match db.zset.zclear(db_index, args[0].clone()).await {
			Ok(()) => RespValue::simple_string("OK"),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(ZExpireCmd, "ZEXPIRE", 3);

#[async_trait]
impl Cmd for ZExpireCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		let seconds = match parse_int(&args[1]) {
			Ok(n) => n,
			Err(e) => return RespValue::error(e),
		};
		let _lane = match db.write_lane(db_index).await {
			Ok(lane) => lane,
			Err(e) => return storage_err(e),
		};
		match db.zset.zexpire(db_index, &args[0], seconds).await {
			Ok(n) => RespValue::integer(n),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(ZTtlCmd, "ZTTL", 2);

#[async_trait]
impl Cmd for ZTtlCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		match db.zset.zttl(db_index, &args[0]).await {
			Ok(n) => RespValue::integer(n),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(ZPersistCmd, "ZPERSIST", 2);

#[async_trait]
impl Cmd for ZPersistCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		let _lane = match db.write_lane(db_index).await {
			Ok(lane) => lane,
			Err(e) => return storage_err(e),
		};
		match db.zset.zpersist(db_index, &args[0]).await {
			Ok(n) => RespValue::integer(n),
			Err(e) => storage_err(e),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parse_score_range_maps_inf_sentinels() {
		let range = parse_score_range(&Bytes::from_static(b"-inf"), &Bytes::from_static(b"+inf")).unwrap();
		assert_eq!(range.min, i64::MIN);
		assert_eq!(range.max, i64::MAX);
	}

	#[test]
	fn parse_score_range_still_parses_plain_integers() {
		let range = parse_score_range(&Bytes::from_static(b"-5"), &Bytes::from_static(b"5")).unwrap();
		assert_eq!(range.min, -5);
		assert_eq!(range.max, 5);
	}

	#[test]
	fn parse_score_range_rejects_garbage() {
		assert!(parse_score_range(&Bytes::from_static(b"nope"), &Bytes::from_static(b"5")).is_err());
	}

	#[tokio::test]
	async fn zrevrangebyscore_accepts_wire_order_max_then_min() {
		let dir = tempfile::tempdir().unwrap();
		let db = std::sync::Arc::new(Db::open(dir.path()).await.unwrap());
		std::mem::forget(dir);

		db.zset.zadd(0, Bytes::from_static(b"k"), Bytes::from_static(b"a"), 1).await.unwrap();
		db.zset.zadd(0, Bytes::from_static(b"k"), Bytes::from_static(b"b"), 2).await.unwrap();
		db.zset.zadd(0, Bytes::from_static(b"k"), Bytes::from_static(b"c"), 3).await.unwrap();

		let cmd = ZRevRangeByScoreCmd::default();
		let args = vec![Bytes::from_static(b"k"), Bytes::from_static(b"3"), Bytes::from_static(b"1")];
		let reply = cmd.do_cmd(&db, 0, &args).await;
		assert_eq!(
			reply,
			RespValue::array([
				RespValue::bulk_string("c"),
				RespValue::bulk_string("3"),
				RespValue::bulk_string("b"),
				RespValue::bulk_string("2"),
				RespValue::bulk_string("a"),
				RespValue::bulk_string("1"),
			])
		);
	}
}
