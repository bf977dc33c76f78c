//! Hash commands (§4.3.2): `HSET, HGET, HMSET, HMGET, HDEL, HEXISTS, HLEN,
//! HINCRBY, HKEYS, HVALUES, HGETALL, HCLEAR, HSCAN, HEXPIRE, HTTL, HPERSIST`.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use nimbis_storage::Db;
use resp::RespValue;

use crate::cmd_meta::CmdMeta;
use crate::cmd_trait::Cmd;
use crate::utils::bulk_or_null;
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

simple_cmd!(HSetCmd, "HSET", 4);

#[async_trait]
impl Cmd for HSetCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		let _lane = match db.write_lane(db_index).await {
			Ok(lane) => lane,
			Err(e) => return storage_err(e),
		};
		match db.hash.hset(db_index, args[0].clone(), args[1].clone(), args[2].clone()).await {
			Ok(n) => RespValue::integer(n),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(HGetCmd, "HGET", 3);

#[async_trait]
impl Cmd for HGetCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		match db.hash.hget(db_index, &args[0], args[1].clone()).await {
			Ok(value) => bulk_or_null(value),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(HMSetCmd, "HMSET", -4);

#[async_trait]
impl Cmd for HMSetCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		if !args[1..].len().is_multiple_of(2) {
			return RespValue::error("ERR wrong number of arguments for 'hmset' command");
		}
		let pairs = args[1..].chunks_exact(2).map(|c| (c[0].clone(), c[1].clone())).collect();
		let _lane = match db.write_lane(db_index).await {
			Ok(lane) => lane,
			Err(e) => return storage_err(e),
		};
		match db.hash.hmset(db_index, args[0].clone(), pairs).await {
			Ok(()) => RespValue::simple_string("OK"),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(HMGetCmd, "HMGET", -3);

#[async_trait]
impl Cmd for HMGetCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		match db.hash.hmget(db_index, &args[0], &args[1..]).await {
			Ok(values) => RespValue::array(values.into_iter().map(bulk_or_null)),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(HDelCmd, "HDEL", -3);

#[async_trait]
impl Cmd for HDelCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		let _lane = match db.write_lane(db_index).await {
			Ok(lane) => lane,
			Err(e) => return storage_err(e),
		};
		match db.hash.hdel(db_index, args[0].clone(), &args[1..]).await {
			Ok(n) => RespValue::integer(n),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(HExistsCmd, "HEXISTS", 3);

#[async_trait]
impl Cmd for HExistsCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		match db.hash.hexists(db_index, &args[0], args[1].clone()).await {
			Ok(yes) => RespValue::integer(if yes { 1 } else { 0 }),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(HLenCmd, "HLEN", 2);

#[async_trait]
impl Cmd for HLenCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		match db.hash.hlen(db_index, &args[0]).await {
			Ok(n) => RespValue::integer(n),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(HIncrByCmd, "HINCRBY", 4);

#[async_trait]
impl Cmd for HIncrByCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		let delta = match parse_int(&args[2]) {
			Ok(n) => n,
			Err(e) => return RespValue::error(e),
		};
		let _lane = match db.write_lane(db_index).await {
			Ok(lane) => lane,
			Err(e) => return storage_err(e),
		};
		match db.hash.hincrby(db_index, args[0].clone(), args[1].clone(), delta).await {
			Ok(n) => RespValue::integer(n),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(HKeysCmd, "HKEYS", 2);

#[async_trait]
impl Cmd for HKeysCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		match db.hash.hkeys(db_index, &args[0]).await {
			Ok(fields) => RespValue::array(fields.into_iter().map(RespValue::bulk_string)),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(HValuesCmd, "HVALUES", 2);

#[async_trait]
impl Cmd for HValuesCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		match db.hash.hvalues(db_index, &args[0]).await {
			Ok(values) => RespValue::array(values.into_iter().map(RespValue::bulk_string)),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(HGetAllCmd, "HGETALL", 2);

#[async_trait]
impl Cmd for HGetAllCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		match db.hash.hgetall(db_index, &args[0]).await {
			Ok(pairs) => RespValue::array(pairs.into_iter().flat_map(|(f, v)| [RespValue::bulk_string(f), RespValue::bulk_string(v)])),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(HClearCmd, "HCLEAR", 2);

#[async_trait]
impl Cmd for HClearCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		let _lane = match db.write_lane(db_index).await {
			Ok(lane) => lane,
			Err(e) => return storage_err(e),
		};
		match db.hash.hclear(db_index, args[0].clone()).await {
			Ok(()) => RespValue::simple_string("OK"),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(HScanCmd, "HSCAN", -3);

#[async_trait]
impl Cmd for HScanCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		let count = match args.get(2) {
			Some(raw) => match parse_int(raw) {
				Ok(n) if n > 0 => n,
				_ => return RespValue::error("ERR count must be a positive integer"),
			},
			None => -1,
		};
		let cursor = match args[1].as_ref() {
			b"" => None,
			bytes => Some(Bytes::copy_from_slice(bytes)),
		};
		match db.hash.hscan(db_index, &args[0], cursor, count, false).await {
			Ok(pairs) => {
				let next_cursor = pairs.last().map(|(f, _)| f.clone()).unwrap_or_default();
				let items = RespValue::array(pairs.into_iter().flat_map(|(f, v)| [RespValue::bulk_string(f), RespValue::bulk_string(v)]));
				RespValue::array([RespValue::bulk_string(next_cursor), items])
			}
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(HExpireCmd, "HEXPIRE", 3);

#[async_trait]
impl Cmd for HExpireCmd {
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
		match db.hash.hexpire(db_index, &args[0], seconds).await {
			Ok(n) => RespValue::integer(n),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(HTtlCmd, "HTTL", 2);

#[async_trait]
impl Cmd for HTtlCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		match db.hash.httl(db_index, &args[0]).await {
			Ok(n) => RespValue::integer(n),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(HPersistCmd, "HPERSIST", 2);

#[async_trait]
impl Cmd for HPersistCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		let _lane = match db.write_lane(db_index).await {
			Ok(lane) => lane,
			Err(e) => return storage_err(e),
		};
		match db.hash.hpersist(db_index, &args[0]).await {
			Ok(n) => RespValue::integer(n),
			Err(e) => storage_err(e),
		}
	}
}
