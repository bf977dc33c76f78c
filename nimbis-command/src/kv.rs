//! KV commands (§4.3.1): `GET, SET, SETNX, GETSET, MGET, MSET, DEL, EXISTS,
//! INCR, DECR, INCRBY, DECRBY, EXPIRE, EXPIREAT, TTL, PERSIST`.

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

simple_cmd!(GetCmd, "GET", 2);

#[async_trait]
impl Cmd for GetCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		match db.kv.get(db_index, &args[0]).await {
			Ok(value) => bulk_or_null(value),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(SetCmd, "SET", 3);

#[async_trait]
impl Cmd for SetCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		let _lane = match db.write_lane(db_index).await {
			Ok(lane) => lane,
			Err(e) => return storage_err(e),
		};
		match db.kv.set(db_index, args[0].clone(), args[1].clone()).await {
			Ok(()) => RespValue::simple_string("OK"),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(SetNxCmd, "SETNX", 3);

#[async_trait]
impl Cmd for SetNxCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		let _lane = match db.write_lane(db_index).await {
			Ok(lane) => lane,
			Err(e) => return storage_err(e),
		};
		match db.kv.setnx(db_index, args[0].clone(), args[1].clone()).await {
			Ok(n) => RespValue::integer(n),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(GetSetCmd, "GETSET", 3);

#[async_trait]
impl Cmd for GetSetCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		let _lane = match db.write_lane(db_index).await {
			Ok(lane) => lane,
			Err(e) => return storage_err(e),
		};
		match db.kv.getset(db_index, args[0].clone(), args[1].clone()).await {
			Ok(old) => bulk_or_null(old),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(MGetCmd, "MGET", -2);

#[async_trait]
impl Cmd for MGetCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		match db.kv.mget(db_index, args).await {
			Ok(values) => RespValue::array(values.into_iter().map(bulk_or_null)),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(MSetCmd, "MSET", -3);

#[async_trait]
impl Cmd for MSetCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		if !args.len().is_multiple_of(2) {
			return RespValue::error("ERR wrong number of arguments for 'mset' command");
		}
		let pairs = args.chunks_exact(2).map(|c| (c[0].clone(), c[1].clone())).collect();
		let _lane = match db.write_lane(db_index).await {
			Ok(lane) => lane,
			Err(e) => return storage_err(e),
		};
		match db.kv.mset(db_index, pairs).await {
			Ok(()) => RespValue::simple_string("OK"),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(DelCmd, "DEL", -2);

#[async_trait]
impl Cmd for DelCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		let _lane = match db.write_lane(db_index).await {
			Ok(lane) => lane,
			Err(e) => return storage_err(e),
		};
		match db.kv.del(db_index, args).await {
			Ok(n) => RespValue::integer(n),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(ExistsCmd, "EXISTS", -2);

#[async_trait]
impl Cmd for ExistsCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		let mut count = 0;
		for key in args {
			match db.kv.exists(db_index, key).await {
				Ok(true) => count += 1,
				Ok(false) => {}
				Err(e) => return storage_err(e),
			}
		}
		RespValue::integer(count)
	}
}

macro_rules! incr_family {
	($struct_name:ident, $name:literal, $call:ident) => {
		simple_cmd!($struct_name, $name, 2);

		#[async_trait]
		impl Cmd for $struct_name {
			fn meta(&self) -> &CmdMeta {
				&self.meta
			}

			async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
				let _lane = match db.write_lane(db_index).await {
					Ok(lane) => lane,
					Err(e) => return storage_err(e),
				};
				match db.kv.$call(db_index, args[0].clone()).await {
					Ok(n) => RespValue::integer(n),
					Err(e) => storage_err(e),
				}
			}
		}
	};
}

incr_family!(IncrCmd, "INCR", incr);
incr_family!(DecrCmd, "DECR", decr);

macro_rules! incrby_family {
	($struct_name:ident, $name:literal, $call:ident) => {
		simple_cmd!($struct_name, $name, 3);

		#[async_trait]
		impl Cmd for $struct_name {
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
				match db.kv.$call(db_index, args[0].clone(), delta).await {
					Ok(n) => RespValue::integer(n),
					Err(e) => storage_err(e),
				}
			}
		}
	};
}

incrby_family!(IncrByCmd, "INCRBY", incrby);
incrby_family!(DecrByCmd, "DECRBY", decrby);

simple_cmd!(ExpireCmd, "EXPIRE", 3);

#[async_trait]
impl Cmd for ExpireCmd {
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
		match db.kv.expire(db_index, &args[0], seconds).await {
			Ok(n) => RespValue::integer(n),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(ExpireAtCmd, "EXPIREAT", 3);

#[async_trait]
impl Cmd for ExpireAtCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		let epoch = match parse_int(&args[1]) {
			Ok(n) => n,
			Err(e) => return RespValue::error(e),
		};
		let _lane = match db.write_lane(db_index).await {
			Ok(lane) => lane,
			Err(e) => return storage_err(e),
		};
		match db.kv.expire_at(db_index, &args[0], epoch).await {
			Ok(n) => RespValue::integer(n),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(TtlCmd, "TTL", 2);

#[async_trait]
impl Cmd for TtlCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		match db.kv.ttl(db_index, &args[0]).await {
			Ok(n) => RespValue::integer(n),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(PersistCmd, "PERSIST", 2);

#[async_trait]
impl Cmd for PersistCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		let _lane = match db.write_lane(db_index).await {
			Ok(lane) => lane,
			Err(e) => return storage_err(e),
		};
		match db.kv.persist(db_index, &args[0]).await {
			Ok(n) => RespValue::integer(n),
			Err(e) => storage_err(e),
		}
	}
}
