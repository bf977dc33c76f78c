//! List commands (§4.3.3): `LPUSH, RPUSH, LPOP, RPOP, LLEN, LINDEX, LRANGE,
//! LCLEAR, LEXPIRE, LTTL, LPERSIST`.

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

macro_rules! push_family {
	($struct_name:ident, $name:literal, $call:ident) => {
		simple_cmd!($struct_name, $name, 3);

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
				match db.list.$call(db_index, args[0].clone(), args[1].clone()).await {
					Ok(n) => RespValue::integer(n),
					Err(e) => storage_err(e),
				}
			}
		}
	};
}

push_family!(LPushCmd, "LPUSH", lpush);
push_family!(RPushCmd, "RPUSH", rpush);

macro_rules! pop_family {
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
				match db.list.$call(db_index, args[0].clone()).await {
					Ok(value) => bulk_or_null(value),
					Err(e) => storage_err(e),
				}
			}
		}
	};
}

pop_family!(LPopCmd, "LPOP", lpop);
pop_family!(RPopCmd, "RPOP", rpop);

simple_cmd!(LLenCmd, "LLEN", 2);

#[async_trait]
impl Cmd for LLenCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		match db.list.llen(db_index, &args[0]).await {
			Ok(n) => RespValue::integer(n),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(LIndexCmd, "LINDEX", 3);

#[async_trait]
impl Cmd for LIndexCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		let index = match parse_int(&args[1]) {
			Ok(n) => n,
			Err(e) => return RespValue::error(e),
		};
		match db.list.lindex(db_index, &args[0], index).await {
			Ok(value) => bulk_or_null(value),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(LRangeCmd, "LRANGE", 4);

#[async_trait]
impl Cmd for LRangeCmd {
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
		match db.list.lrange(db_index, &args[0], start, stop).await {
			Ok(values) => RespValue::array(values.into_iter().map(RespValue::bulk_string)),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(LClearCmd, "LCLEAR", 2);

#[async_trait]
impl Cmd for LClearCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		let _lane = match db.write_lane(db_index).await {
			Ok(lane) => lane,
			Err(e) => return storage_err(e),
		};
		match db.list.lclear(db_index, args[0].clone()).await {
			Ok(()) => RespValue::simple_string("OK"),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(LExpireCmd, "LEXPIRE", 3);

#[async_trait]
impl Cmd for LExpireCmd {
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
		match db.list.lexpire(db_index, &args[0], seconds).await {
			Ok(n) => RespValue::integer(n),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(LTtlCmd, "LTTL", 2);

#[async_trait]
impl Cmd for LTtlCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		match db.list.lttl(db_index, &args[0]).await {
			Ok(n) => RespValue::integer(n),
			Err(e) => storage_err(e),
		}
	}
}

simple_cmd!(LPersistCmd, "LPERSIST", 2);

#[async_trait]
impl Cmd for LPersistCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		let _lane = match db.write_lane(db_index).await {
			Ok(lane) => lane,
			Err(e) => return storage_err(e),
		};
		match db.list.lpersist(db_index, &args[0]).await {
			Ok(n) => RespValue::integer(n),
			Err(e) => storage_err(e),
		}
	}
}
