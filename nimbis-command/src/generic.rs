//! Connection-level commands that aren't bound to a type operator.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use nimbis_storage::Db;
use resp::RespValue;

use crate::cmd_meta::CmdMeta;
use crate::cmd_trait::Cmd;

pub struct PingCmd {
	meta: CmdMeta,
}

impl Default for PingCmd {
	fn default() -> Self {
		Self { meta: CmdMeta { name: "PING".to_string(), arity: -1 } }
	}
}

#[async_trait]
impl Cmd for PingCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, _db: &Arc<Db>, _db_index: u8, args: &[Bytes]) -> RespValue {
		match args.len() {
			0 => RespValue::simple_string("PONG"),
			1 => RespValue::bulk_string(args[0].clone()),
			_ => RespValue::error("ERR wrong number of arguments for 'ping' command"),
		}
	}
}
