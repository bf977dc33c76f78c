use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use nimbis_storage::Db;
use resp::RespValue;

use crate::cmd_meta::CmdMeta;

/// A single RESP command bound to one of the four type operators (or to a
/// connection-level concern like `PING`). `db_index` identifies which of the
/// sixteen logical databases (§4.5) to operate against; `SELECT` itself is
/// handled outside this trait since it mutates connection state the command
/// table doesn't own (see `Dispatcher::dispatch`).
#[async_trait]
pub trait Cmd: Send + Sync {
	fn meta(&self) -> &CmdMeta;

	fn validate_arity(&self, arg_count: usize) -> Result<(), String> {
		self.meta().validate_arity(arg_count)
	}

	async fn do_cmd(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue;

	async fn execute(&self, db: &Arc<Db>, db_index: u8, args: &[Bytes]) -> RespValue {
		if let Err(err) = self.validate_arity(args.len() + 1) {
			return RespValue::error(err);
		}
		self.do_cmd(db, db_index, args).await
	}
}
