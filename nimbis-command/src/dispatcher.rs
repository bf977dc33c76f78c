use std::sync::Arc;

use bytes::Bytes;
use nimbis_storage::Db;
use resp::RespValue;

use crate::parsed_cmd::ParsedCmd;
use crate::table::CmdTable;
use crate::utils::parse_int;

/// Owns the per-connection database index and routes parsed commands to the
/// shared `CmdTable`. `SELECT` lives here rather than in the table because it
/// mutates this dispatcher's own state, which individual `Cmd` impls never
/// see.
pub struct Dispatcher {
	db: Arc<Db>,
	table: Arc<CmdTable>,
	db_index: u8,
}

impl Dispatcher {
	pub fn new(db: Arc<Db>, table: Arc<CmdTable>) -> Self {
		Self { db, table, db_index: 0 }
	}

	pub async fn dispatch(&mut self, value: RespValue) -> RespValue {
		let parsed = match ParsedCmd::try_from(value) {
			Ok(p) => p,
			Err(e) => return RespValue::error(e),
		};

		if parsed.name == "SELECT" {
			return self.select(&parsed.args);
		}

		let Some(cmd) = self.table.get_cmd(&parsed.name) else {
			return RespValue::error(format!("ERR unknown command '{}'", parsed.name.to_lowercase()));
		};
		cmd.execute(&self.db, self.db_index, &parsed.args).await
	}

	fn select(&mut self, args: &[Bytes]) -> RespValue {
		if args.len() != 1 {
			return RespValue::error("ERR wrong number of arguments for 'select' command");
		}
		let index = match parse_int(&args[0]) {
			Ok(n) => n,
			Err(e) => return RespValue::error(e),
		};
		if index < 0 || index >= nimbis_storage::db::NUM_DATABASES as i64 {
			return RespValue::error("ERR DB index is out of range");
		}
		self.db_index = index as u8;
		RespValue::simple_string("OK")
	}
}

#[cfg(test)]
mod tests {
	use resp::RespValue;

	use super::*;

	async fn dispatcher() -> Dispatcher {
		let dir = tempfile::tempdir().unwrap();
		let db = Arc::new(Db::open(dir.path()).await.unwrap());
		std::mem::forget(dir);
		Dispatcher::new(db, Arc::new(CmdTable::new()))
	}

	fn req(parts: &[&str]) -> RespValue {
		RespValue::array(parts.iter().map(|p| RespValue::bulk_string(p.to_string())))
	}

	#[tokio::test]
	async fn set_get_round_trip() {
		let mut d = dispatcher().await;
		assert_eq!(d.dispatch(req(&["SET", "a", "1"])).await, RespValue::simple_string("OK"));
		assert_eq!(d.dispatch(req(&["GET", "a"])).await, RespValue::bulk_string("1"));
	}

	#[tokio::test]
	async fn select_accepts_0_to_15_and_rejects_outside() {
		let mut d = dispatcher().await;
		assert_eq!(d.dispatch(req(&["SELECT", "15"])).await, RespValue::simple_string("OK"));
		assert_eq!(d.dispatch(req(&["SELECT", "0"])).await, RespValue::simple_string("OK"));
		assert!(matches!(d.dispatch(req(&["SELECT", "16"])).await, RespValue::Error(_)));
		assert!(matches!(d.dispatch(req(&["SELECT", "-1"])).await, RespValue::Error(_)));
	}

	#[tokio::test]
	async fn unknown_command_is_reported() {
		let mut d = dispatcher().await;
		assert!(matches!(d.dispatch(req(&["FROBNICATE", "a"])).await, RespValue::Error(_)));
	}

	#[tokio::test]
	async fn select_is_scoped_to_connection() {
		let dir = tempfile::tempdir().unwrap();
		let db = Arc::new(Db::open(dir.path()).await.unwrap());
		std::mem::forget(dir);
		let table = Arc::new(CmdTable::new());

		let mut a = Dispatcher::new(db.clone(), table.clone());
		let mut b = Dispatcher::new(db, table);

		a.dispatch(req(&["SELECT", "1"])).await;
		a.dispatch(req(&["SET", "k", "from-db1"])).await;
		assert_eq!(b.dispatch(req(&["GET", "k"])).await, RespValue::Null);
	}
}
