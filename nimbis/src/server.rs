use std::sync::Arc;

use bytes::BytesMut;
use nimbis_command::CmdTable;
use nimbis_command::Dispatcher;
use nimbis_storage::Db;
use nimbis_storage::Sweeper;
use resp::RespEncoder;
use resp::RespParseResult;
use resp::RespParser;
use resp::RespValue;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tracing::error;
use tracing::info;

pub struct Server {
	addr: String,
	db: Arc<Db>,
	cmd_table: Arc<CmdTable>,
}

impl Server {
	pub async fn new(addr: impl Into<String>, data_dir: impl AsRef<std::path::Path>) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
		std::fs::create_dir_all(&data_dir)?;
		let db = Db::open(data_dir).await?;
		let db = Arc::new(db);

		Sweeper::new(db.clone(), std::time::Duration::from_secs(1)).spawn();

		Ok(Self { addr: addr.into(), db, cmd_table: Arc::new(CmdTable::new()) })
	}

	pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
		let listener = TcpListener::bind(&self.addr).await?;
		info!("nimbis listening on {}", self.addr);

		loop {
			match listener.accept().await {
				Ok((socket, peer)) => {
					info!(%peer, "client connected");
					let db = self.db.clone();
					let cmd_table = self.cmd_table.clone();
					tokio::spawn(async move {
						if let Err(e) = handle_client(socket, db, cmd_table).await {
							error!("error handling client {}: {}", peer, e);
						}
					});
				}
				Err(e) => error!("error accepting connection: {}", e),
			}
		}
	}
}

async fn handle_client(mut socket: TcpStream, db: Arc<Db>, cmd_table: Arc<CmdTable>) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
	let mut dispatcher = Dispatcher::new(db, cmd_table);
	let mut parser = RespParser::new();
	let mut buffer = BytesMut::with_capacity(4096);

	loop {
		let n = match socket.read_buf(&mut buffer).await {
			Ok(n) => n,
			Err(e) if e.kind() == std::io::ErrorKind::ConnectionReset => return Ok(()),
			Err(e) => return Err(e.into()),
		};
		if n == 0 {
			return if buffer.is_empty() { Ok(()) } else { Err("connection closed with incomplete data".into()) };
		}

		loop {
			match parser.parse(&mut buffer) {
				RespParseResult::Complete(value) => {
					let response = dispatcher.dispatch(value).await;
					socket.write_all(&response.encode()?).await?;
				}
				RespParseResult::Incomplete => break,
				RespParseResult::Error(e) => {
					let error_response = RespValue::error(format!("ERR Protocol error: {e}"));
					match socket.write_all(&error_response.encode()?).await {
						Err(e) if e.kind() != std::io::ErrorKind::ConnectionReset => return Err(e.into()),
						_ => {}
					}
					return Err(e.into());
				}
			}
		}
	}
}
