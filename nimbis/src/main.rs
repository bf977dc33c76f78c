mod config;
mod logo;
mod server;

use config::Cli;
use config::Parser;
use config::SERVER_CONF;
use server::Server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
	let args = Cli::parse();
	config::setup(args)?;
	logo::show_logo();

	let cfg = SERVER_CONF.load();
	let server = Server::new(cfg.addr.clone(), cfg.data_dir.clone()).await?;
	drop(cfg);

	server.run().await
}
