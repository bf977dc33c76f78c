//! Server configuration (§6.4): data directory, listen address, engine
//! tuning knobs forwarded to the storage layer, and the binlog toggle.

use std::path::Path;
use std::sync::Arc;
use std::sync::OnceLock;

use arc_swap::ArcSwap;
pub use clap::Parser;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Configuration-related errors.
#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("failed to read configuration file '{path}': {source}")]
	Io { source: std::io::Error, path: String },

	#[error("failed to parse TOML configuration: {0}")]
	TomlParse(#[from] toml::de::Error),

	#[error("failed to parse JSON configuration: {0}")]
	JsonParse(#[from] serde_json::Error),

	#[error("failed to parse YAML configuration: {0}")]
	YamlParse(#[from] serde_yaml::Error),

	#[error("unsupported configuration format: {0}")]
	UnsupportedFormat(String),

	#[error("configuration file has no extension")]
	NoExtension,
}

/// Command-line arguments for the server.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
	/// Configuration file path (TOML, JSON, or YAML). Defaults to
	/// conf/config.toml if it exists.
	#[arg(short, long)]
	pub config: Option<String>,

	/// Listen address, overriding the config file.
	#[arg(long)]
	pub addr: Option<String>,

	/// Data directory, overriding the config file.
	#[arg(long)]
	pub data_dir: Option<String>,

	/// Log level (trace, debug, info, warn, error).
	#[arg(short, long)]
	pub log_level: Option<String>,

	/// Number of worker threads (default: number of CPU cores).
	#[arg(long)]
	pub worker_threads: Option<usize>,
}

/// Engine tuning knobs forwarded to the storage layer (§6.4).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DbConfig {
	pub compression: bool,
	pub block_size: u64,
	pub write_buffer_size: u64,
	pub cache_size: u64,
	pub max_open_files: u64,
}

impl Default for DbConfig {
	fn default() -> Self {
		Self { compression: false, block_size: 4096, write_buffer_size: 64 * 1024 * 1024, cache_size: 256 * 1024 * 1024, max_open_files: 1024 }
	}
}

/// Replication toggle (§6.4). The binlog transport itself is out of scope
/// (§1); this config section only records whether it's enabled so an
/// operator can see the setting round-trip through the config file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BinlogConfig {
	#[serde(rename = "use")]
	pub enabled: bool,
	pub max_file_size: u64,
	pub max_file_num: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
	pub data_dir: String,
	pub addr: String,
	pub log_level: String,
	pub worker_threads: usize,
	pub db: DbConfig,
	pub binlog: BinlogConfig,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			data_dir: "./nimbis_data".into(),
			addr: "127.0.0.1:6379".into(),
			log_level: "info".into(),
			worker_threads: num_cpus::get(),
			db: DbConfig::default(),
			binlog: BinlogConfig::default(),
		}
	}
}

pub struct GlobalConfig {
	inner: OnceLock<ArcSwap<ServerConfig>>,
}

impl GlobalConfig {
	pub const fn new() -> Self {
		Self { inner: OnceLock::new() }
	}

	pub fn init(&self, config: ServerConfig) {
		let _ = self.inner.set(ArcSwap::from_pointee(config));
	}

	pub fn load(&self) -> arc_swap::Guard<Arc<ServerConfig>> {
		self.inner.get().expect("config is not initialized").load()
	}
}

impl Default for GlobalConfig {
	fn default() -> Self {
		Self::new()
	}
}

pub static SERVER_CONF: GlobalConfig = GlobalConfig::new();

pub fn setup(args: Cli) -> Result<(), ConfigError> {
	let default_config = "conf/config.toml";
	let mut config = match args.config.as_deref() {
		Some(p) => load_from_file(p)?,
		None if Path::new(default_config).exists() => load_from_file(default_config)?,
		None => ServerConfig::default(),
	};

	if let Some(addr) = args.addr {
		config.addr = addr;
	}
	if let Some(data_dir) = args.data_dir {
		config.data_dir = data_dir;
	}
	if let Some(log_level) = args.log_level {
		config.log_level = log_level;
	}
	if let Some(t) = args.worker_threads {
		config.worker_threads = t;
	}

	nimbis_telemetry::init(&config.log_level);
	SERVER_CONF.init(config);
	Ok(())
}

fn load_from_file<P: AsRef<Path>>(path: P) -> Result<ServerConfig, ConfigError> {
	let path_ref = path.as_ref();
	let content = std::fs::read_to_string(path_ref).map_err(|source| ConfigError::Io { path: path_ref.display().to_string(), source })?;

	let extension = path_ref.extension().and_then(|ext| ext.to_str()).ok_or(ConfigError::NoExtension)?;

	match extension.to_lowercase().as_str() {
		"toml" => Ok(toml::from_str(&content)?),
		"json" => Ok(serde_json::from_str(&content)?),
		"yaml" | "yml" => Ok(serde_yaml::from_str(&content)?),
		_ => Err(ConfigError::UnsupportedFormat(extension.to_string())),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_are_sane() {
		let config = ServerConfig::default();
		assert_eq!(config.addr, "127.0.0.1:6379");
		assert_eq!(config.worker_threads, num_cpus::get());
		assert!(!config.binlog.enabled);
	}

	#[test]
	fn parses_toml() {
		let dir = tempfile::tempdir().unwrap();
		let file_path = dir.path().join("config.toml");
		let content = r#"
data_dir = "./data"
addr = "0.0.0.0:7000"
log_level = "debug"
worker_threads = 4

[db]
compression = true
block_size = 8192
write_buffer_size = 1048576
cache_size = 2097152
max_open_files = 256

[binlog]
use = true
max_file_size = 1048576
max_file_num = 8
"#;
		std::fs::write(&file_path, content).unwrap();

		let config = load_from_file(&file_path).unwrap();
		assert_eq!(config.addr, "0.0.0.0:7000");
		assert_eq!(config.db.block_size, 8192);
		assert!(config.binlog.enabled);
		assert_eq!(config.binlog.max_file_num, 8);
	}

	#[test]
	fn parses_json() {
		let dir = tempfile::tempdir().unwrap();
		let file_path = dir.path().join("config.json");
		let content = r#"{"data_dir": "./data", "addr": "0.0.0.0:7000", "log_level": "debug"}"#;
		std::fs::write(&file_path, content).unwrap();

		let config = load_from_file(&file_path).unwrap();
		assert_eq!(config.addr, "0.0.0.0:7000");
	}

	#[test]
	fn rejects_unknown_extension() {
		let dir = tempfile::tempdir().unwrap();
		let file_path = dir.path().join("config.ini");
		std::fs::write(&file_path, "addr=foo").unwrap();
		assert!(matches!(load_from_file(&file_path), Err(ConfigError::UnsupportedFormat(_))));
	}
}
