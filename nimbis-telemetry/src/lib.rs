pub mod logger;

pub use logger::TelemetryError;
pub use logger::init;
pub use logger::reload_log_level;
