use std::path::Path;

use log::Level;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::couch::transport::DEFAULT_TIMEOUT_MS;
use crate::couch::TransportConfig;
use crate::sync::DEFAULT_BATCH_SIZE;

/// Environment variable naming an extra push target.
pub const URL_ENV: &str = "MOUCH_URL";

/// Runtime configuration for mouch.
///
/// Values are loaded from (in order): `/etc/mouch/mouch.json`, the user
/// config folder (`<config dir>/mouch/mouch.json`), an optional file given on
/// the command line, and environment variables prefixed with `MOUCH_`
/// (e.g. `MOUCH_BATCH_SIZE`). Command-line flags are applied on top by the
/// binary.
#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
#[serde(default)]
pub struct Settings {
	/// Extra target URL, unioned with the positional ones.
	pub url: Option<String>,
	pub batch_size: usize,
	pub timeout_ms: u64,
	/// Skip TLS certificate verification.
	pub insecure: bool,
	pub log_level: Level,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			url: None,
			batch_size: DEFAULT_BATCH_SIZE,
			timeout_ms: DEFAULT_TIMEOUT_MS,
			insecure: true,
			log_level: Level::Info,
		}
	}
}

impl Settings {
	pub fn validate(&self) -> Result<(), SettingsError> {
		if self.batch_size == 0 {
			return Err(SettingsError::Invalid(
				"batch_size must be at least 1".to_string(),
			));
		}
		if self.timeout_ms == 0 {
			return Err(SettingsError::Invalid(
				"timeout_ms must be at least 1".to_string(),
			));
		}
		if let Some(u) = &self.url {
			Url::parse(u).map_err(|e| SettingsError::Invalid(format!("{}: {}", URL_ENV, e)))?;
		}
		Ok(())
	}

	pub fn transport(&self) -> TransportConfig {
		TransportConfig {
			insecure: self.insecure,
			timeout_ms: self.timeout_ms,
		}
	}
}

#[derive(Debug, Error)]
pub enum SettingsError {
	#[error("configuration error: {0}")]
	Config(#[from] config::ConfigError),

	#[error("invalid configuration: {0}")]
	Invalid(String),
}

pub fn load() -> Result<Settings, SettingsError> {
	load_with(None)
}

/// Like [`load`], with an additional (required) config file layered above the
/// system and user files.
pub fn load_with(extra: Option<&Path>) -> Result<Settings, SettingsError> {
	let mut builder = config::Config::builder()
		.add_source(config::File::with_name("/etc/mouch/mouch.json").required(false));

	if let Some(folder) = dirs::config_dir() {
		let user_config_path = folder.join("mouch").join("mouch.json");
		builder = builder.add_source(config::File::from(user_config_path).required(false));
	}
	if let Some(path) = extra {
		builder = builder.add_source(config::File::from(path).required(true));
	}

	builder = builder.add_source(
		config::Environment::with_prefix("MOUCH")
			.prefix_separator("_")
			.ignore_empty(true)
			.separator("__"),
	);

	let cfg = builder.build()?;

	let mut s: Settings = cfg.try_deserialize()?;

	// Direct env overrides win over everything loaded above.
	if let Ok(u) = std::env::var(URL_ENV) {
		if !u.is_empty() {
			s.url = Some(u);
		}
	}
	if let Ok(b) = std::env::var("MOUCH_BATCH_SIZE") {
		if let Ok(parsed) = b.parse::<usize>() {
			s.batch_size = parsed;
		}
	}
	if let Ok(t) = std::env::var("MOUCH_TIMEOUT_MS") {
		if let Ok(parsed) = t.parse::<u64>() {
			s.timeout_ms = parsed;
		}
	}
	if let Ok(i) = std::env::var("MOUCH_INSECURE") {
		match i.to_ascii_lowercase().as_str() {
			"1" | "true" | "yes" => s.insecure = true,
			"0" | "false" | "no" => s.insecure = false,
			_ => {}
		}
	}
	if let Ok(l) = std::env::var("MOUCH_LOG_LEVEL") {
		if let Ok(parsed) = l.parse::<Level>() {
			s.log_level = parsed;
		}
	}

	if s.url.as_deref().is_some_and(|u| u.trim().is_empty()) {
		s.url = None;
	}

	s.validate()?;
	Ok(s)
}
