//! Locating and reading the controller connection settings.
//!
//! The GNS3 server keeps them in the `[Server]` section of `gns3_server.conf`. The same values may
//! be given through environment variables instead (see [`Config::from_env`]).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::{env, fs, io};

use log::{debug, trace};
use thiserror::Error;

pub const ENV_GNS3_HOST: &str = "GNS3_HOST";
pub const ENV_GNS3_PORT: &str = "GNS3_PORT";
pub const ENV_GNS3_PROTOCOL: &str = "GNS3_PROTOCOL";
pub const ENV_GNS3_USER: &str = "GNS3_USER";
pub const ENV_GNS3_PASS: &str = "GNS3_PASS";
pub const ENV_GNS3_PASS64: &str = "GNS3_PASS64";

pub const DEFAULT_SECTION: &str = "Server";
pub const DEFAULT_PORT: u16 = 3080;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("Unable to read configuration file {}", .0.display())]
	Io(PathBuf, #[source] io::Error),
	#[error("Section `[{0}]` not found in configuration")]
	MissingSection(String),
	#[error("Missing or invalid environment variable `{0}`")]
	Env(&'static str),
	#[error("Invalid value `{1}` for `{0}`")]
	InvalidValue(&'static str, String),
	#[error("No configuration file found. Looked in: {}", display_paths(.0))]
	NotFound(Vec<PathBuf>),
}

fn display_paths(paths: &[PathBuf]) -> String {
	paths.iter()
		.map(|p| p.display().to_string())
		.collect::<Vec<_>>()
		.join(", ")
}

/// Connection settings for a GNS3 controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
	pub protocol: String,
	pub host: String,
	pub port: u16,
	pub user: Option<String>,
	pub password: Option<String>,
	pub projects_path: Option<PathBuf>,
}

impl Default for Config {
	fn default() -> Config {
		Config {
			protocol: "http".into(),
			host: "localhost".into(),
			port: DEFAULT_PORT,
			user: None,
			password: None,
			projects_path: None,
		}
	}
}

impl Config {
	/// Root of the v2 API, e.g. `http://localhost:3080/v2`
	pub fn base_url(&self) -> String {
		format!("{}://{}:{}/v2", self.protocol, self.host, self.port)
	}

	/// Basic auth credentials, if a user is configured.
	pub fn credentials(&self) -> Option<(&str, Option<&str>)> {
		self.user.as_deref()
			.filter(|u| !u.is_empty())
			.map(|u| (u, self.password.as_deref()))
	}

	/// Reads `section` out of the text of a `gns3_server.conf`.
	pub fn from_ini_str(text: &str, section: &str) -> Result<Config, ConfigError> {
		let sections = parse_ini(text);
		let values = sections.get(section)
			.ok_or_else(|| ConfigError::MissingSection(section.to_string()))?;

		let mut config = Config::default();
		if let Some(p) = values.get("protocol") {
			config.protocol = p.clone();
		}
		if let Some(h) = values.get("host") {
			config.host = h.clone();
		}
		if let Some(p) = values.get("port") {
			config.port = p.parse()
				.map_err(|_| ConfigError::InvalidValue("port", p.clone()))?;
		}
		config.user = values.get("user").cloned();
		config.password = values.get("password").cloned();
		config.projects_path = values.get("projects_path").map(PathBuf::from);

		Ok(config)
	}

	pub fn from_file(path: &Path, section: &str) -> Result<Config, ConfigError> {
		debug!("reading configuration from {}", path.display());
		let text = fs::read_to_string(path)
			.map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
		Config::from_ini_str(&text, section)
	}

	/// Loads the first `gns3_server.conf` found in the platform's usual locations.
	pub fn discover() -> Result<Config, ConfigError> {
		discover_in(candidate_locations())
	}

	/// Used to get the connection info from environment variables (GNS3_HOST, GNS3_PORT, GNS3_PROTOCOL, GNS3_USER, GNS3_PASS64, GNS3_PASS)
	pub fn from_env() -> Result<Config, ConfigError> {
		Config::from_vars(|k| env::var(k).ok())
	}

	/// Same as [`Config::from_env`], reading variables through `var`.
	pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Config, ConfigError> {
		let host = var(ENV_GNS3_HOST)
			.ok_or(ConfigError::Env(ENV_GNS3_HOST))?;

		let mut config = Config { host, ..Config::default() };
		if let Some(port) = var(ENV_GNS3_PORT) {
			config.port = port.parse()
				.map_err(|_| ConfigError::InvalidValue(ENV_GNS3_PORT, port))?;
		}
		if let Some(protocol) = var(ENV_GNS3_PROTOCOL) {
			config.protocol = protocol;
		}
		config.user = var(ENV_GNS3_USER);
		config.password = var(ENV_GNS3_PASS64)
			.and_then(|s| base64::decode(s.trim()).ok())
			.and_then(|vu8| String::from_utf8(vu8).ok())
			.or_else(|| var(ENV_GNS3_PASS));

		Ok(config)
	}
}

/// Picks the configuration source: an explicit file, the environment when `GNS3_HOST` is set, or
/// the first configuration file found on disk.
pub fn get_config(custom: Option<&Path>) -> Result<Config, ConfigError> {
	resolve_config(custom, |k| env::var(k).ok(), candidate_locations())
}

fn resolve_config(
	custom: Option<&Path>,
	var: impl Fn(&str) -> Option<String>,
	candidates: Vec<PathBuf>,
) -> Result<Config, ConfigError> {
	match custom {
		Some(path) => Config::from_file(path, DEFAULT_SECTION),
		None if var(ENV_GNS3_HOST).is_some() => Config::from_vars(var),
		None => discover_in(candidates),
	}
}

fn discover_in(candidates: Vec<PathBuf>) -> Result<Config, ConfigError> {
	for path in &candidates {
		trace!("looking for configuration at {}", path.display());
		if path.is_file() {
			return Config::from_file(path, DEFAULT_SECTION);
		}
	}
	Err(ConfigError::NotFound(candidates))
}

fn candidate_locations() -> Vec<PathBuf> {
	let mut paths = Vec::new();
	if cfg!(windows) {
		if let Some(appdata) = env::var_os("APPDATA") {
			paths.push(PathBuf::from(appdata).join("GNS3").join("gns3_server.ini"));
		}
	} else if let Some(home) = dirs::home_dir() {
		paths.push(home.join(".config").join("GNS3").join("gns3_server.conf"));
	}
	paths.push(PathBuf::from("./gns3_server.conf"));
	paths
}

/// Splits INI text into sections of `key = value` pairs. Keys are lower-cased, as GNS3 (and
/// python's configparser) treat them case-insensitively.
fn parse_ini(text: &str) -> HashMap<String, HashMap<String, String>> {
	let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
	let mut current: Option<String> = None;

	for line in text.lines() {
		let line = line.trim();
		if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
			continue;
		}

		if line.starts_with('[') && line.ends_with(']') {
			let name = line[1..line.len() - 1].trim().to_string();
			sections.entry(name.clone()).or_default();
			current = Some(name);
			continue;
		}

		// the first delimiter wins, so values may contain the other one
		let pair = line.find(|c: char| c == '=' || c == ':')
			.map(|i| (&line[..i], &line[i + 1..]));
		if let (Some(section), Some((key, value))) = (&current, pair) {
			sections.entry(section.clone())
				.or_default()
				.insert(key.trim().to_lowercase(), value.trim().to_string());
		}
	}

	sections
}
