use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:5001";
pub const DEFAULT_POLL_MS: u64 = 5000;
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 3000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

const ENV_SERVER_URL: &str = "CANISCAN_SERVER_URL";
const ENV_POLL_MS: &str = "CANISCAN_POLL_MS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
	pub server_url: Url,
	pub poll_interval: Duration,
	pub probe_timeout: Duration,
	pub request_timeout: Duration,
}

/// On-disk shape of `~/.caniscan/config.json`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
	server_url: Option<String>,
	poll_ms: Option<u64>,
	probe_timeout_ms: Option<u64>,
	request_timeout_ms: Option<u64>,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			server_url: Url::parse(DEFAULT_SERVER_URL).expect("default server url is valid"),
			poll_interval: Duration::from_millis(DEFAULT_POLL_MS),
			probe_timeout: Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS),
			request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
		}
	}
}

impl ClientConfig {
	/// Defaults, then the user config file, then the environment.
	pub fn load() -> Result<Self> {
		let mut config = ClientConfig::default();
		if let Some(path) = config_file_path() {
			config.merge_file(&path)?;
		}
		config.merge_env()?;
		Ok(config)
	}

	pub fn with_server_url(mut self, raw: &str) -> Result<Self> {
		self.server_url = parse_server_url(raw)?;
		Ok(self)
	}

	pub fn with_poll_ms(mut self, ms: u64) -> Result<Self> {
		if ms == 0 {
			bail!("poll interval must be greater than zero");
		}
		self.poll_interval = Duration::from_millis(ms);
		Ok(self)
	}

	fn merge_file(&mut self, path: &Path) -> Result<()> {
		if !path.exists() {
			return Ok(());
		}
		let parsed = std::fs::read_to_string(path)
			.map_err(anyhow::Error::from)
			.and_then(|raw| serde_json::from_str::<ConfigFile>(&raw).map_err(anyhow::Error::from));
		let file = match parsed {
			Ok(file) => file,
			Err(err) => {
				log::warn!("ignoring config file {}: {err}", path.display());
				return Ok(());
			}
		};
		if let Some(url) = file.server_url.as_deref() {
			self.server_url = parse_server_url(url)
				.with_context(|| format!("server_url in {}", path.display()))?;
		}
		if let Some(ms) = file.poll_ms.filter(|ms| *ms > 0) {
			self.poll_interval = Duration::from_millis(ms);
		}
		if let Some(ms) = file.probe_timeout_ms.filter(|ms| *ms > 0) {
			self.probe_timeout = Duration::from_millis(ms);
		}
		if let Some(ms) = file.request_timeout_ms.filter(|ms| *ms > 0) {
			self.request_timeout = Duration::from_millis(ms);
		}
		Ok(())
	}

	fn merge_env(&mut self) -> Result<()> {
		if let Ok(url) = std::env::var(ENV_SERVER_URL) {
			self.server_url =
				parse_server_url(&url).with_context(|| format!("{ENV_SERVER_URL} is invalid"))?;
		}
		if let Ok(raw) = std::env::var(ENV_POLL_MS) {
			match raw.trim().parse::<u64>() {
				Ok(ms) if ms > 0 => self.poll_interval = Duration::from_millis(ms),
				_ => log::warn!("{ENV_POLL_MS}={raw} is not a positive number; keeping default"),
			}
		}
		Ok(())
	}
}

fn config_file_path() -> Option<PathBuf> {
	match homedir::my_home() {
		Ok(Some(home)) => Some(home.join(".caniscan").join("config.json")),
		_ => None,
	}
}

pub fn parse_server_url(raw: &str) -> Result<Url> {
	let url = Url::parse(raw.trim()).with_context(|| format!("invalid server url: {raw}"))?;
	if !matches!(url.scheme(), "http" | "https") {
		bail!("server url must use http or https: {raw}");
	}
	if url.cannot_be_a_base() || url.host_str().is_none() {
		bail!("server url must include a host: {raw}");
	}
	Ok(url)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::{SystemTime, UNIX_EPOCH};

	fn temporary_config(test: &str, contents: &str) -> PathBuf {
		let unique = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.unwrap_or_default()
			.as_nanos();
		let path = std::env::temp_dir().join(format!(
			"caniscan-config-{}-{}-{}.json",
			test,
			std::process::id(),
			unique
		));
		std::fs::write(&path, contents).expect("write config");
		path
	}

	#[test]
	fn defaults_point_at_local_server() {
		let config = ClientConfig::default();
		assert_eq!(config.server_url.as_str(), "http://localhost:5001/");
		assert_eq!(config.poll_interval, Duration::from_secs(5));
	}

	#[test]
	fn rejects_non_http_urls() {
		assert!(parse_server_url("ftp://localhost:5001").is_err());
		assert!(parse_server_url("not a url").is_err());
		assert!(parse_server_url("http://127.0.0.1:9000").is_ok());
	}

	#[test]
	fn file_values_override_defaults() {
		let path = temporary_config(
			"override",
			r#"{"server_url": "http://10.0.0.2:5001", "poll_ms": 250, "request_timeout_ms": 0}"#,
		);
		let mut config = ClientConfig::default();
		config.merge_file(&path).unwrap();
		assert_eq!(config.server_url.host_str(), Some("10.0.0.2"));
		assert_eq!(config.poll_interval, Duration::from_millis(250));
		assert_eq!(
			config.request_timeout,
			Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS)
		);
		let _ = std::fs::remove_file(&path);
	}

	#[test]
	fn malformed_file_is_ignored() {
		let path = temporary_config("malformed", "{ not json");
		let mut config = ClientConfig::default();
		config.merge_file(&path).unwrap();
		assert_eq!(config, ClientConfig::default());
		let _ = std::fs::remove_file(&path);
	}

	#[test]
	fn environment_overrides_and_bad_poll_values() {
		unsafe {
			std::env::set_var(ENV_SERVER_URL, "http://192.168.1.20:5001");
			std::env::set_var(ENV_POLL_MS, "750");
		}
		let mut config = ClientConfig::default();
		config.merge_env().unwrap();
		assert_eq!(config.server_url.host_str(), Some("192.168.1.20"));
		assert_eq!(config.poll_interval, Duration::from_millis(750));

		for raw in ["0", "soon"] {
			unsafe {
				std::env::set_var(ENV_POLL_MS, raw);
			}
			let mut config = ClientConfig::default();
			config.merge_env().unwrap();
			assert_eq!(config.poll_interval, Duration::from_secs(5));
		}

		unsafe {
			std::env::set_var(ENV_SERVER_URL, "ftp://nowhere");
		}
		assert!(ClientConfig::default().merge_env().is_err());

		unsafe {
			std::env::remove_var(ENV_SERVER_URL);
			std::env::remove_var(ENV_POLL_MS);
		}
	}

	#[test]
	fn zero_poll_interval_is_rejected() {
		assert!(ClientConfig::default().with_poll_ms(0).is_err());
		let config = ClientConfig::default().with_poll_ms(100).unwrap();
		assert_eq!(config.poll_interval, Duration::from_millis(100));
	}
}
