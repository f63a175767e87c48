//! Configuration and the target registry.
//!
//! The file is read once at startup and checked into statically-shaped
//! records; anything missing or malformed fails the load instead of surfacing
//! on first use inside the loop.
use reqwest::Url;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

/// Environment variable that overrides the file's `webhook_url`.
pub const WEBHOOK_URL_ENV: &str = "SITEWATCH_WEBHOOK_URL";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("Missing required configuration field `{0}`")]
    Missing(&'static str),
    #[error("Invalid value for `{field}`: {reason}")]
    Invalid { field: String, reason: String },
}

/// One monitored URL and how changes on it are reported. Immutable for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetConfig {
    pub url: String,
    pub require_ssl_certificate: bool,
    pub check_content_changes: bool,
    pub use_webhook_on_status_change: bool,
    pub use_webhook_on_content_change: bool,
    pub ping_on_status_change: bool,
    pub ignore_initial_status_check: bool,
    pub webhook_username: String,
    pub webhook_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub default_url_prefix: String,
    pub online_check_reference: String,
    pub online_check_delay: Duration,
    pub online_check_every_cycle: bool,
    pub check_delay: Duration,
    pub webhook_username: String,
    pub webhook_url: String,
    pub request_timeout: Option<Duration>,
    pub notification_queue_limit: usize,
    pub state_file: PathBuf,
    pub history_dir: PathBuf,
    pub targets: Vec<TargetConfig>,
}

#[derive(Deserialize, Debug, Default)]
struct RawConfig {
    default_url_prefix: Option<String>,
    online_check_reference: Option<String>,
    online_check_delay_seconds: Option<f64>,
    online_check_every_cycle: Option<bool>,
    check_delay_seconds: Option<f64>,
    webhook_username: Option<String>,
    webhook_url: Option<String>,
    request_timeout_seconds: Option<f64>,
    notification_queue_limit: Option<usize>,
    state_file: Option<PathBuf>,
    history_dir: Option<PathBuf>,
    targets: Option<Vec<RawTarget>>,
}

#[derive(Deserialize, Debug)]
struct RawTarget {
    url: String,
    #[serde(default = "default_true")]
    require_ssl_certificate: bool,
    #[serde(default)]
    check_content_changes: bool,
    #[serde(default)]
    use_webhook_on_status_change: bool,
    #[serde(default)]
    use_webhook_on_content_change: bool,
    #[serde(default)]
    ping_on_status_change: bool,
    #[serde(default, alias = "ignore_inital_status_check")]
    ignore_initial_status_check: bool,
    webhook_username: Option<String>,
    webhook_url: Option<String>,
}

fn default_true() -> bool {
    true
}

const DEFAULT_URL_PREFIX: &str = "https://";
const DEFAULT_ONLINE_CHECK_DELAY_SECONDS: f64 = 30.0;
const DEFAULT_CHECK_DELAY_SECONDS: f64 = 2.0 * 60.0 * 60.0;
const DEFAULT_WEBHOOK_USERNAME: &str = "Website monitor";
const DEFAULT_NOTIFICATION_QUEUE_LIMIT: usize = 100;

impl Config {
    /// Loads the config file, applying the webhook URL override from the
    /// environment. `.toml` files are parsed as TOML, everything else as JSON.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        info!(path = ?path, "Loading config.");
        let contents = fs::read_to_string(path).map_err(|source| {
            error!(path = ?path, error = %source, "Failed to read config file.");
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let raw: RawConfig = if is_toml {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        } else {
            serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        };

        let env_webhook_url = std::env::var(WEBHOOK_URL_ENV).ok();
        Self::from_raw(raw, env_webhook_url)
    }

    /// Parses a JSON config document. The environment is not consulted.
    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(contents).map_err(|e| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            message: e.to_string(),
        })?;
        Self::from_raw(raw, None)
    }

    fn from_raw(raw: RawConfig, env_webhook_url: Option<String>) -> Result<Self, ConfigError> {
        let default_url_prefix = raw
            .default_url_prefix
            .unwrap_or_else(|| DEFAULT_URL_PREFIX.to_string());

        let reference = raw
            .online_check_reference
            .ok_or(ConfigError::Missing("online_check_reference"))?;
        let online_check_reference = normalize_url(&reference, &default_url_prefix);
        validate_url("online_check_reference", &online_check_reference)?;

        let webhook_url = env_webhook_url
            .filter(|url| !url.trim().is_empty())
            .or(raw.webhook_url)
            .map(|url| url.trim().to_string())
            .ok_or(ConfigError::Missing("webhook_url"))?;
        validate_url("webhook_url", &webhook_url)?;

        let webhook_username = raw
            .webhook_username
            .unwrap_or_else(|| DEFAULT_WEBHOOK_USERNAME.to_string());

        let raw_targets = raw.targets.ok_or(ConfigError::Missing("targets"))?;
        let mut targets = Vec::with_capacity(raw_targets.len());
        for (index, target) in raw_targets.into_iter().enumerate() {
            let url = normalize_url(&target.url, &default_url_prefix);
            validate_url(&format!("targets[{index}].url"), &url)?;
            let target_webhook_url = match target.webhook_url {
                Some(override_url) => {
                    let override_url = override_url.trim().to_string();
                    validate_url(&format!("targets[{index}].webhook_url"), &override_url)?;
                    override_url
                }
                None => webhook_url.clone(),
            };
            if targets.iter().any(|t: &TargetConfig| t.url == url) {
                warn!(%url, "Target is configured more than once; it will be checked once per entry.");
            }
            targets.push(TargetConfig {
                url,
                require_ssl_certificate: target.require_ssl_certificate,
                check_content_changes: target.check_content_changes,
                use_webhook_on_status_change: target.use_webhook_on_status_change,
                use_webhook_on_content_change: target.use_webhook_on_content_change,
                ping_on_status_change: target.ping_on_status_change,
                ignore_initial_status_check: target.ignore_initial_status_check,
                webhook_username: target
                    .webhook_username
                    .unwrap_or_else(|| webhook_username.clone()),
                webhook_url: target_webhook_url,
            });
        }

        Ok(Config {
            default_url_prefix,
            online_check_reference,
            online_check_delay: seconds(
                "online_check_delay_seconds",
                raw.online_check_delay_seconds
                    .unwrap_or(DEFAULT_ONLINE_CHECK_DELAY_SECONDS),
            )?,
            online_check_every_cycle: raw.online_check_every_cycle.unwrap_or(true),
            check_delay: seconds(
                "check_delay_seconds",
                raw.check_delay_seconds.unwrap_or(DEFAULT_CHECK_DELAY_SECONDS),
            )?,
            webhook_username,
            webhook_url,
            request_timeout: raw
                .request_timeout_seconds
                .map(|secs| seconds("request_timeout_seconds", secs))
                .transpose()?,
            notification_queue_limit: raw
                .notification_queue_limit
                .unwrap_or(DEFAULT_NOTIFICATION_QUEUE_LIMIT)
                .max(1),
            state_file: raw
                .state_file
                .unwrap_or_else(|| PathBuf::from("last_status.json")),
            history_dir: raw.history_dir.unwrap_or_else(|| PathBuf::from("history")),
            targets,
        })
    }
}

/// Trims a configured URL and prefixes it with `prefix` unless it already
/// starts with a scheme or with the prefix itself.
pub fn normalize_url(raw: &str, prefix: &str) -> String {
    let url = raw.trim();
    let already_qualified = url.starts_with("http://")
        || url.starts_with("https://")
        || (!prefix.is_empty() && url.starts_with(prefix));
    if !url.is_empty() && already_qualified {
        url.to_string()
    } else {
        format!("{prefix}{url}")
    }
}

fn validate_url(field: &str, url: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(url).map_err(|e| ConfigError::Invalid {
        field: field.to_string(),
        reason: format!("{url:?} is not a valid URL ({e})"),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ConfigError::Invalid {
            field: field.to_string(),
            reason: format!("{url:?} uses unsupported scheme {scheme:?}"),
        }),
    }
}

fn seconds(field: &str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::Invalid {
        field: field.to_string(),
        reason: format!("{value} is not a non-negative number of seconds"),
    })
}
