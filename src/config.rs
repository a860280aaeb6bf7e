use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::retry::RetryConfig;
use crate::types::ForbiddenPolicy;

const DEFAULT_AUTH_BASE_URL: &str = "https://account-api.icann.org";
const DEFAULT_CZDS_BASE_URL: &str = "https://czds-api.icann.org";
const DEFAULT_SENDMAIL: &str = "/usr/sbin/sendmail";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Error loading '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Error parsing '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which zones of the downloadable set to fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawZones")]
pub enum ZoneSelection {
    #[default]
    All,
    Only(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawZones {
    Keyword(String),
    List(Vec<String>),
}

impl TryFrom<RawZones> for ZoneSelection {
    type Error = String;

    fn try_from(raw: RawZones) -> Result<Self, Self::Error> {
        match raw {
            RawZones::Keyword(k) if k.eq_ignore_ascii_case("all") => Ok(ZoneSelection::All),
            RawZones::Keyword(k) => Err(format!(
                "zones must be \"all\" or a list of zone names, got \"{}\"",
                k
            )),
            RawZones::List(names) => Ok(ZoneSelection::Only(
                names
                    .into_iter()
                    .map(|n| n.trim().trim_end_matches('.').to_ascii_lowercase())
                    .filter(|n| !n.is_empty())
                    .collect(),
            )),
        }
    }
}

impl ZoneSelection {
    /// Case-insensitive match against a zone name such as `"com"`.
    pub fn includes(&self, zone: &str) -> bool {
        match self {
            ZoneSelection::All => true,
            ZoneSelection::Only(names) => names.iter().any(|n| n.eq_ignore_ascii_case(zone)),
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct ProxyConfig {
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl std::fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub from: String,
    pub to: Vec<String>,
    #[serde(default = "default_sendmail_path")]
    pub sendmail_path: PathBuf,
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
    #[serde(default = "default_mail_timeout")]
    pub timeout_secs: u64,
}

/// Application configuration, as read from the JSON config file and then
/// adjusted by command-line overrides.
#[derive(Clone, Deserialize)]
pub struct Config {
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_auth_base_url")]
    pub authentication_base_url: String,
    #[serde(default = "default_czds_base_url")]
    pub czds_base_url: String,
    #[serde(default = "default_download_directory")]
    pub download_directory: PathBuf,
    #[serde(default)]
    pub zones: ZoneSelection,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
    #[serde(default = "default_max_retry_delay")]
    pub max_retry_delay_secs: u64,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub prefetch: bool,
    #[serde(default)]
    pub on_forbidden: ForbiddenPolicy,

    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
    #[serde(default)]
    pub mail: Option<MailConfig>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("authentication_base_url", &self.authentication_base_url)
            .field("czds_base_url", &self.czds_base_url)
            .field("download_directory", &self.download_directory)
            .field("zones", &self.zones)
            .field("max_retries", &self.max_retries)
            .field("prefetch", &self.prefetch)
            .field("on_forbidden", &self.on_forbidden)
            .finish_non_exhaustive()
    }
}

fn default_auth_base_url() -> String {
    DEFAULT_AUTH_BASE_URL.to_string()
}

fn default_czds_base_url() -> String {
    DEFAULT_CZDS_BASE_URL.to_string()
}

fn default_download_directory() -> PathBuf {
    PathBuf::from("./zonefiles")
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    5
}

fn default_max_retry_delay() -> u64 {
    60
}

fn default_chunk_size() -> usize {
    1024 * 1024
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_read_timeout() -> u64 {
    300
}

fn default_request_timeout() -> u64 {
    60
}

fn default_sendmail_path() -> PathBuf {
    PathBuf::from(DEFAULT_SENDMAIL)
}

fn default_subject_prefix() -> String {
    "[czds-dl]".to_string()
}

fn default_mail_timeout() -> u64 {
    30
}

/// Expand ~ to the user's home directory.
pub(crate) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Config {
    /// Read the config file and apply command-line overrides.
    pub fn load(cli: &crate::cli::Cli) -> Result<Self, ConfigError> {
        let path = expand_tilde(&cli.config);
        let mut config = Self::from_file(&path)?;
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        let mut config: Config = serde_json::from_str(contents)?;
        let dir = config.download_directory.to_string_lossy().into_owned();
        config.download_directory = expand_tilde(&dir);
        Ok(config)
    }

    fn apply_cli(&mut self, cli: &crate::cli::Cli) {
        if let Some(pw) = &cli.password {
            self.password = Some(pw.clone());
        }
        if let Some(dir) = &cli.directory {
            self.download_directory = expand_tilde(dir);
        }
        if cli.prefetch {
            self.prefetch = true;
        }
        if let Some(n) = cli.max_retries {
            self.max_retries = n;
        }
        if let Some(policy) = cli.on_forbidden {
            self.on_forbidden = policy;
        }
        if cli.no_mail {
            self.mail = None;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.username.trim().is_empty() {
            return Err(ConfigError::Invalid("username must not be empty".into()));
        }
        if self.password.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::Invalid(
                "password missing: set it in the config file, --password or CZDS_PASSWORD".into(),
            ));
        }
        for (key, value) in [
            ("authentication_base_url", &self.authentication_base_url),
            ("czds_base_url", &self.czds_base_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| ConfigError::Invalid(format!("{} '{}': {}", key, value, e)))?;
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be greater than 0".into()));
        }
        if let ZoneSelection::Only(names) = &self.zones {
            if names.is_empty() {
                return Err(ConfigError::Invalid(
                    "zones list is empty; use \"all\" to download every zone".into(),
                ));
            }
        }
        if let Some(proxy) = &self.proxy {
            url::Url::parse(&proxy.url)
                .map_err(|e| ConfigError::Invalid(format!("proxy url '{}': {}", proxy.url, e)))?;
        }
        if let Some(mail) = &self.mail {
            if mail.to.is_empty() {
                return Err(ConfigError::Invalid("mail.to must list at least one recipient".into()));
            }
        }
        Ok(())
    }

    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            base_delay_secs: self.retry_delay_secs,
            max_delay_secs: self.max_retry_delay_secs,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Build the shared HTTP client with explicit timeouts and optional proxy.
    pub fn http_client(&self) -> anyhow::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("czds-dl/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .read_timeout(Duration::from_secs(self.read_timeout_secs));
        if let Some(proxy) = &self.proxy {
            let mut p = reqwest::Proxy::all(&proxy.url)?;
            if let Some(user) = &proxy.username {
                p = p.basic_auth(user, proxy.password.as_deref().unwrap_or(""));
            }
            builder = builder.proxy(p);
        }
        Ok(builder.build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    const MINIMAL: &str = r#"{"username": "user@example.com", "password": "secret"}"#;

    #[test]
    fn test_expand_tilde_with_home() {
        let result = expand_tilde("~/zones");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(result, home.join("zones"));
        }
    }

    #[test]
    fn test_expand_tilde_no_prefix() {
        assert_eq!(expand_tilde("/srv/zones"), PathBuf::from("/srv/zones"));
        assert_eq!(expand_tilde("relative/zones"), PathBuf::from("relative/zones"));
    }

    #[test]
    fn test_minimal_config_gets_defaults() {
        let cfg = Config::from_json(MINIMAL).unwrap();
        assert_eq!(cfg.authentication_base_url, DEFAULT_AUTH_BASE_URL);
        assert_eq!(cfg.czds_base_url, DEFAULT_CZDS_BASE_URL);
        assert_eq!(cfg.download_directory, PathBuf::from("./zonefiles"));
        assert_eq!(cfg.zones, ZoneSelection::All);
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.chunk_size, 1024 * 1024);
        assert!(!cfg.prefetch);
        assert_eq!(cfg.on_forbidden, ForbiddenPolicy::Skip);
        assert!(cfg.proxy.is_none());
        assert!(cfg.mail.is_none());
        cfg.validate().unwrap();
    }

    #[test]
    fn test_zone_list_is_normalized() {
        let cfg = Config::from_json(
            r#"{"username": "u", "password": "p", "zones": ["COM", " net. ", ""]}"#,
        )
        .unwrap();
        assert_eq!(
            cfg.zones,
            ZoneSelection::Only(vec!["com".to_string(), "net".to_string()])
        );
        assert!(cfg.zones.includes("Com"));
        assert!(!cfg.zones.includes("org"));
    }

    #[test]
    fn test_zones_keyword_all_any_case() {
        let cfg = Config::from_json(r#"{"username": "u", "password": "p", "zones": "ALL"}"#)
            .unwrap();
        assert_eq!(cfg.zones, ZoneSelection::All);
        assert!(cfg.zones.includes("anything"));
    }

    #[test]
    fn test_zones_unknown_keyword_rejected() {
        assert!(
            Config::from_json(r#"{"username": "u", "password": "p", "zones": "some"}"#).is_err()
        );
    }

    #[test]
    fn test_missing_username_is_parse_error() {
        assert!(Config::from_json(r#"{"password": "p"}"#).is_err());
    }

    #[test]
    fn test_missing_password_invalid() {
        let cfg = Config::from_json(r#"{"username": "u"}"#).unwrap();
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_chunk_size_invalid() {
        let cfg =
            Config::from_json(r#"{"username": "u", "password": "p", "chunk_size": 0}"#).unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_empty_mail_recipients_invalid() {
        let cfg = Config::from_json(
            r#"{"username": "u", "password": "p",
                "mail": {"from": "czds@example.com", "to": []}}"#,
        )
        .unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_mail_defaults() {
        let cfg = Config::from_json(
            r#"{"username": "u", "password": "p",
                "mail": {"from": "czds@example.com", "to": ["ops@example.com"]}}"#,
        )
        .unwrap();
        let mail = cfg.mail.unwrap();
        assert_eq!(mail.sendmail_path, PathBuf::from(DEFAULT_SENDMAIL));
        assert_eq!(mail.subject_prefix, "[czds-dl]");
    }

    #[test]
    fn test_debug_redacts_password() {
        let cfg = Config::from_json(MINIMAL).unwrap();
        let out = format!("{:?}", cfg);
        assert!(!out.contains("secret"));
        assert!(out.contains("<redacted>"));
    }

    #[test]
    fn test_cli_overrides() {
        let mut cfg = Config::from_json(
            r#"{"username": "u", "password": "p",
                "mail": {"from": "czds@example.com", "to": ["ops@example.com"]}}"#,
        )
        .unwrap();
        let cli = crate::cli::Cli::try_parse_from([
            "czds-dl",
            "--password",
            "from-cli",
            "--directory",
            "/srv/zones",
            "--prefetch",
            "--max-retries",
            "1",
            "--on-forbidden",
            "abort",
            "--no-mail",
        ])
        .unwrap();
        cfg.apply_cli(&cli);
        assert_eq!(cfg.password.as_deref(), Some("from-cli"));
        assert_eq!(cfg.download_directory, PathBuf::from("/srv/zones"));
        assert!(cfg.prefetch);
        assert_eq!(cfg.max_retries, 1);
        assert_eq!(cfg.on_forbidden, ForbiddenPolicy::Abort);
        assert!(cfg.mail.is_none());
    }

    #[test]
    fn test_from_file_missing_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_file(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_from_file_malformed_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_retry_config_from_settings() {
        let cfg = Config::from_json(
            r#"{"username": "u", "password": "p", "max_retries": 5,
                "retry_delay_secs": 2, "max_retry_delay_secs": 20}"#,
        )
        .unwrap();
        let retry = cfg.retry();
        assert_eq!(retry.max_retries, 5);
        assert_eq!(retry.base_delay_secs, 2);
        assert_eq!(retry.max_delay_secs, 20);
    }

    #[test]
    fn test_http_client_with_proxy_builds() {
        let cfg = Config::from_json(
            r#"{"username": "u", "password": "p",
                "proxy": {"url": "http://proxy.example.com:3128", "username": "px", "password": "hunter2"}}"#,
        )
        .unwrap();
        cfg.validate().unwrap();
        assert!(cfg.http_client().is_ok());
        assert!(!format!("{:?}", cfg.proxy).contains("hunter2"));
    }
}
