//! Configuration types for log-download-manager

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use url::Url;

/// Export behavior configuration (directories, retention windows, deadlines)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory where working files and archives are written (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// How long a generated archive stays downloadable (default: 10 minutes)
    #[serde(default = "default_expiration_time", with = "duration_serde")]
    pub expiration_time: Duration,

    /// How long a finished (errored or downloaded) operation is kept, measured
    /// from its creation (default: expiration time + 2 minutes)
    #[serde(default = "default_alive_time", with = "duration_serde")]
    pub alive_time: Duration,

    /// Interval between two expiration sweeps (default: 2 minutes)
    #[serde(default = "default_review_interval", with = "duration_serde")]
    pub review_interval: Duration,

    /// Deadline applied to every individual search call (default: 1 minute)
    #[serde(default = "default_search_timeout", with = "duration_serde")]
    pub search_timeout: Duration,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            expiration_time: default_expiration_time(),
            alive_time: default_alive_time(),
            review_interval: default_review_interval(),
            search_timeout: default_search_timeout(),
        }
    }
}

/// Remote log-search capability
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search endpoint receiving JSON search requests (default: http://localhost:8910/search)
    #[serde(default = "default_search_endpoint")]
    pub endpoint: Url,

    /// HTTP client timeout (default: 60 seconds)
    #[serde(default = "default_search_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            request_timeout: default_search_timeout(),
        }
    }
}

/// Bearer credential verification for the download endpoint
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to verify tokens (required)
    #[serde(default)]
    pub secret: String,

    /// Header carrying the token (default: "authorization")
    #[serde(default = "default_auth_header")]
    pub auth_header: String,

    /// Capabilities of which at least one must be granted (default: ["ORG", "APPS"])
    #[serde(default = "default_permissions")]
    pub permissions: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            auth_header: default_auth_header(),
            permissions: default_permissions(),
        }
    }
}

/// Main configuration for the log download manager
///
/// Fields are organized into logical sub-configs:
/// - [`export`](ExportConfig) - directories, retention, deadlines
/// - [`search`](SearchConfig) - remote search capability
/// - [`auth`](AuthConfig) - download credential verification
/// - [`server`](ServerIntegrationConfig) - REST API
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Export pipeline settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Remote search capability
    #[serde(default)]
    pub search: SearchConfig,

    /// Download authorization
    #[serde(default)]
    pub auth: AuthConfig,

    /// API and external server integration
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Download directory
    pub fn download_dir(&self) -> &PathBuf {
        &self.export.download_dir
    }

    /// Base of the public download URL; the archive name `{request_id}.zip` is appended to it
    pub fn download_url_base(&self) -> String {
        let api = &self.server.api;
        match api.public_host.as_deref() {
            Some(host) if !host.is_empty() => {
                format!("https://web.{}{}", host, api.download_path_prefix)
            }
            _ => format!("http://{}{}", api.bind_address, api.download_path_prefix),
        }
    }

    /// Check the settings the service cannot run without
    pub fn validate(&self) -> Result<()> {
        if self.export.download_dir.as_os_str().is_empty() {
            return Err(config_error("download_dir must be set", "export.download_dir"));
        }
        if self.auth.secret.is_empty() {
            return Err(config_error("secret must be set", "auth.secret"));
        }
        if self.auth.auth_header.is_empty() {
            return Err(config_error("auth header must be set", "auth.auth_header"));
        }
        if self.auth.permissions.is_empty() {
            return Err(config_error(
                "at least one permission must be allowed",
                "auth.permissions",
            ));
        }
        for (key, value) in [
            ("export.expiration_time", self.export.expiration_time),
            ("export.review_interval", self.export.review_interval),
            ("export.search_timeout", self.export.search_timeout),
        ] {
            if value.is_zero() {
                return Err(config_error("duration must be greater than zero", key));
            }
        }
        let prefix = &self.server.api.download_path_prefix;
        if !prefix.starts_with('/') || !prefix.ends_with('/') {
            return Err(config_error(
                "download path prefix must start and end with '/'",
                "server.api.download_path_prefix",
            ));
        }
        Ok(())
    }

    /// Log the effective configuration (secrets omitted)
    pub fn log_summary(&self) {
        tracing::info!(version = env!("CARGO_PKG_VERSION"), "log-download-manager");
        tracing::info!(address = %self.server.api.bind_address, "API bind address");
        tracing::info!(endpoint = %self.search.endpoint, "log search endpoint");
        tracing::info!(path = %self.export.download_dir.display(), "download directory");
        tracing::info!(
            expiration_secs = self.export.expiration_time.as_secs(),
            alive_secs = self.export.alive_time.as_secs(),
            review_secs = self.export.review_interval.as_secs(),
            "retention windows"
        );
    }
}

fn config_error(message: &str, key: &str) -> Error {
    Error::Config {
        message: message.to_string(),
        key: Some(key.to_string()),
    }
}

/// API and external server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8941)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Path prefix of the archive download endpoint (default: "/logs/download/")
    #[serde(default = "default_download_path_prefix")]
    pub download_path_prefix: String,

    /// Public management host used to build download URLs (`https://web.{host}{prefix}`)
    #[serde(default)]
    pub public_host: Option<String>,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            download_path_prefix: default_download_path_prefix(),
            public_host: None,
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_expiration_time() -> Duration {
    Duration::from_secs(10 * 60)
}

fn default_alive_time() -> Duration {
    default_expiration_time() + Duration::from_secs(2 * 60)
}

fn default_review_interval() -> Duration {
    Duration::from_secs(2 * 60)
}

fn default_search_timeout() -> Duration {
    Duration::from_secs(60)
}

// the literal is a valid URL
#[allow(clippy::expect_used)]
fn default_search_endpoint() -> Url {
    Url::parse("http://localhost:8910/search").expect("default search endpoint")
}

fn default_auth_header() -> String {
    "authorization".to_string()
}

fn default_permissions() -> Vec<String> {
    vec!["ORG".to_string(), "APPS".to_string()]
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8941))
}

fn default_download_path_prefix() -> String {
    "/logs/download/".to_string()
}

fn default_true() -> bool {
    true
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.auth.secret = "s3cret".to_string();
        config
    }

    #[test]
    fn defaults_match_retention_policy() {
        let config = Config::default();

        assert_eq!(config.export.expiration_time, Duration::from_secs(600));
        assert_eq!(config.export.alive_time, Duration::from_secs(720));
        assert_eq!(config.export.review_interval, Duration::from_secs(120));
        assert_eq!(config.export.search_timeout, Duration::from_secs(60));
        assert_eq!(config.auth.permissions, vec!["ORG", "APPS"]);
        assert_eq!(config.server.api.download_path_prefix, "/logs/download/");
    }

    #[test]
    fn empty_json_deserializes_to_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.export.expiration_time, Duration::from_secs(600));
        assert_eq!(config.search.endpoint.as_str(), "http://localhost:8910/search");
    }

    #[test]
    fn durations_are_encoded_as_seconds() {
        let config: Config =
            serde_json::from_str(r#"{"export":{"expiration_time":30,"review_interval":5}}"#)
                .unwrap();
        assert_eq!(config.export.expiration_time, Duration::from_secs(30));
        assert_eq!(config.export.review_interval, Duration::from_secs(5));

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["export"]["expiration_time"], 30);
    }

    #[test]
    fn validate_requires_a_secret() {
        let err = Config::default().validate().unwrap_err();
        assert!(matches!(err, Error::Config { key: Some(ref k), .. } if k == "auth.secret"));

        valid_config().validate().unwrap();
    }

    #[test]
    fn validate_rejects_zero_intervals_and_bad_prefix() {
        let mut config = valid_config();
        config.export.review_interval = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.server.api.download_path_prefix = "/logs/download".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn url_base_prefers_public_host() {
        let mut config = valid_config();
        assert_eq!(config.download_url_base(), "http://127.0.0.1:8941/logs/download/");

        config.server.api.public_host = Some("example.org".to_string());
        assert_eq!(
            config.download_url_base(),
            "https://web.example.org/logs/download/"
        );
    }
}
