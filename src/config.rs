/// Configuration management for the Skythread client
use crate::error::{ClientError, ClientResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Main client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub network: NetworkConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
}

/// Remote endpoints and HTTP settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Public AppView used for all read calls
    pub appview_url: String,
    /// PDS used by the authenticated session layer
    pub pds_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    /// SQLite file backing the durable key-value store
    pub store_db: PathBuf,
}

/// Login credentials for authenticated reads
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    pub identifier: Option<String>,
    pub app_password: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("identifier", &self.identifier)
            .field("app_password", &self.app_password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AuthConfig {
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.identifier.as_deref()?, self.app_password.as_deref()?))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

pub const DEFAULT_APPVIEW_URL: &str = "https://public.api.bsky.app";
pub const DEFAULT_PDS_URL: &str = "https://bsky.social";

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            appview_url: DEFAULT_APPVIEW_URL.to_string(),
            pds_url: DEFAULT_PDS_URL.to_string(),
            user_agent: format!("skythread/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 10,
        }
    }
}

impl NetworkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ClientConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ClientResult<Self> {
        dotenv::dotenv().ok();

        let defaults = NetworkConfig::default();

        let appview_url = env::var("SKYTHREAD_APPVIEW_URL").unwrap_or(defaults.appview_url);
        let pds_url = env::var("SKYTHREAD_PDS_URL").unwrap_or(defaults.pds_url);
        let user_agent = env::var("SKYTHREAD_USER_AGENT").unwrap_or(defaults.user_agent);
        let timeout_secs = env::var("SKYTHREAD_HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|_| defaults.timeout_secs.to_string())
            .parse()
            .map_err(|_| ClientError::Config("Invalid HTTP timeout".to_string()))?;

        let data_directory: PathBuf = env::var("SKYTHREAD_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let store_db = env::var("SKYTHREAD_STORE_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("skythread.sqlite"));

        let level = env::var("SKYTHREAD_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let json = env::var("SKYTHREAD_LOG_FORMAT")
            .map(|f| f.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let auth = AuthConfig {
            identifier: env::var("SKYTHREAD_IDENTIFIER").ok(),
            app_password: env::var("SKYTHREAD_APP_PASSWORD").ok(),
        };

        let config = Self {
            network: NetworkConfig {
                appview_url,
                pds_url,
                user_agent,
                timeout_secs,
            },
            storage: StorageConfig {
                data_directory,
                store_db,
            },
            logging: LoggingConfig { level, json },
            auth,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> ClientResult<()> {
        for (name, url) in [
            ("AppView URL", &self.network.appview_url),
            ("PDS URL", &self.network.pds_url),
        ] {
            if url.is_empty() {
                return Err(ClientError::Config(format!("{} cannot be empty", name)));
            }
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(ClientError::Config(format!(
                    "{} must be an http(s) URL: {}",
                    name, url
                )));
            }
        }

        if self.network.timeout_secs == 0 {
            return Err(ClientError::Config(
                "HTTP timeout must be at least one second".to_string(),
            ));
        }

        Ok(())
    }
}
