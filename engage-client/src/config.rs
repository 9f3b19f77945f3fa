//! Configuration module

use std::path::PathBuf;
use std::time::Duration;

use crate::constants;
use crate::logic::telemetry::{AppSystem, HitContext};

/// Client configuration
#[derive(Debug, Clone)]
pub struct EngageConfig {
    /// API server base URL
    pub api_url: String,

    /// Hit ingestion path
    pub hits_path: String,

    /// OAuth token path (refresh grant)
    pub token_path: String,

    /// OAuth client id
    pub client_id: String,

    /// Semantic version of the app
    pub app_version: String,

    /// Store build number
    pub build_number: String,

    /// Platform the app runs on
    pub platform: AppSystem,

    /// HTTP timeout in seconds
    pub timeout_seconds: u64,

    /// Directory of the file-backed store (None = platform default)
    pub data_dir: Option<PathBuf>,
}

impl EngageConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            api_url: constants::get_api_url(),
            hits_path: constants::get_hits_path(),
            token_path: constants::get_token_path(),
            client_id: constants::get_client_id(),
            app_version: std::env::var("ENGAGE_APP_VERSION")
                .unwrap_or_else(|_| constants::APP_VERSION.to_string()),
            build_number: constants::get_build_number(),
            platform: std::env::var("ENGAGE_PLATFORM")
                .ok()
                .and_then(|s| AppSystem::parse(&s))
                .unwrap_or_else(|| AppSystem::from_os(std::env::consts::OS)),
            timeout_seconds: constants::get_timeout_secs(),
            data_dir: std::env::var("ENGAGE_DATA_DIR").ok().map(PathBuf::from),
        }
    }

    /// `{semver}#{build}`, sent as `X-App-version` and in every hit
    pub fn version_tag(&self) -> String {
        format!("{}#{}", self.app_version, self.build_number)
    }

    /// Platform-derived user agent
    pub fn user_agent(&self) -> String {
        format!("{}/{} ({})", constants::APP_NAME, self.app_version, self.platform.as_str())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Static fields stamped on every hit
    pub fn hit_context(&self) -> HitContext {
        HitContext {
            app_version: self.version_tag(),
            app_system: self.platform,
            user_agent: Some(self.user_agent()),
        }
    }
}

impl Default for EngageConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
