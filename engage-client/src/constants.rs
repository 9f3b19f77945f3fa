//! Client Defaults
//!
//! Endpoint paths, delivery windows and storage keys, plus the `ENGAGE_*`
//! environment lookups that override them.

/// Used when `ENGAGE_API_URL` is unset
pub const DEFAULT_API_URL: &str = "https://api.engage.app";

/// Path of the hit ingestion endpoint (one POST per hit)
pub const DEFAULT_HITS_PATH: &str = "/api/v1/hits";

/// Path of the OAuth token endpoint used for refresh
pub const DEFAULT_TOKEN_PATH: &str = "/oauth/token";

/// OAuth client id sent with refresh requests
pub const DEFAULT_CLIENT_ID: &str = "engage-mobile";

/// Default build number appended to the app version (`{semver}#{build}`)
pub const DEFAULT_BUILD_NUMBER: &str = "1";

/// Default HTTP timeout (seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "EngageClient";

// ============================================
// Telemetry
// ============================================

/// Inactivity gap after which a new session starts (30 minutes)
pub const SESSION_INACTIVITY_MS: i64 = 30 * 60 * 1000;

/// Window during which a repeated open/click is suppressed (30 seconds)
pub const THROTTLE_WINDOW_MS: i64 = 30 * 1000;

/// Maximum number of undelivered hits kept on disk
pub const PENDING_QUEUE_CAP: usize = 50;

/// Maximum number of throttle keys kept per session
pub const THROTTLE_MAP_CAP: usize = 500;

// ============================================
// Persisted keys
// ============================================

pub const SESSION_KEY: &str = "hits.session";
pub const PENDING_KEY: &str = "hits.pending";
pub const LAST_SENT_KEY: &str = "hits.lastSent";
pub const CREDENTIALS_KEY: &str = "auth.credentials";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get API server URL from environment or use default
pub fn get_api_url() -> String {
    std::env::var("ENGAGE_API_URL")
        .unwrap_or_else(|_| DEFAULT_API_URL.to_string())
}

/// Get OAuth client id from environment or use default
pub fn get_client_id() -> String {
    std::env::var("ENGAGE_CLIENT_ID")
        .unwrap_or_else(|_| DEFAULT_CLIENT_ID.to_string())
}

/// Get build number from environment or use default
pub fn get_build_number() -> String {
    std::env::var("ENGAGE_BUILD_NUMBER")
        .unwrap_or_else(|_| DEFAULT_BUILD_NUMBER.to_string())
}

/// Get HTTP timeout from environment or use default
pub fn get_timeout_secs() -> u64 {
    std::env::var("ENGAGE_HTTP_TIMEOUT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_TIMEOUT_SECS)
}

/// Get the hit ingestion path from environment or use default
pub fn get_hits_path() -> String {
    std::env::var("ENGAGE_HITS_PATH")
        .unwrap_or_else(|_| DEFAULT_HITS_PATH.to_string())
}

/// Get the token endpoint path from environment or use default
pub fn get_token_path() -> String {
    std::env::var("ENGAGE_TOKEN_PATH")
        .unwrap_or_else(|_| DEFAULT_TOKEN_PATH.to_string())
}
