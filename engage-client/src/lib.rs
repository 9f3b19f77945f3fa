//! Engage Client - resilience layer for the member engagement app
//!
//! - Telemetry: session-scoped, throttled hits with an offline queue
//! - Auth: header interceptors and single-flight token refresh

pub mod config;
pub mod constants;
pub mod error;
pub mod logic;
pub mod services;

pub use config::EngageConfig;
pub use error::{ApiError, HitError, RefreshError, SetupError, StoreError};
pub use logic::api::{ApiClient, ApiRequest, ApiResponse, ReqwestTransport, Transport};
pub use logic::auth::{CredentialStore, Credentials, RefreshCoordinator};
pub use logic::store::{FileStore, KvStore, MemoryStore};
pub use logic::telemetry::{
    watch_lifecycle, DrainReport, EventType, Hit, HitParams, LifecycleEvent, Tracked, Tracker,
};
pub use services::EngageServices;
