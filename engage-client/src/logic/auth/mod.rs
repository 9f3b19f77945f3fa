//! Auth Module
//!
//! Bearer credentials and their renewal.
//!
//! ## Structure
//! - `credentials.rs` - Credential store (memory + persisted mirror)
//! - `interceptor.rs` - Header and bearer interceptors
//! - `refresh.rs` - Single-flight token refresh

pub mod credentials;
pub mod interceptor;
pub mod refresh;

#[cfg(test)]
mod tests;

pub use credentials::{CredentialStore, Credentials};
pub use interceptor::{BearerToken, ClientHeaders, RequestInterceptor, APP_VERSION_HEADER};
pub use refresh::RefreshCoordinator;
