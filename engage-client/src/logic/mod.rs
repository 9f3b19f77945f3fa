//! Logic Module - Telemetry & Auth Engines
//!
//! ## Structure
//! - `store/` - Persisted key-value store
//! - `single_flight.rs` - Shared in-flight operations
//! - `telemetry/` - Hit pipeline (session, throttle, queue, dispatcher)
//! - `api/` - HTTP client, transport
//! - `auth/` - Credentials, interceptors, token refresh

pub mod api;
pub mod auth;
pub mod single_flight;
pub mod store;
pub mod telemetry;
