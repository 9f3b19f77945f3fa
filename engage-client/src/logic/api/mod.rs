//! API Module
//!
//! HTTP plumbing shared by telemetry delivery and the rest of the app.
//!
//! ## Structure
//! - `request.rs` - Request / response values
//! - `transport.rs` - Transport seam and the reqwest implementation
//! - `client.rs` - Interceptor chain, 401 recovery, `HitSender`

pub mod client;
pub mod request;
pub mod transport;

pub use client::ApiClient;
pub use request::{ApiRequest, ApiResponse};
pub use transport::{ReqwestTransport, Transport};
