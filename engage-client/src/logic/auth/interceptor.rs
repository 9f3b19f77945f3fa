//! Request interceptors
//!
//! Applied in order to every outgoing request before it reaches the
//! transport.

use std::sync::Arc;

use reqwest::header::{HeaderName, USER_AGENT};

use super::credentials::CredentialStore;
use crate::config::EngageConfig;
use crate::error::ApiError;
use crate::logic::api::ApiRequest;

pub const APP_VERSION_HEADER: &str = "x-app-version";

pub trait RequestInterceptor: Send + Sync {
    fn intercept(&self, request: &mut ApiRequest) -> Result<(), ApiError>;
}

/// `X-App-version` and `User-Agent`, on every request
#[derive(Debug, Clone)]
pub struct ClientHeaders {
    app_version: String,
    user_agent: String,
}

impl ClientHeaders {
    pub fn new(app_version: &str, user_agent: &str) -> Self {
        Self {
            app_version: app_version.to_string(),
            user_agent: user_agent.to_string(),
        }
    }

    pub fn from_config(config: &EngageConfig) -> Self {
        Self::new(&config.version_tag(), &config.user_agent())
    }
}

impl RequestInterceptor for ClientHeaders {
    fn intercept(&self, request: &mut ApiRequest) -> Result<(), ApiError> {
        request.set_header(HeaderName::from_static(APP_VERSION_HEADER), &self.app_version)?;
        request.set_header(USER_AGENT, &self.user_agent)
    }
}

/// `Authorization: Bearer` when a credential is held
pub struct BearerToken {
    credentials: Arc<CredentialStore>,
}

impl BearerToken {
    pub fn new(credentials: Arc<CredentialStore>) -> Self {
        Self { credentials }
    }
}

impl RequestInterceptor for BearerToken {
    fn intercept(&self, request: &mut ApiRequest) -> Result<(), ApiError> {
        match self.credentials.access_token() {
            Some(token) => request.set_bearer(&token),
            None => Ok(()),
        }
    }
}
