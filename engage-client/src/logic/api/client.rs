//! API Client
//!
//! Runs requests through the interceptor chain and the transport. The
//! authenticated flavour also recovers from an expired access token: one
//! refresh, one replay, never more.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::request::{ApiRequest, ApiResponse};
use super::transport::Transport;
use crate::config::EngageConfig;
use crate::error::ApiError;
use crate::logic::auth::{BearerToken, ClientHeaders, CredentialStore, RefreshCoordinator, RequestInterceptor};
use crate::logic::telemetry::{Hit, HitSender};

struct AuthState {
    credentials: Arc<CredentialStore>,
    refresher: Arc<RefreshCoordinator>,
}

pub struct ApiClient {
    transport: Arc<dyn Transport>,
    interceptors: Vec<Arc<dyn RequestInterceptor>>,
    auth: Option<AuthState>,
    hits_path: String,
}

impl ApiClient {
    /// Client headers only; no bearer, no refresh
    pub fn unauthenticated(transport: Arc<dyn Transport>, config: &EngageConfig) -> Self {
        Self {
            transport,
            interceptors: vec![Arc::new(ClientHeaders::from_config(config))],
            auth: None,
            hits_path: config.hits_path.clone(),
        }
    }

    /// Client headers + bearer, with 401 recovery through `refresher`
    pub fn authenticated(
        transport: Arc<dyn Transport>,
        config: &EngageConfig,
        credentials: Arc<CredentialStore>,
        refresher: Arc<RefreshCoordinator>,
    ) -> Self {
        Self {
            transport,
            interceptors: vec![
                Arc::new(ClientHeaders::from_config(config)),
                Arc::new(BearerToken::new(credentials.clone())),
            ],
            auth: Some(AuthState {
                credentials,
                refresher,
            }),
            hits_path: config.hits_path.clone(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    /// Send a request; non-2xx responses come back as `ApiError::Status`
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        for interceptor in &self.interceptors {
            interceptor.intercept(&mut request)?;
        }

        let err = match self.execute(&request).await {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };

        let Some(auth) = &self.auth else {
            return Err(err);
        };
        if !err.is_unauthorized() || request.retried {
            return Err(err);
        }
        request.retried = true;

        if auth.credentials.refresh_token().is_none() {
            log::warn!("{} {} unauthorized and no refresh token held", request.method, request.path);
            self.sign_out(&auth.credentials).await;
            return Err(err);
        }

        match auth.refresher.refresh().await {
            Ok(credentials) => {
                request.set_bearer(&credentials.access_token)?;
                log::debug!("Replaying {} {}", request.method, request.path);
                self.execute(&request).await
            }
            Err(refresh_err) => {
                log::warn!("Token refresh failed: {}", refresh_err);
                if refresh_err.is_forbidden() {
                    self.sign_out(&auth.credentials).await;
                }
                Err(err)
            }
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::get(path)).await?.json()
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(ApiRequest::post(path).with_json(body)?).await?.json()
    }

    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        self.transport.execute(request).await?.error_for_status()
    }

    async fn sign_out(&self, credentials: &CredentialStore) {
        if let Err(e) = credentials.clear().await {
            log::error!("Failed to clear credentials: {}", e);
        }
    }
}

#[async_trait]
impl HitSender for ApiClient {
    async fn send_hit(&self, hit: &Hit) -> Result<(), ApiError> {
        let request = ApiRequest::post(&self.hits_path).with_json(hit)?;
        self.send(request).await.map(|_| ())
    }
}
