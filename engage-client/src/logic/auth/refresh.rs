//! Refresh Coordinator
//!
//! Exchanges the refresh token for a new access token. Concurrent 401s
//! share one refresh call: the first caller starts it, everyone else joins
//! and all of them get the same result.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};

use super::credentials::{CredentialStore, Credentials};
use crate::config::EngageConfig;
use crate::error::RefreshError;
use crate::logic::api::ApiClient;
use crate::logic::single_flight::SingleFlight;

const REFRESH_FLIGHT: &str = "token-refresh";

#[derive(Debug, Serialize)]
struct RefreshRequest {
    client_id: String,
    grant_type: &'static str,
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

pub struct RefreshCoordinator {
    /// Must be an unauthenticated client: a 401 here is final
    client: Arc<ApiClient>,
    credentials: Arc<CredentialStore>,
    client_id: String,
    token_path: String,
    flights: SingleFlight<&'static str, Result<Credentials, RefreshError>>,
}

impl RefreshCoordinator {
    pub fn new(client: Arc<ApiClient>, credentials: Arc<CredentialStore>, config: &EngageConfig) -> Self {
        Self {
            client,
            credentials,
            client_id: config.client_id.clone(),
            token_path: config.token_path.clone(),
            flights: SingleFlight::new(),
        }
    }

    /// Refresh now, or join the refresh already in flight
    pub async fn refresh(&self) -> Result<Credentials, RefreshError> {
        let client = self.client.clone();
        let credentials = self.credentials.clone();
        let client_id = self.client_id.clone();
        let token_path = self.token_path.clone();

        self.flights
            .run(REFRESH_FLIGHT, move || {
                // Boxed: the refresh call goes back through `ApiClient::send`
                refresh_once(client, credentials, client_id, token_path)
            })
            .await
    }

    pub fn is_refreshing(&self) -> bool {
        self.flights.is_in_flight(&REFRESH_FLIGHT)
    }
}

fn refresh_once(
    client: Arc<ApiClient>,
    credentials: Arc<CredentialStore>,
    client_id: String,
    token_path: String,
) -> BoxFuture<'static, Result<Credentials, RefreshError>> {
    async move {
        let refresh_token = credentials
            .refresh_token()
            .ok_or(RefreshError::MissingRefreshToken)?;

        log::info!("Refreshing access token");

        let request = RefreshRequest {
            client_id,
            grant_type: "refresh_token",
            refresh_token: refresh_token.clone(),
        };
        let response: TokenResponse = client.post_json(&token_path, &request).await?;

        let refreshed = Credentials {
            access_token: response.access_token,
            refresh_token: response.refresh_token.or(Some(refresh_token)),
        };

        credentials
            .set(refreshed.clone())
            .await
            .map_err(|e| RefreshError::Storage(e.to_string()))?;

        log::info!("Access token refreshed");
        Ok(refreshed)
    }
    .boxed()
}
