//! Credential Store
//!
//! Current access / refresh token pair, kept in memory and mirrored to the
//! persisted store so a signed-in member survives a restart.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::constants::CREDENTIALS_KEY;
use crate::error::StoreError;
use crate::logic::store::{load_json, save_json, KvStore};

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl Credentials {
    pub fn new(access_token: &str, refresh_token: Option<&str>) -> Self {
        Self {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.map(str::to_string),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &self.refresh_token.as_deref().map(redact))
            .finish()
    }
}

/// First 4 chars only
fn redact(token: &str) -> String {
    let prefix: String = token.chars().take(4).collect();
    format!("{}...", prefix)
}

pub struct CredentialStore {
    current: RwLock<Option<Credentials>>,
    store: Option<Arc<dyn KvStore>>,
    signed_in: watch::Sender<bool>,
}

impl CredentialStore {
    /// Memory only; nothing survives a restart
    pub fn in_memory() -> Self {
        Self::with_store(None)
    }

    /// Mirrored to `auth.credentials` in `store`
    pub fn persistent(store: Arc<dyn KvStore>) -> Self {
        Self::with_store(Some(store))
    }

    fn with_store(store: Option<Arc<dyn KvStore>>) -> Self {
        let (signed_in, _) = watch::channel(false);
        Self {
            current: RwLock::new(None),
            store,
            signed_in,
        }
    }

    /// Restore credentials saved by a previous run
    pub async fn load(&self) -> Result<Option<Credentials>, StoreError> {
        let Some(store) = &self.store else {
            return Ok(self.current());
        };

        let loaded: Option<Credentials> = match load_json(store.as_ref(), CREDENTIALS_KEY).await {
            Ok(value) => value,
            Err(StoreError::Serialization(e)) => {
                log::warn!("Discarding unreadable credentials: {}", e);
                None
            }
            Err(e) => return Err(e),
        };

        if let Some(credentials) = &loaded {
            log::info!("Credentials restored: {:?}", credentials);
            *self.current.write() = Some(credentials.clone());
            self.signed_in.send_replace(true);
        }
        Ok(loaded)
    }

    pub async fn set(&self, credentials: Credentials) -> Result<(), StoreError> {
        if let Some(store) = &self.store {
            save_json(store.as_ref(), CREDENTIALS_KEY, &credentials).await?;
        }
        *self.current.write() = Some(credentials);
        self.signed_in.send_replace(true);
        Ok(())
    }

    /// Drop credentials; subscribers see the member signed out
    pub async fn clear(&self) -> Result<(), StoreError> {
        let had = self.current.write().take().is_some();
        if let Some(store) = &self.store {
            store.remove(CREDENTIALS_KEY).await?;
        }
        self.signed_in.send_replace(false);
        if had {
            log::warn!("Credentials cleared, member signed out");
        }
        Ok(())
    }

    pub fn current(&self) -> Option<Credentials> {
        self.current.read().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.current.read().as_ref().map(|c| c.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.current.read().as_ref().and_then(|c| c.refresh_token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.read().is_some()
    }

    /// Sign-in state; flips to `false` when credentials are cleared
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.signed_in.subscribe()
    }
}
