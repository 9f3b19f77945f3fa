//! Service wiring
//!
//! Builds the shared client objects once, in dependency order:
//! credentials → public client → refresh coordinator → authenticated
//! client → tracker.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::EngageConfig;
use crate::error::SetupError;
use crate::logic::api::{ApiClient, ReqwestTransport, Transport};
use crate::logic::auth::{CredentialStore, RefreshCoordinator};
use crate::logic::store::{FileStore, KvStore};
use crate::logic::telemetry::{watch_lifecycle, ConnectivityFlag, LifecycleEvent, Tracker};

pub struct EngageServices {
    pub config: EngageConfig,
    pub store: Arc<dyn KvStore>,
    pub credentials: Arc<CredentialStore>,
    /// Client headers only (sign-in, token refresh, public content)
    pub public_api: Arc<ApiClient>,
    /// Bearer + 401 recovery
    pub api: Arc<ApiClient>,
    pub refresher: Arc<RefreshCoordinator>,
    pub connectivity: Arc<ConnectivityFlag>,
    pub tracker: Tracker,
}

impl EngageServices {
    pub async fn init(
        config: EngageConfig,
        store: Arc<dyn KvStore>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, SetupError> {
        let credentials = Arc::new(CredentialStore::persistent(store.clone()));
        credentials.load().await?;

        let public_api = Arc::new(ApiClient::unauthenticated(transport.clone(), &config));
        let refresher = Arc::new(RefreshCoordinator::new(
            public_api.clone(),
            credentials.clone(),
            &config,
        ));
        let api = Arc::new(ApiClient::authenticated(
            transport,
            &config,
            credentials.clone(),
            refresher.clone(),
        ));

        let connectivity = Arc::new(ConnectivityFlag::default());
        let tracker = Tracker::builder(store.clone(), api.clone(), config.hit_context())
            .connectivity(connectivity.clone())
            .build()?;

        log::info!(
            "Engage services ready: api={}, signed_in={}",
            config.api_url,
            credentials.is_authenticated()
        );

        Ok(Self {
            config,
            store,
            credentials,
            public_api,
            api,
            refresher,
            connectivity,
            tracker,
        })
    }

    /// File store and reqwest transport, configured from `ENGAGE_*` variables
    pub async fn from_env() -> Result<Self, SetupError> {
        let config = EngageConfig::from_env();
        let data_dir = config.data_dir.clone().unwrap_or_else(FileStore::default_dir);
        let store: Arc<dyn KvStore> = Arc::new(FileStore::new(data_dir));
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::from_config(&config)?);

        Self::init(config, store, transport).await
    }

    /// Start the lifecycle watcher; the host forwards platform signals into
    /// the returned sender
    pub fn watch_lifecycle(&self) -> (mpsc::Sender<LifecycleEvent>, JoinHandle<()>) {
        watch_lifecycle(self.tracker.clone(), self.connectivity.clone())
    }
}
