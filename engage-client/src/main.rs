//! Engage Client - delivery agent
//!
//! Restores the persisted session, reports a session start if it expired,
//! then drains hits queued by earlier runs.

use engage_client::{DrainReport, EngageServices};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting {} v{}", engage_client::constants::APP_NAME, engage_client::constants::APP_VERSION);

    let services = match EngageServices::from_env().await {
        Ok(services) => services,
        Err(e) => {
            log::error!("Setup failed: {}", e);
            std::process::exit(1);
        }
    };

    // Nothing else drains in this process, so one flush sees the whole queue
    let tracker = services.tracker.manual_dispatch();
    if let Err(e) = tracker.track_activity_session().await {
        log::warn!("Session check failed: {}", e);
    }

    match tracker.flush().await {
        DrainReport::Drained { sent, remaining } => {
            log::info!("Delivered {} queued hits, {} still pending", sent, remaining)
        }
        report => log::info!("Nothing delivered: {:?}", report),
    }
}
