use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report availability, pinging the storage backend when one is installed.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let degraded = match state.state_store().await {
        Some(store) => match store.health_check().await {
            Ok(()) => false,
            Err(err) => {
                warn!(error = %err, "storage health check failed");
                true
            }
        },
        None => {
            warn!("storage unavailable (degraded mode)");
            true
        }
    };

    HealthResponse::from_degraded(degraded)
}
