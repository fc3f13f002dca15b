//! Join flow for game WebSocket connections.

use axum::extract::ws::Message;
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::normalize_team_code,
    dto::ws::ClientRole,
    error::ServiceError,
    state::{RoomKey, SharedState},
};

/// What a processed join echoes back to the joining connection.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub game_id: Uuid,
    /// Normalized team code, when the connection joined as a team.
    pub team_code: Option<String>,
    pub role: ClientRole,
}

/// Put a connection into the game room, and into its team's private room
/// when a valid team code accompanies the join.
///
/// The code is checked against the roster before any room changes, so a
/// failed join leaves the connection's memberships untouched. Spectator
/// joins (no team code) need no storage at all and keep working while the
/// backend is down.
pub async fn join(
    state: &SharedState,
    connection_id: Uuid,
    tx: &mpsc::UnboundedSender<Message>,
    game_id: Uuid,
    team_code: Option<String>,
    role: Option<ClientRole>,
) -> Result<JoinOutcome, ServiceError> {
    let team_code = match team_code {
        Some(code) => {
            let store = state.require_store().await?;
            let code = normalize_team_code(&code);
            let Some(team) = store.find_team_by_code(game_id, code).await? else {
                return Err(ServiceError::Rejected("Invalid team code".into()));
            };
            Some(team.code)
        }
        None => None,
    };

    state
        .rooms()
        .join(connection_id, RoomKey::Game(game_id), tx.clone());
    if let Some(code) = &team_code {
        state.rooms().join(
            connection_id,
            RoomKey::Team {
                game_id,
                code: code.clone(),
            },
            tx.clone(),
        );
    }

    let role = role.unwrap_or_default();
    info!(
        connection = %connection_id,
        game_id = %game_id,
        team = ?team_code,
        role = ?role,
        "connection joined game room"
    );

    Ok(JoinOutcome {
        game_id,
        team_code,
        role,
    })
}
