//! Fan-out of live game updates to connected WebSocket rooms.
//!
//! Every mutating command funnels through [`broadcast_state`] once its write
//! has committed, so each connected screen converges on the same snapshot.
//! Fifty-fifty masks are the one exception: they stay inside the requesting
//! team's private room.

use tracing::warn;
use uuid::Uuid;

use crate::{
    dao::{models::TeamEntity, state_store::StateStore, storage::StorageResult},
    dto::{
        common::{ActiveTeamSnapshot, GameStateSnapshot, QuestionSnapshot},
        ws::ServerMessage,
    },
    state::{RoomKey, SharedState},
};

/// Assemble the public snapshot of one game and push it to the game room.
///
/// Best-effort on purpose: by the time this runs the triggering write has
/// already committed, so a missing backend, an unknown game or a read
/// failure must not fail the command. Those cases log and return.
pub async fn broadcast_state(state: &SharedState, game_id: Uuid) {
    let Some(store) = state.state_store().await else {
        warn!(game_id = %game_id, "skipping state broadcast: no storage backend installed");
        return;
    };

    let snapshot = match load_snapshot(store.as_ref(), game_id).await {
        Ok(Some(snapshot)) => snapshot,
        // Unknown games have no settings row and nothing to push.
        Ok(None) => return,
        Err(err) => {
            warn!(game_id = %game_id, error = %err, "skipping state broadcast: snapshot unreadable");
            return;
        }
    };

    state.rooms().broadcast(
        &RoomKey::Game(game_id),
        &ServerMessage::StateUpdate(snapshot),
    );
}

/// Announce the buzz winner to every screen in the game room.
pub fn notify_buzz_lock(
    state: &SharedState,
    game_id: Uuid,
    question_id: Uuid,
    winner: &TeamEntity,
) {
    state.rooms().broadcast(
        &RoomKey::Game(game_id),
        &ServerMessage::BuzzLock {
            question_id,
            winner_team_code: winner.code.clone(),
            winner_team_name: winner.name.clone(),
        },
    );
}

/// Deliver a fifty-fifty outcome to the requesting team's room only.
pub fn notify_mask_applied(
    state: &SharedState,
    game_id: Uuid,
    team_code: &str,
    question_id: Uuid,
    masked: [u8; 2],
) {
    state.rooms().broadcast(
        &RoomKey::Team {
            game_id,
            code: team_code.to_owned(),
        },
        &ServerMessage::MaskApplied {
            game_id,
            team_code: team_code.to_owned(),
            question_id,
            masked_options: masked.to_vec(),
        },
    );
}

/// Push an admin toast to the whole game room.
pub fn notify_toast(state: &SharedState, game_id: Uuid, msg: String) {
    state
        .rooms()
        .broadcast(&RoomKey::Game(game_id), &ServerMessage::Toast { msg });
}

/// Build the public snapshot for `game_id`, or `None` when it has no
/// settings row.
///
/// Shared with the REST state endpoint so both surfaces serve the exact
/// same projection. The current question and the buzz-holding team resolve
/// from their ids; rows that disappeared underneath the settings are
/// omitted, not treated as failures.
pub(crate) async fn load_snapshot(
    store: &dyn StateStore,
    game_id: Uuid,
) -> StorageResult<Option<GameStateSnapshot>> {
    let Some(settings) = store.find_settings(game_id).await? else {
        return Ok(None);
    };

    let question = match settings.current_question_id {
        Some(question_id) => store
            .find_question(game_id, question_id)
            .await?
            .map(QuestionSnapshot::from),
        None => None,
    };

    let active_team = match settings.active_team_id {
        Some(team_id) => store
            .find_team(game_id, team_id)
            .await?
            .map(ActiveTeamSnapshot::from),
        None => None,
    };

    Ok(Some(GameStateSnapshot {
        game_id,
        state: settings.state,
        deadline_epoch_ms: settings.deadline_epoch_ms,
        current_round_id: settings.current_round_id,
        question,
        active_team,
    }))
}
