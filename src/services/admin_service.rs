//! Business logic behind the admin REST routes.
//!
//! Every command ends the same way the quiz night expects: the fresh
//! snapshot goes out to the game room, followed by a toast naming the
//! command. Live-control commands are lenient like the console they drive:
//! acting on a game or question that does not exist is a logged no-op, not
//! an error.

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::models::{
        GameEntity, GamePhase, QuestionEntity, RoundEntity, SettingsEntity, TeamEntity,
        normalize_team_code, now_epoch_ms,
    },
    dto::{
        admin::{
            ActionResponse, AddQuestionRequest, AddRoundRequest, AddTeamRequest, AddTimeRequest,
            CreateGameRequest, SetActiveTeamRequest, SetQuestionRequest, SetRoundRequest,
            SetStateRequest, StartTimerRequest,
        },
        game::{GameSummary, QuestionSummary, RoundSummary, TeamSummary},
    },
    error::ServiceError,
    services::broadcast_service,
    state::SharedState,
};

/// Create a game together with its initial idle settings row.
pub async fn create_game(
    state: &SharedState,
    request: CreateGameRequest,
) -> Result<GameSummary, ServiceError> {
    let store = state.require_store().await?;

    let game = GameEntity {
        id: Uuid::new_v4(),
        name: request.name.trim().to_owned(),
        created_at_epoch_ms: now_epoch_ms(),
    };
    store
        .create_game(game.clone(), SettingsEntity::initial(game.id))
        .await?;

    info!(game_id = %game.id, name = %game.name, "game created");
    finish(state, game.id, "create_game").await;
    Ok(game.into())
}

/// Append a round to a game.
pub async fn add_round(
    state: &SharedState,
    game_id: Uuid,
    request: AddRoundRequest,
) -> Result<RoundSummary, ServiceError> {
    let store = state.require_store().await?;
    if store.find_game(game_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!("game `{game_id}` not found")));
    }

    let round = RoundEntity {
        id: Uuid::new_v4(),
        game_id,
        name: request.name.trim().to_owned(),
        order_index: request.order_index,
    };
    store.insert_round(round.clone()).await?;

    finish(state, game_id, "add_round").await;
    Ok(round.into())
}

/// Register a team under its join code.
pub async fn add_team(
    state: &SharedState,
    game_id: Uuid,
    request: AddTeamRequest,
) -> Result<TeamSummary, ServiceError> {
    let store = state.require_store().await?;
    if store.find_game(game_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!("game `{game_id}` not found")));
    }

    let team = TeamEntity {
        id: Uuid::new_v4(),
        game_id,
        name: request.name.trim().to_owned(),
        code: normalize_team_code(&request.code),
    };
    match store.insert_team(team.clone()).await {
        Ok(()) => {}
        Err(err) if err.is_duplicate() => {
            return Err(ServiceError::Rejected(format!(
                "team code `{}` already taken",
                team.code
            )));
        }
        Err(err) => return Err(err.into()),
    }

    info!(game_id = %game_id, team = %team.code, "team registered");
    finish(state, game_id, "add_team").await;
    Ok(team.into())
}

/// Add a question to a game's pool.
pub async fn add_question(
    state: &SharedState,
    game_id: Uuid,
    request: AddQuestionRequest,
) -> Result<QuestionSummary, ServiceError> {
    let store = state.require_store().await?;
    if store.find_game(game_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!("game `{game_id}` not found")));
    }

    let question = QuestionEntity {
        id: Uuid::new_v4(),
        game_id,
        text: request.text.trim().to_owned(),
        options: request.options,
        correct_index: request.correct_index,
        kind: request.kind,
    };
    store.insert_question(question.clone()).await?;

    finish(state, game_id, "add_question").await;
    Ok(question.into())
}

/// Select the round that scopes subsequent lifeline usage.
pub async fn set_round(
    state: &SharedState,
    game_id: Uuid,
    request: SetRoundRequest,
) -> Result<ActionResponse, ServiceError> {
    let store = state.require_store().await?;
    if let Some(settings) = store.find_settings(game_id).await? {
        store
            .update_settings(SettingsEntity {
                current_round_id: Some(request.round_id),
                ..settings
            })
            .await?;
    }
    Ok(finish(state, game_id, "set_round").await)
}

/// Put a question on screen: SHOW phase, fresh countdown, buzzers open.
///
/// Any accepted buzz for that question is wiped in the same transaction,
/// so replaying a question always starts from a clean slate.
pub async fn set_question(
    state: &SharedState,
    game_id: Uuid,
    request: SetQuestionRequest,
) -> Result<ActionResponse, ServiceError> {
    let store = state.require_store().await?;
    if let Some(settings) = store.find_settings(game_id).await? {
        match store.find_question(game_id, request.question_id).await? {
            Some(question) => {
                let seconds = request
                    .seconds
                    .unwrap_or_else(|| state.config().default_question_secs())
                    .max(1);
                let updated = SettingsEntity {
                    current_question_id: Some(question.id),
                    state: GamePhase::Show,
                    deadline_epoch_ms: now_epoch_ms().saturating_add(secs_to_ms(seconds)),
                    active_team_id: None,
                    ..settings
                };
                store
                    .replace_settings_clearing_buzz(updated, question.id)
                    .await?;
                info!(game_id = %game_id, question_id = %question.id, seconds, "question put on screen");
            }
            None => {
                warn!(
                    game_id = %game_id,
                    question_id = %request.question_id,
                    "set-question ignored: unknown question"
                );
            }
        }
    }
    Ok(finish(state, game_id, "set_question").await)
}

/// Force the game phase directly.
pub async fn set_state(
    state: &SharedState,
    game_id: Uuid,
    request: SetStateRequest,
) -> Result<ActionResponse, ServiceError> {
    let store = state.require_store().await?;
    if let Some(settings) = store.find_settings(game_id).await? {
        store
            .update_settings(SettingsEntity {
                state: request.state,
                ..settings
            })
            .await?;
    }
    Ok(finish(state, game_id, "set_state").await)
}

/// (Re)start the countdown from now, leaving the phase untouched.
pub async fn start_timer(
    state: &SharedState,
    game_id: Uuid,
    request: StartTimerRequest,
) -> Result<ActionResponse, ServiceError> {
    let store = state.require_store().await?;
    if let Some(settings) = store.find_settings(game_id).await? {
        let seconds = request
            .seconds
            .unwrap_or_else(|| state.config().default_question_secs())
            .max(1);
        store
            .update_settings(SettingsEntity {
                deadline_epoch_ms: now_epoch_ms().saturating_add(secs_to_ms(seconds)),
                ..settings
            })
            .await?;
    }
    Ok(finish(state, game_id, "start_timer").await)
}

/// Push a running countdown further out. A game without a countdown
/// (deadline zero) is left alone.
pub async fn add_time(
    state: &SharedState,
    game_id: Uuid,
    request: AddTimeRequest,
) -> Result<ActionResponse, ServiceError> {
    let store = state.require_store().await?;
    if let Some(settings) = store.find_settings(game_id).await? {
        if settings.deadline_epoch_ms != 0 {
            let seconds = request
                .seconds
                .unwrap_or_else(|| state.config().default_extend_secs())
                .max(1);
            let deadline = settings.deadline_epoch_ms.saturating_add(secs_to_ms(seconds));
            store
                .update_settings(SettingsEntity {
                    deadline_epoch_ms: deadline,
                    ..settings
                })
                .await?;
        }
    }
    Ok(finish(state, game_id, "add_time").await)
}

/// Release the buzz lock for the current question so teams can race again.
pub async fn unlock_buzz(
    state: &SharedState,
    game_id: Uuid,
) -> Result<ActionResponse, ServiceError> {
    let store = state.require_store().await?;
    if let Some(settings) = store.find_settings(game_id).await? {
        if let Some(question_id) = settings.current_question_id {
            let updated = SettingsEntity {
                active_team_id: None,
                ..settings
            };
            store
                .replace_settings_clearing_buzz(updated, question_id)
                .await?;
            info!(game_id = %game_id, question_id = %question_id, "buzzers unlocked");
        }
    }
    Ok(finish(state, game_id, "unlock_buzz").await)
}

/// Delete every stored fifty-fifty mask for the current question.
pub async fn clear_masks(
    state: &SharedState,
    game_id: Uuid,
) -> Result<ActionResponse, ServiceError> {
    let store = state.require_store().await?;
    if let Some(settings) = store.find_settings(game_id).await? {
        if let Some(question_id) = settings.current_question_id {
            store.clear_masks(game_id, question_id).await?;
            info!(game_id = %game_id, question_id = %question_id, "masks cleared");
        }
    }
    Ok(finish(state, game_id, "clear_masks").await)
}

/// Hand the buzzer to a team manually, or clear it with a null team id.
///
/// The id is stored as given; pointing at a team that does not exist simply
/// broadcasts a snapshot without an active team.
pub async fn set_active_team(
    state: &SharedState,
    game_id: Uuid,
    request: SetActiveTeamRequest,
) -> Result<ActionResponse, ServiceError> {
    let store = state.require_store().await?;
    if let Some(settings) = store.find_settings(game_id).await? {
        store
            .update_settings(SettingsEntity {
                active_team_id: request.team_id,
                ..settings
            })
            .await?;
    }
    Ok(finish(state, game_id, "set_active_team").await)
}

/// Re-push the current snapshot without mutating anything.
pub async fn broadcast(state: &SharedState, game_id: Uuid) -> Result<ActionResponse, ServiceError> {
    state.require_store().await?;
    Ok(finish(state, game_id, "broadcast").await)
}

/// Close out an admin command the way every command ends: push the fresh
/// snapshot to the game room, then toast what happened.
async fn finish(state: &SharedState, game_id: Uuid, op: &str) -> ActionResponse {
    broadcast_service::broadcast_state(state, game_id).await;
    let ack = ActionResponse::applied(op);
    broadcast_service::notify_toast(state, game_id, ack.message.clone());
    ack
}

/// Countdown length in storable milliseconds.
fn secs_to_ms(seconds: u64) -> i64 {
    i64::try_from(seconds.saturating_mul(1000)).unwrap_or(i64::MAX)
}
