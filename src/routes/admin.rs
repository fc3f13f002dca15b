use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        admin::{
            ActionResponse, AddQuestionRequest, AddRoundRequest, AddTeamRequest, AddTimeRequest,
            CreateGameRequest, SetActiveTeamRequest, SetQuestionRequest, SetRoundRequest,
            SetStateRequest, StartTimerRequest,
        },
        game::{GameSummary, QuestionSummary, RoundSummary, TeamSummary},
    },
    error::AppError,
    services::admin_service,
    state::SharedState,
};

/// Admin endpoints driving the quiz night.
///
/// The console runs on a trusted network segment; there is deliberately no
/// authentication layer in front of these routes.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/admin/games", post(create_game))
        .route("/admin/games/{id}/rounds", post(add_round))
        .route("/admin/games/{id}/teams", post(add_team))
        .route("/admin/games/{id}/questions", post(add_question))
        .route("/admin/games/{id}/set-round", post(set_round))
        .route("/admin/games/{id}/set-question", post(set_question))
        .route("/admin/games/{id}/set-state", post(set_state))
        .route("/admin/games/{id}/start-timer", post(start_timer))
        .route("/admin/games/{id}/add-time", post(add_time))
        .route("/admin/games/{id}/unlock-buzz", post(unlock_buzz))
        .route("/admin/games/{id}/clear-masks", post(clear_masks))
        .route("/admin/games/{id}/set-active-team", post(set_active_team))
        .route("/admin/games/{id}/broadcast", post(broadcast))
}

/// Create a game with its initial idle settings.
#[utoipa::path(
    post,
    path = "/admin/games",
    tag = "admin",
    request_body = CreateGameRequest,
    responses((status = 200, description = "Game created", body = GameSummary))
)]
pub async fn create_game(
    State(state): State<SharedState>,
    Json(payload): Json<CreateGameRequest>,
) -> Result<Json<GameSummary>, AppError> {
    payload.validate()?;
    Ok(Json(admin_service::create_game(&state, payload).await?))
}

/// Append a round to a game.
#[utoipa::path(
    post,
    path = "/admin/games/{id}/rounds",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    request_body = AddRoundRequest,
    responses(
        (status = 200, description = "Round added", body = RoundSummary),
        (status = 404, description = "Game not found")
    )
)]
pub async fn add_round(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddRoundRequest>,
) -> Result<Json<RoundSummary>, AppError> {
    payload.validate()?;
    Ok(Json(admin_service::add_round(&state, id, payload).await?))
}

/// Register a team under its join code.
#[utoipa::path(
    post,
    path = "/admin/games/{id}/teams",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    request_body = AddTeamRequest,
    responses(
        (status = 200, description = "Team registered", body = TeamSummary),
        (status = 404, description = "Game not found"),
        (status = 409, description = "Join code already taken")
    )
)]
pub async fn add_team(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddTeamRequest>,
) -> Result<Json<TeamSummary>, AppError> {
    payload.validate()?;
    Ok(Json(admin_service::add_team(&state, id, payload).await?))
}

/// Add a question to the game's pool.
#[utoipa::path(
    post,
    path = "/admin/games/{id}/questions",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    request_body = AddQuestionRequest,
    responses(
        (status = 200, description = "Question added", body = QuestionSummary),
        (status = 404, description = "Game not found")
    )
)]
pub async fn add_question(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddQuestionRequest>,
) -> Result<Json<QuestionSummary>, AppError> {
    payload.validate()?;
    Ok(Json(
        admin_service::add_question(&state, id, payload).await?,
    ))
}

/// Select the round scoping subsequent lifeline usage.
#[utoipa::path(
    post,
    path = "/admin/games/{id}/set-round",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    request_body = SetRoundRequest,
    responses((status = 200, description = "Round selected", body = ActionResponse))
)]
pub async fn set_round(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetRoundRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(admin_service::set_round(&state, id, payload).await?))
}

/// Put a question on screen with a fresh countdown and open buzzers.
#[utoipa::path(
    post,
    path = "/admin/games/{id}/set-question",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    request_body = SetQuestionRequest,
    responses((status = 200, description = "Question set", body = ActionResponse))
)]
pub async fn set_question(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetQuestionRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(
        admin_service::set_question(&state, id, payload).await?,
    ))
}

/// Force the game phase directly.
#[utoipa::path(
    post,
    path = "/admin/games/{id}/set-state",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    request_body = SetStateRequest,
    responses((status = 200, description = "Phase set", body = ActionResponse))
)]
pub async fn set_state(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetStateRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(admin_service::set_state(&state, id, payload).await?))
}

/// (Re)start the countdown from now.
#[utoipa::path(
    post,
    path = "/admin/games/{id}/start-timer",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    request_body = StartTimerRequest,
    responses((status = 200, description = "Countdown started", body = ActionResponse))
)]
pub async fn start_timer(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StartTimerRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(
        admin_service::start_timer(&state, id, payload).await?,
    ))
}

/// Push a running countdown further out.
#[utoipa::path(
    post,
    path = "/admin/games/{id}/add-time",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    request_body = AddTimeRequest,
    responses((status = 200, description = "Countdown extended", body = ActionResponse))
)]
pub async fn add_time(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddTimeRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(admin_service::add_time(&state, id, payload).await?))
}

/// Release the buzz lock so teams can race again.
#[utoipa::path(
    post,
    path = "/admin/games/{id}/unlock-buzz",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    responses((status = 200, description = "Buzzers unlocked", body = ActionResponse))
)]
pub async fn unlock_buzz(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(admin_service::unlock_buzz(&state, id).await?))
}

/// Delete every fifty-fifty mask stored for the current question.
#[utoipa::path(
    post,
    path = "/admin/games/{id}/clear-masks",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    responses((status = 200, description = "Masks cleared", body = ActionResponse))
)]
pub async fn clear_masks(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(admin_service::clear_masks(&state, id).await?))
}

/// Hand the buzzer to a team manually, or clear it with a null team id.
#[utoipa::path(
    post,
    path = "/admin/games/{id}/set-active-team",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    request_body = SetActiveTeamRequest,
    responses((status = 200, description = "Active team updated", body = ActionResponse))
)]
pub async fn set_active_team(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetActiveTeamRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(
        admin_service::set_active_team(&state, id, payload).await?,
    ))
}

/// Re-push the current snapshot to every connected screen.
#[utoipa::path(
    post,
    path = "/admin/games/{id}/broadcast",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    responses((status = 200, description = "Snapshot pushed", body = ActionResponse))
)]
pub async fn broadcast(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(admin_service::broadcast(&state, id).await?))
}
