use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::{
        common::GameStateSnapshot,
        game::{GameDetail, GameSummary, TeamSummary},
    },
    error::AppError,
    services::game_service,
    state::SharedState,
};

/// Read-only game projections for host screens and team clients.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/games", get(list_games))
        .route("/games/{id}", get(get_game))
        .route("/games/{id}/state", get(game_state))
        .route("/games/{id}/teams/by-code/{code}", get(find_team_by_code))
}

/// List every game, oldest first.
#[utoipa::path(
    get,
    path = "/games",
    tag = "games",
    responses((status = 200, description = "List available games", body = [GameSummary]))
)]
pub async fn list_games(
    State(state): State<SharedState>,
) -> Result<Json<Vec<GameSummary>>, AppError> {
    Ok(Json(game_service::list_games(&state).await?))
}

/// Retrieve one game with its settings and rosters.
#[utoipa::path(
    get,
    path = "/games/{id}",
    tag = "games",
    params(("id" = Uuid, Path, description = "Identifier of the game to retrieve")),
    responses(
        (status = 200, description = "Game detail", body = GameDetail),
        (status = 404, description = "Game not found")
    )
)]
pub async fn get_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameDetail>, AppError> {
    Ok(Json(game_service::game_detail(&state, id).await?))
}

/// Public live state of one game, without the correct answer index.
#[utoipa::path(
    get,
    path = "/games/{id}/state",
    tag = "games",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    responses(
        (status = 200, description = "Public game state", body = GameStateSnapshot),
        (status = 404, description = "Game not found")
    )
)]
pub async fn game_state(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameStateSnapshot>, AppError> {
    Ok(Json(game_service::game_state(&state, id).await?))
}

/// Resolve a team by its join code (case-insensitive).
#[utoipa::path(
    get,
    path = "/games/{id}/teams/by-code/{code}",
    tag = "games",
    params(
        ("id" = Uuid, Path, description = "Identifier of the game"),
        ("code" = String, Path, description = "Team join code, any case")
    ),
    responses(
        (status = 200, description = "Team", body = TeamSummary),
        (status = 404, description = "No team with that code")
    )
)]
pub async fn find_team_by_code(
    State(state): State<SharedState>,
    Path((id, code)): Path<(Uuid, String)>,
) -> Result<Json<TeamSummary>, AppError> {
    Ok(Json(
        game_service::find_team_by_code(&state, id, &code).await?,
    ))
}
