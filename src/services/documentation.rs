use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the QuizMaster backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::websocket::ws_handler,
        crate::routes::game::list_games,
        crate::routes::game::get_game,
        crate::routes::game::game_state,
        crate::routes::game::find_team_by_code,
        crate::routes::admin::create_game,
        crate::routes::admin::add_round,
        crate::routes::admin::add_team,
        crate::routes::admin::add_question,
        crate::routes::admin::set_round,
        crate::routes::admin::set_question,
        crate::routes::admin::set_state,
        crate::routes::admin::start_timer,
        crate::routes::admin::add_time,
        crate::routes::admin::unlock_buzz,
        crate::routes::admin::clear_masks,
        crate::routes::admin::set_active_team,
        crate::routes::admin::broadcast,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::ws::ClientMessage,
            crate::dto::ws::ServerMessage,
            crate::dto::ws::ClientRole,
            crate::dto::common::GameStateSnapshot,
            crate::dao::models::GamePhase,
            crate::dao::models::QuestionKind,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "games", description = "Read-only game projections"),
        (name = "admin", description = "Game control commands for the admin console"),
        (name = "ws", description = "WebSocket endpoint for teams, hosts and admins"),
    )
)]
pub struct ApiDoc;
