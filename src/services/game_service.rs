//! Read-only projections for the public REST surface.

use uuid::Uuid;

use crate::{
    dao::models::normalize_team_code,
    dto::{
        common::GameStateSnapshot,
        game::{GameDetail, GameSummary, QuestionSummary, RoundSummary, SettingsView, TeamSummary},
    },
    error::ServiceError,
    services::broadcast_service,
    state::SharedState,
};

/// Return every game known to the backend, oldest first.
pub async fn list_games(state: &SharedState) -> Result<Vec<GameSummary>, ServiceError> {
    let store = state.require_store().await?;
    let games = store.list_games().await?;
    Ok(games.into_iter().map(GameSummary::from).collect())
}

/// Aggregate view of one game: metadata, live settings and rosters.
pub async fn game_detail(state: &SharedState, game_id: Uuid) -> Result<GameDetail, ServiceError> {
    let store = state.require_store().await?;
    let Some(game) = store.find_game(game_id).await? else {
        return Err(ServiceError::NotFound(format!("game `{game_id}` not found")));
    };

    let settings = store.find_settings(game_id).await?.map(SettingsView::from);
    let rounds = store
        .list_rounds(game_id)
        .await?
        .into_iter()
        .map(RoundSummary::from)
        .collect();
    let teams = store
        .list_teams(game_id)
        .await?
        .into_iter()
        .map(TeamSummary::from)
        .collect();
    let questions = store
        .list_questions(game_id)
        .await?
        .into_iter()
        .map(QuestionSummary::from)
        .collect();

    Ok(GameDetail {
        game: game.into(),
        settings,
        rounds,
        teams,
        questions,
    })
}

/// Public live state of one game, the same projection pushed to its room.
pub async fn game_state(
    state: &SharedState,
    game_id: Uuid,
) -> Result<GameStateSnapshot, ServiceError> {
    let store = state.require_store().await?;
    let Some(snapshot) = broadcast_service::load_snapshot(store.as_ref(), game_id).await? else {
        return Err(ServiceError::NotFound(format!("game `{game_id}` not found")));
    };
    Ok(snapshot)
}

/// Resolve a team by its join code, for clients checking a code before the
/// WebSocket join.
pub async fn find_team_by_code(
    state: &SharedState,
    game_id: Uuid,
    code: &str,
) -> Result<TeamSummary, ServiceError> {
    let store = state.require_store().await?;
    let code = normalize_team_code(code);
    let Some(team) = store.find_team_by_code(game_id, code.clone()).await? else {
        return Err(ServiceError::NotFound(format!(
            "no team with code `{code}`"
        )));
    };
    Ok(team.into())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::{
                GameEntity, GamePhase, QuestionEntity, QuestionKind, SettingsEntity, now_epoch_ms,
            },
            state_store::memory::MemoryStateStore,
        },
        state::AppState,
    };

    async fn seeded_state() -> (SharedState, Uuid, Uuid) {
        let state = AppState::new(AppConfig::default());
        state
            .install_state_store(Arc::new(MemoryStateStore::new()))
            .await;
        let store = state.require_store().await.unwrap();

        let game_id = Uuid::new_v4();
        store
            .create_game(
                GameEntity {
                    id: game_id,
                    name: "Quiz Night".into(),
                    created_at_epoch_ms: now_epoch_ms(),
                },
                SettingsEntity::initial(game_id),
            )
            .await
            .unwrap();

        let question_id = Uuid::new_v4();
        store
            .insert_question(QuestionEntity {
                id: question_id,
                game_id,
                text: "Capital of France?".into(),
                options: vec![
                    "London".into(),
                    "Berlin".into(),
                    "Paris".into(),
                    "Madrid".into(),
                ],
                correct_index: 2,
                kind: QuestionKind::MultipleChoice,
            })
            .await
            .unwrap();

        (state, game_id, question_id)
    }

    #[tokio::test]
    async fn game_state_serves_the_broadcast_projection() {
        let (state, game_id, question_id) = seeded_state().await;
        let store = state.require_store().await.unwrap();
        let settings = store.find_settings(game_id).await.unwrap().unwrap();
        store
            .update_settings(SettingsEntity {
                state: GamePhase::Show,
                current_question_id: Some(question_id),
                ..settings
            })
            .await
            .unwrap();

        let snapshot = game_state(&state, game_id).await.unwrap();
        assert_eq!(snapshot.game_id, game_id);
        assert_eq!(snapshot.state, GamePhase::Show);
        let question = snapshot.question.expect("current question projected");
        assert_eq!(question.id, question_id);

        // The REST surface leaks no more than the room push does.
        let json = serde_json::to_value(&question).unwrap();
        assert!(json.get("correct_index").is_none());
    }

    #[tokio::test]
    async fn game_state_for_an_unknown_game_is_not_found() {
        let (state, _game_id, _question_id) = seeded_state().await;

        let result = game_state(&state, Uuid::new_v4()).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }
}
