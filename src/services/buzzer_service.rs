//! Buzzer arbitration.
//!
//! Winning the buzzer race means winning an insert against the accepted-buzz
//! uniqueness constraint inside one storage transaction. The service never
//! decides the winner by reading first, which keeps arbitration correct for
//! any number of server processes sharing the backend.

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::models::{BuzzerEventEntity, GamePhase, normalize_team_code, now_epoch_ms},
    error::ServiceError,
    services::broadcast_service,
    state::SharedState,
};

/// Outcome of a won buzz, announced to the game room as `buzz_lock`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuzzWin {
    pub question_id: Uuid,
    pub team_code: String,
    pub team_name: String,
}

/// Try to claim the buzzer for the current question of `game_id`.
///
/// Exactly one caller per (game, question) gets `Ok`; every later or
/// concurrent one is told another team buzzed first. On success the
/// `buzz_lock` announcement and a fresh snapshot go out to the game room.
pub async fn attempt_buzz(
    state: &SharedState,
    game_id: Uuid,
    team_code: &str,
) -> Result<BuzzWin, ServiceError> {
    let store = state.require_store().await?;
    let code = normalize_team_code(team_code);

    let Some(team) = store.find_team_by_code(game_id, code).await? else {
        return Err(ServiceError::Rejected("Invalid team".into()));
    };

    let Some(settings) = store.find_settings(game_id).await? else {
        return Err(ServiceError::Rejected(
            "Buzzing not allowed in current state".into(),
        ));
    };
    if settings.state != GamePhase::Show {
        return Err(ServiceError::Rejected(
            "Buzzing not allowed in current state".into(),
        ));
    }
    let Some(question_id) = settings.current_question_id else {
        return Err(ServiceError::Rejected("No current question".into()));
    };

    let event = BuzzerEventEntity {
        game_id,
        team_id: team.id,
        question_id,
        ts_epoch_ms: now_epoch_ms(),
        accepted: true,
    };

    match store.record_accepted_buzz(event).await {
        Ok(()) => {}
        Err(err) if err.is_duplicate() => {
            return Err(ServiceError::Conflict("Another team buzzed first".into()));
        }
        Err(err) => {
            warn!(game_id = %game_id, team = %team.code, error = %err, "buzz commit failed");
            return Err(ServiceError::Unavailable(err));
        }
    }

    info!(
        game_id = %game_id,
        team = %team.code,
        question_id = %question_id,
        "buzz accepted"
    );

    broadcast_service::notify_buzz_lock(state, game_id, question_id, &team);
    broadcast_service::broadcast_state(state, game_id).await;

    Ok(BuzzWin {
        question_id,
        team_code: team.code,
        team_name: team.name,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::Barrier;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::{GameEntity, QuestionEntity, QuestionKind, SettingsEntity, TeamEntity},
            state_store::memory::MemoryStateStore,
        },
        state::AppState,
    };

    async fn seeded_state(codes: &[&str]) -> (SharedState, Uuid, Uuid) {
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

        for code in codes {
            store
                .insert_team(TeamEntity {
                    id: Uuid::new_v4(),
                    game_id,
                    name: format!("Team {code}"),
                    code: (*code).to_owned(),
                })
                .await
                .unwrap();
        }

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

    async fn open_question(state: &SharedState, game_id: Uuid, question_id: Uuid) {
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
    }

    #[tokio::test]
    async fn concurrent_buzzes_elect_exactly_one_winner() {
        let codes = ["TEAM_A", "TEAM_B", "TEAM_C", "TEAM_D"];
        let (state, game_id, question_id) = seeded_state(&codes).await;
        open_question(&state, game_id, question_id).await;

        let barrier = Arc::new(Barrier::new(codes.len()));
        let mut handles = Vec::new();
        for code in codes {
            let state = state.clone();
            let barrier = barrier.clone();
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                attempt_buzz(&state, game_id, code).await
            }));
        }

        let mut wins = Vec::new();
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(win) => wins.push(win),
                Err(ServiceError::Conflict(message)) => {
                    assert_eq!(message, "Another team buzzed first");
                    conflicts += 1;
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(wins.len(), 1); // single winner no matter the interleaving
        assert_eq!(conflicts, codes.len() - 1);

        let store = state.require_store().await.unwrap();
        let accepted = store
            .find_accepted_buzz(game_id, question_id)
            .await
            .unwrap()
            .unwrap();
        let winner = store
            .find_team_by_code(game_id, wins[0].team_code.clone())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(accepted.team_id, winner.id);

        let settings = store.find_settings(game_id).await.unwrap().unwrap();
        assert_eq!(settings.active_team_id, Some(winner.id));
    }

    #[tokio::test]
    async fn a_second_buzz_after_the_lock_loses() {
        let (state, game_id, question_id) = seeded_state(&["TEAM_A", "TEAM_B"]).await;
        open_question(&state, game_id, question_id).await;

        let win = attempt_buzz(&state, game_id, "TEAM_A").await.unwrap();
        assert_eq!(win.question_id, question_id);
        assert_eq!(win.team_code, "TEAM_A");

        let loss = attempt_buzz(&state, game_id, "TEAM_B").await;
        assert!(matches!(
            loss,
            Err(ServiceError::Conflict(message)) if message == "Another team buzzed first"
        ));
    }

    #[tokio::test]
    async fn buzzing_outside_show_is_rejected() {
        let (state, game_id, question_id) = seeded_state(&["TEAM_A"]).await;
        // settings stay IDLE with a question selected
        let store = state.require_store().await.unwrap();
        let settings = store.find_settings(game_id).await.unwrap().unwrap();
        store
            .update_settings(SettingsEntity {
                current_question_id: Some(question_id),
                ..settings
            })
            .await
            .unwrap();

        let result = attempt_buzz(&state, game_id, "TEAM_A").await;
        assert!(matches!(
            result,
            Err(ServiceError::Rejected(message)) if message == "Buzzing not allowed in current state"
        ));
    }

    #[tokio::test]
    async fn buzzing_without_a_question_is_rejected() {
        let (state, game_id, _question_id) = seeded_state(&["TEAM_A"]).await;
        let store = state.require_store().await.unwrap();
        let settings = store.find_settings(game_id).await.unwrap().unwrap();
        store
            .update_settings(SettingsEntity {
                state: GamePhase::Show,
                ..settings
            })
            .await
            .unwrap();

        let result = attempt_buzz(&state, game_id, "TEAM_A").await;
        assert!(matches!(
            result,
            Err(ServiceError::Rejected(message)) if message == "No current question"
        ));
    }

    #[tokio::test]
    async fn unknown_team_codes_are_rejected() {
        let (state, game_id, question_id) = seeded_state(&["TEAM_A"]).await;
        open_question(&state, game_id, question_id).await;

        let result = attempt_buzz(&state, game_id, "NOBODY").await;
        assert!(matches!(
            result,
            Err(ServiceError::Rejected(message)) if message == "Invalid team"
        ));
    }

    #[tokio::test]
    async fn buzz_codes_normalize_before_lookup() {
        let (state, game_id, question_id) = seeded_state(&["TEAM_A"]).await;
        open_question(&state, game_id, question_id).await;

        let win = attempt_buzz(&state, game_id, "  team_a ").await.unwrap();
        assert_eq!(win.team_code, "TEAM_A"); // stored, normalized form
    }
}
