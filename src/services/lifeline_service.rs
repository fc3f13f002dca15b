//! Fifty-fifty lifeline.
//!
//! The mask is a pure function of (game, team code, question), so a
//! reconnecting client or a duplicated request converges on identical
//! output without coordination. Persistence only enforces the
//! once-per-round budget and replays the stored mask on re-requests.

use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::models::{
        GamePhase, LifelineKind, LifelineUsageEntity, QuestionKind, TeamMaskEntity,
        normalize_team_code, now_epoch_ms,
    },
    error::ServiceError,
    services::broadcast_service,
    state::SharedState,
};

/// Outcome of a granted (or replayed) fifty-fifty request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskGrant {
    pub question_id: Uuid,
    pub team_code: String,
    /// The two hidden option indices, ascending.
    pub masked: [u8; 2],
}

/// Deterministically pick the two wrong options hidden from `team_code` on
/// one question.
///
/// The SHA-256 of `"{game_id}:{team_code}:{question_id}"` seeds the choice:
/// its first eight bytes, read big-endian, select which wrong option
/// survives. Multiple-choice questions carry exactly four options, so three
/// indices are wrong; the roll keeps one of them visible and the remaining
/// two come out ascending.
pub fn fifty_fifty_mask(
    game_id: Uuid,
    team_code: &str,
    question_id: Uuid,
    correct_index: u8,
) -> [u8; 2] {
    let seed = format!("{game_id}:{team_code}:{question_id}");
    let digest = Sha256::digest(seed.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    let roll = u64::from_be_bytes(prefix);

    let wrong: Vec<u8> = (0..4).filter(|&index| index != correct_index).collect();
    let survivor = wrong[(roll % 3) as usize];

    let mut masked = [0u8; 2];
    for (slot, index) in wrong
        .into_iter()
        .filter(|&index| index != survivor)
        .take(2)
        .enumerate()
    {
        masked[slot] = index;
    }
    masked
}

/// Grant the fifty-fifty lifeline to a team for the current question.
///
/// The rules, checked in order: the team must exist, the game must be in
/// the SHOW phase with a multiple-choice question on screen, and the team
/// must not have consumed the lifeline in the current round yet. A team
/// re-requesting on a question it already holds a mask for gets the stored
/// mask replayed instead of an error, so reconnects are invisible.
pub async fn request_fifty_fifty(
    state: &SharedState,
    game_id: Uuid,
    team_code: &str,
) -> Result<MaskGrant, ServiceError> {
    let store = state.require_store().await?;
    let code = normalize_team_code(team_code);

    let Some(team) = store.find_team_by_code(game_id, code).await? else {
        return Err(ServiceError::Rejected("Invalid team".into()));
    };

    let Some(settings) = store.find_settings(game_id).await? else {
        return Err(ServiceError::Rejected(
            "50-50 not allowed in current state".into(),
        ));
    };
    if settings.state != GamePhase::Show {
        return Err(ServiceError::Rejected(
            "50-50 not allowed in current state".into(),
        ));
    }
    let Some(question_id) = settings.current_question_id else {
        return Err(ServiceError::Rejected("No current question".into()));
    };
    let Some(question) = store.find_question(game_id, question_id).await? else {
        return Err(ServiceError::Rejected("No current question".into()));
    };
    if question.kind != QuestionKind::MultipleChoice {
        return Err(ServiceError::Rejected(
            "50-50 only available for multiple choice questions".into(),
        ));
    }

    // Replay for reconnecting clients; the budget was spent the first time.
    if let Some(existing) = store.find_mask(game_id, team.id, question_id).await? {
        broadcast_service::notify_mask_applied(
            state,
            game_id,
            &team.code,
            question_id,
            existing.masked,
        );
        return Ok(MaskGrant {
            question_id,
            team_code: team.code,
            masked: existing.masked,
        });
    }

    let used = store
        .find_lifeline_usage(
            game_id,
            team.id,
            LifelineKind::FiftyFifty,
            settings.current_round_id,
        )
        .await?;
    if used.is_some() {
        return Err(ServiceError::Rejected(
            "50-50 lifeline already used this round".into(),
        ));
    }

    let masked = fifty_fifty_mask(game_id, &team.code, question_id, question.correct_index);
    let now = now_epoch_ms();
    let mask_row = TeamMaskEntity {
        game_id,
        team_id: team.id,
        question_id,
        masked,
        ts_epoch_ms: now,
    };
    let usage_row = LifelineUsageEntity {
        game_id,
        team_id: team.id,
        lifeline: LifelineKind::FiftyFifty,
        round_id: settings.current_round_id,
        used_at_epoch_ms: now,
    };

    match store.apply_mask_with_usage(mask_row, usage_row).await {
        Ok(()) => {}
        Err(err) if err.is_duplicate() => {
            // Lost a race against an identical request. If the winner stored
            // a mask for this question the outcome is the same; replay it.
            if let Some(existing) = store.find_mask(game_id, team.id, question_id).await? {
                broadcast_service::notify_mask_applied(
                    state,
                    game_id,
                    &team.code,
                    question_id,
                    existing.masked,
                );
                return Ok(MaskGrant {
                    question_id,
                    team_code: team.code,
                    masked: existing.masked,
                });
            }
            return Err(ServiceError::Rejected(
                "50-50 lifeline already used this round".into(),
            ));
        }
        Err(err) => {
            warn!(game_id = %game_id, team = %team.code, error = %err, "fifty-fifty commit failed");
            return Err(ServiceError::Unavailable(err));
        }
    }

    info!(
        game_id = %game_id,
        team = %team.code,
        question_id = %question_id,
        masked = ?masked,
        "fifty-fifty applied"
    );

    broadcast_service::notify_mask_applied(state, game_id, &team.code, question_id, masked);

    Ok(MaskGrant {
        question_id,
        team_code: team.code,
        masked,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::ws::Message;
    use tokio::sync::{Barrier, mpsc};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::{GameEntity, QuestionEntity, SettingsEntity, TeamEntity},
            state_store::memory::MemoryStateStore,
        },
        state::{AppState, RoomKey},
    };

    fn fixed_game() -> Uuid {
        Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap()
    }

    fn fixed_question() -> Uuid {
        Uuid::parse_str("22222222-2222-2222-2222-222222222222").unwrap()
    }

    #[test]
    fn mask_is_deterministic_for_the_same_inputs() {
        let first = fifty_fifty_mask(fixed_game(), "TEAM_B", fixed_question(), 2);
        let second = fifty_fifty_mask(fixed_game(), "TEAM_B", fixed_question(), 2);
        assert_eq!(first, second);
    }

    #[test]
    fn mask_matches_pinned_sha256_vectors() {
        // Precomputed from the seed "{game}:{code}:{question}"; covers all
        // three possible masks for correct index 2.
        assert_eq!(
            fifty_fifty_mask(fixed_game(), "TEAM_B", fixed_question(), 2),
            [1, 3]
        );
        assert_eq!(
            fifty_fifty_mask(fixed_game(), "ALPHA", fixed_question(), 2),
            [0, 3]
        );
        assert_eq!(
            fifty_fifty_mask(fixed_game(), "DELTA", fixed_question(), 2),
            [0, 1]
        );
    }

    #[test]
    fn the_correct_option_is_never_masked() {
        for correct_index in 0..4u8 {
            for salt in 0..16u32 {
                let masked = fifty_fifty_mask(
                    fixed_game(),
                    &format!("TEAM_{salt}"),
                    fixed_question(),
                    correct_index,
                );
                assert!(!masked.contains(&correct_index));
                assert!(masked[0] < masked[1]); // ascending by construction
                assert!(masked.iter().all(|&index| index < 4));
            }
        }
    }

    async fn seeded_state(question_kind: QuestionKind) -> (SharedState, Uuid, Uuid, Uuid) {
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

        let team_id = Uuid::new_v4();
        store
            .insert_team(TeamEntity {
                id: team_id,
                game_id,
                name: "Team B".into(),
                code: "TEAM_B".into(),
            })
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
                kind: question_kind,
            })
            .await
            .unwrap();

        let settings = store.find_settings(game_id).await.unwrap().unwrap();
        store
            .update_settings(SettingsEntity {
                state: GamePhase::Show,
                current_question_id: Some(question_id),
                ..settings
            })
            .await
            .unwrap();

        (state, game_id, team_id, question_id)
    }

    #[tokio::test]
    async fn a_granted_mask_hides_two_wrong_options() {
        let (state, game_id, _team_id, question_id) =
            seeded_state(QuestionKind::MultipleChoice).await;

        let grant = request_fifty_fifty(&state, game_id, "TEAM_B").await.unwrap();

        assert_eq!(grant.question_id, question_id);
        assert_eq!(grant.team_code, "TEAM_B");
        // Correct index is 2, so the mask draws from the wrong {0, 1, 3}.
        assert!(!grant.masked.contains(&2));
        assert!(grant.masked[0] < grant.masked[1]);
    }

    #[tokio::test]
    async fn re_requesting_replays_the_stored_mask() {
        let (state, game_id, _team_id, _question_id) =
            seeded_state(QuestionKind::MultipleChoice).await;

        let first = request_fifty_fifty(&state, game_id, "TEAM_B").await.unwrap();
        let second = request_fifty_fifty(&state, game_id, "TEAM_B").await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn the_lifeline_is_spent_for_the_rest_of_the_round() {
        let (state, game_id, _team_id, _question_id) =
            seeded_state(QuestionKind::MultipleChoice).await;
        request_fifty_fifty(&state, game_id, "TEAM_B").await.unwrap();

        // Another question in the same round.
        let store = state.require_store().await.unwrap();
        let next_question = Uuid::new_v4();
        store
            .insert_question(QuestionEntity {
                id: next_question,
                game_id,
                text: "Largest planet?".into(),
                options: vec![
                    "Earth".into(),
                    "Jupiter".into(),
                    "Saturn".into(),
                    "Mars".into(),
                ],
                correct_index: 1,
                kind: QuestionKind::MultipleChoice,
            })
            .await
            .unwrap();
        let settings = store.find_settings(game_id).await.unwrap().unwrap();
        store
            .update_settings(SettingsEntity {
                current_question_id: Some(next_question),
                ..settings
            })
            .await
            .unwrap();

        let result = request_fifty_fifty(&state, game_id, "TEAM_B").await;
        assert!(matches!(
            result,
            Err(ServiceError::Rejected(message)) if message == "50-50 lifeline already used this round"
        ));
    }

    #[tokio::test]
    async fn a_new_round_restores_the_budget() {
        let (state, game_id, _team_id, _question_id) =
            seeded_state(QuestionKind::MultipleChoice).await;
        request_fifty_fifty(&state, game_id, "TEAM_B").await.unwrap();

        let store = state.require_store().await.unwrap();
        let next_question = Uuid::new_v4();
        store
            .insert_question(QuestionEntity {
                id: next_question,
                game_id,
                text: "Largest planet?".into(),
                options: vec![
                    "Earth".into(),
                    "Jupiter".into(),
                    "Saturn".into(),
                    "Mars".into(),
                ],
                correct_index: 1,
                kind: QuestionKind::MultipleChoice,
            })
            .await
            .unwrap();
        let settings = store.find_settings(game_id).await.unwrap().unwrap();
        store
            .update_settings(SettingsEntity {
                current_round_id: Some(Uuid::new_v4()),
                current_question_id: Some(next_question),
                ..settings
            })
            .await
            .unwrap();

        let grant = request_fifty_fifty(&state, game_id, "TEAM_B").await.unwrap();
        assert_eq!(grant.question_id, next_question);
    }

    #[tokio::test]
    async fn non_multiple_choice_questions_are_rejected() {
        let (state, game_id, _team_id, _question_id) = seeded_state(QuestionKind::Other).await;

        let result = request_fifty_fifty(&state, game_id, "TEAM_B").await;
        assert!(matches!(
            result,
            Err(ServiceError::Rejected(message))
                if message == "50-50 only available for multiple choice questions"
        ));
    }

    #[tokio::test]
    async fn lifelines_are_rejected_outside_show() {
        let (state, game_id, _team_id, question_id) =
            seeded_state(QuestionKind::MultipleChoice).await;
        let store = state.require_store().await.unwrap();
        let settings = store.find_settings(game_id).await.unwrap().unwrap();
        store
            .update_settings(SettingsEntity {
                state: GamePhase::Lock,
                current_question_id: Some(question_id),
                ..settings
            })
            .await
            .unwrap();

        let result = request_fifty_fifty(&state, game_id, "TEAM_B").await;
        assert!(matches!(
            result,
            Err(ServiceError::Rejected(message)) if message == "50-50 not allowed in current state"
        ));
    }

    #[tokio::test]
    async fn mask_notifications_stay_in_the_team_room() {
        let (state, game_id, _team_id, question_id) =
            seeded_state(QuestionKind::MultipleChoice).await;

        let (team_tx, mut team_rx) = mpsc::unbounded_channel();
        let (game_tx, mut game_rx) = mpsc::unbounded_channel();
        state.rooms().join(
            Uuid::new_v4(),
            RoomKey::Team {
                game_id,
                code: "TEAM_B".into(),
            },
            team_tx,
        );
        state
            .rooms()
            .join(Uuid::new_v4(), RoomKey::Game(game_id), game_tx);

        let grant = request_fifty_fifty(&state, game_id, "TEAM_B").await.unwrap();

        let Some(Message::Text(text)) = team_rx.recv().await else {
            panic!("expected a text frame in the team room");
        };
        let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
        assert_eq!(value["type"], "mask_applied");
        assert_eq!(value["question_id"], question_id.to_string());
        assert_eq!(
            value["masked_options"],
            serde_json::json!([grant.masked[0], grant.masked[1]])
        );

        // The game room never sees another team's mask.
        assert!(game_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn concurrent_requests_converge_on_one_mask() {
        let (state, game_id, team_id, question_id) =
            seeded_state(QuestionKind::MultipleChoice).await;

        let barrier = Arc::new(Barrier::new(2));
        let mut handles = Vec::new();
        for _ in 0..2 {
            let state = state.clone();
            let barrier = barrier.clone();
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                request_fifty_fifty(&state, game_id, "TEAM_B").await
            }));
        }

        let mut masks = Vec::new();
        for handle in handles {
            masks.push(handle.await.unwrap().unwrap().masked);
        }
        assert_eq!(masks[0], masks[1]);

        let store = state.require_store().await.unwrap();
        let stored = store
            .find_mask(game_id, team_id, question_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.masked, masks[0]);
    }
}
