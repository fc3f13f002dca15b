use std::sync::Arc;

use futures::future::BoxFuture;
use indexmap::IndexMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::StateStore;
use crate::dao::models::{
    BuzzerEventEntity, GameEntity, LifelineKind, LifelineUsageEntity, QuestionEntity, RoundEntity,
    SettingsEntity, TeamEntity, TeamMaskEntity,
};
use crate::dao::storage::{StorageError, StorageResult};

/// In-memory [`StateStore`] for single-process deployments and tests.
///
/// Transaction semantics: every mutating operation holds the single write
/// lock for its whole duration, so writes are serialized exactly like an
/// immediate-exclusive database transaction. Uniqueness constraints are
/// checked inside that critical section and reported as
/// [`StorageError::Duplicate`], which keeps buzz arbitration correct under
/// concurrent tasks without any caller-side locking.
#[derive(Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<Tables>>,
}

/// Insertion-ordered tables; listing order matches creation order, the same
/// order an autoincrement key would give.
#[derive(Default)]
struct Tables {
    games: IndexMap<Uuid, GameEntity>,
    settings: IndexMap<Uuid, SettingsEntity>,
    rounds: IndexMap<Uuid, RoundEntity>,
    teams: IndexMap<Uuid, TeamEntity>,
    questions: IndexMap<Uuid, QuestionEntity>,
    buzzer_events: Vec<BuzzerEventEntity>,
    team_masks: Vec<TeamMaskEntity>,
    lifeline_usage: Vec<LifelineUsageEntity>,
}

impl MemoryStateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn create_game(
        &self,
        game: GameEntity,
        settings: SettingsEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.write().await;
            if tables.games.contains_key(&game.id) {
                return Err(StorageError::duplicate("games.id"));
            }
            tables.settings.insert(settings.game_id, settings);
            tables.games.insert(game.id, game);
            Ok(())
        })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.read().await;
            Ok(tables.games.get(&id).cloned())
        })
    }

    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.read().await;
            Ok(tables.games.values().cloned().collect())
        })
    }

    fn insert_round(&self, round: RoundEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.write().await;
            tables.rounds.insert(round.id, round);
            Ok(())
        })
    }

    fn list_rounds(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.read().await;
            let mut rounds: Vec<RoundEntity> = tables
                .rounds
                .values()
                .filter(|r| r.game_id == game_id)
                .cloned()
                .collect();
            rounds.sort_by_key(|r| r.order_index);
            Ok(rounds)
        })
    }

    fn insert_team(&self, team: TeamEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.write().await;
            let taken = tables
                .teams
                .values()
                .any(|t| t.game_id == team.game_id && t.code == team.code);
            if taken {
                return Err(StorageError::duplicate("teams.game_code"));
            }
            tables.teams.insert(team.id, team);
            Ok(())
        })
    }

    fn find_team(
        &self,
        game_id: Uuid,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.read().await;
            Ok(tables
                .teams
                .get(&team_id)
                .filter(|t| t.game_id == game_id)
                .cloned())
        })
    }

    fn find_team_by_code(
        &self,
        game_id: Uuid,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.read().await;
            Ok(tables
                .teams
                .values()
                .find(|t| t.game_id == game_id && t.code == code)
                .cloned())
        })
    }

    fn list_teams(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.read().await;
            Ok(tables
                .teams
                .values()
                .filter(|t| t.game_id == game_id)
                .cloned()
                .collect())
        })
    }

    fn insert_question(&self, question: QuestionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.write().await;
            tables.questions.insert(question.id, question);
            Ok(())
        })
    }

    fn find_question(
        &self,
        game_id: Uuid,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.read().await;
            Ok(tables
                .questions
                .get(&question_id)
                .filter(|q| q.game_id == game_id)
                .cloned())
        })
    }

    fn list_questions(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.read().await;
            Ok(tables
                .questions
                .values()
                .filter(|q| q.game_id == game_id)
                .cloned()
                .collect())
        })
    }

    fn find_settings(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<SettingsEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.read().await;
            Ok(tables.settings.get(&game_id).cloned())
        })
    }

    fn update_settings(&self, settings: SettingsEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.write().await;
            if let Some(slot) = tables.settings.get_mut(&settings.game_id) {
                *slot = settings;
            }
            Ok(())
        })
    }

    fn record_accepted_buzz(
        &self,
        event: BuzzerEventEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.write().await;
            let already_won = tables.buzzer_events.iter().any(|e| {
                e.accepted && e.game_id == event.game_id && e.question_id == event.question_id
            });
            if already_won {
                return Err(StorageError::duplicate(
                    "buzzer_events.game_question_accepted",
                ));
            }
            let game_id = event.game_id;
            let team_id = event.team_id;
            tables.buzzer_events.push(event);
            if let Some(settings) = tables.settings.get_mut(&game_id) {
                settings.active_team_id = Some(team_id);
            }
            Ok(())
        })
    }

    fn find_accepted_buzz(
        &self,
        game_id: Uuid,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<BuzzerEventEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.read().await;
            Ok(tables
                .buzzer_events
                .iter()
                .find(|e| e.accepted && e.game_id == game_id && e.question_id == question_id)
                .cloned())
        })
    }

    fn replace_settings_clearing_buzz(
        &self,
        settings: SettingsEntity,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.write().await;
            let game_id = settings.game_id;
            tables
                .buzzer_events
                .retain(|e| !(e.game_id == game_id && e.question_id == question_id && e.accepted));
            if let Some(slot) = tables.settings.get_mut(&game_id) {
                *slot = settings;
            }
            Ok(())
        })
    }

    fn find_mask(
        &self,
        game_id: Uuid,
        team_id: Uuid,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<TeamMaskEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.read().await;
            Ok(tables
                .team_masks
                .iter()
                .find(|m| {
                    m.game_id == game_id && m.team_id == team_id && m.question_id == question_id
                })
                .cloned())
        })
    }

    fn apply_mask_with_usage(
        &self,
        mask: TeamMaskEntity,
        usage: LifelineUsageEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.write().await;
            // Both constraints are checked before either row lands so a
            // violation leaves no partial write behind.
            let mask_exists = tables.team_masks.iter().any(|m| {
                m.game_id == mask.game_id
                    && m.team_id == mask.team_id
                    && m.question_id == mask.question_id
            });
            if mask_exists {
                return Err(StorageError::duplicate("team_masks.game_team_question"));
            }
            let usage_exists = tables.lifeline_usage.iter().any(|u| {
                u.game_id == usage.game_id
                    && u.team_id == usage.team_id
                    && u.lifeline == usage.lifeline
                    && u.round_id == usage.round_id
            });
            if usage_exists {
                return Err(StorageError::duplicate(
                    "lifeline_usage.game_team_lifeline_round",
                ));
            }
            tables.team_masks.push(mask);
            tables.lifeline_usage.push(usage);
            Ok(())
        })
    }

    fn clear_masks(
        &self,
        game_id: Uuid,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.write().await;
            tables
                .team_masks
                .retain(|m| !(m.game_id == game_id && m.question_id == question_id));
            Ok(())
        })
    }

    fn find_lifeline_usage(
        &self,
        game_id: Uuid,
        team_id: Uuid,
        lifeline: LifelineKind,
        round_id: Option<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Option<LifelineUsageEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.read().await;
            Ok(tables
                .lifeline_usage
                .iter()
                .find(|u| {
                    u.game_id == game_id
                        && u.team_id == team_id
                        && u.lifeline == lifeline
                        && u.round_id == round_id
                })
                .cloned())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::{GamePhase, QuestionKind, now_epoch_ms};

    fn game(id: Uuid) -> GameEntity {
        GameEntity {
            id,
            name: "Demo Game".into(),
            created_at_epoch_ms: now_epoch_ms(),
        }
    }

    fn team(game_id: Uuid, code: &str) -> TeamEntity {
        TeamEntity {
            id: Uuid::new_v4(),
            game_id,
            name: format!("Team {code}"),
            code: code.into(),
        }
    }

    fn buzz(game_id: Uuid, team_id: Uuid, question_id: Uuid) -> BuzzerEventEntity {
        BuzzerEventEntity {
            game_id,
            team_id,
            question_id,
            ts_epoch_ms: now_epoch_ms(),
            accepted: true,
        }
    }

    async fn seeded_store() -> (MemoryStateStore, Uuid) {
        let store = MemoryStateStore::new();
        let game_id = Uuid::new_v4();
        store
            .create_game(game(game_id), SettingsEntity::initial(game_id))
            .await
            .unwrap();
        (store, game_id)
    }

    #[tokio::test]
    async fn second_accepted_buzz_for_same_question_is_rejected() {
        let (store, game_id) = seeded_store().await;
        let question_id = Uuid::new_v4();
        let first = team(game_id, "TEAM_A");
        let second = team(game_id, "TEAM_B");
        store.insert_team(first.clone()).await.unwrap();
        store.insert_team(second.clone()).await.unwrap();

        store
            .record_accepted_buzz(buzz(game_id, first.id, question_id))
            .await
            .unwrap();
        let err = store
            .record_accepted_buzz(buzz(game_id, second.id, question_id))
            .await
            .unwrap_err();
        assert!(err.is_duplicate());

        let settings = store.find_settings(game_id).await.unwrap().unwrap();
        assert_eq!(settings.active_team_id, Some(first.id));
        let winner = store
            .find_accepted_buzz(game_id, question_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(winner.team_id, first.id);
    }

    #[tokio::test]
    async fn accepted_buzz_for_other_question_is_independent() {
        let (store, game_id) = seeded_store().await;
        let t = team(game_id, "TEAM_A");
        store.insert_team(t.clone()).await.unwrap();

        store
            .record_accepted_buzz(buzz(game_id, t.id, Uuid::new_v4()))
            .await
            .unwrap();
        store
            .record_accepted_buzz(buzz(game_id, t.id, Uuid::new_v4()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn duplicate_team_code_is_rejected_within_a_game() {
        let (store, game_id) = seeded_store().await;
        store.insert_team(team(game_id, "TEAM_A")).await.unwrap();
        let err = store.insert_team(team(game_id, "TEAM_A")).await.unwrap_err();
        assert!(err.is_duplicate());

        // Same code in another game is fine.
        let other_game = Uuid::new_v4();
        store
            .create_game(game(other_game), SettingsEntity::initial(other_game))
            .await
            .unwrap();
        store.insert_team(team(other_game, "TEAM_A")).await.unwrap();
    }

    #[tokio::test]
    async fn replace_settings_clearing_buzz_removes_only_that_question() {
        let (store, game_id) = seeded_store().await;
        let t = team(game_id, "TEAM_A");
        store.insert_team(t.clone()).await.unwrap();
        let old_question = Uuid::new_v4();
        let other_question = Uuid::new_v4();
        store
            .record_accepted_buzz(buzz(game_id, t.id, old_question))
            .await
            .unwrap();
        store
            .record_accepted_buzz(buzz(game_id, t.id, other_question))
            .await
            .unwrap();

        let mut next = store.find_settings(game_id).await.unwrap().unwrap();
        next.current_question_id = Some(old_question);
        next.state = GamePhase::Show;
        next.active_team_id = None;
        store
            .replace_settings_clearing_buzz(next, old_question)
            .await
            .unwrap();

        assert!(
            store
                .find_accepted_buzz(game_id, old_question)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            store
                .find_accepted_buzz(game_id, other_question)
                .await
                .unwrap()
                .is_some()
        );
        let settings = store.find_settings(game_id).await.unwrap().unwrap();
        assert_eq!(settings.active_team_id, None);
        assert_eq!(settings.state, GamePhase::Show);
    }

    #[tokio::test]
    async fn mask_and_usage_land_together_or_not_at_all() {
        let (store, game_id) = seeded_store().await;
        let t = team(game_id, "TEAM_A");
        store.insert_team(t.clone()).await.unwrap();
        let question_id = Uuid::new_v4();
        let round_id = Some(Uuid::new_v4());

        let mask = TeamMaskEntity {
            game_id,
            team_id: t.id,
            question_id,
            masked: [0, 1],
            ts_epoch_ms: now_epoch_ms(),
        };
        let usage = LifelineUsageEntity {
            game_id,
            team_id: t.id,
            lifeline: LifelineKind::FiftyFifty,
            round_id,
            used_at_epoch_ms: now_epoch_ms(),
        };
        store
            .apply_mask_with_usage(mask.clone(), usage.clone())
            .await
            .unwrap();

        // A second question in the same round trips the usage constraint and
        // must not leave a stray mask row behind.
        let second = TeamMaskEntity {
            question_id: Uuid::new_v4(),
            ..mask.clone()
        };
        let err = store
            .apply_mask_with_usage(second.clone(), usage.clone())
            .await
            .unwrap_err();
        assert!(err.is_duplicate());
        assert!(
            store
                .find_mask(game_id, t.id, second.question_id)
                .await
                .unwrap()
                .is_none()
        );

        // A different round is a fresh scope.
        let other_round_usage = LifelineUsageEntity {
            round_id: Some(Uuid::new_v4()),
            ..usage
        };
        store
            .apply_mask_with_usage(second, other_round_usage)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn clear_masks_only_touches_the_given_question() {
        let (store, game_id) = seeded_store().await;
        let t = team(game_id, "TEAM_A");
        store.insert_team(t.clone()).await.unwrap();
        let kept_question = Uuid::new_v4();
        let cleared_question = Uuid::new_v4();
        for (question_id, round) in [
            (kept_question, Uuid::new_v4()),
            (cleared_question, Uuid::new_v4()),
        ] {
            store
                .apply_mask_with_usage(
                    TeamMaskEntity {
                        game_id,
                        team_id: t.id,
                        question_id,
                        masked: [1, 3],
                        ts_epoch_ms: now_epoch_ms(),
                    },
                    LifelineUsageEntity {
                        game_id,
                        team_id: t.id,
                        lifeline: LifelineKind::FiftyFifty,
                        round_id: Some(round),
                        used_at_epoch_ms: now_epoch_ms(),
                    },
                )
                .await
                .unwrap();
        }

        store.clear_masks(game_id, cleared_question).await.unwrap();
        assert!(
            store
                .find_mask(game_id, t.id, cleared_question)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            store
                .find_mask(game_id, t.id, kept_question)
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn update_settings_for_unknown_game_is_a_no_op() {
        let store = MemoryStateStore::new();
        store
            .update_settings(SettingsEntity::initial(Uuid::new_v4()))
            .await
            .unwrap();
        assert!(store.list_games().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rounds_list_in_order_index_order() {
        let (store, game_id) = seeded_store().await;
        for (name, order_index) in [("Finals", 2), ("Warmup", 0), ("Semis", 1)] {
            store
                .insert_round(RoundEntity {
                    id: Uuid::new_v4(),
                    game_id,
                    name: name.into(),
                    order_index,
                })
                .await
                .unwrap();
        }
        let names: Vec<String> = store
            .list_rounds(game_id)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["Warmup", "Semis", "Finals"]);
    }

    #[tokio::test]
    async fn questions_are_scoped_to_their_game() {
        let (store, game_id) = seeded_store().await;
        let question = QuestionEntity {
            id: Uuid::new_v4(),
            game_id,
            text: "What is the capital of France?".into(),
            options: vec!["London".into(), "Berlin".into(), "Paris".into(), "Madrid".into()],
            correct_index: 2,
            kind: QuestionKind::MultipleChoice,
        };
        store.insert_question(question.clone()).await.unwrap();

        assert!(
            store
                .find_question(game_id, question.id)
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            store
                .find_question(Uuid::new_v4(), question.id)
                .await
                .unwrap()
                .is_none()
        );
    }
}
