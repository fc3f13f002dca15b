/// Always-available in-memory backend.
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::models::{
    BuzzerEventEntity, GameEntity, LifelineKind, LifelineUsageEntity, QuestionEntity, RoundEntity,
    SettingsEntity, TeamEntity, TeamMaskEntity,
};
use crate::dao::storage::StorageResult;

/// Abstraction over the persistence layer for games, teams, questions and the
/// event logs that drive arbitration.
///
/// Every method returning a composite write runs as one transaction in the
/// backend: either all of its rows land or none do. Methods documented as
/// enforcing a uniqueness constraint report a violation as
/// [`StorageError::Duplicate`](crate::dao::storage::StorageError::Duplicate);
/// callers rely on that distinction to tell an arbitration loss from a
/// storage fault.
pub trait StateStore: Send + Sync {
    /// Persist a new game together with its initial settings row, atomically.
    fn create_game(
        &self,
        game: GameEntity,
        settings: SettingsEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch one game by id.
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// All games, in creation order.
    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>>;

    /// Persist a round.
    fn insert_round(&self, round: RoundEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Rounds of a game, ordered by `order_index`.
    fn list_rounds(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>>;

    /// Persist a team. Unique per (game, code); a taken code reports
    /// `Duplicate`.
    fn insert_team(&self, team: TeamEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch one team of a game by id.
    fn find_team(
        &self,
        game_id: Uuid,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>>;
    /// Resolve a team by its normalized join code.
    fn find_team_by_code(
        &self,
        game_id: Uuid,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>>;
    /// Teams of a game, in creation order.
    fn list_teams(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>>;

    /// Persist a question.
    fn insert_question(&self, question: QuestionEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch one question of a game by id.
    fn find_question(
        &self,
        game_id: Uuid,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>>;
    /// Questions of a game, in creation order.
    fn list_questions(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>>;

    /// Fetch the settings row of a game, if the game exists.
    fn find_settings(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<SettingsEntity>>>;
    /// Replace the settings row. Silent no-op when the game has none
    /// (nonexistent games are not an error at this layer).
    fn update_settings(&self, settings: SettingsEntity) -> BoxFuture<'static, StorageResult<()>>;

    /// The arbitration commit: insert an accepted buzz row and point
    /// `Settings.active_team_id` at the buzzing team, in one transaction
    /// under the strongest isolation the backend offers. An accepted row
    /// already present for (game, question) fails the whole transaction with
    /// `Duplicate`; that failure is the single-winner mechanism, with no
    /// caller-side read-then-write involved.
    fn record_accepted_buzz(
        &self,
        event: BuzzerEventEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch the accepted buzz for (game, question), if any.
    fn find_accepted_buzz(
        &self,
        game_id: Uuid,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<BuzzerEventEntity>>>;
    /// Replace the settings row and delete any accepted buzz rows for
    /// `question_id`, in one transaction. Backs the set-question and
    /// unlock-buzz commands.
    fn replace_settings_clearing_buzz(
        &self,
        settings: SettingsEntity,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// Fetch the stored 50-50 mask for (game, team, question), if any.
    fn find_mask(
        &self,
        game_id: Uuid,
        team_id: Uuid,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<TeamMaskEntity>>>;
    /// Persist a mask together with its lifeline-usage row, in one
    /// transaction. Either row colliding with its uniqueness constraint
    /// fails the whole transaction with `Duplicate`.
    fn apply_mask_with_usage(
        &self,
        mask: TeamMaskEntity,
        usage: LifelineUsageEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Delete every mask row of a game for one question.
    fn clear_masks(
        &self,
        game_id: Uuid,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch a lifeline-usage row for (game, team, lifeline) within the
    /// given round scope.
    fn find_lifeline_usage(
        &self,
        game_id: Uuid,
        team_id: Uuid,
        lifeline: LifelineKind,
        round_id: Option<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Option<LifelineUsageEntity>>>;

    /// Cheap readiness probe used by the storage supervisor.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Ask the backend to re-establish its connection after a failed probe.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
