use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::{
        GameEntity, GamePhase, QuestionEntity, QuestionKind, RoundEntity, SettingsEntity,
        TeamEntity,
    },
    dto::format_epoch_ms,
};

/// Summary returned once a game has been created or listed.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameSummary {
    pub id: Uuid,
    pub name: String,
    pub created_at: String,
}

impl From<GameEntity> for GameSummary {
    fn from(game: GameEntity) -> Self {
        Self {
            id: game.id,
            name: game.name,
            created_at: format_epoch_ms(game.created_at_epoch_ms),
        }
    }
}

/// Round projection for listings, ordered by `order_index`.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoundSummary {
    pub id: Uuid,
    pub name: String,
    pub order_index: u32,
}

impl From<RoundEntity> for RoundSummary {
    fn from(round: RoundEntity) -> Self {
        Self {
            id: round.id,
            name: round.name,
            order_index: round.order_index,
        }
    }
}

/// Public projection of a team.
#[derive(Debug, Serialize, ToSchema)]
pub struct TeamSummary {
    pub id: Uuid,
    pub name: String,
    /// Normalized join code the team's players type in.
    pub code: String,
}

impl From<TeamEntity> for TeamSummary {
    fn from(team: TeamEntity) -> Self {
        Self {
            id: team.id,
            name: team.name,
            code: team.code,
        }
    }
}

/// Question projection for the admin console.
///
/// Unlike the snapshot sent to players, this one carries the correct index;
/// it is only ever returned on the admin surface.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionSummary {
    pub id: Uuid,
    pub text: String,
    pub options: Vec<String>,
    pub correct_index: u8,
    pub kind: QuestionKind,
}

impl From<QuestionEntity> for QuestionSummary {
    fn from(question: QuestionEntity) -> Self {
        Self {
            id: question.id,
            text: question.text,
            options: question.options,
            correct_index: question.correct_index,
            kind: question.kind,
        }
    }
}

/// Live settings row as shown on the admin console.
#[derive(Debug, Serialize, ToSchema)]
pub struct SettingsView {
    pub state: GamePhase,
    pub deadline_epoch_ms: i64,
    pub current_round_id: Option<Uuid>,
    pub current_question_id: Option<Uuid>,
    pub active_team_id: Option<Uuid>,
}

impl From<SettingsEntity> for SettingsView {
    fn from(settings: SettingsEntity) -> Self {
        Self {
            state: settings.state,
            deadline_epoch_ms: settings.deadline_epoch_ms,
            current_round_id: settings.current_round_id,
            current_question_id: settings.current_question_id,
            active_team_id: settings.active_team_id,
        }
    }
}

/// Aggregate view of one game: metadata, live settings, and rosters.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameDetail {
    pub game: GameSummary,
    pub settings: Option<SettingsView>,
    pub rounds: Vec<RoundSummary>,
    pub teams: Vec<TeamSummary>,
    pub questions: Vec<QuestionSummary>,
}
