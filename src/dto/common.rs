use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dao::models::{GamePhase, QuestionEntity, QuestionKind, TeamEntity};

/// Projection of the current question as players are allowed to see it.
///
/// The correct index never leaves the server through this type; reveal
/// decisions stay with the host screen.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct QuestionSnapshot {
    pub id: Uuid,
    pub text: String,
    pub options: Vec<String>,
    pub kind: QuestionKind,
}

impl From<QuestionEntity> for QuestionSnapshot {
    fn from(question: QuestionEntity) -> Self {
        Self {
            id: question.id,
            text: question.text,
            options: question.options,
            kind: question.kind,
        }
    }
}

/// Team currently holding the buzzer, as shown to every screen.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct ActiveTeamSnapshot {
    pub id: Uuid,
    pub name: String,
    pub code: String,
}

impl From<TeamEntity> for ActiveTeamSnapshot {
    fn from(team: TeamEntity) -> Self {
        Self {
            id: team.id,
            name: team.name,
            code: team.code,
        }
    }
}

/// Shared snapshot describing one game's live state, fanned out to every
/// connected screen whenever anything changes.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct GameStateSnapshot {
    pub game_id: Uuid,
    pub state: GamePhase,
    /// Unix epoch milliseconds; `0` means no deadline is running.
    pub deadline_epoch_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_round_id: Option<Uuid>,
    /// Present once the host selected a question.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionSnapshot>,
    /// Present while a team holds the buzzer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_team: Option<ActiveTeamSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_json_never_contains_the_correct_index() {
        let snapshot = GameStateSnapshot {
            game_id: Uuid::nil(),
            state: GamePhase::Show,
            deadline_epoch_ms: 0,
            current_round_id: None,
            question: Some(QuestionSnapshot {
                id: Uuid::nil(),
                text: "Capital of France?".into(),
                options: vec![
                    "London".into(),
                    "Berlin".into(),
                    "Paris".into(),
                    "Madrid".into(),
                ],
                kind: QuestionKind::MultipleChoice,
            }),
            active_team: None,
        };

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(!json.contains("correct"));
        assert!(json.contains(r#""state":"SHOW""#));
        assert!(json.contains("Paris"));
    }

    #[test]
    fn absent_question_and_team_are_omitted_from_json() {
        let snapshot = GameStateSnapshot {
            game_id: Uuid::nil(),
            state: GamePhase::Idle,
            deadline_epoch_ms: 0,
            current_round_id: None,
            question: None,
            active_team: None,
        };

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(!json.contains("question"));
        assert!(!json.contains("active_team"));
        assert!(!json.contains("current_round_id"));
    }
}
