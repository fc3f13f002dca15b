use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use utoipa::ToSchema;
use uuid::Uuid;

/// Live state tag of a game, driven exclusively by admin commands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum GamePhase {
    /// Nothing on screen; buzzing and lifelines rejected.
    Idle,
    /// Question displayed; buzzing and lifelines allowed.
    Show,
    /// Buzzers locked by the host.
    Lock,
    /// Correct answer revealed.
    Reveal,
}

/// Question category tag.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub enum QuestionKind {
    /// Multiple choice with up to four options; the only kind lifelines
    /// apply to.
    #[default]
    #[serde(rename = "MCQ")]
    MultipleChoice,
    /// Free-form or media question; options unused.
    #[serde(rename = "OTHER")]
    Other,
}

/// Lifeline consumable by a team.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub enum LifelineKind {
    /// Hide two of the three incorrect options.
    #[serde(rename = "FIFTY_FIFTY")]
    FiftyFifty,
}

impl LifelineKind {
    /// Stored tag of the lifeline, the same string serde writes.
    pub fn as_str(self) -> &'static str {
        match self {
            LifelineKind::FiftyFifty => "FIFTY_FIFTY",
        }
    }
}

/// Root aggregate persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// Display name of the quiz night.
    pub name: String,
    /// Creation timestamp (epoch milliseconds) for auditing/debugging.
    pub created_at_epoch_ms: i64,
}

/// Grouping unit for questions and for lifeline scoping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundEntity {
    /// Primary key of the round.
    pub id: Uuid,
    /// Game this round belongs to.
    pub game_id: Uuid,
    /// Display name of the round.
    pub name: String,
    /// Position of the round within the game, ascending.
    pub order_index: u32,
}

/// Representation of a team stored in persistence and shared across layers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamEntity {
    /// Stable identifier for the team.
    pub id: Uuid,
    /// Game this team plays in.
    pub game_id: Uuid,
    /// Display name chosen for the team.
    pub name: String,
    /// Join code presented by clients; stored normalized, unique per game.
    pub code: String,
}

/// Question persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    /// Primary key of the question.
    pub id: Uuid,
    /// Game this question belongs to.
    pub game_id: Uuid,
    /// Prompt shown to players.
    pub text: String,
    /// Answer options, up to four; empty for non-MCQ questions.
    pub options: Vec<String>,
    /// Index into `options` of the correct answer. Never serialized to
    /// public snapshots; only the admin query surface may reveal it.
    pub correct_index: u8,
    /// Question category.
    pub kind: QuestionKind,
}

/// Authoritative live state of one game; exactly one row per game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SettingsEntity {
    /// Game this settings row belongs to (also its storage key).
    pub game_id: Uuid,
    /// Round currently being played, if any.
    pub current_round_id: Option<Uuid>,
    /// Question currently on screen, if any.
    pub current_question_id: Option<Uuid>,
    /// Live state tag.
    pub state: GamePhase,
    /// Absolute answer deadline in epoch milliseconds; 0 means no deadline.
    pub deadline_epoch_ms: i64,
    /// Team holding the buzz lock, if any.
    pub active_team_id: Option<Uuid>,
}

impl SettingsEntity {
    /// Fresh settings for a newly created game: idle, no deadline, nothing
    /// selected.
    pub fn initial(game_id: Uuid) -> Self {
        Self {
            game_id,
            current_round_id: None,
            current_question_id: None,
            state: GamePhase::Idle,
            deadline_epoch_ms: 0,
            active_team_id: None,
        }
    }
}

/// One buzz attempt. At most one accepted row may exist per
/// (game, question); the store enforces this with a uniqueness constraint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuzzerEventEntity {
    /// Game the buzz belongs to.
    pub game_id: Uuid,
    /// Team that buzzed.
    pub team_id: Uuid,
    /// Question the buzz answers.
    pub question_id: Uuid,
    /// When the buzz was committed, epoch milliseconds.
    pub ts_epoch_ms: i64,
    /// Whether this row won the arbitration.
    pub accepted: bool,
}

/// Result of a consumed 50-50: the two option indices hidden from one team
/// on one question. At most one row per (game, team, question).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamMaskEntity {
    /// Game the mask belongs to.
    pub game_id: Uuid,
    /// Team the mask applies to.
    pub team_id: Uuid,
    /// Question the mask applies to.
    pub question_id: Uuid,
    /// The two masked option indices, sorted ascending.
    pub masked: [u8; 2],
    /// When the mask was committed, epoch milliseconds.
    pub ts_epoch_ms: i64,
}

/// Record of a consumed lifeline. At most one row per
/// (game, team, lifeline, round).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LifelineUsageEntity {
    /// Game the usage belongs to.
    pub game_id: Uuid,
    /// Team that consumed the lifeline.
    pub team_id: Uuid,
    /// Which lifeline was consumed.
    pub lifeline: LifelineKind,
    /// Round the lifeline was consumed in; usage is capped per round.
    pub round_id: Option<Uuid>,
    /// When the lifeline was consumed, epoch milliseconds.
    pub used_at_epoch_ms: i64,
}

/// Canonical form of a team join code: trimmed and uppercased. Applied on
/// write and on every lookup so clients may type codes in any case.
pub fn normalize_team_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Current wall-clock time as epoch milliseconds, the unit every stored
/// timestamp and deadline uses.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn team_codes_normalize_case_and_whitespace() {
        assert_eq!(normalize_team_code("  team_a "), "TEAM_A");
        assert_eq!(normalize_team_code("TEAM_B"), "TEAM_B");
    }

    #[test]
    fn game_phase_serializes_to_uppercase_tags() {
        let json = serde_json::to_string(&GamePhase::Show).unwrap();
        assert_eq!(json, "\"SHOW\"");
        let parsed: GamePhase = serde_json::from_str("\"REVEAL\"").unwrap();
        assert_eq!(parsed, GamePhase::Reveal);
    }

    #[test]
    fn question_kind_uses_mcq_tag() {
        let json = serde_json::to_string(&QuestionKind::MultipleChoice).unwrap();
        assert_eq!(json, "\"MCQ\"");
    }
}
