//! DTO definitions used by the admin REST API and documentation layer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    dao::models::{GamePhase, QuestionKind, normalize_team_code},
    dto::validation::{validate_options, validate_team_code},
};

/// Payload creating a brand-new game together with its settings row.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateGameRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
}

/// Payload appending a round to a game.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AddRoundRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub order_index: u32,
}

/// Payload registering a team and its join code.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddTeamRequest {
    pub name: String,
    /// Join code as typed by the admin; normalized before validation and
    /// storage.
    pub code: String,
}

impl Validate for AddTeamRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.name.trim().is_empty() {
            let mut err = ValidationError::new("name_blank");
            err.message = Some("Team name must not be blank".into());
            errors.add("name", err);
        }

        if let Err(err) = validate_team_code(&normalize_team_code(&self.code)) {
            errors.add("code", err);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Payload adding a question to a game's pool.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddQuestionRequest {
    pub text: String,
    pub options: Vec<String>,
    pub correct_index: u8,
    #[serde(default)]
    pub kind: QuestionKind,
}

impl Validate for AddQuestionRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.text.trim().is_empty() {
            let mut err = ValidationError::new("text_blank");
            err.message = Some("Question text must not be blank".into());
            errors.add("text", err);
        }

        if let Err(err) = validate_options(&self.options) {
            errors.add("options", err);
        }

        // The fifty-fifty mask assumes three wrong answers to pick from, so
        // multiple choice means exactly four options.
        if self.kind == QuestionKind::MultipleChoice && self.options.len() != 4 {
            let mut err = ValidationError::new("options_mcq_count");
            err.message = Some("Multiple choice questions carry exactly 4 options".into());
            errors.add("options", err);
        }

        if usize::from(self.correct_index) >= self.options.len() {
            let mut err = ValidationError::new("correct_index_range");
            err.message = Some(
                format!(
                    "Correct index {} is out of range for {} options",
                    self.correct_index,
                    self.options.len()
                )
                .into(),
            );
            errors.add("correct_index", err);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Select the round subsequent lifeline usage is scoped to.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetRoundRequest {
    pub round_id: Uuid,
}

/// Put a question on screen and open buzzing.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetQuestionRequest {
    pub question_id: Uuid,
    /// Countdown length; the configured default applies when omitted.
    #[serde(default)]
    pub seconds: Option<u64>,
}

/// Force the game phase directly.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetStateRequest {
    pub state: GamePhase,
}

/// (Re)start the countdown from now.
#[derive(Debug, Deserialize, ToSchema)]
pub struct StartTimerRequest {
    /// Countdown length; the configured default applies when omitted.
    #[serde(default)]
    pub seconds: Option<u64>,
}

/// Push a running countdown further out.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddTimeRequest {
    /// Extension length; the configured default applies when omitted.
    #[serde(default)]
    pub seconds: Option<u64>,
}

/// Hand the buzzer to a team manually, or clear it with `null`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetActiveTeamRequest {
    #[serde(default)]
    pub team_id: Option<Uuid>,
}

/// Generic action acknowledgement used by admin endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    pub message: String,
}

impl ActionResponse {
    /// Acknowledgement mirroring the toast pushed to the game room.
    pub fn applied(op: &str) -> Self {
        Self {
            message: format!("Admin: {op} applied"),
        }
    }
}
