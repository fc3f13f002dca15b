use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::common::GameStateSnapshot;

/// Role a connection announces when joining a game room.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClientRole {
    /// A playing team (the default when omitted).
    #[default]
    Team,
    /// The host screen projected to the audience.
    Host,
    /// The admin console.
    Admin,
}

/// Messages accepted from game WebSocket clients.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Enter a game room, optionally also the private room of a team.
    Join {
        game_id: Uuid,
        #[serde(default)]
        team_code: Option<String>,
        #[serde(default)]
        role: Option<ClientRole>,
    },
    /// Ask for a fresh snapshot to be pushed to the whole game room.
    #[serde(alias = "state_push")]
    StateRequest { game_id: Uuid },
    /// Claim the buzzer for the current question.
    Buzz { game_id: Uuid, team_code: String },
    /// Request the fifty-fifty mask for the current question.
    FiftyRequest { game_id: Uuid, team_code: String },
    /// Anything with an unrecognized tag; logged and ignored.
    #[serde(other)]
    Unknown,
}

/// Messages pushed to game WebSocket clients.
#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Acknowledgement sent to the joining connection itself.
    Joined {
        game_id: Uuid,
        team_code: Option<String>,
        role: ClientRole,
    },
    /// Rejection or failure, delivered only to the connection that caused it.
    Error { message: String },
    /// Full game snapshot, fanned out to the game room.
    StateUpdate(GameStateSnapshot),
    /// A team won the buzzer race; fanned out to the game room.
    BuzzLock {
        question_id: Uuid,
        winner_team_code: String,
        winner_team_name: String,
    },
    /// Fifty-fifty outcome, delivered only to the requesting team's room.
    MaskApplied {
        game_id: Uuid,
        team_code: String,
        question_id: Uuid,
        masked_options: Vec<u8>,
    },
    /// Free-text admin notification, fanned out to the game room.
    Toast { msg: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_without_team_code_parses() {
        let message: ClientMessage = serde_json::from_str(
            r#"{"type":"join","game_id":"00000000-0000-0000-0000-000000000000"}"#,
        )
        .unwrap();
        assert!(matches!(
            message,
            ClientMessage::Join {
                team_code: None,
                role: None,
                ..
            }
        ));
    }

    #[test]
    fn state_push_is_an_alias_for_state_request() {
        let message: ClientMessage = serde_json::from_str(
            r#"{"type":"state_push","game_id":"00000000-0000-0000-0000-000000000000"}"#,
        )
        .unwrap();
        assert!(matches!(message, ClientMessage::StateRequest { .. }));
    }

    #[test]
    fn unrecognized_tags_map_to_unknown() {
        let message: ClientMessage = serde_json::from_str(r#"{"type":"emote"}"#).unwrap();
        assert!(matches!(message, ClientMessage::Unknown));
    }

    #[test]
    fn buzz_lock_serializes_with_its_tag() {
        let message = ServerMessage::BuzzLock {
            question_id: Uuid::nil(),
            winner_team_code: "TEAM_A".into(),
            winner_team_name: "Team A".into(),
        };
        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains(r#""type":"buzz_lock""#));
        assert!(json.contains(r#""winner_team_code":"TEAM_A""#));
    }
}
