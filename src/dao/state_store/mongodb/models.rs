//! Document models for the Mongo store.
//!
//! Ids convert to BSON binary UUIDs (subtype 4) at this boundary. The
//! store's query filters build the same representation, and a stored value
//! only matches a filter of the same BSON type; a plain `uuid::Uuid` field
//! would serialize as a string and match nothing.

use mongodb::bson::{Binary, Bson, Document, Uuid as BsonUuid, doc, spec::BinarySubtype};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{
    BuzzerEventEntity, GameEntity, GamePhase, LifelineKind, LifelineUsageEntity, QuestionEntity,
    QuestionKind, RoundEntity, SettingsEntity, TeamEntity, TeamMaskEntity, now_epoch_ms,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameDocument {
    #[serde(rename = "_id")]
    id: BsonUuid,
    name: String,
    created_at_epoch_ms: i64,
}

impl From<GameEntity> for MongoGameDocument {
    fn from(value: GameEntity) -> Self {
        Self {
            id: bson_uuid(value.id),
            name: value.name,
            created_at_epoch_ms: value.created_at_epoch_ms,
        }
    }
}

impl From<MongoGameDocument> for GameEntity {
    fn from(value: MongoGameDocument) -> Self {
        Self {
            id: entity_uuid(value.id),
            name: value.name,
            created_at_epoch_ms: value.created_at_epoch_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoRoundDocument {
    #[serde(rename = "_id")]
    id: BsonUuid,
    game_id: BsonUuid,
    name: String,
    order_index: u32,
}

impl From<RoundEntity> for MongoRoundDocument {
    fn from(value: RoundEntity) -> Self {
        Self {
            id: bson_uuid(value.id),
            game_id: bson_uuid(value.game_id),
            name: value.name,
            order_index: value.order_index,
        }
    }
}

impl From<MongoRoundDocument> for RoundEntity {
    fn from(value: MongoRoundDocument) -> Self {
        Self {
            id: entity_uuid(value.id),
            game_id: entity_uuid(value.game_id),
            name: value.name,
            order_index: value.order_index,
        }
    }
}

/// Team document. `created_at_epoch_ms` exists only to give listings the
/// same creation order an autoincrement key would; it is stamped on insert
/// and dropped on the way back to the entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoTeamDocument {
    #[serde(rename = "_id")]
    id: BsonUuid,
    game_id: BsonUuid,
    name: String,
    code: String,
    created_at_epoch_ms: i64,
}

impl From<TeamEntity> for MongoTeamDocument {
    fn from(value: TeamEntity) -> Self {
        Self {
            id: bson_uuid(value.id),
            game_id: bson_uuid(value.game_id),
            name: value.name,
            code: value.code,
            created_at_epoch_ms: now_epoch_ms(),
        }
    }
}

impl From<MongoTeamDocument> for TeamEntity {
    fn from(value: MongoTeamDocument) -> Self {
        Self {
            id: entity_uuid(value.id),
            game_id: entity_uuid(value.game_id),
            name: value.name,
            code: value.code,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoQuestionDocument {
    #[serde(rename = "_id")]
    id: BsonUuid,
    game_id: BsonUuid,
    text: String,
    options: Vec<String>,
    correct_index: u8,
    kind: QuestionKind,
    created_at_epoch_ms: i64,
}

impl From<QuestionEntity> for MongoQuestionDocument {
    fn from(value: QuestionEntity) -> Self {
        Self {
            id: bson_uuid(value.id),
            game_id: bson_uuid(value.game_id),
            text: value.text,
            options: value.options,
            correct_index: value.correct_index,
            kind: value.kind,
            created_at_epoch_ms: now_epoch_ms(),
        }
    }
}

impl From<MongoQuestionDocument> for QuestionEntity {
    fn from(value: MongoQuestionDocument) -> Self {
        Self {
            id: entity_uuid(value.id),
            game_id: entity_uuid(value.game_id),
            text: value.text,
            options: value.options,
            correct_index: value.correct_index,
            kind: value.kind,
        }
    }
}

/// Settings document keyed by its game id: the singleton-per-game rule falls
/// out of `_id` uniqueness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSettingsDocument {
    #[serde(rename = "_id")]
    game_id: BsonUuid,
    current_round_id: Option<BsonUuid>,
    current_question_id: Option<BsonUuid>,
    state: GamePhase,
    deadline_epoch_ms: i64,
    active_team_id: Option<BsonUuid>,
}

impl From<SettingsEntity> for MongoSettingsDocument {
    fn from(value: SettingsEntity) -> Self {
        Self {
            game_id: bson_uuid(value.game_id),
            current_round_id: value.current_round_id.map(bson_uuid),
            current_question_id: value.current_question_id.map(bson_uuid),
            state: value.state,
            deadline_epoch_ms: value.deadline_epoch_ms,
            active_team_id: value.active_team_id.map(bson_uuid),
        }
    }
}

impl From<MongoSettingsDocument> for SettingsEntity {
    fn from(value: MongoSettingsDocument) -> Self {
        Self {
            game_id: entity_uuid(value.game_id),
            current_round_id: value.current_round_id.map(entity_uuid),
            current_question_id: value.current_question_id.map(entity_uuid),
            state: value.state,
            deadline_epoch_ms: value.deadline_epoch_ms,
            active_team_id: value.active_team_id.map(entity_uuid),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoBuzzerEventDocument {
    game_id: BsonUuid,
    team_id: BsonUuid,
    question_id: BsonUuid,
    ts_epoch_ms: i64,
    accepted: bool,
}

impl From<BuzzerEventEntity> for MongoBuzzerEventDocument {
    fn from(value: BuzzerEventEntity) -> Self {
        Self {
            game_id: bson_uuid(value.game_id),
            team_id: bson_uuid(value.team_id),
            question_id: bson_uuid(value.question_id),
            ts_epoch_ms: value.ts_epoch_ms,
            accepted: value.accepted,
        }
    }
}

impl From<MongoBuzzerEventDocument> for BuzzerEventEntity {
    fn from(value: MongoBuzzerEventDocument) -> Self {
        Self {
            game_id: entity_uuid(value.game_id),
            team_id: entity_uuid(value.team_id),
            question_id: entity_uuid(value.question_id),
            ts_epoch_ms: value.ts_epoch_ms,
            accepted: value.accepted,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoTeamMaskDocument {
    game_id: BsonUuid,
    team_id: BsonUuid,
    question_id: BsonUuid,
    masked: [u8; 2],
    ts_epoch_ms: i64,
}

impl From<TeamMaskEntity> for MongoTeamMaskDocument {
    fn from(value: TeamMaskEntity) -> Self {
        Self {
            game_id: bson_uuid(value.game_id),
            team_id: bson_uuid(value.team_id),
            question_id: bson_uuid(value.question_id),
            masked: value.masked,
            ts_epoch_ms: value.ts_epoch_ms,
        }
    }
}

impl From<MongoTeamMaskDocument> for TeamMaskEntity {
    fn from(value: MongoTeamMaskDocument) -> Self {
        Self {
            game_id: entity_uuid(value.game_id),
            team_id: entity_uuid(value.team_id),
            question_id: entity_uuid(value.question_id),
            masked: value.masked,
            ts_epoch_ms: value.ts_epoch_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoLifelineUsageDocument {
    game_id: BsonUuid,
    team_id: BsonUuid,
    lifeline: LifelineKind,
    round_id: Option<BsonUuid>,
    used_at_epoch_ms: i64,
}

impl From<LifelineUsageEntity> for MongoLifelineUsageDocument {
    fn from(value: LifelineUsageEntity) -> Self {
        Self {
            game_id: bson_uuid(value.game_id),
            team_id: bson_uuid(value.team_id),
            lifeline: value.lifeline,
            round_id: value.round_id.map(bson_uuid),
            used_at_epoch_ms: value.used_at_epoch_ms,
        }
    }
}

impl From<MongoLifelineUsageDocument> for LifelineUsageEntity {
    fn from(value: MongoLifelineUsageDocument) -> Self {
        Self {
            game_id: entity_uuid(value.game_id),
            team_id: entity_uuid(value.team_id),
            lifeline: value.lifeline,
            round_id: value.round_id.map(entity_uuid),
            used_at_epoch_ms: value.used_at_epoch_ms,
        }
    }
}

/// Entity id in the form documents store it: Binary subtype 4.
fn bson_uuid(id: Uuid) -> BsonUuid {
    BsonUuid::from_bytes(id.into_bytes())
}

fn entity_uuid(id: BsonUuid) -> Uuid {
    Uuid::from_bytes(id.bytes())
}

pub fn uuid_as_binary(id: Uuid) -> Binary {
    Binary {
        subtype: BinarySubtype::Uuid,
        bytes: id.into_bytes().to_vec(),
    }
}

/// Filter matching `round_id` including the null scope (no current round).
pub fn round_scope_bson(round_id: Option<Uuid>) -> Bson {
    match round_id {
        Some(id) => Bson::Binary(uuid_as_binary(id)),
        None => Bson::Null,
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": uuid_as_binary(id)}
}
