use std::{sync::Arc, time::Duration};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{Document, doc},
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{ClientOptions, IndexOptions},
};
use tokio::{sync::RwLock, time::sleep};
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    config::MongoConfig,
    error::{MongoDaoError, MongoResult},
    models::{
        MongoBuzzerEventDocument, MongoGameDocument, MongoLifelineUsageDocument,
        MongoQuestionDocument, MongoRoundDocument, MongoSettingsDocument, MongoTeamDocument,
        MongoTeamMaskDocument, doc_id, round_scope_bson, uuid_as_binary,
    },
};
use crate::dao::{
    models::{
        BuzzerEventEntity, GameEntity, LifelineKind, LifelineUsageEntity, QuestionEntity,
        RoundEntity, SettingsEntity, TeamEntity, TeamMaskEntity,
    },
    state_store::StateStore,
    storage::StorageResult,
};

const GAMES_COLLECTION: &str = "games";
const SETTINGS_COLLECTION: &str = "settings";
const ROUNDS_COLLECTION: &str = "rounds";
const TEAMS_COLLECTION: &str = "teams";
const QUESTIONS_COLLECTION: &str = "questions";
const BUZZER_EVENTS_COLLECTION: &str = "buzzer_events";
const TEAM_MASKS_COLLECTION: &str = "team_masks";
const LIFELINE_USAGE_COLLECTION: &str = "lifeline_usage";

// Constraint labels shared with the in-memory backend so engines and logs
// see one vocabulary regardless of where the violation happened.
const GAME_ID_CONSTRAINT: &str = "games.id";
const TEAM_CODE_CONSTRAINT: &str = "teams.game_code";
const ACCEPTED_BUZZ_CONSTRAINT: &str = "buzzer_events.game_question_accepted";
const TEAM_MASK_CONSTRAINT: &str = "team_masks.game_team_question";
const LIFELINE_USAGE_CONSTRAINT: &str = "lifeline_usage.game_team_lifeline_round";

const DUPLICATE_KEY_CODE: i32 = 11000;
const WRITE_CONFLICT_CODE: i32 = 112;

const MAX_CONNECT_ATTEMPTS: u32 = 10;
const BASE_RETRY_DELAY_MS: u64 = 250;
const MAX_RETRY_DELAY_SECS: u64 = 5;

/// MongoDB-backed [`StateStore`] for deployments where several server
/// processes share one database.
///
/// Arbitration correctness comes from unique indexes (a partial one on
/// accepted buzz rows); compound writes run inside multi-document sessions,
/// which requires the server to be a replica set or mongos.
#[derive(Clone)]
pub struct MongoStateStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

/// True when the driver error is a unique-index violation, whether it
/// surfaced as a plain write error or inside a transaction commit. Write
/// conflicts (two transactions racing on the same key) count too: the only
/// concurrent writers of the constrained keys are competing commits of the
/// same logical row.
fn unique_violation(err: &MongoError) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write)) => write.code == DUPLICATE_KEY_CODE,
        ErrorKind::Command(command) => {
            command.code == DUPLICATE_KEY_CODE || command.code == WRITE_CONFLICT_CODE
        }
        _ => false,
    }
}

async fn establish_connection(
    options: &ClientOptions,
    database_name: &str,
) -> MongoResult<(Client, Database)> {
    let client = Client::with_options(options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(database_name);

    let mut attempts = 0;
    let mut delay = Duration::from_millis(BASE_RETRY_DELAY_MS);

    loop {
        match database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => {
                if attempts > 0 {
                    info!(attempts, "connected to MongoDB after retry");
                }
                break;
            }
            Err(err) => {
                attempts += 1;
                if attempts >= MAX_CONNECT_ATTEMPTS {
                    return Err(MongoDaoError::InitialPing {
                        attempts,
                        source: err,
                    });
                }
                warn!(
                    attempts,
                    wait_ms = delay.as_millis(),
                    error = %err,
                    "MongoDB ping failed during initial connection; retrying"
                );
                sleep(delay).await;
                delay = (delay * 2).min(Duration::from_secs(MAX_RETRY_DELAY_SECS));
            }
        }
    }

    Ok((client, database))
}

impl MongoStateStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        create_unique_index(
            &database,
            TEAMS_COLLECTION,
            "team_code_unique_idx",
            doc! {"game_id": 1, "code": 1},
            None,
        )
        .await?;

        // Partial index: only accepted rows compete, so losing attempts may
        // still be logged as plain rows later if we ever want an audit trail.
        create_unique_index(
            &database,
            BUZZER_EVENTS_COLLECTION,
            "accepted_buzz_unique_idx",
            doc! {"game_id": 1, "question_id": 1},
            Some(doc! {"accepted": true}),
        )
        .await?;

        create_unique_index(
            &database,
            TEAM_MASKS_COLLECTION,
            "team_mask_unique_idx",
            doc! {"game_id": 1, "team_id": 1, "question_id": 1},
            None,
        )
        .await?;

        create_unique_index(
            &database,
            LIFELINE_USAGE_COLLECTION,
            "lifeline_usage_unique_idx",
            doc! {"game_id": 1, "team_id": 1, "lifeline": 1, "round_id": 1},
            None,
        )
        .await?;

        let rounds_index = IndexModel::builder()
            .keys(doc! {"game_id": 1, "order_index": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("round_order_idx".to_owned()))
                    .build(),
            )
            .build();
        database
            .collection::<Document>(ROUNDS_COLLECTION)
            .create_index(rounds_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: ROUNDS_COLLECTION,
                index: "round_order_idx",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn handles(&self) -> (Client, Database) {
        let guard = self.inner.state.read().await;
        (guard.client.clone(), guard.database.clone())
    }

    async fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        let guard = self.inner.state.read().await;
        guard.database.collection::<T>(name)
    }

    async fn create_game(&self, game: GameEntity, settings: SettingsEntity) -> MongoResult<()> {
        let game_id = game.id;
        let (client, database) = self.handles().await;
        let mut session = client
            .start_session()
            .await
            .map_err(|source| MongoDaoError::Transaction {
                op: "create_game",
                game_id,
                source,
            })?;
        session
            .start_transaction()
            .await
            .map_err(|source| MongoDaoError::Transaction {
                op: "create_game",
                game_id,
                source,
            })?;

        let games = database.collection::<MongoGameDocument>(GAMES_COLLECTION);
        let game_doc: MongoGameDocument = game.into();
        if let Err(err) = games.insert_one(&game_doc).session(&mut session).await {
            let _ = session.abort_transaction().await;
            if unique_violation(&err) {
                return Err(MongoDaoError::Duplicate {
                    constraint: GAME_ID_CONSTRAINT,
                });
            }
            return Err(MongoDaoError::Insert {
                collection: GAMES_COLLECTION,
                source: err,
            });
        }

        let settings_coll = database.collection::<MongoSettingsDocument>(SETTINGS_COLLECTION);
        let settings_doc: MongoSettingsDocument = settings.into();
        if let Err(err) = settings_coll
            .insert_one(&settings_doc)
            .session(&mut session)
            .await
        {
            let _ = session.abort_transaction().await;
            return Err(MongoDaoError::Insert {
                collection: SETTINGS_COLLECTION,
                source: err,
            });
        }

        session
            .commit_transaction()
            .await
            .map_err(|source| MongoDaoError::Transaction {
                op: "create_game",
                game_id,
                source,
            })
    }

    async fn find_game(&self, id: Uuid) -> MongoResult<Option<GameEntity>> {
        let collection = self.collection::<MongoGameDocument>(GAMES_COLLECTION).await;
        let document = collection
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::Find {
                collection: GAMES_COLLECTION,
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn list_games(&self) -> MongoResult<Vec<GameEntity>> {
        let collection = self.collection::<MongoGameDocument>(GAMES_COLLECTION).await;
        let documents: Vec<MongoGameDocument> = collection
            .find(doc! {})
            .sort(doc! {"created_at_epoch_ms": 1})
            .await
            .map_err(|source| MongoDaoError::Find {
                collection: GAMES_COLLECTION,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::Find {
                collection: GAMES_COLLECTION,
                source,
            })?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn insert_round(&self, round: RoundEntity) -> MongoResult<()> {
        let collection = self.collection::<MongoRoundDocument>(ROUNDS_COLLECTION).await;
        let document: MongoRoundDocument = round.into();
        collection
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::Insert {
                collection: ROUNDS_COLLECTION,
                source,
            })?;
        Ok(())
    }

    async fn list_rounds(&self, game_id: Uuid) -> MongoResult<Vec<RoundEntity>> {
        let collection = self.collection::<MongoRoundDocument>(ROUNDS_COLLECTION).await;
        let documents: Vec<MongoRoundDocument> = collection
            .find(doc! {"game_id": uuid_as_binary(game_id)})
            .sort(doc! {"order_index": 1})
            .await
            .map_err(|source| MongoDaoError::Find {
                collection: ROUNDS_COLLECTION,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::Find {
                collection: ROUNDS_COLLECTION,
                source,
            })?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn insert_team(&self, team: TeamEntity) -> MongoResult<()> {
        let collection = self.collection::<MongoTeamDocument>(TEAMS_COLLECTION).await;
        let document: MongoTeamDocument = team.into();
        collection.insert_one(&document).await.map_err(|err| {
            if unique_violation(&err) {
                MongoDaoError::Duplicate {
                    constraint: TEAM_CODE_CONSTRAINT,
                }
            } else {
                MongoDaoError::Insert {
                    collection: TEAMS_COLLECTION,
                    source: err,
                }
            }
        })?;
        Ok(())
    }

    async fn find_team(&self, game_id: Uuid, team_id: Uuid) -> MongoResult<Option<TeamEntity>> {
        let collection = self.collection::<MongoTeamDocument>(TEAMS_COLLECTION).await;
        let document = collection
            .find_one(doc! {"_id": uuid_as_binary(team_id), "game_id": uuid_as_binary(game_id)})
            .await
            .map_err(|source| MongoDaoError::Find {
                collection: TEAMS_COLLECTION,
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn find_team_by_code(
        &self,
        game_id: Uuid,
        code: String,
    ) -> MongoResult<Option<TeamEntity>> {
        let collection = self.collection::<MongoTeamDocument>(TEAMS_COLLECTION).await;
        let document = collection
            .find_one(doc! {"game_id": uuid_as_binary(game_id), "code": code})
            .await
            .map_err(|source| MongoDaoError::Find {
                collection: TEAMS_COLLECTION,
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn list_teams(&self, game_id: Uuid) -> MongoResult<Vec<TeamEntity>> {
        let collection = self.collection::<MongoTeamDocument>(TEAMS_COLLECTION).await;
        let documents: Vec<MongoTeamDocument> = collection
            .find(doc! {"game_id": uuid_as_binary(game_id)})
            .sort(doc! {"created_at_epoch_ms": 1})
            .await
            .map_err(|source| MongoDaoError::Find {
                collection: TEAMS_COLLECTION,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::Find {
                collection: TEAMS_COLLECTION,
                source,
            })?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn insert_question(&self, question: QuestionEntity) -> MongoResult<()> {
        let collection = self
            .collection::<MongoQuestionDocument>(QUESTIONS_COLLECTION)
            .await;
        let document: MongoQuestionDocument = question.into();
        collection
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::Insert {
                collection: QUESTIONS_COLLECTION,
                source,
            })?;
        Ok(())
    }

    async fn find_question(
        &self,
        game_id: Uuid,
        question_id: Uuid,
    ) -> MongoResult<Option<QuestionEntity>> {
        let collection = self
            .collection::<MongoQuestionDocument>(QUESTIONS_COLLECTION)
            .await;
        let document = collection
            .find_one(
                doc! {"_id": uuid_as_binary(question_id), "game_id": uuid_as_binary(game_id)},
            )
            .await
            .map_err(|source| MongoDaoError::Find {
                collection: QUESTIONS_COLLECTION,
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn list_questions(&self, game_id: Uuid) -> MongoResult<Vec<QuestionEntity>> {
        let collection = self
            .collection::<MongoQuestionDocument>(QUESTIONS_COLLECTION)
            .await;
        let documents: Vec<MongoQuestionDocument> = collection
            .find(doc! {"game_id": uuid_as_binary(game_id)})
            .sort(doc! {"created_at_epoch_ms": 1})
            .await
            .map_err(|source| MongoDaoError::Find {
                collection: QUESTIONS_COLLECTION,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::Find {
                collection: QUESTIONS_COLLECTION,
                source,
            })?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn find_settings(&self, game_id: Uuid) -> MongoResult<Option<SettingsEntity>> {
        let collection = self
            .collection::<MongoSettingsDocument>(SETTINGS_COLLECTION)
            .await;
        let document = collection
            .find_one(doc_id(game_id))
            .await
            .map_err(|source| MongoDaoError::Find {
                collection: SETTINGS_COLLECTION,
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn update_settings(&self, settings: SettingsEntity) -> MongoResult<()> {
        let collection = self
            .collection::<MongoSettingsDocument>(SETTINGS_COLLECTION)
            .await;
        let game_id = settings.game_id;
        let document: MongoSettingsDocument = settings.into();
        // No upsert: settings for a game that was never created stay absent,
        // which keeps admin commands on unknown games silent no-ops.
        collection
            .replace_one(doc_id(game_id), &document)
            .await
            .map_err(|source| MongoDaoError::Update {
                collection: SETTINGS_COLLECTION,
                source,
            })?;
        Ok(())
    }

    async fn record_accepted_buzz(&self, event: BuzzerEventEntity) -> MongoResult<()> {
        let game_id = event.game_id;
        let team_id = event.team_id;
        let (client, database) = self.handles().await;
        let mut session = client
            .start_session()
            .await
            .map_err(|source| MongoDaoError::Transaction {
                op: "record_accepted_buzz",
                game_id,
                source,
            })?;
        session
            .start_transaction()
            .await
            .map_err(|source| MongoDaoError::Transaction {
                op: "record_accepted_buzz",
                game_id,
                source,
            })?;

        let events = database.collection::<MongoBuzzerEventDocument>(BUZZER_EVENTS_COLLECTION);
        let document: MongoBuzzerEventDocument = event.into();
        if let Err(err) = events.insert_one(&document).session(&mut session).await {
            let _ = session.abort_transaction().await;
            if unique_violation(&err) {
                return Err(MongoDaoError::Duplicate {
                    constraint: ACCEPTED_BUZZ_CONSTRAINT,
                });
            }
            return Err(MongoDaoError::Insert {
                collection: BUZZER_EVENTS_COLLECTION,
                source: err,
            });
        }

        let settings = database.collection::<MongoSettingsDocument>(SETTINGS_COLLECTION);
        let update = doc! {"$set": {"active_team_id": uuid_as_binary(team_id)}};
        if let Err(err) = settings
            .update_one(doc_id(game_id), update)
            .session(&mut session)
            .await
        {
            let _ = session.abort_transaction().await;
            return Err(MongoDaoError::Update {
                collection: SETTINGS_COLLECTION,
                source: err,
            });
        }

        session.commit_transaction().await.map_err(|err| {
            if unique_violation(&err) {
                MongoDaoError::Duplicate {
                    constraint: ACCEPTED_BUZZ_CONSTRAINT,
                }
            } else {
                MongoDaoError::Transaction {
                    op: "record_accepted_buzz",
                    game_id,
                    source: err,
                }
            }
        })
    }

    async fn find_accepted_buzz(
        &self,
        game_id: Uuid,
        question_id: Uuid,
    ) -> MongoResult<Option<BuzzerEventEntity>> {
        let collection = self
            .collection::<MongoBuzzerEventDocument>(BUZZER_EVENTS_COLLECTION)
            .await;
        let document = collection
            .find_one(doc! {
                "game_id": uuid_as_binary(game_id),
                "question_id": uuid_as_binary(question_id),
                "accepted": true,
            })
            .await
            .map_err(|source| MongoDaoError::Find {
                collection: BUZZER_EVENTS_COLLECTION,
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn replace_settings_clearing_buzz(
        &self,
        settings: SettingsEntity,
        question_id: Uuid,
    ) -> MongoResult<()> {
        let game_id = settings.game_id;
        let (client, database) = self.handles().await;
        let mut session = client
            .start_session()
            .await
            .map_err(|source| MongoDaoError::Transaction {
                op: "replace_settings_clearing_buzz",
                game_id,
                source,
            })?;
        session
            .start_transaction()
            .await
            .map_err(|source| MongoDaoError::Transaction {
                op: "replace_settings_clearing_buzz",
                game_id,
                source,
            })?;

        let events = database.collection::<MongoBuzzerEventDocument>(BUZZER_EVENTS_COLLECTION);
        let filter = doc! {
            "game_id": uuid_as_binary(game_id),
            "question_id": uuid_as_binary(question_id),
            "accepted": true,
        };
        if let Err(err) = events.delete_many(filter).session(&mut session).await {
            let _ = session.abort_transaction().await;
            return Err(MongoDaoError::Delete {
                collection: BUZZER_EVENTS_COLLECTION,
                source: err,
            });
        }

        let settings_coll = database.collection::<MongoSettingsDocument>(SETTINGS_COLLECTION);
        let document: MongoSettingsDocument = settings.into();
        if let Err(err) = settings_coll
            .replace_one(doc_id(game_id), &document)
            .session(&mut session)
            .await
        {
            let _ = session.abort_transaction().await;
            return Err(MongoDaoError::Update {
                collection: SETTINGS_COLLECTION,
                source: err,
            });
        }

        session
            .commit_transaction()
            .await
            .map_err(|source| MongoDaoError::Transaction {
                op: "replace_settings_clearing_buzz",
                game_id,
                source,
            })
    }

    async fn find_mask(
        &self,
        game_id: Uuid,
        team_id: Uuid,
        question_id: Uuid,
    ) -> MongoResult<Option<TeamMaskEntity>> {
        let collection = self
            .collection::<MongoTeamMaskDocument>(TEAM_MASKS_COLLECTION)
            .await;
        let document = collection
            .find_one(doc! {
                "game_id": uuid_as_binary(game_id),
                "team_id": uuid_as_binary(team_id),
                "question_id": uuid_as_binary(question_id),
            })
            .await
            .map_err(|source| MongoDaoError::Find {
                collection: TEAM_MASKS_COLLECTION,
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn apply_mask_with_usage(
        &self,
        mask: TeamMaskEntity,
        usage: LifelineUsageEntity,
    ) -> MongoResult<()> {
        let game_id = mask.game_id;
        let (client, database) = self.handles().await;
        let mut session = client
            .start_session()
            .await
            .map_err(|source| MongoDaoError::Transaction {
                op: "apply_mask_with_usage",
                game_id,
                source,
            })?;
        session
            .start_transaction()
            .await
            .map_err(|source| MongoDaoError::Transaction {
                op: "apply_mask_with_usage",
                game_id,
                source,
            })?;

        let masks = database.collection::<MongoTeamMaskDocument>(TEAM_MASKS_COLLECTION);
        let mask_doc: MongoTeamMaskDocument = mask.into();
        if let Err(err) = masks.insert_one(&mask_doc).session(&mut session).await {
            let _ = session.abort_transaction().await;
            if unique_violation(&err) {
                return Err(MongoDaoError::Duplicate {
                    constraint: TEAM_MASK_CONSTRAINT,
                });
            }
            return Err(MongoDaoError::Insert {
                collection: TEAM_MASKS_COLLECTION,
                source: err,
            });
        }

        let usages = database.collection::<MongoLifelineUsageDocument>(LIFELINE_USAGE_COLLECTION);
        let usage_doc: MongoLifelineUsageDocument = usage.into();
        if let Err(err) = usages.insert_one(&usage_doc).session(&mut session).await {
            let _ = session.abort_transaction().await;
            if unique_violation(&err) {
                return Err(MongoDaoError::Duplicate {
                    constraint: LIFELINE_USAGE_CONSTRAINT,
                });
            }
            return Err(MongoDaoError::Insert {
                collection: LIFELINE_USAGE_COLLECTION,
                source: err,
            });
        }

        session.commit_transaction().await.map_err(|err| {
            if unique_violation(&err) {
                MongoDaoError::Duplicate {
                    constraint: TEAM_MASK_CONSTRAINT,
                }
            } else {
                MongoDaoError::Transaction {
                    op: "apply_mask_with_usage",
                    game_id,
                    source: err,
                }
            }
        })
    }

    async fn clear_masks(&self, game_id: Uuid, question_id: Uuid) -> MongoResult<()> {
        let collection = self
            .collection::<MongoTeamMaskDocument>(TEAM_MASKS_COLLECTION)
            .await;
        collection
            .delete_many(doc! {
                "game_id": uuid_as_binary(game_id),
                "question_id": uuid_as_binary(question_id),
            })
            .await
            .map_err(|source| MongoDaoError::Delete {
                collection: TEAM_MASKS_COLLECTION,
                source,
            })?;
        Ok(())
    }

    async fn find_lifeline_usage(
        &self,
        game_id: Uuid,
        team_id: Uuid,
        lifeline: LifelineKind,
        round_id: Option<Uuid>,
    ) -> MongoResult<Option<LifelineUsageEntity>> {
        let collection = self
            .collection::<MongoLifelineUsageDocument>(LIFELINE_USAGE_COLLECTION)
            .await;
        let document = collection
            .find_one(doc! {
                "game_id": uuid_as_binary(game_id),
                "team_id": uuid_as_binary(team_id),
                "lifeline": lifeline.as_str(),
                "round_id": round_scope_bson(round_id),
            })
            .await
            .map_err(|source| MongoDaoError::Find {
                collection: LIFELINE_USAGE_COLLECTION,
                source,
            })?;
        Ok(document.map(Into::into))
    }
}

impl StateStore for MongoStateStore {
    fn create_game(
        &self,
        game: GameEntity,
        settings: SettingsEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.create_game(game, settings).await.map_err(Into::into) })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_game(id).await.map_err(Into::into) })
    }

    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_games().await.map_err(Into::into) })
    }

    fn insert_round(&self, round: RoundEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_round(round).await.map_err(Into::into) })
    }

    fn list_rounds(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_rounds(game_id).await.map_err(Into::into) })
    }

    fn insert_team(&self, team: TeamEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_team(team).await.map_err(Into::into) })
    }

    fn find_team(
        &self,
        game_id: Uuid,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_team(game_id, team_id).await.map_err(Into::into) })
    }

    fn find_team_by_code(
        &self,
        game_id: Uuid,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_team_by_code(game_id, code)
                .await
                .map_err(Into::into)
        })
    }

    fn list_teams(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_teams(game_id).await.map_err(Into::into) })
    }

    fn insert_question(&self, question: QuestionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_question(question).await.map_err(Into::into) })
    }

    fn find_question(
        &self,
        game_id: Uuid,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_question(game_id, question_id)
                .await
                .map_err(Into::into)
        })
    }

    fn list_questions(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_questions(game_id).await.map_err(Into::into) })
    }

    fn find_settings(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<SettingsEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_settings(game_id).await.map_err(Into::into) })
    }

    fn update_settings(&self, settings: SettingsEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.update_settings(settings).await.map_err(Into::into) })
    }

    fn record_accepted_buzz(
        &self,
        event: BuzzerEventEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.record_accepted_buzz(event).await.map_err(Into::into) })
    }

    fn find_accepted_buzz(
        &self,
        game_id: Uuid,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<BuzzerEventEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_accepted_buzz(game_id, question_id)
                .await
                .map_err(Into::into)
        })
    }

    fn replace_settings_clearing_buzz(
        &self,
        settings: SettingsEntity,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .replace_settings_clearing_buzz(settings, question_id)
                .await
                .map_err(Into::into)
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
            store
                .find_mask(game_id, team_id, question_id)
                .await
                .map_err(Into::into)
        })
    }

    fn apply_mask_with_usage(
        &self,
        mask: TeamMaskEntity,
        usage: LifelineUsageEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .apply_mask_with_usage(mask, usage)
                .await
                .map_err(Into::into)
        })
    }

    fn clear_masks(
        &self,
        game_id: Uuid,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .clear_masks(game_id, question_id)
                .await
                .map_err(Into::into)
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
            store
                .find_lifeline_usage(game_id, team_id, lifeline, round_id)
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}

/// Build a unique index, optionally partial, and ensure it exists.
async fn create_unique_index(
    database: &Database,
    collection: &'static str,
    index: &'static str,
    keys: Document,
    partial: Option<Document>,
) -> MongoResult<()> {
    let options = IndexOptions::builder()
        .name(Some(index.to_owned()))
        .unique(Some(true))
        .partial_filter_expression(partial)
        .build();
    let model = IndexModel::builder().keys(keys).options(options).build();
    database
        .collection::<Document>(collection)
        .create_index(model)
        .await
        .map_err(|source| MongoDaoError::EnsureIndex {
            collection,
            index,
            source,
        })?;
    Ok(())
}
