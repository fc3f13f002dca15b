//! WebSocket lifecycle for game clients.
//!
//! Teams, host screens and admin consoles all talk over the same socket:
//! join a game room, request snapshots, buzz, spend lifelines. Outbound
//! traffic goes through a dedicated writer task so room broadcasts never
//! block on a slow client read.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::{ClientMessage, ServerMessage},
    error::ServiceError,
    services::{broadcast_service, buzzer_service, lifeline_service, session_service},
    state::SharedState,
};

/// Failure text for buzz attempts that die on a backend fault.
const BUZZ_SYSTEM_ERROR: &str = "Buzz failed due to system error";
/// Failure text for fifty-fifty attempts that die on a backend fault.
const FIFTY_SYSTEM_ERROR: &str = "50-50 failed due to system error";
/// Failure text for joins that die on a backend fault.
const JOIN_SYSTEM_ERROR: &str = "Join failed due to system error";

/// Handle the full lifecycle of one game WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we
    // await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let connection_id = Uuid::new_v4();
    info!(connection = %connection_id, "websocket connected");

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                let inbound = match serde_json::from_str::<ClientMessage>(text.as_str()) {
                    Ok(inbound) => inbound,
                    Err(err) => {
                        warn!(connection = %connection_id, error = %err, "failed to parse client message");
                        send_to(
                            &outbound_tx,
                            &ServerMessage::Error {
                                message: "Malformed message".into(),
                            },
                        );
                        continue;
                    }
                };
                dispatch(&state, connection_id, &outbound_tx, inbound).await;
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(connection = %connection_id, "websocket closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(connection = %connection_id, error = %err, "websocket error");
                break;
            }
        }
    }

    state.rooms().leave_all(connection_id);
    info!(connection = %connection_id, "websocket disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Route one parsed client message to its service.
async fn dispatch(
    state: &SharedState,
    connection_id: Uuid,
    tx: &mpsc::UnboundedSender<Message>,
    inbound: ClientMessage,
) {
    match inbound {
        ClientMessage::Join {
            game_id,
            team_code,
            role,
        } => {
            match session_service::join(state, connection_id, tx, game_id, team_code, role).await {
                Ok(outcome) => {
                    send_to(
                        tx,
                        &ServerMessage::Joined {
                            game_id: outcome.game_id,
                            team_code: outcome.team_code,
                            role: outcome.role,
                        },
                    );
                    // The whole room converges on the latest snapshot, the
                    // newcomer included.
                    broadcast_service::broadcast_state(state, game_id).await;
                }
                Err(err) => send_rejection(tx, err, JOIN_SYSTEM_ERROR),
            }
        }
        ClientMessage::StateRequest { game_id } => {
            broadcast_service::broadcast_state(state, game_id).await;
        }
        ClientMessage::Buzz { game_id, team_code } => {
            if let Err(err) = buzzer_service::attempt_buzz(state, game_id, &team_code).await {
                send_rejection(tx, err, BUZZ_SYSTEM_ERROR);
            }
        }
        ClientMessage::FiftyRequest { game_id, team_code } => {
            if let Err(err) =
                lifeline_service::request_fifty_fifty(state, game_id, &team_code).await
            {
                send_rejection(tx, err, FIFTY_SYSTEM_ERROR);
            }
        }
        ClientMessage::Unknown => {
            warn!(connection = %connection_id, "ignoring unrecognized client message");
        }
    }
}

/// Push a rejection to the offending connection only.
///
/// Rule rejections and lost races travel verbatim so players see why they
/// were refused; backend faults collapse to `fallback` instead of leaking
/// storage details.
fn send_rejection(tx: &mpsc::UnboundedSender<Message>, err: ServiceError, fallback: &str) {
    let message = match &err {
        ServiceError::Rejected(text) | ServiceError::Conflict(text) => text.clone(),
        _ => {
            warn!(error = %err, "request failed on a backend fault");
            fallback.to_owned()
        }
    };
    send_to(tx, &ServerMessage::Error { message });
}

/// Serialize a payload and queue it on the connection's writer task.
fn send_to(tx: &mpsc::UnboundedSender<Message>, message: &ServerMessage) {
    match serde_json::to_string(message) {
        Ok(payload) => {
            let _ = tx.send(Message::Text(payload.into()));
        }
        Err(err) => warn!(error = %err, "failed to serialize server message"),
    }
}

async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::{
                GameEntity, GamePhase, QuestionEntity, QuestionKind, SettingsEntity, TeamEntity,
                now_epoch_ms,
            },
            state_store::memory::MemoryStateStore,
        },
        state::AppState,
    };

    async fn recv_json(rx: &mut mpsc::UnboundedReceiver<Message>) -> serde_json::Value {
        let Some(Message::Text(text)) = rx.recv().await else {
            panic!("expected a text frame");
        };
        serde_json::from_str(text.as_str()).unwrap()
    }

    async fn seeded_state() -> (SharedState, Uuid) {
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
        for code in ["TEAM_A", "TEAM_B"] {
            store
                .insert_team(TeamEntity {
                    id: Uuid::new_v4(),
                    game_id,
                    name: format!("Team {code}"),
                    code: code.into(),
                })
                .await
                .unwrap();
        }

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
                kind: QuestionKind::MultipleChoice,
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

        (state, game_id)
    }

    #[tokio::test]
    async fn a_join_acks_then_pushes_the_snapshot() {
        let (state, game_id) = seeded_state().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let connection_id = Uuid::new_v4();

        dispatch(
            &state,
            connection_id,
            &tx,
            ClientMessage::Join {
                game_id,
                team_code: Some("team_a".into()),
                role: None,
            },
        )
        .await;

        let ack = recv_json(&mut rx).await;
        assert_eq!(ack["type"], "joined");
        assert_eq!(ack["team_code"], "TEAM_A");

        let snapshot = recv_json(&mut rx).await;
        assert_eq!(snapshot["type"], "state_update");
        assert_eq!(snapshot["state"], "SHOW");
        assert!(snapshot.get("question").is_some());
    }

    #[tokio::test]
    async fn a_losing_buzz_gets_the_verbatim_conflict() {
        let (state, game_id) = seeded_state().await;
        let (winner_tx, mut winner_rx) = mpsc::unbounded_channel();
        let (loser_tx, mut loser_rx) = mpsc::unbounded_channel();
        let winner_id = Uuid::new_v4();
        let loser_id = Uuid::new_v4();

        dispatch(
            &state,
            winner_id,
            &winner_tx,
            ClientMessage::Join {
                game_id,
                team_code: Some("TEAM_A".into()),
                role: None,
            },
        )
        .await;
        dispatch(
            &state,
            loser_id,
            &loser_tx,
            ClientMessage::Join {
                game_id,
                team_code: Some("TEAM_B".into()),
                role: None,
            },
        )
        .await;
        // Drain the join acks and snapshots before racing.
        while winner_rx.try_recv().is_ok() {}
        while loser_rx.try_recv().is_ok() {}

        dispatch(
            &state,
            winner_id,
            &winner_tx,
            ClientMessage::Buzz {
                game_id,
                team_code: "TEAM_A".into(),
            },
        )
        .await;
        dispatch(
            &state,
            loser_id,
            &loser_tx,
            ClientMessage::Buzz {
                game_id,
                team_code: "TEAM_B".into(),
            },
        )
        .await;

        // The winner sees the buzz_lock announcement, then the snapshot.
        let lock = recv_json(&mut winner_rx).await;
        assert_eq!(lock["type"], "buzz_lock");
        assert_eq!(lock["winner_team_code"], "TEAM_A");
        let snapshot = recv_json(&mut winner_rx).await;
        assert_eq!(snapshot["type"], "state_update");

        // The loser got the same room frames, then its private rejection.
        let lock = recv_json(&mut loser_rx).await;
        assert_eq!(lock["type"], "buzz_lock");
        let snapshot = recv_json(&mut loser_rx).await;
        assert_eq!(snapshot["type"], "state_update");
        let rejection = recv_json(&mut loser_rx).await;
        assert_eq!(rejection["type"], "error");
        assert_eq!(rejection["message"], "Another team buzzed first");
    }

    #[tokio::test]
    async fn backend_faults_collapse_to_the_generic_buzz_error() {
        let state = AppState::new(AppConfig::default()); // degraded, no store
        let (tx, mut rx) = mpsc::unbounded_channel();

        dispatch(
            &state,
            Uuid::new_v4(),
            &tx,
            ClientMessage::Buzz {
                game_id: Uuid::new_v4(),
                team_code: "TEAM_A".into(),
            },
        )
        .await;

        let rejection = recv_json(&mut rx).await;
        assert_eq!(rejection["type"], "error");
        assert_eq!(rejection["message"], "Buzz failed due to system error");
    }
}
