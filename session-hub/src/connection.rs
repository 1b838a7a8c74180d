//! Per-socket lifecycle: attach, fan the match's broadcast channel into
//! this connection's writer, relay inbound frames to the match actor,
//! and run the grace timer on disconnect. One `handle_socket` call per
//! accepted WebSocket upgrade.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use stakeboard_core::{Error, Result};
use stakeboard_match_runtime::store::MatchStore;
use stakeboard_match_runtime::{Audience, Intent, MatchHandle, Outbound, RuntimeFrame};

use crate::registry::ConnectionRegistry;

#[derive(Debug, Clone, Copy)]
pub struct GraceConfig {
    pub grace_period: Duration,
}

impl Default for GraceConfig {
    fn default() -> Self {
        Self { grace_period: Duration::from_secs(30) }
    }
}

/// Resolves a `(game_token, player_token)` pair to the match it names
/// and the seat the player token belongs to. Bad tokens and tokens for
/// a match the caller isn't part of both fail the same way, per the
/// handshake's "reveal no distinction" rule.
pub async fn resolve(match_store: &dyn MatchStore, game_token: &str, player_token: &str) -> Result<(Uuid, usize)> {
    let m = match_store.get_by_game_token(game_token).await?.ok_or(Error::UnknownToken)?;
    let seat = m.player_tokens.iter().position(|t| t == player_token).ok_or(Error::UnknownToken)?;
    if m.is_terminal() {
        return Err(Error::MatchFinished);
    }
    Ok((m.id, seat))
}

/// Drives one accepted socket for the lifetime of its connection to a
/// match. Returns once the socket is done (superseded, closed by the
/// client, or the grace period after a drop has expired).
pub async fn handle_socket(
    socket: WebSocket,
    match_id: Uuid,
    seat: usize,
    match_handle: MatchHandle,
    connections: ConnectionRegistry,
    grace: GraceConfig,
) {
    let (generation, my_notify) = connections.attach(match_id, seat).await;
    let _ = match_handle.inbox.send(RuntimeFrame::Connect { seat }).await;

    let (mut sink, mut stream) = socket.split();
    let (write_tx, mut write_rx) = mpsc::channel::<Message>(64);

    let writer = tokio::spawn(async move {
        while let Some(msg) = write_rx.recv().await {
            if sink.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut outbox_rx = match_handle.outbox.subscribe();
    let relay_tx = write_tx.clone();
    let relay = tokio::spawn(async move {
        loop {
            match outbox_rx.recv().await {
                Ok(Outbound { audience, event, .. }) => {
                    if matches!(audience, Audience::Both) || audience == Audience::Seat(seat) {
                        if let Ok(text) = serde_json::to_string(&event) {
                            if relay_tx.send(Message::Text(text)).await.is_err() {
                                break;
                            }
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let superseded = loop {
        tokio::select! {
            _ = my_notify.notified() => break true,
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<Intent>(&text) {
                        Ok(intent) => {
                            if match_handle.inbox.send(RuntimeFrame::Intent { seat, intent }).await.is_err() {
                                break false;
                            }
                        }
                        Err(e) => {
                            debug!("match {match_id} seat {seat}: malformed client frame: {e}");
                            let _ = write_tx.send(Message::Text(r#"{"type":"error","code":"malformed_frame","message":"could not parse intent"}"#.into())).await;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break false,
                Some(Err(e)) => {
                    warn!("match {match_id} seat {seat}: socket error: {e}");
                    break false;
                }
                _ => {}
            },
        }
    };

    relay.abort();
    drop(write_tx);
    let _ = writer.await;

    if superseded {
        return;
    }

    let _ = match_handle.inbox.send(RuntimeFrame::Disconnect { seat, final_: false }).await;
    tokio::time::sleep(grace.grace_period).await;
    if connections.detach_if_current(match_id, seat, generation).await {
        let _ = match_handle.inbox.send(RuntimeFrame::Disconnect { seat, final_: true }).await;
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use stakeboard_core::types::{Match, MatchStatus, MatchVariant};
    use stakeboard_match_runtime::memory::MemoryMatchStore;

    use super::*;

    fn fixture_match(game_token: &str, player_tokens: [&str; 2], status: MatchStatus) -> Match {
        Match {
            id: Uuid::new_v4(),
            game_token: game_token.into(),
            player_ids: [Uuid::new_v4(), Uuid::new_v4()],
            player_tokens: [player_tokens[0].into(), player_tokens[1].into()],
            stake: 1000,
            commission_per_player: 100,
            variant: MatchVariant::Cards,
            status,
            state_blob: Vec::new(),
            winner_id: None,
            win_type: None,
            terminal_reason: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    #[tokio::test]
    async fn resolve_finds_the_seat_for_a_valid_player_token() {
        let store = MemoryMatchStore::default();
        let m = fixture_match("gtok", ["p0", "p1"], MatchStatus::Waiting);
        store.create_match(m).await.unwrap();

        let (_, seat) = resolve(&store, "gtok", "p1").await.unwrap();
        assert_eq!(seat, 1);
    }

    #[tokio::test]
    async fn resolve_rejects_an_unknown_game_token() {
        let store = MemoryMatchStore::default();
        let err = resolve(&store, "nope", "p0").await.unwrap_err();
        assert!(matches!(err, Error::UnknownToken));
    }

    #[tokio::test]
    async fn resolve_rejects_a_player_token_for_a_different_match_the_same_way() {
        let store = MemoryMatchStore::default();
        let m = fixture_match("gtok", ["p0", "p1"], MatchStatus::Waiting);
        store.create_match(m).await.unwrap();

        let err = resolve(&store, "gtok", "not-a-real-token").await.unwrap_err();
        assert!(matches!(err, Error::UnknownToken));
    }

    #[tokio::test]
    async fn resolve_rejects_a_finished_match() {
        let store = MemoryMatchStore::default();
        let m = fixture_match("gtok", ["p0", "p1"], MatchStatus::Finished);
        store.create_match(m).await.unwrap();

        let err = resolve(&store, "gtok", "p0").await.unwrap_err();
        assert!(matches!(err, Error::MatchFinished));
    }
}
