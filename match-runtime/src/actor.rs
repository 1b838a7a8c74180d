//! The per-match actor: the direct generalization of the teacher's
//! event-loop-per-game task. One `tokio::spawn`ed task owns a
//! `MatchContext`, reads a single ordered inbound channel carrying both
//! player intents and internally-dispatched timer events, applies them
//! serially, and emits outbound frames on a broadcast channel the
//! Session Hub subscribes to per connection.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tracing::{info, warn};

use stakeboard_core::types::{Amount, MatchId, MatchStatus, MatchVariant, PlayerId, WinType};
use stakeboard_core::{Error, Result};
use stakeboard_ledger::Ledger;
use stakeboard_registry::RegistryStore;

use crate::cards::{CardsApplyResult, CardsEvent, CardsState};
use crate::event::{Audience, CardsView, Outbound, PlayerView, PoolView, ServerEvent};
use crate::intent::Intent;
use crate::pool::{PoolApplyResult, PoolTableState};
use crate::store::MatchStore;

/// What a match worker reads off its inbound channel: a player intent,
/// a presence transition reported by the Session Hub, or (internally)
/// the turn clock expiring. The clock is self-dispatched the same way
/// the teacher's event loop races a dispatched-event timeout against
/// `ports.recv()`.
#[derive(Debug)]
pub enum RuntimeFrame {
    Intent { seat: usize, intent: Intent },
    Connect { seat: usize },
    /// `final_` mirrors the Session Hub's distinction between a
    /// transient drop (grace still running) and grace expiry.
    Disconnect { seat: usize, final_: bool },
    /// A read-only request for the current per-seat view, used by the
    /// HTTP snapshot endpoint. Never broadcast, never persisted — it's
    /// a point query against whatever state the worker already holds.
    Snapshot { seat: usize, reply: tokio::sync::oneshot::Sender<PlayerView> },
}

enum Woken {
    Frame(RuntimeFrame),
    IdleWarning,
    IdleTimeout { seat: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    pub turn_timeout: Duration,
    pub idle_warning_lead: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { turn_timeout: Duration::from_secs(30), idle_warning_lead: Duration::from_secs(10) }
    }
}

/// The variant-specific authoritative state. Serialized into `Match`'s
/// opaque `state_blob` on every state-changing event and every
/// terminal, per the snapshot policy in the concurrency model.
#[derive(Debug, Clone, Serialize, Deserialize)]
enum VariantState {
    Cards(CardsState),
    Pool(PoolTableState),
}

impl VariantState {
    fn new(variant: MatchVariant) -> VariantState {
        match variant {
            MatchVariant::Cards => VariantState::Cards(CardsState::deal()),
            MatchVariant::Pool => VariantState::Pool(PoolTableState::rack()),
        }
    }

    fn current_turn_seat(&self) -> usize {
        match self {
            VariantState::Cards(s) => s.current_turn_seat(),
            VariantState::Pool(s) => s.current_turn_seat(),
        }
    }

    fn view(&self, seat: usize) -> PlayerView {
        match self {
            VariantState::Cards(s) => PlayerView::Cards(CardsView::of(s, seat)),
            VariantState::Pool(s) => PlayerView::Pool(PoolView::of(s, seat)),
        }
    }
}

/// A handle a caller outside the match (the Matchmaker at pairing time,
/// the Session Hub on attach) uses to talk to a running actor.
#[derive(Clone)]
pub struct MatchHandle {
    pub inbox: mpsc::Sender<RuntimeFrame>,
    pub outbox: broadcast::Sender<Outbound>,
}

impl MatchHandle {
    /// Point query for the authoritative snapshot HTTP endpoint. Fails
    /// the same way a dead worker fails any other send: the caller
    /// falls back to treating the match as gone.
    pub async fn snapshot(&self, seat: usize) -> Result<crate::event::PlayerView> {
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        self.inbox
            .send(RuntimeFrame::Snapshot { seat, reply: reply_tx })
            .await
            .map_err(|_| Error::MatchNotFound)?;
        reply_rx.await.map_err(|_| Error::MatchNotFound)
    }
}

struct Terminal {
    winner_seat: Option<usize>,
    win_type: WinType,
}

/// Spawns the per-match task and returns a handle to it. The task runs
/// until the match reaches a terminal state or its inbound channel is
/// dropped (both callers gone). All match-specific data (player ids,
/// stake, commission, variant) is read from the already-persisted
/// `Match` row rather than threaded through the spawn call, so the
/// caller (the Session Hub, on first attach) only needs a match id.
pub fn spawn(
    match_id: MatchId,
    match_store: Arc<dyn MatchStore>,
    ledger: Ledger,
    registry_store: Arc<dyn RegistryStore>,
    config: RuntimeConfig,
) -> (MatchHandle, tokio::task::JoinHandle<()>) {
    let (inbox_tx, inbox_rx) = mpsc::channel(64);
    let (outbox_tx, _) = broadcast::channel(128);
    let handle = MatchHandle { inbox: inbox_tx, outbox: outbox_tx.clone() };

    let join = tokio::spawn(run(match_id, match_store, ledger, registry_store, config, inbox_rx, outbox_tx));

    (handle, join)
}

/// Blocks on the inbound channel, but wakes early for the idle-warning
/// and turn-timeout instants when a turn is running. Mirrors the
/// teacher's `read_event`: a dispatched timeout races the inbound port.
async fn next_wakeup(
    inbox: &mut mpsc::Receiver<RuntimeFrame>,
    status: MatchStatus,
    turn_deadline: Option<Instant>,
    warned_this_turn: bool,
    idle_warning_lead: Duration,
    current_seat: usize,
) -> Option<Woken> {
    let Some(deadline) = turn_deadline.filter(|_| status == MatchStatus::Active) else {
        return inbox.recv().await.map(Woken::Frame);
    };
    if !warned_this_turn {
        let warning_at = deadline - idle_warning_lead.min(deadline.saturating_duration_since(Instant::now()));
        tokio::select! {
            f = inbox.recv() => f.map(Woken::Frame),
            _ = tokio::time::sleep_until(warning_at) => Some(Woken::IdleWarning),
        }
    } else {
        tokio::select! {
            f = inbox.recv() => f.map(Woken::Frame),
            _ = tokio::time::sleep_until(deadline) => Some(Woken::IdleTimeout { seat: current_seat }),
        }
    }
}

async fn run(
    match_id: MatchId,
    match_store: Arc<dyn MatchStore>,
    ledger: Ledger,
    registry_store: Arc<dyn RegistryStore>,
    config: RuntimeConfig,
    mut inbox: mpsc::Receiver<RuntimeFrame>,
    outbox: broadcast::Sender<Outbound>,
) {
    let m = match match_store.get_match(match_id).await {
        Ok(m) => m,
        Err(e) => {
            warn!("match {match_id}: failed to load row at startup: {e}");
            return;
        }
    };
    let player_ids = m.player_ids;
    let stake = m.stake;
    let commission_per_player = m.commission_per_player;
    let mut state = VariantState::new(m.variant);
    let mut status = m.status;
    let mut connected = [false, false];
    let mut seq: u64 = 0;
    let mut turn_deadline: Option<Instant> = None;
    let mut warned_this_turn = false;

    loop {
        let current_seat = state.current_turn_seat();
        let woken = next_wakeup(&mut inbox, status, turn_deadline, warned_this_turn, config.idle_warning_lead, current_seat).await;

        let frame = match woken {
            None => {
                info!("match {match_id}: inbound channel closed, worker exiting");
                return;
            }
            Some(Woken::IdleWarning) => {
                warned_this_turn = true;
                send(&outbox, &mut seq, Audience::Both, ServerEvent::PlayerIdleWarning { seat: current_seat, remaining_seconds: config.idle_warning_lead.as_secs() });
                continue;
            }
            Some(Woken::IdleTimeout { seat }) => {
                send(&outbox, &mut seq, Audience::Both, ServerEvent::PlayerForfeit { seat, reason: "idle timeout".into() });
                finish_match(match_id, player_ids, stake, commission_per_player, Some(opponent(seat)), WinType::Forfeit, &match_store, &ledger, &registry_store).await;
                return;
            }
            Some(Woken::Frame(frame)) => frame,
        };

        let terminal = match frame {
            RuntimeFrame::Connect { seat } => {
                connected[seat] = true;
                send(&outbox, &mut seq, Audience::Both, ServerEvent::PlayerConnected { seat });
                if status == MatchStatus::Waiting {
                    if connected[0] && connected[1] {
                        status = MatchStatus::Active;
                        let _ = match_store.mark_active(match_id, Utc::now()).await;
                        turn_deadline = Some(Instant::now() + config.turn_timeout);
                        warned_this_turn = false;
                        for s in [0usize, 1] {
                            send(&outbox, &mut seq, Audience::Seat(s), ServerEvent::GameStarting { view: state.view(s) });
                        }
                    } else {
                        send(&outbox, &mut seq, Audience::Seat(seat), ServerEvent::WaitingForOpponent);
                    }
                } else if status == MatchStatus::Active {
                    // Reconnect mid-match: a fresh snapshot, not the backlog.
                    send(&outbox, &mut seq, Audience::Seat(seat), ServerEvent::GameState { view: state.view(seat) });
                }
                None
            }
            RuntimeFrame::Disconnect { seat, final_ } => {
                connected[seat] = false;
                send(&outbox, &mut seq, Audience::Both, ServerEvent::PlayerDisconnected { seat });
                if final_ && status == MatchStatus::Active {
                    Some(Terminal { winner_seat: Some(opponent(seat)), win_type: WinType::Forfeit })
                } else if final_ && status == MatchStatus::Waiting {
                    // Neither side ever fully arrived: abort, not forfeit.
                    Some(Terminal { winner_seat: None, win_type: WinType::Forfeit })
                } else {
                    None
                }
            }
            RuntimeFrame::Snapshot { seat, reply } => {
                let _ = reply.send(state.view(seat));
                None
            }
            RuntimeFrame::Intent { seat, intent } => {
                if status != MatchStatus::Active {
                    send(&outbox, &mut seq, Audience::Seat(seat), ServerEvent::Error { code: "match_not_active".into(), message: "this match is not accepting moves".into() });
                    None
                } else if matches!(intent, Intent::Concede) {
                    send(&outbox, &mut seq, Audience::Both, ServerEvent::PlayerConceded { seat });
                    Some(Terminal { winner_seat: Some(opponent(seat)), win_type: WinType::Concede })
                } else if seat != state.current_turn_seat() {
                    send(&outbox, &mut seq, Audience::Seat(seat), ServerEvent::Error { code: "not_your_turn".into(), message: "it is not your turn".into() });
                    None
                } else {
                    match apply(&mut state, seat, &intent) {
                        Ok((events, terminal)) => {
                            emit(&outbox, &mut seq, &state, seat, events);
                            if terminal.is_none() {
                                if warned_this_turn {
                                    send(&outbox, &mut seq, Audience::Both, ServerEvent::PlayerIdleCanceled { seat });
                                }
                                turn_deadline = Some(Instant::now() + config.turn_timeout);
                                warned_this_turn = false;
                            }
                            terminal
                        }
                        Err(e) => {
                            send(&outbox, &mut seq, Audience::Seat(seat), ServerEvent::Error { code: error_code(&e), message: e.to_string() });
                            None
                        }
                    }
                }
            }
        };

        if status == MatchStatus::Active {
            if let Ok(blob) = serde_json::to_vec(&state) {
                let _ = match_store.update_state_blob(match_id, blob.clone()).await;
                let _ = match_store.save_snapshot(match_id, seq, &blob).await;
            }
        }

        if let Some(Terminal { winner_seat, win_type }) = terminal {
            finish_match(match_id, player_ids, stake, commission_per_player, winner_seat, win_type, &match_store, &ledger, &registry_store).await;
            return;
        }
    }
}

fn opponent(seat: usize) -> usize {
    1 - seat
}

fn apply(state: &mut VariantState, seat: usize, intent: &Intent) -> Result<(Vec<ServerEvent>, Option<Terminal>)> {
    match state {
        VariantState::Cards(s) => {
            let CardsApplyResult { events, terminal } = s.apply(seat, intent)?;
            let out = events
                .into_iter()
                .map(|e| match e {
                    CardsEvent::CardPlayed { seat, card, declared_suit } => ServerEvent::CardPlayed { seat, card, declared_suit },
                    CardsEvent::CardsDrawn { seat: _, cards } => ServerEvent::CardsDrawn { cards },
                    CardsEvent::TurnPassed { seat } => ServerEvent::TurnPassed { seat },
                })
                .collect();
            Ok((out, terminal.map(|t| Terminal { winner_seat: t.winner_seat, win_type: t.win_type })))
        }
        VariantState::Pool(s) => {
            let PoolApplyResult { events: _, terminal } = s.apply(seat, intent)?;
            let mut out = Vec::new();
            if let Intent::TakeShot { angle, power, spin_x, spin_y } = intent {
                out.push(ServerEvent::ShotRelay { seat, shot: crate::pool::ShotParams { angle: *angle, power: *power, spin_x: *spin_x, spin_y: *spin_y } });
            }
            if let Intent::PlaceCueBall { x, y } = intent {
                out.push(ServerEvent::BallPlaced { seat, x: *x, y: *y });
            }
            // Ball-level physics events (pocketed/groups assigned) are
            // folded into the per-seat `ShotResult` snapshot `emit`
            // sends below rather than itemized here.
            Ok((out, terminal.map(|t| Terminal { winner_seat: t.winner_seat, win_type: t.win_type })))
        }
    }
}

/// Broadcasts the events an intent produced, plus a fresh per-seat
/// snapshot (`game_update` for cards, `shot_result` for pool) so both
/// clients stay in lockstep rather than reconstructing state from
/// deltas alone.
fn emit(outbox: &broadcast::Sender<Outbound>, seq: &mut u64, state: &VariantState, acting_seat: usize, events: Vec<ServerEvent>) {
    for event in events {
        match &event {
            ServerEvent::CardsDrawn { cards } => {
                send(outbox, seq, Audience::Seat(acting_seat), ServerEvent::CardsDrawn { cards: cards.clone() });
                send(outbox, seq, Audience::Seat(opponent(acting_seat)), ServerEvent::OpponentDrew { count: cards.len() });
            }
            _ => send(outbox, seq, Audience::Both, event),
        }
    }
    match state {
        VariantState::Pool(_) => {
            for s in [0usize, 1] {
                send(outbox, seq, Audience::Seat(s), ServerEvent::ShotResult { view: state.view(s) });
            }
        }
        VariantState::Cards(_) => {
            for s in [0usize, 1] {
                send(outbox, seq, Audience::Seat(s), ServerEvent::GameUpdate { view: state.view(s) });
            }
        }
    }
}

fn send(outbox: &broadcast::Sender<Outbound>, seq: &mut u64, audience: Audience, event: ServerEvent) {
    *seq += 1;
    // No subscribers (e.g. both connections briefly dropped) is not an
    // error; the Session Hub resubscribes on reconnect and fetches a
    // fresh snapshot instead of replaying the backlog.
    let _ = outbox.send(Outbound { audience, seq: *seq, event });
}

fn error_code(err: &Error) -> String {
    match err {
        Error::IllegalMove(_) => "illegal_move".into(),
        Error::MalformedCard => "malformed_card".into(),
        Error::ShotParamOutOfBounds(_) => "shot_param_out_of_bounds".into(),
        _ => "domain_error".into(),
    }
}

/// Runs the one ledger settlement a terminal transition is allowed,
/// updates both players' stats, and persists the match's terminal row.
/// Concede/forfeit-by-idle/forfeit-by-abandonment all settle as a win
/// for the non-forfeiting side; a `None` winner (both-never-arrived
/// abort, or a cards draw pile exhaustion) settles as a draw.
async fn finish_match(
    match_id: MatchId,
    player_ids: [PlayerId; 2],
    stake: Amount,
    commission_per_player: Amount,
    winner_seat: Option<usize>,
    win_type: WinType,
    match_store: &Arc<dyn MatchStore>,
    ledger: &Ledger,
    registry_store: &Arc<dyn RegistryStore>,
) {
    let winner_id = winner_seat.map(|s| player_ids[s]);
    let settlement = match winner_id {
        Some(winner) => ledger.settle_win(winner, stake, commission_per_player, &match_id.to_string()).await,
        None => ledger.settle_draw(player_ids, stake, commission_per_player, &match_id.to_string()).await,
    };
    if let Err(e) = settlement {
        warn!("match {match_id}: settlement failed: {e}");
    }

    for (seat, player_id) in player_ids.into_iter().enumerate() {
        let won = winner_seat == Some(seat);
        if let Err(e) = registry_store.record_match_result(player_id, won).await {
            warn!("match {match_id}: failed to record player stats for {player_id}: {e}");
        }
    }

    let reason = match winner_seat {
        Some(s) => format!("seat {s} won by {win_type:?}"),
        None => format!("draw by {win_type:?}"),
    };
    if let Err(e) = match_store.finish(match_id, winner_id, win_type, Some(reason), Utc::now()).await {
        warn!("match {match_id}: failed to persist terminal state: {e}");
    }
}
