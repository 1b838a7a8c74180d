//! Server → client frames and the player-scoped snapshots they carry.
//! Every type name here is exactly one of the WebSocket frame shape's
//! server message types; `#[serde(tag = "type")]` renders them as
//! `{"type": "card_played", ...}` on the wire.

use serde::Serialize;

use stakeboard_core::types::PlayerId;

use crate::cards::{Card, CardsState, Suit};
use crate::pool::{Group, PoolTableState, ShotParams};

/// The hand/table view handed to one specific player: opponent hidden
/// information (hand composition, deck order) is never present, only
/// counts.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PlayerView {
    Cards(CardsView),
    Pool(PoolView),
}

#[derive(Debug, Clone, Serialize)]
pub struct CardsView {
    pub hand: Vec<Card>,
    pub opponent_card_count: usize,
    pub discard_top: Card,
    pub draw_pile_count: usize,
    pub current_suit: Suit,
    pub draw_stack: u32,
    pub your_turn: bool,
}

impl CardsView {
    pub fn of(state: &CardsState, seat: usize) -> CardsView {
        CardsView {
            hand: state.hands[seat].clone(),
            opponent_card_count: state.hands[1 - seat].len(),
            discard_top: *state.discard_pile.last().expect("discard pile always has a top card"),
            draw_pile_count: state.draw_pile.len(),
            current_suit: state.current_suit,
            draw_stack: state.draw_stack,
            your_turn: state.turn == seat,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolView {
    pub cue_ball: (f64, f64),
    pub balls: Vec<crate::pool::Ball>,
    pub your_group: Option<Group>,
    pub ball_in_hand: bool,
    pub your_turn: bool,
}

impl PoolView {
    pub fn of(state: &PoolTableState, seat: usize) -> PoolView {
        PoolView {
            cue_ball: state.cue_ball,
            balls: state.balls.clone(),
            your_group: state.groups[seat],
            ball_in_hand: state.ball_in_hand,
            your_turn: state.turn == seat,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    WaitingForOpponent,
    GameStarting { view: PlayerView },
    GameState { view: PlayerView },
    GameUpdate { view: PlayerView },
    CardPlayed { seat: usize, card: Card, declared_suit: Option<Suit> },
    CardsDrawn { cards: Vec<Card> },
    OpponentDrew { count: usize },
    TurnPassed { seat: usize },
    ShotRelay { seat: usize, shot: ShotParams },
    ShotResult { view: PlayerView },
    BallPlaced { seat: usize, x: f64, y: f64 },
    PlayerConnected { seat: usize },
    PlayerDisconnected { seat: usize },
    PlayerIdleWarning { seat: usize, remaining_seconds: u64 },
    PlayerIdleCanceled { seat: usize },
    PlayerConceded { seat: usize },
    PlayerForfeit { seat: usize, reason: String },
    Error { code: String, message: String },
}

/// An outbound frame tagged with who should receive it — `None` means
/// both players (with no hidden information in the payload), `Some`
/// means exactly one seat (used for snapshots and private draws).
/// Carries the match's monotonic sequence number for client-side
/// de-duplication across reconnects.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub audience: Audience,
    pub seq: u64,
    pub event: ServerEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Both,
    Seat(usize),
}

#[derive(Debug, Clone)]
pub struct PlayerIdentity {
    pub player_id: PlayerId,
    pub token: String,
}
