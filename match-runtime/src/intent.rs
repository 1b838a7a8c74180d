//! Client → server intents, per the WebSocket frame shape's client
//! message types. Variant-specific intents (`play_card`/`draw_card` vs.
//! `take_shot`/`place_cue_ball`) are rejected by the other variant's
//! engine as an illegal move, not at this layer — the runtime doesn't
//! know which variant a match is until it loads the match row.

use serde::{Deserialize, Serialize};

use crate::cards::Suit;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    PlayCard {
        card: String,
        #[serde(default)]
        declared_suit: Option<Suit>,
    },
    DrawCard,
    PassTurn,
    TakeShot {
        angle: f64,
        power: f64,
        spin_x: f64,
        spin_y: f64,
    },
    PlaceCueBall {
        x: f64,
        y: f64,
    },
    Concede,
}
