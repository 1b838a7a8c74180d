//! The Match Runtime: one single-writer actor per active match,
//! generalizing the teacher's per-game event loop. Owns move
//! validation and outcome for both the cards and pool variants; the
//! ledger settlement and player-stat update on a terminal transition
//! are the only places this crate reaches outside its own state.

pub mod actor;
pub mod cards;
pub mod event;
pub mod intent;
pub mod memory;
pub mod pool;
pub mod registry;
pub mod store;

pub use actor::{MatchHandle, RuntimeConfig, RuntimeFrame};
pub use event::{Audience, Outbound, ServerEvent};
pub use intent::Intent;
pub use registry::MatchRegistry;
pub use store::MatchStore;
