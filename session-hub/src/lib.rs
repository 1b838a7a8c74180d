//! The Session Hub: owns WebSocket connection lifecycle for matches.
//! Presence, grace timers, supersession, and per-connection outbound
//! ordering all live here; move legality and game state stay in
//! `match-runtime`, which this crate only ever talks to over a
//! `MatchHandle`'s channels.

pub mod connection;
pub mod registry;

pub use connection::{handle_socket, resolve, GraceConfig};
pub use registry::ConnectionRegistry;
