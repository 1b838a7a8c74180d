//! Stake queues: public FIFO pairing per stake tier, private
//! host/guest match-code invites, and queue expiry with refund.

pub mod memory;
pub mod service;
pub mod store;

pub use service::{EnqueueOutcome, InviteDetails, MatchPairing, Matchmaker, MatchmakerConfig, PollOutcome};
pub use store::MatchmakerStore;
