//! The in-process map of live WebSocket connections, one slot per
//! `(match, seat)`. Mirrors the teacher's broadcaster/event-bus split:
//! a shared map guarded by a single lock, generation-tagged so a grace
//! timer or a just-superseded task can tell whether it is still looking
//! at the connection it started with.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};
use uuid::Uuid;

type MatchId = Uuid;

struct Slot {
    generation: u64,
    notify: Arc<Notify>,
}

/// Tracks one slot per `(match, seat)`. Attaching a new connection for an
/// already-occupied slot wakes the previous connection's task (via its
/// stored `Notify`) so it closes itself — the "supersession" rule.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    slots: Arc<Mutex<HashMap<(MatchId, usize), Slot>>>,
}

impl ConnectionRegistry {
    pub fn new() -> ConnectionRegistry {
        ConnectionRegistry::default()
    }

    /// Registers a new connection for `(match_id, seat)`, notifying any
    /// prior connection so it closes. Returns this connection's
    /// generation (to pass to `detach_if_current` later) and the
    /// `Notify` it should select against to detect its own supersession.
    pub async fn attach(&self, match_id: MatchId, seat: usize) -> (u64, Arc<Notify>) {
        let mut slots = self.slots.lock().await;
        let generation = match slots.get(&(match_id, seat)) {
            Some(prev) => {
                prev.notify.notify_one();
                prev.generation + 1
            }
            None => 0,
        };
        let notify = Arc::new(Notify::new());
        slots.insert((match_id, seat), Slot { generation, notify: notify.clone() });
        (generation, notify)
    }

    /// Removes the slot only if it still belongs to `generation` —
    /// guards against a grace timer outliving a reconnect that already
    /// replaced the slot. Returns whether the removal happened, i.e.
    /// whether this really was the last word on that connection.
    pub async fn detach_if_current(&self, match_id: MatchId, seat: usize, generation: u64) -> bool {
        let mut slots = self.slots.lock().await;
        if slots.get(&(match_id, seat)).is_some_and(|s| s.generation == generation) {
            slots.remove(&(match_id, seat));
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_attach_bumps_generation_and_wakes_the_first() {
        let registry = ConnectionRegistry::new();
        let match_id = Uuid::new_v4();

        let (gen0, notify0) = registry.attach(match_id, 0).await;
        assert_eq!(gen0, 0);

        let (gen1, _notify1) = registry.attach(match_id, 0).await;
        assert_eq!(gen1, 1);

        // The first connection's notify should have a stored permit
        // from the second attach's supersession wake.
        notify0.notified().await;
    }

    #[tokio::test]
    async fn detach_if_current_is_a_noop_after_a_newer_attach() {
        let registry = ConnectionRegistry::new();
        let match_id = Uuid::new_v4();

        let (gen0, _) = registry.attach(match_id, 0).await;
        registry.attach(match_id, 0).await;

        assert!(!registry.detach_if_current(match_id, 0, gen0).await);
    }

    #[tokio::test]
    async fn detach_if_current_succeeds_for_the_live_generation() {
        let registry = ConnectionRegistry::new();
        let match_id = Uuid::new_v4();

        let (gen0, _) = registry.attach(match_id, 0).await;
        assert!(registry.detach_if_current(match_id, 0, gen0).await);
        // Already removed; a second call finds nothing to remove.
        assert!(!registry.detach_if_current(match_id, 0, gen0).await);
    }

    #[tokio::test]
    async fn distinct_seats_do_not_interfere() {
        let registry = ConnectionRegistry::new();
        let match_id = Uuid::new_v4();

        let (gen_seat0, _) = registry.attach(match_id, 0).await;
        let (gen_seat1, _) = registry.attach(match_id, 1).await;
        assert_eq!(gen_seat0, 0);
        assert_eq!(gen_seat1, 0);
        assert!(registry.detach_if_current(match_id, 0, gen_seat0).await);
        assert!(registry.detach_if_current(match_id, 1, gen_seat1).await);
    }
}
