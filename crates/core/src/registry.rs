use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;

use crate::session::Session;

/// A per-student slot. `None` means no live session.
pub type SessionSlot = Arc<Mutex<Option<Session>>>;

/// Live sessions keyed by student id.
///
/// Each student gets an independent slot so a slow gateway call for one
/// student never blocks another. Actions for the same student queue on the
/// slot's mutex and run one at a time.
#[derive(Default)]
pub struct SessionRegistry {
    slots: Mutex<HashMap<String, SessionSlot>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The slot for `student_id`, created empty on first use.
    pub async fn slot(&self, student_id: &str) -> SessionSlot {
        self.slots
            .lock()
            .await
            .entry(student_id.to_string())
            .or_default()
            .clone()
    }

    /// The slot for `student_id`, if one was ever created.
    pub async fn existing(&self, student_id: &str) -> Option<SessionSlot> {
        self.slots.lock().await.get(student_id).cloned()
    }

    /// Drops the map entry of `student_id` if it still points at `slot` and
    /// nobody besides the map and the caller holds the slot.
    ///
    /// The caller must hold the slot's lock and have left it empty. Taking
    /// the map lock here is safe because no path waits on a slot lock while
    /// holding the map lock.
    pub async fn release(&self, student_id: &str, slot: &SessionSlot) -> bool {
        let mut slots = self.slots.lock().await;
        let unshared = slots
            .get(student_id)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && Arc::strong_count(slot) == 2);
        if unshared {
            slots.remove(student_id);
        }
        unshared
    }

    /// Number of slots currently tracked, live or not.
    pub async fn slot_count(&self) -> usize {
        self.slots.lock().await.len()
    }

    /// Number of students with a live session.
    pub async fn live_sessions(&self) -> usize {
        let slots: Vec<SessionSlot> = self.slots.lock().await.values().cloned().collect();
        let mut live = 0;
        for slot in slots {
            if slot.lock().await.is_some() {
                live += 1;
            }
        }
        live
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn slots_are_shared_per_student() {
        let registry = SessionRegistry::new();
        assert!(registry.existing("S1").await.is_none());

        let a = registry.slot("S1").await;
        let b = registry.slot("S1").await;
        assert!(Arc::ptr_eq(&a, &b));

        *a.lock().await = Some(Session::new("S1", 0, 5));
        assert_eq!(registry.live_sessions().await, 1);

        registry.slot("S2").await;
        assert_eq!(registry.live_sessions().await, 1);
    }

    #[tokio::test]
    async fn release_drops_only_unshared_empty_slots() {
        let registry = SessionRegistry::new();
        let slot = registry.slot("S1").await;
        let waiter = registry.existing("S1").await.unwrap();

        {
            let _guard = slot.lock().await;
            assert!(!registry.release("S1", &slot).await);
        }
        assert_eq!(registry.slot_count().await, 1);

        drop(waiter);
        let _guard = slot.lock().await;
        assert!(registry.release("S1", &slot).await);
        assert_eq!(registry.slot_count().await, 0);
        assert!(registry.existing("S1").await.is_none());
    }

    #[tokio::test]
    async fn release_ignores_a_replaced_slot() {
        let registry = SessionRegistry::new();
        let stale: SessionSlot = Arc::default();
        let current = registry.slot("S1").await;

        assert!(!registry.release("S1", &stale).await);
        assert!(Arc::ptr_eq(&registry.existing("S1").await.unwrap(), &current));
    }
}
