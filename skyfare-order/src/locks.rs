use skyfare_core::FlightId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slot = Arc<AsyncMutex<()>>;

/// Exclusive per-flight locks. Different flights never contend.
///
/// Entries are created on first use and removed when the last guard or waiter
/// for a flight goes away, so the table only holds flights with activity.
#[derive(Debug, Default)]
pub struct FlightLockTable {
    slots: Arc<Mutex<HashMap<FlightId, Slot>>>,
}

impl FlightLockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits up to `timeout` for the flight's lock. `None` means the wait timed out.
    pub async fn acquire(&self, flight_id: FlightId, timeout: Duration) -> Option<FlightGuard> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.entry(flight_id).or_default().clone()
        };

        // Dropped on timeout so the entry can be reclaimed.
        let pending = PendingSlot {
            slots: self.slots.clone(),
            flight_id,
            slot: Some(slot.clone()),
        };

        match tokio::time::timeout(timeout, slot.lock_owned()).await {
            Ok(guard) => Some(FlightGuard {
                _pending: pending,
                guard: Some(guard),
            }),
            Err(_) => None,
        }
    }

    pub fn is_locked(&self, flight_id: FlightId) -> bool {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .get(&flight_id)
            .map(|slot| slot.try_lock().is_err())
            .unwrap_or(false)
    }

    /// Number of flights with a holder or waiter.
    pub fn active(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Holds a reference to a flight's slot and removes the table entry when it is
/// the last one out.
#[derive(Debug)]
struct PendingSlot {
    slots: Arc<Mutex<HashMap<FlightId, Slot>>>,
    flight_id: FlightId,
    slot: Option<Slot>,
}

impl Drop for PendingSlot {
    fn drop(&mut self) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = self.slot.take() {
            // One count for the table entry, one for us.
            if Arc::strong_count(&slot) == 2 {
                slots.remove(&self.flight_id);
            }
        }
    }
}

/// Exclusive access to one flight until dropped.
#[derive(Debug)]
pub struct FlightGuard {
    // Field order matters: the mutex guard drops first, then the slot reference.
    guard: Option<OwnedMutexGuard<()>>,
    _pending: PendingSlot,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.guard.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const WAIT: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn test_lock_is_exclusive_per_flight() {
        let table = FlightLockTable::new();
        let flight = Uuid::new_v4();
        let other = Uuid::new_v4();

        let guard = table.acquire(flight, WAIT).await.unwrap();
        assert!(table.is_locked(flight));

        // Same flight times out, a different flight does not
        assert!(table.acquire(flight, WAIT).await.is_none());
        let other_guard = table.acquire(other, WAIT).await;
        assert!(other_guard.is_some());

        drop(guard);
        assert!(!table.is_locked(flight));
        assert!(table.acquire(flight, WAIT).await.is_some());
    }

    #[tokio::test]
    async fn test_entries_are_reclaimed() {
        let table = FlightLockTable::new();
        let flight = Uuid::new_v4();

        let guard = table.acquire(flight, WAIT).await.unwrap();
        assert_eq!(table.active(), 1);

        // A timed-out waiter leaves the holder's entry in place
        assert!(table.acquire(flight, Duration::from_millis(5)).await.is_none());
        assert_eq!(table.active(), 1);

        drop(guard);
        assert_eq!(table.active(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_waiters_are_serialised() {
        let table = Arc::new(FlightLockTable::new());
        let flight = Uuid::new_v4();
        let counter = Arc::new(Mutex::new((0u32, 0u32))); // (inside, max seen)

        let mut handles = Vec::new();
        for _ in 0..16 {
            let table = table.clone();
            let counter = counter.clone();
            handles.push(tokio::spawn(async move {
                let _guard = table.acquire(flight, Duration::from_secs(5)).await.unwrap();
                {
                    let mut c = counter.lock().unwrap();
                    c.0 += 1;
                    c.1 = c.1.max(c.0);
                }
                tokio::time::sleep(Duration::from_millis(2)).await;
                counter.lock().unwrap().0 -= 1;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(counter.lock().unwrap().1, 1);
        assert_eq!(table.active(), 0);
    }
}
