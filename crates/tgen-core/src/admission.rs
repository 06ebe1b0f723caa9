//! Admission control: caps how many transfers run at once.
//!
//! The scheduler waits on [`AdmissionGate::acquire`] before spawning each
//! transfer, so a full gate stalls the scheduling loop instead of piling up
//! tasks. The returned [`AdmissionSlot`] travels with the transfer and frees
//! its slot when dropped, whichever way the transfer ends.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Clone)]
pub struct AdmissionGate {
    capacity: usize,
    slots: Arc<Semaphore>,
}

/// A held slot. Dropping it releases the slot.
#[derive(Debug)]
pub struct AdmissionSlot {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionGate {
    /// Gate with `capacity` slots (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            slots: Arc::new(Semaphore::new(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently held.
    pub fn in_use(&self) -> usize {
        self.capacity.saturating_sub(self.slots.available_permits())
    }

    /// Waits until a slot is free and takes it.
    pub async fn acquire(&self) -> AdmissionSlot {
        // The semaphore is owned here and never closed.
        let permit = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .unwrap_or_else(|_| unreachable!("admission semaphore closed"));
        AdmissionSlot { _permit: permit }
    }

    /// Takes a slot if one is free right now.
    pub fn try_acquire(&self) -> Option<AdmissionSlot> {
        Arc::clone(&self.slots)
            .try_acquire_owned()
            .ok()
            .map(|permit| AdmissionSlot { _permit: permit })
    }
}
