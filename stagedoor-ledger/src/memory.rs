use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::records::{InventoryRecord, Reservation, ReservationState};
use crate::store::{CasOutcome, LedgerStore, ReleaseScope, StoreResult};

/// In-memory ledger storage. The write lock is held only for the
/// read-modify-write of a single record, which makes the version check and
/// the state flips atomic without a database.
#[derive(Default)]
pub struct MemoryLedgerStore {
    inventory: RwLock<HashMap<Uuid, InventoryRecord>>,
    reservations: RwLock<HashMap<Uuid, Reservation>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn load_inventory(&self, event_id: Uuid) -> StoreResult<Option<InventoryRecord>> {
        Ok(self.inventory.read().get(&event_id).cloned())
    }

    async fn insert_inventory(&self, record: InventoryRecord) -> StoreResult<bool> {
        let mut inventory = self.inventory.write();
        if inventory.contains_key(&record.event_id) {
            return Ok(false);
        }
        inventory.insert(record.event_id, record);
        Ok(true)
    }

    async fn remove_inventory(&self, event_id: Uuid) -> StoreResult<bool> {
        Ok(self.inventory.write().remove(&event_id).is_some())
    }

    async fn compare_and_swap_available(
        &self,
        event_id: Uuid,
        expected_version: u64,
        new_available: u32,
    ) -> StoreResult<CasOutcome> {
        let mut inventory = self.inventory.write();
        match inventory.get_mut(&event_id) {
            None => Ok(CasOutcome::Missing),
            Some(record) if record.version != expected_version => Ok(CasOutcome::VersionMismatch),
            Some(record) => {
                record.available_seats = new_available;
                record.version += 1;
                Ok(CasOutcome::Swapped)
            }
        }
    }

    async fn load_reservation(&self, reservation_id: Uuid) -> StoreResult<Option<Reservation>> {
        Ok(self.reservations.read().get(&reservation_id).cloned())
    }

    async fn insert_reservation_if_absent(
        &self,
        reservation: Reservation,
    ) -> StoreResult<Option<Reservation>> {
        let mut reservations = self.reservations.write();
        if let Some(existing) = reservations.get(&reservation.id) {
            return Ok(Some(existing.clone()));
        }
        reservations.insert(reservation.id, reservation);
        Ok(None)
    }

    async fn delete_reservation(&self, reservation_id: Uuid) -> StoreResult<bool> {
        Ok(self.reservations.write().remove(&reservation_id).is_some())
    }

    async fn mark_confirmed(&self, reservation_id: Uuid) -> StoreResult<Option<Reservation>> {
        let mut reservations = self.reservations.write();
        match reservations.get_mut(&reservation_id) {
            None => Ok(None),
            Some(reservation) => {
                let prior = reservation.clone();
                if prior.state == ReservationState::Held {
                    reservation.state = ReservationState::Confirmed;
                }
                Ok(Some(prior))
            }
        }
    }

    async fn mark_released(
        &self,
        reservation_id: Uuid,
        scope: ReleaseScope,
    ) -> StoreResult<Option<Reservation>> {
        let mut reservations = self.reservations.write();
        match reservations.get_mut(&reservation_id) {
            None => Ok(None),
            Some(reservation) => {
                let prior = reservation.clone();
                let allowed = match prior.state {
                    ReservationState::Held => true,
                    ReservationState::Confirmed => scope == ReleaseScope::Any,
                    ReservationState::Released => false,
                };
                if allowed {
                    reservation.state = ReservationState::Released;
                }
                Ok(Some(prior))
            }
        }
    }

    async fn reinstate_reservation(
        &self,
        reservation_id: Uuid,
        state: ReservationState,
    ) -> StoreResult<Option<Reservation>> {
        let mut reservations = self.reservations.write();
        match reservations.get_mut(&reservation_id) {
            None => Ok(None),
            Some(reservation) => {
                if reservation.state == ReservationState::Released {
                    reservation.state = state;
                }
                Ok(Some(reservation.clone()))
            }
        }
    }
}
