use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::model::{Booking, BookingStatus};
use crate::store::{BookingStore, StatusSwap, StoreResult};

/// In-memory booking storage. Status swaps happen under the write lock, so
/// the compare-and-set contract holds against concurrent callers.
#[derive(Default)]
pub struct MemoryBookingStore {
    bookings: RwLock<HashMap<Uuid, Booking>>,
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn insert(&self, booking: Booking) -> StoreResult<()> {
        self.bookings.write().insert(booking.id, booking);
        Ok(())
    }

    async fn get(&self, booking_id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.bookings.read().get(&booking_id).cloned())
    }

    async fn find_by_reservation(&self, reservation_id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self
            .bookings
            .read()
            .values()
            .find(|b| b.reservation_id == reservation_id)
            .cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Booking>> {
        let mut rows: Vec<Booking> = self
            .bookings
            .read()
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by_key(|b| b.created_at);
        Ok(rows)
    }

    async fn list_for_event(&self, event_id: Uuid) -> StoreResult<Vec<Booking>> {
        let mut rows: Vec<Booking> = self
            .bookings
            .read()
            .values()
            .filter(|b| b.event_id == event_id)
            .cloned()
            .collect();
        rows.sort_by_key(|b| b.created_at);
        Ok(rows)
    }

    async fn transition(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> StoreResult<Option<StatusSwap>> {
        let mut bookings = self.bookings.write();
        match bookings.get_mut(&booking_id) {
            None => Ok(None),
            Some(booking) if booking.status == from => {
                booking.status = to;
                Ok(Some(StatusSwap::Applied(booking.clone())))
            }
            Some(booking) => Ok(Some(StatusSwap::Stale(booking.clone()))),
        }
    }

    async fn expired_pending(&self, now: DateTime<Utc>) -> StoreResult<Vec<Booking>> {
        Ok(self
            .bookings
            .read()
            .values()
            .filter(|b| b.status == BookingStatus::Pending && b.expires_at < now)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn booking(status: BookingStatus, expires_in: Duration) -> Booking {
        let now = Utc::now();
        let mut b = Booking::pending(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            1,
            Uuid::new_v4(),
            now,
            now + expires_in,
        );
        b.status = status;
        b
    }

    #[tokio::test]
    async fn transition_is_compare_and_set() {
        let store = MemoryBookingStore::new();
        let b = booking(BookingStatus::Pending, Duration::minutes(10));
        let id = b.id;
        store.insert(b).await.unwrap();

        let first = store
            .transition(id, BookingStatus::Pending, BookingStatus::Cancelled)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(first, StatusSwap::Applied(_)));

        // The loser of the race sees the winner's state, unchanged.
        let second = store
            .transition(id, BookingStatus::Pending, BookingStatus::Expired)
            .await
            .unwrap()
            .unwrap();
        match second {
            StatusSwap::Stale(current) => assert_eq!(current.status, BookingStatus::Cancelled),
            other => panic!("expected Stale, got {other:?}"),
        }

        let missing = store
            .transition(Uuid::new_v4(), BookingStatus::Pending, BookingStatus::Expired)
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn expired_pending_filters_status_and_deadline() {
        let store = MemoryBookingStore::new();
        let overdue = booking(BookingStatus::Pending, Duration::minutes(-5));
        let fresh = booking(BookingStatus::Pending, Duration::minutes(5));
        let confirmed = booking(BookingStatus::Confirmed, Duration::minutes(-5));
        let overdue_id = overdue.id;
        for b in [overdue, fresh, confirmed] {
            store.insert(b).await.unwrap();
        }

        let hits = store.expired_pending(Utc::now()).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, overdue_id);
    }

    #[tokio::test]
    async fn lookup_by_reservation_and_user() {
        let store = MemoryBookingStore::new();
        let b = booking(BookingStatus::Pending, Duration::minutes(10));
        let (id, user_id, reservation_id) = (b.id, b.user_id, b.reservation_id);
        store.insert(b).await.unwrap();

        let by_res = store.find_by_reservation(reservation_id).await.unwrap();
        assert_eq!(by_res.unwrap().id, id);

        let listed = store.list_for_user(user_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(store.list_for_user(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn lookup_by_event() {
        let store = MemoryBookingStore::new();
        let a = booking(BookingStatus::Pending, Duration::minutes(10));
        let mut b = booking(BookingStatus::Confirmed, Duration::minutes(10));
        b.event_id = a.event_id;
        let other = booking(BookingStatus::Pending, Duration::minutes(10));
        let event_id = a.event_id;
        for row in [a, b, other] {
            store.insert(row).await.unwrap();
        }

        let listed = store.list_for_event(event_id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(store.list_for_event(Uuid::new_v4()).await.unwrap().is_empty());
    }
}
