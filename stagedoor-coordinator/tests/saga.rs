use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use stagedoor_booking::store::StoreResult;
use stagedoor_booking::{Booking, BookingStatus, BookingStore, MemoryBookingStore, StatusSwap};
use stagedoor_coordinator::{Coordinator, CoordinatorError, Reaper, RequestBooking};
use stagedoor_core::EventSummary;
use stagedoor_ledger::{MemoryLedgerStore, ReservationState, SeatLedger};
use stagedoor_store::{MemoryEventCatalog, MemoryUserDirectory};

/// Booking store that can be told to fail writes, for driving the
/// compensation and stay-pending paths.
#[derive(Default)]
struct FlakyBookingStore {
    inner: MemoryBookingStore,
    fail_inserts: AtomicBool,
    fail_transitions: AtomicBool,
}

#[async_trait]
impl BookingStore for FlakyBookingStore {
    async fn insert(&self, booking: Booking) -> StoreResult<()> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err("injected insert failure".into());
        }
        self.inner.insert(booking).await
    }

    async fn get(&self, booking_id: Uuid) -> StoreResult<Option<Booking>> {
        self.inner.get(booking_id).await
    }

    async fn find_by_reservation(&self, reservation_id: Uuid) -> StoreResult<Option<Booking>> {
        self.inner.find_by_reservation(reservation_id).await
    }

    async fn list_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Booking>> {
        self.inner.list_for_user(user_id).await
    }

    async fn list_for_event(&self, event_id: Uuid) -> StoreResult<Vec<Booking>> {
        self.inner.list_for_event(event_id).await
    }

    async fn transition(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> StoreResult<Option<StatusSwap>> {
        if self.fail_transitions.load(Ordering::SeqCst) {
            return Err("injected transition failure".into());
        }
        self.inner.transition(booking_id, from, to).await
    }

    async fn expired_pending(&self, now: DateTime<Utc>) -> StoreResult<Vec<Booking>> {
        self.inner.expired_pending(now).await
    }
}

struct Harness {
    coordinator: Arc<Coordinator>,
    ledger: SeatLedger,
    bookings: Arc<FlakyBookingStore>,
    user_id: Uuid,
    event_id: Uuid,
}

impl Harness {
    async fn new(total_seats: u32, hold_duration: Duration) -> Self {
        let ledger = SeatLedger::new(Arc::new(MemoryLedgerStore::new()), 64);
        let bookings = Arc::new(FlakyBookingStore::default());
        let catalog = Arc::new(MemoryEventCatalog::new());
        let directory = Arc::new(MemoryUserDirectory::new());

        let user_id = Uuid::new_v4();
        directory.add(user_id);

        let event_id = Uuid::new_v4();
        catalog.insert(EventSummary {
            event_id,
            total_seats,
            event_date_time: Utc::now() + Duration::days(7),
        });
        ledger.register_event(event_id, total_seats).await.unwrap();

        let coordinator = Arc::new(Coordinator::new(
            ledger.clone(),
            bookings.clone(),
            catalog,
            directory,
            hold_duration,
        ));

        Self {
            coordinator,
            ledger,
            bookings,
            user_id,
            event_id,
        }
    }

    fn request(&self, seats: u32) -> RequestBooking {
        RequestBooking {
            user_id: self.user_id,
            event_id: self.event_id,
            seats,
            idempotency_key: None,
        }
    }

    async fn available(&self) -> u32 {
        self.ledger
            .availability(self.event_id)
            .await
            .unwrap()
            .available_seats
    }

    fn reaper(&self) -> Reaper {
        Reaper::new(
            self.ledger.clone(),
            self.bookings.clone(),
            std::time::Duration::from_secs(30),
        )
    }
}

#[tokio::test]
async fn happy_path_reserves_and_confirms() {
    let h = Harness::new(10, Duration::minutes(10)).await;

    let booking = h.coordinator.request_booking(h.request(3)).await.unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.seats, 3);
    assert_eq!(h.available().await, 7);

    let reservation = h.ledger.reservation(booking.reservation_id).await.unwrap();
    assert_eq!(reservation.state, ReservationState::Confirmed);
    assert_eq!(reservation.booking_id, booking.id);
}

#[tokio::test]
async fn insufficient_inventory_creates_no_booking() {
    let h = Harness::new(2, Duration::minutes(10)).await;

    let err = h.coordinator.request_booking(h.request(5)).await.unwrap_err();
    assert!(matches!(
        err,
        CoordinatorError::InsufficientInventory { requested: 5, available: 2 }
    ));

    assert_eq!(h.available().await, 2);
    let rows = h.coordinator.bookings_for_user(h.user_id).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn requests_are_validated_before_any_reserve() {
    let h = Harness::new(10, Duration::minutes(10)).await;

    let zero = h.coordinator.request_booking(h.request(0)).await.unwrap_err();
    assert!(matches!(zero, CoordinatorError::Validation(_)));

    let mut unknown_user = h.request(1);
    unknown_user.user_id = Uuid::new_v4();
    let err = h.coordinator.request_booking(unknown_user).await.unwrap_err();
    assert!(matches!(err, CoordinatorError::Validation(_)));

    let mut unknown_event = h.request(1);
    unknown_event.event_id = Uuid::new_v4();
    let err = h.coordinator.request_booking(unknown_event).await.unwrap_err();
    assert!(matches!(err, CoordinatorError::Validation(_)));

    assert_eq!(h.available().await, 10);
}

#[tokio::test]
async fn idempotency_key_replay_returns_the_same_booking() {
    let h = Harness::new(10, Duration::minutes(10)).await;

    let mut req = h.request(2);
    req.idempotency_key = Some("checkout-42".into());

    let first = h.coordinator.request_booking(req.clone()).await.unwrap();
    let second = h.coordinator.request_booking(req).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(h.available().await, 8);
    assert_eq!(
        h.coordinator.bookings_for_user(h.user_id).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn cancel_restores_seats_and_is_terminal() {
    let h = Harness::new(10, Duration::minutes(10)).await;

    let booking = h.coordinator.request_booking(h.request(4)).await.unwrap();
    assert_eq!(h.available().await, 6);

    let cancelled = h.coordinator.cancel_booking(booking.id).await.unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert_eq!(h.available().await, 10);

    let again = h.coordinator.cancel_booking(booking.id).await.unwrap_err();
    assert!(matches!(again, CoordinatorError::AlreadyTerminal(_)));
    assert_eq!(h.available().await, 10);

    let confirm = h.coordinator.confirm_booking(booking.id).await.unwrap_err();
    assert!(matches!(confirm, CoordinatorError::AlreadyTerminal(_)));
}

#[tokio::test]
async fn failed_booking_write_compensates_the_hold() {
    let h = Harness::new(10, Duration::minutes(10)).await;
    h.bookings.fail_inserts.store(true, Ordering::SeqCst);

    let err = h.coordinator.request_booking(h.request(3)).await.unwrap_err();
    assert!(matches!(err, CoordinatorError::Storage(_)));

    // The compensating release restored the seats immediately.
    assert_eq!(h.available().await, 10);
}

#[tokio::test]
async fn inline_confirm_failure_leaves_booking_pending() {
    let h = Harness::new(10, Duration::minutes(10)).await;
    h.bookings.fail_transitions.store(true, Ordering::SeqCst);

    let booking = h.coordinator.request_booking(h.request(2)).await.unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
    // The seats stay held; a pending booking still owns its hold.
    assert_eq!(h.available().await, 8);

    // Client-driven confirm retry succeeds once the store recovers.
    h.bookings.fail_transitions.store(false, Ordering::SeqCst);
    let confirmed = h.coordinator.confirm_booking(booking.id).await.unwrap();
    assert_eq!(confirmed.status, BookingStatus::Confirmed);
    assert_eq!(h.available().await, 8);
}

#[tokio::test]
async fn reaper_skips_holds_confirmed_before_reclaim() {
    // A negative hold duration makes every booking overdue immediately, and
    // the failing transition keeps it pending despite inline confirmation.
    let h = Harness::new(10, Duration::seconds(-1)).await;
    h.bookings.fail_transitions.store(true, Ordering::SeqCst);
    let booking = h.coordinator.request_booking(h.request(3)).await.unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
    h.bookings.fail_transitions.store(false, Ordering::SeqCst);

    // The inline attempt already confirmed the reservation before the store
    // write failed, so the reaper must leave this hold alone even though the
    // booking row still says pending.
    let reservation = h.ledger.reservation(booking.reservation_id).await.unwrap();
    assert_eq!(reservation.state, ReservationState::Confirmed);
    let expired = h.reaper().sweep_once().await.unwrap();
    assert_eq!(expired, 0);
    assert_eq!(h.available().await, 7);

    // The pending booking is still live: cancelling it releases the seats.
    h.coordinator.cancel_booking(booking.id).await.unwrap();
    assert_eq!(h.available().await, 10);
}

#[tokio::test]
async fn reaper_reclaims_unconfirmed_pending_bookings() {
    let h = Harness::new(10, Duration::seconds(-1)).await;

    // Build a pending booking whose reservation is still held: insert the
    // rows the way the coordinator would have before its confirm step.
    let reservation_id = Uuid::new_v4();
    let booking_id = Uuid::new_v4();
    let now = Utc::now();
    h.ledger
        .reserve(stagedoor_ledger::ReserveRequest {
            event_id: h.event_id,
            seats: 2,
            reservation_id,
            booking_id,
            expires_at: now - Duration::seconds(1),
        })
        .await
        .unwrap();
    h.bookings
        .insert(Booking::pending(
            booking_id,
            h.user_id,
            h.event_id,
            2,
            reservation_id,
            now,
            now - Duration::seconds(1),
        ))
        .await
        .unwrap();
    assert_eq!(h.available().await, 8);

    let expired = h.reaper().sweep_once().await.unwrap();
    assert_eq!(expired, 1);
    assert_eq!(h.available().await, 10);

    let booking = h.coordinator.booking(booking_id).await.unwrap();
    assert_eq!(booking.status, BookingStatus::Expired);
    let reservation = h.ledger.reservation(reservation_id).await.unwrap();
    assert_eq!(reservation.state, ReservationState::Released);

    // A later confirm attempt observes the terminal state.
    let err = h.coordinator.confirm_booking(booking_id).await.unwrap_err();
    assert!(matches!(err, CoordinatorError::AlreadyTerminal(_)));

    // Sweeping again finds nothing.
    assert_eq!(h.reaper().sweep_once().await.unwrap(), 0);
}

#[tokio::test]
async fn confirm_retry_after_reaper_race_finishes_the_expiry() {
    let h = Harness::new(10, Duration::seconds(-1)).await;

    let reservation_id = Uuid::new_v4();
    let booking_id = Uuid::new_v4();
    let now = Utc::now();
    h.ledger
        .reserve(stagedoor_ledger::ReserveRequest {
            event_id: h.event_id,
            seats: 1,
            reservation_id,
            booking_id,
            expires_at: now - Duration::seconds(1),
        })
        .await
        .unwrap();
    h.bookings
        .insert(Booking::pending(
            booking_id,
            h.user_id,
            h.event_id,
            1,
            reservation_id,
            now,
            now - Duration::seconds(1),
        ))
        .await
        .unwrap();

    // The reaper releases the hold but the booking flip is simulated as not
    // yet landed: the client's confirm retry must converge the booking to
    // EXPIRED rather than resurrect the hold.
    h.ledger.reclaim(reservation_id).await.unwrap();
    let err = h.coordinator.confirm_booking(booking_id).await.unwrap_err();
    assert!(matches!(err, CoordinatorError::AlreadyTerminal(_)));
    assert_eq!(
        h.coordinator.booking(booking_id).await.unwrap().status,
        BookingStatus::Expired
    );
    assert_eq!(h.available().await, 10);
}

#[tokio::test]
async fn worked_example_two_seat_event() {
    let h = Harness::new(2, Duration::minutes(10)).await;

    let mut handles = Vec::new();
    for _ in 0..3 {
        let coordinator = h.coordinator.clone();
        let req = h.request(1);
        handles.push(tokio::spawn(async move {
            coordinator.request_booking(req).await
        }));
    }
    let mut confirmed = Vec::new();
    let mut refused = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(b) => confirmed.push(b),
            Err(CoordinatorError::InsufficientInventory { .. }) => refused += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(confirmed.len(), 2);
    assert_eq!(refused, 1);
    assert_eq!(h.available().await, 0);

    // Cancelling one confirmed booking frees a seat for a new request.
    h.coordinator.cancel_booking(confirmed[0].id).await.unwrap();
    assert_eq!(h.available().await, 1);
    let retry = h.coordinator.request_booking(h.request(1)).await.unwrap();
    assert_eq!(retry.status, BookingStatus::Confirmed);
    assert_eq!(h.available().await, 0);
}
