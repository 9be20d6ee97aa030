//! Booking store integration tests.
//!
//! Runs the engine against an in-memory SQLite database migrated with the
//! real migrator. A single pooled connection keeps every query on the same
//! in-memory database.

// Allow common test patterns that trigger clippy warnings
#![allow(clippy::too_many_lines)]

use std::sync::Arc;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use futures::future::join_all;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, sea_query::Expr};
use staybook_core::availability::AvailabilityError;
use staybook_core::booking::{BookingError, BookingState};
use staybook_core::orchestrator::{
    AccommodationInfo, Clock, CreateBookingRequest, EngineSettings, FixedClock, Principal, Role, StaticAccommodations,
    StaticGuests,
};
use staybook_core::pricing::{FeeType, TaxPolicy};
use staybook_core::settlement::{NewFinancialAccount, PostingKind};
use staybook_core::store::{BookingStore, CancelRequest, NewServiceFee, StoreError};
use staybook_core::voucher::VoucherState;
use staybook_core::{BookingOrchestrator, EngineError};
use staybook_db::entities::bookings;
use staybook_db::migration::{Migrator, MigratorTrait};
use staybook_db::{DbBookingStore, connect};
use staybook_shared::config::DatabaseConfig;
use staybook_shared::types::{AccommodationId, BookingId, FinancialAccountId, Money, ServiceFeeId, UserId};
use tokio::sync::Barrier;

const GUEST: UserId = UserId::new(7);
const HOUSE: AccommodationId = AccommodationId::new(1);

struct FixedTax;

impl TaxPolicy for FixedTax {
    fn tax_for(&self, _taxable: Money) -> Option<Money> {
        Some(Money::new(dec!(19.00)))
    }
}

struct TestContext {
    db: DatabaseConnection,
    store: Arc<DbBookingStore>,
    engine: BookingOrchestrator,
    clock: Arc<FixedClock>,
    fee_id: ServiceFeeId,
    account_id: FinancialAccountId,
}

fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, month, day).unwrap()
}

async fn setup(balance: Money) -> TestContext {
    let db = connect(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
    })
    .await
    .expect("Failed to open in-memory database");
    Migrator::up(&db, None).await.expect("Failed to run migrations");

    let store = Arc::new(DbBookingStore::new(db.clone()));
    let fee = store
        .create_service_fee(NewServiceFee {
            value: dec!(10.00),
            fee_type: FeeType::Flat,
            prom_calification_minimum: dec!(3.5),
            number_bookings_minimum: 0,
        })
        .await
        .unwrap();
    let account = store
        .create_account(NewFinancialAccount {
            id_user: GUEST,
            bank_name: "First Bank".to_string(),
            number_account: "0001".to_string(),
            available_balance: balance,
        })
        .await
        .unwrap();

    let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 2, 1, 10, 0, 0).unwrap()));
    let engine = BookingOrchestrator::new(
        store.clone(),
        Arc::new(StaticAccommodations::new([AccommodationInfo {
            id: HOUSE,
            max_guest_capacity: 4,
            price_per_night: Money::new(dec!(100.00)),
            is_operational: true,
        }])),
        Arc::new(StaticGuests::new(dec!(4.5))),
        EngineSettings::default(),
    )
    .with_tax_policy(Arc::new(FixedTax))
    .with_clock(clock.clone());

    TestContext {
        db,
        store,
        engine,
        clock,
        fee_id: fee.id,
        account_id: account.id,
    }
}

fn request(ctx: &TestContext, check_in: NaiveDate, check_out: NaiveDate) -> CreateBookingRequest {
    CreateBookingRequest {
        accommodation_id: HOUSE,
        guest_id: GUEST,
        check_in,
        check_out,
        number_of_guest: 2,
        discount: None,
        service_fee_id: ctx.fee_id,
        payment_method_id: Some(ctx.account_id),
        selected_services: vec![3],
    }
}

async fn balance(ctx: &TestContext) -> Money {
    ctx.store
        .find_account(ctx.account_id)
        .await
        .unwrap()
        .unwrap()
        .available_balance
}

#[tokio::test]
async fn test_booking_lifecycle_round_trips_through_database() {
    let ctx = setup(Money::new(dec!(1000.00))).await;

    let created = ctx
        .engine
        .create_booking(request(&ctx, date(3, 1), date(3, 4)))
        .await
        .unwrap();
    assert_eq!(created.total_price, Money::new(dec!(329.00)));
    assert_eq!(created.state, BookingState::Pending);

    let stored = ctx.engine.get_booking(created.booking_id).await.unwrap();
    assert_eq!(stored.version, 1);
    assert_eq!(stored.detail.stay.nights(), 3);
    assert_eq!(stored.detail.service_fee.fee_type, FeeType::Flat);
    assert_eq!(stored.detail.selected_services, vec![3]);
    assert!(stored.detail.pricing.is_consistent());

    let overlap = ctx
        .engine
        .create_booking(request(&ctx, date(3, 3), date(3, 5)))
        .await
        .unwrap_err();
    assert!(matches!(overlap, EngineError::Availability(AvailabilityError::Overlap { .. })));

    let confirmed = ctx.engine.confirm_payment(created.booking_id).await.unwrap();
    assert_eq!(confirmed.state, BookingState::Confirmed);
    assert!(confirmed.payment_status);
    assert_eq!(balance(&ctx).await, Money::new(dec!(671.00)));

    let again = ctx.engine.confirm_payment(created.booking_id).await.unwrap();
    assert_eq!(again, confirmed);

    let snapshot = ctx.engine.get_voucher(created.booking_id).await.unwrap();
    assert_eq!(snapshot.voucher.state, VoucherState::Paid);
    assert_eq!(snapshot.voucher.total, Money::new(dec!(329.00)));
    assert_eq!(snapshot.voucher.detail.number_nights, 3);
    assert_eq!(snapshot.transactions.len(), 1);

    let guest = Principal::new(GUEST, Role::Guest);
    let cancelled = ctx
        .engine
        .cancel_booking(created.booking_id, &guest, Some("Change of plans".to_string()))
        .await
        .unwrap();
    assert_eq!(cancelled.state, BookingState::Cancelled);
    assert!(!cancelled.payment_status);
    assert_eq!(balance(&ctx).await, Money::new(dec!(1000.00)));

    let snapshot = ctx.engine.get_voucher(created.booking_id).await.unwrap();
    assert_eq!(snapshot.voucher.state, VoucherState::Refunded);
    assert_eq!(snapshot.transactions.len(), 2);
    assert_eq!(snapshot.transactions[1].kind, PostingKind::Refund);
    assert_eq!(snapshot.transactions[1].reverses, Some(snapshot.transactions[0].id));

    let booking = ctx.engine.get_booking(created.booking_id).await.unwrap();
    assert_eq!(booking.cancellation_reason.as_deref(), Some("Change of plans"));

    let rebooked = ctx.engine.create_booking(request(&ctx, date(3, 3), date(3, 5))).await;
    assert!(rebooked.is_ok());
}

#[tokio::test]
async fn test_failed_settlement_rolls_back() {
    let ctx = setup(Money::new(dec!(50.00))).await;
    let created = ctx
        .engine
        .create_booking(request(&ctx, date(3, 1), date(3, 4)))
        .await
        .unwrap();

    let err = ctx.engine.confirm_payment(created.booking_id).await.unwrap_err();
    assert_eq!(err.error_code(), "INSUFFICIENT_FUNDS");

    let booking = ctx.engine.get_booking(created.booking_id).await.unwrap();
    assert_eq!(booking.state, BookingState::Pending);
    assert!(!booking.payment_status);
    assert!(booking.voucher_id.is_some());

    let snapshot = ctx.engine.get_voucher(created.booking_id).await.unwrap();
    assert_eq!(snapshot.voucher.state, VoucherState::Pending);
    assert!(snapshot.transactions.is_empty());
    assert_eq!(balance(&ctx).await, Money::new(dec!(50.00)));
}

#[tokio::test]
async fn test_stay_transitions_and_completed_count() {
    let ctx = setup(Money::new(dec!(1000.00))).await;
    let created = ctx
        .engine
        .create_booking(request(&ctx, date(3, 1), date(3, 4)))
        .await
        .unwrap();
    ctx.engine.confirm_payment(created.booking_id).await.unwrap();

    ctx.clock.advance(Duration::days(28));
    let checked_in = ctx.engine.check_in(created.booking_id).await.unwrap();
    assert_eq!(checked_in.state, BookingState::CheckedIn);

    ctx.clock.advance(Duration::days(3));
    let checked_out = ctx.engine.check_out(created.booking_id).await.unwrap();
    assert_eq!(checked_out.state, BookingState::CheckedOut);

    assert_eq!(ctx.store.count_completed_bookings(GUEST).await.unwrap(), 1);
    assert_eq!(ctx.store.count_completed_bookings(UserId::new(99)).await.unwrap(), 0);
}

#[tokio::test]
async fn test_stale_version_is_rejected() {
    let ctx = setup(Money::new(dec!(1000.00))).await;
    let created = ctx
        .engine
        .create_booking(request(&ctx, date(3, 1), date(3, 4)))
        .await
        .unwrap();
    ctx.engine.confirm_payment(created.booking_id).await.unwrap();

    let booking = ctx.store.find_booking(created.booking_id).await.unwrap().unwrap();
    let cancel = CancelRequest {
        cancelled_by: GUEST,
        reason: None,
        now: ctx.clock.now(),
    };
    let err = ctx
        .store
        .cancel(created.booking_id, booking.version - 1, cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::StaleVersion(id) if id == created.booking_id));

    let unchanged = ctx.store.find_booking(created.booking_id).await.unwrap().unwrap();
    assert_eq!(unchanged.state, BookingState::Confirmed);
    assert_eq!(balance(&ctx).await, Money::new(dec!(671.00)));
}

#[tokio::test]
async fn test_reschedule_persists_new_quote() {
    let ctx = setup(Money::new(dec!(1000.00))).await;
    let created = ctx
        .engine
        .create_booking(request(&ctx, date(3, 1), date(3, 4)))
        .await
        .unwrap();

    let moved = ctx
        .engine
        .reschedule_booking(created.booking_id, date(3, 10), date(3, 12))
        .await
        .unwrap();
    assert_eq!(moved.total_price, Money::new(dec!(229.00)));

    let booking = ctx.engine.get_booking(created.booking_id).await.unwrap();
    assert_eq!(booking.detail.stay.check_in, date(3, 10));
    assert_eq!(booking.detail.pricing.nights, 2);
    assert_eq!(booking.version, 2);

    let freed = ctx.engine.create_booking(request(&ctx, date(3, 1), date(3, 4))).await;
    assert!(freed.is_ok());

    ctx.engine.confirm_payment(created.booking_id).await.unwrap();
    let locked = ctx
        .engine
        .reschedule_booking(created.booking_id, date(3, 20), date(3, 22))
        .await
        .unwrap_err();
    assert!(matches!(locked, EngineError::Booking(BookingError::NotReschedulable { .. })));
}

#[tokio::test]
async fn test_unknown_state_surfaces_as_corruption() {
    let ctx = setup(Money::new(dec!(1000.00))).await;
    let created = ctx
        .engine
        .create_booking(request(&ctx, date(3, 1), date(3, 4)))
        .await
        .unwrap();

    bookings::Entity::update_many()
        .col_expr(bookings::Column::State, Expr::value("LIMBO"))
        .filter(bookings::Column::Id.eq(created.booking_id.into_inner()))
        .exec(&ctx.db)
        .await
        .unwrap();

    let err = ctx.store.find_booking(created.booking_id).await.unwrap_err();
    assert!(matches!(err, StoreError::Corrupt(_)));

    let err = ctx.engine.get_booking(created.booking_id).await.unwrap_err();
    assert_eq!(err.status_code(), 500);
}

#[tokio::test]
async fn test_missing_rows_are_not_found() {
    let ctx = setup(Money::new(dec!(1000.00))).await;

    assert!(ctx.store.find_booking(BookingId::new(404)).await.unwrap().is_none());
    let err = ctx.engine.confirm_payment(BookingId::new(404)).await.unwrap_err();
    assert_eq!(err.status_code(), 404);
}

// One pooled connection serialises these units; the lock-level race runs
// against Postgres in concurrent_test.rs.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_simultaneous_overlapping_requests_admit_one() {
    let ctx = Arc::new(setup(Money::new(dec!(1000.00))).await);
    let barrier = Arc::new(Barrier::new(4));

    let tasks = [(1, 4), (2, 5), (3, 6), (3, 4)].map(|(from, to)| {
        let ctx = Arc::clone(&ctx);
        let barrier = Arc::clone(&barrier);
        tokio::spawn(async move {
            let request = request(&ctx, date(3, from), date(3, to));
            barrier.wait().await;
            ctx.engine.create_booking(request).await
        })
    });

    let results: Vec<_> = join_all(tasks).await.into_iter().map(Result::unwrap).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|err| matches!(err, EngineError::Availability(AvailabilityError::Overlap { .. })))
    );
}
