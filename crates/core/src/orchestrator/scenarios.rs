//! End-to-end booking scenarios against the in-memory store.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use staybook_shared::types::{AccommodationId, BookingId, FinancialAccountId, Money, ServiceFeeId, UserId};
use tokio::sync::Barrier;

use crate::availability::error::AvailabilityError;
use crate::booking::error::BookingError;
use crate::booking::types::BookingState;
use crate::orchestrator::collaborators::{
    AccommodationDirectory, AccommodationInfo, CollaboratorError, DiscountPolicy, FixedClock, Principal, Role,
    StaticAccommodations, StaticGuests,
};
use crate::orchestrator::error::{EngineError, ErrorKind};
use crate::orchestrator::service::BookingOrchestrator;
use crate::orchestrator::types::{CreateBookingRequest, EngineSettings};
use crate::pricing::error::PricingError;
use crate::pricing::policy::TaxPolicy;
use crate::pricing::types::FeeType;
use crate::settlement::error::SettlementError;
use crate::settlement::types::{NewFinancialAccount, PostingKind};
use crate::store::{BookingStore, MemoryStore, NewServiceFee};
use crate::voucher::types::VoucherState;

const GUEST: UserId = UserId::new(7);
const OTHER_GUEST: UserId = UserId::new(8);
const HOUSE: AccommodationId = AccommodationId::new(1);
const CLOSED_HOUSE: AccommodationId = AccommodationId::new(2);

struct FixedTax(Money);

impl TaxPolicy for FixedTax {
    fn tax_for(&self, _taxable: Money) -> Option<Money> {
        Some(self.0)
    }
}

struct TenPercentOff;

#[async_trait]
impl DiscountPolicy for TenPercentOff {
    async fn discount_for(
        &self,
        _guest_id: UserId,
        _accommodation_id: AccommodationId,
        sub_total: Money,
    ) -> Result<Money, CollaboratorError> {
        Ok(sub_total.percent(dec!(10)))
    }
}

struct SlowDirectory;

#[async_trait]
impl AccommodationDirectory for SlowDirectory {
    async fn lookup(&self, _id: AccommodationId) -> Result<Option<AccommodationInfo>, CollaboratorError> {
        tokio::time::sleep(StdDuration::from_millis(500)).await;
        Ok(None)
    }
}

struct Harness {
    engine: BookingOrchestrator,
    store: Arc<MemoryStore>,
    clock: Arc<FixedClock>,
    fee_id: ServiceFeeId,
    account_id: FinancialAccountId,
}

fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, month, day).unwrap()
}

fn accommodations() -> StaticAccommodations {
    StaticAccommodations::new([
        AccommodationInfo {
            id: HOUSE,
            max_guest_capacity: 4,
            price_per_night: Money::new(dec!(100.00)),
            is_operational: true,
        },
        AccommodationInfo {
            id: CLOSED_HOUSE,
            max_guest_capacity: 4,
            price_per_night: Money::new(dec!(80.00)),
            is_operational: false,
        },
    ])
}

async fn harness_with(balance: Decimal, bookings_minimum: u32) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let fee = store
        .create_service_fee(NewServiceFee {
            value: dec!(10.00),
            fee_type: FeeType::Flat,
            prom_calification_minimum: dec!(3.5),
            number_bookings_minimum: bookings_minimum,
        })
        .await
        .unwrap();
    let account = store
        .create_account(NewFinancialAccount {
            id_user: GUEST,
            bank_name: "First Bank".to_string(),
            number_account: "0001".to_string(),
            available_balance: Money::new(balance),
        })
        .await
        .unwrap();

    let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 2, 1, 10, 0, 0).unwrap()));
    let engine = BookingOrchestrator::new(
        store.clone(),
        Arc::new(accommodations()),
        Arc::new(StaticGuests::new(dec!(4.5))),
        EngineSettings::default(),
    )
    .with_tax_policy(Arc::new(FixedTax(Money::new(dec!(19.00)))))
    .with_clock(clock.clone());

    Harness {
        engine,
        store,
        clock,
        fee_id: fee.id,
        account_id: account.id,
    }
}

async fn harness() -> Harness {
    harness_with(dec!(1000.00), 0).await
}

fn request(h: &Harness, check_in: NaiveDate, check_out: NaiveDate) -> CreateBookingRequest {
    CreateBookingRequest {
        accommodation_id: HOUSE,
        guest_id: GUEST,
        check_in,
        check_out,
        number_of_guest: 2,
        discount: Some(Money::zero()),
        service_fee_id: h.fee_id,
        payment_method_id: Some(h.account_id),
        selected_services: vec![],
    }
}

async fn balance(h: &Harness) -> Money {
    h.store
        .find_account(h.account_id)
        .await
        .unwrap()
        .unwrap()
        .available_balance
}

async fn confirmed_booking(h: &Harness) -> BookingId {
    let created = h.engine.create_booking(request(h, date(3, 1), date(3, 4))).await.unwrap();
    h.engine.confirm_payment(created.booking_id).await.unwrap();
    created.booking_id
}

#[tokio::test]
async fn test_reference_scenario_prices_and_blocks_overlap() {
    let h = harness().await;

    let created = h.engine.create_booking(request(&h, date(3, 1), date(3, 4))).await.unwrap();
    assert_eq!(created.state, BookingState::Pending);
    assert_eq!(created.total_price, Money::new(dec!(329.00)));
    assert!(!created.payment_status);

    let booking = h.engine.get_booking(created.booking_id).await.unwrap();
    assert_eq!(booking.detail.pricing.sub_total, Money::new(dec!(300.00)));
    assert_eq!(booking.detail.pricing.fee, Money::new(dec!(10.00)));
    assert_eq!(booking.detail.pricing.tax, Money::new(dec!(19.00)));

    let err = h
        .engine
        .create_booking(request(&h, date(3, 3), date(3, 5)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Availability(AvailabilityError::Overlap { .. })));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(err.status_code(), 409);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_overlapping_requests_admit_one() {
    let h = Arc::new(harness().await);
    let barrier = Arc::new(Barrier::new(2));

    let tasks: Vec<_> = [(date(3, 1), date(3, 4)), (date(3, 3), date(3, 5))]
        .into_iter()
        .map(|(check_in, check_out)| {
            let h = Arc::clone(&h);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                let request = request(&h, check_in, check_out);
                barrier.wait().await;
                h.engine.create_booking(request).await
            })
        })
        .collect();

    let mut results = Vec::new();
    for task in tasks {
        results.push(task.await.unwrap());
    }

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(EngineError::Availability(AvailabilityError::Overlap { .. }))))
            .count(),
        1
    );
}

#[tokio::test]
async fn test_check_in_on_pending_fails_without_change() {
    let h = harness().await;
    let created = h.engine.create_booking(request(&h, date(3, 1), date(3, 4))).await.unwrap();
    h.clock.advance(Duration::days(30));

    let err = h.engine.check_in(created.booking_id).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Booking(BookingError::InvalidTransition {
            from: BookingState::Pending,
            to: BookingState::CheckedIn,
        })
    ));

    let booking = h.engine.get_booking(created.booking_id).await.unwrap();
    assert_eq!(booking.state, BookingState::Pending);
    assert_eq!(booking.version, 1);
}

#[tokio::test]
async fn test_confirm_payment_is_idempotent() {
    let h = harness().await;
    let created = h.engine.create_booking(request(&h, date(3, 1), date(3, 4))).await.unwrap();

    let first = h.engine.confirm_payment(created.booking_id).await.unwrap();
    let second = h.engine.confirm_payment(created.booking_id).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.state, BookingState::Confirmed);
    assert!(first.payment_status);

    let snapshot = h.engine.get_voucher(created.booking_id).await.unwrap();
    assert_eq!(snapshot.voucher.state, VoucherState::Paid);
    assert_eq!(snapshot.voucher.total, Money::new(dec!(329.00)));
    assert_eq!(snapshot.transactions.len(), 1);
    assert_eq!(balance(&h).await, Money::new(dec!(671.00)));
}

#[tokio::test]
async fn test_cancel_confirmed_booking_restores_balance() {
    let h = harness().await;
    let before = balance(&h).await;
    let booking_id = confirmed_booking(&h).await;

    let guest = Principal::new(GUEST, Role::Guest);
    let cancelled = h
        .engine
        .cancel_booking(booking_id, &guest, Some("Flight cancelled".to_string()))
        .await
        .unwrap();

    assert_eq!(cancelled.state, BookingState::Cancelled);
    assert!(!cancelled.payment_status);
    assert_eq!(balance(&h).await, before);

    let snapshot = h.engine.get_voucher(booking_id).await.unwrap();
    assert_eq!(snapshot.voucher.state, VoucherState::Refunded);
    let refunds: Vec<_> = snapshot
        .transactions
        .iter()
        .filter(|t| t.kind == PostingKind::Refund)
        .collect();
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0].reverses, Some(snapshot.transactions[0].id));
    assert_eq!(snapshot.voucher.total, Money::new(dec!(329.00)));

    let again = h.engine.cancel_booking(booking_id, &guest, None).await.unwrap_err();
    assert!(matches!(again, EngineError::Booking(BookingError::InvalidTransition { .. })));
}

#[tokio::test]
async fn test_cancel_requires_owner_or_admin() {
    let h = harness().await;
    let created = h.engine.create_booking(request(&h, date(3, 1), date(3, 4))).await.unwrap();

    let stranger = h.engine.principal(OTHER_GUEST, "guest").unwrap();
    let err = h
        .engine
        .cancel_booking(created.booking_id, &stranger, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let admin = h.engine.principal(OTHER_GUEST, "ADMIN").unwrap();
    let cancelled = h.engine.cancel_booking(created.booking_id, &admin, None).await.unwrap();
    assert_eq!(cancelled.state, BookingState::Cancelled);

    let freed = h.engine.create_booking(request(&h, date(3, 2), date(3, 3))).await;
    assert!(freed.is_ok());
}

#[tokio::test]
async fn test_unknown_role_claim_is_rejected() {
    let h = harness().await;
    let err = h.engine.principal(GUEST, "owner").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_full_stay_lifecycle() {
    let h = harness().await;
    let booking_id = confirmed_booking(&h).await;

    let early = h.engine.check_in(booking_id).await.unwrap_err();
    assert!(matches!(early, EngineError::Booking(BookingError::TooEarly { .. })));

    h.clock.advance(Duration::days(28));
    let checked_in = h.engine.check_in(booking_id).await.unwrap();
    assert_eq!(checked_in.state, BookingState::CheckedIn);

    let guest = Principal::new(GUEST, Role::Guest);
    let cancel = h.engine.cancel_booking(booking_id, &guest, None).await.unwrap_err();
    assert!(matches!(cancel, EngineError::Booking(BookingError::InvalidTransition { .. })));

    let early = h.engine.check_out(booking_id).await.unwrap_err();
    assert!(matches!(early, EngineError::Booking(BookingError::TooEarly { .. })));

    h.clock.advance(Duration::days(3));
    let checked_out = h.engine.check_out(booking_id).await.unwrap();
    assert_eq!(checked_out.state, BookingState::CheckedOut);
    assert!(checked_out.payment_status);
    assert_eq!(h.store.count_completed_bookings(GUEST).await.unwrap(), 1);
}

#[tokio::test]
async fn test_insufficient_funds_leaves_booking_pending() {
    let h = harness_with(dec!(100.00), 0).await;
    let created = h.engine.create_booking(request(&h, date(3, 1), date(3, 4))).await.unwrap();

    let err = h.engine.confirm_payment(created.booking_id).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Settlement(SettlementError::InsufficientFunds { .. })
    ));

    let booking = h.engine.get_booking(created.booking_id).await.unwrap();
    assert_eq!(booking.state, BookingState::Pending);
    assert!(!booking.payment_status);

    let snapshot = h.engine.get_voucher(created.booking_id).await.unwrap();
    assert_eq!(snapshot.voucher.state, VoucherState::Pending);
    assert!(snapshot.transactions.is_empty());
    assert_eq!(balance(&h).await, Money::new(dec!(100.00)));
}

#[tokio::test]
async fn test_cancel_unpaid_voucher_voids_it() {
    let h = harness_with(dec!(100.00), 0).await;
    let created = h.engine.create_booking(request(&h, date(3, 1), date(3, 4))).await.unwrap();
    let _ = h.engine.confirm_payment(created.booking_id).await;

    let guest = Principal::new(GUEST, Role::Guest);
    h.engine.cancel_booking(created.booking_id, &guest, None).await.unwrap();

    let snapshot = h.engine.get_voucher(created.booking_id).await.unwrap();
    assert_eq!(snapshot.voucher.state, VoucherState::Cancelled);
    assert!(snapshot.transactions.is_empty());
}

#[tokio::test]
async fn test_get_voucher_before_payment_is_not_found() {
    let h = harness().await;
    let created = h.engine.create_booking(request(&h, date(3, 1), date(3, 4))).await.unwrap();

    let err = h.engine.get_voucher(created.booking_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let missing = h.engine.get_booking(BookingId::new(999)).await.unwrap_err();
    assert_eq!(missing.status_code(), 404);
}

#[tokio::test]
async fn test_request_validation() {
    let h = harness().await;

    let reversed = h.engine.create_booking(request(&h, date(3, 4), date(3, 1))).await.unwrap_err();
    assert!(matches!(reversed, EngineError::Availability(AvailabilityError::InvalidDateOrder { .. })));
    assert_eq!(reversed.kind(), ErrorKind::Validation);

    let past = h.engine.create_booking(request(&h, date(1, 10), date(1, 12))).await.unwrap_err();
    assert!(matches!(past, EngineError::Availability(AvailabilityError::DateInPast { .. })));

    let mut crowded = request(&h, date(3, 1), date(3, 4));
    crowded.number_of_guest = 5;
    let err = h.engine.create_booking(crowded).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidGuestCount { requested: 5, capacity: 4 }));

    let mut closed = request(&h, date(3, 1), date(3, 4));
    closed.accommodation_id = CLOSED_HOUSE;
    let err = h.engine.create_booking(closed).await.unwrap_err();
    assert!(matches!(err, EngineError::AccommodationUnavailable(id) if id == CLOSED_HOUSE));

    let mut greedy = request(&h, date(3, 1), date(3, 4));
    greedy.discount = Some(Money::new(dec!(300.01)));
    let err = h.engine.create_booking(greedy).await.unwrap_err();
    assert!(matches!(err, EngineError::Pricing(PricingError::InvalidDiscount { .. })));

    let mut foreign = request(&h, date(3, 1), date(3, 4));
    foreign.guest_id = OTHER_GUEST;
    let err = h.engine.create_booking(foreign).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Settlement(SettlementError::AccountHolderMismatch { .. })
    ));

    let mut unknown_fee = request(&h, date(3, 1), date(3, 4));
    unknown_fee.service_fee_id = ServiceFeeId::new(99);
    let err = h.engine.create_booking(unknown_fee).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let booking = h.engine.create_booking(request(&h, date(3, 1), date(3, 4))).await;
    assert!(booking.is_ok());
}

#[tokio::test]
async fn test_service_fee_eligibility() {
    let h = harness_with(dec!(1000.00), 1).await;

    let err = h
        .engine
        .create_booking(request(&h, date(3, 1), date(3, 4)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Pricing(PricingError::ServiceFeeNotEligible { .. })));
    assert_eq!(err.status_code(), 400);
}

#[tokio::test]
async fn test_low_rating_is_not_eligible() {
    let h = harness().await;
    let engine = BookingOrchestrator::new(
        h.store.clone(),
        Arc::new(accommodations()),
        Arc::new(StaticGuests::new(dec!(4.5)).with_rating(GUEST, dec!(2.0))),
        EngineSettings::default(),
    )
    .with_clock(h.clock.clone());

    let err = engine
        .create_booking(request(&h, date(3, 1), date(3, 4)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Pricing(PricingError::ServiceFeeNotEligible { .. })));
}

#[tokio::test]
async fn test_discount_policy_applies_without_explicit_discount() {
    let h = harness().await;
    let engine = BookingOrchestrator::new(
        h.store.clone(),
        Arc::new(accommodations()),
        Arc::new(StaticGuests::new(dec!(4.5))),
        EngineSettings {
            tax_rate: dec!(0.19),
            ..EngineSettings::default()
        },
    )
    .with_discount_policy(Arc::new(TenPercentOff))
    .with_clock(h.clock.clone());

    let mut req = request(&h, date(3, 1), date(3, 4));
    req.discount = None;
    let created = engine.create_booking(req).await.unwrap();

    // 300.00 - 30.00 + 10.00 = 280.00 taxable, 53.20 tax
    assert_eq!(created.total_price, Money::new(dec!(333.20)));
}

#[tokio::test]
async fn test_overflowing_nightly_price_is_a_validation_error() {
    let h = harness().await;
    let engine = BookingOrchestrator::new(
        h.store.clone(),
        Arc::new(StaticAccommodations::new([AccommodationInfo {
            id: HOUSE,
            max_guest_capacity: 4,
            price_per_night: Money::new(dec!(50000000000000000000000000000)),
            is_operational: true,
        }])),
        Arc::new(StaticGuests::new(dec!(4.5))),
        EngineSettings::default(),
    )
    .with_discount_policy(Arc::new(TenPercentOff))
    .with_clock(h.clock.clone());

    let mut req = request(&h, date(3, 1), date(3, 4));
    req.discount = None;
    let err = engine.create_booking(req).await.unwrap_err();
    assert!(matches!(err, EngineError::Pricing(PricingError::AmountOverflow("subtotal"))));
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = engine
        .create_booking(request(&h, date(3, 1), date(3, 4)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Pricing(PricingError::AmountOverflow(_))));
}

#[tokio::test]
async fn test_collaborator_timeout_is_retryable() {
    let h = harness().await;
    let engine = BookingOrchestrator::new(
        h.store.clone(),
        Arc::new(SlowDirectory),
        Arc::new(StaticGuests::new(dec!(4.5))),
        EngineSettings {
            collaborator_timeout_ms: 20,
            ..EngineSettings::default()
        },
    )
    .with_clock(h.clock.clone());

    let err = engine
        .create_booking(request(&h, date(3, 1), date(3, 4)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::CollaboratorTimeout { timeout_ms: 20, .. }));
    assert!(err.is_retryable());

    let retry = h.engine.create_booking(request(&h, date(3, 1), date(3, 4))).await;
    assert!(retry.is_ok());
}

#[tokio::test]
async fn test_reschedule_reprices_pending_booking() {
    let h = harness().await;
    let created = h.engine.create_booking(request(&h, date(3, 1), date(3, 4))).await.unwrap();
    h.engine.create_booking(request(&h, date(3, 10), date(3, 12))).await.unwrap();

    let moved = h
        .engine
        .reschedule_booking(created.booking_id, date(3, 2), date(3, 7))
        .await
        .unwrap();
    assert_eq!(moved.total_price, Money::new(dec!(529.00)));

    let clash = h
        .engine
        .reschedule_booking(created.booking_id, date(3, 6), date(3, 11))
        .await
        .unwrap_err();
    assert!(matches!(clash, EngineError::Availability(AvailabilityError::Overlap { .. })));

    h.engine.confirm_payment(created.booking_id).await.unwrap();
    let locked = h
        .engine
        .reschedule_booking(created.booking_id, date(3, 2), date(3, 5))
        .await
        .unwrap_err();
    assert!(matches!(locked, EngineError::Booking(BookingError::NotReschedulable { .. })));
}
