//! Pure planning for store units of work.
//!
//! A store loads fresh rows inside its atomic unit, hands them to these
//! functions, and writes exactly what they return. Nothing here touches
//! storage, so every implementation enforces the same rules.

use chrono::{DateTime, Utc};
use staybook_shared::types::{BookingId, DetailBookingId, FinancialAccountId, VoucherId};

use crate::availability::guard::AvailabilityGuard;
use crate::availability::types::BookedRange;
use crate::booking::error::BookingError;
use crate::booking::service::BookingStateMachine;
use crate::booking::types::{Booking, BookingState, BookingTransition, DetailBooking};
use crate::settlement::ledger::SettlementLedger;
use crate::settlement::types::{FinancialAccount, LedgerTransaction, Posting};
use crate::store::{CancelRequest, NewBooking, RescheduledStay, StoreError};
use crate::voucher::error::VoucherError;
use crate::voucher::issuer::VoucherIssuer;
use crate::voucher::types::{NewVoucher, Voucher, VoucherState};

/// What a payment unit must write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentPlan {
    /// Append the payment, update the balance and voucher, confirm the booking.
    Post {
        /// The ledger posting.
        posting: Posting,
        /// The booking confirmation.
        transition: BookingTransition,
    },
    /// The voucher is already PAID and the booking CONFIRMED.
    AlreadySettled,
}

/// What a cancellation unit must write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancellationPlan {
    /// The booking cancellation.
    pub transition: BookingTransition,
    /// New voucher state, if a voucher exists.
    pub voucher_state: Option<VoucherState>,
    /// The compensating refund, if the voucher was PAID.
    pub refund: Option<Posting>,
}

/// Fails with `StaleVersion` unless the booking is at `expected`.
pub fn check_version(booking: &Booking, expected: i64) -> Result<(), StoreError> {
    if booking.version == expected {
        Ok(())
    } else {
        Err(StoreError::StaleVersion(booking.id))
    }
}

/// Checks a reservation against the accommodation's recorded stays.
pub fn plan_reservation<'a, I>(booking: &NewBooking, existing: I) -> Result<(), StoreError>
where
    I: IntoIterator<Item = &'a BookedRange>,
{
    if !booking.pricing.is_consistent() {
        return Err(StoreError::Inconsistent(format!(
            "quote for accommodation {} does not reconcile",
            booking.accommodation_id
        )));
    }
    AvailabilityGuard::check(&booking.stay, existing, None)?;
    Ok(())
}

/// Materializes a reserved booking with store-assigned ids.
#[must_use]
pub fn materialize_booking(booking: NewBooking, id: BookingId, detail_id: DetailBookingId) -> Booking {
    Booking {
        id,
        creation_date: booking.creation_date,
        update_time: booking.creation_date,
        state: BookingStateMachine::initial_state(),
        total_price: booking.pricing.total,
        payment_status: false,
        guest_id: booking.guest_id,
        accommodation_id: booking.accommodation_id,
        detail: DetailBooking {
            id: detail_id,
            stay: booking.stay,
            number_of_guest: booking.number_of_guest,
            service_fee: booking.service_fee,
            pricing: booking.pricing,
            selected_services: booking.selected_services,
        },
        voucher_id: None,
        payment_method_id: booking.payment_method_id,
        cancellation_reason: None,
        version: 1,
    }
}

/// Returns the booking with new dates and amounts.
pub fn plan_reschedule<'a, I>(
    booking: &Booking,
    expected_version: i64,
    change: &RescheduledStay,
    existing: I,
) -> Result<Booking, StoreError>
where
    I: IntoIterator<Item = &'a BookedRange>,
{
    check_version(booking, expected_version)?;
    if booking.state != BookingState::Pending || booking.voucher_id.is_some() {
        return Err(BookingError::NotReschedulable { state: booking.state }.into());
    }
    AvailabilityGuard::check(&change.stay, existing, Some(booking.id))?;

    let mut updated = booking.clone();
    updated.detail.stay = change.stay;
    updated.detail.pricing = change.pricing;
    updated.total_price = change.pricing.total;
    updated.update_time = change.updated_at;
    updated.version += 1;
    Ok(updated)
}

/// Returns the booking linked to a voucher about to be stored.
pub fn plan_voucher_link(
    booking: &Booking,
    expected_version: i64,
    voucher: &NewVoucher,
    voucher_id: VoucherId,
) -> Result<Booking, StoreError> {
    check_version(booking, expected_version)?;
    if let Some(existing) = booking.voucher_id {
        return Err(VoucherError::AlreadyIssued {
            booking_id: booking.id,
            voucher_id: existing,
        }
        .into());
    }
    if booking.state != BookingState::Pending {
        return Err(VoucherError::BookingNotPending {
            booking_id: booking.id,
            state: booking.state,
        }
        .into());
    }
    if voucher.booking_id != booking.id || voucher.total != booking.total_price {
        return Err(VoucherError::TotalMismatch {
            voucher_id: None,
            voucher_total: voucher.total,
            booking_total: booking.total_price,
        }
        .into());
    }

    let mut updated = booking.clone();
    updated.voucher_id = Some(voucher_id);
    updated.update_time = voucher.creation_date;
    updated.version += 1;
    Ok(updated)
}

/// The account a booking settles against.
pub fn payment_account(booking: &Booking) -> Result<FinancialAccountId, StoreError> {
    booking
        .payment_method_id
        .ok_or_else(|| BookingError::PaymentMethodRequired.into())
}

/// Plans the payment of a booking's voucher.
///
/// # Errors
/// * `StaleVersion` if the booking moved since the caller read it
/// * `Inconsistent` if the voucher does not belong to the booking, or a PAID
///   voucher backs a booking that was never confirmed
/// * any ledger or transition error, with nothing to write
pub fn plan_payment(
    booking: &Booking,
    expected_version: i64,
    voucher: &Voucher,
    account: &FinancialAccount,
    now: DateTime<Utc>,
) -> Result<PaymentPlan, StoreError> {
    check_version(booking, expected_version)?;
    check_link(booking, voucher)?;
    VoucherIssuer::verify_total(voucher, booking)?;

    match (booking.state, voucher.state) {
        (BookingState::Confirmed, VoucherState::Paid) => return Ok(PaymentPlan::AlreadySettled),
        (BookingState::Pending, VoucherState::Paid) => {
            return Err(StoreError::Inconsistent(format!(
                "voucher {} is PAID but booking {} is PENDING",
                voucher.id, booking.id
            )));
        }
        (BookingState::Pending, _) => {}
        (state, _) => {
            return Err(BookingError::InvalidTransition {
                from: state,
                to: BookingState::Confirmed,
            }
            .into());
        }
    }

    let posting = SettlementLedger::settle(voucher, account, now)?;
    let transition = BookingStateMachine::confirm_payment(booking.state, Some(posting.voucher_state), now)?;
    Ok(PaymentPlan::Post { posting, transition })
}

/// Plans a cancellation.
///
/// A PAID voucher is refunded against its outstanding payment, a PENDING
/// voucher is voided. `transactions` are the voucher's postings and
/// `account` the account of its outstanding payment, when there is one.
pub fn plan_cancellation(
    booking: &Booking,
    expected_version: i64,
    voucher: Option<&Voucher>,
    transactions: &[LedgerTransaction],
    account: Option<&FinancialAccount>,
    request: &CancelRequest,
) -> Result<CancellationPlan, StoreError> {
    check_version(booking, expected_version)?;

    let (voucher_state, refund) = match voucher {
        None => (None, None),
        Some(voucher) => {
            check_link(booking, voucher)?;
            match voucher.state {
                VoucherState::Pending => (Some(VoucherIssuer::mark_cancelled(voucher)?), None),
                VoucherState::Paid => {
                    let payment = SettlementLedger::outstanding_payment(transactions).ok_or_else(|| {
                        StoreError::Inconsistent(format!("voucher {} is PAID without a payment", voucher.id))
                    })?;
                    let account = account.ok_or_else(|| {
                        StoreError::Inconsistent(format!(
                            "account {} of payment {} is missing",
                            payment.account_id, payment.id
                        ))
                    })?;
                    let refund = SettlementLedger::reverse(payment, voucher, account, request.now)?;
                    (Some(refund.voucher_state), Some(refund))
                }
                VoucherState::Refunded | VoucherState::Cancelled => {
                    if booking.state.is_cancellable() {
                        return Err(StoreError::Inconsistent(format!(
                            "voucher {} is {} but booking {} is {}",
                            voucher.id, voucher.state, booking.id, booking.state
                        )));
                    }
                    (Some(voucher.state), None)
                }
            }
        }
    };

    let transition = BookingStateMachine::cancel(
        booking.state,
        voucher.map(|v| v.state),
        refund.is_some(),
        request.cancelled_by,
        request.reason.clone(),
        request.now,
    )?;

    Ok(CancellationPlan {
        transition,
        voucher_state,
        refund,
    })
}

/// Returns the booking after a check-in or check-out.
pub fn plan_transition(
    booking: &Booking,
    expected_version: i64,
    transition: &BookingTransition,
) -> Result<Booking, StoreError> {
    check_version(booking, expected_version)?;
    let allowed = matches!(
        transition,
        BookingTransition::CheckIn { .. } | BookingTransition::CheckOut { .. }
    ) && BookingStateMachine::is_valid_transition(booking.state, transition.new_state());
    if !allowed {
        return Err(BookingError::InvalidTransition {
            from: booking.state,
            to: transition.new_state(),
        }
        .into());
    }

    let mut updated = booking.clone();
    transition.apply(&mut updated);
    Ok(updated)
}

fn check_link(booking: &Booking, voucher: &Voucher) -> Result<(), StoreError> {
    if booking.voucher_id == Some(voucher.id) && voucher.booking_id == Some(booking.id) {
        Ok(())
    } else {
        Err(StoreError::Inconsistent(format!(
            "voucher {} is not linked to booking {}",
            voucher.id, booking.id
        )))
    }
}
