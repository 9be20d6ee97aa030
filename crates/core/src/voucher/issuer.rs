//! Voucher issuance and payment-state transitions.
//!
//! Amounts are copied from the booking's frozen quote and never re-derived.

use chrono::{DateTime, Utc};

use crate::booking::types::{Booking, BookingState};
use crate::voucher::error::VoucherError;
use crate::voucher::types::{NewDetailVoucher, NewVoucher, Voucher, VoucherState};

/// Result of marking a voucher paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkPaidOutcome {
    /// The voucher moved PENDING → PAID.
    Transitioned(VoucherState),
    /// The voucher was already PAID; nothing to do.
    AlreadyPaid,
}

/// Stateless voucher issuer.
pub struct VoucherIssuer;

impl VoucherIssuer {
    /// Issues a voucher for a pending booking without one.
    ///
    /// # Errors
    /// * `BookingNotPending` if the booking has left PENDING
    /// * `AlreadyIssued` if the booking already references a voucher
    /// * `TotalMismatch` if the booking's quote does not reconcile
    pub fn issue(booking: &Booking, currency: &str, now: DateTime<Utc>) -> Result<NewVoucher, VoucherError> {
        if booking.state != BookingState::Pending {
            return Err(VoucherError::BookingNotPending {
                booking_id: booking.id,
                state: booking.state,
            });
        }
        if let Some(voucher_id) = booking.voucher_id {
            return Err(VoucherError::AlreadyIssued {
                booking_id: booking.id,
                voucher_id,
            });
        }

        let pricing = &booking.detail.pricing;
        if !pricing.is_consistent() || pricing.total != booking.total_price {
            return Err(VoucherError::TotalMismatch {
                voucher_id: None,
                voucher_total: pricing.total,
                booking_total: booking.total_price,
            });
        }

        let stay = booking.detail.stay;
        Ok(NewVoucher {
            creation_date: now,
            guest_id: booking.guest_id,
            booking_id: booking.id,
            sub_total: pricing.sub_total,
            discount: pricing.discount,
            fee: pricing.fee,
            tax: pricing.tax,
            total: pricing.total,
            payment_method_id: booking.payment_method_id,
            detail: NewDetailVoucher {
                price_night: pricing.price_per_night,
                number_nights: pricing.nights,
                sub_total: pricing.sub_total,
                description: format!(
                    "Accommodation {} {stay}: {} nights at {} {currency}",
                    booking.accommodation_id, pricing.nights, pricing.price_per_night
                ),
            },
        })
    }

    /// PENDING → PAID. Repeated calls on a PAID voucher succeed without effect.
    ///
    /// # Errors
    /// * `NotPending` if the voucher is REFUNDED or CANCELLED
    pub fn mark_paid(voucher: &Voucher) -> Result<MarkPaidOutcome, VoucherError> {
        match voucher.state {
            VoucherState::Pending => Ok(MarkPaidOutcome::Transitioned(VoucherState::Paid)),
            VoucherState::Paid => Ok(MarkPaidOutcome::AlreadyPaid),
            state => Err(VoucherError::NotPending { id: voucher.id, state }),
        }
    }

    /// PAID → REFUNDED.
    pub fn mark_refunded(voucher: &Voucher) -> Result<VoucherState, VoucherError> {
        if voucher.state != VoucherState::Paid {
            return Err(VoucherError::NotPaid {
                id: voucher.id,
                state: voucher.state,
            });
        }
        Ok(VoucherState::Refunded)
    }

    /// PENDING → CANCELLED.
    pub fn mark_cancelled(voucher: &Voucher) -> Result<VoucherState, VoucherError> {
        if voucher.state != VoucherState::Pending {
            return Err(VoucherError::NotPending {
                id: voucher.id,
                state: voucher.state,
            });
        }
        Ok(VoucherState::Cancelled)
    }

    /// Checks that a voucher reconciles with itself and with its booking.
    ///
    /// # Errors
    /// * `TotalMismatch` on any divergence
    pub fn verify_total(voucher: &Voucher, booking: &Booking) -> Result<(), VoucherError> {
        if voucher.is_consistent() && voucher.total == booking.total_price {
            Ok(())
        } else {
            Err(VoucherError::TotalMismatch {
                voucher_id: Some(voucher.id),
                voucher_total: voucher.total,
                booking_total: booking.total_price,
            })
        }
    }
}
