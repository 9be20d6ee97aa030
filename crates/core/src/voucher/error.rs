//! Voucher error types.

use staybook_shared::types::{BookingId, Money, VoucherId};
use thiserror::Error;

use crate::booking::types::BookingState;
use crate::voucher::types::VoucherState;

/// Errors raised while issuing or transitioning vouchers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoucherError {
    /// The booking already has a voucher.
    #[error("Booking {booking_id} already has voucher {voucher_id}")]
    AlreadyIssued {
        /// The booking.
        booking_id: BookingId,
        /// Its existing voucher.
        voucher_id: VoucherId,
    },

    /// Vouchers are only issued for pending bookings.
    #[error("Booking {booking_id} is {state}; vouchers are only issued for PENDING bookings")]
    BookingNotPending {
        /// The booking.
        booking_id: BookingId,
        /// Its state.
        state: BookingState,
    },

    /// The voucher has left PENDING and cannot be paid or cancelled.
    #[error("Voucher {id} is {state}, expected PENDING")]
    NotPending {
        /// The voucher.
        id: VoucherId,
        /// Its state.
        state: VoucherState,
    },

    /// Only a PAID voucher can be refunded.
    #[error("Voucher {id} is {state}, expected PAID")]
    NotPaid {
        /// The voucher.
        id: VoucherId,
        /// Its state.
        state: VoucherState,
    },

    /// Voucher amounts diverge from the booking they bill.
    #[error("Voucher total {voucher_total} diverges from booking total {booking_total}")]
    TotalMismatch {
        /// The voucher, if already stored.
        voucher_id: Option<VoucherId>,
        /// Amount on the voucher.
        voucher_total: Money,
        /// Amount on the booking.
        booking_total: Money,
    },
}

impl VoucherError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadyIssued { .. } => "VOUCHER_ALREADY_ISSUED",
            Self::BookingNotPending { .. } => "BOOKING_NOT_PENDING",
            Self::NotPending { .. } => "VOUCHER_NOT_PENDING",
            Self::NotPaid { .. } => "VOUCHER_NOT_PAID",
            Self::TotalMismatch { .. } => "VOUCHER_TOTAL_MISMATCH",
        }
    }

    /// Returns true if the error signals a broken internal invariant.
    #[must_use]
    pub fn is_consistency(&self) -> bool {
        matches!(self, Self::TotalMismatch { .. })
    }
}
