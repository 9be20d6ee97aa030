//! Booking state machine.
//!
//! Every method validates one transition and returns the resulting
//! `BookingTransition` without touching storage. Illegal transitions fail
//! with `InvalidTransition` and have no side effect.

use chrono::{DateTime, NaiveDate, Utc};
use staybook_shared::types::UserId;

use crate::booking::error::BookingError;
use crate::booking::types::{BookingState, BookingTransition};
use crate::voucher::types::VoucherState;

/// Stateless service for booking lifecycle transitions.
pub struct BookingStateMachine;

impl BookingStateMachine {
    /// State of every newly created booking.
    #[must_use]
    pub const fn initial_state() -> BookingState {
        BookingState::Pending
    }

    /// Confirm a pending booking once its voucher is paid.
    ///
    /// # Returns
    /// * `Ok(BookingTransition::ConfirmPayment)` if the transition is valid
    /// * `Err(BookingError::InvalidTransition)` if not in Pending state
    /// * `Err(BookingError::VoucherNotPaid)` if the voucher is missing or unpaid
    pub fn confirm_payment(
        current: BookingState,
        voucher_state: Option<VoucherState>,
        now: DateTime<Utc>,
    ) -> Result<BookingTransition, BookingError> {
        if current != BookingState::Pending {
            return Err(BookingError::InvalidTransition {
                from: current,
                to: BookingState::Confirmed,
            });
        }
        if voucher_state != Some(VoucherState::Paid) {
            return Err(BookingError::VoucherNotPaid(voucher_state));
        }
        Ok(BookingTransition::ConfirmPayment {
            new_state: BookingState::Confirmed,
            confirmed_at: now,
        })
    }

    /// Check a confirmed guest in, on or after the check-in date.
    pub fn check_in(
        current: BookingState,
        check_in_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<BookingTransition, BookingError> {
        if current != BookingState::Confirmed {
            return Err(BookingError::InvalidTransition {
                from: current,
                to: BookingState::CheckedIn,
            });
        }
        Self::require_reached("check in", check_in_date, now)?;
        Ok(BookingTransition::CheckIn {
            new_state: BookingState::CheckedIn,
            checked_in_at: now,
        })
    }

    /// Check a guest out, on or after the check-out date.
    pub fn check_out(
        current: BookingState,
        check_out_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<BookingTransition, BookingError> {
        if current != BookingState::CheckedIn {
            return Err(BookingError::InvalidTransition {
                from: current,
                to: BookingState::CheckedOut,
            });
        }
        Self::require_reached("check out", check_out_date, now)?;
        Ok(BookingTransition::CheckOut {
            new_state: BookingState::CheckedOut,
            checked_out_at: now,
        })
    }

    /// Cancel a pending or confirmed booking.
    ///
    /// If the voucher is PAID the caller must have posted the compensating
    /// refund in the same unit of work (`refund_posted`), otherwise the
    /// cancellation fails with `RefundRequired`.
    pub fn cancel(
        current: BookingState,
        voucher_state: Option<VoucherState>,
        refund_posted: bool,
        cancelled_by: UserId,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<BookingTransition, BookingError> {
        if !current.is_cancellable() {
            return Err(BookingError::InvalidTransition {
                from: current,
                to: BookingState::Cancelled,
            });
        }
        let paid = voucher_state == Some(VoucherState::Paid);
        if paid && !refund_posted {
            return Err(BookingError::RefundRequired);
        }
        Ok(BookingTransition::Cancel {
            new_state: BookingState::Cancelled,
            cancelled_by,
            cancelled_at: now,
            reason: reason.filter(|r| !r.trim().is_empty()),
            refunded: paid,
        })
    }

    /// Check if a state transition is valid.
    #[must_use]
    pub fn is_valid_transition(from: BookingState, to: BookingState) -> bool {
        matches!(
            (from, to),
            (
                BookingState::Pending,
                BookingState::Confirmed | BookingState::Cancelled
            ) | (
                BookingState::Confirmed,
                BookingState::CheckedIn | BookingState::Cancelled
            ) | (BookingState::CheckedIn, BookingState::CheckedOut)
        )
    }

    fn require_reached(
        action: &'static str,
        allowed_from: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<(), BookingError> {
        let today = now.date_naive();
        if today < allowed_from {
            return Err(BookingError::TooEarly {
                action,
                allowed_from,
                today,
            });
        }
        Ok(())
    }
}
