//! Booking error types for lifecycle management.

use chrono::NaiveDate;
use thiserror::Error;

use crate::booking::types::BookingState;
use crate::voucher::types::VoucherState;

/// Errors that can occur during booking state transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingError {
    /// Attempted an invalid state transition.
    #[error("Invalid booking transition from {from} to {to}")]
    InvalidTransition {
        /// The current state.
        from: BookingState,
        /// The attempted target state.
        to: BookingState,
    },

    /// Payment confirmation requires a PAID voucher.
    #[error("Booking payment requires a paid voucher (voucher state: {0:?})")]
    VoucherNotPaid(Option<VoucherState>),

    /// Check-in or check-out attempted before its date.
    #[error("Cannot {action} before {allowed_from} (today is {today})")]
    TooEarly {
        /// The attempted action.
        action: &'static str,
        /// First date the action is allowed.
        allowed_from: NaiveDate,
        /// The current date.
        today: NaiveDate,
    },

    /// A paid booking cannot be cancelled without a compensating refund.
    #[error("Cancelling a paid booking requires a refund")]
    RefundRequired,

    /// Dates can only change before a voucher is issued.
    #[error("Booking in state {state} with an issued voucher cannot be rescheduled")]
    NotReschedulable {
        /// The booking's state.
        state: BookingState,
    },

    /// The booking has no payment method to settle against.
    #[error("Booking has no payment method")]
    PaymentMethodRequired,
}

impl BookingError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::VoucherNotPaid(_) => "VOUCHER_NOT_PAID",
            Self::TooEarly { .. } => "TOO_EARLY",
            Self::RefundRequired => "REFUND_REQUIRED",
            Self::NotReschedulable { .. } => "NOT_RESCHEDULABLE",
            Self::PaymentMethodRequired => "PAYMENT_METHOD_REQUIRED",
        }
    }

    /// Returns true for malformed input (as opposed to a state conflict).
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::PaymentMethodRequired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_error() {
        let err = BookingError::InvalidTransition {
            from: BookingState::Pending,
            to: BookingState::CheckedIn,
        };
        assert_eq!(err.error_code(), "INVALID_TRANSITION");
        assert!(err.to_string().contains("PENDING"));
        assert!(err.to_string().contains("CHECKED_IN"));
    }

    #[test]
    fn test_refund_required_error() {
        let err = BookingError::RefundRequired;
        assert_eq!(err.error_code(), "REFUND_REQUIRED");
        assert!(!err.is_validation());
    }

    #[test]
    fn test_too_early_error() {
        let err = BookingError::TooEarly {
            action: "check in",
            allowed_from: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            today: NaiveDate::from_ymd_opt(2025, 2, 28).unwrap(),
        };
        assert_eq!(err.error_code(), "TOO_EARLY");
        assert!(err.to_string().contains("check in"));
    }
}
