//! Availability error types.

use chrono::NaiveDate;
use staybook_shared::types::BookingId;
use thiserror::Error;

use crate::availability::types::StayRange;

/// Errors raised while validating or reserving a stay.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AvailabilityError {
    /// Check-in must be strictly before check-out.
    #[error("Check-in {check_in} must be before check-out {check_out}")]
    InvalidDateOrder {
        /// Requested check-in date.
        check_in: NaiveDate,
        /// Requested check-out date.
        check_out: NaiveDate,
    },

    /// A stay date lies before the current date.
    #[error("Date {date} is in the past (today is {today})")]
    DateInPast {
        /// The offending date.
        date: NaiveDate,
        /// The current date at call time.
        today: NaiveDate,
    },

    /// The requested stay collides with an existing non-cancelled booking.
    #[error("Requested stay {requested} overlaps booking {conflicting}")]
    Overlap {
        /// The requested stay.
        requested: StayRange,
        /// The booking already holding the range.
        conflicting: BookingId,
    },
}

impl AvailabilityError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidDateOrder { .. } => "INVALID_DATE_ORDER",
            Self::DateInPast { .. } => "DATE_IN_PAST",
            Self::Overlap { .. } => "OVERLAP",
        }
    }

    /// Returns true for malformed input (as opposed to a calendar conflict).
    #[must_use]
    pub fn is_validation(&self) -> bool {
        !matches!(self, Self::Overlap { .. })
    }
}
