//! Stay ranges and existing calendar claims.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use staybook_shared::types::BookingId;

use crate::availability::error::AvailabilityError;
use crate::booking::types::BookingState;

/// A half-open stay `[check_in, check_out)`.
///
/// The check-out day itself is free for the next guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StayRange {
    /// First night of the stay.
    pub check_in: NaiveDate,
    /// Departure day (not a night of the stay).
    pub check_out: NaiveDate,
}

impl StayRange {
    /// Creates a stay range, requiring `check_in < check_out`.
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self, AvailabilityError> {
        if check_in >= check_out {
            return Err(AvailabilityError::InvalidDateOrder {
                check_in,
                check_out,
            });
        }
        Ok(Self {
            check_in,
            check_out,
        })
    }

    /// Number of nights in the stay (always at least 1).
    #[must_use]
    pub fn nights(&self) -> u32 {
        let days = (self.check_out - self.check_in).num_days();
        u32::try_from(days).unwrap_or(u32::MAX)
    }

    /// Returns true if the two half-open ranges share at least one night.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.check_in < other.check_out && other.check_in < self.check_out
    }
}

impl std::fmt::Display for StayRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.check_in, self.check_out)
    }
}

/// A stay already recorded against an accommodation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookedRange {
    /// The booking holding the range.
    pub booking_id: BookingId,
    /// The booked stay.
    pub stay: StayRange,
    /// Current state of the holding booking.
    pub state: BookingState,
}

impl BookedRange {
    /// Returns true if this booking still blocks the calendar.
    #[must_use]
    pub fn holds_calendar(&self) -> bool {
        self.state.holds_calendar()
    }
}
