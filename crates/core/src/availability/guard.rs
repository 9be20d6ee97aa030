//! Overlap checks against an accommodation's existing bookings.

use chrono::NaiveDate;
use staybook_shared::types::BookingId;

use crate::availability::error::AvailabilityError;
use crate::availability::types::{BookedRange, StayRange};

/// Stateless guard for accommodation calendars.
///
/// `check` has no side effect; the caller is responsible for running it in
/// the same serialised unit as the insert or update that consumes the slot.
pub struct AvailabilityGuard;

impl AvailabilityGuard {
    /// Validates a requested stay against the current date.
    ///
    /// Both dates must be on or after `today`.
    pub fn validate_request(stay: &StayRange, today: NaiveDate) -> Result<(), AvailabilityError> {
        for date in [stay.check_in, stay.check_out] {
            if date < today {
                return Err(AvailabilityError::DateInPast { date, today });
            }
        }
        Ok(())
    }

    /// Returns the first non-cancelled booking that overlaps `requested`.
    ///
    /// `exclude` skips a booking's own range when its dates are being edited.
    pub fn find_conflict<'a, I>(
        requested: &StayRange,
        existing: I,
        exclude: Option<BookingId>,
    ) -> Option<&'a BookedRange>
    where
        I: IntoIterator<Item = &'a BookedRange>,
    {
        existing.into_iter().find(|booked| {
            Some(booked.booking_id) != exclude
                && booked.holds_calendar()
                && booked.stay.overlaps(requested)
        })
    }

    /// Fails with `Overlap` if any non-cancelled booking shares a night.
    pub fn check<'a, I>(
        requested: &StayRange,
        existing: I,
        exclude: Option<BookingId>,
    ) -> Result<(), AvailabilityError>
    where
        I: IntoIterator<Item = &'a BookedRange>,
    {
        match Self::find_conflict(requested, existing, exclude) {
            Some(booked) => Err(AvailabilityError::Overlap {
                requested: *requested,
                conflicting: booked.booking_id,
            }),
            None => Ok(()),
        }
    }
}
