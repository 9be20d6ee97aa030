//! Property-based tests for the availability guard.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use staybook_shared::types::BookingId;

use crate::availability::guard::AvailabilityGuard;
use crate::availability::types::{BookedRange, StayRange};
use crate::booking::types::BookingState;

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

/// Strategy for generating stays within a two-year window.
fn arb_stay() -> impl Strategy<Value = StayRange> {
    (0i64..730, 1i64..=365).prop_map(|(offset, nights)| {
        let check_in = base() + Duration::days(offset);
        StayRange::new(check_in, check_in + Duration::days(nights)).unwrap()
    })
}

fn arb_state() -> impl Strategy<Value = BookingState> {
    prop_oneof![
        Just(BookingState::Pending),
        Just(BookingState::Confirmed),
        Just(BookingState::CheckedIn),
        Just(BookingState::CheckedOut),
        Just(BookingState::Cancelled),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Overlap is symmetric.
    #[test]
    fn prop_overlap_is_symmetric(a in arb_stay(), b in arb_stay()) {
        prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
    }

    /// Overlap agrees with a night-by-night comparison.
    #[test]
    fn prop_overlap_matches_shared_nights(a in arb_stay(), b in arb_stay()) {
        let shares_night = a.check_in.max(b.check_in) < a.check_out.min(b.check_out);
        prop_assert_eq!(a.overlaps(&b), shares_night);
    }

    /// Nights always at least one and equal to the day difference.
    #[test]
    fn prop_nights_positive(a in arb_stay()) {
        prop_assert!(a.nights() >= 1);
        prop_assert_eq!(i64::from(a.nights()), (a.check_out - a.check_in).num_days());
    }

    /// The guard rejects exactly the overlapping, non-cancelled claims.
    #[test]
    fn prop_guard_rejects_iff_live_overlap(
        requested in arb_stay(),
        existing in arb_stay(),
        state in arb_state()
    ) {
        let booked = [BookedRange { booking_id: BookingId::new(1), stay: existing, state }];
        let result = AvailabilityGuard::check(&requested, &booked, None);
        let should_conflict = state != BookingState::Cancelled && requested.overlaps(&existing);
        prop_assert_eq!(result.is_err(), should_conflict);
    }
}
