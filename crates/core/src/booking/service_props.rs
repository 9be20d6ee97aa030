//! Property-based tests for the booking state machine.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use staybook_shared::types::UserId;

use crate::booking::error::BookingError;
use crate::booking::service::BookingStateMachine;
use crate::booking::types::BookingState;
use crate::voucher::types::VoucherState;

fn arb_state() -> impl Strategy<Value = BookingState> {
    prop_oneof![
        Just(BookingState::Pending),
        Just(BookingState::Confirmed),
        Just(BookingState::CheckedIn),
        Just(BookingState::CheckedOut),
        Just(BookingState::Cancelled),
    ]
}

fn arb_voucher_state() -> impl Strategy<Value = Option<VoucherState>> {
    prop_oneof![
        Just(None),
        Just(Some(VoucherState::Pending)),
        Just(Some(VoucherState::Paid)),
        Just(Some(VoucherState::Refunded)),
        Just(Some(VoucherState::Cancelled)),
    ]
}

fn arb_now() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..730).prop_map(|days| Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap() + Duration::days(days))
}

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (0i64..730).prop_map(|days| NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + Duration::days(days))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every successful transition is a valid edge of the state graph.
    #[test]
    fn prop_successful_transitions_are_valid_edges(
        state in arb_state(),
        voucher in arb_voucher_state(),
        refund_posted in any::<bool>(),
        date in arb_date(),
        now in arb_now()
    ) {
        let attempts = [
            BookingStateMachine::confirm_payment(state, voucher, now),
            BookingStateMachine::check_in(state, date, now),
            BookingStateMachine::check_out(state, date, now),
            BookingStateMachine::cancel(state, voucher, refund_posted, UserId::new(1), None, now),
        ];
        for transition in attempts.into_iter().flatten() {
            prop_assert!(BookingStateMachine::is_valid_transition(state, transition.new_state()));
        }
    }

    /// Terminal states admit no transition at all.
    #[test]
    fn prop_terminal_states_are_final(
        voucher in arb_voucher_state(),
        date in arb_date(),
        now in arb_now()
    ) {
        for state in [BookingState::CheckedOut, BookingState::Cancelled] {
            prop_assert!(BookingStateMachine::confirm_payment(state, voucher, now).is_err());
            prop_assert!(BookingStateMachine::check_in(state, date, now).is_err());
            prop_assert!(BookingStateMachine::check_out(state, date, now).is_err());
            prop_assert!(BookingStateMachine::cancel(state, voucher, true, UserId::new(1), None, now).is_err());
        }
    }

    /// Check-in from anything but Confirmed is an InvalidTransition.
    #[test]
    fn prop_check_in_only_from_confirmed(state in arb_state(), date in arb_date(), now in arb_now()) {
        prop_assume!(state != BookingState::Confirmed);
        match BookingStateMachine::check_in(state, date, now) {
            Err(BookingError::InvalidTransition { from, to }) => {
                prop_assert_eq!(from, state);
                prop_assert_eq!(to, BookingState::CheckedIn);
            }
            other => prop_assert!(false, "Expected InvalidTransition, got {:?}", other),
        }
    }

    /// A paid booking never cancels without a refund.
    #[test]
    fn prop_paid_cancel_needs_refund(now in arb_now()) {
        for state in [BookingState::Pending, BookingState::Confirmed] {
            let result = BookingStateMachine::cancel(
                state, Some(VoucherState::Paid), false, UserId::new(1), None, now,
            );
            prop_assert_eq!(result, Err(BookingError::RefundRequired));
        }
    }
}
