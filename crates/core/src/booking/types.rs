//! Booking domain types.
//!
//! A `Booking` owns its `DetailBooking` by composition; the voucher and the
//! payment account are referenced by id only.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use staybook_shared::types::{
    AccommodationId, BookingId, DetailBookingId, FinancialAccountId, Money, UserId, VoucherId,
};
use std::fmt;

use crate::availability::types::{BookedRange, StayRange};
use crate::pricing::types::{PriceBreakdown, ServiceFeeSnapshot};

/// Booking state in the reservation lifecycle.
///
/// The valid transitions are:
/// - Pending → Confirmed (confirm payment)
/// - Confirmed → CheckedIn (check in)
/// - CheckedIn → CheckedOut (check out)
/// - Pending | Confirmed → Cancelled (cancel)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingState {
    /// Reserved, awaiting payment.
    Pending,
    /// Paid.
    Confirmed,
    /// Guest has arrived.
    CheckedIn,
    /// Guest has left (terminal).
    CheckedOut,
    /// Cancelled (terminal).
    Cancelled,
}

impl BookingState {
    /// Returns the string representation of the state.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::CheckedIn => "CHECKED_IN",
            Self::CheckedOut => "CHECKED_OUT",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parses a state from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "CONFIRMED" => Some(Self::Confirmed),
            "CHECKED_IN" => Some(Self::CheckedIn),
            "CHECKED_OUT" => Some(Self::CheckedOut),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Returns true if no further transition is possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::CheckedOut | Self::Cancelled)
    }

    /// Returns true if the booking can still be cancelled.
    #[must_use]
    pub fn is_cancellable(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    /// Returns true if a booking in this state blocks its dates.
    #[must_use]
    pub fn holds_calendar(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

impl fmt::Display for BookingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Priced breakdown and stay parameters of a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailBooking {
    /// Detail ID.
    pub id: DetailBookingId,
    /// The stay.
    pub stay: StayRange,
    /// Number of guests.
    pub number_of_guest: u32,
    /// Fee terms frozen at quote time.
    pub service_fee: ServiceFeeSnapshot,
    /// Latest quote for the stay.
    pub pricing: PriceBreakdown,
    /// Extra services selected by the guest.
    pub selected_services: Vec<i64>,
}

impl DetailBooking {
    /// Nightly price of the accommodation at quote time.
    #[must_use]
    pub fn price_night_accommodation(&self) -> Money {
        self.pricing.price_per_night
    }

    /// Check-in date.
    #[must_use]
    pub fn check_in_date(&self) -> NaiveDate {
        self.stay.check_in
    }

    /// Check-out date.
    #[must_use]
    pub fn check_out_date(&self) -> NaiveDate {
        self.stay.check_out
    }
}

/// A reserved stay at an accommodation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Booking ID.
    pub id: BookingId,
    /// When the booking was created.
    pub creation_date: DateTime<Utc>,
    /// When the booking last changed.
    pub update_time: DateTime<Utc>,
    /// Lifecycle state.
    pub state: BookingState,
    /// Total owed; equals the latest quote's total.
    pub total_price: Money,
    /// True only while a PAID voucher backs the booking.
    pub payment_status: bool,
    /// The guest.
    pub guest_id: UserId,
    /// The accommodation.
    pub accommodation_id: AccommodationId,
    /// Stay parameters and pricing.
    pub detail: DetailBooking,
    /// Voucher, once issued.
    pub voucher_id: Option<VoucherId>,
    /// Financial account used for payment.
    pub payment_method_id: Option<FinancialAccountId>,
    /// Reason recorded on cancellation.
    pub cancellation_reason: Option<String>,
    /// Optimistic concurrency version, bumped on every write.
    pub version: i64,
}

impl Booking {
    /// The booking's claim on the accommodation calendar.
    #[must_use]
    pub fn booked_range(&self) -> BookedRange {
        BookedRange {
            booking_id: self.id,
            stay: self.detail.stay,
            state: self.state,
        }
    }
}

/// A validated booking state transition with its audit data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingTransition {
    /// Payment settled.
    ConfirmPayment {
        /// The new state (Confirmed).
        new_state: BookingState,
        /// When the payment was confirmed.
        confirmed_at: DateTime<Utc>,
    },
    /// Guest arrived.
    CheckIn {
        /// The new state (CheckedIn).
        new_state: BookingState,
        /// When the guest checked in.
        checked_in_at: DateTime<Utc>,
    },
    /// Guest left.
    CheckOut {
        /// The new state (CheckedOut).
        new_state: BookingState,
        /// When the guest checked out.
        checked_out_at: DateTime<Utc>,
    },
    /// Booking cancelled.
    Cancel {
        /// The new state (Cancelled).
        new_state: BookingState,
        /// Who cancelled.
        cancelled_by: UserId,
        /// When the booking was cancelled.
        cancelled_at: DateTime<Utc>,
        /// Optional reason.
        reason: Option<String>,
        /// True if a refund was posted as part of the cancellation.
        refunded: bool,
    },
}

impl BookingTransition {
    /// Returns the new state resulting from this transition.
    #[must_use]
    pub fn new_state(&self) -> BookingState {
        match self {
            Self::ConfirmPayment { new_state, .. }
            | Self::CheckIn { new_state, .. }
            | Self::CheckOut { new_state, .. }
            | Self::Cancel { new_state, .. } => *new_state,
        }
    }

    /// Returns when the transition happened.
    #[must_use]
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::ConfirmPayment { confirmed_at: at, .. }
            | Self::CheckIn { checked_in_at: at, .. }
            | Self::CheckOut { checked_out_at: at, .. }
            | Self::Cancel { cancelled_at: at, .. } => *at,
        }
    }

    /// Applies the transition to a booking and bumps its version.
    pub fn apply(&self, booking: &mut Booking) {
        booking.state = self.new_state();
        booking.update_time = self.occurred_at();
        booking.version += 1;
        match self {
            Self::ConfirmPayment { .. } => booking.payment_status = true,
            Self::Cancel {
                reason, refunded, ..
            } => {
                booking.cancellation_reason.clone_from(reason);
                if *refunded {
                    booking.payment_status = false;
                }
            }
            Self::CheckIn { .. } | Self::CheckOut { .. } => {}
        }
    }
}
