//! Pricing domain types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use staybook_shared::types::{Money, ServiceFeeId};

use crate::availability::types::StayRange;

/// How a service fee's `value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FeeType {
    /// `value` is a flat amount added to every booking.
    Flat,
    /// `value` is a percentage of the stay's subtotal.
    Percentage,
}

impl FeeType {
    /// Returns the string representation of the fee type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flat => "FLAT",
            Self::Percentage => "PERCENTAGE",
        }
    }

    /// Parses a fee type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "FLAT" => Some(Self::Flat),
            "PERCENTAGE" => Some(Self::Percentage),
            _ => None,
        }
    }
}

impl std::fmt::Display for FeeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A platform commission schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceFee {
    /// Fee schedule ID.
    pub id: ServiceFeeId,
    /// Fee rate (percent) or flat amount, depending on `fee_type`.
    pub value: Decimal,
    /// Fee category.
    pub fee_type: FeeType,
    /// Minimum average guest rating for the schedule to apply.
    pub prom_calification_minimum: Decimal,
    /// Minimum number of completed stays for the schedule to apply.
    pub number_bookings_minimum: u32,
}

impl ServiceFee {
    /// Freezes the schedule's current terms for a booking.
    #[must_use]
    pub fn snapshot(&self) -> ServiceFeeSnapshot {
        ServiceFeeSnapshot {
            service_fee_id: self.id,
            fee_type: self.fee_type,
            value: self.value,
        }
    }
}

/// Fee terms copied into a booking at quote time.
///
/// Later edits to the schedule never alter a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceFeeSnapshot {
    /// The schedule the terms were copied from.
    pub service_fee_id: ServiceFeeId,
    /// Fee category at quote time.
    pub fee_type: FeeType,
    /// Fee value at quote time.
    pub value: Decimal,
}

/// A guest's standing, used for fee eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuestStanding {
    /// Average rating received by the guest.
    pub average_rating: Decimal,
    /// Number of stays the guest has checked out of.
    pub completed_bookings: u32,
}

/// Input for a quote.
#[derive(Debug, Clone, Copy)]
pub struct QuoteRequest {
    /// Nightly price of the accommodation.
    pub price_per_night: Money,
    /// The stay being priced.
    pub stay: StayRange,
    /// Discount supplied by the caller or the discount policy.
    pub discount: Money,
    /// Fee terms selected for the booking.
    pub service_fee: ServiceFeeSnapshot,
}

/// The priced breakdown of a stay, rounded to the minor unit.
///
/// `total = sub_total - discount + fee + tax` holds exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    /// Number of nights priced.
    pub nights: u32,
    /// Nightly price used.
    pub price_per_night: Money,
    /// `price_per_night × nights`.
    pub sub_total: Money,
    /// Discount applied, within `[0, sub_total]`.
    pub discount: Money,
    /// Service fee amount.
    pub fee: Money,
    /// Tax amount.
    pub tax: Money,
    /// Amount owed by the guest.
    pub total: Money,
}

impl PriceBreakdown {
    /// Returns true if the total reconciles with its components.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let reconciled = self
            .sub_total
            .checked_sub(self.discount)
            .and_then(|net| net.checked_add(self.fee))
            .and_then(|gross| gross.checked_add(self.tax));
        reconciled == Some(self.total) && self.price_per_night.checked_times(self.nights) == Some(self.sub_total)
    }
}
