//! Pricing error types.

use rust_decimal::Decimal;
use staybook_shared::types::{Money, ServiceFeeId};
use thiserror::Error;

/// Errors that can occur while quoting a stay.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    /// Nightly price must be positive.
    #[error("Nightly price must be positive, got {0}")]
    InvalidNightlyPrice(Money),

    /// Discount is negative or larger than the subtotal.
    #[error("Discount {discount} must be between 0 and the subtotal {sub_total}")]
    InvalidDiscount {
        /// The rejected discount.
        discount: Money,
        /// The stay's subtotal.
        sub_total: Money,
    },

    /// Service fee value cannot be negative.
    #[error("Service fee {id} has a negative value {value}")]
    InvalidServiceFee {
        /// The fee schedule.
        id: ServiceFeeId,
        /// Its value.
        value: Decimal,
    },

    /// A quote component does not fit in a decimal amount.
    #[error("Amount overflow while computing the {0}")]
    AmountOverflow(&'static str),

    /// The tax policy returned a negative tax.
    #[error("Tax policy returned a negative tax {0}")]
    NegativeTax(Money),

    /// The guest does not meet the fee schedule's thresholds.
    #[error(
        "Service fee {id} requires rating >= {rating_minimum} and >= {bookings_minimum} completed bookings"
    )]
    ServiceFeeNotEligible {
        /// The fee schedule.
        id: ServiceFeeId,
        /// Required minimum average rating.
        rating_minimum: Decimal,
        /// Required minimum completed bookings.
        bookings_minimum: u32,
    },
}

impl PricingError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidNightlyPrice(_) => "INVALID_NIGHTLY_PRICE",
            Self::InvalidDiscount { .. } => "INVALID_DISCOUNT",
            Self::InvalidServiceFee { .. } => "INVALID_SERVICE_FEE",
            Self::AmountOverflow(_) => "AMOUNT_OVERFLOW",
            Self::NegativeTax(_) => "NEGATIVE_TAX",
            Self::ServiceFeeNotEligible { .. } => "SERVICE_FEE_NOT_ELIGIBLE",
        }
    }
}
