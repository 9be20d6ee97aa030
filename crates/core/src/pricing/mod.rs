//! Stay pricing.
//!
//! This module computes the price breakdown of a stay:
//! - `types` - Service fee schedules, snapshots and quote types
//! - `policy` - Pluggable tax policies
//! - `engine` - Quote calculation and fee eligibility
//! - `error` - Pricing error types

pub mod engine;
pub mod error;
pub mod policy;
pub mod types;

#[cfg(test)]
mod engine_props;

pub use engine::PricingEngine;
pub use error::PricingError;
pub use policy::{FlatRateTax, NoTax, TaxPolicy};
pub use types::{FeeType, GuestStanding, PriceBreakdown, QuoteRequest, ServiceFee, ServiceFeeSnapshot};
