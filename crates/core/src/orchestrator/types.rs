//! Orchestrator request and response types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use staybook_shared::AppConfig;
use staybook_shared::types::{
    AccommodationId, BookingId, FinancialAccountId, Money, ServiceFeeId, UserId, VoucherId,
};
use std::time::Duration;

use crate::booking::types::{Booking, BookingState};

/// A guest's stay request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateBookingRequest {
    /// The accommodation.
    pub accommodation_id: AccommodationId,
    /// The guest.
    pub guest_id: UserId,
    /// First night.
    pub check_in: NaiveDate,
    /// Departure date, exclusive.
    pub check_out: NaiveDate,
    /// Number of guests.
    pub number_of_guest: u32,
    /// Explicit discount; the discount policy applies when absent.
    #[serde(default)]
    pub discount: Option<Money>,
    /// Fee schedule to apply.
    pub service_fee_id: ServiceFeeId,
    /// Account the guest will pay from.
    #[serde(default)]
    pub payment_method_id: Option<FinancialAccountId>,
    /// Extra services.
    #[serde(default)]
    pub selected_services: Vec<i64>,
}

/// Summary returned by every booking use case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BookingResult {
    /// The booking.
    pub booking_id: BookingId,
    /// Amount owed.
    pub total_price: Money,
    /// Lifecycle state.
    pub state: BookingState,
    /// True while a PAID voucher backs the booking.
    pub payment_status: bool,
    /// The voucher, once issued.
    pub voucher_id: Option<VoucherId>,
}

impl From<&Booking> for BookingResult {
    fn from(booking: &Booking) -> Self {
        Self {
            booking_id: booking.id,
            total_price: booking.total_price,
            state: booking.state,
            payment_status: booking.payment_status,
            voucher_id: booking.voucher_id,
        }
    }
}

/// Engine tuning taken from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Currency code printed on vouchers.
    pub currency: String,
    /// Flat tax rate.
    pub tax_rate: Decimal,
    /// Upper bound for collaborator calls, in milliseconds.
    pub collaborator_timeout_ms: u64,
    /// Role claim treated as administrator.
    pub admin_role: String,
}

impl EngineSettings {
    /// Upper bound for collaborator calls.
    #[must_use]
    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_millis(self.collaborator_timeout_ms)
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            tax_rate: Decimal::ZERO,
            collaborator_timeout_ms: 2000,
            admin_role: "admin".to_string(),
        }
    }
}

impl From<&AppConfig> for EngineSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            currency: config.pricing.currency.clone(),
            tax_rate: config.pricing.tax_rate,
            collaborator_timeout_ms: config.booking.collaborator_timeout_ms,
            admin_role: config.booking.admin_role.clone(),
        }
    }
}
