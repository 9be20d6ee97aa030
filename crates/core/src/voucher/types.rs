//! Voucher domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use staybook_shared::types::{
    BookingId, DetailVoucherId, FinancialAccountId, Money, UserId, VoucherId,
};
use std::fmt;

use crate::settlement::types::LedgerTransaction;

/// Voucher payment state.
///
/// The valid transitions are:
/// - Pending → Paid (settlement)
/// - Pending → Cancelled (booking cancelled before payment)
/// - Paid → Refunded (booking cancelled after payment)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoucherState {
    /// Issued, awaiting payment. Amounts may not change in any other state.
    Pending,
    /// Settled against a financial account.
    Paid,
    /// Payment reversed (terminal).
    Refunded,
    /// Voided before payment (terminal).
    Cancelled,
}

impl VoucherState {
    /// Returns the string representation of the state.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Refunded => "REFUNDED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parses a state from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "PAID" => Some(Self::Paid),
            "REFUNDED" => Some(Self::Refunded),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Returns true if no further transition is possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Refunded | Self::Cancelled)
    }
}

impl fmt::Display for VoucherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Line detail of a voucher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailVoucher {
    /// Detail ID.
    pub id: DetailVoucherId,
    /// Nightly price.
    pub price_night: Money,
    /// Number of nights billed.
    pub number_nights: u32,
    /// `price_night × number_nights`.
    pub sub_total: Money,
    /// Free-text description.
    pub description: String,
}

/// The financial document backing a booking's payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voucher {
    /// Voucher ID.
    pub id: VoucherId,
    /// When the voucher was issued.
    pub creation_date: DateTime<Utc>,
    /// The paying guest.
    pub guest_id: UserId,
    /// The booking this voucher bills, if any.
    pub booking_id: Option<BookingId>,
    /// Stay subtotal.
    pub sub_total: Money,
    /// Discount granted.
    pub discount: Money,
    /// Service fee charged.
    pub fee: Money,
    /// Tax charged.
    pub tax: Money,
    /// `sub_total - discount + fee + tax`.
    pub total: Money,
    /// Payment state.
    pub state: VoucherState,
    /// Account the voucher is settled against.
    pub payment_method_id: Option<FinancialAccountId>,
    /// Line detail.
    pub detail: DetailVoucher,
}

impl Voucher {
    /// Returns true if the voucher's amounts reconcile with each other.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let reconciled = self
            .sub_total
            .checked_sub(self.discount)
            .and_then(|net| net.checked_add(self.fee))
            .and_then(|gross| gross.checked_add(self.tax));
        reconciled == Some(self.total)
            && self.detail.sub_total == self.sub_total
            && self.detail.price_night.checked_times(self.detail.number_nights) == Some(self.sub_total)
    }
}

/// Line detail of a voucher that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDetailVoucher {
    /// Nightly price.
    pub price_night: Money,
    /// Number of nights billed.
    pub number_nights: u32,
    /// `price_night × number_nights`.
    pub sub_total: Money,
    /// Free-text description.
    pub description: String,
}

/// A voucher that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVoucher {
    /// When the voucher was issued.
    pub creation_date: DateTime<Utc>,
    /// The paying guest.
    pub guest_id: UserId,
    /// The booking billed.
    pub booking_id: BookingId,
    /// Stay subtotal.
    pub sub_total: Money,
    /// Discount granted.
    pub discount: Money,
    /// Service fee charged.
    pub fee: Money,
    /// Tax charged.
    pub tax: Money,
    /// Amount owed.
    pub total: Money,
    /// Account the voucher will be settled against.
    pub payment_method_id: Option<FinancialAccountId>,
    /// Line detail.
    pub detail: NewDetailVoucher,
}

impl NewVoucher {
    /// Materializes the voucher with store-assigned ids, in PENDING state.
    #[must_use]
    pub fn into_voucher(self, id: VoucherId, detail_id: DetailVoucherId) -> Voucher {
        Voucher {
            id,
            creation_date: self.creation_date,
            guest_id: self.guest_id,
            booking_id: Some(self.booking_id),
            sub_total: self.sub_total,
            discount: self.discount,
            fee: self.fee,
            tax: self.tax,
            total: self.total,
            state: VoucherState::Pending,
            payment_method_id: self.payment_method_id,
            detail: DetailVoucher {
                id: detail_id,
                price_night: self.detail.price_night,
                number_nights: self.detail.number_nights,
                sub_total: self.detail.sub_total,
                description: self.detail.description,
            },
        }
    }
}

/// A voucher together with its ledger postings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoucherSnapshot {
    /// The voucher.
    pub voucher: Voucher,
    /// Postings against the voucher, oldest first.
    pub transactions: Vec<LedgerTransaction>,
}
