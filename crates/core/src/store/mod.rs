//! Persistence contract for the booking engine.
//!
//! Every mutating method of [`BookingStore`] is one atomic unit: it reads the
//! rows it needs, runs the pure planners of this crate on them, and writes
//! the outcome, or nothing. Reservation is serialised per accommodation and
//! settlement per financial account. Booking writes are guarded by an
//! optimistic version check.
//!
//! - `plan` - Pure planning shared by all store implementations
//! - `memory` - In-process store used by tests and embedded callers

pub mod memory;
pub mod plan;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use staybook_shared::types::{
    AccommodationId, BookingId, FinancialAccountId, ServiceFeeId, UserId, VoucherId,
};
use thiserror::Error;

use crate::availability::error::AvailabilityError;
use crate::availability::types::StayRange;
use crate::booking::error::BookingError;
use crate::booking::types::{Booking, BookingTransition};
use crate::pricing::types::{FeeType, PriceBreakdown, ServiceFee, ServiceFeeSnapshot};
use crate::settlement::error::SettlementError;
use crate::settlement::types::{FinancialAccount, LedgerTransaction, NewFinancialAccount};
use crate::voucher::error::VoucherError;
use crate::voucher::types::{NewVoucher, Voucher};

pub use memory::MemoryStore;

/// A booking to insert in PENDING state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    /// Creation timestamp.
    pub creation_date: DateTime<Utc>,
    /// The guest.
    pub guest_id: UserId,
    /// The accommodation.
    pub accommodation_id: AccommodationId,
    /// The stay.
    pub stay: StayRange,
    /// Number of guests.
    pub number_of_guest: u32,
    /// Fee terms frozen at quote time.
    pub service_fee: ServiceFeeSnapshot,
    /// The quote.
    pub pricing: PriceBreakdown,
    /// Extra services selected by the guest.
    pub selected_services: Vec<i64>,
    /// Account the guest will pay from.
    pub payment_method_id: Option<FinancialAccountId>,
}

/// New dates and quote for a pending booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RescheduledStay {
    /// The new stay.
    pub stay: StayRange,
    /// The new quote.
    pub pricing: PriceBreakdown,
    /// When the change was made.
    pub updated_at: DateTime<Utc>,
}

/// A cancellation to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelRequest {
    /// Who cancels.
    pub cancelled_by: UserId,
    /// Optional reason.
    pub reason: Option<String>,
    /// When.
    pub now: DateTime<Utc>,
}

/// A fee schedule to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewServiceFee {
    /// Fee rate (percent) or flat amount.
    pub value: Decimal,
    /// Fee category.
    pub fee_type: FeeType,
    /// Minimum average guest rating.
    pub prom_calification_minimum: Decimal,
    /// Minimum completed stays.
    pub number_bookings_minimum: u32,
}

/// Outcome of settling a booking's voucher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentReceipt {
    /// A payment was posted and the booking confirmed.
    Settled {
        /// The confirmed booking.
        booking: Booking,
        /// The PAID voucher.
        voucher: Voucher,
        /// The posted payment.
        transaction: LedgerTransaction,
    },
    /// The voucher was already PAID; nothing was written.
    AlreadySettled {
        /// The booking as stored.
        booking: Booking,
        /// The voucher as stored.
        voucher: Voucher,
    },
}

impl PaymentReceipt {
    /// The booking after the call.
    #[must_use]
    pub fn booking(&self) -> &Booking {
        match self {
            Self::Settled { booking, .. } | Self::AlreadySettled { booking, .. } => booking,
        }
    }
}

/// Outcome of a cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancellationReceipt {
    /// The cancelled booking.
    pub booking: Booking,
    /// The voucher after cancellation, if one was issued.
    pub voucher: Option<Voucher>,
    /// The compensating refund, if the voucher was PAID.
    pub refund: Option<LedgerTransaction>,
}

/// Kinds of stored entities, for not-found reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// Booking.
    Booking,
    /// Voucher.
    Voucher,
    /// Financial account.
    FinancialAccount,
    /// Service fee schedule.
    ServiceFee,
    /// Accommodation.
    Accommodation,
}

impl EntityKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Booking => "booking",
            Self::Voucher => "voucher",
            Self::FinancialAccount => "financial account",
            Self::ServiceFee => "service fee",
            Self::Accommodation => "accommodation",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The calendar check failed.
    #[error(transparent)]
    Availability(#[from] AvailabilityError),

    /// The booking transition failed.
    #[error(transparent)]
    Booking(#[from] BookingError),

    /// The voucher transition failed.
    #[error(transparent)]
    Voucher(#[from] VoucherError),

    /// The ledger posting failed.
    #[error(transparent)]
    Settlement(#[from] SettlementError),

    /// A referenced row does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// The entity kind.
        entity: EntityKind,
        /// The missing id.
        id: i64,
    },

    /// The booking changed since it was read.
    #[error("Booking {0} was modified concurrently")]
    StaleVersion(BookingId),

    /// Stored rows violate a cross-entity invariant.
    #[error("Inconsistent state: {0}")]
    Inconsistent(String),

    /// A stored value could not be decoded.
    #[error("Corrupt stored value: {0}")]
    Corrupt(String),

    /// The backend failed.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Shorthand for a missing row.
    #[must_use]
    pub fn not_found(entity: EntityKind, id: impl Into<i64>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Persistence for bookings, vouchers and the ledger.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Checks the calendar and inserts a PENDING booking, atomically per
    /// accommodation.
    ///
    /// # Errors
    /// * `Availability(Overlap)` if a non-cancelled booking holds any night
    async fn reserve(&self, booking: NewBooking) -> Result<Booking, StoreError>;

    /// Moves a PENDING booking without voucher to new dates and amounts.
    async fn reschedule(
        &self,
        id: BookingId,
        expected_version: i64,
        change: RescheduledStay,
    ) -> Result<Booking, StoreError>;

    /// Stores a freshly issued voucher and links it to its booking.
    async fn attach_voucher(
        &self,
        id: BookingId,
        expected_version: i64,
        voucher: NewVoucher,
    ) -> Result<(Booking, Voucher), StoreError>;

    /// Posts the payment of the booking's voucher and confirms the booking,
    /// atomically per financial account.
    async fn settle_payment(
        &self,
        id: BookingId,
        expected_version: i64,
        now: DateTime<Utc>,
    ) -> Result<PaymentReceipt, StoreError>;

    /// Cancels a booking, refunding or voiding its voucher in the same unit.
    async fn cancel(
        &self,
        id: BookingId,
        expected_version: i64,
        request: CancelRequest,
    ) -> Result<CancellationReceipt, StoreError>;

    /// Applies a check-in or check-out transition.
    async fn transition(
        &self,
        id: BookingId,
        expected_version: i64,
        transition: BookingTransition,
    ) -> Result<Booking, StoreError>;

    /// Finds a booking by id.
    async fn find_booking(&self, id: BookingId) -> Result<Option<Booking>, StoreError>;

    /// Finds a voucher by id.
    async fn find_voucher(&self, id: VoucherId) -> Result<Option<Voucher>, StoreError>;

    /// Finds a financial account by id.
    async fn find_account(&self, id: FinancialAccountId) -> Result<Option<FinancialAccount>, StoreError>;

    /// Finds a fee schedule by id.
    async fn find_service_fee(&self, id: ServiceFeeId) -> Result<Option<ServiceFee>, StoreError>;

    /// Lists a voucher's postings, oldest first.
    async fn transactions_for_voucher(&self, id: VoucherId) -> Result<Vec<LedgerTransaction>, StoreError>;

    /// Counts the guest's CHECKED_OUT bookings.
    async fn count_completed_bookings(&self, guest_id: UserId) -> Result<u32, StoreError>;

    /// Creates a fee schedule.
    async fn create_service_fee(&self, fee: NewServiceFee) -> Result<ServiceFee, StoreError>;

    /// Creates a financial account.
    async fn create_account(&self, account: NewFinancialAccount) -> Result<FinancialAccount, StoreError>;
}

