//! Errors surfaced by the booking orchestrator.

use staybook_shared::AppError;
use staybook_shared::types::{AccommodationId, BookingId, UserId};
use thiserror::Error;
use tracing::{error, warn};

use crate::availability::error::AvailabilityError;
use crate::booking::error::BookingError;
use crate::orchestrator::collaborators::CollaboratorError;
use crate::pricing::error::PricingError;
use crate::settlement::error::SettlementError;
use crate::store::{EntityKind, StoreError};
use crate::voucher::error::VoucherError;

/// Error classes exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input, rejected before any mutation.
    Validation,
    /// The request conflicts with current state; nothing was changed.
    Conflict,
    /// A referenced entity does not exist.
    NotFound,
    /// The caller may not perform the operation.
    Forbidden,
    /// A dependency timed out, failed, or a concurrent update won. Retryable.
    Unavailable,
    /// An internal invariant is broken.
    Consistency,
}

/// Errors returned by the booking orchestrator.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Calendar validation or overlap.
    #[error(transparent)]
    Availability(#[from] AvailabilityError),

    /// Quote failure.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// Booking lifecycle failure.
    #[error(transparent)]
    Booking(#[from] BookingError),

    /// Voucher failure.
    #[error(transparent)]
    Voucher(#[from] VoucherError),

    /// Ledger failure.
    #[error(transparent)]
    Settlement(#[from] SettlementError),

    /// Guest count outside `1..=capacity`.
    #[error("{requested} guests requested, accommodation takes 1 to {capacity}")]
    InvalidGuestCount {
        /// Requested number of guests.
        requested: u32,
        /// Accommodation capacity.
        capacity: u32,
    },

    /// The accommodation is not taking bookings.
    #[error("Accommodation {0} is not operational")]
    AccommodationUnavailable(AccommodationId),

    /// The auth layer sent an unknown role claim.
    #[error("Unknown role claim '{0}'")]
    InvalidRole(String),

    /// A referenced entity does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// The entity kind.
        entity: EntityKind,
        /// The missing id.
        id: i64,
    },

    /// The caller is neither the booking's guest nor an administrator.
    #[error("User {actor} may not modify booking {booking_id}")]
    Forbidden {
        /// The caller.
        actor: UserId,
        /// The booking.
        booking_id: BookingId,
    },

    /// The booking changed between read and write.
    #[error("Booking {0} was modified concurrently, retry")]
    StaleVersion(BookingId),

    /// A collaborator did not answer in time.
    #[error("{collaborator} did not answer within {timeout_ms} ms")]
    CollaboratorTimeout {
        /// Which collaborator.
        collaborator: &'static str,
        /// The configured bound.
        timeout_ms: u64,
    },

    /// A collaborator failed.
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    /// Stored state violates an invariant.
    #[error("Consistency violation: {0}")]
    Consistency(String),

    /// The storage backend failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl EngineError {
    /// Classifies the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Availability(err) if err.is_validation() => ErrorKind::Validation,
            Self::Booking(err) if err.is_validation() => ErrorKind::Validation,
            Self::Availability(_) | Self::Booking(_) => ErrorKind::Conflict,

            Self::Pricing(PricingError::NegativeTax(_)) => ErrorKind::Consistency,
            Self::Pricing(_)
            | Self::InvalidGuestCount { .. }
            | Self::AccommodationUnavailable(_)
            | Self::InvalidRole(_)
            | Self::Settlement(SettlementError::AccountHolderMismatch { .. }) => ErrorKind::Validation,

            Self::Voucher(err) if err.is_consistency() => ErrorKind::Consistency,
            Self::Settlement(err) if err.is_consistency() => ErrorKind::Consistency,
            Self::Voucher(_) | Self::Settlement(_) => ErrorKind::Conflict,

            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Forbidden { .. } => ErrorKind::Forbidden,

            Self::StaleVersion(_)
            | Self::CollaboratorTimeout { .. }
            | Self::Collaborator(_)
            | Self::Storage(_) => ErrorKind::Unavailable,

            Self::Consistency(_) => ErrorKind::Consistency,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Unavailable => 503,
            ErrorKind::Consistency => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Availability(err) => err.error_code(),
            Self::Pricing(err) => err.error_code(),
            Self::Booking(err) => err.error_code(),
            Self::Voucher(err) => err.error_code(),
            Self::Settlement(err) => err.error_code(),
            Self::InvalidGuestCount { .. } => "INVALID_GUEST_COUNT",
            Self::AccommodationUnavailable(_) => "ACCOMMODATION_UNAVAILABLE",
            Self::InvalidRole(_) => "INVALID_ROLE",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::StaleVersion(_) => "STALE_VERSION",
            Self::CollaboratorTimeout { .. } => "COLLABORATOR_TIMEOUT",
            Self::Collaborator(_) => "COLLABORATOR_FAILED",
            Self::Consistency(_) => "CONSISTENCY_VIOLATION",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Returns true if the caller may retry the same request.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Unavailable
    }

    /// Records the failure of `operation` at the level its kind calls for.
    pub(crate) fn log(&self, operation: &'static str) {
        match self.kind() {
            ErrorKind::Consistency => {
                error!(operation, code = self.error_code(), error = %self, "Invariant violated");
            }
            ErrorKind::Conflict | ErrorKind::Unavailable => {
                warn!(operation, code = self.error_code(), error = %self, "Booking operation rejected");
            }
            ErrorKind::Validation | ErrorKind::NotFound | ErrorKind::Forbidden => {}
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Availability(err) => Self::Availability(err),
            StoreError::Booking(err) => Self::Booking(err),
            StoreError::Voucher(err) => Self::Voucher(err),
            StoreError::Settlement(err) => Self::Settlement(err),
            StoreError::NotFound { entity, id } => Self::NotFound { entity, id },
            StoreError::StaleVersion(id) => Self::StaleVersion(id),
            StoreError::Inconsistent(msg) | StoreError::Corrupt(msg) => Self::Consistency(msg),
            StoreError::Backend(msg) => Self::Storage(msg),
        }
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::Validation => Self::Validation(message),
            ErrorKind::Conflict => Self::Conflict(message),
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::Forbidden => Self::Forbidden(message),
            ErrorKind::Unavailable => Self::Unavailable(message),
            ErrorKind::Consistency => Self::Internal(message),
        }
    }
}
