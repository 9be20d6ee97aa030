//! Typed IDs for type-safe entity references.
//!
//! Every table is keyed by a surrogate integer. Wrapping the raw `i64`
//! prevents accidentally passing a `VoucherId` where a `BookingId` is expected.

use serde::{Deserialize, Serialize};

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Creates an ID from a raw surrogate key.
            #[must_use]
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Returns the raw surrogate key.
            #[must_use]
            pub const fn into_inner(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.trim().parse()?))
            }
        }
    };
}

typed_id!(UserId, "Unique identifier for a user (guest, host or admin).");
typed_id!(AccommodationId, "Unique identifier for an accommodation.");
typed_id!(BookingId, "Unique identifier for a booking.");
typed_id!(DetailBookingId, "Unique identifier for a booking's priced detail.");
typed_id!(ServiceFeeId, "Unique identifier for a service fee schedule.");
typed_id!(VoucherId, "Unique identifier for a voucher.");
typed_id!(DetailVoucherId, "Unique identifier for a voucher's line detail.");
typed_id!(TransactionId, "Unique identifier for a ledger transaction.");
typed_id!(
    FinancialAccountId,
    "Unique identifier for a financial (payment) account."
);
