//! Voucher issuance.
//!
//! A voucher is created in PENDING from a pending booking's frozen quote and
//! then moves PENDING → PAID → REFUNDED, or PENDING → CANCELLED. Its amounts
//! never change after issue.

pub mod error;
pub mod issuer;
pub mod types;

pub use error::VoucherError;
pub use issuer::{MarkPaidOutcome, VoucherIssuer};
pub use types::{DetailVoucher, NewDetailVoucher, NewVoucher, Voucher, VoucherSnapshot, VoucherState};
