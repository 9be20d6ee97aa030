//! Settlement error types.

use staybook_shared::types::{FinancialAccountId, Money, TransactionId, UserId, VoucherId};
use thiserror::Error;

use crate::settlement::types::PostingKind;
use crate::voucher::error::VoucherError;

/// Errors raised while posting to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    /// The voucher cannot take this posting.
    #[error(transparent)]
    Voucher(#[from] VoucherError),

    /// The account does not belong to the voucher's guest.
    #[error("Account {account_id} belongs to user {holder}, not to guest {guest}")]
    AccountHolderMismatch {
        /// The account.
        account_id: FinancialAccountId,
        /// Its holder.
        holder: UserId,
        /// The voucher's guest.
        guest: UserId,
    },

    /// The debit would leave the account negative.
    #[error("Account {account_id} has {available} available, {required} required")]
    InsufficientFunds {
        /// The account.
        account_id: FinancialAccountId,
        /// Balance before the debit.
        available: Money,
        /// Amount to debit.
        required: Money,
    },

    /// Only payments can be reversed.
    #[error("Transaction {id} is a {kind} and cannot be reversed")]
    NotReversible {
        /// The transaction.
        id: TransactionId,
        /// Its kind.
        kind: PostingKind,
    },

    /// A transaction does not belong to the voucher or account it is posted against.
    #[error("Transaction {transaction_id} does not belong to voucher {voucher_id}")]
    PostingMismatch {
        /// The transaction.
        transaction_id: TransactionId,
        /// The voucher being refunded.
        voucher_id: VoucherId,
    },
}

impl SettlementError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Voucher(err) => err.error_code(),
            Self::AccountHolderMismatch { .. } => "ACCOUNT_HOLDER_MISMATCH",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::NotReversible { .. } => "NOT_REVERSIBLE",
            Self::PostingMismatch { .. } => "POSTING_MISMATCH",
        }
    }

    /// Returns true if the error signals a broken internal invariant.
    #[must_use]
    pub fn is_consistency(&self) -> bool {
        match self {
            Self::Voucher(err) => err.is_consistency(),
            Self::PostingMismatch { .. } => true,
            _ => false,
        }
    }
}
