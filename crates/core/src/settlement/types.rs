//! Settlement domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use staybook_shared::types::{FinancialAccountId, Money, TransactionId, UserId, VoucherId};
use std::fmt;

use crate::voucher::types::VoucherState;

/// A guest's or host's bank-account record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialAccount {
    /// Account ID.
    pub id: FinancialAccountId,
    /// The account holder.
    pub id_user: UserId,
    /// Bank name.
    pub bank_name: String,
    /// Bank account number.
    pub number_account: String,
    /// Funds available for settlement.
    pub available_balance: Money,
}

/// A financial account that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFinancialAccount {
    /// The account holder.
    pub id_user: UserId,
    /// Bank name.
    pub bank_name: String,
    /// Bank account number.
    pub number_account: String,
    /// Opening balance.
    pub available_balance: Money,
}

/// Direction of a ledger posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostingKind {
    /// Debit of the holder's account for a voucher.
    Payment,
    /// Compensating credit reversing a payment.
    Refund,
}

impl PostingKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payment => "PAYMENT",
            Self::Refund => "REFUND",
        }
    }

    /// Parses a kind from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PAYMENT" => Some(Self::Payment),
            "REFUND" => Some(Self::Refund),
            _ => None,
        }
    }
}

impl fmt::Display for PostingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An append-only ledger posting against a voucher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    /// Transaction ID.
    pub id: TransactionId,
    /// The voucher settled or refunded.
    pub voucher_id: VoucherId,
    /// The account holder.
    pub holder_id: UserId,
    /// The account moved.
    pub account_id: FinancialAccountId,
    /// Payment or refund.
    pub kind: PostingKind,
    /// Unsigned amount; the direction comes from `kind`.
    pub amount: Money,
    /// The payment this refund compensates.
    pub reverses: Option<TransactionId>,
    /// When the posting was recorded.
    pub created_at: DateTime<Utc>,
}

impl LedgerTransaction {
    /// Signed effect on the account balance.
    #[must_use]
    pub fn balance_effect(&self) -> Money {
        match self.kind {
            PostingKind::Payment => -self.amount,
            PostingKind::Refund => self.amount,
        }
    }
}

/// A posting that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    /// The voucher settled or refunded.
    pub voucher_id: VoucherId,
    /// The account holder.
    pub holder_id: UserId,
    /// The account moved.
    pub account_id: FinancialAccountId,
    /// Payment or refund.
    pub kind: PostingKind,
    /// Unsigned amount.
    pub amount: Money,
    /// The payment this refund compensates.
    pub reverses: Option<TransactionId>,
    /// When the posting was recorded.
    pub created_at: DateTime<Utc>,
}

impl NewTransaction {
    /// Materializes the posting with a store-assigned id.
    #[must_use]
    pub fn into_transaction(self, id: TransactionId) -> LedgerTransaction {
        LedgerTransaction {
            id,
            voucher_id: self.voucher_id,
            holder_id: self.holder_id,
            account_id: self.account_id,
            kind: self.kind,
            amount: self.amount,
            reverses: self.reverses,
            created_at: self.created_at,
        }
    }
}

/// Everything a store must write, atomically, to apply one posting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    /// The transaction to append.
    pub transaction: NewTransaction,
    /// Balance read before the posting.
    pub previous_balance: Money,
    /// Balance to write.
    pub new_balance: Money,
    /// State the voucher moves to.
    pub voucher_state: VoucherState,
}
