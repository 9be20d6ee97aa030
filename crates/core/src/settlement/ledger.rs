//! Settlement ledger.
//!
//! Plans postings against financial accounts. The ledger is pure: it reads
//! the voucher and account a store loaded inside its atomic unit and returns
//! the transaction, balance and voucher state the store must write together.
//! Postings are append-only; a refund is a new transaction pointing at the
//! payment it compensates.

use chrono::{DateTime, Utc};

use crate::settlement::error::SettlementError;
use crate::settlement::types::{FinancialAccount, LedgerTransaction, NewTransaction, Posting, PostingKind};
use crate::voucher::error::VoucherError;
use crate::voucher::issuer::{MarkPaidOutcome, VoucherIssuer};
use crate::voucher::types::Voucher;

/// Stateless settlement ledger.
pub struct SettlementLedger;

impl SettlementLedger {
    /// Plans the payment of a pending voucher from the guest's account.
    ///
    /// # Errors
    /// * `Voucher(NotPending)` if the voucher has left PENDING
    /// * `AccountHolderMismatch` if the account is not the guest's
    /// * `InsufficientFunds` if the debit would leave a negative balance
    pub fn settle(
        voucher: &Voucher,
        account: &FinancialAccount,
        now: DateTime<Utc>,
    ) -> Result<Posting, SettlementError> {
        let voucher_state = match VoucherIssuer::mark_paid(voucher)? {
            MarkPaidOutcome::Transitioned(state) => state,
            MarkPaidOutcome::AlreadyPaid => {
                return Err(VoucherError::NotPending {
                    id: voucher.id,
                    state: voucher.state,
                }
                .into());
            }
        };
        Self::check_holder(voucher, account)?;

        let new_balance = account.available_balance - voucher.total;
        if new_balance.is_negative() {
            return Err(SettlementError::InsufficientFunds {
                account_id: account.id,
                available: account.available_balance,
                required: voucher.total,
            });
        }

        Ok(Posting {
            transaction: NewTransaction {
                voucher_id: voucher.id,
                holder_id: account.id_user,
                account_id: account.id,
                kind: PostingKind::Payment,
                amount: voucher.total,
                reverses: None,
                created_at: now,
            },
            previous_balance: account.available_balance,
            new_balance,
            voucher_state,
        })
    }

    /// Plans the equal-and-opposite reversal of a payment.
    ///
    /// # Errors
    /// * `NotReversible` if `original` is not a payment
    /// * `PostingMismatch` if `original` was not posted for this voucher and account
    /// * `Voucher(NotPaid)` if the voucher is not PAID
    pub fn reverse(
        original: &LedgerTransaction,
        voucher: &Voucher,
        account: &FinancialAccount,
        now: DateTime<Utc>,
    ) -> Result<Posting, SettlementError> {
        if original.kind != PostingKind::Payment {
            return Err(SettlementError::NotReversible {
                id: original.id,
                kind: original.kind,
            });
        }
        if original.voucher_id != voucher.id || original.account_id != account.id {
            return Err(SettlementError::PostingMismatch {
                transaction_id: original.id,
                voucher_id: voucher.id,
            });
        }
        let voucher_state = VoucherIssuer::mark_refunded(voucher)?;

        Ok(Posting {
            transaction: NewTransaction {
                voucher_id: voucher.id,
                holder_id: original.holder_id,
                account_id: account.id,
                kind: PostingKind::Refund,
                amount: original.amount,
                reverses: Some(original.id),
                created_at: now,
            },
            previous_balance: account.available_balance,
            new_balance: account.available_balance + original.amount,
            voucher_state,
        })
    }

    /// Returns the payment of a voucher that no refund has reversed yet.
    #[must_use]
    pub fn outstanding_payment(transactions: &[LedgerTransaction]) -> Option<&LedgerTransaction> {
        transactions.iter().find(|payment| {
            payment.kind == PostingKind::Payment
                && !transactions.iter().any(|t| t.reverses == Some(payment.id))
        })
    }

    fn check_holder(voucher: &Voucher, account: &FinancialAccount) -> Result<(), SettlementError> {
        if account.id_user == voucher.guest_id {
            Ok(())
        } else {
            Err(SettlementError::AccountHolderMismatch {
                account_id: account.id,
                holder: account.id_user,
                guest: voucher.guest_id,
            })
        }
    }
}
