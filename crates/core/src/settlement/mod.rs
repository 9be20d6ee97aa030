//! Settlement ledger.
//!
//! Records append-only transactions against financial accounts:
//! - `types` - Accounts, transactions and planned postings
//! - `ledger` - Payment and refund planning
//! - `error` - Settlement error types

pub mod error;
pub mod ledger;
pub mod types;

#[cfg(test)]
mod ledger_props;

pub use error::SettlementError;
pub use ledger::SettlementLedger;
pub use types::{FinancialAccount, LedgerTransaction, NewFinancialAccount, NewTransaction, Posting, PostingKind};
