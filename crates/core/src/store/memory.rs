//! In-process booking store.
//!
//! Tables live behind one `RwLock`. Check-then-act sequences that span an
//! await are serialised by per-key mutexes: one per accommodation for
//! reservations and reschedules, one per financial account for postings.
//! Booking writes re-check the version under the write lock. Guards are
//! dropped on every exit path, including cancellation of the calling future,
//! and the last guard for a key removes that key's mutex from its table.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use staybook_shared::types::{
    AccommodationId, BookingId, DetailBookingId, DetailVoucherId, FinancialAccountId, ServiceFeeId,
    TransactionId, UserId, VoucherId,
};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::availability::types::BookedRange;
use crate::booking::error::BookingError;
use crate::booking::types::{Booking, BookingState, BookingTransition};
use crate::pricing::types::ServiceFee;
use crate::settlement::ledger::SettlementLedger;
use crate::settlement::types::{FinancialAccount, LedgerTransaction, NewFinancialAccount, Posting};
use crate::store::plan::{self, PaymentPlan};
use crate::store::{
    BookingStore, CancelRequest, CancellationReceipt, EntityKind, NewBooking, NewServiceFee,
    PaymentReceipt, RescheduledStay, StoreError,
};
use crate::voucher::types::{NewVoucher, Voucher};

#[derive(Debug, Default)]
struct Sequence(i64);

impl Sequence {
    fn next(&mut self) -> i64 {
        self.0 += 1;
        self.0
    }
}

#[derive(Debug, Default)]
struct Tables {
    bookings: HashMap<BookingId, Booking>,
    vouchers: HashMap<VoucherId, Voucher>,
    transactions: Vec<LedgerTransaction>,
    accounts: HashMap<FinancialAccountId, FinancialAccount>,
    service_fees: HashMap<ServiceFeeId, ServiceFee>,
    booking_seq: Sequence,
    detail_booking_seq: Sequence,
    voucher_seq: Sequence,
    detail_voucher_seq: Sequence,
    transaction_seq: Sequence,
    account_seq: Sequence,
    service_fee_seq: Sequence,
}

impl Tables {
    fn booking(&self, id: BookingId) -> Result<&Booking, StoreError> {
        self.bookings
            .get(&id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Booking, id))
    }

    fn voucher(&self, id: VoucherId) -> Result<&Voucher, StoreError> {
        self.vouchers
            .get(&id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Voucher, id))
    }

    fn account(&self, id: FinancialAccountId) -> Result<&FinancialAccount, StoreError> {
        self.accounts
            .get(&id)
            .ok_or_else(|| StoreError::not_found(EntityKind::FinancialAccount, id))
    }

    fn booked_ranges(&self, accommodation_id: AccommodationId) -> Vec<BookedRange> {
        self.bookings
            .values()
            .filter(|b| b.accommodation_id == accommodation_id)
            .map(Booking::booked_range)
            .collect()
    }

    fn voucher_transactions(&self, id: VoucherId) -> Vec<LedgerTransaction> {
        self.transactions
            .iter()
            .filter(|t| t.voucher_id == id)
            .cloned()
            .collect()
    }

    /// Appends a posting and moves the account and voucher with it.
    fn post(&mut self, posting: Posting) -> Result<LedgerTransaction, StoreError> {
        let voucher_id = posting.transaction.voucher_id;
        let account_id = posting.transaction.account_id;
        if !self.vouchers.contains_key(&voucher_id) {
            return Err(StoreError::not_found(EntityKind::Voucher, voucher_id));
        }

        let account = self
            .accounts
            .get_mut(&account_id)
            .ok_or_else(|| StoreError::not_found(EntityKind::FinancialAccount, account_id))?;
        if account.available_balance != posting.previous_balance {
            return Err(StoreError::Inconsistent(format!(
                "account {account_id} balance moved outside its lock"
            )));
        }
        account.available_balance = posting.new_balance;

        let voucher = self
            .vouchers
            .get_mut(&voucher_id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Voucher, voucher_id))?;
        voucher.state = posting.voucher_state;

        let transaction = posting
            .transaction
            .into_transaction(TransactionId::new(self.transaction_seq.next()));
        self.transactions.push(transaction.clone());
        Ok(transaction)
    }
}

type LockTable<K> = DashMap<K, Arc<Mutex<()>>>;

/// Holds one key's mutex and prunes the table entry on release.
struct KeyGuard<'a, K: Eq + Hash> {
    locks: &'a LockTable<K>,
    key: K,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<'a, K: Eq + Hash + Copy> KeyGuard<'a, K> {
    async fn acquire(locks: &'a LockTable<K>, key: K) -> Self {
        let lock = locks.entry(key).or_default().clone();
        Self {
            locks,
            key,
            guard: Some(lock.lock_owned().await),
        }
    }
}

impl<K: Eq + Hash> Drop for KeyGuard<'_, K> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // The table's own reference is the only one left when nobody waits.
        self.locks.remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Booking store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    accommodation_locks: LockTable<AccommodationId>,
    account_locks: LockTable<FinancialAccountId>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn booking_snapshot(&self, id: BookingId) -> Result<Booking, StoreError> {
        self.tables.read().await.booking(id).cloned()
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn reserve(&self, booking: NewBooking) -> Result<Booking, StoreError> {
        let _guard = KeyGuard::acquire(&self.accommodation_locks, booking.accommodation_id).await;

        let existing = self.tables.read().await.booked_ranges(booking.accommodation_id);
        plan::plan_reservation(&booking, &existing)?;

        let mut tables = self.tables.write().await;
        let id = BookingId::new(tables.booking_seq.next());
        let detail_id = DetailBookingId::new(tables.detail_booking_seq.next());
        let stored = plan::materialize_booking(booking, id, detail_id);
        tables.bookings.insert(id, stored.clone());
        Ok(stored)
    }

    async fn reschedule(
        &self,
        id: BookingId,
        expected_version: i64,
        change: RescheduledStay,
    ) -> Result<Booking, StoreError> {
        let accommodation_id = self.booking_snapshot(id).await?.accommodation_id;
        let _guard = KeyGuard::acquire(&self.accommodation_locks, accommodation_id).await;

        let updated = {
            let tables = self.tables.read().await;
            let existing = tables.booked_ranges(accommodation_id);
            plan::plan_reschedule(tables.booking(id)?, expected_version, &change, &existing)?
        };

        let mut tables = self.tables.write().await;
        plan::check_version(tables.booking(id)?, expected_version)?;
        tables.bookings.insert(id, updated.clone());
        Ok(updated)
    }

    async fn attach_voucher(
        &self,
        id: BookingId,
        expected_version: i64,
        voucher: NewVoucher,
    ) -> Result<(Booking, Voucher), StoreError> {
        let mut tables = self.tables.write().await;
        let voucher_id = VoucherId::new(tables.voucher_seq.next());
        let updated = plan::plan_voucher_link(tables.booking(id)?, expected_version, &voucher, voucher_id)?;

        let detail_id = DetailVoucherId::new(tables.detail_voucher_seq.next());
        let stored = voucher.into_voucher(voucher_id, detail_id);
        tables.vouchers.insert(voucher_id, stored.clone());
        tables.bookings.insert(id, updated.clone());
        Ok((updated, stored))
    }

    async fn settle_payment(
        &self,
        id: BookingId,
        expected_version: i64,
        now: DateTime<Utc>,
    ) -> Result<PaymentReceipt, StoreError> {
        let account_id = plan::payment_account(&self.booking_snapshot(id).await?)?;
        let _guard = KeyGuard::acquire(&self.account_locks, account_id).await;

        let (booking, voucher, payment_plan) = {
            let tables = self.tables.read().await;
            let booking = tables.booking(id)?.clone();
            let voucher_id = booking
                .voucher_id
                .ok_or(StoreError::Booking(BookingError::VoucherNotPaid(None)))?;
            let voucher = tables.voucher(voucher_id)?.clone();
            let account = tables.account(account_id)?;
            let payment_plan = plan::plan_payment(&booking, expected_version, &voucher, account, now)?;
            (booking, voucher, payment_plan)
        };

        let (posting, transition) = match payment_plan {
            PaymentPlan::AlreadySettled => return Ok(PaymentReceipt::AlreadySettled { booking, voucher }),
            PaymentPlan::Post { posting, transition } => (posting, transition),
        };

        let mut tables = self.tables.write().await;
        plan::check_version(tables.booking(id)?, expected_version)?;
        let transaction = tables.post(posting)?;
        let mut confirmed = booking;
        transition.apply(&mut confirmed);
        tables.bookings.insert(id, confirmed.clone());
        let voucher = tables.voucher(voucher.id)?.clone();

        Ok(PaymentReceipt::Settled {
            booking: confirmed,
            voucher,
            transaction,
        })
    }

    async fn cancel(
        &self,
        id: BookingId,
        expected_version: i64,
        request: CancelRequest,
    ) -> Result<CancellationReceipt, StoreError> {
        let paying_account = {
            let tables = self.tables.read().await;
            let booking = tables.booking(id)?;
            booking.voucher_id.and_then(|voucher_id| {
                SettlementLedger::outstanding_payment(&tables.voucher_transactions(voucher_id))
                    .map(|payment| payment.account_id)
            })
        };
        let _guard = match paying_account {
            Some(account_id) => Some(KeyGuard::acquire(&self.account_locks, account_id).await),
            None => None,
        };

        let (booking, cancellation) = {
            let tables = self.tables.read().await;
            let booking = tables.booking(id)?.clone();
            let voucher = booking.voucher_id.map(|v| tables.voucher(v)).transpose()?;
            let transactions = voucher
                .map(|v| tables.voucher_transactions(v.id))
                .unwrap_or_default();
            let account = paying_account.map(|a| tables.account(a)).transpose()?;
            let cancellation =
                plan::plan_cancellation(&booking, expected_version, voucher, &transactions, account, &request)?;
            (booking, cancellation)
        };

        let mut tables = self.tables.write().await;
        plan::check_version(tables.booking(id)?, expected_version)?;

        let refund = cancellation.refund.map(|posting| tables.post(posting)).transpose()?;
        let voucher = match (booking.voucher_id, cancellation.voucher_state) {
            (Some(voucher_id), Some(state)) => {
                let voucher = tables
                    .vouchers
                    .get_mut(&voucher_id)
                    .ok_or_else(|| StoreError::not_found(EntityKind::Voucher, voucher_id))?;
                voucher.state = state;
                Some(voucher.clone())
            }
            _ => None,
        };

        let mut cancelled = booking;
        cancellation.transition.apply(&mut cancelled);
        tables.bookings.insert(id, cancelled.clone());

        Ok(CancellationReceipt {
            booking: cancelled,
            voucher,
            refund,
        })
    }

    async fn transition(
        &self,
        id: BookingId,
        expected_version: i64,
        transition: BookingTransition,
    ) -> Result<Booking, StoreError> {
        let mut tables = self.tables.write().await;
        let updated = plan::plan_transition(tables.booking(id)?, expected_version, &transition)?;
        tables.bookings.insert(id, updated.clone());
        Ok(updated)
    }

    async fn find_booking(&self, id: BookingId) -> Result<Option<Booking>, StoreError> {
        Ok(self.tables.read().await.bookings.get(&id).cloned())
    }

    async fn find_voucher(&self, id: VoucherId) -> Result<Option<Voucher>, StoreError> {
        Ok(self.tables.read().await.vouchers.get(&id).cloned())
    }

    async fn find_account(&self, id: FinancialAccountId) -> Result<Option<FinancialAccount>, StoreError> {
        Ok(self.tables.read().await.accounts.get(&id).cloned())
    }

    async fn find_service_fee(&self, id: ServiceFeeId) -> Result<Option<ServiceFee>, StoreError> {
        Ok(self.tables.read().await.service_fees.get(&id).cloned())
    }

    async fn transactions_for_voucher(&self, id: VoucherId) -> Result<Vec<LedgerTransaction>, StoreError> {
        Ok(self.tables.read().await.voucher_transactions(id))
    }

    async fn count_completed_bookings(&self, guest_id: UserId) -> Result<u32, StoreError> {
        let tables = self.tables.read().await;
        let completed = tables
            .bookings
            .values()
            .filter(|b| b.guest_id == guest_id && b.state == BookingState::CheckedOut)
            .count();
        Ok(u32::try_from(completed).unwrap_or(u32::MAX))
    }

    async fn create_service_fee(&self, fee: NewServiceFee) -> Result<ServiceFee, StoreError> {
        let mut tables = self.tables.write().await;
        let id = ServiceFeeId::new(tables.service_fee_seq.next());
        let stored = ServiceFee {
            id,
            value: fee.value,
            fee_type: fee.fee_type,
            prom_calification_minimum: fee.prom_calification_minimum,
            number_bookings_minimum: fee.number_bookings_minimum,
        };
        tables.service_fees.insert(id, stored.clone());
        Ok(stored)
    }

    async fn create_account(&self, account: NewFinancialAccount) -> Result<FinancialAccount, StoreError> {
        let mut tables = self.tables.write().await;
        let id = FinancialAccountId::new(tables.account_seq.next());
        let stored = FinancialAccount {
            id,
            id_user: account.id_user,
            bank_name: account.bank_name,
            number_account: account.number_account,
            available_balance: account.available_balance,
        };
        tables.accounts.insert(id, stored.clone());
        Ok(stored)
    }
}
