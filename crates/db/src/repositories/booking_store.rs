//! `SeaORM` implementation of the booking store.
//!
//! Every mutating call runs in one database transaction: it loads fresh rows,
//! hands them to the engine's pure planners, and writes what they return.
//!
//! Serialisation:
//! - reservations and reschedules take `pg_advisory_xact_lock` on the
//!   accommodation id
//! - postings lock the financial account row with `SELECT ... FOR UPDATE`
//! - voucher issuance locks the booking row the same way
//! - booking rows are written with `UPDATE ... WHERE id = ? AND version = ?`
//!
//! SQLite has no row or advisory locks; its single writer serialises the
//! same units.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait,
    ActiveValue::{NotSet, Set},
    ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Statement, TransactionTrait, Value,
    sea_query::Expr,
};
use staybook_core::availability::types::BookedRange;
use staybook_core::booking::error::BookingError;
use staybook_core::booking::types::{Booking, BookingState, BookingTransition};
use staybook_core::pricing::types::ServiceFee;
use staybook_core::settlement::ledger::SettlementLedger;
use staybook_core::settlement::types::{FinancialAccount, LedgerTransaction, NewFinancialAccount, Posting};
use staybook_core::store::plan::{self, PaymentPlan};
use staybook_core::store::{
    BookingStore, CancelRequest, CancellationReceipt, EntityKind, NewBooking, NewServiceFee, PaymentReceipt,
    RescheduledStay, StoreError,
};
use staybook_core::voucher::types::{NewVoucher, Voucher, VoucherState};
use staybook_shared::types::{
    AccommodationId, BookingId, DetailBookingId, DetailVoucherId, FinancialAccountId, ServiceFeeId, UserId,
    VoucherId,
};
use tracing::debug;

use crate::entities::{
    bookings, detail_bookings, detail_vouchers, financial_accounts, service_fees, transactions, vouchers,
};
use crate::repositories::rows;

fn backend(err: DbErr) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// Booking store backed by Postgres or SQLite.
#[derive(Debug, Clone)]
pub struct DbBookingStore {
    db: DatabaseConnection,
}

impl DbBookingStore {
    /// Creates a new booking store.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn begin(&self) -> Result<DatabaseTransaction, StoreError> {
        self.db.begin().await.map_err(backend)
    }

    /// Serialises calendar changes for one accommodation until the
    /// transaction ends.
    async fn lock_accommodation(txn: &DatabaseTransaction, id: AccommodationId) -> Result<(), StoreError> {
        if txn.get_database_backend() == DbBackend::Postgres {
            txn.execute(Statement::from_sql_and_values(
                DbBackend::Postgres,
                "SELECT pg_advisory_xact_lock($1)",
                [Value::from(id.into_inner())],
            ))
            .await
            .map_err(backend)?;
        }
        Ok(())
    }

    /// Loads a financial account, locking its row on Postgres.
    async fn lock_account(txn: &DatabaseTransaction, id: FinancialAccountId) -> Result<FinancialAccount, StoreError> {
        let mut query = financial_accounts::Entity::find_by_id(id.into_inner());
        if txn.get_database_backend() == DbBackend::Postgres {
            query = query.lock_exclusive();
        }
        query
            .one(txn)
            .await
            .map_err(backend)?
            .map(rows::account_from_row)
            .ok_or_else(|| StoreError::not_found(EntityKind::FinancialAccount, id))
    }

    /// Locks a booking row on Postgres until the transaction ends.
    async fn lock_booking(txn: &DatabaseTransaction, id: BookingId) -> Result<(), StoreError> {
        if txn.get_database_backend() == DbBackend::Postgres {
            bookings::Entity::find_by_id(id.into_inner())
                .lock_exclusive()
                .one(txn)
                .await
                .map_err(backend)?;
        }
        Ok(())
    }

    async fn load_booking<C: ConnectionTrait>(conn: &C, id: BookingId) -> Result<Option<Booking>, StoreError> {
        bookings::Entity::find_by_id(id.into_inner())
            .find_also_related(detail_bookings::Entity)
            .one(conn)
            .await
            .map_err(backend)?
            .map(|(row, detail)| rows::booking_from_rows(row, detail))
            .transpose()
    }

    async fn require_booking<C: ConnectionTrait>(conn: &C, id: BookingId) -> Result<Booking, StoreError> {
        Self::load_booking(conn, id)
            .await?
            .ok_or_else(|| StoreError::not_found(EntityKind::Booking, id))
    }

    async fn load_voucher<C: ConnectionTrait>(conn: &C, id: VoucherId) -> Result<Option<Voucher>, StoreError> {
        vouchers::Entity::find_by_id(id.into_inner())
            .find_also_related(detail_vouchers::Entity)
            .one(conn)
            .await
            .map_err(backend)?
            .map(|(row, detail)| rows::voucher_from_rows(row, detail))
            .transpose()
    }

    async fn require_voucher<C: ConnectionTrait>(conn: &C, id: VoucherId) -> Result<Voucher, StoreError> {
        Self::load_voucher(conn, id)
            .await?
            .ok_or_else(|| StoreError::not_found(EntityKind::Voucher, id))
    }

    async fn load_transactions<C: ConnectionTrait>(
        conn: &C,
        voucher_id: VoucherId,
    ) -> Result<Vec<LedgerTransaction>, StoreError> {
        transactions::Entity::find()
            .filter(transactions::Column::VoucherId.eq(voucher_id.into_inner()))
            .order_by_asc(transactions::Column::Id)
            .all(conn)
            .await
            .map_err(backend)?
            .into_iter()
            .map(rows::transaction_from_row)
            .collect()
    }

    /// Calendar claims of an accommodation. Cancelled bookings are filtered
    /// in SQL; the guard filters again on the decoded state.
    async fn booked_ranges(
        txn: &DatabaseTransaction,
        accommodation_id: AccommodationId,
    ) -> Result<Vec<BookedRange>, StoreError> {
        bookings::Entity::find()
            .filter(bookings::Column::AccommodationId.eq(accommodation_id.into_inner()))
            .filter(bookings::Column::State.ne(BookingState::Cancelled.as_str()))
            .find_also_related(detail_bookings::Entity)
            .all(txn)
            .await
            .map_err(backend)?
            .into_iter()
            .map(|(row, detail)| rows::booking_from_rows(row, detail).map(|b| b.booked_range()))
            .collect()
    }

    /// Writes a booking if its stored version is still `expected_version`.
    async fn write_booking(
        txn: &DatabaseTransaction,
        booking: &Booking,
        expected_version: i64,
    ) -> Result<(), StoreError> {
        let result = bookings::Entity::update_many()
            .set(rows::booking_update(booking))
            .filter(bookings::Column::Id.eq(booking.id.into_inner()))
            .filter(bookings::Column::Version.eq(expected_version))
            .exec(txn)
            .await
            .map_err(backend)?;
        if result.rows_affected == 0 {
            debug!(booking_id = %booking.id, expected_version, "Versioned booking update matched no row");
            return Err(StoreError::StaleVersion(booking.id));
        }
        Ok(())
    }

    async fn set_voucher_state(
        txn: &DatabaseTransaction,
        voucher_id: VoucherId,
        state: VoucherState,
    ) -> Result<(), StoreError> {
        vouchers::Entity::update_many()
            .col_expr(vouchers::Column::State, Expr::value(state.as_str()))
            .filter(vouchers::Column::Id.eq(voucher_id.into_inner()))
            .exec(txn)
            .await
            .map_err(backend)?;
        Ok(())
    }

    /// Appends the posting's transaction, moves the balance and the voucher.
    async fn post(txn: &DatabaseTransaction, posting: Posting) -> Result<LedgerTransaction, StoreError> {
        let account_id = posting.transaction.account_id;
        financial_accounts::Entity::update_many()
            .col_expr(
                financial_accounts::Column::AvailableBalance,
                Expr::value(posting.new_balance.amount),
            )
            .filter(financial_accounts::Column::Id.eq(account_id.into_inner()))
            .exec(txn)
            .await
            .map_err(backend)?;

        Self::set_voucher_state(txn, posting.transaction.voucher_id, posting.voucher_state).await?;

        let row = rows::new_transaction_row(&posting.transaction)
            .insert(txn)
            .await
            .map_err(backend)?;
        rows::transaction_from_row(row)
    }

    async fn commit(txn: DatabaseTransaction) -> Result<(), StoreError> {
        txn.commit().await.map_err(backend)
    }
}

#[async_trait]
impl BookingStore for DbBookingStore {
    async fn reserve(&self, booking: NewBooking) -> Result<Booking, StoreError> {
        let txn = self.begin().await?;
        Self::lock_accommodation(&txn, booking.accommodation_id).await?;

        let existing = Self::booked_ranges(&txn, booking.accommodation_id).await?;
        plan::plan_reservation(&booking, &existing)?;

        let row = rows::new_booking_row(&booking).insert(&txn).await.map_err(backend)?;
        let pending = plan::materialize_booking(booking, BookingId::new(row.id), DetailBookingId::new(0));
        let detail = rows::detail_booking_row(row.id, &pending.detail)?
            .insert(&txn)
            .await
            .map_err(backend)?;
        Self::commit(txn).await?;

        let mut stored = pending;
        stored.detail.id = DetailBookingId::new(detail.id);
        Ok(stored)
    }

    async fn reschedule(
        &self,
        id: BookingId,
        expected_version: i64,
        change: RescheduledStay,
    ) -> Result<Booking, StoreError> {
        let txn = self.begin().await?;
        let accommodation_id = Self::require_booking(&txn, id).await?.accommodation_id;
        Self::lock_accommodation(&txn, accommodation_id).await?;

        let booking = Self::require_booking(&txn, id).await?;
        let existing = Self::booked_ranges(&txn, accommodation_id).await?;
        let updated = plan::plan_reschedule(&booking, expected_version, &change, &existing)?;

        Self::write_booking(&txn, &updated, expected_version).await?;
        rows::detail_reschedule(&updated.detail)?
            .update(&txn)
            .await
            .map_err(backend)?;
        Self::commit(txn).await?;
        Ok(updated)
    }

    async fn attach_voucher(
        &self,
        id: BookingId,
        expected_version: i64,
        voucher: NewVoucher,
    ) -> Result<(Booking, Voucher), StoreError> {
        let txn = self.begin().await?;
        Self::lock_booking(&txn, id).await?;
        let booking = Self::require_booking(&txn, id).await?;
        // Validated before the insert; the real id is assigned by it.
        let mut linked = plan::plan_voucher_link(&booking, expected_version, &voucher, VoucherId::new(0))?;

        let row = rows::new_voucher_row(&voucher).insert(&txn).await.map_err(backend)?;
        let voucher_id = VoucherId::new(row.id);
        linked.voucher_id = Some(voucher_id);
        let detail = rows::new_detail_voucher_row(row.id, &voucher)?
            .insert(&txn)
            .await
            .map_err(backend)?;
        Self::write_booking(&txn, &linked, expected_version).await?;
        Self::commit(txn).await?;

        Ok((linked, voucher.into_voucher(voucher_id, DetailVoucherId::new(detail.id))))
    }

    async fn settle_payment(
        &self,
        id: BookingId,
        expected_version: i64,
        now: DateTime<Utc>,
    ) -> Result<PaymentReceipt, StoreError> {
        let txn = self.begin().await?;
        let account_id = plan::payment_account(&Self::require_booking(&txn, id).await?)?;
        let account = Self::lock_account(&txn, account_id).await?;

        let booking = Self::require_booking(&txn, id).await?;
        let voucher_id = booking
            .voucher_id
            .ok_or(StoreError::Booking(BookingError::VoucherNotPaid(None)))?;
        let voucher = Self::require_voucher(&txn, voucher_id).await?;

        let (posting, transition) = match plan::plan_payment(&booking, expected_version, &voucher, &account, now)? {
            PaymentPlan::AlreadySettled => return Ok(PaymentReceipt::AlreadySettled { booking, voucher }),
            PaymentPlan::Post { posting, transition } => (posting, transition),
        };

        let mut confirmed = booking;
        transition.apply(&mut confirmed);
        Self::write_booking(&txn, &confirmed, expected_version).await?;
        let transaction = Self::post(&txn, posting).await?;
        let voucher = Self::require_voucher(&txn, voucher_id).await?;
        Self::commit(txn).await?;

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
        let txn = self.begin().await?;
        let paying_account = match Self::require_booking(&txn, id).await?.voucher_id {
            Some(voucher_id) => SettlementLedger::outstanding_payment(&Self::load_transactions(&txn, voucher_id).await?)
                .map(|payment| payment.account_id),
            None => None,
        };
        let account = match paying_account {
            Some(account_id) => Some(Self::lock_account(&txn, account_id).await?),
            None => None,
        };

        let booking = Self::require_booking(&txn, id).await?;
        let voucher = match booking.voucher_id {
            Some(voucher_id) => Some(Self::require_voucher(&txn, voucher_id).await?),
            None => None,
        };
        let transactions = match &voucher {
            Some(voucher) => Self::load_transactions(&txn, voucher.id).await?,
            None => Vec::new(),
        };
        let cancellation = plan::plan_cancellation(
            &booking,
            expected_version,
            voucher.as_ref(),
            &transactions,
            account.as_ref(),
            &request,
        )?;

        let mut cancelled = booking;
        cancellation.transition.apply(&mut cancelled);
        Self::write_booking(&txn, &cancelled, expected_version).await?;

        let refund = match cancellation.refund {
            Some(posting) => Some(Self::post(&txn, posting).await?),
            None => None,
        };
        let voucher = match (voucher, cancellation.voucher_state) {
            (Some(voucher), Some(state)) => {
                if voucher.state != state && refund.is_none() {
                    Self::set_voucher_state(&txn, voucher.id, state).await?;
                }
                Some(Voucher { state, ..voucher })
            }
            (voucher, _) => voucher,
        };
        Self::commit(txn).await?;

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
        let txn = self.begin().await?;
        let booking = Self::require_booking(&txn, id).await?;
        let updated = plan::plan_transition(&booking, expected_version, &transition)?;
        Self::write_booking(&txn, &updated, expected_version).await?;
        Self::commit(txn).await?;
        Ok(updated)
    }

    async fn find_booking(&self, id: BookingId) -> Result<Option<Booking>, StoreError> {
        Self::load_booking(&self.db, id).await
    }

    async fn find_voucher(&self, id: VoucherId) -> Result<Option<Voucher>, StoreError> {
        Self::load_voucher(&self.db, id).await
    }

    async fn find_account(&self, id: FinancialAccountId) -> Result<Option<FinancialAccount>, StoreError> {
        Ok(financial_accounts::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(backend)?
            .map(rows::account_from_row))
    }

    async fn find_service_fee(&self, id: ServiceFeeId) -> Result<Option<ServiceFee>, StoreError> {
        service_fees::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(backend)?
            .map(rows::service_fee_from_row)
            .transpose()
    }

    async fn transactions_for_voucher(&self, id: VoucherId) -> Result<Vec<LedgerTransaction>, StoreError> {
        Self::load_transactions(&self.db, id).await
    }

    async fn count_completed_bookings(&self, guest_id: UserId) -> Result<u32, StoreError> {
        let completed = bookings::Entity::find()
            .filter(bookings::Column::GuestId.eq(guest_id.into_inner()))
            .filter(bookings::Column::State.eq(BookingState::CheckedOut.as_str()))
            .count(&self.db)
            .await
            .map_err(backend)?;
        Ok(u32::try_from(completed).unwrap_or(u32::MAX))
    }

    async fn create_service_fee(&self, fee: NewServiceFee) -> Result<ServiceFee, StoreError> {
        let number_bookings_minimum = i32::try_from(fee.number_bookings_minimum)
            .map_err(|_| StoreError::Backend(format!("minimum {} out of range", fee.number_bookings_minimum)))?;
        let row = service_fees::ActiveModel {
            id: NotSet,
            value: Set(fee.value),
            fee_type: Set(fee.fee_type.as_str().to_string()),
            prom_calification_minimum: Set(fee.prom_calification_minimum),
            number_bookings_minimum: Set(number_bookings_minimum),
        }
        .insert(&self.db)
        .await
        .map_err(backend)?;
        rows::service_fee_from_row(row)
    }

    async fn create_account(&self, account: NewFinancialAccount) -> Result<FinancialAccount, StoreError> {
        let row = financial_accounts::ActiveModel {
            id: NotSet,
            id_user: Set(account.id_user.into_inner()),
            bank_name: Set(account.bank_name),
            number_account: Set(account.number_account),
            available_balance: Set(account.available_balance.amount),
        }
        .insert(&self.db)
        .await
        .map_err(backend)?;
        Ok(rows::account_from_row(row))
    }
}
