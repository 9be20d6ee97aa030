//! Row mapping between `SeaORM` models and engine types.
//!
//! State columns are plain strings in the schema. They are validated into
//! the engine's closed enums here, and any value that does not decode is
//! reported as [`StoreError::Corrupt`] rather than guessed at.

use rust_decimal::Decimal;
use sea_orm::ActiveValue::{NotSet, Set};
use staybook_core::availability::types::StayRange;
use staybook_core::booking::types::{Booking, BookingState, DetailBooking};
use staybook_core::pricing::types::{FeeType, PriceBreakdown, ServiceFee, ServiceFeeSnapshot};
use staybook_core::settlement::types::{FinancialAccount, LedgerTransaction, NewTransaction, PostingKind};
use staybook_core::store::{NewBooking, StoreError};
use staybook_core::voucher::types::{DetailVoucher, NewVoucher, Voucher, VoucherState};
use staybook_shared::types::{
    AccommodationId, BookingId, DetailBookingId, DetailVoucherId, FinancialAccountId, Money, ServiceFeeId,
    TransactionId, UserId, VoucherId,
};

use crate::entities::{
    bookings, detail_bookings, detail_vouchers, financial_accounts, service_fees, transactions, vouchers,
};

fn corrupt(table: &str, id: i64, what: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(format!("{table} {id}: {what}"))
}

/// Money columns carry four places; amounts are stored at minor-unit precision.
fn money(value: Decimal) -> Money {
    Money::new(value).round_to_minor()
}

fn count(table: &str, id: i64, column: &str, value: i32) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| corrupt(table, id, format_args!("negative {column} {value}")))
}

fn signed(table: &str, column: &str, value: u32) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{table}.{column} {value} out of range")))
}

fn fee_type(table: &str, id: i64, raw: &str) -> Result<FeeType, StoreError> {
    FeeType::parse(raw).ok_or_else(|| corrupt(table, id, format_args!("fee type '{raw}'")))
}

pub(crate) fn booking_from_rows(
    row: bookings::Model,
    detail: Option<detail_bookings::Model>,
) -> Result<Booking, StoreError> {
    let detail = detail.ok_or_else(|| corrupt("booking", row.id, "missing detail row"))?;
    let state =
        BookingState::parse(&row.state).ok_or_else(|| corrupt("booking", row.id, format_args!("state '{}'", row.state)))?;
    let stay = StayRange::new(detail.check_in, detail.check_out).map_err(|err| corrupt("booking", row.id, err))?;
    let selected_services: Vec<i64> =
        serde_json::from_str(&detail.selected_services).map_err(|err| corrupt("booking", row.id, err))?;

    Ok(Booking {
        id: BookingId::new(row.id),
        creation_date: row.creation_date,
        update_time: row.update_time,
        state,
        total_price: money(row.total_price),
        payment_status: row.payment_status,
        guest_id: UserId::new(row.guest_id),
        accommodation_id: AccommodationId::new(row.accommodation_id),
        detail: DetailBooking {
            id: DetailBookingId::new(detail.id),
            stay,
            number_of_guest: count("booking", row.id, "number_of_guest", detail.number_of_guest)?,
            service_fee: ServiceFeeSnapshot {
                service_fee_id: ServiceFeeId::new(detail.service_fee_id),
                fee_type: fee_type("booking", row.id, &detail.fee_type)?,
                value: detail.fee_value,
            },
            pricing: PriceBreakdown {
                nights: count("booking", row.id, "nights", detail.nights)?,
                price_per_night: money(detail.price_per_night),
                sub_total: money(detail.sub_total),
                discount: money(detail.discount),
                fee: money(detail.fee),
                tax: money(detail.tax),
                total: money(detail.total),
            },
            selected_services,
        },
        voucher_id: row.voucher_id.map(VoucherId::new),
        payment_method_id: row.payment_method_id.map(FinancialAccountId::new),
        cancellation_reason: row.cancellation_reason,
        version: row.version,
    })
}

pub(crate) fn new_booking_row(booking: &NewBooking) -> bookings::ActiveModel {
    bookings::ActiveModel {
        id: NotSet,
        creation_date: Set(booking.creation_date),
        update_time: Set(booking.creation_date),
        state: Set(BookingState::Pending.as_str().to_string()),
        total_price: Set(booking.pricing.total.amount),
        payment_status: Set(false),
        guest_id: Set(booking.guest_id.into_inner()),
        accommodation_id: Set(booking.accommodation_id.into_inner()),
        voucher_id: Set(None),
        payment_method_id: Set(booking.payment_method_id.map(FinancialAccountId::into_inner)),
        cancellation_reason: Set(None),
        version: Set(1),
    }
}

/// Every mutable booking column, for a versioned `UPDATE`.
pub(crate) fn booking_update(booking: &Booking) -> bookings::ActiveModel {
    bookings::ActiveModel {
        id: NotSet,
        creation_date: NotSet,
        update_time: Set(booking.update_time),
        state: Set(booking.state.as_str().to_string()),
        total_price: Set(booking.total_price.amount),
        payment_status: Set(booking.payment_status),
        guest_id: NotSet,
        accommodation_id: NotSet,
        voucher_id: Set(booking.voucher_id.map(VoucherId::into_inner)),
        payment_method_id: NotSet,
        cancellation_reason: Set(booking.cancellation_reason.clone()),
        version: Set(booking.version),
    }
}

pub(crate) fn detail_booking_row(
    booking_id: i64,
    detail: &DetailBooking,
) -> Result<detail_bookings::ActiveModel, StoreError> {
    Ok(detail_bookings::ActiveModel {
        id: NotSet,
        booking_id: Set(booking_id),
        check_in: Set(detail.stay.check_in),
        check_out: Set(detail.stay.check_out),
        number_of_guest: Set(signed("detail_bookings", "number_of_guest", detail.number_of_guest)?),
        service_fee_id: Set(detail.service_fee.service_fee_id.into_inner()),
        fee_type: Set(detail.service_fee.fee_type.as_str().to_string()),
        fee_value: Set(detail.service_fee.value),
        nights: Set(signed("detail_bookings", "nights", detail.pricing.nights)?),
        price_per_night: Set(detail.pricing.price_per_night.amount),
        sub_total: Set(detail.pricing.sub_total.amount),
        discount: Set(detail.pricing.discount.amount),
        fee: Set(detail.pricing.fee.amount),
        tax: Set(detail.pricing.tax.amount),
        total: Set(detail.pricing.total.amount),
        selected_services: Set(serde_json::to_string(&detail.selected_services)
            .map_err(|err| StoreError::Backend(err.to_string()))?),
    })
}

/// The stay and quote columns touched by a reschedule.
pub(crate) fn detail_reschedule(detail: &DetailBooking) -> Result<detail_bookings::ActiveModel, StoreError> {
    Ok(detail_bookings::ActiveModel {
        id: Set(detail.id.into_inner()),
        check_in: Set(detail.stay.check_in),
        check_out: Set(detail.stay.check_out),
        nights: Set(signed("detail_bookings", "nights", detail.pricing.nights)?),
        price_per_night: Set(detail.pricing.price_per_night.amount),
        sub_total: Set(detail.pricing.sub_total.amount),
        discount: Set(detail.pricing.discount.amount),
        fee: Set(detail.pricing.fee.amount),
        tax: Set(detail.pricing.tax.amount),
        total: Set(detail.pricing.total.amount),
        ..Default::default()
    })
}

pub(crate) fn voucher_from_rows(
    row: vouchers::Model,
    detail: Option<detail_vouchers::Model>,
) -> Result<Voucher, StoreError> {
    let detail = detail.ok_or_else(|| corrupt("voucher", row.id, "missing detail row"))?;
    let state =
        VoucherState::parse(&row.state).ok_or_else(|| corrupt("voucher", row.id, format_args!("state '{}'", row.state)))?;

    Ok(Voucher {
        id: VoucherId::new(row.id),
        creation_date: row.creation_date,
        guest_id: UserId::new(row.guest_id),
        booking_id: row.booking_id.map(BookingId::new),
        sub_total: money(row.sub_total),
        discount: money(row.discount),
        fee: money(row.fee),
        tax: money(row.tax),
        total: money(row.total),
        state,
        payment_method_id: row.payment_method_id.map(FinancialAccountId::new),
        detail: DetailVoucher {
            id: DetailVoucherId::new(detail.id),
            price_night: money(detail.price_night),
            number_nights: count("voucher", row.id, "number_nights", detail.number_nights)?,
            sub_total: money(detail.sub_total),
            description: detail.description,
        },
    })
}

pub(crate) fn new_voucher_row(voucher: &NewVoucher) -> vouchers::ActiveModel {
    vouchers::ActiveModel {
        id: NotSet,
        creation_date: Set(voucher.creation_date),
        guest_id: Set(voucher.guest_id.into_inner()),
        booking_id: Set(Some(voucher.booking_id.into_inner())),
        sub_total: Set(voucher.sub_total.amount),
        discount: Set(voucher.discount.amount),
        fee: Set(voucher.fee.amount),
        tax: Set(voucher.tax.amount),
        total: Set(voucher.total.amount),
        state: Set(VoucherState::Pending.as_str().to_string()),
        payment_method_id: Set(voucher.payment_method_id.map(FinancialAccountId::into_inner)),
    }
}

pub(crate) fn new_detail_voucher_row(
    voucher_id: i64,
    voucher: &NewVoucher,
) -> Result<detail_vouchers::ActiveModel, StoreError> {
    Ok(detail_vouchers::ActiveModel {
        id: NotSet,
        voucher_id: Set(voucher_id),
        price_night: Set(voucher.detail.price_night.amount),
        number_nights: Set(signed("detail_vouchers", "number_nights", voucher.detail.number_nights)?),
        sub_total: Set(voucher.detail.sub_total.amount),
        description: Set(voucher.detail.description.clone()),
    })
}

pub(crate) fn account_from_row(row: financial_accounts::Model) -> FinancialAccount {
    FinancialAccount {
        id: FinancialAccountId::new(row.id),
        id_user: UserId::new(row.id_user),
        bank_name: row.bank_name,
        number_account: row.number_account,
        available_balance: money(row.available_balance),
    }
}

pub(crate) fn service_fee_from_row(row: service_fees::Model) -> Result<ServiceFee, StoreError> {
    Ok(ServiceFee {
        id: ServiceFeeId::new(row.id),
        value: row.value,
        fee_type: fee_type("service fee", row.id, &row.fee_type)?,
        prom_calification_minimum: row.prom_calification_minimum,
        number_bookings_minimum: count("service fee", row.id, "number_bookings_minimum", row.number_bookings_minimum)?,
    })
}

pub(crate) fn transaction_from_row(row: transactions::Model) -> Result<LedgerTransaction, StoreError> {
    let kind =
        PostingKind::parse(&row.kind).ok_or_else(|| corrupt("transaction", row.id, format_args!("kind '{}'", row.kind)))?;
    Ok(LedgerTransaction {
        id: TransactionId::new(row.id),
        voucher_id: VoucherId::new(row.voucher_id),
        holder_id: UserId::new(row.holder_id),
        account_id: FinancialAccountId::new(row.account_id),
        kind,
        amount: money(row.amount),
        reverses: row.reverses.map(TransactionId::new),
        created_at: row.created_at,
    })
}

pub(crate) fn new_transaction_row(transaction: &NewTransaction) -> transactions::ActiveModel {
    transactions::ActiveModel {
        id: NotSet,
        voucher_id: Set(transaction.voucher_id.into_inner()),
        holder_id: Set(transaction.holder_id.into_inner()),
        account_id: Set(transaction.account_id.into_inner()),
        kind: Set(transaction.kind.as_str().to_string()),
        amount: Set(transaction.amount.amount),
        reverses: Set(transaction.reverses.map(TransactionId::into_inner)),
        created_at: Set(transaction.created_at),
    }
}
