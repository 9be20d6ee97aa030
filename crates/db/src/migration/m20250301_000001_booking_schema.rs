//! Booking schema.
//!
//! Creates the fee schedules, payment accounts, bookings, vouchers and the
//! append-only transaction ledger. Built with the schema builder so the same
//! migration runs on Postgres and SQLite.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ServiceFees::Table)
                    .if_not_exists()
                    .col(big_integer(ServiceFees::Id).auto_increment().primary_key())
                    .col(decimal_len(ServiceFees::Value, 19, 4))
                    .col(string_len(ServiceFees::FeeType, 16))
                    .col(decimal_len(ServiceFees::PromCalificationMinimum, 19, 4))
                    .col(integer(ServiceFees::NumberBookingsMinimum))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FinancialAccounts::Table)
                    .if_not_exists()
                    .col(big_integer(FinancialAccounts::Id).auto_increment().primary_key())
                    .col(big_integer(FinancialAccounts::IdUser))
                    .col(string(FinancialAccounts::BankName))
                    .col(string(FinancialAccounts::NumberAccount))
                    .col(
                        decimal_len(FinancialAccounts::AvailableBalance, 19, 4)
                            .check(Expr::col(FinancialAccounts::AvailableBalance).gte(0)),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Bookings::Table)
                    .if_not_exists()
                    .col(big_integer(Bookings::Id).auto_increment().primary_key())
                    .col(timestamp_with_time_zone(Bookings::CreationDate))
                    .col(timestamp_with_time_zone(Bookings::UpdateTime))
                    .col(string_len(Bookings::State, 16))
                    .col(decimal_len(Bookings::TotalPrice, 19, 4))
                    .col(boolean(Bookings::PaymentStatus))
                    .col(big_integer(Bookings::GuestId))
                    .col(big_integer(Bookings::AccommodationId))
                    .col(big_integer_null(Bookings::VoucherId))
                    .col(big_integer_null(Bookings::PaymentMethodId))
                    .col(text_null(Bookings::CancellationReason))
                    .col(big_integer(Bookings::Version))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_accommodation_state")
                    .table(Bookings::Table)
                    .col(Bookings::AccommodationId)
                    .col(Bookings::State)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_guest_state")
                    .table(Bookings::Table)
                    .col(Bookings::GuestId)
                    .col(Bookings::State)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DetailBookings::Table)
                    .if_not_exists()
                    .col(big_integer(DetailBookings::Id).auto_increment().primary_key())
                    .col(big_integer_uniq(DetailBookings::BookingId))
                    .col(date(DetailBookings::CheckIn))
                    .col(date(DetailBookings::CheckOut))
                    .col(integer(DetailBookings::NumberOfGuest))
                    .col(big_integer(DetailBookings::ServiceFeeId))
                    .col(string_len(DetailBookings::FeeType, 16))
                    .col(decimal_len(DetailBookings::FeeValue, 19, 4))
                    .col(integer(DetailBookings::Nights))
                    .col(decimal_len(DetailBookings::PricePerNight, 19, 4))
                    .col(decimal_len(DetailBookings::SubTotal, 19, 4))
                    .col(decimal_len(DetailBookings::Discount, 19, 4))
                    .col(decimal_len(DetailBookings::Fee, 19, 4))
                    .col(decimal_len(DetailBookings::Tax, 19, 4))
                    .col(decimal_len(DetailBookings::Total, 19, 4))
                    .col(text(DetailBookings::SelectedServices))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_detail_bookings_booking")
                            .from(DetailBookings::Table, DetailBookings::BookingId)
                            .to(Bookings::Table, Bookings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Vouchers::Table)
                    .if_not_exists()
                    .col(big_integer(Vouchers::Id).auto_increment().primary_key())
                    .col(timestamp_with_time_zone(Vouchers::CreationDate))
                    .col(big_integer(Vouchers::GuestId))
                    .col(big_integer_null(Vouchers::BookingId).unique_key())
                    .col(decimal_len(Vouchers::SubTotal, 19, 4))
                    .col(decimal_len(Vouchers::Discount, 19, 4))
                    .col(decimal_len(Vouchers::Fee, 19, 4))
                    .col(decimal_len(Vouchers::Tax, 19, 4))
                    .col(decimal_len(Vouchers::Total, 19, 4))
                    .col(string_len(Vouchers::State, 16))
                    .col(big_integer_null(Vouchers::PaymentMethodId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vouchers_booking")
                            .from(Vouchers::Table, Vouchers::BookingId)
                            .to(Bookings::Table, Bookings::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DetailVouchers::Table)
                    .if_not_exists()
                    .col(big_integer(DetailVouchers::Id).auto_increment().primary_key())
                    .col(big_integer_uniq(DetailVouchers::VoucherId))
                    .col(decimal_len(DetailVouchers::PriceNight, 19, 4))
                    .col(integer(DetailVouchers::NumberNights))
                    .col(decimal_len(DetailVouchers::SubTotal, 19, 4))
                    .col(text(DetailVouchers::Description))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_detail_vouchers_voucher")
                            .from(DetailVouchers::Table, DetailVouchers::VoucherId)
                            .to(Vouchers::Table, Vouchers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(big_integer(Transactions::Id).auto_increment().primary_key())
                    .col(big_integer(Transactions::VoucherId))
                    .col(big_integer(Transactions::HolderId))
                    .col(big_integer(Transactions::AccountId))
                    .col(string_len(Transactions::Kind, 16))
                    .col(decimal_len(Transactions::Amount, 19, 4).check(Expr::col(Transactions::Amount).gt(0)))
                    .col(big_integer_null(Transactions::Reverses).unique_key())
                    .col(timestamp_with_time_zone(Transactions::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_voucher")
                            .from(Transactions::Table, Transactions::VoucherId)
                            .to(Vouchers::Table, Vouchers::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_account")
                            .from(Transactions::Table, Transactions::AccountId)
                            .to(FinancialAccounts::Table, FinancialAccounts::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_voucher")
                    .table(Transactions::Table)
                    .col(Transactions::VoucherId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DetailVouchers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Vouchers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DetailBookings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Bookings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FinancialAccounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ServiceFees::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ServiceFees {
    Table,
    Id,
    Value,
    FeeType,
    PromCalificationMinimum,
    NumberBookingsMinimum,
}

#[derive(DeriveIden)]
enum FinancialAccounts {
    Table,
    Id,
    IdUser,
    BankName,
    NumberAccount,
    AvailableBalance,
}

#[derive(DeriveIden)]
enum Bookings {
    Table,
    Id,
    CreationDate,
    UpdateTime,
    State,
    TotalPrice,
    PaymentStatus,
    GuestId,
    AccommodationId,
    VoucherId,
    PaymentMethodId,
    CancellationReason,
    Version,
}

#[derive(DeriveIden)]
enum DetailBookings {
    Table,
    Id,
    BookingId,
    CheckIn,
    CheckOut,
    NumberOfGuest,
    ServiceFeeId,
    FeeType,
    FeeValue,
    Nights,
    PricePerNight,
    SubTotal,
    Discount,
    Fee,
    Tax,
    Total,
    SelectedServices,
}

#[derive(DeriveIden)]
enum Vouchers {
    Table,
    Id,
    CreationDate,
    GuestId,
    BookingId,
    SubTotal,
    Discount,
    Fee,
    Tax,
    Total,
    State,
    PaymentMethodId,
}

#[derive(DeriveIden)]
enum DetailVouchers {
    Table,
    Id,
    VoucherId,
    PriceNight,
    NumberNights,
    SubTotal,
    Description,
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    VoucherId,
    HolderId,
    AccountId,
    Kind,
    Amount,
    Reverses,
    CreatedAt,
}
