//! `SeaORM` entity definitions for the booking schema.

pub mod bookings;
pub mod detail_bookings;
pub mod detail_vouchers;
pub mod financial_accounts;
pub mod service_fees;
pub mod transactions;
pub mod vouchers;
