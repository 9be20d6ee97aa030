//! `SeaORM` Entity for bookings table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "bookings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub creation_date: DateTimeUtc,
    pub update_time: DateTimeUtc,
    pub state: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total_price: Decimal,
    pub payment_status: bool,
    pub guest_id: i64,
    pub accommodation_id: i64,
    pub voucher_id: Option<i64>,
    pub payment_method_id: Option<i64>,
    pub cancellation_reason: Option<String>,
    pub version: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::detail_bookings::Entity")]
    DetailBookings,
    #[sea_orm(has_one = "super::vouchers::Entity")]
    Vouchers,
}

impl Related<super::detail_bookings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DetailBookings.def()
    }
}

impl Related<super::vouchers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vouchers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
