use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A stored cake order. At most one row exists per
/// (`customer_email`, `delivery_date`); see the unique index in the migrator.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub cake_type: String,
    pub cake_size: String,
    pub delivery_date: DateTime<Utc>,
    #[sea_orm(nullable)]
    pub special_instructions: Option<String>,
    pub order_status: String,
    /// Server time of the insert
    pub order_date: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
