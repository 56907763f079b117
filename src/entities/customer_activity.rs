use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Closed set of activity kinds a customer can be billed for.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::AsRefStr,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    #[sea_orm(string_value = "CONTAINER_UNLOADING")]
    ContainerUnloading,
    #[sea_orm(string_value = "WRAPPING")]
    Wrapping,
    #[sea_orm(string_value = "REPACKING")]
    Repacking,
    #[sea_orm(string_value = "CROSSING")]
    Crossing,
    #[sea_orm(string_value = "LABELING")]
    Labeling,
    #[sea_orm(string_value = "OTHER")]
    Other,
}

impl ActivityType {
    /// Wire and storage spelling, e.g. `CONTAINER_UNLOADING`
    pub fn as_str(&self) -> &str {
        self.as_ref()
    }
}

/// Row of the shared definition/instance table.
///
/// `order_id == None` marks a catalog definition, `Some(_)` a consumed instance.
/// Use [`crate::models::ActivityRecord`] instead of inspecting the column directly.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "customer_activities")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub customer_id: String,
    pub order_id: Option<String>,
    pub name: String,
    pub activity_type: ActivityType,
    pub code: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub unit: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
    #[sea_orm(has_many = "super::customer_activity_price::Entity")]
    PriceTiers,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::customer_activity_price::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PriceTiers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
