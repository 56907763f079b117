use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Quantity-banded, time-bounded price for one (customer, definition) pair.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "customer_activity_prices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub customer_id: String,
    pub activity_definition_id: String,
    pub min_quantity: Decimal,
    /// `None` leaves the band open upwards
    pub max_quantity: Option<Decimal>,
    pub unit_price: Decimal,
    pub currency: String,
    pub effective_from: DateTime<Utc>,
    /// `None` keeps the tier effective indefinitely
    pub effective_to: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customer_activity::Entity",
        from = "Column::ActivityDefinitionId",
        to = "super::customer_activity::Column::Id"
    )]
    ActivityDefinition,
}

impl Related<super::customer_activity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ActivityDefinition.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
