//! Typed view over the shared `customer_activities` table.
//!
//! A row is either a catalog definition (no order) or an instance consumed on an
//! order. Services convert every loaded row into [`ActivityRecord`] and match on
//! the variant, so a definition can never be mutated as if it were an instance.

use crate::entities::customer_activity::{ActivityType, Model};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Catalog entry: "this activity can be purchased by the customer".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityDefinition {
    pub id: String,
    pub customer_id: String,
    pub name: String,
    pub activity_type: ActivityType,
    pub code: Option<String>,
    pub description: Option<String>,
    pub unit: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Line item: "this activity was consumed on an order".
///
/// Name, type, code, description and unit are copies taken from the definition
/// at creation time and stay untouched when the definition changes later.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityInstance {
    pub id: String,
    pub customer_id: String,
    pub order_id: String,
    pub name: String,
    pub activity_type: ActivityType,
    pub code: Option<String>,
    pub description: Option<String>,
    pub unit: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActivityRecord {
    Definition(ActivityDefinition),
    Instance(ActivityInstance),
}

impl ActivityRecord {
    pub fn id(&self) -> &str {
        match self {
            ActivityRecord::Definition(definition) => &definition.id,
            ActivityRecord::Instance(instance) => &instance.id,
        }
    }

    pub fn customer_id(&self) -> &str {
        match self {
            ActivityRecord::Definition(definition) => &definition.customer_id,
            ActivityRecord::Instance(instance) => &instance.customer_id,
        }
    }

    pub fn into_definition(self) -> Option<ActivityDefinition> {
        match self {
            ActivityRecord::Definition(definition) => Some(definition),
            ActivityRecord::Instance(_) => None,
        }
    }

    pub fn into_instance(self) -> Option<ActivityInstance> {
        match self {
            ActivityRecord::Instance(instance) => Some(instance),
            ActivityRecord::Definition(_) => None,
        }
    }
}

impl From<Model> for ActivityRecord {
    fn from(model: Model) -> Self {
        match model.order_id {
            None => ActivityRecord::Definition(ActivityDefinition {
                id: model.id,
                customer_id: model.customer_id,
                name: model.name,
                activity_type: model.activity_type,
                code: model.code,
                description: model.description,
                unit: model.unit,
                is_active: model.is_active,
                created_at: model.created_at,
                updated_at: model.updated_at,
            }),
            Some(order_id) => ActivityRecord::Instance(ActivityInstance {
                id: model.id,
                customer_id: model.customer_id,
                order_id,
                name: model.name,
                activity_type: model.activity_type,
                code: model.code,
                description: model.description,
                unit: model.unit,
                quantity: model.quantity,
                unit_price: model.unit_price,
                line_total: model.line_total,
                is_active: model.is_active,
                created_at: model.created_at,
                updated_at: model.updated_at,
            }),
        }
    }
}

impl From<ActivityDefinition> for Model {
    fn from(definition: ActivityDefinition) -> Self {
        Model {
            id: definition.id,
            customer_id: definition.customer_id,
            order_id: None,
            name: definition.name,
            activity_type: definition.activity_type,
            code: definition.code,
            description: definition.description,
            unit: definition.unit,
            quantity: Decimal::ZERO,
            unit_price: Decimal::ZERO,
            line_total: Decimal::ZERO,
            is_active: definition.is_active,
            created_at: definition.created_at,
            updated_at: definition.updated_at,
        }
    }
}

impl From<ActivityInstance> for Model {
    fn from(instance: ActivityInstance) -> Self {
        Model {
            id: instance.id,
            customer_id: instance.customer_id,
            order_id: Some(instance.order_id),
            name: instance.name,
            activity_type: instance.activity_type,
            code: instance.code,
            description: instance.description,
            unit: instance.unit,
            quantity: instance.quantity,
            unit_price: instance.unit_price,
            line_total: instance.line_total,
            is_active: instance.is_active,
            created_at: instance.created_at,
            updated_at: instance.updated_at,
        }
    }
}
