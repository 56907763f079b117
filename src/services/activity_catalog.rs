use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::customer_activity::{
        self, ActiveModel as CustomerActivityActiveModel, ActivityType, Entity as CustomerActivity,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::{ActivityDefinition, ActivityRecord},
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewActivityDefinition {
    #[validate(length(min = 1))]
    pub customer_id: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub activity_type: ActivityType,
    #[validate(length(max = 64))]
    pub code: Option<String>,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub unit: String,
}

/// Manages the catalog half of the shared activity table.
#[derive(Clone)]
pub struct ActivityCatalogService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl ActivityCatalogService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(
        skip(self, request),
        fields(customer_id = %request.customer_id, name = %request.name)
    )]
    pub async fn create_definition(
        &self,
        request: NewActivityDefinition,
    ) -> Result<ActivityDefinition, ServiceError> {
        request.validate()?;

        let now = Utc::now();
        let model = CustomerActivityActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            customer_id: Set(request.customer_id),
            order_id: Set(None),
            name: Set(request.name),
            activity_type: Set(request.activity_type),
            code: Set(request.code),
            description: Set(request.description),
            unit: Set(request.unit),
            quantity: Set(Decimal::ZERO),
            unit_price: Set(Decimal::ZERO),
            line_total: Set(Decimal::ZERO),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?;

        let definition = into_definition(model)?;
        info!(definition_id = %definition.id, "Activity definition created");
        self.publish(Event::ActivityDefinitionCreated {
            definition_id: definition.id.clone(),
            customer_id: definition.customer_id.clone(),
        });
        Ok(definition)
    }

    /// Definitions of the customer ordered by name
    #[instrument(skip(self))]
    pub async fn list_definitions(
        &self,
        customer_id: &str,
        include_inactive: bool,
    ) -> Result<Vec<ActivityDefinition>, ServiceError> {
        let mut select = CustomerActivity::find()
            .filter(customer_activity::Column::CustomerId.eq(customer_id))
            .filter(customer_activity::Column::OrderId.is_null());
        if !include_inactive {
            select = select.filter(customer_activity::Column::IsActive.eq(true));
        }

        let rows = select
            .order_by_asc(customer_activity::Column::Name)
            .all(&*self.db_pool)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| ActivityRecord::from(row).into_definition())
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn get_definition(
        &self,
        definition_id: &str,
        customer_id: &str,
    ) -> Result<ActivityDefinition, ServiceError> {
        CustomerActivity::find_by_id(definition_id.to_string())
            .filter(customer_activity::Column::CustomerId.eq(customer_id))
            .one(&*self.db_pool)
            .await?
            .and_then(|row| ActivityRecord::from(row).into_definition())
            .ok_or_else(|| {
                ServiceError::NotFoundOrAccessDenied(format!(
                    "Activity definition {}",
                    definition_id
                ))
            })
    }

    /// Soft-deactivates the definition; its tiers and past instances are kept
    #[instrument(skip(self))]
    pub async fn deactivate_definition(
        &self,
        definition_id: &str,
        customer_id: &str,
    ) -> Result<ActivityDefinition, ServiceError> {
        let definition = self.get_definition(definition_id, customer_id).await?;

        let mut active = customer_activity::Model::from(definition).into_active_model();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        let definition = into_definition(active.update(&*self.db_pool).await?)?;

        info!(definition_id = %definition.id, "Activity definition deactivated");
        self.publish(Event::ActivityDefinitionDeactivated {
            definition_id: definition.id.clone(),
            customer_id: definition.customer_id.clone(),
        });
        Ok(definition)
    }

    fn publish(&self, event: Event) {
        if let Some(event_sender) = &self.event_sender {
            event_sender.send_or_log(event);
        }
    }
}

fn into_definition(model: customer_activity::Model) -> Result<ActivityDefinition, ServiceError> {
    let id = model.id.clone();
    ActivityRecord::from(model).into_definition().ok_or_else(|| {
        ServiceError::InternalError(format!("Row {} is not an activity definition", id))
    })
}
