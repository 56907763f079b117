use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    db::{DatabaseAccess, DbPool},
    entities::{
        customer_activity::{
            self, ActiveModel as CustomerActivityActiveModel, Entity as CustomerActivity,
        },
        Order, PriceTier,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::{ActivityDefinition, ActivityInstance, ActivityRecord},
    queries::{
        activity_statistics_queries::{
            ActivityStatistics, GetActivityStatisticsQuery, StatisticsOptions,
        },
        Query,
    },
    services::price_tiers::{effective_tiers_for, has_effective_tier},
};

/// A purchasable definition together with the tiers currently pricing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableActivity {
    pub definition: ActivityDefinition,
    /// Effective tiers, lowest `min_quantity` first
    pub price_tiers: Vec<PriceTier>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewActivityInstance {
    pub customer_id: String,
    pub activity_definition_id: String,
    pub order_id: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// Stored as given; not recomputed from quantity and unit price
    pub line_total: Decimal,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityInstanceUpdate {
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub line_total: Option<Decimal>,
}

/// Customer-scoped activity availability, instance lifecycle and statistics
#[derive(Clone)]
pub struct CustomerActivityService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl CustomerActivityService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Whether the customer can purchase the activity right now
    pub async fn is_activity_available_for_customer(
        &self,
        customer_id: &str,
        definition_id: &str,
    ) -> Result<bool, ServiceError> {
        self.is_activity_available_at(customer_id, definition_id, Utc::now())
            .await
    }

    /// Whether an effective tier exists for the pair at `as_of`
    #[instrument(skip(self))]
    pub async fn is_activity_available_at(
        &self,
        customer_id: &str,
        definition_id: &str,
        as_of: DateTime<Utc>,
    ) -> Result<bool, ServiceError> {
        Ok(has_effective_tier(&*self.db_pool, customer_id, definition_id, as_of).await?)
    }

    pub async fn list_available_activities_for_customer(
        &self,
        customer_id: &str,
    ) -> Result<Vec<AvailableActivity>, ServiceError> {
        self.list_available_activities_at(customer_id, Utc::now())
            .await
    }

    /// Active definitions with at least one effective tier, ordered by name.
    ///
    /// Availability is price-driven: an active definition without a current
    /// tier is left out, and so is an inactive one that still has tiers.
    #[instrument(skip(self))]
    pub async fn list_available_activities_at(
        &self,
        customer_id: &str,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<AvailableActivity>, ServiceError> {
        let db = &*self.db_pool;

        let definitions: Vec<ActivityDefinition> = CustomerActivity::find()
            .filter(customer_activity::Column::CustomerId.eq(customer_id))
            .filter(customer_activity::Column::OrderId.is_null())
            .filter(customer_activity::Column::IsActive.eq(true))
            .order_by_asc(customer_activity::Column::Name)
            .all(db)
            .await?
            .into_iter()
            .filter_map(|row| ActivityRecord::from(row).into_definition())
            .collect();

        if definitions.is_empty() {
            return Ok(Vec::new());
        }

        let ids = definitions.iter().map(|d| d.id.clone()).collect();
        let mut tiers_by_definition: HashMap<String, Vec<PriceTier>> = HashMap::new();
        for tier in effective_tiers_for(db, customer_id, ids, as_of).await? {
            tiers_by_definition
                .entry(tier.activity_definition_id.clone())
                .or_default()
                .push(tier);
        }

        let available: Vec<AvailableActivity> = definitions
            .into_iter()
            .filter_map(|definition| {
                tiers_by_definition
                    .remove(&definition.id)
                    .map(|price_tiers| AvailableActivity {
                        definition,
                        price_tiers,
                    })
            })
            .collect();

        debug!(count = available.len(), "Resolved available activities");
        Ok(available)
    }

    /// True iff every distinct id names a row owned by the customer.
    #[instrument(skip(self, ids), fields(id_count = ids.len()))]
    pub async fn validate_ownership(
        &self,
        customer_id: &str,
        ids: &[String],
    ) -> Result<bool, ServiceError> {
        let unique: BTreeSet<&str> = ids.iter().map(String::as_str).collect();
        if unique.is_empty() {
            return Ok(true);
        }

        let owned = CustomerActivity::find()
            .filter(customer_activity::Column::Id.is_in(unique.iter().copied()))
            .filter(customer_activity::Column::CustomerId.eq(customer_id))
            .count(&*self.db_pool)
            .await?;

        let all_owned = owned == unique.len() as u64;
        if !all_owned {
            warn!(owned, requested = unique.len(), "Ownership check failed");
        }
        Ok(all_owned)
    }

    /// Active instances of the order, newest first.
    ///
    /// Instances are also filtered by the order's owner, so a row pointing at
    /// the order under another customer is never returned.
    #[instrument(skip(self))]
    pub async fn list_order_activities(
        &self,
        order_id: &str,
    ) -> Result<Vec<ActivityInstance>, ServiceError> {
        let db = &*self.db_pool;

        let order = Order::find_by_id(order_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let rows = CustomerActivity::find()
            .filter(customer_activity::Column::OrderId.eq(order.id.as_str()))
            .filter(customer_activity::Column::CustomerId.eq(order.customer_id.as_str()))
            .filter(customer_activity::Column::IsActive.eq(true))
            .order_by_desc(customer_activity::Column::CreatedAt)
            .all(db)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| ActivityRecord::from(row).into_instance())
            .collect())
    }

    /// Records consumption of a definition on an order.
    ///
    /// Checks run inside one transaction, in this order: an effective tier
    /// exists, the id names a definition, the order belongs to the customer.
    #[instrument(
        skip(self, request),
        fields(
            customer_id = %request.customer_id,
            definition_id = %request.activity_definition_id
        )
    )]
    pub async fn create_activity_instance(
        &self,
        request: NewActivityInstance,
    ) -> Result<ActivityInstance, ServiceError> {
        let now = Utc::now();
        let model = DatabaseAccess::new(self.db_pool.clone())
            .transaction(move |txn| Box::pin(insert_instance(txn, request, now)))
            .await?;

        let instance = into_instance(model)?;
        info!(
            instance_id = %instance.id,
            order_id = %instance.order_id,
            "Activity instance created"
        );
        self.publish(Event::ActivityInstanceCreated {
            instance_id: instance.id.clone(),
            customer_id: instance.customer_id.clone(),
            order_id: instance.order_id.clone(),
            line_total: instance.line_total,
        });
        Ok(instance)
    }

    /// Applies the supplied amounts; `line_total` is never recomputed
    #[instrument(skip(self, update))]
    pub async fn update_activity_instance(
        &self,
        instance_id: &str,
        customer_id: &str,
        update: ActivityInstanceUpdate,
    ) -> Result<ActivityInstance, ServiceError> {
        let instance = self.find_owned_instance(instance_id, customer_id).await?;

        let mut active = customer_activity::Model::from(instance).into_active_model();
        if let Some(quantity) = update.quantity {
            active.quantity = Set(quantity);
        }
        if let Some(unit_price) = update.unit_price {
            active.unit_price = Set(unit_price);
        }
        if let Some(line_total) = update.line_total {
            active.line_total = Set(line_total);
        }
        active.updated_at = Set(Utc::now());

        let instance = into_instance(active.update(&*self.db_pool).await?)?;
        info!(instance_id = %instance.id, "Activity instance updated");
        self.publish(Event::ActivityInstanceUpdated {
            instance_id: instance.id.clone(),
            customer_id: instance.customer_id.clone(),
        });
        Ok(instance)
    }

    /// Soft delete; the row keeps counting for history but drops out of statistics
    #[instrument(skip(self))]
    pub async fn deactivate_activity_instance(
        &self,
        instance_id: &str,
        customer_id: &str,
    ) -> Result<ActivityInstance, ServiceError> {
        let instance = self.find_owned_instance(instance_id, customer_id).await?;

        let mut active = customer_activity::Model::from(instance).into_active_model();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());

        let instance = into_instance(active.update(&*self.db_pool).await?)?;
        info!(instance_id = %instance.id, "Activity instance deactivated");
        self.publish(Event::ActivityInstanceDeactivated {
            instance_id: instance.id.clone(),
            customer_id: instance.customer_id.clone(),
        });
        Ok(instance)
    }

    pub async fn get_activity_statistics(
        &self,
        customer_id: &str,
        options: StatisticsOptions,
    ) -> Result<Vec<ActivityStatistics>, ServiceError> {
        let query = GetActivityStatisticsQuery {
            customer_id: customer_id.to_string(),
            options,
        };
        query
            .execute(&DatabaseAccess::new(self.db_pool.clone()))
            .await
    }

    /// Ownership is part of the lookup, so foreign and missing rows look the same.
    async fn find_owned_instance(
        &self,
        instance_id: &str,
        customer_id: &str,
    ) -> Result<ActivityInstance, ServiceError> {
        CustomerActivity::find_by_id(instance_id.to_string())
            .filter(customer_activity::Column::CustomerId.eq(customer_id))
            .one(&*self.db_pool)
            .await?
            .and_then(|row| ActivityRecord::from(row).into_instance())
            .ok_or_else(|| {
                ServiceError::NotFoundOrAccessDenied(format!("Activity instance {}", instance_id))
            })
    }

    fn publish(&self, event: Event) {
        if let Some(event_sender) = &self.event_sender {
            event_sender.send_or_log(event);
        }
    }
}

async fn insert_instance(
    txn: &DatabaseTransaction,
    request: NewActivityInstance,
    now: DateTime<Utc>,
) -> Result<customer_activity::Model, ServiceError> {
    if !has_effective_tier(
        txn,
        &request.customer_id,
        &request.activity_definition_id,
        now,
    )
    .await?
    {
        return Err(ServiceError::ActivityNotAvailable(format!(
            "Activity {} is not available for customer {}",
            request.activity_definition_id, request.customer_id
        )));
    }

    let definition = match CustomerActivity::find_by_id(request.activity_definition_id.clone())
        .one(txn)
        .await?
        .map(ActivityRecord::from)
    {
        Some(ActivityRecord::Definition(definition)) => definition,
        Some(ActivityRecord::Instance(_)) | None => {
            return Err(ServiceError::InvalidDefinition(format!(
                "{} is not an activity definition",
                request.activity_definition_id
            )));
        }
    };

    let order = Order::find_by_id(request.order_id.clone()).one(txn).await?;
    if order.map_or(true, |order| order.customer_id != request.customer_id) {
        return Err(ServiceError::OrderCustomerMismatch(format!(
            "Order {} does not belong to customer {}",
            request.order_id, request.customer_id
        )));
    }

    CustomerActivityActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        customer_id: Set(request.customer_id),
        order_id: Set(Some(request.order_id)),
        name: Set(definition.name),
        activity_type: Set(definition.activity_type),
        code: Set(definition.code),
        description: Set(definition.description),
        unit: Set(definition.unit),
        quantity: Set(request.quantity),
        unit_price: Set(request.unit_price),
        line_total: Set(request.line_total),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(txn)
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to insert activity instance");
        ServiceError::DatabaseError(e)
    })
}

fn into_instance(model: customer_activity::Model) -> Result<ActivityInstance, ServiceError> {
    let id = model.id.clone();
    ActivityRecord::from(model)
        .into_instance()
        .ok_or_else(|| {
            ServiceError::InternalError(format!("Row {} is not an activity instance", id))
        })
}
