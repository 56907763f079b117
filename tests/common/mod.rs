#![allow(dead_code)]

use std::sync::Arc;

use activity_pricing::{
    db::{self, DbConfig, DbPool},
    entities::{
        customer_activity::{self, ActivityType},
        customer_activity_price, order,
    },
    events::{Event, EventSender},
    services::{ActivityCatalogService, CustomerActivityService, PriceTierService},
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Services wired to a fresh, migrated in-memory SQLite database.
pub struct TestContext {
    pub db: Arc<DbPool>,
    pub activities: CustomerActivityService,
    pub catalog: ActivityCatalogService,
    pub tiers: PriceTierService,
    pub events: mpsc::Receiver<Event>,
}

impl TestContext {
    pub async fn new() -> Self {
        let pool = db::establish_connection_with_config(&DbConfig::single_connection(
            "sqlite::memory:",
        ))
        .await
        .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db = Arc::new(pool);
        let (tx, events) = mpsc::channel(64);
        let sender = Arc::new(EventSender::new(tx));

        Self {
            activities: CustomerActivityService::new(db.clone(), Some(sender.clone())),
            catalog: ActivityCatalogService::new(db.clone(), Some(sender.clone())),
            tiers: PriceTierService::new(db.clone(), Some(sender), "EUR"),
            db,
            events,
        }
    }

    /// Rows in `customer_activities`, definitions and instances alike.
    pub async fn activity_row_count(&self) -> u64 {
        customer_activity::Entity::find()
            .count(&*self.db)
            .await
            .expect("count activity rows")
    }

    /// Rows in `customer_activity_prices`.
    pub async fn price_tier_count(&self) -> u64 {
        customer_activity_price::Entity::find()
            .count(&*self.db)
            .await
            .expect("count price tiers")
    }

    /// Events published so far, in order.
    pub fn drain_events(&mut self) -> Vec<Event> {
        let mut seen = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            seen.push(event);
        }
        seen
    }

    pub async fn seed_order(&self, order_id: &str, customer_id: &str) {
        let at = ts(2024, 1, 1);
        order::ActiveModel {
            id: Set(order_id.to_string()),
            customer_id: Set(customer_id.to_string()),
            order_number: Set(format!("ORD-{}", order_id)),
            status: Set("open".to_string()),
            created_at: Set(at),
            updated_at: Set(at),
        }
        .insert(&*self.db)
        .await
        .expect("seed order");
    }

    /// Active catalog definition with code `None`.
    pub async fn seed_definition(&self, customer_id: &str, name: &str, unit: &str) -> String {
        self.seed_definition_with(customer_id, name, ActivityType::Other, None, unit, true)
            .await
    }

    pub async fn seed_definition_with(
        &self,
        customer_id: &str,
        name: &str,
        activity_type: ActivityType,
        code: Option<&str>,
        unit: &str,
        is_active: bool,
    ) -> String {
        let id = Uuid::new_v4().to_string();
        let at = ts(2024, 1, 1);
        customer_activity::ActiveModel {
            id: Set(id.clone()),
            customer_id: Set(customer_id.to_string()),
            order_id: Set(None),
            name: Set(name.to_string()),
            activity_type: Set(activity_type),
            code: Set(code.map(str::to_string)),
            description: Set(Some(format!("{} service", name))),
            unit: Set(unit.to_string()),
            quantity: Set(Decimal::ZERO),
            unit_price: Set(Decimal::ZERO),
            line_total: Set(Decimal::ZERO),
            is_active: Set(is_active),
            created_at: Set(at),
            updated_at: Set(at),
        }
        .insert(&*self.db)
        .await
        .expect("seed definition");
        id
    }

    /// Inserts a tier directly, skipping the service's validation.
    pub async fn seed_tier(
        &self,
        customer_id: &str,
        definition_id: &str,
        min_quantity: Decimal,
        max_quantity: Option<Decimal>,
        unit_price: Decimal,
        effective_from: DateTime<Utc>,
        effective_to: Option<DateTime<Utc>>,
    ) -> String {
        let id = Uuid::new_v4().to_string();
        customer_activity_price::ActiveModel {
            id: Set(id.clone()),
            customer_id: Set(customer_id.to_string()),
            activity_definition_id: Set(definition_id.to_string()),
            min_quantity: Set(min_quantity),
            max_quantity: Set(max_quantity),
            unit_price: Set(unit_price),
            currency: Set("EUR".to_string()),
            effective_from: Set(effective_from),
            effective_to: Set(effective_to),
            is_active: Set(true),
            created_at: Set(effective_from),
            updated_at: Set(effective_from),
        }
        .insert(&*self.db)
        .await
        .expect("seed tier");
        id
    }

    /// Open-ended tier that started a day ago, covering every quantity.
    pub async fn seed_current_tier(
        &self,
        customer_id: &str,
        definition_id: &str,
        unit_price: Decimal,
    ) -> String {
        self.seed_tier(
            customer_id,
            definition_id,
            Decimal::ZERO,
            None,
            unit_price,
            Utc::now() - Duration::days(1),
            None,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn seed_instance(
        &self,
        customer_id: &str,
        order_id: &str,
        name: &str,
        code: Option<&str>,
        unit: &str,
        activity_type: ActivityType,
        quantity: Decimal,
        unit_price: Decimal,
        line_total: Decimal,
        created_at: DateTime<Utc>,
    ) -> String {
        let id = Uuid::new_v4().to_string();
        customer_activity::ActiveModel {
            id: Set(id.clone()),
            customer_id: Set(customer_id.to_string()),
            order_id: Set(Some(order_id.to_string())),
            name: Set(name.to_string()),
            activity_type: Set(activity_type),
            code: Set(code.map(str::to_string)),
            description: Set(None),
            unit: Set(unit.to_string()),
            quantity: Set(quantity),
            unit_price: Set(unit_price),
            line_total: Set(line_total),
            is_active: Set(true),
            created_at: Set(created_at),
            updated_at: Set(created_at),
        }
        .insert(&*self.db)
        .await
        .expect("seed instance");
        id
    }
}

/// Midnight UTC on the given day.
pub fn ts(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}
