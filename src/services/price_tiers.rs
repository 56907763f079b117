use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseTransaction, DbErr,
    EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    config::validate_currency,
    db::{DatabaseAccess, DbPool},
    entities::{
        customer_activity::Entity as CustomerActivity,
        customer_activity_price::{
            self, ActiveModel as PriceTierActiveModel, Entity as CustomerActivityPrice,
        },
        PriceTier,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::ActivityRecord,
};

/// Tier predicate shared by availability checks, listings and resolution:
/// active, started at or before `at`, and not ended before `at`.
pub(crate) fn effective_at(at: DateTime<Utc>) -> Condition {
    Condition::all()
        .add(customer_activity_price::Column::IsActive.eq(true))
        .add(customer_activity_price::Column::EffectiveFrom.lte(at))
        .add(
            Condition::any()
                .add(customer_activity_price::Column::EffectiveTo.is_null())
                .add(customer_activity_price::Column::EffectiveTo.gte(at)),
        )
}

/// Whether any tier makes the definition purchasable for the customer at `at`.
pub(crate) async fn has_effective_tier<C: ConnectionTrait>(
    db: &C,
    customer_id: &str,
    definition_id: &str,
    at: DateTime<Utc>,
) -> Result<bool, DbErr> {
    let count = CustomerActivityPrice::find()
        .filter(customer_activity_price::Column::CustomerId.eq(customer_id))
        .filter(customer_activity_price::Column::ActivityDefinitionId.eq(definition_id))
        .filter(effective_at(at))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// Effective tiers of the customer for the given definitions, lowest band first.
pub(crate) async fn effective_tiers_for<C: ConnectionTrait>(
    db: &C,
    customer_id: &str,
    definition_ids: Vec<String>,
    at: DateTime<Utc>,
) -> Result<Vec<PriceTier>, DbErr> {
    CustomerActivityPrice::find()
        .filter(customer_activity_price::Column::CustomerId.eq(customer_id))
        .filter(customer_activity_price::Column::ActivityDefinitionId.is_in(definition_ids))
        .filter(effective_at(at))
        .order_by_asc(customer_activity_price::Column::MinQuantity)
        .all(db)
        .await
}

/// Inclusive interval intersection where `None` means unbounded above.
fn ranges_overlap<T: PartialOrd + Copy>(a: (T, Option<T>), b: (T, Option<T>)) -> bool {
    let a_reaches_b = a.1.map_or(true, |a_end| b.0 <= a_end);
    let b_reaches_a = b.1.map_or(true, |b_end| a.0 <= b_end);
    a_reaches_b && b_reaches_a
}

/// Two tiers collide when both their quantity bands and their windows intersect.
fn tiers_collide(existing: &PriceTier, candidate: &NewPriceTier) -> bool {
    ranges_overlap(
        (existing.min_quantity, existing.max_quantity),
        (candidate.min_quantity, candidate.max_quantity),
    ) && ranges_overlap(
        (existing.effective_from, existing.effective_to),
        (candidate.effective_from, candidate.effective_to),
    )
}

/// Definition and overlap checks plus the insert, run on one transaction.
async fn insert_tier(
    txn: &DatabaseTransaction,
    request: NewPriceTier,
    currency: String,
    now: DateTime<Utc>,
) -> Result<PriceTier, ServiceError> {
    let definition = match CustomerActivity::find_by_id(request.activity_definition_id.clone())
        .one(txn)
        .await?
        .map(ActivityRecord::from)
    {
        Some(ActivityRecord::Definition(definition)) => definition,
        Some(ActivityRecord::Instance(_)) | None => {
            return Err(ServiceError::InvalidDefinition(format!(
                "Activity definition {} not found",
                request.activity_definition_id
            )));
        }
    };
    if definition.customer_id != request.customer_id {
        return Err(ServiceError::OwnershipMismatch(format!(
            "Activity definition {} does not belong to customer {}",
            definition.id, request.customer_id
        )));
    }

    let existing = CustomerActivityPrice::find()
        .filter(customer_activity_price::Column::CustomerId.eq(request.customer_id.as_str()))
        .filter(
            customer_activity_price::Column::ActivityDefinitionId
                .eq(request.activity_definition_id.as_str()),
        )
        .filter(customer_activity_price::Column::IsActive.eq(true))
        .all(txn)
        .await?;
    if let Some(clash) = existing.iter().find(|tier| tiers_collide(tier, &request)) {
        warn!(existing_tier_id = %clash.id, "Rejecting overlapping price tier");
        return Err(ServiceError::Conflict(format!(
            "Price tier overlaps existing tier {}",
            clash.id
        )));
    }

    PriceTierActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        customer_id: Set(request.customer_id),
        activity_definition_id: Set(request.activity_definition_id),
        min_quantity: Set(request.min_quantity),
        max_quantity: Set(request.max_quantity),
        unit_price: Set(request.unit_price),
        currency: Set(currency),
        effective_from: Set(request.effective_from),
        effective_to: Set(request.effective_to),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(txn)
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to insert price tier");
        ServiceError::DatabaseError(e)
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPriceTier {
    pub customer_id: String,
    pub activity_definition_id: String,
    pub min_quantity: Decimal,
    pub max_quantity: Option<Decimal>,
    pub unit_price: Decimal,
    /// Falls back to the service's default currency
    pub currency: Option<String>,
    pub effective_from: DateTime<Utc>,
    pub effective_to: Option<DateTime<Utc>>,
}

impl NewPriceTier {
    fn check_bounds(&self) -> Result<(), ServiceError> {
        if self.min_quantity < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "min_quantity must not be negative".to_string(),
            ));
        }
        if let Some(max) = self.max_quantity {
            if max < self.min_quantity {
                return Err(ServiceError::ValidationError(
                    "max_quantity must not be below min_quantity".to_string(),
                ));
            }
        }
        if self.unit_price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "unit_price must not be negative".to_string(),
            ));
        }
        if let Some(to) = self.effective_to {
            if to < self.effective_from {
                return Err(ServiceError::ValidationError(
                    "effective_to must not precede effective_from".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Price for a concrete quantity, derived from the resolved tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub tier_id: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub currency: String,
    pub line_total: Decimal,
}

/// Service for managing quantity-banded, time-bounded customer prices
#[derive(Clone)]
pub struct PriceTierService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
    default_currency: String,
}

impl PriceTierService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Option<Arc<EventSender>>,
        default_currency: impl Into<String>,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            default_currency: default_currency.into(),
        }
    }

    /// Creates a tier after validating its bounds, its definition and overlaps
    #[instrument(
        skip(self, request),
        fields(
            customer_id = %request.customer_id,
            definition_id = %request.activity_definition_id
        )
    )]
    pub async fn create_price_tier(
        &self,
        request: NewPriceTier,
    ) -> Result<PriceTier, ServiceError> {
        request.check_bounds()?;
        let currency = request
            .currency
            .clone()
            .unwrap_or_else(|| self.default_currency.clone());
        validate_currency(&currency)
            .map_err(|_| ServiceError::ValidationError(format!("Invalid currency: {}", currency)))?;

        let now = Utc::now();
        let tier = DatabaseAccess::new(self.db_pool.clone())
            .transaction(move |txn| Box::pin(insert_tier(txn, request, currency, now)))
            .await?;

        info!(tier_id = %tier.id, "Price tier created");
        self.publish(Event::PriceTierCreated {
            tier_id: tier.id.clone(),
            customer_id: tier.customer_id.clone(),
            activity_definition_id: tier.activity_definition_id.clone(),
        });

        Ok(tier)
    }

    /// All tiers of the pair, newest `effective_from` first
    #[instrument(skip(self))]
    pub async fn list_price_tiers(
        &self,
        customer_id: &str,
        definition_id: &str,
    ) -> Result<Vec<PriceTier>, ServiceError> {
        let tiers = CustomerActivityPrice::find()
            .filter(customer_activity_price::Column::CustomerId.eq(customer_id))
            .filter(customer_activity_price::Column::ActivityDefinitionId.eq(definition_id))
            .order_by_desc(customer_activity_price::Column::EffectiveFrom)
            .order_by_asc(customer_activity_price::Column::MinQuantity)
            .all(&*self.db_pool)
            .await?;
        Ok(tiers)
    }

    #[instrument(skip(self))]
    pub async fn deactivate_price_tier(
        &self,
        tier_id: &str,
        customer_id: &str,
    ) -> Result<PriceTier, ServiceError> {
        let tier = self.find_owned(tier_id, customer_id).await?;

        let mut active = tier.into_active_model();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        let tier = active.update(&*self.db_pool).await?;

        info!(tier_id = %tier.id, "Price tier deactivated");
        self.publish(Event::PriceTierDeactivated {
            tier_id: tier.id.clone(),
            customer_id: tier.customer_id.clone(),
        });
        Ok(tier)
    }

    /// Closes the tier's window at `at`
    #[instrument(skip(self))]
    pub async fn expire_price_tier(
        &self,
        tier_id: &str,
        customer_id: &str,
        at: DateTime<Utc>,
    ) -> Result<PriceTier, ServiceError> {
        let tier = self.find_owned(tier_id, customer_id).await?;
        if at < tier.effective_from {
            return Err(ServiceError::ValidationError(format!(
                "Cannot expire tier {} before it becomes effective",
                tier.id
            )));
        }

        let mut active = tier.into_active_model();
        active.effective_to = Set(Some(at));
        active.updated_at = Set(Utc::now());
        let tier = active.update(&*self.db_pool).await?;

        info!(tier_id = %tier.id, effective_to = %at, "Price tier expired");
        self.publish(Event::PriceTierExpired {
            tier_id: tier.id.clone(),
            customer_id: tier.customer_id.clone(),
            effective_to: at,
        });
        Ok(tier)
    }

    /// The effective tier whose band contains `quantity`, if any.
    ///
    /// Ties go to the latest `effective_from`, then the highest `min_quantity`.
    #[instrument(skip(self))]
    pub async fn resolve_price_tier(
        &self,
        customer_id: &str,
        definition_id: &str,
        quantity: Decimal,
        as_of: DateTime<Utc>,
    ) -> Result<Option<PriceTier>, ServiceError> {
        let tier = CustomerActivityPrice::find()
            .filter(customer_activity_price::Column::CustomerId.eq(customer_id))
            .filter(customer_activity_price::Column::ActivityDefinitionId.eq(definition_id))
            .filter(effective_at(as_of))
            .filter(customer_activity_price::Column::MinQuantity.lte(quantity))
            .filter(
                Condition::any()
                    .add(customer_activity_price::Column::MaxQuantity.is_null())
                    .add(customer_activity_price::Column::MaxQuantity.gte(quantity)),
            )
            .order_by_desc(customer_activity_price::Column::EffectiveFrom)
            .order_by_desc(customer_activity_price::Column::MinQuantity)
            .one(&*self.db_pool)
            .await?;
        Ok(tier)
    }

    #[instrument(skip(self))]
    pub async fn quote(
        &self,
        customer_id: &str,
        definition_id: &str,
        quantity: Decimal,
        as_of: DateTime<Utc>,
    ) -> Result<PriceQuote, ServiceError> {
        let tier = self
            .resolve_price_tier(customer_id, definition_id, quantity, as_of)
            .await?
            .ok_or_else(|| {
                ServiceError::ActivityNotAvailable(format!(
                    "No effective price for activity {} at quantity {}",
                    definition_id, quantity
                ))
            })?;

        Ok(PriceQuote {
            line_total: quantity * tier.unit_price,
            tier_id: tier.id,
            quantity,
            unit_price: tier.unit_price,
            currency: tier.currency,
        })
    }

    async fn find_owned(
        &self,
        tier_id: &str,
        customer_id: &str,
    ) -> Result<PriceTier, ServiceError> {
        CustomerActivityPrice::find_by_id(tier_id.to_string())
            .filter(customer_activity_price::Column::CustomerId.eq(customer_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFoundOrAccessDenied(format!("Price tier {}", tier_id)))
    }

    fn publish(&self, event: Event) {
        if let Some(event_sender) = &self.event_sender {
            event_sender.send_or_log(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, d, 0, 0, 0).unwrap()
    }

    fn existing(min: Decimal, max: Option<Decimal>, from: u32, to: Option<u32>) -> PriceTier {
        PriceTier {
            id: "tier-1".into(),
            customer_id: "cust-1".into(),
            activity_definition_id: "def-1".into(),
            min_quantity: min,
            max_quantity: max,
            unit_price: dec!(10),
            currency: "EUR".into(),
            effective_from: day(from),
            effective_to: to.map(day),
            is_active: true,
            created_at: day(1),
            updated_at: day(1),
        }
    }

    fn candidate(min: Decimal, max: Option<Decimal>, from: u32, to: Option<u32>) -> NewPriceTier {
        NewPriceTier {
            customer_id: "cust-1".into(),
            activity_definition_id: "def-1".into(),
            min_quantity: min,
            max_quantity: max,
            unit_price: dec!(8),
            currency: None,
            effective_from: day(from),
            effective_to: to.map(day),
        }
    }

    #[rstest]
    #[case(dec!(1), Some(dec!(10)), dec!(5), Some(dec!(20)), true)]
    #[case(dec!(1), Some(dec!(10)), dec!(10), None, true)]
    #[case(dec!(1), Some(dec!(10)), dec!(11), None, false)]
    #[case(dec!(50), None, dec!(1), Some(dec!(49)), false)]
    #[case(dec!(50), None, dec!(1), None, true)]
    fn quantity_band_overlap(
        #[case] a_min: Decimal,
        #[case] a_max: Option<Decimal>,
        #[case] b_min: Decimal,
        #[case] b_max: Option<Decimal>,
        #[case] expected: bool,
    ) {
        assert_eq!(ranges_overlap((a_min, a_max), (b_min, b_max)), expected);
        assert_eq!(ranges_overlap((b_min, b_max), (a_min, a_max)), expected);
    }

    #[test]
    fn collision_needs_both_band_and_window() {
        let tier = existing(dec!(1), Some(dec!(10)), 1, Some(10));
        assert!(tiers_collide(&tier, &candidate(dec!(5), None, 5, None)));
        assert!(!tiers_collide(&tier, &candidate(dec!(5), None, 11, None)));
        assert!(!tiers_collide(&tier, &candidate(dec!(11), None, 5, None)));
        assert!(tiers_collide(
            &existing(dec!(1), None, 1, None),
            &candidate(dec!(100), None, 20, Some(25))
        ));
    }

    #[test]
    fn bounds_are_validated() {
        assert!(candidate(dec!(0), None, 1, None).check_bounds().is_ok());
        assert!(candidate(dec!(-1), None, 1, None).check_bounds().is_err());
        assert!(candidate(dec!(5), Some(dec!(4)), 1, None).check_bounds().is_err());
        assert!(candidate(dec!(1), None, 5, Some(4)).check_bounds().is_err());
        assert!(candidate(dec!(1), None, 5, Some(5)).check_bounds().is_ok());

        let mut negative_price = candidate(dec!(1), None, 1, None);
        negative_price.unit_price = dec!(-0.01);
        assert!(matches!(
            negative_price.check_bounds(),
            Err(ServiceError::ValidationError(_))
        ));
    }
}
