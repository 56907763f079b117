use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Alias, Expr, SimpleExpr},
    ActiveEnum, ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, FromQueryResult, QueryFilter,
    QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use super::Query;
use crate::{
    db::DatabaseAccess,
    entities::customer_activity::{self, ActivityType, Entity as CustomerActivity},
    errors::ServiceError,
};

/// Optional filters for [`GetActivityStatisticsQuery`]. All bounds are inclusive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatisticsOptions {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Definition ids; matched against instances by definition name.
    pub activity_definition_ids: Option<Vec<String>>,
}

/// Grouping key of a statistics row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub name: String,
    pub code: Option<String>,
    pub unit: String,
    pub activity_type: ActivityType,
}

/// Totals for one activity group.
///
/// Sums are exact on Postgres. SQLite stores decimals as floating point, so
/// totals there carry roughly 15 significant digits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityStatistics {
    pub activity: ActivitySummary,
    pub total_quantity: Decimal,
    pub total_value: Decimal,
    pub instance_count: i64,
}

/// Aggregates a customer's active instances per (name, unit, code, type).
#[derive(Debug, Serialize, Deserialize)]
pub struct GetActivityStatisticsQuery {
    pub customer_id: String,
    pub options: StatisticsOptions,
}

#[derive(Debug, FromQueryResult)]
struct StatisticsRow {
    name: String,
    unit: String,
    code: Option<String>,
    activity_type: String,
    total_quantity: Option<Decimal>,
    total_value: Option<Decimal>,
    instance_count: i64,
}

impl StatisticsRow {
    fn into_statistics(self) -> Result<ActivityStatistics, ServiceError> {
        let activity_type = ActivityType::try_from_value(&self.activity_type).map_err(|e| {
            error!(activity_type = %self.activity_type, "Unknown activity type in statistics row");
            ServiceError::InternalError(format!("Unknown activity type: {}", e))
        })?;

        Ok(ActivityStatistics {
            activity: ActivitySummary {
                name: self.name,
                code: self.code,
                unit: self.unit,
                activity_type,
            },
            total_quantity: sum_or_zero(self.total_quantity),
            total_value: sum_or_zero(self.total_value),
            instance_count: self.instance_count,
        })
    }
}

/// Null sums become zero.
fn sum_or_zero(sum: Option<Decimal>) -> Decimal {
    sum.unwrap_or(Decimal::ZERO).normalize()
}

/// `SUM(column)`, kept as numeric on Postgres. SQLite has no decimal type, so
/// the sum is cast to a float there to decode reliably.
fn sum_of(column: customer_activity::Column, backend: DbBackend) -> SimpleExpr {
    let sum = Expr::col((CustomerActivity, column)).sum();
    match backend {
        DbBackend::Sqlite => sum.cast_as(Alias::new("float8")),
        _ => sum,
    }
}

impl GetActivityStatisticsQuery {
    /// Resolves definition ids to the names their instances were copied with.
    async fn definition_names(
        &self,
        db: &DatabaseAccess,
        ids: &[String],
    ) -> Result<Vec<String>, ServiceError> {
        let names = CustomerActivity::find()
            .select_only()
            .column(customer_activity::Column::Name)
            .filter(customer_activity::Column::Id.is_in(ids.iter().cloned()))
            .filter(customer_activity::Column::CustomerId.eq(self.customer_id.as_str()))
            .filter(customer_activity::Column::OrderId.is_null())
            .distinct()
            .into_tuple::<String>()
            .all(db.get_pool())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to resolve activity definition names");
                ServiceError::DatabaseError(e)
            })?;

        Ok(names)
    }
}

#[async_trait]
impl Query for GetActivityStatisticsQuery {
    type Result = Vec<ActivityStatistics>;

    #[instrument(skip(self, db), fields(customer_id = %self.customer_id))]
    async fn execute(&self, db: &DatabaseAccess) -> Result<Self::Result, ServiceError> {
        debug!("Executing GetActivityStatisticsQuery");

        let mut select = CustomerActivity::find()
            .filter(customer_activity::Column::CustomerId.eq(self.customer_id.as_str()))
            .filter(customer_activity::Column::IsActive.eq(true))
            .filter(customer_activity::Column::OrderId.is_not_null());

        if let Some(start) = self.options.start_date {
            select = select.filter(customer_activity::Column::CreatedAt.gte(start));
        }
        if let Some(end) = self.options.end_date {
            select = select.filter(customer_activity::Column::CreatedAt.lte(end));
        }

        match self.options.activity_definition_ids.as_deref() {
            Some(ids) if !ids.is_empty() => {
                let names = self.definition_names(db, ids).await?;
                if names.is_empty() {
                    debug!("No definition names resolved, returning empty statistics");
                    return Ok(Vec::new());
                }
                select = select.filter(customer_activity::Column::Name.is_in(names));
            }
            _ => {}
        }

        let backend = db.get_pool().get_database_backend();
        let rows = select
            .select_only()
            .column(customer_activity::Column::Name)
            .column(customer_activity::Column::Unit)
            .column(customer_activity::Column::Code)
            .column(customer_activity::Column::ActivityType)
            .column_as(
                sum_of(customer_activity::Column::Quantity, backend),
                "total_quantity",
            )
            .column_as(
                sum_of(customer_activity::Column::LineTotal, backend),
                "total_value",
            )
            .column_as(
                Expr::col((CustomerActivity, customer_activity::Column::Id)).count(),
                "instance_count",
            )
            .group_by(customer_activity::Column::Name)
            .group_by(customer_activity::Column::Unit)
            .group_by(customer_activity::Column::Code)
            .group_by(customer_activity::Column::ActivityType)
            .order_by_asc(customer_activity::Column::Name)
            .order_by_asc(customer_activity::Column::Unit)
            .order_by_asc(customer_activity::Column::Code)
            .order_by_asc(customer_activity::Column::ActivityType)
            .into_model::<StatisticsRow>()
            .all(db.get_pool())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to aggregate activity statistics");
                ServiceError::DatabaseError(e)
            })?;

        rows.into_iter().map(StatisticsRow::into_statistics).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use sea_orm::QueryTrait;

    #[test]
    fn missing_sums_default_to_zero() {
        assert_eq!(sum_or_zero(None), Decimal::ZERO);
        assert_eq!(sum_or_zero(Some(dec!(50.000))), dec!(50));
        assert_eq!(sum_or_zero(Some(dec!(2.50))), dec!(2.5));
    }

    #[test]
    fn sums_are_cast_only_on_sqlite() {
        let sql = |backend: DbBackend| {
            CustomerActivity::find()
                .select_only()
                .column_as(
                    sum_of(customer_activity::Column::LineTotal, backend),
                    "total_value",
                )
                .build(backend)
                .to_string()
        };

        let sqlite = sql(DbBackend::Sqlite);
        assert!(sqlite.contains("CAST(SUM("), "{}", sqlite);
        assert!(sqlite.contains("float8"), "{}", sqlite);

        let postgres = sql(DbBackend::Postgres);
        assert!(postgres.contains("SUM("), "{}", postgres);
        assert!(!postgres.contains("CAST"), "{}", postgres);
    }

    #[test]
    fn row_with_unknown_type_is_an_internal_error() {
        let row = StatisticsRow {
            name: "Unloading".into(),
            unit: "hour".into(),
            code: None,
            activity_type: "TELEPORTING".into(),
            total_quantity: Some(dec!(1)),
            total_value: Some(dec!(1)),
            instance_count: 1,
        };
        assert!(matches!(
            row.into_statistics(),
            Err(ServiceError::InternalError(_))
        ));
    }

    #[test]
    fn row_converts_into_summary() {
        let row = StatisticsRow {
            name: "Wrap".into(),
            unit: "pallet".into(),
            code: Some("W1".into()),
            activity_type: "WRAPPING".into(),
            total_quantity: Some(dec!(4.0)),
            total_value: None,
            instance_count: 2,
        };
        let stats = row.into_statistics().unwrap();
        assert_eq!(stats.activity.activity_type, ActivityType::Wrapping);
        assert_eq!(stats.total_quantity, dec!(4));
        assert_eq!(stats.total_value, Decimal::ZERO);
        assert_eq!(stats.instance_count, 2);
    }
}
