use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_orders_table::Migration),
            Box::new(m20240601_000002_create_customer_activities_table::Migration),
            Box::new(m20240601_000003_create_customer_activity_prices_table::Migration),
            Box::new(m20240601_000004_add_activity_indexes::Migration),
        ]
    }
}

mod m20240601_000001_create_orders_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000001_create_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Only the columns the activity engine reads; order management owns the rest.
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).string().primary_key().not_null())
                        .col(ColumnDef::new(Orders::CustomerId).string().not_null())
                        .col(ColumnDef::new(Orders::OrderNumber).string().not_null())
                        .col(ColumnDef::new(Orders::Status).string().not_null())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Orders {
        Table,
        Id,
        CustomerId,
        OrderNumber,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000002_create_customer_activities_table {
    use super::m20240601_000001_create_orders_table::Orders;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000002_create_customer_activities_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Definitions and instances share this table; a NULL order_id marks a definition.
            manager
                .create_table(
                    Table::create()
                        .table(CustomerActivities::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CustomerActivities::Id)
                                .string()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustomerActivities::CustomerId)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CustomerActivities::OrderId).string().null())
                        .col(ColumnDef::new(CustomerActivities::Name).string().not_null())
                        .col(
                            ColumnDef::new(CustomerActivities::ActivityType)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(CustomerActivities::Code).string().null())
                        .col(ColumnDef::new(CustomerActivities::Description).text().null())
                        .col(ColumnDef::new(CustomerActivities::Unit).string().not_null())
                        .col(
                            ColumnDef::new(CustomerActivities::Quantity)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(CustomerActivities::UnitPrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(CustomerActivities::LineTotal)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(CustomerActivities::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(CustomerActivities::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustomerActivities::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_customer_activities_order_id")
                                .from(CustomerActivities::Table, CustomerActivities::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CustomerActivities::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum CustomerActivities {
        Table,
        Id,
        CustomerId,
        OrderId,
        Name,
        ActivityType,
        Code,
        Description,
        Unit,
        Quantity,
        UnitPrice,
        LineTotal,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000003_create_customer_activity_prices_table {
    use super::m20240601_000002_create_customer_activities_table::CustomerActivities;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000003_create_customer_activity_prices_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CustomerActivityPrices::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CustomerActivityPrices::Id)
                                .string()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustomerActivityPrices::CustomerId)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustomerActivityPrices::ActivityDefinitionId)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustomerActivityPrices::MinQuantity)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(CustomerActivityPrices::MaxQuantity)
                                .decimal()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(CustomerActivityPrices::UnitPrice)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustomerActivityPrices::Currency)
                                .string_len(3)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustomerActivityPrices::EffectiveFrom)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustomerActivityPrices::EffectiveTo)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(CustomerActivityPrices::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(CustomerActivityPrices::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustomerActivityPrices::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_customer_activity_prices_definition_id")
                                .from(
                                    CustomerActivityPrices::Table,
                                    CustomerActivityPrices::ActivityDefinitionId,
                                )
                                .to(CustomerActivities::Table, CustomerActivities::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CustomerActivityPrices::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum CustomerActivityPrices {
        Table,
        Id,
        CustomerId,
        ActivityDefinitionId,
        MinQuantity,
        MaxQuantity,
        UnitPrice,
        Currency,
        EffectiveFrom,
        EffectiveTo,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000004_add_activity_indexes {
    use super::m20240601_000002_create_customer_activities_table::CustomerActivities;
    use super::m20240601_000003_create_customer_activity_prices_table::CustomerActivityPrices;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000004_add_activity_indexes"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_customer_activities_customer_order")
                        .table(CustomerActivities::Table)
                        .col(CustomerActivities::CustomerId)
                        .col(CustomerActivities::OrderId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_customer_activities_created_at")
                        .table(CustomerActivities::Table)
                        .col(CustomerActivities::CreatedAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_customer_activity_prices_lookup")
                        .table(CustomerActivityPrices::Table)
                        .col(CustomerActivityPrices::CustomerId)
                        .col(CustomerActivityPrices::ActivityDefinitionId)
                        .col(CustomerActivityPrices::IsActive)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_index(
                    Index::drop()
                        .name("idx_customer_activity_prices_lookup")
                        .table(CustomerActivityPrices::Table)
                        .to_owned(),
                )
                .await?;
            manager
                .drop_index(
                    Index::drop()
                        .name("idx_customer_activities_created_at")
                        .table(CustomerActivities::Table)
                        .to_owned(),
                )
                .await?;
            manager
                .drop_index(
                    Index::drop()
                        .name("idx_customer_activities_customer_order")
                        .table(CustomerActivities::Table)
                        .to_owned(),
                )
                .await
        }
    }
}
