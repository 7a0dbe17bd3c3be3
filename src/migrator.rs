use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_catalog_tables::Migration),
            Box::new(m20250101_000002_create_asset_tables::Migration),
            Box::new(m20250101_000003_create_work_order_tables::Migration),
            Box::new(m20250101_000004_seed_catalogs::Migration),
        ]
    }
}

// Migration implementations

mod m20250101_000001_create_catalog_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000001_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OrderStatuses::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderStatuses::Id)
                                .integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderStatuses::Name)
                                .string()
                                .unique_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderStatuses::Rank).integer().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderTypes::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderTypes::Id)
                                .integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderTypes::Name)
                                .string()
                                .unique_key()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Incidents::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Incidents::Id)
                                .integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Incidents::Name).string().not_null())
                        .col(ColumnDef::new(Incidents::FailureMechanism).string())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Resolutions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Resolutions::Id)
                                .integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Resolutions::Name)
                                .string()
                                .unique_key()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Resolutions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Incidents::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(OrderTypes::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(OrderStatuses::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum OrderStatuses {
        Table,
        Id,
        Name,
        Rank,
    }

    #[derive(DeriveIden)]
    pub(super) enum OrderTypes {
        Table,
        Id,
        Name,
    }

    #[derive(DeriveIden)]
    enum Incidents {
        Table,
        Id,
        Name,
        FailureMechanism,
    }

    #[derive(DeriveIden)]
    enum Resolutions {
        Table,
        Id,
        Name,
    }
}

mod m20250101_000002_create_asset_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000002_create_asset_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Assets::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Assets::Id)
                                .integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Assets::Code).string().unique_key().not_null())
                        .col(ColumnDef::new(Assets::Description).string().not_null())
                        .col(ColumnDef::new(Assets::DescriptionEn).string())
                        .col(
                            ColumnDef::new(Assets::Criticality)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Assets::Critical)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Assets::Location).string())
                        .col(ColumnDef::new(Assets::CostCenter).string())
                        .col(
                            ColumnDef::new(Assets::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Assets::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Assets::UpdatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Components::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Components::Id)
                                .integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Components::AssetId).integer().not_null())
                        .col(ColumnDef::new(Components::ParentId).integer())
                        .col(ColumnDef::new(Components::Code).string().not_null())
                        .col(ColumnDef::new(Components::Description).string().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_components_asset")
                                .from(Components::Table, Components::AssetId)
                                .to(Assets::Table, Assets::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_components_asset_id")
                        .table(Components::Table)
                        .col(Components::AssetId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SpareParts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SpareParts::Id)
                                .integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SpareParts::Code)
                                .string()
                                .unique_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SpareParts::Description).string().not_null())
                        .col(ColumnDef::new(SpareParts::Warehouse).string())
                        .col(
                            ColumnDef::new(SpareParts::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(SpareParts::MinimumQuantity).integer())
                        .col(ColumnDef::new(SpareParts::UnitCost).double())
                        .col(
                            ColumnDef::new(SpareParts::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(SpareParts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SpareParts::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SpareParts::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Components::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Assets::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Assets {
        Table,
        Id,
        Code,
        Description,
        DescriptionEn,
        Criticality,
        Critical,
        Location,
        CostCenter,
        Active,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Components {
        Table,
        Id,
        AssetId,
        ParentId,
        Code,
        Description,
    }

    #[derive(DeriveIden)]
    enum SpareParts {
        Table,
        Id,
        Code,
        Description,
        Warehouse,
        Quantity,
        MinimumQuantity,
        UnitCost,
        Active,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000003_create_work_order_tables {
    use sea_orm_migration::prelude::*;

    use super::m20250101_000001_create_catalog_tables::{OrderStatuses, OrderTypes};
    use super::m20250101_000002_create_asset_tables::{Assets, Components};

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000003_create_work_order_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(WorkOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WorkOrders::Id)
                                .integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WorkOrders::ExternalRef).string())
                        .col(ColumnDef::new(WorkOrders::OpenedAt).timestamp_with_time_zone())
                        .col(ColumnDef::new(WorkOrders::ClosedAt).timestamp_with_time_zone())
                        .col(ColumnDef::new(WorkOrders::Comment).text())
                        .col(ColumnDef::new(WorkOrders::ResolutionComment).text())
                        .col(ColumnDef::new(WorkOrders::Materials).text())
                        .col(ColumnDef::new(WorkOrders::DowntimeHours).double())
                        .col(
                            ColumnDef::new(WorkOrders::Confirmed)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(WorkOrders::AssetId).integer())
                        .col(ColumnDef::new(WorkOrders::StatusId).integer())
                        .col(ColumnDef::new(WorkOrders::OrderTypeId).integer())
                        .col(ColumnDef::new(WorkOrders::CreatedBy).string())
                        .col(
                            ColumnDef::new(WorkOrders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_work_orders_asset")
                                .from(WorkOrders::Table, WorkOrders::AssetId)
                                .to(Assets::Table, Assets::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_work_orders_status")
                                .from(WorkOrders::Table, WorkOrders::StatusId)
                                .to(OrderStatuses::Table, OrderStatuses::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_work_orders_type")
                                .from(WorkOrders::Table, WorkOrders::OrderTypeId)
                                .to(OrderTypes::Table, OrderTypes::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(WorkOrderIncidents::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WorkOrderIncidents::Id)
                                .integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrderIncidents::WorkOrderId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrderIncidents::IncidentId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrderIncidents::ComponentId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrderIncidents::DetectedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WorkOrderIncidents::ResolvedAt).timestamp_with_time_zone())
                        .col(ColumnDef::new(WorkOrderIncidents::ResolutionId).integer())
                        .col(ColumnDef::new(WorkOrderIncidents::DowntimeHours).double())
                        .col(
                            ColumnDef::new(WorkOrderIncidents::MachineStopped)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(WorkOrderIncidents::PartReplaced)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(WorkOrderIncidents::AffectsProduction)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(WorkOrderIncidents::InsertedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_work_order_incidents_order")
                                .from(WorkOrderIncidents::Table, WorkOrderIncidents::WorkOrderId)
                                .to(WorkOrders::Table, WorkOrders::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_work_order_incidents_component")
                                .from(WorkOrderIncidents::Table, WorkOrderIncidents::ComponentId)
                                .to(Components::Table, Components::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_work_order_incidents_order_id")
                        .table(WorkOrderIncidents::Table)
                        .col(WorkOrderIncidents::WorkOrderId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(WorkOrderIncidents::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(WorkOrders::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum WorkOrders {
        Table,
        Id,
        ExternalRef,
        OpenedAt,
        ClosedAt,
        Comment,
        ResolutionComment,
        Materials,
        DowntimeHours,
        Confirmed,
        AssetId,
        StatusId,
        OrderTypeId,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum WorkOrderIncidents {
        Table,
        Id,
        WorkOrderId,
        IncidentId,
        ComponentId,
        DetectedAt,
        ResolvedAt,
        ResolutionId,
        DowntimeHours,
        MachineStopped,
        PartReplaced,
        AffectsProduction,
        InsertedAt,
    }
}

mod m20250101_000004_seed_catalogs {
    use sea_orm_migration::prelude::*;

    use super::m20250101_000001_create_catalog_tables::{OrderStatuses, OrderTypes};

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000004_seed_catalogs"
        }
    }

    const STATUSES: &[(&str, i32)] = &[
        ("Abierta", 1),
        ("En Curso", 2),
        ("Abierta: Pendiente Material", 3),
        ("Abierta: Material Gestionado", 4),
        ("Cerrada: Pendiente Material", 5),
        ("Cerrada: Material Gestionado", 6),
        ("Cerrada", 7),
        ("Anulada", 8),
    ];

    const TYPES: &[&str] = &["Correctiva", "Preventiva", "Mejora", "Falla Humana"];

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let mut insert_statuses = Query::insert()
                .into_table(OrderStatuses::Table)
                .columns([OrderStatuses::Name, OrderStatuses::Rank])
                .to_owned();
            for (name, rank) in STATUSES {
                insert_statuses.values_panic([(*name).into(), (*rank).into()]);
            }
            manager.exec_stmt(insert_statuses).await?;

            let mut insert_types = Query::insert()
                .into_table(OrderTypes::Table)
                .columns([OrderTypes::Name])
                .to_owned();
            for name in TYPES {
                insert_types.values_panic([(*name).into()]);
            }
            manager.exec_stmt(insert_types).await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .exec_stmt(Query::delete().from_table(OrderTypes::Table).to_owned())
                .await?;
            manager
                .exec_stmt(Query::delete().from_table(OrderStatuses::Table).to_owned())
                .await?;
            Ok(())
        }
    }
}
