use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_000001_create_reference_tables::Migration),
            Box::new(m20260101_000002_create_energy_zone_tables::Migration),
            Box::new(m20260101_000003_create_workflow_tables::Migration),
            Box::new(m20260101_000004_create_content_tables::Migration),
        ]
    }
}

/// Exact decimal column on PostgreSQL. SQLite has no decimal storage class, so REAL is used
/// there to keep values readable as floats.
fn decimal_column<T>(manager: &SchemaManager, column: T, precision: u32, scale: u32) -> ColumnDef
where
    T: IntoIden,
{
    let mut def = ColumnDef::new(column);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => def.double(),
        _ => def.decimal_len(precision, scale),
    };
    def.not_null().to_owned()
}

fn kwh_column<T: IntoIden>(manager: &SchemaManager, column: T) -> ColumnDef {
    decimal_column(manager, column, 14, 3)
}

fn timestamp<T: IntoIden>(column: T) -> ColumnDef {
    ColumnDef::new(column)
        .timestamp_with_time_zone()
        .not_null()
        .to_owned()
}

fn nullable_timestamp<T: IntoIden>(column: T) -> ColumnDef {
    ColumnDef::new(column)
        .timestamp_with_time_zone()
        .null()
        .to_owned()
}

fn nullable_uuid<T: IntoIden>(column: T) -> ColumnDef {
    ColumnDef::new(column).uuid().null().to_owned()
}

fn version_column<T: IntoIden>(column: T) -> ColumnDef {
    ColumnDef::new(column)
        .integer()
        .not_null()
        .default(1)
        .to_owned()
}

async fn index_on<T, C>(manager: &SchemaManager<'_>, name: &str, table: T, column: C) -> Result<(), DbErr>
where
    T: IntoTableRef,
    C: IntoIndexColumn,
{
    manager
        .create_index(
            Index::create()
                .if_not_exists()
                .name(name)
                .table(table)
                .col(column)
                .to_owned(),
        )
        .await
}

mod m20260101_000001_create_reference_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000001_create_reference_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Municipalities::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Municipalities::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Municipalities::Name).string().not_null())
                        .col(ColumnDef::new(Municipalities::Province).string().null())
                        .col(ColumnDef::new(Municipalities::PostalCodePrefix).string_len(12).null())
                        .col(ColumnDef::new(Municipalities::Population).integer().null())
                        .col(timestamp(Municipalities::CreatedAt))
                        .col(timestamp(Municipalities::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Providers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Providers::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Providers::Name).string().not_null())
                        .col(ColumnDef::new(Providers::Email).string().null())
                        .col(ColumnDef::new(Providers::Phone).string().null())
                        .col(ColumnDef::new(Providers::Website).string().null())
                        .col(ColumnDef::new(Providers::ProviderType).string().not_null())
                        .col(
                            ColumnDef::new(Providers::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(timestamp(Providers::CreatedAt))
                        .col(timestamp(Providers::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            index_on(manager, "idx_providers_type", Providers::Table, Providers::ProviderType).await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Providers::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Municipalities::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(crate) enum Municipalities {
        Table,
        Id,
        Name,
        Province,
        PostalCodePrefix,
        Population,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(crate) enum Providers {
        Table,
        Id,
        Name,
        Email,
        Phone,
        Website,
        ProviderType,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20260101_000002_create_energy_zone_tables {
    use super::m20260101_000001_create_reference_tables::Municipalities;
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000002_create_energy_zone_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(EnergyZoneSummaries::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(EnergyZoneSummaries::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(EnergyZoneSummaries::ZoneName).string().not_null())
                        .col(
                            ColumnDef::new(EnergyZoneSummaries::PostalCode)
                                .string_len(12)
                                .not_null(),
                        )
                        .col(nullable_uuid(EnergyZoneSummaries::MunicipalityId))
                        .col(kwh_column(manager, EnergyZoneSummaries::EstimatedProductionKwhDay))
                        .col(kwh_column(manager, EnergyZoneSummaries::ReservedKwhDay))
                        .col(kwh_column(manager, EnergyZoneSummaries::RequestedKwhDay))
                        .col(kwh_column(manager, EnergyZoneSummaries::AvailableKwhDay))
                        .col(
                            ColumnDef::new(EnergyZoneSummaries::Status)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(version_column(EnergyZoneSummaries::Version))
                        .col(timestamp(EnergyZoneSummaries::LastUpdatedAt))
                        .col(timestamp(EnergyZoneSummaries::CreatedAt))
                        .col(timestamp(EnergyZoneSummaries::UpdatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_energy_zone_summaries_municipality")
                                .from(EnergyZoneSummaries::Table, EnergyZoneSummaries::MunicipalityId)
                                .to(Municipalities::Table, Municipalities::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            index_on(
                manager,
                "idx_energy_zone_summaries_postal_code",
                EnergyZoneSummaries::Table,
                EnergyZoneSummaries::PostalCode,
            )
            .await?;
            index_on(
                manager,
                "idx_energy_zone_summaries_status",
                EnergyZoneSummaries::Table,
                EnergyZoneSummaries::Status,
            )
            .await?;

            manager
                .create_table(
                    Table::create()
                        .table(EnergyZoneMovements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(EnergyZoneMovements::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(EnergyZoneMovements::ZoneId).uuid().not_null())
                        .col(ColumnDef::new(EnergyZoneMovements::Kind).string_len(16).not_null())
                        .col(kwh_column(manager, EnergyZoneMovements::Kwh))
                        .col(kwh_column(manager, EnergyZoneMovements::ReservedBefore))
                        .col(kwh_column(manager, EnergyZoneMovements::ReservedAfter))
                        .col(nullable_uuid(EnergyZoneMovements::ActorId))
                        .col(ColumnDef::new(EnergyZoneMovements::Note).text().null())
                        .col(timestamp(EnergyZoneMovements::CreatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_energy_zone_movements_zone")
                                .from(EnergyZoneMovements::Table, EnergyZoneMovements::ZoneId)
                                .to(EnergyZoneSummaries::Table, EnergyZoneSummaries::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            index_on(
                manager,
                "idx_energy_zone_movements_zone_id",
                EnergyZoneMovements::Table,
                EnergyZoneMovements::ZoneId,
            )
            .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(EnergyZoneMovements::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(EnergyZoneSummaries::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum EnergyZoneSummaries {
        Table,
        Id,
        ZoneName,
        PostalCode,
        MunicipalityId,
        EstimatedProductionKwhDay,
        ReservedKwhDay,
        RequestedKwhDay,
        AvailableKwhDay,
        Status,
        Version,
        LastUpdatedAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum EnergyZoneMovements {
        Table,
        Id,
        ZoneId,
        Kind,
        Kwh,
        ReservedBefore,
        ReservedAfter,
        ActorId,
        Note,
        CreatedAt,
    }
}

mod m20260101_000003_create_workflow_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000003_create_workflow_tables"
        }
    }

    fn status_column<T: IntoIden>(column: T) -> ColumnDef {
        ColumnDef::new(column).string_len(32).not_null().to_owned()
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(EnergyBonds::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(EnergyBonds::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(EnergyBonds::Title).string().not_null())
                        .col(ColumnDef::new(EnergyBonds::Description).text().null())
                        .col(nullable_uuid(EnergyBonds::ProviderId))
                        .col(decimal_column(manager, EnergyBonds::NominalAmount, 14, 2))
                        .col(decimal_column(manager, EnergyBonds::InterestRate, 6, 3))
                        .col(ColumnDef::new(EnergyBonds::TermMonths).integer().not_null())
                        .col(status_column(EnergyBonds::Status))
                        .col(version_column(EnergyBonds::Version))
                        .col(nullable_uuid(EnergyBonds::ApprovedBy))
                        .col(nullable_timestamp(EnergyBonds::ApprovedAt))
                        .col(nullable_uuid(EnergyBonds::RejectedBy))
                        .col(nullable_timestamp(EnergyBonds::RejectedAt))
                        .col(ColumnDef::new(EnergyBonds::RejectionReason).text().null())
                        .col(nullable_uuid(EnergyBonds::CancelledBy))
                        .col(nullable_timestamp(EnergyBonds::CancelledAt))
                        .col(timestamp(EnergyBonds::CreatedAt))
                        .col(timestamp(EnergyBonds::UpdatedAt))
                        .to_owned(),
                )
                .await?;
            index_on(manager, "idx_energy_bonds_status", EnergyBonds::Table, EnergyBonds::Status)
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CarbonCredits::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(CarbonCredits::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(CarbonCredits::ProjectName).string().not_null())
                        .col(ColumnDef::new(CarbonCredits::RegistryReference).string().null())
                        .col(ColumnDef::new(CarbonCredits::CreditType).string().not_null())
                        .col(decimal_column(manager, CarbonCredits::TonnesCo2, 14, 3))
                        .col(decimal_column(manager, CarbonCredits::PricePerTonne, 14, 2))
                        .col(ColumnDef::new(CarbonCredits::VintageYear).integer().not_null())
                        .col(status_column(CarbonCredits::Status))
                        .col(version_column(CarbonCredits::Version))
                        .col(nullable_uuid(CarbonCredits::ApprovedBy))
                        .col(nullable_timestamp(CarbonCredits::ApprovedAt))
                        .col(nullable_uuid(CarbonCredits::RejectedBy))
                        .col(nullable_timestamp(CarbonCredits::RejectedAt))
                        .col(ColumnDef::new(CarbonCredits::RejectionReason).text().null())
                        .col(nullable_uuid(CarbonCredits::RetiredBy))
                        .col(nullable_timestamp(CarbonCredits::RetiredAt))
                        .col(timestamp(CarbonCredits::CreatedAt))
                        .col(timestamp(CarbonCredits::UpdatedAt))
                        .to_owned(),
                )
                .await?;
            index_on(
                manager,
                "idx_carbon_credits_status",
                CarbonCredits::Table,
                CarbonCredits::Status,
            )
            .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Donations::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Donations::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Donations::DonorName).string().not_null())
                        .col(ColumnDef::new(Donations::DonorEmail).string().null())
                        .col(decimal_column(manager, Donations::Amount, 14, 2))
                        .col(ColumnDef::new(Donations::Currency).string_len(3).not_null())
                        .col(ColumnDef::new(Donations::Campaign).string().null())
                        .col(status_column(Donations::Status))
                        .col(version_column(Donations::Version))
                        .col(nullable_uuid(Donations::ConfirmedBy))
                        .col(nullable_timestamp(Donations::ConfirmedAt))
                        .col(nullable_uuid(Donations::ProcessedBy))
                        .col(nullable_timestamp(Donations::ProcessedAt))
                        .col(nullable_uuid(Donations::RefundedBy))
                        .col(nullable_timestamp(Donations::RefundedAt))
                        .col(ColumnDef::new(Donations::RefundReason).text().null())
                        .col(nullable_uuid(Donations::CancelledBy))
                        .col(nullable_timestamp(Donations::CancelledAt))
                        .col(timestamp(Donations::CreatedAt))
                        .col(timestamp(Donations::UpdatedAt))
                        .to_owned(),
                )
                .await?;
            index_on(manager, "idx_donations_status", Donations::Table, Donations::Status).await?;

            manager
                .create_table(
                    Table::create()
                        .table(MaintenanceTasks::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MaintenanceTasks::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(MaintenanceTasks::Title).string().not_null())
                        .col(ColumnDef::new(MaintenanceTasks::Description).text().null())
                        .col(nullable_uuid(MaintenanceTasks::ZoneId))
                        .col(ColumnDef::new(MaintenanceTasks::Priority).string_len(16).not_null())
                        .col(nullable_timestamp(MaintenanceTasks::ScheduledFor))
                        .col(status_column(MaintenanceTasks::Status))
                        .col(version_column(MaintenanceTasks::Version))
                        .col(nullable_uuid(MaintenanceTasks::StartedBy))
                        .col(nullable_timestamp(MaintenanceTasks::StartedAt))
                        .col(nullable_timestamp(MaintenanceTasks::PausedAt))
                        .col(nullable_timestamp(MaintenanceTasks::ResumedAt))
                        .col(nullable_uuid(MaintenanceTasks::CompletedBy))
                        .col(nullable_timestamp(MaintenanceTasks::CompletedAt))
                        .col(ColumnDef::new(MaintenanceTasks::CompletionNotes).text().null())
                        .col(nullable_uuid(MaintenanceTasks::CancelledBy))
                        .col(nullable_timestamp(MaintenanceTasks::CancelledAt))
                        .col(ColumnDef::new(MaintenanceTasks::CancellationReason).text().null())
                        .col(timestamp(MaintenanceTasks::CreatedAt))
                        .col(timestamp(MaintenanceTasks::UpdatedAt))
                        .to_owned(),
                )
                .await?;
            index_on(
                manager,
                "idx_maintenance_tasks_status",
                MaintenanceTasks::Table,
                MaintenanceTasks::Status,
            )
            .await?;

            manager
                .create_table(
                    Table::create()
                        .table(UserSubscriptions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(UserSubscriptions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(UserSubscriptions::UserId).uuid().not_null())
                        .col(ColumnDef::new(UserSubscriptions::PlanName).string().not_null())
                        .col(nullable_uuid(UserSubscriptions::ZoneId))
                        .col(kwh_column(manager, UserSubscriptions::MonthlyKwh))
                        .col(decimal_column(manager, UserSubscriptions::MonthlyPrice, 14, 2))
                        .col(status_column(UserSubscriptions::Status))
                        .col(version_column(UserSubscriptions::Version))
                        .col(nullable_uuid(UserSubscriptions::PausedBy))
                        .col(nullable_timestamp(UserSubscriptions::PausedAt))
                        .col(nullable_uuid(UserSubscriptions::ResumedBy))
                        .col(nullable_timestamp(UserSubscriptions::ResumedAt))
                        .col(nullable_uuid(UserSubscriptions::CancelledBy))
                        .col(nullable_timestamp(UserSubscriptions::CancelledAt))
                        .col(ColumnDef::new(UserSubscriptions::CancellationReason).text().null())
                        .col(timestamp(UserSubscriptions::CreatedAt))
                        .col(timestamp(UserSubscriptions::UpdatedAt))
                        .to_owned(),
                )
                .await?;
            index_on(
                manager,
                "idx_user_subscriptions_user_id",
                UserSubscriptions::Table,
                UserSubscriptions::UserId,
            )
            .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SubscriptionRequests::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SubscriptionRequests::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SubscriptionRequests::ApplicantName).string().not_null())
                        .col(ColumnDef::new(SubscriptionRequests::Email).string().not_null())
                        .col(
                            ColumnDef::new(SubscriptionRequests::PostalCode)
                                .string_len(12)
                                .not_null(),
                        )
                        .col(kwh_column(manager, SubscriptionRequests::RequestedKwhDay))
                        .col(ColumnDef::new(SubscriptionRequests::Message).text().null())
                        .col(status_column(SubscriptionRequests::Status))
                        .col(version_column(SubscriptionRequests::Version))
                        .col(nullable_uuid(SubscriptionRequests::ApprovedBy))
                        .col(nullable_timestamp(SubscriptionRequests::ApprovedAt))
                        .col(nullable_uuid(SubscriptionRequests::RejectedBy))
                        .col(nullable_timestamp(SubscriptionRequests::RejectedAt))
                        .col(ColumnDef::new(SubscriptionRequests::RejectionReason).text().null())
                        .col(nullable_uuid(SubscriptionRequests::ProcessedBy))
                        .col(nullable_timestamp(SubscriptionRequests::ProcessedAt))
                        .col(timestamp(SubscriptionRequests::CreatedAt))
                        .col(timestamp(SubscriptionRequests::UpdatedAt))
                        .to_owned(),
                )
                .await?;
            index_on(
                manager,
                "idx_subscription_requests_status",
                SubscriptionRequests::Table,
                SubscriptionRequests::Status,
            )
            .await?;

            manager
                .create_table(
                    Table::create()
                        .table(WorkflowTransitions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WorkflowTransitions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WorkflowTransitions::Resource).string_len(64).not_null())
                        .col(ColumnDef::new(WorkflowTransitions::RecordId).uuid().not_null())
                        .col(ColumnDef::new(WorkflowTransitions::Action).string_len(32).not_null())
                        .col(status_column(WorkflowTransitions::FromStatus))
                        .col(status_column(WorkflowTransitions::ToStatus))
                        .col(ColumnDef::new(WorkflowTransitions::ActorId).uuid().not_null())
                        .col(ColumnDef::new(WorkflowTransitions::Note).text().null())
                        .col(timestamp(WorkflowTransitions::CreatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_workflow_transitions_record")
                        .table(WorkflowTransitions::Table)
                        .col(WorkflowTransitions::Resource)
                        .col(WorkflowTransitions::RecordId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(WorkflowTransitions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(SubscriptionRequests::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(UserSubscriptions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(MaintenanceTasks::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Donations::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(CarbonCredits::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(EnergyBonds::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum EnergyBonds {
        Table,
        Id,
        Title,
        Description,
        ProviderId,
        NominalAmount,
        InterestRate,
        TermMonths,
        Status,
        Version,
        ApprovedBy,
        ApprovedAt,
        RejectedBy,
        RejectedAt,
        RejectionReason,
        CancelledBy,
        CancelledAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum CarbonCredits {
        Table,
        Id,
        ProjectName,
        RegistryReference,
        CreditType,
        TonnesCo2,
        PricePerTonne,
        VintageYear,
        Status,
        Version,
        ApprovedBy,
        ApprovedAt,
        RejectedBy,
        RejectedAt,
        RejectionReason,
        RetiredBy,
        RetiredAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Donations {
        Table,
        Id,
        DonorName,
        DonorEmail,
        Amount,
        Currency,
        Campaign,
        Status,
        Version,
        ConfirmedBy,
        ConfirmedAt,
        ProcessedBy,
        ProcessedAt,
        RefundedBy,
        RefundedAt,
        RefundReason,
        CancelledBy,
        CancelledAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum MaintenanceTasks {
        Table,
        Id,
        Title,
        Description,
        ZoneId,
        Priority,
        ScheduledFor,
        Status,
        Version,
        StartedBy,
        StartedAt,
        PausedAt,
        ResumedAt,
        CompletedBy,
        CompletedAt,
        CompletionNotes,
        CancelledBy,
        CancelledAt,
        CancellationReason,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum UserSubscriptions {
        Table,
        Id,
        UserId,
        PlanName,
        ZoneId,
        MonthlyKwh,
        MonthlyPrice,
        Status,
        Version,
        PausedBy,
        PausedAt,
        ResumedBy,
        ResumedAt,
        CancelledBy,
        CancelledAt,
        CancellationReason,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum SubscriptionRequests {
        Table,
        Id,
        ApplicantName,
        Email,
        PostalCode,
        RequestedKwhDay,
        Message,
        Status,
        Version,
        ApprovedBy,
        ApprovedAt,
        RejectedBy,
        RejectedAt,
        RejectionReason,
        ProcessedBy,
        ProcessedAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum WorkflowTransitions {
        Table,
        Id,
        Resource,
        RecordId,
        Action,
        FromStatus,
        ToStatus,
        ActorId,
        Note,
        CreatedAt,
    }
}

mod m20260101_000004_create_content_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000004_create_content_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Articles::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Articles::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Articles::Title).string().not_null())
                        .col(ColumnDef::new(Articles::Slug).string().not_null().unique_key())
                        .col(ColumnDef::new(Articles::Excerpt).text().null())
                        .col(ColumnDef::new(Articles::Body).text().not_null())
                        .col(ColumnDef::new(Articles::Category).string().null())
                        .col(nullable_uuid(Articles::AuthorId))
                        .col(ColumnDef::new(Articles::Status).string_len(16).not_null())
                        .col(nullable_timestamp(Articles::PublishedAt))
                        .col(timestamp(Articles::CreatedAt))
                        .col(timestamp(Articles::UpdatedAt))
                        .to_owned(),
                )
                .await?;
            index_on(manager, "idx_articles_status", Articles::Table, Articles::Status).await?;

            manager
                .create_table(
                    Table::create()
                        .table(Pages::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Pages::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Pages::Title).string().not_null())
                        .col(ColumnDef::new(Pages::Slug).string().not_null().unique_key())
                        .col(ColumnDef::new(Pages::Body).text().not_null())
                        .col(ColumnDef::new(Pages::MetaDescription).string().null())
                        .col(ColumnDef::new(Pages::Status).string_len(16).not_null())
                        .col(timestamp(Pages::CreatedAt))
                        .col(timestamp(Pages::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Faqs::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Faqs::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Faqs::Question).text().not_null())
                        .col(ColumnDef::new(Faqs::Answer).text().not_null())
                        .col(ColumnDef::new(Faqs::Category).string().null())
                        .col(ColumnDef::new(Faqs::Position).integer().not_null().default(0))
                        .col(
                            ColumnDef::new(Faqs::IsPublished)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(timestamp(Faqs::CreatedAt))
                        .col(timestamp(Faqs::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Sku).string().not_null().unique_key())
                        .col(ColumnDef::new(Products::Description).text().null())
                        .col(ColumnDef::new(Products::Category).string().not_null())
                        .col(decimal_column(manager, Products::Price, 14, 2))
                        .col(ColumnDef::new(Products::Unit).string_len(32).not_null())
                        .col(nullable_uuid(Products::ProviderId))
                        .col(
                            ColumnDef::new(Products::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(timestamp(Products::CreatedAt))
                        .col(timestamp(Products::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            index_on(manager, "idx_products_category", Products::Table, Products::Category).await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Faqs::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Pages::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Articles::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Articles {
        Table,
        Id,
        Title,
        Slug,
        Excerpt,
        Body,
        Category,
        AuthorId,
        Status,
        PublishedAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Pages {
        Table,
        Id,
        Title,
        Slug,
        Body,
        MetaDescription,
        Status,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Faqs {
        Table,
        Id,
        Question,
        Answer,
        Category,
        Position,
        IsPublished,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
        Name,
        Sku,
        Description,
        Category,
        Price,
        Unit,
        ProviderId,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}
