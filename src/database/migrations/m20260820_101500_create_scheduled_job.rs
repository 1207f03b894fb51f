use sea_orm::DbBackend;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Status columns are plain strings (not native enum types) so the
        // same migration runs on both Postgres and SQLite.
        manager
            .create_table(
                Table::create()
                    .table(ScheduledJob::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ScheduledJob::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ScheduledJob::AppName)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ScheduledJob::Version)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ScheduledJob::TargetServer)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ScheduledJob::AppBranch)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ScheduledJob::SkipClone)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ScheduledJob::SkipBuild)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(ScheduledJob::ScheduleDate).date().not_null())
                    .col(ColumnDef::new(ScheduledJob::ScheduleTime).time().not_null())
                    .col(
                        ColumnDef::new(ScheduledJob::JenkinsUrl)
                            .string_len(200)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ScheduledJob::JenkinsUser)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ScheduledJob::JenkinsToken)
                            .string_len(200)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ScheduledJob::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(ScheduledJob::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ScheduledJob::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(JobHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(JobHistory::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(JobHistory::JobId).integer().not_null())
                    .col(
                        ColumnDef::new(JobHistory::ExecutionTime)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(JobHistory::Status)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(JobHistory::ResponseText).text().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-job_history-job_id")
                            .from(JobHistory::Table, JobHistory::JobId)
                            .to(ScheduledJob::Table, ScheduledJob::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-job_history-job_id")
                    .table(JobHistory::Table)
                    .col(JobHistory::JobId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-scheduled_job-created_at")
                    .table(ScheduledJob::Table)
                    .col(ScheduledJob::CreatedAt)
                    .to_owned(),
            )
            .await?;

        if manager.get_database_backend() == DbBackend::Postgres {
            manager
                .get_connection()
                .execute_unprepared(
                    r"
                    CREATE TRIGGER update_scheduled_job_updated_at
                        BEFORE UPDATE ON scheduled_job
                        FOR EACH ROW
                        EXECUTE FUNCTION update_updated_at_column();
                    ",
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        if manager.get_database_backend() == DbBackend::Postgres {
            manager
                .get_connection()
                .execute_unprepared(
                    "DROP TRIGGER IF EXISTS update_scheduled_job_updated_at ON scheduled_job;",
                )
                .await?;
        }

        manager
            .drop_table(Table::drop().table(JobHistory::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(ScheduledJob::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ScheduledJob {
    Table,
    Id,
    AppName,
    Version,
    TargetServer,
    AppBranch,
    SkipClone,
    SkipBuild,
    ScheduleDate,
    ScheduleTime,
    JenkinsUrl,
    JenkinsUser,
    JenkinsToken,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum JobHistory {
    Table,
    Id,
    JobId,
    ExecutionTime,
    Status,
    ResponseText,
}
