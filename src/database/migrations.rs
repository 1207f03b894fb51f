pub use sea_orm_migration::prelude::*;

mod m20260820_100000_create_updated_at_trigger;
mod m20260820_101500_create_scheduled_job;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260820_100000_create_updated_at_trigger::Migration),
            Box::new(m20260820_101500_create_scheduled_job::Migration),
        ]
    }
}

pub struct Migrator;
