use sea_orm::DatabaseConnection;

use crate::{config::Config, environment::Environment, scheduler::TriggerScheduler};

/// Shared application state handed to every request handler.
#[derive(Clone)]
pub struct App {
    pub config: Config,
    pub environment: Environment,
    pub db: DatabaseConnection,
    pub scheduler: TriggerScheduler,
}
