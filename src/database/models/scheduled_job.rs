//! `SeaORM` Entity for scheduled build-trigger jobs

use crate::database::models::job_status::JobStatus;
use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize)]
#[sea_orm(table_name = "scheduled_job")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub app_name: String,
    pub version: String,
    pub target_server: String,
    pub app_branch: String,
    pub skip_clone: bool,
    pub skip_build: bool,
    pub schedule_date: Date,
    pub schedule_time: Time,
    pub jenkins_url: String,
    pub jenkins_user: String,
    pub jenkins_token: String,
    pub status: JobStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::job_history::Entity")]
    JobHistory,
}

impl Related<super::job_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JobHistory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// The instant at which the trigger should fire, interpreted as
    /// naive UTC to match the scheduler's clock.
    #[must_use]
    pub fn trigger_instant(&self) -> DateTime {
        self.schedule_date.and_time(self.schedule_time)
    }
}
