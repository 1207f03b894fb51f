//! `SeaORM` Entity for the append-only execution history
//!
//! Rows are created by the executor when an execution attempt concludes
//! and are never updated. Deleting a job cascades to its history.

use crate::database::models::history_status::HistoryStatus;
use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize)]
#[sea_orm(table_name = "job_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub job_id: i32,
    pub execution_time: DateTime,
    pub status: HistoryStatus,
    #[sea_orm(column_type = "Text", nullable)]
    pub response_text: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::scheduled_job::Entity",
        from = "Column::JobId",
        to = "super::scheduled_job::Column::Id"
    )]
    ScheduledJob,
}

impl Related<super::scheduled_job::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScheduledJob.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
