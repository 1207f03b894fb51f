use sea_orm::sea_query::StringLen;
use sea_orm::DeriveActiveEnum;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Lifecycle state of a scheduled job.
///
/// A job is created as `Pending` and leaves that state exactly once, when
/// its trigger fires: `Completed` if the remote call returned 2xx, `Failed`
/// otherwise. There are no retries, so both outcomes are terminal; only a
/// human re-scheduling the job through the API can revive it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "snake_case")]
#[derive(Default)]
pub enum JobStatus {
    /// Waiting for its trigger to fire.
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,

    /// The remote call succeeded.
    #[sea_orm(string_value = "completed")]
    Completed,

    /// The remote call failed (network error, timeout or non-2xx response).
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl JobStatus {
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}
