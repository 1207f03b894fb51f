use std::{sync::Arc, time::Duration};

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, Set, TransactionTrait};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::{
    config::ExecutorConfig,
    database::models::{
        history_status::HistoryStatus,
        job_history,
        job_status::JobStatus,
        scheduled_job::{self, Entity as ScheduledJobEntity},
    },
    scheduler::FireCallback,
};

/// Fixed sub-path of the configured Jenkins base URL that every execution
/// posts to. The `delay=0sec` query parameter asks Jenkins to start the
/// build without its default quiet period.
const BUILD_JOB_PATH: &str = "job/PTF-ROUTING-LUAN/buildWithParameters";

/// Form-encoded body of the `buildWithParameters` call. Booleans serialize
/// as lowercase `true`/`false`, which is what the Jenkins job expects.
#[derive(Serialize)]
struct BuildParameters<'a> {
    #[serde(rename = "VERSION")]
    version: &'a str,
    #[serde(rename = "APP_NAME")]
    app_name: &'a str,
    #[serde(rename = "SKIP_CLONE")]
    skip_clone: bool,
    #[serde(rename = "SKIP_BUILD")]
    skip_build: bool,
    #[serde(rename = "TARGET_SERVER")]
    target_server: &'a str,
    #[serde(rename = "APP_BRANCH")]
    app_branch: &'a str,
}

impl<'a> From<&'a scheduled_job::Model> for BuildParameters<'a> {
    fn from(job: &'a scheduled_job::Model) -> Self {
        Self {
            version: &job.version,
            app_name: &job.app_name,
            skip_clone: job.skip_clone,
            skip_build: job.skip_build,
            target_server: &job.target_server,
            app_branch: &job.app_branch,
        }
    }
}

enum ExecutionOutcome {
    Success(String),
    Failure(String),
}

/// Performs the remote build-server call for one job and records the result.
///
/// One execution attempt per firing: any failure settles the job at
/// `failed` with a history row, never a retry.
#[derive(Clone)]
pub struct JobExecutor {
    db: DatabaseConnection,
    client: reqwest::Client,
}

impl JobExecutor {
    #[must_use]
    pub fn new(db: DatabaseConnection, config: &ExecutorConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .expect("Failed to build HTTP client");

        Self { db, client }
    }

    /// Wrap this executor into the callback shape the trigger scheduler
    /// fires. Store errors are logged, never propagated: a failed write for
    /// one job must not affect other pending triggers.
    #[must_use]
    pub fn into_fire_callback(self) -> FireCallback {
        Arc::new(move |job_id| {
            let executor = self.clone();
            Box::pin(async move {
                if let Err(e) = executor.execute(job_id).await {
                    error!("❌ Failed to record outcome for job {}: {}", job_id, e);
                }
            })
        })
    }

    /// Execute the remote call for `job_id` and persist the outcome.
    ///
    /// A job that was deleted after scheduling is a no-op, not an error.
    /// A job that already left `pending` is skipped, which keeps the
    /// externally visible effect at-most-once even if a trigger fires twice.
    pub async fn execute(&self, job_id: i32) -> Result<(), DbErr> {
        let Some(job) = ScheduledJobEntity::find_by_id(job_id).one(&self.db).await? else {
            warn!("Job {} no longer exists, skipping execution", job_id);
            return Ok(());
        };

        if !job.status.is_pending() {
            info!(
                "Job {} is already {}, skipping execution",
                job_id, job.status
            );
            return Ok(());
        }

        let outcome = self.call_build_server(&job).await;
        self.record_outcome(job, outcome).await
    }

    async fn call_build_server(&self, job: &scheduled_job::Model) -> ExecutionOutcome {
        let url = format!(
            "{}/{}",
            job.jenkins_url.trim_end_matches('/'),
            BUILD_JOB_PATH
        );

        let response = self
            .client
            .post(&url)
            .query(&[("delay", "0sec")])
            .basic_auth(&job.jenkins_user, Some(&job.jenkins_token))
            .form(&BuildParameters::from(job))
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => {
                info!("✅ Build triggered successfully for '{}'", job.app_name);
                let body = response.text().await.unwrap_or_default();
                ExecutionOutcome::Success(body)
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                error!(
                    "❌ Build server rejected the trigger for '{}': {}",
                    job.app_name, status
                );
                ExecutionOutcome::Failure(format!(
                    "build server responded with status {status}: {body}"
                ))
            }
            Err(e) => {
                error!(
                    "❌ Request to build server failed for '{}': {}",
                    job.app_name, e
                );
                ExecutionOutcome::Failure(format!("request error: {e}"))
            }
        }
    }

    /// Persist the job's new status and the history row in one transaction,
    /// so a crash cannot leave a settled job without its audit record.
    async fn record_outcome(
        &self,
        job: scheduled_job::Model,
        outcome: ExecutionOutcome,
    ) -> Result<(), DbErr> {
        let (job_status, history_status, response_text) = match outcome {
            ExecutionOutcome::Success(body) => (JobStatus::Completed, HistoryStatus::Success, body),
            ExecutionOutcome::Failure(reason) => (JobStatus::Failed, HistoryStatus::Failed, reason),
        };

        let txn = self.db.begin().await?;
        let now = Utc::now().naive_utc();

        job_history::ActiveModel {
            job_id: Set(job.id),
            execution_time: Set(now),
            status: Set(history_status),
            response_text: Set(Some(response_text)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut active_job: scheduled_job::ActiveModel = job.into();
        active_job.status = Set(job_status);
        active_job.updated_at = Set(now);
        active_job.update(&txn).await?;

        txn.commit().await
    }
}
