use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, NaiveTime, Utc};
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use validator::Validate;

use crate::{
    api::{error::ApiError, validated_json::ValidatedJson},
    app::App,
    database::models::{
        job_status::JobStatus,
        scheduled_job::{self, Entity as ScheduledJobEntity},
    },
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateJobRequest {
    #[validate(length(min = 1))]
    pub app_name: Option<String>,
    #[validate(length(min = 1))]
    pub version: Option<String>,
    #[validate(length(min = 1))]
    pub target_server: Option<String>,
    #[validate(length(min = 1))]
    pub app_branch: Option<String>,
    pub schedule_date: Option<String>,
    pub schedule_time: Option<String>,
    #[validate(url)]
    pub jenkins_url: Option<String>,
    pub jenkins_user: Option<String>,
    pub jenkins_token: Option<String>,
    #[serde(default = "default_skip_clone")]
    pub skip_clone: bool,
    #[serde(default)]
    pub skip_build: bool,
}

const fn default_skip_clone() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate, Default)]
pub struct UpdateJobRequest {
    #[validate(length(min = 1))]
    pub app_name: Option<String>,
    #[validate(length(min = 1))]
    pub version: Option<String>,
    pub target_server: Option<String>,
    pub app_branch: Option<String>,
    pub skip_clone: Option<bool>,
    pub skip_build: Option<bool>,
    pub schedule_date: Option<String>,
    pub schedule_time: Option<String>,
    #[validate(url)]
    pub jenkins_url: Option<String>,
    pub jenkins_user: Option<String>,
    pub jenkins_token: Option<String>,
    pub status: Option<JobStatus>,
}

/// `GET /jobs` - all jobs, newest-created first.
pub async fn index(State(app): State<App>) -> Result<Json<Vec<scheduled_job::Model>>, ApiError> {
    let jobs = ScheduledJobEntity::find()
        .order_by_desc(scheduled_job::Column::CreatedAt)
        .order_by_desc(scheduled_job::Column::Id)
        .all(&app.db)
        .await?;

    Ok(Json(jobs))
}

/// `GET /jobs/{id}`
pub async fn show(
    State(app): State<App>,
    Path(id): Path<i32>,
) -> Result<Json<scheduled_job::Model>, ApiError> {
    let job = ScheduledJobEntity::find_by_id(id)
        .one(&app.db)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(job))
}

/// `POST /jobs` - persist a pending job and arm its trigger.
pub async fn create(
    State(app): State<App>,
    ValidatedJson(request): ValidatedJson<CreateJobRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let app_name = required(request.app_name, "app_name")?;
    let version = required(request.version, "version")?;
    let target_server = required(request.target_server, "target_server")?;
    let app_branch = required(request.app_branch, "app_branch")?;
    let raw_date = required(request.schedule_date, "schedule_date")?;
    let raw_time = required(request.schedule_time, "schedule_time")?;
    let jenkins_url = required(request.jenkins_url, "jenkins_url")?;
    let jenkins_user = required(request.jenkins_user, "jenkins_user")?;
    let jenkins_token = required(request.jenkins_token, "jenkins_token")?;

    let schedule_date = parse_schedule_date(&raw_date)?;
    let schedule_time = parse_schedule_time(&raw_time)?;
    let fire_at = schedule_date.and_time(schedule_time);

    // Validate the instant before touching the store, so a past date
    // never leaves an orphaned pending row behind.
    app.scheduler.check_schedulable(fire_at)?;

    let now = Utc::now().naive_utc();
    let job = scheduled_job::ActiveModel {
        app_name: Set(app_name),
        version: Set(version),
        target_server: Set(target_server),
        app_branch: Set(app_branch),
        skip_clone: Set(request.skip_clone),
        skip_build: Set(request.skip_build),
        schedule_date: Set(schedule_date),
        schedule_time: Set(schedule_time),
        jenkins_url: Set(jenkins_url),
        jenkins_user: Set(jenkins_user),
        jenkins_token: Set(jenkins_token),
        status: Set(JobStatus::Pending),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&app.db)
    .await?;

    if let Err(e) = app.scheduler.schedule(job.id, fire_at) {
        // Lost the race against the tolerance window between the check
        // above and now; remove the row so no unarmed pending job remains.
        ScheduledJobEntity::delete_by_id(job.id).exec(&app.db).await?;
        return Err(e.into());
    }

    info!("📅 Job {} scheduled for execution at {}", job.id, fire_at);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Job scheduled successfully",
            "job_id": job.id,
        })),
    ))
}

/// `PUT /jobs/{id}` - partial update of any field.
///
/// Changing schedule_date/schedule_time does NOT recompute the armed
/// trigger; the job still fires at the instant registered on create.
pub async fn update(
    State(app): State<App>,
    Path(id): Path<i32>,
    ValidatedJson(request): ValidatedJson<UpdateJobRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let job = ScheduledJobEntity::find_by_id(id)
        .one(&app.db)
        .await?
        .ok_or(ApiError::NotFound)?;

    let mut active_job: scheduled_job::ActiveModel = job.into();

    if let Some(app_name) = request.app_name {
        active_job.app_name = Set(app_name);
    }
    if let Some(version) = request.version {
        active_job.version = Set(version);
    }
    if let Some(target_server) = request.target_server {
        active_job.target_server = Set(target_server);
    }
    if let Some(app_branch) = request.app_branch {
        active_job.app_branch = Set(app_branch);
    }
    if let Some(skip_clone) = request.skip_clone {
        active_job.skip_clone = Set(skip_clone);
    }
    if let Some(skip_build) = request.skip_build {
        active_job.skip_build = Set(skip_build);
    }
    if let Some(raw_date) = request.schedule_date {
        active_job.schedule_date = Set(parse_schedule_date(&raw_date)?);
    }
    if let Some(raw_time) = request.schedule_time {
        active_job.schedule_time = Set(parse_schedule_time(&raw_time)?);
    }
    if let Some(jenkins_url) = request.jenkins_url {
        active_job.jenkins_url = Set(jenkins_url);
    }
    if let Some(jenkins_user) = request.jenkins_user {
        active_job.jenkins_user = Set(jenkins_user);
    }
    if let Some(jenkins_token) = request.jenkins_token {
        active_job.jenkins_token = Set(jenkins_token);
    }
    if let Some(status) = request.status {
        active_job.status = Set(status);
    }

    active_job.updated_at = Set(Utc::now().naive_utc());
    active_job.update(&app.db).await?;

    Ok(Json(json!({ "message": "Job updated successfully" })))
}

/// `DELETE /jobs/{id}` - remove the job; history rows cascade.
///
/// An armed trigger is not cancelled here. If it later fires, the
/// executor finds no row and no-ops.
pub async fn destroy(
    State(app): State<App>,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let result = ScheduledJobEntity::delete_by_id(id).exec(&app.db).await?;

    if result.rows_affected == 0 {
        return Err(ApiError::NotFound);
    }

    Ok(Json(json!({ "message": "Job deleted successfully" })))
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ApiError> {
    value.ok_or(ApiError::MissingField(name))
}

fn parse_schedule_date(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ApiError::MalformedField("schedule_date"))
}

fn parse_schedule_time(raw: &str) -> Result<NaiveTime, ApiError> {
    NaiveTime::parse_from_str(raw, "%H:%M").map_err(|_| ApiError::MalformedField("schedule_time"))
}
