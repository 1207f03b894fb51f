use chrono::{NaiveDate, NaiveTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::{
    database::models::{
        history_status::HistoryStatus, job_history, job_status::JobStatus, scheduled_job,
    },
    executor::JobExecutor,
    tests::setup_test::setup_test,
};

async fn insert_job(
    db: &DatabaseConnection,
    jenkins_url: &str,
    status: JobStatus,
) -> scheduled_job::Model {
    let now = Utc::now().naive_utc();
    scheduled_job::ActiveModel {
        app_name: Set("svc".to_string()),
        version: Set("1.2.0".to_string()),
        target_server: Set("prod1".to_string()),
        app_branch: Set("main".to_string()),
        skip_clone: Set(true),
        skip_build: Set(false),
        schedule_date: Set(NaiveDate::from_ymd_opt(2099, 1, 1).unwrap()),
        schedule_time: Set(NaiveTime::from_hms_opt(0, 0, 0).unwrap()),
        jenkins_url: Set(jenkins_url.to_string()),
        jenkins_user: Set("u".to_string()),
        jenkins_token: Set("t".to_string()),
        status: Set(status),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

async fn history_for(db: &DatabaseConnection, job_id: i32) -> Vec<job_history::Model> {
    job_history::Entity::find()
        .filter(job_history::Column::JobId.eq(job_id))
        .all(db)
        .await
        .unwrap()
}

async fn reload(db: &DatabaseConnection, job_id: i32) -> scheduled_job::Model {
    scheduled_job::Entity::find_by_id(job_id)
        .one(db)
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn successful_call_completes_the_job_and_records_history() {
    let test = setup_test().await;
    let build_server = MockServer::start().await;

    // "Basic dTp0" is base64("u:t")
    Mock::given(method("POST"))
        .and(path("/job/PTF-ROUTING-LUAN/buildWithParameters"))
        .and(query_param("delay", "0sec"))
        .and(header("authorization", "Basic dTp0"))
        .and(body_string_contains("VERSION=1.2.0"))
        .and(body_string_contains("APP_NAME=svc"))
        .and(body_string_contains("SKIP_CLONE=true"))
        .and(body_string_contains("SKIP_BUILD=false"))
        .and(body_string_contains("TARGET_SERVER=prod1"))
        .and(body_string_contains("APP_BRANCH=main"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Build scheduled"))
        .expect(1)
        .mount(&build_server)
        .await;

    let job = insert_job(&test.db, &build_server.uri(), JobStatus::Pending).await;
    let executor = JobExecutor::new(test.db.clone(), &test.config.executor);

    executor.execute(job.id).await.unwrap();

    let reloaded = reload(&test.db, job.id).await;
    assert_eq!(reloaded.status, JobStatus::Completed);

    let history = history_for(&test.db, job.id).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, HistoryStatus::Success);
    assert_eq!(history[0].response_text.as_deref(), Some("Build scheduled"));
}

#[tokio::test]
async fn non_2xx_response_fails_the_job_and_records_the_status() {
    let test = setup_test().await;
    let build_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&build_server)
        .await;

    let job = insert_job(&test.db, &build_server.uri(), JobStatus::Pending).await;
    let executor = JobExecutor::new(test.db.clone(), &test.config.executor);

    executor.execute(job.id).await.unwrap();

    let reloaded = reload(&test.db, job.id).await;
    assert_eq!(reloaded.status, JobStatus::Failed);

    let history = history_for(&test.db, job.id).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, HistoryStatus::Failed);
    let response_text = history[0].response_text.as_deref().unwrap();
    assert!(response_text.contains("500"), "got: {response_text}");
    assert!(response_text.contains("boom"), "got: {response_text}");
}

#[tokio::test]
async fn connection_error_fails_the_job_and_records_the_error() {
    let test = setup_test().await;

    // Nothing listens on this port, so the request cannot connect.
    let job = insert_job(&test.db, "http://127.0.0.1:9", JobStatus::Pending).await;
    let executor = JobExecutor::new(test.db.clone(), &test.config.executor);

    executor.execute(job.id).await.unwrap();

    let reloaded = reload(&test.db, job.id).await;
    assert_eq!(reloaded.status, JobStatus::Failed);

    let history = history_for(&test.db, job.id).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, HistoryStatus::Failed);
    let response_text = history[0].response_text.as_deref().unwrap();
    assert!(
        response_text.contains("request error"),
        "got: {response_text}"
    );
}

#[tokio::test]
async fn executing_a_missing_job_is_a_noop() {
    let test = setup_test().await;
    let executor = JobExecutor::new(test.db.clone(), &test.config.executor);

    executor.execute(4242).await.unwrap();

    let history = job_history::Entity::find().all(&test.db).await.unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn a_settled_job_is_not_executed_again() {
    let test = setup_test().await;
    let build_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&build_server)
        .await;

    let job = insert_job(&test.db, &build_server.uri(), JobStatus::Completed).await;
    let executor = JobExecutor::new(test.db.clone(), &test.config.executor);

    executor.execute(job.id).await.unwrap();

    let reloaded = reload(&test.db, job.id).await;
    assert_eq!(reloaded.status, JobStatus::Completed);
    assert!(history_for(&test.db, job.id).await.is_empty());
}
