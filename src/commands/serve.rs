use std::net::SocketAddr;

use axum::Router;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::{
    app::App,
    config::Config,
    database::{
        models::{
            job_status::JobStatus,
            scheduled_job::{self, Entity as ScheduledJobEntity},
        },
        setup_database,
    },
    environment::Environment,
    executor::JobExecutor,
    router::router,
    scheduler::TriggerScheduler,
};

pub async fn handle_serve_command(environment: Environment, config: Config) {
    let (db, migration_receiver) = setup_database(&config.database).await;

    // Wait for migrations to complete before serving anything
    match migration_receiver.await {
        Ok(Ok(())) => {
            info!("✅ Database is ready!");
        }
        Ok(Err(e)) => {
            error!("❌ Database setup failed: {}", e);
            return;
        }
        Err(_) => {
            error!("❌ Database setup channel closed unexpectedly");
            return;
        }
    }

    let executor = JobExecutor::new(db.clone(), &config.executor);
    let scheduler = TriggerScheduler::new(
        executor.into_fire_callback(),
        config.scheduler.past_tolerance_seconds,
    );

    // The trigger set is memory-only, so a restart dropped every armed
    // trigger. Re-arm the ones whose instant is still ahead of us.
    if let Err(e) = rearm_pending_triggers(&db, &scheduler).await {
        error!("❌ Failed to re-arm pending triggers: {}", e);
        return;
    }

    let port = config.server.port;
    let app = App {
        config,
        environment,
        db,
        scheduler,
    };

    start_server(router(app), port).await;
}

/// Re-register triggers for jobs that are still pending. Jobs whose
/// instant already passed stay pending and are only reported; settling
/// them is left to a human re-scheduling through the API.
async fn rearm_pending_triggers(
    db: &DatabaseConnection,
    scheduler: &TriggerScheduler,
) -> Result<(), DbErr> {
    let pending_jobs = ScheduledJobEntity::find()
        .filter(scheduled_job::Column::Status.eq(JobStatus::Pending))
        .all(db)
        .await?;

    let mut armed = 0;
    let mut expired = 0;

    for job in pending_jobs {
        let fire_at = job.trigger_instant();
        match scheduler.schedule(job.id, fire_at) {
            Ok(()) => armed += 1,
            Err(_) => {
                warn!(
                    "Pending job {} ('{}') missed its instant {} while no process was running",
                    job.id, job.app_name, fire_at
                );
                expired += 1;
            }
        }
    }

    if armed > 0 {
        info!("📅 Re-armed {} pending trigger(s) after restart", armed);
    }
    if expired > 0 {
        warn!(
            "{} pending job(s) have instants in the past and were not re-armed",
            expired
        );
    }

    Ok(())
}

async fn start_server(router: Router, port: u16) {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind server address");

    info!("🌐 Server starting on http://{}", addr);
    axum::serve(listener, router)
        .await
        .expect("Server exited with an error");
}
