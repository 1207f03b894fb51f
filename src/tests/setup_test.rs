use sea_orm::ConnectOptions;
use sea_orm_migration::MigratorTrait as _;

use crate::{
    app::App,
    boot::read_config,
    config::Config,
    database::migrations::Migrator,
    environment::Environment,
    executor::JobExecutor,
    router::router,
    scheduler::TriggerScheduler,
};

static TRACING_INITIALIZED: std::sync::Once = std::sync::Once::new();

/// Initialize tracing for tests
fn init_tracing() {
    TRACING_INITIALIZED.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        tracing_subscriber::registry()
            .with(EnvFilter::from_default_env())
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .init();
    });
}

/// Test context: an `axum_test::TestServer` over the real router plus the
/// backing database and scheduler for assertions.
pub struct TestUtils {
    pub server: axum_test::TestServer,
    pub db: sea_orm::DatabaseConnection,
    pub scheduler: TriggerScheduler,
    pub config: Config,
}

/// Creates a test server for integration testing.
///
/// Each test gets its own in-memory SQLite database held open by a
/// single-connection pool: every query sees the same database, nothing
/// leaks between tests, and no external database is needed. Migrations
/// run per test against the fresh database.
///
/// # Panics
///
/// Panics if the database cannot be opened or migrations fail.
pub async fn setup_test() -> TestUtils {
    init_tracing();

    let environment = Environment::Test;
    let config = read_config(&environment);

    let db = {
        let mut options = ConnectOptions::new(config.database.url.clone());
        options.sqlx_logging(false);
        // Exactly one connection: an in-memory SQLite database lives and
        // dies with its connection, so the pool must never rotate it.
        options.max_connections(1);
        options.min_connections(1);

        sea_orm::Database::connect(options)
            .await
            .expect("Failed to connect to the test database")
    };

    Migrator::up(&db, None)
        .await
        .expect("Test database migrations failed");

    let executor = JobExecutor::new(db.clone(), &config.executor);
    let scheduler = TriggerScheduler::new(
        executor.into_fire_callback(),
        config.scheduler.past_tolerance_seconds,
    );

    let app = App {
        config: config.clone(),
        environment,
        db: db.clone(),
        scheduler: scheduler.clone(),
    };

    let server = axum_test::TestServer::new(router(app)).expect("Failed to create test server");

    TestUtils {
        server,
        db,
        scheduler,
        config,
    }
}
