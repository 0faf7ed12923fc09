use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use kiosk_agent::llm::HttpLlmClient;
use kiosk_agent::oracle::OracleClassifier;
use kiosk_chat::{NegotiationSweeper, NoopSink, NotificationSink, Notifier, Orchestrator};
use kiosk_core::config::{AppConfig, ConfigError};
use kiosk_core::session::InMemorySessionStore;
use kiosk_db::repositories::{
    SqlCustomerRepository, SqlOrderRepository, SqlProductRepository,
};
use kiosk_db::{connect, migrations, DbPool};

/// Fully wired application. The orchestrator is the entry point a chat
/// transport drives; the transport itself is an external collaborator and
/// plugs in through the notification sink.
pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub orchestrator: Arc<Orchestrator>,
    pub sweeper: NegotiationSweeper,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("oracle client setup failed: {0}")]
    Oracle(#[source] anyhow::Error),
}

pub async fn bootstrap(config: AppConfig) -> Result<Application, BootstrapError> {
    bootstrap_with_sink(config, Arc::new(NoopSink)).await
}

pub async fn bootstrap_with_sink(
    config: AppConfig,
    sink: Arc<dyn NotificationSink>,
) -> Result<Application, BootstrapError> {
    info!(event_name = "bootstrap_start", "starting application bootstrap");

    let db_pool = connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "bootstrap_database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "bootstrap_migrations_applied", "database migrations applied");

    let customers = Arc::new(SqlCustomerRepository::new(db_pool.clone()));
    let products = Arc::new(SqlProductRepository::new(db_pool.clone()));
    let orders = Arc::new(SqlOrderRepository::new(db_pool.clone()));
    let sessions = Arc::new(InMemorySessionStore::new());

    let llm = HttpLlmClient::from_config(&config.oracle).map_err(BootstrapError::Oracle)?;
    let classifier = Arc::new(OracleClassifier::new(Arc::new(llm)));

    let notifier = Notifier::new(sink);
    let orchestrator = Arc::new(Orchestrator::new(
        customers,
        products,
        orders,
        sessions.clone(),
        classifier,
        notifier.clone(),
        config.chat.clone(),
        config.business.clone(),
    ));

    let sweeper = NegotiationSweeper::new(
        sessions,
        notifier,
        orchestrator.turn_locks(),
        config.chat.negotiation_timeout_secs,
        config.chat.sweep_interval_secs,
    );

    Ok(Application { config, db_pool, orchestrator, sweeper })
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use kiosk_core::config::AppConfig;

    use super::{bootstrap, BootstrapError};

    fn test_config(database_url: &str) -> AppConfig {
        let mut config = AppConfig::default();
        config.database.url = database_url.to_string();
        config.database.max_connections = 1;
        config.oracle.api_key = Some(SecretString::from("test-key"));
        config
    }

    #[tokio::test]
    async fn bootstrap_connects_migrates_and_wires_the_pipeline() {
        let app = bootstrap(test_config("sqlite::memory:?cache=shared"))
            .await
            .expect("bootstrap should succeed");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('customers', 'products', 'orders', 'order_sequences')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("schema tables should exist after bootstrap");
        assert_eq!(table_count, 4);

        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_an_oracle_key() {
        let mut config = test_config("sqlite::memory:?cache=shared");
        config.oracle.api_key = None;

        let result = bootstrap(config).await;
        match result {
            Err(BootstrapError::Oracle(err)) => {
                assert!(err.to_string().contains("oracle.api_key"));
            }
            other => panic!("expected oracle setup failure, got {:?}", other.map(|_| ())),
        }
    }
}
