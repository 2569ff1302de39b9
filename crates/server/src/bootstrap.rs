use std::sync::Arc;

use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::info;

use bento_agent::{ConversationRuntime, OpenAiChatClient};
use bento_core::config::{AppConfig, ConfigError, LoadOptions};
use bento_db::repositories::SqlProfileRepository;
use bento_db::{connect_with_settings, migrations, DbPool};
use bento_line::{HttpReplyClient, ResponseComposer};
use bento_places::HttpPlacesClient;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub runtime: Arc<ConversationRuntime>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("http client construction failed: {0}")]
    HttpClient(String),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let profiles = Arc::new(SqlProfileRepository::new(db_pool.clone()));
    let replies = Arc::new(
        HttpReplyClient::new(&config.line)
            .map_err(|error| BootstrapError::HttpClient(error.to_string()))?,
    );
    let places = Arc::new(
        HttpPlacesClient::new(&config.places)
            .map_err(|error| BootstrapError::HttpClient(error.to_string()))?,
    );
    let llm = Arc::new(
        OpenAiChatClient::new(&config.llm)
            .map_err(|error| BootstrapError::HttpClient(error.to_string()))?,
    );
    let composer = ResponseComposer::new(
        config.places.base_url.clone(),
        config.places.api_key.expose_secret().to_owned(),
    );

    let runtime = Arc::new(ConversationRuntime::new(profiles, replies, places, llm, composer));

    Ok(Application { config, db_pool, runtime })
}
