use std::sync::Arc;

use axum::Router;
use thiserror::Error;
use tracing::info;

use sourcely_agent::{AgentRuntime, ChatCompletionsClient, LlmClient, LlmError};
use sourcely_core::config::{AppConfig, ConfigError, LoadOptions};
use sourcely_db::repositories::{
    SqlChatHistoryRepository, SqlProductRepository, SqlSupplierRepository,
};
use sourcely_db::{connect_with_settings, migrations, DbPool};

use crate::api::{self, AppState};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: AppState,
}

impl Application {
    pub fn router(&self) -> Router {
        api::router(self.state.clone(), self.db_pool.clone())
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("llm client setup failed: {0}")]
    Llm(#[from] LlmError),
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

    let llm = ChatCompletionsClient::from_config(&config.llm)?;
    info!(
        event_name = "system.bootstrap.llm_configured",
        correlation_id = "bootstrap",
        provider = config.llm.provider.as_str(),
        model = llm.model(),
        endpoint = llm.endpoint(),
        "llm client configured"
    );
    let llm: Arc<dyn LlmClient> = Arc::new(llm);

    let products = Arc::new(SqlProductRepository::new(db_pool.clone()));
    let suppliers = Arc::new(SqlSupplierRepository::new(db_pool.clone()));
    let state = AppState {
        runtime: Arc::new(AgentRuntime::with_llm(llm, products.clone(), suppliers.clone())),
        products,
        suppliers,
        chats: Arc::new(SqlChatHistoryRepository::new(db_pool.clone())),
    };

    Ok(Application { config, db_pool, state })
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use sourcely_core::config::{ConfigOverrides, LlmProvider, LoadOptions};
    use sourcely_db::DemoCatalog;

    use crate::api::testing::send;
    use crate::bootstrap::bootstrap;

    fn overrides(provider: LlmProvider, api_key: Option<&str>) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:?cache=shared".to_string()),
                llm_provider: Some(provider),
                llm_api_key: api_key.map(str::to_string),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_hosted_llm_key() {
        let result = bootstrap(overrides(LlmProvider::Groq, None)).await;

        let message = result.err().expect("missing key should fail").to_string();
        assert!(message.contains("llm.api_key"), "unexpected error: {message}");
    }

    #[tokio::test]
    async fn bootstrap_serves_the_seeded_catalog() {
        let app = bootstrap(overrides(LlmProvider::Ollama, None))
            .await
            .expect("bootstrap should succeed against a local model");
        DemoCatalog::load(&app.db_pool).await.expect("seed demo catalog");
        let router = app.router();

        let (status, health) = send(&router, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["database"]["status"], "ready");

        let (status, supplier) = send(&router, "GET", "/suppliers/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(supplier["name"], "TechMaster");

        let (_, products) = send(&router, "GET", "/products?limit=5", None).await;
        assert_eq!(products.as_array().map(Vec::len), Some(5));

        app.db_pool.close().await;
    }
}
