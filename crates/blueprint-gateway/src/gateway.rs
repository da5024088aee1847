//! HTTP Gateway Server
//!
//! Routes generation requests into the pipeline and serves finished archives.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

use blueprint_agent::{
    CompletionProvider, GenerationOutcome, GenerationPipeline, GenerationRequest,
    OpenAICompatibleProvider, DOWNLOAD_PREFIX,
};

use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};

/// Grace period for in-flight requests once a shutdown signal arrives
const FORCED_SHUTDOWN_AFTER: Duration = Duration::from_secs(10);

/// Shared state for the gateway
#[derive(Debug)]
pub struct GatewayState {
    pub config: GatewayConfig,
    pub pipeline: GenerationPipeline,
}

/// The main Gateway server
#[derive(Debug)]
pub struct Gateway {
    state: Arc<GatewayState>,
}

impl Gateway {
    /// Create a gateway backed by the configured OpenAI-compatible provider
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let provider = OpenAICompatibleProvider::new(
            "openai",
            config.provider.api_key.clone(),
            config.provider.base_url.clone(),
        )
        .with_timeout(config.http_timeout())
        .map_err(|e| GatewayError::InvalidConfig(format!("{:#}", e)))?;

        Ok(Self::with_provider(config, Arc::new(provider)))
    }

    /// Create a gateway around any completion provider
    pub fn with_provider(config: GatewayConfig, provider: Arc<dyn CompletionProvider>) -> Self {
        let pipeline = GenerationPipeline::new(provider, config.pipeline_config());
        Self {
            state: Arc::new(GatewayState { config, pipeline }),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.state.config
    }

    /// Build the router
    pub fn build_router(&self) -> Router {
        let archives = ServeDir::new(self.state.config.archives_dir());

        Router::new()
            .route("/api/generate", post(handle_generate))
            .route("/health", get(handle_health))
            .nest_service(DOWNLOAD_PREFIX, archives)
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::clone(&self.state))
    }

    /// Create the output directories the router serves from
    pub async fn prepare_output(&self) -> Result<()> {
        tokio::fs::create_dir_all(self.state.config.projects_dir()).await?;
        tokio::fs::create_dir_all(self.state.config.archives_dir()).await?;
        Ok(())
    }

    /// Start the gateway server and run until a shutdown signal
    pub async fn start(&self) -> Result<()> {
        self.prepare_output().await?;

        let addr = self.state.config.socket_addr()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!(
            %addr,
            output = %self.state.config.output_dir.display(),
            provider = self.state.pipeline.provider_name(),
            model = %self.state.config.provider.model,
            "Blueprint Gateway listening"
        );

        axum::serve(listener, self.build_router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Blueprint Gateway stopped");
        Ok(())
    }
}

/// Successful generation response body
#[derive(Debug, Clone, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub project: String,
    pub files: Vec<String>,
    pub archive: ArchiveLink,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveLink {
    pub name: String,
    pub download_locator: String,
    pub total_size: u64,
}

impl From<GenerationOutcome> for GenerateResponse {
    fn from(outcome: GenerationOutcome) -> Self {
        Self {
            success: true,
            project: outcome.project_name,
            files: outcome.files,
            archive: ArchiveLink {
                name: outcome.archive_name,
                download_locator: outcome.download_locator,
                total_size: outcome.manifest.total_size,
            },
        }
    }
}

async fn handle_generate(
    State(state): State<Arc<GatewayState>>,
    payload: std::result::Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>> {
    let Json(request) = payload.map_err(|r| GatewayError::InvalidRequest(r.body_text()))?;

    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("generate", %request_id);
    let outcome = state.pipeline.generate(request).instrument(span).await?;

    Ok(Json(GenerateResponse::from(outcome)))
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": crate::VERSION,
    }))
}

/// Resolve on SIGINT or SIGTERM, then arm the forced-exit timer
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!(
        grace_secs = FORCED_SHUTDOWN_AFTER.as_secs(),
        "shutdown signal received, draining requests"
    );

    tokio::spawn(async {
        tokio::time::sleep(FORCED_SHUTDOWN_AFTER).await;
        tracing::error!("requests still in flight after grace period, forcing exit");
        std::process::exit(1);
    });
}
