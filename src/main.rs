use std::sync::Arc;
use triage_engine::{
    api::{build_router, AppState},
    config::Config,
    llm::{GenerativeLayer, LlmClient},
    ml::{bundle::ModelProvider, MlEngine},
    triage::TriageOrchestrator,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        default_config()
    });

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "triage_engine={},tower_http=info",
            config.observability.log_level
        )
        .into()
    });
    if config.observability.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(
        service = %config.observability.service_name,
        "Starting Triage Engine v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Load classifier artifacts; absence is a degraded mode, not an error
    let provider = Arc::new(ModelProvider::load(&config.models.dir));
    if provider.is_available() {
        tracing::info!(
            "✅ Model bundle loaded from {}",
            config.models.dir.display()
        );
    } else {
        tracing::warn!("⚠️  No model bundle at {}", config.models.dir.display());
        tracing::warn!("   Classifier tier disabled, continuing with fallback tiers");
    }

    // Generative tier is optional and keyed off the environment
    let generative = match LlmClient::from_env(&config.llm) {
        Ok(Some(client)) => {
            tracing::info!(model = client.model(), "✅ Generative tier configured");
            Some(GenerativeLayer::new(Arc::new(client)))
        }
        Ok(None) => {
            tracing::warn!(
                "⚠️  {} not set, generative tier disabled",
                config.llm.api_key_env
            );
            None
        }
        Err(e) => {
            tracing::warn!("⚠️  Generative tier initialization failed: {}", e);
            tracing::warn!("   Continuing without LLM analysis");
            None
        }
    };

    let orchestrator = Arc::new(TriageOrchestrator::new(
        MlEngine::new(provider.clone()),
        generative,
    ));
    tracing::info!("✅ Triage orchestrator initialized");

    // Build HTTP router
    let app_state = AppState::new(orchestrator, provider);
    let app = build_router(app_state);

    // Start HTTP server
    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_addr).await?;

    tracing::info!("🚀 HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   Triage analyze: http://{}/v1/triage/analyze", http_addr);
    tracing::info!("   Raw prediction: http://{}/v1/triage/predict", http_addr);
    tracing::info!("   Wearable screen: http://{}/v1/triage/wearable", http_addr);
    tracing::info!("   Model status: http://{}/v1/models/status", http_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let http_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(http_listener, app).await {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    tokio::select! {
        _ = http_handle => {
            tracing::warn!("HTTP server stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    tracing::info!("Shutting down gracefully...");
    Ok(())
}

fn default_config() -> Config {
    use triage_engine::config::*;

    Config {
        server: ServerConfig {
            host: "0.0.0.0".to_string(),
            http_port: 8080,
            request_timeout_secs: 30,
        },
        models: ModelsConfig {
            dir: "models".into(),
        },
        llm: LlmConfig::default(),
        training: TrainingConfig::default(),
        observability: ObservabilityConfig {
            log_level: "info".to_string(),
            json_logs: false,
            service_name: "triage-engine".to_string(),
        },
    }
}
