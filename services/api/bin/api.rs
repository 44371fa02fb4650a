//! Main Entrypoint for the Reflection API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Opening the SQLite database and running migrations.
//! 3. Building the language-model gateway and the session controller.
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use reflect_api::{
    config::{Config, Provider},
    db::Db,
    router::create_router,
    state::AppState,
};
use reflect_core::{
    LanguageModelGateway, OpenAICompatibleGateway, ScriptedGateway, SessionController,
    TranscriptStore, prompts::PromptSet, session::SessionPolicy,
};
use sqlx::sqlite::SqlitePoolOptions;
use std::{collections::HashMap, fs, net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1/";
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {e}");
        return;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

/// A helper function to load prompts from a directory.
fn load_prompts(prompts_path: &std::path::Path) -> anyhow::Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();
    let entries = fs::read_dir(prompts_path)
        .with_context(|| format!("Failed to read prompts directory {}", prompts_path.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let prompt_key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem")?
                .to_string();
            let content = fs::read_to_string(&path)?;
            prompts.insert(prompt_key, content);
        }
    }
    Ok(prompts)
}

fn hosted_gateway(
    config: &Config,
    api_key: Option<&String>,
    api_base: &str,
) -> anyhow::Result<Arc<dyn LanguageModelGateway>> {
    let api_key = api_key.context("API key missing for the configured provider")?;
    let prompts = PromptSet::from_map(&load_prompts(&config.prompts_path)?)?;
    let openai_config = OpenAIConfig::new()
        .with_api_key(api_key)
        .with_api_base(api_base);
    Ok(Arc::new(OpenAICompatibleGateway::new(
        openai_config,
        config.chat_model.clone(),
        config.grading_model.clone(),
        prompts,
    )))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize Database ---
    let pool = SqlitePoolOptions::new()
        .connect(&config.database_url)
        .await
        .context("Failed to open database")?;
    let db = Db::new(pool);
    db.run_migrations().await?;
    let store: Arc<dyn TranscriptStore> = Arc::new(db);
    info!("Database opened and migrations are up-to-date.");

    // --- 4. Initialize the Gateway and Controller ---
    let gateway: Arc<dyn LanguageModelGateway> = match &config.provider {
        Provider::Gemini => {
            info!("Using Gemini provider.");
            hosted_gateway(&config, config.gemini_api_key.as_ref(), GEMINI_API_BASE)?
        }
        Provider::OpenAI => {
            info!("Using OpenAI provider.");
            hosted_gateway(&config, config.openai_api_key.as_ref(), OPENAI_API_BASE)?
        }
        Provider::Scripted => {
            info!("Using the offline scripted provider.");
            Arc::new(ScriptedGateway::new(config.pass_threshold))
        }
    };

    let policy = SessionPolicy {
        turn_limit: config.turn_limit,
        pass_threshold: config.pass_threshold,
    };
    let controller = Arc::new(SessionController::new(
        gateway,
        store.clone(),
        policy,
        config.admin_id.clone(),
    ));

    let app_state = Arc::new(AppState { controller, store });

    // --- 5. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 6. Start Server ---
    info!(
        provider = ?config.provider,
        chat_model = %config.chat_model,
        grading_model = %config.grading_model,
        turn_limit = config.turn_limit,
        pass_threshold = config.pass_threshold,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
