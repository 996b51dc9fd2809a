use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};

mod config;
mod db;
mod llm;
mod orchestrator;
mod schema;
mod util;
mod validation;
mod web;

use crate::config::{AppConfig, CliArgs};
use crate::db::QueryExecutor;
use crate::llm::LlmManager;
use crate::orchestrator::PromptQl;
use crate::schema::SchemaContextBuilder;
use crate::util::logging::init_tracing;
use crate::web::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env is optional
    dotenvy::dotenv().ok();

    let args = CliArgs::parse();
    init_tracing(&args.log_format);

    let config = match AppConfig::new(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    info!("Initializing LLM manager with backend: {}", config.llm.backend);
    let llm = LlmManager::new(&config.llm).map_err(|e| {
        error!("LLM backend unavailable: {}", e);
        e.to_string()
    });

    info!("Initializing {} database backend", config.database.backend);
    let executor = db::create_backend(&config.database)
        .map(QueryExecutor::new)
        .map_err(|e| {
            error!("Database backend unavailable: {}", e);
            e.to_string()
        });

    let schema = SchemaContextBuilder::load(config.schema.catalog_path.as_deref());

    let mut promptql = PromptQl::new(schema, llm, executor, config.validation.default_limit);
    if promptql.probe_database().await {
        info!("Database connection verified");
    } else {
        warn!("Database is not reachable, starting in degraded mode");
    }

    let app_state = Arc::new(AppState::new(promptql));

    info!("Starting PromptQL server on {}:{}", config.web.host, config.web.port);
    match web::run_server(config.web, app_state).await {
        Ok(_) => info!("Server stopped gracefully"),
        Err(e) => {
            error!("Server error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
