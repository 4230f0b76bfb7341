use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;
use dotenvy::dotenv;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use lms::auth::handlers::bootstrap_admin;
use lms::config::{Config, StoreBackend};
use lms::db::init_db;
use lms::docs::ApiDoc;
use lms::routes;
use lms::state::AppState;
use lms::store::{LeaveStore, MemoryLeaveStore, MySqlLeaveStore};

const WARMUP_BATCH_SIZE: usize = 250;

#[get("/")]
async fn index() -> impl Responder {
    "Leave management service"
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn LeaveStore>> {
    match config.store_backend {
        StoreBackend::MySql => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set")?;
            let pool = init_db(url).await.context("failed to connect to database")?;
            Ok(Arc::new(MySqlLeaveStore::new(pool)))
        }
        StoreBackend::Memory => {
            warn!("Using in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryLeaveStore::new()))
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let store = open_store(&config).await?;
    let state = Data::new(AppState::new(store, &config));

    bootstrap_admin(&state, &config).await?;

    let sessions = state.sessions.clone();
    let changes = sessions.subscribe();
    actix_web::rt::spawn(async move {
        if let Err(e) = sessions.hydrate(WARMUP_BATCH_SIZE).await {
            warn!(error = %e, "Failed to warm up profile cache");
        }
        sessions.follow_changes(changes).await;
    });

    let state_for_filter = state.clone();
    actix_web::rt::spawn(async move {
        let store = state_for_filter.store().clone();
        if let Err(e) = state_for_filter
            .emails
            .warmup(store.as_ref(), WARMUP_BATCH_SIZE)
            .await
        {
            warn!(error = %e, "Failed to warm up email filter");
        }
    });

    let server_addr = config.server_addr.clone();
    let config_data = Data::new(config.clone());

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(state.clone())
            .app_data(config_data.clone())
            .service(index)
            .configure(|cfg| routes::configure(cfg, config.clone()))
    })
    .bind(server_addr)?
    .run()
    .await?;

    info!("Server stopped");
    Ok(())
}
