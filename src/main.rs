use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use std::sync::Arc;

mod api;
mod attendance;
mod auth;
mod config;
mod db;
mod docs;
mod model;
mod models;
mod routes;
mod state;
mod store;
mod utils;

use config::Config;
use db::init_db;
use state::AppState;
use store::MySqlStore;

use crate::docs::ApiDoc;
use crate::utils::identity_cache;
use crate::utils::identity_filter;
use tracing::{error, info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let policy = config.policy()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let state = match &config.database_url {
        Some(url) => {
            let pool = init_db(url).await?;

            let pool_for_filter_warmup = pool.clone();
            let pool_for_cache_warmup = pool.clone();

            actix_web::rt::spawn(async move {
                if let Err(e) =
                    identity_filter::warmup_identity_filter(&pool_for_filter_warmup, 100).await
                {
                    error!(error = %e, "Failed to warm up identity filter");
                }
            });

            actix_web::rt::spawn(async move {
                // users who logged in during the last 30 days, 250 per batch
                if let Err(e) =
                    identity_cache::warmup_identity_cache(&pool_for_cache_warmup, 30, 250).await
                {
                    error!(error = %e, "Failed to warm up identity cache");
                }
            });

            let store = Arc::new(MySqlStore::new(pool));
            AppState::new(store.clone(), store, policy)
        }
        None => {
            warn!("DATABASE_URL not set, using the in-memory store; data is lost on restart");
            AppState::in_memory(policy)
        }
    };

    info!(
        cutoff = %policy.check_in_cutoff,
        half_day_hours = policy.half_day_hours,
        utc_offset = %policy.utc_offset,
        "Attendance policy loaded"
    );

    let state = Data::new(state);
    let server_addr = config.server_addr.clone();
    let config_data = Data::new(config.clone());

    HttpServer::new(move || {
        let config = config.clone();
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                // wildcard {_:.*} matches the UI's JS/CSS files
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(state.clone())
            .app_data(config_data.clone())
            .configure(move |cfg| routes::configure(cfg, config))
    })
    .bind(&server_addr)?
    .run()
    .await?;

    Ok(())
}
