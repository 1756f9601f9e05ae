#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the inventory sync.
//!
//! Exposes one chunk of the reconciliation per `POST /api/sync/chunk`
//! request. The server never loops over the catalog itself: an external
//! scheduler calls it repeatedly, passing back the `nextOffset` of the
//! previous response until `isComplete` is true.

mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use inventory_sync_config::{ConnectionSettings, SyncConfig};
use inventory_sync_erp::{ErpClient, ErpSource};
use inventory_sync_storefront::{GraphqlStorefront, Storefront};

/// Shared application state.
///
/// Holds only the clients and configuration. Per-invocation state such as
/// the resolved storefront location is rebuilt for every request.
pub struct AppState {
    /// ERP data provider.
    pub erp: Arc<dyn ErpSource>,
    /// Storefront backend.
    pub storefront: Arc<dyn Storefront>,
    /// Engine tunables.
    pub config: SyncConfig,
    /// ERP location whose stock is synced.
    pub erp_location_id: String,
}

/// Registers the API routes on `cfg`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/sync/chunk", web::post().to(handlers::sync_chunk)),
    );
}

/// Starts the inventory sync API server.
///
/// Loads the engine configuration and connection settings from the
/// environment, builds the ERP and storefront clients, and starts the
/// Actix-Web HTTP server. This is a regular async function; the caller is
/// responsible for providing the async runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the configuration is invalid, a
/// required environment variable is missing, or the HTTP server fails to
/// bind or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    log::info!("Loading configuration...");
    let config = SyncConfig::load().map_err(std::io::Error::other)?;
    let settings = ConnectionSettings::from_env().map_err(std::io::Error::other)?;

    let client = reqwest::Client::new();
    let state = web::Data::new(AppState {
        erp: Arc::new(ErpClient::from_settings(client.clone(), &settings.erp)),
        storefront: Arc::new(GraphqlStorefront::from_settings(
            client,
            &settings.storefront,
        )),
        config,
        erp_location_id: settings.erp.location_id,
    });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
