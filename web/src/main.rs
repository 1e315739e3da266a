#![deny(missing_docs)]

//! # Dialysis API Binary
//!
//! Entry point for the Actix Web server.

use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use clap::Parser;
use dialysis_core::{db, DbPool, HistoryStore};
use dialysis_web::config::Config;
use dialysis_web::{routes, telemetry};
use std::net::TcpListener;

fn build_server(
    listener: TcpListener,
    pool: DbPool,
    store: HistoryStore,
) -> std::io::Result<actix_web::dev::Server> {
    Ok(HttpServer::new(move || {
        App::new()
            .wrap(routes::cors_headers())
            .wrap(Logger::default())
            .configure(|cfg| routes::configure(cfg, &pool, &store))
            .default_service(web::to(routes::not_found))
    })
    .listen(listener)?
    .run())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // A missing .env is fine; real environment variables take precedence.
    let _ = dotenvy::dotenv();
    let config = Config::parse();
    telemetry::init(&config.log_filter);

    let pool = db::connect(&config.database_url, config.pool_size).map_err(std::io::Error::other)?;
    if config.skip_migrations {
        tracing::info!("skipping migrations");
    } else {
        let applied = db::run_migrations(&pool).map_err(std::io::Error::other)?;
        tracing::info!(applied, "database schema up to date");
    }

    let store = HistoryStore::new(&config.history_dir);
    let listener = TcpListener::bind(&config.bind)?;
    tracing::info!(
        bind = %config.bind,
        history = %store.root().display(),
        "starting dialysis API"
    );

    build_server(listener, pool, store)?.await
}
