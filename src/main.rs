// src/main.rs
use actix_files::Files;
use actix_web::{web, App, HttpServer};
use pendulum_sim::config::ServerConfig;
use pendulum_sim::ui::simulate_handler;
use std::io;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env().map_err(io::Error::other)?;
    info!(host = %config.host, port = config.port, static_dir = %config.static_dir.display(), "starting server");

    let static_dir = config.static_dir.clone();
    HttpServer::new(move || {
        App::new()
            .route("/simulate", web::post().to(simulate_handler))
            .service(Files::new("/", static_dir.clone()).index_file("index.html"))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
