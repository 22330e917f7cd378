use actix_web::{App, HttpServer, middleware, web};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tour_geo::config::Config;
use tour_geo::http::{self, AppState};
use tour_geo::store::SqliteStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env().map_err(std::io::Error::other)?;
    let store = SqliteStore::open(&config.database_path).map_err(std::io::Error::other)?;
    let state = web::Data::new(AppState::from_config(&config, store).map_err(std::io::Error::other)?);

    info!(
        bind = %config.bind_address,
        isochrone = ?config.isochrone_provider,
        "starting tour-geo server"
    );

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(http::config)
    })
    .bind(config.bind_address.as_str())?
    .run()
    .await
}
