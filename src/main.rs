mod analytics;
mod auth;
mod capability;
mod config;
mod error;
mod export;
mod model;
mod router;
mod routes;
mod seed;
mod store;
mod util;

use auth::UserDirectory;
use chrono::Utc;
use config::Config;
use router::{AppState, create_router, setup_templates, shutdown_signal};
use store::{AppData, DataStore};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use util::assets::AssetManifest;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.rust_log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let (directory, data) = if config.seed_demo_data {
        let users = seed::demo_users();
        let data = seed::demo_data(&users, Utc::now());
        info!(
            "seeded {} users and {} events",
            users.len(),
            data.events().len()
        );
        (UserDirectory::new(users), DataStore::new(data))
    } else {
        (UserDirectory::default(), DataStore::new(AppData::new()))
    };

    let templates = setup_templates(
        &config.templates_dir,
        AssetManifest::scan(&config.static_dir),
    );
    let state = AppState::new(directory, data, templates);
    let app = create_router(state, config.session_expiry_hours, &config.static_dir);

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!("listening on {}", config.bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
