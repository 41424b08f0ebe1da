pub mod api;
pub mod cache;
pub mod error;
pub mod sanity;
pub mod state;
pub mod webhook;

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt::time::ChronoLocal};

use cache::LogInvalidator;
use sanity::{FetchConfig, SanityClient, SanityConfig};
use state::AppState;
use webhook::WebhookConfig;

pub async fn run() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string()))
        .with_env_filter(EnvFilter::from_env("FOLIO_LOG"))
        .init();

    let config = SanityConfig::from_env().expect("incomplete sanity configuration");
    let sanity = SanityClient::new(&config, FetchConfig::default());

    let app = AppState::new(sanity, Arc::new(LogInvalidator), WebhookConfig::from_env());

    api::run_server(app).await
}
