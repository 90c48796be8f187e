use std::sync::Arc;

use cat_breeds::api::HttpTransport;
use cat_breeds::app::{App, Flags};
use cat_breeds::breeds::BreedApi;
use cat_breeds::config::Config;
use cat_breeds::logging;
use cat_breeds::runtime::Runtime;
use cat_breeds::subscription::query::QueryClient;
use clap::Parser;
use tracing::info;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();
    color_eyre::install()?;

    let config = Config::parse();
    logging::init(config.log_file.as_deref())?;

    let transport = HttpTransport::new(&config.base_url, config.api_key.as_deref())?;
    let client = Arc::new(QueryClient::with_config(config.query_config()));
    info!(base_url = %config.base_url, ?client, "starting");

    let flags = Flags {
        gallery_limit: config.gallery_limit,
        gc_interval: config.gc_interval(),
        ..Flags::new(BreedApi::new(transport), Arc::clone(&client))
    };

    let mut terminal = ratatui::init();
    let result = Runtime::<App>::new(flags, config.frame_rate)
        .run(&mut terminal)
        .await;
    ratatui::restore();

    info!(entries = client.len(), "exiting");
    result
}
