use std::process;
use std::sync::Arc;

use catfetch::api::TagRegistry;
use catfetch::cache::CatDb;
use catfetch::client::CatClient;
use catfetch::config::AppConfig;
use catfetch::images::CatPic;
use catfetch::ui;
use dotenv::dotenv;
use env_logger::Env;
use log::{error, info, warn};

#[tokio::main]
async fn main() {
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };
    info!("Configuration loaded successfully");

    let db = match CatDb::open(&config.db_path) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to open cat store {}: {}", config.db_path.display(), e);
            process::exit(1);
        }
    };
    log_stored_versions(&db);

    let tags = TagRegistry::new();
    {
        let tags = tags.clone();
        let timeout = config.tags_timeout();
        tokio::spawn(async move {
            if let Err(e) = tags.fetch(timeout).await {
                warn!("Could not fetch available tags: {}", e);
            }
        });
    }

    let client = match CatClient::new(Arc::clone(&db), tags, config.request_timeout()) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            process::exit(1);
        }
    };

    let pic = Arc::new(CatPic::default());
    ui::run(&config, client, pic).await;

    // In-flight workers may still hold the store; closing is best effort.
    match Arc::try_unwrap(db) {
        Ok(db) => {
            if let Err(e) = db.close() {
                error!("Failed to close cat store: {}", e);
            }
        }
        Err(_) => warn!("Cat store still in use, leaving it to process exit"),
    }
}

fn log_stored_versions(db: &CatDb) {
    match db.version_summaries() {
        Ok(summaries) => {
            info!("{} stored cat versions", summaries.len());
            for summary in summaries {
                info!(
                    "cat {} version {}: {} ({} KB)",
                    summary.cat_id,
                    summary.version_id,
                    summary.metadata.as_deref().unwrap_or("<no metadata>"),
                    summary.data_len / 1024
                );
            }
        }
        Err(e) => error!("Failed to list stored cats: {}", e),
    }
}
