use std::sync::Arc;

use clap::Parser;

use scholarship_admin::admin;
use scholarship_admin::config::Config;
use scholarship_admin::routes::{self, Console};
use scholarship_admin::store::{MemoryStore, PgStore, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = Config::parse();
    let site = admin::default_site()?;

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url, config.max_connections).await?;
            store.migrate(site.schemas()).await?;
            Arc::new(store)
        }
        None => {
            log::warn!("No DATABASE_URL set, records are kept in memory and lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let app = routes::router(Console::new(site, store));
    log::info!("Starting scholarship admin console on http://{}", config.bind);
    axum::Server::bind(&config.bind)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
