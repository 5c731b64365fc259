use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tracing::info;

use atelier_core::config::AppConfig;
use atelier_core::workflow::{AppointmentService, QuoteService};
use atelier_db::{connect, migrations, seed_catalog, DbPool};
use atelier_db::{SqlCatalogStore, SqlRequestStore};

use crate::routes::{self, AppState};
use crate::{health, notify};

pub struct App {
    pub config: Arc<AppConfig>,
    pub db_pool: DbPool,
    pub router: Router,
}

pub async fn bootstrap_with_config(config: AppConfig) -> anyhow::Result<App> {
    let db_pool = connect(&config.database)
        .await
        .with_context(|| format!("connecting to `{}`", config.database.url))?;

    migrations::run_pending(&db_pool).await.context("running database migrations")?;
    let seeded = seed_catalog(&db_pool).await.context("seeding the demo catalog")?;
    if seeded.options > 0 {
        info!(
            event_name = "system.bootstrap.catalog_seeded",
            offers = seeded.offers,
            options = seeded.options,
            "empty catalog seeded with demo data"
        );
    }

    let config = Arc::new(config);
    let notifier = notify::from_config(&config);
    let catalog = Arc::new(SqlCatalogStore::new(db_pool.clone()));
    let requests = Arc::new(SqlRequestStore::new(db_pool.clone()));

    let state = AppState {
        config: Arc::clone(&config),
        catalog: Arc::clone(&catalog),
        quotes: Arc::new(QuoteService::new(
            catalog,
            Arc::clone(&requests),
            notifier.clone(),
        )),
        appointments: Arc::new(AppointmentService::new(requests, notifier)),
    };

    let router = routes::router(state).merge(health::router(db_pool.clone()));

    info!(
        event_name = "system.bootstrap.ready",
        database = %config.database.url,
        "application assembled"
    );

    Ok(App { config, db_pool, router })
}
