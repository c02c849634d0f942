use actix_web::middleware::Logger;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use env_logger::Env;
use log::info;
use sqlx::postgres::PgPoolOptions;

use rollcall::config::{Config, StoreKind, DEFAULT_LOG_FILTER};
use rollcall::core::ports::repository::Manager;
use rollcall::database::{memory::MemoryManager, postgres::PgSqlxManager};
use rollcall::registry::Registry;

async fn serve<M>(config: Config, manager: M) -> anyhow::Result<()>
where
    M: Manager + Send + Sync,
{
    let manager = Data::new(manager);
    let registry = Data::new(Registry::standard::<M>());
    info!("listening on {}:{}", config.bind_address, config.port);
    HttpServer::new(move || {
        let registry = registry.clone();
        App::new()
            .wrap(Logger::default())
            .app_data(manager.clone())
            .app_data(registry.clone())
            .configure(|cfg| rollcall::configure::<M>(&registry, cfg))
    })
    .bind((config.bind_address.as_str(), config.port))?
    .run()
    .await?;
    Ok(())
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or(DEFAULT_LOG_FILTER)).init();
    let config = Config::from_env()?;
    match config.store {
        StoreKind::Memory => {
            info!("using the in-memory store, nothing will be persisted");
            serve(config, MemoryManager::new()).await
        }
        StoreKind::Postgres => {
            let url = config.database_url.clone().unwrap_or_default();
            let pool = PgPoolOptions::new().max_connections(config.max_connections).connect(&url).await?;
            sqlx::migrate!().run(&pool).await?;
            serve(config, PgSqlxManager::new(pool)).await
        }
    }
}
