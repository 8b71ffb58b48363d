mod cli;
mod telemetry;

use crate::cli::{StorageBackendArg, CLI};
use clap::Parser;
use littleurl_core::{LifecycleSettings, RecordStore};
use littleurl_gateway::{App, AppState};
use littleurl_generator::RandomKeyGenerator;
use littleurl_lifecycle::{LifecycleEngine, LittleUrlService};
use littleurl_storage::{InMemoryRecordStore, MySqlRecordStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CLI::try_parse()?;
    telemetry::init(config.log_format);

    let settings = config.lifecycle_settings();
    info!(
        listen_addr = %config.listen_addr,
        storage_backend = %config.storage,
        retention_days = settings.retention_days,
        collision_policy = ?settings.collision_policy,
        "starting littleurl gateway"
    );

    match config.storage {
        StorageBackendArg::InMemory => {
            run_server(config.listen_addr, InMemoryRecordStore::new(), settings).await?;
        }
        StorageBackendArg::Mysql => {
            let mysql_dsn = config
                .mysql_dsn
                .as_deref()
                .ok_or("mysql dsn is required when storage backend is mysql")?;
            let store = MySqlRecordStore::connect(mysql_dsn, config.table_name.as_str()).await?;
            store.ensure_schema().await?;
            info!(table = store.table(), "mysql schema ready");
            run_server(config.listen_addr, store, settings).await?;
        }
    }

    Ok(())
}

async fn run_server<S: RecordStore>(
    listen_addr: SocketAddr,
    store: S,
    settings: LifecycleSettings,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = LifecycleEngine::new(store, RandomKeyGenerator::new(), settings)?;
    let state = AppState::new(Arc::new(LittleUrlService::new(engine)));

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    info!(listen_addr = %listener.local_addr()?, "listening");

    axum::serve(listener, App::router(state)).await?;
    Ok(())
}
