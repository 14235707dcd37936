//! Logsink - Binary Entry Point
//!
//! Wires the configuration, store, writer pool and TCP server together and
//! runs until interrupted.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use logsink::config::Config;
use logsink::queue::EventQueue;
use logsink::server;
use logsink::store::{EventSink, PartitionedStore};
use logsink::worker::WriterPool;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Missing or malformed required options print usage and exit non-zero
    // here, before any component starts.
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!(version = logsink::VERSION, "logsink starting");

    let store = PartitionedStore::connect(&config.database, config.pool_size())?;
    store.ensure_parent().await.map_err(|e| {
        error!(error = %e, "could not bootstrap the parent relation");
        e
    })?;
    info!(pool_size = config.pool_size(), "connected to database");

    let queue = Arc::new(EventQueue::new());
    let sink: Arc<dyn EventSink> = Arc::new(store);

    let writers = WriterPool::start(
        config.pool_size(),
        Arc::clone(&queue),
        sink,
        config.writer_options(),
    );
    info!(workers = writers.size(), "writer pool started");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), config.port);
    let listener = tokio::spawn(server::serve(addr, Arc::clone(&queue), shutdown_rx));

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");

    let _ = shutdown_tx.send(true);
    let _ = listener.await;
    writers.shutdown().await;

    let abandoned = queue.len();
    if abandoned > 0 {
        warn!(events = abandoned, "exiting with events still queued");
    }
    info!("logsink stopped");

    Ok(())
}
