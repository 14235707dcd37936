//! TCP ingestion endpoint
//!
//! Accepts connections on the configured port and turns every received
//! newline-delimited line into a queued event. Network failures are logged
//! and the listener rebinds; they never bring the process down.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::parser::parse_line;
use crate::queue::EventQueue;

/// Delay before retrying a failed bind or accept.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Serve the ingestion endpoint until shutdown is signalled.
///
/// The socket is rebound after any listener failure, indefinitely.
pub async fn serve(addr: SocketAddr, queue: Arc<EventQueue>, shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            return;
        }

        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(%addr, error = %e, "failed to bind ingestion socket, will retry");
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }
        };
        info!(%addr, "listening for log events");

        run_listener(listener, Arc::clone(&queue), shutdown.clone()).await;

        // Stop for an explicit signal as well as a dropped sender.
        if *shutdown.borrow() || shutdown.has_changed().is_err() {
            return;
        }
    }
}

/// Accept connections until shutdown is signalled.
///
/// Each connection is read by its own task so a slow client never stalls
/// the accept loop.
pub async fn run_listener(
    listener: TcpListener,
    queue: Arc<EventQueue>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((socket, peer)) => {
                    debug!(%peer, "client connected");
                    let queue = Arc::clone(&queue);
                    tokio::spawn(async move {
                        match read_events(socket, &queue).await {
                            Ok(()) => debug!(%peer, "client disconnected"),
                            Err(e) => debug!(%peer, error = %e, "client connection ended"),
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "failed to accept connection, will retry");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            },
            _ = shutdown.changed() => return,
        }
    }
}

/// Read newline-delimited events off one connection until EOF.
///
/// A single network read carrying several lines yields one event per line,
/// queued in arrival order. Blank lines are skipped.
async fn read_events(socket: TcpStream, queue: &EventQueue) -> io::Result<()> {
    let mut lines = BufReader::new(socket).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let event = parse_line(&line);
        debug!(id = %event.id, "event received");
        queue.push(event);
    }

    Ok(())
}
