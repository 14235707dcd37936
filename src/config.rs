//! Process configuration surface
//!
//! All required options must be present and well-formed before any
//! component starts; clap prints the usage text and exits with a non-zero
//! status otherwise.

use std::time::Duration;

use clap::Parser;

use crate::worker::WriterOptions;

/// Log event ingestion daemon.
///
/// Accepts newline-delimited text or JSON events over TCP and persists
/// them into day-partitioned PostgreSQL relations, creating partitions on
/// demand.
#[derive(Parser, Debug, Clone)]
#[command(name = "logsink")]
#[command(version, about)]
pub struct Config {
    /// PostgreSQL connection string.
    #[arg(long)]
    pub database: String,

    /// Connection pool size. Also sizes the writer pool.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub database_pool_size: u32,

    /// Port on which to accept events to forward to the database.
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    pub port: u16,

    /// Seconds an idle writer waits before re-checking an empty queue.
    #[arg(long, default_value_t = 1)]
    pub idle_backoff_secs: u64,

    /// Drop an event after this many failed store attempts.
    ///
    /// Unset means unlimited: an event that keeps failing is retried
    /// forever.
    #[arg(long)]
    pub max_attempts: Option<u32>,
}

impl Config {
    /// Writer pool tuning derived from the command line.
    pub fn writer_options(&self) -> WriterOptions {
        WriterOptions {
            idle_backoff: Duration::from_secs(self.idle_backoff_secs),
            max_attempts: self.max_attempts,
        }
    }

    /// Pool size as a plain count.
    pub fn pool_size(&self) -> usize {
        self.database_pool_size as usize
    }
}
