//! Logsink
//!
//! A log event ingestion daemon: newline-delimited text or JSON events
//! arrive over TCP and are durably persisted into day-partitioned
//! PostgreSQL relations, creating partitions on demand.
//!
//! # Pipeline
//!
//! ```text
//! TCP line ──► parser ──► EventQueue ──► WriterPool ──► PartitionedStore
//!                             ▲                              │
//!                             └──────── requeue on failure ◄─┘
//! ```
//!
//! Delivery is at-least-once: a failed write puts the event back on the
//! queue tail and a writer picks it up again later, without limit by
//! default. The queue is unbounded and ingestion applies no backpressure, so
//! a prolonged store outage grows process memory until writes drain the
//! backlog.
//!
//! # Modules
//!
//! - `types`: the [`Event`](types::Event) record flowing through the pipeline
//! - `parser`: raw line to event, JSON object or plain message
//! - `queue`: unbounded multi-producer/multi-consumer work queue
//! - `worker`: self-scheduling writer pool with idle backoff
//! - `store`: partitioned persistence engine and failure classifier
//! - `server`: TCP accept/read loop feeding the queue
//! - `config`: command-line configuration surface

pub mod config;
pub mod parser;
pub mod queue;
pub mod server;
pub mod store;
pub mod types;
pub mod worker;

// Re-export commonly used items at crate root
pub use config::Config;
pub use queue::{EventQueue, Pending};
pub use store::{ErrorKind, EventSink, PartitionedStore, StoreError};
pub use types::Event;
pub use worker::{WriterOptions, WriterPool};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
