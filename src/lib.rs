//! # Ring Logger
//!
//! A structured logging pipeline for latency-sensitive producer threads
//! that must never block or allocate while logging.
//!
//! ## Key Features
//!
//! * One lock-free single-producer/single-consumer ring per logging thread
//! * Fixed-size, `Copy` log messages built on the producer's stack
//! * Hardware-counter timestamps (RDTSC / CNTVCT_EL0)
//! * A single background consumer that drains every ring into per-stream files
//! * Lossy under overload: the oldest unread message is overwritten and
//!   counted, the producer never waits
//!
//! ## Main Components
//!
//! * `LogManager`: owns the registry, the sink and the consumer thread
//! * `RingBuffer` / `Producer`: the per-thread SPSC ring and its write handle
//! * `ThreadRegistry`: bounded mapping from producer id to ring
//! * `FileSink`: stream id to file routing and line rendering
//! * `efficient_clock`: low-overhead timestamps
//!
//! ## Quick Start
//!
//! ```
//! use ring_logger::{log_record, LogManager, LoggerConfig};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let manager = LogManager::new(LoggerConfig::default()).unwrap();
//! manager.open_stream(1, dir.path().join("log_orders.log")).unwrap();
//!
//! for i in 1..=3 {
//!     log_record!(manager, 1, "val=%d", i).unwrap();
//! }
//!
//! // Stop the consumer and wait for the final drain.
//! let report = manager.shutdown().unwrap();
//! assert_eq!(report.written, 3);
//! ```

pub mod config;
pub mod consumer;
pub mod efficient_clock;
pub mod error;
pub mod format;
pub mod loggable;
pub mod logging;
pub mod manager;
pub mod message;
pub mod registry;
pub mod ring_buffer;
pub mod sink;

pub use config::{DrainOrder, LineFormat, LoggerConfig};
pub use consumer::ConsumerReport;
pub use error::{LoggerError, Result};
pub use loggable::{InlineStr, LogArg, LogStr, Loggable};
pub use manager::LogManager;
pub use message::{LogMessage, MAX_ARGS};
pub use registry::ThreadRegistry;
pub use ring_buffer::{Producer, RingBuffer};
pub use sink::{FileSink, MessageSink};
