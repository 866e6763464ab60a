//! Error types for the ring logger.

use std::io;
use thiserror::Error;

/// Errors surfaced by the logging pipeline.
///
/// Only [`LoggerError::RegistryFull`] can reach a producer, and only the
/// first time a thread registers. Everything else belongs to setup calls or
/// to the consumer, which counts and reports sink failures instead of
/// stopping.
#[derive(Error, Debug)]
pub enum LoggerError {
    /// The configuration cannot describe a working logger.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// More producers tried to register than the registry was sized for.
    #[error("producer registry is full ({max} producers)")]
    RegistryFull { max: usize },

    /// A message or flush targeted a stream that was never opened.
    #[error("stream {0} has no open sink")]
    UnknownStream(u32),

    /// Opening, writing or flushing a stream file failed.
    #[error("I/O error on stream {stream_id}: {source}")]
    Io {
        stream_id: u32,
        #[source]
        source: io::Error,
    },

    /// The consumer thread could not be started.
    #[error("failed to start consumer thread: {0}")]
    Spawn(#[source] io::Error),

    /// The consumer thread panicked before finishing its final drain.
    #[error("consumer thread panicked")]
    ConsumerPanicked,

    /// `join` was called after the consumer had already been joined.
    #[error("consumer thread was already joined")]
    AlreadyJoined,
}

impl LoggerError {
    /// True for errors that reflect a static capacity or configuration
    /// mismatch rather than a runtime condition.
    pub fn is_configuration(&self) -> bool {
        matches!(self, LoggerError::InvalidConfig(_) | LoggerError::RegistryFull { .. })
    }

    pub(crate) fn io(stream_id: u32, source: io::Error) -> Self {
        LoggerError::Io { stream_id, source }
    }
}

pub type Result<T> = std::result::Result<T, LoggerError>;
