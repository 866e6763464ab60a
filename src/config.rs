//! Logger configuration.

use std::time::Duration;

use crate::error::{LoggerError, Result};

/// Slots per producer ring.
pub const DEFAULT_RING_CAPACITY: usize = 2048;
/// Upper bound on concurrently registered producers.
pub const DEFAULT_MAX_PRODUCERS: usize = 64;
/// Consumer sleep between polling rounds.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_micros(10);
/// Decimal places used when rendering floats.
pub const DEFAULT_FLOAT_PRECISION: usize = 6;

/// Order in which the consumer hands a round's messages to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrainOrder {
    /// Ring by ring in producer-id order, FIFO within each ring.
    #[default]
    PollOrder,
    /// Each round's batch sorted by timestamp, then producer id, then sequence.
    TimestampSorted,
}

/// How a message is rendered into a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineFormat {
    /// `[<timestamp>][T<producer>] <arg1> <arg2> ...`
    #[default]
    Plain,
    /// `[<timestamp>][T<producer>] ` followed by the format string with its
    /// placeholders filled in.
    Templated,
}

/// Settings for a [`crate::LogManager`].
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub ring_capacity: usize,
    pub max_producers: usize,
    pub poll_interval: Duration,
    pub drain_order: DrainOrder,
    pub line_format: LineFormat,
    pub float_precision: usize,
    /// `sync_all` each stream file when closing it.
    pub sync_on_close: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            ring_capacity: DEFAULT_RING_CAPACITY,
            max_producers: DEFAULT_MAX_PRODUCERS,
            poll_interval: DEFAULT_POLL_INTERVAL,
            drain_order: DrainOrder::default(),
            line_format: LineFormat::default(),
            float_precision: DEFAULT_FLOAT_PRECISION,
            sync_on_close: false,
        }
    }
}

impl LoggerConfig {
    pub fn with_ring_capacity(mut self, capacity: usize) -> Self {
        self.ring_capacity = capacity;
        self
    }

    pub fn with_max_producers(mut self, max: usize) -> Self {
        self.max_producers = max;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_drain_order(mut self, order: DrainOrder) -> Self {
        self.drain_order = order;
        self
    }

    pub fn with_line_format(mut self, format: LineFormat) -> Self {
        self.line_format = format;
        self
    }

    pub fn with_float_precision(mut self, precision: usize) -> Self {
        self.float_precision = precision;
        self
    }

    pub fn with_sync_on_close(mut self, sync: bool) -> Self {
        self.sync_on_close = sync;
        self
    }

    /// Checks the settings before any thread or buffer is created.
    pub fn validate(&self) -> Result<()> {
        if self.ring_capacity == 0 || !self.ring_capacity.is_power_of_two() {
            return Err(LoggerError::InvalidConfig(format!(
                "ring_capacity must be a non-zero power of two, got {}",
                self.ring_capacity
            )));
        }
        if self.max_producers == 0 || self.max_producers > u32::MAX as usize {
            return Err(LoggerError::InvalidConfig(format!(
                "max_producers must be between 1 and {}, got {}",
                u32::MAX,
                self.max_producers
            )));
        }
        if self.float_precision > 17 {
            return Err(LoggerError::InvalidConfig(format!(
                "float_precision above 17 digits carries no information, got {}",
                self.float_precision
            )));
        }
        Ok(())
    }
}
