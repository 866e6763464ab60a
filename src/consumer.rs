use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{info, warn};

use crate::config::DrainOrder;
use crate::error::LoggerError;
use crate::message::LogMessage;
use crate::registry::ThreadRegistry;
use crate::sink::MessageSink;

pub const CONSUMER_THREAD_NAME: &str = "ring-logger-consumer";

/// Running counters kept by the consumer.
#[derive(Debug, Default)]
pub struct ConsumerStats {
    written: AtomicU64,
    unknown_stream: AtomicU64,
    io_errors: AtomicU64,
    rounds: AtomicU64,
}

/// Point-in-time copy of the consumer counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerReport {
    /// Messages the sink accepted.
    pub written: u64,
    /// Messages dropped because their stream id had no open sink.
    pub unknown_stream: u64,
    /// Sink write, flush or close failures.
    pub io_errors: u64,
    /// Messages overwritten in producer rings before they were drained.
    pub overwritten: u64,
    /// Completed polling rounds.
    pub rounds: u64,
}

impl ConsumerStats {
    pub fn snapshot(&self, overwritten: u64) -> ConsumerReport {
        ConsumerReport {
            written: self.written.load(Ordering::Relaxed),
            unknown_stream: self.unknown_stream.load(Ordering::Relaxed),
            io_errors: self.io_errors.load(Ordering::Relaxed),
            overwritten,
            rounds: self.rounds.load(Ordering::Relaxed),
        }
    }
}

/// The single background task that drains every producer ring.
pub(crate) struct Consumer {
    registry: Arc<ThreadRegistry>,
    sink: Arc<dyn MessageSink>,
    stop: Arc<AtomicBool>,
    stats: Arc<ConsumerStats>,
    poll_interval: Duration,
    drain_order: DrainOrder,
    batch: Vec<LogMessage>,
}

impl Consumer {
    pub(crate) fn new(
        registry: Arc<ThreadRegistry>,
        sink: Arc<dyn MessageSink>,
        stop: Arc<AtomicBool>,
        stats: Arc<ConsumerStats>,
        poll_interval: Duration,
        drain_order: DrainOrder,
    ) -> Self {
        Self {
            registry,
            sink,
            stop,
            stats,
            poll_interval,
            drain_order,
            batch: Vec::new(),
        }
    }

    pub(crate) fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(CONSUMER_THREAD_NAME.to_string())
            .spawn(move || self.run())
    }

    /// Polls until the stop flag is seen, then drains once more and closes
    /// the sink.
    fn run(mut self) {
        info!(poll_interval = ?self.poll_interval, order = ?self.drain_order, "consumer started");

        while !self.stop.load(Ordering::Acquire) {
            let drained = self.drain_round();
            if drained == 0 {
                // stop() and notify() unpark this thread early.
                thread::park_timeout(self.poll_interval);
            }
        }

        // Everything pushed before the stop flag was set is visible now.
        self.drain_round();

        if let Err(e) = self.sink.flush_and_close_all() {
            self.stats.io_errors.fetch_add(1, Ordering::Relaxed);
            warn!(error = %e, "closing sink failed");
        }

        let report = self.stats.snapshot(self.registry.total_overwritten());
        info!(
            written = report.written,
            overwritten = report.overwritten,
            unknown_stream = report.unknown_stream,
            io_errors = report.io_errors,
            "consumer stopped"
        );
    }

    /// Visits every ring once, draining each until empty.
    fn drain_round(&mut self) -> usize {
        let sink = &*self.sink;
        let stats = &*self.stats;

        let drained = match self.drain_order {
            DrainOrder::PollOrder => {
                let mut n = 0;
                self.registry.for_each_buffer(|ring| {
                    n += ring.drain(|msg| dispatch(sink, stats, msg));
                });
                n
            }
            DrainOrder::TimestampSorted => {
                let batch = &mut self.batch;
                batch.clear();
                self.registry.for_each_buffer(|ring| {
                    ring.drain(|msg| batch.push(*msg));
                });
                batch.sort_by_key(|m| (m.timestamp, m.producer_id, m.sequence));
                for msg in batch.iter() {
                    dispatch(sink, stats, msg);
                }
                batch.len()
            }
        };

        stats.rounds.fetch_add(1, Ordering::Relaxed);
        drained
    }
}

fn dispatch(sink: &dyn MessageSink, stats: &ConsumerStats, msg: &LogMessage) {
    match sink.write(msg) {
        Ok(()) => {
            stats.written.fetch_add(1, Ordering::Relaxed);
        }
        Err(LoggerError::UnknownStream(stream_id)) => {
            let seen = stats.unknown_stream.fetch_add(1, Ordering::Relaxed);
            if seen % 1024 == 0 {
                warn!(stream_id, dropped = seen + 1, "message for unopened stream dropped");
            }
        }
        Err(e) => {
            let seen = stats.io_errors.fetch_add(1, Ordering::Relaxed);
            if seen % 1024 == 0 {
                warn!(stream_id = msg.stream_id, error = %e, "sink write failed");
            }
        }
    }
}
