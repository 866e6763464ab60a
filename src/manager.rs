use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{JoinHandle, Thread};

use parking_lot::Mutex;
use tracing::debug;

use crate::config::LoggerConfig;
use crate::consumer::{Consumer, ConsumerReport, ConsumerStats};
use crate::error::{LoggerError, Result};
use crate::loggable::LogArg;
use crate::registry::ThreadRegistry;
use crate::ring_buffer::{Producer, RingBuffer};
use crate::sink::{FileSink, MessageSink};

/// Owns the producer registry, the sink and the consumer thread.
///
/// Construct one explicitly and share it (usually behind an `Arc`) with
/// every thread that logs. The consumer starts in the constructor and
/// runs until [`LogManager::stop`]; [`LogManager::join`] waits for its
/// final drain and for the sink to be closed.
///
/// # Examples
///
/// ```
/// use ring_logger::{log_record, LogManager, LoggerConfig};
///
/// let dir = tempfile::tempdir().unwrap();
/// let path = dir.path().join("trades.log");
///
/// let manager = LogManager::new(LoggerConfig::default()).unwrap();
/// manager.open_stream(1, &path).unwrap();
///
/// log_record!(manager, 1, "fill px=%f qty=%d", 234.56, 100).unwrap();
///
/// let report = manager.shutdown().unwrap();
/// assert_eq!(report.written, 1);
/// assert!(std::fs::read_to_string(&path).unwrap().ends_with(" 234.560000 100\n"));
/// ```
pub struct LogManager<S: MessageSink + 'static = FileSink> {
    config: LoggerConfig,
    registry: Arc<ThreadRegistry>,
    sink: Arc<S>,
    stop: Arc<AtomicBool>,
    stats: Arc<ConsumerStats>,
    consumer: Mutex<Option<JoinHandle<()>>>,
    consumer_thread: Thread,
}

impl LogManager<FileSink> {
    /// Starts a manager that writes to files opened with
    /// [`LogManager::open_stream`].
    pub fn new(config: LoggerConfig) -> Result<Self> {
        let sink = Arc::new(FileSink::from_config(&config));
        Self::with_sink(config, sink)
    }

    /// Routes `stream_id` to `path`, creating the file if needed.
    ///
    /// Must happen before messages for `stream_id` are drained; messages for
    /// unopened streams are dropped and counted.
    pub fn open_stream(&self, stream_id: u32, path: impl AsRef<Path>) -> Result<()> {
        self.sink.open(stream_id, path)
    }

    pub fn close_stream(&self, stream_id: u32) -> Result<()> {
        self.sink.close(stream_id)
    }
}

impl<S: MessageSink + 'static> LogManager<S> {
    /// Starts a manager that hands drained messages to `sink`.
    pub fn with_sink(config: LoggerConfig, sink: Arc<S>) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(ThreadRegistry::new(config.max_producers, config.ring_capacity)?);
        let stop = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(ConsumerStats::default());

        let dyn_sink: Arc<dyn MessageSink> = sink.clone();
        let handle = Consumer::new(
            registry.clone(),
            dyn_sink,
            stop.clone(),
            stats.clone(),
            config.poll_interval,
            config.drain_order,
        )
        .spawn()
        .map_err(LoggerError::Spawn)?;

        debug!(
            ring_capacity = config.ring_capacity,
            max_producers = config.max_producers,
            "log manager started"
        );

        Ok(Self {
            consumer_thread: handle.thread().clone(),
            consumer: Mutex::new(Some(handle)),
            config,
            registry,
            sink,
            stop,
            stats,
        })
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    pub fn sink(&self) -> &Arc<S> {
        &self.sink
    }

    pub fn registry(&self) -> &ThreadRegistry {
        &self.registry
    }

    /// Logs from the calling thread.
    ///
    /// The first call on a thread registers it and allocates its ring; that
    /// is the only call that can fail, with [`LoggerError::RegistryFull`].
    /// Afterwards this never blocks and never allocates. Returns the
    /// message's sequence number.
    #[inline]
    pub fn log(&self, stream_id: u32, format: &'static str, args: &[LogArg]) -> Result<u64> {
        self.registry
            .with_thread_producer(|producer| producer.log(stream_id, format, args))
    }

    /// Registers an explicit producer handle with its own ring.
    ///
    /// Separate from the ring [`LogManager::log`] uses implicitly for the
    /// calling thread.
    pub fn register_producer(&self) -> Result<Producer> {
        self.registry.register()
    }

    /// The calling thread's implicit ring, created on first use.
    pub fn thread_buffer(&self) -> Result<Arc<RingBuffer>> {
        self.registry.get_or_create_buffer()
    }

    /// Wakes the consumer if it is waiting between rounds.
    #[inline]
    pub fn notify(&self) {
        self.consumer_thread.unpark();
    }

    /// Asks the consumer to finish. Returns immediately; use
    /// [`LogManager::join`] to wait for the final drain and close.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
        self.consumer_thread.unpark();
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Waits for the consumer to exit.
    ///
    /// Once this returns `Ok`, every message pushed before [`LogManager::stop`]
    /// has been handed to the sink and the sink has been closed.
    pub fn join(&self) -> Result<ConsumerReport> {
        let handle = self.consumer.lock().take().ok_or(LoggerError::AlreadyJoined)?;
        handle.join().map_err(|_| LoggerError::ConsumerPanicked)?;
        Ok(self.report())
    }

    /// [`LogManager::stop`] followed by [`LogManager::join`].
    pub fn shutdown(&self) -> Result<ConsumerReport> {
        self.stop();
        self.join()
    }

    /// Current counters, including overwritten messages across all rings.
    pub fn report(&self) -> ConsumerReport {
        self.stats.snapshot(self.registry.total_overwritten())
    }
}

impl<S: MessageSink + 'static> Drop for LogManager<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.consumer.get_mut().take() {
            self.stop();
            let _ = handle.join();
        }
    }
}

#[doc(hidden)]
pub const fn __count_arg(_: &str) -> usize {
    1
}

/// Logs a record with the given stream id, format string and arguments.
///
/// Works with a [`LogManager`] (returns `Result<u64>`) or with an explicit
/// [`Producer`] (returns the sequence number). Each argument is converted
/// with [`crate::Loggable`]; more than [`crate::MAX_ARGS`] arguments is a
/// compile error.
///
/// ```
/// # use ring_logger::{log_record, LogManager, LoggerConfig, LogArg};
/// # let manager = LogManager::new(LoggerConfig::default()).unwrap();
/// let symbol = String::from("AAPL");
/// log_record!(manager, 7, "Trade fill: %d %s %.2f", 42, symbol, 234.56).unwrap();
/// log_record!(manager, 7, "heartbeat").unwrap();
///
/// let mut producer = manager.register_producer().unwrap();
/// let seq = log_record!(producer, 7, "venue=%s", "XNAS");
/// assert_eq!(seq, 0);
/// # manager.shutdown().unwrap();
/// ```
#[macro_export]
macro_rules! log_record {
    ($logger:expr, $stream:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
        const ARITY: usize = 0 $(+ $crate::manager::__count_arg(stringify!($arg)))*;
        const _: () = assert!(ARITY <= $crate::MAX_ARGS, "too many arguments for one log record");
        let args: [$crate::LogArg; ARITY] = [$($crate::Loggable::to_log_arg(&$arg)),*];
        $logger.log($stream, $fmt, &args)
    }};
}
