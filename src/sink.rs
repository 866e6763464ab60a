use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::{LineFormat, LoggerConfig, DEFAULT_FLOAT_PRECISION};
use crate::error::{LoggerError, Result};
use crate::format::LineRenderer;
use crate::message::LogMessage;

/// Destination for messages drained by the consumer.
///
/// The consumer owns all calls to `write` and the final
/// `flush_and_close_all`. Implementations must tolerate setup calls from
/// other threads while the consumer is writing.
pub trait MessageSink: Send + Sync {
    /// Writes one message. Errors are reported per message; the consumer
    /// counts them and keeps draining.
    fn write(&self, msg: &LogMessage) -> Result<()>;

    /// Flushes and releases every output. Called once, after the final drain.
    fn flush_and_close_all(&self) -> Result<()>;
}

struct StreamFile {
    path: PathBuf,
    file: File,
}

struct SinkState {
    streams: HashMap<u32, StreamFile>,
    line: Vec<u8>,
}

/// Appends one line per message to the file registered for its stream id.
///
/// Files are plain unbuffered `File`s: every line is rendered into a reused
/// buffer and appended with a single `write_all`, so a crash loses at most
/// the line being written.
pub struct FileSink {
    state: Mutex<SinkState>,
    renderer: LineRenderer,
    sync_on_close: bool,
}

impl FileSink {
    pub fn new(format: LineFormat, float_precision: usize) -> Self {
        Self {
            state: Mutex::new(SinkState {
                streams: HashMap::new(),
                line: Vec::with_capacity(256),
            }),
            renderer: LineRenderer::new(format, float_precision),
            sync_on_close: false,
        }
    }

    pub fn from_config(config: &LoggerConfig) -> Self {
        let mut sink = Self::new(config.line_format, config.float_precision);
        sink.sync_on_close = config.sync_on_close;
        sink
    }

    /// Opens (creating if needed) `path` for append and routes `stream_id`
    /// to it. Re-opening a stream id replaces its previous file.
    pub fn open(&self, stream_id: u32, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| LoggerError::io(stream_id, e))?;

        let previous = self
            .state
            .lock()
            .streams
            .insert(stream_id, StreamFile { path: path.clone(), file });

        if let Some(mut old) = previous {
            if let Err(e) = old.file.flush() {
                warn!(stream_id, path = %old.path.display(), error = %e, "flush of replaced stream failed");
            }
        }
        debug!(stream_id, path = %path.display(), "opened stream");
        Ok(())
    }

    pub fn is_open(&self, stream_id: u32) -> bool {
        self.state.lock().streams.contains_key(&stream_id)
    }

    /// Path currently backing `stream_id`.
    pub fn path_of(&self, stream_id: u32) -> Option<PathBuf> {
        self.state.lock().streams.get(&stream_id).map(|s| s.path.clone())
    }

    /// Flushes and closes a single stream.
    pub fn close(&self, stream_id: u32) -> Result<()> {
        let stream = self
            .state
            .lock()
            .streams
            .remove(&stream_id)
            .ok_or(LoggerError::UnknownStream(stream_id))?;
        self.finish(stream_id, stream)
    }

    fn finish(&self, stream_id: u32, mut stream: StreamFile) -> Result<()> {
        stream.file.flush().map_err(|e| LoggerError::io(stream_id, e))?;
        if self.sync_on_close {
            stream.file.sync_all().map_err(|e| LoggerError::io(stream_id, e))?;
        }
        debug!(stream_id, path = %stream.path.display(), "closed stream");
        Ok(())
    }
}

impl Default for FileSink {
    fn default() -> Self {
        Self::new(LineFormat::Plain, DEFAULT_FLOAT_PRECISION)
    }
}

impl MessageSink for FileSink {
    fn write(&self, msg: &LogMessage) -> Result<()> {
        let mut guard = self.state.lock();
        let SinkState { streams, line } = &mut *guard;

        let stream = streams
            .get_mut(&msg.stream_id)
            .ok_or(LoggerError::UnknownStream(msg.stream_id))?;

        line.clear();
        self.renderer.render(msg, line);
        stream
            .file
            .write_all(line)
            .map_err(|e| LoggerError::io(msg.stream_id, e))
    }

    fn flush_and_close_all(&self) -> Result<()> {
        let streams: Vec<(u32, StreamFile)> = self.state.lock().streams.drain().collect();

        let mut first_error = None;
        for (stream_id, stream) in streams {
            if let Err(e) = self.finish(stream_id, stream) {
                warn!(stream_id, error = %e, "failed to close stream");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
