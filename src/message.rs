use crate::loggable::LogArg;

/// Maximum number of arguments carried by one log message.
pub const MAX_ARGS: usize = 8;

/// One log record as it travels from a producer to the sink.
///
/// The message is built on the producer's stack, copied by value into a
/// ring slot and copied by value out of it again. It owns nothing: strings
/// are either `'static` or stored inline (see [`LogArg`]).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LogMessage {
    /// Raw clock value from [`crate::efficient_clock::get_timestamp`].
    pub timestamp: u64,
    pub format: &'static str,
    pub stream_id: u32,
    pub producer_id: u32,
    /// Position of the message in its producer's ring; dense and increasing.
    pub sequence: u64,
    args: [LogArg; MAX_ARGS],
    arg_count: u8,
}

impl LogMessage {
    pub const EMPTY: LogMessage = LogMessage {
        timestamp: 0,
        format: "",
        stream_id: 0,
        producer_id: 0,
        sequence: 0,
        args: [LogArg::U64(0); MAX_ARGS],
        arg_count: 0,
    };

    /// Builds a message for `stream_id`. Arguments past [`MAX_ARGS`] are
    /// dropped. Producer id, sequence and timestamp are stamped at push time.
    #[inline]
    pub fn new(stream_id: u32, format: &'static str, args: &[LogArg]) -> Self {
        let mut msg = Self::EMPTY;
        msg.stream_id = stream_id;
        msg.format = format;
        let n = args.len().min(MAX_ARGS);
        msg.args[..n].copy_from_slice(&args[..n]);
        msg.arg_count = n as u8;
        msg
    }

    #[inline]
    pub fn args(&self) -> &[LogArg] {
        &self.args[..self.arg_count as usize]
    }

    /// Appends one argument; returns false once the message is full.
    #[inline]
    pub fn push_arg(&mut self, arg: LogArg) -> bool {
        let idx = self.arg_count as usize;
        if idx == MAX_ARGS {
            return false;
        }
        self.args[idx] = arg;
        self.arg_count += 1;
        true
    }
}

impl Default for LogMessage {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excess_args_are_dropped() {
        let args: Vec<LogArg> = (0..12u64).map(LogArg::U64).collect();
        let msg = LogMessage::new(3, "x", &args);
        assert_eq!(msg.args().len(), MAX_ARGS);
        assert_eq!(msg.args()[MAX_ARGS - 1], LogArg::U64(MAX_ARGS as u64 - 1));
    }

    #[test]
    fn test_push_arg_stops_at_capacity() {
        let mut msg = LogMessage::new(0, "", &[]);
        for i in 0..MAX_ARGS {
            assert!(msg.push_arg(LogArg::I64(i as i64)));
        }
        assert!(!msg.push_arg(LogArg::I64(99)));
        assert_eq!(msg.args().len(), MAX_ARGS);
    }
}
