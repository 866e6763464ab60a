use std::io::Write;

use crate::config::LineFormat;
use crate::loggable::LogArg;
use crate::message::LogMessage;

/// Renders messages into output lines.
///
/// All output goes into a caller-owned byte buffer so the consumer can
/// reuse one allocation for every line it writes.
#[derive(Debug, Clone, Copy)]
pub struct LineRenderer {
    format: LineFormat,
    float_precision: usize,
}

impl LineRenderer {
    pub fn new(format: LineFormat, float_precision: usize) -> Self {
        Self {
            format,
            float_precision,
        }
    }

    /// Appends the newline-terminated line for `msg` to `out`.
    ///
    /// Plain lines look like `[<timestamp>][T<producer>] 1 2.500000 AAPL 0x7ffd`.
    pub fn render(&self, msg: &LogMessage, out: &mut Vec<u8>) {
        let _ = write!(out, "[{}][T{}]", msg.timestamp, msg.producer_id);
        match self.format {
            LineFormat::Plain => {
                for arg in msg.args() {
                    out.push(b' ');
                    write_arg(out, arg, self.float_precision);
                }
            }
            LineFormat::Templated => {
                out.push(b' ');
                render_template(out, msg.format, msg.args(), self.float_precision);
            }
        }
        out.push(b'\n');
    }
}

/// Writes one argument: integers in decimal, floats with `precision`
/// decimals, strings as their raw bytes, addresses as `0x` hex.
pub fn write_arg(out: &mut Vec<u8>, arg: &LogArg, precision: usize) {
    match arg {
        LogArg::I64(v) => {
            let _ = write!(out, "{}", v);
        }
        LogArg::U64(v) => {
            let _ = write!(out, "{}", v);
        }
        LogArg::F64(v) => {
            let _ = write!(out, "{:.*}", precision, v);
        }
        LogArg::Str(s) => out.extend_from_slice(s.as_bytes()),
        LogArg::Addr(a) => {
            let _ = write!(out, "0x{:x}", a);
        }
    }
}

/// Fills `{}` and printf-style placeholders in `template` with `args`.
///
/// `{{`, `}}` and `%%` are escapes. A placeholder without a matching
/// argument renders as `{MISSING}`; arguments left over at the end are
/// appended, space separated. An explicit printf precision (`%.2f`)
/// overrides `precision` for float arguments.
pub fn render_template(out: &mut Vec<u8>, template: &str, args: &[LogArg], precision: usize) {
    let bytes = template.as_bytes();
    let mut args = args.iter();
    let mut literal_start = 0;
    let mut i = 0;

    let mut emit = |out: &mut Vec<u8>, precision: usize| match args.next() {
        Some(arg) => write_arg(out, arg, precision),
        None => out.extend_from_slice(b"{MISSING}"),
    };

    while i < bytes.len() {
        let next = bytes.get(i + 1).copied();
        match (bytes[i], next) {
            (b'{', Some(b'{')) | (b'}', Some(b'}')) | (b'%', Some(b'%')) => {
                out.extend_from_slice(&bytes[literal_start..i]);
                out.push(bytes[i]);
                i += 2;
                literal_start = i;
            }
            (b'{', Some(b'}')) => {
                out.extend_from_slice(&bytes[literal_start..i]);
                emit(out, precision);
                i += 2;
                literal_start = i;
            }
            (b'%', Some(_)) => match parse_conversion(bytes, i + 1) {
                Some((end, explicit)) => {
                    out.extend_from_slice(&bytes[literal_start..i]);
                    emit(out, explicit.unwrap_or(precision));
                    i = end + 1;
                    literal_start = i;
                }
                None => i += 1,
            },
            _ => i += 1,
        }
    }
    out.extend_from_slice(&bytes[literal_start..]);

    for arg in args {
        out.push(b' ');
        write_arg(out, arg, precision);
    }
}

/// Parses a printf conversion starting just after its `%`.
///
/// Returns the index of the conversion character and the explicit
/// precision, if any.
fn parse_conversion(bytes: &[u8], start: usize) -> Option<(usize, Option<usize>)> {
    let mut i = start;
    while i < bytes.len() && matches!(bytes[i], b'-' | b'+' | b'#' | b'0') {
        i += 1;
    }
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }

    let mut precision = None;
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let mut p = 0usize;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            p = p.saturating_mul(10).saturating_add((bytes[i] - b'0') as usize);
            i += 1;
        }
        precision = Some(p.min(17));
    }

    while i < bytes.len() && matches!(bytes[i], b'h' | b'l' | b'L' | b'q' | b'j' | b'z' | b't') {
        i += 1;
    }

    match bytes.get(i) {
        Some(b'd' | b'i' | b'u' | b'x' | b'X' | b'o' | b'f' | b'F' | b'e' | b'E' | b'g' | b'G' | b's'
            | b'c' | b'p') => Some((i, precision)),
        _ => None,
    }
}
