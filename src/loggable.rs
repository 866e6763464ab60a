use std::fmt;

/// Longest string, in bytes, that is copied into a message by value.
///
/// Longer strings are cut on the last UTF-8 character boundary that fits.
pub const INLINE_STR_CAPACITY: usize = 31;

/// A short string copied into the log message at enqueue time.
///
/// Used for any string that is not `'static`, so the consumer never reads
/// memory the producer may already have freed.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct InlineStr {
    len: u8,
    bytes: [u8; INLINE_STR_CAPACITY],
}

impl InlineStr {
    pub const EMPTY: InlineStr = InlineStr {
        len: 0,
        bytes: [0; INLINE_STR_CAPACITY],
    };

    #[inline]
    pub fn new(s: &str) -> Self {
        let mut n = s.len().min(INLINE_STR_CAPACITY);
        while !s.is_char_boundary(n) {
            n -= 1;
        }
        let mut out = Self::EMPTY;
        out.bytes[..n].copy_from_slice(&s.as_bytes()[..n]);
        out.len = n as u8;
        out
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        // Construction only ever cuts on a char boundary.
        std::str::from_utf8(self.as_bytes()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Debug for InlineStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

/// String payload of a [`LogArg`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum LogStr {
    /// Borrowed for the whole program, never copied.
    Static(&'static str),
    /// Copied (and possibly truncated) when the message was built.
    Inline(InlineStr),
}

impl LogStr {
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            LogStr::Static(s) => s.as_bytes(),
            LogStr::Inline(s) => s.as_bytes(),
        }
    }
}

/// One encoded argument of a log call.
///
/// Fixed size and `Copy`, so a whole message can be moved into a ring slot
/// with a plain memory copy.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum LogArg {
    I64(i64),
    U64(u64),
    F64(f64),
    Str(LogStr),
    Addr(usize),
}

impl LogArg {
    /// Copies `s` into the message, truncated to [`INLINE_STR_CAPACITY`] bytes.
    #[inline]
    pub fn inline(s: &str) -> Self {
        LogArg::Str(LogStr::Inline(InlineStr::new(s)))
    }

    /// Records the address of `value`, not its contents.
    #[inline]
    pub fn addr_of<T: ?Sized>(value: &T) -> Self {
        LogArg::Addr(value as *const T as *const () as usize)
    }
}

impl Default for LogArg {
    fn default() -> Self {
        LogArg::U64(0)
    }
}

/// A value that can be encoded as a [`LogArg`] without allocating.
///
/// Implemented for the integer and float primitives, `bool`, `&'static str`,
/// `String`, `str`, raw pointers and `LogArg` itself. A borrowed `&str` that
/// is not `'static` does not implement it through `&str`; pass it as
/// `LogArg::inline(s)` so the copy is explicit.
pub trait Loggable {
    fn to_log_arg(&self) -> LogArg;
}

macro_rules! impl_loggable_signed {
    ($($t:ty),*) => {
        $(impl Loggable for $t {
            #[inline(always)]
            fn to_log_arg(&self) -> LogArg {
                LogArg::I64(*self as i64)
            }
        })*
    };
}

macro_rules! impl_loggable_unsigned {
    ($($t:ty),*) => {
        $(impl Loggable for $t {
            #[inline(always)]
            fn to_log_arg(&self) -> LogArg {
                LogArg::U64(*self as u64)
            }
        })*
    };
}

impl_loggable_signed!(i8, i16, i32, i64, isize);
impl_loggable_unsigned!(u8, u16, u32, u64, usize);

impl Loggable for bool {
    #[inline(always)]
    fn to_log_arg(&self) -> LogArg {
        LogArg::I64(*self as i64)
    }
}

impl Loggable for f32 {
    #[inline(always)]
    fn to_log_arg(&self) -> LogArg {
        LogArg::F64(*self as f64)
    }
}

impl Loggable for f64 {
    #[inline(always)]
    fn to_log_arg(&self) -> LogArg {
        LogArg::F64(*self)
    }
}

impl Loggable for &'static str {
    #[inline(always)]
    fn to_log_arg(&self) -> LogArg {
        LogArg::Str(LogStr::Static(self))
    }
}

impl Loggable for str {
    #[inline]
    fn to_log_arg(&self) -> LogArg {
        LogArg::inline(self)
    }
}

impl Loggable for String {
    #[inline]
    fn to_log_arg(&self) -> LogArg {
        LogArg::inline(self)
    }
}

impl<T: ?Sized> Loggable for *const T {
    #[inline(always)]
    fn to_log_arg(&self) -> LogArg {
        LogArg::Addr(*self as *const () as usize)
    }
}

impl<T: ?Sized> Loggable for *mut T {
    #[inline(always)]
    fn to_log_arg(&self) -> LogArg {
        LogArg::Addr(*self as *const () as usize)
    }
}

impl Loggable for LogArg {
    #[inline(always)]
    fn to_log_arg(&self) -> LogArg {
        *self
    }
}
