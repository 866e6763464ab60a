use std::cell::{Cell, UnsafeCell};
use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::atomic::{fence, AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_utils::CachePadded;

use crate::efficient_clock::get_timestamp;
use crate::error::{LoggerError, Result};
use crate::loggable::LogArg;
use crate::message::LogMessage;

/// Lock-free single-producer/single-consumer ring of log messages.
///
/// Each producer thread owns one ring and is the only writer of the write
/// cursor; the consumer thread is the only writer of the read cursor. Both
/// cursors grow monotonically and select a slot with `cursor & (capacity - 1)`.
///
/// # Overload
///
/// Pushing never blocks. When the producer is a full lap ahead of the
/// consumer, the oldest unread message is overwritten and counted in
/// [`RingBuffer::overwritten`].
///
/// # Slot stamps
///
/// Every slot carries a sequence stamp. While message `n` is being written
/// the stamp is `2n + 1`; once it is complete the stamp is `2n + 2`. The
/// consumer checks the stamp before and after copying a slot out, so a copy
/// that raced with an overwrite is detected and discarded instead of being
/// handed to the sink half-written.
pub struct RingBuffer {
    write_cursor: CachePadded<AtomicU64>,
    read_cursor: CachePadded<AtomicU64>,
    overwritten: AtomicU64,
    mask: u64,
    producer_id: u32,
    slots: Box<[Slot]>,
}

struct Slot {
    stamp: AtomicU64,
    msg: UnsafeCell<MaybeUninit<LogMessage>>,
}

// Slot contents are only written by the single producer and only read after
// the stamp check described above.
unsafe impl Sync for RingBuffer {}

impl RingBuffer {
    /// Allocates a ring with `capacity` slots for producer `producer_id`.
    ///
    /// `capacity` must be a non-zero power of two.
    pub fn new(producer_id: u32, capacity: usize) -> Result<Self> {
        if capacity == 0 || !capacity.is_power_of_two() {
            return Err(LoggerError::InvalidConfig(format!(
                "ring capacity must be a non-zero power of two, got {}",
                capacity
            )));
        }

        let slots = (0..capacity)
            .map(|_| Slot {
                stamp: AtomicU64::new(0),
                msg: UnsafeCell::new(MaybeUninit::new(LogMessage::EMPTY)),
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            write_cursor: CachePadded::new(AtomicU64::new(0)),
            read_cursor: CachePadded::new(AtomicU64::new(0)),
            overwritten: AtomicU64::new(0),
            mask: capacity as u64 - 1,
            producer_id,
            slots,
        })
    }

    /// Creates a ring together with its one and only [`Producer`].
    pub fn with_producer(producer_id: u32, capacity: usize) -> Result<(Producer, Arc<RingBuffer>)> {
        let ring = Arc::new(Self::new(producer_id, capacity)?);
        Ok((Producer::new(ring.clone()), ring))
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn producer_id(&self) -> u32 {
        self.producer_id
    }

    /// Number of messages lost to overwrites since the ring was created.
    pub fn overwritten(&self) -> u64 {
        self.overwritten.load(Ordering::Relaxed)
    }

    /// Approximate number of unread messages.
    pub fn len(&self) -> usize {
        let w = self.write_cursor.load(Ordering::Acquire);
        let r = self.read_cursor.load(Ordering::Acquire);
        (w.saturating_sub(r) as usize).min(self.capacity())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of messages ever pushed.
    pub fn pushed(&self) -> u64 {
        self.write_cursor.load(Ordering::Acquire)
    }

    /// Writes `msg` into the next slot and publishes it.
    ///
    /// Stamps the producer id and the sequence number (the write cursor) and
    /// returns the sequence number.
    ///
    /// # Safety
    ///
    /// At most one thread may push into a given ring at any time. [`Producer`]
    /// upholds this by requiring `&mut self`.
    #[inline]
    unsafe fn push(&self, msg: &mut LogMessage) -> u64 {
        let cap = self.slots.len() as u64;
        let w = self.write_cursor.load(Ordering::Relaxed);
        let r = self.read_cursor.load(Ordering::Relaxed);
        if w.wrapping_sub(r) >= cap {
            self.overwritten.fetch_add(1, Ordering::Relaxed);
        }

        msg.producer_id = self.producer_id;
        msg.sequence = w;

        let slot = &self.slots[(w & self.mask) as usize];
        slot.stamp.swap(2 * w + 1, Ordering::Acquire);
        fence(Ordering::Release);

        ptr::write_volatile(slot.msg.get(), MaybeUninit::new(*msg));

        slot.stamp.store(2 * w + 2, Ordering::Release);
        self.write_cursor.store(w + 1, Ordering::Release);
        w
    }

    /// Copies the oldest unread message into `out`.
    ///
    /// Returns false when the ring is empty. Must only be called from the
    /// single consumer of this ring.
    pub fn try_pop(&self, out: &mut LogMessage) -> bool {
        let cap = self.slots.len() as u64;
        let mut r = self.read_cursor.load(Ordering::Relaxed);

        loop {
            let w = self.write_cursor.load(Ordering::Acquire);
            if r == w {
                return false;
            }
            if w - r > cap {
                // Lapped: everything older than one capacity is gone.
                r = w - cap;
            }

            let slot = &self.slots[(r & self.mask) as usize];
            let expected = 2 * r + 2;

            if slot.stamp.load(Ordering::Acquire) == expected {
                let copy = unsafe { ptr::read_volatile(slot.msg.get()) };
                fence(Ordering::Acquire);
                if slot.stamp.load(Ordering::Relaxed) == expected {
                    // The stamp did not move, so the copy is a complete message.
                    *out = unsafe { copy.assume_init() };
                    self.read_cursor.store(r + 1, Ordering::Release);
                    return true;
                }
            }

            // The producer overwrote this slot while we were looking at it.
            r += 1;
            self.read_cursor.store(r, Ordering::Release);
        }
    }

    /// Pops every available message, handing each to `f`. Returns the count.
    pub fn drain(&self, mut f: impl FnMut(&LogMessage)) -> usize {
        let mut msg = LogMessage::EMPTY;
        let mut count = 0;
        while self.try_pop(&mut msg) {
            f(&msg);
            count += 1;
        }
        count
    }
}

/// Exclusive write handle for one [`RingBuffer`].
///
/// There is exactly one `Producer` per ring. It can be moved to another
/// thread but not shared, and every write goes through `&mut self`.
pub struct Producer {
    ring: Arc<RingBuffer>,
    _not_sync: PhantomData<Cell<()>>,
}

impl Producer {
    pub(crate) fn new(ring: Arc<RingBuffer>) -> Self {
        Self {
            ring,
            _not_sync: PhantomData,
        }
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.ring.producer_id
    }

    /// The ring this producer writes into.
    pub fn buffer(&self) -> &Arc<RingBuffer> {
        &self.ring
    }

    /// Pushes a prepared message. Never blocks, never allocates.
    #[inline]
    pub fn push(&mut self, mut msg: LogMessage) -> u64 {
        unsafe { self.ring.push(&mut msg) }
    }

    /// Timestamps and pushes a message for `stream_id`.
    ///
    /// Returns the message's sequence number.
    #[inline]
    pub fn log(&mut self, stream_id: u32, format: &'static str, args: &[LogArg]) -> u64 {
        let mut msg = LogMessage::new(stream_id, format, args);
        msg.timestamp = get_timestamp();
        self.push(msg)
    }
}
