use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use tracing::debug;

use crate::error::{LoggerError, Result};
use crate::ring_buffer::{Producer, RingBuffer};

static NEXT_REGISTRY_UID: AtomicU64 = AtomicU64::new(1);

struct CachedProducer {
    registry_uid: u64,
    registry_alive: Weak<()>,
    producer: Producer,
}

thread_local! {
    /// Producers this thread has implicitly registered, one per registry.
    static THREAD_PRODUCERS: RefCell<Vec<CachedProducer>> = const { RefCell::new(Vec::new()) };
}

/// Bounded table of producer rings.
///
/// Producer ids are dense (`0..max_producers`), handed out once and never
/// reused. Slots are filled on registration and never emptied while the
/// registry lives, so the consumer can walk them without locking.
pub struct ThreadRegistry {
    uid: u64,
    alive: Arc<()>,
    slots: Box<[OnceLock<Arc<RingBuffer>>]>,
    next_id: AtomicUsize,
    ring_capacity: usize,
}

impl ThreadRegistry {
    pub fn new(max_producers: usize, ring_capacity: usize) -> Result<Self> {
        if max_producers == 0 || max_producers > u32::MAX as usize {
            return Err(LoggerError::InvalidConfig(format!(
                "max_producers must be between 1 and {}, got {}",
                u32::MAX,
                max_producers
            )));
        }
        if ring_capacity == 0 || !ring_capacity.is_power_of_two() {
            return Err(LoggerError::InvalidConfig(format!(
                "ring capacity must be a non-zero power of two, got {}",
                ring_capacity
            )));
        }

        Ok(Self {
            uid: NEXT_REGISTRY_UID.fetch_add(1, Ordering::Relaxed),
            alive: Arc::new(()),
            slots: (0..max_producers).map(|_| OnceLock::new()).collect(),
            next_id: AtomicUsize::new(0),
            ring_capacity,
        })
    }

    pub fn max_producers(&self) -> usize {
        self.slots.len()
    }

    pub fn ring_capacity(&self) -> usize {
        self.ring_capacity
    }

    /// Number of ids handed out so far.
    pub fn producer_count(&self) -> usize {
        self.next_id.load(Ordering::Acquire).min(self.slots.len())
    }

    /// Registers a new producer and returns its exclusive handle.
    ///
    /// Every call creates a new ring with the next free id. Fails with
    /// [`LoggerError::RegistryFull`] once `max_producers` ids are taken.
    pub fn register(&self) -> Result<Producer> {
        let producer = self.claim_slot()?;
        debug!(producer_id = producer.id(), capacity = self.ring_capacity, "registered producer");
        Ok(producer)
    }

    fn claim_slot(&self) -> Result<Producer> {
        let max = self.slots.len();
        let id = self
            .next_id
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < max).then_some(n + 1))
            .map_err(|_| LoggerError::RegistryFull { max })?;

        let (producer, ring) = RingBuffer::with_producer(id as u32, self.ring_capacity)?;
        // The id came from a unique fetch_update, so the slot is empty.
        let _ = self.slots[id].set(ring);
        Ok(producer)
    }

    /// Runs `f` with the calling thread's producer, registering one the
    /// first time this thread touches this registry.
    pub fn with_thread_producer<R>(&self, f: impl FnOnce(&mut Producer) -> R) -> Result<R> {
        THREAD_PRODUCERS.with(|cell| {
            {
                let mut cached = cell.borrow_mut();
                if let Some(entry) = cached.iter_mut().find(|e| e.registry_uid == self.uid) {
                    return Ok(f(&mut entry.producer));
                }
            }

            let mut producer = self.claim_slot()?;
            let out = f(&mut producer);
            let id = producer.id();
            {
                let mut cached = cell.borrow_mut();
                // Drop handles into registries that no longer exist.
                cached.retain(|e| e.registry_alive.strong_count() > 0);
                cached.push(CachedProducer {
                    registry_uid: self.uid,
                    registry_alive: Arc::downgrade(&self.alive),
                    producer,
                });
            }

            // Emitted only once the cache is released and holds this producer:
            // a subscriber may log back into this registry from the same thread.
            debug!(producer_id = id, capacity = self.ring_capacity, "registered producer");
            Ok(out)
        })
    }

    /// Returns the calling thread's ring, creating it on first use.
    ///
    /// Repeated calls from one thread return the same ring; distinct threads
    /// get distinct rings until the registry is full.
    pub fn get_or_create_buffer(&self) -> Result<Arc<RingBuffer>> {
        self.with_thread_producer(|p| p.buffer().clone())
    }

    /// Calls `visitor` for every registered ring in id order.
    ///
    /// Ids that were handed out but whose ring is not yet published are
    /// skipped; they show up on the next call.
    pub fn for_each_buffer(&self, mut visitor: impl FnMut(&RingBuffer)) {
        let n = self.producer_count();
        for slot in &self.slots[..n] {
            if let Some(ring) = slot.get() {
                visitor(ring);
            }
        }
    }

    /// Sum of [`RingBuffer::overwritten`] across all rings.
    pub fn total_overwritten(&self) -> u64 {
        let mut total = 0;
        self.for_each_buffer(|ring| total += ring.overwritten());
        total
    }
}
