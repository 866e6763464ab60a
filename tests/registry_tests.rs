use ring_logger::{LogArg, LogManager, LogMessage, LoggerConfig, LoggerError, ThreadRegistry};
use std::sync::{Arc, Barrier};
use std::thread;
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// Forwards every tracing event into a logger stream.
struct ForwardingLayer {
    manager: Arc<LogManager>,
}

impl<S: Subscriber> Layer<S> for ForwardingLayer {
    fn on_event(&self, _event: &Event<'_>, _ctx: Context<'_, S>) {
        let _ = self.manager.log(9, "forwarded event", &[]);
    }
}

#[test]
fn test_same_thread_gets_same_buffer() {
    let registry = ThreadRegistry::new(4, 16).unwrap();
    let first = registry.get_or_create_buffer().unwrap();
    let second = registry.get_or_create_buffer().unwrap();
    assert!(Arc::ptr_eq(&first, &second), "Repeated calls should return the identical ring");
    assert_eq!(registry.producer_count(), 1);
}

#[test]
fn test_distinct_threads_get_distinct_buffers() {
    let registry = ThreadRegistry::new(8, 16).unwrap();
    let rings: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| registry.get_or_create_buffer().unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for i in 0..rings.len() {
        for j in i + 1..rings.len() {
            assert!(!Arc::ptr_eq(&rings[i], &rings[j]), "Threads should not share rings");
        }
    }

    let mut ids: Vec<u32> = rings.iter().map(|r| r.producer_id()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![0, 1, 2, 3], "Producer ids should be dense");
}

#[test]
fn test_registry_full_is_configuration_error() {
    let registry = ThreadRegistry::new(2, 16).unwrap();
    let barrier = Barrier::new(3);

    let results: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..3)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    registry.get_or_create_buffer().map(|r| r.producer_id())
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let ok = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(ok, 2, "Only max_producers threads should register");

    let err = results.into_iter().find_map(|r| r.err()).unwrap();
    assert!(matches!(err, LoggerError::RegistryFull { max: 2 }));
    assert!(err.is_configuration());
    assert_eq!(registry.producer_count(), 2);
}

#[test]
fn test_explicit_register_allocates_new_ids() {
    let registry = ThreadRegistry::new(3, 8).unwrap();
    let a = registry.register().unwrap();
    let b = registry.register().unwrap();
    assert_eq!((a.id(), b.id()), (0, 1));

    // The implicit thread ring is yet another producer.
    assert_eq!(registry.get_or_create_buffer().unwrap().producer_id(), 2);
    assert!(matches!(registry.register(), Err(LoggerError::RegistryFull { max: 3 })));
}

#[test]
fn test_for_each_buffer_visits_registered_rings_in_id_order() {
    let registry = ThreadRegistry::new(8, 8).unwrap();
    let mut visited = Vec::new();
    registry.for_each_buffer(|ring| visited.push(ring.producer_id()));
    assert!(visited.is_empty(), "No rings before registration");

    let mut producers: Vec<_> = (0..3).map(|_| registry.register().unwrap()).collect();
    for (i, p) in producers.iter_mut().enumerate() {
        p.log(0, "", &[LogArg::U64(i as u64)]);
    }

    let mut drained = Vec::new();
    registry.for_each_buffer(|ring| {
        let mut out = LogMessage::EMPTY;
        while ring.try_pop(&mut out) {
            drained.push(out.producer_id);
        }
    });
    assert_eq!(drained, vec![0, 1, 2]);
}

#[test]
fn test_total_overwritten_sums_rings() {
    let registry = ThreadRegistry::new(2, 4).unwrap();
    let mut a = registry.register().unwrap();
    let mut b = registry.register().unwrap();
    for _ in 0..6 {
        a.log(0, "", &[]);
    }
    for _ in 0..5 {
        b.log(0, "", &[]);
    }
    assert_eq!(registry.total_overwritten(), 3);
}

#[test]
fn test_invalid_registry_settings() {
    assert!(ThreadRegistry::new(0, 16).is_err());
    assert!(ThreadRegistry::new(4, 12).is_err());
}

#[test]
fn test_registration_event_can_log_back_into_same_thread() {
    let manager = Arc::new(LogManager::new(LoggerConfig::default()).unwrap());
    let layer = ForwardingLayer { manager: manager.clone() };
    let worker = manager.clone();

    let pushed = thread::spawn(move || {
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            worker.log(1, "first", &[]).unwrap();
            worker.thread_buffer().unwrap().pushed()
        })
    })
    .join()
    .expect("first log on a thread should not panic when a layer logs back");

    // "first" plus the forwarded "registered producer" event, on one ring.
    assert_eq!(pushed, 2);
    assert_eq!(manager.registry().producer_count(), 1);
    manager.shutdown().unwrap();
}
