//! Queue Primitive Tests
//!
//! Reference-passing FIFO queues: payloads live in the content store and the
//! broker carries only their URIs.

use crate::common::*;
use cirrus::backend::QueueOptions;
use cirrus::memory::{open_account, open_namespace, BrokerLimits, MemoryNamespace};

// ============================================================================
// Basic Operations
// ============================================================================

#[test]
fn enqueue_then_dequeue_preserves_fifo_order() {
    let cluster = TestCluster::new();
    let queue = cluster
        .init_queue::<String>(ResourceUri::queue(unique("work")))
        .unwrap();

    for i in 0..10 {
        queue.enqueue(&format!("task-{}", i)).unwrap();
    }
    for i in 0..10 {
        assert_eq!(queue.try_dequeue().unwrap(), Some(format!("task-{}", i)));
    }
    assert_eq!(queue.try_dequeue().unwrap(), None);
}

#[test]
fn try_dequeue_on_empty_queue_does_not_block() {
    let cluster = TestCluster::new();
    let queue = cluster
        .init_queue::<u32>(ResourceUri::queue(unique("work")))
        .unwrap();

    let start = Instant::now();
    assert_eq!(queue.try_dequeue().unwrap(), None);
    assert!(start.elapsed() < Duration::from_millis(500));
}

#[test]
fn init_is_idempotent() {
    let cluster = TestCluster::new();
    let uri = ResourceUri::queue(unique("work"));

    let first = cluster.init_queue::<u32>(uri.clone()).unwrap();
    first.enqueue(&1).unwrap();

    let second = cluster.init_queue::<u32>(uri).unwrap();
    assert_eq!(second.len().unwrap(), 1);
    assert_eq!(second.try_dequeue().unwrap(), Some(1));
}

#[test]
fn get_without_init_fails_on_first_use() {
    let cluster = TestCluster::new();
    let queue: Queue<u32> = cluster.queue(ResourceUri::queue(unique("never-created")));

    assert!(queue.enqueue(&1).unwrap_err().is_not_found());
    assert!(queue.try_dequeue().unwrap_err().is_not_found());
}

#[test]
fn len_tracks_pending_messages() {
    let cluster = TestCluster::new();
    let queue = cluster
        .init_queue::<u8>(ResourceUri::queue(unique("work")))
        .unwrap();

    assert!(queue.is_empty().unwrap());
    queue.enqueue(&1).unwrap();
    queue.enqueue(&2).unwrap();
    assert_eq!(queue.len().unwrap(), 2);

    queue.try_dequeue().unwrap();
    assert_eq!(queue.len().unwrap(), 1);
}

#[test]
fn receive_waits_for_a_late_producer() {
    let cluster = TestCluster::new();
    let uri = ResourceUri::queue(unique("work"));
    let queue = cluster.init_queue::<u64>(uri.clone()).unwrap();

    let producer = cluster.node();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        producer.queue::<u64>(uri).enqueue(&99).unwrap();
    });

    assert_eq!(queue.receive(Duration::from_secs(5)).unwrap(), Some(99));
    handle.join().unwrap();
}

#[test]
fn receive_times_out_when_nothing_arrives() {
    let cluster = TestCluster::new();
    let queue = cluster
        .init_queue::<u64>(ResourceUri::queue(unique("work")))
        .unwrap();

    let start = Instant::now();
    assert_eq!(queue.receive(Duration::from_millis(50)).unwrap(), None);
    assert!(start.elapsed() >= Duration::from_millis(50));
}

// ============================================================================
// Payload Sizes
// ============================================================================

#[test]
fn ten_thousand_element_array_round_trips() {
    let cluster = TestCluster::new();
    let queue = cluster
        .init_queue::<Vec<f64>>(ResourceUri::queue(unique("work")))
        .unwrap();

    let payload: Vec<f64> = (0..10_000).map(|i| i as f64 * 0.5).collect();
    queue.enqueue(&payload).unwrap();

    assert_eq!(queue.try_dequeue().unwrap(), Some(payload));
}

#[test]
fn payload_larger_than_broker_limit_passes_through() {
    let cluster = TestCluster::new();
    let queue = cluster
        .init_queue::<Vec<u8>>(ResourceUri::queue(unique("work")))
        .unwrap();

    let payload = vec![0xA5u8; BrokerLimits::DEFAULT_MAX_MESSAGE_BYTES * 4];
    queue.enqueue(&payload).unwrap();

    let received = queue.try_dequeue().unwrap().unwrap();
    assert_eq!(received.len(), payload.len());
    assert_eq!(received, payload);
}

#[test]
fn broker_only_carries_the_reference() {
    let cluster = TestCluster::new();
    let container = unique("work");
    let queue = cluster
        .init_queue::<Vec<u8>>(ResourceUri::queue(&container))
        .unwrap();

    queue.enqueue(&vec![7u8; 1024 * 1024]).unwrap();

    // The blob lands in a container named after the queue.
    let account = open_account(&cluster.name);
    assert_eq!(account.blobs.blob_count(&container), 1);
    assert!(account.blobs.total_bytes() >= 1024 * 1024);
}

// ============================================================================
// Failure Handling
// ============================================================================

#[test]
fn failed_send_removes_the_uploaded_blob() {
    init_tracing();
    let (tables, blobs) = private_store();
    let namespace = Arc::new(FlakyNamespace::new());
    let cirrus = Cirrus::builder()
        .store_clients(tables, blobs.clone())
        .broker_namespace(namespace.clone())
        .open()
        .unwrap();

    let queue = cirrus
        .init_queue::<String>(ResourceUri::queue("work"))
        .unwrap();

    namespace.set_failing(true);
    let err = queue.enqueue(&"lost".to_string()).unwrap_err();
    assert!(err.is_transport());
    assert_eq!(blobs.blob_count("work"), 0);

    namespace.set_failing(false);
    queue.enqueue(&"kept".to_string()).unwrap();
    assert_eq!(blobs.blob_count("work"), 1);
    assert_eq!(queue.try_dequeue().unwrap(), Some("kept".to_string()));
}

#[test]
fn foreign_message_is_dead_lettered() {
    let cluster = TestCluster::new();
    let container = unique("work");
    let queue = cluster
        .init_queue::<u32>(ResourceUri::queue(&container))
        .unwrap();

    // Something other than a Queue wrote straight to the broker.
    let namespace = open_namespace(&cluster.name);
    namespace
        .queue_client(&container)
        .unwrap()
        .send(b"hello".to_vec())
        .unwrap();
    queue.enqueue(&5).unwrap();

    assert!(matches!(
        queue.try_dequeue().unwrap_err(),
        Error::Serialization(_)
    ));
    assert_eq!(queue.dead_letter_len().unwrap(), 1);
    let parked = namespace.queue(&container).unwrap().dead_letters();
    assert_eq!(parked.len(), 1);
    assert_eq!(parked[0].reason, "UnreadableBlobReference");
    assert_eq!(parked[0].body, b"hello".to_vec());

    // The next message is unaffected.
    assert_eq!(queue.try_dequeue().unwrap(), Some(5));
}

#[test]
fn missing_blob_is_redelivered_then_dead_lettered() {
    let cluster = TestCluster::new();
    let container = unique("work");

    // Short lock so redelivery happens within the test.
    let namespace = open_namespace(&cluster.name);
    namespace
        .create_queue(
            &container,
            &QueueOptions {
                default_ttl: None,
                lock_duration: Duration::from_millis(20),
                max_delivery_count: 3,
            },
        )
        .unwrap();

    let queue: Queue<u32> = cluster.queue(ResourceUri::queue(&container));
    queue.enqueue(&1).unwrap();

    // Lose the payload behind the queue's back.
    let account = open_account(&cluster.name);
    let blobs: Vec<String> = account.blobs.blob_names(&container);
    assert_eq!(blobs.len(), 1);
    account.blobs.delete(&container, &blobs[0]).unwrap();

    for _ in 0..3 {
        let err = queue.receive(Duration::from_secs(1)).unwrap_err();
        assert!(err.is_not_found());
    }

    // Fourth delivery exceeds the limit; the broker dead-letters it.
    assert_eq!(queue.receive(Duration::from_millis(100)).unwrap(), None);
    assert_eq!(queue.dead_letter_len().unwrap(), 1);
    assert!(queue.is_empty().unwrap());
}

#[test]
fn message_is_redelivered_after_lock_expiry() {
    let cluster = TestCluster::new();
    let container = unique("work");
    let namespace = open_namespace(&cluster.name);
    namespace
        .create_queue(
            &container,
            &QueueOptions {
                lock_duration: Duration::from_millis(20),
                ..QueueOptions::default()
            },
        )
        .unwrap();

    let queue: Queue<String> = cluster.queue(ResourceUri::queue(&container));
    queue.enqueue(&"job".to_string()).unwrap();

    // A consumer that dies after receiving never completes the message.
    let broker = namespace.queue_client(&container).unwrap();
    let abandoned = broker.receive(Duration::ZERO).unwrap().unwrap();
    assert_eq!(abandoned.delivery_count, 1);
    assert_eq!(queue.try_dequeue().unwrap(), None);

    assert_eq!(
        queue.receive(Duration::from_secs(1)).unwrap(),
        Some("job".to_string())
    );
}

#[test]
fn wrong_scheme_is_rejected() {
    let cluster = TestCluster::new();
    let err = cluster
        .init_queue::<u8>(ResourceUri::latch(unique("work"), "x"))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidUri(_)));
}

#[test]
fn container_with_slash_is_rejected_before_any_io() {
    init_tracing();
    let (tables, blobs) = private_store();
    let namespace = Arc::new(MemoryNamespace::new());
    let cirrus = Cirrus::builder()
        .store_clients(tables, blobs.clone())
        .broker_namespace(namespace.clone())
        .open()
        .unwrap();
    let uri = ResourceUri::queue("jobs/a");

    assert!(matches!(
        cirrus.init_queue::<u32>(uri.clone()).unwrap_err(),
        Error::InvalidUri(_)
    ));
    assert!(!namespace.queue_exists("jobs/a").unwrap());

    let queue: Queue<u32> = cirrus.queue(uri);
    assert!(matches!(queue.enqueue(&1).unwrap_err(), Error::InvalidUri(_)));
    assert!(matches!(queue.try_dequeue().unwrap_err(), Error::InvalidUri(_)));
    assert_eq!(blobs.blob_count("jobs"), 0);
    assert_eq!(blobs.blob_count("jobs/a"), 0);
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn competing_consumers_take_each_message_once() {
    let cluster = TestCluster::new();
    let uri = ResourceUri::queue(unique("work"));
    let queue = cluster.init_queue::<u32>(uri.clone()).unwrap();

    let total = 200u32;
    for i in 0..total {
        queue.enqueue(&i).unwrap();
    }

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let node = cluster.node();
            let uri = uri.clone();
            thread::spawn(move || {
                let queue: Queue<u32> = node.queue(uri);
                let mut taken = Vec::new();
                while let Some(v) = queue.try_dequeue().unwrap() {
                    taken.push(v);
                }
                taken
            })
        })
        .collect();

    let mut all: Vec<u32> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    all.sort_unstable();
    assert_eq!(all, (0..total).collect::<Vec<_>>());
}
