//! Multi-Node Scenarios
//!
//! Several nodes, each with its own connection manager, cooperating only
//! through the shared backends.

use crate::common::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Task {
    id: u32,
    input: Vec<f64>,
    reply_to: ResourceUri,
}

#[test]
fn fan_out_fan_in() {
    let cluster = TestCluster::new();
    let job = unique("job");
    let work_uri = ResourceUri::queue(format!("{}-work", job));
    let done_uri = ResourceUri::latch(&job, "done");

    let work = cluster.init_queue::<Task>(work_uri.clone()).unwrap();
    let done = cluster.init_latch(done_uri.clone(), 0).unwrap();

    let tasks = 24u32;
    let mut replies = Vec::new();
    for id in 0..tasks {
        let reply = cluster
            .init_result_cell::<f64>(ResourceUri::result_cell(format!("{}-r{}", job, id)))
            .unwrap();
        work.enqueue(&Task {
            id,
            input: (0..1000).map(|i| (i + id) as f64).collect(),
            reply_to: reply.uri().clone(),
        })
        .unwrap();
        replies.push(reply);
    }

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let node = cluster.node();
            let work_uri = work_uri.clone();
            let done_uri = done_uri.clone();
            thread::spawn(move || {
                let work: Queue<Task> = node.queue(work_uri);
                let done = node.latch(done_uri).with_retry_policy(RetryPolicy::unbounded());
                let mut handled = 0;
                while let Some(task) = work.try_dequeue().unwrap() {
                    let sum: f64 = task.input.iter().sum();
                    node.result_cell::<f64>(task.reply_to).set_result(&sum).unwrap();
                    done.increment().unwrap();
                    handled += 1;
                }
                handled
            })
        })
        .collect();

    let handled: u32 = workers.into_iter().map(|w| w.join().unwrap()).sum();
    assert_eq!(handled, tasks);
    assert_eq!(done.value().unwrap(), tasks as i64);

    for (id, reply) in replies.into_iter().enumerate() {
        let expected: f64 = (0..1000).map(|i| (i + id as u32) as f64).sum();
        let got = reply
            .await_result_timeout(Duration::from_secs(5))
            .unwrap()
            .unwrap();
        assert_eq!(got, expected);
    }
    assert!(work.is_empty().unwrap());
}

#[test]
fn shared_configuration_via_blob_cell() {
    let cluster = TestCluster::new();
    let uri = ResourceUri::blob_cell(unique("job"), "config");
    let settings: Vec<(String, u32)> = vec![("epochs".into(), 10), ("batch".into(), 64)];
    let expected = settings.clone();

    cluster.init_blob_cell(uri.clone(), move || settings).unwrap();

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let node = cluster.node();
            let uri = uri.clone();
            thread::spawn(move || node.blob_cell::<Vec<(String, u32)>>(uri).value().unwrap())
        })
        .collect();

    for r in readers {
        assert_eq!(r.join().unwrap(), expected);
    }
}

#[test]
fn barrier_completes_when_every_node_checks_in() {
    let cluster = TestCluster::new();
    let uri = ResourceUri::latch(unique("job"), "barrier");
    let barrier = cluster.init_latch(uri.clone(), 0).unwrap();
    let nodes = 5;

    let handles: Vec<_> = (0..nodes)
        .map(|i| {
            let node = cluster.node();
            let uri = uri.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(5 * i));
                node.latch(uri).increment().unwrap();
            })
        })
        .collect();

    let deadline = Instant::now() + Duration::from_secs(10);
    while barrier.value().unwrap() < nodes as i64 {
        assert!(Instant::now() < deadline, "barrier never completed");
        thread::sleep(Duration::from_millis(2));
    }
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(barrier.value().unwrap(), nodes as i64);
}
