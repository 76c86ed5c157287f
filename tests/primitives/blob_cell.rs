//! BlobCell Primitive Tests
//!
//! Write-once values in the content store.

use crate::common::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TaskSpec {
    name: String,
    weights: Vec<f64>,
    labels: BTreeMap<String, u32>,
    retry: Option<u8>,
}

fn sample_task() -> TaskSpec {
    let mut labels = BTreeMap::new();
    labels.insert("shard".to_string(), 3);
    labels.insert("priority".to_string(), 1);
    TaskSpec {
        name: "train".to_string(),
        weights: vec![0.25, -1.5, 3.0],
        labels,
        retry: None,
    }
}

// ============================================================================
// Basic Operations
// ============================================================================

#[test]
fn init_then_value_returns_stored_value() {
    let cluster = TestCluster::new();
    let uri = ResourceUri::blob_cell(unique("specs"), "task-1");

    let cell = cluster.init_blob_cell(uri, sample_task).unwrap();
    assert_eq!(cell.value().unwrap(), sample_task());
}

#[test]
fn attached_handle_reads_value_from_another_node() {
    let cluster = TestCluster::new();
    let uri = ResourceUri::blob_cell(unique("specs"), "task-1");
    cluster.init_blob_cell(uri.clone(), sample_task).unwrap();

    let other = cluster.node();
    let cell: BlobCell<TaskSpec> = other.blob_cell(uri);
    assert!(cell.exists().unwrap());
    assert_eq!(cell.value().unwrap(), sample_task());
}

#[test]
fn thunk_runs_exactly_once() {
    let cluster = TestCluster::new();
    let mut calls = 0;
    cluster
        .init_blob_cell(ResourceUri::blob_cell(unique("specs"), "n"), || {
            calls += 1;
            42u64
        })
        .unwrap();
    assert_eq!(calls, 1);
}

#[test]
fn each_read_is_an_independent_copy() {
    let cluster = TestCluster::new();
    let cell = cluster
        .init_blob_cell(ResourceUri::blob_cell(unique("specs"), "v"), || {
            vec![1u32, 2, 3]
        })
        .unwrap();

    let mut first = cell.value().unwrap();
    first.push(4);
    first[0] = 100;

    assert_eq!(cell.value().unwrap(), vec![1, 2, 3]);
}

#[test]
fn missing_blob_reports_not_found() {
    let cluster = TestCluster::new();
    let cell: BlobCell<String> = cluster.blob_cell(ResourceUri::blob_cell(unique("specs"), "none"));

    assert!(!cell.exists().unwrap());
    assert!(cell.value().unwrap_err().is_not_found());
}

#[test]
fn reading_as_wrong_type_is_a_serialization_error() {
    let cluster = TestCluster::new();
    let uri = ResourceUri::blob_cell(unique("specs"), "text");
    cluster
        .init_blob_cell(uri.clone(), || "not a number".to_string())
        .unwrap();

    let cell: BlobCell<u64> = cluster.blob_cell(uri);
    assert!(matches!(cell.value().unwrap_err(), Error::Serialization(_)));
}

#[test]
fn uri_without_id_is_rejected() {
    let cluster = TestCluster::new();
    let uri = ResourceUri::new(Scheme::BlobCell, unique("specs"), None);
    let err = cluster.init_blob_cell(uri, || 1u8).unwrap_err();
    assert!(matches!(err, Error::InvalidUri(_)));
}

#[test]
fn container_with_slash_is_rejected() {
    let cluster = TestCluster::new();
    let uri = ResourceUri::blob_cell(format!("{}/a", unique("specs")), "x");

    let err = cluster.init_blob_cell(uri.clone(), || 1u8).unwrap_err();
    assert!(matches!(err, Error::InvalidUri(_)));

    let cell: BlobCell<u8> = cluster.blob_cell(uri);
    assert!(matches!(cell.exists().unwrap_err(), Error::InvalidUri(_)));
}

// ============================================================================
// Payload Sizes
// ============================================================================

#[test]
fn empty_and_unit_values_round_trip() {
    let cluster = TestCluster::new();
    let container = unique("specs");

    let empty = cluster
        .init_blob_cell(ResourceUri::blob_cell(&container, "empty"), Vec::<u8>::new)
        .unwrap();
    assert!(empty.value().unwrap().is_empty());

    let unit = cluster
        .init_blob_cell(ResourceUri::blob_cell(&container, "unit"), || ())
        .unwrap();
    unit.value().unwrap();
}

#[test]
fn multi_megabyte_value_round_trips() {
    let cluster = TestCluster::new();
    let big: Vec<u64> = (0..500_000).collect();
    let expected = big.clone();

    let cell = cluster
        .init_blob_cell(ResourceUri::blob_cell(unique("specs"), "big"), move || big)
        .unwrap();
    assert_eq!(cell.value().unwrap(), expected);
}

#[test]
fn last_writer_wins_on_same_id() {
    let cluster = TestCluster::new();
    let uri = ResourceUri::blob_cell(unique("specs"), "shared");

    cluster.init_blob_cell(uri.clone(), || 1u32).unwrap();
    cluster.init_blob_cell(uri.clone(), || 2u32).unwrap();

    let cell: BlobCell<u32> = cluster.blob_cell(uri);
    assert_eq!(cell.value().unwrap(), 2);
}
