//! Primitive integration tests
//!
//! Every test runs against a uniquely named in-process cluster, so tests
//! can run in parallel without seeing each other's data.


mod blob_cell;
mod multi_node;
mod queue;
