//! Connection layer for Cirrus
//!
//! This crate owns backend configuration and the [`ConnectionManager`]
//! through which every primitive reaches the row store, the content store
//! and the broker.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod connection;

pub use config::{
    BackendConfig, BrokerConnection, StoreConnection, BROKER_CONNECTION_ENV, STORE_CONNECTION_ENV,
};
pub use connection::ConnectionManager;
