//! FEP front-end processor host binary library: configuration, wiring, and
//! the `InboundHandler` bridge into the transaction pipeline. Split out of
//! `main.rs` so integration tests can exercise the wiring directly.

pub mod cipher;
pub mod config;
pub mod handler;
pub mod schema;
