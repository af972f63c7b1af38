//! Connection manager: reconciles a declared set of channels against live
//! [`fep_net::Endpoint`]s, handling hot reconfiguration and lifecycle
//! events (§4.4).

mod error;
mod event;
mod manager;
mod schema;

pub use error::ConnError;
pub use event::ConnEvent;
pub use manager::ConnectionManager;
pub use schema::{FixedSchema, SchemaProvider};
