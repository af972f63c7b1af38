//! Dual-channel TCP endpoint: the physical connectivity layer of the FEP
//! front-end processor (§4.2).
//!
//! A [`fep_core::ChannelConfig`] resolves to one [`Endpoint`], which owns
//! either a client's outbound socket(s) or a server's [`ClientDirectory`] of
//! accepted peers, a [`fep_stan::PendingRequestRegistry`] for correlating
//! replies by STAN, and the [`EndpointState`] machine governing its
//! lifecycle.

mod client_directory;
mod endpoint;
mod error;
mod event;
mod handler;
mod socket;
mod state;

pub use client_directory::{ClientDirectory, derive_client_id};
pub use endpoint::{Endpoint, default_framing};
pub use error::NetError;
pub use event::EndpointEvent;
pub use handler::InboundHandler;
pub use socket::FramedSocket;
pub use state::EndpointState;
