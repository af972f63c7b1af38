use std::future::Future;
use std::pin::Pin;

use fep_core::Message;

/// What the endpoint hands a decoded inbound message to.
///
/// `client_id` is `Some` for a server-role endpoint (the peer that sent the
/// message, per the client directory) and `None` for a client-role endpoint
/// (there is exactly one peer: whichever host the channel is configured to
/// dial). The handler returns the response to write back, or `None` if the
/// message needs no reply (e.g. a network-management ack the endpoint
/// itself already answered).
pub trait InboundHandler: Send + Sync {
    fn handle<'a>(
        &'a self,
        channel_id: &'a str,
        client_id: Option<&'a str>,
        msg: Message,
    ) -> Pin<Box<dyn Future<Output = Option<Message>> + Send + 'a>>;
}
