use crate::state::EndpointState;

/// Observable endpoint lifecycle event (§4.2 "observers receive state-change
/// notifications").
#[derive(Debug, Clone)]
pub enum EndpointEvent {
    StateChanged {
        channel_id: String,
        from: EndpointState,
        to: EndpointState,
    },
    /// A server-role endpoint accepted or lost a peer (§4.2 "client directory").
    PeerConnected { channel_id: String, client_id: String },
    PeerDisconnected { channel_id: String, client_id: String },
    HeartbeatMissed { channel_id: String },
}
