use fep_net::EndpointState;

/// Connection-manager lifecycle event (§4.4 "Lifecycle events").
#[derive(Debug, Clone)]
pub enum ConnEvent {
    Added { channel_id: String },
    Removed { channel_id: String },
    /// An existing endpoint was closed and rebuilt because its config changed.
    Recreated { channel_id: String },
    /// A build (connect/serve) attempt failed.
    Failed { channel_id: String, reason: String },
    StateChanged { channel_id: String, from: EndpointState, to: EndpointState },
    ServerStarted { channel_id: String },
    ClientConnectedToServer { channel_id: String, client_id: String },
    ClientDisconnectedFromServer { channel_id: String, client_id: String },
}
