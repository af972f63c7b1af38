use std::fmt;

/// Errors raised by the connection manager's public API (§4.4).
#[derive(Debug)]
pub enum ConnError {
    /// No endpoint is registered for this channelId.
    UnknownChannel(String),
    /// The endpoint build (connect/serve) itself failed.
    Build(fep_net::NetError),
}

impl fmt::Display for ConnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnError::UnknownChannel(id) => write!(f, "no connection registered for channel '{id}'"),
            ConnError::Build(e) => write!(f, "failed to build endpoint: {e}"),
        }
    }
}

impl std::error::Error for ConnError {}

impl From<fep_net::NetError> for ConnError {
    fn from(e: fep_net::NetError) -> Self {
        ConnError::Build(e)
    }
}
