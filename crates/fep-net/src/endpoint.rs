//! The dual-channel endpoint itself (§4.2).

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use fep_codec::{FramingConfig, Schema};
use fep_core::{ConnectionProfile, Message, MessageBuilder, Mti, Role};
use parking_lot::Mutex as SyncMutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;

use fep_stan::{PendingRequestRegistry, TerminationCause};

use crate::client_directory::{ClientDirectory, derive_client_id};
use crate::error::NetError;
use crate::event::EndpointEvent;
use crate::handler::InboundHandler;
use crate::socket::FramedSocket;
use crate::state::EndpointState;

/// Default framing used when a channel doesn't specify one explicitly: a
/// 4-byte ASCII length prefix not counting the prefix itself (§6).
pub fn default_framing() -> FramingConfig {
    FramingConfig {
        prefix_bytes: 4,
        encoding: fep_codec::LengthEncoding::Ascii,
        length_includes_header: false,
    }
}

struct ClientHalves {
    unified: Option<Arc<FramedSocket>>,
    send: Option<Arc<FramedSocket>>,
    receive: Option<Arc<FramedSocket>>,
}

impl ClientHalves {
    fn empty() -> Self {
        ClientHalves { unified: None, send: None, receive: None }
    }

    fn outbound(&self) -> Option<&Arc<FramedSocket>> {
        self.unified.as_ref().or(self.send.as_ref())
    }

    fn inbound(&self) -> Option<&Arc<FramedSocket>> {
        self.unified.as_ref().or(self.receive.as_ref())
    }
}

/// A live peer instance bound to one `channelId` (§3 "Endpoint").
///
/// Owns one or two sockets (client role) or a whole client directory of
/// peers (server role), a pending-request registry, and the state machine
/// governing its own lifecycle. Cheap to clone: internally `Arc`-backed.
pub struct Endpoint {
    channel_id: String,
    profile: ConnectionProfile,
    schema: Arc<Schema>,
    state: SyncMutex<EndpointState>,
    listeners: fep_core::ListenerList<EndpointEvent>,
    registry: PendingRequestRegistry<Message>,
    stan_counter: AtomicU32,
    handler: Arc<dyn InboundHandler>,
    client_sockets: tokio::sync::Mutex<ClientHalves>,
    client_directory: ClientDirectory,
    closing: Arc<Notify>,
}

impl Endpoint {
    pub fn new(
        channel_id: impl Into<String>,
        profile: ConnectionProfile,
        schema: Arc<Schema>,
        handler: Arc<dyn InboundHandler>,
    ) -> Arc<Self> {
        Arc::new(Endpoint {
            channel_id: channel_id.into(),
            profile,
            schema,
            state: SyncMutex::new(EndpointState::Disconnected),
            listeners: fep_core::ListenerList::new(),
            registry: PendingRequestRegistry::new(),
            stan_counter: AtomicU32::new(1),
            handler,
            client_sockets: tokio::sync::Mutex::new(ClientHalves::empty()),
            client_directory: ClientDirectory::new(),
            closing: Arc::new(Notify::new()),
        })
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn state(&self) -> EndpointState {
        *self.state.lock()
    }

    pub fn client_directory(&self) -> &ClientDirectory {
        &self.client_directory
    }

    pub fn add_listener(&self, listener: Arc<dyn fep_core::EventListener<EndpointEvent>>) {
        self.listeners.add(listener);
    }

    fn transition(&self, next: EndpointState) -> Result<(), NetError> {
        let mut state = self.state.lock();
        if !state.can_transition_to(next) {
            return Err(NetError::IllegalTransition { from: *state, to: next });
        }
        let from = *state;
        *state = next;
        drop(state);
        tracing::debug!(channel_id = %self.channel_id, ?from, to = ?next, "endpoint state changed");
        self.listeners.notify(&EndpointEvent::StateChanged {
            channel_id: self.channel_id.clone(),
            from,
            to: next,
        });
        Ok(())
    }

    fn next_stan(&self) -> u32 {
        self.stan_counter.fetch_add(1, Ordering::Relaxed) % 1_000_000
    }

    // ---- client role --------------------------------------------------

    /// Dial the configured peer. Dual-port dials SEND then RECEIVE; the
    /// endpoint only reaches `BothConnected` once both succeed (§4.2
    /// "only 'fully connected' when both sockets are bound"). Unified-port
    /// dials the single socket and reaches `BothConnected` directly.
    ///
    /// Per §4.2 "Failure semantics", an initial connect failure does not
    /// destroy the endpoint: the caller should retry per `auto_reconnect`
    /// while this endpoint stays registered as "configured".
    pub async fn connect(self: &Arc<Self>) -> Result<(), NetError> {
        self.transition(EndpointState::Connecting)?;

        let result = if self.profile.dual_channel {
            self.connect_dual().await
        } else {
            self.connect_unified().await
        };

        match result {
            Ok(()) => {
                self.transition(EndpointState::BothConnected)?;
                self.spawn_client_readers();
                Ok(())
            }
            Err(e) => {
                let _ = self.transition(EndpointState::Failed);
                Err(e)
            }
        }
    }

    async fn connect_unified(self: &Arc<Self>) -> Result<(), NetError> {
        let port = self.profile.unified_port.ok_or(NetError::NotConnected)?;
        let stream = timeout_connect(&self.profile.host, port, self.profile.connect_timeout()).await?;
        let socket = Arc::new(FramedSocket::new(stream, default_framing(), self.schema.clone())?);
        self.client_sockets.lock().await.unified = Some(socket);
        Ok(())
    }

    async fn connect_dual(self: &Arc<Self>) -> Result<(), NetError> {
        let send_port = self.profile.send_port.ok_or(NetError::NotConnected)?;
        let recv_port = self.profile.receive_port.ok_or(NetError::NotConnected)?;

        let send_stream = timeout_connect(&self.profile.host, send_port, self.profile.connect_timeout()).await?;
        let send_socket = Arc::new(FramedSocket::new(send_stream, default_framing(), self.schema.clone())?);
        self.client_sockets.lock().await.send = Some(send_socket);
        self.transition(EndpointState::SendOnlyConnected).ok();

        let recv_stream = timeout_connect(&self.profile.host, recv_port, self.profile.connect_timeout()).await?;
        let recv_socket = Arc::new(FramedSocket::new(recv_stream, default_framing(), self.schema.clone())?);
        self.client_sockets.lock().await.receive = Some(recv_socket);

        Ok(())
    }

    fn spawn_client_readers(self: &Arc<Self>) {
        let this = self.clone();
        tokio::spawn(async move {
            let socket = {
                let halves = this.client_sockets.lock().await;
                halves.inbound().cloned()
            };
            let Some(socket) = socket else { return };
            loop {
                tokio::select! {
                    _ = this.closing.notified() => break,
                    result = socket.read_message() => match result {
                        Ok(msg) => this.on_inbound_as_client(msg).await,
                        Err(e) => {
                            tracing::warn!(channel_id = %this.channel_id, error = %e, "client read loop ended");
                            this.on_connection_lost().await;
                            break;
                        }
                    },
                }
            }
        });
    }

    async fn on_inbound_as_client(self: &Arc<Self>, msg: Message) {
        if let Some(stan_str) = msg.stan() {
            if let Ok(stan) = stan_str.parse::<u32>() {
                if self.registry.complete(stan, msg.clone()) {
                    return;
                }
            }
        }
        // Unsolicited inbound on the client side (no matching STAN): still
        // hand it to the application in case it's a server-initiated push.
        let _ = self.handler.handle(&self.channel_id, None, msg).await;
    }

    async fn on_connection_lost(self: &Arc<Self>) {
        let cancelled = self.registry.cancel_all("connection lost");
        tracing::warn!(channel_id = %self.channel_id, cancelled, "connection lost, cancelled pending requests");
        if self.profile.auto_reconnect {
            let _ = self.transition(EndpointState::Reconnecting);
        } else {
            let _ = self.transition(EndpointState::Failed);
        }
    }

    /// Send a request and await its correlated reply by STAN (field 11),
    /// per §4.3. Registers with the endpoint's own response timeout.
    pub async fn send_request(&self, msg: Message) -> Result<Message, NetError> {
        let stan: u32 = msg
            .stan()
            .and_then(|s| s.parse().ok())
            .ok_or(NetError::NotConnected)?;

        let outbound = {
            let halves = self.client_sockets.lock().await;
            halves.outbound().cloned()
        };
        let Some(outbound) = outbound else { return Err(NetError::NotConnected) };

        let waiter = self
            .registry
            .register(stan, self.profile.response_timeout())
            .map_err(|_| NetError::Closed)?;

        outbound.write_message(&msg).await?;

        match waiter.await {
            Ok(response) => Ok(response),
            Err(TerminationCause::Timeout) => Err(NetError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "no response within the configured timeout",
            ))),
            Err(cause) => Err(NetError::Io(std::io::Error::other(cause.to_string()))),
        }
    }

    /// Build and send a network-management heartbeat (MTI 0800-class),
    /// matched through the same pending-request registry as any other
    /// outbound request (§4.2 "Heartbeat").
    pub async fn send_heartbeat(&self) -> Result<Message, NetError> {
        let stan = self.next_stan();
        let msg = MessageBuilder::new()
            .mti(Mti::parse("0800").expect("0800 is a valid MTI"))
            .field(11u32, format!("{stan:06}").into_bytes())
            .build()
            .expect("mti is always set");
        self.send_request(msg).await
    }

    /// Start the background heartbeat loop; returns immediately, the loop
    /// runs until the endpoint closes (§4.2 "Heartbeat").
    pub fn spawn_heartbeat(self: &Arc<Self>) {
        let this = self.clone();
        let interval = self.profile.heartbeat_interval();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = this.closing.notified() => break,
                    _ = tokio::time::sleep(interval) => {
                        if let Err(e) = this.send_heartbeat().await {
                            tracing::warn!(channel_id = %this.channel_id, error = %e, "heartbeat missed");
                            this.listeners.notify(&EndpointEvent::HeartbeatMissed { channel_id: this.channel_id.clone() });
                            this.on_connection_lost().await;
                            break;
                        }
                    }
                }
            }
        });
    }

    // ---- server role ----------------------------------------------------

    /// Bind listener(s) and accept peers in the background; returns once
    /// listeners are bound (accept loops keep running on spawned tasks).
    pub async fn serve(self: &Arc<Self>) -> Result<(), NetError> {
        self.transition(EndpointState::Connecting)?;

        if self.profile.dual_channel {
            let send_port = self.profile.send_port.ok_or(NetError::NotConnected)?;
            let recv_port = self.profile.receive_port.ok_or(NetError::NotConnected)?;
            let send_listener = TcpListener::bind((self.profile.host.as_str(), send_port)).await?;
            let recv_listener = TcpListener::bind((self.profile.host.as_str(), recv_port)).await?;
            self.spawn_accept_loop(send_listener, Side::Send);
            self.spawn_accept_loop(recv_listener, Side::Receive);
        } else {
            let port = self.profile.unified_port.ok_or(NetError::NotConnected)?;
            let listener = TcpListener::bind((self.profile.host.as_str(), port)).await?;
            self.spawn_accept_loop(listener, Side::Unified);
        }

        self.transition(EndpointState::BothConnected)?;
        Ok(())
    }

    fn spawn_accept_loop(self: &Arc<Self>, listener: TcpListener, side: Side) {
        let this = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = this.closing.notified() => break,
                    accepted = listener.accept() => match accepted {
                        Ok((stream, addr)) => this.accept_peer(stream, addr, side),
                        Err(e) => {
                            tracing::warn!(channel_id = %this.channel_id, error = %e, "accept failed");
                        }
                    },
                }
            }
        });
    }

    fn accept_peer(self: &Arc<Self>, stream: TcpStream, addr: std::net::SocketAddr, side: Side) {
        let client_id = derive_client_id(addr);
        let socket = match FramedSocket::new(stream, default_framing(), self.schema.clone()) {
            Ok(s) => Arc::new(s),
            Err(e) => {
                tracing::warn!(channel_id = %self.channel_id, error = %e, "failed to wrap accepted socket");
                return;
            }
        };

        let fully_connected = match side {
            Side::Unified => {
                self.client_directory.insert_unified(client_id.clone(), socket.clone());
                true
            }
            Side::Send => self.client_directory.insert_send(client_id.clone(), socket.clone()),
            Side::Receive => self.client_directory.insert_receive(client_id.clone(), socket.clone()),
        };

        if fully_connected {
            self.listeners.notify(&EndpointEvent::PeerConnected {
                channel_id: self.channel_id.clone(),
                client_id: client_id.clone(),
            });
        }

        // Only the side that carries requests (unified, or SEND in dual
        // mode) is read from; the RECEIVE side in dual mode is write-only
        // from the server's perspective until the peer sends on it too.
        if matches!(side, Side::Unified | Side::Send) {
            self.spawn_peer_reader(client_id, socket, side);
        }
    }

    fn spawn_peer_reader(self: &Arc<Self>, client_id: String, socket: Arc<FramedSocket>, side: Side) {
        let this = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = this.closing.notified() => break,
                    result = socket.read_message() => match result {
                        Ok(msg) => this.on_inbound_as_server(&client_id, msg).await,
                        Err(e) => {
                            tracing::debug!(channel_id = %this.channel_id, client_id, error = %e, "peer read loop ended");
                            let gone = match side {
                                Side::Receive => this.client_directory.remove_receive(&client_id),
                                _ => this.client_directory.remove_send(&client_id),
                            };
                            if gone {
                                this.listeners.notify(&EndpointEvent::PeerDisconnected {
                                    channel_id: this.channel_id.clone(),
                                    client_id: client_id.clone(),
                                });
                            }
                            break;
                        }
                    },
                }
            }
        });
    }

    async fn on_inbound_as_server(self: &Arc<Self>, client_id: &str, msg: Message) {
        let response = self.handler.handle(&self.channel_id, Some(client_id), msg).await;
        let Some(response) = response else { return };
        let reply_socket = self
            .client_directory
            .receive_socket(client_id)
            .or_else(|| self.client_directory.send_socket(client_id));
        match reply_socket {
            Some(socket) => {
                if let Err(e) = socket.write_message(&response).await {
                    tracing::warn!(channel_id = %self.channel_id, client_id, error = %e, "failed to write reply");
                }
            }
            None => {
                tracing::warn!(channel_id = %self.channel_id, client_id, "no socket to reply on, peer likely disconnected");
            }
        }
    }

    // ---- lifecycle --------------------------------------------------

    /// Close every socket and stop accepting, within `timeout`. On expiry,
    /// resources are force-released anyway (§4.2 "Graceful shutdown").
    pub async fn shutdown(self: &Arc<Self>, timeout: Duration) {
        let _ = self.transition(EndpointState::Closing);
        self.closing.notify_waiters();
        self.registry.close("endpoint shutting down");

        let close_all = async {
            let halves = self.client_sockets.lock().await;
            if let Some(s) = halves.outbound() {
                s.shutdown().await;
            }
            if let Some(s) = &halves.receive {
                s.shutdown().await;
            }
            for id in self.client_directory.client_ids() {
                if let Some(s) = self.client_directory.send_socket(&id) {
                    s.shutdown().await;
                }
                if let Some(s) = self.client_directory.receive_socket(&id) {
                    s.shutdown().await;
                }
            }
        };

        if tokio::time::timeout(timeout, close_all).await.is_err() {
            tracing::warn!(channel_id = %self.channel_id, "graceful shutdown exceeded deadline, forcing close");
        }
        let _ = self.transition(EndpointState::Closed);
    }

    pub fn role(&self) -> Role {
        self.profile.role()
    }
}

#[derive(Clone, Copy)]
enum Side {
    Send,
    Receive,
    Unified,
}

async fn timeout_connect(host: &str, port: u16, timeout: Duration) -> Result<TcpStream, NetError> {
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(NetError::Io(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            format!("connect to {host}:{port} timed out"),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fep_codec::{FieldKind, FieldSpec, FieldType, PadSpec};
    use fep_core::FieldId;
    use std::sync::atomic::AtomicUsize;

    fn schema() -> Arc<Schema> {
        Arc::new(Schema {
            has_bitmap: true,
            bitmap_bytes: 8,
            fields: vec![FieldSpec {
                id: FieldId::Numeric(11),
                field_type: FieldType::N,
                kind: FieldKind::Fixed { len: 6, pad: PadSpec::zero_left() },
                bitmap_bit: Some(11),
            }],
        })
    }

    fn profile(dual: bool) -> ConnectionProfile {
        ConnectionProfile {
            host: "127.0.0.1".into(),
            send_port: dual.then_some(0),
            receive_port: dual.then_some(0),
            unified_port: (!dual).then_some(0),
            server_mode: true,
            dual_channel: dual,
            connect_timeout_ms: 1_000,
            response_timeout_ms: 1_000,
            heartbeat_interval_ms: 60_000,
            max_retries: 0,
            retry_delay_ms: 0,
            auto_reconnect: false,
        }
    }

    struct EchoHandler(Arc<AtomicUsize>);
    impl InboundHandler for EchoHandler {
        fn handle<'a>(
            &'a self,
            _channel_id: &'a str,
            _client_id: Option<&'a str>,
            msg: Message,
        ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Option<Message>> + Send + 'a>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move { Some(msg) })
        }
    }

    #[test]
    fn endpoint_starts_disconnected() {
        let ep = Endpoint::new("A", profile(true), schema(), Arc::new(EchoHandler(Arc::new(AtomicUsize::new(0)))));
        assert_eq!(ep.state(), EndpointState::Disconnected);
    }

    #[tokio::test]
    async fn unified_server_accepts_and_echoes() {
        let handled = Arc::new(AtomicUsize::new(0));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut p = profile(false);
        p.unified_port = Some(port);
        let ep = Endpoint::new("A", p, schema(), Arc::new(EchoHandler(handled.clone())));
        ep.serve().await.unwrap();
        assert_eq!(ep.state(), EndpointState::BothConnected);

        let client = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        let client_socket = FramedSocket::new(client, default_framing(), schema()).unwrap();

        let msg = MessageBuilder::new()
            .mti(Mti::parse("0800").unwrap())
            .field(11u32, b"000001".to_vec())
            .build()
            .unwrap();
        client_socket.write_message(&msg).await.unwrap();
        let echoed = client_socket.read_message().await.unwrap();
        assert_eq!(echoed.stan(), Some("000001"));
        assert_eq!(handled.load(Ordering::SeqCst), 1);
    }
}
