//! Reconciles the declared set of channels against live endpoints (§4.4).

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use fep_core::{ChannelConfig, ConfigDelta, ConfigSnapshot, EventListener, ListenerList, Role};
use fep_net::{Endpoint, EndpointEvent, EndpointState, InboundHandler};
use parking_lot::RwLock;

use crate::error::ConnError;
use crate::event::ConnEvent;
use crate::schema::SchemaProvider;

const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

struct ManagedEndpoint {
    endpoint: Arc<Endpoint>,
    config: ChannelConfig,
}

/// Bridges one endpoint's lifecycle events onto the manager's own listener
/// list, translating `EndpointEvent` into the richer `ConnEvent` surface
/// (§4.4 "Lifecycle events"). Holds only a `Weak` reference to the manager
/// so the endpoint -> bridge -> manager -> endpoint cycle never leaks.
struct EventBridge {
    channel_id: String,
    manager: Weak<ConnectionManager>,
}

impl EventListener<EndpointEvent> for EventBridge {
    fn on_event(&self, event: &EndpointEvent) {
        let Some(manager) = self.manager.upgrade() else { return };
        let translated = match event {
            EndpointEvent::StateChanged { from, to, .. } => {
                if *to == EndpointState::BothConnected && manager.is_server(&self.channel_id) {
                    Some(ConnEvent::ServerStarted { channel_id: self.channel_id.clone() })
                } else {
                    Some(ConnEvent::StateChanged {
                        channel_id: self.channel_id.clone(),
                        from: *from,
                        to: *to,
                    })
                }
            }
            EndpointEvent::PeerConnected { client_id, .. } => Some(ConnEvent::ClientConnectedToServer {
                channel_id: self.channel_id.clone(),
                client_id: client_id.clone(),
            }),
            EndpointEvent::PeerDisconnected { client_id, .. } => Some(ConnEvent::ClientDisconnectedFromServer {
                channel_id: self.channel_id.clone(),
                client_id: client_id.clone(),
            }),
            EndpointEvent::HeartbeatMissed { .. } => None,
        };
        if let Some(event) = translated {
            manager.listeners.notify(&event);
        }
    }
}

/// Owns the live endpoint set and reconciles it against configuration
/// updates (§4.4). Cheap to clone: wrap in `Arc` once via [`ConnectionManager::new`].
pub struct ConnectionManager {
    endpoints: RwLock<HashMap<String, ManagedEndpoint>>,
    listeners: ListenerList<ConnEvent>,
    handler: Arc<dyn InboundHandler>,
    schema_provider: Arc<dyn SchemaProvider>,
}

impl ConnectionManager {
    pub fn new(handler: Arc<dyn InboundHandler>, schema_provider: Arc<dyn SchemaProvider>) -> Arc<Self> {
        Arc::new(ConnectionManager {
            endpoints: RwLock::new(HashMap::new()),
            listeners: ListenerList::new(),
            handler,
            schema_provider,
        })
    }

    pub fn add_listener(&self, listener: Arc<dyn EventListener<ConnEvent>>) {
        self.listeners.add(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn EventListener<ConnEvent>>) {
        self.listeners.remove(listener);
    }

    fn is_server(&self, channel_id: &str) -> bool {
        self.endpoints
            .read()
            .get(channel_id)
            .map(|m| m.config.profile.server_mode)
            .unwrap_or(false)
    }

    // ---- queries --------------------------------------------------------

    pub fn get_connection(&self, channel_id: &str) -> Option<Arc<Endpoint>> {
        let guard = self.endpoints.read();
        let managed = guard.get(channel_id)?;
        (managed.config.profile.role() == Role::Client).then(|| managed.endpoint.clone())
    }

    pub fn get_server_connection(&self, channel_id: &str) -> Option<Arc<Endpoint>> {
        let guard = self.endpoints.read();
        let managed = guard.get(channel_id)?;
        (managed.config.profile.role() == Role::Server).then(|| managed.endpoint.clone())
    }

    pub fn all_ids(&self) -> Vec<String> {
        self.endpoints.read().keys().cloned().collect()
    }

    pub fn active_ids(&self) -> Vec<String> {
        self.endpoints
            .read()
            .values()
            .filter(|m| m.config.active)
            .map(|m| m.config.channel_id.clone())
            .collect()
    }

    pub fn connected_ids(&self) -> Vec<String> {
        self.endpoints
            .read()
            .values()
            .filter(|m| m.endpoint.state().is_fully_connected())
            .map(|m| m.config.channel_id.clone())
            .collect()
    }

    pub fn client_ids(&self) -> Vec<String> {
        self.endpoints
            .read()
            .values()
            .filter(|m| m.config.profile.role() == Role::Client)
            .map(|m| m.config.channel_id.clone())
            .collect()
    }

    pub fn server_ids(&self) -> Vec<String> {
        self.endpoints
            .read()
            .values()
            .filter(|m| m.config.profile.role() == Role::Server)
            .map(|m| m.config.channel_id.clone())
            .collect()
    }

    pub fn state_of(&self, channel_id: &str) -> Option<EndpointState> {
        self.endpoints.read().get(channel_id).map(|m| m.endpoint.state())
    }

    // ---- mutation ---------------------------------------------------

    /// Apply a full configuration snapshot (§4.4 "Reconciliation algorithm
    /// on full update").
    pub async fn apply_snapshot(self: &Arc<Self>, snapshot: ConfigSnapshot) {
        let wanted: HashMap<String, ChannelConfig> = snapshot
            .connections
            .into_iter()
            .map(|c| (c.channel_id.clone(), c))
            .collect();

        // Step 1: close endpoints absent from the update or now inactive.
        let stale: Vec<(String, Arc<Endpoint>)> = {
            let guard = self.endpoints.read();
            guard
                .iter()
                .filter(|(id, m)| !wanted.get(*id).map(|c| c.active).unwrap_or(false) && m.config.active)
                .map(|(id, m)| (id.clone(), m.endpoint.clone()))
                .collect()
        };
        for (id, endpoint) in stale {
            endpoint.shutdown(DEFAULT_CLOSE_TIMEOUT).await;
            self.endpoints.write().remove(&id);
            self.listeners.notify(&ConnEvent::Removed { channel_id: id });
        }

        // Steps 2/3: build missing, or rebuild changed, active channels.
        for (id, config) in wanted {
            if !config.active {
                continue;
            }
            let existing_config = self.endpoints.read().get(&id).map(|m| m.config.clone());
            match existing_config {
                Some(current) if current == config => {
                    // unchanged, nothing to do
                }
                Some(_) => self.rebuild(config).await,
                None => self.build_and_insert(config, false).await,
            }
        }
    }

    /// Apply a single-channel delta (§4.4 "Delta update applies the
    /// matching subset of the above").
    pub async fn apply_delta(self: &Arc<Self>, delta: ConfigDelta) {
        match delta {
            ConfigDelta::Removed { channel_id } => self.remove(&channel_id).await,
            ConfigDelta::Added(config) | ConfigDelta::Updated(config) => {
                if !config.active {
                    self.remove(&config.channel_id).await;
                    return;
                }
                let existing_config = self.endpoints.read().get(&config.channel_id).map(|m| m.config.clone());
                match existing_config {
                    Some(current) if current == config => {}
                    Some(_) => self.rebuild(config).await,
                    None => self.build_and_insert(config, false).await,
                }
            }
        }
    }

    /// Explicit add by channelId (§4.4 "Public API surface").
    pub async fn add(self: &Arc<Self>, config: ChannelConfig) -> Result<(), ConnError> {
        self.build_and_insert(config, true).await
    }

    /// Explicit remove by channelId.
    pub async fn remove(self: &Arc<Self>, channel_id: &str) {
        let endpoint = self.endpoints.write().remove(channel_id).map(|m| m.endpoint);
        if let Some(endpoint) = endpoint {
            endpoint.shutdown(DEFAULT_CLOSE_TIMEOUT).await;
            self.listeners.notify(&ConnEvent::Removed { channel_id: channel_id.to_string() });
        }
    }

    /// Close and rebuild the endpoint for `channel_id` using its last known
    /// config (§4.4 "Public API surface: ... reconnect by channelId").
    pub async fn reconnect(self: &Arc<Self>, channel_id: &str) -> Result<(), ConnError> {
        let config = self
            .endpoints
            .read()
            .get(channel_id)
            .map(|m| m.config.clone())
            .ok_or_else(|| ConnError::UnknownChannel(channel_id.to_string()))?;
        self.rebuild(config).await;
        Ok(())
    }

    async fn rebuild(self: &Arc<Self>, config: ChannelConfig) {
        let channel_id = config.channel_id.clone();
        if let Some(endpoint) = self.endpoints.write().remove(&channel_id).map(|m| m.endpoint) {
            endpoint.shutdown(DEFAULT_CLOSE_TIMEOUT).await;
        }
        if self.build_and_insert(config, false).await.is_ok() {
            self.listeners.notify(&ConnEvent::Recreated { channel_id });
        }
    }

    /// Build one endpoint and insert it, emitting `Added`/`Failed`. On
    /// failure, a client endpoint with `auto_reconnect` still persists in
    /// the map (so retry policy elsewhere can act on it); anything else is
    /// dropped (§4.4 "client endpoints still persist if they carry
    /// auto-reconnect").
    async fn build_and_insert(self: &Arc<Self>, config: ChannelConfig, explicit: bool) -> Result<(), ConnError> {
        let schema = self.schema_provider.schema_for(&config);
        let endpoint = Endpoint::new(config.channel_id.clone(), config.profile.clone(), schema, self.handler.clone());

        let bridge: Arc<dyn EventListener<EndpointEvent>> = Arc::new(EventBridge {
            channel_id: config.channel_id.clone(),
            manager: Arc::downgrade(self),
        });
        endpoint.add_listener(bridge);

        let build_result = if config.profile.server_mode {
            endpoint.serve().await
        } else {
            endpoint.connect().await
        };

        match build_result {
            Ok(()) => {
                if !config.profile.server_mode {
                    endpoint.spawn_heartbeat();
                }
                self.endpoints.write().insert(
                    config.channel_id.clone(),
                    ManagedEndpoint { endpoint, config: config.clone() },
                );
                self.listeners.notify(&ConnEvent::Added { channel_id: config.channel_id });
                Ok(())
            }
            Err(e) => {
                self.listeners.notify(&ConnEvent::Failed {
                    channel_id: config.channel_id.clone(),
                    reason: e.to_string(),
                });
                if !config.profile.server_mode && config.profile.auto_reconnect {
                    self.endpoints.write().insert(config.channel_id.clone(), ManagedEndpoint { endpoint, config });
                } else if explicit {
                    return Err(e.into());
                }
                Err(e.into())
            }
        }
    }
}
