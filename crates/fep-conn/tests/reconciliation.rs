use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use fep_codec::{FieldKind, FieldSpec, FieldType, PadSpec, Schema};
use fep_core::{ChannelConfig, ConfigSnapshot, ConnectionProfile, FieldId, Message};
use fep_conn::{ConnectionManager, FixedSchema};
use fep_net::InboundHandler;

struct NoopHandler;
impl InboundHandler for NoopHandler {
    fn handle<'a>(
        &'a self,
        _channel_id: &'a str,
        _client_id: Option<&'a str>,
        msg: Message,
    ) -> Pin<Box<dyn Future<Output = Option<Message>> + Send + 'a>> {
        Box::pin(async move { Some(msg) })
    }
}

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

fn manager() -> Arc<ConnectionManager> {
    ConnectionManager::new(Arc::new(NoopHandler), Arc::new(FixedSchema(schema())))
}

fn server_channel(id: &str, port: u16) -> ChannelConfig {
    ChannelConfig {
        channel_id: id.to_string(),
        institution_id: "FISC".into(),
        active: true,
        schema_ref: None,
        profile: ConnectionProfile {
            host: "127.0.0.1".into(),
            send_port: None,
            receive_port: None,
            unified_port: Some(port),
            server_mode: true,
            dual_channel: false,
            connect_timeout_ms: 1_000,
            response_timeout_ms: 1_000,
            heartbeat_interval_ms: 60_000,
            max_retries: 0,
            retry_delay_ms: 0,
            auto_reconnect: false,
        },
    }
}

async fn free_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn hot_reconfiguration_swaps_b_for_c_and_leaves_a_untouched() {
    let mgr = manager();

    let port_a = free_port().await;
    let port_b = free_port().await;
    let port_c = free_port().await;

    let snapshot1 = ConfigSnapshot {
        connections: vec![server_channel("A", port_a), server_channel("B", port_b)],
    };
    mgr.apply_snapshot(snapshot1).await;

    assert_eq!(mgr.get_server_connection("A").is_some(), true);
    assert_eq!(mgr.get_server_connection("B").is_some(), true);
    let a_endpoint_before = mgr.get_server_connection("A").unwrap();

    let snapshot2 = ConfigSnapshot {
        connections: vec![server_channel("A", port_a), server_channel("C", port_c)],
    };
    mgr.apply_snapshot(snapshot2).await;

    assert!(mgr.get_server_connection("B").is_none(), "B should have been closed");
    assert!(mgr.get_server_connection("C").is_some(), "C should have been started");
    let a_endpoint_after = mgr.get_server_connection("A").unwrap();
    assert!(
        Arc::ptr_eq(&a_endpoint_before, &a_endpoint_after),
        "A's endpoint must not be rebuilt when its config is unchanged"
    );
}

#[tokio::test]
async fn changed_profile_triggers_rebuild() {
    let mgr = manager();
    let port1 = free_port().await;
    let port2 = free_port().await;

    mgr.apply_snapshot(ConfigSnapshot { connections: vec![server_channel("A", port1)] }).await;
    let before = mgr.get_server_connection("A").unwrap();

    mgr.apply_snapshot(ConfigSnapshot { connections: vec![server_channel("A", port2)] }).await;
    let after = mgr.get_server_connection("A").unwrap();

    assert!(!Arc::ptr_eq(&before, &after), "a changed port must trigger a rebuild");
}

#[tokio::test]
async fn inactive_channel_is_closed() {
    let mgr = manager();
    let port = free_port().await;
    mgr.apply_snapshot(ConfigSnapshot { connections: vec![server_channel("A", port)] }).await;
    assert!(mgr.get_server_connection("A").is_some());

    let mut inactive = server_channel("A", port);
    inactive.active = false;
    mgr.apply_snapshot(ConfigSnapshot { connections: vec![inactive] }).await;
    assert!(mgr.get_server_connection("A").is_none());
}
