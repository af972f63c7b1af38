use std::sync::Arc;

use fep_codec::Schema;
use fep_core::ChannelConfig;

/// Resolves a channel's `schema_ref` (§3 "Channel configuration") to the
/// wire schema the endpoint should decode/encode against. The manager
/// itself is schema-agnostic; the gateway binary supplies the concrete
/// provider (typically one backed by a loaded schema registry).
pub trait SchemaProvider: Send + Sync {
    fn schema_for(&self, channel: &ChannelConfig) -> Arc<Schema>;
}

/// A provider that always resolves to the same schema, regardless of
/// `schema_ref` — useful for single-schema deployments and tests.
pub struct FixedSchema(pub Arc<Schema>);

impl SchemaProvider for FixedSchema {
    fn schema_for(&self, _channel: &ChannelConfig) -> Arc<Schema> {
        self.0.clone()
    }
}
