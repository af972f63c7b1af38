//! Bridges an inbound wire message (§4.2 "what the endpoint hands a
//! decoded inbound message to") into the transaction pipeline (§4.5).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use fep_core::Message;
use fep_net::InboundHandler;
use fep_pipeline::Pipeline;

pub struct PipelineHandler {
    pipeline: Arc<Pipeline>,
}

impl PipelineHandler {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        PipelineHandler { pipeline }
    }
}

impl InboundHandler for PipelineHandler {
    fn handle<'a>(
        &'a self,
        channel_id: &'a str,
        client_id: Option<&'a str>,
        msg: Message,
    ) -> Pin<Box<dyn Future<Output = Option<Message>> + Send + 'a>> {
        Box::pin(async move {
            // Network-management traffic (heartbeats, sign-on/sign-off) is
            // answered by the endpoint itself (§4.2); only application
            // messages reach the pipeline.
            if msg.mti().is_network_management() {
                return None;
            }
            match self.pipeline.run(channel_id, msg).await {
                Ok(outcome) => Some(outcome.response),
                Err(e) => {
                    tracing::error!(channel_id, ?client_id, error = %e, "pipeline failed to produce a response");
                    None
                }
            }
        })
    }
}
