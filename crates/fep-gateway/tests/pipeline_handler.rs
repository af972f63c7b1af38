//! Exercises the `InboundHandler` bridge end to end: a decoded withdrawal
//! message goes in, an approved response comes back, with no network
//! endpoint involved.

use std::sync::Arc;

use fep_core::{Message, MessageBuilder, Mti};
use fep_gateway::handler::PipelineHandler;
use fep_net::InboundHandler;
use fep_pipeline::{default_processors, Pipeline, Router, TracingAuditLogger};
use fep_repo::InMemoryRepository;
use fep_validate::ValidationEngine;

mod support {
    use fep_core::pan::PanCipher;

    pub struct NullCipher;
    impl PanCipher for NullCipher {
        fn encrypt(&self, pan: &str) -> Vec<u8> {
            pan.as_bytes().to_vec()
        }
        fn decrypt(&self, ciphertext: &[u8]) -> Option<String> {
            String::from_utf8(ciphertext.to_vec()).ok()
        }
    }
}

fn withdrawal(stan: &str) -> Message {
    MessageBuilder::new()
        .mti(Mti::parse("0200").unwrap())
        .field(2u32, b"4111111111111111".to_vec())
        .field(3u32, b"010000".to_vec())
        .field(4u32, b"000000010000".to_vec())
        .field(11u32, stan.as_bytes().to_vec())
        .field(37u32, b"000000000001".to_vec())
        .field(41u32, b"ATM00001".to_vec())
        .build()
        .unwrap()
}

#[tokio::test]
async fn approved_withdrawal_round_trips_through_the_handler() {
    let repo = Arc::new(InMemoryRepository::new());
    let pipeline = Arc::new(Pipeline::new(
        repo,
        Arc::new(ValidationEngine::default()),
        Arc::new(Router::new(default_processors())),
        Arc::new(TracingAuditLogger),
        Arc::new(support::NullCipher),
        5,
    ));
    let bridge = PipelineHandler::new(pipeline);

    let response = bridge.handle("FISC-1", None, withdrawal("000001")).await.unwrap();
    assert_eq!(response.mti().as_str(), "0210");
    assert_eq!(response.field_str(39u32).unwrap(), Some("00"));
}

#[tokio::test]
async fn network_management_messages_bypass_the_pipeline() {
    let repo = Arc::new(InMemoryRepository::new());
    let pipeline = Arc::new(Pipeline::new(
        repo,
        Arc::new(ValidationEngine::default()),
        Arc::new(Router::new(default_processors())),
        Arc::new(TracingAuditLogger),
        Arc::new(support::NullCipher),
        5,
    ));
    let bridge = PipelineHandler::new(pipeline);

    let heartbeat = MessageBuilder::new().mti(Mti::parse("0800").unwrap()).build().unwrap();
    assert!(bridge.handle("FISC-1", None, heartbeat).await.is_none());
}
