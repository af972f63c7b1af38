//! End-to-end scenarios (spec.md §8) assembled against an in-memory
//! repository and the default processor set, exercised through the crate's
//! public API only.

use std::sync::Arc;

use fep_core::pan::PanCipher;
use fep_core::{Message, MessageBuilder, Mti, Status};
use fep_pipeline::{default_processors, Pipeline, ReversalError, ReversalService, Router, TracingAuditLogger};
use fep_repo::{InMemoryRepository, Repository};
use fep_validate::ValidationEngine;

struct NullCipher;
impl PanCipher for NullCipher {
    fn encrypt(&self, pan: &str) -> Vec<u8> {
        pan.as_bytes().to_vec()
    }
    fn decrypt(&self, ciphertext: &[u8]) -> Option<String> {
        String::from_utf8(ciphertext.to_vec()).ok()
    }
}

fn pipeline_with(validation: ValidationEngine) -> (Arc<Pipeline>, Arc<InMemoryRepository>) {
    let repo = Arc::new(InMemoryRepository::new());
    let pipeline = Arc::new(Pipeline::new(
        repo.clone(),
        Arc::new(validation),
        Arc::new(Router::new(default_processors())),
        Arc::new(TracingAuditLogger),
        Arc::new(NullCipher),
        5,
    ));
    (pipeline, repo)
}

fn withdrawal(stan: &str, rrn: &str) -> Message {
    MessageBuilder::new()
        .mti(Mti::parse("0200").unwrap())
        .field(2u32, b"4111111111111111".to_vec())
        .field(3u32, b"010000".to_vec())
        .field(4u32, b"000000010000".to_vec())
        .field(11u32, stan.as_bytes().to_vec())
        .field(37u32, rrn.as_bytes().to_vec())
        .field(41u32, b"ATM00001".to_vec())
        .build()
        .unwrap()
}

/// S1: happy-path withdrawal approves and is audited exactly once.
#[tokio::test]
async fn s1_happy_path_withdrawal() {
    let (pipeline, repo) = pipeline_with(ValidationEngine::default());
    let outcome = pipeline.run("FISC-1", withdrawal("000001", "000000000001")).await.unwrap();

    assert_eq!(outcome.response.mti().as_str(), "0210");
    assert_eq!(outcome.response.field_str(39u32).unwrap(), Some("00"));
    assert_eq!(outcome.record.status, Status::Approved);
    assert!(outcome.audit_error.is_none());
    assert_eq!(repo.len(), 1);
}

/// S2: a repeated request (same RRN/STAN/terminal) inside the dedup window
/// is declined, and both attempts are still audited.
#[tokio::test]
async fn s2_duplicate_detection() {
    let (pipeline, repo) = pipeline_with(ValidationEngine::default());
    let first = pipeline.run("FISC-1", withdrawal("000001", "000000000001")).await.unwrap();
    assert_eq!(first.response.field_str(39u32).unwrap(), Some("00"));

    let second = pipeline.run("FISC-1", withdrawal("000001", "000000000001")).await.unwrap();
    assert_ne!(second.response.field_str(39u32).unwrap(), Some("00"));
    assert_eq!(second.record.status, Status::Declined);
    assert_eq!(repo.len(), 2);
}

/// S4: reversing an approved transaction succeeds once and is rejected the
/// second time with NotReversible.
#[tokio::test]
async fn s4_reversal_then_rereversal_is_rejected() {
    let (pipeline, repo) = pipeline_with(ValidationEngine::default());
    let original = pipeline.run("FISC-1", withdrawal("000001", "000000000001")).await.unwrap();
    assert_eq!(original.record.status, Status::Approved);

    let service = ReversalService::new(repo.clone(), pipeline.clone());
    let reversal = service.reverse(&original.record.transaction_id, "customer dispute", "FISC-1").await.unwrap();
    assert_eq!(reversal.record.original_transaction_id.as_deref(), Some(original.record.transaction_id.as_str()));

    let original_after = repo.find_by_transaction_id(&original.record.transaction_id).await.unwrap().unwrap();
    assert_eq!(original_after.status, Status::Reversed);

    let err = service.reverse(&original.record.transaction_id, "retry", "FISC-1").await.unwrap_err();
    assert!(matches!(err, ReversalError::NotReversible(_)));
}

/// S5: a request missing a field the active rule set requires fails
/// validation before routing ever runs.
#[tokio::test]
async fn s5_validation_failure_short_circuits_before_routing() {
    let engine = fep_validate::load_engine("REQUIRED:2,3,4,11,41").unwrap();
    let (pipeline, _repo) = pipeline_with(engine);

    let msg = MessageBuilder::new()
        .mti(Mti::parse("0200").unwrap())
        .field(2u32, b"4111111111111111".to_vec())
        .field(3u32, b"010000".to_vec())
        .field(4u32, b"000000010000".to_vec())
        .field(41u32, b"ATM00001".to_vec())
        .build()
        .unwrap();

    let outcome = pipeline.run("FISC-1", msg).await.unwrap();
    assert_eq!(outcome.record.status, Status::Failed);
    assert!(outcome.record.error_details.unwrap().contains("Required field 11 is missing"));
}
