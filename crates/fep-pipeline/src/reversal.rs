//! Reversal service (§4.5.2): locates the original, mints a compensating
//! transaction, drives it through the pipeline, and — only on success —
//! marks the original REVERSED.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chrono::Utc;
use fep_core::{Message, MessageBuilder, Status, TransactionRecord};
use fep_repo::Repository;

use crate::error::ReversalError;
use crate::pipeline::{original_transaction_field, Pipeline, PipelineOutcome};

/// Drives reversals through the same [`Pipeline`] ordinary transactions
/// use, so a reversal gets dedup/validation/audit for free (§4.5.2).
pub struct ReversalService {
    repository: Arc<dyn Repository>,
    pipeline: Arc<Pipeline>,
    next_stan: AtomicU32,
}

impl ReversalService {
    pub fn new(repository: Arc<dyn Repository>, pipeline: Arc<Pipeline>) -> Self {
        ReversalService {
            repository,
            pipeline,
            next_stan: AtomicU32::new(1),
        }
    }

    fn mint_stan(&self) -> String {
        let n = self.next_stan.fetch_add(1, Ordering::Relaxed) % 1_000_000;
        format!("{n:06}")
    }

    fn build_reversal_message(&self, original: &TransactionRecord, channel_id: &str) -> Message {
        let stan = self.mint_stan();
        // Mirror ISO-8583's 04xx reversal family (0200 -> 0400); a specific
        // request MTI isn't recorded on `TransactionRecord`, so we assume
        // the common 0200 financial-request family for the original.
        let reversal_mti = fep_core::Mti::parse("0200").unwrap().as_reversal();
        // RRN stays 12 digits (§3 "Retrieval Reference Number"); re-use the
        // original's acquirer/date prefix and swap in the fresh STAN.
        let prefix_len = original.rrn.len().saturating_sub(6);
        let rrn = format!("{}{stan}", &original.rrn[..prefix_len]);
        let mut builder = MessageBuilder::new()
            .mti(reversal_mti)
            .field(3u32, original.processing_code.clone())
            .field(4u32, original.amount.to_string())
            .field(11u32, stan)
            .field(37u32, rrn)
            .field(41u32, original.terminal_id.clone())
            .field(49u32, original.currency.clone())
            .field(original_transaction_field(), original.transaction_id.clone());
        if !original.masked_pan.is_empty() {
            // Cleartext PAN was never retained (§3, §8 property 10); the
            // masked form is the closest thing this internal message can
            // carry for the card-identifying field.
            builder = builder.field(2u32, original.masked_pan.clone());
        }
        if let Some(src) = &original.source_account {
            builder = builder.field(102u32, src.clone());
        }
        if let Some(dst) = &original.destination_account {
            builder = builder.field(103u32, dst.clone());
        }
        let _ = channel_id;
        builder.build().expect("mti is always set above")
    }

    /// §4.5.2: find the original via `findOriginalForReversal` (only
    /// returns a reversible record), mint a new transactionId, drive the
    /// pipeline, and on success mark the original REVERSED.
    pub async fn reverse(&self, original_transaction_id: &str, reason: &str, channel_id: &str) -> Result<PipelineOutcome, ReversalError> {
        let existing = self.repository.find_by_transaction_id(original_transaction_id).await?;
        if existing.is_none() {
            return Err(ReversalError::OriginalNotFound(original_transaction_id.to_string()));
        }
        let original = self
            .repository
            .find_original_for_reversal(original_transaction_id)
            .await?
            .ok_or_else(|| ReversalError::NotReversible(original_transaction_id.to_string()))?;

        tracing::info!(original_transaction_id, reason, "issuing reversal");
        let message = self.build_reversal_message(&original, channel_id);
        let outcome = self.pipeline.run(channel_id, message).await?;

        if matches!(outcome.record.status, Status::Approved | Status::Completed) {
            self.repository.mark_as_reversed(original_transaction_id, Utc::now()).await?;
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::TracingAuditLogger;
    use crate::processors::default_processors;
    use crate::route::Router;
    use fep_core::pan::PanCipher;
    use fep_core::TransactionType;
    use fep_repo::InMemoryRepository;
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

    fn sample_original(id: &str, status: Status) -> TransactionRecord {
        let now = Utc::now();
        TransactionRecord {
            transaction_id: id.to_string(),
            transaction_type: TransactionType::Withdrawal,
            processing_code: "010000".into(),
            masked_pan: "411111*******1111".into(),
            pan_hash: fep_core::pan::hash("4111111111111111"),
            pan_encrypted: vec![],
            amount: 10_000,
            currency: "901".into(),
            source_account: None,
            destination_account: None,
            terminal_id: "ATM00001".into(),
            merchant_id: None,
            acquiring_bank_code: None,
            stan: "000001".into(),
            rrn: "000000000001".into(),
            channel_id: "FISC-1".into(),
            status,
            response_code: Some("00".into()),
            authorization_code: Some("A1B2C3".into()),
            original_transaction_id: None,
            request_timestamp: now,
            transaction_timestamp: Some(now),
            response_timestamp: Some(now),
            processing_time_ms: Some(12),
            error_details: None,
            transaction_date: now.date_naive(),
            created_at: now,
            updated_at: now,
        }
    }

    fn setup() -> (Arc<InMemoryRepository>, ReversalService) {
        let repo = Arc::new(InMemoryRepository::new());
        let pipeline = Arc::new(Pipeline::new(
            repo.clone(),
            Arc::new(ValidationEngine::default()),
            Arc::new(Router::new(default_processors())),
            Arc::new(TracingAuditLogger),
            Arc::new(NullCipher),
            5,
        ));
        let service = ReversalService::new(repo.clone(), pipeline);
        (repo, service)
    }

    #[tokio::test]
    async fn reverses_an_approved_transaction() {
        let (repo, service) = setup();
        repo.save(sample_original("TXN-A", Status::Approved)).await.unwrap();

        let outcome = service.reverse("TXN-A", "manual", "FISC-1").await.unwrap();
        assert_eq!(outcome.record.transaction_type, TransactionType::Reversal);
        assert_eq!(outcome.record.original_transaction_id.as_deref(), Some("TXN-A"));
        assert_eq!(outcome.record.status, Status::Approved);

        let original = repo.find_by_transaction_id("TXN-A").await.unwrap().unwrap();
        assert_eq!(original.status, Status::Reversed);
    }

    /// A second reversal of the same original fails with NotReversible.
    #[tokio::test]
    async fn second_reversal_is_not_reversible() {
        let (repo, service) = setup();
        repo.save(sample_original("TXN-A", Status::Approved)).await.unwrap();

        service.reverse("TXN-A", "manual", "FISC-1").await.unwrap();
        let err = service.reverse("TXN-A", "manual", "FISC-1").await.unwrap_err();
        assert!(matches!(err, ReversalError::NotReversible(id) if id == "TXN-A"));
    }

    #[tokio::test]
    async fn reversing_an_unknown_transaction_fails_with_not_found() {
        let (_repo, service) = setup();
        let err = service.reverse("TXN-GHOST", "manual", "FISC-1").await.unwrap_err();
        assert!(matches!(err, ReversalError::OriginalNotFound(id) if id == "TXN-GHOST"));
    }

    #[tokio::test]
    async fn reversing_a_declined_transaction_fails_with_not_reversible() {
        let (repo, service) = setup();
        repo.save(sample_original("TXN-B", Status::Declined)).await.unwrap();
        let err = service.reverse("TXN-B", "manual", "FISC-1").await.unwrap_err();
        assert!(matches!(err, ReversalError::NotReversible(id) if id == "TXN-B"));
    }
}
