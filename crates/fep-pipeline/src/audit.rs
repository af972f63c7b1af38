//! Stage 5: audit (§4.5 "persists/updates the record via `repository` and
//! forwards to the audit logger").

use fep_core::TransactionRecord;

/// Forwards a completed (or short-circuited) transaction record to whatever
/// durable audit trail the embedder runs — a log sink, a message bus, a
/// compliance store. Distinct from `Repository`, which owns the record's
/// canonical state; an `AuditLogger` only ever observes.
pub trait AuditLogger: Send + Sync {
    fn on_audit(&self, record: &TransactionRecord);
}

/// Emits one `tracing` event per audited record. The default for
/// deployments with no separate audit sink.
#[derive(Default)]
pub struct TracingAuditLogger;

impl AuditLogger for TracingAuditLogger {
    fn on_audit(&self, record: &TransactionRecord) {
        tracing::info!(
            transaction_id = %record.transaction_id,
            status = ?record.status,
            response_code = ?record.response_code,
            "transaction audited"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fep_core::{Status, TransactionType};
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct RecordingLogger(Arc<Mutex<Vec<String>>>);
    impl AuditLogger for RecordingLogger {
        fn on_audit(&self, record: &TransactionRecord) {
            self.0.lock().push(record.transaction_id.clone());
        }
    }

    #[test]
    fn custom_logger_receives_records() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let logger = RecordingLogger(log.clone());
        let now = Utc::now();
        let record = TransactionRecord {
            transaction_id: "TXN-1".into(),
            transaction_type: TransactionType::Withdrawal,
            processing_code: "010000".into(),
            masked_pan: "411111*******1111".into(),
            pan_hash: String::new(),
            pan_encrypted: vec![],
            amount: 100,
            currency: "901".into(),
            source_account: None,
            destination_account: None,
            terminal_id: "ATM00001".into(),
            merchant_id: None,
            acquiring_bank_code: None,
            stan: "000001".into(),
            rrn: "000000000001".into(),
            channel_id: "FISC-1".into(),
            status: Status::Approved,
            response_code: Some("00".into()),
            authorization_code: None,
            original_transaction_id: None,
            request_timestamp: now,
            transaction_timestamp: None,
            response_timestamp: None,
            processing_time_ms: None,
            error_details: None,
            transaction_date: now.date_naive(),
            created_at: now,
            updated_at: now,
        };
        logger.on_audit(&record);
        assert_eq!(*log.lock(), vec!["TXN-1".to_string()]);
    }
}
