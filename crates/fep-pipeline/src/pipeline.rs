//! The ordered stage chain (§4.5): dedup -> validate -> route -> process ->
//! audit. Any stage before the last may short-circuit with a terminal
//! response; audit always runs (§4.5 "audit runs on every path so every
//! outcome is recorded").

use std::sync::Arc;

use chrono::Utc;
use fep_core::{FieldId, Message, MessageBuilder, Mti, Status, TransactionRecord, TransactionType};
use fep_core::pan::PanCipher;
use fep_repo::Repository;
use fep_validate::ValidationEngine;

use crate::audit::AuditLogger;
use crate::error::{format_validation_errors, PipelineError};
use crate::route::Router;

const DUPLICATE_RESPONSE_CODE: &str = "94";
const VALIDATION_FAILURE_RESPONSE_CODE: &str = "30";
const NO_ROUTE_RESPONSE_CODE: &str = "96";

const PAN_FIELD: FieldId = FieldId::Numeric(2);
const PROCESSING_CODE_FIELD: FieldId = FieldId::Numeric(3);
const AMOUNT_FIELD: FieldId = FieldId::Numeric(4);
const TERMINAL_FIELD: FieldId = FieldId::Numeric(41);
const MERCHANT_FIELD: FieldId = FieldId::Numeric(42);
const ACQUIRER_FIELD: FieldId = FieldId::Numeric(32);
const CURRENCY_FIELD: FieldId = FieldId::Numeric(49);
const SOURCE_ACCOUNT_FIELD: FieldId = FieldId::Numeric(102);
const DEST_ACCOUNT_FIELD: FieldId = FieldId::Numeric(103);
const RESPONSE_CODE_FIELD: FieldId = FieldId::Numeric(39);
const AUTH_CODE_FIELD: FieldId = FieldId::Numeric(38);

/// `originalTransactionId` has no ISO-8583 numeric slot of its own; it is
/// carried as a named field on reversal messages the embedder or
/// [`crate::reversal::ReversalService`] synthesizes.
pub(crate) fn original_transaction_field() -> FieldId {
    FieldId::Named("originalTransactionId".to_string())
}

fn field_str(msg: &Message, id: FieldId) -> Option<String> {
    msg.field_str(id).ok().flatten().map(str::to_string)
}

/// What [`Pipeline::run`] produces for every accepted request: the response
/// to write back and the record that was (or should have been) persisted.
/// `audit_error` carries a repository failure the audit stage hit while
/// persisting — the caller still gets `response`, but §7 "Repository
/// failures during audit are escalated so the caller learns the record may
/// be inconsistent" means this field must not be silently dropped.
pub struct PipelineOutcome {
    pub response: Message,
    pub record: TransactionRecord,
    pub audit_error: Option<fep_repo::RepoError>,
}

/// Ties the five stages together around one repository, validation engine,
/// and router (§4.5).
pub struct Pipeline {
    repository: Arc<dyn Repository>,
    validation: Arc<ValidationEngine>,
    router: Arc<Router>,
    audit_logger: Arc<dyn AuditLogger>,
    pan_cipher: Arc<dyn PanCipher>,
    dedup_window_minutes: i64,
}

impl Pipeline {
    pub fn new(
        repository: Arc<dyn Repository>,
        validation: Arc<ValidationEngine>,
        router: Arc<Router>,
        audit_logger: Arc<dyn AuditLogger>,
        pan_cipher: Arc<dyn PanCipher>,
        dedup_window_minutes: i64,
    ) -> Self {
        Pipeline {
            repository,
            validation,
            router,
            audit_logger,
            pan_cipher,
            dedup_window_minutes,
        }
    }

    fn build_response(&self, request_mti: Mti, record: &TransactionRecord, extra: &[(FieldId, Vec<u8>)]) -> Message {
        let mut builder = MessageBuilder::new()
            .mti(request_mti.as_response())
            .field(11u32, record.stan.clone())
            .field(37u32, record.rrn.clone())
            .field(RESPONSE_CODE_FIELD, record.response_code.clone().unwrap_or_default());
        if let Some(auth) = &record.authorization_code {
            builder = builder.field(AUTH_CODE_FIELD, auth.clone());
        }
        for (id, value) in extra {
            builder = builder.field(id.clone(), value.clone());
        }
        builder.build().expect("mti is always set above")
    }

    /// Build the draft record from an inbound message (§3 "Transaction
    /// record"). Runs before any stage so dedup/validation short-circuits
    /// still produce a complete, auditable record.
    fn draft_record(&self, channel_id: &str, msg: &Message) -> TransactionRecord {
        let now = Utc::now();
        let transaction_type = self
            .router
            .classify(msg.mti(), msg)
            // Best-effort metadata for audit purposes only; stage 3 still
            // performs the real routing decision and can fail independently
            // even when a type was successfully classified here.
            .unwrap_or(TransactionType::Withdrawal);

        let pan = field_str(msg, PAN_FIELD).unwrap_or_default();
        let (masked_pan, pan_hash, pan_encrypted) = if pan.is_empty() {
            (String::new(), String::new(), Vec::new())
        } else {
            (fep_core::pan::mask(&pan), fep_core::pan::hash(&pan), self.pan_cipher.encrypt(&pan))
        };

        TransactionRecord {
            transaction_id: format!("TXN-{}", uuid::Uuid::new_v4()),
            transaction_type,
            processing_code: field_str(msg, PROCESSING_CODE_FIELD).unwrap_or_default(),
            masked_pan,
            pan_hash,
            pan_encrypted,
            amount: field_str(msg, AMOUNT_FIELD).and_then(|s| s.parse().ok()).unwrap_or(0),
            currency: field_str(msg, CURRENCY_FIELD).unwrap_or_else(|| "901".to_string()),
            source_account: field_str(msg, SOURCE_ACCOUNT_FIELD),
            destination_account: field_str(msg, DEST_ACCOUNT_FIELD),
            terminal_id: field_str(msg, TERMINAL_FIELD).unwrap_or_default(),
            merchant_id: field_str(msg, MERCHANT_FIELD),
            acquiring_bank_code: field_str(msg, ACQUIRER_FIELD),
            stan: msg.stan().unwrap_or_default().to_string(),
            rrn: msg.rrn().unwrap_or_default().to_string(),
            channel_id: channel_id.to_string(),
            status: Status::Pending,
            response_code: None,
            authorization_code: None,
            original_transaction_id: field_str(msg, original_transaction_field()),
            request_timestamp: now,
            transaction_timestamp: None,
            response_timestamp: None,
            processing_time_ms: None,
            error_details: None,
            transaction_date: now.date_naive(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Stage 5: persist and forward to the audit logger, on every path
    /// (§4.5 "audit at tail").
    async fn audit(&self, mut record: TransactionRecord) -> (TransactionRecord, Option<fep_repo::RepoError>) {
        record.response_timestamp = Some(Utc::now());
        self.audit_logger.on_audit(&record);
        match self.repository.save(record.clone()).await {
            Ok(()) => (record, None),
            Err(e) => {
                tracing::error!(transaction_id = %record.transaction_id, error = %e, "audit-stage persistence failed");
                (record, Some(e))
            }
        }
    }

    fn finish_terminal(&self, mut record: TransactionRecord, status: Status, response_code: &str) -> TransactionRecord {
        if let Err(e) = record.transition_status(status, Utc::now()) {
            tracing::error!(transaction_id = %record.transaction_id, error = %e, "pipeline attempted an illegal status transition");
        }
        record.response_code = Some(response_code.to_string());
        record
    }

    /// Runs `msg` through the full stage chain (§4.5).
    pub async fn run(&self, channel_id: &str, msg: Message) -> Result<PipelineOutcome, PipelineError> {
        let request_mti = msg.mti();
        let mut record = self.draft_record(channel_id, &msg);

        // Stage 1: duplicate check.
        if self
            .repository
            .is_duplicate(&record.rrn, &record.stan, &record.terminal_id, self.dedup_window_minutes)
            .await?
        {
            record = self.finish_terminal(record, Status::Declined, DUPLICATE_RESPONSE_CODE);
            record.error_details = Some("duplicate transaction".to_string());
            let response = self.build_response(request_mti, &record, &[]);
            let (record, audit_error) = self.audit(record).await;
            return Ok(PipelineOutcome { response, record, audit_error });
        }

        // Stage 2: validation.
        if let Err(errors) = self.validation.validate(&msg) {
            record = self.finish_terminal(record, Status::Failed, VALIDATION_FAILURE_RESPONSE_CODE);
            record.error_details = Some(format_validation_errors(&errors));
            let response = self.build_response(request_mti, &record, &[]);
            let (record, audit_error) = self.audit(record).await;
            return Ok(PipelineOutcome { response, record, audit_error });
        }

        // Stage 3: routing.
        if let Err(e) = record.transition_status(Status::Processing, Utc::now()) {
            tracing::error!(transaction_id = %record.transaction_id, error = %e, "pipeline attempted an illegal status transition");
        }
        let Some(processor) = self.router.route(request_mti, &msg) else {
            record = self.finish_terminal(record, Status::Failed, NO_ROUTE_RESPONSE_CODE);
            record.error_details = Some(format!("no processor registered for {:?}", record.transaction_type));
            let response = self.build_response(request_mti, &record, &[]);
            let (record, audit_error) = self.audit(record).await;
            return Ok(PipelineOutcome { response, record, audit_error });
        };

        // Stage 4: processing.
        if processor.calls_host() {
            if let Err(e) = record.transition_status(Status::SentToHost, Utc::now()) {
                tracing::error!(transaction_id = %record.transaction_id, error = %e, "pipeline attempted an illegal status transition");
            }
        }
        let outcome = processor
            .process(crate::processor::ProcessorRequest { message: &msg, record: &record })
            .await;
        if let Err(e) = record.transition_status(outcome.status, Utc::now()) {
            tracing::error!(transaction_id = %record.transaction_id, error = %e, "pipeline attempted an illegal status transition");
        }
        record.response_code = Some(outcome.response_code.clone());
        record.authorization_code = outcome.authorization_code.clone();
        record.transaction_timestamp = Some(Utc::now());

        // Stage 5: audit.
        let response = self.build_response(request_mti, &record, &outcome.extra_fields);
        let (record, audit_error) = self.audit(record).await;
        Ok(PipelineOutcome { response, record, audit_error })
    }
}
