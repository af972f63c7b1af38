//! The processor seam (§4.5.1): "Processors are polymorphic over
//! `{supports(type) bool, process(req) -> resp}`". Each processor is
//! stateless and idempotent given the same `(transactionId, inputs)`.

use std::future::Future;
use std::pin::Pin;

use fep_core::{FieldId, Message, Status, TransactionRecord, TransactionType};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a processor is handed: the inbound message plus the record the
/// pipeline has built so far (dedup/validation/routing already ran).
pub struct ProcessorRequest<'a> {
    pub message: &'a Message,
    pub record: &'a TransactionRecord,
}

/// What a processor hands back to the pipeline. The pipeline builds the
/// wire response message from `response_fields` plus the inbound message's
/// STAN/RRN; `status` must be one of the terminal outcomes the pipeline's
/// audit stage is allowed to apply (§4.5 "APPROVED/DECLINED/TIMEOUT/FAILED
/// at stage-5 audit based on processor result").
pub struct ProcessorOutcome {
    pub status: Status,
    pub response_code: String,
    pub authorization_code: Option<String>,
    pub extra_fields: Vec<(FieldId, Vec<u8>)>,
}

impl ProcessorOutcome {
    pub fn approved(response_code: impl Into<String>, authorization_code: impl Into<String>) -> Self {
        ProcessorOutcome {
            status: Status::Approved,
            response_code: response_code.into(),
            authorization_code: Some(authorization_code.into()),
            extra_fields: Vec::new(),
        }
    }

    pub fn declined(response_code: impl Into<String>) -> Self {
        ProcessorOutcome {
            status: Status::Declined,
            response_code: response_code.into(),
            authorization_code: None,
            extra_fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, id: impl Into<FieldId>, value: impl Into<Vec<u8>>) -> Self {
        self.extra_fields.push((id.into(), value.into()));
        self
    }
}

/// Per-transaction-type business logic, chosen by [`crate::route::Router`]
/// (§4.5.1). `calls_host` tells the pipeline whether to transition the
/// record through `SENT_TO_HOST` before invoking `process` (§5 "processors
/// that perform network I/O must suspend").
#[enum_dispatch::enum_dispatch]
pub trait Processor {
    fn transaction_type(&self) -> TransactionType;

    fn supports(&self, transaction_type: TransactionType) -> bool {
        transaction_type == self.transaction_type()
    }

    fn calls_host(&self) -> bool {
        true
    }

    fn process<'a>(&'a self, req: ProcessorRequest<'a>) -> BoxFuture<'a, ProcessorOutcome>;
}
