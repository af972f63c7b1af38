//! Transaction pipeline (§4.5): dedup -> validate -> route -> process ->
//! audit, the default processor set (§4.5.1), the reversal service
//! (§4.5.2), and a bounded-concurrency batch driver.

mod audit;
mod batch;
mod error;
mod pipeline;
mod processor;
mod processors;
mod reversal;
mod route;

pub use audit::{AuditLogger, TracingAuditLogger};
pub use batch::{BatchDriver, BatchItem};
pub use error::{PipelineError, ReversalError};
pub use pipeline::{Pipeline, PipelineOutcome};
pub use processor::{BoxFuture, Processor, ProcessorOutcome, ProcessorRequest};
pub use processors::{
    default_processors, AnyProcessor, BalanceInquiryProcessor, BillPaymentProcessor, CardlessWithdrawalProcessor,
    CrossBorderPaymentProcessor, CurrencyExchangeProcessor, DepositProcessor, ETicketTopUpProcessor, EWalletProcessor,
    P2pProcessor, ReversalProcessor, TaiwanPayProcessor, TransferProcessor, WithdrawalProcessor,
};
pub use reversal::ReversalService;
pub use route::Router;
