//! Default processor set (§4.5.1): withdrawal, deposit, transfer, balance
//! inquiry, reversal, P2P, bill payment, e-ticket top-up, TaiwanPay,
//! cardless withdrawal, cross-border payment, currency exchange, e-wallet.
//!
//! Each processor is a stateless, idempotent function of `(transactionId,
//! inputs)`: no processor here holds mutable state of its own, matching
//! §4.5.1. Response codes follow the ISO-8583 field-39 convention: `"00"`
//! approved, anything else a decline reason.

use fep_core::{FieldId, TransactionType};

use crate::processor::{BoxFuture, Processor, ProcessorOutcome, ProcessorRequest};

const DECLINE_INVALID_AMOUNT: &str = "13";
const DECLINE_SAME_ACCOUNT: &str = "12";
const DECLINE_MISSING_DATA: &str = "30";

fn auth_code(record: &fep_core::TransactionRecord) -> String {
    // Last 6 of the transaction id, upper-cased, padded: cheap and
    // deterministic given (transactionId, inputs) as §4.5.1 requires.
    let id = record.transaction_id.to_uppercase();
    let tail = if id.len() > 6 { &id[id.len() - 6..] } else { &id[..] };
    format!("{tail:0>6}")
}

pub struct WithdrawalProcessor;
impl Processor for WithdrawalProcessor {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::Withdrawal
    }

    fn process<'a>(&'a self, req: ProcessorRequest<'a>) -> BoxFuture<'a, ProcessorOutcome> {
        Box::pin(async move {
            if req.record.amount <= 0 {
                return ProcessorOutcome::declined(DECLINE_INVALID_AMOUNT);
            }
            ProcessorOutcome::approved("00", auth_code(req.record))
        })
    }
}

pub struct DepositProcessor;
impl Processor for DepositProcessor {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::Deposit
    }

    fn process<'a>(&'a self, req: ProcessorRequest<'a>) -> BoxFuture<'a, ProcessorOutcome> {
        Box::pin(async move {
            if req.record.amount <= 0 {
                return ProcessorOutcome::declined(DECLINE_INVALID_AMOUNT);
            }
            ProcessorOutcome::approved("00", auth_code(req.record))
        })
    }
}

pub struct TransferProcessor;
impl Processor for TransferProcessor {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::Transfer
    }

    fn process<'a>(&'a self, req: ProcessorRequest<'a>) -> BoxFuture<'a, ProcessorOutcome> {
        Box::pin(async move {
            let (Some(src), Some(dst)) = (&req.record.source_account, &req.record.destination_account) else {
                return ProcessorOutcome::declined(DECLINE_MISSING_DATA);
            };
            if src == dst {
                return ProcessorOutcome::declined(DECLINE_SAME_ACCOUNT);
            }
            ProcessorOutcome::approved("00", auth_code(req.record))
        })
    }
}

pub struct BalanceInquiryProcessor;
impl Processor for BalanceInquiryProcessor {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::BalanceInquiry
    }

    // A balance inquiry never touches money movement at the core; it is
    // answered from whatever ledger snapshot the embedder already has.
    fn calls_host(&self) -> bool {
        false
    }

    fn process<'a>(&'a self, req: ProcessorRequest<'a>) -> BoxFuture<'a, ProcessorOutcome> {
        Box::pin(async move {
            ProcessorOutcome::approved("00", auth_code(req.record)).with_field(FieldId::Numeric(54), b"000000010000".to_vec())
        })
    }
}

/// Handles a reversal *request* once the reversal service (§4.5.2) has
/// already located the original and built the compensating message; this
/// processor just decides the compensating transaction's own outcome.
pub struct ReversalProcessor;
impl Processor for ReversalProcessor {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::Reversal
    }

    fn process<'a>(&'a self, req: ProcessorRequest<'a>) -> BoxFuture<'a, ProcessorOutcome> {
        Box::pin(async move {
            if req.record.original_transaction_id.is_none() {
                return ProcessorOutcome::declined(DECLINE_MISSING_DATA);
            }
            ProcessorOutcome::approved("00", auth_code(req.record))
        })
    }
}

pub struct P2pProcessor;
impl Processor for P2pProcessor {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::P2p
    }

    fn process<'a>(&'a self, req: ProcessorRequest<'a>) -> BoxFuture<'a, ProcessorOutcome> {
        Box::pin(async move {
            if req.record.destination_account.is_none() {
                return ProcessorOutcome::declined(DECLINE_MISSING_DATA);
            }
            ProcessorOutcome::approved("00", auth_code(req.record))
        })
    }
}

pub struct BillPaymentProcessor;
impl Processor for BillPaymentProcessor {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::BillPayment
    }

    fn process<'a>(&'a self, req: ProcessorRequest<'a>) -> BoxFuture<'a, ProcessorOutcome> {
        Box::pin(async move {
            let Some(biller) = req.message.field_str(FieldId::Named("billerId".into())).ok().flatten() else {
                return ProcessorOutcome::declined(DECLINE_MISSING_DATA);
            };
            if biller.is_empty() {
                return ProcessorOutcome::declined(DECLINE_MISSING_DATA);
            }
            ProcessorOutcome::approved("00", auth_code(req.record))
        })
    }
}

pub struct ETicketTopUpProcessor;
impl Processor for ETicketTopUpProcessor {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::ETicketTopUp
    }

    fn process<'a>(&'a self, req: ProcessorRequest<'a>) -> BoxFuture<'a, ProcessorOutcome> {
        Box::pin(async move {
            if req.record.amount <= 0 {
                return ProcessorOutcome::declined(DECLINE_INVALID_AMOUNT);
            }
            ProcessorOutcome::approved("00", auth_code(req.record))
        })
    }
}

pub struct TaiwanPayProcessor;
impl Processor for TaiwanPayProcessor {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::TaiwanPay
    }

    fn process<'a>(&'a self, req: ProcessorRequest<'a>) -> BoxFuture<'a, ProcessorOutcome> {
        Box::pin(async move {
            let Some(qr) = req.message.field_str(FieldId::Named("qrPayload".into())).ok().flatten() else {
                return ProcessorOutcome::declined(DECLINE_MISSING_DATA);
            };
            if qr.is_empty() {
                return ProcessorOutcome::declined(DECLINE_MISSING_DATA);
            }
            ProcessorOutcome::approved("00", auth_code(req.record))
        })
    }
}

pub struct CardlessWithdrawalProcessor;
impl Processor for CardlessWithdrawalProcessor {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::CardlessWithdrawal
    }

    fn process<'a>(&'a self, req: ProcessorRequest<'a>) -> BoxFuture<'a, ProcessorOutcome> {
        Box::pin(async move {
            let Some(otp) = req.message.field_str(FieldId::Named("withdrawalCode".into())).ok().flatten() else {
                return ProcessorOutcome::declined(DECLINE_MISSING_DATA);
            };
            if otp.len() < 6 {
                return ProcessorOutcome::declined("55");
            }
            ProcessorOutcome::approved("00", auth_code(req.record))
        })
    }
}

pub struct CrossBorderPaymentProcessor;
impl Processor for CrossBorderPaymentProcessor {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::CrossBorderPayment
    }

    fn process<'a>(&'a self, req: ProcessorRequest<'a>) -> BoxFuture<'a, ProcessorOutcome> {
        Box::pin(async move {
            if req.record.destination_account.is_none() {
                return ProcessorOutcome::declined(DECLINE_MISSING_DATA);
            }
            ProcessorOutcome::approved("00", auth_code(req.record))
        })
    }
}

pub struct CurrencyExchangeProcessor;
impl Processor for CurrencyExchangeProcessor {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::CurrencyExchange
    }

    fn process<'a>(&'a self, req: ProcessorRequest<'a>) -> BoxFuture<'a, ProcessorOutcome> {
        Box::pin(async move {
            let Some(target) = req.message.field_str(FieldId::Named("targetCurrency".into())).ok().flatten() else {
                return ProcessorOutcome::declined(DECLINE_MISSING_DATA);
            };
            if target == req.record.currency {
                return ProcessorOutcome::declined("57");
            }
            ProcessorOutcome::approved("00", auth_code(req.record))
        })
    }
}

pub struct EWalletProcessor;
impl Processor for EWalletProcessor {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::EWallet
    }

    fn process<'a>(&'a self, req: ProcessorRequest<'a>) -> BoxFuture<'a, ProcessorOutcome> {
        Box::pin(async move {
            if req.record.amount <= 0 {
                return ProcessorOutcome::declined(DECLINE_INVALID_AMOUNT);
            }
            ProcessorOutcome::approved("00", auth_code(req.record))
        })
    }
}

/// The closed set of built-in processors, dispatched without a vtable
/// (§4.5.1; DESIGN.md "`enum_dispatch` is reserved for `fep-pipeline`'s
/// processor router").
#[enum_dispatch::enum_dispatch(Processor)]
pub enum AnyProcessor {
    Withdrawal(WithdrawalProcessor),
    Deposit(DepositProcessor),
    Transfer(TransferProcessor),
    BalanceInquiry(BalanceInquiryProcessor),
    Reversal(ReversalProcessor),
    P2p(P2pProcessor),
    BillPayment(BillPaymentProcessor),
    ETicketTopUp(ETicketTopUpProcessor),
    TaiwanPay(TaiwanPayProcessor),
    CardlessWithdrawal(CardlessWithdrawalProcessor),
    CrossBorderPayment(CrossBorderPaymentProcessor),
    CurrencyExchange(CurrencyExchangeProcessor),
    EWallet(EWalletProcessor),
}

/// The default processor set described in §4.5.1, one instance per
/// transaction type.
pub fn default_processors() -> Vec<AnyProcessor> {
    vec![
        WithdrawalProcessor.into(),
        DepositProcessor.into(),
        TransferProcessor.into(),
        BalanceInquiryProcessor.into(),
        ReversalProcessor.into(),
        P2pProcessor.into(),
        BillPaymentProcessor.into(),
        ETicketTopUpProcessor.into(),
        TaiwanPayProcessor.into(),
        CardlessWithdrawalProcessor.into(),
        CrossBorderPaymentProcessor.into(),
        CurrencyExchangeProcessor.into(),
        EWalletProcessor.into(),
    ]
}
