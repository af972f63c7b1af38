//! Stage 3: routing (§4.5 "maps the transaction (by MTI/processing
//! code/channel) to one `processor`. If none applies, short-circuit with a
//! 'no route' response").
//!
//! Classification is table-driven rather than hard-coded per type, so an
//! embedder can add processing codes (or MTI classes) for local business
//! rules without touching this crate.

use std::collections::HashMap;

use fep_core::{Message, Mti, TransactionType};

use crate::processor::{AnyProcessor, Processor};

/// The ISO 04xx family is reversal-class regardless of processing code.
const REVERSAL_CLASS_DIGIT: u8 = 4;

/// Maps a message to a [`TransactionType`] using its MTI class and the
/// first two digits of processing code (field 3), then hands it to the
/// first registered processor whose `supports` returns true.
pub struct Router {
    /// Processing-code prefix -> transaction type, applied to non-reversal
    /// MTI classes.
    by_processing_code: HashMap<String, TransactionType>,
    processors: Vec<AnyProcessor>,
}

impl Router {
    pub fn new(processors: Vec<AnyProcessor>) -> Self {
        let mut by_processing_code = HashMap::new();
        by_processing_code.insert("01".to_string(), TransactionType::Withdrawal);
        by_processing_code.insert("21".to_string(), TransactionType::Deposit);
        by_processing_code.insert("40".to_string(), TransactionType::Transfer);
        by_processing_code.insert("30".to_string(), TransactionType::BalanceInquiry);
        by_processing_code.insert("50".to_string(), TransactionType::P2p);
        by_processing_code.insert("51".to_string(), TransactionType::BillPayment);
        by_processing_code.insert("52".to_string(), TransactionType::ETicketTopUp);
        by_processing_code.insert("53".to_string(), TransactionType::TaiwanPay);
        by_processing_code.insert("54".to_string(), TransactionType::CardlessWithdrawal);
        by_processing_code.insert("55".to_string(), TransactionType::CrossBorderPayment);
        by_processing_code.insert("56".to_string(), TransactionType::CurrencyExchange);
        by_processing_code.insert("57".to_string(), TransactionType::EWallet);
        Router { by_processing_code, processors }
    }

    /// Add or override a processing-code -> type mapping (a channel- or
    /// institution-specific processing code table, for instance).
    pub fn with_processing_code(mut self, prefix: impl Into<String>, transaction_type: TransactionType) -> Self {
        self.by_processing_code.insert(prefix.into(), transaction_type);
        self
    }

    /// Classify a message into a transaction type, independent of whether a
    /// processor for it is actually registered.
    pub fn classify(&self, mti: Mti, msg: &Message) -> Option<TransactionType> {
        if mti.class_digit() == REVERSAL_CLASS_DIGIT {
            return Some(TransactionType::Reversal);
        }
        let processing_code = msg.field_str(fep_core::FieldId::Numeric(3)).ok().flatten()?;
        let prefix = processing_code.get(0..2)?;
        self.by_processing_code.get(prefix).copied()
    }

    /// Resolve a message straight to the processor that will handle it, or
    /// `None` if no processor is registered for its classified type (§4.5
    /// stage 3 "no route").
    pub fn route(&self, mti: Mti, msg: &Message) -> Option<&AnyProcessor> {
        let transaction_type = self.classify(mti, msg)?;
        self.processors.iter().find(|p| p.supports(transaction_type))
    }
}
