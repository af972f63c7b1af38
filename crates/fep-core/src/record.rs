use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::status::Status;

/// Transaction type, driving both routing (§4.5 stage 3) and the default
/// processor set (§4.5.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    Withdrawal,
    Deposit,
    Transfer,
    BalanceInquiry,
    Reversal,
    P2p,
    BillPayment,
    ETicketTopUp,
    TaiwanPay,
    CardlessWithdrawal,
    CrossBorderPayment,
    CurrencyExchange,
    EWallet,
}

/// A persisted transaction record (§3 "Transaction record").
///
/// `pan_encrypted`/`pan_hash`/`masked_pan` are the three PAN-derived forms
/// described in §6 "Persisted record layout"; cleartext PAN never appears
/// here (§8 property 10).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub transaction_id: String,
    pub transaction_type: TransactionType,
    pub processing_code: String,
    pub masked_pan: String,
    pub pan_hash: String,
    pub pan_encrypted: Vec<u8>,
    pub amount: i64,
    pub currency: String,
    pub source_account: Option<String>,
    pub destination_account: Option<String>,
    pub terminal_id: String,
    pub merchant_id: Option<String>,
    pub acquiring_bank_code: Option<String>,
    pub stan: String,
    pub rrn: String,
    pub channel_id: String,
    pub status: Status,
    pub response_code: Option<String>,
    pub authorization_code: Option<String>,
    pub original_transaction_id: Option<String>,
    pub request_timestamp: DateTime<Utc>,
    pub transaction_timestamp: Option<DateTime<Utc>>,
    pub response_timestamp: Option<DateTime<Utc>>,
    pub processing_time_ms: Option<i64>,
    pub error_details: Option<String>,
    pub transaction_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Apply a status transition in place, rejecting (and leaving the
    /// record untouched) if the state machine forbids it. Callers in the
    /// pipeline's audit stage should log at error level on `Err` (§4.5).
    pub fn transition_status(
        &mut self,
        next: Status,
        now: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        self.status = self.status.transition(next)?;
        self.updated_at = now;
        Ok(())
    }

    pub fn is_reversible(&self) -> bool {
        self.status.is_terminal_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(status: Status) -> TransactionRecord {
        let now = Utc::now();
        TransactionRecord {
            transaction_id: "TXN-1".into(),
            transaction_type: TransactionType::Withdrawal,
            processing_code: "010000".into(),
            masked_pan: "411111*******1111".into(),
            pan_hash: crate::pan::hash("4111111111111111"),
            pan_encrypted: vec![1, 2, 3],
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
            response_code: None,
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
        }
    }

    #[test]
    fn reversible_statuses() {
        assert!(sample(Status::Approved).is_reversible());
        assert!(sample(Status::Completed).is_reversible());
        assert!(!sample(Status::Pending).is_reversible());
        assert!(!sample(Status::Declined).is_reversible());
        assert!(!sample(Status::Reversed).is_reversible());
    }

    #[test]
    fn transition_status_updates_updated_at() {
        let mut rec = sample(Status::Pending);
        let before = rec.updated_at;
        let later = before + chrono::Duration::seconds(5);
        rec.transition_status(Status::Processing, later).unwrap();
        assert_eq!(rec.status, Status::Processing);
        assert_eq!(rec.updated_at, later);
    }

    #[test]
    fn illegal_transition_leaves_record_untouched() {
        let mut rec = sample(Status::Reversed);
        let before = rec.clone();
        let err = rec.transition_status(Status::Pending, Utc::now());
        assert!(err.is_err());
        assert_eq!(rec, before);
    }
}
