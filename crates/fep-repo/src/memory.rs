//! In-memory reference `Repository` (§6 "Implementations may back onto RAM
//! (for tests)"). Every operation completes synchronously; the `BoxFuture`
//! wrapping exists only to satisfy the trait object boundary, matching how
//! a real backend would await I/O in the same slot.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use fep_core::{Status, TransactionRecord};
use parking_lot::Mutex;

use crate::error::RepoError;
use crate::repository::{BoxFuture, Repository};

#[derive(Default)]
pub struct InMemoryRepository {
    records: Mutex<HashMap<String, TransactionRecord>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Repository for InMemoryRepository {
    fn save<'a>(&'a self, record: TransactionRecord) -> BoxFuture<'a, Result<(), RepoError>> {
        Box::pin(async move {
            self.records.lock().insert(record.transaction_id.clone(), record);
            Ok(())
        })
    }

    fn find_by_transaction_id<'a>(&'a self, transaction_id: &'a str) -> BoxFuture<'a, Result<Option<TransactionRecord>, RepoError>> {
        Box::pin(async move { Ok(self.records.lock().get(transaction_id).cloned()) })
    }

    fn find_by_rrn_and_stan<'a>(&'a self, rrn: &'a str, stan: &'a str) -> BoxFuture<'a, Result<Vec<TransactionRecord>, RepoError>> {
        Box::pin(async move {
            Ok(self
                .records
                .lock()
                .values()
                .filter(|r| r.rrn == rrn && r.stan == stan)
                .cloned()
                .collect())
        })
    }

    fn find_by_rrn_stan_terminal<'a>(
        &'a self,
        rrn: &'a str,
        stan: &'a str,
        terminal_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<TransactionRecord>, RepoError>> {
        Box::pin(async move {
            Ok(self
                .records
                .lock()
                .values()
                .find(|r| r.rrn == rrn && r.stan == stan && r.terminal_id == terminal_id)
                .cloned())
        })
    }

    fn find_by_masked_pan_and_date_range<'a>(
        &'a self,
        masked_pan: &'a str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> BoxFuture<'a, Result<Vec<TransactionRecord>, RepoError>> {
        Box::pin(async move {
            Ok(self
                .records
                .lock()
                .values()
                .filter(|r| r.masked_pan == masked_pan && r.transaction_date >= from && r.transaction_date <= to)
                .cloned()
                .collect())
        })
    }

    fn find_by_terminal_id_and_date_range<'a>(
        &'a self,
        terminal_id: &'a str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> BoxFuture<'a, Result<Vec<TransactionRecord>, RepoError>> {
        Box::pin(async move {
            Ok(self
                .records
                .lock()
                .values()
                .filter(|r| r.terminal_id == terminal_id && r.transaction_date >= from && r.transaction_date <= to)
                .cloned()
                .collect())
        })
    }

    fn find_by_status<'a>(&'a self, status: Status) -> BoxFuture<'a, Result<Vec<TransactionRecord>, RepoError>> {
        Box::pin(async move { Ok(self.records.lock().values().filter(|r| r.status == status).cloned().collect()) })
    }

    fn update_status<'a>(&'a self, transaction_id: &'a str, status: Status, now: DateTime<Utc>) -> BoxFuture<'a, Result<(), RepoError>> {
        Box::pin(async move {
            let mut records = self.records.lock();
            let record = records
                .get_mut(transaction_id)
                .ok_or_else(|| RepoError::NotFound(transaction_id.to_string()))?;
            record.transition_status(status, now)?;
            Ok(())
        })
    }

    fn update_response<'a>(
        &'a self,
        transaction_id: &'a str,
        response_code: Option<String>,
        authorization_code: Option<String>,
        now: DateTime<Utc>,
    ) -> BoxFuture<'a, Result<(), RepoError>> {
        Box::pin(async move {
            let mut records = self.records.lock();
            let record = records
                .get_mut(transaction_id)
                .ok_or_else(|| RepoError::NotFound(transaction_id.to_string()))?;
            record.response_code = response_code;
            record.authorization_code = authorization_code;
            record.response_timestamp = Some(now);
            record.updated_at = now;
            Ok(())
        })
    }

    fn exists_by_transaction_id<'a>(&'a self, transaction_id: &'a str) -> BoxFuture<'a, Result<bool, RepoError>> {
        Box::pin(async move { Ok(self.records.lock().contains_key(transaction_id)) })
    }

    fn is_duplicate<'a>(
        &'a self,
        rrn: &'a str,
        stan: &'a str,
        terminal_id: &'a str,
        window_minutes: i64,
    ) -> BoxFuture<'a, Result<bool, RepoError>> {
        Box::pin(async move {
            let cutoff = Utc::now() - Duration::minutes(window_minutes);
            Ok(self.records.lock().values().any(|r| {
                r.rrn == rrn && r.stan == stan && r.terminal_id == terminal_id && r.request_timestamp >= cutoff
            }))
        })
    }

    fn count_by_status_and_date<'a>(&'a self, status: Status, date: NaiveDate) -> BoxFuture<'a, Result<u64, RepoError>> {
        Box::pin(async move {
            Ok(self
                .records
                .lock()
                .values()
                .filter(|r| r.status == status && r.transaction_date == date)
                .count() as u64)
        })
    }

    fn find_original_for_reversal<'a>(&'a self, transaction_id: &'a str) -> BoxFuture<'a, Result<Option<TransactionRecord>, RepoError>> {
        Box::pin(async move { Ok(self.records.lock().get(transaction_id).filter(|r| r.is_reversible()).cloned()) })
    }

    fn mark_as_reversed<'a>(&'a self, transaction_id: &'a str, now: DateTime<Utc>) -> BoxFuture<'a, Result<(), RepoError>> {
        Box::pin(async move {
            let mut records = self.records.lock();
            let record = records
                .get_mut(transaction_id)
                .ok_or_else(|| RepoError::NotFound(transaction_id.to_string()))?;
            record.transition_status(Status::ReversalPending, now)?;
            record.transition_status(Status::Reversed, now)?;
            Ok(())
        })
    }
}
