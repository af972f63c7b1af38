//! Storage-agnostic transaction repository contract (§6 "Repository
//! contract"). Implementations may back onto RAM, an RDBMS, or a cluster
//! store; the pipeline and reversal service only ever see this trait.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, NaiveDate, Utc};
use fep_core::{Status, TransactionRecord};

use crate::error::RepoError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait Repository: Send + Sync {
    fn save<'a>(&'a self, record: TransactionRecord) -> BoxFuture<'a, Result<(), RepoError>>;

    fn find_by_transaction_id<'a>(&'a self, transaction_id: &'a str) -> BoxFuture<'a, Result<Option<TransactionRecord>, RepoError>>;

    fn find_by_rrn_and_stan<'a>(&'a self, rrn: &'a str, stan: &'a str) -> BoxFuture<'a, Result<Vec<TransactionRecord>, RepoError>>;

    fn find_by_rrn_stan_terminal<'a>(
        &'a self,
        rrn: &'a str,
        stan: &'a str,
        terminal_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<TransactionRecord>, RepoError>>;

    fn find_by_masked_pan_and_date_range<'a>(
        &'a self,
        masked_pan: &'a str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> BoxFuture<'a, Result<Vec<TransactionRecord>, RepoError>>;

    fn find_by_terminal_id_and_date_range<'a>(
        &'a self,
        terminal_id: &'a str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> BoxFuture<'a, Result<Vec<TransactionRecord>, RepoError>>;

    fn find_by_status<'a>(&'a self, status: Status) -> BoxFuture<'a, Result<Vec<TransactionRecord>, RepoError>>;

    fn update_status<'a>(&'a self, transaction_id: &'a str, status: Status, now: DateTime<Utc>) -> BoxFuture<'a, Result<(), RepoError>>;

    fn update_response<'a>(
        &'a self,
        transaction_id: &'a str,
        response_code: Option<String>,
        authorization_code: Option<String>,
        now: DateTime<Utc>,
    ) -> BoxFuture<'a, Result<(), RepoError>>;

    fn exists_by_transaction_id<'a>(&'a self, transaction_id: &'a str) -> BoxFuture<'a, Result<bool, RepoError>>;

    /// §4.5 stage 1: true if a prior, non-reversal record exists for the
    /// same RRN/STAN/terminal within `window_minutes` of now.
    fn is_duplicate<'a>(
        &'a self,
        rrn: &'a str,
        stan: &'a str,
        terminal_id: &'a str,
        window_minutes: i64,
    ) -> BoxFuture<'a, Result<bool, RepoError>>;

    fn count_by_status_and_date<'a>(&'a self, status: Status, date: NaiveDate) -> BoxFuture<'a, Result<u64, RepoError>>;

    /// §4.5.2: returns the original only if its status is reversible
    /// (APPROVED/COMPLETED/PENDING).
    fn find_original_for_reversal<'a>(&'a self, transaction_id: &'a str) -> BoxFuture<'a, Result<Option<TransactionRecord>, RepoError>>;

    /// Atomically transitions the original to REVERSED (§4.5.2).
    fn mark_as_reversed<'a>(&'a self, transaction_id: &'a str, now: DateTime<Utc>) -> BoxFuture<'a, Result<(), RepoError>>;
}
