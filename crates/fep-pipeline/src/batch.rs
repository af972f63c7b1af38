//! Bounded-concurrency batch driver (SPEC_FULL §4.5 "Batch driver"): pumps a
//! batch of inbound messages through the pipeline, capping how many run at
//! once. No ordering guarantee across messages; within one message the
//! pipeline's own stage order still applies.

use std::sync::Arc;

use fep_core::Message;
use tokio::sync::Semaphore;

use crate::error::PipelineError;
use crate::pipeline::{Pipeline, PipelineOutcome};

/// One message handed to [`BatchDriver::run`], paired with the channel it
/// arrived on (the pipeline needs this for audit/routing context).
pub struct BatchItem {
    pub channel_id: String,
    pub message: Message,
}

/// Drives a batch of messages through a [`Pipeline`] with at most
/// `max_concurrency` in flight at once.
pub struct BatchDriver {
    pipeline: Arc<Pipeline>,
    max_concurrency: usize,
}

impl BatchDriver {
    pub fn new(pipeline: Arc<Pipeline>, max_concurrency: usize) -> Self {
        BatchDriver {
            pipeline,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Runs every item concurrently (bounded by `max_concurrency`) and
    /// returns outcomes in the same order as `items`, regardless of which
    /// completed first.
    pub async fn run(&self, items: Vec<BatchItem>) -> Vec<Result<PipelineOutcome, PipelineError>> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = Vec::with_capacity(items.len());

        for item in items {
            let pipeline = self.pipeline.clone();
            let semaphore = semaphore.clone();
            tasks.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("semaphore is never closed");
                pipeline.run(&item.channel_id, item.message).await
            }));
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        for task in tasks {
            match task.await {
                Ok(result) => outcomes.push(result),
                Err(join_err) => {
                    tracing::error!(error = %join_err, "batch task panicked");
                    outcomes.push(Err(PipelineError::Repository(fep_repo::RepoError::Backend(
                        join_err.to_string(),
                    ))));
                }
            }
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::TracingAuditLogger;
    use crate::processors::default_processors;
    use crate::route::Router;
    use fep_core::pan::PanCipher;
    use fep_core::{Mti, MessageBuilder};
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

    fn withdrawal(stan: &str) -> Message {
        MessageBuilder::new()
            .mti(Mti::parse("0200").unwrap())
            .field(2u32, b"4111111111111111".to_vec())
            .field(3u32, b"010000".to_vec())
            .field(4u32, b"000000010000".to_vec())
            .field(11u32, stan.as_bytes().to_vec())
            .field(37u32, format!("00000000{stan}").into_bytes())
            .field(41u32, b"ATM00001".to_vec())
            .build()
            .unwrap()
    }

    fn build_pipeline() -> (Arc<Pipeline>, Arc<InMemoryRepository>) {
        let repo = Arc::new(InMemoryRepository::new());
        let pipeline = Arc::new(Pipeline::new(
            repo.clone(),
            Arc::new(ValidationEngine::default()),
            Arc::new(Router::new(default_processors())),
            Arc::new(TracingAuditLogger),
            Arc::new(NullCipher),
            5,
        ));
        (pipeline, repo)
    }

    #[tokio::test]
    async fn processes_every_item_and_preserves_order() {
        let (pipeline, repo) = build_pipeline();
        let driver = BatchDriver::new(pipeline, 2);

        let items = (0..10)
            .map(|i| BatchItem {
                channel_id: "FISC-1".to_string(),
                message: withdrawal(&format!("{i:06}")),
            })
            .collect();

        let outcomes = driver.run(items).await;
        assert_eq!(outcomes.len(), 10);
        for (i, outcome) in outcomes.iter().enumerate() {
            let outcome = outcome.as_ref().unwrap();
            assert_eq!(outcome.record.stan, format!("{i:06}"));
        }
        assert_eq!(repo.len(), 10);
    }

    #[tokio::test]
    async fn concurrency_is_capped() {
        let (pipeline, _repo) = build_pipeline();
        let driver = BatchDriver::new(pipeline, 1);

        let items = (0..5)
            .map(|i| BatchItem {
                channel_id: "FISC-1".to_string(),
                message: withdrawal(&format!("{i:06}")),
            })
            .collect();

        let outcomes = driver.run(items).await;
        assert!(outcomes.iter().all(Result::is_ok));
    }
}
