//! Storage-agnostic transaction repository contract (§6), plus an
//! in-memory reference implementation for tests and single-node
//! deployments.

mod error;
mod memory;
mod repository;

pub use error::RepoError;
pub use memory::InMemoryRepository;
pub use repository::{BoxFuture, Repository};
