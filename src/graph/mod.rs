//! Route graph: named locations joined by directed, weighted edges
//!
//! In-memory petgraph graph with write-through persistence to a
//! [`KvBackend`](crate::backend::KvBackend).

pub mod paths;
pub mod store;
pub mod store_models;

pub use store::GraphStore;
pub use store_models::{Route, RouteMap, LOCATIONS_KEY};

use crate::backend::PersistenceError;
use thiserror::Error;

/// Errors returned by graph store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("{0} does not exist")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("persistence failure: {0}")]
    Persistence(#[from] PersistenceError),
}

pub type StoreResult<T> = Result<T, StoreError>;
