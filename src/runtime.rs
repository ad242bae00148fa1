//! The execution boundary.
//!
//! The core never performs I/O; executing a rendered pipeline is the job of
//! an external client implementing [`ExecutionClient`]. No implementation is
//! shipped here.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RelqResult;
use crate::schema::Column;

/// Tabular results returned by an execution client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabularResult {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
}

/// The contract an execution backend must satisfy: take the model grammar,
/// the rendered lambda grammar, and a JSON execution payload, and return
/// typed tabular rows. Transport errors are the client's own taxonomy.
pub trait ExecutionClient {
    fn execute(&self, model: &str, lambda: &str, payload: Value) -> RelqResult<TabularResult>;
}
