//! File persistence: identifier lists, checkpointed results and failed ids.

pub mod checkpoint;
pub mod ids;

pub use checkpoint::{CheckpointWriter, RESULTS_HEADER};
pub use ids::{extract_identifiers, read_identifiers, write_identifiers};
