//! Put and get orchestration
//!
//! Each run is a linear sequence of awaited steps; the first error
//! ends the run. Workspaces are destroyed whether or not the run
//! succeeded, and a failed put never registers a key.

pub mod get;
pub mod put;

pub use get::{GetOutcome, GetPipeline, GetRequest};
pub use put::{PutOutcome, PutPipeline, PutRequest};
