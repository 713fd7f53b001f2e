//! CLI command implementations

pub mod get;
pub mod put;

pub use get::execute as get;
pub use put::execute as put;
