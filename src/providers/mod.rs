//! Completion gateway implementations

pub mod gateway;

// Re-export for convenience
pub use gateway::{CompletionGateway, HttpGateway};
