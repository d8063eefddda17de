// Public modules
pub mod error;
pub mod normalize;
pub mod output;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
