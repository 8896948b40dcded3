//! Short code generation.
//!
//! Generators are pure: they never look at storage. Uniqueness is checked
//! one layer up by the resolver, which retries a bounded number of times.

pub mod error;
pub mod random;

pub use error::RandomSourceError;
pub use random::RandomCodeGenerator;

use linkhop_core::ShortCode;

/// Trait for generating candidate short codes.
pub trait CodeGenerator: Send + Sync + 'static {
    /// Generates a candidate code of exactly `length` characters.
    fn generate(&self, length: usize) -> Result<ShortCode, RandomSourceError>;
}
