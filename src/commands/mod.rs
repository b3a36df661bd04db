//! Command implementations for svnorm.

pub mod normalize;

pub use normalize::{NormalizeCommand, NormalizeStats};
