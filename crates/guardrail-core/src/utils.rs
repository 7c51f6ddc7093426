//! Utility functions for rule implementations.

pub mod paths;

#[doc(inline)]
pub use paths::{is_dotted_prefix, normalize, to_slash};
