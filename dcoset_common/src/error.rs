//! Error types for the search core.
//!
//! The engine has exactly one fatal condition: a failed allocation while
//! growing a workspace or extending a stabilizer chain's base. Everything
//! else is a normal answer.

use thiserror::Error;

/// Errors surfaced by the double-coset engine and its data structures.
#[derive(Debug, Error)]
pub enum CosetError {
    /// An allocation failed while building a stabilizer chain's Schreier
    /// trees, including during base-point insertion mid-search.
    #[error("allocation failed while building {0}")]
    Allocation(String),

    /// A generator's degree did not match the point set of the chain it
    /// was offered to.
    #[error("degree mismatch: expected {expected}, got {actual}")]
    DegreeMismatch {
        /// Degree the receiving structure was built for.
        expected: usize,
        /// Degree of the offending permutation.
        actual: usize,
    },
}

impl CosetError {
    /// Create an allocation error.
    pub fn allocation(what: impl Into<String>) -> Self {
        Self::Allocation(what.into())
    }
}
