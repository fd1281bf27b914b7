//! Resolver-level error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("circular placeholder reference: {0}")]
    PlaceholderCycle(String),

    #[error("unresolved placeholder '{0}'")]
    Unresolved(String),

    #[error("mismatched block tag in '{0}'")]
    MismatchedBlock(String),
}
