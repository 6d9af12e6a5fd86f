//! Resolver error taxonomy.
//!
//! Errors bubble only to component boundaries; callers record
//! `"unknown-type"` or drop the result and keep going. Partial analysis
//! beats no analysis.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("unresolved identifier: {0:?}")]
    UnresolvedIdent(String),

    #[error("unknown selector {base}.{sel}")]
    UnknownSelector { base: String, sel: String },

    #[error("unknown function {0}")]
    UnknownCall(String),

    #[error("unknown constant reference to {0}")]
    UnknownConst(String),

    #[error("type mismatch: left={left:?}, right={right:?}")]
    TypeMismatch { left: String, right: String },

    #[error("unknown index target {0:?}")]
    UnknownIndex(String),

    #[error("cannot infer type of {0}")]
    Unsupported(String),

    /// The one fatal condition: the feature scope stack was popped out
    /// of order, which means the walker itself is broken.
    #[error("scope imbalance: expected {expected:?}, found {found:?}")]
    ScopeImbalance { expected: String, found: String },
}

/// The placeholder recorded when inference fails (spec taxonomy:
/// UnresolvedIdentifier / UnknownType are never fatal).
pub const UNKNOWN_TYPE: &str = "unknown-type";
