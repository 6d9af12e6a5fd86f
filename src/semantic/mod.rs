//! The semantic engine: package loading, declaration indexes, and the
//! best-effort type resolver.

pub mod decls;
pub mod error;
pub mod package;
pub mod resolver;
pub mod types;
pub mod walker;

pub use error::{ResolveError, UNKNOWN_TYPE};
pub use package::Package;
pub use walker::{CursorRequest, Walker, WalkerOptions};
