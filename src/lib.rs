pub mod api;
pub mod base;
pub mod broker;
pub mod ide;
pub mod project;
pub mod semantic;
pub mod syntax;

// Re-export the items request-level callers need.
pub use api::fanout::{run_api, ApiOutput, ApiRequest};
pub use ide::{Kind, TypeInfo};
pub use semantic::walker::{CursorRequest, Walker, WalkerOptions};
