//! API surface services: fan-out driving, feature merging, and the
//! baseline differ.

pub mod diff;
pub mod fanout;

pub use diff::{compare_api, feature_without_context, file_features};
pub use fanout::{run_api, ApiOutput, ApiRequest, CursorHit};
