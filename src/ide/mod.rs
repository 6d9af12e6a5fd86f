//! Editor-facing services: cursor resolution and its result types.

pub mod cursor;
pub mod type_info;

pub use type_info::{Kind, TypeInfo};
