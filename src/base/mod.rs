pub mod position;

pub use position::{FileId, FileSet, LineIndex, Pos, Span};
