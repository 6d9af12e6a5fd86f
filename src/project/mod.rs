pub mod context;
pub mod locate;

pub use context::BuildContext;
pub use locate::{find_package_dir, scan_dir, LocateError, ScannedPackage, SourceFile};
