//! Shared helpers: build a throwaway source tree and a walker rooted
//! at it.
#![allow(dead_code)]

use std::path::Path;

use goscope::project::context::BuildContext;
use goscope::semantic::walker::{Walker, WalkerOptions};

/// Write a package's files under `<root>/src/<pkg>/`.
pub fn write_pkg(root: &Path, pkg: &str, files: &[(&str, &str)]) {
    let dir = root.join("src").join(pkg);
    std::fs::create_dir_all(&dir).expect("create package dir");
    for (name, src) in files {
        std::fs::write(dir.join(name), src).expect("write source file");
    }
}

pub fn linux_context(root: &Path) -> BuildContext {
    let mut ctx = BuildContext::new("linux", "amd64", false);
    ctx.goroot = root.to_path_buf();
    ctx
}

/// A walker in default-context mode over a test tree.
pub fn walker(root: &Path) -> Walker {
    Walker::new(linux_context(root), WalkerOptions::default())
}

/// 1-based byte offset of `needle`'s occurrence in `src`, advanced by
/// `delta` bytes into the match.
pub fn offset_of(src: &str, needle: &str, delta: usize) -> u32 {
    let at = src.find(needle).expect("needle not found") + delta;
    at as u32 + 1
}
