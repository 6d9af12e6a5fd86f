//! Package location and per-context file selection.
//!
//! `find_package_dir` is the find-only step: import path to directory,
//! no parsing. `scan_dir` reads and parses the files that belong to a
//! package under one build context; a file that fails to parse is
//! skipped and logged, never fatal.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::project::context::BuildContext;
use crate::syntax::{self, ast};

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("package {0:?} not found in any source root")]
    NotFound(String),
    #[error("no source files in {0}")]
    NoSources(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One successfully parsed source file of a package.
pub struct SourceFile {
    pub file_name: String,
    pub path: PathBuf,
    pub src: String,
    pub ast: ast::File,
    /// Imports the cgo pseudo-package.
    pub uses_cgo: bool,
}

/// The files of a directory that belong to the package under one
/// context, split the way the loader consumes them.
pub struct ScannedPackage {
    pub dir: PathBuf,
    /// Declared package name of the non-test files.
    pub name: String,
    pub files: Vec<SourceFile>,
    /// In-package test files (`package p` in `*_test.go`).
    pub test_files: Vec<SourceFile>,
    /// External test package files (`package p_test`).
    pub xtest_files: Vec<SourceFile>,
    /// Any selected file carries an OS/arch name suffix.
    pub has_os_arch_file: bool,
    /// Any non-test file imports the cgo pseudo-package.
    pub uses_cgo: bool,
}

/// Map an import path to a directory: `<goroot>/src/<path>` first, then
/// each `<gopath>/src/<path>`. Find-only, nothing is read.
pub fn find_package_dir(ctx: &BuildContext, import_path: &str) -> Result<PathBuf, LocateError> {
    if !ctx.goroot.as_os_str().is_empty() {
        let dir = ctx.goroot.join("src").join(import_path);
        if dir.is_dir() {
            return Ok(dir);
        }
    }
    for root in &ctx.gopath {
        let dir = root.join("src").join(import_path);
        if dir.is_dir() {
            return Ok(dir);
        }
    }
    Err(LocateError::NotFound(import_path.to_string()))
}

/// Read and parse the package files in `dir` under `ctx`. `overlay`
/// substitutes in-memory content for one file name (the editor's unsaved
/// buffer in cursor requests).
pub fn scan_dir(
    ctx: &BuildContext,
    dir: &Path,
    overlay: Option<(&str, &str)>,
) -> Result<ScannedPackage, LocateError> {
    let mut names: Vec<String> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.ends_with(".go") || name.starts_with('_') || name.starts_with('.') {
            continue;
        }
        if !ctx.includes_file(&name) {
            continue;
        }
        names.push(name);
    }
    names.sort();

    let mut scanned = ScannedPackage {
        dir: dir.to_path_buf(),
        name: String::new(),
        files: Vec::new(),
        test_files: Vec::new(),
        xtest_files: Vec::new(),
        has_os_arch_file: false,
        uses_cgo: false,
    };

    for name in names {
        let path = dir.join(&name);
        let src = match overlay {
            Some((overlay_name, content)) if overlay_name == name => content.to_string(),
            _ => std::fs::read_to_string(&path)?,
        };
        let file = match syntax::parse_file(&src) {
            Ok(file) => file,
            Err(err) => {
                debug!(file = %path.display(), %err, "skipping unparsable file");
                continue;
            }
        };
        let uses_cgo = file.imports().any(|is| is.path == "C");
        let is_test = name.ends_with("_test.go");
        let is_xtest = is_test && file.package.name.ends_with("_test");
        let source = SourceFile {
            file_name: name.clone(),
            path,
            src,
            ast: file,
            uses_cgo,
        };
        if is_xtest {
            scanned.xtest_files.push(source);
        } else if is_test {
            scanned.test_files.push(source);
        } else {
            if scanned.name.is_empty() {
                scanned.name = source.ast.package.name.clone();
            }
            scanned.has_os_arch_file |=
                crate::project::context::has_os_arch_suffix(&source.file_name);
            scanned.uses_cgo |= uses_cgo;
            scanned.files.push(source);
        }
    }

    if scanned.files.is_empty() && scanned.test_files.is_empty() && scanned.xtest_files.is_empty() {
        return Err(LocateError::NoSources(dir.to_path_buf()));
    }
    Ok(scanned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn ctx_with_root(root: &Path) -> BuildContext {
        let mut ctx = BuildContext::new("linux", "amd64", false);
        ctx.goroot = root.to_path_buf();
        ctx
    }

    #[test]
    fn test_find_package_dir_prefers_goroot() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("src/io");
        fs::create_dir_all(&dir).unwrap();
        let ctx = ctx_with_root(tmp.path());
        assert_eq!(find_package_dir(&ctx, "io").unwrap(), dir);
        assert!(find_package_dir(&ctx, "nope").is_err());
    }

    #[test]
    fn test_scan_dir_filters_by_context_and_splits_tests() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        fs::write(dir.join("a.go"), "package p\nvar A int\n").unwrap();
        fs::write(dir.join("b_windows.go"), "package p\nvar B int\n").unwrap();
        fs::write(dir.join("a_test.go"), "package p\nvar T int\n").unwrap();
        fs::write(dir.join("x_test.go"), "package p_test\nvar X int\n").unwrap();
        fs::write(dir.join("broken.go"), "package p\nfunc {\n").unwrap();

        let ctx = BuildContext::new("linux", "amd64", false);
        let scanned = scan_dir(&ctx, dir, None).unwrap();
        assert_eq!(scanned.name, "p");
        let names: Vec<&str> = scanned.files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, ["a.go"]);
        assert_eq!(scanned.test_files.len(), 1);
        assert_eq!(scanned.xtest_files.len(), 1);
        assert!(!scanned.has_os_arch_file);
    }

    #[test]
    fn test_scan_dir_overlay_replaces_content() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        fs::write(dir.join("a.go"), "package p\nvar A int\n").unwrap();

        let ctx = BuildContext::new("linux", "amd64", false);
        let scanned = scan_dir(&ctx, dir, Some(("a.go", "package p\nvar B string\n"))).unwrap();
        assert!(scanned.files[0].src.contains("B string"));
    }
}
