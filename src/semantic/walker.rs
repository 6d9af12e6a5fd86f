//! The walker: per-request owner of all analysis state.
//!
//! One walker drives package loading for one request, across however
//! many build contexts the request fans out over. Loaded packages are
//! cached under a computed key: context-independent sources share one
//! instance, OS/arch-suffixed sources share per-os-arch, cgo sources are
//! keyed per full context.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::base::{FileId, FileSet, Span};
use crate::ide::{Kind, TypeInfo};
use crate::project::context::BuildContext;
use crate::project::locate::{self, ScannedPackage};
use crate::semantic::package::{Package, ParsedFile};
use crate::syntax::ast::{DeclKind, InterfaceType};

/// Knobs shared by the CLI and the broker.
#[derive(Debug, Clone)]
pub struct WalkerOptions {
    /// Include unexported declarations.
    pub all_decls: bool,
    /// Include methods contributed via embedding.
    pub all_methods: bool,
    /// Append source positions to feature lines.
    pub show_pos: bool,
    /// Transitively load imports.
    pub dep_parser: bool,
    /// Feature component separator.
    pub sep: String,
}

impl Default for WalkerOptions {
    fn default() -> Self {
        Self {
            all_decls: false,
            all_methods: true,
            show_pos: false,
            dep_parser: true,
            sep: ", ".to_string(),
        }
    }
}

/// A cursor query: a file in a package, a 1-based byte offset, and
/// optionally the editor's unsaved content for that file.
#[derive(Debug, Clone)]
pub struct CursorRequest {
    pub pkg: String,
    pub file: String,
    pub offset: u32,
    pub overlay: Option<String>,
}

pub(crate) struct CursorState {
    pub pkg: String,
    pub file: String,
    pub offset: u32,
    pub overlay: Option<String>,
    pub info: Option<TypeInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadState {
    Loading,
    Loaded,
}

/// A local binding recorded while traversing toward the cursor.
#[derive(Debug, Clone)]
pub(crate) struct LocalVar {
    pub typ: String,
    pub file: FileId,
    pub span: Span,
}

pub struct Walker {
    pub fset: FileSet,
    pub(crate) context: BuildContext,
    /// `"linux-amd64-cgo:"` in fan-out mode, empty for the default
    /// context.
    pub(crate) ctx_prefix: String,
    pub(crate) opts: WalkerOptions,
    pub(crate) scope: Vec<String>,
    pub(crate) packages: Vec<Package>,
    pub(crate) package_map: HashMap<String, usize>,
    package_state: HashMap<String, LoadState>,
    /// Cross-package interface bodies, for embedding expansion.
    pub(crate) interfaces: HashMap<(String, String), (FileId, InterfaceType)>,
    /// Short name → full import path, updated as files declare imports.
    pub(crate) selector_full_pkg: HashMap<String, String>,
    pub(crate) wanted: HashSet<String>,
    pub(crate) cur_package: usize,
    /// Storage key of the package currently being walked.
    pub(crate) cur_package_name: String,
    pub(crate) last_const_type: Option<String>,
    /// Constants whose type depends on a not-yet-resolved constant.
    pub(crate) const_dep: HashMap<String, (String, FileId, Span)>,
    pub(crate) local_vars: HashMap<String, LocalVar>,
    pub(crate) cursor: Option<CursorState>,
}

impl Walker {
    pub fn new(context: BuildContext, opts: WalkerOptions) -> Self {
        Self {
            fset: FileSet::new(),
            context,
            ctx_prefix: String::new(),
            opts,
            scope: Vec::new(),
            packages: Vec::new(),
            package_map: HashMap::new(),
            package_state: HashMap::new(),
            interfaces: HashMap::new(),
            selector_full_pkg: HashMap::new(),
            wanted: HashSet::new(),
            cur_package: 0,
            cur_package_name: String::new(),
            last_const_type: None,
            const_dep: HashMap::new(),
            local_vars: HashMap::new(),
            cursor: None,
        }
    }

    pub fn add_wanted(&mut self, pkg: &str) {
        self.wanted.insert(pkg.to_string());
    }

    pub fn set_cursor(&mut self, req: CursorRequest) {
        self.cursor = Some(CursorState {
            pkg: req.pkg,
            file: req.file,
            offset: req.offset,
            overlay: req.overlay,
            info: None,
        });
    }

    pub fn cursor_result(&self) -> Option<&TypeInfo> {
        self.cursor.as_ref().and_then(|c| c.info.as_ref())
    }

    /// Select the context for the next walk. `labeled` turns on
    /// per-context package keys (fan-out mode).
    pub fn set_context(&mut self, context: BuildContext, labeled: bool) {
        self.ctx_prefix = if labeled {
            format!("{}:", context.label())
        } else {
            String::new()
        };
        self.context = context;
    }

    pub(crate) fn cur(&self) -> &Package {
        &self.packages[self.cur_package]
    }

    pub(crate) fn cur_mut(&mut self) -> &mut Package {
        &mut self.packages[self.cur_package]
    }

    /// Resolve a package by short name: the current context's instance
    /// first, then the context-independent one.
    pub(crate) fn find_package(&self, short: &str) -> Option<&Package> {
        let full = self.selector_full_pkg.get(short)?;
        if !self.ctx_prefix.is_empty() {
            if let Some(&idx) = self.package_map.get(&format!("{}{}", self.ctx_prefix, full)) {
                return Some(&self.packages[idx]);
            }
        }
        self.package_map.get(full).map(|&idx| &self.packages[idx])
    }

    // ------------------------------------------------------------------
    // Feature scope stack
    // ------------------------------------------------------------------

    pub(crate) fn push_scope(&mut self, name: String) {
        self.scope.push(name);
    }

    /// Leave a scope, verifying the stack is balanced. An imbalance is
    /// the walker's one fatal condition.
    pub(crate) fn pop_scope(&mut self, name: &str) {
        match self.scope.pop() {
            Some(top) if top == name => {}
            top => {
                debug_assert!(false, "scope imbalance: expected {name:?}, found {top:?}");
                panic!("scope imbalance leaving {name:?}");
            }
        }
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Load a package and its transitive dependencies under the current
    /// context. `pkg` is an import path, a relative directory, or an
    /// absolute directory.
    pub fn walk_package(&mut self, pkg: &str) {
        if pkg == "." || pkg == ".." || pkg.starts_with("./") || pkg.starts_with("../") {
            let Ok(wd) = std::env::current_dir() else {
                return;
            };
            let dir = wd.join(pkg);
            self.walk_local_dir(pkg, &dir);
        } else if Path::new(pkg).is_absolute() {
            let dir = PathBuf::from(pkg);
            self.walk_local_dir(pkg, &dir);
        } else {
            match locate::find_package_dir(&self.context, pkg) {
                Ok(dir) => self.walk_package_dir(pkg, &dir, None),
                Err(err) => debug!(%err, "cannot locate package"),
            }
        }
    }

    /// Local and absolute directories are re-keyed to the declared
    /// package name before loading.
    fn walk_local_dir(&mut self, requested: &str, dir: &Path) {
        let overlay = self.overlay_for(requested);
        let scanned = match locate::scan_dir(
            &self.context,
            dir,
            overlay.as_ref().map(|(f, s)| (f.as_str(), s.as_str())),
        ) {
            Ok(s) => s,
            Err(err) => {
                debug!(%err, dir = %dir.display(), "cannot scan directory");
                return;
            }
        };
        if scanned.name.is_empty() {
            return;
        }
        let name = scanned.name.clone();
        if self.wanted.remove(requested) {
            self.wanted.insert(name.clone());
        }
        if let Some(c) = &mut self.cursor {
            if c.pkg == requested {
                c.pkg = name.clone();
            }
        }
        self.walk_package_dir(&name, dir, Some(scanned));
    }

    fn overlay_for(&self, pkg: &str) -> Option<(String, String)> {
        let c = self.cursor.as_ref()?;
        if c.pkg != pkg {
            return None;
        }
        let overlay = c.overlay.as_ref()?;
        Some((c.file.clone(), overlay.clone()))
    }

    fn walk_package_dir(&mut self, name: &str, dir: &Path, prescanned: Option<ScannedPackage>) {
        let ctx_key = format!("{}{}", self.ctx_prefix, name);
        if self.package_state.contains_key(&ctx_key) {
            // Loaded already, or a load in progress (import cycle):
            // either way this branch is done.
            return;
        }
        self.package_state.insert(ctx_key.clone(), LoadState::Loading);
        self.selector_full_pkg
            .insert(name.to_string(), name.to_string());

        let cur_key = self.load_package(name, dir, prescanned, &ctx_key);

        if let Some(cur_key) = cur_key {
            self.package_state.insert(cur_key, LoadState::Loaded);
        }
        self.package_state.insert(ctx_key, LoadState::Loaded);
    }

    fn load_package(
        &mut self,
        name: &str,
        dir: &Path,
        prescanned: Option<ScannedPackage>,
        ctx_key: &str,
    ) -> Option<String> {
        let sname = name.rsplit('/').next().unwrap_or(name).to_string();

        let mut scanned = match prescanned {
            Some(s) => s,
            None => {
                let overlay = self.overlay_for(name);
                match locate::scan_dir(
                    &self.context,
                    dir,
                    overlay.as_ref().map(|(f, s)| (f.as_str(), s.as_str())),
                ) {
                    Ok(s) => s,
                    Err(err) => {
                        debug!(%err, dir = %dir.display(), "cannot scan package");
                        return None;
                    }
                }
            }
        };

        // Step 4 of the load contract: compute the storage key. A cgo
        // package under an enabled-cgo context is per-context; an
        // OS/arch-suffixed package is per-os-arch; anything else is
        // shared across contexts.
        let mut cur_key = name.to_string();
        if !self.ctx_prefix.is_empty() {
            if scanned.uses_cgo && self.context.cgo_enabled {
                cur_key = ctx_key.to_string();
            } else {
                if scanned.has_os_arch_file {
                    cur_key = format!("{}:{}", self.context.os_arch(), name);
                }
                if let Some(&idx) = self.package_map.get(&cur_key) {
                    // Cache hit: link it under this context and re-drive
                    // the dependency closure, which must exist here too.
                    if self.opts.dep_parser {
                        let deps = self.packages[idx].deps.clone();
                        for dep in deps {
                            self.walk_package(&dep);
                        }
                    }
                    self.package_map.insert(ctx_key.to_string(), idx);
                    return None;
                }
            }
        }

        // Cursor requests pull in test files; a cursor in an external
        // test file re-drives the load as the synthetic `<pkg>_test`
        // package.
        let cursor_here = self.cursor.as_ref().is_some_and(|c| c.pkg == name);
        let mut files = std::mem::take(&mut scanned.files);
        if cursor_here {
            let cursor_file = self
                .cursor
                .as_ref()
                .map(|c| c.file.clone())
                .unwrap_or_default();
            if scanned
                .xtest_files
                .iter()
                .any(|f| f.file_name == cursor_file)
            {
                let xname = format!("{sname}_test");
                if let Some(c) = &mut self.cursor {
                    c.pkg = xname.clone();
                }
                let xtest = ScannedPackage {
                    dir: dir.to_path_buf(),
                    name: xname.clone(),
                    files: std::mem::take(&mut scanned.xtest_files),
                    test_files: Vec::new(),
                    xtest_files: Vec::new(),
                    has_os_arch_file: false,
                    uses_cgo: false,
                };
                self.walk_package_dir(&xname, dir, Some(xtest));
            } else {
                files.extend(std::mem::take(&mut scanned.test_files));
            }
        }

        files.retain(|f| f.ast.package.name == sname);
        if files.is_empty() {
            debug!(dir = %dir.display(), "no source files for package {name}");
            return None;
        }

        let mut deps: Vec<String> = Vec::new();
        for f in &files {
            for dep in f.ast.deps() {
                if !deps.contains(&dep) {
                    deps.push(dep);
                }
            }
        }
        if self.opts.dep_parser {
            for dep in deps.clone() {
                self.walk_package(&dep);
            }
        }

        if cur_key != ctx_key {
            self.package_state
                .insert(cur_key.clone(), LoadState::Loading);
        }
        debug!("package {ctx_key} => {cur_key}");

        let mut parsed: Vec<Arc<ParsedFile>> = Vec::new();
        for f in files {
            let id = self.fset.add(f.path, &f.src);
            parsed.push(Arc::new(ParsedFile {
                id,
                file_name: f.file_name,
                ast: f.ast,
            }));
        }

        self.push_scope(format!("pkg {name}"));
        self.cur_package_name = cur_key.clone();
        self.last_const_type = None;
        self.const_dep.clear();

        let mut package = Package::new(name, dir.to_path_buf(), &self.opts.sep);
        package.deps = deps;
        package.files = parsed.clone();
        let idx = self.packages.len();
        self.packages.push(package);
        self.package_map.insert(cur_key.clone(), idx);
        self.package_map.insert(ctx_key.to_string(), idx);
        self.cur_package = idx;

        for f in &parsed {
            self.record_types(f);
        }
        // Pre-register every signature so bodies can call functions
        // declared later or in sibling files.
        for f in &parsed {
            for decl in &f.ast.decls {
                if let DeclKind::Func(fd) = &decl.kind {
                    self.peek_func_decl(f.id, fd);
                }
            }
        }
        for f in &parsed {
            self.walk_file(f);
        }
        self.resolve_constant_deps();

        if cursor_here && self.cursor.as_ref().is_some_and(|c| c.pkg == name) {
            self.run_cursor_lookup(&parsed);
            self.pop_scope(&format!("pkg {name}"));
            return Some(cur_key);
        }

        if self.wanted.contains(name) {
            for f in &parsed {
                for decl in &f.ast.decls {
                    if let DeclKind::Func(fd) = &decl.kind {
                        self.walk_func_decl(f.id, fd);
                    }
                }
            }
            if self.opts.all_methods {
                self.emit_promoted_methods();
            }
        }
        self.pop_scope(&format!("pkg {name}"));
        Some(cur_key)
    }

    fn run_cursor_lookup(&mut self, parsed: &[Arc<ParsedFile>]) {
        let (cursor_file, offset) = match &self.cursor {
            Some(c) => (c.file.clone(), c.offset),
            None => return,
        };
        let Some(file) = parsed.iter().find(|f| f.file_name == cursor_file).cloned() else {
            return;
        };
        // The request offset is 1-based.
        let byte_offset = offset.saturating_sub(1);
        self.local_vars.clear();
        match self.lookup_file(&file.ast, file.id, byte_offset) {
            Ok(Some(mut info)) => {
                if info.kind == Kind::Import {
                    // Point the definition at the import path literal.
                    for is in file.ast.imports() {
                        if is.local_name() == info.name {
                            info.target = Some((file.id, is.path_span));
                        }
                    }
                }
                if let Some(c) = &mut self.cursor {
                    c.info = Some(info);
                }
            }
            Ok(None) => {}
            Err(err) => debug!(%err, "cursor lookup failed"),
        }
        self.local_vars.clear();
    }

    // ------------------------------------------------------------------
    // Feature collection
    // ------------------------------------------------------------------

    /// Sorted features of all wanted packages, default-context mode.
    pub fn features(&self) -> Vec<String> {
        let mut seen: HashSet<usize> = HashSet::new();
        let mut out: Vec<String> = Vec::new();
        for &idx in self.package_map.values() {
            if !seen.insert(idx) {
                continue;
            }
            let p = &self.packages[idx];
            if self.wanted.contains(&p.name) {
                out.extend(p.feature_list(self.opts.show_pos));
            }
        }
        out.sort();
        out
    }

    /// Features of all wanted packages as loaded under one context
    /// label (fan-out mode).
    pub fn features_in_context(&self, label: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for name in &self.wanted {
            if let Some(&idx) = self.package_map.get(&format!("{label}:{name}")) {
                out.extend(self.packages[idx].feature_list(self.opts.show_pos));
            }
        }
        out.sort();
        out
    }

    pub fn wanted_packages(&self) -> impl Iterator<Item = &str> {
        self.wanted.iter().map(|s| s.as_str())
    }
}
