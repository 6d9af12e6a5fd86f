//! Declaration recording and feature emission.
//!
//! Three passes per package: `record_types` indexes every top-level
//! type, `peek_func_decl` pre-registers signatures, `walk_file` handles
//! imports, constants and variables and emits features for exported
//! identifiers. Deferred constant types are resolved afterwards.

use tracing::debug;

use crate::base::{FileId, Span};
use crate::semantic::error::UNKNOWN_TYPE;
use crate::semantic::package::{ExprType, MethodSig, ParsedFile};
use crate::semantic::resolver::CONST_DEP_PREFIX;
use crate::semantic::walker::Walker;
use crate::syntax::ast::{self, DeclKind, Expr, ExprKind, Field, FuncDecl, FuncType, TypeSpec, ValueSpec};
use crate::syntax::printer::{expr_string, func_sig_string, nameless_type_string};

/// Longest feature line kept after newline folding; anything larger is
/// cut at the first newline. The threshold is part of the output format.
const MAX_FEATURE_LEN: usize = 1024;

/// The base type name of a receiver or embedded-field expression, and
/// whether it is package-qualified (and therefore defined elsewhere).
pub(crate) fn base_type_name(e: &Expr) -> (String, bool) {
    match &e.kind {
        ExprKind::Ident(name) => (name.clone(), false),
        ExprKind::Selector { x, sel } => {
            if x.as_ident().is_some() {
                (sel.name.clone(), true)
            } else {
                (String::new(), false)
            }
        }
        ExprKind::Star(x) => base_type_name(x),
        _ => (String::new(), false),
    }
}

impl Walker {
    pub(crate) fn is_extract(&self, name: &str) -> bool {
        self.opts.all_decls || ast::is_exported(name)
    }

    // ------------------------------------------------------------------
    // Recording passes
    // ------------------------------------------------------------------

    /// Index every top-level type declaration of a file.
    pub(crate) fn record_types(&mut self, file: &ParsedFile) {
        for decl in &file.ast.decls {
            let DeclKind::Type(specs) = &decl.kind else {
                continue;
            };
            for ts in specs {
                let name = ts.name.name.clone();
                match &ts.ty.kind {
                    ExprKind::InterfaceType(it) => {
                        if self.is_extract(&name) {
                            self.interfaces.insert(
                                (self.cur_package_name.clone(), name.clone()),
                                (file.id, it.clone()),
                            );
                        }
                        self.cur_mut()
                            .interfaces
                            .insert(name, (file.id, ts.ty.clone()));
                    }
                    ExprKind::StructType(_) => {
                        self.cur_mut()
                            .structs
                            .insert(name, (file.id, ts.ty.clone()));
                    }
                    _ => {
                        self.cur_mut().types.insert(name, (file.id, ts.ty.clone()));
                    }
                }
            }
        }
    }

    /// Register a function or method signature before bodies are
    /// resolved.
    pub(crate) fn peek_func_decl(&mut self, file: FileId, fd: &FuncDecl) {
        let mut fname = fd.name.name.clone();
        let mut recv = None;
        if let Some(r) = &fd.recv {
            let (base, imported) = base_type_name(&r.ty);
            if imported {
                return;
            }
            fname = format!("{base}.{}", fd.name.name);
            recv = Some(r.ty.clone());
        }
        let sig = MethodSig {
            name: fname.clone(),
            sig: func_sig_string(&fd.ty),
            ft: fd.ty.clone(),
            file,
            span: fd.name.span,
            recv,
        };
        self.cur_mut().functions.insert(fname, sig);
    }

    /// Imports, constants, variables, and type feature emission.
    pub(crate) fn walk_file(&mut self, file: &ParsedFile) {
        for decl in &file.ast.decls {
            match &decl.kind {
                DeclKind::Import(specs) => {
                    for is in specs {
                        self.selector_full_pkg
                            .insert(is.local_name().to_string(), is.path.clone());
                    }
                }
                DeclKind::Const(specs) => {
                    for vs in specs {
                        self.walk_const(file.id, vs);
                    }
                }
                DeclKind::Var(specs) => {
                    for vs in specs {
                        self.walk_var(file.id, vs);
                    }
                }
                DeclKind::Type(specs) => {
                    for ts in specs {
                        self.walk_type_spec(file.id, ts);
                    }
                }
                DeclKind::Func(_) => {
                    // Emitted in a later pass, after every package
                    // symbol is known.
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Constants
    // ------------------------------------------------------------------

    fn walk_const(&mut self, file: FileId, vs: &ValueSpec) {
        for ident in &vs.names {
            let lit_type = if let Some(ty) = &vs.ty {
                Some(expr_string(ty))
            } else if let Some(value) = vs.values.first() {
                match self.const_value_type(value) {
                    Ok(t) => Some(t),
                    Err(err) => {
                        debug!(name = %ident.name, %err, "unknown kind in const");
                        Some(UNKNOWN_TYPE.to_string())
                    }
                }
            } else {
                // Elided value: the type carries over from the previous
                // spec in the block.
                self.last_const_type.clone()
            };

            let Some(lit_type) = lit_type else {
                debug!(name = %ident.name, "unknown kind in const");
                continue;
            };
            if let Some(dep) = lit_type.strip_prefix(CONST_DEP_PREFIX) {
                self.const_dep
                    .insert(ident.name.clone(), (dep.to_string(), file, ident.span));
                continue;
            }
            self.last_const_type = Some(lit_type.clone());
            self.cur_mut().consts.insert(
                ident.name.clone(),
                ExprType {
                    typ: lit_type.clone(),
                    file,
                    span: ident.span,
                },
            );
            if self.is_extract(&ident.name) {
                self.emit_feature(
                    format!("const {} {}", ident.name, lit_type),
                    file,
                    ident.span.start,
                );
            }
        }
    }

    /// Chase deferred constant dependencies to a fixed point. A cycle
    /// leaves the constant unresolved rather than looping.
    pub(crate) fn resolve_constant_deps(&mut self) {
        let deps: Vec<(String, (String, FileId, Span))> = self
            .const_dep
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (ident, (_, file, span)) in deps {
            if !self.is_extract(&ident) {
                continue;
            }
            let Some(typ) = self.chase_const_dep(&ident) else {
                debug!(name = %ident, "failed to resolve constant");
                continue;
            };
            self.cur_mut().consts.insert(
                ident.clone(),
                ExprType {
                    typ: typ.clone(),
                    file,
                    span,
                },
            );
            self.emit_feature(format!("const {ident} {typ}"), file, span.start);
        }
    }

    fn chase_const_dep(&self, ident: &str) -> Option<String> {
        let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();
        let mut cur = ident.to_string();
        loop {
            if !seen.insert(cur.clone()) {
                return None;
            }
            if let Some((dep, _, _)) = self.const_dep.get(&cur) {
                cur = dep.clone();
                continue;
            }
            return self.cur().consts.get(&cur).map(|t| t.typ.clone());
        }
    }

    // ------------------------------------------------------------------
    // Variables
    // ------------------------------------------------------------------

    fn walk_var(&mut self, file: FileId, vs: &ValueSpec) {
        if let Some(ty) = &vs.ty {
            let typ = expr_string(ty);
            for ident in &vs.names {
                self.record_var(file, ident, typ.clone());
            }
        } else if vs.names.len() == vs.values.len() {
            for (ident, value) in vs.names.iter().zip(&vs.values) {
                let typ = self.var_value_or_unknown(ident, value, 0);
                self.record_var(file, ident, typ);
            }
        } else if vs.values.len() == 1 {
            // Destructuring: each name takes the n-th result.
            for (n, ident) in vs.names.iter().enumerate() {
                let typ = self.var_value_or_unknown(ident, &vs.values[0], n);
                self.record_var(file, ident, typ);
            }
        }
    }

    fn var_value_or_unknown(&self, ident: &ast::Ident, value: &Expr, index: usize) -> String {
        match self.value_type(value, index) {
            Ok(t) => t,
            Err(err) => {
                debug!(name = %ident.name, %err, "unknown type of variable");
                UNKNOWN_TYPE.to_string()
            }
        }
    }

    fn record_var(&mut self, file: FileId, ident: &ast::Ident, typ: String) {
        self.cur_mut().vars.insert(
            ident.name.clone(),
            ExprType {
                typ: typ.clone(),
                file,
                span: ident.span,
            },
        );
        if self.is_extract(&ident.name) {
            self.emit_feature(format!("var {} {}", ident.name, typ), file, ident.span.start);
        }
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    fn walk_type_spec(&mut self, file: FileId, ts: &TypeSpec) {
        if !self.is_extract(&ts.name.name) {
            return;
        }
        match &ts.ty.kind {
            ExprKind::StructType(_) => self.walk_struct_type(file, ts),
            ExprKind::InterfaceType(_) => self.walk_interface_type(file, ts),
            _ => self.emit_feature(
                format!("type {} {}", ts.name.name, expr_string(&ts.ty)),
                file,
                ts.name.span.start,
            ),
        }
    }

    fn walk_struct_type(&mut self, file: FileId, ts: &TypeSpec) {
        let ExprKind::StructType(st) = &ts.ty.kind else {
            return;
        };
        let type_struct = format!("type {} struct", ts.name.name);
        self.emit_feature(type_struct.clone(), file, ts.name.span.start);
        self.push_scope(type_struct.clone());
        for f in &st.fields {
            for name in &f.names {
                if self.is_extract(&name.name) {
                    self.emit_feature(
                        format!("{} {}", name.name, nameless_type_string(&f.ty)),
                        file,
                        name.span.start,
                    );
                }
            }
            if f.names.is_empty() {
                self.emit_embedded_field(file, &f.ty);
            }
        }
        self.pop_scope(&type_struct);
    }

    fn emit_embedded_field(&mut self, file: FileId, ty: &Expr) {
        match &ty.kind {
            ExprKind::Ident(name) => {
                if self.is_extract(name) {
                    self.emit_feature(format!("embedded {name}"), file, ty.span.start);
                }
            }
            ExprKind::Star(inner) => match &inner.kind {
                ExprKind::Ident(name) => {
                    if self.is_extract(name) {
                        self.emit_feature(format!("embedded *{name}"), file, ty.span.start);
                    }
                }
                ExprKind::Selector { .. } => {
                    self.emit_feature(format!("embedded {}", expr_string(ty)), file, ty.span.start);
                }
                _ => debug!("unable to handle embedded pointer field"),
            },
            ExprKind::Selector { .. } => {
                self.emit_feature(format!("embedded {}", expr_string(ty)), file, ty.span.start);
            }
            _ => debug!("unable to handle embedded field"),
        }
    }

    fn walk_interface_type(&mut self, file: FileId, ts: &TypeSpec) {
        let name = &ts.name.name;
        let scope_name = format!("type {name} interface");
        self.push_scope(scope_name.clone());
        let pkg = self.cur_package_name.clone();
        let (methods, complete) = self.interface_methods(&pkg, name);
        self.cur_mut()
            .interface_methods
            .insert(name.clone(), methods.clone());
        let mut meth_names: Vec<String> = Vec::new();
        for m in &methods {
            meth_names.push(m.name.clone());
            self.emit_feature(format!("{}{}", m.name, m.sig), m.file, m.span.start);
        }
        if !complete {
            // The interface can only be implemented inside its own
            // package; recording the sentinel instead of the name list
            // keeps the set extensible without breaking the baseline.
            self.emit_feature("unexported methods".to_string(), file, 0);
        }
        self.pop_scope(&scope_name);

        if !complete {
            return;
        }
        meth_names.sort();
        if meth_names.is_empty() {
            self.emit_feature(format!("type {name} interface {{}}"), file, ts.name.span.start);
        } else {
            self.emit_feature(
                format!("type {name} interface {{ {} }}", meth_names.join(", ")),
                file,
                ts.name.span.start,
            );
        }
    }

    /// The expanded exported method list of an interface, following
    /// embedded interfaces across packages. `complete` is false when any
    /// method is unexported (the visible set cannot be stated by name).
    pub(crate) fn interface_methods(&self, pkg: &str, iname: &str) -> (Vec<MethodSig>, bool) {
        let Some((file, it)) = self
            .interfaces
            .get(&(pkg.to_string(), iname.to_string()))
            .cloned()
        else {
            debug!("failed to find interface {pkg}.{iname}");
            return (Vec::new(), false);
        };

        let mut methods = Vec::new();
        let mut complete = true;
        for f in &it.methods {
            match &f.ty.kind {
                ExprKind::FuncType(ft) => {
                    for mname in &f.names {
                        if self.is_extract(&mname.name) {
                            methods.push(MethodSig {
                                name: mname.name.clone(),
                                sig: func_sig_string(ft),
                                ft: ft.clone(),
                                file,
                                span: f.span,
                                recv: None,
                            });
                        } else {
                            complete = false;
                        }
                    }
                }
                ExprKind::Ident(embedded) => {
                    if embedded == "error" {
                        methods.push(error_method(file, f.span));
                        continue;
                    }
                    let (m, c) = self.interface_methods(pkg, embedded);
                    methods.extend(m);
                    complete = complete && c;
                }
                ExprKind::Selector { x, sel } => {
                    let lhs = expr_string(x);
                    let full = self
                        .selector_full_pkg
                        .get(&lhs)
                        .cloned()
                        .unwrap_or(lhs);
                    let (m, c) = self.interface_methods(&full, &sel.name);
                    methods.extend(m);
                    complete = complete && c;
                }
                _ => {}
            }
        }
        (methods, complete)
    }

    // ------------------------------------------------------------------
    // Functions and methods
    // ------------------------------------------------------------------

    pub(crate) fn walk_func_decl(&mut self, file: FileId, fd: &FuncDecl) {
        if !self.is_extract(&fd.name.name) {
            return;
        }
        if let Some(recv) = &fd.recv {
            let recv_type = expr_string(&recv.ty);
            let base = recv_type.trim_start_matches('*');
            if !self.is_extract(base) {
                return;
            }
            self.emit_feature(
                format!(
                    "method ({recv_type}) {}{}",
                    fd.name.name,
                    func_sig_string(&fd.ty)
                ),
                file,
                fd.name.span.start,
            );
            return;
        }
        self.emit_feature(
            format!("func {}{}", fd.name.name, func_sig_string(&fd.ty)),
            file,
            fd.name.span.start,
        );
    }

    /// Emit methods promoted onto exported structs through embedding
    /// (same-package embedding chains, depth-first).
    pub(crate) fn emit_promoted_methods(&mut self) {
        let struct_names: Vec<String> = self
            .cur()
            .structs
            .keys()
            .filter(|n| self.is_extract(n))
            .cloned()
            .collect();
        for name in struct_names {
            let mut seen = std::collections::HashSet::new();
            seen.insert(name.clone());
            self.promote_embedded(&name, &name, &mut seen);
        }
    }

    fn promote_embedded(
        &mut self,
        outer: &str,
        ty: &str,
        seen: &mut std::collections::HashSet<String>,
    ) {
        let Some((_, e)) = self.cur().structs.get(ty) else {
            return;
        };
        let ExprKind::StructType(st) = &e.kind else {
            return;
        };
        let embedded: Vec<String> = st
            .fields
            .iter()
            .filter(|f| f.names.is_empty())
            .filter_map(|f| {
                let (base, imported) = base_type_name(&f.ty);
                (!imported && !base.is_empty()).then_some(base)
            })
            .collect();
        for base in embedded {
            if !seen.insert(base.clone()) {
                continue;
            }
            let prefix = format!("{base}.");
            let promoted: Vec<MethodSig> = self
                .cur()
                .functions
                .values()
                .filter(|m| m.name.starts_with(&prefix))
                .cloned()
                .collect();
            for m in promoted {
                let mname = &m.name[prefix.len()..];
                if !self.is_extract(mname) {
                    continue;
                }
                if self.cur().functions.contains_key(&format!("{outer}.{mname}")) {
                    continue;
                }
                self.emit_feature(
                    format!("method ({outer}) {mname}{}", m.sig),
                    m.file,
                    m.span.start,
                );
            }
            self.promote_embedded(outer, &base, seen);
        }
    }

    // ------------------------------------------------------------------
    // Feature emission
    // ------------------------------------------------------------------

    pub(crate) fn emit_feature(&mut self, feature: String, file: FileId, offset: u32) {
        if !self.wanted.contains(&self.cur().name) {
            return;
        }
        let mut feature = feature;
        if feature.contains('\n') {
            if feature.len() <= MAX_FEATURE_LEN {
                feature = feature.replacen('\n', " ", 1);
                feature = feature.replace('\n', ";");
                feature = feature.replace('\t', " ");
            } else {
                let cut = feature.find('\n').unwrap_or(feature.len());
                feature.truncate(cut);
                feature.push_str(" ...more");
                debug!("feature contains newlines: {feature}");
            }
        }
        let sep = self.cur().sep.clone();
        let line = if self.scope.is_empty() {
            feature
        } else {
            format!("{}{}{}", self.scope.join(&sep), sep, feature)
        };
        let cur = self.cur_mut();
        if cur.features.contains_key(&line) {
            return;
        }
        cur.features.insert(line, (file, offset));
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::base::FileId;
    use crate::project::context::BuildContext;
    use crate::semantic::package::Package;
    use crate::semantic::walker::{Walker, WalkerOptions};

    fn walker_with_package() -> Walker {
        let mut w = Walker::new(
            BuildContext::new("linux", "amd64", false),
            WalkerOptions::default(),
        );
        w.add_wanted("p");
        w.packages.push(Package::new("p", PathBuf::new(), ", "));
        w.cur_package = 0;
        w.push_scope("pkg p".to_string());
        w
    }

    fn emitted(w: &Walker) -> Vec<String> {
        w.cur().features.keys().cloned().collect()
    }

    #[test]
    fn test_emit_feature_prefixes_scope_and_dedups() {
        let mut w = walker_with_package();
        w.emit_feature("var V int".into(), FileId::new(0), 10);
        w.emit_feature("var V int".into(), FileId::new(0), 99);
        assert_eq!(emitted(&w), vec!["pkg p, var V int"]);
        // First-seen position wins.
        assert_eq!(w.cur().features["pkg p, var V int"].1, 10);
    }

    #[test]
    fn test_emit_feature_folds_newlines_in_short_features() {
        let mut w = walker_with_package();
        w.emit_feature("type T struct\n\tX int\n\tY int".into(), FileId::new(0), 0);
        assert_eq!(emitted(&w), vec!["pkg p, type T struct  X int; Y int"]);
    }

    #[test]
    fn test_emit_feature_cuts_oversized_features() {
        let mut w = walker_with_package();
        let big = format!("type T struct\n{}", "x".repeat(1100));
        w.emit_feature(big, FileId::new(0), 0);
        assert_eq!(emitted(&w), vec!["pkg p, type T struct ...more"]);
    }

    #[test]
    fn test_emit_feature_ignores_unwanted_packages() {
        let mut w = walker_with_package();
        w.cur_mut().name = "dep".into();
        w.emit_feature("var V int".into(), FileId::new(0), 0);
        assert!(w.cur().features.is_empty());
    }
}

fn error_method(file: FileId, span: Span) -> MethodSig {
    let string_ident = Expr::new(ExprKind::Ident("string".to_string()), span);
    let ft = FuncType {
        params: Vec::new(),
        results: vec![Field {
            names: Vec::new(),
            ty: string_ident,
            span,
        }],
        span,
    };
    MethodSig {
        name: "Error".to_string(),
        sig: "() string".to_string(),
        ft,
        file,
        span,
        recv: None,
    }
}
