//! Type inference over expressions.
//!
//! Everything here is best-effort: an expression the resolver cannot
//! type yields a `ResolveError` that callers convert to the
//! `unknown-type` placeholder. Types travel as canonical strings; when
//! a synthesized string needs to be walked into (a map value, a stored
//! function type), it is re-parsed with `parse_type_str`.

use crate::base::{FileId, Span};
use crate::ide::{Kind, TypeInfo};
use crate::semantic::error::ResolveError;
use crate::semantic::package::{func_ret_type, FoundDecl};
use crate::semantic::types::{const_lit_type, const_rank, is_builtin_type, var_lit_type};
use crate::semantic::walker::Walker;
use crate::syntax::ast::{ChanDir, DeclKind, Expr, ExprKind, UnOp};
use crate::syntax::parser::parse_type_str;
use crate::syntax::printer::{expr_string, func_type_string, nameless_type_string};

/// Marker prefix for a constant whose type depends on another constant,
/// resolved after all files of the package have been walked.
pub(crate) const CONST_DEP_PREFIX: &str = "const-dependency:";

fn unparen(e: &Expr) -> &Expr {
    match &e.kind {
        ExprKind::Paren(inner) => unparen(inner),
        _ => e,
    }
}

fn split_qualified(name: &str) -> Option<(&str, &str)> {
    let dot = name.find('.')?;
    Some((&name[..dot], &name[dot + 1..]))
}

impl Walker {
    // ------------------------------------------------------------------
    // Constant context
    // ------------------------------------------------------------------

    /// Infer the type of a constant initializer. May return a
    /// `const-dependency:` marker when the answer hinges on a constant
    /// that has not been resolved yet.
    pub(crate) fn const_value_type(&self, e: &Expr) -> Result<String, ResolveError> {
        match &e.kind {
            ExprKind::BasicLit { kind, .. } => Ok(const_lit_type(*kind).to_string()),
            ExprKind::Unary { x, .. } => self.const_value_type(x),
            ExprKind::Paren(x) => self.const_value_type(x),
            ExprKind::Selector { x, sel } => {
                let lhs = expr_string(x);
                if lhs == "C" {
                    return Ok(format!("C.{}", sel.name));
                }
                if let Some(p) = self.find_package(&lhs) {
                    if let Some(c) = p.consts.get(&sel.name) {
                        return Ok(self.pkg_ret_type(&p.name, &c.typ));
                    }
                }
                Err(ResolveError::UnknownConst(format!("{lhs}.{}", sel.name)))
            }
            ExprKind::Ident(name) => {
                if name == "iota" {
                    return Ok("ideal-int".to_string());
                }
                if name == "true" || name == "false" {
                    return Ok("bool".to_string());
                }
                if let Some(c) = self.cur().consts.get(name) {
                    return Ok(c.typ.clone());
                }
                Ok(format!("{CONST_DEP_PREFIX}{name}"))
            }
            ExprKind::Binary { op, x, y } => {
                if op.is_comparison() {
                    return Ok("bool".to_string());
                }
                let left = self.const_value_type(x)?;
                if op.is_shift() {
                    return Ok(left);
                }
                let right = self.const_value_type(y)?;
                if left != right {
                    if left.starts_with(CONST_DEP_PREFIX) && right.starts_with(CONST_DEP_PREFIX) {
                        // Both deferred: either will resolve to the
                        // same block, just pick one.
                        return Ok(left);
                    }
                    let lp = const_rank(&self.const_real_type(&left));
                    let rp = const_rank(&self.const_real_type(&right));
                    return Ok(if lp >= rp { left } else { right });
                }
                Ok(left)
            }
            ExprKind::Call { func, .. } => {
                // A call in constant context is a conversion.
                let typ = expr_string(unparen(func));
                Ok(match typ.as_str() {
                    "complex" => "complex128".to_string(),
                    "real" | "imag" => "float64".to_string(),
                    _ => typ,
                })
            }
            _ => Err(ResolveError::Unsupported(expr_string(e))),
        }
    }

    /// Underlying type of a (possibly package-qualified) named type;
    /// cgo constants collapse to `int`.
    pub(crate) fn const_real_type(&self, typ: &str) -> String {
        if let Some((pkg, rest)) = split_qualified(typ) {
            if pkg == "C" {
                return "int".to_string();
            }
            if let Some(p) = self.find_package(pkg) {
                if let Some((_, t)) = p.find_type(rest) {
                    return nameless_type_string(t);
                }
            }
            return typ.to_string();
        }
        match self.cur().find_type(typ) {
            Some((_, t)) => nameless_type_string(t),
            None => typ.to_string(),
        }
    }

    // ------------------------------------------------------------------
    // Variable context
    // ------------------------------------------------------------------

    /// Infer a type string for an expression. `index` selects the
    /// result position when the expression produces multiple values.
    pub(crate) fn value_type(&self, e: &Expr, index: usize) -> Result<String, ResolveError> {
        match &e.kind {
            ExprKind::BasicLit { kind, .. } => Ok(var_lit_type(*kind).to_string()),
            ExprKind::CompositeLit { ty, .. } => match ty {
                Some(ty) => Ok(expr_string(ty)),
                None => Err(ResolveError::Unsupported("untyped composite literal".into())),
            },
            ExprKind::FuncLit { ty, .. } => Ok(func_type_string(ty)),
            ExprKind::InterfaceType(_) => Ok(expr_string(e)),
            ExprKind::StructType(_) => Ok(expr_string(e)),
            ExprKind::Ellipsis { elt } => match elt {
                Some(elt) => Ok(format!("[]{}", self.value_type(elt, index)?)),
                None => Err(ResolveError::Unsupported("bare ellipsis".into())),
            },
            ExprKind::Star(x) => Ok(format!("*{}", self.value_type(x, index)?)),
            ExprKind::Unary { op, x } => match op {
                UnOp::Amp => Ok(format!("*{}", self.value_type(x, index)?)),
                UnOp::Not => Ok("bool".to_string()),
                UnOp::Pos | UnOp::Neg | UnOp::Xor => self.value_type(x, index),
                UnOp::Arrow => {
                    let typ = self.value_type(x, index)?;
                    typ.strip_prefix("<-chan ")
                        .or_else(|| typ.strip_prefix("chan "))
                        .map(str::to_string)
                        .ok_or_else(|| ResolveError::Unsupported(format!("receive from {typ}")))
                }
            },
            ExprKind::Selector { x, sel } => self.selector_value_type(unparen(x), &sel.name, index),
            ExprKind::Ident(name) => self.ident_value_type(name),
            ExprKind::Binary { op, x, y } => {
                if op.is_comparison() {
                    return Ok("bool".to_string());
                }
                let left = self.value_type(x, index)?;
                if op.is_shift() {
                    return Ok(left);
                }
                let right = self.value_type(y, index)?;
                if left != right {
                    // Mixed numeric operands promote to the higher
                    // priority type.
                    let lp = const_rank(&self.const_real_type(&left));
                    let rp = const_rank(&self.const_real_type(&right));
                    return Ok(if lp >= rp { left } else { right });
                }
                Ok(left)
            }
            ExprKind::Paren(x) => self.value_type(x, index),
            ExprKind::Call { func, args } => self.call_value_type(unparen(func), args, index),
            ExprKind::MapType { .. } | ExprKind::ArrayType { .. } => Ok(expr_string(e)),
            ExprKind::FuncType(ft) => Ok(func_type_string(ft)),
            ExprKind::ChanType { dir, elt } => {
                let elt = expr_string(elt);
                Ok(match dir {
                    ChanDir::Recv => format!("<-chan {elt}"),
                    ChanDir::Send => format!("chan<- {elt}"),
                    ChanDir::Both => format!("chan {elt}"),
                })
            }
            ExprKind::Index { x, .. } => {
                let typ = self.value_type(x, index)?;
                let typ = typ.trim_start_matches('*');
                if index == 1 {
                    // The comma-ok form.
                    return Ok("bool".to_string());
                }
                if let Some(elt) = typ.strip_prefix("[]") {
                    return Ok(elt.to_string());
                }
                if typ.starts_with("map[") {
                    if let Some(parsed) = parse_type_str(typ) {
                        if let ExprKind::MapType { value, .. } = &parsed.kind {
                            return Ok(nameless_type_string(value));
                        }
                    }
                }
                Err(ResolveError::UnknownIndex(typ.to_string()))
            }
            ExprKind::Slice { x, .. } => self.value_type(x, index),
            ExprKind::TypeAssert { ty, .. } => {
                if index == 1 {
                    return Ok("bool".to_string());
                }
                match ty {
                    Some(ty) => Ok(nameless_type_string(ty)),
                    None => Err(ResolveError::Unsupported("bare type switch guard".into())),
                }
            }
            _ => Err(ResolveError::Unsupported(expr_string(e))),
        }
    }

    /// Identifier in value position: locals first, then the package
    /// tables, then type names, then builtins.
    fn ident_value_type(&self, name: &str) -> Result<String, ResolveError> {
        if let Some(lv) = self.local_vars.get(name) {
            return Ok(lv.typ.clone());
        }
        if name == "true" || name == "false" {
            return Ok("bool".to_string());
        }
        if let Some(v) = self.cur().vars.get(name) {
            return Ok(v.typ.clone());
        }
        if let Some(c) = self.cur().consts.get(name) {
            return Ok(c.typ.clone());
        }
        if let Some(f) = self.cur().functions.get(name) {
            return Ok(func_type_string(&f.ft));
        }
        if let Some((_, t)) = self.cur().find_type(name) {
            // A struct name stands for itself; other named types read
            // through to the definition.
            if matches!(t.kind, ExprKind::StructType(_)) {
                return Ok(name.to_string());
            }
            return Ok(expr_string(t));
        }
        if let Some((value, ty, n)) = self.resolve_name(name) {
            if let Some(ty) = ty {
                return Ok(expr_string(&ty));
            }
            if let Some(value) = value {
                return self.value_type(&value, n);
            }
        }
        if is_builtin_type(name) {
            return Ok(name.to_string());
        }
        Err(ResolveError::UnresolvedIdent(name.to_string()))
    }

    /// `X.Sel` in value position, dispatched on the shape of `X`.
    fn selector_value_type(&self, x: &Expr, sel: &str, index: usize) -> Result<String, ResolveError> {
        match &x.kind {
            ExprKind::Ident(name) => self.selector_type(name, sel),
            ExprKind::Call { .. } => {
                let typ = self.value_type(x, index)?;
                let typ = typ.trim_start_matches('*');
                if let Some((file, t)) = self.cur().find_type(typ) {
                    if let Some((_, _, field_ty)) = self.find_struct_field(*file, t, sel) {
                        return self.value_type(&field_ty, index);
                    }
                }
                Err(ResolveError::UnknownSelector {
                    base: expr_string(x),
                    sel: sel.to_string(),
                })
            }
            ExprKind::Selector { .. } => {
                let typ = self.value_type(x, index)?;
                self.selector_type(&typ, sel)
            }
            ExprKind::Index { x: target, .. } => {
                let typ = self.value_type(target, index)?;
                match typ.strip_prefix("[]") {
                    Some(elt) => self.selector_type(elt, sel),
                    None => Err(ResolveError::UnknownSelector {
                        base: typ,
                        sel: sel.to_string(),
                    }),
                }
            }
            ExprKind::CompositeLit { .. } => {
                let typ = self.value_type(x, 0)?;
                self.selector_type(&typ, sel)
            }
            _ => Err(ResolveError::UnknownSelector {
                base: expr_string(x),
                sel: sel.to_string(),
            }),
        }
    }

    /// A call expression in value position: builtins, conversions,
    /// function values, methods.
    fn call_value_type(
        &self,
        func: &Expr,
        args: &[Expr],
        index: usize,
    ) -> Result<String, ResolveError> {
        match &func.kind {
            ExprKind::ArrayType { .. }
            | ExprKind::MapType { .. }
            | ExprKind::ChanType { .. }
            | ExprKind::Star(_) => Ok(expr_string(func)),
            ExprKind::FuncType(ft) => match func_ret_type(ft, index) {
                Some(ret) => Ok(nameless_type_string(ret)),
                None => Err(ResolveError::UnknownCall(expr_string(func))),
            },
            ExprKind::Ident(name) => {
                match name.as_str() {
                    "make" => {
                        return args
                            .first()
                            .map(nameless_type_string)
                            .ok_or_else(|| ResolveError::UnknownCall("make".into()));
                    }
                    "new" => {
                        return args
                            .first()
                            .map(|a| format!("*{}", nameless_type_string(a)))
                            .ok_or_else(|| ResolveError::UnknownCall("new".into()));
                    }
                    "append" => {
                        return args
                            .first()
                            .map(|a| self.value_type(a, 0))
                            .unwrap_or_else(|| Err(ResolveError::UnknownCall("append".into())));
                    }
                    "recover" => return Ok("interface{}".to_string()),
                    "len" | "cap" | "copy" => return Ok("int".to_string()),
                    "complex" => return Ok("complex128".to_string()),
                    "real" | "imag" => return Ok("float64".to_string()),
                    _ => {}
                }
                if is_builtin_type(name) {
                    return Ok(name.clone());
                }
                if let Some(found) = self.cur().find_call_type(name, index) {
                    return Ok(found.typ);
                }
                // A local or package variable holding a function value.
                if let Some(lv) = self.local_vars.get(name) {
                    if let Some(ret) = func_string_ret(&lv.typ, index) {
                        return Ok(ret);
                    }
                }
                if let Some((Some(value), _, n)) = self.resolve_name(name) {
                    if let Ok(typ) = self.value_type(&value, n) {
                        if let Some(ret) = func_string_ret(&typ, index) {
                            return Ok(ret);
                        }
                    }
                }
                Err(ResolveError::UnknownCall(name.clone()))
            }
            ExprKind::Selector { x, sel } => {
                let x = unparen(x);
                if let Ok(typ) = self.value_type(x, index) {
                    let typ = typ.trim_start_matches('*');
                    if let Some(found) = self
                        .cur()
                        .find_call_type(&format!("{typ}.{}", sel.name), index)
                    {
                        return Ok(found.typ);
                    }
                }
                match &x.kind {
                    ExprKind::Ident(name) => self.function_type(name, &sel.name, index),
                    ExprKind::Call { .. } => {
                        let typ = self.value_type(x, 0)?;
                        self.function_type(&typ, &sel.name, index)
                    }
                    ExprKind::Selector { .. } => {
                        let typ = self.value_type(x, index)?;
                        self.function_type(&typ, &sel.name, index)
                    }
                    ExprKind::Index { x: target, .. } => {
                        let typ = self.value_type(target, index)?;
                        match typ.strip_prefix("[]") {
                            Some(elt) => self.function_type(elt, &sel.name, index),
                            None => Err(ResolveError::UnknownCall(format!("{typ}.{}", sel.name))),
                        }
                    }
                    ExprKind::TypeAssert { ty: Some(ty), .. } => {
                        let typ = nameless_type_string(ty);
                        self.function_type(typ.trim_start_matches('*'), &sel.name, index)
                    }
                    _ => Err(ResolveError::UnknownCall(format!(
                        "{}.{}",
                        expr_string(x),
                        sel.name
                    ))),
                }
            }
            ExprKind::FuncLit { ty, .. } => match func_ret_type(ty, index) {
                Some(ret) => Ok(nameless_type_string(ret)),
                None => Err(ResolveError::UnknownCall(expr_string(func))),
            },
            ExprKind::Call { .. } => {
                let typ = self.value_type(func, 0)?;
                func_string_ret(&typ, index)
                    .ok_or_else(|| ResolveError::UnknownCall(expr_string(func)))
            }
            _ => Err(ResolveError::UnknownCall(expr_string(func))),
        }
    }

    /// `name.sel` where `name` is a variable, type, or package and the
    /// answer is the selected *field* type.
    pub(crate) fn selector_type(&self, name: &str, sel: &str) -> Result<String, ResolveError> {
        let name = name.trim_start_matches('*');
        if let Some((pkg, typ)) = split_qualified(name) {
            if let Some(p) = self.find_package(pkg) {
                if let Some((file, t)) = p.find_type(typ) {
                    if let Some((_, _, field_ty)) = self.find_struct_field(*file, t, sel) {
                        return Ok(self.pkg_ret_type(pkg, &nameless_type_string(&field_ty)));
                    }
                }
            }
            return Err(ResolveError::UnknownSelector {
                base: name.to_string(),
                sel: sel.to_string(),
            });
        }
        if let Some(lv) = self.local_vars.get(name) {
            let typ = lv.typ.clone();
            return self.selector_type(&typ, sel);
        }
        if let Some((file, t)) = self.cur().find_type(name) {
            if let Some((_, _, field_ty)) = self.find_struct_field(*file, t, sel) {
                return Ok(nameless_type_string(&field_ty));
            }
        }
        if let Some((value, ty, n)) = self.resolve_name(name) {
            let typ = match ty {
                Some(ty) => nameless_type_string(&ty),
                None => match value {
                    Some(value) => self.value_type(&value, n).unwrap_or_default(),
                    None => String::new(),
                },
            };
            let mut typ = typ.trim_start_matches('*').to_string();
            // Read through a named-type alias.
            if let Some((_, t)) = self.cur().types.get(&typ) {
                typ = nameless_type_string(t);
            }
            if let Some((pkg, rest)) = split_qualified(&typ) {
                if let Some(p) = self.find_package(pkg) {
                    if let Some((file, t)) = p.find_type(rest) {
                        if let Some((_, _, field_ty)) = self.find_struct_field(*file, t, sel) {
                            return Ok(nameless_type_string(&field_ty));
                        }
                    }
                }
            } else if let Some((file, t)) = self.cur().find_type(&typ) {
                if let Some((_, _, field_ty)) = self.find_struct_field(*file, t, sel) {
                    return Ok(nameless_type_string(&field_ty));
                }
            }
        }
        if let Some(p) = self.find_package(name) {
            if let Some(found) = p.find_selector_type(sel) {
                return Ok(self.pkg_ret_type(&p.name, &found.typ));
            }
        }
        Err(ResolveError::UnknownSelector {
            base: name.to_string(),
            sel: sel.to_string(),
        })
    }

    /// `name.sel(...)` — the type of calling method/function `sel`
    /// reached through `name`, at result `index`.
    pub(crate) fn function_type(
        &self,
        name: &str,
        sel: &str,
        index: usize,
    ) -> Result<String, ResolveError> {
        let name = name.trim_start_matches('*');
        if let Some((pkg, typ)) = split_qualified(name) {
            if let Some(p) = self.find_package(pkg) {
                if let Some((_, ft)) = p.find_method(typ, sel) {
                    if let Some(ret) = func_ret_type(&ft, index) {
                        return Ok(self.pkg_ret_type(&p.name, &nameless_type_string(ret)));
                    }
                }
            }
            return Err(ResolveError::UnknownCall(format!("{name}.{sel}")));
        }
        if let Some(lv) = self.local_vars.get(name) {
            let vt = lv.typ.trim_start_matches('*').to_string();
            if vt == "error" && sel == "Error" {
                return Ok("string".to_string());
            }
            if let Ok(typ) = self.function_type(&vt, sel, 0) {
                return Ok(typ);
            }
        }
        if let Some((value, ty, n)) = self.resolve_name(name) {
            let vt = match ty {
                Some(ty) => nameless_type_string(&ty),
                None => match value {
                    Some(value) => self.value_type(&value, n).unwrap_or_default(),
                    None => self
                        .cur()
                        .find_selector_type(name)
                        .map(|f| f.typ)
                        .unwrap_or_default(),
                },
            };
            let vt = vt.trim_start_matches('*');
            if vt == "error" && sel == "Error" {
                return Ok("string".to_string());
            }
            if let Some(f) = self.cur().functions.get(&format!("{vt}.{sel}")) {
                if let Some(ret) = func_ret_type(&f.ft, index) {
                    return Ok(nameless_type_string(ret));
                }
            }
        }
        if let Some((file, t)) = self.cur().structs.get(name).cloned() {
            if let Some((_, _, field_ty)) = self.find_struct_field(file, &t, sel) {
                return self.value_type(&field_ty, index);
            }
        }
        if let Some(f) = self.cur().functions.get(&format!("{name}.{sel}")) {
            if let Some(ret) = func_ret_type(&f.ft, index) {
                return Ok(nameless_type_string(ret));
            }
        }
        if let Some(p) = self.find_package(name) {
            if let Some(found) = p.find_call_type(sel, index) {
                return Ok(self.pkg_ret_type(&p.name, &found.typ));
            }
            return Err(ResolveError::UnknownCall(format!("{}.{sel}", p.name)));
        }
        Err(ResolveError::UnknownCall(format!("{name}.{sel}")))
    }

    /// Find a top-level `var` named `name`; returns its single value
    /// expression (when there is exactly one), its declared type, and
    /// the name's position in the spec.
    pub(crate) fn resolve_name(&self, name: &str) -> Option<(Option<Expr>, Option<Expr>, usize)> {
        for file in &self.cur().files {
            for decl in &file.ast.decls {
                let DeclKind::Var(specs) = &decl.kind else {
                    continue;
                };
                for vs in specs {
                    for (i, vname) in vs.names.iter().enumerate() {
                        if vname.name == name {
                            let value = (vs.values.len() == 1).then(|| vs.values[0].clone());
                            return Some((value, vs.ty.clone(), i));
                        }
                    }
                }
            }
        }
        None
    }

    /// Depth-first field search through a struct, following anonymous
    /// fields: a bare identifier names a current-package type, a starred
    /// identifier a pointer to one, a selector a type in another
    /// package. Siblings are searched in declaration order.
    pub(crate) fn find_struct_field(
        &self,
        file: FileId,
        st: &Expr,
        name: &str,
    ) -> Option<(FileId, Span, Expr)> {
        let ExprKind::StructType(s) = &st.kind else {
            return None;
        };
        for fi in &s.fields {
            for n in &fi.names {
                if n.name == name {
                    return Some((file, n.span, fi.ty.clone()));
                }
            }
            if !fi.names.is_empty() {
                continue;
            }
            match &fi.ty.kind {
                ExprKind::Ident(embedded) => {
                    if let Some((efile, t)) = self.cur().find_type(embedded) {
                        if embedded == name {
                            return Some((file, fi.ty.span, fi.ty.clone()));
                        }
                        if let Some(hit) = self.find_struct_field(*efile, t, name) {
                            return Some(hit);
                        }
                    }
                }
                ExprKind::Star(inner) => match &inner.kind {
                    ExprKind::Ident(embedded) => {
                        if let Some((efile, t)) = self.cur().find_type(embedded) {
                            if embedded == name {
                                return Some((file, inner.span, (**inner).clone()));
                            }
                            if let Some(hit) = self.find_struct_field(*efile, t, name) {
                                return Some(hit);
                            }
                        }
                    }
                    ExprKind::Selector { .. } => {
                        if let Some(hit) = self.find_qualified_field(inner, name) {
                            return Some(hit);
                        }
                    }
                    _ => {}
                },
                ExprKind::Selector { .. } => {
                    if let Some(hit) = self.find_qualified_field(&fi.ty, name) {
                        return Some(hit);
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn find_qualified_field(&self, ty: &Expr, name: &str) -> Option<(FileId, Span, Expr)> {
        let full = expr_string(ty);
        let (pkg, rest) = split_qualified(&full)?;
        let p = self.find_package(pkg)?;
        let (efile, t) = p.find_type(rest)?;
        self.find_struct_field(*efile, t, name)
    }

    /// Resolve a type string to a named type's definition, chasing
    /// package qualifiers and aliases. Used where a range or selector
    /// target turns out to be a type name.
    pub(crate) fn is_type_name(&self, typ: &str) -> Option<FoundDecl> {
        if let Some((pkg, rest)) = split_qualified(typ) {
            let p = self.find_package(pkg)?;
            let (file, t) = p.types.get(rest)?;
            if let Some(inner) = self.is_type_name(rest) {
                return Some(inner);
            }
            return Some(FoundDecl {
                file: *file,
                span: t.span,
                typ: self.pkg_ret_type(pkg, &expr_string(t)),
            });
        }
        let (file, t) = self.cur().types.get(typ)?;
        if let Some(inner) = self.is_type_name(&expr_string(t)) {
            return Some(inner);
        }
        Some(FoundDecl {
            file: *file,
            span: t.span,
            typ: expr_string(t),
        })
    }

    /// Qualify an exported type name with its package for rendering
    /// outside that package; pointer and slice shells pass through.
    pub(crate) fn pkg_ret_type(&self, pkg: &str, ret: &str) -> String {
        let pkg = pkg.rsplit('/').next().unwrap_or(pkg);
        if let Some(rest) = ret.strip_prefix("[]") {
            return format!("[]{}", self.pkg_ret_type(pkg, rest));
        }
        if let Some(rest) = ret.strip_prefix('*') {
            return format!("*{}", self.pkg_ret_type(pkg, rest));
        }
        if crate::syntax::ast::is_exported(ret) && !ret.contains('.') && !ret.contains(' ') {
            return format!("{pkg}.{ret}");
        }
        ret.to_string()
    }

    // ------------------------------------------------------------------
    // TypeInfo-producing lookups (cursor side)
    // ------------------------------------------------------------------

    /// Resolve `name.sel(...)` to the callee as a `TypeInfo`.
    pub(crate) fn lookup_function(&self, name: &str, sel: &str) -> Result<TypeInfo, ResolveError> {
        let name = name.trim_start_matches('*');
        if let Some((pkg, typ)) = split_qualified(name) {
            if let Some(p) = self.find_package(pkg) {
                if let Some((found, _)) = p.find_method(typ, sel) {
                    return Ok(TypeInfo::new(Kind::Method, format!("{name}.{sel}"), found.typ)
                        .with_target(found.file, found.span));
                }
            }
            return Err(ResolveError::UnknownCall(format!("{name}.{sel}")));
        }

        // A local or package value whose type carries the method.
        if let Some(vt) = self.named_value_type(name) {
            let vt = vt.trim_start_matches('*');
            if vt == "error" && sel == "Error" {
                return Ok(TypeInfo::new(Kind::Builtin, "error.Error", "() string"));
            }
            if let Some(f) = self.cur().functions.get(&format!("{vt}.{sel}")) {
                return Ok(TypeInfo::new(
                    Kind::Method,
                    format!("{name}.{sel}"),
                    func_type_string(&f.ft),
                )
                .with_target(f.file, f.span));
            }
        }

        if let Some((file, t)) = self.cur().structs.get(name).cloned() {
            if let Some(f) = self.cur().functions.get(&format!("{name}.{sel}")) {
                return Ok(TypeInfo::new(
                    Kind::Method,
                    format!("{name}.{sel}"),
                    func_type_string(&f.ft),
                )
                .with_target(f.file, f.span));
            }
            // A struct field holding a function value.
            if let Some((ffile, fspan, field_ty)) = self.find_struct_field(file, &t, sel) {
                let typ = self
                    .value_type(&field_ty, 0)
                    .unwrap_or_else(|_| expr_string(&field_ty));
                return Ok(TypeInfo::new(Kind::Field, format!("{name}.{sel}"), typ)
                    .with_target(ffile, fspan));
            }
        }

        if let Some((found, _)) = self.cur().find_method(name, sel) {
            return Ok(TypeInfo::new(Kind::Method, format!("{name}.{sel}"), found.typ)
                .with_target(found.file, found.span));
        }

        if let Some(p) = self.find_package(name) {
            if let Some(found) = p.find_call_func(sel) {
                return Ok(TypeInfo::new(Kind::Func, format!("{name}.{sel}"), found.typ)
                    .with_target(found.file, found.span));
            }
            return Err(ResolveError::UnknownCall(format!("{}.{sel}", p.name)));
        }
        Err(ResolveError::UnknownCall(format!("{name}.{sel}")))
    }

    /// Resolve `name.sel` to the selected entity as a `TypeInfo`.
    pub(crate) fn lookup_selector(&self, name: &str, sel: &str) -> Result<TypeInfo, ResolveError> {
        let name = name.trim_start_matches('*');
        if let Some((pkg, typ)) = split_qualified(name) {
            if let Some(p) = self.find_package(pkg) {
                if let Some((file, t)) = p.find_type(typ) {
                    if let Some((ffile, fspan, field_ty)) = self.find_struct_field(*file, t, sel) {
                        let typ = self.pkg_ret_type(pkg, &nameless_type_string(&field_ty));
                        return Ok(TypeInfo::new(Kind::Field, format!("{name}.{sel}"), typ)
                            .with_target(ffile, fspan));
                    }
                }
            }
            return Err(ResolveError::UnknownSelector {
                base: name.to_string(),
                sel: sel.to_string(),
            });
        }

        if let Some(lv) = self.local_vars.get(name) {
            let typ = lv.typ.clone();
            return self.lookup_selector(&typ, sel);
        }

        if let Some(vt) = self.named_value_type(name) {
            let mut typ = vt.trim_start_matches('*').to_string();
            if let Some((_, t)) = self.cur().types.get(&typ) {
                typ = nameless_type_string(t);
            }
            // The reported name is anchored to the resolved type, not
            // the variable the selector went through.
            if let Some((pkg, rest)) = split_qualified(&typ) {
                if let Some(p) = self.find_package(pkg) {
                    if let Some((file, t)) = p.find_type(rest) {
                        if let Some((ffile, fspan, field_ty)) = self.find_struct_field(*file, t, sel)
                        {
                            return Ok(TypeInfo::new(
                                Kind::Field,
                                format!("{typ}.{sel}"),
                                nameless_type_string(&field_ty),
                            )
                            .with_target(ffile, fspan));
                        }
                    }
                }
            } else if let Some((file, t)) = self.cur().find_type(&typ) {
                if let Some((ffile, fspan, field_ty)) = self.find_struct_field(*file, t, sel) {
                    return Ok(TypeInfo::new(
                        Kind::Field,
                        format!("{typ}.{sel}"),
                        nameless_type_string(&field_ty),
                    )
                    .with_target(ffile, fspan));
                }
            }
        }

        if let Some(p) = self.find_package(name) {
            if let Some(found) = p.find_selector_type(sel) {
                let typ = self.pkg_ret_type(&p.name, &found.typ);
                return Ok(TypeInfo::new(Kind::Type, format!("{name}.{sel}"), typ)
                    .with_target(found.file, found.span));
            }
        }

        if let Some((file, t)) = self.cur().find_type(name) {
            if let Some((ffile, fspan, field_ty)) = self.find_struct_field(*file, t, sel) {
                return Ok(TypeInfo::new(
                    Kind::Field,
                    format!("{name}.{sel}"),
                    nameless_type_string(&field_ty),
                )
                .with_target(ffile, fspan));
            }
        }
        if let Some((_, t)) = self.cur().types.get(name) {
            let alias = expr_string(t);
            return self.lookup_selector(&alias, sel);
        }
        Err(ResolveError::UnknownSelector {
            base: name.to_string(),
            sel: sel.to_string(),
        })
    }

    /// The declared or inferred type of a top-level name, via the var
    /// table scan or the package's selector view.
    fn named_value_type(&self, name: &str) -> Option<String> {
        if let Some(lv) = self.local_vars.get(name) {
            return Some(lv.typ.clone());
        }
        if let Some((value, ty, n)) = self.resolve_name(name) {
            if let Some(ty) = ty {
                return Some(nameless_type_string(&ty));
            }
            if let Some(value) = value {
                if let Ok(typ) = self.value_type(&value, n) {
                    return Some(typ);
                }
            }
            return self.cur().find_selector_type(name).map(|f| f.typ);
        }
        self.cur().find_selector_type(name).map(|f| f.typ)
    }
}

/// When a type string is a function type, parse it back and take the
/// `index`-th result.
fn func_string_ret(typ: &str, index: usize) -> Option<String> {
    if !typ.starts_with("func(") {
        return None;
    }
    let parsed = parse_type_str(typ)?;
    let ExprKind::FuncType(ft) = &parsed.kind else {
        return None;
    };
    func_ret_type(ft, index).map(nameless_type_string)
}
