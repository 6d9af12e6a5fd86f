//! Cursor resolution: walk the AST to the innermost node containing a
//! byte offset, recording local bindings on the way, and resolve that
//! node to a [`TypeInfo`].
//!
//! The traversal visits only the child whose span contains the cursor;
//! statements *before* the cursor in the same block are still walked for
//! their binding side effects, with their results discarded.

use tracing::debug;

use crate::base::{FileId, Span};
use crate::ide::{Kind, TypeInfo};
use crate::semantic::error::{ResolveError, UNKNOWN_TYPE};
use crate::semantic::walker::{LocalVar, Walker};
use crate::syntax::ast::{
    self, Block, CaseClause, Decl, DeclKind, Expr, ExprKind, Field, File, FuncDecl, Stmt, StmtKind,
    TypeSpec, ValueSpec,
};
use crate::syntax::parser::parse_type_str;
use crate::syntax::printer::{expr_string, func_type_string, nameless_type_string};

type LookupResult = Result<Option<(String, TypeInfo)>, ResolveError>;
type InfoResult = Result<Option<TypeInfo>, ResolveError>;

impl Walker {
    pub(crate) fn lookup_file(&mut self, file: &File, fid: FileId, p: u32) -> InfoResult {
        if file.package.span.contains(p) {
            let name = file.package.name.clone();
            return Ok(Some(
                TypeInfo::new(Kind::Package, name.clone(), name)
                    .with_origin(fid, file.package.span)
                    .with_target(fid, file.package.span),
            ));
        }
        for decl in &file.decls {
            if decl.span.contains(p) {
                return self.lookup_decl(decl, fid, p, false);
            }
        }
        Ok(None)
    }

    fn lookup_decl(&mut self, decl: &Decl, fid: FileId, p: u32, local: bool) -> InfoResult {
        match &decl.kind {
            DeclKind::Import(specs) => {
                for is in specs {
                    if is.span.contains(p) {
                        return Ok(Some(
                            TypeInfo::new(Kind::Import, is.local_name(), is.path.clone())
                                .with_origin(fid, is.span)
                                .with_target(fid, is.path_span),
                        ));
                    }
                }
                Ok(None)
            }
            DeclKind::Const(specs) => {
                for vs in specs {
                    if vs.span.contains(p) {
                        return self.lookup_const_spec(vs, fid, p, local);
                    }
                    let _ = self.lookup_const_spec(vs, fid, p, local);
                }
                Ok(None)
            }
            DeclKind::Var(specs) => {
                for vs in specs {
                    if vs.span.contains(p) {
                        return self.lookup_var_spec(vs, fid, p, local);
                    }
                    let _ = self.lookup_var_spec(vs, fid, p, local);
                }
                Ok(None)
            }
            DeclKind::Type(specs) => {
                for ts in specs {
                    if ts.span.contains(p) {
                        return self.lookup_type_spec(ts, fid, p);
                    }
                }
                Ok(None)
            }
            DeclKind::Func(fd) => self.lookup_func_decl(fd, fid, p),
        }
    }

    fn lookup_var_spec(&mut self, vs: &ValueSpec, fid: FileId, p: u32, local: bool) -> InfoResult {
        if let Some(ty) = &vs.ty {
            if ty.span.contains(p) {
                return self.lookup_expr_info(ty, fid, p);
            }
        }
        for value in &vs.values {
            if value.span.contains(p) {
                return self.lookup_expr_info(value, fid, p);
            }
        }
        if let Some(ty) = &vs.ty {
            let typ = expr_string(ty);
            for ident in &vs.names {
                if local {
                    self.bind_local(&ident.name, &typ, fid, ident.span);
                }
                if ident.span.contains(p) {
                    return Ok(Some(
                        TypeInfo::new(Kind::Var, ident.name.clone(), typ.clone())
                            .with_origin(fid, ident.span)
                            .with_target(fid, ty.span),
                    ));
                }
            }
        } else if vs.names.len() == vs.values.len() {
            for (ident, value) in vs.names.iter().zip(&vs.values) {
                let typ = self.spec_var_type(ident, Some(value), 0, local, fid);
                if ident.span.contains(p) {
                    return Ok(Some(
                        TypeInfo::new(Kind::Var, ident.name.clone(), typ)
                            .with_origin(fid, ident.span)
                            .with_target(fid, ident.span),
                    ));
                }
            }
        } else if vs.values.len() == 1 {
            for (n, ident) in vs.names.iter().enumerate() {
                let typ = self.spec_var_type(ident, vs.values.first(), n, local, fid);
                if ident.span.contains(p) {
                    return Ok(Some(
                        TypeInfo::new(Kind::Var, ident.name.clone(), typ)
                            .with_origin(fid, ident.span)
                            .with_target(fid, ident.span),
                    ));
                }
            }
        }
        Ok(None)
    }

    fn spec_var_type(
        &mut self,
        ident: &ast::Ident,
        value: Option<&Expr>,
        index: usize,
        local: bool,
        fid: FileId,
    ) -> String {
        if !local {
            return self
                .cur()
                .vars
                .get(&ident.name)
                .map(|v| v.typ.clone())
                .unwrap_or_default();
        }
        let typ = match value.map(|v| self.value_type(v, index)) {
            Some(Ok(typ)) => typ,
            Some(Err(err)) => {
                debug!(name = %ident.name, %err, "unknown type of variable");
                UNKNOWN_TYPE.to_string()
            }
            None => UNKNOWN_TYPE.to_string(),
        };
        self.bind_local(&ident.name, &typ, fid, ident.span);
        typ
    }

    fn lookup_const_spec(&mut self, vs: &ValueSpec, fid: FileId, p: u32, local: bool) -> InfoResult {
        if let Some(ty) = &vs.ty {
            if ty.span.contains(p) {
                return self.lookup_expr_info(ty, fid, p);
            }
        }
        for ident in &vs.names {
            let typ = if !local {
                self.cur()
                    .consts
                    .get(&ident.name)
                    .map(|c| c.typ.clone())
                    .unwrap_or_default()
            } else {
                let lit_type = if let Some(ty) = &vs.ty {
                    expr_string(ty)
                } else if let Some(value) = vs.values.first() {
                    match self.const_value_type(value) {
                        Ok(t) => t,
                        Err(err) => {
                            debug!(name = %ident.name, %err, "unknown kind in const");
                            UNKNOWN_TYPE.to_string()
                        }
                    }
                } else {
                    self.last_const_type.clone().unwrap_or_default()
                };
                self.last_const_type = Some(lit_type.clone());
                self.bind_local(&ident.name, &lit_type, fid, ident.span);
                lit_type
            };
            if ident.span.contains(p) {
                return Ok(Some(
                    TypeInfo::new(Kind::Const, ident.name.clone(), typ)
                        .with_origin(fid, ident.span)
                        .with_target(fid, ident.span),
                ));
            }
        }
        Ok(None)
    }

    fn lookup_type_spec(&mut self, ts: &TypeSpec, fid: FileId, p: u32) -> InfoResult {
        match &ts.ty.kind {
            ExprKind::StructType(st) => {
                for f in &st.fields {
                    if !f.span.contains(p) {
                        continue;
                    }
                    if f.ty.span.contains(p) {
                        return self.lookup_expr_info(&f.ty, fid, p);
                    }
                    for ident in &f.names {
                        if ident.span.contains(p) {
                            return Ok(Some(
                                TypeInfo::new(
                                    Kind::Field,
                                    format!("{}.{}", ts.name.name, ident.name),
                                    nameless_type_string(&f.ty),
                                )
                                .with_origin(fid, ident.span)
                                .with_target(fid, f.ty.span),
                            ));
                        }
                    }
                }
                Ok(Some(
                    TypeInfo::new(Kind::Struct, ts.name.name.clone(), "struct")
                        .with_origin(fid, ts.name.span)
                        .with_target(fid, ts.ty.span),
                ))
            }
            ExprKind::InterfaceType(it) => {
                for f in &it.methods {
                    if !f.span.contains(p) {
                        continue;
                    }
                    for ident in &f.names {
                        if ident.span.contains(p) {
                            return Ok(Some(
                                TypeInfo::new(
                                    Kind::Method,
                                    format!("{}.{}", ts.name.name, ident.name),
                                    nameless_type_string(&f.ty),
                                )
                                .with_origin(fid, ident.span)
                                .with_target(fid, ident.span),
                            ));
                        }
                    }
                    if f.ty.span.contains(p) {
                        return self.lookup_expr_info(&f.ty, fid, p);
                    }
                }
                Ok(Some(
                    TypeInfo::new(Kind::Interface, ts.name.name.clone(), "interface")
                        .with_origin(fid, ts.name.span)
                        .with_target(fid, ts.ty.span),
                ))
            }
            _ => Ok(Some(
                TypeInfo::new(
                    Kind::Type,
                    ts.name.name.clone(),
                    nameless_type_string(&ts.ty),
                )
                .with_origin(fid, ts.name.span)
                .with_target(fid, ts.ty.span),
            )),
        }
    }

    fn lookup_func_decl(&mut self, fd: &FuncDecl, fid: FileId, p: u32) -> InfoResult {
        for field in &fd.ty.params {
            if field.span.contains(p) {
                for ident in &field.names {
                    if ident.span.contains(p) {
                        let typ = self
                            .value_type(&field.ty, 0)
                            .unwrap_or_else(|_| UNKNOWN_TYPE.to_string());
                        return Ok(Some(
                            TypeInfo::new(Kind::Param, ident.name.clone(), typ)
                                .with_origin(fid, ident.span)
                                .with_target(fid, field.ty.span),
                        ));
                    }
                }
                return self.lookup_expr_info(&field.ty, fid, p);
            }
            self.bind_field_locals(field, fid);
        }
        for field in &fd.ty.results {
            if field.span.contains(p) {
                return self.lookup_expr_info(&field.ty, fid, p);
            }
            self.bind_field_locals(field, fid);
        }
        if let Some(recv) = &fd.recv {
            if recv.span.contains(p) {
                return self.lookup_expr_info(&recv.ty, fid, p);
            }
            let typ = expr_string(&recv.ty);
            for ident in &recv.names {
                self.bind_local(&ident.name, &typ, fid, ident.span);
            }
        }
        if let Some(body) = &fd.body {
            if body.span.contains(p) {
                return self.lookup_stmt_block(body, fid, p);
            }
        }
        let (name, kind) = match &fd.recv {
            Some(recv) => {
                let (base, imported) = crate::semantic::decls::base_type_name(&recv.ty);
                if imported {
                    return Ok(None);
                }
                (format!("{base}.{}", fd.name.name), Kind::Method)
            }
            None => (fd.name.name.clone(), Kind::Func),
        };
        Ok(Some(
            TypeInfo::new(kind, name, func_type_string(&fd.ty))
                .with_origin(fid, fd.name.span)
                .with_target(fid, fd.ty.span),
        ))
    }

    fn bind_field_locals(&mut self, field: &Field, fid: FileId) {
        if field.names.is_empty() {
            return;
        }
        match self.value_type(&field.ty, 0) {
            Ok(typ) => {
                for ident in &field.names {
                    self.bind_local(&ident.name, &typ, fid, ident.span);
                }
            }
            Err(err) => debug!(%err, "cannot type parameter"),
        }
    }

    fn bind_local(&mut self, name: &str, typ: &str, file: FileId, span: Span) {
        self.local_vars.insert(
            name.to_string(),
            LocalVar {
                typ: typ.to_string(),
                file,
                span,
            },
        );
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn lookup_stmt_block(&mut self, block: &Block, fid: FileId, p: u32) -> InfoResult {
        for st in &block.stmts {
            if st.span.contains(p) {
                return self.lookup_stmt(st, fid, p);
            }
            if let Err(err) = self.lookup_stmt(st, fid, p) {
                debug!(%err, "binding walk failed");
            }
        }
        Ok(None)
    }

    fn lookup_stmt(&mut self, stmt: &Stmt, fid: FileId, p: u32) -> InfoResult {
        match &stmt.kind {
            StmtKind::Empty => Ok(None),
            StmtKind::Decl(decl) => self.lookup_decl(decl, fid, p, true),
            StmtKind::Labeled { label, stmt } => {
                if label.span.contains(p) {
                    return Ok(Some(
                        TypeInfo::new(Kind::Builtin, label.name.clone(), "string")
                            .with_origin(fid, label.span),
                    ));
                }
                self.lookup_stmt(stmt, fid, p)
            }
            StmtKind::Expr(e) => self.lookup_expr_info(e, fid, p),
            StmtKind::Send { chan, value } => {
                if chan.span.contains(p) {
                    return self.lookup_expr_info(chan, fid, p);
                }
                if value.span.contains(p) {
                    return self.lookup_expr_info(value, fid, p);
                }
                Ok(None)
            }
            StmtKind::IncDec { x } => self.lookup_expr_info(x, fid, p),
            StmtKind::Go(call) | StmtKind::Defer(call) => self.lookup_expr_info(call, fid, p),
            StmtKind::Return(results) => {
                for r in results {
                    if r.span.contains(p) {
                        return self.lookup_expr_info(r, fid, p);
                    }
                }
                Ok(None)
            }
            StmtKind::Branch { label } => {
                if let Some(label) = label {
                    if label.span.contains(p) {
                        return Ok(Some(
                            TypeInfo::new(Kind::Builtin, label.name.clone(), "string")
                                .with_origin(fid, label.span),
                        ));
                    }
                }
                Ok(None)
            }
            StmtKind::Assign { lhs, rhs, define } => self.lookup_assign(lhs, rhs, *define, fid, p),
            StmtKind::Block(block) => self.lookup_stmt_block(block, fid, p),
            StmtKind::If {
                init,
                cond,
                body,
                else_branch,
            } => {
                if let Some(init) = init {
                    if init.span.contains(p) {
                        return self.lookup_stmt(init, fid, p);
                    }
                    let _ = self.lookup_stmt(init, fid, p);
                }
                if cond.span.contains(p) {
                    return self.lookup_expr_info(cond, fid, p);
                }
                if body.span.contains(p) {
                    return self.lookup_stmt_block(body, fid, p);
                }
                if let Some(else_branch) = else_branch {
                    if else_branch.span.contains(p) {
                        return self.lookup_stmt(else_branch, fid, p);
                    }
                }
                Ok(None)
            }
            StmtKind::Switch { init, tag, cases } => {
                if let Some(init) = init {
                    if init.span.contains(p) {
                        return self.lookup_stmt(init, fid, p);
                    }
                    let _ = self.lookup_stmt(init, fid, p);
                }
                if let Some(tag) = tag {
                    if tag.span.contains(p) {
                        return self.lookup_expr_info(tag, fid, p);
                    }
                }
                self.lookup_case_bodies(cases, fid, p, None)
            }
            StmtKind::TypeSwitch {
                init,
                assign,
                cases,
            } => {
                if assign.span.contains(p) {
                    return self.lookup_stmt(assign, fid, p);
                }
                let _ = self.lookup_stmt(assign, fid, p);
                if let Some(init) = init {
                    if init.span.contains(p) {
                        return self.lookup_stmt(init, fid, p);
                    }
                    let _ = self.lookup_stmt(init, fid, p);
                }
                let guard = type_switch_guard_name(assign);
                self.lookup_case_bodies(cases, fid, p, guard.as_deref())
            }
            StmtKind::Select { cases } => {
                for clause in cases {
                    if !clause.span.contains(p) {
                        continue;
                    }
                    if let Some(comm) = &clause.comm {
                        if comm.span.contains(p) {
                            return self.lookup_stmt(comm, fid, p);
                        }
                        let _ = self.lookup_stmt(comm, fid, p);
                    }
                    for st in &clause.body {
                        if st.span.contains(p) {
                            return self.lookup_stmt(st, fid, p);
                        }
                        let _ = self.lookup_stmt(st, fid, p);
                    }
                }
                Ok(None)
            }
            StmtKind::For {
                init,
                cond,
                post,
                body,
            } => {
                if let Some(init) = init {
                    if init.span.contains(p) {
                        return self.lookup_stmt(init, fid, p);
                    }
                    let _ = self.lookup_stmt(init, fid, p);
                }
                if let Some(cond) = cond {
                    if cond.span.contains(p) {
                        return self.lookup_expr_info(cond, fid, p);
                    }
                }
                if body.span.contains(p) {
                    return self.lookup_stmt_block(body, fid, p);
                }
                if let Some(post) = post {
                    if post.span.contains(p) {
                        return self.lookup_stmt(post, fid, p);
                    }
                }
                Ok(None)
            }
            StmtKind::Range {
                key,
                value,
                x,
                body,
                ..
            } => self.lookup_range(key.as_ref(), value.as_ref(), x, body, fid, p),
        }
    }

    fn lookup_assign(
        &mut self,
        lhs: &[Expr],
        rhs: &[Expr],
        define: bool,
        fid: FileId,
        p: u32,
    ) -> InfoResult {
        if lhs.len() == rhs.len() {
            for (l, r) in lhs.iter().zip(rhs) {
                if let ExprKind::Ident(name) = &l.kind {
                    match self.value_type(r, 0) {
                        Ok(typ) if define => self.bind_local(name, &typ, fid, l.span),
                        Ok(_) => {}
                        Err(err) => debug!(%err, "cannot type assignment"),
                    }
                }
                if l.span.contains(p) {
                    return self.lookup_expr_info(l, fid, p);
                }
                if r.span.contains(p) {
                    return self.lookup_expr_info(r, fid, p);
                }
            }
        } else if rhs.len() == 1 {
            for (i, l) in lhs.iter().enumerate() {
                if let ExprKind::Ident(name) = &l.kind {
                    match self.value_type(&rhs[0], i) {
                        Ok(typ) if define => self.bind_local(name, &typ, fid, l.span),
                        Ok(_) => {}
                        Err(err) => debug!(%err, "cannot type assignment"),
                    }
                }
                if l.span.contains(p) {
                    return self.lookup_expr_info(l, fid, p);
                }
            }
            if rhs[0].span.contains(p) {
                return self.lookup_expr_info(&rhs[0], fid, p);
            }
        }
        Ok(None)
    }

    /// Case clauses of a switch or type switch. For a type switch, the
    /// guard variable takes the type of the selected case clause.
    fn lookup_case_bodies(
        &mut self,
        cases: &[CaseClause],
        fid: FileId,
        p: u32,
        guard: Option<&str>,
    ) -> InfoResult {
        for case in cases {
            if !case.span.contains(p) {
                continue;
            }
            for r in &case.list {
                if r.span.contains(p) {
                    return self.lookup_expr_info(r, fid, p);
                }
                if let Some(guard) = guard {
                    match self.value_type(r, 0) {
                        Ok(typ) => self.bind_local(guard, &typ, fid, r.span),
                        Err(err) => debug!(%err, "cannot type case clause"),
                    }
                }
            }
            for st in &case.body {
                if st.span.contains(p) {
                    return self.lookup_stmt(st, fid, p);
                }
                let _ = self.lookup_stmt(st, fid, p);
            }
        }
        Ok(None)
    }

    fn lookup_range(
        &mut self,
        key: Option<&Expr>,
        value: Option<&Expr>,
        x: &Expr,
        body: &Block,
        fid: FileId,
        p: u32,
    ) -> InfoResult {
        if x.span.contains(p) {
            return self.lookup_expr_info(x, fid, p);
        }
        if let Ok(mut typ) = self.value_type(x, 0) {
            // Ranging over a named type reads through to its definition.
            if let Some(found) = self.is_type_name(&typ) {
                typ = found.typ;
            }
            let (kt, vt) = range_element_types(&typ);
            if let Some(key) = key {
                if key.span.contains(p) {
                    return Ok(Some(
                        TypeInfo::new(Kind::Var, expr_string(key), kt.clone())
                            .with_origin(fid, key.span)
                            .with_target(fid, x.span),
                    ));
                }
                if let ExprKind::Ident(name) = &key.kind {
                    self.bind_local(name, &kt, fid, key.span);
                }
            }
            if let Some(value) = value {
                if value.span.contains(p) {
                    return Ok(Some(
                        TypeInfo::new(Kind::Var, expr_string(value), vt.clone())
                            .with_origin(fid, value.span)
                            .with_target(fid, x.span),
                    ));
                }
                if let ExprKind::Ident(name) = &value.kind {
                    self.bind_local(name, &vt, fid, value.span);
                }
            }
        }
        if body.span.contains(p) {
            return self.lookup_stmt_block(body, fid, p);
        }
        Ok(None)
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    pub(crate) fn lookup_expr_info(&mut self, e: &Expr, fid: FileId, p: u32) -> InfoResult {
        Ok(self.lookup_expr(e, fid, p)?.map(|(_, info)| info))
    }

    fn lookup_expr(&mut self, e: &Expr, fid: FileId, p: u32) -> LookupResult {
        match &e.kind {
            ExprKind::BasicLit { kind, value } => {
                let lit_type = crate::semantic::types::var_lit_type(*kind);
                // Long literal names are cut at 128 bytes, backing off
                // to the nearest UTF-8 boundary.
                let name: String = if value.len() >= 128 {
                    let mut cut = 128;
                    while !value.is_char_boundary(cut) {
                        cut -= 1;
                    }
                    format!("{}...", &value[..cut])
                } else {
                    value.clone()
                };
                Ok(Some((
                    lit_type.to_string(),
                    TypeInfo::new(Kind::Builtin, name, lit_type)
                        .with_origin(fid, e.span)
                        .with_target(fid, e.span),
                )))
            }
            ExprKind::Star(x) => {
                let Some((s, info)) = self.lookup_expr(x, fid, p)? else {
                    return Ok(None);
                };
                let wrapped = TypeInfo {
                    kind: info.kind,
                    name: format!("*{}", info.name),
                    typ: format!("*{}", info.typ),
                    origin: Some((fid, e.span)),
                    target: info.target,
                };
                Ok(Some((format!("*{s}"), wrapped)))
            }
            ExprKind::InterfaceType(_) => Ok(Some((
                "interface{}".to_string(),
                TypeInfo::new(Kind::Interface, expr_string(e), "interface{}")
                    .with_origin(fid, e.span)
                    .with_target(fid, e.span),
            ))),
            ExprKind::Ellipsis { elt } => {
                let Some(elt) = elt else { return Ok(None) };
                let Some((s, info)) = self.lookup_expr(elt, fid, p)? else {
                    return Ok(None);
                };
                let wrapped = TypeInfo {
                    kind: Kind::Array,
                    name: format!("...{s}"),
                    typ: format!("[]{}", info.typ),
                    origin: Some((fid, e.span)),
                    target: info.target,
                };
                Ok(Some((format!("[]{s}"), wrapped)))
            }
            ExprKind::KeyValue { key, value } => {
                if key.span.contains(p) {
                    return self.lookup_expr(key, fid, p);
                }
                if value.span.contains(p) {
                    return self.lookup_expr(value, fid, p);
                }
                Ok(None)
            }
            ExprKind::CompositeLit { ty, elts } => self.lookup_composite(ty.as_deref(), elts, fid, p),
            ExprKind::Unary { op, x } => {
                let Some((s, info)) = self.lookup_expr(x, fid, p)? else {
                    return Ok(None);
                };
                Ok(Some((format!("{}{s}", op.as_str()), info)))
            }
            ExprKind::TypeAssert { x, ty } => {
                if x.span.contains(p) {
                    return self.lookup_expr(x, fid, p);
                }
                match ty {
                    Some(ty) => self.lookup_expr(ty, fid, p),
                    None => Ok(None),
                }
            }
            ExprKind::Binary { x, y, .. } => {
                if x.span.contains(p) {
                    return self.lookup_expr(x, fid, p);
                }
                if y.span.contains(p) {
                    return self.lookup_expr(y, fid, p);
                }
                Ok(None)
            }
            ExprKind::Call { func, args } => self.lookup_call(func, args, fid, p),
            ExprKind::Selector { x, sel } => {
                let x = unparen(x);
                match &x.kind {
                    ExprKind::Ident(name) => {
                        if x.span.contains(p) {
                            return self.lookup_expr(x, fid, p);
                        }
                        let info = self.lookup_selector(name, &sel.name)?;
                        Ok(Some((format!("{name}.{}", sel.name), info)))
                    }
                    ExprKind::Selector { x: inner, .. } => {
                        if inner.span.contains(p) {
                            return self.lookup_expr(inner, fid, p);
                        }
                        if x.span.contains(p) {
                            return self.lookup_expr(x, fid, p);
                        }
                        let typ = self.value_type(x, 0)?;
                        let info = self.lookup_selector(&typ, &sel.name)?;
                        Ok(Some((format!("{typ}.{}", sel.name), info)))
                    }
                    _ => Err(ResolveError::UnknownSelector {
                        base: expr_string(x),
                        sel: sel.name.clone(),
                    }),
                }
            }
            ExprKind::Ident(name) => self.lookup_ident(name, fid, e.span),
            ExprKind::Index { x, index } => {
                if index.span.contains(p) {
                    return self.lookup_expr(index, fid, p);
                }
                self.lookup_expr(x, fid, p)
            }
            ExprKind::Paren(x) => self.lookup_expr(x, fid, p),
            ExprKind::FuncLit { ty, body } => {
                let ft_expr = Expr::new(ExprKind::FuncType(ty.clone()), ty.span);
                if ty.span.contains(p) {
                    return self.lookup_expr(&ft_expr, fid, p);
                }
                let _ = self.lookup_expr(&ft_expr, fid, p);
                let typ = func_type_string(ty);
                let info = self.lookup_stmt_block(body, fid, p)?;
                Ok(info.map(|info| (typ, info)))
            }
            ExprKind::FuncType(ft) => {
                for field in &ft.params {
                    if field.span.contains(p) {
                        return Ok(self
                            .lookup_expr_info(&field.ty, fid, p)?
                            .map(|info| (String::new(), info)));
                    }
                    self.bind_field_locals(field, fid);
                }
                for field in &ft.results {
                    if field.span.contains(p) {
                        return Ok(self
                            .lookup_expr_info(&field.ty, fid, p)?
                            .map(|info| (String::new(), info)));
                    }
                    self.bind_field_locals(field, fid);
                }
                Ok(None)
            }
            ExprKind::ArrayType { elt, .. } => {
                let Some((s, info)) = self.lookup_expr(elt, fid, p)? else {
                    return Ok(None);
                };
                let wrapped = TypeInfo {
                    kind: Kind::Array,
                    name: format!("[]{}", info.name),
                    typ: format!("[]{}", info.typ),
                    origin: Some((fid, e.span)),
                    target: info.target,
                };
                Ok(Some((format!("[]{s}"), wrapped)))
            }
            ExprKind::Slice { x, low, high } => {
                if let Some(high) = high {
                    if high.span.contains(p) {
                        return self.lookup_expr(high, fid, p);
                    }
                }
                if let Some(low) = low {
                    if low.span.contains(p) {
                        return self.lookup_expr(low, fid, p);
                    }
                }
                self.lookup_expr(x, fid, p)
            }
            ExprKind::MapType { key, value } => {
                if key.span.contains(p) {
                    return self.lookup_expr(key, fid, p);
                }
                if value.span.contains(p) {
                    return self.lookup_expr(value, fid, p);
                }
                let typ = self.value_type(e, 0)?;
                Ok(Some((
                    typ.clone(),
                    TypeInfo::new(Kind::Map, expr_string(e), typ)
                        .with_origin(fid, e.span)
                        .with_target(fid, e.span),
                )))
            }
            ExprKind::ChanType { elt, .. } => {
                if elt.span.contains(p) {
                    return self.lookup_expr(elt, fid, p);
                }
                let typ = self.value_type(e, 0)?;
                Ok(Some((
                    typ.clone(),
                    TypeInfo::new(Kind::Chan, expr_string(e), typ)
                        .with_origin(fid, e.span)
                        .with_target(fid, e.span),
                )))
            }
            _ => Err(ResolveError::Unsupported(expr_string(e))),
        }
    }

    /// Identifier resolution order: locals, then the package's vars,
    /// consts, functions and type names, then imported package aliases,
    /// then builtins.
    fn lookup_ident(&mut self, name: &str, fid: FileId, span: Span) -> LookupResult {
        if let Some(lv) = self.local_vars.get(name) {
            let info = TypeInfo::new(Kind::Var, name, lv.typ.clone())
                .with_origin(fid, span)
                .with_target(lv.file, lv.span);
            return Ok(Some((lv.typ.clone(), info)));
        }
        if let Some(v) = self.cur().vars.get(name) {
            let info = TypeInfo::new(Kind::Var, name, v.typ.clone())
                .with_origin(fid, span)
                .with_target(v.file, v.span);
            return Ok(Some((name.to_string(), info)));
        }
        if let Some(c) = self.cur().consts.get(name) {
            let info = TypeInfo::new(Kind::Const, name, c.typ.clone())
                .with_origin(fid, span)
                .with_target(c.file, c.span);
            return Ok(Some((name.to_string(), info)));
        }
        if let Some(f) = self.cur().functions.get(name) {
            let info = TypeInfo::new(Kind::Func, name, f.sig.clone())
                .with_origin(fid, span)
                .with_target(f.file, f.span);
            return Ok(Some((name.to_string(), info)));
        }
        if let Some((file, t)) = self.cur().interfaces.get(name) {
            let info = TypeInfo::new(Kind::Interface, name, "interface")
                .with_origin(fid, span)
                .with_target(*file, t.span);
            return Ok(Some((name.to_string(), info)));
        }
        if let Some((file, t)) = self.cur().structs.get(name) {
            let info = TypeInfo::new(Kind::Struct, name, "struct")
                .with_origin(fid, span)
                .with_target(*file, t.span);
            return Ok(Some((name.to_string(), info)));
        }
        if let Some((file, t)) = self.cur().types.get(name) {
            let info = TypeInfo::new(Kind::Type, name, name)
                .with_origin(fid, span)
                .with_target(*file, t.span);
            return Ok(Some((name.to_string(), info)));
        }
        if let Some(p) = self.find_package(name) {
            let info = TypeInfo::new(Kind::Import, name, p.name.clone()).with_origin(fid, span);
            return Ok(Some((name.to_string(), info)));
        }
        if crate::semantic::types::is_builtin_type(name) {
            return Ok(Some((
                name.to_string(),
                TypeInfo::new(Kind::Builtin, name, "").with_origin(fid, span),
            )));
        }
        Err(ResolveError::UnresolvedIdent(name.to_string()))
    }

    fn lookup_composite(
        &mut self,
        ty: Option<&Expr>,
        elts: &[Expr],
        fid: FileId,
        p: u32,
    ) -> LookupResult {
        if let Some(ty_expr) = ty {
            if let Ok(typ) = self.value_type(ty_expr, 0) {
                let mut typ = typ.trim_start_matches('*').to_string();
                if let Some(rest) = typ.strip_prefix("[]") {
                    typ = rest.trim_start_matches('*').to_string();
                }
                // Locate the struct the keys belong to.
                let (prefix, found) = match typ.split_once('.') {
                    Some((pkg, rest)) => {
                        let found = self
                            .find_package(pkg)
                            .and_then(|pk| pk.structs.get(rest).cloned());
                        (format!("{pkg}."), found.map(|f| (f, rest.to_string())))
                    }
                    None => (
                        String::new(),
                        self.cur()
                            .structs
                            .get(&typ)
                            .cloned()
                            .map(|f| (f, typ.clone())),
                    ),
                };
                if let Some(((sfile, st), tname)) = found {
                    for elt in elts {
                        if !elt.span.contains(p) {
                            continue;
                        }
                        if let ExprKind::KeyValue { key, value } = &elt.kind {
                            if key.span.contains(p) {
                                let key_name = expr_string(key);
                                if let Some((ffile, fspan, field_ty)) =
                                    self.find_struct_field(sfile, &st, &key_name)
                                {
                                    let fname = format!("{prefix}{tname}.{key_name}");
                                    let info = TypeInfo::new(
                                        Kind::Field,
                                        fname.clone(),
                                        nameless_type_string(&field_ty),
                                    )
                                    .with_origin(fid, key.span)
                                    .with_target(ffile, fspan);
                                    return Ok(Some((fname, info)));
                                }
                            } else if value.span.contains(p) {
                                return self.lookup_expr(value, fid, p);
                            }
                        }
                    }
                }
            }
        }
        for elt in elts {
            if elt.span.contains(p) {
                return self.lookup_expr(elt, fid, p);
            }
        }
        match ty {
            Some(ty) => self.lookup_expr(ty, fid, p),
            None => Ok(None),
        }
    }

    fn lookup_call(&mut self, func: &Expr, args: &[Expr], fid: FileId, p: u32) -> LookupResult {
        for arg in args {
            if arg.span.contains(p) {
                return self.lookup_expr(arg, fid, p);
            }
        }
        let func = unparen(func);
        match &func.kind {
            ExprKind::Ident(name) => {
                if let Some(lv) = self.local_vars.get(name) {
                    let info = TypeInfo::new(Kind::Var, name, lv.typ.clone())
                        .with_origin(fid, func.span)
                        .with_target(lv.file, lv.span);
                    return Ok(Some((name.clone(), info)));
                }
                if let Some(v) = self.cur().vars.get(name) {
                    let info = TypeInfo::new(Kind::Var, name, v.typ.clone())
                        .with_origin(fid, func.span)
                        .with_target(v.file, v.span);
                    return Ok(Some((name.clone(), info)));
                }
                if let Some(f) = self.cur().functions.get(name) {
                    let info = TypeInfo::new(Kind::Func, name, f.sig.clone())
                        .with_origin(fid, func.span)
                        .with_target(f.file, f.span);
                    return Ok(Some((name.clone(), info)));
                }
                if let Some((file, t)) = self.cur().interfaces.get(name) {
                    let info = TypeInfo::new(Kind::Interface, name, nameless_type_string(t))
                        .with_origin(fid, func.span)
                        .with_target(*file, t.span);
                    return Ok(Some((name.clone(), info)));
                }
                if let Some((file, t)) = self.cur().structs.get(name) {
                    let info = TypeInfo::new(Kind::Struct, name, nameless_type_string(t))
                        .with_origin(fid, func.span)
                        .with_target(*file, t.span);
                    return Ok(Some((name.clone(), info)));
                }
                if let Some((file, t)) = self.cur().types.get(name) {
                    let info = TypeInfo::new(Kind::Type, name, nameless_type_string(t))
                        .with_origin(fid, func.span)
                        .with_target(*file, t.span);
                    return Ok(Some((name.clone(), info)));
                }
                if crate::semantic::types::is_builtin_type(name)
                    || matches!(
                        name.as_str(),
                        "make"
                            | "new"
                            | "append"
                            | "len"
                            | "cap"
                            | "copy"
                            | "complex"
                            | "real"
                            | "imag"
                            | "recover"
                            | "panic"
                            | "print"
                            | "println"
                            | "delete"
                            | "close"
                    )
                {
                    return Ok(Some((
                        name.clone(),
                        TypeInfo::new(Kind::Builtin, name, "").with_origin(fid, func.span),
                    )));
                }
                Err(ResolveError::UnresolvedIdent(name.clone()))
            }
            ExprKind::FuncLit { ty, body } => {
                if body.span.contains(p) {
                    let info = self.lookup_stmt_block(body, fid, p)?;
                    return Ok(info.map(|info| (String::new(), info)));
                }
                let ft_expr = Expr::new(ExprKind::FuncType(ty.clone()), ty.span);
                self.lookup_expr(&ft_expr, fid, p)
            }
            ExprKind::Selector { x, sel } => {
                let x = unparen(x);
                match &x.kind {
                    ExprKind::Ident(base) => {
                        if x.span.contains(p) {
                            return self.lookup_expr(x, fid, p);
                        }
                        let typ = match self.lookup_expr(x, fid, p)? {
                            Some((s, info)) => {
                                if info.typ.is_empty() {
                                    s
                                } else {
                                    info.typ
                                }
                            }
                            None => base.clone(),
                        };
                        let fname = format!("{typ}.{}", sel.name);
                        let typ = typ.trim_start_matches('*').to_string();
                        if let Some(f) = self.cur().functions.get(&fname) {
                            let info =
                                TypeInfo::new(Kind::Method, fname.clone(), func_type_string(&f.ft))
                                    .with_origin(fid, x.span)
                                    .with_target(f.file, f.span);
                            return Ok(Some((fname, info)));
                        }
                        let info = self.lookup_function(&typ, &sel.name)?;
                        Ok(Some((fname, info)))
                    }
                    ExprKind::Selector { x: inner, .. } => {
                        if inner.span.contains(p) {
                            return self.lookup_expr(inner, fid, p);
                        }
                        if x.span.contains(p) {
                            return self.lookup_expr(x, fid, p);
                        }
                        let typ = self.value_type(x, 0)?;
                        let info = self.lookup_function(&typ, &sel.name)?;
                        Ok(Some((format!("{typ}.{}", sel.name), info)))
                    }
                    ExprKind::Call { .. } => {
                        if x.span.contains(p) {
                            return self.lookup_expr(x, fid, p);
                        }
                        let typ = self.value_type(x, 0)?;
                        let info = self.lookup_function(&typ, &sel.name)?;
                        Ok(Some((format!("{typ}.{}", sel.name), info)))
                    }
                    ExprKind::TypeAssert { x: asserted, ty } => {
                        if asserted.span.contains(p) {
                            return self.lookup_expr(asserted, fid, p);
                        }
                        let Some(ty) = ty else { return Ok(None) };
                        let typ = nameless_type_string(ty);
                        let info = self.lookup_function(&typ, &sel.name)?;
                        Ok(Some((format!("{typ}.{}", sel.name), info)))
                    }
                    _ => Err(ResolveError::UnknownCall(expr_string(func))),
                }
            }
            _ => Err(ResolveError::UnknownCall(expr_string(func))),
        }
    }
}

fn unparen(e: &Expr) -> &Expr {
    match &e.kind {
        ExprKind::Paren(inner) => unparen(inner),
        _ => e,
    }
}

fn type_switch_guard_name(assign: &Stmt) -> Option<String> {
    if let StmtKind::Assign { lhs, define, .. } = &assign.kind {
        if *define && lhs.len() == 1 {
            return lhs[0].as_ident().map(str::to_string);
        }
    }
    None
}

/// Key/value element types when ranging over a type string: `[]T` yields
/// (`int`, `T`), `map[K]V` yields (`K`, `V`), `string` yields
/// (`int`, `rune`).
fn range_element_types(typ: &str) -> (String, String) {
    if let Some(elt) = typ.strip_prefix("[]") {
        return ("int".to_string(), elt.to_string());
    }
    if typ == "string" {
        return ("int".to_string(), "rune".to_string());
    }
    if typ.starts_with("map[") {
        if let Some(parsed) = parse_type_str(typ) {
            if let ExprKind::MapType { key, value } = &parsed.kind {
                return (nameless_type_string(key), nameless_type_string(value));
            }
        }
    }
    (String::new(), String::new())
}
