//! The per-package declaration index.
//!
//! A `Package` is populated once during its load pass and read-only
//! afterwards. Cross-package references go through the walker's
//! short-name table, never through direct links between packages.

use std::path::PathBuf;

use indexmap::IndexMap;

use crate::base::{FileId, Span};
use crate::syntax::ast::{Expr, ExprKind, FuncType};
use crate::syntax::printer;

/// A resolved type string plus the position of the defining node.
#[derive(Debug, Clone)]
pub struct ExprType {
    pub typ: String,
    pub file: FileId,
    pub span: Span,
}

/// A pre-registered function or method signature. Methods are keyed as
/// `Recv.Name` so one function's body can call another declared later.
#[derive(Debug, Clone)]
pub struct MethodSig {
    pub name: String,
    /// Canonical signature, `([]byte) (int, error)` style.
    pub sig: String,
    pub ft: FuncType,
    pub file: FileId,
    pub span: Span,
    /// Receiver type expression for methods.
    pub recv: Option<Expr>,
}

/// One parsed file belonging to the package.
pub struct ParsedFile {
    pub id: FileId,
    pub file_name: String,
    pub ast: crate::syntax::ast::File,
}

/// A declaration found by one of the selector/call accessors: where it
/// was defined and the type string it contributes.
#[derive(Debug, Clone)]
pub struct FoundDecl {
    pub file: FileId,
    pub span: Span,
    pub typ: String,
}

pub struct Package {
    /// The name the package was requested under: its import path, or
    /// the declared identifier for local-directory loads.
    pub name: String,
    pub dir: PathBuf,
    pub deps: Vec<String>,
    pub files: Vec<std::sync::Arc<ParsedFile>>,
    /// Type name → interface type expression.
    pub interfaces: IndexMap<String, (FileId, Expr)>,
    /// Type name → struct type expression.
    pub structs: IndexMap<String, (FileId, Expr)>,
    /// Any other named type → its definition expression.
    pub types: IndexMap<String, (FileId, Expr)>,
    /// `Name` or `Recv.Name` → signature.
    pub functions: IndexMap<String, MethodSig>,
    /// Interface name → flattened method list after embedding expansion.
    pub interface_methods: IndexMap<String, Vec<MethodSig>>,
    pub consts: IndexMap<String, ExprType>,
    pub vars: IndexMap<String, ExprType>,
    /// Feature string → first-seen position.
    pub features: IndexMap<String, (FileId, u32)>,
    pub sep: String,
}

impl Package {
    pub fn new(name: &str, dir: PathBuf, sep: &str) -> Self {
        Self {
            name: name.to_string(),
            dir,
            deps: Vec::new(),
            files: Vec::new(),
            interfaces: IndexMap::new(),
            structs: IndexMap::new(),
            types: IndexMap::new(),
            functions: IndexMap::new(),
            interface_methods: IndexMap::new(),
            consts: IndexMap::new(),
            vars: IndexMap::new(),
            features: IndexMap::new(),
            sep: sep.to_string(),
        }
    }

    /// Sorted feature list; with `show_pos` each line gets the defining
    /// byte offset appended.
    pub fn feature_list(&self, show_pos: bool) -> Vec<String> {
        let mut out: Vec<String> = self
            .features
            .iter()
            .map(|(f, (_, offset))| {
                if show_pos {
                    format!("{}{}{}", f, self.sep, offset)
                } else {
                    f.clone()
                }
            })
            .collect();
        out.sort();
        out
    }

    /// Look up a named type: interfaces, then structs, then the rest.
    pub fn find_type(&self, name: &str) -> Option<&(FileId, Expr)> {
        self.interfaces
            .get(name)
            .or_else(|| self.structs.get(name))
            .or_else(|| self.types.get(name))
    }

    /// Resolve a selector against this package's exported names, the
    /// way `pkg.Sel` reads from outside: vars, consts, functions, then
    /// type names.
    pub fn find_selector_type(&self, name: &str) -> Option<FoundDecl> {
        if let Some(et) = self.vars.get(name).or_else(|| self.consts.get(name)) {
            return Some(FoundDecl {
                file: et.file,
                span: et.span,
                typ: et.typ.clone(),
            });
        }
        if let Some(f) = self.functions.get(name) {
            return Some(FoundDecl {
                file: f.file,
                span: f.span,
                typ: printer::func_type_string(&f.ft),
            });
        }
        if let Some((file, e)) = self.structs.get(name).or_else(|| self.interfaces.get(name)) {
            return Some(FoundDecl {
                file: *file,
                span: e.span,
                typ: name.to_string(),
            });
        }
        if let Some((file, e)) = self.types.get(name) {
            return Some(FoundDecl {
                file: *file,
                span: e.span,
                typ: printer::expr_string(e),
            });
        }
        None
    }

    /// Resolve `name` when it is being called: a function value, or a
    /// type used as a conversion.
    pub fn find_call_func(&self, name: &str) -> Option<FoundDecl> {
        if let Some(f) = self.functions.get(name) {
            return Some(FoundDecl {
                file: f.file,
                span: f.span,
                typ: printer::func_type_string(&f.ft),
            });
        }
        if let Some((file, e)) = self.structs.get(name).or_else(|| self.types.get(name)) {
            return Some(FoundDecl {
                file: *file,
                span: e.span,
                typ: printer::expr_string(e),
            });
        }
        if let Some(et) = self.vars.get(name) {
            if et.typ.starts_with("func(") {
                return Some(FoundDecl {
                    file: et.file,
                    span: et.span,
                    typ: et.typ.clone(),
                });
            }
        }
        None
    }

    /// The type produced by calling `name`: the `index`-th result for a
    /// function, the type itself for a conversion.
    pub fn find_call_type(&self, name: &str, index: usize) -> Option<FoundDecl> {
        if let Some(f) = self.functions.get(name) {
            let ret = func_ret_type(&f.ft, index)?;
            return Some(FoundDecl {
                file: f.file,
                span: ret.span,
                typ: printer::nameless_type_string(ret),
            });
        }
        if let Some((file, e)) = self.structs.get(name).or_else(|| self.types.get(name)) {
            return Some(FoundDecl {
                file: *file,
                span: e.span,
                typ: name.to_string(),
            });
        }
        None
    }

    /// Find a method on a named type: interface bodies first (declared
    /// and embedding-expanded), then the function table.
    pub fn find_method(&self, typ: &str, name: &str) -> Option<(FoundDecl, FuncType)> {
        if let Some((file, e)) = self.interfaces.get(typ) {
            if let ExprKind::InterfaceType(it) = &e.kind {
                for field in &it.methods {
                    if let ExprKind::FuncType(ft) = &field.ty.kind {
                        for ident in &field.names {
                            if ident.name == name {
                                return Some((
                                    FoundDecl {
                                        file: *file,
                                        span: ident.span,
                                        typ: printer::func_type_string(ft),
                                    },
                                    ft.clone(),
                                ));
                            }
                        }
                    }
                }
            }
        }
        if let Some(methods) = self.interface_methods.get(typ) {
            for m in methods {
                if m.name == name {
                    return Some((
                        FoundDecl {
                            file: m.file,
                            span: m.span,
                            typ: printer::func_type_string(&m.ft),
                        },
                        m.ft.clone(),
                    ));
                }
            }
        }
        let key = format!("{typ}.{name}");
        self.functions.get(&key).map(|f| {
            (
                FoundDecl {
                    file: f.file,
                    span: f.span,
                    typ: printer::func_type_string(&f.ft),
                },
                f.ft.clone(),
            )
        })
    }
}

/// The `index`-th result type of a signature, name groups expanded.
pub fn func_ret_type(ft: &FuncType, index: usize) -> Option<&Expr> {
    let mut pos = 0;
    for field in &ft.results {
        let copies = field.names.len().max(1);
        if index < pos + copies {
            return Some(&field.ty);
        }
        pos += copies;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parser::parse_file;

    fn sample_package() -> Package {
        let src = "package p\n\
                   type S struct { X int }\n\
                   type I interface { M() int }\n\
                   type N []byte\n\
                   func F(a int) (int, error) { return a, nil }\n";
        let file = parse_file(src).unwrap();
        let mut p = Package::new("p", PathBuf::new(), ", ");
        let id = FileId::new(0);
        for decl in &file.decls {
            match &decl.kind {
                crate::syntax::ast::DeclKind::Type(specs) => {
                    for ts in specs {
                        match &ts.ty.kind {
                            ExprKind::StructType(_) => {
                                p.structs.insert(ts.name.name.clone(), (id, ts.ty.clone()));
                            }
                            ExprKind::InterfaceType(_) => {
                                p.interfaces.insert(ts.name.name.clone(), (id, ts.ty.clone()));
                            }
                            _ => {
                                p.types.insert(ts.name.name.clone(), (id, ts.ty.clone()));
                            }
                        }
                    }
                }
                crate::syntax::ast::DeclKind::Func(fd) => {
                    p.functions.insert(
                        fd.name.name.clone(),
                        MethodSig {
                            name: fd.name.name.clone(),
                            sig: printer::func_sig_string(&fd.ty),
                            ft: fd.ty.clone(),
                            file: id,
                            span: fd.name.span,
                            recv: None,
                        },
                    );
                }
                _ => {}
            }
        }
        p
    }

    #[test]
    fn test_find_type_order() {
        let p = sample_package();
        assert!(p.find_type("S").is_some());
        assert!(p.find_type("I").is_some());
        assert!(p.find_type("N").is_some());
        assert!(p.find_type("Missing").is_none());
    }

    #[test]
    fn test_find_call_type_indexes_results() {
        let p = sample_package();
        assert_eq!(p.find_call_type("F", 0).unwrap().typ, "int");
        assert_eq!(p.find_call_type("F", 1).unwrap().typ, "error");
        assert!(p.find_call_type("F", 2).is_none());
        // Conversion through a named type.
        assert_eq!(p.find_call_type("N", 0).unwrap().typ, "N");
    }

    #[test]
    fn test_find_method_in_interface_body() {
        let p = sample_package();
        let (decl, ft) = p.find_method("I", "M").unwrap();
        assert_eq!(decl.typ, "func() int");
        assert_eq!(printer::func_sig_string(&ft), "() int");
    }

    #[test]
    fn test_feature_list_sorted_with_positions() {
        let mut p = sample_package();
        p.features
            .insert("pkg p, var B int".into(), (FileId::new(0), 20));
        p.features
            .insert("pkg p, var A int".into(), (FileId::new(0), 10));
        assert_eq!(
            p.feature_list(false),
            vec!["pkg p, var A int", "pkg p, var B int"]
        );
        assert_eq!(
            p.feature_list(true),
            vec!["pkg p, var A int, 10", "pkg p, var B int, 20"]
        );
    }
}
