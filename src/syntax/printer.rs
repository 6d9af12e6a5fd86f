//! Canonical single-line rendering of AST nodes.
//!
//! The resolver works on type *strings*; everything it synthesizes comes
//! from here, and [`crate::syntax::parser::parse_type_str`] accepts
//! everything this module can emit.

use crate::syntax::ast::*;

/// Render an expression or type as written, names included.
pub fn expr_string(e: &Expr) -> String {
    match &e.kind {
        ExprKind::BasicLit { value, .. } => value.clone(),
        ExprKind::Ident(name) => name.clone(),
        ExprKind::Selector { x, sel } => format!("{}.{}", expr_string(x), sel.name),
        ExprKind::Call { func, args } => {
            let args: Vec<String> = args.iter().map(expr_string).collect();
            format!("{}({})", expr_string(func), args.join(", "))
        }
        ExprKind::Index { x, index } => format!("{}[{}]", expr_string(x), expr_string(index)),
        ExprKind::Slice { x, low, high } => format!(
            "{}[{}:{}]",
            expr_string(x),
            low.as_deref().map(expr_string).unwrap_or_default(),
            high.as_deref().map(expr_string).unwrap_or_default()
        ),
        ExprKind::Star(x) => format!("*{}", expr_string(x)),
        ExprKind::Unary { op, x } => format!("{}{}", op.as_str(), expr_string(x)),
        ExprKind::Binary { op, x, y } => {
            format!("{} {} {}", expr_string(x), op.as_str(), expr_string(y))
        }
        ExprKind::Paren(x) => format!("({})", expr_string(x)),
        ExprKind::KeyValue { key, value } => {
            format!("{}: {}", expr_string(key), expr_string(value))
        }
        ExprKind::CompositeLit { ty, elts } => {
            let elts: Vec<String> = elts.iter().map(expr_string).collect();
            format!(
                "{}{{{}}}",
                ty.as_deref().map(expr_string).unwrap_or_default(),
                elts.join(", ")
            )
        }
        ExprKind::FuncLit { ty, .. } => func_type_string(ty),
        ExprKind::TypeAssert { x, ty } => match ty {
            Some(ty) => format!("{}.({})", expr_string(x), expr_string(ty)),
            None => format!("{}.(type)", expr_string(x)),
        },
        ExprKind::Ellipsis { elt } => {
            format!("...{}", elt.as_deref().map(expr_string).unwrap_or_default())
        }
        ExprKind::ArrayType { len, elt } => match len {
            Some(len) => format!("[{}]{}", expr_string(len), expr_string(elt)),
            None => format!("[]{}", expr_string(elt)),
        },
        ExprKind::MapType { key, value } => {
            format!("map[{}]{}", expr_string(key), expr_string(value))
        }
        ExprKind::ChanType { dir, elt } => match dir {
            ChanDir::Both => format!("chan {}", expr_string(elt)),
            ChanDir::Send => format!("chan<- {}", expr_string(elt)),
            ChanDir::Recv => format!("<-chan {}", expr_string(elt)),
        },
        ExprKind::FuncType(ft) => func_type_string(ft),
        ExprKind::StructType(st) => struct_string(st),
        ExprKind::InterfaceType(it) => interface_string(it),
    }
}

/// The nameless form used for signatures and feature payloads: function
/// types lose their parameter names, everything else renders as written.
pub fn nameless_type_string(e: &Expr) -> String {
    match &e.kind {
        ExprKind::FuncType(ft) => func_type_string(ft),
        ExprKind::FuncLit { ty, .. } => func_type_string(ty),
        _ => expr_string(e),
    }
}

/// `func` + canonical signature.
pub fn func_type_string(ft: &FuncType) -> String {
    format!("func{}", func_sig_string(ft))
}

/// Canonical signature: `(T1, T2) R` for one result, `(T1) (R1, R2)` for
/// more. Names stripped; a field declaring k names expands to k copies of
/// its type.
pub fn func_sig_string(ft: &FuncType) -> String {
    let mut out = String::from("(");
    out.push_str(&field_types(&ft.params).join(", "));
    out.push(')');
    let results = field_types(&ft.results);
    match results.len() {
        0 => {}
        1 => {
            out.push(' ');
            out.push_str(&results[0]);
        }
        _ => {
            out.push_str(" (");
            out.push_str(&results.join(", "));
            out.push(')');
        }
    }
    out
}

fn field_types(fields: &[Field]) -> Vec<String> {
    let mut out = Vec::new();
    for f in fields {
        let ty = nameless_type_string(&f.ty);
        let copies = f.names.len().max(1);
        for _ in 0..copies {
            out.push(ty.clone());
        }
    }
    out
}

fn struct_string(st: &StructType) -> String {
    if st.fields.is_empty() {
        return "struct{}".into();
    }
    let fields: Vec<String> = st
        .fields
        .iter()
        .map(|f| {
            if f.names.is_empty() {
                expr_string(&f.ty)
            } else {
                let names: Vec<&str> = f.names.iter().map(|n| n.name.as_str()).collect();
                format!("{} {}", names.join(", "), expr_string(&f.ty))
            }
        })
        .collect();
    format!("struct {{ {} }}", fields.join("; "))
}

fn interface_string(it: &InterfaceType) -> String {
    if it.methods.is_empty() {
        return "interface{}".into();
    }
    let methods: Vec<String> = it
        .methods
        .iter()
        .map(|f| match (f.names.first(), &f.ty.kind) {
            (Some(name), ExprKind::FuncType(ft)) => {
                format!("{}{}", name.name, func_sig_string(ft))
            }
            _ => expr_string(&f.ty),
        })
        .collect();
    format!("interface {{ {} }}", methods.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parser::{parse_file, parse_type_str};

    fn type_of(src: &str) -> Expr {
        parse_type_str(src).expect("type parse failed")
    }

    #[test]
    fn test_type_strings_round_trip() {
        for src in [
            "int",
            "*Foo",
            "[]byte",
            "[4]int",
            "map[string]int",
            "chan int",
            "<-chan error",
            "chan<- bool",
            "map[string]func(int) string",
        ] {
            assert_eq!(expr_string(&type_of(src)), src);
        }
    }

    #[test]
    fn test_func_sig_expands_name_groups() {
        let f = parse_file("package p\nfunc F(a, b int, s string) (x, y int) {}\n").unwrap();
        match &f.decls[0].kind {
            crate::syntax::ast::DeclKind::Func(fd) => {
                assert_eq!(func_sig_string(&fd.ty), "(int, int, string) (int, int)");
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_single_result_unparenthesized() {
        let f = parse_file("package p\nfunc F(b []byte) error {}\n").unwrap();
        match &f.decls[0].kind {
            crate::syntax::ast::DeclKind::Func(fd) => {
                assert_eq!(func_sig_string(&fd.ty), "([]byte) error");
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_struct_and_interface_render_single_line() {
        assert_eq!(
            expr_string(&type_of("struct { X int; Y string }")),
            "struct { X int; Y string }"
        );
        assert_eq!(expr_string(&type_of("interface{}")), "interface{}");
    }
}
