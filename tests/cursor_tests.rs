//! Cursor resolution over real package trees: kinds, resolved types,
//! and defining positions.

mod common;

use common::{offset_of, walker, write_pkg};
use goscope::ide::Kind;
use goscope::semantic::walker::CursorRequest;
use goscope::TypeInfo;

fn resolve(src: &str, needle: &str, delta: usize) -> Option<TypeInfo> {
    resolve_files(&[("p.go", src)], src, needle, delta)
}

fn resolve_files(
    files: &[(&str, &str)],
    cursor_src: &str,
    needle: &str,
    delta: usize,
) -> Option<TypeInfo> {
    let tmp = tempfile::tempdir().unwrap();
    write_pkg(tmp.path(), "p", files);
    let cursor_file = files
        .iter()
        .find(|(_, src)| *src == cursor_src)
        .map(|(name, _)| name.to_string())
        .expect("cursor source not among files");
    let mut w = walker(tmp.path());
    w.add_wanted("p");
    w.set_cursor(CursorRequest {
        pkg: "p".into(),
        file: cursor_file,
        offset: offset_of(cursor_src, needle, delta),
        overlay: None,
    });
    w.walk_package("p");
    w.cursor_result().cloned()
}

#[test]
fn test_cursor_on_constant_name() {
    let src = "package p\nconst K = 42\n";
    let info = resolve(src, "K", 0).expect("no cursor answer");
    assert_eq!(info.kind, Kind::Const);
    assert_eq!(info.name, "K");
    assert_eq!(info.typ, "ideal-int");
}

#[test]
fn test_cursor_on_struct_field_selector() {
    let src = "package p\n\
               type T struct{ X int }\n\
               var v T\n\
               func f() {\n\t_ = v.X\n}\n";
    let info = resolve(src, "v.X", 2).expect("no cursor answer");
    assert_eq!(info.kind, Kind::Field);
    assert_eq!(info.name, "T.X");
    assert_eq!(info.typ, "int");
}

#[test]
fn test_cursor_on_pointer_receiver_method_call() {
    let src = "package p\n\
               type T struct{}\n\
               func (t *T) M() {}\n\
               func f() {\n\tvar v T\n\tv.M()\n}\n";
    let info = resolve(src, "v.M", 2).expect("no cursor answer");
    assert_eq!(info.kind, Kind::Method);
    assert_eq!(info.name, "T.M");
}

#[test]
fn test_cursor_on_short_var_decl_tracks_rhs_type() {
    let src = "package p\n\
               func g() string { return \"\" }\n\
               func f() {\n\ts := g()\n\t_ = s\n}\n";
    let info = resolve(src, "_ = s", 4).expect("no cursor answer");
    assert_eq!(info.kind, Kind::Var);
    assert_eq!(info.typ, "string");
}

#[test]
fn test_cursor_on_range_value_variable() {
    let src = "package p\n\
               func f(xs []int) {\n\tfor i, x := range xs {\n\t\t_ = i\n\t\t_ = x\n\t}\n}\n";
    let info = resolve(src, "_ = x", 4).expect("no cursor answer");
    assert_eq!(info.kind, Kind::Var);
    assert_eq!(info.typ, "int");

    let info = resolve(src, "_ = i", 4).expect("no cursor answer");
    assert_eq!(info.typ, "int");
}

#[test]
fn test_cursor_on_map_range_value() {
    let src = "package p\n\
               func f(m map[string]bool) {\n\tfor k, v := range m {\n\t\t_ = k\n\t\t_ = v\n\t}\n}\n";
    let info = resolve(src, "_ = k", 4).expect("no cursor answer");
    assert_eq!(info.typ, "string");
    let info = resolve(src, "_ = v", 4).expect("no cursor answer");
    assert_eq!(info.typ, "bool");
}

#[test]
fn test_cursor_in_type_switch_case_takes_case_type() {
    let src = "package p\n\
               func f(v interface{}) {\n\
               \tswitch t := v.(type) {\n\
               \tcase int:\n\t\t_ = t\n\
               \tcase string:\n\t\ts := t\n\t\t_ = s\n\
               \t}\n}\n";
    let info = resolve(src, "_ = t", 4).expect("no cursor answer");
    assert_eq!(info.typ, "int");
    let info = resolve(src, "_ = s", 4).expect("no cursor answer");
    assert_eq!(info.typ, "string");
}

#[test]
fn test_cursor_on_import_path() {
    let tmp = tempfile::tempdir().unwrap();
    write_pkg(tmp.path(), "q", &[("q.go", "package q\nvar V int\n")]);
    let src = "package p\n\nimport \"q\"\n\nvar X q.T\n";
    write_pkg(tmp.path(), "p", &[("p.go", src)]);
    let mut w = walker(tmp.path());
    w.add_wanted("p");
    w.set_cursor(CursorRequest {
        pkg: "p".into(),
        file: "p.go".into(),
        offset: offset_of(src, "\"q\"", 1),
        overlay: None,
    });
    w.walk_package("p");
    let info = w.cursor_result().expect("no cursor answer");
    assert_eq!(info.kind, Kind::Import);
    assert_eq!(info.name, "q");
    assert_eq!(info.typ, "q");
    assert!(info.target.is_some());
}

#[test]
fn test_cursor_on_function_parameter_name() {
    let src = "package p\nfunc F(count int) {}\n";
    let info = resolve(src, "count", 0).expect("no cursor answer");
    assert_eq!(info.kind, Kind::Param);
    assert_eq!(info.name, "count");
    assert_eq!(info.typ, "int");
}

#[test]
fn test_cursor_on_package_function_call() {
    let src = "package p\n\
               func G(a int) error { return nil }\n\
               func f() {\n\tG(1)\n}\n";
    let info = resolve(src, "G(1)", 0).expect("no cursor answer");
    assert_eq!(info.kind, Kind::Func);
    assert_eq!(info.name, "G");
}

#[test]
fn test_cursor_on_cross_package_selector() {
    let tmp = tempfile::tempdir().unwrap();
    write_pkg(tmp.path(), "q", &[("q.go", "package q\nfunc F() int { return 0 }\n")]);
    let src = "package p\n\nimport \"q\"\n\nvar V = q.F()\n";
    write_pkg(tmp.path(), "p", &[("p.go", src)]);
    let mut w = walker(tmp.path());
    w.add_wanted("p");
    w.set_cursor(CursorRequest {
        pkg: "p".into(),
        file: "p.go".into(),
        offset: offset_of(src, "q.F", 2),
        overlay: None,
    });
    w.walk_package("p");
    let info = w.cursor_result().expect("no cursor answer");
    assert_eq!(info.kind, Kind::Func);
    assert_eq!(info.name, "q.F");
}

#[test]
fn test_cursor_resolution_uses_overlay_content() {
    let tmp = tempfile::tempdir().unwrap();
    write_pkg(tmp.path(), "p", &[("p.go", "package p\nconst K = 1\n")]);
    // The editor buffer has a different declaration at the cursor.
    let overlay = "package p\nvar K = \"s\"\n";
    let mut w = walker(tmp.path());
    w.add_wanted("p");
    w.set_cursor(CursorRequest {
        pkg: "p".into(),
        file: "p.go".into(),
        offset: offset_of(overlay, "K", 0),
        overlay: Some(overlay.to_string()),
    });
    w.walk_package("p");
    let info = w.cursor_result().expect("no cursor answer");
    assert_eq!(info.kind, Kind::Var);
    assert_eq!(info.typ, "string");
}

#[test]
fn test_cursor_in_test_file_loads_test_sources() {
    let tmp = tempfile::tempdir().unwrap();
    let test_src = "package p\n\nvar probe = V\n";
    write_pkg(
        tmp.path(),
        "p",
        &[
            ("p.go", "package p\nvar V int\n"),
            ("p_test.go", test_src),
        ],
    );
    let mut w = walker(tmp.path());
    w.add_wanted("p");
    w.set_cursor(CursorRequest {
        pkg: "p".into(),
        file: "p_test.go".into(),
        offset: offset_of(test_src, "= V", 2),
        overlay: None,
    });
    w.walk_package("p");
    let info = w.cursor_result().expect("no cursor answer");
    assert_eq!(info.kind, Kind::Var);
    assert_eq!(info.name, "V");
    assert_eq!(info.typ, "int");
}

#[test]
fn test_cursor_out_of_range_is_empty_result() {
    let tmp = tempfile::tempdir().unwrap();
    write_pkg(tmp.path(), "p", &[("p.go", "package p\nvar V int\n")]);
    let mut w = walker(tmp.path());
    w.add_wanted("p");
    w.set_cursor(CursorRequest {
        pkg: "p".into(),
        file: "p.go".into(),
        offset: 10_000,
        overlay: None,
    });
    w.walk_package("p");
    assert!(w.cursor_result().is_none());
}

#[test]
fn test_defining_position_points_at_declaration() {
    let src = "package p\nconst K = 42\n";
    let info = resolve(src, "K", 0).expect("no cursor answer");
    let (file, span) = info.target.expect("no defining node");
    // The defining node is the K identifier itself, at byte 16.
    assert_eq!(span.start, 16);
    let _ = file;
}
