//! Feature extraction over real package trees: declaration payloads,
//! interface expansion, constant resolution, cross-package types, and
//! the invariants the feature map must keep.

mod common;

use common::{walker, write_pkg};

fn features_of(files: &[(&str, &str)]) -> Vec<String> {
    let tmp = tempfile::tempdir().unwrap();
    write_pkg(tmp.path(), "p", files);
    let mut w = walker(tmp.path());
    w.add_wanted("p");
    w.walk_package("p");
    w.features()
}

#[test]
fn test_single_constant_feature() {
    let features = features_of(&[("p.go", "package p\nconst K = 1\n")]);
    assert_eq!(features, vec!["pkg p, const K ideal-int"]);
}

#[test]
fn test_struct_fields_each_get_a_feature() {
    let features = features_of(&[("p.go", "package p\ntype A struct {\n\tX int\n\tY string\n}\n")]);
    assert_eq!(
        features,
        vec![
            "pkg p, type A struct",
            "pkg p, type A struct, X int",
            "pkg p, type A struct, Y string",
        ]
    );
}

#[test]
fn test_interface_methods_and_name_list() {
    let features = features_of(&[(
        "p.go",
        "package p\ntype R interface {\n\tRead([]byte) (int, error)\n}\n",
    )]);
    assert!(features.contains(&"pkg p, type R interface, Read([]byte) (int, error)".to_string()));
    assert!(features.contains(&"pkg p, type R interface { Read }".to_string()));
}

#[test]
fn test_unexported_interface_method_hides_name_list() {
    let features = features_of(&[(
        "p.go",
        "package p\ntype R interface {\n\tRead()\n\tprivate()\n}\n",
    )]);
    assert!(features.contains(&"pkg p, type R interface, unexported methods".to_string()));
    assert!(!features.iter().any(|f| f.contains("interface {")));
    // The exported method is still listed individually.
    assert!(features.contains(&"pkg p, type R interface, Read()".to_string()));
}

#[test]
fn test_embedded_error_contributes_error_method() {
    let features = features_of(&[(
        "p.go",
        "package p\ntype E interface {\n\terror\n\tCode() int\n}\n",
    )]);
    assert!(features.contains(&"pkg p, type E interface, Error() string".to_string()));
    assert!(features.contains(&"pkg p, type E interface { Code, Error }".to_string()));
}

#[test]
fn test_vars_funcs_and_methods() {
    let features = features_of(&[(
        "p.go",
        "package p\n\
         type T struct{}\n\
         var V int\n\
         func F(a, b int) string { return \"\" }\n\
         func (t *T) Close() error { return nil }\n\
         func hidden() {}\n",
    )]);
    assert!(features.contains(&"pkg p, type T struct".to_string()));
    assert!(features.contains(&"pkg p, var V int".to_string()));
    assert!(features.contains(&"pkg p, func F(int, int) string".to_string()));
    assert!(features.contains(&"pkg p, method (*T) Close() error".to_string()));
    assert!(!features.iter().any(|f| f.contains("hidden")));
}

#[test]
fn test_struct_embedding_features() {
    let features = features_of(&[(
        "p.go",
        "package p\ntype B struct{}\ntype A struct {\n\tB\n\t*B\n}\n",
    )]);
    assert!(features.contains(&"pkg p, type A struct, embedded B".to_string()));
    assert!(features.contains(&"pkg p, type A struct, embedded *B".to_string()));
}

#[test]
fn test_promoted_methods_through_embedding() {
    let features = features_of(&[(
        "p.go",
        "package p\n\
         type Inner struct{}\n\
         func (i Inner) M() int { return 0 }\n\
         type Outer struct {\n\tInner\n}\n",
    )]);
    assert!(features.contains(&"pkg p, method (Inner) M() int".to_string()));
    assert!(features.contains(&"pkg p, method (Outer) M() int".to_string()));
}

#[test]
fn test_constant_type_propagates_through_block() {
    let features = features_of(&[(
        "p.go",
        "package p\nconst (\n\tA = 1.5\n\tB\n\tC = \"s\"\n)\n",
    )]);
    assert!(features.contains(&"pkg p, const A ideal-float".to_string()));
    assert!(features.contains(&"pkg p, const B ideal-float".to_string()));
    assert!(features.contains(&"pkg p, const C ideal-string".to_string()));
}

#[test]
fn test_constant_dependency_resolves_forward() {
    let features = features_of(&[("p.go", "package p\nconst A = B\nconst B = 2\n")]);
    assert!(features.contains(&"pkg p, const A ideal-int".to_string()));
    assert!(features.contains(&"pkg p, const B ideal-int".to_string()));
}

#[test]
fn test_constant_dependency_cycle_terminates_unresolved() {
    let features = features_of(&[("p.go", "package p\nconst C = D\nconst D = C\n")]);
    assert!(!features.iter().any(|f| f.contains("const C")));
    assert!(!features.iter().any(|f| f.contains("const D")));
}

#[test]
fn test_mixed_constant_expression_promotes() {
    let features = features_of(&[("p.go", "package p\nconst X = 1 + 2.5\n")]);
    assert!(features.contains(&"pkg p, const X ideal-float".to_string()));
}

#[test]
fn test_iota_is_ideal_int() {
    let features = features_of(&[("p.go", "package p\nconst (\n\tA = iota\n\tB\n)\n")]);
    assert!(features.contains(&"pkg p, const A ideal-int".to_string()));
    assert!(features.contains(&"pkg p, const B ideal-int".to_string()));
}

#[test]
fn test_cross_package_variable_type() {
    let tmp = tempfile::tempdir().unwrap();
    write_pkg(tmp.path(), "q", &[("q.go", "package q\ntype T struct{ X int }\n")]);
    write_pkg(
        tmp.path(),
        "p",
        &[("p.go", "package p\n\nimport \"q\"\n\nvar V q.T\n")],
    );
    let mut w = walker(tmp.path());
    w.add_wanted("p");
    w.walk_package("p");
    let features = w.features();
    assert!(features.contains(&"pkg p, var V q.T".to_string()));
    // Dependencies are loaded but contribute no features.
    assert!(!features.iter().any(|f| f.starts_with("pkg q")));
}

#[test]
fn test_cross_package_interface_embedding() {
    let tmp = tempfile::tempdir().unwrap();
    write_pkg(tmp.path(), "q", &[("q.go", "package q\ntype R interface {\n\tRead()\n}\n")]);
    write_pkg(
        tmp.path(),
        "p",
        &[(
            "p.go",
            "package p\n\nimport \"q\"\n\ntype RW interface {\n\tq.R\n\tWrite()\n}\n",
        )],
    );
    let mut w = walker(tmp.path());
    w.add_wanted("p");
    w.walk_package("p");
    let features = w.features();
    assert!(features.contains(&"pkg p, type RW interface { Read, Write }".to_string()));
    assert!(features.contains(&"pkg p, type RW interface, Read()".to_string()));
}

#[test]
fn test_reload_is_idempotent() {
    let tmp = tempfile::tempdir().unwrap();
    write_pkg(tmp.path(), "p", &[("p.go", "package p\nvar V int\nconst K = 1\n")]);
    let mut w = walker(tmp.path());
    w.add_wanted("p");
    w.walk_package("p");
    let first = w.features();
    w.walk_package("p");
    assert_eq!(first, w.features());
}

#[test]
fn test_features_sorted_and_unique() {
    let features = features_of(&[
        ("a.go", "package p\nvar B int\nvar A int\n"),
        ("b.go", "package p\nvar C int\n"),
    ]);
    let mut sorted = features.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(features, sorted);
}

#[test]
fn test_import_cycle_does_not_hang() {
    let tmp = tempfile::tempdir().unwrap();
    write_pkg(tmp.path(), "a", &[("a.go", "package a\n\nimport \"b\"\n\nvar A b.T\n")]);
    write_pkg(tmp.path(), "b", &[("b.go", "package b\n\nimport \"a\"\n\ntype T struct{}\n")]);
    let mut w = walker(tmp.path());
    w.add_wanted("a");
    w.walk_package("a");
    assert!(w.features().contains(&"pkg a, var A b.T".to_string()));
}

#[test]
fn test_parse_error_skips_file_not_package() {
    let features = features_of(&[
        ("good.go", "package p\nvar V int\n"),
        ("bad.go", "package p\nfunc {\n"),
    ]);
    assert!(features.contains(&"pkg p, var V int".to_string()));
}

#[test]
fn test_all_decls_includes_unexported() {
    let tmp = tempfile::tempdir().unwrap();
    write_pkg(tmp.path(), "p", &[("p.go", "package p\nvar hidden int\n")]);
    let mut opts = goscope::semantic::walker::WalkerOptions::default();
    opts.all_decls = true;
    let mut w = goscope::semantic::walker::Walker::new(common::linux_context(tmp.path()), opts);
    w.add_wanted("p");
    w.walk_package("p");
    assert!(w.features().contains(&"pkg p, var hidden int".to_string()));
}

#[test]
fn test_show_pos_appends_offset() {
    let tmp = tempfile::tempdir().unwrap();
    write_pkg(tmp.path(), "p", &[("p.go", "package p\nvar V int\n")]);
    let mut opts = goscope::semantic::walker::WalkerOptions::default();
    opts.show_pos = true;
    let mut w = goscope::semantic::walker::Walker::new(common::linux_context(tmp.path()), opts);
    w.add_wanted("p");
    w.walk_package("p");
    let features = w.features();
    assert_eq!(features.len(), 1);
    // `var V int` starts at offset 10; the V identifier at 14.
    assert_eq!(features[0], "pkg p, var V int, 14");
}

#[test]
fn test_context_fanout_merges_uniform_features() {
    use goscope::api::{run_api, ApiRequest};
    use goscope::project::context::BuildContext;
    use goscope::semantic::walker::WalkerOptions;

    let tmp = tempfile::tempdir().unwrap();
    write_pkg(
        tmp.path(),
        "p",
        &[
            ("p.go", "package p\nvar F int\n"),
            ("g_windows.go", "package p\nvar G int\n"),
        ],
    );
    let mut linux = BuildContext::new("linux", "amd64", false);
    linux.goroot = tmp.path().to_path_buf();
    let mut windows = BuildContext::new("windows", "amd64", false);
    windows.goroot = tmp.path().to_path_buf();

    let out = run_api(ApiRequest {
        pkgs: vec!["p".into()],
        contexts: vec![linux, windows],
        default_ctx: false,
        opts: WalkerOptions::default(),
        cursor: None,
    });
    assert_eq!(
        out.features,
        vec![
            "pkg p (windows-amd64), var G int",
            "pkg p, var F int",
        ]
    );
}
