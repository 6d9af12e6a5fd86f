//! End-to-end `doc` broker requests against a temp source tree.

mod common;

use std::collections::HashMap;

use goscope::broker::{resolve_doc, DocRequest, Registry};

fn env_for(root: &std::path::Path) -> HashMap<String, String> {
    HashMap::from([
        ("GOROOT".to_string(), root.to_string_lossy().into_owned()),
        ("GOPATH".to_string(), String::new()),
        ("GOOS".to_string(), "linux".to_string()),
        ("GOARCH".to_string(), "amd64".to_string()),
        ("CGO_ENABLED".to_string(), "0".to_string()),
    ])
}

#[test]
fn test_doc_request_resolves_constant() {
    let tmp = tempfile::tempdir().unwrap();
    let src = "package p\nconst K = 42\n";
    common::write_pkg(tmp.path(), "p", &[("p.go", src)]);
    let file = tmp.path().join("src/p/p.go");

    let req = DocRequest {
        file: file.to_string_lossy().into_owned(),
        src: String::new(),
        env: env_for(tmp.path()),
        offset: common::offset_of(src, "K", 0),
        tab_indent: false,
        tab_width: 0,
    };
    let results = resolve_doc(&req);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].kind, "const");
    assert_eq!(results[0].name, "K");
    // Zero-based row/col of the defining identifier.
    assert_eq!(results[0].row, 1);
    assert_eq!(results[0].col, 6);
}

#[test]
fn test_doc_request_with_source_overlay() {
    let tmp = tempfile::tempdir().unwrap();
    common::write_pkg(tmp.path(), "p", &[("p.go", "package p\nconst K = 1\n")]);
    let file = tmp.path().join("src/p/p.go");
    let overlay = "package p\nvar W = \"s\"\nconst K = 1\n";

    let req = DocRequest {
        file: file.to_string_lossy().into_owned(),
        src: overlay.to_string(),
        env: env_for(tmp.path()),
        offset: common::offset_of(overlay, "W", 0),
        tab_indent: false,
        tab_width: 0,
    };
    let results = resolve_doc(&req);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].kind, "var");
    assert_eq!(results[0].name, "W");
}

#[test]
fn test_doc_request_miss_is_empty_not_error() {
    let tmp = tempfile::tempdir().unwrap();
    common::write_pkg(tmp.path(), "p", &[("p.go", "package p\nvar V int\n")]);
    let file = tmp.path().join("src/p/p.go");

    let req = DocRequest {
        file: file.to_string_lossy().into_owned(),
        src: String::new(),
        env: env_for(tmp.path()),
        offset: 9999,
        tab_indent: false,
        tab_width: 0,
    };
    assert!(resolve_doc(&req).is_empty());
}

#[test]
fn test_registry_round_trip_through_json() {
    let tmp = tempfile::tempdir().unwrap();
    let src = "package p\nconst K = 42\n";
    common::write_pkg(tmp.path(), "p", &[("p.go", src)]);
    let file = tmp.path().join("src/p/p.go");

    let params = serde_json::json!({
        "Fn": file.to_string_lossy(),
        "Src": "",
        "Env": env_for(tmp.path()),
        "Offset": common::offset_of(src, "K", 0),
        "TabIndent": true,
        "TabWidth": 4,
    });
    let reply = Registry::new().call("doc", params).unwrap();
    assert_eq!(reply[0]["Kind"], "const");
    assert_eq!(reply[0]["Name"], "K");
}
