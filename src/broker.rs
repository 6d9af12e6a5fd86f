//! The remote-callable `doc` entry: editor integrations send a file,
//! an offset, and a toolchain environment; they get back the entity at
//! that cursor.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::fanout::{run_api, ApiRequest};
use crate::project::context::BuildContext;
use crate::semantic::walker::{CursorRequest, WalkerOptions};

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("no registry entry {0:?}")]
    UnknownEntry(String),
    #[error(transparent)]
    Codec(#[from] serde_json::Error),
}

/// The wire request. `Offset` is a 1-based byte offset into `Fn`;
/// `Src` carries the unsaved buffer when non-empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocRequest {
    #[serde(rename = "Fn")]
    pub file: String,
    #[serde(rename = "Src", default)]
    pub src: String,
    #[serde(rename = "Env", default)]
    pub env: HashMap<String, String>,
    #[serde(rename = "Offset", default)]
    pub offset: u32,
    #[serde(rename = "TabIndent", default)]
    pub tab_indent: bool,
    #[serde(rename = "TabWidth", default)]
    pub tab_width: u32,
}

/// One resolved cursor answer. Row and column are zero-based.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocResult {
    #[serde(rename = "Fn")]
    pub file: String,
    #[serde(rename = "Row")]
    pub row: u32,
    #[serde(rename = "Col")]
    pub col: u32,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Kind")]
    pub kind: String,
}

type EntryFn = fn(serde_json::Value) -> Result<serde_json::Value, BrokerError>;

/// Name → handler table for remote-callable entries.
pub struct Registry {
    entries: HashMap<&'static str, EntryFn>,
}

impl Registry {
    pub fn new() -> Self {
        let mut entries: HashMap<&'static str, EntryFn> = HashMap::new();
        entries.insert("doc", doc_entry);
        Self { entries }
    }

    pub fn call(
        &self,
        name: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, BrokerError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| BrokerError::UnknownEntry(name.to_string()))?;
        entry(params)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

fn doc_entry(params: serde_json::Value) -> Result<serde_json::Value, BrokerError> {
    let req: DocRequest = serde_json::from_value(params)?;
    Ok(serde_json::to_value(resolve_doc(&req))?)
}

/// Resolve a `doc` request: load the file's directory as a package
/// under the request's environment and answer the cursor. Failure to
/// locate is an empty list, never an error.
pub fn resolve_doc(req: &DocRequest) -> Vec<DocResult> {
    let path = Path::new(&req.file);
    let dir = path.parent().unwrap_or(Path::new("."));
    let Some(file_name) = path.file_name().map(|f| f.to_string_lossy().into_owned()) else {
        return Vec::new();
    };

    let env = |key: &str| req.env.get(key).cloned().unwrap_or_default();
    let mut ctx = BuildContext::new(&env("GOOS"), &env("GOARCH"), env("CGO_ENABLED") == "1");
    ctx.goroot = PathBuf::from(env("GOROOT"));
    ctx.gopath = std::env::split_paths(&env("GOPATH")).collect();

    let pkg = dir.to_string_lossy().into_owned();
    let cursor = CursorRequest {
        pkg: pkg.clone(),
        file: file_name,
        offset: req.offset,
        overlay: (!req.src.is_empty()).then(|| req.src.clone()),
    };

    let output = run_api(ApiRequest {
        pkgs: vec![pkg],
        contexts: vec![ctx],
        default_ctx: false,
        opts: WalkerOptions::default(),
        cursor: Some(cursor),
    });

    match output.cursor {
        Some(hit) => vec![DocResult {
            file: hit.path.to_string_lossy().into_owned(),
            row: hit.pos.line,
            col: hit.pos.col,
            name: hit.info.name.clone(),
            kind: hit.info.kind.as_str().to_string(),
        }],
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_decodes_wire_names() {
        let req: DocRequest = serde_json::from_str(
            r#"{"Fn":"/src/p/a.go","Src":"","Env":{"GOROOT":"/goroot"},"Offset":12,"TabIndent":true,"TabWidth":4}"#,
        )
        .unwrap();
        assert_eq!(req.file, "/src/p/a.go");
        assert_eq!(req.offset, 12);
        assert!(req.tab_indent);
        assert_eq!(req.env.get("GOROOT").map(String::as_str), Some("/goroot"));
    }

    #[test]
    fn test_result_encodes_wire_names() {
        let doc = DocResult {
            file: "a.go".into(),
            row: 3,
            col: 7,
            name: "K".into(),
            kind: "const".into(),
        };
        let v = serde_json::to_value(&doc).unwrap();
        assert_eq!(v["Fn"], "a.go");
        assert_eq!(v["Row"], 3);
        assert_eq!(v["Kind"], "const");
    }

    #[test]
    fn test_registry_rejects_unknown_entry() {
        let reg = Registry::new();
        assert!(matches!(
            reg.call("fmt", serde_json::Value::Null),
            Err(BrokerError::UnknownEntry(_))
        ));
    }
}
