//! Build-context fan-out: drive the loader over a context list and
//! merge per-context feature sets, annotating only what differs.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::base::Pos;
use crate::ide::TypeInfo;
use crate::project::context::BuildContext;
use crate::semantic::walker::{CursorRequest, Walker, WalkerOptions};

/// One API or cursor request.
pub struct ApiRequest {
    /// Import paths or local directories to report on.
    pub pkgs: Vec<String>,
    /// Contexts to scan; empty means the default list.
    pub contexts: Vec<BuildContext>,
    /// Use the host's context alone instead of fanning out.
    pub default_ctx: bool,
    pub opts: WalkerOptions,
    pub cursor: Option<CursorRequest>,
}

/// Where a cursor resolved to.
pub struct CursorHit {
    pub path: PathBuf,
    pub pos: Pos,
    pub info: TypeInfo,
}

pub struct ApiOutput {
    pub features: Vec<String>,
    pub cursor: Option<CursorHit>,
}

/// Run a request to completion. Cursor requests stop at the first
/// context that produces an answer; feature requests merge all of them.
pub fn run_api(req: ApiRequest) -> ApiOutput {
    let mut walker = Walker::new(BuildContext::host_default(), req.opts);
    for pkg in &req.pkgs {
        walker.add_wanted(pkg);
    }
    if let Some(cursor) = req.cursor {
        walker.set_cursor(cursor);
    }

    if req.default_ctx {
        walker.set_context(BuildContext::host_default(), false);
        for pkg in &req.pkgs {
            walker.walk_package(pkg);
        }
        let features = walker.features();
        let cursor = take_cursor_hit(&walker);
        return ApiOutput { features, cursor };
    }

    let contexts = if req.contexts.is_empty() {
        BuildContext::default_contexts()
    } else {
        req.contexts
    };
    let mut labels: Vec<String> = Vec::new();
    for ctx in contexts {
        let ctx = if ctx.goroot.as_os_str().is_empty() && ctx.gopath.is_empty() {
            ctx.with_env_roots()
        } else {
            ctx
        };
        labels.push(ctx.label());
        walker.set_context(ctx, true);
        for pkg in req.pkgs.clone() {
            walker.walk_package(&pkg);
        }
        if walker.cursor_result().is_some() {
            return ApiOutput {
                features: Vec::new(),
                cursor: take_cursor_hit(&walker),
            };
        }
    }
    if let Some(cursor) = take_cursor_hit(&walker) {
        return ApiOutput {
            features: Vec::new(),
            cursor: Some(cursor),
        };
    }

    ApiOutput {
        features: merge_features(&walker, &labels),
        cursor: None,
    }
}

/// A feature present in every context is emitted once; otherwise each
/// appearance gets its context label inserted after the first separator
/// position.
fn merge_features(walker: &Walker, labels: &[String]) -> Vec<String> {
    let mut feature_ctx: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for label in labels {
        for f in walker.features_in_context(label) {
            feature_ctx.entry(f).or_default().insert(label.clone());
        }
    }
    let mut features: Vec<String> = Vec::new();
    for (f, ctxs) in feature_ctx {
        if ctxs.len() == labels.len() {
            features.push(f);
        } else {
            for ctx in ctxs {
                features.push(annotate_context(&f, &ctx));
            }
        }
    }
    features.sort();
    features
}

fn annotate_context(feature: &str, ctx: &str) -> String {
    match feature.find(',') {
        Some(i) => format!("{} ({}){}", &feature[..i], ctx, &feature[i..]),
        None => format!("{feature} ({ctx})"),
    }
}

fn take_cursor_hit(walker: &Walker) -> Option<CursorHit> {
    let info = walker.cursor_result()?.clone();
    let (file, span) = info.target?;
    let (path, pos) = walker.fset.position(file, span.start);
    Some(CursorHit {
        path: path.to_path_buf(),
        pos,
        info,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotate_context_after_first_comma() {
        assert_eq!(
            annotate_context("pkg net, func Dial(string) error", "linux-amd64"),
            "pkg net (linux-amd64), func Dial(string) error"
        );
        assert_eq!(annotate_context("pkg net", "windows-386"), "pkg net (windows-386)");
    }
}
