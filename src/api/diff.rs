//! Line-oriented reconciliation of a feature list against baseline,
//! upcoming, and exception files.

use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

/// Read a feature file: one feature per line, blank file means none.
/// A missing file reads as empty.
pub fn file_features(path: &Path) -> Vec<String> {
    let Ok(text) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    text.lines().map(str::to_string).collect()
}

/// Strip ` (context)` annotations from a feature line, so a baseline
/// entry recorded with a context still matches the merged form.
pub fn feature_without_context(f: &str) -> String {
    if !f.contains('(') {
        return f.to_string();
    }
    let mut out = String::with_capacity(f.len());
    let bytes = f.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b' ' && i + 1 < bytes.len() && bytes[i + 1] == b'(' {
            // ` (...)` with no spaces inside is a context annotation.
            if let Some(close) = f[i + 2..].find(')') {
                let inner = &f[i + 2..i + 2 + close];
                if !inner.is_empty() && !inner.contains(' ') {
                    i += close + 3;
                    continue;
                }
            }
        }
        let ch_len = f[i..].chars().next().map(char::len_utf8).unwrap_or(1);
        out.push_str(&f[i..i + ch_len]);
        i += ch_len;
    }
    out
}

/// Merge-sort walk of required features against the produced list.
/// Returns false when compatibility is broken: a required feature is
/// missing (outside the exception set), or a new feature appears while
/// `allow_new` is off.
pub fn compare_api(
    out: &mut impl Write,
    features: &[String],
    required: &[String],
    optional: &[String],
    exception: &[String],
    allow_new: bool,
) -> std::io::Result<bool> {
    let mut ok = true;

    let mut optional_set: HashSet<String> = optional.iter().cloned().collect();
    let exception_set: HashSet<&str> = exception.iter().map(String::as_str).collect();
    let feature_set: HashSet<&str> = features.iter().map(String::as_str).collect();

    let mut features: Vec<&String> = features.iter().collect();
    let mut required: Vec<&String> = required.iter().collect();
    features.sort();
    required.sort();

    let mut fi = 0;
    let mut ri = 0;
    while ri < required.len() || fi < features.len() {
        if fi >= features.len() || (ri < required.len() && required[ri] < features[fi]) {
            // In the baseline, not produced.
            let feature = required[ri];
            ri += 1;
            if exception_set.contains(feature.as_str()) {
                writeln!(out, "~{feature}")?;
            } else if feature_set.contains(feature_without_context(feature).as_str()) {
                // A context-annotated baseline entry matched its
                // context-free form.
            } else {
                writeln!(out, "-{feature}")?;
                ok = false;
            }
        } else if ri >= required.len() || (fi < features.len() && required[ri] > features[fi]) {
            // Produced, not in the baseline.
            let feature = features[fi];
            fi += 1;
            if optional_set.remove(feature.as_str()) {
                // Expected in the next release; drop it so leftovers
                // can be reported below.
            } else {
                writeln!(out, "+{feature}")?;
                if !allow_new {
                    ok = false;
                }
            }
        } else {
            ri += 1;
            fi += 1;
        }
    }

    // Promised for the next release but never seen.
    let mut missing: Vec<String> = optional_set.into_iter().collect();
    missing.sort();
    for feature in missing {
        writeln!(out, "\u{b1}{feature}")?;
    }
    Ok(ok)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(
        features: &[&str],
        required: &[&str],
        optional: &[&str],
        exception: &[&str],
        allow_new: bool,
    ) -> (bool, String) {
        let to_vec = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let mut buf = Vec::new();
        let ok = compare_api(
            &mut buf,
            &to_vec(features),
            &to_vec(required),
            &to_vec(optional),
            &to_vec(exception),
            allow_new,
        )
        .unwrap();
        (ok, String::from_utf8(buf).unwrap())
    }

    #[test]
    fn test_equal_sets_pass_silently() {
        let (ok, out) = run(&["a", "b"], &["a", "b"], &[], &[], true);
        assert!(ok);
        assert!(out.is_empty());
    }

    #[test]
    fn test_removed_feature_fails() {
        let (ok, out) = run(&["a"], &["a", "b"], &[], &[], true);
        assert!(!ok);
        assert_eq!(out, "-b\n");
    }

    #[test]
    fn test_exception_tolerates_removal() {
        let (ok, out) = run(&["a"], &["a", "b"], &[], &["b"], true);
        assert!(ok);
        assert_eq!(out, "~b\n");
    }

    #[test]
    fn test_new_feature_depends_on_allow_new() {
        let (ok, out) = run(&["a", "c"], &["a"], &[], &[], true);
        assert!(ok);
        assert_eq!(out, "+c\n");
        let (ok, _) = run(&["a", "c"], &["a"], &[], &[], false);
        assert!(!ok);
    }

    #[test]
    fn test_optional_consumed_and_leftovers_flagged() {
        let (ok, out) = run(&["a", "c"], &["a"], &["c", "d"], &[], true);
        assert!(ok);
        assert_eq!(out, "\u{b1}d\n");
    }

    #[test]
    fn test_required_with_context_matches_plain_feature() {
        let (ok, out) = run(
            &["pkg p, func F()"],
            &["pkg p (linux-amd64), func F()"],
            &[],
            &[],
            true,
        );
        assert!(ok);
        assert!(out.is_empty());
    }

    #[test]
    fn test_empty_required_with_allow_new_always_passes() {
        let (ok, _) = run(&["x", "y", "z"], &[], &[], &[], true);
        assert!(ok);
    }

    #[test]
    fn test_feature_without_context_strips_annotations() {
        assert_eq!(
            feature_without_context("pkg net (linux-amd64), func F()"),
            "pkg net, func F()"
        );
        assert_eq!(
            feature_without_context("pkg net, type T struct"),
            "pkg net, type T struct"
        );
    }
}
