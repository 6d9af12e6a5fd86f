//! Build contexts: the (OS, arch, cgo) tuples that select among
//! conditionally-compiled files in a package.

use std::path::PathBuf;

pub const KNOWN_OS: &[&str] = &[
    "linux", "darwin", "windows", "freebsd", "netbsd", "openbsd", "plan9", "solaris", "android",
    "ios", "js", "aix", "dragonfly", "illumos", "wasip1",
];

pub const KNOWN_ARCH: &[&str] = &[
    "386", "amd64", "arm", "arm64", "mips", "mipsle", "mips64", "mips64le", "ppc64", "ppc64le",
    "riscv64", "s390x", "wasm", "loong64",
];

/// One build variant of the source tree, plus the roots the package
/// locator searches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    pub goos: String,
    pub goarch: String,
    pub cgo_enabled: bool,
    pub goroot: PathBuf,
    pub gopath: Vec<PathBuf>,
}

impl BuildContext {
    pub fn new(goos: &str, goarch: &str, cgo_enabled: bool) -> Self {
        Self {
            goos: goos.into(),
            goarch: goarch.into(),
            cgo_enabled,
            goroot: PathBuf::new(),
            gopath: Vec::new(),
        }
    }

    /// The context the host toolchain would select, roots taken from the
    /// process environment.
    pub fn host_default() -> Self {
        let goos = std::env::var("GOOS").unwrap_or_else(|_| host_os().to_string());
        let goarch = std::env::var("GOARCH").unwrap_or_else(|_| host_arch().to_string());
        let cgo = std::env::var("CGO_ENABLED").map(|v| v == "1").unwrap_or(true);
        Self::new(&goos, &goarch, cgo).with_env_roots()
    }

    /// Fill `goroot`/`gopath` from the environment.
    pub fn with_env_roots(mut self) -> Self {
        if let Ok(root) = std::env::var("GOROOT") {
            self.goroot = PathBuf::from(root);
        }
        if let Ok(paths) = std::env::var("GOPATH") {
            self.gopath = std::env::split_paths(&paths).collect();
        }
        self
    }

    /// `linux-amd64`, with `-cgo` appended when cgo is enabled.
    pub fn label(&self) -> String {
        if self.cgo_enabled {
            format!("{}-{}-cgo", self.goos, self.goarch)
        } else {
            format!("{}-{}", self.goos, self.goarch)
        }
    }

    /// `linux-amd64`, cgo ignored. Used for the shared package key of
    /// directories whose only variance is OS/arch file suffixes.
    pub fn os_arch(&self) -> String {
        format!("{}-{}", self.goos, self.goarch)
    }

    /// Parse an `OS-ARCH[-cgo]` label.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split('-');
        let goos = parts.next()?;
        let goarch = parts.next()?;
        if goos.is_empty() || goarch.is_empty() {
            return None;
        }
        let cgo = match parts.next() {
            None => false,
            Some("cgo") => true,
            Some(_) => return None,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(goos, goarch, cgo))
    }

    /// The contexts scanned by default, unless overridden.
    pub fn default_contexts() -> Vec<Self> {
        [
            ("linux", "386", true),
            ("linux", "386", false),
            ("linux", "amd64", true),
            ("linux", "amd64", false),
            ("linux", "arm", false),
            ("darwin", "386", true),
            ("darwin", "386", false),
            ("darwin", "amd64", true),
            ("darwin", "amd64", false),
            ("windows", "amd64", false),
            ("windows", "386", false),
            ("freebsd", "amd64", false),
            ("freebsd", "386", false),
        ]
        .iter()
        .map(|(os, arch, cgo)| Self::new(os, arch, *cgo))
        .collect()
    }

    /// Whether a file participates in this context, judged by its
    /// `_GOOS`/`_GOARCH`/`_GOOS_GOARCH` name suffix.
    pub fn includes_file(&self, file_name: &str) -> bool {
        match os_arch_suffix(file_name) {
            (None, None) => true,
            (Some(os), None) => os == self.goos,
            (None, Some(arch)) => arch == self.goarch,
            (Some(os), Some(arch)) => os == self.goos && arch == self.goarch,
        }
    }
}

fn host_os() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

fn host_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        other => other,
    }
}

/// Extract the `(os, arch)` constraint a file name carries, if any.
/// The `_test` suffix is transparent: `x_linux_test.go` constrains to
/// linux just like `x_linux.go`.
pub fn os_arch_suffix(file_name: &str) -> (Option<&str>, Option<&str>) {
    let Some(stem) = file_name.strip_suffix(".go") else {
        return (None, None);
    };
    let stem = stem.strip_suffix("_test").unwrap_or(stem);
    let parts: Vec<&str> = stem.split('_').collect();
    if parts.len() < 2 {
        return (None, None);
    }
    let last = parts[parts.len() - 1];
    if KNOWN_ARCH.contains(&last) {
        if parts.len() >= 3 && KNOWN_OS.contains(&parts[parts.len() - 2]) {
            return (Some(parts[parts.len() - 2]), Some(last));
        }
        return (None, Some(last));
    }
    if KNOWN_OS.contains(&last) {
        return (Some(last), None);
    }
    (None, None)
}

/// Does the file name constrain the build context at all?
pub fn has_os_arch_suffix(file_name: &str) -> bool {
    os_arch_suffix(file_name) != (None, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_includes_cgo() {
        assert_eq!(BuildContext::new("linux", "amd64", false).label(), "linux-amd64");
        assert_eq!(
            BuildContext::new("linux", "amd64", true).label(),
            "linux-amd64-cgo"
        );
    }

    #[test]
    fn test_parse_label_round_trip() {
        let ctx = BuildContext::parse("windows-386").unwrap();
        assert_eq!(ctx.goos, "windows");
        assert_eq!(ctx.goarch, "386");
        assert!(!ctx.cgo_enabled);

        let ctx = BuildContext::parse("linux-arm64-cgo").unwrap();
        assert!(ctx.cgo_enabled);

        assert!(BuildContext::parse("linux").is_none());
        assert!(BuildContext::parse("linux-amd64-sse").is_none());
    }

    #[test]
    fn test_file_suffix_selection() {
        let linux = BuildContext::new("linux", "amd64", false);
        assert!(linux.includes_file("net.go"));
        assert!(linux.includes_file("sock_linux.go"));
        assert!(!linux.includes_file("sock_windows.go"));
        assert!(linux.includes_file("asm_amd64.go"));
        assert!(!linux.includes_file("asm_386.go"));
        assert!(linux.includes_file("sock_linux_amd64.go"));
        assert!(!linux.includes_file("sock_linux_386.go"));
        // Unknown suffixes constrain nothing.
        assert!(linux.includes_file("strconv_ext.go"));
    }

    #[test]
    fn test_test_suffix_is_transparent() {
        assert_eq!(os_arch_suffix("x_linux_test.go"), (Some("linux"), None));
        assert!(has_os_arch_suffix("x_arm64_test.go"));
        assert!(!has_os_arch_suffix("x_test.go"));
    }
}
