use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use goscope::api::{compare_api, file_features, run_api, ApiRequest};
use goscope::project::context::BuildContext;
use goscope::semantic::walker::{CursorRequest, WalkerOptions};

/// Compute and compare the exported API of a set of packages.
#[derive(Parser, Debug)]
#[command(name = "goscope")]
#[command(about = "Exported-API extraction and cursor resolution for Go-style packages")]
struct Cli {
    /// Baseline feature file (required features)
    #[arg(short = 'c', long = "check", value_name = "FILE")]
    check: Option<PathBuf>,

    /// Whether features missing from the baseline are tolerated
    #[arg(long = "allow_new", default_value_t = true, action = clap::ArgAction::Set)]
    allow_new: bool,

    /// Exception feature file; listed removals are tolerated
    #[arg(long = "except", value_name = "FILE")]
    except: Option<PathBuf>,

    /// Upcoming (next release) feature file
    #[arg(long = "next", value_name = "FILE")]
    next: Option<PathBuf>,

    /// Verbose diagnostics
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Include unexported declarations
    #[arg(short = 'a', long = "alldecls")]
    all_decls: bool,

    /// Include methods contributed via embedding
    #[arg(long = "allmethods", default_value_t = true, action = clap::ArgAction::Set)]
    all_methods: bool,

    /// Append the source position to each feature
    #[arg(long = "pos")]
    show_pos: bool,

    /// Feature component separator
    #[arg(long = "sep", default_value = ", ")]
    sep: String,

    /// Transitively load imports
    #[arg(long = "dep", default_value_t = true, action = clap::ArgAction::Set)]
    dep: bool,

    /// Use the host's default context instead of the fan-out list
    #[arg(long = "default_ctx", default_value_t = false, action = clap::ArgAction::Set)]
    default_ctx: bool,

    /// Comma-separated OS-ARCH[-cgo] context override
    #[arg(long = "contexts", value_name = "LIST")]
    contexts: Option<String>,

    /// Run cursor resolution at FILE:OFFSET instead of listing the API
    #[arg(long = "cursor", value_name = "FILE:OFFSET")]
    cursor: Option<String>,

    /// Read the cursor file's content from standard input
    #[arg(long = "cursor_std")]
    cursor_std: bool,

    /// std | all | import paths | local directory
    #[arg(value_name = "PACKAGE")]
    pkgs: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("goscope=debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("goscope: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let pkgs = expand_packages(&cli.pkgs);
    if pkgs.is_empty() {
        eprintln!("usage: goscope [std|all|package...|local-dir]");
        return Ok(ExitCode::FAILURE);
    }

    let cursor = match &cli.cursor {
        Some(spec) => Some(parse_cursor(spec, &pkgs, cli.cursor_std)?),
        None => None,
    };
    let cursor_mode = cursor.is_some();

    let contexts = match &cli.contexts {
        Some(list) => list
            .split(',')
            .filter_map(|s| {
                let ctx = BuildContext::parse(s.trim());
                if ctx.is_none() {
                    eprintln!("goscope: bad context {s:?}");
                }
                ctx
            })
            .collect(),
        None => Vec::new(),
    };
    // A custom context list overrides default-context mode.
    let default_ctx = cli.default_ctx && contexts.is_empty();

    let output = run_api(ApiRequest {
        pkgs,
        contexts,
        default_ctx,
        opts: WalkerOptions {
            all_decls: cli.all_decls,
            all_methods: cli.all_methods,
            show_pos: cli.show_pos,
            dep_parser: cli.dep,
            sep: cli.sep.clone(),
        },
        cursor,
    });

    if cursor_mode {
        // Failure to locate prints nothing; cursor mode always exits 0.
        if let Some(hit) = output.cursor {
            println!(
                "{}, {}, {}, {}:{}:{}",
                hit.info.kind,
                hit.info.name,
                hit.info.typ,
                hit.path.display(),
                hit.pos.line + 1,
                hit.pos.col + 1
            );
        }
        return Ok(ExitCode::SUCCESS);
    }

    let Some(check) = &cli.check else {
        for f in &output.features {
            println!("{f}");
        }
        return Ok(ExitCode::SUCCESS);
    };

    let required = file_features(check);
    let optional = cli.next.as_deref().map(file_features).unwrap_or_default();
    let exception = cli.except.as_deref().map(file_features).unwrap_or_default();
    let stdout = std::io::stdout();
    let ok = compare_api(
        &mut stdout.lock(),
        &output.features,
        &required,
        &optional,
        &exception,
        cli.allow_new,
    )?;
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn parse_cursor(spec: &str, pkgs: &[String], from_stdin: bool) -> Result<CursorRequest> {
    let (file, offset) = spec
        .rsplit_once(':')
        .ok_or_else(|| anyhow::anyhow!("bad cursor {spec:?}, want FILE:OFFSET"))?;
    let offset: u32 = offset
        .parse()
        .map_err(|_| anyhow::anyhow!("bad cursor offset {offset:?}"))?;
    let pkg = match pkgs {
        [only] => only.clone(),
        _ => anyhow::bail!("cursor mode takes exactly one package"),
    };
    let overlay = if from_stdin {
        let mut src = String::new();
        std::io::stdin().read_to_string(&mut src)?;
        Some(src)
    } else {
        None
    };
    Ok(CursorRequest {
        pkg,
        file: file.to_string(),
        offset,
        overlay,
    })
}

/// Expand `std` and `all` into concrete import paths by scanning the
/// source roots.
fn expand_packages(pkgs: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    for pkg in pkgs {
        match pkg.as_str() {
            "std" => {
                let ctx = BuildContext::host_default();
                collect_packages(&ctx.goroot.join("src"), "", &mut out);
            }
            "all" => {
                let ctx = BuildContext::host_default();
                collect_packages(&ctx.goroot.join("src"), "", &mut out);
                for root in &ctx.gopath {
                    collect_packages(&root.join("src"), "", &mut out);
                }
            }
            _ => out.push(pkg.clone()),
        }
    }
    out
}

fn collect_packages(dir: &std::path::Path, prefix: &str, out: &mut Vec<String>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    let mut has_source = false;
    let mut subdirs = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            if !matches!(name.as_str(), "testdata" | "vendor" | "cmd") && !name.starts_with('.') {
                subdirs.push(name);
            }
        } else if name.ends_with(".go") && !name.ends_with("_test.go") {
            has_source = true;
        }
    }
    if has_source && !prefix.is_empty() {
        out.push(prefix.to_string());
    }
    subdirs.sort();
    for sub in subdirs {
        let child_prefix = if prefix.is_empty() {
            sub.clone()
        } else {
            format!("{prefix}/{sub}")
        };
        collect_packages(&dir.join(&sub), &child_prefix, out);
    }
}
