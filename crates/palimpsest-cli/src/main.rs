use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use palimpsest_core::validator::render_report;
use palimpsest_core::{Manifest, ManifestError, ManifestStore, OverlayConfig, Validator};

/// Exit code for configuration problems, distinct from a failed validation
const EXIT_CONFIG_ERROR: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "palimpsest-validate",
    version,
    about = "Check declared patches against the override and base trees"
)]
struct Args {
    /// Override tree root (defaults to the config value, then `overrides`)
    #[arg(long)]
    overrides: Option<PathBuf>,

    /// Base (host) tree root (defaults to the config value, then `.`)
    #[arg(long)]
    base: Option<PathBuf>,

    /// JSON overlay config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Manifest file (defaults to `<overrides>/patches.json`)
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("palimpsest-validate: {:#}", e);
            ExitCode::from(EXIT_CONFIG_ERROR)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_config(args: &Args) -> anyhow::Result<OverlayConfig> {
    let mut config = match &args.config {
        Some(path) => OverlayConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => OverlayConfig::default(),
    };
    if let Some(overrides) = &args.overrides {
        config.override_root = overrides.clone();
    }
    if let Some(base) = &args.base {
        config.base_root = base.clone();
    }
    Ok(config)
}

fn run(args: &Args) -> anyhow::Result<u8> {
    let config = resolve_config(args)?;
    let manifest_path = args
        .manifest
        .clone()
        .unwrap_or_else(|| config.manifest_path());

    let manifest = match ManifestStore::load_strict(&manifest_path) {
        Ok(manifest) => manifest,
        Err(ManifestError::NotFound(_)) => {
            warn!(
                "No manifest at {:?}; only checking for undocumented overrides",
                manifest_path
            );
            Manifest::default()
        }
        Err(e) => {
            return Err(e).with_context(|| format!("reading manifest {}", manifest_path.display()))
        }
    };

    let validator = Validator::new(config).context("invalid naming conventions")?;
    let report = validator.run(&manifest);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", render_report(&report, args.verbose));
    }

    Ok(report.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    #[test]
    fn test_parse_args() {
        let args = Args::parse_from([
            "palimpsest-validate",
            "--overrides",
            "custom",
            "--base",
            "upstream",
            "-v",
        ]);
        assert_eq!(args.overrides, Some(PathBuf::from("custom")));
        assert_eq!(args.base, Some(PathBuf::from("upstream")));
        assert!(args.verbose);
        assert!(!args.json);
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::parse_from(["palimpsest-validate", "--base", "upstream"]);
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.override_root, PathBuf::from("overrides"));
        assert_eq!(config.base_root, PathBuf::from("upstream"));
    }

    fn workspace(manifest: Option<&str>, files: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("overrides")).unwrap();
        for file in files {
            let path = dir.path().join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, "").unwrap();
        }
        if let Some(manifest) = manifest {
            std::fs::write(dir.path().join("overrides/patches.json"), manifest).unwrap();
        }
        dir
    }

    fn args_for(dir: &tempfile::TempDir) -> Args {
        Args::parse_from([
            OsString::from("palimpsest-validate"),
            OsString::from("--overrides"),
            dir.path().join("overrides").into_os_string(),
            OsString::from("--base"),
            dir.path().join("upstream").into_os_string(),
        ])
    }

    #[test]
    fn test_duplicate_entries_still_validate_every_patch() {
        let dir = workspace(
            Some(
                r#"{"version": "1.0.0", "patches": [
                    {"targetId": "@/views/Gone.vue", "kind": "replace"},
                    {"targetId": "AuthService", "kind": "hook"},
                    {"targetId": "AuthService", "kind": "hook"}
                ]}"#,
            ),
            &["upstream/src/views/Gone.vue"],
        );
        assert_eq!(run(&args_for(&dir)).unwrap(), 1);
    }

    #[test]
    fn test_valid_manifest_exits_zero() {
        let dir = workspace(
            Some(r#"{"version": "1.0.0", "patches": [{"targetId": "@/App.vue", "kind": "replace"}]}"#),
            &["overrides/src/App.vue", "upstream/src/App.vue"],
        );
        assert_eq!(run(&args_for(&dir)).unwrap(), 0);
    }

    #[test]
    fn test_unreadable_manifest_is_an_error() {
        let dir = workspace(Some("{ not json"), &[]);
        assert!(run(&args_for(&dir)).is_err());

        let empty_version = workspace(Some(r#"{"version": "", "patches": []}"#), &[]);
        assert!(run(&args_for(&empty_version)).is_err());
    }

    #[test]
    fn test_missing_manifest_checks_undocumented_only() {
        let dir = workspace(None, &["overrides/src/App.vue"]);
        assert_eq!(run(&args_for(&dir)).unwrap(), 0);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let args = Args::parse_from(["palimpsest-validate", "--config", "/nonexistent/p.json"]);
        assert!(resolve_config(&args).is_err());
    }
}
