//! Packup CLI - install or update a modpack into a directory.
//!
//! ```text
//! packup --pack https://example.com/pack.json --server survival --path ./server
//! ```

mod error;
mod progress;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use packup::config::{ConfigFile, DownloadSettings};
use packup::download::HttpFetcher;
use packup::logging::{init_logging, LoggingConfig};
use packup::manifest::PackLoader;
use packup::{QueueCoordinator, Side, UpdateRequest, Updater};
use tracing::info;

use crate::error::CliError;
use crate::progress::UpdateProgress;

/// Installation side selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum SideArg {
    /// Client-side installation
    Client,
    /// Dedicated server installation
    Server,
    /// Not installable; accepted only to report a clear error
    Both,
}

impl SideArg {
    fn to_side(self) -> Result<Side, CliError> {
        match self {
            SideArg::Client => Ok(Side::Client),
            SideArg::Server => Ok(Side::Server),
            SideArg::Both => Err(CliError::Config(
                "--side both is not installable; choose client or server".to_string(),
            )),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "packup", version, about = "Install and update modpacks")]
struct Cli {
    /// Pack document URL or local path
    #[arg(long)]
    pack: String,

    /// Server id within the pack
    #[arg(long)]
    server: String,

    /// Installation directory
    #[arg(long)]
    path: PathBuf,

    /// Side to install
    #[arg(long, value_enum, default_value_t = SideArg::Server)]
    side: SideArg,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Remove files installed by the previous run first
    #[arg(long)]
    clean: bool,

    /// Concurrent downloads per queue (overrides config)
    #[arg(long)]
    parallel: Option<usize>,

    /// Attempts per file (overrides config)
    #[arg(long)]
    retries: Option<u32>,

    /// Configuration file (default: ~/.packup/config.ini)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<ConfigFile, CliError> {
    match path {
        Some(path) => Ok(ConfigFile::load_from(path)?),
        None => Ok(ConfigFile::load().unwrap_or_default()),
    }
}

/// Pack documents are fetched with the same timeout as downloads.
fn pack_loader(settings: &DownloadSettings) -> PackLoader {
    PackLoader::with_timeout(settings.timeout())
}

fn run(cli: Cli) -> Result<(), CliError> {
    // Before any I/O
    let side = cli.side.to_side()?;

    let config = load_config(cli.config.as_ref())?;
    let _logging = init_logging(
        &LoggingConfig::new(cli.debug).with_file(config.logging.file.clone()),
    )?;

    let mut settings = config.download.clone();
    if let Some(parallel) = cli.parallel {
        settings = settings.with_parallel(parallel);
    }
    if let Some(retries) = cli.retries {
        settings = settings.with_retries(retries);
    }

    info!(
        version = packup::VERSION,
        pack = %cli.pack,
        server = %cli.server,
        side = %side,
        parallel = settings.parallel,
        retries = settings.retries,
        "Starting update"
    );

    let fetcher = HttpFetcher::with_timeout(settings.timeout())?;
    let coordinator = Arc::new(QueueCoordinator::new(
        Arc::new(fetcher),
        settings.queue_config(),
    ));
    let updater = Updater::new(Box::new(pack_loader(&settings)), coordinator)
        .with_cache_path(settings.cache_dir.clone());

    let request =
        UpdateRequest::new(cli.pack, cli.server, cli.path, side).with_clean(cli.clean);

    let progress = UpdateProgress::new();
    let report = updater.run(&request, |event| progress.handle(event))?;

    println!(
        "Installed {} file(s) into {}",
        report.files.len(),
        request.install_path.display()
    );
    if report.removed > 0 {
        println!("Removed {} file(s) from the previous install", report.removed);
    }
    if !report.fingerprint_changed {
        println!("Pack content was already up to date");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut full = vec!["packup"];
        full.extend_from_slice(args);
        Cli::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_side_defaults_to_server() {
        let cli = parse(&["--pack", "pack.json", "--server", "s1", "--path", "out"]);
        assert_eq!(cli.side, SideArg::Server);
        assert!(!cli.debug);
        assert!(!cli.clean);
        assert_eq!(cli.parallel, None);
    }

    #[test]
    fn test_all_flags() {
        let cli = parse(&[
            "--pack", "https://example.com/pack.json",
            "--server", "s1",
            "--path", "out",
            "--side", "client",
            "--debug",
            "--clean",
            "--parallel", "8",
            "--retries", "5",
            "--config", "custom.ini",
        ]);
        assert_eq!(cli.side, SideArg::Client);
        assert!(cli.debug);
        assert!(cli.clean);
        assert_eq!(cli.parallel, Some(8));
        assert_eq!(cli.retries, Some(5));
        assert_eq!(cli.config, Some(PathBuf::from("custom.ini")));
    }

    #[test]
    fn test_required_arguments() {
        assert!(Cli::try_parse_from(["packup", "--pack", "pack.json"]).is_err());
    }

    #[test]
    fn test_side_both_rejected() {
        assert!(matches!(SideArg::Both.to_side(), Err(CliError::Config(_))));
        assert_eq!(SideArg::Client.to_side().unwrap(), Side::Client);
    }

    #[test]
    fn test_pack_loader_uses_configured_timeout() {
        let settings = DownloadSettings {
            timeout_secs: 17,
            ..DownloadSettings::default()
        };
        assert_eq!(pack_loader(&settings).timeout(), settings.timeout());
        assert_eq!(pack_loader(&settings).timeout().as_secs(), 17);
    }

    #[test]
    fn test_both_fails_before_touching_disk() {
        let temp = tempfile::TempDir::new().unwrap();
        let install = temp.path().join("install");
        let cli = parse(&[
            "--pack", "missing.json",
            "--server", "s1",
            "--path", install.to_str().unwrap(),
            "--side", "both",
            "--config", temp.path().join("absent.ini").to_str().unwrap(),
        ]);

        assert!(matches!(run(cli), Err(CliError::Config(_))));
        assert!(!install.exists());
    }
}
