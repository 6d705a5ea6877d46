mod extract;
mod list;
mod verify;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use pck_dump_core::pack::PackCatalog;
use pck_dump_core::source::ContainerSource;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check every file of a pack against its stored MD5
    Verify(VerifyCommand),
    /// Extract files of a pack to a directory
    Extract(ExtractCommand),
    /// List the files of a pack
    List(ListCommand),
}

#[derive(Debug, Args)]
struct PackArgs {
    /// Catalog manifest (JSON) of the pack
    manifest: PathBuf,
    /// Container file holding the entry data, defaults to the manifest's pack path
    #[arg(short, long)]
    container: Option<PathBuf>,
    /// Read the container with regular file IO instead of memory mapping
    #[arg(long)]
    no_mmap: bool,
}

#[derive(Debug, Args)]
struct VerifyCommand {
    #[command(flatten)]
    pack: PackArgs,
}

#[derive(Debug, Args)]
struct ExtractCommand {
    #[command(flatten)]
    pack: PackArgs,
    /// Output directory path
    output: Option<PathBuf>,
    /// Only extract these virtual paths, e.g. "res://icon.png"
    #[arg(short, long = "file")]
    files: Vec<String>,
    /// Fail on files that already exist instead of overwriting them
    #[arg(long)]
    no_overwrite: bool,
}

#[derive(Debug, Args)]
struct ListCommand {
    /// Catalog manifest (JSON) of the pack
    manifest: PathBuf,
    /// Print the catalog as JSON
    #[arg(long)]
    json: bool,
}

fn load_catalog(manifest: &Path) -> anyhow::Result<PackCatalog> {
    PackCatalog::from_manifest_file(manifest)
        .with_context(|| format!("Failed to load manifest `{}`", manifest.display()))
}

fn open_container(args: &PackArgs, catalog: &PackCatalog) -> anyhow::Result<ContainerSource> {
    let path = args.container.as_deref().unwrap_or(catalog.pack_path());
    if catalog.key().is_empty() && catalog.entries().iter().any(|e| e.is_encrypted()) {
        warn!("Pack has encrypted files but no key was given, they will fail to open");
    }
    ContainerSource::builder()
        .mmap(!args.no_mmap)
        .open(path)
        .with_context(|| format!("Container file `{}` not found.", path.display()))
}

/// `RUST_LOG` when set and valid, `info` otherwise.
fn log_filter(directives: Option<String>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok()))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match &cli.command {
        Command::Verify(cmd) => verify::verify(cmd),
        Command::Extract(cmd) => extract::extract(cmd),
        Command::List(cmd) => list::list(cmd),
    }
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::filter::LevelFilter;

    use super::*;

    #[test]
    fn plain_level_in_env_wins() {
        assert_eq!(log_filter(Some("debug".into())).max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(log_filter(Some("warn".into())).max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn defaults_to_info() {
        assert_eq!(log_filter(None).max_level_hint(), Some(LevelFilter::INFO));
    }
}
