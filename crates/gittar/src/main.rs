//! gittar command-line interface

use anyhow::Context;
use clap::{Parser, Subcommand};
use gittar::{Config, ExtractOptions, FetchOptions, Gittar, Site};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gittar")]
#[command(about = "Download and extract repository archives", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Cache directory (defaults to ~/.gittar or $GITTAR_CACHE_DIR)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Skip the network check and assume no connectivity
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download an archive into the cache and print its path
    Fetch {
        /// Repository identifier (e.g., "user/repo", "user/repo#v1.0.0", "gitlab:user/repo")
        repo: String,
        /// Provider when the identifier has no prefix (github, gitlab, bitbucket)
        #[arg(long)]
        host: Option<Site>,
        /// Only use the cache, never the network
        #[arg(long)]
        use_cache: bool,
        /// Download even if the archive is cached
        #[arg(short, long)]
        force: bool,
    },

    /// Extract a cached archive into a directory
    Extract {
        /// Archive path or repository identifier
        input: String,
        /// Target directory
        target: PathBuf,
        /// Provider when the identifier has no prefix
        #[arg(long)]
        host: Option<Site>,
        /// Leading path components to strip from entries
        #[arg(long, default_value_t = 0)]
        strip: usize,
    },

    /// Print the cache path of an identifier without downloading
    Path {
        /// Repository identifier
        repo: String,
        /// Provider when the identifier has no prefix
        #[arg(long)]
        host: Option<Site>,
    },

    /// Remove one cached archive, or the whole cache
    Clean {
        /// Repository identifier (clears everything if omitted)
        repo: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.cache_dir {
        Some(dir) => Config::load_from_root(dir)?,
        None => Config::load()?,
    };
    if cli.offline {
        config = config.with_offline(true);
    }
    let gittar = Gittar::new(config).context("Failed to initialize gittar")?;

    match cli.command {
        Commands::Fetch {
            repo,
            host,
            use_cache,
            force,
        } => {
            let options = FetchOptions {
                host,
                use_cache,
                force,
            };
            match gittar.fetch(&repo, &options).await {
                Ok(path) => println!("{}", path.display()),
                Err(e) if e.is_cache_miss() => anyhow::bail!("{} is not cached", repo),
                Err(e) => return Err(e).with_context(|| format!("Failed to fetch {}", repo)),
            }
        }
        Commands::Extract {
            input,
            target,
            host,
            strip,
        } => {
            let input = local_archive(&input)
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or(input);
            let input = match host {
                Some(host) if !Path::new(&input).is_absolute() => {
                    gittar.source(&input, Some(host))?.to_string()
                }
                _ => input,
            };
            let options = ExtractOptions::default().strip(strip);
            let dir = gittar.extract(&input, &target, &options).await?;
            println!("{}", dir.display());
        }
        Commands::Path { repo, host } => {
            let source = gittar.source(&repo, host)?;
            println!("{}", gittar.cache().archive_path(&source).display());
        }
        Commands::Clean { repo } => match repo {
            Some(repo) => {
                let source = gittar.source(&repo, None)?;
                if !gittar.cache().remove(&source)? {
                    eprintln!("{} is not cached", source);
                }
            }
            None => gittar.cache().clear()?,
        },
    }

    Ok(())
}

/// Relative paths to existing files are archives, not identifiers
fn local_archive(input: &str) -> Option<PathBuf> {
    let path = Path::new(input);
    if path.is_relative() && path.is_file() {
        std::fs::canonicalize(path).ok()
    } else {
        None
    }
}
