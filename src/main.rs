#![forbid(unsafe_code)]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use wheelwright::{Backend, ConfigSettings};

/// Build sdists and wheels from a declaratively-packaged project.
#[derive(Parser)]
#[command(name = "wheelwright", version, about)]
struct Cli {
    /// Project directory containing pyproject.toml.
    #[arg(long, default_value = ".", global = true)]
    source_dir: PathBuf,
    /// Increase verbosity. (Can be repeated.)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Reduce verbosity. (Can be repeated.)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    quiet: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct OutputDir {
    /// Directory to write the artifact into.
    #[arg(long, short, default_value = "dist")]
    out_dir: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Build a source distribution.
    BuildSdist {
        #[command(flatten)]
        out: OutputDir,
    },
    /// Build a wheel.
    BuildWheel {
        #[command(flatten)]
        out: OutputDir,
        /// Reuse METADATA from a previously prepared dist-info directory.
        #[arg(long)]
        metadata_dir: Option<PathBuf>,
    },
    /// Build an editable wheel whose payload points at the source tree.
    BuildEditable {
        #[command(flatten)]
        out: OutputDir,
    },
    /// Emit just the dist-info directory.
    PrepareMetadata {
        #[command(flatten)]
        out: OutputDir,
    },
    /// Print the requirements for building the given target, one per line.
    GetRequires {
        #[arg(value_parser = ["sdist", "wheel"])]
        target: String,
    },
}

fn init_tracing(verbose: u8, quiet: u8) {
    let default_level = match verbose as i8 - quiet as i8 {
        i8::MIN..=-1 => LevelFilter::ERROR,
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn ensure_dir(path: &std::path::Path) -> Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let backend = Backend::new(&cli.source_dir);
    let config: Option<&ConfigSettings> = None;

    match &cli.command {
        Command::BuildSdist { out } => {
            ensure_dir(&out.out_dir)?;
            let name = backend.build_sdist(&out.out_dir, config)?;
            println!("{}", out.out_dir.join(name).display());
        }
        Command::BuildWheel { out, metadata_dir } => {
            ensure_dir(&out.out_dir)?;
            let name = backend.build_wheel(
                &out.out_dir,
                config,
                metadata_dir.as_deref(),
            )?;
            println!("{}", out.out_dir.join(name).display());
        }
        Command::BuildEditable { out } => {
            ensure_dir(&out.out_dir)?;
            let name = backend.build_editable(&out.out_dir, config, None)?;
            println!("{}", out.out_dir.join(name).display());
        }
        Command::PrepareMetadata { out } => {
            ensure_dir(&out.out_dir)?;
            let name = backend
                .prepare_metadata_for_build_wheel(&out.out_dir, config)?;
            println!("{}", out.out_dir.join(name).display());
        }
        Command::GetRequires { target } => {
            let requires = match target.as_str() {
                "sdist" => backend.get_requires_for_build_sdist(config)?,
                _ => backend.get_requires_for_build_wheel(config)?,
            };
            for requirement in requires {
                println!("{}", requirement);
            }
        }
    }
    Ok(())
}
