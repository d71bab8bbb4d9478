mod cmd;
mod output;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use patchbuild_lib::consts::PROJECT_FILE;
use patchbuild_lib::params::CompressOption;
use patchbuild_lib::util::hash::HashAlgorithm;

use crate::output::print_error;

/// patchbuild - incremental, versioned artifact builds for patch distribution
#[derive(Parser)]
#[command(name = "patchbuild")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

/// Where builds for a platform live.
#[derive(Args, Debug, Clone)]
pub struct Target {
  /// Output root holding one directory per platform
  #[arg(short, long, default_value = "dist")]
  pub output: PathBuf,

  /// Target platform name
  #[arg(short, long)]
  pub platform: String,
}

#[derive(Subcommand)]
enum Commands {
  /// Build a patch version
  Build {
    /// Path to the project file
    #[arg(long, default_value = PROJECT_FILE)]
    project: PathBuf,

    #[command(flatten)]
    target: Target,

    /// Version number to build (1 or higher)
    #[arg(long = "version", value_name = "N")]
    patch_version: u32,

    /// Hash algorithm for artifact digests (sha256, sha512)
    #[arg(long)]
    hash: Option<HashAlgorithm>,

    /// Compression applied by the compiler (uncompressed, gzip)
    #[arg(long)]
    compress: Option<CompressOption>,

    /// Clear the output directory and rebuild every artifact
    #[arg(short, long)]
    force: bool,

    /// Suffix distributed file names with their hash
    #[arg(long)]
    append_hash: bool,

    /// Leave type metadata out of compiled artifacts
    #[arg(long)]
    disable_type_metadata: bool,

    /// Rebuild artifacts whose type metadata changed
    #[arg(long)]
    track_type_metadata: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// Show what changed between two built versions
  Diff {
    #[command(flatten)]
    target: Target,

    /// Older version
    #[arg(long)]
    from: u32,

    /// Newer version
    #[arg(long)]
    to: u32,

    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// Show the manifest of a built version
  Show {
    #[command(flatten)]
    target: Target,

    /// Version to show (default: latest)
    #[arg(long = "version", value_name = "N")]
    patch_version: Option<u32>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
  },
}

fn main() {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let result = match cli.command {
    Commands::Build {
      project,
      target,
      patch_version,
      hash,
      compress,
      force,
      append_hash,
      disable_type_metadata,
      track_type_metadata,
      json,
    } => cmd::cmd_build(cmd::BuildArgs {
      project,
      target,
      version: patch_version,
      hash,
      compress,
      force,
      append_hash,
      disable_type_metadata,
      track_type_metadata,
      verbose: cli.verbose,
      json,
    }),
    Commands::Diff { target, from, to, json } => cmd::cmd_diff(&target, from, to, cli.verbose, json),
    Commands::Show {
      target,
      patch_version,
      json,
    } => cmd::cmd_show(&target, patch_version, cli.verbose, json),
  };

  if let Err(e) = result {
    print_error(&format!("{:#}", e));
    std::process::exit(1);
  }
}
