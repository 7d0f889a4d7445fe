mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use knit_lib::consts::{DEFINITIONS_FILE, VARIABLES_FILE};

use cmd::{GenOptions, cmd_env_check, cmd_gen, cmd_targets, cmd_variants};

/// knit - build-graph generator for module definitions
#[derive(Parser)]
#[command(name = "knit")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Increase log verbosity (-v info, -vv debug)
  #[arg(short, long, action = ArgAction::Count, global = true)]
  verbose: u8,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run the pipeline and write the build graph
  Gen {
    /// Top-level definitions file
    #[arg(long, default_value = DEFINITIONS_FILE)]
    defs: PathBuf,

    /// Product variables file
    #[arg(long, default_value = VARIABLES_FILE)]
    variables: PathBuf,

    /// Output directory (default: the configured output root)
    #[arg(long)]
    out: Option<PathBuf>,

    /// Turn missing dependencies into build-time errors
    #[arg(long)]
    allow_missing: bool,
  },

  /// List every final module variant
  Variants {
    /// Top-level definitions file
    #[arg(long, default_value = DEFINITIONS_FILE)]
    defs: PathBuf,

    /// Product variables file
    #[arg(long, default_value = VARIABLES_FILE)]
    variables: PathBuf,

    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// Print the decoded target table
  Targets {
    /// Product variables file
    #[arg(long, default_value = VARIABLES_FILE)]
    variables: PathBuf,

    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// Exit non-zero when the recorded environment is stale
  EnvCheck {
    /// Directory holding the recorded environment
    #[arg(long, default_value = "out")]
    out: PathBuf,
  },
}

fn init_tracing(verbose: u8) {
  let level = match verbose {
    0 => "warn",
    1 => "info",
    _ => "debug",
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  match cli.command {
    Commands::Gen {
      defs,
      variables,
      out,
      allow_missing,
    } => cmd_gen(&GenOptions {
      defs,
      variables,
      out,
      allow_missing,
    }),
    Commands::Variants { defs, variables, json } => cmd_variants(&defs, &variables, json),
    Commands::Targets { variables, json } => cmd_targets(&variables, json),
    Commands::EnvCheck { out } => cmd_env_check(&out),
  }
}
