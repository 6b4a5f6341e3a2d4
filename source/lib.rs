mod chunked;
mod diagnostics;
mod mapping;
mod orchestrator;
mod rewriter;
mod sanitizer;
mod tabular;
mod wrapper;

use std::{num, path};

pub use diagnostics::{Diagnostics, Log};
pub use mapping::ProjectType;
pub use orchestrator::Error as OrchestratorError;

fn default_threads() -> num::NonZeroUsize {
  std::thread::available_parallelism().unwrap_or(num::NonZeroUsize::new(1).unwrap())
}

#[derive(clap::Args)]
#[group(skip)]
pub struct Arguments {
  #[arg(help = "Project side the rewritten tree targets: client | server | joined", hide_possible_values(true))]
  pub project_type: ProjectType,

  #[arg(long = "csv-directory", help = "Directory holding fields.csv, methods.csv and params.csv")]
  pub csv_directory: path::PathBuf,
  #[arg(long = "src-directory", help = "Source tree to rewrite")]
  pub src_directory: path::PathBuf,
  #[arg(long = "src-out-directory", help = "Destination for the rewritten tree")]
  pub src_out_directory: path::PathBuf,

  #[arg(
    long = "threads",
    help = "Number of worker threads to spawn",
    default_value_t = default_threads()
  )]
  pub threads: num::NonZeroUsize,
}

pub fn run(arguments: &Arguments) -> anyhow::Result<()> {
  orchestrator::run(arguments, &Log)
}
