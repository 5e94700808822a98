use std::path::PathBuf;

use clap::Parser;

/// Builds a boolean cutter fracture network and prints the resulting scene.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Geometry file to fracture. When given, the interactive prompt is
    /// skipped. Pass an empty string to use the test box.
    #[arg(long)]
    pub path: Option<String>,

    /// A RON file overriding the tool's default settings.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Writes the resulting scene to the given file.
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Skips checking the built network for unwired inputs and dangling
    /// expression references.
    #[arg(long)]
    pub no_validate: bool,
}
