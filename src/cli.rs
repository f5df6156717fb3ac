use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "pxb-diags")]
#[command(about = "Collect a px-backup diagnostics bundle from a Kubernetes cluster")]
pub struct Cli {
    /// Px-backup namespace for gathering resources. If not provided, all
    /// namespaces are scanned for the px-backup service
    #[arg(short = 'n', long)]
    pub namespace: Option<String>,

    /// Output directory for the bundle. Provide '.' for the current directory
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// Number of lines to tail from the logs. Provide -1 for the whole log
    #[arg(long, default_value_t = 3000, allow_negative_numbers = true)]
    pub tail_lines: i64,

    /// Path to the kubeconfig file. Defaults to the KUBECONFIG environment variable
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Maximum number of artifacts collected at once (0 = unlimited)
    #[arg(long, default_value_t = 16)]
    pub max_concurrency: usize,

    /// Verbose logging
    #[arg(short = 'v', long)]
    pub verbose: bool,
}
