//! CLI argument parsing for sterm.

use camino::Utf8PathBuf;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "sterm")]
#[command(about = "Terminal dashboard core for a Slurm cluster")]
pub struct Args {
    /// Only show jobs of this user (defaults to the current user)
    #[arg(long)]
    pub user: Option<String>,

    /// Config file path (default ~/.config/sterm/config.json)
    #[arg(long)]
    pub config: Option<Utf8PathBuf>,

    /// Queue poll interval in seconds
    #[arg(long)]
    pub queue_interval: Option<u64>,

    /// Hardware poll interval in seconds
    #[arg(long)]
    pub hardware_interval: Option<u64>,

    /// Accounting-history poll interval in seconds
    #[arg(long)]
    pub history_interval: Option<u64>,

    /// Accounting window passed to sacct -S (e.g. "now-7days")
    #[arg(long)]
    pub history_window: Option<String>,

    /// Follow a job's stdout, printing new output as it appears
    #[arg(long)]
    pub follow: Option<String>,

    /// Launch an interactive session instead of monitoring
    #[arg(long)]
    pub interactive: bool,
}
