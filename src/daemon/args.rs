use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;


/// Arguments for the standalone daemon binary. The cli passes none of these; they exist for
/// running the reminder daemon by hand.
#[derive(Parser)]
pub struct DaemonArgs {
  /// Skip detaching and stay attached to the console.
  #[arg(long)]
  pub force: bool,
  /// Application directory holding the store, logs and control socket.
  #[arg(long)]
  pub dir: Option<PathBuf>,
  /// This option is for debugging purposes only.
  #[arg(long = "log-console")]
  pub log_console : bool,
  #[arg(long = "log-filter")]
  pub log: Option<LevelFilter>
}
