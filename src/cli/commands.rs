use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "notices", about = concat!("notices v", env!("CARGO_PKG_VERSION"), " - messages, notifications and confirmations"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Look for notices.toml starting from this directory
    #[arg(short = 'C', long = "dir", global = true)]
    pub dir: Option<String>,

    /// Use this config file instead of searching for notices.toml
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the resolved per-kind message policy
    Policy,
    /// Run a message script and print every event it produces
    Replay(ReplayArgs),
    /// Show or edit notices.toml
    Config(ConfigCmd),
}

#[derive(Args)]
pub struct ReplayArgs {
    /// Script file, or - for stdin
    pub file: String,
}

#[derive(Args)]
pub struct ConfigCmd {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration (default)
    Show,
    /// Set a key, e.g. `kinds.warning.dismiss_delay_ms 2500`
    Set(ConfigSetArgs),
    /// Write a starter notices.toml
    Init(ConfigInitArgs),
}

#[derive(Args)]
pub struct ConfigSetArgs {
    /// Dotted key: store.capacity, ui.panel_open, ui.colors.<name>, kinds.<kind>.<field>
    pub key: String,
    pub value: String,
}

#[derive(Args)]
pub struct ConfigInitArgs {
    /// Overwrite an existing notices.toml
    #[arg(long)]
    pub force: bool,
}
