pub mod toml_config;

pub use toml_config::AppConfig;

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "campus-groups")]
#[command(about = "Browse and join campus study groups")]
pub struct CliConfig {
    #[arg(long, default_value = "campus-groups.toml")]
    pub config: String,

    #[arg(long, help = "Sign in with this email before running the command")]
    pub email: Option<String>,

    #[arg(long, env = "CAMPUS_GROUPS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List public groups you have not joined yet
    Discover {
        #[arg(long, default_value = "")]
        search: String,

        #[arg(long, default_value = "1")]
        page: u64,

        #[arg(long)]
        page_size: Option<u64>,
    },
    /// List groups you are an active member of
    MyGroups,
    /// Ask to join a group
    RequestJoin { group_id: i64 },
}
