//! Command-line interface, parsed with clap.

mod commands;

use clap::{Parser, Subcommand};

/// DynaSearch - page search, weather forecast and user accounts
#[derive(Parser)]
#[command(name = "dynasearch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server (default)
    #[command(alias = "web")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Require the given users to choose a new password at their next login
    MarkBreached {
        /// Usernames whose credentials were exposed
        #[arg(required = true)]
        usernames: Vec<String>,
    },
}

pub use commands::*;
