use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "scopegate-server", version)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Serve,
    Migrate,
    CreateApiKey {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        account_id: Option<String>,
        #[arg(long)]
        profile_id: Option<String>,
    },
    RevokeApiKey {
        #[arg(long)]
        key_id: String,
    },
}
