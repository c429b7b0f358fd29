//! Command-line interface definitions and parsing

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Walk one message through offline send, reconnect replay and acknowledgment
    Demo {
        /// Recipient name to use
        #[arg(short, long)]
        recipient: Option<String>,
    },
    /// Push many messages concurrently to online recipients and acknowledge them all
    Load {
        /// Number of online recipients
        #[arg(short, long, default_value_t = 16)]
        recipients: usize,
        /// Messages sent to each recipient
        #[arg(short, long, default_value_t = 8)]
        messages: usize,
    },
}
