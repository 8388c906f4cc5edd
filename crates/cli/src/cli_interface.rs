use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new bundler project
    Init {
        /// optional - The path to create the project in, default will be where the command is run.
        #[clap(long, short)]
        path: Option<String>,
    },
    /// Start the bundler JSON-RPC service
    Start {
        #[clap(long, short)]
        path: Option<String>,
    },
    /// Show the relay wallets with their on-chain balance and nonce
    Wallets {
        #[clap(long, short)]
        path: Option<String>,
    },
}
