use crate::config::SignaturePolicy;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "signed-ledger")]
pub struct Opt {
    #[arg(long, global = true, help = "TOML file with node settings")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(
        name = "startnode",
        about = "Seed the ledger with a genesis block and serve signed requests"
    )]
    StartNode {
        #[arg(long, help = "Address to listen on")]
        address: Option<String>,
        #[arg(
            long = "policy",
            help = "Requests that must be signed (all, mutating, none)"
        )]
        policy: Option<SignaturePolicy>,
        #[arg(long, help = "Serve connections concurrently")]
        concurrent: bool,
    },
    #[command(name = "client", about = "Interactive client for a running node")]
    Client {
        #[arg(long, help = "Address of the node")]
        address: Option<String>,
        #[arg(long, help = "Send requests without a signature")]
        unsigned: bool,
    },
    #[command(name = "demo", about = "Interactive ledger in this process, no network")]
    Demo,
    #[command(name = "keygen", about = "Generate a keypair and print its client ID")]
    Keygen,
}
