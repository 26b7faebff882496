mod commands;

use clap::{Parser, Subcommand};
use cmdline_core::HOOK_SOCKETS_DIR;
use commands::{define_domain, info};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cmdline-hookctl")]
#[command(about = "Talk to a running command-line hook sidecar")]
struct Cli {
    /// Path of the hook socket
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the hook's name, API versions and hook points
    Info,
    /// Run OnDefineDomain and print the resulting domain XML
    DefineDomain {
        /// VirtualMachineInstance JSON file
        #[arg(long)]
        vmi: PathBuf,

        /// libvirt domain XML file
        #[arg(long)]
        domain: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let socket = cli
        .socket
        .unwrap_or_else(|| PathBuf::from(HOOK_SOCKETS_DIR).join("commandline.sock"));

    match cli.command {
        Commands::Info => info(&socket).await?,
        Commands::DefineDomain { vmi, domain } => define_domain(&socket, &vmi, &domain).await?,
    }

    Ok(())
}
