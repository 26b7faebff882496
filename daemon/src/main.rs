mod error;
mod server;
mod services;

use clap::Parser;
use cmdline_core::HOOK_SOCKETS_DIR;
use server::HookSocket;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cmdline-hook-sidecar")]
#[command(about = "KubeVirt hook sidecar appending QEMU arguments from VMI annotations")]
struct Cli {
    /// Directory virt-launcher scans for hook sockets
    #[arg(long, default_value = HOOK_SOCKETS_DIR)]
    socket_dir: PathBuf,

    /// File name of the hook socket
    #[arg(long, default_value = "commandline.sock")]
    socket_name: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let socket_path = cli.socket_dir.join(&cli.socket_name);

    let socket = match HookSocket::bind(&socket_path) {
        Ok(socket) => socket,
        Err(e) => {
            tracing::error!("Failed to initialize socket: {}", e);
            tracing::error!(
                "Check whether given directory exists and socket name is not already taken by other file"
            );
            return Err(e.into());
        }
    };

    tracing::debug!("Bound hook socket {}", socket.path().display());
    socket.serve(server::shutdown_signal()).await?;
    Ok(())
}
