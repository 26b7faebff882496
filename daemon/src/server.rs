use crate::error::ServerError;
use crate::services::{CallbacksService, InfoService};
use cmdline_core::info::info_server::InfoServer;
use cmdline_core::v1alpha2::callbacks_server::CallbacksServer;
use std::future::Future;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use tokio::net::UnixListener;
use tokio_stream::wrappers::UnixListenerStream;
use tonic::transport::Server;

/// Listening hook socket. The socket file is unlinked once the socket is
/// dropped or has finished serving.
pub struct HookSocket {
    listener: UnixListener,
    guard: SocketGuard,
}

struct SocketGuard {
    path: PathBuf,
}

impl Drop for SocketGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Removed socket {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove socket {}: {}", self.path.display(), e),
        }
    }
}

impl HookSocket {
    /// Bind `path`, replacing a stale socket left by a previous run.
    pub fn bind(path: &Path) -> Result<Self, ServerError> {
        let bind_error = |source: std::io::Error| ServerError::Bind {
            path: path.to_path_buf(),
            source,
        };

        match std::fs::symlink_metadata(path) {
            Ok(metadata) if metadata.file_type().is_socket() => {
                tracing::warn!("Removing stale socket {}", path.display());
                std::fs::remove_file(path).map_err(bind_error)?;
            }
            Ok(_) => return Err(ServerError::Occupied(path.to_path_buf())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(bind_error(e)),
        }

        let listener = UnixListener::bind(path).map_err(bind_error)?;
        Ok(Self {
            listener,
            guard: SocketGuard {
                path: path.to_path_buf(),
            },
        })
    }

    pub fn path(&self) -> &Path {
        &self.guard.path
    }

    /// Serve the `info` and `v1alpha2` hook services until `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send,
    {
        let HookSocket { listener, guard } = self;

        tracing::info!(
            "Starting hook server exposing 'info' and 'v1alpha2' services on socket {}",
            guard.path.display()
        );

        Server::builder()
            .add_service(InfoServer::new(InfoService))
            .add_service(CallbacksServer::new(CallbacksService))
            .serve_with_incoming_shutdown(UnixListenerStream::new(listener), shutdown)
            .await?;

        drop(guard);
        Ok(())
    }
}

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!("Failed to install SIGTERM handler: {}", e);
            let _ = tokio::signal::ctrl_c().await;
        }
    }

    tracing::info!("Shutdown signal received, stopping hook server");
}
