use hyper_util::rt::TokioIo;
use std::path::Path;
use tonic::transport::{Channel, Endpoint, Error, Uri};
use tower::service_fn;

/// Open a channel to a hook listening on a Unix socket.
///
/// The endpoint URI is a placeholder required by tonic; every connection is
/// routed to `socket_path`.
pub async fn connect_unix(socket_path: impl AsRef<Path>) -> Result<Channel, Error> {
    let socket_path = socket_path.as_ref().to_path_buf();
    tracing::debug!("Connecting to hook socket {}", socket_path.display());

    Endpoint::from_static("http://[::]:50051")
        .connect_with_connector(service_fn(move |_: Uri| {
            let socket_path = socket_path.clone();
            async move {
                let stream = tokio::net::UnixStream::connect(socket_path).await?;
                Ok::<_, std::io::Error>(TokioIo::new(stream))
            }
        }))
        .await
}
