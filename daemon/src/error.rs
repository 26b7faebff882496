use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to bind {}: {source}", .path.display())]
    Bind {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} exists and is not a socket", .0.display())]
    Occupied(PathBuf),

    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
}
