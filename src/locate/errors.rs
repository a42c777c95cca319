use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocateError {
    #[error("marker must not be empty")]
    EmptyMarker,

    #[error("invalid boundary pattern: {message}")]
    InvalidPattern { message: String },

    #[error("marker {marker:?} not found")]
    MarkerNotFound { marker: String },

    #[error("no boundary matching {pattern:?} after marker {marker:?}")]
    BoundaryNotFound { marker: String, pattern: String },
}
