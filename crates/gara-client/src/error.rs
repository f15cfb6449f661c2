use thiserror::Error;

/// Errors produced by the client session logic.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Media error: {0}")]
    Media(#[from] gara_media::MediaError),

    #[error("Store error: {0}")]
    Store(#[from] gara_store::StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Attachment too large: {size} bytes (max {max})")]
    AttachmentTooLarge { size: usize, max: usize },

    #[error("Background task failed: {0}")]
    TaskFailed(String),
}
