use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Empty image input")]
    EmptyInput,
}
