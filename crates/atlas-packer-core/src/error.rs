use thiserror::Error;

#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// A source entry is malformed, missing or zero-sized.
    #[error("Invalid input '{name}': {reason}")]
    InvalidInput { name: String, reason: String },
    /// An entry cannot fit on an empty page. `width`/`height` exclude the padding.
    #[error(
        "'{name}' ({width}x{height} plus {padding}px padding) does not fit a {page_width}x{page_height} page"
    )]
    OutOfSpace {
        name: String,
        width: u32,
        height: u32,
        padding: u32,
        page_width: u32,
        page_height: u32,
    },
    /// The forced pixel format conflicts with the merge policy.
    #[error("Pixel format error: {0}")]
    Format(String),
    #[error("Invalid atlas dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Nothing to pack")]
    Empty,
    /// The on-disk index and page files disagree.
    #[error("Corrupt atlas: {0}")]
    Corrupt(String),
}

impl AtlasError {
    pub(crate) fn invalid_input(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AtlasError>;
