//! Error types for the display compositor

use thiserror::Error;

/// Result type alias for compositor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while compositing and delivering frames
#[derive(Error, Debug)]
pub enum Error {
    /// A widget failed to render its image
    #[error("Widget render failed: {0}")]
    Render(String),

    /// A widget failed to refresh its internal state
    #[error("Widget update failed: {0}")]
    Update(String),

    /// Recoverable frame sink failure (frame dropped)
    #[error("Frame sink error: {0}")]
    Sink(String),

    /// The frame sink lost its connection to the display service
    #[error("Frame sink connection error: {0}")]
    Connection(String),

    /// Bitmap encoding failed
    #[error("Encoding failed: {0}")]
    Encode(String),

    /// Encoder produced a buffer of the wrong size
    #[error("Encoded frame has {actual} bytes, expected {expected}")]
    EncodedLength { expected: usize, actual: usize },

    /// `start()` called on a compositor that is already running
    #[error("Compositor already running")]
    AlreadyRunning,

    /// The render loop is not running (or exited before answering)
    #[error("Compositor is not running")]
    NotRunning,

    /// Viewport operation on a layout whose virtual canvas equals the display
    #[error("Layout is not in viewport mode")]
    NoViewport,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Errors raised by the frame sink. These are logged with rate limiting
    /// by the render loop.
    pub fn is_sink_error(&self) -> bool {
        matches!(self, Error::Sink(_) | Error::Connection(_))
    }

    /// Usage errors are programming mistakes rather than runtime conditions.
    pub fn is_usage_error(&self) -> bool {
        matches!(self, Error::AlreadyRunning | Error::EncodedLength { .. })
    }
}
