use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnhanceError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Image codec error: {0}")]
    ImageCodecError(String),

    #[error("Enhancement failure: {0}")]
    EnhancementFailure(String),

    #[error("PDF read error: {0}")]
    PdfReadError(String),

    #[error("PDF write error: {0}")]
    PdfWriteError(String),

    #[error("No embedded image: {0}")]
    NoEmbeddedImage(String),

    #[error("Staging key mismatch: {0}")]
    StagingKeyMismatch(String),

    #[error("Workflow error: {0}")]
    WorkflowError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Generates factory methods for [`EnhanceError`] variants that wrap a `String`.
macro_rules! error_constructors {
    ($(
        $(#[doc = $doc:expr])*
        $method:ident => $variant:ident
    ),* $(,)?) => {
        impl EnhanceError {
            $(
                $(#[doc = $doc])*
                pub fn $method(msg: impl Into<String>) -> Self {
                    Self::$variant(msg.into())
                }
            )*
        }
    };
}

error_constructors! {
    /// Create a configuration error.
    config => ConfigError,
    /// Create an invalid image error.
    invalid_image => InvalidImage,
    /// Create an image codec error.
    image_codec => ImageCodecError,
    /// Create an enhancement failure.
    enhancement => EnhancementFailure,
    /// Create a PDF read error.
    pdf_read => PdfReadError,
    /// Create a PDF write error.
    pdf_write => PdfWriteError,
    /// Create a no-embedded-image error.
    no_embedded_image => NoEmbeddedImage,
    /// Create a staging key mismatch error.
    staging_key_mismatch => StagingKeyMismatch,
    /// Create a workflow state error.
    workflow => WorkflowError,
}

impl From<lopdf::Error> for EnhanceError {
    fn from(e: lopdf::Error) -> Self {
        Self::PdfReadError(e.to_string())
    }
}

impl From<image::ImageError> for EnhanceError {
    fn from(e: image::ImageError) -> Self {
        Self::ImageCodecError(e.to_string())
    }
}

impl From<serde_json::Error> for EnhanceError {
    fn from(e: serde_json::Error) -> Self {
        Self::WorkflowError(e.to_string())
    }
}

impl From<serde_yml::Error> for EnhanceError {
    fn from(e: serde_yml::Error) -> Self {
        Self::ConfigError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EnhanceError>;
