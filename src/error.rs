use std::fmt::{Debug, Display, Error, Formatter};

// Error
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum QartError {
    // Session setup
    InvalidDesign(String),
    UploadFailed(String),

    // Per-attempt render path
    RenderTransport(String),
    MalformedRender(String),

    // Wrapped externals
    Image(String),
    Io(String),
}

impl Display for QartError {
    fn fmt(&self, f: &mut Formatter) -> Result<(), Error> {
        match self {
            Self::InvalidDesign(msg) => write!(f, "Invalid design: {msg}"),
            Self::UploadFailed(msg) => write!(f, "Reference upload failed: {msg}"),
            Self::RenderTransport(msg) => write!(f, "Render request failed: {msg}"),
            Self::MalformedRender(msg) => write!(f, "Malformed render response: {msg}"),
            Self::Image(msg) => write!(f, "Image error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for QartError {}

impl From<image::ImageError> for QartError {
    fn from(err: image::ImageError) -> Self {
        Self::Image(err.to_string())
    }
}

impl From<std::io::Error> for QartError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

pub type QartResult<T> = Result<T, QartError>;
