use std::fmt;

#[derive(Debug)]
pub enum CameraError {
    /// No camera was found or the driver system could not be opened.
    AcquisitionError(String),
    /// The camera/session was already released (or never acquired).
    SessionReleased(String),
    /// A device parameter could not be read or written.
    ControlError(String),
    /// Starting or stopping frame delivery failed.
    StreamError(String),
    EncodingError(String),
    IoError(String),
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CameraError::AcquisitionError(msg) => write!(f, "Camera acquisition error: {}", msg),
            CameraError::SessionReleased(msg) => write!(f, "Camera session released: {}", msg),
            CameraError::ControlError(msg) => write!(f, "Camera control error: {}", msg),
            CameraError::StreamError(msg) => write!(f, "Stream error: {}", msg),
            CameraError::EncodingError(msg) => write!(f, "Encoding error: {}", msg),
            CameraError::IoError(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for CameraError {}
