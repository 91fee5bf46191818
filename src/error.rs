//! Error types for sphere_seeker

use thiserror::Error;

use crate::core_modules::frame::Encoding;

#[derive(Error, Debug)]
pub enum SeekerError {
    #[error("Unsupported image encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Frame size mismatch for {encoding:?} {width}x{height}: expected at least {expected} bytes, got {actual}")]
    FrameSize {
        encoding: Encoding,
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Channel closed: {0}")]
    ChannelClosed(&'static str),
}

pub type Result<T> = std::result::Result<T, SeekerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeker_error_display() {
        let err = SeekerError::Config("control_period_ms must be non-zero".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("control_period_ms"));
    }

    #[test]
    fn test_seeker_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let seeker_err: SeekerError = io_err.into();
        match seeker_err {
            SeekerError::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_frame_size_display_names_both_lengths() {
        let err = SeekerError::FrameSize {
            encoding: Encoding::Bgr8,
            width: 4,
            height: 2,
            expected: 24,
            actual: 10,
        };
        let text = err.to_string();
        assert!(text.contains("24"));
        assert!(text.contains("10"));
    }
}
