//! Error types for the NAMUR driver

use thiserror::Error;

/// Core error type for NAMUR operations
#[derive(Error, Debug)]
pub enum NamurError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serial session could not be established (bad port, device absent, port busy)
    #[error("Connection error: {0}")]
    Connection(String),

    /// I/O failure mid-exchange (write timeout, read error)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input or arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The blocking serial worker failed before returning a result
    #[error("Serial worker failed: {0}")]
    Worker(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl NamurError {
    /// True when the session could not be opened
    pub fn is_connection_error(&self) -> bool {
        matches!(self, NamurError::Connection(_))
    }

    /// True for read/write failures on an open session
    pub fn is_io_error(&self) -> bool {
        matches!(self, NamurError::Io(_))
    }
}

/// Result type alias for NAMUR operations
pub type Result<T> = std::result::Result<T, NamurError>;

impl From<toml::de::Error> for NamurError {
    fn from(err: toml::de::Error) -> Self {
        NamurError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("not = [valid").unwrap_err();
        let namur_err: NamurError = toml_err.into();

        match namur_err {
            NamurError::Config(msg) => {
                assert!(!msg.is_empty());
            }
            _ => panic!("Expected Config error"),
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::TimedOut, "write timed out");
        let namur_err: NamurError = io_err.into();

        assert!(namur_err.is_io_error());
        assert!(!namur_err.is_connection_error());
        match namur_err {
            NamurError::Io(e) => {
                assert_eq!(e.kind(), std::io::ErrorKind::TimedOut);
            }
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_error_display() {
        let err = NamurError::Connection("/dev/ttyUSB0: No such file or directory".to_string());
        assert_eq!(
            format!("{}", err),
            "Connection error: /dev/ttyUSB0: No such file or directory"
        );
        assert!(err.is_connection_error());

        let err = NamurError::InvalidInput("empty command".to_string());
        assert_eq!(format!("{}", err), "Invalid input: empty command");

        let err = NamurError::Worker("task panicked".to_string());
        assert_eq!(format!("{}", err), "Serial worker failed: task panicked");
    }
}
