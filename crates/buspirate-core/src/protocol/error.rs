//! Transport errors

use thiserror::Error;

/// Failures of the underlying byte stream.
///
/// These are never retried by the protocol layer; they end the current
/// operation chain and are handed straight back to the caller.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The port could not be opened
    #[error("Unable to open serial port {path}: {source}")]
    Open {
        /// Requested device path
        path: String,
        /// Error from the serial backend
        #[source]
        source: serialport::Error,
    },

    /// Port configuration or thread setup failed
    #[error("Serial port error: {0}")]
    SerialError(String),

    /// Writing a command failed
    #[error("Write failed: {0}")]
    Write(#[source] std::io::Error),

    /// The reader thread hit an I/O error
    #[error("Read failed: {0}")]
    Read(#[source] std::io::Error),

    /// End of stream
    #[error("Connection closed by device")]
    Closed,
}
