//! Error types for the checkout core
//!
//! Checkout decisions (invalid fields, declined settlements) are carried as
//! data on the form. This module only covers infrastructure failures.

use thiserror::Error;

/// Result type for checkout operations
pub type Result<T> = std::result::Result<T, Error>;

/// Checkout errors
#[derive(Error, Debug)]
pub enum Error {
    /// Session actor is gone (mailbox or reply channel closed)
    #[error("Session closed: {0}")]
    SessionClosed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// PIX payload could not be encoded
    #[error("PIX error: {0}")]
    Pix(#[from] crate::pix::PixError),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
