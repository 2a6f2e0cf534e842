//! Error types for the K13988 panel hardware library.

use thiserror::Error;

use crate::link::LinkState;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the control panel.
#[derive(Error, Debug)]
pub enum Error {
    /// A command exhausted its retry budget without an acknowledgement.
    ///
    /// This is fatal for the session: the link is left in an unusable state
    /// and must be torn down with [`Panel::close`](crate::Panel::close) and
    /// reopened. There is no automatic reconnect.
    #[error("no acknowledgement from K13988 after {0} transmissions")]
    NoAcknowledgement(u32),

    /// A command was submitted while the link was not accepting commands.
    #[error("link is {0}, not accepting commands")]
    NotReady(LinkState),

    /// Serial port communication error.
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// Transport or enable line I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
