//! Error taxonomy for a proxy session.
//!
//! Every variant is terminal for the session that produced it. Only the
//! relay engine retries, and only internally before it reports.

use crate::protocol::Command;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// ProxyError is returned by every protocol phase of a session
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Client spoke something other than SOCKS5 (or an unknown
    /// sub-negotiation version)
    #[error("unsupported protocol version: {0:#04x}")]
    ProtocolVersion(u8),

    /// Stream ended before a fixed-size field was fully read
    #[error("malformed frame: short read of {0}")]
    Framing(&'static str),

    /// Greeting advertised zero authentication methods
    #[error("client offered no authentication methods")]
    NoAuthMethods,

    /// None of the offered methods is acceptable under the configuration
    #[error("no acceptable authentication method among {0:?}")]
    UnsupportedMethod(Vec<u8>),

    /// Username/password did not match the configured credentials
    #[error("authentication failed for user {0:?}")]
    Authentication(String),

    /// A known SOCKS5 command this proxy does not implement
    #[error("{0} command not supported")]
    UnsupportedCommand(Command),

    #[error("unknown command: {0:#04x}")]
    UnknownCommand(u8),

    #[error("unsupported address type: {0:#04x}")]
    UnsupportedAddressType(u8),

    /// Dial to the requested destination failed
    #[error("target {target} unreachable: {source}")]
    TargetUnreachable {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to write reply: {0}")]
    ReplyWrite(#[source] io::Error),

    #[error("relay error: {0}")]
    Relay(#[source] io::Error),

    #[error("relay gave up after {0} attempts")]
    MaxRetriesExceeded(u32),

    #[error("handshake not completed within {0:?}")]
    HandshakeTimeout(Duration),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// read_field maps a failed `read_exact` into the session taxonomy:
/// a short read is a framing error, anything else stays an I/O error
pub(crate) fn read_field(field: &'static str) -> impl FnOnce(io::Error) -> ProxyError {
    move |e| match e.kind() {
        io::ErrorKind::UnexpectedEof => ProxyError::Framing(field),
        _ => ProxyError::Io(e),
    }
}

/// is_connection_reset reports whether an I/O error is the transient
/// "connection reset / broken pipe" class
pub fn is_connection_reset(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionReset | io::ErrorKind::BrokenPipe
    )
}
