//! Crate-wide error taxonomy.
//!
//! Every error the core can produce falls into one of the kinds below; each
//! converts to a [`Status`](crate::status::Status) at the boundary where it
//! becomes user-visible (call result, trailers, or a reset stream).

use std::fmt;
use std::io;

use crate::status::{Code, Status};

/// High-level classification of an internal error, independent of the
/// concrete cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The underlying connection died, handshake failed, or the peer sent
    /// malformed frames.
    Transport,
    /// Illegal state transition, missing required header, bad compression
    /// byte, unexpected end of stream.
    Protocol,
    /// Message exceeds a configured limit, unsupported compression,
    /// unauthorized metadata key.
    Policy,
    /// A deadline fired, or cancellation was requested.
    Deadline,
    /// A handler-thrown failure that the application did not convert to an
    /// explicit `Status`.
    Application,
}

/// Crate-wide error type. Always convertible to a terminal [`Status`] via
/// [`Error::to_status`].
#[derive(Debug)]
pub enum Error {
    /// Connection-level failure (handshake, I/O, malformed frame at the
    /// transport boundary).
    Transport(String),
    /// Protocol violation: illegal state transition, missing/invalid
    /// header, truncated frame, bad compression flag.
    Protocol(String),
    /// Message size, compression, or metadata policy violation.
    Policy(PolicyViolation),
    /// Local deadline fired.
    DeadlineExceeded,
    /// Cancellation was requested locally or observed from the peer.
    Cancelled,
    /// Handler-level failure with no explicit status attached.
    Application(String),
    /// An explicit status produced by a handler or peer.
    Status(Status),
    /// Wrapped I/O error from the transport layer.
    Io(io::Error),
}

/// The specific policy a message or metadata entry violated.
#[derive(Debug, Clone)]
pub enum PolicyViolation {
    MessageTooLarge { actual: usize, max: usize },
    UnsupportedCompression(String),
    ReservedMetadataKey(String),
    InvalidMetadataValue(String),
}

impl fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MessageTooLarge { actual, max } => {
                write!(f, "message of {actual} bytes exceeds limit of {max} bytes")
            }
            Self::UnsupportedCompression(enc) => write!(f, "unsupported compression: {enc}"),
            Self::ReservedMetadataKey(key) => write!(f, "metadata key is reserved: {key}"),
            Self::InvalidMetadataValue(key) => write!(f, "invalid metadata value for key: {key}"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol error: {msg}"),
            Self::Policy(violation) => write!(f, "policy error: {violation}"),
            Self::DeadlineExceeded => write!(f, "deadline exceeded"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Application(msg) => write!(f, "application error: {msg}"),
            Self::Status(status) => write!(f, "{status}"),
            Self::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl Error {
    /// The taxonomy kind this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) | Self::Io(_) => ErrorKind::Transport,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Policy(_) => ErrorKind::Policy,
            Self::DeadlineExceeded | Self::Cancelled => ErrorKind::Deadline,
            Self::Application(_) => ErrorKind::Application,
            Self::Status(status) => code_to_kind(status.code()),
        }
    }

    /// Whether a retry policy is permitted to consider this error retryable.
    /// Only transport-level failures are retryable; protocol violations and
    /// policy breaches are not (retrying a message that is simply too large
    /// will never succeed).
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transport)
    }

    /// Converts this error into the terminal [`Status`] it should surface
    /// as.
    pub fn to_status(&self) -> Status {
        match self {
            Self::Transport(msg) => Status::new(Code::Unavailable, msg.clone()),
            Self::Protocol(msg) => Status::new(Code::Internal, msg.clone()),
            Self::Policy(violation) => Status::new(policy_code(violation), violation.to_string()),
            Self::DeadlineExceeded => Status::new(Code::DeadlineExceeded, "deadline exceeded"),
            Self::Cancelled => Status::new(Code::Cancelled, "cancelled"),
            Self::Application(msg) => Status::new(Code::Unknown, msg.clone()),
            Self::Status(status) => status.clone(),
            Self::Io(err) => Status::new(Code::Unavailable, err.to_string()),
        }
    }
}

fn policy_code(violation: &PolicyViolation) -> Code {
    match violation {
        PolicyViolation::MessageTooLarge { .. } => Code::ResourceExhausted,
        PolicyViolation::UnsupportedCompression(_) => Code::Unimplemented,
        PolicyViolation::ReservedMetadataKey(_) | PolicyViolation::InvalidMetadataValue(_) => {
            Code::InvalidArgument
        }
    }
}

fn code_to_kind(code: Code) -> ErrorKind {
    match code {
        Code::Unavailable => ErrorKind::Transport,
        Code::DeadlineExceeded | Code::Cancelled => ErrorKind::Deadline,
        Code::ResourceExhausted | Code::Unimplemented | Code::PermissionDenied => ErrorKind::Policy,
        Code::Internal | Code::DataLoss => ErrorKind::Protocol,
        _ => ErrorKind::Application,
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<Status> for Error {
    fn from(status: Status) -> Self {
        Self::Status(status)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
