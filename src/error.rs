use crate::codec::DecodeError;
use crate::crypto::CryptoError;

/// Error originating from the CCN client library
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid argument")]
    Invalid,
    #[error("malformed data: {0}")]
    Decode(#[from] DecodeError),
    #[error("{0}")]
    Crypto(#[from] CryptoError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not connected to the forwarder")]
    NotConnected,
    #[error("the event loop is already running")]
    Busy,
    #[error("internal error")]
    Internal,
}

/// Coarse classification of an [Error], kept as the "last error" note on a
/// handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Invalid,
    Io,
    NotConnected,
    Busy,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Invalid | Error::Decode(_) | Error::Crypto(_) => ErrorKind::Invalid,
            Error::Io(_) => ErrorKind::Io,
            Error::NotConnected => ErrorKind::NotConnected,
            Error::Busy => ErrorKind::Busy,
            Error::Internal => ErrorKind::Internal,
        }
    }
}
