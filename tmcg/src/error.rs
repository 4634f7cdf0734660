//! Error type

/// Errors produced by the toolbox
#[derive(Debug)]
pub enum Error {
    /// Occurs when a textual record is malformed
    Parse(&'static str),
    /// Occurs when a proof stream fails mid-exchange
    Io(std::io::Error),
    /// Occurs when the peer violates a proof protocol
    Protocol(&'static str),
    /// Occurs when the VTMF key exchange is misused
    KeyExchange(crate::vtmf::KeyExchangeError),
    /// Occurs when the VTMF decryption protocol is misused
    Decryption(crate::vtmf::DecryptionError),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<crate::vtmf::KeyExchangeError> for Error {
    fn from(e: crate::vtmf::KeyExchangeError) -> Self {
        Error::KeyExchange(e)
    }
}

impl From<crate::vtmf::DecryptionError> for Error {
    fn from(e: crate::vtmf::DecryptionError) -> Self {
        Error::Decryption(e)
    }
}

impl From<Error> for std::fmt::Error {
    fn from(_: Error) -> Self {
        std::fmt::Error
    }
}
