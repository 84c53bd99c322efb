use core::fmt;

use crate::event::QueueError;
use crate::lorawan::mac::CodecError;
use crate::lorawan::region::RegionError;

/// Stack error
///
/// HAL failures are reported by kind; the collaborator's own error value is
/// logged at the point of failure and not carried further.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The session has not been initialized or is latched in fault
    NotInitialized,
    /// The operation or event is not valid in the current state
    InvalidState,
    /// No channel is available for transmission
    NoChannel,
    /// Invalid argument or unexpected frame
    InvalidParameters,
    /// Random source failure
    Random,
    /// Event queue failure
    Queue(QueueError),
    /// The operation needs another activation type
    ActivationMismatch,
    /// Non-volatile storage failure
    Storage,
    /// Frame encoding or decoding failure
    Codec(CodecError),
    /// Crypto failure or MIC mismatch
    Crypto,
    /// Radio failure
    Radio,
    /// Region configuration failure
    Region(RegionError),
    /// Timer failure
    Timer,
}

impl From<CodecError> for Error {
    fn from(err: CodecError) -> Self {
        Error::Codec(err)
    }
}

impl From<QueueError> for Error {
    fn from(err: QueueError) -> Self {
        Error::Queue(err)
    }
}

impl From<RegionError> for Error {
    fn from(err: RegionError) -> Self {
        match err {
            RegionError::NoChannel => Error::NoChannel,
            err => Error::Region(err),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotInitialized => f.write_str("stack not initialized"),
            Error::InvalidState => f.write_str("invalid state"),
            Error::NoChannel => f.write_str("no channel available"),
            Error::InvalidParameters => f.write_str("invalid parameters"),
            Error::Random => f.write_str("random source failure"),
            Error::Queue(err) => write!(f, "event queue failure: {}", err),
            Error::ActivationMismatch => f.write_str("activation type mismatch"),
            Error::Storage => f.write_str("storage failure"),
            Error::Codec(err) => write!(f, "codec failure: {}", err),
            Error::Crypto => f.write_str("crypto failure"),
            Error::Radio => f.write_str("radio failure"),
            Error::Region(err) => write!(f, "region failure: {}", err),
            Error::Timer => f.write_str("timer failure"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for CodecError {}

#[cfg(feature = "std")]
impl std::error::Error for QueueError {}

#[cfg(feature = "std")]
impl std::error::Error for RegionError {}

/// Result type of the stack
pub type Result<T> = core::result::Result<T, Error>;
