use core::fmt;

/// Errors returned by the driver.
///
/// None of them is fatal: the caller may retry the whole operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A command argument is out of range (e.g. duty cycle above 30).
    InvalidParameter,
    /// No complete reply arrived within the wait budget.
    Timeout,
    /// Wrong length, head/tail byte or command id.
    FramingError,
    /// The embedded checksum does not match the recomputed one.
    ChecksumMismatch { expected: u8, received: u8 },
    /// The reply does not echo what was sent.
    EchoMismatch {
        index: usize,
        expected: u8,
        received: u8,
    },
    /// A measurement query was issued before the minimum interval elapsed.
    RateLimited,
    /// The sensor answered with the same raw values as the previous reading.
    NoNewData,
    /// Aggregate failure of a measurement query exchange.
    ResponseError,
    /// The sensor reported a value that maps to no known setting.
    UnexpectedValue(u8),
    WriteFailure,
    ReadFailure,
}

impl Error {
    // Collapses exchange failures into the single error of the query path.
    pub(crate) fn into_response_error(self) -> Error {
        match self {
            Error::Timeout
            | Error::FramingError
            | Error::ChecksumMismatch { .. }
            | Error::EchoMismatch { .. } => Error::ResponseError,
            other => other,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidParameter => write!(f, "invalid parameter"),
            Error::Timeout => write!(f, "no reply within the wait budget"),
            Error::FramingError => write!(f, "malformed reply frame"),
            Error::ChecksumMismatch { expected, received } => write!(
                f,
                "checksum mismatch: expected {:02X}, received {:02X}",
                expected, received
            ),
            Error::EchoMismatch {
                index,
                expected,
                received,
            } => write!(
                f,
                "reply byte {} is {:02X}, expected {:02X}",
                index, received, expected
            ),
            Error::RateLimited => write!(f, "query issued too often"),
            Error::NoNewData => write!(f, "no new measurement available"),
            Error::ResponseError => write!(f, "invalid response to query"),
            Error::UnexpectedValue(v) => write!(f, "unexpected value {:02X}", v),
            Error::WriteFailure => write!(f, "serial write failed"),
            Error::ReadFailure => write!(f, "serial read failed"),
        }
    }
}
