use std::fmt;

/// Failure to encode or decode an XDR stream.
#[derive(Debug)]
pub enum Error {
    /// The underlying reader or writer failed, including running out of input.
    Io(std::io::Error),
    /// A discriminant outside the values an enum, bool or union allows.
    InvalidEnumValue(u32),
    /// A variable-length item longer than its 32-bit length prefix can express.
    ObjectTooLarge(usize),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "XDR I/O error: {e}"),
            Self::InvalidEnumValue(value) => write!(f, "unexpected discriminant {value}"),
            Self::ObjectTooLarge(size) => write!(f, "{size} bytes do not fit an XDR length"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::InvalidEnumValue(_) | Self::ObjectTooLarge(_) => None,
        }
    }
}
