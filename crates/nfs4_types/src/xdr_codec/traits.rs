use std::io::{Read, Write};

use super::Result;

/// Encodes a value in XDR.
pub trait Pack {
    /// Encoded length in bytes, padding included.
    fn packed_size(&self) -> usize;

    /// Writes the value and returns how many bytes were written.
    fn pack(&self, out: &mut impl Write) -> Result<usize>;
}

/// Decodes a value from XDR, returning it with the number of bytes consumed.
pub trait Unpack: Sized {
    fn unpack(input: &mut impl Read) -> Result<(Self, usize)>;
}
