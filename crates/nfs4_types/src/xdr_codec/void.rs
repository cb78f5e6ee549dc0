use super::{Pack, Result, Unpack};

/// XDR `void`, the empty arm of a union.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Void;

impl Pack for Void {
    fn packed_size(&self) -> usize {
        0
    }

    fn pack(&self, _out: &mut impl std::io::Write) -> Result<usize> {
        Ok(0)
    }
}

impl Unpack for Void {
    fn unpack(_input: &mut impl std::io::Read) -> Result<(Self, usize)> {
        Ok((Self, 0))
    }
}
