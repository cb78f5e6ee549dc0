/// Rounds `len` up to a whole number of XDR units.
#[inline]
#[must_use]
pub const fn add_padding(len: usize) -> usize {
    len + get_padding(len)
}

/// Number of zero bytes that follow `len` bytes of opaque data.
#[inline]
#[must_use]
pub const fn get_padding(len: usize) -> usize {
    (4 - len % 4) % 4
}

static ZEROES: [u8; 3] = [0; 3];

pub(crate) fn zero_padding(len: usize) -> &'static [u8] {
    &ZEROES[..get_padding(len)]
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn padding_to_xdr_units() {
        let cases = [(0, 0, 0), (1, 3, 4), (2, 2, 4), (3, 1, 4), (4, 0, 4), (21, 3, 24)];
        for (len, padding, padded) in cases {
            assert_eq!(get_padding(len), padding, "padding of {len}");
            assert_eq!(add_padding(len), padded, "padded length of {len}");
            assert_eq!(zero_padding(len).len(), padding);
        }
    }
}
