use std::io::{Read, Write};

use super::util::{add_padding, get_padding, zero_padding};
use super::{Error, Pack, Result, Unpack};

/// Upper bound for the capacity reserved up front from an untrusted length prefix.
const MAX_PREALLOCATED_ITEMS: usize = 1024;

macro_rules! impl_xdr_number {
    ($($ty:ty),*) => {$(
        impl Pack for $ty {
            fn packed_size(&self) -> usize {
                size_of::<$ty>()
            }

            fn pack(&self, out: &mut impl Write) -> Result<usize> {
                out.write_all(&self.to_be_bytes())?;
                Ok(size_of::<$ty>())
            }
        }

        impl Unpack for $ty {
            fn unpack(input: &mut impl Read) -> Result<(Self, usize)> {
                let mut bytes = [0u8; size_of::<$ty>()];
                input.read_exact(&mut bytes)?;
                Ok((Self::from_be_bytes(bytes), size_of::<$ty>()))
            }
        }
    )*};
}

impl_xdr_number!(u32, i32, u64, i64);

impl Pack for bool {
    fn packed_size(&self) -> usize {
        4
    }

    fn pack(&self, out: &mut impl Write) -> Result<usize> {
        u32::from(*self).pack(out)
    }
}

impl Unpack for bool {
    fn unpack(input: &mut impl Read) -> Result<(Self, usize)> {
        let (val, bytes_read) = u32::unpack(input)?;
        match val {
            0 => Ok((false, bytes_read)),
            1 => Ok((true, bytes_read)),
            _ => Err(Error::InvalidEnumValue(val)),
        }
    }
}

/// Fixed-length opaque data (`opaque name[N]`).
impl<const N: usize> Pack for [u8; N] {
    fn packed_size(&self) -> usize {
        add_padding(N)
    }

    fn pack(&self, out: &mut impl Write) -> Result<usize> {
        out.write_all(self)?;
        out.write_all(zero_padding(N))?;
        Ok(add_padding(N))
    }
}

impl<const N: usize> Unpack for [u8; N] {
    fn unpack(input: &mut impl Read) -> Result<(Self, usize)> {
        let mut bytes = [0u8; N];
        input.read_exact(&mut bytes)?;
        let mut padding = [0u8; 3];
        input.read_exact(&mut padding[..get_padding(N)])?;
        Ok((bytes, add_padding(N)))
    }
}

/// Variable-length array (`T name<>`).
impl<T: Pack> Pack for Vec<T> {
    fn packed_size(&self) -> usize {
        4 + self.iter().map(Pack::packed_size).sum::<usize>()
    }

    fn pack(&self, out: &mut impl Write) -> Result<usize> {
        let len = u32::try_from(self.len()).map_err(|_| Error::ObjectTooLarge(self.len()))?;
        let mut bytes_written = len.pack(out)?;
        for item in self {
            bytes_written += item.pack(out)?;
        }
        Ok(bytes_written)
    }
}

impl<T: Unpack> Unpack for Vec<T> {
    fn unpack(input: &mut impl Read) -> Result<(Self, usize)> {
        let (len, mut bytes_read) = u32::unpack(input)?;
        let len = len as usize;
        let mut items = Self::with_capacity(len.min(MAX_PREALLOCATED_ITEMS));
        for _ in 0..len {
            let (item, item_bytes) = T::unpack(input)?;
            bytes_read += item_bytes;
            items.push(item);
        }
        Ok((items, bytes_read))
    }
}

/// Optional data (`T *name`).
impl<T: Pack> Pack for Option<T> {
    fn packed_size(&self) -> usize {
        4 + self.as_ref().map_or(0, Pack::packed_size)
    }

    fn pack(&self, out: &mut impl Write) -> Result<usize> {
        match self {
            Some(value) => Ok(true.pack(out)? + value.pack(out)?),
            None => false.pack(out),
        }
    }
}

impl<T: Unpack> Unpack for Option<T> {
    fn unpack(input: &mut impl Read) -> Result<(Self, usize)> {
        let (present, bytes_read) = bool::unpack(input)?;
        if !present {
            return Ok((None, bytes_read));
        }
        let (value, value_bytes) = T::unpack(input)?;
        Ok((Some(value), bytes_read + value_bytes))
    }
}

/// XDR `string<>`. Strings that are not valid UTF-8 are rejected.
impl Pack for String {
    fn packed_size(&self) -> usize {
        4 + add_padding(self.len())
    }

    fn pack(&self, out: &mut impl Write) -> Result<usize> {
        super::Opaque::borrowed(self.as_bytes()).pack(out)
    }
}

impl Unpack for String {
    fn unpack(input: &mut impl Read) -> Result<(Self, usize)> {
        let (bytes, bytes_read) = super::Opaque::unpack(input)?;
        let value = Self::from_utf8(bytes.into_owned())
            .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        Ok((value, bytes_read))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::io::Cursor;

    use super::*;

    #[test]
    fn fixed_opaque_is_padded() {
        let value = [1u8, 2, 3, 4, 5];
        let mut buf = Vec::new();
        assert_eq!(value.pack(&mut buf).unwrap(), 8);
        assert_eq!(buf, [1, 2, 3, 4, 5, 0, 0, 0]);

        let (decoded, read) = <[u8; 5]>::unpack(&mut Cursor::new(buf)).unwrap();
        assert_eq!(read, 8);
        assert_eq!(decoded, value);
    }

    #[test]
    fn bool_rejects_other_values() {
        let err = bool::unpack(&mut Cursor::new([0, 0, 0, 2])).unwrap_err();
        assert!(matches!(err, Error::InvalidEnumValue(2)));
    }

    #[test]
    fn option_encodes_presence_flag() {
        let mut buf = Vec::new();
        Some(7u32).pack(&mut buf).unwrap();
        None::<u32>.pack(&mut buf).unwrap();
        assert_eq!(buf, [0, 0, 0, 1, 0, 0, 0, 7, 0, 0, 0, 0]);
    }

    #[test]
    fn string_rejects_invalid_utf8() {
        let buf = [0, 0, 0, 2, 0xff, 0xfe, 0, 0];
        assert!(String::unpack(&mut Cursor::new(buf)).is_err());
    }

    #[test]
    fn truncated_array_fails() {
        let buf = [0, 0, 0, 3, 0, 0, 0, 1];
        assert!(Vec::<u32>::unpack(&mut Cursor::new(buf)).is_err());
    }
}
