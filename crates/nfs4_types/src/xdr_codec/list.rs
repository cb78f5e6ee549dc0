use std::io::{Read, Write};

use super::{Pack, Result, Unpack};

/// A linked list in XDR form: every item is preceded by `TRUE` and the list
/// is terminated by `FALSE` (e.g. `entry4 *nextentry`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct List<T>(pub Vec<T>);

impl<T> Default for List<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T: Pack> Pack for List<T> {
    fn packed_size(&self) -> usize {
        4 + self.0.iter().map(|item| 4 + item.packed_size()).sum::<usize>()
    }

    fn pack(&self, out: &mut impl Write) -> Result<usize> {
        let mut len = 0;
        for item in &self.0 {
            len += true.pack(out)?;
            len += item.pack(out)?;
        }
        len += false.pack(out)?;
        Ok(len)
    }
}

impl<T: Unpack> Unpack for List<T> {
    fn unpack(input: &mut impl Read) -> Result<(Self, usize)> {
        let mut items = Vec::new();
        let mut len = 0;
        loop {
            let (more, more_len) = bool::unpack(input)?;
            len += more_len;
            if !more {
                break;
            }
            let (item, item_len) = T::unpack(input)?;
            len += item_len;
            items.push(item);
        }
        Ok((Self(items), len))
    }
}

/// A [`List`] that refuses items once its encoded size would exceed `max_size`.
#[derive(Debug)]
pub struct BoundedList<T> {
    list: List<T>,
    current_size: usize,
    max_size: usize,
}

impl<T: Pack> BoundedList<T> {
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        let list = List(Vec::new());
        let current_size = list.packed_size();
        Self {
            list,
            current_size,
            max_size,
        }
    }

    /// Appends `item`, handing it back if it does not fit.
    pub fn try_push(&mut self, item: T) -> std::result::Result<(), T> {
        let item_size = item.packed_size() + 4;
        if self.current_size + item_size > self.max_size {
            return Err(item);
        }

        self.list.0.push(item);
        self.current_size += item_size;
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.list.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.list.0.is_empty()
    }

    #[must_use]
    pub fn into_inner(self) -> List<T> {
        self.list
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::io::Cursor;

    use super::*;

    #[test]
    fn list_encoding() {
        let list = List(vec![1u32, 2]);
        let mut buf = Vec::new();
        let len = list.pack(&mut buf).unwrap();
        assert_eq!(len, list.packed_size());
        assert_eq!(buf, [0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 0]);

        let (decoded, read) = List::<u32>::unpack(&mut Cursor::new(buf)).unwrap();
        assert_eq!(read, len);
        assert_eq!(decoded, list);
    }

    #[test]
    fn bounded_list_stops_at_limit() {
        // terminator (4) + two items of 8 bytes each
        let mut list = BoundedList::new(20);
        assert!(list.try_push(1u32).is_ok());
        assert!(list.try_push(2u32).is_ok());
        assert_eq!(list.try_push(3u32), Err(3));
        assert_eq!(list.len(), 2);
        assert_eq!(list.into_inner().packed_size(), 20);
    }
}
