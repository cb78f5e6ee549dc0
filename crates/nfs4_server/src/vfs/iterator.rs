use std::future::Future;

use nfs4_types::nfs4::nfsstat4;

use super::FileAttr;

/// Cookies 1 and 2 are reserved; the first entry of a listing has cookie 3.
const FIRST_COOKIE: u64 = 3;

/// A directory entry produced by [`ReadDirIterator`].
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub cookie: u64,
    pub name: String,
    pub attr: FileAttr,
}

/// Represents the result of `next()` in [`ReadDirIterator`].
pub enum NextResult<T> {
    /// The next entry in the directory.
    Ok(T),
    /// The end of the directory has been reached. It is not an error.
    Eof,
    /// An error occurred while reading the directory.
    Err(nfsstat4),
}

/// Iterator for [`NfsFileSystem::readdir`](super::NfsFileSystem::readdir)
pub trait ReadDirIterator: Send + Sync {
    /// Returns the next entry in the directory.
    fn next(&mut self) -> impl Future<Output = NextResult<DirEntry>> + Send;
}

/// Position in a sorted listing at which a READDIR resumes after `cookie`.
pub const fn cookie_to_index(cookie: u64) -> Result<usize, nfsstat4> {
    match cookie {
        0 => Ok(0),
        1 | 2 => Err(nfsstat4::NFS4ERR_BAD_COOKIE),
        #[allow(clippy::cast_possible_truncation)]
        cookie => Ok((cookie - FIRST_COOKIE + 1) as usize),
    }
}

/// Cookie of the entry at `index` of a sorted listing.
#[must_use]
pub const fn index_to_cookie(index: usize) -> u64 {
    index as u64 + FIRST_COOKIE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookies() {
        assert_eq!(cookie_to_index(0), Ok(0));
        assert_eq!(cookie_to_index(1), Err(nfsstat4::NFS4ERR_BAD_COOKIE));
        assert_eq!(cookie_to_index(2), Err(nfsstat4::NFS4ERR_BAD_COOKIE));
        // resuming after the first entry starts at the second one
        assert_eq!(cookie_to_index(index_to_cookie(0)), Ok(1));
        assert_eq!(cookie_to_index(index_to_cookie(9)), Ok(10));
    }
}
