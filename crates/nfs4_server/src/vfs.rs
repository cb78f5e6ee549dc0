//! The storage backend consumed by the NFSv4 engine.
//!
//! Objects are addressed by their path relative to the export root. The empty
//! path is the root itself, `dir/file.txt` a file two levels down. The engine
//! owns the mapping between those paths and the filehandles it hands out, so
//! a backend only has to understand paths and names.
//!
//! readdir pagination
//! ------------------
//! Entries are listed in a stable order (sorted by name) without `.` and `..`.
//! The entry at index `i` has cookie `i + 3`; cookies 1 and 2 are reserved by
//! the protocol. [`cookie_to_index`] and [`index_to_cookie`] translate between
//! the two so every backend pages the same way.
//!
//! Other requirements
//! ------------------
//! `getattr` and `lookup` need to be fast, clients call them all the time.
//! Errors are reported as `nfsstat4` values; [`io_error_to_nfsstat`] maps
//! native I/O errors.

mod adapter;
mod iterator;

use std::future::Future;
use std::path::Path;

pub use adapter::ReadOnlyAdapter;
pub use iterator::{DirEntry, NextResult, ReadDirIterator, cookie_to_index, index_to_cookie};
use nfs4_types::nfs4::{nfs_ftype4, nfsstat4, nfstime4, specdata4, verifier4};

use crate::units::GIBIBYTE;

/// What capabilities are supported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VFSCapabilities {
    ReadOnly,
    ReadWrite,
}

/// Attributes of a filesystem object as reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttr {
    pub ftype: nfs_ftype4,
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub used: u64,
    pub rdev: specdata4,
    pub fileid: u64,
    /// Changes whenever the object's data or metadata changes.
    pub change: u64,
    pub atime: nfstime4,
    pub mtime: nfstime4,
    pub ctime: nfstime4,
}

impl FileAttr {
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.ftype == nfs_ftype4::NF4DIR
    }

    #[must_use]
    pub fn is_symlink(&self) -> bool {
        self.ftype == nfs_ftype4::NF4LNK
    }
}

/// How a timestamp is updated by [`NfsFileSystem::setattr`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SetTime {
    #[default]
    DontChange,
    ServerTime,
    ClientTime(nfstime4),
}

/// Attribute changes requested by SETATTR, CREATE and OPEN. `None` leaves a
/// value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetAttributes {
    pub mode: Option<u32>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub size: Option<u64>,
    pub atime: SetTime,
    pub mtime: SetTime,
}

impl SetAttributes {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Creation semantics for regular files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateMode {
    /// Create the file or reuse an existing one.
    Unchecked,
    /// Fail with `NFS4ERR_EXIST` if the name is taken.
    Guarded,
    /// Create the file once; a retry with the same verifier succeeds.
    Exclusive(verifier4),
}

/// Space and inode usage of the exported filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsStat {
    pub total_bytes: u64,
    pub free_bytes: u64,
    pub avail_bytes: u64,
    pub total_files: u64,
    pub free_files: u64,
    pub avail_files: u64,
}

impl Default for FsStat {
    fn default() -> Self {
        Self {
            total_bytes: 128 * GIBIBYTE,
            free_bytes: 64 * GIBIBYTE,
            avail_bytes: 64 * GIBIBYTE,
            total_files: 1 << 24,
            free_files: 1 << 23,
            avail_files: 1 << 23,
        }
    }
}

/// The basic API to implement to provide an NFSv4 file system.
///
/// Mutating methods of a read-only backend should return
/// `Err(nfsstat4::NFS4ERR_ROFS)`; [`ReadOnlyAdapter`] does that for any backend.
pub trait NfsFileSystem: Send + Sync {
    /// Returns the set of capabilities supported
    fn capabilities(&self) -> VFSCapabilities;

    /// Looks up `name` in the directory `dir`.
    ///
    /// Returns `NFS4ERR_NOTDIR` if `dir` is not a directory.
    fn lookup(
        &self,
        dir: &Path,
        name: &str,
    ) -> impl Future<Output = Result<FileAttr, nfsstat4>> + Send;

    /// Returns the attributes of an object.
    fn getattr(&self, path: &Path) -> impl Future<Output = Result<FileAttr, nfsstat4>> + Send;

    /// Applies `attrs` and returns the resulting attributes.
    fn setattr(
        &self,
        path: &Path,
        attrs: SetAttributes,
    ) -> impl Future<Output = Result<FileAttr, nfsstat4>> + Send;

    /// Reads the contents of a file returning (bytes, EOF).
    ///
    /// `offset`/`count` may go past the end of the file; all bytes until the
    /// end are returned and EOF is flagged.
    fn read(
        &self,
        path: &Path,
        offset: u64,
        count: u32,
    ) -> impl Future<Output = Result<(Vec<u8>, bool), nfsstat4>> + Send;

    /// Writes `data` at `offset`, extending the file if needed. The data must
    /// be visible to readers once this returns.
    fn write(
        &self,
        path: &Path,
        offset: u64,
        data: &[u8],
    ) -> impl Future<Output = Result<FileAttr, nfsstat4>> + Send;

    /// Creates a regular file.
    fn create(
        &self,
        dir: &Path,
        name: &str,
        mode: CreateMode,
        attrs: SetAttributes,
    ) -> impl Future<Output = Result<FileAttr, nfsstat4>> + Send;

    /// Makes a directory.
    fn mkdir(
        &self,
        dir: &Path,
        name: &str,
        attrs: SetAttributes,
    ) -> impl Future<Output = Result<FileAttr, nfsstat4>> + Send;

    /// Makes a symlink pointing to `target`.
    fn symlink(
        &self,
        dir: &Path,
        name: &str,
        target: &str,
        attrs: SetAttributes,
    ) -> impl Future<Output = Result<FileAttr, nfsstat4>> + Send;

    /// Reads the target of a symlink.
    fn readlink(&self, path: &Path) -> impl Future<Output = Result<Vec<u8>, nfsstat4>> + Send;

    /// Removes a file or an empty directory.
    fn remove(&self, dir: &Path, name: &str) -> impl Future<Output = Result<(), nfsstat4>> + Send;

    /// Moves `from_dir/from_name` to `to_dir/to_name`, replacing a compatible
    /// target.
    fn rename(
        &self,
        from_dir: &Path,
        from_name: &str,
        to_dir: &Path,
        to_name: &str,
    ) -> impl Future<Output = Result<(), nfsstat4>> + Send;

    /// Lists a directory starting after `cookie` (0 lists from the start).
    ///
    /// Returns `NFS4ERR_BAD_COOKIE` if the cookie does not point into the
    /// listing.
    fn readdir(
        &self,
        dir: &Path,
        cookie: u64,
    ) -> impl Future<Output = Result<impl ReadDirIterator, nfsstat4>> + Send;

    /// Flushes cached data of a file to stable storage.
    fn commit(&self, path: &Path) -> impl Future<Output = Result<(), nfsstat4>> + Send {
        let _ = path;
        async { Ok(()) }
    }

    /// Reports space usage of the export.
    fn fsstat(&self) -> impl Future<Output = Result<FsStat, nfsstat4>> + Send {
        async { Ok(FsStat::default()) }
    }
}

/// Translates a native I/O error into the closest NFSv4 status.
#[must_use]
pub fn io_error_to_nfsstat(err: &std::io::Error) -> nfsstat4 {
    use std::io::ErrorKind;

    match err.kind() {
        ErrorKind::NotFound => nfsstat4::NFS4ERR_NOENT,
        ErrorKind::PermissionDenied => nfsstat4::NFS4ERR_ACCESS,
        ErrorKind::AlreadyExists => nfsstat4::NFS4ERR_EXIST,
        ErrorKind::NotADirectory => nfsstat4::NFS4ERR_NOTDIR,
        ErrorKind::IsADirectory => nfsstat4::NFS4ERR_ISDIR,
        ErrorKind::DirectoryNotEmpty => nfsstat4::NFS4ERR_NOTEMPTY,
        ErrorKind::ReadOnlyFilesystem => nfsstat4::NFS4ERR_ROFS,
        ErrorKind::StorageFull => nfsstat4::NFS4ERR_NOSPC,
        ErrorKind::QuotaExceeded => nfsstat4::NFS4ERR_DQUOT,
        ErrorKind::FileTooLarge => nfsstat4::NFS4ERR_FBIG,
        ErrorKind::InvalidFilename => nfsstat4::NFS4ERR_NAMETOOLONG,
        ErrorKind::CrossesDevices => nfsstat4::NFS4ERR_XDEV,
        ErrorKind::TooManyLinks => nfsstat4::NFS4ERR_MLINK,
        ErrorKind::Unsupported => nfsstat4::NFS4ERR_NOTSUPP,
        ErrorKind::InvalidInput => nfsstat4::NFS4ERR_INVAL,
        _ => nfsstat4::NFS4ERR_IO,
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Error, ErrorKind};

    use super::*;

    #[test]
    fn io_errors() {
        let cases = [
            (ErrorKind::NotFound, nfsstat4::NFS4ERR_NOENT),
            (ErrorKind::PermissionDenied, nfsstat4::NFS4ERR_ACCESS),
            (ErrorKind::AlreadyExists, nfsstat4::NFS4ERR_EXIST),
            (ErrorKind::DirectoryNotEmpty, nfsstat4::NFS4ERR_NOTEMPTY),
            (ErrorKind::StorageFull, nfsstat4::NFS4ERR_NOSPC),
            (ErrorKind::Other, nfsstat4::NFS4ERR_IO),
        ];
        for (kind, status) in cases {
            assert_eq!(io_error_to_nfsstat(&Error::from(kind)), status);
        }
    }

    #[test]
    fn empty_set_attributes() {
        assert!(SetAttributes::default().is_empty());
        let attrs = SetAttributes {
            mtime: SetTime::ServerTime,
            ..Default::default()
        };
        assert!(!attrs.is_empty());
    }
}
