use std::path::Path;

use nfs4_types::nfs4::nfsstat4;

use super::{
    CreateMode, FileAttr, FsStat, NfsFileSystem, ReadDirIterator, SetAttributes, VFSCapabilities,
};

/// Serves any backend read-only: lookups and reads pass through, every
/// mutation fails with `NFS4ERR_ROFS`.
#[derive(Debug)]
pub struct ReadOnlyAdapter<T>(T);

impl<T: NfsFileSystem> ReadOnlyAdapter<T> {
    pub const fn new(inner: T) -> Self {
        Self(inner)
    }
}

impl<T: NfsFileSystem> NfsFileSystem for ReadOnlyAdapter<T> {
    fn capabilities(&self) -> VFSCapabilities {
        VFSCapabilities::ReadOnly
    }

    async fn lookup(&self, dir: &Path, name: &str) -> Result<FileAttr, nfsstat4> {
        self.0.lookup(dir, name).await
    }

    async fn getattr(&self, path: &Path) -> Result<FileAttr, nfsstat4> {
        self.0.getattr(path).await
    }

    async fn setattr(&self, _path: &Path, _attrs: SetAttributes) -> Result<FileAttr, nfsstat4> {
        Err(nfsstat4::NFS4ERR_ROFS)
    }

    async fn read(
        &self,
        path: &Path,
        offset: u64,
        count: u32,
    ) -> Result<(Vec<u8>, bool), nfsstat4> {
        self.0.read(path, offset, count).await
    }

    async fn write(&self, _path: &Path, _offset: u64, _data: &[u8]) -> Result<FileAttr, nfsstat4> {
        Err(nfsstat4::NFS4ERR_ROFS)
    }

    async fn create(
        &self,
        _dir: &Path,
        _name: &str,
        _mode: CreateMode,
        _attrs: SetAttributes,
    ) -> Result<FileAttr, nfsstat4> {
        Err(nfsstat4::NFS4ERR_ROFS)
    }

    async fn mkdir(
        &self,
        _dir: &Path,
        _name: &str,
        _attrs: SetAttributes,
    ) -> Result<FileAttr, nfsstat4> {
        Err(nfsstat4::NFS4ERR_ROFS)
    }

    async fn symlink(
        &self,
        _dir: &Path,
        _name: &str,
        _target: &str,
        _attrs: SetAttributes,
    ) -> Result<FileAttr, nfsstat4> {
        Err(nfsstat4::NFS4ERR_ROFS)
    }

    async fn readlink(&self, path: &Path) -> Result<Vec<u8>, nfsstat4> {
        self.0.readlink(path).await
    }

    async fn remove(&self, _dir: &Path, _name: &str) -> Result<(), nfsstat4> {
        Err(nfsstat4::NFS4ERR_ROFS)
    }

    async fn rename(
        &self,
        _from_dir: &Path,
        _from_name: &str,
        _to_dir: &Path,
        _to_name: &str,
    ) -> Result<(), nfsstat4> {
        Err(nfsstat4::NFS4ERR_ROFS)
    }

    async fn readdir(&self, dir: &Path, cookie: u64) -> Result<impl ReadDirIterator, nfsstat4> {
        self.0.readdir(dir, cookie).await
    }

    async fn commit(&self, _path: &Path) -> Result<(), nfsstat4> {
        Ok(())
    }

    async fn fsstat(&self) -> Result<FsStat, nfsstat4> {
        self.0.fsstat().await
    }
}
