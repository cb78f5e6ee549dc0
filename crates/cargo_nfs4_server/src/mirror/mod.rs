//! Serves a directory of the local filesystem.

mod iterator;
#[cfg(test)]
mod nfs_tests;

use std::path::{Path, PathBuf};

use iterator::MirrorFsIterator;
use nfs4_server::fs_util::{file_setattr, metadata_to_attr, path_setattr};
use nfs4_server::nfs4_types::nfs4::{nfs_ftype4, nfsstat4, verifier4};
use nfs4_server::vfs::{
    CreateMode, FileAttr, NfsFileSystem, ReadDirIterator, SetAttributes, VFSCapabilities,
    cookie_to_index, io_error_to_nfsstat,
};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt, SeekFrom};
use tracing::{debug, warn};

#[allow(clippy::needless_pass_by_value)]
fn map_io_error(err: std::io::Error) -> nfsstat4 {
    io_error_to_nfsstat(&err)
}

/// The verifier of an exclusive create is kept in the file's access and
/// modification times until the client sets real ones.
fn verifier_times(verifier: verifier4) -> (filetime::FileTime, filetime::FileTime) {
    let [a0, a1, a2, a3, m0, m1, m2, m3] = verifier;
    (
        filetime::FileTime::from_unix_time(i64::from(u32::from_be_bytes([a0, a1, a2, a3])), 0),
        filetime::FileTime::from_unix_time(i64::from(u32::from_be_bytes([m0, m1, m2, m3])), 0),
    )
}

fn has_verifier(attr: &FileAttr, verifier: verifier4) -> bool {
    let (atime, mtime) = verifier_times(verifier);
    attr.atime.seconds == atime.unix_seconds() && attr.mtime.seconds == mtime.unix_seconds()
}

#[derive(Debug)]
pub struct MirrorFs {
    root: PathBuf,
}

impl MirrorFs {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn full_path(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }

    async fn stat(path: &Path) -> Result<FileAttr, nfsstat4> {
        let metadata = tokio::fs::symlink_metadata(path)
            .await
            .map_err(map_io_error)?;
        Ok(metadata_to_attr(&metadata))
    }

    async fn dir_path(&self, dir: &Path) -> Result<PathBuf, nfsstat4> {
        let dir = self.full_path(dir);
        if Self::stat(&dir).await?.is_dir() {
            Ok(dir)
        } else {
            Err(nfsstat4::NFS4ERR_NOTDIR)
        }
    }

    async fn read_file(path: &Path, start: u64, count: u32) -> std::io::Result<(Vec<u8>, bool)> {
        let mut f = File::open(path).await?;
        let len = f.metadata().await?.len();
        if start >= len || count == 0 {
            return Ok((Vec::new(), start >= len));
        }

        let count = u64::from(count).min(len - start);
        f.seek(SeekFrom::Start(start)).await?;

        let mut buf = vec![0; usize::try_from(count).unwrap_or(0)];
        f.read_exact(&mut buf).await?;

        Ok((buf, start + count >= len))
    }

    async fn write_file(path: &Path, offset: u64, data: &[u8]) -> std::io::Result<()> {
        let mut file = OpenOptions::new().write(true).open(path).await?;
        file.seek(SeekFrom::Start(offset)).await?;
        file.write_all(data).await?;
        file.flush().await
    }

    /// Creates a regular file and applies `attrs` through the new handle.
    async fn create_file(path: &Path, exclusive: bool, attrs: &SetAttributes) -> Result<(), nfsstat4> {
        let file = OpenOptions::new()
            .write(true)
            .create(!exclusive)
            .create_new(exclusive)
            .truncate(false)
            .open(path)
            .await
            .map_err(map_io_error)?;
        file_setattr(&file.into_std().await, attrs)?;

        let rest = SetAttributes {
            mode: None,
            size: None,
            ..attrs.clone()
        };
        if !rest.is_empty() {
            path_setattr(path, &rest).await?;
        }
        Ok(())
    }
}

impl NfsFileSystem for MirrorFs {
    fn capabilities(&self) -> VFSCapabilities {
        VFSCapabilities::ReadWrite
    }

    async fn lookup(&self, dir: &Path, name: &str) -> Result<FileAttr, nfsstat4> {
        let dir = self.dir_path(dir).await?;
        Self::stat(&dir.join(name)).await
    }

    async fn getattr(&self, path: &Path) -> Result<FileAttr, nfsstat4> {
        Self::stat(&self.full_path(path)).await
    }

    async fn setattr(&self, path: &Path, attrs: SetAttributes) -> Result<FileAttr, nfsstat4> {
        let path = self.full_path(path);
        path_setattr(&path, &attrs).await?;
        Self::stat(&path).await
    }

    async fn read(&self, path: &Path, offset: u64, count: u32) -> Result<(Vec<u8>, bool), nfsstat4> {
        Self::read_file(&self.full_path(path), offset, count)
            .await
            .map_err(map_io_error)
    }

    async fn write(&self, path: &Path, offset: u64, data: &[u8]) -> Result<FileAttr, nfsstat4> {
        let path = self.full_path(path);
        if Self::stat(&path).await?.ftype != nfs_ftype4::NF4REG {
            return Err(nfsstat4::NFS4ERR_INVAL);
        }
        Self::write_file(&path, offset, data)
            .await
            .map_err(map_io_error)?;
        Self::stat(&path).await
    }

    async fn create(
        &self,
        dir: &Path,
        name: &str,
        mode: CreateMode,
        attrs: SetAttributes,
    ) -> Result<FileAttr, nfsstat4> {
        let path = self.dir_path(dir).await?.join(name);
        match mode {
            CreateMode::Unchecked => {
                if let Ok(existing) = Self::stat(&path).await
                    && existing.ftype != nfs_ftype4::NF4REG
                {
                    // the caller reports the type mismatch
                    return Ok(existing);
                }
                Self::create_file(&path, false, &attrs).await?;
            }
            CreateMode::Guarded => Self::create_file(&path, true, &attrs).await?,
            CreateMode::Exclusive(verifier) => {
                match Self::create_file(&path, true, &SetAttributes::default()).await {
                    Ok(()) => {
                        let (atime, mtime) = verifier_times(verifier);
                        filetime::set_file_times(&path, atime, mtime).map_err(map_io_error)?;
                    }
                    Err(nfsstat4::NFS4ERR_EXIST) => {
                        let existing = Self::stat(&path).await?;
                        if !has_verifier(&existing, verifier) {
                            return Err(nfsstat4::NFS4ERR_EXIST);
                        }
                        debug!("exclusive create retried for {path:?}");
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        Self::stat(&path).await
    }

    async fn mkdir(&self, dir: &Path, name: &str, attrs: SetAttributes) -> Result<FileAttr, nfsstat4> {
        let path = self.dir_path(dir).await?.join(name);
        tokio::fs::create_dir(&path).await.map_err(map_io_error)?;
        if !attrs.is_empty() {
            path_setattr(&path, &attrs).await?;
        }
        Self::stat(&path).await
    }

    async fn symlink(
        &self,
        dir: &Path,
        name: &str,
        target: &str,
        attrs: SetAttributes,
    ) -> Result<FileAttr, nfsstat4> {
        let path = self.dir_path(dir).await?.join(name);

        #[cfg(unix)]
        tokio::fs::symlink(target, &path)
            .await
            .map_err(map_io_error)?;

        #[cfg(windows)]
        tokio::fs::symlink_file(target, &path)
            .await
            .map_err(map_io_error)?;

        // the mode of a symlink cannot be changed without following it
        let attrs = SetAttributes {
            mode: None,
            size: None,
            ..attrs
        };
        if !attrs.is_empty()
            && let Err(err) = path_setattr(&path, &attrs).await
        {
            warn!("failed to set symlink attributes of {path:?}: {err}");
        }
        Self::stat(&path).await
    }

    async fn readlink(&self, path: &Path) -> Result<Vec<u8>, nfsstat4> {
        let path = self.full_path(path);
        let target = tokio::fs::read_link(&path).await.map_err(|err| {
            warn!(path = %path.display(), error = %err, "failed to read symlink target");
            if err.kind() == std::io::ErrorKind::NotFound {
                nfsstat4::NFS4ERR_NOENT
            } else {
                nfsstat4::NFS4ERR_INVAL
            }
        })?;

        #[cfg(unix)]
        let target = std::os::unix::ffi::OsStrExt::as_bytes(target.as_os_str()).to_vec();
        #[cfg(not(unix))]
        let target = target.to_string_lossy().into_owned().into_bytes();
        Ok(target)
    }

    async fn remove(&self, dir: &Path, name: &str) -> Result<(), nfsstat4> {
        let path = self.dir_path(dir).await?.join(name);
        let metadata = tokio::fs::symlink_metadata(&path)
            .await
            .map_err(map_io_error)?;
        if metadata.is_dir() {
            tokio::fs::remove_dir(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        }
        .map_err(map_io_error)
    }

    async fn rename(
        &self,
        from_dir: &Path,
        from_name: &str,
        to_dir: &Path,
        to_name: &str,
    ) -> Result<(), nfsstat4> {
        let from_path = self.dir_path(from_dir).await?.join(from_name);
        let to_path = self.dir_path(to_dir).await?.join(to_name);
        if from_path == to_path {
            return Self::stat(&from_path).await.map(|_| ());
        }

        let from_metadata = tokio::fs::symlink_metadata(&from_path)
            .await
            .map_err(map_io_error)?;

        if let Ok(to_metadata) = tokio::fs::symlink_metadata(&to_path).await {
            // Both must be compatible types
            if from_metadata.is_dir() != to_metadata.is_dir() {
                return Err(nfsstat4::NFS4ERR_EXIST);
            }

            // If target is a directory, it must be empty
            if to_metadata.is_dir() {
                let mut read_dir = tokio::fs::read_dir(&to_path).await.map_err(map_io_error)?;
                if read_dir.next_entry().await.map_err(map_io_error)?.is_some() {
                    return Err(nfsstat4::NFS4ERR_EXIST);
                }
            }
        }

        tokio::fs::rename(&from_path, &to_path)
            .await
            .map_err(map_io_error)
    }

    async fn readdir(&self, dir: &Path, cookie: u64) -> Result<impl ReadDirIterator, nfsstat4> {
        let dir = self.dir_path(dir).await?;
        let start = cookie_to_index(cookie)?;
        let names = iterator::sorted_names(&dir).await.map_err(map_io_error)?;
        if start > names.len() {
            debug!("cookie {cookie} is past the end of {dir:?}");
            return Err(nfsstat4::NFS4ERR_BAD_COOKIE);
        }
        Ok(MirrorFsIterator::new(dir, names, start))
    }

    async fn commit(&self, path: &Path) -> Result<(), nfsstat4> {
        let path = self.full_path(path);
        let file = OpenOptions::new()
            .write(true)
            .open(&path)
            .await
            .map_err(map_io_error)?;
        file.sync_all().await.map_err(map_io_error)
    }
}
