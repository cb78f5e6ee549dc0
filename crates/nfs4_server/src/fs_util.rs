//! Helpers for backends that serve a real directory tree.

mod metadata_ext;

use std::fs::Metadata;
use std::path::Path;

pub use metadata_ext::NfsMetadataExt;
use nfs4_types::nfs4::{nfsstat4, nfstime4};
use tokio::fs::OpenOptions;
use tracing::debug;

use crate::vfs::{FileAttr, SetAttributes, SetTime, io_error_to_nfsstat};

/// Compares if file metadata has changed in a significant way
#[must_use]
pub fn attr_differ(lhs: &FileAttr, rhs: &FileAttr) -> bool {
    lhs.fileid != rhs.fileid
        || lhs.change != rhs.change
        || lhs.size != rhs.size
        || lhs.ftype != rhs.ftype
}

/// path.exists() is terrifyingly unsafe as that
/// traverses symlinks. This can cause deadlocks if we have a
/// recursive symlink.
#[must_use]
pub fn exists_no_traverse(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// Converts fs Metadata to the attributes reported over NFS.
#[must_use]
pub fn metadata_to_attr(meta: &Metadata) -> FileAttr {
    let ext = NfsMetadataExt(meta);
    FileAttr {
        ftype: ext.file_type(),
        mode: ext.mode(),
        nlink: ext.nlink(),
        uid: ext.uid(),
        gid: ext.gid(),
        size: meta.len(),
        used: ext.used(),
        rdev: ext.rdev(),
        fileid: ext.fileid(),
        change: ext.change(),
        atime: ext.atime(),
        mtime: ext.mtime(),
        ctime: ext.ctime(),
    }
}

fn to_filetime(time: SetTime) -> Option<filetime::FileTime> {
    match time {
        SetTime::DontChange => None,
        SetTime::ServerTime => Some(filetime::FileTime::now()),
        SetTime::ClientTime(nfstime4 { seconds, nseconds }) => {
            Some(filetime::FileTime::from_unix_time(seconds, nseconds))
        }
    }
}

/// Set attributes of a path. Symlinks are not followed for times and
/// owners.
pub async fn path_setattr(path: &Path, setattr: &SetAttributes) -> Result<(), nfsstat4> {
    let io_error = |err: std::io::Error| {
        debug!("setattr {path:?} failed: {err}");
        io_error_to_nfsstat(&err)
    };

    if let Some(size) = setattr.size {
        let file = OpenOptions::new()
            .write(true)
            .truncate(false)
            .open(path)
            .await
            .map_err(io_error)?;
        debug!(" -- set size {:?} {:?}", path, size);
        file.set_len(size).await.map_err(io_error)?;
    }
    if let Some(mode) = setattr.mode {
        debug!(" -- set permissions {:?} {:o}", path, mode);
        NfsMetadataExt::set_mode_on_path(path, mode & 0o7777).map_err(io_error)?;
    }
    if setattr.uid.is_some() || setattr.gid.is_some() {
        debug!(" -- set owner {:?} {:?}:{:?}", path, setattr.uid, setattr.gid);
        NfsMetadataExt::set_owner_on_path(path, setattr.uid, setattr.gid).map_err(io_error)?;
    }

    let atime = to_filetime(setattr.atime);
    let mtime = to_filetime(setattr.mtime);
    if atime.is_some() || mtime.is_some() {
        let meta = path.symlink_metadata().map_err(io_error)?;
        let atime = atime.unwrap_or_else(|| filetime::FileTime::from_last_access_time(&meta));
        let mtime = mtime.unwrap_or_else(|| filetime::FileTime::from_last_modification_time(&meta));
        filetime::set_symlink_file_times(path, atime, mtime).map_err(io_error)?;
    }
    Ok(())
}

/// Set the attributes that can be applied through an open file.
pub fn file_setattr(file: &std::fs::File, setattr: &SetAttributes) -> Result<(), nfsstat4> {
    if let Some(mode) = setattr.mode {
        debug!(" -- set permissions {:o}", mode);
        NfsMetadataExt::set_mode_on_file(file, mode & 0o7777)
            .map_err(|err| io_error_to_nfsstat(&err))?;
    }
    if let Some(size) = setattr.size {
        debug!(" -- set size {:?}", size);
        file.set_len(size).map_err(|err| io_error_to_nfsstat(&err))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use nfs4_types::nfs4::nfs_ftype4;

    use super::*;

    #[tokio::test]
    async fn setattr_on_real_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.txt");
        std::fs::write(&path, b"hello world").unwrap();

        let before = metadata_to_attr(&std::fs::metadata(&path).unwrap());
        assert_eq!(before.ftype, nfs_ftype4::NF4REG);
        assert_eq!(before.size, 11);

        let changes = SetAttributes {
            size: Some(5),
            mtime: SetTime::ClientTime(nfstime4 {
                seconds: 1_000_000,
                nseconds: 0,
            }),
            ..SetAttributes::default()
        };
        path_setattr(&path, &changes).await.unwrap();

        let after = metadata_to_attr(&std::fs::metadata(&path).unwrap());
        assert_eq!(after.size, 5);
        assert_eq!(after.mtime.seconds, 1_000_000);
        assert_eq!(after.fileid, before.fileid);
        assert!(attr_differ(&before, &after));
        assert!(exists_no_traverse(&path));
    }

    #[test]
    fn directories() {
        let dir = tempfile::tempdir().unwrap();
        let attr = metadata_to_attr(&std::fs::metadata(dir.path()).unwrap());
        assert_eq!(attr.ftype, nfs_ftype4::NF4DIR);
        assert!(!exists_no_traverse(&dir.path().join("missing")));
    }
}
