use std::fs::{File, Permissions};
#[cfg(unix)]
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::path::Path;
use std::time::SystemTime;

use nfs4_types::nfs4::{nfs_ftype4, nfstime4, specdata4};

fn to_nfstime4(time: std::io::Result<SystemTime>) -> nfstime4 {
    time.map(nfstime4::from).unwrap_or_default()
}

pub struct NfsMetadataExt<'a>(pub &'a std::fs::Metadata);

#[cfg(unix)]
impl NfsMetadataExt<'_> {
    #[must_use]
    pub fn mode(&self) -> u32 {
        self.0.mode() & 0o7777
    }

    #[must_use]
    pub fn nlink(&self) -> u32 {
        u32::try_from(self.0.nlink()).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn uid(&self) -> u32 {
        self.0.uid()
    }

    #[must_use]
    pub fn gid(&self) -> u32 {
        self.0.gid()
    }

    #[must_use]
    pub fn fileid(&self) -> u64 {
        self.0.ino()
    }

    #[must_use]
    pub fn used(&self) -> u64 {
        self.0.blocks() * 512
    }

    /// The inode change time in nanoseconds, which moves on every data or
    /// metadata update.
    #[must_use]
    pub fn change(&self) -> u64 {
        let seconds = u64::try_from(self.0.ctime()).unwrap_or_default();
        let nanos = u64::try_from(self.0.ctime_nsec()).unwrap_or_default();
        seconds.wrapping_mul(1_000_000_000).wrapping_add(nanos)
    }

    #[must_use]
    pub fn ctime(&self) -> nfstime4 {
        nfstime4 {
            seconds: self.0.ctime(),
            nseconds: u32::try_from(self.0.ctime_nsec()).unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn rdev(&self) -> specdata4 {
        let rdev = self.0.rdev();
        specdata4 {
            specdata1: u32::try_from((rdev >> 8) & 0xfff).unwrap_or_default(),
            specdata2: u32::try_from((rdev & 0xff) | ((rdev >> 12) & 0xfff00)).unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn file_type(&self) -> nfs_ftype4 {
        let file_type = self.0.file_type();
        if file_type.is_file() {
            nfs_ftype4::NF4REG
        } else if file_type.is_dir() {
            nfs_ftype4::NF4DIR
        } else if file_type.is_symlink() {
            nfs_ftype4::NF4LNK
        } else if file_type.is_block_device() {
            nfs_ftype4::NF4BLK
        } else if file_type.is_char_device() {
            nfs_ftype4::NF4CHR
        } else if file_type.is_fifo() {
            nfs_ftype4::NF4FIFO
        } else if file_type.is_socket() {
            nfs_ftype4::NF4SOCK
        } else {
            nfs_ftype4::NF4REG
        }
    }

    pub fn set_mode_on_path(path: impl AsRef<Path>, mode: u32) -> std::io::Result<()> {
        std::fs::set_permissions(path, Permissions::from_mode(mode))
    }

    pub fn set_mode_on_file(file: &File, mode: u32) -> std::io::Result<()> {
        file.set_permissions(Permissions::from_mode(mode))
    }

    pub fn set_owner_on_path(
        path: impl AsRef<Path>,
        uid: Option<u32>,
        gid: Option<u32>,
    ) -> std::io::Result<()> {
        std::os::unix::fs::lchown(path, uid, gid)
    }
}

#[cfg(not(unix))]
impl NfsMetadataExt<'_> {
    #[must_use]
    pub fn mode(&self) -> u32 {
        // Assume full permissions if not read-only
        if self.0.permissions().readonly() {
            0o555
        } else {
            0o777
        }
    }

    #[must_use]
    pub fn nlink(&self) -> u32 {
        if self.0.is_dir() { 2 } else { 1 }
    }

    #[must_use]
    pub fn uid(&self) -> u32 {
        1000
    }

    #[must_use]
    pub fn gid(&self) -> u32 {
        1000
    }

    /// Without inode numbers the creation time is the most stable identity.
    #[must_use]
    pub fn fileid(&self) -> u64 {
        let created = to_nfstime4(self.0.created());
        u64::try_from(created.seconds)
            .unwrap_or_default()
            .wrapping_mul(1_000_000_000)
            .wrapping_add(u64::from(created.nseconds))
    }

    #[must_use]
    pub fn used(&self) -> u64 {
        self.0.len()
    }

    #[must_use]
    pub fn change(&self) -> u64 {
        let modified = to_nfstime4(self.0.modified());
        u64::try_from(modified.seconds)
            .unwrap_or_default()
            .wrapping_mul(1_000_000_000)
            .wrapping_add(u64::from(modified.nseconds))
            .wrapping_add(self.0.len())
    }

    #[must_use]
    pub fn ctime(&self) -> nfstime4 {
        to_nfstime4(self.0.modified())
    }

    #[must_use]
    pub fn rdev(&self) -> specdata4 {
        specdata4::default()
    }

    #[must_use]
    pub fn file_type(&self) -> nfs_ftype4 {
        if self.0.is_symlink() {
            nfs_ftype4::NF4LNK
        } else if self.0.is_dir() {
            nfs_ftype4::NF4DIR
        } else {
            nfs_ftype4::NF4REG
        }
    }

    pub fn set_mode_on_path(_path: impl AsRef<Path>, _mode: u32) -> std::io::Result<()> {
        tracing::debug!("setting permissions is not supported");
        Ok(())
    }

    pub fn set_mode_on_file(_file: &File, _mode: u32) -> std::io::Result<()> {
        tracing::debug!("setting permissions is not supported");
        Ok(())
    }

    pub fn set_owner_on_path(
        _path: impl AsRef<Path>,
        _uid: Option<u32>,
        _gid: Option<u32>,
    ) -> std::io::Result<()> {
        tracing::debug!("setting owners is not supported");
        Ok(())
    }
}

impl NfsMetadataExt<'_> {
    #[must_use]
    pub fn atime(&self) -> nfstime4 {
        to_nfstime4(self.0.accessed())
    }

    #[must_use]
    pub fn mtime(&self) -> nfstime4 {
        to_nfstime4(self.0.modified())
    }
}
