use std::path::{Path, PathBuf};

use nfs4_server::fs_util::metadata_to_attr;
use nfs4_server::vfs::{DirEntry, NextResult, ReadDirIterator, index_to_cookie, io_error_to_nfsstat};
use tracing::warn;

/// Names of a directory in the order READDIR lists them.
pub(super) async fn sorted_names(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = read_dir.next_entry().await? {
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(name) => warn!("skipping non-UTF-8 name {name:?} in {dir:?}"),
        }
    }
    names.sort_unstable();
    Ok(names)
}

/// Walks a snapshot of the names, reading attributes as it goes.
pub(super) struct MirrorFsIterator {
    dir: PathBuf,
    names: Vec<String>,
    index: usize,
}

impl MirrorFsIterator {
    pub(super) const fn new(dir: PathBuf, names: Vec<String>, start: usize) -> Self {
        Self {
            dir,
            names,
            index: start,
        }
    }
}

impl ReadDirIterator for MirrorFsIterator {
    async fn next(&mut self) -> NextResult<DirEntry> {
        while let Some(name) = self.names.get(self.index) {
            let cookie = index_to_cookie(self.index);
            self.index += 1;
            match tokio::fs::symlink_metadata(self.dir.join(name)).await {
                Ok(metadata) => {
                    return NextResult::Ok(DirEntry {
                        cookie,
                        name: name.clone(),
                        attr: metadata_to_attr(&metadata),
                    });
                }
                // removed after the listing was taken
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return NextResult::Err(io_error_to_nfsstat(&err)),
            }
        }
        NextResult::Eof
    }
}
