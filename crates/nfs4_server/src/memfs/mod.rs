//! In-memory file system for `NFSv4`.
//!
//! It is a simple implementation of a file system that stores files, directories and
//! symlinks in memory. This file system is used for testing purposes and demos and is not
//! intended for production use.
//!
//! # Limitations
//!
//! - It's a very naive implementation and does not guarantee the best performance.
//! - Every path lookup walks the tree from the root.
//!
//! # Examples
//!
//! ```no_run
//! use nfs4_server::memfs::{MemFs, MemFsConfig};
//! use nfs4_server::tcp::NFSTcpListener;
//!
//! async fn run() -> anyhow::Result<()> {
//!     let mut config = MemFsConfig::default();
//!     config.add_file("/a.txt", "hello world\n".as_bytes());
//!     config.add_file("/b.txt", "Greetings\n".as_bytes());
//!     config.add_dir("/a directory");
//!
//!     let memfs = MemFs::new(config)?;
//!     let listener = NFSTcpListener::bind("0.0.0.0:11112", memfs).await?;
//!     listener.handle_forever().await?;
//!     Ok(())
//! }
//! ```

mod config;

use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use config::{MemFsConfigKind, split_path};
pub use config::MemFsConfig;
use nfs4_types::nfs4::{nfs_ftype4, nfsstat4, nfstime4, specdata4, verifier4};
use tracing::{info, warn};

use crate::vfs::{
    CreateMode, DirEntry, FileAttr, NextResult, NfsFileSystem, ReadDirIterator, SetAttributes,
    SetTime, VFSCapabilities, cookie_to_index, index_to_cookie,
};

type NodeId = u64;

const ROOT_ID: NodeId = 1;
const OWNER_ID: u32 = 507;

#[derive(Debug)]
enum Content {
    File {
        data: Vec<u8>,
        verifier: Option<verifier4>,
    },
    Dir {
        children: BTreeMap<String, NodeId>,
    },
    Symlink {
        target: Vec<u8>,
    },
}

#[derive(Debug)]
struct Node {
    attr: FileAttr,
    content: Content,
}

impl Node {
    fn new(id: NodeId, change: u64, content: Content) -> Self {
        let now = nfstime4::from(SystemTime::now());
        let (ftype, mode, nlink, size) = match &content {
            Content::File { data, .. } => (nfs_ftype4::NF4REG, 0o755, 1, data.len() as u64),
            Content::Dir { .. } => (nfs_ftype4::NF4DIR, 0o777, 2, 0),
            Content::Symlink { target } => (nfs_ftype4::NF4LNK, 0o777, 1, target.len() as u64),
        };
        Self {
            attr: FileAttr {
                ftype,
                mode,
                nlink,
                uid: OWNER_ID,
                gid: OWNER_ID,
                size,
                used: size,
                rdev: specdata4::default(),
                fileid: id,
                change,
                atime: now,
                mtime: now,
                ctime: now,
            },
            content,
        }
    }

    const fn children(&self) -> Result<&BTreeMap<String, NodeId>, nfsstat4> {
        match &self.content {
            Content::Dir { children } => Ok(children),
            _ => Err(nfsstat4::NFS4ERR_NOTDIR),
        }
    }

    const fn children_mut(&mut self) -> Result<&mut BTreeMap<String, NodeId>, nfsstat4> {
        match &mut self.content {
            Content::Dir { children } => Ok(children),
            _ => Err(nfsstat4::NFS4ERR_NOTDIR),
        }
    }

    const fn data(&self) -> Result<&Vec<u8>, nfsstat4> {
        match &self.content {
            Content::File { data, .. } => Ok(data),
            Content::Dir { .. } => Err(nfsstat4::NFS4ERR_ISDIR),
            Content::Symlink { .. } => Err(nfsstat4::NFS4ERR_INVAL),
        }
    }

    const fn data_mut(&mut self) -> Result<&mut Vec<u8>, nfsstat4> {
        match &mut self.content {
            Content::File { data, .. } => Ok(data),
            Content::Dir { .. } => Err(nfsstat4::NFS4ERR_ISDIR),
            Content::Symlink { .. } => Err(nfsstat4::NFS4ERR_INVAL),
        }
    }

    fn is_empty_dir(&self) -> bool {
        matches!(&self.content, Content::Dir { children } if children.is_empty())
    }

    fn read(&self, offset: u64, count: u32) -> Result<(Vec<u8>, bool), nfsstat4> {
        let data = self.data()?;
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
        let end = start.saturating_add(count as usize).min(data.len());
        Ok((data[start..end].to_vec(), end == data.len()))
    }

    fn write(&mut self, offset: u64, bytes: &[u8]) -> Result<(), nfsstat4> {
        let offset = usize::try_from(offset).map_err(|_| nfsstat4::NFS4ERR_FBIG)?;
        let end = offset
            .checked_add(bytes.len())
            .ok_or(nfsstat4::NFS4ERR_FBIG)?;
        let data = self.data_mut()?;
        if end > data.len() {
            data.resize(end, 0);
        }
        data[offset..end].copy_from_slice(bytes);
        self.sync_size();
        Ok(())
    }

    fn resize(&mut self, size: u64) -> Result<(), nfsstat4> {
        let size = usize::try_from(size).map_err(|_| nfsstat4::NFS4ERR_FBIG)?;
        self.data_mut()?.resize(size, 0);
        self.sync_size();
        Ok(())
    }

    fn sync_size(&mut self) {
        if let Content::File { data, .. } = &self.content {
            self.attr.size = data.len() as u64;
            self.attr.used = self.attr.size;
        }
    }

    fn apply(&mut self, attrs: &SetAttributes) -> Result<(), nfsstat4> {
        if let Some(size) = attrs.size {
            self.resize(size)?;
        }
        if let Some(mode) = attrs.mode {
            self.attr.mode = mode & 0o7777;
        }
        if let Some(uid) = attrs.uid {
            self.attr.uid = uid;
        }
        if let Some(gid) = attrs.gid {
            self.attr.gid = gid;
        }
        apply_time(&mut self.attr.atime, attrs.atime);
        apply_time(&mut self.attr.mtime, attrs.mtime);
        Ok(())
    }
}

fn apply_time(time: &mut nfstime4, set: SetTime) {
    match set {
        SetTime::DontChange => {}
        SetTime::ServerTime => *time = nfstime4::from(SystemTime::now()),
        SetTime::ClientTime(client) => *time = client,
    }
}

#[derive(Debug)]
struct Fs {
    nodes: HashMap<NodeId, Node>,
    next_id: NodeId,
    next_change: u64,
}

impl Fs {
    fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(
            ROOT_ID,
            Node::new(
                ROOT_ID,
                1,
                Content::Dir {
                    children: BTreeMap::new(),
                },
            ),
        );
        Self {
            nodes,
            next_id: ROOT_ID + 1,
            next_change: 2,
        }
    }

    fn node(&self, id: NodeId) -> Result<&Node, nfsstat4> {
        self.nodes.get(&id).ok_or(nfsstat4::NFS4ERR_SERVERFAULT)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, nfsstat4> {
        self.nodes.get_mut(&id).ok_or(nfsstat4::NFS4ERR_SERVERFAULT)
    }

    fn resolve(&self, path: &Path) -> Result<NodeId, nfsstat4> {
        let mut id = ROOT_ID;
        for component in path.components() {
            let Component::Normal(name) = component else {
                continue;
            };
            let name = name.to_str().ok_or(nfsstat4::NFS4ERR_INVAL)?;
            id = self.child(id, name)?;
        }
        Ok(id)
    }

    fn child(&self, dir: NodeId, name: &str) -> Result<NodeId, nfsstat4> {
        self.node(dir)?
            .children()?
            .get(name)
            .copied()
            .ok_or(nfsstat4::NFS4ERR_NOENT)
    }

    fn next_change(&mut self) -> u64 {
        let change = self.next_change;
        self.next_change += 1;
        change
    }

    /// Records a metadata change of `id`.
    fn touch(&mut self, id: NodeId) -> Result<(), nfsstat4> {
        let change = self.next_change();
        let attr = &mut self.node_mut(id)?.attr;
        attr.change = change;
        attr.ctime = nfstime4::from(SystemTime::now());
        Ok(())
    }

    /// Records a content change of `id`.
    fn modify(&mut self, id: NodeId) -> Result<(), nfsstat4> {
        self.touch(id)?;
        let attr = &mut self.node_mut(id)?.attr;
        attr.mtime = attr.ctime;
        Ok(())
    }

    fn insert(&mut self, dir: NodeId, name: &str, content: Content) -> Result<NodeId, nfsstat4> {
        let is_dir = matches!(content, Content::Dir { .. });
        let id = self.next_id;
        let change = self.next_change();
        let children = self.node_mut(dir)?.children_mut()?;
        if children.contains_key(name) {
            return Err(nfsstat4::NFS4ERR_EXIST);
        }
        children.insert(name.to_string(), id);
        self.next_id += 1;
        self.nodes.insert(id, Node::new(id, change, content));
        if is_dir {
            self.node_mut(dir)?.attr.nlink += 1;
        }
        self.modify(dir)?;
        Ok(id)
    }

    /// Unlinks `dir/name`, which must be a file or an empty directory.
    fn unlink(&mut self, dir: NodeId, name: &str) -> Result<(), nfsstat4> {
        let id = self.child(dir, name)?;
        let node = self.node(id)?;
        let is_dir = node.attr.is_dir();
        if is_dir && !node.is_empty_dir() {
            return Err(nfsstat4::NFS4ERR_NOTEMPTY);
        }
        self.node_mut(dir)?.children_mut()?.remove(name);
        self.nodes.remove(&id);
        if is_dir {
            let parent = &mut self.node_mut(dir)?.attr;
            parent.nlink = parent.nlink.saturating_sub(1);
        }
        self.modify(dir)
    }

    fn create_file(
        &mut self,
        dir: NodeId,
        name: &str,
        mode: CreateMode,
        attrs: &SetAttributes,
    ) -> Result<NodeId, nfsstat4> {
        match self.child(dir, name) {
            Ok(existing) => {
                let node = self.node(existing)?;
                let is_file = matches!(node.content, Content::File { .. });
                match mode {
                    CreateMode::Guarded => Err(nfsstat4::NFS4ERR_EXIST),
                    CreateMode::Exclusive(verifier) => match &node.content {
                        Content::File { verifier: stored, .. } if *stored == Some(verifier) => {
                            Ok(existing)
                        }
                        _ => Err(nfsstat4::NFS4ERR_EXIST),
                    },
                    // a non-file is returned as is, the caller reports the type mismatch
                    CreateMode::Unchecked => {
                        if is_file && !attrs.is_empty() {
                            self.node_mut(existing)?.apply(attrs)?;
                            self.modify(existing)?;
                        }
                        Ok(existing)
                    }
                }
            }
            Err(nfsstat4::NFS4ERR_NOENT) => {
                let verifier = match mode {
                    CreateMode::Exclusive(verifier) => Some(verifier),
                    _ => None,
                };
                let id = self.insert(
                    dir,
                    name,
                    Content::File {
                        data: Vec::new(),
                        verifier,
                    },
                )?;
                self.node_mut(id)?.apply(attrs)?;
                Ok(id)
            }
            Err(err) => Err(err),
        }
    }

    fn rename(
        &mut self,
        from_dir: NodeId,
        from_name: &str,
        to_dir: NodeId,
        to_name: &str,
    ) -> Result<(), nfsstat4> {
        let from_id = self.child(from_dir, from_name)?;
        if from_dir == to_dir && from_name == to_name {
            return Ok(());
        }
        let source_is_dir = self.node(from_id)?.attr.is_dir();

        match self.child(to_dir, to_name) {
            Err(nfsstat4::NFS4ERR_NOENT) => {}
            Ok(to_id) => {
                let target = self.node(to_id)?;
                match (source_is_dir, target.attr.is_dir()) {
                    (false, false) => {}
                    (true, true) if target.is_empty_dir() => {}
                    (true, true) => {
                        warn!("target directory is not empty");
                        return Err(nfsstat4::NFS4ERR_EXIST);
                    }
                    _ => {
                        warn!("cannot rename between a directory and a non-directory");
                        return Err(nfsstat4::NFS4ERR_EXIST);
                    }
                }
                self.unlink(to_dir, to_name)?;
            }
            Err(err) => return Err(err),
        }

        self.node_mut(from_dir)?.children_mut()?.remove(from_name);
        self.node_mut(to_dir)?
            .children_mut()?
            .insert(to_name.to_string(), from_id);
        if source_is_dir && from_dir != to_dir {
            let attr = &mut self.node_mut(from_dir)?.attr;
            attr.nlink = attr.nlink.saturating_sub(1);
            self.node_mut(to_dir)?.attr.nlink += 1;
        }
        self.modify(from_dir)?;
        if from_dir != to_dir {
            self.modify(to_dir)?;
        }
        self.touch(from_id)
    }
}

/// In-memory file system for `NFSv4`.
///
/// `MemFs` implements the [`NfsFileSystem`] trait and provides a simple in-memory file system
#[derive(Debug)]
pub struct MemFs {
    fs: Arc<RwLock<Fs>>,
}

impl Default for MemFs {
    fn default() -> Self {
        Self {
            fs: Arc::new(RwLock::new(Fs::new())),
        }
    }
}

impl MemFs {
    /// Creates a new in-memory file system with the given configuration.
    pub fn new(config: MemFsConfig) -> Result<Self, nfsstat4> {
        info!("creating memfs. Entries count: {}", config.entries.len());
        let memfs = Self::default();
        {
            let mut fs = memfs.write_fs();
            for entry in config.entries {
                let (parents, name) = split_path(&entry.path).ok_or(nfsstat4::NFS4ERR_INVAL)?;
                let dir = fs.resolve(&parents.iter().collect::<PathBuf>())?;
                let content = match entry.kind {
                    MemFsConfigKind::Dir => Content::Dir {
                        children: BTreeMap::new(),
                    },
                    MemFsConfigKind::File(data) => Content::File {
                        data,
                        verifier: None,
                    },
                    MemFsConfigKind::Symlink(target) => Content::Symlink {
                        target: target.into_bytes(),
                    },
                };
                fs.insert(dir, name, content)?;
            }
        }
        Ok(memfs)
    }

    fn read_fs(&self) -> RwLockReadGuard<'_, Fs> {
        self.fs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_fs(&self) -> RwLockWriteGuard<'_, Fs> {
        self.fs.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn attr_of(fs: &Fs, id: NodeId) -> Result<FileAttr, nfsstat4> {
        Ok(fs.node(id)?.attr.clone())
    }
}

impl NfsFileSystem for MemFs {
    fn capabilities(&self) -> VFSCapabilities {
        VFSCapabilities::ReadWrite
    }

    async fn lookup(&self, dir: &Path, name: &str) -> Result<FileAttr, nfsstat4> {
        let fs = self.read_fs();
        let dir = fs.resolve(dir)?;
        let id = fs.child(dir, name)?;
        Self::attr_of(&fs, id)
    }

    async fn getattr(&self, path: &Path) -> Result<FileAttr, nfsstat4> {
        let fs = self.read_fs();
        let id = fs.resolve(path)?;
        Self::attr_of(&fs, id)
    }

    async fn setattr(&self, path: &Path, attrs: SetAttributes) -> Result<FileAttr, nfsstat4> {
        let mut fs = self.write_fs();
        let id = fs.resolve(path)?;
        fs.node_mut(id)?.apply(&attrs)?;
        if attrs.size.is_some() {
            fs.modify(id)?;
        } else {
            fs.touch(id)?;
        }
        Self::attr_of(&fs, id)
    }

    async fn read(&self, path: &Path, offset: u64, count: u32) -> Result<(Vec<u8>, bool), nfsstat4> {
        let fs = self.read_fs();
        let id = fs.resolve(path)?;
        fs.node(id)?.read(offset, count)
    }

    async fn write(&self, path: &Path, offset: u64, data: &[u8]) -> Result<FileAttr, nfsstat4> {
        let mut fs = self.write_fs();
        let id = fs.resolve(path)?;
        fs.node_mut(id)?.write(offset, data)?;
        fs.modify(id)?;
        Self::attr_of(&fs, id)
    }

    async fn create(
        &self,
        dir: &Path,
        name: &str,
        mode: CreateMode,
        attrs: SetAttributes,
    ) -> Result<FileAttr, nfsstat4> {
        let mut fs = self.write_fs();
        let dir = fs.resolve(dir)?;
        let id = fs.create_file(dir, name, mode, &attrs)?;
        Self::attr_of(&fs, id)
    }

    async fn mkdir(&self, dir: &Path, name: &str, attrs: SetAttributes) -> Result<FileAttr, nfsstat4> {
        let mut fs = self.write_fs();
        let dir = fs.resolve(dir)?;
        let content = Content::Dir {
            children: BTreeMap::new(),
        };
        let id = fs.insert(dir, name, content)?;
        fs.node_mut(id)?.apply(&attrs)?;
        Self::attr_of(&fs, id)
    }

    async fn symlink(
        &self,
        dir: &Path,
        name: &str,
        target: &str,
        attrs: SetAttributes,
    ) -> Result<FileAttr, nfsstat4> {
        let mut fs = self.write_fs();
        let dir = fs.resolve(dir)?;
        let content = Content::Symlink {
            target: target.as_bytes().to_vec(),
        };
        let id = fs.insert(dir, name, content)?;
        // a symlink has no size to set
        let attrs = SetAttributes { size: None, ..attrs };
        fs.node_mut(id)?.apply(&attrs)?;
        Self::attr_of(&fs, id)
    }

    async fn readlink(&self, path: &Path) -> Result<Vec<u8>, nfsstat4> {
        let fs = self.read_fs();
        let id = fs.resolve(path)?;
        match &fs.node(id)?.content {
            Content::Symlink { target } => Ok(target.clone()),
            _ => Err(nfsstat4::NFS4ERR_INVAL),
        }
    }

    async fn remove(&self, dir: &Path, name: &str) -> Result<(), nfsstat4> {
        let mut fs = self.write_fs();
        let dir = fs.resolve(dir)?;
        fs.unlink(dir, name)
    }

    async fn rename(
        &self,
        from_dir: &Path,
        from_name: &str,
        to_dir: &Path,
        to_name: &str,
    ) -> Result<(), nfsstat4> {
        if to_dir.starts_with(from_dir.join(from_name)) {
            warn!("cannot move a directory into its own subdirectory");
            return Err(nfsstat4::NFS4ERR_INVAL);
        }
        let mut fs = self.write_fs();
        let from_dir = fs.resolve(from_dir)?;
        let to_dir = fs.resolve(to_dir)?;
        fs.rename(from_dir, from_name, to_dir, to_name)
    }

    async fn readdir(&self, dir: &Path, cookie: u64) -> Result<impl ReadDirIterator, nfsstat4> {
        let fs = self.read_fs();
        let dir = fs.resolve(dir)?;
        let children = fs.node(dir)?.children()?;

        let start = cookie_to_index(cookie)?;
        if start > children.len() {
            return Err(nfsstat4::NFS4ERR_BAD_COOKIE);
        }
        let entries = children
            .iter()
            .enumerate()
            .skip(start)
            .map(|(index, (name, id))| (index_to_cookie(index), name.clone(), *id))
            .collect();
        Ok(MemFsIterator::new(self.fs.clone(), entries))
    }
}

struct MemFsIterator {
    fs: Arc<RwLock<Fs>>,
    entries: std::vec::IntoIter<(u64, String, NodeId)>,
}

impl MemFsIterator {
    fn new(fs: Arc<RwLock<Fs>>, entries: Vec<(u64, String, NodeId)>) -> Self {
        Self {
            fs,
            entries: entries.into_iter(),
        }
    }
}

impl ReadDirIterator for MemFsIterator {
    async fn next(&mut self) -> NextResult<DirEntry> {
        let fs = self.fs.read().unwrap_or_else(PoisonError::into_inner);
        for (cookie, name, id) in self.entries.by_ref() {
            let Some(node) = fs.nodes.get(&id) else {
                // removed after the listing started
                continue;
            };
            return NextResult::Ok(DirEntry {
                cookie,
                name,
                attr: node.attr.clone(),
            });
        }
        NextResult::Eof
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn memfs() -> MemFs {
        let mut config = MemFsConfig::default();
        config.add_dir("/dir");
        config.add_file("/dir/a.txt", b"hello".to_vec());
        config.add_file("/b.txt", b"world".to_vec());
        config.add_symlink("/link", "b.txt");
        MemFs::new(config).unwrap()
    }

    async fn names(fs: &MemFs, dir: &str, cookie: u64) -> Vec<(u64, String)> {
        let mut iter = fs.readdir(Path::new(dir), cookie).await.unwrap();
        let mut names = Vec::new();
        while let NextResult::Ok(entry) = iter.next().await {
            names.push((entry.cookie, entry.name));
        }
        names
    }

    #[tokio::test]
    async fn config_builds_tree() {
        let fs = memfs();
        let attr = fs.lookup(Path::new("dir"), "a.txt").await.unwrap();
        assert_eq!(attr.size, 5);
        assert_eq!(fs.readlink(Path::new("link")).await.unwrap(), b"b.txt");
        assert_eq!(
            fs.getattr(Path::new("missing")).await,
            Err(nfsstat4::NFS4ERR_NOENT)
        );
        assert_eq!(
            fs.lookup(Path::new("b.txt"), "x").await,
            Err(nfsstat4::NFS4ERR_NOTDIR)
        );
    }

    #[tokio::test]
    async fn missing_parent_in_config() {
        let mut config = MemFsConfig::default();
        config.add_file("/nope/a.txt", b"x".to_vec());
        assert_eq!(MemFs::new(config).err(), Some(nfsstat4::NFS4ERR_NOENT));
    }

    #[tokio::test]
    async fn write_past_end_fills_hole() {
        let fs = memfs();
        let path = Path::new("b.txt");
        let before = fs.getattr(path).await.unwrap().change;
        let attr = fs.write(path, 7, b"!").await.unwrap();
        assert_eq!(attr.size, 8);
        assert!(attr.change > before);

        let (data, eof) = fs.read(path, 0, 100).await.unwrap();
        assert_eq!(data, b"world\0\0!");
        assert!(eof);
        let (data, eof) = fs.read(path, 1, 2).await.unwrap();
        assert_eq!(data, b"or");
        assert!(!eof);
    }

    #[tokio::test]
    async fn readdir_is_sorted_and_resumable() {
        let fs = memfs();
        let all = names(&fs, "", 0).await;
        let expected: Vec<(u64, String)> = vec![
            (3, "b.txt".into()),
            (4, "dir".into()),
            (5, "link".into()),
        ];
        assert_eq!(all, expected);

        assert_eq!(names(&fs, "", 3).await, expected[1..]);
        assert!(names(&fs, "", 5).await.is_empty());
        assert!(fs.readdir(Path::new(""), 9).await.is_err());
    }

    #[tokio::test]
    async fn exclusive_create_is_idempotent() {
        let fs = memfs();
        let dir = Path::new("dir");
        let mode = CreateMode::Exclusive([7; 8]);
        let first = fs.create(dir, "x", mode, SetAttributes::default()).await.unwrap();
        let again = fs.create(dir, "x", mode, SetAttributes::default()).await.unwrap();
        assert_eq!(first.fileid, again.fileid);
        assert_eq!(
            fs.create(dir, "x", CreateMode::Exclusive([8; 8]), SetAttributes::default())
                .await,
            Err(nfsstat4::NFS4ERR_EXIST)
        );
        assert_eq!(
            fs.create(dir, "x", CreateMode::Guarded, SetAttributes::default()).await,
            Err(nfsstat4::NFS4ERR_EXIST)
        );
    }

    #[tokio::test]
    async fn remove_and_rename() {
        let fs = memfs();
        assert_eq!(
            fs.remove(Path::new(""), "dir").await,
            Err(nfsstat4::NFS4ERR_NOTEMPTY)
        );
        assert_eq!(
            fs.rename(Path::new(""), "dir", Path::new("dir"), "inner").await,
            Err(nfsstat4::NFS4ERR_INVAL)
        );

        fs.rename(Path::new("dir"), "a.txt", Path::new(""), "b.txt")
            .await
            .unwrap();
        let (data, _) = fs.read(Path::new("b.txt"), 0, 10).await.unwrap();
        assert_eq!(data, b"hello");
        fs.remove(Path::new(""), "dir").await.unwrap();
        assert_eq!(
            fs.getattr(Path::new("dir")).await,
            Err(nfsstat4::NFS4ERR_NOENT)
        );
    }
}
