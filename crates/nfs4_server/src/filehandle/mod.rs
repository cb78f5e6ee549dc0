//! Filehandles handed out to clients.
//!
//! A filehandle is 16 bytes: the server generation (start time in
//! milliseconds, little endian) followed by a table id (little endian). Ids
//! are minted in increasing order and never reused, so a handle either keeps
//! naming the object it was issued for or becomes stale.
//!
//! The table maps ids to paths below the export root. Paths are stored as
//! interned components, every distinct name is kept once. Each id also
//! remembers the fileid of its object, so a path that now names another
//! object does not revive an old handle.

mod path;
mod table;

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use nfs4_types::nfs4::{nfs_fh4, nfsstat4};
use nfs4_types::xdr_codec::Opaque;
use path::SymbolsPath;
use table::SymbolsTable;
use tracing::debug;

use crate::threshold_logger::ThresholdLogger;

const HANDLE_SIZE: usize = 16;

/// Server-side identity of a filesystem object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    pub const ROOT: Self = Self(1);

    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for HandleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
struct Inner {
    symbols: SymbolsTable,
    path_to_id: HashMap<SymbolsPath, HandleId>,
    id_to_path: HashMap<HandleId, SymbolsPath>,
    fileids: HashMap<HandleId, u64>,
    next_id: u64,

    symbols_logger: ThresholdLogger,
    handles_logger: ThresholdLogger,
}

impl Inner {
    fn new() -> Self {
        let root = SymbolsPath::root();
        Self {
            symbols: SymbolsTable::new(),
            path_to_id: HashMap::from([(root.clone(), HandleId::ROOT)]),
            id_to_path: HashMap::from([(HandleId::ROOT, root)]),
            fileids: HashMap::new(),
            next_id: HandleId::ROOT.0 + 1,
            symbols_logger: ThresholdLogger::new("symbols"),
            handles_logger: ThresholdLogger::new("filehandles"),
        }
    }

    fn path_of(&self, id: HandleId) -> Result<&SymbolsPath, nfsstat4> {
        self.id_to_path.get(&id).ok_or(nfsstat4::NFS4ERR_STALE)
    }

    fn intern(&mut self, path: SymbolsPath, fileid: Option<u64>) -> HandleId {
        if let Some(id) = self.path_to_id.get(&path).copied() {
            match (self.fileids.get(&id).copied(), fileid) {
                (Some(known), Some(fileid)) if known != fileid => {
                    debug!(%id, known, fileid, "path names another object now");
                    self.drop_subtree(&path);
                }
                (None, Some(fileid)) => {
                    self.fileids.insert(id, fileid);
                    return id;
                }
                _ => return id,
            }
        }

        let id = HandleId(self.next_id);
        self.next_id += 1;
        self.id_to_path.insert(id, path.clone());
        if let Some(fileid) = fileid {
            self.fileids.insert(id, fileid);
        }
        self.path_to_id.insert(path, id);
        self.handles_logger.check_and_log(self.path_to_id.len());
        id
    }

    fn intern_symbols(&mut self, path: &Path) -> Result<SymbolsPath, nfsstat4> {
        let mut symbols = Vec::new();
        for name in components(path)? {
            symbols.push(self.symbols.intern(name)?);
        }
        self.symbols_logger.check_and_log(self.symbols.len());
        Ok(SymbolsPath::from_symbols(symbols))
    }

    /// `None` if some component was never interned, so nothing is tracked there.
    fn find_symbols(&self, path: &Path) -> Result<Option<SymbolsPath>, nfsstat4> {
        let mut symbols = Vec::new();
        for name in components(path)? {
            match self.symbols.get(name) {
                Some(symbol) => symbols.push(symbol),
                None => return Ok(None),
            }
        }
        Ok(Some(SymbolsPath::from_symbols(symbols)))
    }

    fn drop_subtree(&mut self, prefix: &SymbolsPath) -> Vec<HandleId> {
        let mut dropped = Vec::new();
        self.path_to_id.retain(|path, id| {
            let keep = !path.starts_with(prefix);
            if !keep {
                dropped.push(*id);
            }
            keep
        });
        for id in &dropped {
            self.id_to_path.remove(id);
            self.fileids.remove(id);
        }
        dropped
    }
}

fn components(path: &Path) -> Result<Vec<&str>, nfsstat4> {
    path.components()
        .map(|component| match component {
            Component::Normal(name) => name.to_str().ok_or(nfsstat4::NFS4ERR_BADNAME),
            _ => Err(nfsstat4::NFS4ERR_INVAL),
        })
        .collect()
}

fn split_handle(data: &[u8]) -> Option<(u64, u64)> {
    if data.len() != HANDLE_SIZE {
        return None;
    }
    let (generation, id) = data.split_at(8);
    Some((
        u64::from_le_bytes(generation.try_into().ok()?),
        u64::from_le_bytes(id.try_into().ok()?),
    ))
}

/// Issues and resolves filehandles. Shared by all connections.
#[derive(Debug)]
pub struct FileHandleTable {
    generation: u64,
    inner: RwLock<Inner>,
}

impl Default for FileHandleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FileHandleTable {
    #[must_use]
    pub fn new() -> Self {
        let generation = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |since| u64::try_from(since.as_millis()).unwrap_or(u64::MAX));
        Self::with_generation(generation)
    }

    /// Creates a table as if the server had started at `generation`.
    #[must_use]
    pub fn with_generation(generation: u64) -> Self {
        Self {
            generation,
            inner: RwLock::new(Inner::new()),
        }
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn encode(&self, id: HandleId) -> nfs_fh4 {
        let mut data = Vec::with_capacity(HANDLE_SIZE);
        data.extend_from_slice(&self.generation.to_le_bytes());
        data.extend_from_slice(&id.0.to_le_bytes());
        nfs_fh4 {
            data: Opaque::owned(data),
        }
    }

    /// Validates a handle received from a client.
    ///
    /// Handles of another shape, or from a server generation newer than ours,
    /// were never issued by us and are `NFS4ERR_BADHANDLE`. Handles from a
    /// previous run or of objects that are gone are `NFS4ERR_STALE`.
    pub fn decode(&self, handle: &nfs_fh4) -> Result<HandleId, nfsstat4> {
        let (generation, id) = split_handle(&handle.data).ok_or(nfsstat4::NFS4ERR_BADHANDLE)?;
        if generation > self.generation {
            return Err(nfsstat4::NFS4ERR_BADHANDLE);
        }
        if generation < self.generation {
            return Err(nfsstat4::NFS4ERR_STALE);
        }

        let id = HandleId(id);
        self.read().path_of(id)?;
        Ok(id)
    }

    /// Path of the object relative to the export root.
    pub fn resolve(&self, id: HandleId) -> Result<PathBuf, nfsstat4> {
        let inner = self.read();
        let path = inner.path_of(id)?;
        inner.symbols.resolve_path(path)
    }

    /// Returns the handle of `path`, minting one on first use.
    pub fn intern(&self, path: &Path) -> Result<HandleId, nfsstat4> {
        let mut inner = self.write();
        let symbols = inner.intern_symbols(path)?;
        Ok(inner.intern(symbols, None))
    }

    /// Returns the handle of `name` inside the directory `parent`. If the
    /// name held a handle for an object with another fileid, that handle and
    /// the ones below it are dropped and a new one is minted.
    pub fn intern_child(
        &self,
        parent: HandleId,
        name: &str,
        fileid: u64,
    ) -> Result<HandleId, nfsstat4> {
        let mut inner = self.write();
        let parent = inner.path_of(parent)?.clone();
        let symbol = inner.symbols.intern(name)?;
        inner.symbols_logger.check_and_log(inner.symbols.len());
        Ok(inner.intern(parent.join(symbol), Some(fileid)))
    }

    /// Checks that `id` still names the object with `fileid`. The first check
    /// of a handle minted without a fileid records it.
    pub fn check_fileid(&self, id: HandleId, fileid: u64) -> Result<(), nfsstat4> {
        let mut inner = self.write();
        inner.path_of(id)?;
        match inner.fileids.get(&id).copied() {
            Some(known) if known != fileid => Err(nfsstat4::NFS4ERR_STALE),
            Some(_) => Ok(()),
            None => {
                inner.fileids.insert(id, fileid);
                Ok(())
            }
        }
    }

    /// Handle of the containing directory, `None` for the export root.
    pub fn parent(&self, id: HandleId) -> Result<Option<HandleId>, nfsstat4> {
        let mut inner = self.write();
        let Some(parent) = inner.path_of(id)?.parent() else {
            return Ok(None);
        };
        Ok(Some(inner.intern(parent, None)))
    }

    /// Forgets a single handle, e.g. after its object vanished.
    pub fn invalidate(&self, id: HandleId) {
        if id == HandleId::ROOT {
            return;
        }
        let mut inner = self.write();
        if let Some(path) = inner.id_to_path.remove(&id) {
            debug!(%id, "filehandle invalidated");
            inner.fileids.remove(&id);
            inner.path_to_id.remove(&path);
        }
    }

    /// Invalidates `path` and everything below it. Returns the dropped handles.
    pub fn remove(&self, path: &Path) -> Vec<HandleId> {
        let mut inner = self.write();
        let Ok(Some(symbols)) = inner.find_symbols(path) else {
            return Vec::new();
        };
        if symbols.is_root() {
            return Vec::new();
        }
        let dropped = inner.drop_subtree(&symbols);
        debug!(?path, count = dropped.len(), "filehandles removed");
        dropped
    }

    /// Rebinds the handles below `from` to `to`. Handles of a displaced
    /// target are invalidated and returned.
    pub fn rename(&self, from: &Path, to: &Path) -> Result<Vec<HandleId>, nfsstat4> {
        let mut inner = self.write();
        let to_symbols = inner.intern_symbols(to)?;
        let from_symbols = inner.find_symbols(from)?;
        if from_symbols.as_ref() == Some(&to_symbols) || to_symbols.is_root() {
            return Ok(Vec::new());
        }

        let displaced = inner.drop_subtree(&to_symbols);
        let Some(from_symbols) = from_symbols else {
            return Ok(displaced);
        };
        if from_symbols.is_root() {
            return Ok(displaced);
        }

        let moved: Vec<(SymbolsPath, HandleId)> = inner
            .path_to_id
            .iter()
            .filter(|(path, _)| path.starts_with(&from_symbols))
            .map(|(path, id)| (path.clone(), *id))
            .collect();
        for (old_path, id) in moved {
            inner.path_to_id.remove(&old_path);
            let new_path = old_path.rebase(&from_symbols, &to_symbols);
            inner.id_to_path.insert(id, new_path.clone());
            inner.path_to_id.insert(new_path, id);
        }
        debug!(?from, ?to, displaced = displaced.len(), "filehandles renamed");
        Ok(displaced)
    }

    /// Number of live handles, the root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().id_to_path.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
