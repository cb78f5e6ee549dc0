use std::path::PathBuf;

use intaglio::{Symbol, SymbolTable};
use nfs4_types::nfs4::nfsstat4;

use super::SymbolsPath;

/// Every path component is stored once and referenced by its [`Symbol`].
#[derive(Debug, Default)]
pub(super) struct SymbolsTable {
    table: SymbolTable,
}

impl SymbolsTable {
    pub(super) fn new() -> Self {
        Self {
            table: SymbolTable::new(),
        }
    }

    pub(super) fn intern(&mut self, name: &str) -> Result<Symbol, nfsstat4> {
        if let Some(symbol) = self.table.check_interned(name) {
            return Ok(symbol);
        }
        self.table
            .intern(name.to_owned())
            .map_err(|_| nfsstat4::NFS4ERR_RESOURCE)
    }

    /// Looks up a component without interning it.
    pub(super) fn get(&self, name: &str) -> Option<Symbol> {
        self.table.check_interned(name)
    }

    pub(super) fn resolve_path(&self, path: &SymbolsPath) -> Result<PathBuf, nfsstat4> {
        let mut path_buf = PathBuf::new();
        for symbol in path.symbols() {
            let name = self.table.get(symbol).ok_or(nfsstat4::NFS4ERR_SERVERFAULT)?;
            path_buf.push(name);
        }
        Ok(path_buf)
    }

    pub(super) fn len(&self) -> usize {
        self.table.len()
    }
}
