use intaglio::Symbol;

/// A path below the export root stored as interned components.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub(super) struct SymbolsPath(Vec<Symbol>);

impl SymbolsPath {
    pub(super) const fn root() -> Self {
        Self(Vec::new())
    }

    pub(super) fn from_symbols(symbols: Vec<Symbol>) -> Self {
        Self(symbols)
    }

    pub(super) fn join(&self, symbol: Symbol) -> Self {
        let mut path = self.clone();
        path.0.push(symbol);
        path
    }

    pub(super) fn parent(&self) -> Option<Self> {
        let (_, parent) = self.0.split_last()?;
        Some(Self(parent.to_vec()))
    }

    pub(super) fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// True for `self` itself and everything below it.
    pub(super) fn starts_with(&self, prefix: &Self) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Moves `self` from below `from` to below `to`.
    pub(super) fn rebase(&self, from: &Self, to: &Self) -> Self {
        let mut path = to.0.clone();
        path.extend_from_slice(&self.0[from.0.len()..]);
        Self(path)
    }

    pub(super) fn symbols(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.0.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(ids: &[u32]) -> SymbolsPath {
        SymbolsPath::from_symbols(ids.iter().map(|id| Symbol::from(*id)).collect())
    }

    #[test]
    fn prefixes() {
        assert!(path(&[1, 2, 3]).starts_with(&path(&[1, 2])));
        assert!(path(&[1, 2]).starts_with(&path(&[1, 2])));
        assert!(!path(&[1, 4]).starts_with(&path(&[1, 2])));
        assert!(path(&[1]).starts_with(&SymbolsPath::root()));
    }

    #[test]
    fn rebase_keeps_suffix() {
        let moved = path(&[1, 2, 3]).rebase(&path(&[1, 2]), &path(&[5]));
        assert_eq!(moved, path(&[5, 3]));
        assert_eq!(path(&[1, 2]).parent(), Some(path(&[1])));
        assert_eq!(SymbolsPath::root().parent(), None);
    }
}
