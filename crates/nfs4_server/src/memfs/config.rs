#[derive(Debug, Clone)]
pub(super) enum MemFsConfigKind {
    Dir,
    File(Vec<u8>),
    Symlink(String),
}

#[derive(Debug, Clone)]
pub(super) struct MemFsConfigEntry {
    pub(super) path: String,
    pub(super) kind: MemFsConfigKind,
}

/// Initial configuration for the in-memory file system.
///
/// Entries are created in the order they were added, so a directory has to
/// be added before anything inside it. Paths are `/`-separated and relative
/// to the export root; a leading `/` is optional.
#[derive(Default, Debug, Clone)]
pub struct MemFsConfig {
    pub(super) entries: Vec<MemFsConfigEntry>,
}

impl MemFsConfig {
    /// Adds a directory to the file system configuration.
    pub fn add_dir(&mut self, path: &str) {
        self.push(path, MemFsConfigKind::Dir);
    }

    /// Adds a file to the file system configuration.
    pub fn add_file(&mut self, path: &str, content: impl Into<Vec<u8>>) {
        self.push(path, MemFsConfigKind::File(content.into()));
    }

    /// Adds a symlink pointing to `target`.
    pub fn add_symlink(&mut self, path: &str, target: &str) {
        self.push(path, MemFsConfigKind::Symlink(target.to_string()));
    }

    fn push(&mut self, path: &str, kind: MemFsConfigKind) {
        self.entries.push(MemFsConfigEntry {
            path: path.to_string(),
            kind,
        });
    }
}

/// Splits `/a/b/c` into (`["a", "b"]`, `"c"`). `None` for the root itself.
pub(super) fn split_path(path: &str) -> Option<(Vec<&str>, &str)> {
    let mut components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
    let name = components.pop()?;
    Some((components, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fs_config() {
        let mut config = MemFsConfig::default();
        config.add_file("/a.txt", b"hello world\n");
        config.add_dir("/another_dir");
        config.add_file("another_dir/thisworks.txt", b"i hope\n");
        config.add_symlink("/link", "a.txt");

        assert_eq!(config.entries.len(), 4);
        assert!(matches!(config.entries[1].kind, MemFsConfigKind::Dir));
        assert!(matches!(
            &config.entries[3].kind,
            MemFsConfigKind::Symlink(target) if target == "a.txt"
        ));
    }

    #[test]
    fn paths() {
        assert_eq!(split_path("/a.txt"), Some((vec![], "a.txt")));
        assert_eq!(
            split_path("another_dir/x/thisworks.txt"),
            Some((vec!["another_dir", "x"], "thisworks.txt"))
        );
        assert_eq!(split_path("/"), None);
        assert_eq!(split_path(""), None);
    }
}
