//! Abstraction over reading source and binary-include files, so the core
//! engine stays free of direct filesystem access. The `asm64` binary
//! supplies an `FsSourceProvider`; tests use an in-memory double.

use std::io;
use std::path::{Path, PathBuf};

pub trait SourceProvider {
    /// Read a source file's text, searching `include_paths` in order if
    /// `path` is relative and not found alongside the including file.
    fn read_source(&self, path: &Path) -> io::Result<String>;

    /// Read a binary file's raw bytes (for `!binary`).
    fn read_binary(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Resolve an include/binary path against the known include search
    /// path list, returning the first path that exists.
    fn resolve(&self, path: &Path, include_paths: &[PathBuf]) -> Option<PathBuf> {
        if path.is_absolute() || self.exists(path) {
            return Some(path.to_path_buf());
        }
        for dir in include_paths {
            let candidate = dir.join(path);
            if self.exists(&candidate) {
                return Some(candidate);
            }
        }
        None
    }

    fn exists(&self, path: &Path) -> bool;
}

/// Reads from the real filesystem.
pub struct FsSourceProvider;

impl SourceProvider for FsSourceProvider {
    fn read_source(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn read_binary(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use super::*;
    use std::collections::HashMap;

    /// An in-memory `SourceProvider`, used so unit tests don't touch disk.
    #[derive(Default)]
    pub struct MemorySourceProvider {
        pub files: HashMap<PathBuf, String>,
        pub binaries: HashMap<PathBuf, Vec<u8>>,
    }

    impl MemorySourceProvider {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_source(mut self, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
            self.files.insert(path.into(), text.into());
            self
        }
    }

    impl SourceProvider for MemorySourceProvider {
        fn read_source(&self, path: &Path) -> io::Result<String> {
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
        }

        fn read_binary(&self, path: &Path) -> io::Result<Vec<u8>> {
            self.binaries
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
        }

        fn exists(&self, path: &Path) -> bool {
            self.files.contains_key(path) || self.binaries.contains_key(path)
        }
    }
}

#[cfg(test)]
mod test {
    use super::test_helpers::MemorySourceProvider;
    use super::*;

    #[test]
    fn memory_provider_reads_back_registered_source() {
        let provider = MemorySourceProvider::new().with_source("main.asm", "lda #1");
        let text = provider.read_source(Path::new("main.asm")).unwrap();
        assert_eq!(text, "lda #1");
    }

    #[test]
    fn resolve_searches_include_paths_in_order() {
        let provider =
            MemorySourceProvider::new().with_source("libs/macros.asm", "!macro foo {}");
        let include_paths = vec![PathBuf::from("libs")];
        let resolved = provider
            .resolve(Path::new("macros.asm"), &include_paths)
            .unwrap();
        assert_eq!(resolved, PathBuf::from("libs/macros.asm"));
    }

    #[test]
    fn resolve_returns_none_when_not_found() {
        let provider = MemorySourceProvider::new();
        assert!(provider.resolve(Path::new("missing.asm"), &[]).is_none());
    }
}
