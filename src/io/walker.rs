use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::errors::{CodevetError, Result};

/// Collects Python source files under a directory, honoring `.gitignore`.
pub struct FileWalker {
    root: PathBuf,
    recursive: bool,
    extensions: Vec<String>,
}

impl FileWalker {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            recursive: true,
            extensions: vec!["py".to_string()],
        }
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Matching files in sorted order. Entries that cannot be read are
    /// logged and skipped; only an unreadable root is an error.
    pub fn walk(&self) -> Result<Vec<PathBuf>> {
        if !self.root.is_dir() {
            return Err(CodevetError::io(
                &self.root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            ));
        }

        let mut files = Vec::new();
        let walker = WalkBuilder::new(&self.root)
            .hidden(false)
            .git_ignore(true)
            .max_depth(if self.recursive { None } else { Some(1) })
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            let path = entry.path();
            if path.is_file() && self.should_process(path) {
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        Ok(files)
    }

    fn should_process(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy())
            .is_some_and(|ext| self.extensions.iter().any(|wanted| *wanted == ext))
    }
}

pub fn find_python_files(root: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    FileWalker::new(root.to_path_buf())
        .recursive(recursive)
        .walk()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.py"), "x = 1\n").unwrap();
        fs::write(temp.path().join("notes.md"), "# notes\n").unwrap();
        fs::create_dir(temp.path().join("pkg")).unwrap();
        fs::write(temp.path().join("pkg").join("b.py"), "y = 2\n").unwrap();
        temp
    }

    #[test]
    fn test_recursive_walk_finds_nested_python() {
        let temp = tree();
        let files = find_python_files(temp.path(), true).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.extension().unwrap() == "py"));
    }

    #[test]
    fn test_flat_walk_stays_at_top_level() {
        let temp = tree();
        let files = find_python_files(temp.path(), false).unwrap();
        assert_eq!(files, vec![temp.path().join("a.py")]);
    }

    #[test]
    fn test_missing_root_is_error() {
        let temp = TempDir::new().unwrap();
        assert!(find_python_files(&temp.path().join("nope"), true).is_err());
    }
}
