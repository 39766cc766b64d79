//! Source document discovery.
//!
//! Walks the source directory and returns every Markdown file, sorted by
//! relative path so that builds register units in a stable order. Hidden
//! entries (such as `.vuepress` or `.git`) and `node_modules` are skipped.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A Markdown file found under the source directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SourceFile {
    /// Absolute (or source-dir joined) path used for reading.
    pub path: PathBuf,
    /// Path relative to the source directory.
    pub relative: PathBuf,
}

pub(crate) struct Scanner {
    source_dir: PathBuf,
}

impl Scanner {
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
        }
    }

    /// Collect all Markdown files.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a directory cannot be read.
    pub fn scan(&self) -> io::Result<Vec<SourceFile>> {
        let mut files = Vec::new();
        self.scan_directory(&self.source_dir, Path::new(""), &mut files)?;
        files.sort_by(|a, b| a.relative.cmp(&b.relative));
        Ok(files)
    }

    fn scan_directory(
        &self,
        dir_path: &Path,
        relative_dir: &Path,
        files: &mut Vec<SourceFile>,
    ) -> io::Result<()> {
        for entry in fs::read_dir(dir_path)? {
            let entry = entry?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if name_str.starts_with('.') || name_str == "node_modules" {
                continue;
            }

            let path = entry.path();
            let relative = relative_dir.join(&name);
            if entry.file_type()?.is_dir() {
                self.scan_directory(&path, &relative, files)?;
            } else if path.extension().is_some_and(|e| e == "md") {
                files.push(SourceFile { path, relative });
            }
        }
        Ok(())
    }
}
