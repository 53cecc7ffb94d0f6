// Selection set: the files the operator has picked for upload, kept in the
// order they were picked and unique by path.

use std::path::Path;

use crate::catalog::FileSystemEntry;
use crate::error::{UploaderError, UploaderResult};

/// Result of `SelectionSet::toggle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Added,
    Removed,
}

/// Ordered set of file entries. Every member is a file.
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    entries: Vec<FileSystemEntry>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the entry if its path is not selected yet, otherwise remove it.
    /// Folders and the parent row are rejected without touching the set.
    pub fn toggle(&mut self, entry: &FileSystemEntry) -> UploaderResult<Toggle> {
        if !entry.is_file() {
            return Err(UploaderError::Input(format!(
                "only files can be selected ('{}' is not a file)",
                entry.name
            )));
        }
        if let Some(pos) = self.position(&entry.path) {
            self.entries.remove(pos);
            Ok(Toggle::Removed)
        } else {
            self.entries.push(entry.clone());
            Ok(Toggle::Added)
        }
    }

    /// Replace the selection with the files among `entries`. Callers pass
    /// the whole filtered view, not just the visible page.
    pub fn select_all_visible(&mut self, entries: &[FileSystemEntry]) -> usize {
        self.entries = entries.iter().filter(|e| e.is_file()).cloned().collect();
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.position(path).is_some()
    }

    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|e| e.size_bytes).sum()
    }

    pub fn entries(&self) -> &[FileSystemEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, path: &Path) -> Option<usize> {
        self.entries.iter().position(|e| e.path == path)
    }
}
