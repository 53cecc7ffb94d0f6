// Bookmarks: named shortcuts to directories, addressed by the 1-based
// number shown to the operator.

use std::path::{Path, PathBuf};

use crate::error::{UploaderError, UploaderResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct BookmarkStore {
    items: Vec<Bookmark>,
}

impl BookmarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Duplicate names are allowed.
    pub fn add(&mut self, name: &str, path: &Path) {
        self.items.push(Bookmark {
            name: name.to_string(),
            path: path.to_path_buf(),
        });
    }

    pub fn remove(&mut self, number: usize) -> UploaderResult<Bookmark> {
        let index = self.index_of(number)?;
        Ok(self.items.remove(index))
    }

    /// Path of bookmark `number`.
    pub fn jump(&self, number: usize) -> UploaderResult<&Path> {
        let index = self.index_of(number)?;
        Ok(&self.items[index].path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bookmark> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn index_of(&self, number: usize) -> UploaderResult<usize> {
        if number == 0 || number > self.items.len() {
            return Err(UploaderError::IndexOutOfRange {
                index: number,
                first: 1,
                last: self.items.len(),
            });
        }
        Ok(number - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_jump_remove() {
        let mut store = BookmarkStore::new();
        store.add("videos", Path::new("/home/op/Videos"));
        store.add("videos", Path::new("/mnt/videos"));
        assert_eq!(store.len(), 2);

        assert_eq!(store.jump(2).unwrap(), Path::new("/mnt/videos"));
        let removed = store.remove(1).unwrap();
        assert_eq!(removed.path, PathBuf::from("/home/op/Videos"));
        assert_eq!(store.jump(1).unwrap(), Path::new("/mnt/videos"));
    }

    #[test]
    fn out_of_range_numbers_fail() {
        let mut store = BookmarkStore::new();
        assert!(matches!(
            store.jump(1),
            Err(UploaderError::IndexOutOfRange { index: 1, last: 0, .. })
        ));
        store.add("root", Path::new("/"));
        assert!(store.jump(0).is_err());
        assert!(store.remove(2).is_err());
        assert_eq!(store.len(), 1);
    }
}
