// View state: the transient parameters that decide what the catalog shows
// for the current directory. Owned by the session and mutated only by the
// navigation / search / filter / sort / paging commands.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::catalog::{clamp_page, total_pages};
use crate::classify::FileClass;
use crate::error::UploaderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    Size,
    Date,
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortKey::Name => "name",
            SortKey::Size => "size",
            SortKey::Date => "date",
        })
    }
}

impl FromStr for SortKey {
    type Err = UploaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(SortKey::Name),
            "size" => Ok(SortKey::Size),
            "date" => Ok(SortKey::Date),
            other => Err(UploaderError::Input(format!(
                "unknown sort key '{other}', use one of: name, size, date"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ViewState {
    pub current_path: PathBuf,
    pub search_query: String,
    pub filter: Option<FileClass>,
    pub sort_key: SortKey,
    pub sort_descending: bool,
    pub page_index: usize,
}

impl ViewState {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ViewState {
            current_path: path.into(),
            search_query: String::new(),
            filter: None,
            sort_key: SortKey::Name,
            sort_descending: false,
            page_index: 0,
        }
    }

    /// Move to another directory. Search, filter and sort carry over.
    pub fn navigate(&mut self, path: &Path) {
        self.current_path = path.to_path_buf();
        self.page_index = 0;
    }

    /// Set the search query; an empty (or all-blank) query clears it.
    pub fn set_search(&mut self, query: &str) {
        self.search_query = query.trim().to_string();
        self.page_index = 0;
    }

    pub fn set_filter(&mut self, filter: Option<FileClass>) {
        self.filter = filter;
        self.page_index = 0;
    }

    /// Selecting the active key again flips direction; a new key starts
    /// ascending.
    pub fn sort_by(&mut self, key: SortKey) {
        if self.sort_key == key {
            self.sort_descending = !self.sort_descending;
        } else {
            self.sort_key = key;
            self.sort_descending = false;
        }
        self.page_index = 0;
    }

    /// Returns false when already on the last page.
    pub fn next_page(&mut self, item_count: usize) -> bool {
        if self.page_index + 1 < total_pages(item_count) {
            self.page_index += 1;
            true
        } else {
            false
        }
    }

    /// Returns false when already on the first page.
    pub fn prev_page(&mut self) -> bool {
        if self.page_index > 0 {
            self.page_index -= 1;
            true
        } else {
            false
        }
    }

    pub fn clamp_page(&mut self, item_count: usize) {
        self.page_index = clamp_page(self.page_index, item_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeating_sort_key_flips_direction() {
        let mut view = ViewState::new("/tmp");
        view.sort_by(SortKey::Size);
        assert_eq!(view.sort_key, SortKey::Size);
        assert!(!view.sort_descending);
        view.sort_by(SortKey::Size);
        assert!(view.sort_descending);
        view.sort_by(SortKey::Date);
        assert_eq!(view.sort_key, SortKey::Date);
        assert!(!view.sort_descending);
    }

    #[test]
    fn view_changes_reset_page() {
        let mut view = ViewState::new("/tmp");
        assert!(view.next_page(40));
        assert!(view.next_page(40));
        assert!(!view.next_page(40));
        assert_eq!(view.page_index, 2);

        view.set_search("Holiday");
        assert_eq!(view.page_index, 0);
        assert_eq!(view.search_query, "Holiday");

        view.page_index = 1;
        view.set_filter(Some(FileClass::Video));
        assert_eq!(view.page_index, 0);

        view.page_index = 1;
        view.navigate(Path::new("/var"));
        assert_eq!(view.page_index, 0);
        assert_eq!(view.filter, Some(FileClass::Video));
    }

    #[test]
    fn paging_stays_in_bounds() {
        let mut view = ViewState::new("/tmp");
        assert!(!view.prev_page());
        assert!(!view.next_page(0));
        view.page_index = 5;
        view.clamp_page(16);
        assert_eq!(view.page_index, 1);
    }

    #[test]
    fn sort_keys_parse() {
        assert_eq!("DATE".parse::<SortKey>().unwrap(), SortKey::Date);
        assert!("mtime".parse::<SortKey>().is_err());
    }
}
