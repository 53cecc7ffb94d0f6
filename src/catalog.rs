// Directory catalog: turns a directory plus the current view state into
// the ordered list of entries the explorer shows, and slices that list
// into pages.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use chrono::{DateTime, Local};
use walkdir::WalkDir;

use crate::classify::{classify, FileClass};
use crate::error::{UploaderError, UploaderResult};
use crate::view::{SortKey, ViewState};

/// Entries shown per page.
pub const PAGE_SIZE: usize = 15;

/// The folder-size walk stops once this many files were counted in a
/// single directory, so folder sizes are a lower bound for huge trees.
pub const FOLDER_SCAN_CAP: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Parent,
    Folder,
    File,
}

/// One row of the catalog. Rebuilt on every scan; identity is the path.
#[derive(Debug, Clone, PartialEq)]
pub struct FileSystemEntry {
    pub name: String,
    pub path: PathBuf,
    pub kind: EntryKind,
    pub size_bytes: u64,
    pub modified_at: DateTime<Local>,
    /// Lower-cased, without the dot. Only set for files (possibly empty).
    pub extension: Option<String>,
}

impl FileSystemEntry {
    fn parent(path: &Path) -> Self {
        let modified_at = fs::metadata(path)
            .map(|meta| modified_time(&meta))
            .unwrap_or_else(|_| epoch());
        FileSystemEntry {
            name: "..".to_string(),
            path: path.to_path_buf(),
            kind: EntryKind::Parent,
            size_bytes: 0,
            modified_at,
            extension: None,
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// Content class of a file entry; `None` for folders and the parent row.
    pub fn class(&self) -> Option<FileClass> {
        self.extension.as_deref().map(classify)
    }

    pub fn icon(&self) -> &'static str {
        match self.kind {
            EntryKind::Parent => "⬆️",
            EntryKind::Folder => "📁",
            EntryKind::File => self.class().unwrap_or(FileClass::Other).icon(),
        }
    }
}

/// Scan `view.current_path` applying the view's search, filter and sort.
///
/// Order of the result: the parent row (unless at the filesystem root),
/// then folders, then files. Folders are never removed by the type filter.
/// Children whose metadata cannot be read are dropped silently; only a
/// failure to read the directory itself is an error.
pub fn scan(view: &ViewState) -> UploaderResult<Vec<FileSystemEntry>> {
    let dir = &view.current_path;
    let children = fs::read_dir(dir).map_err(|err| match err.kind() {
        io::ErrorKind::PermissionDenied => UploaderError::AccessDenied(dir.clone()),
        _ => UploaderError::Io(err),
    })?;

    let needle = view.search_query.to_lowercase();
    let mut folders = Vec::new();
    let mut files = Vec::new();

    for child in children {
        let child = match child {
            Ok(child) => child,
            Err(err) => {
                tracing::debug!("skipping unreadable entry in {}: {err}", dir.display());
                continue;
            }
        };
        let name = child.file_name().to_string_lossy().into_owned();
        if !needle.is_empty() && !name.to_lowercase().contains(&needle) {
            continue;
        }

        let path = child.path();
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(err) => {
                tracing::debug!("skipping {}: {err}", path.display());
                continue;
            }
        };

        if metadata.is_dir() {
            folders.push(FileSystemEntry {
                name,
                size_bytes: folder_size(&path),
                path,
                kind: EntryKind::Folder,
                modified_at: modified_time(&metadata),
                extension: None,
            });
        } else {
            let extension = path
                .extension()
                .map(|ext| ext.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            if let Some(filter) = view.filter {
                if classify(&extension) != filter {
                    continue;
                }
            }
            files.push(FileSystemEntry {
                name,
                path,
                kind: EntryKind::File,
                size_bytes: metadata.len(),
                modified_at: modified_time(&metadata),
                extension: Some(extension),
            });
        }
    }

    sort_entries(&mut folders, view.sort_key, view.sort_descending);
    sort_entries(&mut files, view.sort_key, view.sort_descending);

    let mut entries = Vec::with_capacity(folders.len() + files.len() + 1);
    if let Some(parent) = dir.parent() {
        entries.push(FileSystemEntry::parent(parent));
    }
    entries.extend(folders);
    entries.extend(files);
    Ok(entries)
}

/// Ascending order with the name as tie-breaker; descending is the exact
/// reverse of ascending.
fn sort_entries(entries: &mut [FileSystemEntry], key: SortKey, descending: bool) {
    entries.sort_by(|a, b| {
        let primary = match key {
            SortKey::Name => a.name.cmp(&b.name),
            SortKey::Size => a.size_bytes.cmp(&b.size_bytes),
            SortKey::Date => a.modified_at.cmp(&b.modified_at),
        };
        primary.then_with(|| a.name.cmp(&b.name))
    });
    if descending {
        entries.reverse();
    }
}

/// Best-effort recursive size of a folder. Unreadable entries count as
/// zero, and the walk stops after `FOLDER_SCAN_CAP` files in any one
/// directory.
pub fn folder_size(path: &Path) -> u64 {
    let mut total = 0u64;
    let mut files_per_dir: HashMap<PathBuf, usize> = HashMap::new();

    for entry in WalkDir::new(path).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(metadata) = entry.metadata() {
            total += metadata.len();
        }
        let parent = entry.path().parent().unwrap_or(path).to_path_buf();
        let seen = files_per_dir.entry(parent).or_insert(0);
        *seen += 1;
        if *seen >= FOLDER_SCAN_CAP {
            tracing::debug!("folder size of {} capped", path.display());
            break;
        }
    }
    total
}

fn modified_time(metadata: &fs::Metadata) -> DateTime<Local> {
    metadata
        .modified()
        .map(DateTime::<Local>::from)
        .unwrap_or_else(|_| epoch())
}

fn epoch() -> DateTime<Local> {
    DateTime::<Local>::from(UNIX_EPOCH)
}

/// One page of a scan result.
#[derive(Debug)]
pub struct Page<'a> {
    pub entries: &'a [FileSystemEntry],
    /// Offset of `entries[0]` in the full list.
    pub start: usize,
    pub page_index: usize,
    pub total_pages: usize,
}

pub fn total_pages(item_count: usize) -> usize {
    item_count.div_ceil(PAGE_SIZE).max(1)
}

pub fn clamp_page(page_index: usize, item_count: usize) -> usize {
    page_index.min(total_pages(item_count) - 1)
}

pub fn paginate(entries: &[FileSystemEntry], page_index: usize) -> Page<'_> {
    let start = page_index.saturating_mul(PAGE_SIZE).min(entries.len());
    let end = (start + PAGE_SIZE).min(entries.len());
    Page {
        entries: &entries[start..end],
        start,
        page_index,
        total_pages: total_pages(entries.len()),
    }
}

pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    match bytes {
        0 => "-".to_string(),
        n if n < 1024 => format!("{n} B"),
        n if n < 1024 * 1024 => format!("{:.1} KB", b / KB),
        n if n < 1024 * 1024 * 1024 => format!("{:.1} MB", b / (KB * KB)),
        _ => format!("{:.2} GB", b / (KB * KB * KB)),
    }
}

pub fn format_date(at: &DateTime<Local>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, len: usize) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, vec![b'x'; len]).unwrap();
        path
    }

    fn fixture() -> TempDir {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("Movies")).unwrap();
        fs::create_dir(tmp.path().join("docs")).unwrap();
        write(&tmp.path().join("Movies"), "inner.mp4", 300);
        write(tmp.path(), "clip.MP4", 50);
        write(tmp.path(), "song.mp3", 10);
        write(tmp.path(), "notes.txt", 20);
        write(tmp.path(), "README", 5);
        tmp
    }

    fn names(entries: &[FileSystemEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn non_root_scan_has_parent_then_folders_then_files() {
        let tmp = fixture();
        let entries = scan(&ViewState::new(tmp.path())).unwrap();

        assert_eq!(entries.len(), 1 + 2 + 4);
        assert_eq!(entries[0].kind, EntryKind::Parent);
        assert_eq!(entries[0].path, tmp.path().parent().unwrap());
        assert_eq!(
            names(&entries[1..]),
            vec!["Movies", "docs", "README", "clip.MP4", "notes.txt", "song.mp3"]
        );
        assert_eq!(entries[1].size_bytes, 300);
        assert_eq!(entries[3].extension.as_deref(), Some(""));
        assert_eq!(entries[4].extension.as_deref(), Some("mp4"));
    }

    #[test]
    fn filter_applies_to_files_only() {
        let tmp = fixture();
        let mut view = ViewState::new(tmp.path());
        view.set_filter(Some(FileClass::Video));
        let entries = scan(&view).unwrap();

        assert_eq!(entries.len(), 1 + 2 + 1);
        assert_eq!(names(&entries[1..]), vec!["Movies", "docs", "clip.MP4"]);
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let tmp = fixture();
        let mut view = ViewState::new(tmp.path());
        view.set_search("MOV");
        let entries = scan(&view).unwrap();
        assert_eq!(names(&entries), vec!["..", "Movies"]);

        view.set_search("o");
        let entries = scan(&view).unwrap();
        assert_eq!(
            names(&entries[1..]),
            vec!["Movies", "docs", "notes.txt", "song.mp3"]
        );
    }

    #[test]
    fn toggling_size_sort_reverses_exactly() {
        let tmp = TempDir::new().unwrap();
        for (name, len) in [("a.bin", 30), ("b.bin", 10), ("c.bin", 10), ("d.bin", 20)] {
            write(tmp.path(), name, len);
        }
        let mut view = ViewState::new(tmp.path());
        view.sort_by(SortKey::Size);
        let ascending = scan(&view).unwrap();
        assert_eq!(
            names(&ascending[1..]),
            vec!["b.bin", "c.bin", "d.bin", "a.bin"]
        );

        view.sort_by(SortKey::Size);
        let descending = scan(&view).unwrap();
        let mut reversed = ascending[1..].to_vec();
        reversed.reverse();
        assert_eq!(&descending[1..], reversed.as_slice());
    }

    #[test]
    fn date_sort_uses_modified_time() {
        let tmp = TempDir::new().unwrap();
        let base = SystemTime::now() - Duration::from_secs(3600);
        for (i, name) in ["new.txt", "old.txt", "mid.txt"].iter().enumerate() {
            let path = write(tmp.path(), name, 1);
            let age = match i {
                0 => 0,
                1 => 600,
                _ => 300,
            };
            fs::File::options()
                .write(true)
                .open(&path)
                .unwrap()
                .set_modified(base - Duration::from_secs(age))
                .unwrap();
        }
        let mut view = ViewState::new(tmp.path());
        view.sort_by(SortKey::Date);
        let entries = scan(&view).unwrap();
        assert_eq!(names(&entries[1..]), vec!["old.txt", "mid.txt", "new.txt"]);
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let tmp = TempDir::new().unwrap();
        let err = scan(&ViewState::new(tmp.path().join("gone"))).unwrap_err();
        assert!(matches!(err, UploaderError::Io(_)));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directory_is_access_denied_not_empty() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let locked = tmp.path().join("locked");
        fs::create_dir(&locked).unwrap();
        write(&locked, "hidden.txt", 1);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        let readable = fs::read_dir(&locked).is_ok();
        let result = scan(&ViewState::new(&locked));
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        if readable {
            // Permissions are not enforced for root.
            return;
        }
        assert!(matches!(result, Err(UploaderError::AccessDenied(p)) if p == locked));
    }

    #[test]
    fn folder_size_stops_at_cap() {
        let tmp = TempDir::new().unwrap();
        let big = tmp.path().join("big");
        fs::create_dir(&big).unwrap();
        for i in 0..FOLDER_SCAN_CAP + 5 {
            write(&big, &format!("f{i}"), 1);
        }
        assert_eq!(folder_size(&big), FOLDER_SCAN_CAP as u64);
    }

    #[test]
    fn folder_size_is_recursive() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        write(tmp.path(), "top", 7);
        write(&nested, "deep", 5);
        assert_eq!(folder_size(tmp.path()), 12);
    }

    fn dummy_entries(n: usize) -> Vec<FileSystemEntry> {
        (0..n)
            .map(|i| FileSystemEntry {
                name: format!("f{i}"),
                path: PathBuf::from(format!("/tmp/f{i}")),
                kind: EntryKind::File,
                size_bytes: 1,
                modified_at: epoch(),
                extension: Some(String::new()),
            })
            .collect()
    }

    #[test]
    fn pagination_of_37_items() {
        let entries = dummy_entries(37);
        assert_eq!(total_pages(entries.len()), 3);
        let last = paginate(&entries, 2);
        assert_eq!(last.entries.len(), 7);
        assert_eq!(last.start, 30);
        assert_eq!(last.total_pages, 3);
        assert_eq!(paginate(&entries, 0).entries.len(), PAGE_SIZE);
        assert!(paginate(&entries, 9).entries.is_empty());
    }

    #[test]
    fn empty_listing_still_has_one_page() {
        let page = paginate(&[], 0);
        assert_eq!(page.total_pages, 1);
        assert!(page.entries.is_empty());
        assert_eq!(clamp_page(4, 0), 0);
    }

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(format_size(0), "-");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(50 * 1024 * 1024), "50.0 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.00 GB");
    }
}
