// Session: the one mutable object behind the explorer. Holds the view,
// the selection, the bookmarks and the current listing, and implements
// every command that does not need to talk to the operator. The terminal
// loop in `ui` parses input into `Command`s and calls into this.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::bookmarks::BookmarkStore;
use crate::catalog::{paginate, scan, EntryKind, FileSystemEntry, Page};
use crate::classify::FileClass;
use crate::error::{UploaderError, UploaderResult};
use crate::selection::{SelectionSet, Toggle};
use crate::view::{SortKey, ViewState};

/// One line of operator input.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `<N>`: enter a folder or toggle a file.
    Open(usize),
    /// `s <N>`
    Toggle(usize),
    SelectAll,
    Clear,
    Upload,
    Refresh,
    Home,
    NextPage,
    PrevPage,
    /// `/ <text>`; empty text clears the search.
    Search(String),
    /// `f <kind>`; `f all` clears the filter.
    Filter(Option<FileClass>),
    Sort(SortKey),
    Bookmarks,
    Info(usize),
    Help,
    Quit,
}

fn parse_number(raw: &str, usage: &str) -> UploaderResult<usize> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(UploaderError::Input(format!("usage: {usage}"))),
    }
}

impl FromStr for Command {
    type Err = UploaderError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim().to_lowercase();
        if let Some(query) = line.strip_prefix('/') {
            return Ok(Command::Search(query.trim().to_string()));
        }
        if !line.is_empty() && line.chars().all(|c| c.is_ascii_digit()) {
            return parse_number(&line, "<number>").map(Command::Open);
        }

        let (head, arg) = match line.split_once(char::is_whitespace) {
            Some((head, arg)) => (head, Some(arg.trim())),
            None => (line.as_str(), None),
        };
        match (head, arg) {
            ("a", None) => Ok(Command::SelectAll),
            ("c", None) => Ok(Command::Clear),
            ("u", None) => Ok(Command::Upload),
            ("r", None) => Ok(Command::Refresh),
            ("h", None) => Ok(Command::Home),
            ("n", None) => Ok(Command::NextPage),
            ("p", None) => Ok(Command::PrevPage),
            ("b", None) => Ok(Command::Bookmarks),
            ("q", None) => Ok(Command::Quit),
            ("?", None) => Ok(Command::Help),
            ("s", Some(n)) => parse_number(n, "s <number>").map(Command::Toggle),
            ("i", Some(n)) => parse_number(n, "i <number>").map(Command::Info),
            ("f", Some("all" | "none")) => Ok(Command::Filter(None)),
            ("f", Some(kind)) => kind.parse().map(|k| Command::Filter(Some(k))),
            ("o", Some(key)) => key.parse().map(Command::Sort),
            ("s", None) => Err(UploaderError::Input("usage: s <number>".into())),
            ("i", None) => Err(UploaderError::Input("usage: i <number>".into())),
            ("f", None) => Err(UploaderError::Input("usage: f <kind|all>".into())),
            ("o", None) => Err(UploaderError::Input("usage: o <name|size|date>".into())),
            _ => Err(UploaderError::Input(format!(
                "unknown command '{line}', type ? for help"
            ))),
        }
    }
}

/// One line of input in the bookmark sub-loop.
#[derive(Debug, Clone, PartialEq)]
pub enum BookmarkCommand {
    /// `a`: bookmark the current directory.
    Add,
    /// `d <N>`
    Delete(usize),
    /// `g <N>`
    Go(usize),
    /// `q`: back to the explorer.
    Back,
}

impl FromStr for BookmarkCommand {
    type Err = UploaderError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim().to_lowercase();
        let (head, arg) = match line.split_once(char::is_whitespace) {
            Some((head, arg)) => (head, Some(arg.trim())),
            None => (line.as_str(), None),
        };
        match (head, arg) {
            ("a", None) => Ok(BookmarkCommand::Add),
            ("q", None) => Ok(BookmarkCommand::Back),
            ("d", Some(n)) => parse_number(n, "d <number>").map(BookmarkCommand::Delete),
            ("g", Some(n)) => parse_number(n, "g <number>").map(BookmarkCommand::Go),
            _ => Err(UploaderError::Input(format!(
                "unknown bookmark command '{line}' (a, d <N>, g <N>, q)"
            ))),
        }
    }
}

/// What `Session::open` did.
#[derive(Debug, Clone, PartialEq)]
pub enum Opened {
    Entered(PathBuf),
    Toggled(Toggle, String),
}

#[derive(Debug)]
pub struct Session {
    pub view: ViewState,
    pub selection: SelectionSet,
    pub bookmarks: BookmarkStore,
    home: PathBuf,
    listing: Vec<FileSystemEntry>,
    access_denied: bool,
}

impl Session {
    /// Start in `start`, resolved to a canonical path so the parent row and
    /// bookmarks never carry `..` parts. An unreadable start directory is
    /// not fatal: the session starts with an empty listing.
    pub fn new(start: &Path, home: PathBuf) -> Self {
        let start = fs::canonicalize(start)
            .or_else(|_| std::path::absolute(start))
            .unwrap_or_else(|_| start.to_path_buf());
        let mut session = Session {
            view: ViewState::new(start),
            selection: SelectionSet::new(),
            bookmarks: BookmarkStore::new(),
            home,
            listing: Vec::new(),
            access_denied: false,
        };
        if let Err(err) = session.refresh() {
            tracing::warn!("cannot list start directory: {err}");
        }
        session
    }

    /// Re-read the current directory with the current view.
    pub fn refresh(&mut self) -> UploaderResult<()> {
        let result = scan(&self.view);
        self.access_denied = matches!(result, Err(UploaderError::AccessDenied(_)));
        let outcome = match result {
            Ok(entries) => {
                self.listing = entries;
                Ok(())
            }
            Err(err) => {
                self.listing.clear();
                Err(err)
            }
        };
        self.view.clamp_page(self.listing.len());
        outcome
    }

    /// The full filtered and sorted listing (all pages).
    pub fn listing(&self) -> &[FileSystemEntry] {
        &self.listing
    }

    pub fn page(&self) -> Page<'_> {
        paginate(&self.listing, self.view.page_index)
    }

    /// True when the last scan failed because the directory is unreadable.
    pub fn access_denied(&self) -> bool {
        self.access_denied
    }

    pub fn current_path(&self) -> &Path {
        &self.view.current_path
    }

    /// Entry with the displayed `number`. Numbers are positions in the
    /// whole listing, but only those on the current page are accepted.
    pub fn visible(&self, number: usize) -> UploaderResult<&FileSystemEntry> {
        let page = self.page();
        let first = page.start + 1;
        let last = page.start + page.entries.len();
        if number < first || number > last {
            return Err(UploaderError::IndexOutOfRange {
                index: number,
                first,
                last,
            });
        }
        let entries = page.entries;
        Ok(&entries[number - first])
    }

    /// Change directory. If the new directory cannot be listed the session
    /// stays where it was and the error is returned.
    pub fn navigate(&mut self, path: &Path) -> UploaderResult<()> {
        let mut next = self.view.clone();
        next.navigate(path);
        let entries = scan(&next)?;
        tracing::debug!("entered {}", path.display());
        self.view = next;
        self.listing = entries;
        self.access_denied = false;
        Ok(())
    }

    pub fn go_home(&mut self) -> UploaderResult<()> {
        let home = self.home.clone();
        self.navigate(&home)
    }

    pub fn open(&mut self, number: usize) -> UploaderResult<Opened> {
        let entry = self.visible(number)?.clone();
        match entry.kind {
            EntryKind::Parent | EntryKind::Folder => {
                self.navigate(&entry.path)?;
                Ok(Opened::Entered(entry.path))
            }
            EntryKind::File => {
                let toggled = self.selection.toggle(&entry)?;
                Ok(Opened::Toggled(toggled, entry.name))
            }
        }
    }

    pub fn toggle(&mut self, number: usize) -> UploaderResult<(Toggle, String)> {
        let entry = self.visible(number)?.clone();
        let toggled = self.selection.toggle(&entry)?;
        Ok((toggled, entry.name))
    }

    /// Select every file of the filtered listing, across all pages.
    pub fn select_all(&mut self) -> usize {
        self.selection.select_all_visible(&self.listing)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn next_page(&mut self) -> bool {
        self.view.next_page(self.listing.len())
    }

    pub fn prev_page(&mut self) -> bool {
        self.view.prev_page()
    }

    pub fn search(&mut self, query: &str) -> UploaderResult<()> {
        self.view.set_search(query);
        self.refresh()
    }

    pub fn filter(&mut self, filter: Option<FileClass>) -> UploaderResult<()> {
        self.view.set_filter(filter);
        self.refresh()
    }

    pub fn sort(&mut self, key: SortKey) -> UploaderResult<()> {
        self.view.sort_by(key);
        self.refresh()
    }

    /// The file with the displayed `number`, for the info screen.
    pub fn file_at(&self, number: usize) -> UploaderResult<&FileSystemEntry> {
        let entry = self.visible(number)?;
        if !entry.is_file() {
            return Err(UploaderError::Input(format!(
                "'{}' is not a file",
                entry.name
            )));
        }
        Ok(entry)
    }

    pub fn bookmark_here(&mut self, name: &str) {
        let here = self.view.current_path.clone();
        self.bookmarks.add(name, &here);
    }

    pub fn jump_to_bookmark(&mut self, number: usize) -> UploaderResult<()> {
        let path = self.bookmarks.jump(number)?.to_path_buf();
        self.navigate(&path)
    }
}
