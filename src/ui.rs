// UI layer: the interactive explorer loop. Reads one command per line
// with `dialoguer`, hands it to the session, and redraws the screen. The
// upload flow, the bookmark sub-loop and the file-info screen live here
// because they talk to the operator in between steps.

use anyhow::Result;
use chrono::Local;
use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::style::Stylize;
use crossterm::terminal::{Clear, ClearType};
use dialoguer::{Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::stdout;
use std::path::Path;

use crate::api::Transport;
use crate::catalog::{format_date, format_size, EntryKind, FileSystemEntry};
use crate::channels::{resolve_manual, Channel, ChannelResolver};
use crate::classify::FileClass;
use crate::config::{UploadConfig, UploadTypeMode};
use crate::error::{UploaderError, UploaderResult};
use crate::probe::probe_video;
use crate::selection::Toggle;
use crate::session::{BookmarkCommand, Command, Opened, Session};
use crate::upload::{BatchEvent, BatchSummary, UploadOrchestrator, UploadPhase};

const RULE: usize = 85;
/// Failed file names listed after a batch.
const SHOWN_FAILURES: usize = 3;
/// Selected files listed under the explorer.
const SHOWN_SELECTED: usize = 10;

enum Notice {
    Info(String),
    Error(String),
}

/// The running program: session state plus the collaborators needed for
/// uploads.
pub struct App<T: Transport> {
    session: Session,
    transport: T,
    config: UploadConfig,
    channels: ChannelResolver,
    uploads: UploadOrchestrator,
    notice: Option<Notice>,
}

impl<T: Transport> App<T> {
    pub fn new(transport: T, config: UploadConfig, session: Session) -> Self {
        App {
            session,
            transport,
            config,
            channels: ChannelResolver::new(),
            uploads: UploadOrchestrator::new(),
            notice: None,
        }
    }

    /// Main loop. Returns when the operator quits; terminal I/O errors
    /// are the only errors that end it.
    pub fn run(&mut self) -> Result<()> {
        loop {
            self.render()?;
            let line: String = Input::new()
                .with_prompt("💻 command")
                .allow_empty(true)
                .interact_text()?;
            if line.trim().is_empty() {
                continue;
            }
            let command = match line.parse::<Command>() {
                Ok(command) => command,
                Err(err) => {
                    self.fail(err);
                    continue;
                }
            };
            if command == Command::Quit {
                println!("{}", "👋 Bye!".cyan());
                return Ok(());
            }
            self.dispatch(command)?;
        }
    }

    fn dispatch(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Open(n) => match self.session.open(n) {
                Ok(Opened::Entered(_)) => {}
                Ok(Opened::Toggled(toggle, name)) => self.toggled(toggle, &name),
                Err(err) => self.fail(err),
            },
            Command::Toggle(n) => match self.session.toggle(n) {
                Ok((toggle, name)) => self.toggled(toggle, &name),
                Err(err) => self.fail(err),
            },
            Command::SelectAll => {
                let count = self.session.select_all();
                self.info(format!("✅ selected {count} file(s)"));
            }
            Command::Clear => {
                self.session.clear_selection();
                self.info("✅ selection cleared");
            }
            Command::Refresh => {
                let result = self.session.refresh();
                self.report(result);
            }
            Command::Home => {
                let result = self.session.go_home();
                self.report(result);
            }
            Command::NextPage => {
                if !self.session.next_page() {
                    self.info("already on the last page");
                }
            }
            Command::PrevPage => {
                if !self.session.prev_page() {
                    self.info("already on the first page");
                }
            }
            Command::Search(query) => {
                let result = self.session.search(&query);
                if self.report(result).is_some() && !query.is_empty() {
                    self.info(format!("🔍 searching for '{query}'"));
                }
            }
            Command::Filter(filter) => {
                let result = self.session.filter(filter);
                if self.report(result).is_some() {
                    match filter {
                        Some(class) => self.info(format!("🎯 showing {class} files")),
                        None => self.info("🎯 filter cleared"),
                    }
                }
            }
            Command::Sort(key) => {
                let result = self.session.sort(key);
                if self.report(result).is_some() {
                    let direction = if self.session.view.sort_descending {
                        "descending"
                    } else {
                        "ascending"
                    };
                    self.info(format!("📊 sorted by {key} ({direction})"));
                }
            }
            Command::Upload => self.upload_flow()?,
            Command::Bookmarks => self.bookmark_loop()?,
            Command::Info(n) => self.file_info(n)?,
            Command::Help => {
                clear_screen()?;
                print_help();
                pause()?;
            }
            Command::Quit => {}
        }
        Ok(())
    }

    fn toggled(&mut self, toggle: Toggle, name: &str) {
        match toggle {
            Toggle::Added => self.info(format!("➕ selected {name}")),
            Toggle::Removed => self.info(format!("➖ deselected {name}")),
        }
    }

    fn info(&mut self, message: impl Into<String>) {
        self.notice = Some(Notice::Info(message.into()));
    }

    fn fail(&mut self, err: UploaderError) {
        match &err {
            UploaderError::Input(_) | UploaderError::IndexOutOfRange { .. } => {
                tracing::debug!("{err}")
            }
            _ => tracing::warn!("{err}"),
        }
        self.notice = Some(Notice::Error(err.to_string()));
    }

    fn report<V>(&mut self, result: UploaderResult<V>) -> Option<V> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.fail(err);
                None
            }
        }
    }

    // ── explorer screen ─────────────────────────────────────────────────

    fn render(&mut self) -> Result<()> {
        print_header("Telegram Uploader - interactive explorer")?;
        println!(
            "{}",
            format!("📍 {}", display_path(self.session.current_path())).blue()
        );
        println!("{}", "-".repeat(RULE).blue());
        self.print_status_bar();

        if self.session.access_denied() {
            println!("{}", "❌ access denied: this folder cannot be read".red());
        } else if self.session.listing().is_empty() {
            println!("{}", "📭 nothing to show here".yellow());
        } else {
            self.print_listing();
        }

        if !self.session.selection.is_empty() {
            self.print_selection();
        }
        match self.notice.take() {
            Some(Notice::Info(message)) => println!("{}", message.green()),
            Some(Notice::Error(message)) => println!("{}", format!("❌ {message}").red()),
            None => {}
        }
        println!("{}", "type ? for the list of commands".dark_grey());
        Ok(())
    }

    fn print_status_bar(&self) {
        let view = &self.session.view;
        let selection = &self.session.selection;
        let mut status = format!(
            "📊 selected: {} file(s) ({}) | 🕒 {} | sort: {}{}",
            selection.len(),
            format_size(selection.total_size()),
            Local::now().format("%H:%M:%S"),
            view.sort_key,
            if view.sort_descending { " ↓" } else { " ↑" },
        );
        if !view.search_query.is_empty() {
            status.push_str(&format!(" | 🔍 '{}'", view.search_query));
        }
        if let Some(filter) = view.filter {
            status.push_str(&format!(" | 🎯 {filter}"));
        }
        println!("{}", status.green());
        println!("{}", "-".repeat(RULE).blue());
    }

    fn print_listing(&self) {
        let page = self.session.page();
        println!(
            "{}",
            format!(
                "📋 page {} of {}",
                page.page_index + 1,
                page.total_pages
            )
            .cyan()
        );
        println!(
            "{:>3}  {:<2} {:<30} {:>10} {:>16} {:>4}",
            "#", "", "name", "size", "modified", "sel"
        );
        println!("{}", "-".repeat(RULE).blue());
        for (offset, entry) in page.entries.iter().enumerate() {
            let selected = if self.session.selection.contains(&entry.path) {
                "✅"
            } else {
                ""
            };
            let size = match entry.kind {
                EntryKind::Parent => String::new(),
                _ => format_size(entry.size_bytes),
            };
            println!(
                "{:>3}  {:<2} {:<30} {:>10} {:>16} {:>4}",
                page.start + offset + 1,
                entry.icon(),
                truncate(&entry.name, 28),
                size,
                format_date(&entry.modified_at),
                selected
            );
        }
        println!("{}", "=".repeat(RULE).blue());

        let listing = self.session.listing();
        let folders = listing.iter().filter(|e| e.kind == EntryKind::Folder).count();
        let files = listing.iter().filter(|e| e.is_file()).count();
        println!(
            "{}",
            format!("{folders} folder(s), {files} file(s)").green()
        );
        if page.total_pages > 1 {
            println!("{}", "📄 'n' next page, 'p' previous page".cyan());
        }
    }

    fn print_selection(&self) {
        let selection = &self.session.selection;
        println!(
            "\n{}",
            format!(
                "📋 selected files ({} - {}):",
                selection.len(),
                format_size(selection.total_size())
            )
            .cyan()
        );
        for (i, entry) in selection.entries().iter().take(SHOWN_SELECTED).enumerate() {
            println!(
                "{:2}. {} {} [{}]",
                i + 1,
                entry.icon(),
                truncate(&entry.name, 35),
                format_size(entry.size_bytes)
            );
        }
        if selection.len() > SHOWN_SELECTED {
            println!("    ... and {} more", selection.len() - SHOWN_SELECTED);
        }
    }

    // ── upload flow ─────────────────────────────────────────────────────

    fn upload_flow(&mut self) -> Result<()> {
        if self.session.selection.is_empty() {
            self.fail(UploaderError::EmptySelection);
            return Ok(());
        }
        print_header("Upload selected files")?;
        self.print_selection();

        let destination = self.choose_destination()?;
        if let Err(err) = self.uploads.begin(&self.session.selection, destination.clone()) {
            self.fail(err);
            return Ok(());
        }
        if let Some(channel) = &destination {
            println!("{}", format!("✅ destination: {}", channel.label()).green());
        }
        let mode = match self.config.upload_type {
            UploadTypeMode::Auto => "as video or document depending on type and size",
            UploadTypeMode::ForceVideo => "as videos",
            UploadTypeMode::ForceDocument => "as documents",
        };
        println!("{}", format!("📤 files will be sent {mode}").cyan());

        let count = self.session.selection.len();
        let accepted = Confirm::new()
            .with_prompt(format!("🚀 upload {count} file(s)?"))
            .default(false)
            .interact()?;
        if self.uploads.confirm(accepted)? == UploadPhase::Idle {
            self.info("upload cancelled");
            return Ok(());
        }

        let bar = ProgressBar::new(count as u64);
        bar.set_style(
            ProgressStyle::with_template("{bar:30.green/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        let summary = self.uploads.run(&self.transport, &self.config, |event| match event {
            BatchEvent::Started { index, total, entry } => bar.set_message(format!(
                "📤 [{index}/{total}] {} ({})",
                entry.name,
                format_size(entry.size_bytes)
            )),
            BatchEvent::Finished { record, .. } => {
                match &record.error_message {
                    None => bar.println(format!("✅ {}", record.filename).green().to_string()),
                    Some(err) => bar.println(format!("❌ {err}").red().to_string()),
                }
                bar.inc(1);
            }
            BatchEvent::Waiting { seconds } => bar.set_message(format!("⏳ waiting {seconds}s")),
        })?;
        bar.finish_and_clear();
        print_summary(&summary);

        let clear = Confirm::new()
            .with_prompt("🧹 clear the selection?")
            .default(summary.failed.is_empty())
            .interact()?;
        if clear {
            self.session.clear_selection();
        }
        Ok(())
    }

    /// Pick a destination from the discovered channels, or type one in.
    /// `None` means the operator backed out.
    fn choose_destination(&mut self) -> Result<Option<Channel>> {
        loop {
            let channels = self.channels.candidates(&self.transport).to_vec();
            if channels.is_empty() {
                println!("{}", "❌ no chats found where the bot is an admin".red());
                println!(
                    "{}",
                    "💡 add the bot as admin and post something there, or enter a chat id".cyan()
                );
                match self.manual_destination(true)? {
                    ManualEntry::Chosen(channel) => return Ok(Some(channel)),
                    ManualEntry::Cancelled => return Ok(None),
                    ManualEntry::Rescan => {
                        self.channels.refresh(&self.transport);
                        continue;
                    }
                }
            }

            if let Some(bot) = self.channels.bot() {
                let name = bot.username.as_deref().unwrap_or(&bot.first_name);
                println!("{}", format!("🤖 posting as @{name}").cyan());
            }
            let mut items: Vec<String> = channels.iter().map(Channel::label).collect();
            items.push("✏️  enter a chat id or @username".to_string());
            items.push("🔄 refresh the list".to_string());
            let choice = Select::new()
                .with_prompt("📺 destination (Esc to cancel)")
                .items(&items)
                .default(0)
                .interact_opt()?;
            match choice {
                None => return Ok(None),
                Some(i) if i < channels.len() => return Ok(Some(channels[i].clone())),
                Some(i) if i == channels.len() => match self.manual_destination(false)? {
                    ManualEntry::Chosen(channel) => return Ok(Some(channel)),
                    ManualEntry::Cancelled | ManualEntry::Rescan => continue,
                },
                Some(_) => {
                    self.channels.refresh(&self.transport);
                }
            }
        }
    }

    fn manual_destination(&self, offer_rescan: bool) -> Result<ManualEntry> {
        let prompt = if offer_rescan {
            "📺 chat id (@username or number), 'r' to rescan, empty to cancel"
        } else {
            "📺 chat id (@username or number), empty to go back"
        };
        loop {
            let raw: String = Input::new()
                .with_prompt(prompt)
                .allow_empty(true)
                .interact_text()?;
            let raw = raw.trim();
            if raw.is_empty() {
                return Ok(ManualEntry::Cancelled);
            }
            if offer_rescan && raw.eq_ignore_ascii_case("r") {
                return Ok(ManualEntry::Rescan);
            }
            match resolve_manual(raw) {
                Ok(channel) => return Ok(ManualEntry::Chosen(channel)),
                Err(err) => println!("{}", format!("❌ {err}").red()),
            }
        }
    }

    // ── bookmarks ───────────────────────────────────────────────────────

    fn bookmark_loop(&mut self) -> Result<()> {
        loop {
            print_header("Bookmarks")?;
            if self.session.bookmarks.is_empty() {
                println!("{}", "📭 no bookmarks yet".yellow());
            } else {
                for (i, bookmark) in self.session.bookmarks.iter().enumerate() {
                    println!(
                        "{:2}. {} - {}",
                        i + 1,
                        bookmark.name,
                        truncate(&display_path(&bookmark.path), 45)
                    );
                }
            }
            println!("{}", "-".repeat(60).blue());
            println!("a: bookmark this folder   d <N>: delete   g <N>: go   q: back");
            if let Some(Notice::Error(message)) = self.notice.take() {
                println!("{}", format!("❌ {message}").red());
            }

            let line: String = Input::new()
                .with_prompt("📌 bookmarks")
                .allow_empty(true)
                .interact_text()?;
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<BookmarkCommand>() {
                Ok(BookmarkCommand::Back) => return Ok(()),
                Ok(BookmarkCommand::Add) => {
                    let name: String = Input::new()
                        .with_prompt("📌 name")
                        .allow_empty(true)
                        .interact_text()?;
                    let name = name.trim();
                    if !name.is_empty() {
                        self.session.bookmark_here(name);
                        tracing::info!("bookmarked {}", self.session.current_path().display());
                    }
                }
                Ok(BookmarkCommand::Delete(n)) => {
                    if let Err(err) = self.session.bookmarks.remove(n) {
                        self.fail(err);
                    }
                }
                Ok(BookmarkCommand::Go(n)) => match self.session.jump_to_bookmark(n) {
                    Ok(()) => {
                        self.info("✅ jumped to bookmark");
                        return Ok(());
                    }
                    Err(err) => self.fail(err),
                },
                Err(err) => self.fail(err),
            }
        }
    }

    // ── file info ───────────────────────────────────────────────────────

    fn file_info(&mut self, number: usize) -> Result<()> {
        let entry = match self.session.file_at(number) {
            Ok(entry) => entry.clone(),
            Err(err) => {
                self.fail(err);
                return Ok(());
            }
        };
        print_header(&format!("File info: {}", entry.name))?;
        print_file_details(&entry);
        pause()
    }
}

enum ManualEntry {
    Chosen(Channel),
    Cancelled,
    Rescan,
}

fn print_file_details(entry: &FileSystemEntry) {
    let class = entry.class().unwrap_or(FileClass::Other);
    let label = |name: &str| format!("{name:<10}").cyan();
    println!("{} {}", label("name"), entry.name);
    println!("{} {}", label("path"), entry.path.display());
    println!("{} {}", label("size"), format_size(entry.size_bytes));
    println!(
        "{} {}",
        label("modified"),
        entry.modified_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!("{} {} {}", label("type"), class.icon(), class);

    if class == FileClass::Video {
        match probe_video(&entry.path) {
            Some(video) => {
                println!("{} {}x{}", label("frame"), video.width, video.height);
                println!("{} {}", label("duration"), video.duration_label());
            }
            None => println!("{}", "(video details unavailable)".dark_grey()),
        }
    }
}

fn print_summary(summary: &BatchSummary) {
    println!("{}", "=".repeat(60).blue());
    println!("{}", "🎉 upload finished".green());
    println!(
        "{}",
        format!(
            "✅ succeeded: {}/{}",
            summary.succeeded, summary.total_attempted
        )
        .green()
    );
    if !summary.failed.is_empty() {
        let shown: Vec<&str> = summary
            .failed
            .iter()
            .take(SHOWN_FAILURES)
            .map(String::as_str)
            .collect();
        println!("{}", format!("❌ failed: {}", shown.join(", ")).red());
        if summary.failed.len() > SHOWN_FAILURES {
            println!(
                "{}",
                format!("   ... and {} more", summary.failed.len() - SHOWN_FAILURES).red()
            );
        }
    }
}

fn print_help() {
    let commands = [
        ("<N>", "open folder / select file N"),
        ("s <N>", "toggle selection of file N"),
        ("a", "select every file in the current view"),
        ("c", "clear the selection"),
        ("u", "upload the selected files"),
        ("r", "refresh"),
        ("h", "go to the home folder"),
        ("n / p", "next / previous page"),
        ("/ <text>", "search by name ('/' alone clears)"),
        ("f <kind>", "filter: video, audio, image, document, archive, code, all"),
        ("o <key>", "sort by name, size or date (again to reverse)"),
        ("b", "manage bookmarks"),
        ("i <N>", "details of file N"),
        ("q", "quit"),
    ];
    println!("{}", "🔧 commands".cyan());
    println!("{}", "-".repeat(60).blue());
    for (command, description) in commands {
        println!("{} {description}", format!("{command:<10}:").green());
    }
    println!("{}", "-".repeat(60).blue());
}

fn print_header(title: &str) -> Result<()> {
    clear_screen()?;
    println!("{}", "=".repeat(RULE).magenta());
    println!("{}", format!("{:^width$}", format!("🚀 {title}"), width = RULE).magenta());
    println!("{}", "=".repeat(RULE).magenta());
    Ok(())
}

fn clear_screen() -> Result<()> {
    execute!(stdout(), Clear(ClearType::All), MoveTo(0, 0))?;
    Ok(())
}

fn pause() -> Result<()> {
    let _: String = Input::new()
        .with_prompt("⏎ press Enter to continue")
        .allow_empty(true)
        .interact_text()?;
    Ok(())
}

/// Show paths under the home directory as `~/...`.
fn display_path(path: &Path) -> String {
    match dirs::home_dir().and_then(|home| path.strip_prefix(home).ok().map(Path::to_path_buf)) {
        Some(rest) if rest.as_os_str().is_empty() => "~".to_string(),
        Some(rest) => format!("~/{}", rest.display()),
        None => path.display().to_string(),
    }
}

fn truncate(name: &str, max: usize) -> String {
    if name.chars().count() <= max {
        return name.to_string();
    }
    let kept: String = name.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_names_are_shortened_on_char_boundaries() {
        assert_eq!(truncate("short.txt", 28), "short.txt");
        assert_eq!(truncate("ééééééééé", 6), "ééé...");
    }

    #[test]
    fn paths_outside_home_are_shown_verbatim() {
        assert_eq!(display_path(Path::new("/definitely/not/home")), "/definitely/not/home");
    }
}
