// Upload orchestrator: runs one batch of selected files against one
// destination, strictly one file at a time, and keeps an append-only
// history of every attempt made during the session.
//
//   Idle --begin--> Confirming --confirm(yes)--> Running --run--> Completed
//                       \--confirm(no)--> Idle
//
// A per-file failure never stops the batch; only the preconditions checked
// by `begin` keep a batch from running.

use chrono::{DateTime, Local};
use std::fs::File;

use crate::api::{FileUpload, Transport};
use crate::catalog::{format_size, FileSystemEntry};
use crate::channels::Channel;
use crate::classify::{classify, FileClass};
use crate::config::{UploadConfig, UploadTypeMode, MAX_DOCUMENT_SIZE, MAX_VIDEO_SIZE};
use crate::error::{UploaderError, UploaderResult};
use crate::selection::SelectionSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Idle,
    Confirming,
    Running,
    Completed,
}

impl UploadPhase {
    fn name(self) -> &'static str {
        match self {
            UploadPhase::Idle => "idle",
            UploadPhase::Confirming => "confirming",
            UploadPhase::Running => "running",
            UploadPhase::Completed => "completed",
        }
    }
}

/// Which transport call a file goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Video,
    Document,
}

/// Outcome of one transfer attempt. Never changed once created.
#[derive(Debug, Clone)]
pub struct UploadRecord {
    pub filename: String,
    pub size_bytes: u64,
    pub destination_id: String,
    pub timestamp: DateTime<Local>,
    pub succeeded: bool,
    /// Set iff `succeeded` is false.
    pub error_message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub succeeded: usize,
    /// Names of the files that failed, in batch order.
    pub failed: Vec<String>,
    pub total_attempted: usize,
    pub records: Vec<UploadRecord>,
}

/// Progress notifications emitted while a batch runs.
#[derive(Debug)]
pub enum BatchEvent<'a> {
    Started {
        index: usize,
        total: usize,
        entry: &'a FileSystemEntry,
    },
    Finished {
        index: usize,
        total: usize,
        record: &'a UploadRecord,
    },
    Waiting {
        seconds: f64,
    },
}

#[derive(Debug)]
struct Batch {
    entries: Vec<FileSystemEntry>,
    destination: Channel,
}

#[derive(Debug)]
pub struct UploadOrchestrator {
    phase: UploadPhase,
    batch: Option<Batch>,
    history: Vec<UploadRecord>,
}

impl Default for UploadOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadOrchestrator {
    pub fn new() -> Self {
        UploadOrchestrator {
            phase: UploadPhase::Idle,
            batch: None,
            history: Vec::new(),
        }
    }

    pub fn phase(&self) -> UploadPhase {
        self.phase
    }

    /// Every record produced this session, oldest first.
    pub fn history(&self) -> &[UploadRecord] {
        &self.history
    }

    /// Snapshot the selection and destination and wait for confirmation.
    pub fn begin(
        &mut self,
        selection: &SelectionSet,
        destination: Option<Channel>,
    ) -> UploaderResult<()> {
        self.expect(&[UploadPhase::Idle, UploadPhase::Completed])?;
        if selection.is_empty() {
            return Err(UploaderError::EmptySelection);
        }
        let destination = destination.ok_or(UploaderError::NoDestination)?;
        self.batch = Some(Batch {
            entries: selection.entries().to_vec(),
            destination,
        });
        self.phase = UploadPhase::Confirming;
        Ok(())
    }

    /// Accepting moves to Running; declining drops the batch and returns
    /// to Idle.
    pub fn confirm(&mut self, accepted: bool) -> UploaderResult<UploadPhase> {
        self.expect(&[UploadPhase::Confirming])?;
        if accepted {
            self.phase = UploadPhase::Running;
        } else {
            self.batch = None;
            self.phase = UploadPhase::Idle;
        }
        Ok(self.phase)
    }

    /// Transfer every file of the confirmed batch, in selection order.
    pub fn run<T, F>(
        &mut self,
        transport: &T,
        config: &UploadConfig,
        mut on_event: F,
    ) -> UploaderResult<BatchSummary>
    where
        T: Transport + ?Sized,
        F: FnMut(BatchEvent<'_>),
    {
        self.expect(&[UploadPhase::Running])?;
        let batch = self.batch.take().ok_or(UploaderError::InvalidState {
            expected: "a confirmed batch",
            actual: self.phase.name(),
        })?;
        let total = batch.entries.len();
        tracing::info!(
            "uploading {total} file(s) to {} ({})",
            batch.destination.title,
            batch.destination.id
        );

        let mut records = Vec::with_capacity(total);
        for (i, entry) in batch.entries.iter().enumerate() {
            let index = i + 1;
            on_event(BatchEvent::Started { index, total, entry });

            let record = transfer(transport, entry, &batch.destination, config, index, total);
            on_event(BatchEvent::Finished {
                index,
                total,
                record: &record,
            });
            self.history.push(record.clone());
            records.push(record);

            if index < total && config.upload_delay_secs > 0.0 {
                on_event(BatchEvent::Waiting {
                    seconds: config.upload_delay_secs,
                });
                std::thread::sleep(config.inter_file_delay());
            }
        }

        self.phase = UploadPhase::Completed;
        let summary = summarize(records);
        tracing::info!(
            "batch finished: {}/{} succeeded",
            summary.succeeded,
            summary.total_attempted
        );
        Ok(summary)
    }

    fn expect(&self, allowed: &[UploadPhase]) -> UploaderResult<()> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(UploaderError::InvalidState {
                expected: allowed[0].name(),
                actual: self.phase.name(),
            })
        }
    }
}

fn summarize(records: Vec<UploadRecord>) -> BatchSummary {
    let failed: Vec<String> = records
        .iter()
        .filter(|r| !r.succeeded)
        .map(|r| r.filename.clone())
        .collect();
    BatchSummary {
        succeeded: records.len() - failed.len(),
        failed,
        total_attempted: records.len(),
        records,
    }
}

/// Pick the transport route for a file, or say why it cannot be sent.
pub fn choose_route(
    mode: UploadTypeMode,
    name: &str,
    extension: &str,
    size: u64,
) -> UploaderResult<Route> {
    let is_video = classify(extension) == FileClass::Video;
    let route = match mode {
        UploadTypeMode::ForceVideo if !is_video => {
            return Err(UploaderError::NotAVideo(name.to_string()))
        }
        UploadTypeMode::ForceVideo => Route::Video,
        UploadTypeMode::ForceDocument => Route::Document,
        UploadTypeMode::Auto if is_video && size <= MAX_VIDEO_SIZE => Route::Video,
        UploadTypeMode::Auto => Route::Document,
    };
    let limit = match route {
        Route::Video => MAX_VIDEO_SIZE,
        Route::Document => MAX_DOCUMENT_SIZE,
    };
    if size > limit {
        return Err(UploaderError::SizeLimit {
            name: name.to_string(),
            size,
            limit,
        });
    }
    Ok(route)
}

pub fn render_caption(template: &str, filename: &str, size: u64, index: usize, total: usize) -> String {
    let mut caption = template
        .replace("{filename}", filename)
        .replace("{size}", &format_size(size));
    caption.push_str(&format!("\n🔢 file {index} of {total}"));
    caption
}

/// Send one file and describe what happened. Errors never escape.
pub fn transfer<T: Transport + ?Sized>(
    transport: &T,
    entry: &FileSystemEntry,
    destination: &Channel,
    config: &UploadConfig,
    index: usize,
    total: usize,
) -> UploadRecord {
    let (size, outcome) = attempt(transport, entry, destination, config, index, total);
    let error_message = match outcome {
        Ok(message_id) => {
            tracing::info!(
                "[{index}/{total}] sent {} as message {message_id}",
                entry.name
            );
            None
        }
        Err(err) => {
            tracing::error!("[{index}/{total}] failed to upload {}: {err}", entry.name);
            Some(err.to_string())
        }
    };
    UploadRecord {
        filename: entry.name.clone(),
        size_bytes: size,
        destination_id: destination.id.to_string(),
        timestamp: Local::now(),
        succeeded: error_message.is_none(),
        error_message,
    }
}

/// Returns the size used for the attempt alongside the result, so the
/// record reflects the file as it was when sent.
fn attempt<T: Transport + ?Sized>(
    transport: &T,
    entry: &FileSystemEntry,
    destination: &Channel,
    config: &UploadConfig,
    index: usize,
    total: usize,
) -> (u64, UploaderResult<i64>) {
    let opened = File::open(&entry.path).and_then(|file| {
        let meta = file.metadata()?;
        Ok((file, meta))
    });
    let (file, meta) = match opened {
        Ok((file, meta)) if meta.is_file() => (file, meta),
        _ => {
            return (
                entry.size_bytes,
                Err(UploaderError::MissingFile(entry.name.clone())),
            )
        }
    };
    let size = meta.len();

    let extension = entry.extension.as_deref().unwrap_or_default();
    let route = match choose_route(config.upload_type, &entry.name, extension, size) {
        Ok(route) => route,
        Err(err) => return (size, Err(err)),
    };

    let caption = render_caption(&config.caption_template, &entry.name, size, index, total);
    let upload = FileUpload {
        file_name: entry.name.clone(),
        size,
        file,
    };
    let sent = match route {
        Route::Video => transport.send_video(&destination.id, upload, &caption),
        Route::Document => transport.send_document(&destination.id, upload, &caption),
    };
    (size, sent.map(|message| message.message_id).map_err(Into::into))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    #[test]
    fn auto_mode_routes_small_videos_as_video() {
        let route = choose_route(UploadTypeMode::Auto, "a.mp4", "mp4", 10 * MB).unwrap();
        assert_eq!(route, Route::Video);
        let route = choose_route(UploadTypeMode::Auto, "a.mp4", "mp4", MAX_VIDEO_SIZE + 1).unwrap();
        assert_eq!(route, Route::Document);
        let route = choose_route(UploadTypeMode::Auto, "a.pdf", "pdf", MB).unwrap();
        assert_eq!(route, Route::Document);
    }

    #[test]
    fn force_video_rejects_non_videos_and_large_videos() {
        assert!(matches!(
            choose_route(UploadTypeMode::ForceVideo, "a.pdf", "pdf", MB),
            Err(UploaderError::NotAVideo(_))
        ));
        assert!(matches!(
            choose_route(UploadTypeMode::ForceVideo, "a.mkv", "mkv", MAX_VIDEO_SIZE + 1),
            Err(UploaderError::SizeLimit { limit: MAX_VIDEO_SIZE, .. })
        ));
    }

    #[test]
    fn document_cap_applies_in_every_mode() {
        for mode in [UploadTypeMode::Auto, UploadTypeMode::ForceDocument] {
            assert!(matches!(
                choose_route(mode, "disk.iso", "iso", MAX_DOCUMENT_SIZE + 1),
                Err(UploaderError::SizeLimit { .. })
            ));
        }
        assert_eq!(
            choose_route(UploadTypeMode::ForceDocument, "a.mp4", "mp4", MB).unwrap(),
            Route::Document
        );
    }

    #[test]
    fn caption_substitutes_and_appends_progress() {
        let caption = render_caption("📦 {filename} [{size}]", "clip.mp4", 2048, 2, 5);
        assert_eq!(caption, "📦 clip.mp4 [2.0 KB]\n🔢 file 2 of 5");
    }

    #[test]
    fn phases_guard_transitions() {
        let mut orchestrator = UploadOrchestrator::new();
        assert!(matches!(
            orchestrator.confirm(true),
            Err(UploaderError::InvalidState { .. })
        ));
        assert!(matches!(
            orchestrator.begin(&SelectionSet::new(), None),
            Err(UploaderError::EmptySelection)
        ));
        assert_eq!(orchestrator.phase(), UploadPhase::Idle);
    }
}
