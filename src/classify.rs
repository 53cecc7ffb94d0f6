// File classification: one table of extensions used by the catalog
// (icons, `f` filter) and by the upload orchestrator (video routing).

use std::fmt;
use std::str::FromStr;

use crate::error::UploaderError;

const VIDEO: &[&str] = &["mp4", "avi", "mkv", "mov", "wmv", "flv", "webm", "m4v", "3gp"];
const AUDIO: &[&str] = &["mp3", "wav", "flac", "aac", "ogg", "m4a", "wma"];
const IMAGE: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "svg", "ico"];
const DOCUMENT: &[&str] = &[
    "pdf", "doc", "docx", "txt", "rtf", "odt", "xls", "xlsx", "ppt", "pptx",
];
const ARCHIVE: &[&str] = &["zip", "rar", "7z", "tar", "gz", "bz2"];
const CODE: &[&str] = &["py", "js", "html", "css", "cpp", "c", "java", "php", "go", "rs"];

/// Broad content class of a file, derived from its extension only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileClass {
    Video,
    Audio,
    Image,
    Document,
    Archive,
    Code,
    Other,
}

/// Classify a lower-cased extension (without the leading dot).
pub fn classify(extension: &str) -> FileClass {
    let ext = extension.trim_start_matches('.');
    let tables = [
        (VIDEO, FileClass::Video),
        (AUDIO, FileClass::Audio),
        (IMAGE, FileClass::Image),
        (DOCUMENT, FileClass::Document),
        (ARCHIVE, FileClass::Archive),
        (CODE, FileClass::Code),
    ];
    tables
        .iter()
        .find(|(table, _)| table.contains(&ext))
        .map(|(_, class)| *class)
        .unwrap_or(FileClass::Other)
}

impl FileClass {
    /// Classes the operator can filter by (everything except `Other`).
    pub const FILTERABLE: [FileClass; 6] = [
        FileClass::Video,
        FileClass::Audio,
        FileClass::Image,
        FileClass::Document,
        FileClass::Archive,
        FileClass::Code,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FileClass::Video => "video",
            FileClass::Audio => "audio",
            FileClass::Image => "image",
            FileClass::Document => "document",
            FileClass::Archive => "archive",
            FileClass::Code => "code",
            FileClass::Other => "file",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            FileClass::Video => "🎬",
            FileClass::Audio => "🎵",
            FileClass::Image => "🖼️",
            FileClass::Archive => "📦",
            FileClass::Code => "💻",
            FileClass::Document | FileClass::Other => "📄",
        }
    }
}

impl fmt::Display for FileClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FileClass {
    type Err = UploaderError;

    /// Parses a filter name. `other` is not a filter.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        FileClass::FILTERABLE
            .into_iter()
            .find(|class| class.name() == wanted)
            .ok_or_else(|| {
                UploaderError::Input(format!(
                    "unknown filter '{}', use one of: video, audio, image, document, archive, code",
                    s.trim()
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_extensions() {
        assert_eq!(classify("mkv"), FileClass::Video);
        assert_eq!(classify(".flac"), FileClass::Audio);
        assert_eq!(classify("jpeg"), FileClass::Image);
        assert_eq!(classify("pptx"), FileClass::Document);
        assert_eq!(classify("7z"), FileClass::Archive);
        assert_eq!(classify("rs"), FileClass::Code);
    }

    #[test]
    fn unknown_and_empty_extensions_are_other() {
        assert_eq!(classify(""), FileClass::Other);
        assert_eq!(classify("iso"), FileClass::Other);
    }

    #[test]
    fn filter_names_parse_case_insensitively() {
        assert_eq!("Video".parse::<FileClass>().unwrap(), FileClass::Video);
        assert_eq!(" code ".parse::<FileClass>().unwrap(), FileClass::Code);
        assert!("other".parse::<FileClass>().is_err());
        assert!("movies".parse::<FileClass>().is_err());
    }
}
