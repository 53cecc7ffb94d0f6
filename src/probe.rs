// Best-effort video details via an external `ffprobe`. Any failure (tool
// missing, unreadable file, odd output) simply means "no details".

use std::path::Path;
use std::process::Command;

#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub duration_secs: f64,
}

impl VideoInfo {
    /// `mm:ss`, minutes not wrapped at the hour.
    pub fn duration_label(&self) -> String {
        let total = self.duration_secs.max(0.0) as u64;
        format!("{:02}:{:02}", total / 60, total % 60)
    }
}

pub fn probe_video(path: &Path) -> Option<VideoInfo> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,duration",
            "-of",
            "csv=p=0",
        ])
        .arg(path)
        .output();
    match output {
        Ok(out) if out.status.success() => parse_probe_output(&String::from_utf8_lossy(&out.stdout)),
        Ok(out) => {
            tracing::debug!("ffprobe exited with {} for {}", out.status, path.display());
            None
        }
        Err(err) => {
            tracing::debug!("ffprobe unavailable: {err}");
            None
        }
    }
}

/// Parses `width,height,duration` as printed by `ffprobe -of csv=p=0`.
pub fn parse_probe_output(raw: &str) -> Option<VideoInfo> {
    let line = raw.lines().next()?.trim();
    let mut fields = line.split(',').map(str::trim);
    let width = fields.next()?.parse().ok()?;
    let height = fields.next()?.parse().ok()?;
    let duration_secs = fields.next()?.parse().ok()?;
    Some(VideoInfo {
        width,
        height,
        duration_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_csv_line() {
        let info = parse_probe_output("1920,1080,125.480000\n").unwrap();
        assert_eq!((info.width, info.height), (1920, 1080));
        assert_eq!(info.duration_label(), "02:05");
    }

    #[test]
    fn rejects_incomplete_output() {
        assert!(parse_probe_output("").is_none());
        assert!(parse_probe_output("1920,1080,N/A").is_none());
        assert!(parse_probe_output("1920").is_none());
    }
}
