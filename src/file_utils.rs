use anyhow::{Context, Result};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

// @module: File and directory utilities

// @const: SRT block signature used for content sniffing
static SRT_SIGNATURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d+\s*\r?\n\d{1,2}:\d{2}:\d{2}[,.]\d{3}\s+-->\s+\d{1,2}:\d{2}:\d{2}[,.]\d{3}")
        .expect("SRT signature regex is valid")
});

/// Extensions treated as video containers
pub const VIDEO_EXTENSIONS: [&str; 14] = [
    "mp4", "mkv", "avi", "mov", "wmv", "flv", "webm", "m4v", "mpg", "mpeg", "ogv", "ts", "mts",
    "m2ts",
];

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    // @generates: `{dir}/{stem}.{code}.srt` next to the input file
    pub fn generate_output_path<P: AsRef<Path>>(input_file: P, language_code: &str) -> PathBuf {
        let input_file = input_file.as_ref();
        let stem = input_file.file_stem().unwrap_or_default().to_string_lossy();
        let output_filename = format!("{}.{}.srt", stem, language_code);

        match input_file.parent() {
            Some(parent) => parent.join(output_filename),
            None => PathBuf::from(output_filename),
        }
    }

    /// Whether a translation for `input_file` already exists under any known naming pattern
    pub fn check_existing_translation<P: AsRef<Path>>(input_file: P, language_code: &str) -> bool {
        let input_file = input_file.as_ref();
        let stem = input_file.file_stem().unwrap_or_default().to_string_lossy().to_string();
        let dir = input_file.parent().unwrap_or(Path::new("."));

        let candidates = [
            format!("{}.{}.srt", stem, language_code),
            format!("{}_{}.srt", stem, language_code),
            format!("{}.eng.{}.srt", stem, language_code),
        ];
        if candidates.iter().any(|name| dir.join(name).is_file()) {
            return true;
        }

        // Translations of extracted streams: `<stem>_stream_<n>.<code>.srt` or `<stem>_stream_<n>_<code>.srt`
        let stream_prefix = format!("{}_stream_", stem);
        let Ok(read_dir) = fs::read_dir(dir) else {
            return false;
        };
        read_dir.filter_map(|e| e.ok()).any(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            name.starts_with(&stream_prefix)
                && (name.ends_with(&format!(".{}.srt", language_code))
                    || name.ends_with(&format!("_{}.srt", language_code)))
        })
    }

    /// Find files with a specific extension in a directory
    pub fn find_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();
        let normalized_ext = extension.trim_start_matches('.');

        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() {
                if let Some(ext) = path.extension() {
                    if ext.to_string_lossy().eq_ignore_ascii_case(normalized_ext) {
                        result.push(path.to_path_buf());
                    }
                }
            }
        }

        result.sort();
        Ok(result)
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Replace `path` with `content` without ever exposing a partially written file.
    ///
    /// The bytes go to a temporary file in the destination directory which is then
    /// renamed over the target. A failed attempt is retried once.
    pub fn write_atomic<P: AsRef<Path>>(path: P, content: &[u8]) -> io::Result<()> {
        let path = path.as_ref();
        match Self::write_atomic_once(path, content) {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("Write to {} failed ({}), retrying once", path.display(), e);
                Self::write_atomic_once(path, content)
            }
        }
    }

    fn write_atomic_once(path: &Path, content: &[u8]) -> io::Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut temp = NamedTempFile::new_in(&dir)?;
        temp.write_all(content)?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| e.error)?;

        debug!("Wrote {} bytes to {}", content.len(), path.display());
        Ok(())
    }

    /// Copy a file from one location to another, ensuring the target directory exists
    pub fn copy_file<P1: AsRef<Path>, P2: AsRef<Path>>(from: P1, to: P2) -> Result<()> {
        let from = from.as_ref();
        let to = to.as_ref();

        if !from.exists() {
            return Err(anyhow::anyhow!("Source file does not exist: {:?}", from));
        }

        if let Some(parent) = to.parent() {
            Self::ensure_dir(parent)?;
        }

        fs::copy(from, to)?;

        Ok(())
    }

    /// Detect if a file is a subtitle file (SRT) or a video file
    pub fn detect_file_type<P: AsRef<Path>>(path: P) -> Result<FileType> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(anyhow::anyhow!("File does not exist: {:?}", path));
        }

        if let Some(ext) = path.extension() {
            let ext_str = ext.to_string_lossy().to_lowercase();

            if ext_str == "srt" {
                return Ok(FileType::Subtitle);
            }

            if VIDEO_EXTENSIONS.contains(&ext_str.as_str()) {
                return Ok(FileType::Video);
            }
        }

        // Fall back to examining file contents
        if let Ok(content) = fs::read(path) {
            let text = String::from_utf8_lossy(&content);
            if text.contains("-->") && SRT_SIGNATURE.is_match(&text) {
                return Ok(FileType::Subtitle);
            }
        }

        Ok(FileType::Unknown)
    }
}

/// Enum representing different file types
#[derive(Debug, PartialEq, Eq)]
pub enum FileType {
    /// Subtitle file (SRT)
    Subtitle,
    /// Video file handled through ffmpeg
    Video,
    /// Unknown file type
    Unknown,
}
