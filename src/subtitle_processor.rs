use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::ParseError;
use crate::file_utils::FileManager;

// @module: Subtitle document model (SRT parsing, cleaning and serialization)

// @const: SRT timing line, `,` or `.` before the milliseconds
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,3}):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d{1,3}):(\d{2}):(\d{2})[,.](\d{3})")
        .expect("timestamp regex is valid")
});

static FONT_OPEN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<font[^>]*>").expect("font regex is valid"));
static FONT_CLOSE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</font>").expect("font close regex is valid"));
static HTML_TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]+>").expect("tag regex is valid"));
static ASS_BLOCK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\\[^}]+\}").expect("ASS override regex is valid"));

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

// Windows-1252 mappings for 0x80..=0x9F; `None` marks the five undefined bytes
const CP1252_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'), None, Some('\u{201A}'), Some('\u{0192}'),
    Some('\u{201E}'), Some('\u{2026}'), Some('\u{2020}'), Some('\u{2021}'),
    Some('\u{02C6}'), Some('\u{2030}'), Some('\u{0160}'), Some('\u{2039}'),
    Some('\u{0152}'), None, Some('\u{017D}'), None,
    None, Some('\u{2018}'), Some('\u{2019}'), Some('\u{201C}'),
    Some('\u{201D}'), Some('\u{2022}'), Some('\u{2013}'), Some('\u{2014}'),
    Some('\u{02DC}'), Some('\u{2122}'), Some('\u{0161}'), Some('\u{203A}'),
    Some('\u{0153}'), None, Some('\u{017E}'), Some('\u{0178}'),
];

/// Text encodings a subtitle file may be stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleEncoding {
    Utf8,
    Windows1252,
    Latin1,
}

impl SubtitleEncoding {
    /// Order in which encodings are attempted when loading a file
    pub const PRIORITY: [SubtitleEncoding; 3] = [
        SubtitleEncoding::Utf8,
        SubtitleEncoding::Windows1252,
        SubtitleEncoding::Latin1,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::Windows1252 => "Windows-1252",
            Self::Latin1 => "ISO-8859-1",
        }
    }

    /// Decode raw bytes into text
    pub fn decode(&self, bytes: &[u8]) -> Result<String, ParseError> {
        match self {
            Self::Utf8 => {
                let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                std::str::from_utf8(bytes)
                    .map(str::to_string)
                    .map_err(|_| ParseError::Decode(self.name()))
            }
            Self::Windows1252 => bytes
                .iter()
                .map(|&b| match b {
                    0x80..=0x9F => CP1252_HIGH[(b - 0x80) as usize],
                    _ => Some(b as char),
                })
                .collect::<Option<String>>()
                .ok_or(ParseError::Decode(self.name())),
            // Every byte maps to the code point of the same value
            Self::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

impl fmt::Display for SubtitleEncoding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

// @struct: Single subtitle entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    // @field: Sequence number
    pub seq_num: usize,

    // @field: Start time in ms
    pub start_time_ms: u64,

    // @field: End time in ms
    pub end_time_ms: u64,

    // @field: Subtitle text
    pub text: String,
}

impl SubtitleEntry {
    pub fn new(seq_num: usize, start_time_ms: u64, end_time_ms: u64, text: String) -> Self {
        SubtitleEntry {
            seq_num,
            start_time_ms,
            end_time_ms,
            text,
        }
    }

    /// Parse an SRT timestamp (`HH:MM:SS,mmm` or `HH:MM:SS.mmm`) to milliseconds
    pub fn parse_timestamp(timestamp: &str) -> Option<u64> {
        let parts: Vec<&str> = timestamp.trim().split(&[':', ',', '.'][..]).collect();
        if parts.len() != 4 {
            return None;
        }

        let hours: u64 = parts[0].parse().ok()?;
        let minutes: u64 = parts[1].parse().ok()?;
        let seconds: u64 = parts[2].parse().ok()?;
        let millis: u64 = parts[3].parse().ok()?;

        if minutes >= 60 || seconds >= 60 || millis >= 1000 {
            return None;
        }

        Some(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis)
    }

    /// Format a timestamp in milliseconds to SRT format (HH:MM:SS,mmm)
    pub fn format_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }

    pub fn format_start_time(&self) -> String {
        Self::format_timestamp(self.start_time_ms)
    }

    pub fn format_end_time(&self) -> String {
        Self::format_timestamp(self.end_time_ms)
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.seq_num)?;
        writeln!(f, "{} --> {}", self.format_start_time(), self.format_end_time())?;
        writeln!(f, "{}", self.text)?;
        writeln!(f)
    }
}

/// Ordered subtitle entries loaded from one file
#[derive(Debug, Clone)]
pub struct SubtitleDocument {
    /// File the entries were read from (empty when parsed from memory)
    pub source_file: PathBuf,

    /// Entries in file order, numbered 1..N
    pub entries: Vec<SubtitleEntry>,

    /// Encoding the source was decoded with
    pub encoding: SubtitleEncoding,
}

impl SubtitleDocument {
    pub fn new(source_file: PathBuf, entries: Vec<SubtitleEntry>, encoding: SubtitleEncoding) -> Self {
        SubtitleDocument {
            source_file,
            entries,
            encoding,
        }
    }

    /// Decode `bytes` with a single encoding and parse the SRT content
    pub fn parse(bytes: &[u8], encoding: SubtitleEncoding) -> Result<Self, ParseError> {
        let content = encoding.decode(bytes)?;
        let entries = parse_srt_string(&content)?;
        Ok(SubtitleDocument::new(PathBuf::new(), entries, encoding))
    }

    /// Load an `.srt` file, trying each supported encoding in priority order
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ParseError> {
        let path = path.as_ref();

        let is_srt = path
            .extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("srt"))
            .unwrap_or(false);
        if !is_srt {
            return Err(ParseError::WrongFileType(path.to_path_buf()));
        }

        let bytes = std::fs::read(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        for encoding in SubtitleEncoding::PRIORITY {
            match Self::parse(&bytes, encoding) {
                Ok(mut document) => {
                    debug!(
                        "Loaded {} entries from {} as {}",
                        document.entries.len(),
                        path.display(),
                        encoding
                    );
                    document.source_file = path.to_path_buf();
                    return Ok(document);
                }
                Err(e) => debug!("{} as {}: {}", path.display(), encoding, e),
            }
        }

        let tried = SubtitleEncoding::PRIORITY
            .iter()
            .map(|e| e.name())
            .collect::<Vec<_>>()
            .join(", ");
        Err(ParseError::UnsupportedEncoding { tried })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keep only the first `limit` entries; `None` or zero keeps everything
    pub fn truncate(&mut self, limit: Option<usize>) {
        if let Some(limit) = limit.filter(|&l| l > 0) {
            if limit < self.entries.len() {
                debug!("Limiting run to the first {} of {} entries", limit, self.entries.len());
                self.entries.truncate(limit);
            }
        }
    }

    /// Move every entry by `delta_ms`, clamping at zero
    pub fn shift(&mut self, delta_ms: i64) {
        let apply = |ms: u64| -> u64 {
            if delta_ms >= 0 {
                ms.saturating_add(delta_ms as u64)
            } else {
                ms.saturating_sub(delta_ms.unsigned_abs())
            }
        };

        for entry in &mut self.entries {
            entry.start_time_ms = apply(entry.start_time_ms);
            entry.end_time_ms = apply(entry.end_time_ms);
        }
    }

    /// Canonical SRT text, renumbered sequentially from 1
    pub fn to_srt_string(&self) -> String {
        let mut output = String::new();
        for (i, entry) in self.entries.iter().enumerate() {
            let renumbered = SubtitleEntry {
                seq_num: i + 1,
                ..entry.clone()
            };
            output.push_str(&renumbered.to_string());
        }
        output
    }

    pub fn serialize(&self) -> Vec<u8> {
        self.to_srt_string().into_bytes()
    }

    /// Write the document to `path`, replacing any existing file atomically
    pub fn write_to_srt<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        FileManager::write_atomic(path, &self.serialize())
    }
}

impl fmt::Display for SubtitleDocument {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Subtitle Document")?;
        writeln!(f, "Source: {:?}", self.source_file)?;
        writeln!(f, "Encoding: {}", self.encoding)?;
        writeln!(f, "Entries: {}", self.entries.len())?;
        Ok(())
    }
}

/// Parse SRT text into entries numbered 1..N in file order
pub fn parse_srt_string(content: &str) -> Result<Vec<SubtitleEntry>, ParseError> {
    let content = content.strip_prefix('\u{FEFF}').unwrap_or(content);
    let mut entries = Vec::new();
    let mut lines = content.lines().enumerate().peekable();

    while let Some((line_no, line)) = lines.next() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        // The index line is optional; the timing line is not
        let timing = if TIMESTAMP_REGEX.is_match(trimmed) {
            trimmed
        } else if trimmed.parse::<usize>().is_ok() {
            match lines.next() {
                Some((_, next)) => next.trim(),
                None => break,
            }
        } else {
            warn!("Unexpected text at line {}: {}", line_no + 1, trimmed);
            continue;
        };

        let Some(caps) = TIMESTAMP_REGEX.captures(timing) else {
            warn!("Missing timing line after line {}", line_no + 1);
            continue;
        };

        let mut text_lines = Vec::new();
        while let Some((_, next)) = lines.peek() {
            if next.trim().is_empty() {
                break;
            }
            text_lines.push(next.trim().to_string());
            lines.next();
        }

        let (Some(start_ms), Some(end_ms)) = (timestamp_from_caps(&caps, 1), timestamp_from_caps(&caps, 5)) else {
            warn!("Invalid timestamp at line {}: {}", line_no + 1, timing);
            continue;
        };

        if end_ms < start_ms {
            warn!("Skipping entry at line {}: end time precedes start time", line_no + 1);
            continue;
        }

        if text_lines.is_empty() {
            warn!("Skipping empty subtitle entry at line {}", line_no + 1);
            continue;
        }

        entries.push(SubtitleEntry::new(entries.len() + 1, start_ms, end_ms, text_lines.join("\n")));
    }

    if entries.is_empty() {
        return Err(ParseError::NoEntries);
    }

    Ok(entries)
}

fn timestamp_from_caps(caps: &regex::Captures, start_idx: usize) -> Option<u64> {
    let field = |i: usize| caps.get(start_idx + i).and_then(|m| m.as_str().parse::<u64>().ok());
    let (hours, minutes, seconds, millis) = (field(0)?, field(1)?, field(2)?, field(3)?);

    if minutes >= 60 || seconds >= 60 {
        return None;
    }

    Some((hours * 3600 + minutes * 60 + seconds) * 1000 + millis)
}

/// Remove markup from subtitle text and collapse all whitespace to single spaces
pub fn clean_subtitle_text(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let stripped = strip_tags_once(&current);
        if stripped == current {
            break;
        }
        current = stripped;
    }

    current.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove markup but keep line structure, used for freshly extracted streams
pub fn strip_markup(text: &str) -> String {
    text.lines()
        .map(|line| {
            let mut current = line.to_string();
            loop {
                let stripped = strip_tags_once(&current);
                if stripped == current {
                    break current.trim().to_string();
                }
                current = stripped;
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_tags_once(text: &str) -> String {
    let text = FONT_OPEN_REGEX.replace_all(text, "");
    let text = FONT_CLOSE_REGEX.replace_all(&text, "");
    let text = HTML_TAG_REGEX.replace_all(&text, "");
    ASS_BLOCK_REGEX.replace_all(&text, "").into_owned()
}
