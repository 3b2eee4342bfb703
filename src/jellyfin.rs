use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::app_config::JellyfinConfig;
use crate::file_utils::FileManager;
use crate::language_utils;

// @module: Jellyfin subtitle naming (`<video>.<lang>.<flags>.srt`)

static STREAM_SUFFIX_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_stream_\d+").expect("stream suffix regex is valid"));

const FLAG_TAGS: [&str; 3] = ["default", "forced", "sdh"];

/// Jellyfin subtitle flags, appended in this order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JellyfinFlags {
    pub default: bool,
    pub forced: bool,
    pub sdh: bool,
}

impl From<&JellyfinConfig> for JellyfinFlags {
    fn from(config: &JellyfinConfig) -> Self {
        Self {
            default: config.default,
            forced: config.forced,
            sdh: config.sdh,
        }
    }
}

/// Result of a rename pass
#[derive(Debug, Default)]
pub struct RenameReport {
    /// (old path, new path) for every copied file
    pub renamed: Vec<(PathBuf, PathBuf)>,
    /// Originals removed after a successful copy
    pub deleted: Vec<PathBuf>,
    /// (file, error message) for every file that could not be processed
    pub errors: Vec<(PathBuf, String)>,
}

pub struct JellyfinRenamer;

impl JellyfinRenamer {
    /// Two-letter code for a filename tag such as `eng`, `es` or `Spanish`
    fn tag_language(tag: &str) -> Option<String> {
        let lang = language_utils::resolve_language(tag)?;
        lang.to_639_1().map(str::to_string)
    }

    /// Whether `tag` reads as a language tag even without other suffix markers:
    /// a language name, or a 3-letter code in one case (`eng`, `SPA`, not `Run`)
    fn is_explicit_language_tag(tag: &str) -> bool {
        match tag.chars().count() {
            0..=2 => false,
            3 => tag == tag.to_lowercase() || tag == tag.to_uppercase(),
            _ => true,
        }
    }

    /// Split trailing flag and language tags off `stem`; returns the bare name and the last language found
    ///
    /// Two-letter tags are only stripped once a `_stream_N` suffix or a flag tag marks the
    /// name as generated, so titles ending in words like `It` keep their last word.
    fn split_tags(stem: &str) -> (String, Option<String>) {
        let stripped = STREAM_SUFFIX_REGEX.replace_all(stem, "");
        let mut marked = stripped.len() != stem.len();
        let mut base = stripped.to_string();
        let mut language = None;

        while let Some(pos) = base.rfind(['.', '_']) {
            let tag = &base[pos + 1..];
            if FLAG_TAGS.iter().any(|f| tag.eq_ignore_ascii_case(f)) {
                base.truncate(pos);
                marked = true;
                continue;
            }
            if !marked && !Self::is_explicit_language_tag(tag) {
                break;
            }
            match Self::tag_language(tag) {
                Some(code) => {
                    language.get_or_insert(code);
                    base.truncate(pos);
                }
                None => break,
            }
        }

        (base, language)
    }

    /// Jellyfin-compliant name for a subtitle file name
    pub fn generate_name(filename: &str, flags: &JellyfinFlags) -> String {
        let stem = Path::new(filename)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| filename.to_string());

        let (base, language) = Self::split_tags(&stem);

        let mut parts = vec![base];
        parts.extend(language);
        if flags.default {
            parts.push("default".to_string());
        }
        if flags.forced {
            parts.push("forced".to_string());
        }
        if flags.sdh {
            parts.push("sdh".to_string());
        }
        parts.push("srt".to_string());

        parts.join(".")
    }

    fn planned_changes(folder: &Path, flags: &JellyfinFlags) -> Result<Vec<(PathBuf, PathBuf)>> {
        let files = FileManager::find_files(folder, "srt")
            .with_context(|| format!("Failed to scan folder: {}", folder.display()))?;

        Ok(files
            .into_iter()
            .filter_map(|old_path| {
                let file_name = old_path.file_name()?.to_string_lossy().to_string();
                let new_name = Self::generate_name(&file_name, flags);
                if file_name.eq_ignore_ascii_case(&new_name) {
                    return None;
                }
                let new_path = old_path.with_file_name(new_name);
                Some((old_path, new_path))
            })
            .collect())
    }

    /// File names that `rename_subtitles` would change, without touching the disk
    pub fn preview_changes<P: AsRef<Path>>(folder: P, flags: &JellyfinFlags) -> Result<Vec<(String, String)>> {
        let changes = Self::planned_changes(folder.as_ref(), flags)?;
        Ok(changes
            .into_iter()
            .map(|(old, new)| {
                (
                    old.file_name().unwrap_or_default().to_string_lossy().to_string(),
                    new.file_name().unwrap_or_default().to_string_lossy().to_string(),
                )
            })
            .collect())
    }

    /// Copy every `.srt` under `folder` to its Jellyfin name, optionally removing the original
    pub fn rename_subtitles<P: AsRef<Path>>(folder: P, flags: &JellyfinFlags, cleanup_originals: bool) -> Result<RenameReport> {
        let mut report = RenameReport::default();

        for (old_path, new_path) in Self::planned_changes(folder.as_ref(), flags)? {
            match Self::rename_one(&old_path, &new_path, cleanup_originals) {
                Ok(deleted) => {
                    info!("Renamed: {} -> {}", old_path.display(), new_path.display());
                    if deleted {
                        report.deleted.push(old_path.clone());
                    }
                    report.renamed.push((old_path, new_path));
                }
                Err(e) => {
                    warn!("Error processing {}: {:#}", old_path.display(), e);
                    report.errors.push((old_path, format!("{:#}", e)));
                }
            }
        }

        Ok(report)
    }

    fn rename_one(old_path: &Path, new_path: &Path, cleanup_originals: bool) -> Result<bool> {
        if new_path.exists() {
            let mut backup = new_path.as_os_str().to_owned();
            backup.push(".bak");
            warn!("Target file already exists, creating backup: {}", new_path.display());
            fs::rename(new_path, &backup)
                .with_context(|| format!("Failed to back up {}", new_path.display()))?;
        }

        FileManager::copy_file(old_path, new_path)?;

        if cleanup_originals {
            fs::remove_file(old_path)
                .with_context(|| format!("Failed to delete original {}", old_path.display()))?;
            return Ok(true);
        }

        Ok(false)
    }
}
