use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use log::{debug, error, info};
use serde_json::Value;
use tokio::process::Command;

use crate::file_utils::FileManager;
use crate::language_utils;
use crate::subtitle_processor::strip_markup;

// @module: Subtitle stream listing and extraction through ffprobe/ffmpeg

/// One subtitle stream inside a video container
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleStream {
    /// Absolute stream index in the container
    pub index: usize,
    /// Language tag, `unknown` when absent
    pub language: String,
    /// Codec name reported by ffprobe
    pub codec: String,
    /// Title tag, `Subtitle {index}` when absent
    pub title: String,
}

impl SubtitleStream {
    /// Image-based codecs cannot be converted to SRT text
    pub fn is_bitmap(&self) -> bool {
        matches!(
            self.codec.as_str(),
            "hdmv_pgs_subtitle" | "dvd_subtitle" | "dvb_subtitle" | "xsub"
        )
    }

    pub fn is_english(&self) -> bool {
        let language = self.language.to_lowercase();
        if language == "english" || language_utils::language_codes_match(&language, "en") {
            return true;
        }
        self.title.to_lowercase().contains("english")
    }
}

/// Runs ffprobe and ffmpeg with a timeout
#[derive(Debug, Clone)]
pub struct SubtitleExtractor {
    probe_timeout: Duration,
    extract_timeout: Duration,
}

impl Default for SubtitleExtractor {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(60),
            extract_timeout: Duration::from_secs(120),
        }
    }
}

impl SubtitleExtractor {
    pub fn new(probe_timeout: Duration, extract_timeout: Duration) -> Self {
        Self {
            probe_timeout,
            extract_timeout,
        }
    }

    /// Fail early when ffmpeg is not installed
    pub async fn check_ffmpeg() -> Result<()> {
        Command::new("ffmpeg")
            .arg("-version")
            .output()
            .await
            .map(|_| ())
            .map_err(|_| anyhow!("ffmpeg is not installed. Please install ffmpeg to extract embedded subtitles."))
    }

    /// List subtitle streams in a video file
    pub async fn list_subtitle_streams<P: AsRef<Path>>(&self, video_path: P) -> Result<Vec<SubtitleStream>> {
        let video_path = video_path.as_ref();
        if !video_path.exists() {
            return Err(anyhow!("Video file not found: {:?}", video_path));
        }

        let ffprobe_future = Command::new("ffprobe")
            .args(["-v", "quiet", "-print_format", "json", "-show_streams", "-select_streams", "s"])
            .arg(video_path)
            .output();

        let output = tokio::select! {
            result = ffprobe_future => {
                result.context("Failed to execute ffprobe command")?
            },
            _ = tokio::time::sleep(self.probe_timeout) => {
                return Err(anyhow!("ffprobe command timed out after {} seconds", self.probe_timeout.as_secs()));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("ffprobe failed: {}", stderr);
            return Err(anyhow!("ffprobe command failed: {}", stderr));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let streams = parse_ffprobe_output(&stdout)?;
        debug!("Found {} subtitle streams in {}", streams.len(), video_path.display());
        Ok(streams)
    }

    /// Extract a text subtitle stream to SRT and strip its markup.
    ///
    /// Without `output_path` the file is written to `<video stem>_stream_<index>.srt`
    /// next to the video.
    pub async fn extract_stream<P: AsRef<Path>>(
        &self,
        video_path: P,
        stream: &SubtitleStream,
        output_path: Option<&Path>,
    ) -> Result<PathBuf> {
        let video_path = video_path.as_ref();

        if stream.is_bitmap() {
            return Err(anyhow!(
                "Subtitle stream {} ({}) is bitmap-based and cannot be converted to text SRT",
                stream.index,
                stream.codec
            ));
        }

        let output_path = output_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_output_path(video_path, stream.index));

        let ffmpeg_future = Command::new("ffmpeg")
            .arg("-y")
            .arg("-i")
            .arg(video_path)
            .args(["-map", &format!("0:{}", stream.index), "-c:s", "srt"])
            .arg(&output_path)
            .output();

        let result = tokio::select! {
            result = ffmpeg_future => {
                result.context("Failed to execute ffmpeg command for subtitle extraction")?
            },
            _ = tokio::time::sleep(self.extract_timeout) => {
                return Err(anyhow!("ffmpeg command timed out after {} seconds", self.extract_timeout.as_secs()));
            }
        };

        if !result.status.success() {
            let filtered = filter_ffmpeg_stderr(&String::from_utf8_lossy(&result.stderr));
            error!("Subtitle extraction failed: {}", filtered);
            return Err(anyhow!("ffmpeg extraction failed: {}", filtered));
        }

        let raw = std::fs::read(&output_path)
            .with_context(|| format!("Failed to read extracted subtitles: {}", output_path.display()))?;
        if raw.is_empty() {
            return Err(anyhow!("Extracted file is empty, no subtitles found in stream {}", stream.index));
        }

        let cleaned = strip_markup(&String::from_utf8_lossy(&raw));
        FileManager::write_atomic(&output_path, format!("{}\n", cleaned.trim_end()).as_bytes())
            .with_context(|| format!("Failed to clean extracted subtitles: {}", output_path.display()))?;

        info!("Extracted stream {} to {}", stream.index, output_path.display());
        Ok(output_path)
    }
}

/// `<dir>/<stem>_stream_<index>.srt`
pub fn default_output_path(video_path: &Path, index: usize) -> PathBuf {
    let stem = video_path.file_stem().unwrap_or_default().to_string_lossy();
    let name = format!("{}_stream_{}.srt", stem, index);
    match video_path.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

/// Parse the JSON printed by `ffprobe -print_format json -show_streams`
pub fn parse_ffprobe_output(json: &str) -> Result<Vec<SubtitleStream>> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }

    let value: Value = serde_json::from_str(json).context("Failed to parse ffprobe JSON output")?;
    let Some(streams) = value.get("streams").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    let parsed = streams
        .iter()
        .map(|stream| {
            let index = stream.get("index").and_then(Value::as_u64).unwrap_or(0) as usize;
            let tag = |name: &str| {
                stream
                    .get("tags")
                    .and_then(|t| t.get(name))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            };

            SubtitleStream {
                index,
                language: tag("language").unwrap_or_else(|| "unknown".to_string()),
                codec: stream
                    .get("codec_name")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string(),
                title: tag("title").unwrap_or_else(|| format!("Subtitle {}", index)),
            }
        })
        .collect();

    Ok(parsed)
}

/// First text-based English stream, if any
pub fn find_english_stream(streams: &[SubtitleStream]) -> Option<&SubtitleStream> {
    streams.iter().find(|s| s.is_english() && !s.is_bitmap())
}

/// Keep only meaningful ffmpeg error lines, dropping the banner and stream metadata
fn filter_ffmpeg_stderr(stderr: &str) -> String {
    const NOISE_PREFIXES: [&str; 12] = [
        "ffmpeg version",
        "built with",
        "configuration:",
        "lib",
        "Input #",
        "Metadata:",
        "Duration:",
        "Stream #",
        "Output #",
        "Stream mapping:",
        "Press [q]",
        "title",
    ];

    let meaningful: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !NOISE_PREFIXES.iter().any(|p| line.starts_with(p)))
        .collect();

    if meaningful.is_empty() {
        "unknown ffmpeg error (stderr was empty after filtering)".to_string()
    } else {
        meaningful.join("\n")
    }
}
