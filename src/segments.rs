use crate::bank::VideoSegment;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use symphonia::core::codecs::{CodecParameters, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default, rename = "segment")]
    segments: Vec<VideoSegment>,
}

/// Loads the ordered segment list the timeline consumes
pub struct SegmentSource;

impl SegmentSource {
    /// Directories are scanned for `extension` files, anything else is read as a manifest
    pub fn load(path: &Path, extension: &str) -> Result<Vec<VideoSegment>> {
        if path.is_dir() {
            Self::scan_dir(path, extension)
        } else {
            Self::from_manifest(path)
        }
    }

    /// Read `[[segment]]` entries from a TOML manifest
    pub fn from_manifest(path: &Path) -> Result<Vec<VideoSegment>> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read segment manifest: {}", path.display()))?;
        let segments = Self::parse_manifest(&content)
            .with_context(|| format!("Invalid segment manifest: {}", path.display()))?;
        Ok(segments)
    }

    pub fn parse_manifest(content: &str) -> Result<Vec<VideoSegment>> {
        let manifest: Manifest = toml::from_str(content)?;

        for segment in &manifest.segments {
            if segment.id.trim().is_empty() {
                anyhow::bail!("Segment with empty id");
            }
            if !segment.duration.is_finite() || segment.duration < 0.0 {
                anyhow::bail!(
                    "Segment '{}' duration must be non-negative, got {}",
                    segment.id,
                    segment.duration
                );
            }
        }

        Ok(manifest.segments)
    }

    /// Probe every matching file in `dir`, sorted by file name
    pub fn scan_dir(dir: &Path, extension: &str) -> Result<Vec<VideoSegment>> {
        let mut files = Self::list_files(dir, extension)?;
        files.sort();

        if files.is_empty() {
            log::warn!("no .{} files found in {}", extension, dir.display());
        }

        files
            .iter()
            .map(|path| -> Result<VideoSegment> {
                let id = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .with_context(|| format!("Non UTF-8 file name: {}", path.display()))?
                    .to_string();
                let duration = Self::probe_duration(path)?;
                log::debug!("segment '{}' lasts {:.3}s", id, duration);
                Ok(VideoSegment { id, duration })
            })
            .collect()
    }

    fn list_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read segment directory: {}", dir.display()))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let matches = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(extension));
            if path.is_file() && matches {
                files.push(path);
            }
        }
        Ok(files)
    }

    /// Length of the first track that reports one, decodable tracks first
    pub fn probe_duration(path: &Path) -> Result<f64> {
        let src = File::open(path)
            .with_context(|| format!("Failed to open segment: {}", path.display()))?;
        let mss = MediaSourceStream::new(Box::new(src), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let meta_opts: MetadataOptions = Default::default();
        let fmt_opts: FormatOptions = Default::default();

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &fmt_opts, &meta_opts)
            .with_context(|| format!("Unsupported media format: {}", path.display()))?;

        let tracks = probed.format.tracks();
        tracks
            .iter()
            .filter(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .chain(tracks.iter())
            .find_map(|t| track_seconds(&t.codec_params))
            .with_context(|| {
                format!(
                    "No track with a known length in {} (list video-only segments in a manifest)",
                    path.display()
                )
            })
    }
}

fn track_seconds(params: &CodecParameters) -> Option<f64> {
    let frames = params.n_frames?;
    if let Some(time_base) = params.time_base {
        let time = time_base.calc_time(frames);
        return Some(time.seconds as f64 + time.frac);
    }
    let sample_rate = params.sample_rate.filter(|r| *r > 0)?;
    Some(frames as f64 / sample_rate as f64)
}
