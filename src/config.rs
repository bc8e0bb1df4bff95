use crate::assembler::LayoutSettings;
use crate::error::Result;
use crate::parser::ParserSettings;
use crate::timeline::CuePolicy;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub timeline: TimelineConfig,
    pub layout: LayoutConfig,
    pub markup: MarkupConfig,
    pub video: VideoConfig,
    pub segments: SegmentsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TimelineConfig {
    pub cue_policy: CuePolicy,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LayoutConfig {
    pub default_width: f64, // seconds
    pub gap_unit: f64,      // seconds per `@gap=` unit
}

#[derive(Debug, Deserialize, Clone)]
pub struct MarkupConfig {
    pub wrapper: String,
    pub correct_marker: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VideoConfig {
    pub default_mime: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SegmentsConfig {
    pub extension: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            timeline: TimelineConfig {
                cue_policy: CuePolicy::Lenient,
            },
            layout: LayoutConfig {
                default_width: 0.1,
                gap_unit: 1.0,
            },
            markup: MarkupConfig {
                wrapper: "<p>{}</p>".to_string(),
                correct_marker: "*".to_string(),
            },
            video: VideoConfig {
                default_mime: "video/mp4".to_string(),
            },
            segments: SegmentsConfig {
                extension: "mp4".to_string(),
            },
        }
    }
}

impl AppConfig {
    pub fn load() -> std::result::Result<Self, config::ConfigError> {
        Self::load_from(None)
    }

    /// Defaults, then `quizcut.*` (or `file`), then `QUIZCUT__` env vars
    pub fn load_from(file: Option<&Path>) -> std::result::Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("timeline.cue_policy", "lenient")?
            .set_default("layout.default_width", 0.1)?
            .set_default("layout.gap_unit", 1.0)?
            .set_default("markup.wrapper", "<p>{}</p>")?
            .set_default("markup.correct_marker", "*")?
            .set_default("video.default_mime", "video/mp4")?
            .set_default("segments.extension", "mp4")?;

        builder = match file {
            Some(path) => builder.add_source(config::File::from(path)),
            None => builder.add_source(config::File::with_name("quizcut").required(false)),
        };

        // e.g. QUIZCUT__LAYOUT__DEFAULT_WIDTH=0.5
        builder
            .add_source(config::Environment::with_prefix("QUIZCUT").separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn parser_settings(&self) -> Result<ParserSettings> {
        let mut marker = self.markup.correct_marker.trim().chars();
        let correct_marker = match (marker.next(), marker.next()) {
            (Some(c), None) => c,
            _ => {
                return Err(config::ConfigError::Message(format!(
                    "markup.correct_marker must be a single character, got '{}'",
                    self.markup.correct_marker
                ))
                .into())
            }
        };

        if !self.layout.gap_unit.is_finite() || self.layout.gap_unit <= 0.0 {
            return Err(
                config::ConfigError::Message("layout.gap_unit must be positive".to_string()).into(),
            );
        }

        Ok(ParserSettings {
            gap_unit: self.layout.gap_unit,
            correct_marker,
        })
    }

    pub fn layout_settings(&self) -> Result<LayoutSettings> {
        if !self.layout.default_width.is_finite() || self.layout.default_width < 0.0 {
            return Err(config::ConfigError::Message(
                "layout.default_width must be non-negative".to_string(),
            )
            .into());
        }
        if !self.markup.wrapper.contains("{}") {
            return Err(config::ConfigError::Message(format!(
                "markup.wrapper must contain '{{}}', got '{}'",
                self.markup.wrapper
            ))
            .into());
        }

        Ok(LayoutSettings {
            default_width: self.layout.default_width,
            markup: self.markup.wrapper.clone(),
        })
    }
}
