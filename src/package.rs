use crate::assembler::{ContentAssembler, LayoutSettings, MetadataDocument};
use crate::bank::{QuestionSet, VideoFile, VideoSegment};
use crate::config::AppConfig;
use crate::error::Result;
use crate::parser::{ParserSettings, QuestionBankParser};
use crate::templates::TemplateRepository;
use crate::timeline::{CuePolicy, Timeline};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Runs parse, schedule and render over one question bank
pub struct Generator<'r> {
    assembler: ContentAssembler<'r>,
    parser: ParserSettings,
    policy: CuePolicy,
    default_mime: String,
}

impl<'r> Generator<'r> {
    pub fn new(templates: &'r dyn TemplateRepository, config: &AppConfig) -> Result<Self> {
        Self::with_settings(
            templates,
            config.parser_settings()?,
            config.layout_settings()?,
            config.timeline.cue_policy,
            config.video.default_mime.clone(),
        )
    }

    pub fn with_settings(
        templates: &'r dyn TemplateRepository,
        parser: ParserSettings,
        layout: LayoutSettings,
        policy: CuePolicy,
        default_mime: String,
    ) -> Result<Self> {
        Ok(Self {
            assembler: ContentAssembler::new(templates, layout)?,
            parser,
            policy,
            default_mime,
        })
    }

    /// Parse the bank and lay out every set, without rendering
    pub fn schedule(&self, bank: &str, segments: &[VideoSegment]) -> Result<Vec<QuestionSet>> {
        let mut sets = self.parse(bank, segments)?;
        for set in sets.iter_mut() {
            self.assembler.schedule(set);
        }
        Ok(sets)
    }

    pub fn build(
        &self,
        bank: &str,
        segments: &[VideoSegment],
        video: &Path,
        title: &str,
    ) -> Result<Package> {
        let mut sets = self.parse(bank, segments)?;
        let video_file = VideoFile::from_path(video, &self.default_mime);
        let document = self.assembler.assemble(&mut sets, video_file)?;

        let content = self.assembler.render_content(&document)?;
        let metadata = self.assembler.render_metadata(&MetadataDocument {
            title: title.to_string(),
        })?;

        Ok(Package {
            sets,
            interactions: document.interactions.len(),
            content,
            metadata,
        })
    }

    fn parse(&self, bank: &str, segments: &[VideoSegment]) -> Result<Vec<QuestionSet>> {
        let mut timeline = Timeline::new(segments, self.policy);
        let sets = QuestionBankParser::new(&mut timeline, self.parser.clone()).parse(bank)?;

        if !timeline.remaining().is_empty() {
            log::debug!(
                "{} segment(s) not referenced by any cue",
                timeline.remaining().len()
            );
        }
        Ok(sets)
    }
}

/// Fully rendered output, only ever constructed from a successful build
#[derive(Debug, Clone)]
pub struct Package {
    pub sets: Vec<QuestionSet>,
    pub interactions: usize,
    pub content: Value,
    pub metadata: Value,
}

impl Package {
    pub const METADATA_FILE: &'static str = "h5p.json";
    pub const CONTENT_FILE: &'static str = "content/content.json";

    /// Write `h5p.json` and `content/content.json` under `out_dir`.
    ///
    /// Either both files are written or neither is left behind.
    pub fn write(&self, out_dir: &Path) -> Result<Vec<PathBuf>> {
        let metadata_path = out_dir.join(Self::METADATA_FILE);
        let content_path = out_dir.join(Self::CONTENT_FILE);

        let metadata = serde_json::to_string_pretty(&self.metadata)?;
        let content = serde_json::to_string_pretty(&self.content)?;

        if let Some(parent) = content_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&content_path, content)?;
        if let Err(err) = std::fs::write(&metadata_path, metadata) {
            if let Err(cleanup) = std::fs::remove_file(&content_path) {
                log::warn!("could not remove {}: {}", content_path.display(), cleanup);
            }
            return Err(err.into());
        }

        Ok(vec![metadata_path, content_path])
    }
}
