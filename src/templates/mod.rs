use crate::error::{QuizcutError, Result};
use clap::ValueEnum;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

const SINGLE_CHOICE: &str = include_str!("skeletons/single_choice.json");
const MULTIPLE_CHOICE: &str = include_str!("skeletons/multiple_choice.json");
const INTERACTION: &str = include_str!("skeletons/interaction.json");
const CONTENT: &str = include_str!("skeletons/content.json");
const METADATA: &str = include_str!("skeletons/metadata.json");

/// The document shapes the assembler fills in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum SkeletonKind {
    SingleChoice,
    MultipleChoice,
    Interaction,
    Content,
    Metadata,
}

impl SkeletonKind {
    pub const ALL: [SkeletonKind; 5] = [
        SkeletonKind::SingleChoice,
        SkeletonKind::MultipleChoice,
        SkeletonKind::Interaction,
        SkeletonKind::Content,
        SkeletonKind::Metadata,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            SkeletonKind::SingleChoice => "single_choice.json",
            SkeletonKind::MultipleChoice => "multiple_choice.json",
            SkeletonKind::Interaction => "interaction.json",
            SkeletonKind::Content => "content.json",
            SkeletonKind::Metadata => "metadata.json",
        }
    }

    /// JSON pointers the assembler writes into
    pub fn injected_paths(self) -> &'static [&'static str] {
        match self {
            SkeletonKind::SingleChoice => &[
                "/params/choices/0/question",
                "/params/choices/0/answers",
                "/metadata/title",
            ],
            SkeletonKind::MultipleChoice => {
                &["/params/question", "/params/answers", "/metadata/title"]
            }
            SkeletonKind::Interaction => &["/duration/from", "/duration/to", "/action", "/label"],
            SkeletonKind::Content => &[
                "/interactiveVideo/video/files/0/path",
                "/interactiveVideo/video/files/0/mime",
                "/interactiveVideo/assets/interactions",
            ],
            SkeletonKind::Metadata => &["/title"],
        }
    }

    fn builtin_source(self) -> &'static str {
        match self {
            SkeletonKind::SingleChoice => SINGLE_CHOICE,
            SkeletonKind::MultipleChoice => MULTIPLE_CHOICE,
            SkeletonKind::Interaction => INTERACTION,
            SkeletonKind::Content => CONTENT,
            SkeletonKind::Metadata => METADATA,
        }
    }
}

impl fmt::Display for SkeletonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Same spelling the CLI accepts
        match self.to_possible_value() {
            Some(value) => f.write_str(value.get_name()),
            None => f.write_str(self.file_name().trim_end_matches(".json")),
        }
    }
}

/// Source of immutable skeleton documents
pub trait TemplateRepository {
    fn skeleton(&self, kind: SkeletonKind) -> Option<&Value>;

    /// Fails on the first skeleton that is absent or lacks an injected field
    fn validate(&self) -> Result<()> {
        for kind in SkeletonKind::ALL {
            let skeleton = self
                .skeleton(kind)
                .ok_or_else(|| QuizcutError::template(kind, "not provided"))?;
            for path in kind.injected_paths() {
                if skeleton.pointer(path).is_none() {
                    return Err(QuizcutError::template(kind, format!("no field at {}", path)));
                }
            }
        }
        Ok(())
    }
}

/// Skeletons keyed by kind, either builtin or loaded from a directory
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    skeletons: HashMap<SkeletonKind, Value>,
}

impl TemplateSet {
    pub fn builtin() -> Result<Self> {
        let mut skeletons = HashMap::new();
        for kind in SkeletonKind::ALL {
            skeletons.insert(kind, serde_json::from_str(kind.builtin_source())?);
        }
        Ok(Self { skeletons })
    }

    /// Load every `<kind>.json` present in `dir`; absent files stay missing
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut skeletons = HashMap::new();
        for kind in SkeletonKind::ALL {
            let path = dir.join(kind.file_name());
            if !path.exists() {
                log::debug!("no {} skeleton at {}", kind, path.display());
                continue;
            }
            let content = std::fs::read_to_string(&path)?;
            let skeleton = serde_json::from_str(&content).map_err(|e| {
                QuizcutError::template(kind, format!("{}: {}", path.display(), e))
            })?;
            skeletons.insert(kind, skeleton);
        }
        Ok(Self { skeletons })
    }

    /// Fill kinds missing from `self` with those of `fallback`
    pub fn with_fallback(mut self, fallback: TemplateSet) -> Self {
        for (kind, skeleton) in fallback.skeletons {
            self.skeletons.entry(kind).or_insert(skeleton);
        }
        self
    }

    pub fn insert(&mut self, kind: SkeletonKind, skeleton: Value) {
        self.skeletons.insert(kind, skeleton);
    }

    pub fn len(&self) -> usize {
        self.skeletons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skeletons.is_empty()
    }
}

impl TemplateRepository for TemplateSet {
    fn skeleton(&self, kind: SkeletonKind) -> Option<&Value> {
        self.skeletons.get(&kind)
    }
}
