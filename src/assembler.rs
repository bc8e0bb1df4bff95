use crate::bank::{Question, QuestionKind, QuestionSet, VideoFile, Window};
use crate::error::{QuizcutError, Result};
use crate::templates::{SkeletonKind, TemplateRepository};
use serde::Serialize;
use serde_json::{json, Value};

/// Window sizing and text markup applied while assembling
#[derive(Debug, Clone)]
pub struct LayoutSettings {
    /// Window width in seconds for questions without a gap directive
    pub default_width: f64,
    /// Markup wrapper, `{}` is replaced by the text
    pub markup: String,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            default_width: 0.1,
            markup: "<p>{}</p>".to_string(),
        }
    }
}

/// A question placed on the playback timeline
#[derive(Debug, Clone, Serialize)]
pub struct Interaction {
    pub window: Window,
    pub label: String,
    pub payload: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContentDocument {
    pub interactions: Vec<Interaction>,
    pub video_file: VideoFile,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetadataDocument {
    pub title: String,
}

/// Turns scheduled question sets into skeleton-shaped documents
pub struct ContentAssembler<'r> {
    templates: &'r dyn TemplateRepository,
    settings: LayoutSettings,
}

impl<'r> ContentAssembler<'r> {
    /// Fails if any skeleton is missing or lacks an injected field
    pub fn new(templates: &'r dyn TemplateRepository, settings: LayoutSettings) -> Result<Self> {
        templates.validate()?;
        Ok(Self {
            templates,
            settings,
        })
    }

    /// Lay the set's questions end to end from its start time
    pub fn schedule(&self, set: &mut QuestionSet) -> Vec<Window> {
        let mut cursor = set.start_time;
        let windows = set
            .questions
            .iter()
            .map(|question| {
                let width = question.gap.unwrap_or(self.settings.default_width);
                let window = Window {
                    from: cursor,
                    to: cursor + width,
                };
                cursor = window.to;
                window
            })
            .collect();
        set.end_time = cursor;
        log::debug!(
            "'{}' scheduled {:.3}s - {:.3}s",
            set.video,
            set.start_time,
            set.end_time
        );
        windows
    }

    /// Schedule every set and collect interactions in set-then-question order
    pub fn assemble(&self, sets: &mut [QuestionSet], video_file: VideoFile) -> Result<ContentDocument> {
        let mut interactions = Vec::new();

        for set in sets.iter_mut() {
            let windows = self.schedule(set);
            for (question, window) in set.questions.iter().zip(windows) {
                interactions.push(Interaction {
                    window,
                    label: question.title.clone(),
                    payload: self.question_payload(question)?,
                });
            }
        }

        Ok(ContentDocument {
            interactions,
            video_file,
        })
    }

    /// Fill a fresh copy of the matching question skeleton
    pub fn question_payload(&self, question: &Question) -> Result<Value> {
        match &question.kind {
            QuestionKind::SingleChoice(choices) => {
                let kind = SkeletonKind::SingleChoice;
                let mut payload = self.skeleton(kind)?;

                // Correct answer first, the rest in authored order
                let answers: Vec<Value> = choices
                    .iter()
                    .filter(|c| c.correct)
                    .chain(choices.iter().filter(|c| !c.correct))
                    .map(|c| Value::String(self.wrap(&c.text)))
                    .collect();

                inject(&mut payload, kind, "/params/choices/0/question", json!(self.wrap(&question.title)))?;
                inject(&mut payload, kind, "/params/choices/0/answers", Value::Array(answers))?;
                inject(&mut payload, kind, "/metadata/title", json!(question.title))?;
                Ok(payload)
            }
            QuestionKind::MultipleChoice(choices) => {
                let kind = SkeletonKind::MultipleChoice;
                let mut payload = self.skeleton(kind)?;

                let answers: Vec<Value> = choices
                    .iter()
                    .map(|c| json!({ "text": c.text, "correct": c.correct }))
                    .collect();

                inject(&mut payload, kind, "/params/question", json!(self.wrap(&question.title)))?;
                inject(&mut payload, kind, "/params/answers", Value::Array(answers))?;
                inject(&mut payload, kind, "/metadata/title", json!(question.title))?;
                Ok(payload)
            }
        }
    }

    pub fn render_content(&self, document: &ContentDocument) -> Result<Value> {
        let mut interactions = Vec::with_capacity(document.interactions.len());
        for interaction in &document.interactions {
            let kind = SkeletonKind::Interaction;
            let mut wrapper = self.skeleton(kind)?;
            inject(&mut wrapper, kind, "/duration/from", json!(interaction.window.from))?;
            inject(&mut wrapper, kind, "/duration/to", json!(interaction.window.to))?;
            inject(&mut wrapper, kind, "/action", interaction.payload.clone())?;
            inject(&mut wrapper, kind, "/label", json!(interaction.label))?;
            interactions.push(wrapper);
        }

        let kind = SkeletonKind::Content;
        let mut root = self.skeleton(kind)?;
        let path = document.video_file.path.to_string_lossy().replace('\\', "/");
        inject(&mut root, kind, "/interactiveVideo/video/files/0/path", json!(path))?;
        inject(&mut root, kind, "/interactiveVideo/video/files/0/mime", json!(document.video_file.mime))?;
        inject(&mut root, kind, "/interactiveVideo/assets/interactions", Value::Array(interactions))?;
        Ok(root)
    }

    pub fn render_metadata(&self, metadata: &MetadataDocument) -> Result<Value> {
        let kind = SkeletonKind::Metadata;
        let mut root = self.skeleton(kind)?;
        inject(&mut root, kind, "/title", json!(metadata.title))?;
        Ok(root)
    }

    fn skeleton(&self, kind: SkeletonKind) -> Result<Value> {
        self.templates
            .skeleton(kind)
            .cloned()
            .ok_or_else(|| QuizcutError::template(kind, "not provided"))
    }

    fn wrap(&self, text: &str) -> String {
        self.settings.markup.replace("{}", text)
    }
}

fn inject(document: &mut Value, kind: SkeletonKind, path: &str, value: Value) -> Result<()> {
    let slot = document
        .pointer_mut(path)
        .ok_or_else(|| QuizcutError::template(kind, format!("no field at {}", path)))?;
    *slot = value;
    Ok(())
}
