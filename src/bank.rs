use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One source clip of the merged video, in processing order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSegment {
    pub id: String,
    pub duration: f64,
}

impl VideoSegment {
    pub fn new(id: impl Into<String>, duration: f64) -> Self {
        Self {
            id: id.into(),
            duration,
        }
    }
}

/// An answer option as authored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,
    pub correct: bool,
}

impl Choice {
    pub fn new(text: impl Into<String>, correct: bool) -> Self {
        Self {
            text: text.into(),
            correct,
        }
    }
}

/// Question type, resolved from the number of correct choices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "choices", rename_all = "snake_case")]
pub enum QuestionKind {
    SingleChoice(Vec<Choice>),
    MultipleChoice(Vec<Choice>),
}

impl QuestionKind {
    /// Returns `None` when no choice is marked correct.
    pub fn resolve(choices: Vec<Choice>) -> Option<Self> {
        match choices.iter().filter(|c| c.correct).count() {
            0 => None,
            1 => Some(QuestionKind::SingleChoice(choices)),
            _ => Some(QuestionKind::MultipleChoice(choices)),
        }
    }

    pub fn choices(&self) -> &[Choice] {
        match self {
            QuestionKind::SingleChoice(choices) | QuestionKind::MultipleChoice(choices) => choices,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuestionKind::SingleChoice(_) => "single choice",
            QuestionKind::MultipleChoice(_) => "multiple choice",
        }
    }
}

/// A finalized question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub title: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
    /// Window width in seconds, overriding the layout default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap: Option<f64>,
}

/// Questions anchored to one video cue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionSet {
    pub video: String,
    pub start_time: f64,
    /// Equal to `start_time` until the set has been scheduled
    pub end_time: f64,
    pub questions: Vec<Question>,
}

impl QuestionSet {
    pub fn new(video: impl Into<String>, start_time: f64) -> Self {
        Self {
            video: video.into(),
            start_time,
            end_time: start_time,
            questions: Vec::new(),
        }
    }
}

/// Playback interval `[from, to)` in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub from: f64,
    pub to: f64,
}

impl Window {
    pub fn width(&self) -> f64 {
        self.to - self.from
    }
}

/// Reference to the merged video the interactions play over
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoFile {
    pub path: PathBuf,
    pub mime: String,
}

impl VideoFile {
    /// Infer the mime type from the file extension, falling back to `default_mime`.
    pub fn from_path(path: impl AsRef<Path>, default_mime: &str) -> Self {
        let path = path.as_ref();
        let mime = match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("mp4") | Some("m4v") => "video/mp4",
            Some("webm") => "video/webm",
            Some("ogv") | Some("ogg") => "video/ogg",
            Some("mov") => "video/quicktime",
            _ => default_mime,
        };

        Self {
            path: path.to_path_buf(),
            mime: mime.to_string(),
        }
    }
}

/// Human-readable overview of parsed (and possibly scheduled) sets
pub fn summarize(sets: &[QuestionSet]) -> String {
    let mut summary = String::new();
    let questions: usize = sets.iter().map(|s| s.questions.len()).sum();
    summary.push_str(&format!("Video cues: {}\n", sets.len()));
    summary.push_str(&format!("Questions: {}\n", questions));

    for (idx, set) in sets.iter().enumerate() {
        summary.push_str(&format!(
            "  Cue {}: '{}' ({:.2}s - {:.2}s, {} question{})\n",
            idx + 1,
            set.video,
            set.start_time,
            set.end_time,
            set.questions.len(),
            if set.questions.len() == 1 { "" } else { "s" }
        ));
        for question in &set.questions {
            summary.push_str(&format!(
                "    - {} [{}, {} choices]\n",
                question.title,
                question.kind.label(),
                question.kind.choices().len()
            ));
        }
    }

    summary
}
