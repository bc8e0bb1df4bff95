pub mod assembler;
pub mod bank;
pub mod config;
pub mod error;
pub mod package;
pub mod parser;
pub mod segments;
pub mod templates;
pub mod timeline;

pub use assembler::{ContentAssembler, ContentDocument, Interaction, LayoutSettings, MetadataDocument};
pub use bank::{Choice, Question, QuestionKind, QuestionSet, VideoFile, VideoSegment, Window};
pub use self::config::AppConfig;
pub use error::{QuizcutError, Result};
pub use package::{Generator, Package};
pub use parser::{ParserSettings, QuestionBankParser};
pub use segments::SegmentSource;
pub use templates::{SkeletonKind, TemplateRepository, TemplateSet};
pub use timeline::{CuePolicy, Timeline};
