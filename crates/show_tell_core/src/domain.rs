//! crates/show_tell_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database, mail or HTML format.

use uuid::Uuid;

/// The page a student is currently on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Input,
    Review,
    Reflection,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Input => "input",
            Stage::Review => "review",
            Stage::Reflection => "reflection",
        }
    }
}

/// The binary label the classifier assigns to a sentence.
///
/// Class `0` is always `Show` and class `1` is always `Tell`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Show,
    Tell,
}

impl Label {
    /// Maps a raw classifier output onto a label.
    pub fn from_class(class: u8) -> Option<Self> {
        match class {
            0 => Some(Label::Show),
            1 => Some(Label::Tell),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Show => "Show",
            Label::Tell => "Tell",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One sentence of the story with its predicted label and the student's verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceVerdict {
    pub sentence: String,
    pub label: Label,
    pub agreed: bool,
}

impl SentenceVerdict {
    pub fn new(sentence: impl Into<String>, label: Label) -> Self {
        Self {
            sentence: sentence.into(),
            label,
            agreed: false,
        }
    }
}

/// Sentence counts derived from a list of verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    pub total: usize,
    pub show: usize,
    pub tell: usize,
}

impl Summary {
    pub fn from_verdicts(verdicts: &[SentenceVerdict]) -> Self {
        let show = verdicts.iter().filter(|v| v.label == Label::Show).count();
        Self {
            total: verdicts.len(),
            show,
            tell: verdicts.len() - show,
        }
    }
}

/// One student's pass through Input, Review and Reflection.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub stage: Stage,
    pub student_name: String,
    pub student_email: String,
    pub story_title: String,
    pub story: String,
    /// Ordered as the sentences appear in `story`.
    pub verdicts: Vec<SentenceVerdict>,
    pub reflection: Option<String>,
    pub comments: Option<String>,
}

impl Session {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            stage: Stage::Input,
            student_name: String::new(),
            student_email: String::new(),
            story_title: String::new(),
            story: String::new(),
            verdicts: Vec::new(),
            reflection: None,
            comments: None,
        }
    }

    /// Replaces every field with a fresh default, keeping only the id the
    /// browser is bound to.
    pub fn reset(&mut self) {
        *self = Session::new(self.id);
    }

    pub fn summary(&self) -> Summary {
        Summary::from_verdicts(&self.verdicts)
    }

    /// Number of sentences the student did not agree with.
    pub fn disagreements(&self) -> usize {
        self.verdicts.iter().filter(|v| !v.agreed).count()
    }
}

/// The flattened row written once per completed submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub name: String,
    pub email: String,
    pub title: String,
    pub story: String,
    pub total_sentences: usize,
    pub show_sentences: usize,
    pub tell_sentences: usize,
    pub reflection: String,
    pub week: String,
    pub comments: String,
}

impl StoredRecord {
    pub fn from_session(session: &Session, week: &str) -> Self {
        let summary = session.summary();
        Self {
            name: session.student_name.clone(),
            email: session.student_email.clone(),
            title: session.story_title.clone(),
            story: session.story.clone(),
            total_sentences: summary.total,
            show_sentences: summary.show,
            tell_sentences: summary.tell,
            reflection: session.reflection.clone().unwrap_or_default(),
            week: week.to_string(),
            comments: session.comments.clone().unwrap_or_default(),
        }
    }
}
