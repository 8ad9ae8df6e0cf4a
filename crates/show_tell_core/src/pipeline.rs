//! crates/show_tell_core/src/pipeline.rs
//!
//! The review pipeline: split a story, classify every sentence in one batch and
//! pair each sentence with its label.

use crate::domain::{Label, SentenceVerdict, Summary};
use crate::ports::{PortError, PortResult, SentenceClassifier};
use crate::tokenizer::{normalize, split_sentences};

/// The labeled sentence list and its counts, as shown on the review page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewOutcome {
    pub verdicts: Vec<SentenceVerdict>,
    pub summary: Summary,
}

/// Runs the classifier over `story` and returns one verdict per sentence.
///
/// Every verdict starts with `agreed == false`. A story with no sentences
/// yields an empty list without calling the classifier.
pub fn review_story(story: &str, classifier: &dyn SentenceClassifier) -> PortResult<ReviewOutcome> {
    let sentences = split_sentences(story);
    if sentences.is_empty() {
        return Ok(ReviewOutcome {
            verdicts: Vec::new(),
            summary: Summary::default(),
        });
    }

    let normalized: Vec<String> = sentences.iter().map(|s| normalize(s)).collect();
    let classes = classifier.predict(&normalized)?;
    if classes.len() != sentences.len() {
        return Err(PortError::Unexpected(format!(
            "Classifier returned {} labels for {} sentences",
            classes.len(),
            sentences.len()
        )));
    }

    let verdicts = sentences
        .into_iter()
        .zip(classes)
        .map(|(sentence, class)| {
            Label::from_class(class)
                .map(|label| SentenceVerdict::new(sentence, label))
                .ok_or_else(|| PortError::Unexpected(format!("Unknown class label {class}")))
        })
        .collect::<PortResult<Vec<_>>>()?;

    let summary = Summary::from_verdicts(&verdicts);
    Ok(ReviewOutcome { verdicts, summary })
}
