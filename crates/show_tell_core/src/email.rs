//! crates/show_tell_core/src/email.rs
//!
//! Builds the plain-text feedback email sent after a submission.

use crate::domain::{SentenceVerdict, Summary};

pub const NO_REFLECTION: &str = "No reflection provided.";
pub const NO_COMMENT: &str = "No additional comment provided.";

/// A fully composed message, ready for any transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackEmail {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

impl FeedbackEmail {
    /// Composes the feedback email. The output depends only on the arguments.
    pub fn compose(
        recipient: &str,
        name: &str,
        title: &str,
        summary: &Summary,
        feedback: &[SentenceVerdict],
        reflection: Option<&str>,
        comments: Option<&str>,
    ) -> Self {
        let disagreed = feedback.iter().filter(|v| !v.agreed).count();

        let mut sentences = String::from("Sentence-by-sentence feedback:\n");
        for verdict in feedback {
            let status = if verdict.agreed { "Agreed" } else { "Did NOT agree" };
            sentences.push_str(&format!(
                "- [{}] {}\n  > {}\n\n",
                verdict.label, verdict.sentence, status
            ));
        }

        let reflection = non_blank(reflection).unwrap_or(NO_REFLECTION);
        let comments = non_blank(comments).unwrap_or(NO_COMMENT);

        let body = format!(
            "Dear {name},\n\
             \n\
             Thank you for submitting your data story titled \"{title}\". \
             Our system analyzed your submission and identified a total of {total} sentences. \
             Of these, {show} were categorized as 'Show' and {tell} as 'Tell'. \
             You disagreed with the model's classification on {disagreed} sentence(s).\n\
             \n\
             Below is a detailed review of each sentence, showing how the model labeled it \
             and whether you agreed:\n\
             \n\
             {sentences}\
             Your reflection:\n\
             \"{reflection}\"\n\
             \n\
             Your comment:\n\
             \"{comments}\"\n\
             \n\
             We appreciate your thoughtful participation and hope this feedback helps you \
             enhance your data storytelling skills.\n\
             \n\
             Best regards,\n\
             The Data Story Feedback Team\n",
            total = summary.total,
            show = summary.show,
            tell = summary.tell,
        );

        Self {
            recipient: recipient.to_string(),
            subject: format!("Feedback for Your Data Story: {title}"),
            body,
        }
    }
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}
