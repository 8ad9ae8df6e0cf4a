//! crates/show_tell_core/src/flow.rs
//!
//! The page flow controller. It owns the ports and drives a `Session` through
//! Input -> Review -> Reflection, with an explicit restart back to Input.

use std::sync::Arc;

use crate::domain::{Session, Stage, StoredRecord};
use crate::email::FeedbackEmail;
use crate::pipeline::review_story;
use crate::ports::{ClassifierLoader, FeedbackNotifier, PortError, SubmissionStore};

//=========================================================================================
// Errors
//=========================================================================================

/// Required input fields, in the order they appear on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    Name,
    Email,
    Title,
    Story,
}

impl InputField {
    pub fn label(&self) -> &'static str {
        match self {
            InputField::Name => "name",
            InputField::Email => "email",
            InputField::Title => "story title",
            InputField::Story => "story",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Please fill in your {}.", join_labels(.missing))]
pub struct ValidationError {
    pub missing: Vec<InputField>,
}

fn join_labels(fields: &[InputField]) -> String {
    let labels: Vec<_> = fields.iter().map(InputField::label).collect();
    match labels.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{} and {}", rest.join(", "), last),
        Some((last, _)) => (*last).to_string(),
        None => String::new(),
    }
}

/// Errors that stop a transition. Integration failures during submit are not
/// represented here; see [`SubmitReport`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The classifier could not be loaded or produced unusable output.
    #[error("Analysis failed: {0}")]
    Fatal(String),
    #[error("This action belongs to the {expected} page, but the session is on the {actual} page.")]
    WrongStage { expected: Stage, actual: Stage },
    #[error("There is no sentence number {0}.")]
    UnknownSentence(usize),
}

//=========================================================================================
// Inputs and Outcomes
//=========================================================================================

/// The four fields collected on the input page.
#[derive(Debug, Clone, Default)]
pub struct StoryInput {
    pub name: String,
    pub email: String,
    pub title: String,
    pub story: String,
}

impl StoryInput {
    fn validate(&self) -> Result<(), ValidationError> {
        let missing: Vec<InputField> = [
            (InputField::Name, &self.name),
            (InputField::Email, &self.email),
            (InputField::Title, &self.title),
            (InputField::Story, &self.story),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { missing })
        }
    }
}

/// What happened to each side effect of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubmitReport {
    pub store_error: Option<PortError>,
    pub notify_error: Option<PortError>,
}

impl SubmitReport {
    pub fn is_complete(&self) -> bool {
        self.store_error.is_none() && self.notify_error.is_none()
    }
}

//=========================================================================================
// The Controller
//=========================================================================================

pub struct PageFlow {
    classifier: Arc<dyn ClassifierLoader>,
    store: Arc<dyn SubmissionStore>,
    notifier: Arc<dyn FeedbackNotifier>,
    week_label: String,
}

impl PageFlow {
    pub fn new(
        classifier: Arc<dyn ClassifierLoader>,
        store: Arc<dyn SubmissionStore>,
        notifier: Arc<dyn FeedbackNotifier>,
        week_label: impl Into<String>,
    ) -> Self {
        Self {
            classifier,
            store,
            notifier,
            week_label: week_label.into(),
        }
    }

    /// Input -> Review.
    ///
    /// Validates the fields, then runs the review pipeline over the story. On
    /// any error the session is left untouched on the Input stage.
    pub async fn analyze(&self, session: &mut Session, input: StoryInput) -> Result<(), FlowError> {
        expect_stage(session, Stage::Input)?;
        input.validate()?;

        let classifier = self
            .classifier
            .load()
            .await
            .map_err(|e| FlowError::Fatal(e.to_string()))?;
        let outcome =
            review_story(&input.story, classifier.as_ref()).map_err(|e| FlowError::Fatal(e.to_string()))?;

        session.student_name = input.name.trim().to_string();
        session.student_email = input.email.trim().to_string();
        session.story_title = input.title.trim().to_string();
        session.story = input.story.trim().to_string();
        session.verdicts = outcome.verdicts;
        session.reflection = None;
        session.comments = None;
        session.stage = Stage::Review;

        tracing::info!(
            session_id = %session.id,
            total = outcome.summary.total,
            show = outcome.summary.show,
            tell = outcome.summary.tell,
            "Story analyzed"
        );
        Ok(())
    }

    /// Sets the agreement flag of one sentence. Only allowed during Review.
    pub fn set_agreement(&self, session: &mut Session, index: usize, agreed: bool) -> Result<(), FlowError> {
        expect_stage(session, Stage::Review)?;
        let verdict = session
            .verdicts
            .get_mut(index)
            .ok_or(FlowError::UnknownSentence(index))?;
        verdict.agreed = agreed;
        Ok(())
    }

    /// Stores free-form comments. Allowed during Review and Reflection.
    pub fn set_comments(&self, session: &mut Session, comments: &str) -> Result<(), FlowError> {
        if session.stage == Stage::Input {
            return Err(FlowError::WrongStage {
                expected: Stage::Review,
                actual: Stage::Input,
            });
        }
        session.comments = Some(comments.to_string()).filter(|c| !c.trim().is_empty());
        Ok(())
    }

    /// Review -> Reflection. Freezes the verdict list.
    pub fn advance_to_reflection(&self, session: &mut Session) -> Result<(), FlowError> {
        expect_stage(session, Stage::Review)?;
        session.stage = Stage::Reflection;
        tracing::info!(
            session_id = %session.id,
            disagreements = session.disagreements(),
            "Review finished"
        );
        Ok(())
    }

    /// Writes the record and sends the email.
    ///
    /// Both adapters are always invoked, in that order, regardless of each
    /// other's outcome. Their failures are reported, never returned as errors.
    pub async fn submit(&self, session: &mut Session, reflection: &str) -> Result<SubmitReport, FlowError> {
        expect_stage(session, Stage::Reflection)?;
        session.reflection = Some(reflection.to_string()).filter(|r| !r.trim().is_empty());

        let record = StoredRecord::from_session(session, &self.week_label);
        let store_error = self.store.insert(&record).await.err();
        if let Some(e) = &store_error {
            tracing::error!(session_id = %session.id, "Failed to store submission: {}", e);
        }

        let email = FeedbackEmail::compose(
            &session.student_email,
            &session.student_name,
            &session.story_title,
            &session.summary(),
            &session.verdicts,
            session.reflection.as_deref(),
            session.comments.as_deref(),
        );
        let notify_error = self.notifier.send(&email).await.err();
        if let Some(e) = &notify_error {
            tracing::error!(session_id = %session.id, "Failed to send feedback email: {}", e);
        }

        tracing::info!(
            session_id = %session.id,
            stored = store_error.is_none(),
            emailed = notify_error.is_none(),
            "Submission processed"
        );
        Ok(SubmitReport {
            store_error,
            notify_error,
        })
    }

    /// Any stage -> Input, discarding every field.
    pub fn restart(&self, session: &mut Session) {
        tracing::info!(session_id = %session.id, from = session.stage.as_str(), "Session restarted");
        session.reset();
    }
}

fn expect_stage(session: &Session, expected: Stage) -> Result<(), FlowError> {
    if session.stage == expected {
        Ok(())
    } else {
        Err(FlowError::WrongStage {
            expected,
            actual: session.stage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Label, Summary};
    use crate::pipeline::tests::{FixedClassifier, KeywordClassifier};
    use crate::ports::{PortResult, SentenceClassifier};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use uuid::Uuid;

    struct StaticLoader(Option<Arc<KeywordClassifier>>);

    #[async_trait]
    impl ClassifierLoader for StaticLoader {
        async fn load(&self) -> PortResult<Arc<dyn SentenceClassifier>> {
            match &self.0 {
                Some(c) => Ok(c.clone() as Arc<dyn SentenceClassifier>),
                None => Err(PortError::Unexpected("model file is corrupt".into())),
            }
        }
    }

    /// Loads fine, then answers every batch with the same labels.
    struct FixedLoader(Vec<u8>);

    #[async_trait]
    impl ClassifierLoader for FixedLoader {
        async fn load(&self) -> PortResult<Arc<dyn SentenceClassifier>> {
            Ok(Arc::new(FixedClassifier(self.0.clone())))
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        fail: bool,
        rows: Mutex<Vec<StoredRecord>>,
    }

    #[async_trait]
    impl SubmissionStore for MemoryStore {
        async fn insert(&self, record: &StoredRecord) -> PortResult<()> {
            if self.fail {
                return Err(PortError::Unavailable("connection refused".into()));
            }
            self.rows.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct Outbox {
        fail: bool,
        sent: Mutex<Vec<FeedbackEmail>>,
    }

    #[async_trait]
    impl FeedbackNotifier for Outbox {
        async fn send(&self, email: &FeedbackEmail) -> PortResult<()> {
            self.sent.lock().unwrap().push(email.clone());
            if self.fail {
                return Err(PortError::Rejected("bad credentials".into()));
            }
            Ok(())
        }
    }

    struct Harness {
        flow: PageFlow,
        store: Arc<MemoryStore>,
        outbox: Arc<Outbox>,
    }

    fn harness(loader: StaticLoader, store: MemoryStore, outbox: Outbox) -> Harness {
        let store = Arc::new(store);
        let outbox = Arc::new(outbox);
        let flow = PageFlow::new(Arc::new(loader), store.clone(), outbox.clone(), "Week 5");
        Harness { flow, store, outbox }
    }

    fn working() -> Harness {
        let classifier = Arc::new(KeywordClassifier::new(&["felt", "proud"]));
        harness(StaticLoader(Some(classifier)), MemoryStore::default(), Outbox::default())
    }

    fn chart_input() -> StoryInput {
        StoryInput {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            title: "Team Sales".into(),
            story: "The bar chart rose sharply. I felt proud of the team.".into(),
        }
    }

    #[tokio::test]
    async fn analyze_moves_to_review_with_labels() {
        let h = working();
        let mut session = Session::new(Uuid::new_v4());
        h.flow.analyze(&mut session, chart_input()).await.unwrap();

        assert_eq!(session.stage, Stage::Review);
        assert_eq!(session.summary(), Summary { total: 2, show: 1, tell: 1 });
        assert_eq!(session.verdicts[0].label, Label::Show);
        assert_eq!(session.verdicts[1].label, Label::Tell);
    }

    #[tokio::test]
    async fn missing_fields_block_the_input_stage() {
        let h = working();
        let mut session = Session::new(Uuid::new_v4());
        let input = StoryInput {
            name: "Ada".into(),
            email: " ".into(),
            title: String::new(),
            story: "\n\n".into(),
        };

        let err = h.flow.analyze(&mut session, input).await.unwrap_err();
        let FlowError::Validation(v) = &err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(v.missing, vec![InputField::Email, InputField::Title, InputField::Story]);
        assert_eq!(err.to_string(), "Please fill in your email, story title and story.");
        assert_eq!(session.stage, Stage::Input);
        assert!(session.verdicts.is_empty());
    }

    #[tokio::test]
    async fn model_load_failure_is_fatal_and_leaves_no_partial_state() {
        let h = harness(StaticLoader(None), MemoryStore::default(), Outbox::default());
        let mut session = Session::new(Uuid::new_v4());

        let err = h.flow.analyze(&mut session, chart_input()).await.unwrap_err();
        assert!(matches!(err, FlowError::Fatal(_)));
        assert_eq!(err.to_string(), "Analysis failed: An unexpected error occurred: model file is corrupt");
        assert_eq!(session.stage, Stage::Input);
        assert!(session.verdicts.is_empty());
        assert!(session.student_name.is_empty());
    }

    #[tokio::test]
    async fn unusable_classifier_output_is_not_reported_as_a_load_error() {
        let store = Arc::new(MemoryStore::default());
        let outbox = Arc::new(Outbox::default());
        let flow = PageFlow::new(Arc::new(FixedLoader(vec![0])), store, outbox, "Week 5");
        let mut session = Session::new(Uuid::new_v4());

        let err = flow.analyze(&mut session, chart_input()).await.unwrap_err();
        assert!(matches!(err, FlowError::Fatal(_)));
        let shown = err.to_string();
        assert!(shown.starts_with("Analysis failed: "), "{shown}");
        assert!(!shown.contains("load"), "{shown}");
        assert_eq!(session.stage, Stage::Input);
        assert!(session.verdicts.is_empty());
    }

    #[tokio::test]
    async fn only_the_last_toggle_is_frozen() {
        let h = working();
        let mut session = Session::new(Uuid::new_v4());
        h.flow.analyze(&mut session, chart_input()).await.unwrap();

        for agreed in [true, false, true, false, true] {
            h.flow.set_agreement(&mut session, 0, agreed).unwrap();
        }
        h.flow.set_agreement(&mut session, 1, true).unwrap();
        h.flow.set_agreement(&mut session, 1, false).unwrap();
        h.flow.advance_to_reflection(&mut session).unwrap();

        assert!(session.verdicts[0].agreed);
        assert!(!session.verdicts[1].agreed);
        let err = h.flow.set_agreement(&mut session, 0, false).unwrap_err();
        assert!(matches!(err, FlowError::WrongStage { expected: Stage::Review, .. }));
        assert!(session.verdicts[0].agreed);
    }

    #[tokio::test]
    async fn unknown_sentence_index_is_rejected() {
        let h = working();
        let mut session = Session::new(Uuid::new_v4());
        h.flow.analyze(&mut session, chart_input()).await.unwrap();
        assert_eq!(
            h.flow.set_agreement(&mut session, 9, true),
            Err(FlowError::UnknownSentence(9))
        );
    }

    #[tokio::test]
    async fn submit_writes_one_record_and_one_email() {
        let h = working();
        let mut session = Session::new(Uuid::new_v4());
        h.flow.analyze(&mut session, chart_input()).await.unwrap();
        h.flow.set_agreement(&mut session, 0, true).unwrap();
        h.flow.set_comments(&mut session, "The second is a feeling.").unwrap();
        h.flow.advance_to_reflection(&mut session).unwrap();

        let report = h.flow.submit(&mut session, "Use more numbers.").await.unwrap();
        assert!(report.is_complete());

        let rows = h.store.rows.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Ada");
        assert_eq!(rows[0].story, "The bar chart rose sharply. I felt proud of the team.");
        assert_eq!((rows[0].total_sentences, rows[0].show_sentences, rows[0].tell_sentences), (2, 1, 1));
        assert_eq!(rows[0].reflection, "Use more numbers.");
        assert_eq!(rows[0].comments, "The second is a feeling.");
        assert_eq!(rows[0].week, "Week 5");

        let sent = h.outbox.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "ada@example.com");
        assert!(sent[0].body.contains("classification on 1 sentence(s)"));
    }

    #[tokio::test]
    async fn store_failure_does_not_stop_the_email() {
        let classifier = Arc::new(KeywordClassifier::new(&["proud"]));
        let h = harness(
            StaticLoader(Some(classifier)),
            MemoryStore { fail: true, ..Default::default() },
            Outbox::default(),
        );
        let mut session = Session::new(Uuid::new_v4());
        h.flow.analyze(&mut session, chart_input()).await.unwrap();
        h.flow.advance_to_reflection(&mut session).unwrap();

        let report = h.flow.submit(&mut session, "").await.unwrap();
        assert!(matches!(report.store_error, Some(PortError::Unavailable(_))));
        assert!(report.notify_error.is_none());
        assert_eq!(h.outbox.sent.lock().unwrap().len(), 1);
        assert!(session.reflection.is_none());
    }

    #[tokio::test]
    async fn email_failure_keeps_the_stored_row() {
        let classifier = Arc::new(KeywordClassifier::new(&["proud"]));
        let h = harness(
            StaticLoader(Some(classifier)),
            MemoryStore::default(),
            Outbox { fail: true, ..Default::default() },
        );
        let mut session = Session::new(Uuid::new_v4());
        h.flow.analyze(&mut session, chart_input()).await.unwrap();
        h.flow.advance_to_reflection(&mut session).unwrap();

        let report = h.flow.submit(&mut session, "ok").await.unwrap();
        assert!(report.store_error.is_none());
        assert!(matches!(report.notify_error, Some(PortError::Rejected(_))));
        assert_eq!(h.store.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn submit_outside_reflection_is_refused() {
        let h = working();
        let mut session = Session::new(Uuid::new_v4());
        h.flow.analyze(&mut session, chart_input()).await.unwrap();

        let err = h.flow.submit(&mut session, "early").await.unwrap_err();
        assert_eq!(
            err,
            FlowError::WrongStage {
                expected: Stage::Reflection,
                actual: Stage::Review
            }
        );
        assert!(h.store.rows.lock().unwrap().is_empty());
        assert!(h.outbox.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn restart_clears_everything_and_reanalysis_is_fresh() {
        let h = working();
        let id = Uuid::new_v4();
        let mut session = Session::new(id);
        h.flow.analyze(&mut session, chart_input()).await.unwrap();
        h.flow.set_agreement(&mut session, 1, true).unwrap();
        h.flow.advance_to_reflection(&mut session).unwrap();
        h.flow.submit(&mut session, "done").await.unwrap();

        h.flow.restart(&mut session);
        assert_eq!(session.id, id);
        assert_eq!(session.stage, Stage::Input);
        assert!(session.verdicts.is_empty());
        assert_eq!(session.summary(), Summary::default());
        assert!(session.reflection.is_none() && session.comments.is_none());

        let input = StoryInput {
            story: "Revenue fell in March.".into(),
            ..chart_input()
        };
        h.flow.analyze(&mut session, input).await.unwrap();
        assert_eq!(session.verdicts.len(), 1);
        assert!(!session.verdicts[0].agreed);
    }
}
