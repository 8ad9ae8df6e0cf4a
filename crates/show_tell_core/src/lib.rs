pub mod domain;
pub mod email;
pub mod flow;
pub mod pipeline;
pub mod ports;
pub mod tokenizer;

pub use domain::{Label, SentenceVerdict, Session, Stage, StoredRecord, Summary};
pub use email::FeedbackEmail;
pub use flow::{FlowError, InputField, PageFlow, StoryInput, SubmitReport, ValidationError};
pub use pipeline::{review_story, ReviewOutcome};
pub use ports::{
    ClassifierLoader, FeedbackNotifier, PortError, PortResult, SentenceClassifier, SubmissionStore,
};
