pub mod classifier;
pub mod db;
pub mod mailer;

pub use classifier::JsonClassifierLoader;
pub use db::DbAdapter;
pub use mailer::SmtpMailer;
