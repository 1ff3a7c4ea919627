//! Core logic for questionnaire answers reporting.
//! This crate owns the catalog/domain/value model, storage and the answers
//! tree algorithm; front ends only parse arguments and render output.

pub mod answers;
pub mod conditions;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use answers::{
    get_answers_tree, AnswerError, AnswerResult, AnswersTree, CsvDelimiter, QuestionAnswers,
    QuestionSetAnswers, QuestionSetContent, SectionAnswers,
};
pub use conditions::{Condition, Relation, Task};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::locale::{Locale, LocalizedText};
pub use repo::{RepoError, RepoResult};
pub use service::answers_service::{AnswersService, AnswersServiceError};
pub use service::task_service::TaskService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
