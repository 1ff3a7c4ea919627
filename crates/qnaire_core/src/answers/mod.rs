//! Answers tree assembly.
//!
//! # Responsibility
//! - Reconcile catalog structure, domain tree and flat values into one
//!   nested, locale-rendered report.
//! - Stay pure: callers load everything up front, nothing here does I/O.
//!
//! # Invariants
//! - Missing lookups shrink the report; they never fail it. This covers
//!   option references that no longer resolve.
//! - Malformed yes/no keys fail loudly with `AnswerError`.

use crate::model::catalog::Catalog;
use crate::model::domain::DomainTree;
use crate::model::locale::Locale;
use crate::model::value::{Value, ValueId};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod export;
pub mod format;
pub mod index;
pub mod repetition;
pub mod tree;

pub use export::{flatten_rows, write_csv, CsvDelimiter, ExportRow};
pub use format::AnswerFormatter;
pub use index::{SetLabels, ValueIndex};
pub use repetition::resolve_repetitions;
pub use tree::{
    assemble, AnswerSet, AnswersTree, QuestionAnswers, QuestionSetAnswers, QuestionSetContent,
    SectionAnswers,
};

pub type AnswerResult<T> = Result<T, AnswerError>;

/// Stored data that cannot be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerError {
    /// A yes/no value holds something other than `1|0|true|false`.
    InvalidBooleanValue { value_id: ValueId, text: String },
}

impl Display for AnswerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBooleanValue { value_id, text } => write!(
                f,
                "value {value_id} holds `{text}`, expected a yes/no key (1|0|true|false)"
            ),
        }
    }
}

impl Error for AnswerError {}

/// Builds the answers tree for one value scope in one locale.
pub fn get_answers_tree(
    catalog: Option<&Catalog>,
    domain: &DomainTree,
    values: &[Value],
    locale: Locale,
) -> AnswerResult<AnswersTree> {
    let index = ValueIndex::build(values, domain);
    let formatter = AnswerFormatter::new(catalog, domain, locale);
    assemble(catalog, &index, &formatter)
}
