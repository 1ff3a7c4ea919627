//! Catalog walk and answers tree assembly.
//!
//! # Responsibility
//! - Walk sections, question sets and questions in catalog order.
//! - Fold rendered answers and resolved repetitions into one nested report.
//!
//! # Invariants
//! - Every level is walked by `order ASC, id ASC`, whether or not the
//!   caller sorted the catalog.
//! - Questions without answers are omitted; so are question sets without
//!   surviving questions or sets, and sections without surviving sets.
//! - A missing catalog yields an empty tree.
//! - `is_collection` of a question entry is `question.is_collection` OR a
//!   checkbox widget.

use crate::answers::format::AnswerFormatter;
use crate::answers::index::ValueIndex;
use crate::answers::repetition::resolve_repetitions;
use crate::answers::AnswerResult;
use crate::model::catalog::{Catalog, Question, QuestionEntity, QuestionSet};
use serde::Serialize;
use uuid::Uuid;

/// Nested report of a project's answers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnswersTree {
    pub sections: Vec<SectionAnswers>,
}

impl AnswersTree {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionAnswers {
    pub title: String,
    pub questionsets: Vec<QuestionSetAnswers>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionSetAnswers {
    /// `None` for questions placed directly in a section.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Path of the bound attribute.
    pub attribute: Option<String>,
    pub is_collection: bool,
    #[serde(flatten)]
    pub content: QuestionSetContent,
}

/// Answers of a plain question set, or the instances of a repeatable one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QuestionSetContent {
    Questions { questions: Vec<QuestionAnswers> },
    Sets { sets: Vec<AnswerSet> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionAnswers {
    pub text: String,
    pub attribute: Option<String>,
    pub answers: Vec<String>,
    pub is_collection: bool,
}

/// One instance of a repeatable question set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerSet {
    /// Valueset label, or `#<set_index>` when the set has no label attribute.
    pub id: String,
    pub questions: Vec<QuestionAnswers>,
}

/// Assembles the answers tree of `catalog` from an indexed value scope.
pub fn assemble(
    catalog: Option<&Catalog>,
    index: &ValueIndex<'_>,
    formatter: &AnswerFormatter<'_>,
) -> AnswerResult<AnswersTree> {
    let Some(catalog) = catalog else {
        return Ok(AnswersTree::default());
    };
    let locale = formatter.locale();

    let mut sections = Vec::new();
    for section in ordered(&catalog.sections, |section| (section.order, section.id)) {
        let mut questionsets = Vec::new();
        for entity in ordered(&section.entities, |entity| (entity.order(), entity.id())) {
            let entry = match entity {
                QuestionEntity::Set(question_set) => {
                    assemble_question_set(question_set, index, formatter)?
                }
                QuestionEntity::Leaf(question) => assemble_leaf(question, index, formatter)?,
            };
            if let Some(entry) = entry {
                questionsets.push(entry);
            }
        }

        if !questionsets.is_empty() {
            sections.push(SectionAnswers {
                title: section.title.get(locale).to_string(),
                questionsets,
            });
        }
    }

    Ok(AnswersTree { sections })
}

/// Answered questions of one set index, in catalog order.
pub(crate) fn collect_questions(
    questions: &[Question],
    index: &ValueIndex<'_>,
    formatter: &AnswerFormatter<'_>,
    set_index: u32,
) -> AnswerResult<Vec<QuestionAnswers>> {
    let mut entries = Vec::new();
    for question in ordered(questions, |question| (question.order, question.id)) {
        let answers = formatter.answers(index, question, set_index)?;
        if answers.is_empty() {
            continue;
        }
        entries.push(QuestionAnswers {
            text: question.text.get(formatter.locale()).to_string(),
            attribute: formatter.domain().path(question.attribute_id),
            answers,
            is_collection: question.renders_as_collection(),
        });
    }
    Ok(entries)
}

fn assemble_question_set(
    question_set: &QuestionSet,
    index: &ValueIndex<'_>,
    formatter: &AnswerFormatter<'_>,
) -> AnswerResult<Option<QuestionSetAnswers>> {
    let attribute = question_set
        .attribute_id
        .and_then(|id| formatter.domain().path(id));
    let title = Some(question_set.title.get(formatter.locale()).to_string());

    if let Some(attribute_id) = question_set.repeat_attribute() {
        let sets = resolve_repetitions(question_set, attribute_id, index, formatter)?;
        if sets.is_empty() {
            return Ok(None);
        }
        return Ok(Some(QuestionSetAnswers {
            title,
            attribute,
            is_collection: true,
            content: QuestionSetContent::Sets { sets },
        }));
    }

    let questions = collect_questions(&question_set.questions, index, formatter, 0)?;
    if questions.is_empty() {
        return Ok(None);
    }
    Ok(Some(QuestionSetAnswers {
        title,
        attribute,
        is_collection: false,
        content: QuestionSetContent::Questions { questions },
    }))
}

fn assemble_leaf(
    question: &Question,
    index: &ValueIndex<'_>,
    formatter: &AnswerFormatter<'_>,
) -> AnswerResult<Option<QuestionSetAnswers>> {
    let questions = collect_questions(std::slice::from_ref(question), index, formatter, 0)?;
    if questions.is_empty() {
        return Ok(None);
    }
    Ok(Some(QuestionSetAnswers {
        title: None,
        attribute: formatter.domain().path(question.attribute_id),
        is_collection: false,
        content: QuestionSetContent::Questions { questions },
    }))
}

fn ordered<T>(items: &[T], key: impl Fn(&T) -> (i64, Uuid)) -> Vec<&T> {
    let mut sorted: Vec<&T> = items.iter().collect();
    sorted.sort_by_key(|item| key(*item));
    sorted
}
