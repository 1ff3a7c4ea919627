//! Questionnaire catalog tree.
//!
//! # Responsibility
//! - Define the ordered Catalog -> Section -> entity -> Question forest.
//! - Resolve "question set or standalone question" once, as a tagged variant.
//!
//! # Invariants
//! - Every level is kept sorted by `order ASC, id ASC` after `sort_in_place`.
//! - `QuestionSet::is_collection` mirrors the bound attribute's flag.
//!
//! # See also
//! - crate::repo::catalog_repo

use crate::model::domain::AttributeId;
use crate::model::locale::LocalizedText;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub type CatalogId = Uuid;
pub type SectionId = Uuid;
pub type QuestionSetId = Uuid;
pub type QuestionId = Uuid;
pub type OptionId = Uuid;

/// Input widget a question is answered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetType {
    Text,
    Textarea,
    YesNo,
    Checkbox,
    Radio,
    Select,
    Range,
    Date,
}

impl WidgetType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::YesNo => "yesno",
            Self::Checkbox => "checkbox",
            Self::Radio => "radio",
            Self::Select => "select",
            Self::Range => "range",
            Self::Date => "date",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(Self::Text),
            "textarea" => Some(Self::Textarea),
            "yesno" => Some(Self::YesNo),
            "checkbox" => Some(Self::Checkbox),
            "radio" => Some(Self::Radio),
            "select" => Some(Self::Select),
            "range" => Some(Self::Range),
            "date" => Some(Self::Date),
            _ => None,
        }
    }
}

/// Enumerated choice of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: OptionId,
    pub order: i64,
    pub key: String,
    pub text: LocalizedText,
    /// Whether the user may type extra text next to this option.
    pub additional_input: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub order: i64,
    pub text: LocalizedText,
    pub attribute_id: AttributeId,
    pub widget_type: WidgetType,
    /// Whether one question may hold several values.
    pub is_collection: bool,
    pub options: Vec<AnswerOption>,
}

impl Question {
    /// Multi-valued for rendering: checkboxes always are.
    pub fn renders_as_collection(&self) -> bool {
        self.is_collection || self.widget_type == WidgetType::Checkbox
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSet {
    pub id: QuestionSetId,
    pub order: i64,
    pub title: LocalizedText,
    pub attribute_id: Option<AttributeId>,
    /// Repeatable set; only meaningful with a bound attribute.
    pub is_collection: bool,
    pub questions: Vec<Question>,
}

impl QuestionSet {
    /// Returns the set attribute when the set repeats.
    pub fn repeat_attribute(&self) -> Option<AttributeId> {
        if self.is_collection {
            self.attribute_id
        } else {
            None
        }
    }
}

/// Child of a section: a question set, or a question placed directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionEntity {
    Set(QuestionSet),
    Leaf(Question),
}

impl QuestionEntity {
    pub fn order(&self) -> i64 {
        match self {
            Self::Set(set) => set.order,
            Self::Leaf(question) => question.order,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Self::Set(set) => set.id,
            Self::Leaf(question) => question.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub order: i64,
    pub title: LocalizedText,
    pub entities: Vec<QuestionEntity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub id: CatalogId,
    pub key: String,
    pub title: LocalizedText,
    pub sections: Vec<Section>,
}

impl Catalog {
    /// Sorts every level by `order ASC, id ASC`.
    pub fn sort_in_place(&mut self) {
        self.sections
            .sort_by(|a, b| a.order.cmp(&b.order).then(a.id.cmp(&b.id)));
        for section in &mut self.sections {
            section
                .entities
                .sort_by(|a, b| a.order().cmp(&b.order()).then(a.id().cmp(&b.id())));
            for entity in &mut section.entities {
                match entity {
                    QuestionEntity::Set(set) => {
                        set.questions
                            .sort_by(|a, b| a.order.cmp(&b.order).then(a.id.cmp(&b.id)));
                        for question in &mut set.questions {
                            sort_options(question);
                        }
                    }
                    QuestionEntity::Leaf(question) => sort_options(question),
                }
            }
        }
    }

    /// Iterates every question in walk order.
    pub fn questions(&self) -> impl Iterator<Item = &Question> + '_ {
        self.sections
            .iter()
            .flat_map(|section| section.entities.iter())
            .flat_map(|entity| match entity {
                QuestionEntity::Set(set) => set.questions.iter().collect::<Vec<_>>(),
                QuestionEntity::Leaf(question) => vec![question],
            })
    }

    /// Builds an option lookup across all questions.
    pub fn option_index(&self) -> HashMap<OptionId, &AnswerOption> {
        self.questions()
            .flat_map(|question| question.options.iter())
            .map(|option| (option.id, option))
            .collect()
    }
}

fn sort_options(question: &mut Question) {
    question
        .options
        .sort_by(|a, b| a.order.cmp(&b.order).then(a.id.cmp(&b.id)));
}
