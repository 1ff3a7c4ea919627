//! Answer rendering for one attribute and set index.
//!
//! # Responsibility
//! - Collect the values of one question at one set index in collection order.
//! - Render each value to display text in an explicitly chosen locale.
//!
//! # Invariants
//! - Missing values yield an empty list, never an error.
//! - Output order is ascending `collection_index`.
//! - Yes/no values must be stored as `1|0|true|false`; anything else fails.
//! - Blank renderings are dropped.
//! - Options resolve by id regardless of which question offers them; an
//!   option that resolves nowhere drops that one answer.

use crate::answers::index::ValueIndex;
use crate::answers::{AnswerError, AnswerResult};
use crate::model::catalog::{AnswerOption, Catalog, OptionId, Question, WidgetType};
use crate::model::domain::{Attribute, DomainTree, ValueType};
use crate::model::locale::Locale;
use crate::model::value::{Value, ValuePayload};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static ISO_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})").expect("valid iso date regex"));

/// Renders stored values for one locale.
pub struct AnswerFormatter<'a> {
    domain: &'a DomainTree,
    options: HashMap<OptionId, &'a AnswerOption>,
    locale: Locale,
}

impl<'a> AnswerFormatter<'a> {
    /// Creates a formatter resolving options from `catalog`, if any.
    pub fn new(catalog: Option<&'a Catalog>, domain: &'a DomainTree, locale: Locale) -> Self {
        Self {
            domain,
            options: catalog.map(Catalog::option_index).unwrap_or_default(),
            locale,
        }
    }

    /// Adds options referenced outside `catalog`, such as those of a
    /// catalog the project used before.
    pub fn with_options(mut self, options: &'a [AnswerOption]) -> Self {
        for option in options {
            self.options.entry(option.id).or_insert(option);
        }
        self
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn domain(&self) -> &'a DomainTree {
        self.domain
    }

    /// Rendered answers of `question` at `set_index`, in collection order.
    pub fn answers(
        &self,
        index: &ValueIndex<'_>,
        question: &Question,
        set_index: u32,
    ) -> AnswerResult<Vec<String>> {
        let Some(collection) = index.collection(question.attribute_id, set_index) else {
            return Ok(Vec::new());
        };

        let mut answers = Vec::with_capacity(collection.len());
        for value in collection.values() {
            let rendered = self.render(question, value)?;
            if !rendered.trim().is_empty() {
                answers.push(rendered);
            }
        }
        Ok(answers)
    }

    /// Renders one value as it would answer `question`.
    pub fn render(&self, question: &Question, value: &Value) -> AnswerResult<String> {
        let attribute = value.attribute_id.and_then(|id| self.domain.get(id));

        match &value.payload {
            ValuePayload::Option { option_id, text } => {
                let Some(option) = self.options.get(option_id) else {
                    warn!(
                        "event=answer_render module=answers status=unknown_option value={} option={}",
                        value.id, option_id
                    );
                    return Ok(String::new());
                };
                let label = option.text.get(self.locale);
                match text.as_deref().map(str::trim) {
                    Some(extra) if option.additional_input && !extra.is_empty() => {
                        Ok(format!("{label}: {extra}"))
                    }
                    _ => Ok(label.to_string()),
                }
            }
            ValuePayload::Text { text } => {
                if text.trim().is_empty() {
                    return Ok(String::new());
                }
                if is_yes_no(question, attribute) {
                    return self.yes_no_label(text, value);
                }
                let rendered = match attribute.map(|attribute| attribute.value_type) {
                    Some(ValueType::Datetime) => self.format_date(text),
                    _ => text.clone(),
                };
                Ok(with_unit(rendered, attribute.and_then(|a| a.unit.as_deref())))
            }
            ValuePayload::Quantity { amount, unit } => {
                let unit = unit
                    .as_deref()
                    .or_else(|| attribute.and_then(|a| a.unit.as_deref()));
                Ok(with_unit(format_amount(*amount), unit))
            }
            ValuePayload::File { name } => Ok(name.clone()),
        }
    }

    fn yes_no_label(&self, text: &str, value: &Value) -> AnswerResult<String> {
        match text.trim().to_ascii_lowercase().as_str() {
            "1" | "true" => Ok(self.locale.yes_label().to_string()),
            "0" | "false" => Ok(self.locale.no_label().to_string()),
            _ => Err(AnswerError::InvalidBooleanValue {
                value_id: value.id,
                text: text.to_string(),
            }),
        }
    }

    fn format_date(&self, text: &str) -> String {
        match (self.locale, ISO_DATE_RE.captures(text)) {
            (Locale::De, Some(caps)) => format!("{}.{}.{}", &caps[3], &caps[2], &caps[1]),
            _ => text.to_string(),
        }
    }
}

fn is_yes_no(question: &Question, attribute: Option<&Attribute>) -> bool {
    question.widget_type == WidgetType::YesNo
        || attribute.is_some_and(|attribute| attribute.value_type == ValueType::Boolean)
}

fn with_unit(rendered: String, unit: Option<&str>) -> String {
    match unit.map(str::trim) {
        Some(unit) if !unit.is_empty() && !rendered.is_empty() => format!("{rendered} {unit}"),
        _ => rendered,
    }
}

pub(crate) fn format_amount(amount: f64) -> String {
    if amount.is_finite() && amount.fract() == 0.0 && amount.abs() < 1e15 {
        format!("{amount:.0}")
    } else {
        amount.to_string()
    }
}
