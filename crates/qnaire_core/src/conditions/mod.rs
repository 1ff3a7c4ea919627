//! Condition rules and task activation.
//!
//! # Responsibility
//! - Compare a snapshot's values of one source attribute against a target.
//! - Decide which guidance tasks are active for a value scope.
//!
//! # Invariants
//! - A condition holds when any source value satisfies the relation, except
//!   `empty`/`notempty` which look at the whole value list.
//! - Ordering relations compare numerically; unparsable sides never match.
//! - A task without conditions is always active.

use crate::answers::format::format_amount;
use crate::answers::index::ValueIndex;
use crate::model::catalog::OptionId;
use crate::model::domain::AttributeId;
use crate::model::locale::LocalizedText;
use crate::model::value::{Value, ValuePayload};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub type ConditionId = Uuid;
pub type TaskId = Uuid;

/// Comparison applied between stored values and a condition target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    Eq,
    Neq,
    Contains,
    Gt,
    Gte,
    Lt,
    Lte,
    Empty,
    NotEmpty,
}

impl Relation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Contains => "contains",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Empty => "empty",
            Self::NotEmpty => "notempty",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "eq" => Some(Self::Eq),
            "neq" => Some(Self::Neq),
            "contains" => Some(Self::Contains),
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            "empty" => Some(Self::Empty),
            "notempty" => Some(Self::NotEmpty),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub id: ConditionId,
    pub key: String,
    /// Attribute whose values are tested.
    pub source_id: AttributeId,
    pub relation: Relation,
    pub target_text: Option<String>,
    /// When set, equality compares selected options instead of text.
    pub target_option_id: Option<OptionId>,
}

impl Condition {
    pub fn new(
        key: impl Into<String>,
        source_id: AttributeId,
        relation: Relation,
        target_text: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            key: key.into(),
            source_id,
            relation,
            target_text,
            target_option_id: None,
        }
    }

    /// Evaluates this condition against an indexed value scope.
    pub fn resolve(&self, index: &ValueIndex<'_>) -> bool {
        let values = index.values_for(self.source_id);
        match self.relation {
            Relation::Empty => values.iter().all(|value| is_blank(value)),
            Relation::NotEmpty => values.iter().any(|value| !is_blank(value)),
            _ => values.iter().any(|value| self.matches(value)),
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self.relation {
            Relation::Eq => self.equals(value),
            Relation::Neq => !self.equals(value),
            Relation::Contains => match (self.target_text.as_deref(), comparable_text(value)) {
                (Some(target), Some(text)) => text.contains(target),
                _ => false,
            },
            Relation::Gt => self.compare(value, |left, right| left > right),
            Relation::Gte => self.compare(value, |left, right| left >= right),
            Relation::Lt => self.compare(value, |left, right| left < right),
            Relation::Lte => self.compare(value, |left, right| left <= right),
            Relation::Empty | Relation::NotEmpty => false,
        }
    }

    fn equals(&self, value: &Value) -> bool {
        if let Some(target_option) = self.target_option_id {
            return matches!(
                value.payload,
                ValuePayload::Option { option_id, .. } if option_id == target_option
            );
        }
        match (self.target_text.as_deref(), comparable_text(value)) {
            (Some(target), Some(text)) => text == target,
            _ => false,
        }
    }

    fn compare(&self, value: &Value, relation: impl Fn(f64, f64) -> bool) -> bool {
        let Some(target) = self
            .target_text
            .as_deref()
            .and_then(|text| text.trim().parse::<f64>().ok())
        else {
            return false;
        };
        let stored = match &value.payload {
            ValuePayload::Quantity { amount, .. } => Some(*amount),
            payload => payload
                .as_text()
                .and_then(|text| text.trim().parse::<f64>().ok()),
        };
        stored.is_some_and(|stored| relation(stored, target))
    }
}

/// Guidance item shown when its conditions hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub key: String,
    pub title: LocalizedText,
    pub text: LocalizedText,
    pub condition_ids: Vec<ConditionId>,
}

impl Task {
    /// Active when unconditioned, or when any known condition holds.
    pub fn is_active(
        &self,
        conditions: &HashMap<ConditionId, Condition>,
        index: &ValueIndex<'_>,
    ) -> bool {
        if self.condition_ids.is_empty() {
            return true;
        }
        self.condition_ids
            .iter()
            .filter_map(|id| conditions.get(id))
            .any(|condition| condition.resolve(index))
    }
}

/// Filters `tasks` down to the active ones, keeping input order.
pub fn active_tasks<'t>(
    tasks: &'t [Task],
    conditions: &[Condition],
    index: &ValueIndex<'_>,
) -> Vec<&'t Task> {
    let by_id: HashMap<ConditionId, Condition> = conditions
        .iter()
        .map(|condition| (condition.id, condition.clone()))
        .collect();
    tasks
        .iter()
        .filter(|task| task.is_active(&by_id, index))
        .collect()
}

fn comparable_text(value: &Value) -> Option<String> {
    match &value.payload {
        ValuePayload::Text { text } => Some(text.clone()),
        ValuePayload::Option { text, .. } => text.clone(),
        ValuePayload::Quantity { amount, .. } => Some(format_amount(*amount)),
        ValuePayload::File { name } => Some(name.clone()),
    }
}

fn is_blank(value: &Value) -> bool {
    match &value.payload {
        ValuePayload::Text { text } => text.trim().is_empty(),
        ValuePayload::File { name } => name.trim().is_empty(),
        ValuePayload::Option { .. } | ValuePayload::Quantity { .. } => false,
    }
}
