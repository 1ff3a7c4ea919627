//! Project, snapshot and value records.
//!
//! # Responsibility
//! - Define the atomic answer record and its payload variants.
//! - Define projects and their immutable snapshots.
//!
//! # Invariants
//! - `(attribute_id, set_index, collection_index)` is unique per
//!   `(project_id, snapshot_id)` scope; storage enforces it.
//! - `snapshot_id = None` denotes live values.
//! - Exactly one payload variant is populated per value.

use crate::model::catalog::{CatalogId, OptionId};
use crate::model::domain::AttributeId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ProjectId = Uuid;
pub type SnapshotId = Uuid;
pub type ValueId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub title: String,
    /// `None` when no catalog was assigned yet.
    pub catalog_id: Option<CatalogId>,
}

impl Project {
    pub fn new(title: impl Into<String>, catalog_id: Option<CatalogId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            catalog_id,
        }
    }
}

/// Immutable point-in-time copy of a project's values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: SnapshotId,
    pub project_id: ProjectId,
    pub title: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

/// Stored answer content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValuePayload {
    /// Free text, also used for yes/no keys (`"1"`/`"0"`) and dates.
    Text { text: String },
    /// Selected option, with optional free text typed next to it.
    Option {
        option_id: OptionId,
        text: Option<String>,
    },
    /// Number with optional unit override.
    Quantity { amount: f64, unit: Option<String> },
    /// Uploaded file reference.
    File { name: String },
}

impl ValuePayload {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Raw text of this payload, if it carries any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text.as_str()),
            Self::Option { text, .. } => text.as_deref(),
            Self::Quantity { .. } | Self::File { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    pub id: ValueId,
    pub project_id: ProjectId,
    pub snapshot_id: Option<SnapshotId>,
    /// `None` when the attribute was removed after the value was recorded.
    pub attribute_id: Option<AttributeId>,
    pub set_index: u32,
    pub collection_index: u32,
    pub payload: ValuePayload,
}

impl Value {
    /// Creates a live value at `set_index`/`collection_index`.
    pub fn new(
        project_id: ProjectId,
        attribute_id: AttributeId,
        set_index: u32,
        collection_index: u32,
        payload: ValuePayload,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            snapshot_id: None,
            attribute_id: Some(attribute_id),
            set_index,
            collection_index,
            payload,
        }
    }

    /// Shorthand for a live text value.
    pub fn text(
        project_id: ProjectId,
        attribute_id: AttributeId,
        set_index: u32,
        collection_index: u32,
        text: impl Into<String>,
    ) -> Self {
        Self::new(
            project_id,
            attribute_id,
            set_index,
            collection_index,
            ValuePayload::text(text),
        )
    }
}
