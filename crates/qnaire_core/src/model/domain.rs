//! Domain attribute tree.
//!
//! # Responsibility
//! - Define the typed attributes that values answer.
//! - Hold an eagerly loaded arena of attributes with parent/child indices.
//!
//! # Invariants
//! - Attribute keys are non-blank and never contain `/`.
//! - `key == "id"` marks the attribute labelling instances of a repeatable set.
//! - A missing parent is tolerated: the attribute behaves like a root for
//!   path building and has no parent for label grouping.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for one domain attribute.
pub type AttributeId = Uuid;

/// Attribute key convention for repeatable-set labels.
pub const SET_LABEL_KEY: &str = "id";

/// Declared value type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Text,
    Url,
    Integer,
    Float,
    Boolean,
    Datetime,
    Option,
    File,
}

impl ValueType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Url => "url",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Datetime => "datetime",
            Self::Option => "option",
            Self::File => "file",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(Self::Text),
            "url" => Some(Self::Url),
            "integer" => Some(Self::Integer),
            "float" => Some(Self::Float),
            "boolean" => Some(Self::Boolean),
            "datetime" => Some(Self::Datetime),
            "option" => Some(Self::Option),
            "file" => Some(Self::File),
            _ => None,
        }
    }
}

/// Node of the domain tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: AttributeId,
    /// `None` for root attributes.
    pub parent_id: Option<AttributeId>,
    /// Unique within its parent.
    pub key: String,
    pub value_type: ValueType,
    /// Unit appended to rendered numeric answers, e.g. `GB`.
    pub unit: Option<String>,
    /// Whether the attribute may repeat within one set.
    pub is_collection: bool,
}

/// Validation failures for attribute writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValidationError {
    NilId,
    BlankKey,
    KeyContainsSlash(String),
    SelfParent(AttributeId),
}

impl Display for AttributeValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "attribute id must not be nil"),
            Self::BlankKey => write!(f, "attribute key must not be blank"),
            Self::KeyContainsSlash(key) => {
                write!(f, "attribute key `{key}` must not contain `/`")
            }
            Self::SelfParent(id) => write!(f, "attribute {id} cannot be its own parent"),
        }
    }
}

impl Error for AttributeValidationError {}

impl Attribute {
    /// Creates a non-collection attribute with a generated id.
    pub fn new(parent_id: Option<AttributeId>, key: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id,
            key: key.into(),
            value_type,
            unit: None,
            is_collection: false,
        }
    }

    /// Returns whether this attribute labels instances of its parent set.
    pub fn is_set_label(&self) -> bool {
        self.key == SET_LABEL_KEY
    }

    pub fn validate(&self) -> Result<(), AttributeValidationError> {
        if self.id.is_nil() {
            return Err(AttributeValidationError::NilId);
        }
        if self.key.trim().is_empty() {
            return Err(AttributeValidationError::BlankKey);
        }
        if self.key.contains('/') {
            return Err(AttributeValidationError::KeyContainsSlash(self.key.clone()));
        }
        if self.parent_id == Some(self.id) {
            return Err(AttributeValidationError::SelfParent(self.id));
        }
        Ok(())
    }
}

/// Arena of attributes with parent/child index arrays.
///
/// Children are kept sorted by `key ASC, id ASC` so traversal is deterministic.
#[derive(Debug, Clone, Default)]
pub struct DomainTree {
    nodes: Vec<Attribute>,
    by_id: HashMap<AttributeId, usize>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
}

impl DomainTree {
    /// Builds the arena from a flat attribute list.
    ///
    /// Attributes whose parent is not part of the list are treated as roots.
    pub fn from_attributes(attributes: Vec<Attribute>) -> Self {
        let mut nodes = attributes;
        nodes.sort_by(|a, b| a.key.cmp(&b.key).then(a.id.cmp(&b.id)));

        let by_id: HashMap<AttributeId, usize> = nodes
            .iter()
            .enumerate()
            .map(|(index, attribute)| (attribute.id, index))
            .collect();

        let mut children = vec![Vec::new(); nodes.len()];
        let mut roots = Vec::new();
        for (index, attribute) in nodes.iter().enumerate() {
            match attribute.parent_id.and_then(|parent| by_id.get(&parent)) {
                Some(&parent_index) if parent_index != index => children[parent_index].push(index),
                _ => roots.push(index),
            }
        }

        Self {
            nodes,
            by_id,
            children,
            roots,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: AttributeId) -> Option<&Attribute> {
        self.by_id.get(&id).map(|&index| &self.nodes[index])
    }

    /// Returns the parent attribute when it is declared and still present.
    pub fn parent(&self, id: AttributeId) -> Option<&Attribute> {
        self.get(id)?.parent_id.and_then(|parent| self.get(parent))
    }

    fn children(&self, id: AttributeId) -> impl Iterator<Item = &Attribute> + '_ {
        let indices = self
            .by_id
            .get(&id)
            .map(|&index| self.children[index].as_slice())
            .unwrap_or_default();
        indices.iter().map(|&index| &self.nodes[index])
    }

    fn roots(&self) -> impl Iterator<Item = &Attribute> + '_ {
        self.roots.iter().map(|&index| &self.nodes[index])
    }

    /// Slash-joined key path from the root, e.g. `project/dataset/id`.
    ///
    /// Returns `None` for unknown attributes.
    pub fn path(&self, id: AttributeId) -> Option<String> {
        let mut keys = Vec::new();
        let mut visited = HashSet::new();
        let mut cursor = self.get(id);
        while let Some(attribute) = cursor {
            if !visited.insert(attribute.id) {
                break;
            }
            keys.push(attribute.key.as_str());
            cursor = attribute.parent_id.and_then(|parent| self.get(parent));
        }
        if keys.is_empty() {
            return None;
        }
        keys.reverse();
        Some(keys.join("/"))
    }

    /// Finds an attribute by its full path, descending from the roots.
    pub fn find_by_path(&self, path: &str) -> Option<&Attribute> {
        let mut keys = path.split('/');
        let first = keys.next()?;
        let mut cursor = self.roots().find(|attribute| attribute.key == first)?;
        for key in keys {
            cursor = self.children(cursor.id).find(|child| child.key == key)?;
        }
        Some(cursor)
    }
}
