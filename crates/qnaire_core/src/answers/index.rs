//! In-memory lookup over one scope's values.
//!
//! # Responsibility
//! - Index values by `attribute -> set_index -> collection_index`.
//! - Collect repeatable-set labels by the label attribute's parent.
//!
//! # Invariants
//! - Values without an attribute reference never participate.
//! - Collection indices iterate in ascending order.
//! - Label order is first-discovery order; a later label for the same set
//!   index replaces the text but keeps the position.
//! - Label values whose attribute or parent is unknown are skipped.

use crate::model::domain::{AttributeId, DomainTree};
use crate::model::value::Value;
use log::debug;
use std::collections::{BTreeMap, HashMap};

/// Values of one attribute at one set index, keyed by collection index.
pub type CollectionValues<'v> = BTreeMap<u32, &'v Value>;

/// Ordered `set_index -> label` pairs for one repeatable set attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetLabels {
    entries: Vec<(u32, String)>,
}

impl SetLabels {
    fn insert(&mut self, set_index: u32, label: String) {
        match self.entries.iter_mut().find(|(index, _)| *index == set_index) {
            Some(entry) => entry.1 = label,
            None => self.entries.push((set_index, label)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> + '_ {
        self.entries
            .iter()
            .map(|(index, label)| (*index, label.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lookup structure built once per `(project, snapshot)` report.
#[derive(Debug, Default)]
pub struct ValueIndex<'v> {
    values_by_id: HashMap<AttributeId, HashMap<u32, CollectionValues<'v>>>,
    labels_by_parent: HashMap<AttributeId, SetLabels>,
    indexed: usize,
}

impl<'v> ValueIndex<'v> {
    /// Builds both indices in one pass.
    pub fn build<I>(values: I, domain: &DomainTree) -> Self
    where
        I: IntoIterator<Item = &'v Value>,
    {
        let mut index = Self::default();
        let mut skipped_labels = 0_usize;

        for value in values {
            let Some(attribute_id) = value.attribute_id else {
                continue;
            };

            index
                .values_by_id
                .entry(attribute_id)
                .or_default()
                .entry(value.set_index)
                .or_default()
                .insert(value.collection_index, value);
            index.indexed += 1;

            let Some(attribute) = domain.get(attribute_id) else {
                continue;
            };
            if !attribute.is_set_label() {
                continue;
            }
            match domain.parent(attribute_id) {
                Some(parent) => {
                    let label = value.payload.as_text().unwrap_or_default().to_string();
                    index
                        .labels_by_parent
                        .entry(parent.id)
                        .or_default()
                        .insert(value.set_index, label);
                }
                None => skipped_labels += 1,
            }
        }

        debug!(
            "event=value_index module=answers status=ok values={} attributes={} label_sets={} skipped_labels={}",
            index.indexed,
            index.values_by_id.len(),
            index.labels_by_parent.len(),
            skipped_labels
        );
        index
    }

    /// Values at `attribute_id`/`set_index`, or `None` when nothing was recorded.
    pub fn collection(
        &self,
        attribute_id: AttributeId,
        set_index: u32,
    ) -> Option<&CollectionValues<'v>> {
        self.values_by_id.get(&attribute_id)?.get(&set_index)
    }

    /// Set labels recorded under a repeatable set attribute.
    pub fn labels(&self, parent_id: AttributeId) -> Option<&SetLabels> {
        self.labels_by_parent.get(&parent_id)
    }

    /// All values of one attribute across set and collection indices,
    /// ordered by `(set_index, collection_index)`.
    pub fn values_for(&self, attribute_id: AttributeId) -> Vec<&'v Value> {
        let Some(sets) = self.values_by_id.get(&attribute_id) else {
            return Vec::new();
        };
        let mut set_indices: Vec<u32> = sets.keys().copied().collect();
        set_indices.sort_unstable();
        set_indices
            .into_iter()
            .flat_map(|set_index| sets[&set_index].values().copied())
            .collect()
    }

    /// Number of values that entered the index.
    pub fn len(&self) -> usize {
        self.indexed
    }

    pub fn is_empty(&self) -> bool {
        self.indexed == 0
    }
}
