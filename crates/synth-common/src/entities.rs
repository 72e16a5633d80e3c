//! Value types passed between the NER provider, the merger and the renderer.
//! Every value here is owned by the extraction call that produced it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Raw model output
// ---------------------------------------------------------------------------

/// One token emitted by a NER model, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawToken {
    pub text: String,
    pub label: String,
    pub score: f32,
    /// Sub-word fragment that belongs to the preceding token.
    #[serde(default)]
    pub is_continuation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
}

impl RawToken {
    pub fn new(text: impl Into<String>, label: impl Into<String>, score: f32) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
            score,
            is_continuation: false,
            start: None,
            end: None,
        }
    }

    /// A sub-word fragment. `text` must already be free of the marker.
    pub fn continuation(text: impl Into<String>, label: impl Into<String>, score: f32) -> Self {
        Self { is_continuation: true, ..Self::new(text, label, score) }
    }

    /// Build a token from a WordPiece surface form such as `##betes`.
    /// Any leading `#` marks a continuation and is stripped.
    pub fn from_wordpiece(word: &str, label: impl Into<String>, score: f32) -> Self {
        let stripped = word.trim_start_matches('#');
        if stripped.len() != word.len() {
            Self::continuation(stripped, label, score)
        } else {
            Self::new(word, label, score)
        }
    }

    pub fn with_offsets(mut self, start: usize, end: usize) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A reassembled term with its bare category name (e.g. `Sign_symptom`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub term: String,
    #[serde(rename = "type")]
    pub entity_type: String,
}

impl Entity {
    pub fn new(term: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self { term: term.into(), entity_type: entity_type.into() }
    }

    /// Lowercased term, the identity used for deduplication and lookup.
    pub fn key(&self) -> String {
        self.term.to_lowercase()
    }
}

// ---------------------------------------------------------------------------
// EntityCollection
// ---------------------------------------------------------------------------

/// Entities in first-occurrence order, at most one per lowercase term.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Entity>", into = "Vec<Entity>")]
pub struct EntityCollection {
    entities: Vec<Entity>,
    index: HashMap<String, usize>,
}

impl EntityCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `entity` unless its lowercase term is already present.
    /// Returns whether it was added.
    pub fn push_unique(&mut self, entity: Entity) -> bool {
        let key = entity.key();
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key, self.entities.len());
        self.entities.push(entity);
        true
    }

    /// Case-insensitive lookup by term.
    pub fn find(&self, term: &str) -> Option<&Entity> {
        self.index
            .get(&term.to_lowercase())
            .map(|&i| &self.entities[i])
    }

    pub fn contains_term(&self, term: &str) -> bool {
        self.index.contains_key(&term.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.entities.iter()
    }

    pub fn as_slice(&self) -> &[Entity] {
        &self.entities
    }

    /// Terms in collection order.
    pub fn terms(&self) -> Vec<&str> {
        self.entities.iter().map(|e| e.term.as_str()).collect()
    }
}

impl From<Vec<Entity>> for EntityCollection {
    fn from(entities: Vec<Entity>) -> Self {
        entities.into_iter().collect()
    }
}

impl From<EntityCollection> for Vec<Entity> {
    fn from(collection: EntityCollection) -> Self {
        collection.entities
    }
}

impl FromIterator<Entity> for EntityCollection {
    fn from_iter<I: IntoIterator<Item = Entity>>(iter: I) -> Self {
        let mut collection = Self::new();
        for entity in iter {
            collection.push_unique(entity);
        }
        collection
    }
}

impl IntoIterator for EntityCollection {
    type Item = Entity;
    type IntoIter = std::vec::IntoIter<Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.into_iter()
    }
}

impl<'a> IntoIterator for &'a EntityCollection {
    type Item = &'a Entity;
    type IntoIter = std::slice::Iter<'a, Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.iter()
    }
}

// ---------------------------------------------------------------------------
// Rendering output
// ---------------------------------------------------------------------------

/// Source text with entity words marked, plus an HTML listing of the entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightResult {
    pub markup: String,
    pub listing: String,
}
