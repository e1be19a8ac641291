//! Name and alias table

use std::collections::HashMap;

use super::{AliasLookup, ItemId, KnowledgeBase};

/// Case- and whitespace-insensitive table from names to items
///
/// Candidates for a name are returned in the order they were added, each item at most
/// once.
#[derive(Debug, Default)]
pub struct AliasIndex {
    phrases: HashMap<String, Vec<ItemId>>,
}

impl AliasIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the name and aliases of every item in the knowledge base
    pub fn from_kb(kb: &dyn KnowledgeBase) -> Self {
        let mut index = Self::new();
        for item in kb.items() {
            if let Some(name) = &item.name {
                index.add(name, &item.id);
            }
            for alias in &item.aliases {
                index.add(alias, &item.id);
            }
        }
        tracing::debug!(phrases = index.phrases.len(), "Alias index built");
        index
    }

    /// Add a phrase for an item
    pub fn add(&mut self, phrase: &str, item: &ItemId) {
        let key = normalize(phrase);
        if key.is_empty() {
            return;
        }
        let candidates = self.phrases.entry(key).or_default();
        if !candidates.contains(item) {
            candidates.push(item.clone());
        }
    }

    /// Number of distinct phrases
    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}

impl AliasLookup for AliasIndex {
    fn lookup(&self, name: &str) -> Vec<ItemId> {
        self.phrases.get(&normalize(name)).cloned().unwrap_or_default()
    }
}

/// Lowercase and collapse runs of whitespace
fn normalize(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
