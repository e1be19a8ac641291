//! In-memory knowledge base loaded from a JSON-lines export

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::{Item, ItemId, KnowledgeBase};
use crate::error::KbError;

/// Redirect chains longer than this are treated as broken
const MAX_REDIRECT_HOPS: usize = 16;

/// Knowledge base held entirely in memory
///
/// Items are iterated in insertion order. Items with `redirect` set are not part of
/// the iteration; they only take part in [`KnowledgeBase::resolve`].
#[derive(Debug, Default)]
pub struct MemoryKnowledgeBase {
    items: Vec<Item>,
    by_id: HashMap<ItemId, usize>,
    redirects: HashMap<ItemId, ItemId>,
}

impl MemoryKnowledgeBase {
    /// Build from a list of items
    pub fn from_items(items: Vec<Item>) -> Result<Self, KbError> {
        let mut kb = Self::default();
        for item in items {
            kb.insert(item)?;
        }
        Ok(kb)
    }

    /// Load a JSON-lines file with one item per line
    pub fn load(path: &Path) -> Result<Self, KbError> {
        let file = File::open(path).map_err(|source| KbError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = BufReader::new(file);
        let mut kb = Self::default();

        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| KbError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let item: Item = serde_json::from_str(trimmed).map_err(|source| KbError::Json {
                path: path.to_path_buf(),
                line: index + 1,
                source,
            })?;
            kb.insert(item)?;
        }

        tracing::info!(
            path = %path.display(),
            items = kb.items.len(),
            redirects = kb.redirects.len(),
            "Knowledge base loaded"
        );
        Ok(kb)
    }

    /// Add an item
    pub fn insert(&mut self, item: Item) -> Result<(), KbError> {
        if self.by_id.contains_key(&item.id) || self.redirects.contains_key(&item.id) {
            return Err(KbError::DuplicateItem(item.id.to_string()));
        }
        if let Some(target) = item.redirect {
            self.redirects.insert(item.id, target);
        } else {
            self.by_id.insert(item.id.clone(), self.items.len());
            self.items.push(item);
        }
        Ok(())
    }

    /// Number of items, excluding redirects
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl KnowledgeBase for MemoryKnowledgeBase {
    fn get(&self, id: &ItemId) -> Option<&Item> {
        self.by_id.get(id).map(|&index| &self.items[index])
    }

    fn items(&self) -> Box<dyn Iterator<Item = &Item> + '_> {
        Box::new(self.items.iter())
    }

    fn resolve(&self, id: &ItemId) -> ItemId {
        let mut current = id;
        for _ in 0..MAX_REDIRECT_HOPS {
            match self.redirects.get(current) {
                Some(target) => current = target,
                None => break,
            }
        }
        current.clone()
    }
}
