//! Type taxonomy over instance-of/subclass-of

use std::collections::HashSet;

use super::vocab::{ADMINISTRATIVE_ENTITY, HUMAN_SETTLEMENT, INSTANCE_OF, QUARTER, SUBCLASS_OF};
use super::{ItemId, KnowledgeBase, PlaceClassifier, closure};

/// Classifies items by walking `instance of` and then `subclass of` upwards until
/// one of a fixed set of types is reached
pub struct TypeTaxonomy<'a> {
    kb: &'a dyn KnowledgeBase,
    types: Vec<ItemId>,
    type_set: HashSet<ItemId>,
    max_items: usize,
}

impl<'a> TypeTaxonomy<'a> {
    /// Create a taxonomy for the given types; earlier types win when several match
    pub fn new(kb: &'a dyn KnowledgeBase, types: &[&str], max_items: usize) -> Self {
        let types: Vec<ItemId> = types.iter().map(|t| kb.resolve(&ItemId::from(*t))).collect();
        let type_set = types.iter().cloned().collect();
        Self {
            kb,
            types,
            type_set,
            max_items,
        }
    }

    /// Settlements, administrative areas and quarters
    pub fn places(kb: &'a dyn KnowledgeBase, max_items: usize) -> Self {
        Self::new(kb, &[HUMAN_SETTLEMENT, ADMINISTRATIVE_ENTITY, QUARTER], max_items)
    }
}

impl PlaceClassifier for TypeTaxonomy<'_> {
    fn classify(&self, item: &ItemId) -> Option<ItemId> {
        let item = self.kb.lookup(item)?;
        let mut reached = HashSet::new();

        for class in item.links(INSTANCE_OF) {
            for ancestor in closure(self.kb, class, SUBCLASS_OF, self.max_items) {
                if self.type_set.contains(&ancestor) {
                    reached.insert(ancestor);
                }
            }
        }

        self.types.iter().find(|t| reached.contains(*t)).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kb::{Item, MemoryKnowledgeBase};

    fn taxonomy_kb() -> MemoryKnowledgeBase {
        MemoryKnowledgeBase::from_items(vec![
            // city -> big city -> human settlement
            Item::new("Q515").with_link(SUBCLASS_OF, "Q486972"),
            Item::new("Q1549591").with_link(SUBCLASS_OF, "Q515"),
            Item::new("Q486972"),
            Item::new("Q56061"),
            Item::new("Q2983893"),
            Item::new("Q84").with_link(INSTANCE_OF, "Q1549591"),
            Item::new("Q4830453").with_name("business"),
            Item::new("Q95").with_link(INSTANCE_OF, "Q4830453"),
        ])
        .unwrap()
    }

    #[test]
    fn test_classifies_through_subclass_chain() {
        let kb = taxonomy_kb();
        let taxonomy = TypeTaxonomy::places(&kb, 1000);
        assert_eq!(
            taxonomy.classify(&ItemId::from("Q84")),
            Some(ItemId::from(HUMAN_SETTLEMENT))
        );
    }

    #[test]
    fn test_unrelated_item_is_unclassified() {
        let kb = taxonomy_kb();
        let taxonomy = TypeTaxonomy::places(&kb, 1000);
        assert_eq!(taxonomy.classify(&ItemId::from("Q95")), None);
        assert_eq!(taxonomy.classify(&ItemId::from("Q404")), None);
    }

    #[test]
    fn test_subclass_cycle_terminates() {
        let kb = MemoryKnowledgeBase::from_items(vec![
            Item::new("C1").with_link(SUBCLASS_OF, "C2"),
            Item::new("C2").with_link(SUBCLASS_OF, "C1"),
            Item::new("X").with_link(INSTANCE_OF, "C1"),
        ])
        .unwrap();
        let taxonomy = TypeTaxonomy::places(&kb, 1000);
        assert_eq!(taxonomy.classify(&ItemId::from("X")), None);
    }
}
