//! Small geography shared by unit tests

use super::vocab::{
    ADMINISTRATIVE_ENTITY, COUNTRY, COUNTRY_CODE, HUMAN_SETTLEMENT, INSTANCE_OF, LOCATED_IN,
    REGION_CODE, SUBCLASS_OF,
};
use super::{AliasIndex, Item, MemoryKnowledgeBase, TypeTaxonomy};
use crate::index::ReferenceIndex;
use crate::registry::{BusinessRegistries, Registry, Transform, TransformKey};

/// United Kingdom, Canada and the United States with a few cities
///
/// "London" names three items in this order: a person, London (Ontario) and London
/// (England).
pub(crate) fn places_kb() -> MemoryKnowledgeBase {
    MemoryKnowledgeBase::from_items(vec![
        Item::new(HUMAN_SETTLEMENT).with_name("human settlement"),
        Item::new(ADMINISTRATIVE_ENTITY).with_name("administrative territorial entity"),
        Item::new("Q515").with_name("city").with_link(SUBCLASS_OF, HUMAN_SETTLEMENT),
        Item::new("Q5119").with_name("capital").with_link(SUBCLASS_OF, "Q515"),
        Item::new("Q10864048")
            .with_name("first-level administrative division")
            .with_link(SUBCLASS_OF, ADMINISTRATIVE_ENTITY),
        Item::new("Q5").with_name("human"),
        Item::new("Q145").with_name("United Kingdom").with_value(COUNTRY_CODE, "GB"),
        Item::new("Q21")
            .with_name("England")
            .with_link(INSTANCE_OF, "Q10864048")
            .with_link(LOCATED_IN, "Q145"),
        Item::new("Q23306")
            .with_name("Greater London")
            .with_link(INSTANCE_OF, "Q10864048")
            .with_link(LOCATED_IN, "Q21"),
        Item::new("Q16").with_name("Canada").with_value(COUNTRY_CODE, "CA"),
        Item::new("Q1904")
            .with_name("Ontario")
            .with_value(REGION_CODE, "CA-ON")
            .with_link(INSTANCE_OF, "Q10864048")
            .with_link(LOCATED_IN, "Q16")
            .with_link(COUNTRY, "Q16"),
        Item::new("Q30").with_name("United States").with_value(COUNTRY_CODE, "US"),
        Item::new("Q1393")
            .with_name("Delaware")
            .with_value(REGION_CODE, "US-DE")
            .with_link(INSTANCE_OF, "Q10864048")
            .with_link(LOCATED_IN, "Q30")
            .with_link(COUNTRY, "Q30"),
        Item::new("Q1055")
            .with_name("Wilmington")
            .with_link(INSTANCE_OF, "Q515")
            .with_link(LOCATED_IN, "Q1393"),
        Item::new("Q45765").with_name("London").with_link(INSTANCE_OF, "Q5"),
        Item::new("Q92561")
            .with_name("London")
            .with_link(INSTANCE_OF, "Q515")
            .with_link(LOCATED_IN, "Q1904"),
        Item::new("Q84")
            .with_name("London")
            .with_alias("City of London")
            .with_link(INSTANCE_OF, "Q5119")
            .with_link(LOCATED_IN, "Q23306"),
    ])
    .expect("fixture items are unique")
}

/// Companies House with an OpenCorporates mapping
pub(crate) fn registries() -> BusinessRegistries {
    let mut companies_house = Registry::new("RA000585");
    companies_house.name = Some("Companies House".into());
    companies_house.company_property = Some("P2622".into());
    companies_house.opencorporates_jurisdiction = Some("gb".into());
    companies_house.transform = vec![Transform(TransformKey::Position(0), "0".into())];
    BusinessRegistries::new(vec![companies_house])
}

/// Knowledge base with its derived lookups
pub(crate) struct Fixture {
    pub kb: MemoryKnowledgeBase,
    pub aliases: AliasIndex,
    pub index: ReferenceIndex,
    pub registries: BusinessRegistries,
}

impl Fixture {
    pub fn new() -> Self {
        let kb = places_kb();
        let aliases = AliasIndex::from_kb(&kb);
        let registries = registries();
        let index = ReferenceIndex::build(&kb, &registries);
        Self {
            kb,
            aliases,
            index,
            registries,
        }
    }

    pub fn taxonomy(&self) -> TypeTaxonomy<'_> {
        TypeTaxonomy::places(&self.kb, 1000)
    }
}
