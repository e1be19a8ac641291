//! Entity builder
//!
//! Turns one extracted `LEIRecord` block into an [`OrganizationRecord`]. Data-quality
//! anomalies (unknown category, unknown registration authority) are tallied in a
//! run-scoped [`BuildStats`] that the caller owns and merges.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::address::{AddressResolver, coordinate_for};
use crate::error::BuildError;
use crate::extract::RawRecordBlock;
use crate::index::ReferenceIndex;
use crate::kb::vocab::{COUNTRY, LEGAL_FORM_PREFIX};
use crate::kb::{ItemId, KnowledgeBase};
use crate::models::{Address, EntityCategory, LegalName, Lei, OrganizationRecord, SiteAddress};
use crate::registry::RegistryCatalog;
use crate::xml::XmlElement;

/// Legal-form codes meaning "not applicable" or "not yet known"
const UNSPECIFIED_LEGAL_FORMS: [&str; 2] = ["8888", "9999"];

/// Registration authority code meaning "not applicable"
const NOT_APPLICABLE_AUTHORITY: &str = "RA888888";

/// Per-run tallies from entity building
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStats {
    /// Records turned into organizations
    pub built: usize,
    /// Records dropped because of a record-level error
    pub rejected: usize,
    /// Registration authority codes missing from the registry table
    pub unknown_authorities: BTreeMap<String, usize>,
    /// Entity category codes outside the known set
    pub unknown_categories: BTreeMap<String, usize>,
}

impl BuildStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add another accumulator's counts to this one
    pub fn merge(&mut self, other: BuildStats) {
        self.built += other.built;
        self.rejected += other.rejected;
        for (code, count) in other.unknown_authorities {
            *self.unknown_authorities.entry(code).or_default() += count;
        }
        for (code, count) in other.unknown_categories {
            *self.unknown_categories.entry(code).or_default() += count;
        }
    }

    pub fn unknown_authority_total(&self) -> usize {
        self.unknown_authorities.values().sum()
    }

    pub fn unknown_category_total(&self) -> usize {
        self.unknown_categories.values().sum()
    }
}

/// Builds organization records from parsed LEI records
pub struct EntityBuilder<'a> {
    kb: &'a dyn KnowledgeBase,
    index: &'a ReferenceIndex,
    catalog: &'a dyn RegistryCatalog,
    addresses: AddressResolver<'a>,
}

impl<'a> EntityBuilder<'a> {
    pub fn new(
        kb: &'a dyn KnowledgeBase,
        index: &'a ReferenceIndex,
        catalog: &'a dyn RegistryCatalog,
        addresses: AddressResolver<'a>,
    ) -> Self {
        Self {
            kb,
            index,
            catalog,
            addresses,
        }
    }

    /// Build a record, or count and log the failure and return `None`
    pub fn decode(&self, block: &RawRecordBlock, stats: &mut BuildStats) -> Option<OrganizationRecord> {
        match self.build(block, stats) {
            Ok(record) => {
                stats.built += 1;
                Some(record)
            }
            Err(e) => {
                warn!(line = block.line, error = %e, "Rejected record");
                stats.rejected += 1;
                None
            }
        }
    }

    /// Parse and build one record block
    pub fn build(
        &self,
        block: &RawRecordBlock,
        stats: &mut BuildStats,
    ) -> Result<OrganizationRecord, BuildError> {
        let root = XmlElement::parse(block.as_bytes())?;
        self.build_element(&root, stats)
    }

    /// Build from an already parsed `LEIRecord` element
    pub fn build_element(
        &self,
        record: &XmlElement,
        stats: &mut BuildStats,
    ) -> Result<OrganizationRecord, BuildError> {
        let lei = Lei::parse(record.child_text("LEI").ok_or(BuildError::MissingElement("LEI"))?)?;
        let entity = record.child("Entity").ok_or(BuildError::MissingElement("Entity"))?;
        let name = legal_name(entity).ok_or(BuildError::MissingElement("LegalName"))?;
        let mut organization = OrganizationRecord::new(lei, name);

        if let Some(code) = entity.child_text("EntityCategory") {
            organization.category = EntityCategory::parse(code);
            if organization.category.is_none() {
                *stats.unknown_categories.entry(code.to_string()).or_default() += 1;
            }
        }

        organization.address = self.site_address(record, entity, &organization.lei)?;

        if let Some(jurisdiction) = entity.child_text("LegalJurisdiction").map(str::trim) {
            self.apply_jurisdiction(&mut organization, jurisdiction);
        }

        organization.legal_form = entity
            .find(&["LegalForm", "EntityLegalFormCode"])
            .map(|code| code.text.trim())
            .filter(|code| !code.is_empty() && !UNSPECIFIED_LEGAL_FORMS.contains(code))
            .map(|code| ItemId::new(format!("{LEGAL_FORM_PREFIX}{code}")));

        if let Some(authority) = entity.child("RegistrationAuthority") {
            let auth_code = authority.child_text("RegistrationAuthorityID").map(str::trim);
            let entity_id = authority.child_text("RegistrationAuthorityEntityID");
            if let (Some(auth_code), Some(entity_id)) = (auth_code, entity_id) {
                if auth_code != NOT_APPLICABLE_AUTHORITY {
                    match self.index.registry(auth_code) {
                        Some(registry) => organization
                            .external_ids
                            .extend(self.catalog.company_ids(registry, entity_id)),
                        None => {
                            *stats.unknown_authorities.entry(auth_code.to_string()).or_default() +=
                                1;
                        }
                    }
                }
            }
        }

        Ok(organization)
    }

    /// Headquarters address when present, the legal address otherwise
    fn site_address(
        &self,
        record: &XmlElement,
        entity: &XmlElement,
        lei: &Lei,
    ) -> Result<Option<SiteAddress>, BuildError> {
        if let Some(block) = entity.child("HeadquartersAddress") {
            return Ok(Some(SiteAddress::Headquarters(self.address(record, block, lei)?)));
        }
        if let Some(block) = entity.child("LegalAddress") {
            return Ok(Some(SiteAddress::Legal(self.address(record, block, lei)?)));
        }
        Ok(None)
    }

    fn address(&self, record: &XmlElement, block: &XmlElement, lei: &Lei) -> Result<Address, BuildError> {
        let mut address = self.addresses.resolve(block).map_err(|source| BuildError::Address {
            lei: lei.to_string(),
            source,
        })?;
        address.coordinate = coordinate_for(record, block);
        Ok(address)
    }

    /// Country by exact code, else region with the region's own country
    fn apply_jurisdiction(&self, organization: &mut OrganizationRecord, code: &str) {
        if let Some(country) = self.index.country(code) {
            organization.country = Some(country.clone());
        } else if let Some(region) = self.index.region(code) {
            organization.location_of_creation = Some(region.clone());
            organization.country = self
                .kb
                .lookup(region)
                .and_then(|item| item.link(COUNTRY))
                .map(|country| self.kb.resolve(country));
        }
    }
}

fn legal_name(entity: &XmlElement) -> Option<LegalName> {
    let element = entity.child("LegalName")?;
    let text = element.text.trim();
    if text.is_empty() {
        return None;
    }
    Some(match element.attribute("xml:lang") {
        Some(language) => LegalName::Localized {
            language: language.to_string(),
            text: text.to_string(),
        },
        None => LegalName::Plain(text.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kb::fixtures::Fixture;
    use crate::kb::vocab::OPENCORPORATES_ID;
    use crate::registry::ExternalId;

    fn block(xml: &str) -> RawRecordBlock {
        RawRecordBlock {
            line: 1,
            data: xml.as_bytes().to_vec(),
        }
    }

    fn build(fx: &Fixture, xml: &str, stats: &mut BuildStats) -> Result<OrganizationRecord, BuildError> {
        let taxonomy = fx.taxonomy();
        let addresses = AddressResolver::new(&fx.kb, &fx.aliases, &taxonomy, &fx.index);
        let builder = EntityBuilder::new(&fx.kb, &fx.index, &fx.registries, addresses);
        builder.build(&block(xml), stats)
    }

    fn record(entity: &str) -> String {
        format!(
            "<lei:LEIRecord>\n<lei:LEI>213800D1EI4B9WTWWD28</lei:LEI>\n<lei:Entity>\n{entity}\n</lei:Entity>\n</lei:LEIRecord>\n"
        )
    }

    #[test]
    fn test_london_company() {
        let fx = Fixture::new();
        let mut stats = BuildStats::new();
        let xml = record(
            r#"<lei:LegalName xml:lang="en">ACME HOLDINGS LIMITED</lei:LegalName>
<lei:LegalAddress><lei:FirstAddressLine>1 Legal Row</lei:FirstAddressLine><lei:City>London</lei:City><lei:Country>GB</lei:Country></lei:LegalAddress>
<lei:HeadquartersAddress><lei:FirstAddressLine>3 Queen Victoria Street</lei:FirstAddressLine><lei:City>London</lei:City><lei:Country>GB</lei:Country></lei:HeadquartersAddress>
<lei:LegalJurisdiction>GB</lei:LegalJurisdiction>
<lei:EntityCategory>GENERAL</lei:EntityCategory>
<lei:LegalForm><lei:EntityLegalFormCode>8888</lei:EntityLegalFormCode></lei:LegalForm>"#,
        );

        let org = build(&fx, &xml, &mut stats).unwrap();
        assert_eq!(org.id.as_str(), "P1278/213800D1EI4B9WTWWD28");
        assert_eq!(org.name.language(), Some("en"));
        assert_eq!(org.name.text(), "ACME HOLDINGS LIMITED");
        assert_eq!(org.country, Some(ItemId::from("Q145")));
        assert_eq!(org.location_of_creation, None);
        assert_eq!(org.legal_form, None);
        assert_eq!(org.category, Some(EntityCategory::General));

        let hq = org.headquarters().unwrap();
        assert_eq!(hq.location, Some(ItemId::from("Q84")));
        assert_eq!(hq.street_address.as_deref(), Some("3 Queen Victoria Street"));
        assert!(org.legal_address().is_none());
        assert_eq!(stats, BuildStats::default());
    }

    #[test]
    fn test_legal_address_and_region_jurisdiction() {
        let fx = Fixture::new();
        let mut stats = BuildStats::new();
        let xml = record(
            "<lei:LegalName>Widget Corp</lei:LegalName>\
             <lei:LegalAddress><lei:FirstAddressLine>1209 Orange Street</lei:FirstAddressLine>\
             <lei:City>Wilmington</lei:City><lei:Region>US-DE</lei:Region><lei:Country>US</lei:Country></lei:LegalAddress>\
             <lei:LegalJurisdiction>US-DE</lei:LegalJurisdiction>\
             <lei:LegalForm><lei:EntityLegalFormCode>XTIQ</lei:EntityLegalFormCode></lei:LegalForm>",
        );

        let org = build(&fx, &xml, &mut stats).unwrap();
        assert_eq!(org.name, LegalName::Plain("Widget Corp".into()));
        assert_eq!(org.location_of_creation, Some(ItemId::from("Q1393")));
        assert_eq!(org.country, Some(ItemId::from("Q30")));
        assert_eq!(org.legal_form, Some(ItemId::from("PELF/XTIQ")));
        assert_eq!(org.legal_address().unwrap().location, Some(ItemId::from("Q1055")));
        assert!(org.headquarters().is_none());
    }

    #[test]
    fn test_registry_identifiers() {
        let fx = Fixture::new();
        let mut stats = BuildStats::new();
        let xml = record(
            "<lei:LegalName>ACME</lei:LegalName>\
             <lei:RegistrationAuthority><lei:RegistrationAuthorityID>RA000585</lei:RegistrationAuthorityID>\
             <lei:RegistrationAuthorityEntityID>2366 619</lei:RegistrationAuthorityEntityID></lei:RegistrationAuthority>",
        );
        let org = build(&fx, &xml, &mut stats).unwrap();
        assert_eq!(
            org.external_ids,
            vec![
                ExternalId::new("P2622", "02366619"),
                ExternalId::new(OPENCORPORATES_ID, "gb/02366619"),
            ]
        );
        assert!(stats.unknown_authorities.is_empty());
    }

    #[test]
    fn test_unknown_codes_are_counted() {
        let fx = Fixture::new();
        let mut stats = BuildStats::new();
        let unknown = record(
            "<lei:LegalName>ACME</lei:LegalName>\
             <lei:EntityCategory>PENSION_SCHEME</lei:EntityCategory>\
             <lei:RegistrationAuthority><lei:RegistrationAuthorityID>RA000999</lei:RegistrationAuthorityID>\
             <lei:RegistrationAuthorityEntityID>42</lei:RegistrationAuthorityEntityID></lei:RegistrationAuthority>",
        );
        let not_applicable = record(
            "<lei:LegalName>ACME</lei:LegalName>\
             <lei:RegistrationAuthority><lei:RegistrationAuthorityID>RA888888</lei:RegistrationAuthorityID>\
             <lei:RegistrationAuthorityEntityID>42</lei:RegistrationAuthorityEntityID></lei:RegistrationAuthority>",
        );

        let org = build(&fx, &unknown, &mut stats).unwrap();
        build(&fx, &unknown, &mut stats).unwrap();
        let skipped = build(&fx, &not_applicable, &mut stats).unwrap();

        assert_eq!(org.category, None);
        assert!(org.external_ids.is_empty());
        assert!(skipped.external_ids.is_empty());
        assert_eq!(stats.unknown_categories.get("PENSION_SCHEME"), Some(&2));
        assert_eq!(stats.unknown_authorities.get("RA000999"), Some(&2));
        assert!(!stats.unknown_authorities.contains_key("RA888888"));
    }

    #[test]
    fn test_record_errors() {
        let fx = Fixture::new();
        let mut stats = BuildStats::new();

        let bad_lei = "<lei:LEIRecord><lei:LEI>NOT-A-LEI</lei:LEI><lei:Entity/></lei:LEIRecord>";
        assert!(matches!(build(&fx, bad_lei, &mut stats), Err(BuildError::Identifier(_))));

        let no_name = record("<lei:LegalJurisdiction>GB</lei:LegalJurisdiction>");
        assert!(matches!(
            build(&fx, &no_name, &mut stats),
            Err(BuildError::MissingElement("LegalName"))
        ));

        let bad_country = record(
            "<lei:LegalName>ACME</lei:LegalName>\
             <lei:LegalAddress><lei:City>Paris</lei:City><lei:Country>ZZ</lei:Country></lei:LegalAddress>",
        );
        assert!(matches!(
            build(&fx, &bad_country, &mut stats),
            Err(BuildError::Address { .. })
        ));

        assert!(matches!(
            build(&fx, "<lei:LEIRecord><lei:LEI>", &mut stats),
            Err(BuildError::Xml(_))
        ));
    }

    #[test]
    fn test_decode_counts_outcomes() {
        let fx = Fixture::new();
        let taxonomy = fx.taxonomy();
        let addresses = AddressResolver::new(&fx.kb, &fx.aliases, &taxonomy, &fx.index);
        let builder = EntityBuilder::new(&fx.kb, &fx.index, &fx.registries, addresses);
        let mut stats = BuildStats::new();

        let good = block(&record("<lei:LegalName>ACME</lei:LegalName>"));
        let bad = block("<lei:LEIRecord></lei:LEIRecord>");
        assert!(builder.decode(&good, &mut stats).is_some());
        assert!(builder.decode(&bad, &mut stats).is_none());
        assert_eq!(stats.built, 1);
        assert_eq!(stats.rejected, 1);
    }

    #[test]
    fn test_stats_merge() {
        let mut total = BuildStats::new();
        total.built = 2;
        total.unknown_authorities.insert("RA1".into(), 1);

        let mut batch = BuildStats::new();
        batch.built = 3;
        batch.rejected = 1;
        batch.unknown_authorities.insert("RA1".into(), 2);
        batch.unknown_categories.insert("TRUST".into(), 4);

        total.merge(batch);
        assert_eq!(total.built, 5);
        assert_eq!(total.rejected, 1);
        assert_eq!(total.unknown_authorities["RA1"], 3);
        assert_eq!(total.unknown_authority_total(), 3);
        assert_eq!(total.unknown_category_total(), 4);
    }
}
