//! Property and item identifiers used by the pipeline

/// Frame slot names outside the property namespace
pub const ID: &str = "id";
pub const IS: &str = "is";
pub const ISA: &str = "isa";
pub const NAME: &str = "name";
pub const CATEGORY: &str = "category";
pub const GEO: &str = "/w/geo";
pub const LAT: &str = "/w/lat";
pub const LNG: &str = "/w/lng";

pub const INSTANCE_OF: &str = "P31";
pub const SUBCLASS_OF: &str = "P279";
pub const COUNTRY_CODE: &str = "P297";
pub const REGION_CODE: &str = "P300";
pub const COUNTRY: &str = "P17";
pub const LOCATED_IN: &str = "P131";
pub const STREET_ADDRESS: &str = "P6375";
pub const POSTAL_CODE: &str = "P281";
pub const HEADQUARTERS: &str = "P159";
pub const LOCATION: &str = "P276";
pub const LOCATION_OF_CREATION: &str = "P1071";
pub const COORDINATE_LOCATION: &str = "P625";
pub const LEI: &str = "P1278";
pub const LEGAL_FORM: &str = "P1454";
pub const OPENCORPORATES_ID: &str = "P1320";
pub const PARENT: &str = "P749";
pub const SUBSIDIARY: &str = "P355";
pub const OWNER_OF: &str = "P1830";
pub const OWNED_BY: &str = "P127";

/// Organization
pub const ORGANIZATION: &str = "Q43229";

/// Place classes a city name may resolve to
pub const HUMAN_SETTLEMENT: &str = "Q486972";
pub const ADMINISTRATIVE_ENTITY: &str = "Q56061";
pub const QUARTER: &str = "Q2983893";

/// Prefix of ISO 20275 entity legal form items
pub const LEGAL_FORM_PREFIX: &str = "PELF/";
