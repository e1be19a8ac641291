//! Legal Entity Identifier

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::IdentifierError;
use crate::kb::ItemId;
use crate::kb::vocab::LEI;

/// ISO 17442: 18 alphanumeric characters and two check digits
static LEI_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z0-9]{18}[0-9]{2}$").expect("LEI pattern is a valid regex")
});

/// A validated LEI
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Lei(String);

impl Lei {
    /// Parse a registry number, trimming surrounding whitespace
    pub fn parse(value: &str) -> Result<Self, IdentifierError> {
        let value = value.trim();
        if LEI_PATTERN.is_match(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(IdentifierError::InvalidLei(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Stable record identifier, `P1278/<LEI>`
    pub fn item_id(&self) -> ItemId {
        ItemId::new(format!("{LEI}/{}", self.0))
    }
}

impl fmt::Display for Lei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Lei {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Lei {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Lei> for String {
    fn from(lei: Lei) -> Self {
        lei.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_lei() {
        let lei = Lei::parse("5493001KJTIIGC8Y1R12").unwrap();
        assert_eq!(lei.as_str(), "5493001KJTIIGC8Y1R12");
        assert_eq!(lei.item_id().as_str(), "P1278/5493001KJTIIGC8Y1R12");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let lei: Lei = " 213800D1EI4B9WTWWD28\n".parse().unwrap();
        assert_eq!(lei.as_str(), "213800D1EI4B9WTWWD28");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Lei::parse("").is_err());
        assert!(Lei::parse("5493001KJTIIGC8Y1R1").is_err());
        assert!(Lei::parse("5493001kjtiigc8y1r12").is_err());
        assert!(Lei::parse("5493001KJTIIGC8Y1RAB").is_err());
        assert!(Lei::parse("P1278/5493001KJTIIGC8Y1R12").is_err());
    }

    #[test]
    fn test_serde_validates() {
        let lei: Lei = serde_json::from_str(r#""5493001KJTIIGC8Y1R12""#).unwrap();
        assert_eq!(serde_json::to_string(&lei).unwrap(), r#""5493001KJTIIGC8Y1R12""#);
        assert!(serde_json::from_str::<Lei>(r#""bad""#).is_err());
    }
}
