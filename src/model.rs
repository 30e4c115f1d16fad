//! Typed values behind the categorical columns of the loaded tables.
//!
//! Tables store these as their `as_str` labels. The loader maps raw CSV text
//! onto them once, using the raw values declared here.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    Palestine,
    Israel,
}

impl Region {
    pub const ALL: [Region; 2] = [Region::Palestine, Region::Israel];

    pub fn parse(label: &str) -> Option<Region> {
        Region::ALL.into_iter().find(|r| r.as_str() == label.trim())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Palestine => "Palestine",
            Region::Israel => "Israel",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Citizenship {
    Israeli,
    Palestinian,
    Other,
}

impl Citizenship {
    /// Values that appear verbatim in the raw data. Everything else is `Other`.
    pub const KNOWN: [Citizenship; 2] = [Citizenship::Israeli, Citizenship::Palestinian];

    pub fn as_str(&self) -> &'static str {
        match self {
            Citizenship::Israeli => "Israeli",
            Citizenship::Palestinian => "Palestinian",
            Citizenship::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Female,
    Male,
    Unknown,
}

impl Gender {
    pub const CODED: [Gender; 2] = [Gender::Female, Gender::Male];

    /// Single-letter code in the raw data. Blanks and anything else are unknown.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Gender::Female => Some("F"),
            Gender::Male => Some("M"),
            Gender::Unknown => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Female => "Female",
            Gender::Male => "Male",
            Gender::Unknown => "Unknown",
        }
    }
}

pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_coded_genders_have_codes() {
        let codes: Vec<_> = Gender::CODED.iter().map(|g| g.code()).collect();
        assert_eq!(codes, vec![Some("F"), Some("M")]);
        assert_eq!(Gender::Unknown.code(), None);
    }

    #[test]
    fn regions_parse_from_their_labels() {
        assert_eq!(Region::parse("Israel"), Some(Region::Israel));
        assert_eq!(Region::parse(" Palestine"), Some(Region::Palestine));
        assert_eq!(Region::parse("Gaza"), None);
    }
}
