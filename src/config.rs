//! Fixed dashboard configuration: where the data lives, which assets to show,
//! and the colour theme.
//!
//! `DashboardConfig::default()` carries the production values. Hosts may
//! deserialize a partial JSON override; missing fields fall back to defaults.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::DashboardError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub sources: DataSources,
    pub assets: AssetPaths,
    pub theme: Theme,
    /// Inclusive year window used by the casualty overview.
    pub casualty_years: (i32, i32),
    /// Endpoints of the population percent-change overview.
    pub population_change_years: (i32, i32),
    pub age_buckets: AgeBuckets,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            sources: DataSources::default(),
            assets: AssetPaths::default(),
            theme: Theme::default(),
            casualty_years: (2000, 2021),
            population_change_years: (1955, 2025),
            age_buckets: AgeBuckets::default(),
        }
    }
}

impl DashboardConfig {
    pub fn from_json(json: &str) -> Result<Self, DashboardError> {
        let config: Self = serde_json::from_str(json)?;
        config.age_buckets.validate()?;
        Ok(config)
    }
}

/// Source identifiers of the four hosted datasets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSources {
    pub palestine_population: String,
    pub israel_population: String,
    /// Per-casualty rows with date, citizenship, age and gender.
    pub casualties_detailed: String,
    /// Casualty rows without gender; loaded but not cleaned.
    pub casualties_summary: String,
}

impl Default for DataSources {
    fn default() -> Self {
        Self {
            palestine_population: "https://drive.google.com/uc?id=1Kr3mWDhTErT9OlibX_aBaHVtNvRTlZhx"
                .into(),
            israel_population: "https://drive.google.com/uc?id=1pfdUGsK4uKs-c7KUQ_zsnKVOkWadu0cw"
                .into(),
            casualties_detailed: "https://drive.google.com/uc?id=1wwXqjPVl2Uv81Xs8XANO2AhViMnVPcbD"
                .into(),
            casualties_summary: "https://drive.google.com/uc?id=1rCjmp3-wjvqD7a0TmorOUDXv1cqnpczC"
                .into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetPaths {
    pub background: PathBuf,
    /// Year-coded border maps, in selector order.
    pub maps: Vec<(i32, PathBuf)>,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            background: PathBuf::from("assets/bg.png"),
            maps: [1946, 1947, 1967, 2021]
                .into_iter()
                .map(|year| (year, PathBuf::from(format!("assets/map_{year}.png"))))
                .collect(),
        }
    }
}

impl AssetPaths {
    pub fn map_years(&self) -> Vec<i32> {
        self.maps.iter().map(|(year, _)| *year).collect()
    }

    pub fn map_for(&self, year: i32) -> Option<&PathBuf> {
        self.maps.iter().find(|(y, _)| *y == year).map(|(_, p)| p)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    /// Dark navy.
    pub primary: String,
    /// Gold.
    pub accent: String,
    pub text: String,
    pub grid: String,
    pub panel: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary: "#2B2D42".into(),
            accent: "#E5C056".into(),
            text: "#FFFFFF".into(),
            grid: "rgba(255,255,255,0.1)".into(),
            panel: "rgba(43, 45, 66, 0.8)".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgeBuckets {
    pub edges: Vec<f64>,
    pub labels: Vec<String>,
}

impl Default for AgeBuckets {
    fn default() -> Self {
        Self {
            edges: vec![0.0, 17.0, 30.0, 45.0, 60.0, 75.0, 120.0],
            labels: ["0-17", "18-30", "31-45", "46-60", "61-75", "76+"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl AgeBuckets {
    pub fn validate(&self) -> Result<(), DashboardError> {
        if self.edges.len() < 2 || self.labels.len() + 1 != self.edges.len() {
            return Err(DashboardError::Validation(format!(
                "{} bucket edges need {} labels, got {}",
                self.edges.len(),
                self.edges.len().saturating_sub(1),
                self.labels.len()
            )));
        }
        if self.edges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(DashboardError::Validation(
                "bucket edges must be strictly ascending".into(),
            ));
        }
        Ok(())
    }

    pub fn label_refs(&self) -> Vec<&str> {
        self.labels.iter().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_override_keeps_defaults() {
        let config =
            DashboardConfig::from_json(r#"{"casualty_years": [2005, 2010]}"#).unwrap();
        assert_eq!(config.casualty_years, (2005, 2010));
        assert_eq!(config.population_change_years, (1955, 2025));
        assert_eq!(config.theme.accent, "#E5C056");
        assert_eq!(config.assets.map_years(), vec![1946, 1947, 1967, 2021]);
    }

    #[test]
    fn mismatched_bucket_labels_are_rejected() {
        let err = DashboardConfig::from_json(
            r#"{"age_buckets": {"edges": [0, 10, 20], "labels": ["a"]}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, DashboardError::Validation(_)));
    }
}
