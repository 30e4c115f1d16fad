//! Navigation shell: which page is showing, plus the session that renders it.

use std::path::PathBuf;

use serde::Serialize;

use crate::config::DashboardConfig;
use crate::error::DashboardError;
use crate::loader::{DatasetLoader, Fetch, SourceFetcher};
use crate::pages::{render_page, PageView, RenderContext, Selections};
use crate::visualization;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Page {
    ChangingBorders,
    Population,
    Cost,
    DataSources,
}

impl Page {
    /// Menu order.
    pub const ALL: [Page; 4] = [
        Page::ChangingBorders,
        Page::Population,
        Page::Cost,
        Page::DataSources,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Page::ChangingBorders => "Changing Borders",
            Page::Population => "The Population",
            Page::Cost => "The Cost",
            Page::DataSources => "Data Sources",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Page::ChangingBorders => "changing-borders",
            Page::Population => "population",
            Page::Cost => "cost",
            Page::DataSources => "data-sources",
        }
    }

    /// Accepts either the menu label or the slug.
    pub fn parse(name: &str) -> Option<Page> {
        let name = name.trim();
        Page::ALL
            .into_iter()
            .find(|p| p.label() == name || p.slug() == name)
    }
}

/// Menu state. Selecting a page replaces the current one; there is no history.
#[derive(Debug, Clone)]
pub struct Navigation {
    page: Page,
    map_years: Vec<i32>,
    map_year: i32,
}

impl Navigation {
    const DEFAULT_MAP_YEAR: i32 = 1967;

    pub fn new(map_years: Vec<i32>) -> Self {
        let map_year = if map_years.contains(&Self::DEFAULT_MAP_YEAR) {
            Self::DEFAULT_MAP_YEAR
        } else {
            map_years.first().copied().unwrap_or(Self::DEFAULT_MAP_YEAR)
        };
        Self {
            page: Page::ChangingBorders,
            map_years,
            map_year,
        }
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn select(&mut self, page: Page) {
        self.page = page;
    }

    pub fn select_label(&mut self, label: &str) -> Result<Page, DashboardError> {
        let page = Page::parse(label).ok_or_else(|| DashboardError::UnknownPage(label.to_string()))?;
        self.select(page);
        Ok(page)
    }

    pub fn map_years(&self) -> &[i32] {
        &self.map_years
    }

    pub fn select_map_year(&mut self, year: i32) -> Result<(), DashboardError> {
        if !self.map_years.contains(&year) {
            return Err(DashboardError::Validation(format!(
                "no map for {year}; choose one of {:?}",
                self.map_years
            )));
        }
        self.map_year = year;
        Ok(())
    }

    pub fn selections(&self) -> Selections {
        Selections {
            map_year: self.map_year,
        }
    }
}

/// One user session: configuration, menu state, and the dataset cache.
pub struct Dashboard<F: Fetch> {
    config: DashboardConfig,
    loader: DatasetLoader<F>,
    navigation: Navigation,
    asset_root: PathBuf,
}

impl Dashboard<SourceFetcher> {
    /// Session reading remote sources over HTTP and local ones (and assets)
    /// relative to `base_path`.
    pub fn connect(base_path: impl Into<PathBuf>, config: DashboardConfig) -> Result<Self, DashboardError> {
        let base_path = base_path.into();
        let fetcher = SourceFetcher::new(base_path.clone())?;
        Self::new(config, fetcher, base_path)
    }
}

impl<F: Fetch> Dashboard<F> {
    pub fn new(config: DashboardConfig, fetcher: F, asset_root: impl Into<PathBuf>) -> Result<Self, DashboardError> {
        config.age_buckets.validate()?;
        let navigation = Navigation::new(config.assets.map_years());
        Ok(Self {
            config,
            loader: DatasetLoader::new(fetcher),
            navigation,
            asset_root: asset_root.into(),
        })
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn loader(&self) -> &DatasetLoader<F> {
        &self.loader
    }

    pub fn navigation(&self) -> &Navigation {
        &self.navigation
    }

    pub fn navigation_mut(&mut self) -> &mut Navigation {
        &mut self.navigation
    }

    /// Render the selected page. Load and aggregation failures propagate.
    pub fn render(&mut self) -> Result<PageView, DashboardError> {
        let selections = self.navigation.selections();
        let mut ctx = RenderContext {
            loader: &mut self.loader,
            config: &self.config,
            asset_root: &self.asset_root,
        };
        render_page(self.navigation.page(), &mut ctx, &selections)
    }

    pub fn render_json(&mut self) -> Result<String, DashboardError> {
        Ok(serde_json::to_string(&self.render()?)?)
    }

    /// Render the selected page as a standalone HTML document.
    pub fn render_html(&mut self) -> Result<String, DashboardError> {
        let view = self.render()?;
        let background = self.asset_root.join(&self.config.assets.background);
        visualization::page_html(&view, &self.navigation, &self.config.theme, &background)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::Block;
    use crate::testing::{population_csv, StaticFetcher};

    #[test]
    fn pages_parse_from_label_or_slug() {
        assert_eq!(Page::parse("The Cost"), Some(Page::Cost));
        assert_eq!(Page::parse("data-sources"), Some(Page::DataSources));
        assert_eq!(Page::parse("Home"), None);
    }

    #[test]
    fn selection_replaces_the_current_page() {
        let mut nav = Navigation::new(vec![1946, 1947, 1967, 2021]);
        assert_eq!(nav.page(), Page::ChangingBorders);
        assert_eq!(nav.selections().map_year, 1967);

        nav.select_label("The Population").unwrap();
        nav.select_label("Data Sources").unwrap();
        assert_eq!(nav.page(), Page::DataSources);

        let err = nav.select_label("Elsewhere").unwrap_err();
        assert!(matches!(err, DashboardError::UnknownPage(_)));
        assert_eq!(nav.page(), Page::DataSources);
    }

    #[test]
    fn map_year_must_be_offered() {
        let mut nav = Navigation::new(vec![1946, 1947, 1967, 2021]);
        nav.select_map_year(2021).unwrap();
        assert_eq!(nav.selections().map_year, 2021);
        assert!(nav.select_map_year(1990).is_err());
        assert_eq!(nav.selections().map_year, 2021);
    }

    #[test]
    fn dashboard_renders_the_selected_page_only() {
        let mut config = DashboardConfig::default();
        config.sources.palestine_population = "pse.csv".into();
        config.sources.israel_population = "isr.csv".into();
        let fetcher = StaticFetcher::new()
            .with("pse.csv", population_csv(&[(1955, "1,000", "1 %"), (2025, "1,500", "2 %")]))
            .with("isr.csv", population_csv(&[(1955, "1,000", "1 %"), (2025, "2,000", "2 %")]));
        let dir = tempfile::tempdir().unwrap();
        let mut dashboard = Dashboard::new(config, fetcher, dir.path()).unwrap();

        let view = dashboard.render().unwrap();
        assert_eq!(view.page, Page::ChangingBorders);
        assert!(dashboard.loader().cache().is_empty());

        dashboard.navigation_mut().select(Page::Population);
        let view = dashboard.render().unwrap();
        assert_eq!(view.title, "The Population");
        assert!(matches!(view.blocks[0], Block::Text { .. }));
        assert_eq!(dashboard.loader().cache().len(), 2);

        let json = dashboard.render_json().unwrap();
        assert!(json.contains("\"page\":\"Population\""));
        assert_eq!(dashboard.loader().fetcher().calls("pse.csv"), 1);
    }
}
