use pyo3::prelude::*;
use pyo3_polars::PyDataFrame;

use crate::config::DashboardConfig;
use crate::error::DashboardError;
use crate::loader::{CacheKey, SourceFetcher};
use crate::model::Region;
use crate::navigation::{Dashboard, Page};

/// Python handle on one dashboard session.
#[pyclass(name = "Dashboard")]
pub struct PyDashboard {
    inner: Dashboard<SourceFetcher>,
}

#[pymethods]
impl PyDashboard {
    /// `base_path` anchors local sources and assets. `config_json` overrides
    /// any subset of the default configuration.
    #[new]
    #[pyo3(signature = (base_path, config_json=None))]
    fn new(base_path: String, config_json: Option<&str>) -> PyResult<Self> {
        let config = match config_json {
            Some(json) => DashboardConfig::from_json(json)?,
            None => DashboardConfig::default(),
        };
        Ok(Self {
            inner: Dashboard::connect(base_path, config)?,
        })
    }

    #[staticmethod]
    fn menu_labels() -> Vec<&'static str> {
        Page::ALL.iter().map(|p| p.label()).collect()
    }

    fn year_options(&self) -> Vec<i32> {
        self.inner.navigation().map_years().to_vec()
    }

    #[getter]
    fn page(&self) -> &'static str {
        self.inner.navigation().page().label()
    }

    fn select_page(&mut self, label: &str) -> PyResult<()> {
        self.inner.navigation_mut().select_label(label)?;
        Ok(())
    }

    fn select_year(&mut self, year: i32) -> PyResult<()> {
        self.inner.navigation_mut().select_map_year(year)?;
        Ok(())
    }

    fn render_json(&mut self) -> PyResult<String> {
        Ok(self.inner.render_json()?)
    }

    fn render_html(&mut self) -> PyResult<String> {
        Ok(self.inner.render_html()?)
    }

    /// The table cached for `source_id` when loaded as `kind` ("raw",
    /// "casualties" or "population", the latter with a `region`), if a page
    /// has loaded it.
    #[pyo3(signature = (kind, source_id, region=None))]
    fn cached_table(&self, kind: &str, source_id: &str, region: Option<&str>) -> PyResult<Option<PyDataFrame>> {
        let source_id = source_id.to_string();
        let key = match (kind, region) {
            ("raw", _) => CacheKey::Raw(source_id),
            ("casualties", _) => CacheKey::Casualties(source_id),
            ("population", Some(label)) => CacheKey::Population {
                source_id,
                region: Region::parse(label)
                    .ok_or_else(|| DashboardError::Validation(format!("unknown region '{label}'")))?,
            },
            ("population", None) => {
                return Err(DashboardError::Validation("population tables need a region".into()).into())
            }
            (other, _) => return Err(DashboardError::Validation(format!("unknown table kind '{other}'")).into()),
        };
        Ok(self
            .inner
            .loader()
            .cache()
            .get(&key)
            .map(|df| PyDataFrame(df.as_ref().clone())))
    }
}

/// Column names of the coerced tables, for code reading `cached_table` output.
pub(crate) fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
    use crate::schema;

    let population = PyModule::new(m.py(), "population")?;
    population.add("REGION", schema::population::REGION)?;
    population.add("YEAR", schema::population::YEAR)?;
    population.add("POPULATION", schema::population::POPULATION)?;
    population.add("YEARLY_CHANGE_PCT", schema::population::YEARLY_CHANGE_PCT)?;
    population.add("YEARLY_CHANGE", schema::population::YEARLY_CHANGE)?;
    population.add("NET_MIGRANTS", schema::population::NET_MIGRANTS)?;
    population.add("URBAN_PCT", schema::population::URBAN_PCT)?;
    population.add("URBAN_POPULATION", schema::population::URBAN_POPULATION)?;
    population.add("WORLD_SHARE_PCT", schema::population::WORLD_SHARE_PCT)?;
    population.add("WORLD_POPULATION", schema::population::WORLD_POPULATION)?;
    m.add_submodule(&population)?;

    let casualty = PyModule::new(m.py(), "casualty")?;
    casualty.add("DATE_OF_DEATH", schema::casualty::DATE_OF_DEATH)?;
    casualty.add("YEAR", schema::casualty::YEAR)?;
    casualty.add("MONTH", schema::casualty::MONTH)?;
    casualty.add("CITIZENSHIP", schema::casualty::CITIZENSHIP)?;
    casualty.add("AGE", schema::casualty::AGE)?;
    casualty.add("GENDER", schema::casualty::GENDER)?;
    m.add_submodule(&casualty)?;

    Ok(())
}
