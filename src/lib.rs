pub mod aggregation;
pub mod assets;
pub mod charts;
pub mod config;
pub mod error;
pub mod loader;
pub mod model;
pub mod navigation;
pub mod pages;
pub mod schema;
pub mod visualization;

#[cfg(feature = "python")]
mod python;
#[cfg(test)]
mod testing;

pub use config::DashboardConfig;
pub use error::DashboardError;
pub use loader::{CacheKey, DatasetCache, DatasetLoader, Fetch, SourceFetcher};
pub use navigation::{Dashboard, Navigation, Page};
pub use pages::{Block, PageView};

use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber, filtered by `RUST_LOG` (default `info`).
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(feature = "python")]
#[pyo3::pymodule]
fn _core(m: &pyo3::Bound<'_, pyo3::types::PyModule>) -> pyo3::PyResult<()> {
    use pyo3::prelude::*;

    init_logging();
    m.add_class::<python::PyDashboard>()?;
    python::add_schema_exports(m)?;
    Ok(())
}
