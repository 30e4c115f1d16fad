//! Test fixtures: an in-memory fetcher and CSV builders shaped like the hosted
//! datasets.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::error::DashboardError;
use crate::loader::Fetch;

#[derive(Default)]
pub(crate) struct StaticFetcher {
    files: HashMap<String, Vec<u8>>,
    calls: RefCell<HashMap<String, usize>>,
}

impl StaticFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(mut self, source_id: &str, body: impl Into<Vec<u8>>) -> Self {
        self.files.insert(source_id.to_string(), body.into());
        self
    }

    pub(crate) fn calls(&self, source_id: &str) -> usize {
        self.calls.borrow().get(source_id).copied().unwrap_or(0)
    }
}

impl Fetch for StaticFetcher {
    fn fetch(&self, source_id: &str) -> Result<Vec<u8>, DashboardError> {
        *self
            .calls
            .borrow_mut()
            .entry(source_id.to_string())
            .or_default() += 1;
        self.files
            .get(source_id)
            .cloned()
            .ok_or_else(|| DashboardError::unavailable(source_id, "not found"))
    }
}

/// Worldometer-style population CSV from (year, population, yearly % change).
pub(crate) fn population_csv(rows: &[(i32, &str, &str)]) -> String {
    let mut csv = String::from(
        "Year,Population,Yearly % Change,Yearly Change,Migrants (net),Median Age,\
         Urban Pop %,Urban Population,Country's Share of World Pop,World Population\n",
    );
    for (year, population, change) in rows {
        csv.push_str(&format!(
            "{year},\"{population}\",{change},\"1,000\",\"-2,500\",20.1,76.4 %,\"800\",0.06 %,\"8,000,000,000\"\n"
        ));
    }
    csv
}

/// Casualty CSV from (date of death, citizenship, age, gender).
pub(crate) fn casualty_csv(rows: &[(&str, &str, &str, &str)]) -> String {
    let mut csv = String::from("Name,Date of death,Citizenship,Age,Gender\n");
    for (i, (date, citizenship, age, gender)) in rows.iter().enumerate() {
        csv.push_str(&format!("person {i},{date},{citizenship},{age},{gender}\n"));
    }
    csv
}
