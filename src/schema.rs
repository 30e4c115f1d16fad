/// Column-name constants for the dashboard tables.
/// Raw headers are what the hosted CSV files carry; the normalized names are
/// what the loader emits after coercion.

// ── Population: raw CSV headers ─────────────────────────────────────────────
pub mod population_raw {
    pub const YEAR: &str = "Year";
    pub const POPULATION: &str = "Population";
    pub const YEARLY_CHANGE_PCT: &str = "Yearly % Change";
    pub const YEARLY_CHANGE: &str = "Yearly Change";
    pub const NET_MIGRANTS: &str = "Migrants (net)";
    pub const URBAN_PCT: &str = "Urban Pop %";
    pub const URBAN_POPULATION: &str = "Urban Population";
    pub const WORLD_SHARE_PCT: &str = "Country's Share of World Pop";
    pub const WORLD_POPULATION: &str = "World Population";

    /// Every header the loader coerces, in output order (year excluded).
    pub const NUMERIC: [&str; 8] = [
        POPULATION,
        YEARLY_CHANGE_PCT,
        YEARLY_CHANGE,
        NET_MIGRANTS,
        URBAN_PCT,
        URBAN_POPULATION,
        WORLD_SHARE_PCT,
        WORLD_POPULATION,
    ];
}

// ── Population: normalized columns ──────────────────────────────────────────
pub mod population {
    pub const REGION: &str = "region";
    pub const YEAR: &str = "year";
    pub const POPULATION: &str = "population";
    pub const YEARLY_CHANGE_PCT: &str = "yearly_change_pct";
    pub const YEARLY_CHANGE: &str = "yearly_change";
    pub const NET_MIGRANTS: &str = "net_migrants";
    pub const URBAN_PCT: &str = "urban_pct";
    pub const URBAN_POPULATION: &str = "urban_population";
    pub const WORLD_SHARE_PCT: &str = "world_share_pct";
    pub const WORLD_POPULATION: &str = "world_population";

    /// Same order as `population_raw::NUMERIC`.
    pub const NUMERIC: [&str; 8] = [
        POPULATION,
        YEARLY_CHANGE_PCT,
        YEARLY_CHANGE,
        NET_MIGRANTS,
        URBAN_PCT,
        URBAN_POPULATION,
        WORLD_SHARE_PCT,
        WORLD_POPULATION,
    ];
}

// ── Casualties: raw CSV headers ─────────────────────────────────────────────
pub mod casualty_raw {
    pub const DATE_OF_DEATH: &str = "Date of death";
    pub const CITIZENSHIP: &str = "Citizenship";
    pub const AGE: &str = "Age";
    pub const GENDER: &str = "Gender";
}

// ── Casualties: normalized columns ──────────────────────────────────────────
pub mod casualty {
    pub const DATE_OF_DEATH: &str = "date_of_death";
    pub const YEAR: &str = "year";
    pub const MONTH: &str = "month";
    pub const CITIZENSHIP: &str = "citizenship";
    pub const AGE: &str = "age";
    pub const GENDER: &str = "gender";
}

// ── Aggregate tables ────────────────────────────────────────────────────────
pub mod aggregate {
    pub const COUNT: &str = "count";
    pub const BUCKET: &str = "bucket";
}
