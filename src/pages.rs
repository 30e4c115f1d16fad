//! Page renderers. Each page loads what it needs through the session's
//! [`DatasetLoader`], aggregates, builds charts and returns a [`PageView`]:
//! a serializable block tree the host lays out.

use std::path::{Path, PathBuf};

use polars::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::aggregation::{
    bin_numeric, count_by_key, filter_by_year_range, filter_in, filter_where, percent_change,
    pivot_counts, pivot_month_year, tally,
};
use crate::assets::embed_image;
use crate::charts::{grouped_bar, heatmap, line_chart, pie_panels, ChartStyle, Figure, PiePanel};
use crate::config::DashboardConfig;
use crate::error::DashboardError;
use crate::loader::{DatasetLoader, Fetch};
use crate::model::{Citizenship, Gender, Region};
use crate::navigation::Page;
use crate::schema::{aggregate, casualty, population};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Heading { level: u8, text: String },
    /// Trusted markup shown inside a panel.
    Text { html: String },
    Metric { label: String, value: String, caption: Option<String> },
    Columns { columns: Vec<Vec<Block>> },
    Chart { figure: Figure },
    Image { path: PathBuf, data_uri: String, caption: Option<String> },
    YearSelector { options: Vec<i32>, selected: i32 },
    Notice { message: String },
    List { items: Vec<String> },
    Divider,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageView {
    pub page: Page,
    pub title: String,
    pub blocks: Vec<Block>,
}

/// UI selections that survive page switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selections {
    pub map_year: i32,
}

/// Everything a page renderer may touch during one render.
pub struct RenderContext<'a, F: Fetch> {
    pub loader: &'a mut DatasetLoader<F>,
    pub config: &'a DashboardConfig,
    /// Directory local assets are resolved against.
    pub asset_root: &'a Path,
}

pub fn render_page<F: Fetch>(
    page: Page,
    ctx: &mut RenderContext<'_, F>,
    selections: &Selections,
) -> Result<PageView, DashboardError> {
    info!(page = page.label(), "rendering page");
    match page {
        Page::ChangingBorders => Ok(changing_borders(ctx.config, ctx.asset_root, selections.map_year)),
        Page::Population => {
            let sources = &ctx.config.sources;
            let palestine = ctx.loader.population(&sources.palestine_population, Region::Palestine)?;
            let israel = ctx.loader.population(&sources.israel_population, Region::Israel)?;
            population_view(&palestine, &israel, ctx.config)
        }
        Page::Cost => {
            let sources = &ctx.config.sources;
            let detailed = ctx.loader.casualties(&sources.casualties_detailed)?;
            let summary = ctx.loader.load_raw(&sources.casualties_summary)?;
            cost_view(&detailed, summary.height(), ctx.config)
        }
        Page::DataSources => Ok(data_sources()),
    }
}

fn intro(text: &str) -> Block {
    Block::Text {
        html: format!("<p>{text}</p>"),
    }
}

fn heading(level: u8, text: impl Into<String>) -> Block {
    Block::Heading {
        level,
        text: text.into(),
    }
}

// ── Changing Borders ────────────────────────────────────────────────────────

fn map_caption(year: i32) -> Option<&'static str> {
    match year {
        1946 => Some("Land held before the UN partition plan."),
        1947 => Some("The partition proposed by UN General Assembly Resolution 181."),
        1967 => Some("The 1949 armistice lines that held until the June 1967 war."),
        2021 => Some("Areas under Palestinian administration today."),
        _ => None,
    }
}

/// The map lookup is the one guarded failure: a missing image becomes a notice.
pub fn changing_borders(config: &DashboardConfig, asset_root: &Path, year: i32) -> PageView {
    let mut blocks = vec![
        intro(
            "This section traces shifting borders between Israel and Palestine over time, \
             visualizing territorial changes from 1946 to the present. Each map reflects \
             major geopolitical events that reshaped land and lives.",
        ),
        Block::YearSelector {
            options: config.assets.map_years(),
            selected: year,
        },
    ];

    let map = match config.assets.map_for(year) {
        Some(rel) => {
            let path = asset_root.join(rel);
            match embed_image(&path) {
                Ok(data_uri) => Block::Image {
                    path: rel.clone(),
                    data_uri,
                    caption: Some(format!("Borders in {year}")),
                },
                Err(e) => {
                    warn!(error = %e, "map image unavailable");
                    Block::Notice {
                        message: format!("Map for {year} is not available."),
                    }
                }
            }
        }
        None => Block::Notice {
            message: format!("No map is configured for {year}."),
        },
    };
    let description = vec![
        heading(3, year.to_string()),
        Block::Text {
            html: format!("<p>{}</p>", map_caption(year).unwrap_or("")),
        },
    ];
    blocks.push(Block::Columns {
        columns: vec![vec![map], description],
    });

    PageView {
        page: Page::ChangingBorders,
        title: Page::ChangingBorders.label().to_string(),
        blocks,
    }
}

// ── The Population ──────────────────────────────────────────────────────────

fn change_overview(table: &DataFrame, region: Region, config: &DashboardConfig) -> Result<Block, DashboardError> {
    let (from, to) = config.population_change_years;
    match percent_change(table, from, to, population::POPULATION) {
        Ok(change) => Ok(Block::Metric {
            label: format!("{} population {from}–{to}", region.as_str()),
            value: format!("{change:+.1}%"),
            caption: None,
        }),
        Err(e @ (DashboardError::MissingYear(_) | DashboardError::InsufficientData(_))) => {
            warn!(region = region.as_str(), error = %e, "population change overview skipped");
            Ok(Block::Notice {
                message: format!(
                    "Insufficient data: {} population for {from}–{to} is incomplete.",
                    region.as_str()
                ),
            })
        }
        Err(e) => Err(e),
    }
}

pub fn population_view(
    palestine: &DataFrame,
    israel: &DataFrame,
    config: &DashboardConfig,
) -> Result<PageView, DashboardError> {
    let theme = &config.theme;
    let trend_cols = [population::YEAR, population::POPULATION, population::REGION];
    let combined = palestine.select(trend_cols)?.vstack(&israel.select(trend_cols)?)?;

    let trend = line_chart(
        &combined,
        population::YEAR,
        population::POPULATION,
        Some(population::REGION),
        &ChartStyle::themed(theme)
            .axes("Year", "Population")
            .color(Region::Palestine.as_str(), &theme.accent)
            .color(Region::Israel.as_str(), &theme.primary),
    )?;

    let growth = |table: &DataFrame, color: &str| {
        line_chart(
            table,
            population::YEAR,
            population::YEARLY_CHANGE_PCT,
            None,
            &ChartStyle::themed(theme)
                .axes("Year", "Growth Rate (%)")
                .single_color(color),
        )
    };

    let blocks = vec![
        intro(
            "War leaves its mark not just in loss, but in survival. This section tracks \
             population changes in Israel and the Palestinian territories over time, showing \
             resilience, displacement, and demographic trends shaped by conflict and migration.",
        ),
        Block::Columns {
            columns: vec![
                vec![change_overview(palestine, Region::Palestine, config)?],
                vec![change_overview(israel, Region::Israel, config)?],
            ],
        },
        heading(3, "Overview Per Year"),
        Block::Chart { figure: trend },
        Block::Columns {
            columns: vec![
                vec![
                    heading(3, "Growth Rate Palestine (%)"),
                    Block::Chart {
                        figure: growth(palestine, theme.accent.as_str())?,
                    },
                ],
                vec![
                    heading(3, "Growth Rate Israel (%)"),
                    Block::Chart {
                        figure: growth(israel, theme.primary.as_str())?,
                    },
                ],
            ],
        },
    ];

    Ok(PageView {
        page: Page::Population,
        title: Page::Population.label().to_string(),
        blocks,
    })
}

// ── The Cost ────────────────────────────────────────────────────────────────

/// `1234567` → `"1,234,567"`.
pub fn format_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn side(table: &DataFrame, citizenship: Citizenship) -> Result<DataFrame, DashboardError> {
    filter_in(table, casualty::CITIZENSHIP, &[citizenship.as_str()])
}

pub fn cost_view(
    casualties: &DataFrame,
    summary_records: usize,
    config: &DashboardConfig,
) -> Result<PageView, DashboardError> {
    let theme = &config.theme;
    let (lo, hi) = config.casualty_years;
    let sides = [Citizenship::Israeli.as_str(), Citizenship::Palestinian.as_str()];
    let genders = [Gender::Female.as_str(), Gender::Male.as_str()];

    // Overview totals
    let window = filter_by_year_range(casualties, lo, hi)?;
    let by_side = tally(&count_by_key(&window, &[casualty::CITIZENSHIP])?, casualty::CITIZENSHIP)?;
    let deaths_of = |c: Citizenship| {
        by_side
            .iter()
            .find(|(label, _)| label == c.as_str())
            .map(|(_, n)| *n)
            .unwrap_or(0)
    };
    let palestinian = deaths_of(Citizenship::Palestinian);
    let israeli = deaths_of(Citizenship::Israeli);
    let total = palestinian + israeli;

    // Deaths per year
    let per_year = count_by_key(
        &filter_in(&window, casualty::CITIZENSHIP, &sides)?,
        &[casualty::CITIZENSHIP, casualty::YEAR],
    )?;
    let per_year_chart = line_chart(
        &per_year,
        casualty::YEAR,
        aggregate::COUNT,
        Some(casualty::CITIZENSHIP),
        &ChartStyle::themed(theme)
            .axes("Year", "Number of Deaths")
            .color(Citizenship::Palestinian.as_str(), &theme.accent)
            .color(Citizenship::Israeli.as_str(), &theme.primary),
    )?;

    // Month × year heatmaps
    let heat_style = ChartStyle::themed(theme)
        .axes("Year", "Month")
        .color_title("Number of Deaths");
    let israeli_heat = heatmap(&pivot_month_year(&side(&window, Citizenship::Israeli)?)?, &heat_style);
    let palestinian_heat = heatmap(
        &pivot_month_year(&side(&window, Citizenship::Palestinian)?)?,
        &heat_style,
    );

    // Gender split, whole dataset
    let gendered = filter_in(casualties, casualty::GENDER, &genders)?;
    let gender_panel = |c: Citizenship| -> Result<PiePanel, DashboardError> {
        let counts = count_by_key(&side(&gendered, c)?, &[casualty::GENDER])?;
        Ok(PiePanel {
            title: format!("{} Deaths by Gender", c.as_str()),
            slices: tally(&counts, casualty::GENDER)?,
        })
    };
    let gender_style = ChartStyle::themed(theme)
        .color(Gender::Female.as_str(), &theme.accent)
        .color(Gender::Male.as_str(), &theme.primary);
    let gender_chart = pie_panels(
        &[gender_panel(Citizenship::Israeli)?, gender_panel(Citizenship::Palestinian)?],
        &gender_style,
    );

    // Age group × gender
    let buckets = &config.age_buckets;
    let valid = filter_where(&gendered, col(casualty::AGE).gt(lit(0)))?;
    let binned = bin_numeric(&valid, casualty::AGE, &buckets.edges, &buckets.label_refs())?;
    let age_chart = |c: Citizenship| -> Result<Figure, DashboardError> {
        let counts = count_by_key(&side(&binned, c)?, &[aggregate::BUCKET, casualty::GENDER])?;
        let matrix = pivot_counts(
            &counts,
            aggregate::BUCKET,
            casualty::GENDER,
            buckets.labels.clone(),
            genders.iter().map(|g| g.to_string()).collect(),
        )?;
        Ok(grouped_bar(
            &matrix,
            &gender_style
                .clone()
                .title(format!("{} Deaths by Age Group & Gender", c.as_str()))
                .axes("Age Group", "Number of Deaths"),
        ))
    };

    let blocks = vec![
        intro(
            "Behind every data point is a life lost. This section illustrates the human cost \
             of the Israel–Palestine conflict: casualties by year, by month, by gender and by \
             age for both sides. Peaks align with key escalations and wars.",
        ),
        Block::Columns {
            columns: vec![
                vec![Block::Metric {
                    label: "Over".into(),
                    value: format_thousands(total),
                    caption: Some(format!("lives lost across both sides between {lo} and {hi}.")),
                }],
                vec![Block::Metric {
                    label: "Palestinian lives lost".into(),
                    value: format_thousands(palestinian),
                    caption: None,
                }],
                vec![Block::Metric {
                    label: "Israeli lives lost".into(),
                    value: format_thousands(israeli),
                    caption: None,
                }],
            ],
        },
        Block::Divider,
        heading(3, format!("Death per Year ({lo}–{hi})")),
        Block::Chart { figure: per_year_chart },
        Block::Divider,
        heading(3, "Monthly Cost"),
        Block::Columns {
            columns: vec![
                vec![
                    heading(4, "Israeli Deaths per Month×Year"),
                    Block::Chart { figure: israeli_heat },
                ],
                vec![
                    heading(4, "Palestinian Deaths per Month×Year"),
                    Block::Chart { figure: palestinian_heat },
                ],
            ],
        },
        Block::Divider,
        heading(3, "Deaths by Gender"),
        Block::Chart { figure: gender_chart },
        Block::Divider,
        heading(3, "Deaths by Age Group & Gender"),
        Block::Columns {
            columns: vec![
                vec![Block::Chart {
                    figure: age_chart(Citizenship::Israeli)?,
                }],
                vec![Block::Chart {
                    figure: age_chart(Citizenship::Palestinian)?,
                }],
            ],
        },
        Block::Text {
            html: format!(
                "<p>The summary casualty file lists {} records.</p>",
                format_thousands(summary_records as i64)
            ),
        },
    ];

    Ok(PageView {
        page: Page::Cost,
        title: Page::Cost.label().to_string(),
        blocks,
    })
}

// ── Data Sources ────────────────────────────────────────────────────────────

pub fn data_sources() -> PageView {
    PageView {
        page: Page::DataSources,
        title: Page::DataSources.label().to_string(),
        blocks: vec![Block::List {
            items: [
                "Israel vs Palestine Dataset on Kaggle",
                "Palestine Body Count 2000–2021 Dataset on Kaggle",
                "Israel Population on Worldometer",
                "Palestine Population on Worldometer",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{casualty_csv, population_csv, StaticFetcher};

    fn config() -> DashboardConfig {
        let mut config = DashboardConfig::default();
        config.sources.palestine_population = "pse.csv".into();
        config.sources.israel_population = "isr.csv".into();
        config.sources.casualties_detailed = "deaths.csv".into();
        config.sources.casualties_summary = "summary.csv".into();
        config
    }

    fn fetcher() -> StaticFetcher {
        StaticFetcher::new()
            .with("pse.csv", population_csv(&[(1955, "1,000", "1 %"), (2025, "1,500", "2 %")]))
            .with("isr.csv", population_csv(&[(2025, "9,000,000", "1.5 %")]))
            .with(
                "deaths.csv",
                casualty_csv(&[
                    ("2001-01-01", "Israeli", "30", "M"),
                    ("2001-02-01", "Israeli", "17", "F"),
                    ("2014-07-08", "Palestinian", "18", "M"),
                    ("2014-07-09", "Palestinian", "0", "F"),
                    ("2014-07-10", "Palestinian", "40", ""),
                    ("1990-01-01", "Palestinian", "25", "M"),
                ]),
            )
            .with("summary.csv", "Year,Deaths\n2000,1\n2001,2\n")
    }

    fn metric_values(blocks: &[Block]) -> Vec<String> {
        let mut out = Vec::new();
        for block in blocks {
            match block {
                Block::Metric { value, .. } => out.push(value.clone()),
                Block::Columns { columns } => {
                    for column in columns {
                        out.extend(metric_values(column));
                    }
                }
                _ => {}
            }
        }
        out
    }

    fn notices(blocks: &[Block]) -> Vec<String> {
        let mut out = Vec::new();
        for block in blocks {
            match block {
                Block::Notice { message } => out.push(message.clone()),
                Block::Columns { columns } => {
                    for column in columns {
                        out.extend(notices(column));
                    }
                }
                _ => {}
            }
        }
        out
    }

    fn render(page: Page, loader: &mut DatasetLoader<StaticFetcher>, config: &DashboardConfig) -> PageView {
        let root = Path::new(".");
        let mut ctx = RenderContext {
            loader,
            config,
            asset_root: root,
        };
        render_page(page, &mut ctx, &Selections { map_year: 1967 }).unwrap()
    }

    #[test]
    fn thousands_separators() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1,000");
        assert_eq!(format_thousands(1234567), "1,234,567");
        assert_eq!(format_thousands(-45000), "-45,000");
    }

    #[test]
    fn cost_page_counts_the_window_only() {
        let config = config();
        let mut loader = DatasetLoader::new(fetcher());
        let view = render(Page::Cost, &mut loader, &config);

        assert_eq!(metric_values(&view.blocks), vec!["5", "3", "2"]);
        let charts = view.blocks.iter().filter(|b| matches!(b, Block::Chart { .. })).count();
        assert_eq!(charts, 2);
        assert_eq!(loader.fetcher().calls("summary.csv"), 1);
    }

    #[test]
    fn population_page_degrades_when_a_year_is_missing() {
        let config = config();
        let mut loader = DatasetLoader::new(fetcher());
        let view = render(Page::Population, &mut loader, &config);

        assert_eq!(metric_values(&view.blocks), vec!["+50.0%"]);
        let notices = notices(&view.blocks);
        assert_eq!(notices.len(), 1);
        assert!(notices[0].starts_with("Insufficient data: Israel"));
    }

    #[test]
    fn rerendering_reuses_loaded_tables() {
        let config = config();
        let mut loader = DatasetLoader::new(fetcher());
        let first = render(Page::Population, &mut loader, &config);
        let second = render(Page::Population, &mut loader, &config);

        assert_eq!(first, second);
        assert_eq!(loader.fetcher().calls("pse.csv"), 1);
        assert_eq!(loader.fetcher().calls("isr.csv"), 1);
    }

    #[test]
    fn unavailable_data_fails_the_page() {
        let config = config();
        let mut loader = DatasetLoader::new(StaticFetcher::new());
        let mut ctx = RenderContext {
            loader: &mut loader,
            config: &config,
            asset_root: Path::new("."),
        };
        let err = render_page(Page::Cost, &mut ctx, &Selections { map_year: 1967 }).unwrap_err();
        assert!(matches!(err, DashboardError::DataUnavailable { .. }));
    }

    #[test]
    fn missing_map_becomes_a_notice() {
        let dir = tempfile::tempdir().unwrap();
        let view = changing_borders(&config(), dir.path(), 1967);
        assert_eq!(notices(&view.blocks), vec!["Map for 1967 is not available."]);
    }

    #[test]
    fn present_map_is_embedded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("assets")).unwrap();
        std::fs::write(dir.path().join("assets/map_1947.png"), b"png").unwrap();

        let view = changing_borders(&config(), dir.path(), 1947);
        let Block::Columns { columns } = view.blocks.last().unwrap() else {
            panic!("expected columns");
        };
        assert!(matches!(&columns[0][0], Block::Image { data_uri, .. } if data_uri.starts_with("data:image/png;base64,")));
    }
}
