//! Chart builders: aggregate tables in, Plotly figure descriptions out.
//!
//! Builders only read and style; they never aggregate or reorder categories.
//! Figures serialize to the `{data, layout}` JSON that plotly.js draws.

use polars::prelude::*;
use serde::Serialize;

use crate::aggregation::CountMatrix;
use crate::config::Theme;
use crate::error::DashboardError;
use crate::loader::require_columns;

// ── Style ───────────────────────────────────────────────────────────────────

/// Colours, titles and legend settings for one chart.
#[derive(Debug, Clone)]
pub struct ChartStyle {
    pub theme: Theme,
    pub title: Option<String>,
    pub x_title: Option<String>,
    pub y_title: Option<String>,
    /// Title of the colour bar (heatmaps).
    pub color_title: Option<String>,
    /// Series or slice name → colour. Also fixes the order of line series.
    pub colors: Vec<(String, String)>,
    pub default_color: String,
    pub show_legend: bool,
}

impl ChartStyle {
    pub fn themed(theme: &Theme) -> Self {
        Self {
            theme: theme.clone(),
            title: None,
            x_title: None,
            y_title: None,
            color_title: None,
            colors: Vec::new(),
            default_color: theme.accent.clone(),
            show_legend: true,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn axes(mut self, x: impl Into<String>, y: impl Into<String>) -> Self {
        self.x_title = Some(x.into());
        self.y_title = Some(y.into());
        self
    }

    pub fn color_title(mut self, title: impl Into<String>) -> Self {
        self.color_title = Some(title.into());
        self
    }

    pub fn color(mut self, name: impl Into<String>, color: impl Into<String>) -> Self {
        self.colors.push((name.into(), color.into()));
        self
    }

    pub fn single_color(mut self, color: impl Into<String>) -> Self {
        self.default_color = color.into();
        self.show_legend = false;
        self
    }

    fn color_for(&self, name: &str) -> String {
        self.colors
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c.clone())
            .unwrap_or_else(|| self.default_color.clone())
    }

    fn rank_of(&self, name: &str) -> usize {
        self.colors
            .iter()
            .position(|(n, _)| n == name)
            .unwrap_or(self.colors.len())
    }
}

// ── Figure model ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Scatter(ScatterTrace),
    Bar(BarTrace),
    Pie(PieTrace),
    Heatmap(HeatmapTrace),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterTrace {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub x: Vec<f64>,
    pub y: Vec<Option<f64>>,
    pub mode: &'static str,
    pub line: Line,
    pub marker: Marker,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarTrace {
    pub name: String,
    pub x: Vec<String>,
    pub y: Vec<i64>,
    pub marker: Marker,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieTrace {
    pub name: String,
    pub labels: Vec<String>,
    pub values: Vec<i64>,
    pub hole: f64,
    pub textinfo: &'static str,
    /// Plotly sorts slices by value unless told not to.
    pub sort: bool,
    pub marker: PieMarker,
    pub domain: Domain,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapTrace {
    pub x: Vec<String>,
    pub y: Vec<String>,
    pub z: Vec<Vec<i64>>,
    pub colorscale: Vec<(f64, String)>,
    pub showscale: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colorbar: Option<ColorBar>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    pub color: String,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieMarker {
    pub colors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Domain {
    pub x: [f64; 2],
    pub y: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorBar {
    pub title: Title,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Title {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Font {
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    pub showgrid: bool,
    pub gridcolor: String,
    pub tickfont: Font,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub axis_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autorange: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub title: Title,
    pub font: Font,
    pub bgcolor: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Margin {
    pub t: u32,
    pub b: u32,
    pub l: u32,
    pub r: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub xref: &'static str,
    pub yref: &'static str,
    pub xanchor: &'static str,
    pub yanchor: &'static str,
    pub showarrow: bool,
    pub font: Font,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    pub paper_bgcolor: &'static str,
    pub plot_bgcolor: &'static str,
    pub font: Font,
    pub showlegend: bool,
    pub legend: Legend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barmode: Option<&'static str>,
    pub margin: Margin,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

const TRANSPARENT: &str = "rgba(0,0,0,0)";

fn font(theme: &Theme) -> Font {
    Font {
        color: theme.text.clone(),
    }
}

fn axis(style: &ChartStyle, title: Option<&String>) -> Axis {
    Axis {
        title: title.map(|t| Title { text: t.clone() }),
        showgrid: true,
        gridcolor: style.theme.grid.clone(),
        tickfont: font(&style.theme),
        axis_type: None,
        autorange: None,
    }
}

fn themed_layout(style: &ChartStyle) -> Layout {
    Layout {
        title: style.title.as_ref().map(|t| Title { text: t.clone() }),
        paper_bgcolor: TRANSPARENT,
        plot_bgcolor: TRANSPARENT,
        font: font(&style.theme),
        showlegend: style.show_legend,
        legend: Legend {
            title: Title { text: String::new() },
            font: font(&style.theme),
            bgcolor: TRANSPARENT,
        },
        xaxis: Some(axis(style, style.x_title.as_ref())),
        yaxis: Some(axis(style, style.y_title.as_ref())),
        barmode: None,
        margin: Margin {
            t: if style.title.is_some() { 40 } else { 20 },
            b: 20,
            l: 20,
            r: 20,
        },
        annotations: Vec::new(),
    }
}

// ── Builders ────────────────────────────────────────────────────────────────

/// Line chart with markers of `y` over numeric `x`, one trace per distinct
/// `group` value. Series named in the style's colour map come first, in that
/// order; the rest follow in order of first appearance.
pub fn line_chart(
    table: &DataFrame,
    x: &str,
    y: &str,
    group: Option<&str>,
    style: &ChartStyle,
) -> Result<Figure, DashboardError> {
    require_columns(table, &[x, y])?;
    let x_col = table.column(x)?.cast(&DataType::Float64)?;
    let xs = x_col.f64()?;
    let y_col = table.column(y)?.cast(&DataType::Float64)?;
    let ys = y_col.f64()?;

    let groups: Vec<Option<String>> = match group {
        Some(g) => {
            require_columns(table, &[g])?;
            let g_col = table.column(g)?.cast(&DataType::String)?;
            g_col.str()?.into_iter().map(|v| v.map(str::to_string)).collect()
        }
        None => vec![None; table.height()],
    };

    let mut series: Vec<(Option<String>, ScatterTrace)> = Vec::new();
    for (i, key) in groups.into_iter().enumerate() {
        let Some(xv) = xs.get(i) else {
            continue;
        };
        let slot = match series.iter().position(|(k, _)| *k == key) {
            Some(pos) => pos,
            None => {
                let color = key
                    .as_deref()
                    .map(|k| style.color_for(k))
                    .unwrap_or_else(|| style.default_color.clone());
                series.push((
                    key.clone(),
                    ScatterTrace {
                        name: key.clone(),
                        x: Vec::new(),
                        y: Vec::new(),
                        mode: "lines+markers",
                        line: Line { color: color.clone(), width: 2.5 },
                        marker: Marker { color, size: Some(6) },
                    },
                ));
                series.len() - 1
            }
        };
        series[slot].1.x.push(xv);
        series[slot].1.y.push(ys.get(i));
    }
    // stable: equal ranks keep first-appearance order
    series.sort_by_key(|(k, _)| k.as_deref().map(|k| style.rank_of(k)).unwrap_or(usize::MAX));

    Ok(Figure {
        data: series.into_iter().map(|(_, t)| Trace::Scatter(t)).collect(),
        layout: themed_layout(style),
    })
}

/// Grouped bars: matrix rows along the x axis (in matrix order), one bar
/// trace per matrix column.
pub fn grouped_bar(matrix: &CountMatrix, style: &ChartStyle) -> Figure {
    let data = matrix
        .columns
        .iter()
        .enumerate()
        .map(|(c, name)| {
            Trace::Bar(BarTrace {
                name: name.clone(),
                x: matrix.rows.clone(),
                y: matrix.column_values(c),
                marker: Marker {
                    color: style.color_for(name),
                    size: None,
                },
            })
        })
        .collect();

    let mut layout = themed_layout(style);
    layout.barmode = Some("group");
    if let Some(x) = layout.xaxis.as_mut() {
        x.axis_type = Some("category");
        x.showgrid = false;
    }
    Figure { data, layout }
}

/// One titled pie panel: `(label, count)` slices in display order.
#[derive(Debug, Clone)]
pub struct PiePanel {
    pub title: String,
    pub slices: Vec<(String, i64)>,
}

/// Donut charts laid out side by side, each with its title above it.
pub fn pie_panels(panels: &[PiePanel], style: &ChartStyle) -> Figure {
    let n = panels.len().max(1) as f64;
    let gap = 0.02;

    let mut data = Vec::with_capacity(panels.len());
    let mut annotations = Vec::with_capacity(panels.len());
    for (i, panel) in panels.iter().enumerate() {
        let x0 = i as f64 / n + gap;
        let x1 = (i + 1) as f64 / n - gap;
        data.push(Trace::Pie(PieTrace {
            name: panel.title.clone(),
            labels: panel.slices.iter().map(|(l, _)| l.clone()).collect(),
            values: panel.slices.iter().map(|(_, v)| *v).collect(),
            hole: 0.4,
            textinfo: "percent+label",
            sort: false,
            marker: PieMarker {
                colors: panel.slices.iter().map(|(l, _)| style.color_for(l)).collect(),
            },
            domain: Domain { x: [x0, x1], y: [0.0, 1.0] },
        }));
        annotations.push(Annotation {
            text: panel.title.clone(),
            x: (x0 + x1) / 2.0,
            y: 1.0,
            xref: "paper",
            yref: "paper",
            xanchor: "center",
            yanchor: "bottom",
            showarrow: false,
            font: font(&style.theme),
        });
    }

    let mut layout = themed_layout(style);
    layout.xaxis = None;
    layout.yaxis = None;
    layout.margin.t = 50;
    layout.annotations = annotations;
    Figure { data, layout }
}

/// Heatmap of a count matrix: columns along x, rows down y (first row on top).
/// Colour runs white → accent → primary.
pub fn heatmap(matrix: &CountMatrix, style: &ChartStyle) -> Figure {
    let theme = &style.theme;
    let trace = HeatmapTrace {
        x: matrix.columns.clone(),
        y: matrix.rows.clone(),
        z: matrix.values.clone(),
        colorscale: vec![
            (0.0, "#FFFFFF".to_string()),
            (0.5, theme.accent.clone()),
            (1.0, theme.primary.clone()),
        ],
        showscale: true,
        colorbar: style.color_title.as_ref().map(|t| ColorBar {
            title: Title { text: t.clone() },
        }),
    };

    let mut layout = themed_layout(style);
    if let Some(x) = layout.xaxis.as_mut() {
        x.axis_type = Some("category");
        x.showgrid = false;
    }
    if let Some(y) = layout.yaxis.as_mut() {
        y.axis_type = Some("category");
        y.autorange = Some("reversed");
        y.showgrid = false;
    }
    Figure {
        data: vec![Trace::Heatmap(trace)],
        layout,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style() -> ChartStyle {
        ChartStyle::themed(&Theme::default())
    }

    fn deaths_per_year() -> DataFrame {
        DataFrame::new(vec![
            Column::new("citizenship".into(), ["Israeli", "Israeli", "Palestinian", "Palestinian"]),
            Column::new("year".into(), [2000i32, 2001, 2000, 2001]),
            Column::new("count".into(), [5i64, 7, 40, 90]),
        ])
        .unwrap()
    }

    #[test]
    fn line_series_follow_the_colour_map_order() {
        let style = style()
            .color("Palestinian", "#E5C056")
            .color("Israeli", "#2B2D42")
            .axes("Year", "Number of Deaths");
        let fig = line_chart(&deaths_per_year(), "year", "count", Some("citizenship"), &style).unwrap();

        assert_eq!(fig.data.len(), 2);
        let Trace::Scatter(first) = &fig.data[0] else {
            panic!("expected scatter");
        };
        assert_eq!(first.name.as_deref(), Some("Palestinian"));
        assert_eq!(first.x, vec![2000.0, 2001.0]);
        assert_eq!(first.y, vec![Some(40.0), Some(90.0)]);
        assert_eq!(first.line.color, "#E5C056");
        assert_eq!(fig.layout.yaxis.as_ref().unwrap().title.as_ref().unwrap().text, "Number of Deaths");
    }

    #[test]
    fn ungrouped_line_uses_the_single_colour() {
        let style = style().single_color("#2B2D42");
        let fig = line_chart(&deaths_per_year(), "year", "count", None, &style).unwrap();
        assert_eq!(fig.data.len(), 1);
        assert!(!fig.layout.showlegend);
        let Trace::Scatter(trace) = &fig.data[0] else {
            panic!("expected scatter");
        };
        assert_eq!(trace.line.color, "#2B2D42");
        assert_eq!(trace.x.len(), 4);
    }

    #[test]
    fn missing_axis_column_is_a_schema_error() {
        let err = line_chart(&deaths_per_year(), "year", "deaths", None, &style()).unwrap_err();
        assert!(matches!(err, DashboardError::SchemaError(_)));
    }

    #[test]
    fn bars_keep_bucket_order() {
        let matrix = CountMatrix {
            rows: vec!["0-17".into(), "18-30".into(), "76+".into()],
            columns: vec!["Female".into(), "Male".into()],
            values: vec![vec![1, 2], vec![3, 4], vec![5, 6]],
        };
        let fig = grouped_bar(&matrix, &style().color("Male", "#2B2D42"));
        assert_eq!(fig.layout.barmode, Some("group"));
        let Trace::Bar(male) = &fig.data[1] else {
            panic!("expected bar");
        };
        assert_eq!(male.x, vec!["0-17", "18-30", "76+"]);
        assert_eq!(male.y, vec![2, 4, 6]);
        assert_eq!(male.marker.color, "#2B2D42");
    }

    #[test]
    fn heatmap_serializes_for_plotly() {
        let matrix = CountMatrix {
            rows: vec!["Jan".into(), "Feb".into()],
            columns: vec!["2000".into()],
            values: vec![vec![3], vec![0]],
        };
        let fig = heatmap(&matrix, &style().color_title("Number of Deaths"));
        let json = serde_json::to_value(&fig).unwrap();

        assert_eq!(json["data"][0]["type"], "heatmap");
        assert_eq!(json["data"][0]["y"][0], "Jan");
        assert_eq!(json["data"][0]["colorscale"][1][1], "#E5C056");
        assert_eq!(json["layout"]["yaxis"]["autorange"], "reversed");
        assert_eq!(json["layout"]["paper_bgcolor"], "rgba(0,0,0,0)");
    }

    #[test]
    fn pie_panels_split_the_width() {
        let panels = vec![
            PiePanel {
                title: "Israeli Deaths by Gender".into(),
                slices: vec![("Female".into(), 1), ("Male".into(), 3)],
            },
            PiePanel {
                title: "Palestinian Deaths by Gender".into(),
                slices: vec![("Female".into(), 2), ("Male".into(), 8)],
            },
        ];
        let fig = pie_panels(&panels, &style());
        assert_eq!(fig.data.len(), 2);
        assert_eq!(fig.layout.annotations.len(), 2);
        let Trace::Pie(second) = &fig.data[1] else {
            panic!("expected pie");
        };
        assert!(second.domain.x[0] >= 0.5);
        assert!(!second.sort);
        assert_eq!(second.labels, vec!["Female", "Male"]);
    }
}
