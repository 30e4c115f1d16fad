/// Visualization module: standalone HTML for a rendered page.
///
/// Walks the [`PageView`] block tree and emits an HTML shell. Charts are
/// rendered client-side by plotly.js from the serialized figure JSON; this
/// module only lays out the blocks and wires each figure to its container.
use std::fmt::Write as FmtWrite;
use std::path::Path;

use tracing::{debug, warn};

use crate::assets::embed_image;
use crate::config::Theme;
use crate::error::DashboardError;
use crate::navigation::{Navigation, Page};
use crate::pages::{Block, PageView};

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

// ── Styling ─────────────────────────────────────────────────────────────────

fn stylesheet(theme: &Theme, background: Option<&str>) -> String {
    let background = match background {
        Some(uri) => format!(
            "background-image: url(\"{uri}\"); background-size: cover; background-attachment: fixed;"
        ),
        None => format!("background-color: {};", theme.primary),
    };
    format!(
        r##"@import url('https://fonts.googleapis.com/css2?family=Poppins:wght@400;600&display=swap');
body {{ font-family: 'Poppins', sans-serif; color: {text}; margin: 0; {background} }}
h1, h2, h3, h4 {{ color: {accent}; }}
nav {{ display: flex; gap: 16px; padding: 12px 24px; background: {panel}; }}
nav a {{ color: {text}; text-decoration: none; padding: 4px 10px; border-radius: 4px; }}
nav a.active {{ background: {accent}; color: {primary}; font-weight: 600; }}
main {{ padding: 24px; }}
.div-box {{ background: {panel}; padding: 16px 20px; border-radius: 10px; margin-bottom: 16px; }}
.columns {{ display: flex; gap: 16px; }}
.columns > div {{ flex: 1; min-width: 0; }}
.metric .value {{ font-size: 2em; font-weight: 600; color: {accent}; }}
.notice {{ border-left: 4px solid {accent}; }}
.chart {{ width: 100%; min-height: 420px; }}
img {{ max-width: 100%; }}
hr {{ border: none; border-top: 1px solid {grid}; }}"##,
        text = theme.text,
        accent = theme.accent,
        primary = theme.primary,
        panel = theme.panel,
        grid = theme.grid,
    )
}

// ── Block rendering ─────────────────────────────────────────────────────────

/// Emitted charts, in document order, as (container id, figure JSON).
struct ChartQueue {
    charts: Vec<(String, String)>,
}

impl ChartQueue {
    fn push(&mut self, figure_json: String) -> String {
        let id = format!("chart-{}", self.charts.len());
        self.charts.push((id.clone(), figure_json));
        id
    }
}

fn render_blocks(out: &mut String, blocks: &[Block], charts: &mut ChartQueue) -> Result<(), DashboardError> {
    for block in blocks {
        render_block(out, block, charts)?;
    }
    Ok(())
}

fn render_block(out: &mut String, block: &Block, charts: &mut ChartQueue) -> Result<(), DashboardError> {
    match block {
        Block::Heading { level, text } => {
            let level = (*level).clamp(1, 6);
            writeln!(out, "<h{level}>{}</h{level}>", escape_html(text))?;
        }
        Block::Text { html } => {
            writeln!(out, r#"<div class="div-box">{html}</div>"#)?;
        }
        Block::Metric { label, value, caption } => {
            write!(
                out,
                r#"<div class="div-box metric"><div class="label">{}</div><div class="value">{}</div>"#,
                escape_html(label),
                escape_html(value)
            )?;
            if let Some(caption) = caption {
                write!(out, r#"<div class="caption">{}</div>"#, escape_html(caption))?;
            }
            writeln!(out, "</div>")?;
        }
        Block::Columns { columns } => {
            writeln!(out, r#"<div class="columns">"#)?;
            for column in columns {
                writeln!(out, "<div>")?;
                render_blocks(out, column, charts)?;
                writeln!(out, "</div>")?;
            }
            writeln!(out, "</div>")?;
        }
        Block::Chart { figure } => {
            let id = charts.push(script_safe(&serde_json::to_string(figure)?));
            writeln!(out, r#"<div class="chart" id="{id}"></div>"#)?;
        }
        Block::Image {
            path,
            data_uri,
            caption,
        } => {
            let alt = caption
                .clone()
                .unwrap_or_else(|| path.display().to_string());
            write!(out, r#"<figure><img src="{}" alt="{}">"#, escape_html(data_uri), escape_html(&alt))?;
            if let Some(caption) = caption {
                write!(out, "<figcaption>{}</figcaption>", escape_html(caption))?;
            }
            writeln!(out, "</figure>")?;
        }
        Block::YearSelector { options, selected } => {
            write!(out, r#"<div class="div-box year-selector">"#)?;
            for year in options {
                let class = if year == selected { r#" class="active""# } else { "" };
                write!(
                    out,
                    r#"<a{class} href="?page={}&amp;year={year}">{year}</a> "#,
                    Page::ChangingBorders.slug()
                )?;
            }
            writeln!(out, "</div>")?;
        }
        Block::Notice { message } => {
            writeln!(out, r#"<div class="div-box notice">{}</div>"#, escape_html(message))?;
        }
        Block::List { items } => {
            write!(out, r#"<div class="div-box"><ul>"#)?;
            for item in items {
                write!(out, "<li>{}</li>", escape_html(item))?;
            }
            writeln!(out, "</ul></div>")?;
        }
        Block::Divider => writeln!(out, "<hr>")?,
    }
    Ok(())
}

fn render_nav(out: &mut String, current: Page) -> Result<(), DashboardError> {
    write!(out, "<nav>")?;
    for page in Page::ALL {
        let class = if page == current { r#" class="active""# } else { "" };
        write!(out, r#"<a{class} href="?page={}">{}</a>"#, page.slug(), page.label())?;
    }
    writeln!(out, "</nav>")?;
    Ok(())
}

// ── HTML generation ─────────────────────────────────────────────────────────

/// Main entry point: a self-contained HTML document for one rendered page.
///
/// A missing background image falls back to the theme's primary colour.
pub fn page_html(
    view: &PageView,
    navigation: &Navigation,
    theme: &Theme,
    background: &Path,
) -> Result<String, DashboardError> {
    let background = match embed_image(background) {
        Ok(uri) => Some(uri),
        Err(e) => {
            warn!(error = %e, "background image unavailable");
            None
        }
    };

    let mut body = String::new();
    let mut charts = ChartQueue { charts: Vec::new() };
    render_nav(&mut body, navigation.page())?;
    writeln!(body, "<main>\n<h1>{}</h1>", escape_html(&view.title))?;
    render_blocks(&mut body, &view.blocks, &mut charts)?;
    writeln!(body, "</main>")?;

    let mut scripts = String::new();
    if !charts.charts.is_empty() {
        writeln!(scripts, r#"<script src="{PLOTLY_CDN}"></script>"#)?;
        writeln!(scripts, "<script>")?;
        for (id, json) in &charts.charts {
            writeln!(
                scripts,
                "(function(f){{Plotly.newPlot(\"{id}\", f.data, f.layout, {{responsive: true}});}})({json});"
            )?;
        }
        writeln!(scripts, "</script>")?;
    }
    debug!(page = view.page.label(), charts = charts.charts.len(), "emitted html");

    Ok(format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
{css}
</style>
</head>
<body>
{body}{scripts}</body>
</html>
"##,
        title = escape_html(&view.title),
        css = stylesheet(theme, background.as_deref()),
    ))
}

// ── Escaping helpers ────────────────────────────────────────────────────────

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// JSON embedded in a `<script>` must not close the element early.
fn script_safe(json: &str) -> String {
    json.replace("</", "<\\/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DashboardConfig;
    use crate::pages::{changing_borders, data_sources};

    #[test]
    fn escapes_markup_in_text() {
        assert_eq!(escape_html(r#"<b>"Tom" & 'Jerry'</b>"#), "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;");
        assert_eq!(script_safe(r#"{"t":"</script>"}"#), r#"{"t":"<\/script>"}"#);
    }

    #[test]
    fn nav_marks_the_current_page() {
        let mut nav = Navigation::new(vec![1967]);
        nav.select(Page::DataSources);
        let html = page_html(&data_sources(), &nav, &Theme::default(), Path::new("/nonexistent/bg.png")).unwrap();

        assert!(html.contains(r#"<a class="active" href="?page=data-sources">Data Sources</a>"#));
        assert!(html.contains(r#"<a href="?page=cost">The Cost</a>"#));
        assert!(html.contains("<li>Israel Population on Worldometer</li>"));
        assert!(html.contains("background-color: #2B2D42;"));
        assert!(!html.contains("plotly"));
    }

    #[test]
    fn background_is_embedded_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let bg = dir.path().join("bg.png");
        std::fs::write(&bg, b"png").unwrap();
        let nav = Navigation::new(vec![1967]);
        let html = page_html(&data_sources(), &nav, &Theme::default(), &bg).unwrap();
        assert!(html.contains("url(\"data:image/png;base64,"));
    }

    #[test]
    fn year_selector_links_every_map() {
        let dir = tempfile::tempdir().unwrap();
        let config = DashboardConfig::default();
        let nav = Navigation::new(config.assets.map_years());
        let view = changing_borders(&config, dir.path(), 1967);
        let html = page_html(&view, &nav, &config.theme, &dir.path().join("bg.png")).unwrap();

        assert!(html.contains(r#"<a class="active" href="?page=changing-borders&amp;year=1967">1967</a>"#));
        assert!(html.contains(r#"href="?page=changing-borders&amp;year=1946""#));
        assert!(html.contains("Map for 1967 is not available."));
    }
}
