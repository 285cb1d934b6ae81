use series_core::formatting::{fit_label, format_currency, format_number, format_year_span};
use series_data::charts::{ChartData, ChartKind};

const YEAR_WIDTH: usize = 6;
const COLUMN_WIDTH: usize = 16;

/// Shown in place of a table when no year survived aggregation.
pub const EMPTY_PLACEHOLDER: &str = "(no data for the selected years)";

fn format_value(kind: ChartKind, value: f64) -> String {
    match kind {
        // Product prices are per-unit dollars; everything else is whole dollars.
        ChartKind::Bar => format_currency(value),
        ChartKind::StackedArea | ChartKind::Line => format_number(value, 0),
    }
}

/// Render one chart as a fixed-width text table.
pub fn render_table(chart: &ChartData) -> String {
    let mut out = format!(
        "{} [{}]\n",
        chart.title,
        format_year_span(chart.year_extent)
    );

    if chart.is_empty() {
        out.push_str(EMPTY_PLACEHOLDER);
        out.push('\n');
        return out;
    }

    out.push_str(&fit_label("Year", YEAR_WIDTH));
    for key in &chart.legend {
        out.push(' ');
        out.push_str(&format!(
            "{:>width$}",
            fit_label(key, COLUMN_WIDTH).trim_end(),
            width = COLUMN_WIDTH
        ));
    }
    out.push('\n');
    out.push_str(&"─".repeat(YEAR_WIDTH + chart.legend.len() * (COLUMN_WIDTH + 1)));
    out.push('\n');

    for point in &chart.points {
        out.push_str(&fit_label(&point.year.to_string(), YEAR_WIDTH));
        for key in &chart.legend {
            let cell = point
                .value(key)
                .map(|v| format_value(chart.kind, v))
                .unwrap_or_else(|| "-".to_string());
            out.push(' ');
            out.push_str(&format!("{:>width$}", cell, width = COLUMN_WIDTH));
        }
        out.push('\n');
    }

    out
}

/// Serialize the rendered charts as pretty JSON.
pub fn render_json(charts: &[ChartData]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(charts)
}
