mod bootstrap;
mod output;

use anyhow::{Context, Result};
use series_core::settings::Settings;
use series_data::charts::{charts_for, find_chart, ChartConfig, ChartData};
use series_runtime::data_manager::{DataManager, DEFAULT_CACHE_TTL_SECS};
use series_runtime::render_session::RenderSession;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Household charts v{} starting", env!("CARGO_PKG_VERSION"));
    settings.validate()?;

    let charts: Vec<ChartConfig> = match settings.chart.as_deref() {
        Some(id) => vec![find_chart(id)?],
        None => charts_for(settings.content_type()),
    };

    let data_dir = settings
        .data_dir
        .clone()
        .or_else(bootstrap::discover_data_dir)
        .context("no data directory found; pass --data-dir or create ./data")?;

    let range = settings.year_range();
    tracing::info!(
        "Data: {}, Content: {}, Years: {:?}..{:?}",
        data_dir.display(),
        settings.content,
        range.min,
        range.max
    );

    let (session, _updates) = RenderSession::new(DataManager::new(data_dir, DEFAULT_CACHE_TTL_SECS));

    let mut rendered: Vec<ChartData> = Vec::with_capacity(charts.len());
    for chart in charts {
        let id = chart.id;
        match session.render(chart, range).await {
            Ok(data) => rendered.push(data),
            // The session already logged the cause; the chart is left out.
            Err(e) => tracing::error!(chart = id, error = %e, "chart skipped"),
        }
    }

    match settings.format.as_str() {
        "json" => println!("{}", output::render_json(&rendered)?),
        _ => {
            let tables: Vec<String> = rendered.iter().map(output::render_table).collect();
            print!("{}", tables.join("\n"));
        }
    }

    Ok(())
}
