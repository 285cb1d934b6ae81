//! Async chart rendering with last-write-wins semantics.
//!
//! Each [`RenderSession::request`] takes a new generation number, loads and
//! aggregates on the blocking pool, and publishes its [`RenderUpdate`] on a
//! `watch` channel only if no newer request has been made in the meantime.
//! A slow load that finishes after a newer one is discarded, so consumers
//! never see a stale chart replace a fresh one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use series_core::error::{ChartsError, Result};
use series_core::models::YearRange;
use series_data::charts::{ChartConfig, ChartData};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::data_manager::DataManager;

// ── Public types ──────────────────────────────────────────────────────────────

/// Result of one render request.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    Rendered(ChartData),
    /// Loading failed; nothing is drawn for this chart.
    Failed { chart_id: String, error: String },
}

/// A render outcome tagged with the generation of the request that made it.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderUpdate {
    pub generation: u64,
    pub outcome: RenderOutcome,
}

// ── RenderSession ─────────────────────────────────────────────────────────────

/// Serializes chart renders so that the newest request always wins.
pub struct RenderSession {
    manager: Arc<Mutex<DataManager>>,
    generation: Arc<AtomicU64>,
    tx: watch::Sender<Option<RenderUpdate>>,
}

impl RenderSession {
    /// Create a session and the receiver that observes published renders.
    pub fn new(manager: DataManager) -> (Self, watch::Receiver<Option<RenderUpdate>>) {
        let (tx, rx) = watch::channel(None);
        let session = Self {
            manager: Arc::new(Mutex::new(manager)),
            generation: Arc::new(AtomicU64::new(0)),
            tx,
        };
        (session, rx)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<RenderUpdate>> {
        self.tx.subscribe()
    }

    /// Generation of the most recent request.
    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Start rendering `chart` over `range`. Supersedes every earlier request.
    pub fn request(&self, chart: ChartConfig, range: YearRange) -> RenderHandle {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let latest = Arc::clone(&self.generation);
        let manager = Arc::clone(&self.manager);
        let tx = self.tx.clone();

        tracing::debug!(generation, chart = chart.id, "render requested");

        let handle = tokio::spawn(async move {
            let chart_id = chart.id.to_string();
            let outcome = match tokio::task::spawn_blocking(move || {
                render_blocking(&manager, &chart, range)
            })
            .await
            {
                Ok(Ok(data)) => RenderOutcome::Rendered(data),
                Ok(Err(e)) => {
                    tracing::warn!(chart = %chart_id, error = %e, "chart load failed; skipping render");
                    RenderOutcome::Failed {
                        chart_id,
                        error: e.to_string(),
                    }
                }
                Err(join_err) => RenderOutcome::Failed {
                    chart_id,
                    error: format!("render task failed: {}", join_err),
                },
            };

            let update = RenderUpdate {
                generation,
                outcome,
            };
            publish(&tx, &latest, &update);
            update
        });

        RenderHandle { handle }
    }

    /// Request a render and wait for it.
    pub async fn render(&self, chart: ChartConfig, range: YearRange) -> Result<ChartData> {
        let update = self.request(chart, range).join().await?;
        match update.outcome {
            RenderOutcome::Rendered(data) => Ok(data),
            RenderOutcome::Failed { error, .. } => Err(ChartsError::Other(anyhow::anyhow!(error))),
        }
    }
}

// ── RenderHandle ──────────────────────────────────────────────────────────────

/// Handle to one in-flight render.
pub struct RenderHandle {
    handle: JoinHandle<RenderUpdate>,
}

impl RenderHandle {
    /// Wait for the render to finish, whether or not it was published.
    pub async fn join(self) -> Result<RenderUpdate> {
        self.handle
            .await
            .map_err(|e| ChartsError::Other(anyhow::anyhow!("render task failed: {}", e)))
    }

    /// Cancel the render. A cancelled render never publishes.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn render_blocking(
    manager: &Mutex<DataManager>,
    chart: &ChartConfig,
    range: YearRange,
) -> Result<ChartData> {
    let dataset = {
        let mut mgr = manager.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        mgr.get_dataset(chart.dataset, false)?
    };
    Ok(ChartData::build(chart, &dataset.records, range))
}

/// Publish `update` if it is still the newest request and newer than what the
/// channel holds.
fn publish(tx: &watch::Sender<Option<RenderUpdate>>, latest: &AtomicU64, update: &RenderUpdate) {
    let published = tx.send_if_modified(|slot| {
        let is_latest = latest.load(Ordering::SeqCst) == update.generation;
        let is_newer = slot
            .as_ref()
            .map_or(true, |current| current.generation < update.generation);
        if is_latest && is_newer {
            *slot = Some(update.clone());
            true
        } else {
            false
        }
    });

    if !published {
        tracing::debug!(generation = update.generation, "discarding stale render");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
