//! Runs generations off the caller's thread, one at a time

use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_std::channel::Sender;
use async_std::sync::RwLock;
use async_std::task;

use crate::error::Error;
use crate::replace::ModelReplacementTable;
use crate::sky::{self, Confirm, GenerationConfig, PipelineSettings, Stage};

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Success(Duration),
    /// A confirmation was declined; Nothing was written
    Cancelled,
    Failed(String),
}

impl Display for GenerationOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationOutcome::Success(elapsed) => write!(f, "Done! ({:.2} seconds)", elapsed.as_secs_f64()),
            GenerationOutcome::Cancelled => write!(f, "Cancelled"),
            GenerationOutcome::Failed(message) => write!(f, "error: {}", message),
        }
    }
}

/// Clears the busy flag when a run ends, however it ends
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Clone)]
pub struct GenerationService {
    table: Arc<RwLock<ModelReplacementTable>>,
    settings: PipelineSettings,
    busy: Arc<AtomicBool>,
}

impl GenerationService {
    pub fn new(table: ModelReplacementTable, settings: PipelineSettings) -> GenerationService {
        GenerationService {
            table: Arc::new(RwLock::new(table)),
            settings,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared replacement table; Edits made while a run is in flight apply to the next run
    pub fn table(&self) -> Arc<RwLock<ModelReplacementTable>> {
        Arc::clone(&self.table)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Runs one generation on a blocking worker. `confirm` is called from that worker and may block on the user.
    /// A second call while a run is in flight fails straight away.
    pub async fn generate<C>(&self, config: GenerationConfig, mut confirm: C, progress: Sender<Stage>) -> GenerationOutcome
        where C: Confirm + Send + 'static
    {
        if self.busy.swap(true, Ordering::AcqRel) {
            log::warn!("Rejected a generation request while another is running");
            return GenerationOutcome::Failed(Error::Busy.to_string());
        }
        // Owned by the worker, so a dropped future cannot clear the flag while the run goes on
        let guard = BusyGuard(Arc::clone(&self.busy));

        let table = self.table.read().await.clone();
        let settings = self.settings.clone();
        let start = Instant::now();
        let result = task::spawn_blocking(move || {
            let _guard = guard;
            sky::generate(&config, &settings, &table, &mut confirm, |stage| {
                // Unbounded, so this only fails once the receiver is gone
                let _ = progress.try_send(stage);
            })
        }).await;

        match result {
            Ok(report) => {
                log::info!("Generated {} from {} object(s)", report.output_path.display(), report.extracted);
                GenerationOutcome::Success(start.elapsed())
            }
            Err(Error::Cancelled) => GenerationOutcome::Cancelled,
            Err(err) => {
                log::error!("{}", err);
                GenerationOutcome::Failed(err.to_string())
            }
        }
    }
}
