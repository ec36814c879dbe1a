//! Last-request-wins report loading.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use labreport_core::{build_report_view, Classifier, LabError, ReportView};

use crate::{DataStore, ReportAssembler};

/// Which store reads feed the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportSource {
    /// Patient, test and lab lists joined client-side.
    #[default]
    Joined,
    /// The store's consolidated report body plus the lab list.
    Consolidated,
}

/// What the UI currently shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedState {
    pub patient_id: Option<i64>,
    pub view: Option<ReportView>,
    /// Message from the most recent failed load, cleared by a success.
    pub error: Option<String>,
}

#[derive(Debug)]
pub enum LoadOutcome {
    Loaded,
    /// The state kept its previous view; only `error` changed.
    Failed(LabError),
    /// A newer request was issued while this one was in flight; its result
    /// was dropped.
    Superseded,
}

pub struct ReportLoader<S> {
    assembler: ReportAssembler<S>,
    classifier: Classifier,
    source: ReportSource,
    generation: AtomicU64,
    state: Mutex<LoadedState>,
}

impl<S: DataStore> ReportLoader<S> {
    pub fn new(assembler: ReportAssembler<S>) -> Self {
        let classifier = Classifier::from_config(assembler.config());
        Self {
            assembler,
            classifier,
            source: ReportSource::default(),
            generation: AtomicU64::new(0),
            state: Mutex::new(LoadedState::default()),
        }
    }

    pub fn with_source(mut self, source: ReportSource) -> Self {
        self.source = source;
        self
    }

    pub async fn load(&self, patient_id: i64) -> LoadOutcome {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let result = match self.source {
            ReportSource::Joined => self.assembler.assemble(patient_id).await,
            ReportSource::Consolidated => self.assembler.assemble_consolidated(patient_id).await,
        };

        let mut state = self.lock_state();
        if self.generation.load(Ordering::SeqCst) != ticket {
            tracing::debug!(patient_id, ticket, "discarding superseded report load");
            return LoadOutcome::Superseded;
        }

        match result {
            Ok(report) => {
                state.patient_id = Some(patient_id);
                state.view = Some(build_report_view(&report, &self.classifier));
                state.error = None;
                LoadOutcome::Loaded
            }
            Err(err) => {
                tracing::warn!(patient_id, error = %err, "report load failed");
                state.error = Some(err.user_message());
                LoadOutcome::Failed(err)
            }
        }
    }

    /// Drop the current view and invalidate any load still in flight.
    pub fn reset(&self) {
        let mut state = self.lock_state();
        self.generation.fetch_add(1, Ordering::SeqCst);
        *state = LoadedState::default();
    }

    pub fn snapshot(&self) -> LoadedState {
        self.lock_state().clone()
    }

    fn lock_state(&self) -> MutexGuard<'_, LoadedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
