use std::sync::Arc;

use labreport_core::{LabError, Lab, Report, ReportConfig, Resource};

use crate::DataStore;

/// Builds a [`Report`] for one patient from data-store reads.
#[derive(Debug)]
pub struct ReportAssembler<S> {
    store: Arc<S>,
    config: ReportConfig,
}

impl<S> Clone for ReportAssembler<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<S: DataStore> ReportAssembler<S> {
    pub fn new(store: Arc<S>, config: ReportConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Joins the patient, test and lab lists client-side. The three reads
    /// run concurrently; any failure aborts the whole assembly.
    pub async fn assemble(&self, patient_id: i64) -> Result<Report, LabError> {
        let (patients, tests, labs) = tokio::try_join!(
            self.store.list_patients(),
            self.store.list_tests(),
            self.store.list_labs()
        )?;

        let patient = patients
            .into_iter()
            .find(|patient| patient.id == patient_id)
            .ok_or_else(|| LabError::not_found(Resource::Patient, patient_id))?;

        let tests: Vec<_> = tests
            .into_iter()
            .filter(|test| test.patient_id == patient_id)
            .collect();

        tracing::debug!(patient_id, tests = tests.len(), "report assembled");
        Ok(Report::from_patient(
            &patient,
            tests,
            labs.into_iter().next(),
            &self.config.placeholder,
        ))
    }

    /// Uses the store's consolidated report body, fetching the lab list
    /// alongside it. A failed lab read only drops the letterhead.
    pub async fn assemble_consolidated(&self, patient_id: i64) -> Result<Report, LabError> {
        let (payload, labs) = tokio::join!(
            self.store.fetch_report(patient_id),
            self.store.list_labs()
        );
        let payload = payload?;
        let lab = first_lab(labs);

        tracing::debug!(
            patient_id,
            tests = payload.tests.len(),
            "consolidated report assembled"
        );
        Ok(payload.into_report(lab, &self.config.placeholder))
    }
}

fn first_lab(labs: Result<Vec<Lab>, LabError>) -> Option<Lab> {
    match labs {
        Ok(labs) => labs.into_iter().next(),
        Err(err) => {
            tracing::warn!(error = %err, "lab details unavailable, rendering without letterhead");
            None
        }
    }
}
