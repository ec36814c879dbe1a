//! REST data-store access and report assembly on top of `labreport-core`.

mod assembler;
mod config;
mod http;
mod loader;
mod refresh;
mod session;

use std::future::Future;

use chrono::NaiveDate;
use labreport_core::{
    dashboard_stats, Classifier, DashboardStats, LabError, Lab, NewLab, NewPatient,
    NewTestRecord, Patient, ReportPayload, TestRecord,
};
use serde::de::DeserializeOwned;

pub use assembler::ReportAssembler;
pub use config::StoreConfig;
pub use http::HttpDataStore;
pub use loader::{LoadOutcome, LoadedState, ReportLoader, ReportSource};
pub use refresh::{spawn_refresh, RefreshHandle};
pub use session::{Session, SessionContext};

/// Operations the front end needs from the data store.
///
/// Implementations must be cheap to share; the assembler issues several
/// calls concurrently.
pub trait DataStore: Send + Sync {
    fn list_patients(&self) -> impl Future<Output = Result<Vec<Patient>, LabError>> + Send;

    fn create_patient(
        &self,
        patient: &NewPatient,
    ) -> impl Future<Output = Result<(), LabError>> + Send;

    fn list_tests(&self) -> impl Future<Output = Result<Vec<TestRecord>, LabError>> + Send;

    fn create_test(&self, test: &NewTestRecord)
        -> impl Future<Output = Result<(), LabError>> + Send;

    fn delete_test(&self, id: i64) -> impl Future<Output = Result<(), LabError>> + Send;

    fn list_labs(&self) -> impl Future<Output = Result<Vec<Lab>, LabError>> + Send;

    fn create_lab(&self, lab: &NewLab) -> impl Future<Output = Result<(), LabError>> + Send;

    /// Consolidated patient + tests body for one patient.
    fn fetch_report(
        &self,
        patient_id: i64,
    ) -> impl Future<Output = Result<ReportPayload, LabError>> + Send;
}

/// Decode a JSON body returned by the data store.
pub fn decode_json<T: DeserializeOwned>(body: &str) -> Result<T, LabError> {
    serde_json::from_str(body).map_err(|err| LabError::Parse(err.to_string()))
}

pub fn decode_report_payload(body: &str) -> Result<ReportPayload, LabError> {
    decode_json(body)
}

/// Fetch patients and tests together and compute the dashboard counters.
pub async fn load_dashboard<S: DataStore>(
    store: &S,
    classifier: &Classifier,
    today: NaiveDate,
) -> Result<DashboardStats, LabError> {
    let (patients, tests) = tokio::try_join!(store.list_patients(), store.list_tests())?;
    tracing::debug!(
        patients = patients.len(),
        tests = tests.len(),
        "dashboard data loaded"
    );
    Ok(dashboard_stats(&patients, &tests, classifier, today))
}
