use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDate, TimeZone, Utc};
use labreport_core::{
    Classifier, LabError, Lab, NewLab, NewPatient, NewTestRecord, Patient, ReportConfig,
    ReportPayload, Resource, Status, TestRecord,
};
use labreport_store::{
    load_dashboard, spawn_refresh, DataStore, LoadOutcome, ReportAssembler, ReportLoader,
    ReportSource,
};
use pretty_assertions::assert_eq;

#[derive(Default)]
struct MemoryStore {
    patients: Vec<Patient>,
    tests: Vec<TestRecord>,
    labs: Vec<Lab>,
    fail_tests: AtomicBool,
    fail_labs: AtomicBool,
    /// Consumed one per `list_patients`/`fetch_report` call.
    delays: Mutex<VecDeque<Duration>>,
}

impl MemoryStore {
    fn seeded() -> Self {
        Self {
            patients: vec![patient(1, "Asha Rai", "P-001"), patient(2, "Bikash Thapa", "P-002")],
            tests: vec![
                test(10, 1, "Biochemistry Tests", "Fasting Blood Sugar", "150", "70–110"),
                test(11, 2, "Hematology Tests", "Hemoglobin", "9", "12–16"),
                test(12, 1, "Microbiology & Serology Tests", "HIV Test", "Negative", "Negative"),
                test(13, 1, "Biochemistry Tests", "Sodium", "130", "135–145"),
            ],
            labs: vec![lab(1, "Sunrise Diagnostics"), lab(2, "Backup Lab")],
            ..Self::default()
        }
    }

    fn with_delays(self, delays: &[u64]) -> Self {
        *self.delays.lock().unwrap() = delays.iter().copied().map(Duration::from_millis).collect();
        self
    }

    async fn latency(&self) {
        let delay = self.delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn find_patient(&self, id: i64) -> Result<&Patient, LabError> {
        self.patients
            .iter()
            .find(|patient| patient.id == id)
            .ok_or_else(|| LabError::not_found(Resource::Patient, id))
    }
}

impl DataStore for MemoryStore {
    async fn list_patients(&self) -> Result<Vec<Patient>, LabError> {
        self.latency().await;
        Ok(self.patients.clone())
    }

    async fn create_patient(&self, patient: &NewPatient) -> Result<(), LabError> {
        patient.validate()
    }

    async fn list_tests(&self) -> Result<Vec<TestRecord>, LabError> {
        if self.fail_tests.load(Ordering::SeqCst) {
            return Err(LabError::TransientFetch("connection reset".into()));
        }
        Ok(self.tests.clone())
    }

    async fn create_test(&self, test: &NewTestRecord) -> Result<(), LabError> {
        test.validate()
    }

    async fn delete_test(&self, id: i64) -> Result<(), LabError> {
        if self.tests.iter().any(|test| test.id == id) {
            Ok(())
        } else {
            Err(LabError::not_found(Resource::Test, id))
        }
    }

    async fn list_labs(&self) -> Result<Vec<Lab>, LabError> {
        if self.fail_labs.load(Ordering::SeqCst) {
            return Err(LabError::TransientFetch("HTTP 503: unavailable".into()));
        }
        Ok(self.labs.clone())
    }

    async fn create_lab(&self, lab: &NewLab) -> Result<(), LabError> {
        lab.validate()
    }

    async fn fetch_report(&self, patient_id: i64) -> Result<ReportPayload, LabError> {
        self.latency().await;
        let patient = self.find_patient(patient_id)?;
        Ok(ReportPayload {
            patient_name: patient.full_name.clone(),
            patient_age: patient.age,
            patient_gender: patient.gender.clone(),
            patient_code: patient.patient_code.clone(),
            patient_contact: Some(patient.contact_number.clone()),
            ref_by: patient.ref_by.clone(),
            lab_ref_no: patient.lab_ref_no.clone(),
            lab: None,
            tests: self
                .tests
                .iter()
                .filter(|test| test.patient_id == patient_id)
                .cloned()
                .collect(),
        })
    }
}

fn patient(id: i64, name: &str, code: &str) -> Patient {
    Patient {
        id,
        full_name: name.into(),
        age: 34,
        gender: "Female".into(),
        contact_number: "9800000000".into(),
        email: String::new(),
        patient_code: code.into(),
        address: "Kathmandu".into(),
        ref_by: (id == 1).then(|| "Dr. Sharma".to_string()),
        lab_ref_no: None,
        created_at: None,
    }
}

fn test(
    id: i64,
    patient_id: i64,
    category: &str,
    name: &str,
    value: &str,
    range: &str,
) -> TestRecord {
    TestRecord {
        id,
        patient_id,
        patient_name: String::new(),
        patient_code: None,
        test_category: category.into(),
        test_name: name.into(),
        test_value: value.into(),
        normal_range: range.into(),
        unit: String::new(),
        additional_note: None,
        created_at: Some(Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()),
    }
}

fn lab(id: i64, name: &str) -> Lab {
    Lab {
        id,
        name: name.into(),
        slogan: None,
        address: "Main Road".into(),
        phone: "01-5550100".into(),
        email: "lab@example.com".into(),
        created_at: None,
    }
}

fn assembler(store: MemoryStore) -> ReportAssembler<MemoryStore> {
    ReportAssembler::new(Arc::new(store), ReportConfig::default())
}

#[tokio::test]
async fn joins_patient_tests_and_first_lab() {
    let report = assembler(MemoryStore::seeded()).assemble(1).await.unwrap();

    assert_eq!(report.patient_name, "Asha Rai");
    assert_eq!(report.ref_by, "Dr. Sharma");
    assert_eq!(report.lab_ref_no, "-");
    assert_eq!(report.lab.map(|lab| lab.name), Some("Sunrise Diagnostics".to_string()));
    let ids: Vec<i64> = report.tests.iter().map(|test| test.id).collect();
    assert_eq!(ids, vec![10, 12, 13]);
}

#[tokio::test]
async fn unknown_patient_is_not_found() {
    let err = assembler(MemoryStore::seeded()).assemble(99).await.unwrap_err();
    assert!(matches!(
        err,
        LabError::NotFound { resource: Resource::Patient, ref id } if id == "99"
    ));
}

#[tokio::test]
async fn any_failed_read_fails_the_joined_report() {
    let store = MemoryStore::seeded();
    store.fail_labs.store(true, Ordering::SeqCst);
    let err = assembler(store).assemble(1).await.unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn consolidated_report_survives_missing_lab() {
    let store = MemoryStore::seeded();
    store.fail_labs.store(true, Ordering::SeqCst);
    let report = assembler(store).assemble_consolidated(2).await.unwrap();

    assert_eq!(report.patient_name, "Bikash Thapa");
    assert_eq!(report.ref_by, "-");
    assert!(report.lab.is_none());
    assert_eq!(report.tests.len(), 1);
}

#[tokio::test]
async fn consolidated_unknown_patient_is_not_found() {
    let err = assembler(MemoryStore::seeded())
        .assemble_consolidated(7)
        .await
        .unwrap_err();
    assert!(matches!(err, LabError::NotFound { .. }));
}

#[tokio::test(start_paused = true)]
async fn slow_earlier_request_is_discarded() {
    let loader = ReportLoader::new(assembler(MemoryStore::seeded().with_delays(&[100, 10])));

    let (first, second) = tokio::join!(loader.load(1), loader.load(2));

    assert!(matches!(first, LoadOutcome::Superseded));
    assert!(matches!(second, LoadOutcome::Loaded));
    let state = loader.snapshot();
    assert_eq!(state.patient_id, Some(2));
    assert_eq!(state.view.unwrap().patient_name, "Bikash Thapa");
}

#[tokio::test(start_paused = true)]
async fn fast_earlier_request_is_also_discarded() {
    let loader = ReportLoader::new(assembler(MemoryStore::seeded().with_delays(&[10, 100])))
        .with_source(ReportSource::Consolidated);

    let (first, second) = tokio::join!(loader.load(1), loader.load(2));

    assert!(matches!(first, LoadOutcome::Superseded));
    assert!(matches!(second, LoadOutcome::Loaded));
    assert_eq!(loader.snapshot().patient_id, Some(2));
}

#[tokio::test]
async fn failure_keeps_previous_view() {
    let store = Arc::new(MemoryStore::seeded());
    let assembler = ReportAssembler::new(Arc::clone(&store), ReportConfig::default());
    let loader = ReportLoader::new(assembler);

    assert!(matches!(loader.load(1).await, LoadOutcome::Loaded));
    store.fail_tests.store(true, Ordering::SeqCst);

    match loader.load(1).await {
        LoadOutcome::Failed(err) => assert!(err.is_transient()),
        other => panic!("expected failure, got {other:?}"),
    }
    let state = loader.snapshot();
    assert_eq!(
        state.error.as_deref(),
        Some("Error fetching report data. Please try again later.")
    );
    assert_eq!(state.view.map(|view| view.summary.total), Some(3));

    store.fail_tests.store(false, Ordering::SeqCst);
    assert!(matches!(loader.load(1).await, LoadOutcome::Loaded));
    assert!(loader.snapshot().error.is_none());
}

#[tokio::test(start_paused = true)]
async fn reset_drops_in_flight_load() {
    let loader = ReportLoader::new(assembler(MemoryStore::seeded().with_delays(&[100])));

    let (outcome, ()) = tokio::join!(loader.load(1), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        loader.reset();
    });

    assert!(matches!(outcome, LoadOutcome::Superseded));
    assert!(loader.snapshot().view.is_none());
}

#[tokio::test]
async fn loaded_view_is_classified() {
    let loader = ReportLoader::new(assembler(MemoryStore::seeded()));
    loader.load(1).await;

    let view = loader.snapshot().view.unwrap();
    let statuses: Vec<(&str, Status)> = view
        .rows()
        .map(|row| (row.test.test_name.as_str(), row.status.clone()))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("Fasting Blood Sugar", Status::High),
            ("Sodium", Status::Low),
            ("HIV Test", Status::Negative),
        ]
    );
    assert_eq!(view.summary.out_of_range, 2);
}

#[tokio::test]
async fn dashboard_counts_today_and_out_of_range() {
    let store = MemoryStore::seeded();
    let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    let stats = load_dashboard(&store, &Classifier::standard(), today).await.unwrap();

    assert_eq!(stats.total_patients, 2);
    assert_eq!(stats.total_tests, 4);
    assert_eq!(stats.tests_today, 4);
    assert_eq!(stats.out_of_range_results, 3);
    assert_eq!(stats.reports_generated, 2);
}

#[tokio::test(start_paused = true)]
async fn refresh_task_reloads_the_report() {
    let loader = Arc::new(ReportLoader::new(assembler(MemoryStore::seeded())));
    let shared = Arc::clone(&loader);
    let handle = spawn_refresh(Duration::from_secs(30), move || {
        let loader = Arc::clone(&shared);
        async move {
            loader.load(1).await;
        }
    });

    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(loader.snapshot().patient_id, Some(1));
    handle.stop();
}
