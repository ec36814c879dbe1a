use labreport_core::{
    Catalog, LabError, Lab, NewLab, NewPatient, NewTestRecord, Patient, ReportPayload, Resource,
    TestRecord,
};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::{decode_json, DataStore, StoreConfig};

/// `DataStore` over the lab's JSON REST API.
#[derive(Debug, Clone)]
pub struct HttpDataStore {
    base_url: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

/// Error body the data store sends with 4xx/5xx responses.
#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl HttpDataStore {
    pub fn new(config: &StoreConfig) -> Result<Self, LabError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|err| {
                LabError::TransientFetch(format!("could not build HTTP client: {err}"))
            })?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        missing: Option<(Resource, String)>,
    ) -> Result<T, LabError> {
        let body = self.send(self.client.get(self.url(path)), path, missing).await?;
        decode_json(&body)
    }

    async fn send(
        &self,
        request: RequestBuilder,
        path: &str,
        missing: Option<(Resource, String)>,
    ) -> Result<String, LabError> {
        tracing::debug!(base_url = %self.base_url, path, "data store request");

        let response = request.send().await.map_err(|err| {
            let mapped = self.transport_error(&err);
            tracing::warn!(path, error = %err, "data store request failed");
            mapped
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| LabError::TransientFetch(format!("reading response body: {err}")))?;

        if status.is_success() {
            tracing::debug!(
                path,
                status = status.as_u16(),
                bytes = body.len(),
                "data store response"
            );
            Ok(body)
        } else {
            Err(status_error(status, &body, missing))
        }
    }

    fn transport_error(&self, err: &reqwest::Error) -> LabError {
        if err.is_timeout() {
            LabError::TransientFetch(format!(
                "request to {} timed out after {}s",
                self.base_url, self.timeout_secs
            ))
        } else if err.is_connect() {
            LabError::TransientFetch(format!("cannot connect to {}", self.base_url))
        } else {
            LabError::TransientFetch(err.to_string())
        }
    }
}

/// Map a non-success response. 404 only means "unknown record" when the
/// request addressed one; otherwise the endpoint itself is missing.
fn status_error(
    status: StatusCode,
    body: &str,
    missing: Option<(Resource, String)>,
) -> LabError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|parsed| parsed.error)
        .unwrap_or_else(|_| body.trim().to_string());
    let message = if message.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unexpected response")
            .to_string()
    } else {
        message
    };

    match status {
        StatusCode::NOT_FOUND => match missing {
            Some((resource, id)) => LabError::NotFound { resource, id },
            None => LabError::TransientFetch(format!("HTTP 404: {message}")),
        },
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            LabError::Validation(message)
        }
        other => LabError::TransientFetch(format!("HTTP {}: {message}", other.as_u16())),
    }
}

impl DataStore for HttpDataStore {
    async fn list_patients(&self) -> Result<Vec<Patient>, LabError> {
        self.get_json("/api/patients", None).await
    }

    async fn create_patient(&self, patient: &NewPatient) -> Result<(), LabError> {
        patient.validate()?;
        let path = "/api/patients";
        self.send(self.client.post(self.url(path)).json(patient), path, None)
            .await?;
        tracing::info!(patient_code = %patient.patient_code, "patient created");
        Ok(())
    }

    async fn list_tests(&self) -> Result<Vec<TestRecord>, LabError> {
        self.get_json("/api/tests", None).await
    }

    async fn create_test(&self, test: &NewTestRecord) -> Result<(), LabError> {
        test.validate()?;
        for divergence in Catalog::builtin().divergences(test) {
            tracing::warn!(
                category = %test.test_category,
                test = %test.test_name,
                %divergence,
                "submitted test differs from the reference catalog"
            );
        }
        let path = "/api/tests";
        self.send(self.client.post(self.url(path)).json(test), path, None)
            .await?;
        tracing::info!(
            patient_id = test.patient_id,
            test = %test.test_name,
            "test result recorded"
        );
        Ok(())
    }

    async fn delete_test(&self, id: i64) -> Result<(), LabError> {
        let path = format!("/api/tests/{id}");
        self.send(
            self.client.delete(self.url(&path)),
            &path,
            Some((Resource::Test, id.to_string())),
        )
        .await?;
        tracing::info!(id, "test result deleted");
        Ok(())
    }

    async fn list_labs(&self) -> Result<Vec<Lab>, LabError> {
        self.get_json("/api/labs", None).await
    }

    async fn create_lab(&self, lab: &NewLab) -> Result<(), LabError> {
        lab.validate()?;
        let path = "/api/labs";
        self.send(self.client.post(self.url(path)).json(lab), path, None)
            .await?;
        tracing::info!(name = %lab.name, "lab created");
        Ok(())
    }

    async fn fetch_report(&self, patient_id: i64) -> Result<ReportPayload, LabError> {
        self.get_json(
            &format!("/api/reports/{patient_id}"),
            Some((Resource::Patient, patient_id.to_string())),
        )
        .await
    }
}
