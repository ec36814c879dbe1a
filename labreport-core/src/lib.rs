//! Result-interpretation core: reference ranges, status classification,
//! category grouping and the static test catalog.

mod aggregate;
mod catalog;
mod classify;
mod model;
mod stats;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use aggregate::{
    build_report_view, group_by_category, CategoryGroup, CategorySection, ReportView,
    ResultRow, ResultSummary, Styling, Tone, ALERT_COLOR, NORMAL_COLOR,
};
pub use catalog::{Catalog, CatalogCategory, CatalogDivergence};
pub use classify::{
    classify, AboveMatcher, BelowMatcher, BracketMatcher, Classifier, QualitativeMatcher,
    RangeMatcher, ReferenceRange, Status, UpToMatcher,
};
pub use model::{
    Lab, NewLab, NewPatient, NewTestRecord, Patient, Report, ReportPayload, TestDefinition,
    TestRecord,
};
pub use stats::{
    dashboard_stats, demographics, AgeBucket, DashboardStats, Demographics, GenderCounts,
    AGE_GROUPS,
};

/// Tuning knobs for interpretation and report assembly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportConfig {
    /// Also recognize "Up to N" ranges (off in the standard matcher chain).
    pub recognize_up_to: bool,
    /// Shown for contact, referrer and lab reference when absent.
    pub placeholder: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            recognize_up_to: false,
            placeholder: "-".to_string(),
        }
    }
}

/// Which kind of record a lookup failed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Patient,
    Lab,
    Test,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Resource::Patient => "patient",
            Resource::Lab => "lab",
            Resource::Test => "test",
        })
    }
}

/// Errors shared by the store client, assembler and form payloads.
#[derive(Debug, thiserror::Error)]
pub enum LabError {
    #[error("{resource} {id} not found")]
    NotFound { resource: Resource, id: String },
    #[error("data store unreachable: {0}")]
    TransientFetch(String),
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("could not read data: {0}")]
    Parse(String),
    #[error("local storage error: {0}")]
    Storage(String),
}

impl LabError {
    pub fn not_found(resource: Resource, id: impl ToString) -> Self {
        LabError::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// True when retrying later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, LabError::TransientFetch(_))
    }

    /// Message suitable for showing to an operator.
    pub fn user_message(&self) -> String {
        match self {
            LabError::NotFound { resource, .. } => format!("No such {resource}."),
            LabError::TransientFetch(_) => {
                "Error fetching report data. Please try again later.".to_string()
            }
            LabError::Validation(detail) => detail.clone(),
            LabError::Parse(_) => {
                "The data store returned data that could not be read.".to_string()
            }
            LabError::Storage(detail) => format!("Could not access local storage: {detail}"),
        }
    }
}
