//! Records exchanged with the data store and handed to the renderer.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

use crate::LabError;

/// One row of the reference catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TestDefinition {
    pub category: String,
    pub name: String,
    pub unit: String,
    pub reference_range: String,
}

/// A stored test result. Value and range stay textual on purpose: ranges
/// such as "Negative" or "M: 3.5–7.2; F: 2.6–6.0" are not numbers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestRecord {
    pub id: i64,
    #[serde(default)]
    pub patient_id: i64,
    #[serde(default)]
    pub patient_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_code: Option<String>,
    pub test_category: String,
    pub test_name: String,
    #[serde(deserialize_with = "text_or_number")]
    pub test_value: String,
    #[serde(deserialize_with = "text_or_number")]
    pub normal_range: String,
    #[serde(default)]
    pub unit: String,
    #[serde(
        default,
        deserialize_with = "optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_note: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: i64,
    pub full_name: String,
    #[serde(deserialize_with = "age_from_text_or_number")]
    pub age: u32,
    pub gender: String,
    pub contact_number: String,
    #[serde(default)]
    pub email: String,
    pub patient_code: String,
    #[serde(default)]
    pub address: String,
    #[serde(
        default,
        deserialize_with = "optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub ref_by: Option<String>,
    #[serde(
        default,
        deserialize_with = "optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub lab_ref_no: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Laboratory letterhead details.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lab {
    pub id: i64,
    pub name: String,
    #[serde(
        default,
        deserialize_with = "optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub slogan: Option<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    pub full_name: String,
    pub age: u32,
    pub gender: String,
    pub contact_number: String,
    pub email: String,
    pub patient_code: String,
    pub address: String,
}

impl NewPatient {
    pub fn validate(&self) -> Result<(), LabError> {
        require(&[
            ("fullName", &self.full_name),
            ("gender", &self.gender),
            ("contactNumber", &self.contact_number),
            ("email", &self.email),
            ("patientCode", &self.patient_code),
            ("address", &self.address),
        ])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewTestRecord {
    pub patient_id: i64,
    pub test_category: String,
    pub test_name: String,
    pub test_value: String,
    pub normal_range: String,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_note: Option<String>,
}

impl NewTestRecord {
    /// Entry form state after the operator picked `definition`: unit and
    /// range are copied from the catalog.
    pub fn prefilled(
        patient_id: i64,
        definition: &TestDefinition,
        value: impl Into<String>,
    ) -> Self {
        Self {
            patient_id,
            test_category: definition.category.clone(),
            test_name: definition.name.clone(),
            test_value: value.into(),
            normal_range: definition.reference_range.clone(),
            unit: definition.unit.clone(),
            additional_note: None,
        }
    }

    pub fn validate(&self) -> Result<(), LabError> {
        require(&[
            ("testCategory", &self.test_category),
            ("testName", &self.test_name),
            ("testValue", &self.test_value),
            ("normalRange", &self.normal_range),
            ("unit", &self.unit),
        ])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewLab {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slogan: Option<String>,
    pub address: String,
    pub phone: String,
    pub email: String,
}

impl NewLab {
    pub fn validate(&self) -> Result<(), LabError> {
        require(&[
            ("name", &self.name),
            ("address", &self.address),
            ("phone", &self.phone),
            ("email", &self.email),
        ])
    }
}

fn require(fields: &[(&str, &String)]) -> Result<(), LabError> {
    match fields.iter().find(|(_, value)| value.trim().is_empty()) {
        Some((name, _)) => Err(LabError::Validation(format!(
            "Missing required field: {name}"
        ))),
        None => Ok(()),
    }
}

/// Everything the renderer needs about one patient. Built on demand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub patient_name: String,
    pub patient_age: u32,
    pub patient_gender: String,
    pub patient_code: String,
    pub patient_contact: String,
    pub ref_by: String,
    pub lab_ref_no: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lab: Option<Lab>,
    #[serde(default)]
    pub tests: Vec<TestRecord>,
}

impl Report {
    pub fn from_patient(
        patient: &Patient,
        tests: Vec<TestRecord>,
        lab: Option<Lab>,
        placeholder: &str,
    ) -> Self {
        Self {
            patient_name: patient.full_name.clone(),
            patient_age: patient.age,
            patient_gender: patient.gender.clone(),
            patient_code: patient.patient_code.clone(),
            patient_contact: or_placeholder(Some(patient.contact_number.clone()), placeholder),
            ref_by: or_placeholder(patient.ref_by.clone(), placeholder),
            lab_ref_no: or_placeholder(patient.lab_ref_no.clone(), placeholder),
            lab,
            tests,
        }
    }
}

/// Consolidated report body served by the data store for one patient.
/// Any server-side `status` on the tests is ignored; it gets recomputed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportPayload {
    pub patient_name: String,
    #[serde(deserialize_with = "age_from_text_or_number")]
    pub patient_age: u32,
    pub patient_gender: String,
    pub patient_code: String,
    #[serde(default)]
    pub patient_contact: Option<String>,
    #[serde(default)]
    pub ref_by: Option<String>,
    #[serde(default)]
    pub lab_ref_no: Option<String>,
    #[serde(default)]
    pub lab: Option<Lab>,
    #[serde(default)]
    pub tests: Vec<TestRecord>,
}

impl ReportPayload {
    /// A lab embedded in the payload wins over `lab`.
    pub fn into_report(self, lab: Option<Lab>, placeholder: &str) -> Report {
        Report {
            patient_name: self.patient_name,
            patient_age: self.patient_age,
            patient_gender: self.patient_gender,
            patient_code: self.patient_code,
            patient_contact: or_placeholder(self.patient_contact, placeholder),
            ref_by: or_placeholder(self.ref_by, placeholder),
            lab_ref_no: or_placeholder(self.lab_ref_no, placeholder),
            lab: self.lab.or(lab),
            tests: self.tests,
        }
    }
}

fn or_placeholder(value: Option<String>, placeholder: &str) -> String {
    match value {
        Some(text) if !text.trim().is_empty() => text,
        _ => placeholder.to_string(),
    }
}

enum Scalar {
    Text(String),
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

struct ScalarVisitor;

impl<'de> Visitor<'de> for ScalarVisitor {
    type Value = Scalar;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string or a number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Scalar, E> {
        Ok(Scalar::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Scalar, E> {
        Ok(Scalar::Text(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Scalar, E> {
        Ok(Scalar::Signed(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Scalar, E> {
        Ok(Scalar::Unsigned(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Scalar, E> {
        Ok(Scalar::Float(v))
    }
}

fn text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match deserializer.deserialize_any(ScalarVisitor)? {
        Scalar::Text(text) => text,
        Scalar::Signed(v) => v.to_string(),
        Scalar::Unsigned(v) => v.to_string(),
        Scalar::Float(v) => format_numeric(v),
    })
}

fn age_from_text_or_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let parsed = match deserializer.deserialize_any(ScalarVisitor)? {
        Scalar::Text(text) => text.trim().parse::<u32>().ok(),
        Scalar::Signed(v) => u32::try_from(v).ok(),
        Scalar::Unsigned(v) => u32::try_from(v).ok(),
        Scalar::Float(v) if v >= 0.0 && v <= u32::MAX as f64 => Some(v.trunc() as u32),
        Scalar::Float(_) => None,
    };
    parsed.ok_or_else(|| de::Error::custom("age must be a non-negative whole number"))
}

fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|text| !text.trim().is_empty()))
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .as_deref()
        .and_then(parse_timestamp))
}

/// RFC 3339, or the `YYYY-MM-DD HH:MM:SS` form SQLite stores (taken as UTC).
pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

fn format_numeric(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}
