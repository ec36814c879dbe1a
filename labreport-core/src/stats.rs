//! Dashboard counters and patient demographics.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Classifier, Patient, TestRecord};

/// (label, min age, max age), inclusive.
pub const AGE_GROUPS: [(&str, u32, u32); 5] = [
    ("0-17 years", 0, 17),
    ("18-35 years", 18, 35),
    ("36-50 years", 36, 50),
    ("51-65 years", 51, 65),
    ("66+ years", 66, 200),
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_patients: usize,
    pub total_tests: usize,
    pub tests_today: usize,
    pub out_of_range_results: usize,
    /// Patients with at least one recorded test.
    pub reports_generated: usize,
}

pub fn dashboard_stats(
    patients: &[Patient],
    tests: &[TestRecord],
    classifier: &Classifier,
    today: NaiveDate,
) -> DashboardStats {
    let tests_today = tests
        .iter()
        .filter(|test| test.created_at.map(|at| at.date_naive()) == Some(today))
        .count();
    let out_of_range_results = tests
        .iter()
        .filter(|test| {
            classifier
                .classify(&test.test_value, &test.normal_range)
                .is_out_of_range()
        })
        .count();
    let reports_generated = tests
        .iter()
        .map(|test| test.patient_id)
        .collect::<HashSet<_>>()
        .len();

    DashboardStats {
        total_patients: patients.len(),
        total_tests: tests.len(),
        tests_today,
        out_of_range_results,
        reports_generated,
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct GenderCounts {
    pub male: usize,
    pub female: usize,
    pub other: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgeBucket {
    pub label: String,
    pub min: u32,
    pub max: u32,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Demographics {
    pub gender: GenderCounts,
    pub age_groups: Vec<AgeBucket>,
}

impl Demographics {
    /// Whole-number percentage of `count` among all bucketed patients.
    pub fn age_share(&self, count: usize) -> u32 {
        let total: usize = self.age_groups.iter().map(|bucket| bucket.count).sum();
        percent(count, total)
    }

    pub fn gender_share(&self, count: usize) -> u32 {
        let total = self.gender.male + self.gender.female + self.gender.other;
        percent(count, total)
    }
}

fn percent(count: usize, total: usize) -> u32 {
    if total == 0 {
        0
    } else {
        ((count as f64 / total as f64) * 100.0).round() as u32
    }
}

/// Gender is matched on the exact labels "Male" and "Female"; anything
/// else counts as other. Ages past the last bucket are not counted.
pub fn demographics(patients: &[Patient]) -> Demographics {
    let mut gender = GenderCounts::default();
    let mut age_groups: Vec<AgeBucket> = AGE_GROUPS
        .iter()
        .map(|(label, min, max)| AgeBucket {
            label: label.to_string(),
            min: *min,
            max: *max,
            count: 0,
        })
        .collect();

    for patient in patients {
        match patient.gender.as_str() {
            "Male" => gender.male += 1,
            "Female" => gender.female += 1,
            _ => gender.other += 1,
        }
        if let Some(bucket) = age_groups
            .iter_mut()
            .find(|bucket| patient.age >= bucket.min && patient.age <= bucket.max)
        {
            bucket.count += 1;
        }
    }

    Demographics { gender, age_groups }
}
