//! Category grouping and the precomputed report view handed to renderers.

use std::collections::{hash_map::Entry, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Classifier, Lab, Report, Status, TestRecord};

pub const ALERT_COLOR: &str = "#d32f2f";
pub const NORMAL_COLOR: &str = "#388e3c";

/// Tests sharing one category, in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryGroup<'a> {
    pub category: &'a str,
    pub tests: Vec<&'a TestRecord>,
}

/// Stable grouping: categories in first-seen order, tests in input order.
pub fn group_by_category(tests: &[TestRecord]) -> Vec<CategoryGroup<'_>> {
    group_stable(tests, |test| test.test_category.as_str())
        .into_iter()
        .map(|(category, tests)| CategoryGroup { category, tests })
        .collect()
}

pub(crate) fn group_stable<'a, T, I, F>(items: I, key: F) -> Vec<(&'a str, Vec<&'a T>)>
where
    I: IntoIterator<Item = &'a T>,
    F: Fn(&'a T) -> &'a str,
    T: 'a,
{
    let mut positions: HashMap<&'a str, usize> = HashMap::new();
    let mut groups: Vec<(&'a str, Vec<&'a T>)> = Vec::new();

    for item in items {
        let name = key(item);
        match positions.entry(name) {
            Entry::Occupied(slot) => groups[*slot.get()].1.push(item),
            Entry::Vacant(slot) => {
                slot.insert(groups.len());
                groups.push((name, vec![item]));
            }
        }
    }

    groups
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Alert,
    Normal,
}

impl Tone {
    pub fn color(self) -> &'static str {
        match self {
            Tone::Alert => ALERT_COLOR,
            Tone::Normal => NORMAL_COLOR,
        }
    }
}

/// Presentation attached to a status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Styling {
    pub tone: Tone,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrow: Option<char>,
}

impl Styling {
    /// Styling keys off the display label: "Low", "High" and "Positive" are
    /// alerts, whether classified or carried through as raw text.
    pub fn for_status(status: &Status) -> Self {
        let label = status.label();
        let tone = if matches!(label, "Low" | "High" | "Positive") {
            Tone::Alert
        } else {
            Tone::Normal
        };
        let arrow = match label {
            "Low" => Some('↓'),
            "High" => Some('↑'),
            _ => None,
        };
        Self {
            tone,
            color: tone.color().to_string(),
            arrow,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResultRow {
    pub test: TestRecord,
    pub status: Status,
    pub styling: Styling,
}

impl ResultRow {
    pub fn new(test: TestRecord, classifier: &Classifier) -> Self {
        let status = classifier.classify(&test.test_value, &test.normal_range);
        let styling = Styling::for_status(&status);
        Self {
            test,
            status,
            styling,
        }
    }

    /// Value with its arrow, as printed in the result column.
    pub fn display_value(&self) -> String {
        match self.styling.arrow {
            Some(arrow) => format!("{} {arrow}", self.test.test_value),
            None => self.test.test_value.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategorySection {
    pub category: String,
    pub heading: String,
    pub rows: Vec<ResultRow>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResultSummary {
    pub total: usize,
    pub out_of_range: usize,
    pub alerts: usize,
    pub unclassified: usize,
}

/// Fully resolved report: every status and style is already decided.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportView {
    pub generated_at: DateTime<Utc>,
    pub patient_name: String,
    pub age_sex: String,
    pub patient_code: String,
    pub patient_contact: String,
    pub ref_by: String,
    pub lab_ref_no: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lab: Option<Lab>,
    pub sections: Vec<CategorySection>,
    pub summary: ResultSummary,
}

impl ReportView {
    pub fn rows(&self) -> impl Iterator<Item = &ResultRow> {
        self.sections.iter().flat_map(|section| section.rows.iter())
    }

    /// The records behind the view, in display order.
    pub fn records(&self) -> Vec<TestRecord> {
        self.rows().map(|row| row.test.clone()).collect()
    }
}

pub fn build_report_view(report: &Report, classifier: &Classifier) -> ReportView {
    let sections: Vec<CategorySection> = group_by_category(&report.tests)
        .into_iter()
        .map(|group| CategorySection {
            category: group.category.to_string(),
            heading: group.category.to_uppercase(),
            rows: group
                .tests
                .into_iter()
                .map(|test| ResultRow::new(test.clone(), classifier))
                .collect(),
        })
        .collect();

    let mut summary = ResultSummary::default();
    for row in sections.iter().flat_map(|section| section.rows.iter()) {
        summary.total += 1;
        if row.status.is_out_of_range() {
            summary.out_of_range += 1;
        }
        if row.styling.tone == Tone::Alert {
            summary.alerts += 1;
        }
        if matches!(row.status, Status::Unclassified(_)) {
            summary.unclassified += 1;
        }
    }

    ReportView {
        generated_at: Utc::now(),
        patient_name: report.patient_name.clone(),
        age_sex: format!("{} Years / {}", report.patient_age, report.patient_gender),
        patient_code: report.patient_code.clone(),
        patient_contact: report.patient_contact.clone(),
        ref_by: report.ref_by.clone(),
        lab_ref_no: report.lab_ref_no.clone(),
        lab: report.lab.clone(),
        sections,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(id: i64, category: &str, name: &str, value: &str, range: &str) -> TestRecord {
        TestRecord {
            id,
            patient_id: 1,
            patient_name: "Asha Rai".into(),
            patient_code: None,
            test_category: category.into(),
            test_name: name.into(),
            test_value: value.into(),
            normal_range: range.into(),
            unit: String::new(),
            additional_note: None,
            created_at: None,
        }
    }

    fn sample() -> Vec<TestRecord> {
        vec![
            record(1, "Hematology Tests", "Bleeding Time", "9", "2–7"),
            record(2, "Biochemistry Tests", "Sodium", "140", "135–145"),
            record(3, "Hematology Tests", "Clotting Time", "3", "4–9"),
            record(4, "Microbiology & Serology Tests", "HIV Test", "Negative", "Negative"),
            record(5, "Biochemistry Tests", "Amylase", "90", "Up to 85"),
        ]
    }

    fn report(tests: Vec<TestRecord>) -> Report {
        Report {
            patient_name: "Asha Rai".into(),
            patient_age: 34,
            patient_gender: "Female".into(),
            patient_code: "P-001".into(),
            patient_contact: "-".into(),
            ref_by: "-".into(),
            lab_ref_no: "-".into(),
            lab: None,
            tests,
        }
    }

    #[test]
    fn grouping_keeps_first_seen_order() {
        let tests = sample();
        let groups = group_by_category(&tests);
        let order: Vec<&str> = groups.iter().map(|g| g.category).collect();
        assert_eq!(
            order,
            vec![
                "Hematology Tests",
                "Biochemistry Tests",
                "Microbiology & Serology Tests"
            ]
        );
        let hematology: Vec<i64> = groups[0].tests.iter().map(|t| t.id).collect();
        assert_eq!(hematology, vec![1, 3]);
        assert_eq!(group_by_category(&tests), groups);
    }

    #[test]
    fn empty_input_has_no_groups() {
        assert!(group_by_category(&[]).is_empty());
    }

    #[test]
    fn styling_follows_alert_membership() {
        assert_eq!(Styling::for_status(&Status::Low).arrow, Some('↓'));
        assert_eq!(Styling::for_status(&Status::High).arrow, Some('↑'));
        let positive = Styling::for_status(&Status::Positive);
        assert_eq!(positive.tone, Tone::Alert);
        assert_eq!(positive.arrow, None);
        assert_eq!(positive.color, ALERT_COLOR);
        assert_eq!(Styling::for_status(&Status::Negative).tone, Tone::Normal);
        let raw = Styling::for_status(&Status::Unclassified("Reactive".into()));
        assert_eq!(raw.tone, Tone::Normal);
        assert_eq!(raw.color, NORMAL_COLOR);
    }

    #[test]
    fn raw_text_that_reads_as_an_alert_is_styled_as_one() {
        let status = Classifier::standard().classify("High", "Negative");
        assert_eq!(status, Status::Unclassified("High".to_string()));
        let high = Styling::for_status(&status);
        assert_eq!(high.tone, Tone::Alert);
        assert_eq!(high.color, ALERT_COLOR);
        assert_eq!(high.arrow, Some('↑'));

        let low = Styling::for_status(&Status::Unclassified("Low".into()));
        assert_eq!(low.tone, Tone::Alert);
        assert_eq!(low.arrow, Some('↓'));

        let positive = Styling::for_status(&Status::Unclassified("Positive".into()));
        assert_eq!(positive.tone, Tone::Alert);
        assert_eq!(positive.arrow, None);

        // Styling survives a label round trip.
        let reparsed = Status::from_label(status.label());
        assert_eq!(Styling::for_status(&reparsed), high);
    }

    #[test]
    fn view_attaches_statuses_and_summary() {
        let view = build_report_view(&report(sample()), &Classifier::standard());
        assert_eq!(view.age_sex, "34 Years / Female");
        assert_eq!(view.sections[0].heading, "HEMATOLOGY TESTS");

        let statuses: Vec<&str> = view.rows().map(|row| row.status.label()).collect();
        assert_eq!(statuses, vec!["High", "Low", "Normal", "Normal", "Negative"]);
        assert_eq!(view.rows().next().map(ResultRow::display_value), Some("9 ↑".to_string()));
        assert_eq!(
            view.summary,
            ResultSummary {
                total: 5,
                out_of_range: 2,
                alerts: 2,
                unclassified: 0,
            }
        );
    }

    #[test]
    fn rebuilding_from_view_records_is_idempotent() {
        let classifier = Classifier::standard();
        let first = build_report_view(&report(sample()), &classifier);
        let second = build_report_view(&report(first.records()), &classifier);
        assert_eq!(first.sections, second.sections);
        assert_eq!(first.summary, second.summary);
    }
}
