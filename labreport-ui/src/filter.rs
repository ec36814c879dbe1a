use labreport_core::{CategorySection, ReportView, ResultRow, Tone};

/// On-screen narrowing of a report. Printing always uses the full view.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RowFilter {
    pub alerts_only: bool,
    pub query: String,
}

impl RowFilter {
    pub fn is_active(&self) -> bool {
        self.alerts_only || !self.query.trim().is_empty()
    }

    pub fn matches(&self, row: &ResultRow) -> bool {
        if self.alerts_only && row.styling.tone != Tone::Alert {
            return false;
        }

        let query = self.query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }

        [
            row.test.test_name.as_str(),
            row.test.test_category.as_str(),
            row.status.label(),
        ]
        .iter()
        .any(|text| text.to_lowercase().contains(&query))
    }
}

/// Sections with at least one matching row, keeping report order.
pub fn visible_sections<'a>(
    view: &'a ReportView,
    filter: &RowFilter,
) -> Vec<(&'a CategorySection, Vec<&'a ResultRow>)> {
    view.sections
        .iter()
        .filter_map(|section| {
            let rows: Vec<&ResultRow> = section
                .rows
                .iter()
                .filter(|row| filter.matches(row))
                .collect();
            (!rows.is_empty()).then_some((section, rows))
        })
        .collect()
}
