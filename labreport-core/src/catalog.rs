//! Static reference catalog used to prefill the test-entry form.

use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use serde::Serialize;

use crate::aggregate::group_stable;
use crate::{LabError, NewTestRecord, TestDefinition};

const BIOCHEMISTRY: &str = "Biochemistry Tests";
const HEMATOLOGY: &str = "Hematology Tests";
const SEROLOGY: &str = "Microbiology & Serology Tests";
const URINE_STOOL: &str = "Urine and Stool Tests";

/// (category, name, unit, reference range)
const DEFINITIONS: &[(&str, &str, &str, &str)] = &[
    (BIOCHEMISTRY, "Fasting Blood Sugar (FBS)", "mg/dL", "70–110"),
    (BIOCHEMISTRY, "Postprandial Blood Sugar (PPBS)", "mg/dL", "110–160"),
    (BIOCHEMISTRY, "Random Blood Sugar (RBS)", "mg/dL", "70–140"),
    (BIOCHEMISTRY, "HbA1c", "%", "4.4–6.7"),
    (BIOCHEMISTRY, "Blood Urea Nitrogen (BUN)", "mg/dL", "25–40"),
    (BIOCHEMISTRY, "Serum Creatinine", "mg/dL", "0.6–1.5"),
    (BIOCHEMISTRY, "Uric Acid", "mg/dL", "M: 3.5–7.2; F: 2.6–6.0"),
    (BIOCHEMISTRY, "Total Bilirubin", "mg/dL", "0–1.2"),
    (BIOCHEMISTRY, "Direct Bilirubin", "mg/dL", "0–0.2"),
    (BIOCHEMISTRY, "Indirect Bilirubin", "mg/dL", "0.1–1.1"),
    (BIOCHEMISTRY, "SGOT (AST)", "U/L", "8–40"),
    (BIOCHEMISTRY, "SGPT (ALT)", "U/L", "8–40"),
    (BIOCHEMISTRY, "Alkaline Phosphatase (ALP)", "U/L", "108–306"),
    (BIOCHEMISTRY, "Gamma GT (GGT)", "U/L", "Up to 60"),
    (BIOCHEMISTRY, "Total Protein", "g/dL", "6–8"),
    (BIOCHEMISTRY, "Albumin", "g/dL", "3.5–5.5"),
    (BIOCHEMISTRY, "Globulin", "g/dL", "2.5–3.5"),
    (BIOCHEMISTRY, "A/G Ratio", "Ratio", "1.2–2.2"),
    (BIOCHEMISTRY, "Calcium (Total)", "mg/dL", "8.5–10.5"),
    (BIOCHEMISTRY, "Phosphorus", "mg/dL", "2.5–5.0"),
    (BIOCHEMISTRY, "Sodium", "mEq/L", "135–145"),
    (BIOCHEMISTRY, "Potassium", "mEq/L", "3.6–5.0"),
    (BIOCHEMISTRY, "Chloride", "mEq/L", "98–119"),
    (BIOCHEMISTRY, "Lipid Profile", "mg/dL", "Varies per component"),
    (BIOCHEMISTRY, "Amylase", "U/L", "Up to 85"),
    (BIOCHEMISTRY, "Lipase", "U/L", "Up to 200"),
    (HEMATOLOGY, "Hemoglobin (Hb)", "g/dL", "M: 13–16; F: 11.5–14.5"),
    (HEMATOLOGY, "Total Leukocyte Count (TLC)", "x10³/µL", "4–11"),
    (HEMATOLOGY, "Red Blood Cell Count (RBC)", "x10⁶/µL", "M: 4.5–6.0; F: 4.0–4.5"),
    (HEMATOLOGY, "Packed Cell Volume (PCV)", "%", "M: 42–52; F: 36–48"),
    (HEMATOLOGY, "Mean Corpuscular Volume (MCV)", "fL", "82–92"),
    (HEMATOLOGY, "Mean Corpuscular Hemoglobin (MCH)", "pg", "27–32"),
    (
        HEMATOLOGY,
        "Mean Corpuscular Hemoglobin Concentration (MCHC)",
        "g/dL",
        "32–36",
    ),
    (
        HEMATOLOGY,
        "Differential Leukocyte Count (DLC)",
        "%",
        "Neutrophils: 40–75; Lymphocytes: 20–45; Monocytes: 2–8; Eosinophils: 1–4; Basophils: 0–1",
    ),
    (
        HEMATOLOGY,
        "Erythrocyte Sedimentation Rate (ESR)",
        "mm/hr",
        "M: up to 15; F: up to 20",
    ),
    (HEMATOLOGY, "Reticulocyte Count", "%", "Adult: 0.5–2; Infant: 2–6"),
    (HEMATOLOGY, "Bleeding Time", "minutes", "2–7"),
    (HEMATOLOGY, "Clotting Time", "minutes", "4–9"),
    (HEMATOLOGY, "Prothrombin Time (PT)", "seconds", "10–14"),
    (HEMATOLOGY, "International Normalized Ratio (INR)", "Ratio", "<1.1"),
    (
        HEMATOLOGY,
        "Activated Partial Thromboplastin Time (APTT)",
        "seconds",
        "30–40",
    ),
    (SEROLOGY, "Widal Test", "–", "Negative"),
    (SEROLOGY, "HIV Test", "–", "Negative"),
    (SEROLOGY, "HCV Test", "–", "Negative"),
    (SEROLOGY, "HBsAg Test", "–", "Negative"),
    (SEROLOGY, "Dengue NS1 Antigen", "–", "Negative"),
    (SEROLOGY, "Dengue IgG/IgM", "–", "Negative"),
    (SEROLOGY, "Malaria Parasite Test", "–", "Negative"),
    (SEROLOGY, "Mantoux Test", "mm induration", "<5 mm (negative)"),
    (URINE_STOOL, "Urine Routine Examination", "–", "Normal"),
    (URINE_STOOL, "Urine Pregnancy Test", "–", "Negative"),
    (URINE_STOOL, "Stool Routine Examination", "–", "Normal"),
];

static BUILTIN: LazyLock<Catalog> = LazyLock::new(|| Catalog {
    definitions: DEFINITIONS
        .iter()
        .map(|(category, name, unit, reference_range)| TestDefinition {
            category: category.to_string(),
            name: name.to_string(),
            unit: unit.to_string(),
            reference_range: reference_range.to_string(),
        })
        .collect(),
});

/// Definitions of one category, in catalog order.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogCategory<'a> {
    pub category: &'a str,
    pub tests: Vec<&'a TestDefinition>,
}

/// How a submitted test record differs from the catalog. Submissions are
/// not rejected on this basis; callers only surface it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogDivergence {
    UnknownTest { category: String, name: String },
    Unit { expected: String, submitted: String },
    Range { expected: String, submitted: String },
}

impl fmt::Display for CatalogDivergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogDivergence::UnknownTest { category, name } => {
                write!(f, "{name} is not listed under {category}")
            }
            CatalogDivergence::Unit {
                expected,
                submitted,
            } => write!(f, "unit {submitted:?} differs from catalog {expected:?}"),
            CatalogDivergence::Range {
                expected,
                submitted,
            } => write!(f, "range {submitted:?} differs from catalog {expected:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    definitions: Vec<TestDefinition>,
}

impl Catalog {
    /// The catalog shipped with the application.
    pub fn builtin() -> &'static Catalog {
        &BUILTIN
    }

    /// Build a catalog; `(category, name)` must be unique.
    pub fn from_definitions(definitions: Vec<TestDefinition>) -> Result<Self, LabError> {
        let mut seen = HashSet::new();
        for definition in &definitions {
            if !seen.insert((definition.category.as_str(), definition.name.as_str())) {
                return Err(LabError::Validation(format!(
                    "duplicate catalog entry: {} / {}",
                    definition.category, definition.name
                )));
            }
        }
        Ok(Self { definitions })
    }

    pub fn definitions(&self) -> &[TestDefinition] {
        &self.definitions
    }

    pub fn categories(&self) -> Vec<&str> {
        self.tests_by_category()
            .into_iter()
            .map(|group| group.category)
            .collect()
    }

    pub fn tests_by_category(&self) -> Vec<CatalogCategory<'_>> {
        group_stable(&self.definitions, |definition| definition.category.as_str())
            .into_iter()
            .map(|(category, tests)| CatalogCategory { category, tests })
            .collect()
    }

    pub fn tests_in<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a TestDefinition> {
        self.definitions
            .iter()
            .filter(move |definition| definition.category == category)
    }

    pub fn find_definition(&self, category: &str, name: &str) -> Option<&TestDefinition> {
        self.definitions
            .iter()
            .find(|definition| definition.category == category && definition.name == name)
    }

    pub fn divergences(&self, record: &NewTestRecord) -> Vec<CatalogDivergence> {
        let Some(definition) = self.find_definition(&record.test_category, &record.test_name)
        else {
            return vec![CatalogDivergence::UnknownTest {
                category: record.test_category.clone(),
                name: record.test_name.clone(),
            }];
        };

        let mut found = Vec::new();
        if definition.unit != record.unit {
            found.push(CatalogDivergence::Unit {
                expected: definition.unit.clone(),
                submitted: record.unit.clone(),
            });
        }
        if definition.reference_range != record.normal_range {
            found.push(CatalogDivergence::Range {
                expected: definition.reference_range.clone(),
                submitted: record.normal_range.clone(),
            });
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_every_category_in_order() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.definitions().len(), 52);
        assert_eq!(
            catalog.categories(),
            vec![BIOCHEMISTRY, HEMATOLOGY, SEROLOGY, URINE_STOOL]
        );
        let counts: Vec<usize> = catalog
            .tests_by_category()
            .iter()
            .map(|group| group.tests.len())
            .collect();
        assert_eq!(counts, vec![26, 15, 8, 3]);
    }

    #[test]
    fn builtin_keys_are_unique() {
        assert!(Catalog::from_definitions(Catalog::builtin().definitions().to_vec()).is_ok());
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let definition = Catalog::builtin().definitions()[0].clone();
        let err = Catalog::from_definitions(vec![definition.clone(), definition]).unwrap_err();
        assert!(matches!(err, LabError::Validation(_)));
    }

    #[test]
    fn lookup_by_category_and_name() {
        let catalog = Catalog::builtin();
        let inr = catalog
            .find_definition(HEMATOLOGY, "International Normalized Ratio (INR)")
            .expect("INR is in the catalog");
        assert_eq!(inr.reference_range, "<1.1");
        assert!(catalog.find_definition(BIOCHEMISTRY, "Bleeding Time").is_none());
        assert_eq!(catalog.tests_in(URINE_STOOL).count(), 3);
    }

    #[test]
    fn divergence_is_reported_not_fixed() {
        let catalog = Catalog::builtin();
        let definition = catalog.find_definition(BIOCHEMISTRY, "Sodium").unwrap();

        let mut record = NewTestRecord::prefilled(1, definition, "150");
        assert!(catalog.divergences(&record).is_empty());

        record.normal_range = "130-150".into();
        assert_eq!(
            catalog.divergences(&record),
            vec![CatalogDivergence::Range {
                expected: "135–145".into(),
                submitted: "130-150".into(),
            }]
        );

        record.test_name = "Sodium (urine)".into();
        assert!(matches!(
            catalog.divergences(&record).as_slice(),
            [CatalogDivergence::UnknownTest { .. }]
        ));
    }
}
