use labreport_core::{classify, group_by_category, Classifier, Status, TestRecord};
use proptest::prelude::*;

fn record(id: i64, category: String) -> TestRecord {
    TestRecord {
        id,
        patient_id: 1,
        patient_name: String::new(),
        patient_code: None,
        test_category: category,
        test_name: format!("test {id}"),
        test_value: "1".into(),
        normal_range: "0-2".into(),
        unit: String::new(),
        additional_note: None,
        created_at: None,
    }
}

proptest! {
    #[test]
    fn classify_is_total_and_deterministic(value in ".*", range in ".*") {
        let first = classify(&value, &range);
        let second = classify(&value, &range);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn bracket_law(low in 0u32..1000, span in 0u32..1000, value in 0u32..3000) {
        let high = low + span;
        let range = format!("{low}-{high}");
        let expected = if value < low {
            Status::Low
        } else if value > high {
            Status::High
        } else {
            Status::Normal
        };
        prop_assert_eq!(classify(&value.to_string(), &range), expected.clone());
        let en_dash = format!("{low} – {high}");
        prop_assert_eq!(classify(&value.to_string(), &en_dash), expected);
    }

    #[test]
    fn decimal_bracket_law(low in 0.0f64..100.0, span in 0.0f64..100.0, value in 0.0f64..300.0) {
        let low = (low * 100.0).round() / 100.0;
        let high = ((low + span) * 100.0).round() / 100.0;
        let range = format!("{low:.2}-{high:.2}");
        let value_text = format!("{value:.2}");
        let v: f64 = value_text.parse().unwrap();
        let expected = if v < low {
            Status::Low
        } else if v > high {
            Status::High
        } else {
            Status::Normal
        };
        prop_assert_eq!(classify(&value_text, &range), expected);
    }

    #[test]
    fn custom_chain_agrees_with_standard(value in "[0-9]{1,3}", threshold in "[0-9]{1,3}") {
        let classifier = Classifier::standard();
        for range in [format!("<{threshold}"), format!(">{threshold}")] {
            prop_assert_eq!(classifier.classify(&value, &range), classify(&value, &range));
        }
    }

    #[test]
    fn grouping_is_stable(categories in proptest::collection::vec("[a-c]", 0..30)) {
        let tests: Vec<TestRecord> = categories
            .iter()
            .enumerate()
            .map(|(i, c)| record(i as i64, c.clone()))
            .collect();
        let groups = group_by_category(&tests);

        let mut first_seen: Vec<&str> = Vec::new();
        for test in &tests {
            if !first_seen.contains(&test.test_category.as_str()) {
                first_seen.push(&test.test_category);
            }
        }
        let order: Vec<&str> = groups.iter().map(|g| g.category).collect();
        prop_assert_eq!(order, first_seen);

        for group in &groups {
            let ids: Vec<i64> = group.tests.iter().map(|t| t.id).collect();
            let mut sorted = ids.clone();
            sorted.sort();
            prop_assert_eq!(ids, sorted);
        }
        prop_assert_eq!(group_by_category(&tests), groups);
    }
}
