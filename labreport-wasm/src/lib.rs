//! Framework-neutral WASM <-> JavaScript bridge.

use labreport_core::{
    build_report_view, demographics, Catalog, Classifier, LabError, Patient, ReportConfig,
    ReportPayload, ReportView,
};
use serde::Deserialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

/// Partial config from JS; missing keys keep their defaults.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct JsReportConfig {
    #[serde(default)]
    recognize_up_to: Option<bool>,
    #[serde(default)]
    placeholder: Option<String>,
}

impl From<JsReportConfig> for ReportConfig {
    fn from(cfg: JsReportConfig) -> Self {
        let mut base = ReportConfig::default();
        if let Some(recognize) = cfg.recognize_up_to {
            base.recognize_up_to = recognize;
        }
        if let Some(placeholder) = cfg.placeholder {
            base.placeholder = placeholder;
        }
        base
    }
}

fn read_config(config: Option<JsValue>) -> Result<ReportConfig, JsValue> {
    match config {
        Some(js_cfg) if !js_cfg.is_undefined() && !js_cfg.is_null() => {
            let cfg: JsReportConfig = from_value(js_cfg)
                .map_err(|err| JsValue::from_str(&format!("could not read config: {err}")))?;
            Ok(ReportConfig::from(cfg))
        }
        _ => Ok(ReportConfig::default()),
    }
}

fn view_from_json(
    payload: serde_json::Value,
    config: &ReportConfig,
) -> Result<ReportView, LabError> {
    let payload: ReportPayload =
        serde_json::from_value(payload).map_err(|err| LabError::Parse(err.to_string()))?;
    let report = payload.into_report(None, &config.placeholder);
    Ok(build_report_view(&report, &Classifier::from_config(config)))
}

/// Classify one result. Returns the status label.
#[wasm_bindgen]
pub fn classify_result(
    value: &str,
    reference_range: &str,
    config: Option<JsValue>,
) -> Result<String, JsValue> {
    let cfg = read_config(config)?;
    Ok(Classifier::from_config(&cfg)
        .classify(value, reference_range)
        .label()
        .to_string())
}

/// Turn a consolidated report body into a render-ready view.
#[wasm_bindgen]
pub fn build_report(payload: JsValue, config: Option<JsValue>) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let payload = from_value::<serde_json::Value>(payload)
        .map_err(|err| JsValue::from_str(&format!("could not read report JSON: {err}")))?;
    let cfg = read_config(config)?;

    let view = view_from_json(payload, &cfg).map_err(|err| JsValue::from_str(&err.to_string()))?;

    to_value(&view).map_err(|err| JsValue::from_str(&format!("could not serialize report: {err}")))
}

/// Built-in test definitions grouped by category.
#[wasm_bindgen]
pub fn test_catalog() -> Result<JsValue, JsValue> {
    to_value(&Catalog::builtin().tests_by_category())
        .map_err(|err| JsValue::from_str(&format!("could not serialize catalog: {err}")))
}

/// Unit and reference range to prefill for a chosen test, or `null`.
#[wasm_bindgen]
pub fn find_test_definition(category: &str, name: &str) -> Result<JsValue, JsValue> {
    match Catalog::builtin().find_definition(category, name) {
        Some(definition) => to_value(definition)
            .map_err(|err| JsValue::from_str(&format!("could not serialize definition: {err}"))),
        None => Ok(JsValue::NULL),
    }
}

#[wasm_bindgen]
pub fn patient_demographics(patients: JsValue) -> Result<JsValue, JsValue> {
    let patients = from_value::<serde_json::Value>(patients)
        .map_err(|err| JsValue::from_str(&format!("could not read patients: {err}")))?;
    let patients: Vec<Patient> = serde_json::from_value(patients)
        .map_err(|err| JsValue::from_str(&LabError::Parse(err.to_string()).to_string()))?;

    to_value(&demographics(&patients))
        .map_err(|err| JsValue::from_str(&format!("could not serialize demographics: {err}")))
}
