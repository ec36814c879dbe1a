#![cfg(target_arch = "wasm32")]

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Node};

const STYLE_TAG_SELECTOR: &str = "style[data-labreport-ui]";

/// Default sheet styling; the custom properties are the override points.
pub const DEFAULT_STYLES: &str = r#"
:root {
  --labreport-font-family: Arial, sans-serif;
  --labreport-text: #222222;
  --labreport-muted: #4b5563;
  --labreport-accent: #1976d2;
  --labreport-accent-soft: #eaf2fb;
  --labreport-border: #cccccc;
  --labreport-panel: #f9fafb;
  --labreport-note-bg: #fefce8;
  --labreport-note-border: #facc15;
}

.labreport-root {
  font-family: var(--labreport-font-family);
  color: var(--labreport-text);
  display: flex;
  flex-direction: column;
  gap: 16px;
  align-items: center;
}

.report-toolbar {
  display: flex;
  gap: 8px;
  width: 800px;
  max-width: 100%;
}

.report-toolbar input {
  flex: 1;
  padding: 6px 10px;
  border: 1px solid var(--labreport-border);
  border-radius: 6px;
}

.report-toolbar button {
  padding: 6px 12px;
  border: 1px solid var(--labreport-border);
  border-radius: 6px;
  background: #ffffff;
  cursor: pointer;
}

.report-toolbar button:disabled {
  cursor: not-allowed;
  opacity: 0.5;
}

.filter-chip.is-active {
  background: #fdecea;
  border-color: #d32f2f;
  color: #d32f2f;
}

.report-sheet {
  background: #ffffff;
  width: 800px;
  max-width: 100%;
  padding: 24px;
  border-radius: 8px;
  box-shadow: 0 0 10px rgba(0, 0, 0, 0.1);
}

.report-letterhead h1 {
  margin: 0;
  font-size: 24px;
  color: #1e3a8a;
}

.lab-slogan {
  margin: 2px 0 0;
  font-size: 13px;
  color: var(--labreport-muted);
}

.lab-contact {
  display: flex;
  flex-direction: column;
  margin-top: 8px;
  font-size: 13px;
  color: var(--labreport-muted);
}

.report-title {
  text-align: center;
  font-size: 20px;
  letter-spacing: 0.05em;
  padding: 12px 0;
  margin: 16px 0;
  border-top: 1px solid #bfdbfe;
  border-bottom: 1px solid #bfdbfe;
}

.report-info {
  display: grid;
  grid-template-columns: 1fr 1fr;
  gap: 24px;
  margin-bottom: 24px;
}

.info-card {
  background: var(--labreport-panel);
  border: 1px solid #e5e7eb;
  border-radius: 4px;
  padding: 16px;
  font-size: 14px;
}

.info-card h3 {
  margin: 0 0 8px;
  font-size: 13px;
  color: #374151;
}

.info-line {
  margin-bottom: 4px;
}

.info-label {
  font-weight: 600;
}

.report-section {
  margin-bottom: 32px;
}

.section-heading {
  background: var(--labreport-accent-soft);
  border-left: 4px solid var(--labreport-accent);
  padding: 8px;
  font-weight: bold;
  font-size: 16px;
}

.result-table {
  width: 100%;
  border-collapse: collapse;
  margin-bottom: 16px;
}

.result-table th {
  background: #f7f7f7;
}

.result-table th,
.result-table td {
  border: 1px solid var(--labreport-border);
  padding: 8px;
  text-align: left;
}

.result-status {
  font-weight: bold;
}

.result-note {
  font-size: 12px;
  color: var(--labreport-muted);
}

.report-empty {
  text-align: center;
  color: var(--labreport-muted);
  padding: 24px 0;
}

.report-notes {
  background: var(--labreport-note-bg);
  border-left: 4px solid var(--labreport-note-border);
  padding: 16px;
  margin-bottom: 24px;
}

.report-notes h4 {
  margin: 0 0 8px;
}

.report-notes ul {
  margin: 0;
  padding-left: 20px;
  font-size: 14px;
}

.report-footer {
  text-align: right;
  font-size: 12px;
  color: var(--labreport-muted);
  margin-top: 32px;
}

.report-disclaimer {
  background: #f3f4f6;
  font-size: 12px;
  color: #374151;
  padding: 16px;
  border-radius: 4px;
  margin-top: 24px;
}

.report-disclaimer strong {
  display: block;
  margin-bottom: 4px;
}

@media print {
  .report-toolbar {
    display: none;
  }

  .report-sheet {
    box-shadow: none;
    padding: 0;
  }
}

@media (max-width: 720px) {
  .report-info {
    grid-template-columns: 1fr;
  }

  .report-toolbar {
    flex-direction: column;
  }
}
"#;

pub fn ensure_styles(document: &Document) -> Result<(), JsValue> {
    if document.query_selector(STYLE_TAG_SELECTOR)?.is_some() {
        return Ok(());
    }

    let head = document
        .head()
        .ok_or_else(|| JsValue::from_str("document has no <head>"))?;

    let style_el = document.create_element("style")?;
    style_el.set_attribute("data-labreport-ui", "v1")?;
    style_el.set_text_content(Some(DEFAULT_STYLES));
    head.append_child(&style_el.clone().dyn_into::<Node>()?)?;

    Ok(())
}
