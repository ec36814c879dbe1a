//! Printable lab report sheet for WebAssembly hosts.

mod filter;
#[cfg(target_arch = "wasm32")]
mod styles;

use chrono::{DateTime, Utc};

pub use filter::{visible_sections, RowFilter};

pub const REPORT_TITLE: &str = "LABORATORY INVESTIGATION REPORT";

pub const INTERPRETATION_NOTES: [&str; 3] = [
    "Values marked with ↑ (High) or ↓ (Low) are outside the reference range",
    "Reference ranges may vary based on age, gender, and laboratory methodology",
    "Please correlate with clinical findings and consult your physician for interpretation",
];

pub const DISCLAIMER: &str = "This report contains confidential medical information. The results \
should be interpreted by a qualified healthcare professional in conjunction with clinical history \
and other diagnostic tests. Normal values may vary between laboratories due to differences in \
equipment, reagents, and methodologies. For any queries regarding this report, please contact our \
laboratory at the above mentioned contact details.";

/// Date and time lines printed in the report header and footer.
pub fn report_timestamp(generated_at: DateTime<Utc>) -> (String, String) {
    (
        generated_at.format("%d/%m/%Y").to_string(),
        generated_at.format("%I:%M %p").to_string(),
    )
}

#[cfg(target_arch = "wasm32")]
mod wasm_ui {
    use crate::filter::{visible_sections, RowFilter};
    use crate::{report_timestamp, styles, DISCLAIMER, INTERPRETATION_NOTES, REPORT_TITLE};
    use labreport_core::{CategorySection, Lab, ReportView, ResultRow};
    use serde_wasm_bindgen::from_value;
    use wasm_bindgen::prelude::*;
    use web_sys::{console, Document, Element, HtmlInputElement, Window};
    use yew::events::InputEvent;
    use yew::prelude::*;
    use yew::TargetCast;

    #[derive(Properties, PartialEq)]
    pub struct ReportSheetProps {
        pub view: ReportView,
    }

    #[function_component(ReportSheet)]
    fn report_sheet(props: &ReportSheetProps) -> Html {
        let view = &props.view;

        use_effect_with((), |_| {
            if let Some(window) = web_sys::window() {
                if let Some(document) = window.document() {
                    if let Err(err) = styles::ensure_styles(&document) {
                        console::error_1(&err);
                    }
                }
            }
            || ()
        });

        let filter = use_state(RowFilter::default);
        let filter_value = (*filter).clone();
        let sections = visible_sections(view, &filter_value);

        let on_search = {
            let filter = filter.clone();
            Callback::from(move |event: InputEvent| {
                let input: HtmlInputElement = event.target_unchecked_into();
                let mut next = (*filter).clone();
                next.query = input.value();
                filter.set(next);
            })
        };

        let on_toggle_alerts = {
            let filter = filter.clone();
            Callback::from(move |_| {
                let mut next = (*filter).clone();
                next.alerts_only = !next.alerts_only;
                filter.set(next);
            })
        };

        let on_clear = {
            let filter = filter.clone();
            Callback::from(move |_| filter.set(RowFilter::default()))
        };

        let (generated_date, generated_time) = report_timestamp(view.generated_at);
        let chip_class = classes!(
            "filter-chip",
            filter_value.alerts_only.then_some("is-active")
        );
        let alerts_label = format!("Out of range only ({})", view.summary.alerts);
        let generated_line = format!("Report generated on: {generated_date}, {generated_time}");

        html! {
            <div class="labreport-root">
                <header class="report-toolbar">
                    <button
                        type="button"
                        class={chip_class}
                        onclick={on_toggle_alerts}
                    >
                        { alerts_label }
                    </button>
                    <input
                        type="search"
                        placeholder="Filter by test, category or status"
                        value={filter_value.query.clone()}
                        oninput={on_search}
                        aria-label="Filter report rows"
                    />
                    <button
                        type="button"
                        onclick={on_clear}
                        disabled={!filter_value.is_active()}
                    >
                        {"Reset"}
                    </button>
                </header>
                <article class="report-sheet" data-report="">
                    { view.lab.as_ref().map(render_letterhead).unwrap_or_default() }
                    <h2 class="report-title">{ REPORT_TITLE }</h2>
                    <div class="report-info">
                        <section class="info-card">
                            <h3>{"PATIENT INFORMATION"}</h3>
                            { info_line("Name", &view.patient_name) }
                            { info_line("Age/Sex", &view.age_sex) }
                            { info_line("Patient ID", &view.patient_code) }
                            { info_line("Contact", &view.patient_contact) }
                        </section>
                        <section class="info-card">
                            <h3>{"REPORT DETAILS"}</h3>
                            { info_line("Report Date", &generated_date) }
                            { info_line("Report Time", &generated_time) }
                            { info_line("REF. BY", &view.ref_by) }
                            { info_line("Lab Ref No", &view.lab_ref_no) }
                        </section>
                    </div>
                    {
                        if sections.is_empty() {
                            html! {
                                <p class="report-empty">
                                    {"No results match the current filter."}
                                </p>
                            }
                        } else {
                            html! {
                                for sections
                                    .into_iter()
                                    .map(|(section, rows)| render_section(section, rows))
                            }
                        }
                    }
                    <section class="report-notes">
                        <h4>{"CLINICAL INTERPRETATION"}</h4>
                        <ul>
                            {
                                for INTERPRETATION_NOTES
                                    .iter()
                                    .map(|note| html! { <li>{ *note }</li> })
                            }
                        </ul>
                    </section>
                    <footer class="report-footer">
                        <div>{"This is a computer generated report"}</div>
                        <div>{ generated_line }</div>
                    </footer>
                    <section class="report-disclaimer">
                        <strong>{"IMPORTANT MEDICAL DISCLAIMER:"}</strong>
                        { DISCLAIMER }
                    </section>
                </article>
            </div>
        }
    }

    fn render_letterhead(lab: &Lab) -> Html {
        let slogan = lab
            .slogan
            .as_ref()
            .map(|slogan| html! { <p class="lab-slogan">{ slogan.clone() }</p> })
            .unwrap_or_default();
        html! {
            <header class="report-letterhead">
                <h1>{ lab.name.to_uppercase() }</h1>
                { slogan }
                <div class="lab-contact">
                    <span>{ lab.address.clone() }</span>
                    <span>{ lab.phone.clone() }</span>
                    <span>{ lab.email.clone() }</span>
                </div>
            </header>
        }
    }

    fn info_line(label: &str, value: &str) -> Html {
        html! {
            <div class="info-line">
                <span class="info-label">{ format!("{label}:") }</span>
                { " " }
                { value.to_string() }
            </div>
        }
    }

    fn render_section(section: &CategorySection, rows: Vec<&ResultRow>) -> Html {
        html! {
            <section class="report-section">
                <div class="section-heading">{ section.heading.clone() }</div>
                <table class="result-table">
                    <thead>
                        <tr>
                            <th>{"TEST NAME"}</th>
                            <th>{"RESULT"}</th>
                            <th>{"UNIT"}</th>
                            <th>{"REFERENCE RANGE"}</th>
                            <th>{"STATUS"}</th>
                        </tr>
                    </thead>
                    <tbody>
                        { for rows.into_iter().map(render_row) }
                    </tbody>
                </table>
            </section>
        }
    }

    fn render_row(row: &ResultRow) -> Html {
        let color = format!("color: {}", row.styling.color);
        let note = row
            .test
            .additional_note
            .as_ref()
            .map(|note| html! { <div class="result-note">{ note.clone() }</div> })
            .unwrap_or_default();
        html! {
            <tr key={row.test.id.to_string()}>
                <td>
                    { row.test.test_name.clone() }
                    { note }
                </td>
                <td style={color.clone()}>{ row.display_value() }</td>
                <td>{ row.test.unit.clone() }</td>
                <td>{ row.test.normal_range.clone() }</td>
                <td class="result-status" style={color}>{ row.status.label().to_string() }</td>
            </tr>
        }
    }

    #[wasm_bindgen]
    pub fn mount_report_view(selector: &str, view: JsValue) -> Result<(), JsValue> {
        let window: Window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document: Document = window
            .document()
            .ok_or_else(|| JsValue::from_str("document is not accessible"))?;

        let target: Element = document
            .query_selector(selector)
            .map_err(|err| JsValue::from_str(&format!("invalid selector: {err:?}")))?
            .ok_or_else(|| JsValue::from_str("no element matches the selector"))?;

        let view: ReportView = from_value(view)?;

        yew::Renderer::<ReportSheet>::with_root_and_props(target, ReportSheetProps { view })
            .render();
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm_ui::mount_report_view;

#[cfg(not(target_arch = "wasm32"))]
pub fn mount_report_view(_: &str, _: wasm_bindgen::JsValue) -> Result<(), wasm_bindgen::JsValue> {
    Err(wasm_bindgen::JsValue::from_str(
        "labreport-ui only supports the wasm32 target",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_uses_day_first_and_twelve_hour_clock() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 14, 5, 0).unwrap();
        assert_eq!(
            report_timestamp(at),
            ("01/05/2024".to_string(), "02:05 PM".to_string())
        );
    }
}
