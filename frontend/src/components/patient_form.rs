use super::super::{Model, Msg};
use super::utils::debounce;
use shared::Laterality;
use std::str::FromStr;
use strum::IntoEnumIterator;
use web_sys::{HtmlInputElement, HtmlSelectElement, HtmlTextAreaElement};
use yew::prelude::*;

/// Patient details and report download. Hidden until a prediction exists.
pub fn render_patient_form(model: &Model, ctx: &Context<Model>) -> Html {
    if model.prediction.is_none() {
        return html! {};
    }

    let link = ctx.link();
    let on_name = link.callback(|e: InputEvent| {
        let input: HtmlInputElement = e.target_unchecked_into();
        Msg::UpdateName(input.value())
    });
    let on_age = link.callback(|e: InputEvent| {
        let input: HtmlInputElement = e.target_unchecked_into();
        Msg::UpdateAge(input.value())
    });
    let on_laterality = link.callback(|e: Event| {
        let select: HtmlSelectElement = e.target_unchecked_into();
        Msg::UpdateLaterality(Laterality::from_str(&select.value()).unwrap_or_default())
    });
    let on_notes = link.callback(|e: InputEvent| {
        let area: HtmlTextAreaElement = e.target_unchecked_into();
        Msg::UpdateNotes(area.value())
    });

    let selected = model.patient.laterality.unwrap_or_default();

    html! {
        <div class="patient-form">
            <h2><i class="fa-solid fa-user"></i>{" Patient Details"}</h2>

            <label for="patient-name">{"Name"}</label>
            <input id="patient-name" type="text" value={model.patient.name.clone()} oninput={on_name} />

            <label for="patient-age">{"Age"}</label>
            <input id="patient-age" type="text" value={model.patient.age.clone()} oninput={on_age} />

            <label for="patient-laterality">{"Breast Laterality"}</label>
            <select id="patient-laterality" onchange={on_laterality}>
                { for Laterality::iter().map(|side| html! {
                    <option value={side.to_string()} selected={side == selected}>{ side.to_string() }</option>
                })}
            </select>

            <label for="patient-notes">{"Additional Information"}</label>
            <textarea id="patient-notes" rows="4" value={model.patient.notes.clone()} oninput={on_notes} />

            <div class="button-container">
                <button
                    class="analyze-btn"
                    disabled={model.generating}
                    onclick={debounce(300, {
                        let link = link.clone();
                        move || link.send_message(Msg::GenerateReport)
                    })}
                >
                    if model.generating {
                        <><i class="fa-solid fa-spinner fa-spin"></i>{" Generating..."}</>
                    } else {
                        <><i class="fa-solid fa-file-pdf"></i>{" Generate PDF Report"}</>
                    }
                </button>
            </div>

            if let Some(report) = &model.report {
                <a
                    class="download-link"
                    href={report.url.to_string()}
                    download={report.filename.clone()}
                >
                    <i class="fa-solid fa-download"></i>{" Download Report as PDF"}
                </a>
            }
        </div>
    }
}
