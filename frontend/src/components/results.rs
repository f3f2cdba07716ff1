use super::super::Model;
use shared::Label;
use yew::prelude::*;

pub fn render_results(model: &Model) -> Html {
    let Some(prediction) = &model.prediction else {
        return html! {};
    };

    let is_normal = prediction.label == Label::Normal;
    let percentage = prediction.confidence * 100.0;

    html! {
        <div class={classes!("results-container", if is_normal { "normal" } else { "cancer" })}>
            <div class="result-header">
                <h2>{ format!("Prediction: {}", prediction.label) }</h2>
                <div class="confidence-meter">
                    <div class="meter-label">{"Confidence:"}</div>
                    <div class="meter">
                        <div class="meter-fill" style={format!("width: {}%", percentage)}></div>
                    </div>
                    <div class="meter-value">{ &prediction.confidence_display }</div>
                </div>
            </div>
            <p class="result-line">{ format!("Confidence: {}", prediction.confidence_display) }</p>
        </div>
    }
}
