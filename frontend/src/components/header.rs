use yew::prelude::*;

/// Renders the application header
pub fn render_header() -> Html {
    html! {
        <header class="app-header">
            <h1><i class="fa-solid fa-ribbon"></i> {" Breast Cancer Detection"}</h1>
            <p class="subtitle">{"Upload a mammogram image to classify it as cancerous or non-cancerous."}</p>
        </header>
    }
}
