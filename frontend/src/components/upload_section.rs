use super::super::Model;
use super::super::Msg;
use super::utils::debounce;
use gloo_file::File as GlooFile;
use wasm_bindgen::JsCast;
use web_sys::{DragEvent, HtmlInputElement};
use yew::prelude::*;

pub fn render_upload_section(model: &Model, ctx: &Context<Model>) -> Html {
    html! {
        <div class="upload-section">
            { render_file_input_area(model, ctx) }
            { render_preview(model) }
        </div>
    }
}

fn render_file_input_area(model: &Model, ctx: &Context<Model>) -> Html {
    let busy = model.predictions.is_busy();
    let link = ctx.link();
    let handle_change = link.callback(|e: Event| {
        let input: HtmlInputElement = e.target_unchecked_into();
        let file = input.files().and_then(|files| files.item(0));

        input.set_value("");

        match file {
            Some(file) => Msg::FileSelected(GlooFile::from(file)),
            None => Msg::SetError(Some("No image selected.".into())),
        }
    });

    let handle_drag_over = link.callback(|e: DragEvent| {
        e.prevent_default();
        Msg::SetDragging(true)
    });

    let handle_drag_leave = link.callback(|e: DragEvent| {
        e.prevent_default();
        Msg::SetDragging(false)
    });

    let handle_drop = link.callback(Msg::HandleDrop);
    let trigger_file_input = Callback::from(|_| {
        let input = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id("file-input"));
        if let Some(input) = input {
            if let Ok(html_input) = input.dyn_into::<web_sys::HtmlElement>() {
                html_input.click();
            }
        }
    });

    html! {
        <>
            <input
                type="file"
                id="file-input"
                accept=".jpg,.jpeg,.png"
                style="display: none;"
                disabled={busy}
                onchange={handle_change}
            />

            <div
                id="drop-zone"
                class={classes!(
                    "upload-area",
                    model.is_dragging.then_some("drag-over"),
                    busy.then_some("disabled")
                )}
                ondragover={handle_drag_over}
                ondragleave={handle_drag_leave}
                ondrop={handle_drop}
                onclick={debounce(300, {
                    let trigger_file_input = trigger_file_input.clone();
                    move || trigger_file_input.emit(())
                })}
            >
                <div class="upload-placeholder">
                    <i class="fa-solid fa-cloud-arrow-up"></i>
                    <p>{"Choose a mammogram image, drag & drop it here, or paste"}</p>
                    <p class="file-types">{"Supported formats: JPG, JPEG, PNG"}</p>
                </div>
            </div>
        </>
    }
}

fn render_preview(model: &Model) -> Html {
    let Some(upload) = &model.upload else {
        return html! {};
    };

    html! {
        <div id="preview-container">
            <img
                class="uploaded-image"
                src={upload.preview_url.to_string()}
                alt={upload.file.name()}
            />
            <p class="caption">{"Uploaded Image"}</p>
            if model.predictions.is_busy() {
                <div class="loading">
                    <i class="fa-solid fa-spinner fa-spin"></i>{" Classifying..."}
                </div>
            }
        </div>
    }
}
