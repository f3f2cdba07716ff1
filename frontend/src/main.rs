mod api;
mod components;

use components::header::render_header;
use components::patient_form::render_patient_form;
use components::results::render_results;
use components::upload_section::render_upload_section;
use components::utils::{RequestTracker, accepted_image, render_error_message};
use gloo_events::EventListener;
use gloo_file::{File as GlooFile, ObjectUrl};
use gloo_storage::{SessionStorage, Storage};
use shared::{
    Laterality, MISSING_PATIENT_FIELDS, PatientRecord, PredictionResponse, ReportRequest,
    SessionId, report_filename,
};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{ClipboardEvent, DragEvent, FileList};
use yew::prelude::*;

const SESSION_KEY: &str = "mammoscan.session_id";

pub struct UploadedFile {
    pub file: GlooFile,
    pub preview_url: ObjectUrl,
}

pub struct ReportDownload {
    pub url: ObjectUrl,
    pub filename: String,
}

pub enum Msg {
    // Upload
    FileSelected(GlooFile),
    PredictionReceived(u32, PredictionResponse),
    PredictionFailed(u32, String),
    HandleDrop(DragEvent),
    HandlePaste(ClipboardEvent),
    SetDragging(bool),

    // Patient form
    UpdateName(String),
    UpdateAge(String),
    UpdateLaterality(Laterality),
    UpdateNotes(String),

    // Report
    GenerateReport,
    ReportReady(ReportDownload),

    SetError(Option<String>),
}

pub struct Model {
    pub upload: Option<UploadedFile>,
    pub prediction: Option<PredictionResponse>,
    pub patient: PatientRecord,
    pub session_id: Option<SessionId>,
    pub predictions: RequestTracker,
    pub generating: bool,
    pub report: Option<ReportDownload>,
    pub error: Option<String>,
    pub is_dragging: bool,
    paste_listener: Option<EventListener>,
}

impl Component for Model {
    type Message = Msg;
    type Properties = ();

    fn create(ctx: &Context<Self>) -> Self {
        let mut model = Self {
            upload: None,
            prediction: None,
            patient: PatientRecord {
                laterality: Some(Laterality::default()),
                ..PatientRecord::default()
            },
            session_id: SessionStorage::get(SESSION_KEY).ok(),
            predictions: RequestTracker::default(),
            generating: false,
            report: None,
            error: None,
            is_dragging: false,
            paste_listener: None,
        };

        if let Some(window) = web_sys::window() {
            let link = ctx.link().clone();
            let listener = EventListener::new(&window, "paste", move |event| {
                if let Some(clipboard_event) = event.dyn_ref::<ClipboardEvent>() {
                    link.send_message(Msg::HandlePaste(clipboard_event.clone()));
                }
            });
            model.paste_listener = Some(listener);
        }

        model
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::FileSelected(file) => self.handle_file_selected(ctx, file),
            Msg::PredictionReceived(ticket, prediction) => {
                self.handle_prediction(ticket, prediction)
            }
            Msg::PredictionFailed(ticket, error) => {
                if !self.predictions.finish(ticket) {
                    return false;
                }
                self.error = Some(error);
                true
            }
            Msg::HandleDrop(event) => self.handle_drop(ctx, event),
            Msg::HandlePaste(event) => self.handle_paste(ctx, event),
            Msg::SetDragging(is_dragging) => {
                self.is_dragging = is_dragging;
                true
            }

            Msg::UpdateName(name) => {
                self.patient.name = name;
                self.report = None;
                true
            }
            Msg::UpdateAge(age) => {
                self.patient.age = age;
                self.report = None;
                true
            }
            Msg::UpdateLaterality(laterality) => {
                self.patient.laterality = Some(laterality);
                self.report = None;
                true
            }
            Msg::UpdateNotes(notes) => {
                self.patient.notes = notes;
                self.report = None;
                true
            }

            Msg::GenerateReport => self.handle_generate_report(ctx),
            Msg::ReportReady(download) => {
                self.generating = false;
                self.report = Some(download);
                true
            }

            Msg::SetError(error) => {
                self.error = error;
                self.generating = false;
                true
            }
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        html! {
            <div class="container">
                { render_header() }

                <main class="main-content">
                    { render_upload_section(self, ctx) }
                    { render_error_message(self) }
                    <div class="results-layout">
                        { render_results(self) }
                        { render_patient_form(self, ctx) }
                    </div>
                </main>

                <footer class="app-footer">
                    <p>{"For informational purposes only. Consult a medical professional for diagnosis."}</p>
                </footer>
            </div>
        }
    }
}

impl Model {
    fn handle_file_selected(&mut self, ctx: &Context<Self>, file: GlooFile) -> bool {
        if self.predictions.is_busy() {
            log::warn!("Ignoring {} while the previous image is analysed", file.name());
            return false;
        }
        if !accepted_image(&file) {
            self.error = Some(format!("{} is not a JPEG or PNG image.", file.name()));
            return true;
        }
        let Some(ticket) = self.predictions.start() else {
            return false;
        };

        self.error = None;
        self.prediction = None;
        self.report = None;
        self.upload = Some(UploadedFile {
            file: file.clone(),
            preview_url: ObjectUrl::from(file.clone()),
        });

        let link = ctx.link().clone();
        let session_id = self.session_id;
        spawn_local(async move {
            match api::predict(&file, session_id).await {
                Ok(prediction) => link.send_message(Msg::PredictionReceived(ticket, prediction)),
                Err(e) => link.send_message(Msg::PredictionFailed(ticket, e)),
            }
        });

        true
    }

    fn handle_prediction(&mut self, ticket: u32, prediction: PredictionResponse) -> bool {
        if !self.predictions.finish(ticket) {
            log::warn!("Dropping stale prediction for request {}", ticket);
            return false;
        }
        if self.session_id != Some(prediction.session_id) {
            if let Err(e) = SessionStorage::set(SESSION_KEY, prediction.session_id) {
                log::warn!("Could not persist session id: {}", e);
            }
            self.session_id = Some(prediction.session_id);
        }
        self.prediction = Some(prediction);
        true
    }

    fn handle_generate_report(&mut self, ctx: &Context<Self>) -> bool {
        let Some(session_id) = self.prediction.as_ref().map(|p| p.session_id) else {
            self.error = Some("Upload an image before generating a report.".into());
            return true;
        };

        if self.patient.validate().is_err() {
            self.error = Some(MISSING_PATIENT_FIELDS.into());
            self.report = None;
            return true;
        }

        self.error = None;
        self.generating = true;
        let request = ReportRequest {
            session_id,
            patient: self.patient.clone(),
        };
        let filename = report_filename(&self.patient.name);
        let link = ctx.link().clone();

        spawn_local(async move {
            match api::generate_report(&request).await {
                Ok(bytes) => {
                    let blob =
                        gloo_file::Blob::new_with_options(bytes.as_slice(), Some("application/pdf"));
                    link.send_message(Msg::ReportReady(ReportDownload {
                        url: ObjectUrl::from(blob),
                        filename,
                    }));
                }
                Err(e) => {
                    gloo_console::error!(format!("Report request failed: {}", e));
                    link.send_message(Msg::SetError(Some(e)));
                }
            }
        });

        true
    }

    fn handle_drop(&mut self, ctx: &Context<Self>, event: DragEvent) -> bool {
        event.prevent_default();
        self.is_dragging = false;
        if self.predictions.is_busy() {
            return true;
        }

        if let Some(file_list) = event.data_transfer().and_then(|dt| dt.files()) {
            self.process_file_list(ctx, file_list);
        }
        true
    }

    fn handle_paste(&mut self, ctx: &Context<Self>, event: ClipboardEvent) -> bool {
        if self.predictions.is_busy() {
            return false;
        }
        if let Some(file_list) = event.clipboard_data().and_then(|dt| dt.files()) {
            if file_list.length() > 0 {
                event.prevent_default();
                self.process_file_list(ctx, file_list);
                return true;
            }
        }
        false
    }

    /// Only the first file counts; one image is analysed at a time.
    fn process_file_list(&self, ctx: &Context<Self>, file_list: FileList) {
        if let Some(file) = file_list.item(0) {
            if file_list.length() > 1 {
                log::warn!("Ignoring {} extra file(s)", file_list.length() - 1);
            }
            ctx.link()
                .send_message(Msg::FileSelected(GlooFile::from(file)));
        }
    }
}

fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    yew::Renderer::<Model>::new().render();
}
