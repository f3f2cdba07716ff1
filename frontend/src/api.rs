use gloo_file::File as GlooFile;
use gloo_net::http::{Request, Response};
use shared::{ErrorResponse, PredictionResponse, ReportRequest, SessionId};

/// Uploads the image for classification. Passing the current session id
/// replaces that session's image instead of opening a new one.
pub async fn predict(
    file: &GlooFile,
    session_id: Option<SessionId>,
) -> Result<PredictionResponse, String> {
    let form_data =
        web_sys::FormData::new().map_err(|_| "Failed to build upload form".to_string())?;
    form_data
        .append_with_blob_and_filename("image", file.as_ref(), &file.name())
        .map_err(|_| "Failed to attach image".to_string())?;
    if let Some(id) = session_id {
        form_data
            .append_with_str("session_id", &id.to_string())
            .map_err(|_| "Failed to attach session".to_string())?;
    }

    let response = Request::post("/api/predict")
        .body(form_data)
        .map_err(|e| format!("Failed to build request: {}", e))?
        .send()
        .await
        .map_err(|e| format!("Network error: {}", e))?;

    if !response.ok() {
        return Err(error_message(response).await);
    }
    response
        .json::<PredictionResponse>()
        .await
        .map_err(|e| format!("Failed to parse response: {}", e))
}

/// Requests the PDF report and returns its bytes.
pub async fn generate_report(request: &ReportRequest) -> Result<Vec<u8>, String> {
    let response = Request::post("/api/report")
        .json(request)
        .map_err(|e| format!("Failed to build request: {}", e))?
        .send()
        .await
        .map_err(|e| format!("Network error: {}", e))?;

    if !response.ok() {
        return Err(error_message(response).await);
    }
    response
        .binary()
        .await
        .map_err(|e| format!("Failed to read report: {}", e))
}

async fn error_message(response: Response) -> String {
    let status = response.status();
    match response.json::<ErrorResponse>().await {
        Ok(body) => body.error,
        Err(_) => format!("Server error: {}", status),
    }
}
