use crate::config::UploadConfig;
use crate::inference::preprocess::{decode, prepare};
use crate::inference::{Classifier, InferenceError, PreprocessError};
use crate::report::{ReportBuilder, ReportError};
use crate::session::{SessionEntry, SessionStore};
use actix_files::Files;
use actix_multipart::{Field, Multipart};
use actix_web::http::StatusCode;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{HttpResponse, ResponseError, web};
use futures::{StreamExt, TryStreamExt};
use log::{error, info, warn};
use serde_json::json;
use shared::{
    ErrorResponse, PredictionResponse, ReportRequest, SessionId, ValidationError,
    format_confidence, report_filename,
};

const ACCEPTED_TYPES: [&str; 3] = ["image/jpeg", "image/png", "application/octet-stream"];
const SESSION_ID_MAX_BYTES: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error("Unsupported image type {0}. Upload a JPEG or PNG image.")]
    UnsupportedMediaType(String),
    #[error("Image exceeds the upload limit of {0} bytes")]
    PayloadTooLarge(usize),
    #[error("Missing form field: {0}")]
    MissingField(&'static str),
    #[error("Invalid session id: {0}")]
    InvalidSessionId(String),
    #[error("No prediction for this session. Upload an image first.")]
    SessionNotFound,
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Preprocess(PreprocessError::UnsupportedFormat(_))
            | ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Preprocess(PreprocessError::InvalidImage(_))
            | ApiError::MissingField(_)
            | ApiError::InvalidSessionId(_)
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::SessionNotFound => StatusCode::NOT_FOUND,
            ApiError::Inference(_) | ApiError::Report(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let missing = match self {
            ApiError::Validation(err) => err.missing.clone(),
            _ => Vec::new(),
        };
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
            missing,
        })
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, frontend_dir: String) {
    configure_api(cfg);
    cfg.service(Files::new("/", frontend_dir).index_file("index.html"));
}

pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
    )
    .service(web::resource("/api/predict").route(web::post().to(handle_predict)))
    .service(web::resource("/api/report").route(web::post().to(handle_report)))
    .service(web::resource("/api/session/{session_id}").route(web::delete().to(end_session)))
    .service(web::resource("/api/health").route(web::get().to(health)));
}

struct Upload {
    image: Vec<u8>,
    session_id: Option<SessionId>,
}

async fn read_upload(mut payload: Multipart, max_bytes: usize) -> Result<Upload, ApiError> {
    let mut image = None;
    let mut session_id = None;

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                if let Some(mime) = field.content_type() {
                    if !ACCEPTED_TYPES.contains(&mime.essence_str()) {
                        return Err(ApiError::UnsupportedMediaType(mime.essence_str().to_string()));
                    }
                }
                image = Some(read_field(&mut field, max_bytes).await?);
            }
            "session_id" => {
                let raw = read_field(&mut field, SESSION_ID_MAX_BYTES)
                    .await
                    .map_err(|e| match e {
                        ApiError::PayloadTooLarge(_) => {
                            ApiError::InvalidSessionId("value too long".into())
                        }
                        other => other,
                    })?;
                let text = String::from_utf8_lossy(&raw).to_string();
                if !text.trim().is_empty() {
                    let id = text
                        .parse::<SessionId>()
                        .map_err(|_| ApiError::InvalidSessionId(text.clone()))?;
                    session_id = Some(id);
                }
            }
            _ => {
                while field.next().await.is_some() {}
            }
        }
    }

    Ok(Upload {
        image: image.ok_or(ApiError::MissingField("image"))?,
        session_id,
    })
}

async fn read_field(field: &mut Field, max_bytes: usize) -> Result<Vec<u8>, ApiError> {
    let mut data = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| ApiError::BadRequest(e.to_string()))?;
        if data.len() + chunk.len() > max_bytes {
            return Err(ApiError::PayloadTooLarge(max_bytes));
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

async fn handle_predict(
    classifier: web::Data<Classifier>,
    sessions: web::Data<SessionStore>,
    upload_config: web::Data<UploadConfig>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let upload = read_upload(payload, upload_config.max_bytes).await?;
    let session_id = upload.session_id.unwrap_or_default();
    let bytes = upload.image;
    let classifier = classifier.get_ref().clone();

    let outcome = web::block(move || -> Result<_, ApiError> {
        let image = decode(&bytes)?;
        let tensor = prepare(&image)?;
        let prediction = classifier.classify(&tensor)?;
        Ok((image, prediction))
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    let (image, prediction) = match outcome {
        Ok(result) => result,
        Err(e) => {
            warn!("Prediction failed for session {}: {}", session_id, e);
            return Err(e);
        }
    };

    info!(
        "Session {}: {}x{} image -> {} ({})",
        session_id,
        image.width(),
        image.height(),
        prediction.label,
        format_confidence(prediction.confidence)
    );
    sessions
        .insert(session_id, SessionEntry::new(image, prediction))
        .await;
    log::debug!("{} active session(s)", sessions.len().await);

    Ok(HttpResponse::Ok().json(PredictionResponse {
        session_id,
        label: prediction.label,
        confidence: prediction.confidence,
        confidence_display: format_confidence(prediction.confidence),
    }))
}

async fn handle_report(
    builder: web::Data<ReportBuilder>,
    sessions: web::Data<SessionStore>,
    request: web::Json<ReportRequest>,
) -> Result<HttpResponse, ApiError> {
    let ReportRequest {
        session_id,
        patient,
    } = request.into_inner();

    patient.validate()?;
    let entry = sessions
        .get(&session_id)
        .await
        .ok_or(ApiError::SessionNotFound)?;

    let filename = report_filename(&patient.name);
    let builder = builder.get_ref().clone();
    let bytes = web::block(move || builder.build(&patient, &entry.prediction, &entry.image))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| {
            error!("Report build failed for session {}: {}", session_id, e);
            ApiError::Report(e)
        })?;

    info!("Session {}: report ready ({} bytes)", session_id, bytes.len());
    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(filename)],
        })
        .body(bytes))
}

async fn end_session(
    sessions: web::Data<SessionStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let raw = path.into_inner();
    let session_id = raw
        .parse::<SessionId>()
        .map_err(|_| ApiError::InvalidSessionId(raw.clone()))?;

    if sessions.remove(&session_id).await {
        info!("Session {} ended", session_id);
    }
    Ok(HttpResponse::NoContent().finish())
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::classifier::tests::FixedScore;
    use actix_web::dev::{Service, ServiceResponse};
    use actix_web::http::header;
    use actix_web::{App, test};
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use shared::{Label, Laterality, PatientRecord};
    use std::io::{Cursor, Write};
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    const BOUNDARY: &str = "mammoscan-test-boundary";

    struct Harness {
        sessions: SessionStore,
        scratch: tempfile::TempDir,
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([40, 80, 120])));
        let mut buffer = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    fn multipart(image: &[u8], content_type: &str, session_id: Option<SessionId>) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some(id) = session_id {
            write!(
                body,
                "--{}\r\nContent-Disposition: form-data; name=\"session_id\"\r\n\r\n{}\r\n",
                BOUNDARY, id
            )
            .unwrap();
        }
        write!(
            body,
            "--{}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"scan.png\"\r\nContent-Type: {}\r\n\r\n",
            BOUNDARY, content_type
        )
        .unwrap();
        body.extend_from_slice(image);
        write!(body, "\r\n--{}--\r\n", BOUNDARY).unwrap();
        body
    }

    fn predict_request(body: Vec<u8>) -> actix_http::Request {
        test::TestRequest::post()
            .uri("/api/predict")
            .insert_header((
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(body)
            .to_request()
    }

    fn report_request(session_id: SessionId, patient: PatientRecord) -> actix_http::Request {
        test::TestRequest::post()
            .uri("/api/report")
            .set_json(ReportRequest {
                session_id,
                patient,
            })
            .to_request()
    }

    fn jane() -> PatientRecord {
        PatientRecord {
            name: "Jane Doe".to_string(),
            age: "54".to_string(),
            laterality: Some(Laterality::Left),
            notes: String::new(),
        }
    }

    async fn app(
        score: f32,
        max_bytes: usize,
    ) -> (
        impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
        Harness,
    ) {
        let scratch = tempfile::tempdir().unwrap();
        let classifier = Classifier::new(Arc::new(FixedScore(score)), 0.5).unwrap();
        let builder = ReportBuilder::new(scratch.path().to_path_buf(), 100.0);
        let sessions = SessionStore::new(Duration::from_secs(60));

        let service = test::init_service(
            App::new()
                .app_data(web::Data::new(classifier))
                .app_data(web::Data::new(builder))
                .app_data(web::Data::new(sessions.clone()))
                .app_data(web::Data::new(UploadConfig { max_bytes }))
                .configure(configure_api),
        )
        .await;

        (service, Harness { sessions, scratch })
    }

    fn scratch_is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[actix_web::test]
    async fn test_upload_then_report_end_to_end() {
        let (app, harness) = app(0.9, 1 << 20).await;

        let prediction: PredictionResponse =
            test::call_and_read_body_json(&app, predict_request(multipart(&png(512, 512), "image/png", None)))
                .await;
        assert_eq!(prediction.label, Label::Normal);
        assert_eq!(prediction.confidence_display, "90.00%");
        assert_eq!(harness.sessions.len().await, 1);

        let resp = test::call_service(&app, report_request(prediction.session_id, jane())).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/pdf"
        );
        let disposition = resp
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment"));
        assert!(disposition.contains("Jane_Doe_breast_cancer_result.pdf"));

        let body = test::read_body(resp).await;
        assert!(body.starts_with(b"%PDF"));
        assert!(scratch_is_empty(harness.scratch.path()));
    }

    #[actix_web::test]
    async fn test_blank_age_is_rejected_without_report() {
        let (app, harness) = app(0.9, 1 << 20).await;
        let prediction: PredictionResponse =
            test::call_and_read_body_json(&app, predict_request(multipart(&png(64, 64), "image/png", None)))
                .await;

        let mut patient = jane();
        patient.age = "  ".to_string();
        let resp = test::call_service(&app, report_request(prediction.session_id, patient)).await;

        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(body.missing, vec!["age".to_string()]);
        assert_eq!(body.error, shared::MISSING_PATIENT_FIELDS);
        assert!(scratch_is_empty(harness.scratch.path()));
    }

    #[actix_web::test]
    async fn test_score_at_threshold_reports_cancer() {
        let (app, _harness) = app(0.5, 1 << 20).await;
        let prediction: PredictionResponse =
            test::call_and_read_body_json(&app, predict_request(multipart(&png(10, 30), "image/png", None)))
                .await;

        assert_eq!(prediction.label, Label::Cancer);
        assert_eq!(prediction.confidence, 0.5);
        assert_eq!(prediction.confidence_display, "50.00%");
    }

    #[actix_web::test]
    async fn test_reupload_replaces_session_prediction() {
        let (app, harness) = app(0.9, 1 << 20).await;
        let first: PredictionResponse =
            test::call_and_read_body_json(&app, predict_request(multipart(&png(8, 8), "image/png", None)))
                .await;

        let second: PredictionResponse = test::call_and_read_body_json(
            &app,
            predict_request(multipart(&png(16, 16), "image/png", Some(first.session_id))),
        )
        .await;

        assert_eq!(first.session_id, second.session_id);
        assert_eq!(harness.sessions.len().await, 1);
        let entry = harness.sessions.get(&first.session_id).await.unwrap();
        assert_eq!(entry.image.width(), 16);
    }

    #[actix_web::test]
    async fn test_corrupt_image_is_bad_request() {
        let (app, harness) = app(0.9, 1 << 20).await;
        let resp = test::call_service(
            &app,
            predict_request(multipart(b"\x89PNG\r\n\x1a\nbroken", "image/png", None)),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(harness.sessions.len().await, 0);
    }

    #[actix_web::test]
    async fn test_unsupported_type_is_rejected() {
        let (app, _harness) = app(0.9, 1 << 20).await;
        let resp =
            test::call_service(&app, predict_request(multipart(&png(8, 8), "image/gif", None))).await;
        assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[actix_web::test]
    async fn test_oversized_upload_is_rejected() {
        let (app, _harness) = app(0.9, 128).await;
        let resp = test::call_service(
            &app,
            predict_request(multipart(&vec![0u8; 4096], "image/png", None)),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[actix_web::test]
    async fn test_overlong_session_id_is_bad_request() {
        let (app, harness) = app(0.9, 1 << 20).await;
        let mut body = Vec::new();
        write!(
            body,
            "--{}\r\nContent-Disposition: form-data; name=\"session_id\"\r\n\r\n{}\r\n",
            BOUNDARY,
            "a".repeat(100)
        )
        .unwrap();
        body.extend_from_slice(&multipart(&png(8, 8), "image/png", None));

        let resp = test::call_service(&app, predict_request(body)).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse = test::read_body_json(resp).await;
        assert!(body.error.starts_with("Invalid session id"));
        assert_eq!(harness.sessions.len().await, 0);
    }

    #[actix_web::test]
    async fn test_report_for_unknown_session() {
        let (app, _harness) = app(0.9, 1 << 20).await;
        let resp = test::call_service(&app, report_request(SessionId::new(), jane())).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_end_session_forgets_prediction() {
        let (app, harness) = app(0.9, 1 << 20).await;
        let prediction: PredictionResponse =
            test::call_and_read_body_json(&app, predict_request(multipart(&png(8, 8), "image/png", None)))
                .await;

        let req = test::TestRequest::delete()
            .uri(&format!("/api/session/{}", prediction.session_id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(harness.sessions.len().await, 0);

        let resp = test::call_service(&app, report_request(prediction.session_id, jane())).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_malformed_json_is_bad_request() {
        let (app, _harness) = app(0.9, 1 << 20).await;
        let req = test::TestRequest::post()
            .uri("/api/report")
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_health() {
        let (app, _harness) = app(0.9, 1 << 20).await;
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }
}
