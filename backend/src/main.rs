mod config;
mod inference;
mod report;
mod routes;
mod session;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use config::AppConfig;
use inference::Classifier;
use report::ReportBuilder;
use routes::configure_routes;
use session::SessionStore;
use std::time::Duration;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::load().map_err(|e| {
        log::error!("Configuration error: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    log::info!("Loading model from {}", config.model.path.display());
    let model = inference::load_model(&config.model.path).map_err(|e| {
        log::error!("Failed to load model at startup: {}", e);
        std::io::Error::other(format!("Model loading failed: {}", e))
    })?;
    let classifier = Classifier::new(model, config.model.threshold).map_err(|e| {
        log::error!("Invalid classifier configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;
    log::info!("Decision threshold: {}", classifier.threshold());

    let scratch_dir = config.scratch_dir();
    log::info!("Report scratch directory: {}", scratch_dir.display());
    let report_builder = ReportBuilder::new(scratch_dir, config.report.image_width_mm);
    let sessions = SessionStore::new(Duration::from_secs(config.session.idle_timeout_secs));

    let bind_address = config.bind_address();
    let frontend_dir = config.server.frontend_dir.clone();
    let upload_config = config.upload.clone();
    log::info!("Serving frontend from {}", frontend_dir);
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "DELETE", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .expose_headers(vec![actix_web::http::header::CONTENT_DISPOSITION])
                    .max_age(3600),
            )
            .app_data(web::Data::new(classifier.clone()))
            .app_data(web::Data::new(report_builder.clone()))
            .app_data(web::Data::new(sessions.clone()))
            .app_data(web::Data::new(upload_config.clone()))
            .configure(|cfg| configure_routes(cfg, frontend_dir.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
