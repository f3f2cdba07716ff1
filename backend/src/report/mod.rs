pub mod builder;
pub mod layout;
pub mod staging;
pub mod writer;

pub use builder::ReportBuilder;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Failed to stage report image: {0}")]
    Staging(#[from] std::io::Error),
    #[error("Failed to encode report image: {0}")]
    Encode(#[from] image::ImageError),
    #[error("Failed to embed report image: {0}")]
    Embed(String),
    #[error("Failed to assemble PDF: {0}")]
    Pdf(String),
}
