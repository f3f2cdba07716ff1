use super::ReportError;
use super::layout::{Block, TITLE, compose};
use super::staging::StagedImage;
use super::writer::{Align, BLACK, DARK_BLUE, FontStyle, GREY, PageWriter, TextStyle};
use crate::inference::Prediction;
use chrono::{DateTime, Local};
use image::DynamicImage;
use shared::PatientRecord;
use std::path::PathBuf;

const FOOTER_OFFSET_MM: f32 = 45.0;

const TITLE_STYLE: TextStyle = TextStyle {
    font: FontStyle::Bold,
    size: 20.0,
    color: DARK_BLUE,
};
const TIMESTAMP_STYLE: TextStyle = TextStyle {
    font: FontStyle::Italic,
    size: 10.0,
    color: GREY,
};
const HEADING_STYLE: TextStyle = TextStyle {
    font: FontStyle::Bold,
    size: 14.0,
    color: BLACK,
};
const BODY_STYLE: TextStyle = TextStyle {
    font: FontStyle::Regular,
    size: 12.0,
    color: BLACK,
};

#[derive(Debug, Clone)]
pub struct ReportBuilder {
    scratch_dir: PathBuf,
    image_width_mm: f32,
}

impl ReportBuilder {
    pub fn new(scratch_dir: PathBuf, image_width_mm: f32) -> Self {
        Self {
            scratch_dir,
            image_width_mm,
        }
    }

    pub fn build(
        &self,
        patient: &PatientRecord,
        prediction: &Prediction,
        image: &DynamicImage,
    ) -> Result<Vec<u8>, ReportError> {
        self.build_at(patient, prediction, image, Local::now())
    }

    /// Renders the report as PDF bytes. The staged image file lives only for
    /// the duration of this call.
    pub fn build_at(
        &self,
        patient: &PatientRecord,
        prediction: &Prediction,
        image: &DynamicImage,
        generated_at: DateTime<Local>,
    ) -> Result<Vec<u8>, ReportError> {
        let blocks = compose(patient, prediction, &generated_at);

        let staged = StagedImage::write(&self.scratch_dir, image)?;
        log::debug!("Staged report image at {}", staged.path().display());
        let (pixel_width, pixel_height) = staged.dimensions();
        let mut embedded = Some(staged.load()?);

        let mut writer = PageWriter::new(TITLE)?;
        for block in blocks {
            match block {
                Block::Title(text) => writer.cell(&text, TITLE_STYLE, Align::Center),
                Block::Rule => writer.rule(DARK_BLUE, 0.5),
                Block::Timestamp(text) => writer.cell(&text, TIMESTAMP_STYLE, Align::Right),
                Block::Gap(height) => writer.ln(height),
                Block::Heading(text) => writer.cell(&text, HEADING_STYLE, Align::Left),
                Block::Line(text) => writer.cell(&text, BODY_STYLE, Align::Left),
                Block::Paragraph(text) => writer.multi_cell(&text, BODY_STYLE),
                Block::Image => {
                    if let Some(image) = embedded.take() {
                        writer.image(image, pixel_width, pixel_height, self.image_width_mm);
                    }
                }
                Block::Footer(lines) => {
                    writer.set_y_from_bottom(FOOTER_OFFSET_MM);
                    for line in lines {
                        writer.cell(line, TIMESTAMP_STYLE, Align::Center);
                    }
                }
            }
        }

        let pages = writer.pages();
        let bytes = writer.finish()?;
        drop(staged);

        log::info!(
            "Built report: {} page(s), {} bytes, prediction {}",
            pages,
            bytes.len(),
            prediction.label
        );
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use shared::Laterality;
    use std::path::Path;

    fn patient(notes: &str) -> PatientRecord {
        PatientRecord {
            name: "Jane Doe".to_string(),
            age: "54".to_string(),
            laterality: Some(Laterality::Left),
            notes: notes.to_string(),
        }
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_build_returns_pdf_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let builder = ReportBuilder::new(dir.path().to_path_buf(), 100.0);
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 48, Rgb([90, 90, 90])));
        let prediction = Prediction::from_score(0.9, 0.5);

        let bytes = builder.build(&patient(""), &prediction, &image).unwrap();

        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(entries(dir.path()), 0);
    }

    #[test]
    fn test_long_notes_and_tall_image_paginate() {
        let dir = tempfile::tempdir().unwrap();
        let builder = ReportBuilder::new(dir.path().to_path_buf(), 100.0);
        let image = DynamicImage::ImageRgb8(RgbImage::new(20, 200));
        let prediction = Prediction::from_score(0.1, 0.5);
        let notes = "Follow-up recommended. ".repeat(120);

        let bytes = builder.build(&patient(&notes), &prediction, &image).unwrap();

        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(entries(dir.path()), 0);
    }

    #[test]
    fn test_non_latin_name_still_builds() {
        let dir = tempfile::tempdir().unwrap();
        let builder = ReportBuilder::new(dir.path().to_path_buf(), 100.0);
        let image = DynamicImage::ImageRgb8(RgbImage::new(16, 16));
        let prediction = Prediction::from_score(0.9, 0.5);
        let mut record = patient("術後 😀");
        record.name = "李 Wei".to_string();

        let bytes = builder.build(&record, &prediction, &image).unwrap();

        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(entries(dir.path()), 0);
    }

    #[test]
    fn test_failed_build_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let builder = ReportBuilder::new(dir.path().to_path_buf(), 100.0);
        let image = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
        let prediction = Prediction::from_score(0.9, 0.5);

        let result = builder.build(&patient(""), &prediction, &image);

        assert!(result.is_err());
        assert_eq!(entries(dir.path()), 0);
    }

    #[test]
    fn test_missing_scratch_dir_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let builder = ReportBuilder::new(dir.path().join("gone"), 100.0);
        let image = DynamicImage::ImageRgb8(RgbImage::new(8, 8));
        let prediction = Prediction::from_score(0.9, 0.5);

        let result = builder.build(&patient(""), &prediction, &image);
        assert!(matches!(result, Err(ReportError::Staging(_))));
    }
}
