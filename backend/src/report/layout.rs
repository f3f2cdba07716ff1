use crate::inference::Prediction;
use chrono::{DateTime, Local};
use shared::{PatientRecord, format_confidence};

pub const TITLE: &str = "Breast Cancer Detection Report";

pub const DISCLAIMER: [&str; 2] = [
    "This report is generated by the Breast Cancer Detection System.",
    "For informational purposes only. Consult a medical professional for diagnosis.",
];

const TIMESTAMP_FORMAT: &str = "%B %d, %Y, %I:%M %p";

/// One element of the report, top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Title(String),
    Rule,
    Timestamp(String),
    Gap(f32),
    Heading(String),
    Line(String),
    Paragraph(String),
    Image,
    Footer([&'static str; 2]),
}

pub fn compose(
    patient: &PatientRecord,
    prediction: &Prediction,
    generated_at: &DateTime<Local>,
) -> Vec<Block> {
    let laterality = patient
        .laterality
        .map(|l| l.to_string())
        .unwrap_or_default();

    let mut blocks = vec![
        Block::Title(TITLE.to_string()),
        Block::Rule,
        Block::Timestamp(format!(
            "Report Generated On: {}",
            generated_at.format(TIMESTAMP_FORMAT)
        )),
        Block::Gap(5.0),
        Block::Heading("Patient Details".to_string()),
        Block::Line(format!("Name: {}", patient.name)),
        Block::Line(format!("Age: {}", patient.age)),
        Block::Line(format!("Breast Laterality: {}", laterality)),
    ];

    if let Some(notes) = patient.notes() {
        blocks.push(Block::Gap(5.0));
        blocks.push(Block::Heading("Additional Notes".to_string()));
        blocks.push(Block::Paragraph(notes.to_string()));
    }

    blocks.extend([
        Block::Gap(10.0),
        Block::Heading("Prediction Results".to_string()),
        Block::Line(format!("Prediction: {}", prediction.label)),
        Block::Line(format!(
            "Confidence: {}",
            format_confidence(prediction.confidence)
        )),
        Block::Gap(10.0),
        Block::Heading("Uploaded Image".to_string()),
        Block::Image,
        Block::Footer(DISCLAIMER),
    ]);

    blocks
}
