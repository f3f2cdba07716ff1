use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum_macros::{AsRefStr, EnumIter, EnumString};
use uuid::Uuid;

pub const REPORT_FILE_SUFFIX: &str = "_breast_cancer_result.pdf";

pub const MISSING_PATIENT_FIELDS: &str =
    "Please enter your name, age, and breast laterality to generate the report.";

/// Identity of one browser session. Handed out by the server on the first
/// upload and echoed back by the client on every later request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display, AsRefStr,
)]
pub enum Label {
    Cancer,
    Normal,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum_macros::Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
pub enum Laterality {
    #[default]
    Left,
    Right,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientRecord {
    pub name: String,
    pub age: String,
    pub laterality: Option<Laterality>,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{}", MISSING_PATIENT_FIELDS)]
pub struct ValidationError {
    pub missing: Vec<String>,
}

impl PatientRecord {
    /// Name, age and laterality are required. Whitespace-only counts as blank.
    /// Values are otherwise taken as entered.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("name".to_string());
        }
        if self.age.trim().is_empty() {
            missing.push("age".to_string());
        }
        if self.laterality.is_none() {
            missing.push("laterality".to_string());
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { missing })
        }
    }

    /// Notes worth printing, if any.
    pub fn notes(&self) -> Option<&str> {
        if self.notes.trim().is_empty() {
            None
        } else {
            Some(&self.notes)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub session_id: SessionId,
    pub label: Label,
    pub confidence: f32,
    pub confidence_display: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub session_id: SessionId,
    pub patient: PatientRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
}

pub fn format_confidence(confidence: f32) -> String {
    format!("{:.2}%", confidence * 100.0)
}

/// `Jane Doe` -> `Jane_Doe_breast_cancer_result.pdf`
///
/// The name is trimmed first, so stray leading or trailing blanks typed into
/// the form never become `_` at the edges of the filename. Inner whitespace
/// of any kind, tabs included, maps to one `_` per character.
pub fn report_filename(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    format!("{}{}", stem, REPORT_FILE_SUFFIX)
}
