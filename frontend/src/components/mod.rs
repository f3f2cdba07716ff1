pub mod header;
pub mod patient_form;
pub mod results;
pub mod upload_section;
pub mod utils;
