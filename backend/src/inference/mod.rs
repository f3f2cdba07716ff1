pub mod classifier;
pub mod preprocess;
#[cfg(feature = "libtorch")]
pub mod torch;

pub use classifier::{Classifier, InferenceError, ModelLoadError, Prediction, ScoreModel};
pub use preprocess::{PreprocessError, Tensor};

use std::path::Path;
use std::sync::Arc;

/// Loads the model artifact once at startup. Any failure here is fatal.
#[cfg(feature = "libtorch")]
pub fn load_model(model_path: &Path) -> Result<Arc<dyn ScoreModel>, ModelLoadError> {
    Ok(Arc::new(torch::TorchModel::load(model_path)?))
}

#[cfg(not(feature = "libtorch"))]
pub fn load_model(model_path: &Path) -> Result<Arc<dyn ScoreModel>, ModelLoadError> {
    if !model_path.exists() {
        return Err(ModelLoadError::NotFound(model_path.display().to_string()));
    }
    Err(ModelLoadError::RuntimeUnavailable)
}
