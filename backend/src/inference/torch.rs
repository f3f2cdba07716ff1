use super::classifier::{InferenceError, ModelLoadError, ScoreModel};
use super::preprocess::{Tensor, TARGET_SIZE};
use std::path::Path;
use std::sync::Mutex;
use tch::{CModule, Device, Kind};

/// TorchScript export of the classifier. The module takes one NHWC float
/// tensor and returns a single sigmoid score.
pub struct TorchModel {
    module: Mutex<CModule>,
    device: Device,
}

impl TorchModel {
    pub fn load(model_path: &Path) -> Result<Self, ModelLoadError> {
        if !model_path.exists() {
            return Err(ModelLoadError::NotFound(model_path.display().to_string()));
        }

        let device = Device::cuda_if_available();
        let mut module = CModule::load_on_device(model_path, device)
            .map_err(|e| ModelLoadError::Load(e.to_string()))?;
        module.set_eval();

        log::info!("Loaded {} on {:?}", model_path.display(), device);
        Ok(Self {
            module: Mutex::new(module),
            device,
        })
    }
}

impl ScoreModel for TorchModel {
    fn predict(&self, tensor: &Tensor) -> Result<f32, InferenceError> {
        let data = tensor
            .as_slice()
            .ok_or_else(|| InferenceError::Model("input tensor is not contiguous".into()))?;
        let side = TARGET_SIZE as i64;
        let input = tch::Tensor::from_slice(data)
            .view([1, side, side, 3])
            .to_device(self.device);

        let module = self
            .module
            .lock()
            .map_err(|_| InferenceError::Model("model lock poisoned".into()))?;
        let output = tch::no_grad(|| module.forward_ts(&[input]))
            .map_err(|e| InferenceError::Model(e.to_string()))?;

        let output = output.to_kind(Kind::Float).view([-1]);
        if output.numel() != 1 {
            return Err(InferenceError::Model(format!(
                "expected a single score, got {} values",
                output.numel()
            )));
        }

        let score = output
            .f_double_value(&[0])
            .map_err(|e| InferenceError::Model(e.to_string()))?;
        Ok(score as f32)
    }
}
