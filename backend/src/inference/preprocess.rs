use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use ndarray::{Array, Array4, Axis};

/// Side length the classifier was trained on.
pub const TARGET_SIZE: u32 = 224;

/// Per-channel means subtracted by the ResNet "caffe" preprocessing the model
/// was trained with, in BGR order. Part of the model contract; do not tune.
pub const CAFFE_MEAN_BGR: [f32; 3] = [103.939, 116.779, 123.68];

#[derive(Debug, thiserror::Error)]
pub enum PreprocessError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
}

impl From<image::ImageError> for PreprocessError {
    fn from(err: image::ImageError) -> Self {
        PreprocessError::InvalidImage(err.to_string())
    }
}

/// Model input, `[1, 224, 224, 3]` NHWC.
#[derive(Debug, Clone)]
pub struct Tensor(Array4<f32>);

impl Tensor {
    pub fn shape(&self) -> &[usize] {
        self.0.shape()
    }

    /// Contiguous row-major view of the data.
    pub fn as_slice(&self) -> Option<&[f32]> {
        self.0.as_slice()
    }
}

/// Decodes an uploaded JPEG or PNG.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, PreprocessError> {
    if bytes.is_empty() {
        return Err(PreprocessError::InvalidImage("empty upload".into()));
    }

    let format = image::guess_format(bytes)?;
    if !matches!(format, ImageFormat::Jpeg | ImageFormat::Png) {
        return Err(PreprocessError::UnsupportedFormat(format!("{:?}", format)));
    }

    let image = image::load_from_memory_with_format(bytes, format)?;
    ensure_dimensions(&image)?;
    Ok(image)
}

/// Turns an image of any size and colour mode into the classifier input.
pub fn prepare(image: &DynamicImage) -> Result<Tensor, PreprocessError> {
    ensure_dimensions(image)?;

    let resized = image
        .resize_exact(TARGET_SIZE, TARGET_SIZE, FilterType::CatmullRom)
        .to_rgb8();

    let side = TARGET_SIZE as usize;
    let mut data = Vec::with_capacity(side * side * 3);
    for pixel in resized.pixels() {
        let [r, g, b] = pixel.0;
        data.push(b as f32 - CAFFE_MEAN_BGR[0]);
        data.push(g as f32 - CAFFE_MEAN_BGR[1]);
        data.push(r as f32 - CAFFE_MEAN_BGR[2]);
    }

    let array = Array::from_shape_vec((side, side, 3), data)
        .map_err(|e| PreprocessError::InvalidImage(e.to_string()))?;

    Ok(Tensor(array.insert_axis(Axis(0))))
}

fn ensure_dimensions(image: &DynamicImage) -> Result<(), PreprocessError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(PreprocessError::InvalidImage(format!(
            "zero-sized image ({}x{})",
            image.width(),
            image.height()
        )));
    }
    Ok(())
}
