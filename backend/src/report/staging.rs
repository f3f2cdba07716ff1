use super::ReportError;
use image::{DynamicImage, ImageFormat};
use printpdf::Image;
use printpdf::image_crate::codecs::png::PngDecoder;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// The uploaded image written out as PNG for embedding. The file is uniquely
/// named and removed when this value drops, whichever way the build ends.
pub struct StagedImage {
    file: NamedTempFile,
    width: u32,
    height: u32,
}

impl StagedImage {
    pub fn write(scratch_dir: &Path, image: &DynamicImage) -> Result<Self, ReportError> {
        let mut file = tempfile::Builder::new()
            .prefix("mammoscan-")
            .suffix(".png")
            .tempfile_in(scratch_dir)?;

        let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
        {
            let mut writer = BufWriter::new(file.as_file_mut());
            rgb.write_to(&mut writer, ImageFormat::Png)?;
            writer.flush()?;
        }

        Ok(Self {
            file,
            width: rgb.width(),
            height: rgb.height(),
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Reads the staged file back as a PDF image object.
    pub fn load(&self) -> Result<Image, ReportError> {
        let reader = BufReader::new(self.file.reopen()?);
        let decoder = PngDecoder::new(reader).map_err(|e| ReportError::Embed(e.to_string()))?;
        Image::try_from(decoder).map_err(|e| ReportError::Embed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_file_exists_while_staged_and_not_after() {
        let dir = tempfile::tempdir().unwrap();
        let image = DynamicImage::ImageRgb8(RgbImage::new(30, 20));

        let staged = StagedImage::write(dir.path(), &image).unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(staged.dimensions(), (30, 20));
        assert!(staged.load().is_ok());

        drop(staged);
        assert!(!path.exists());
        assert_eq!(entries(dir.path()), 0);
    }

    #[test]
    fn test_concurrent_stagings_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let image = DynamicImage::ImageRgb8(RgbImage::new(4, 4));

        let first = StagedImage::write(dir.path(), &image).unwrap();
        let second = StagedImage::write(dir.path(), &image).unwrap();
        assert_ne!(first.path(), second.path());
        assert_eq!(entries(dir.path()), 2);
    }

    #[test]
    fn test_failed_encode_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let image = DynamicImage::ImageRgb8(RgbImage::new(0, 0));

        let result = StagedImage::write(dir.path(), &image);
        assert!(matches!(result, Err(ReportError::Encode(_))));
        assert_eq!(entries(dir.path()), 0);
    }
}
