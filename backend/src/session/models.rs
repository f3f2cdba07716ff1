use crate::inference::Prediction;
use image::DynamicImage;
use std::sync::Arc;
use std::time::Instant;

/// What one browser session holds between uploading an image and asking for
/// its report.
#[derive(Clone)]
pub struct SessionEntry {
    pub image: Arc<DynamicImage>,
    pub prediction: Prediction,
    pub last_seen: Instant,
}

impl SessionEntry {
    pub fn new(image: DynamicImage, prediction: Prediction) -> Self {
        Self {
            image: Arc::new(image),
            prediction,
            last_seen: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    pub fn is_expired(&self, now: Instant, idle_timeout: std::time::Duration) -> bool {
        now.saturating_duration_since(self.last_seen) > idle_timeout
    }
}
