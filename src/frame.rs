use ndarray::ArrayView3;

use crate::detection::Detection;
use crate::error::DetectorError;

/// Detector output for a frame; a failed run carries its reason instead of boxes.
pub type DetectorOutput = Result<Vec<Detection>, DetectorError>;

/// One video frame as handed to the tracker.
///
/// `image` is an `(height, width, channels)` view into the caller's buffer;
/// the tracker copies it only when a capture fires.
pub struct Frame<'a> {
    pub index: u64,
    pub fps: f32,
    pub image: ArrayView3<'a, u8>,
    pub detections: DetectorOutput,
}

impl<'a> Frame<'a> {
    pub fn new(index: u64, fps: f32, image: ArrayView3<'a, u8>, detections: DetectorOutput) -> Self {
        Self {
            index,
            fps,
            image,
            detections,
        }
    }

    /// (width, height)
    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        dims(&self.image)
    }

    #[inline]
    pub fn area(&self) -> i64 {
        let (w, h) = self.dims();

        (w as i64).saturating_mul(h as i64)
    }

    /// Seconds since the start of the stream, 0 when `fps` is unusable.
    #[inline]
    pub fn timestamp(&self) -> f32 {
        timestamp(self.index, self.fps)
    }

    /// Detections of this frame; empty when the detector failed.
    #[inline]
    pub fn detections(&self) -> &[Detection] {
        match &self.detections {
            Ok(dets) => dets.as_slice(),
            Err(_) => &[],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.detections().len()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Detection> {
        self.detections().iter()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.detections().is_empty()
    }
}

#[inline]
pub(crate) fn dims(image: &ArrayView3<'_, u8>) -> (usize, usize) {
    let (h, w, _) = image.dim();
    (w, h)
}

#[inline]
pub(crate) fn timestamp(index: u64, fps: f32) -> f32 {
    if fps.is_finite() && fps > 0.0 {
        (index as f64 / fps as f64) as f32
    } else {
        0.0
    }
}
