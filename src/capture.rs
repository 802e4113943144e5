use ndarray::{s, Array3};
use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltrb};

/// Fired once per track, on the frame where its box starts shrinking.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureEvent {
    pub track_id: u64,
    pub bbox: BBox<Ltrb>,
    pub confidence: f32,
    pub area_ratio: f32,

    /// Owned copy of the whole frame, `(height, width, channels)`.
    pub frame: Array3<u8>,

    /// in seconds
    pub capture_time: f32,
}

impl CaptureEvent {
    /// The captured object cut out of `frame`. The box is clipped to the
    /// frame, so the result may be smaller than `bbox` or even empty.
    pub fn crop(&self) -> Array3<u8> {
        let (h, w, _) = self.frame.dim();
        let b = self.bbox.clipped(w, h).as_ltwh();

        let (x, y) = (b.left() as usize, b.top() as usize);
        let (cw, ch) = (b.width() as usize, b.height() as usize);

        self.frame.slice(s![y..y + ch, x..x + cw, ..]).to_owned()
    }

    /// Capture time as `H:MM:SS`, whole seconds.
    pub fn timecode(&self) -> String {
        timecode(self.capture_time)
    }

    pub fn record(&self, source: &str) -> CaptureRecord {
        CaptureRecord {
            track_id: self.track_id,
            bbox: self.bbox,
            confidence: self.confidence,
            area_ratio: self.area_ratio,
            capture_time: self.capture_time,
            timecode: self.timecode(),
            image_name: image_name(source, self.track_id),
        }
    }
}

/// Pixel-free summary of a capture, for downstream logs.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CaptureRecord {
    pub track_id: u64,
    pub bbox: BBox<Ltrb>,
    pub confidence: f32,
    pub area_ratio: f32,
    pub capture_time: f32,
    pub timecode: String,
    pub image_name: String,
}

pub fn timecode(seconds: f32) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };

    format!("{}:{:02}:{:02}", total / 3600, (total / 60) % 60, total % 60)
}

/// File name for a capture crop, `<source>_container_<id>.jpg`.
pub fn image_name(source: &str, track_id: u64) -> String {
    format!("{}_container_{:04}.jpg", source, track_id)
}
