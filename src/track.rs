use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltrb};
use crate::detection::{self, Detection};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Track {
    pub track_id: u64,
    pub bbox: BBox<Ltrb>,
    pub confidence: f32,
    pub class: i32,

    // frames since the last matched detection
    pub age: u32,

    // in px^2
    pub area: i64,

    // area / frame area of the frame that produced `bbox`
    pub area_ratio: f32,
}

impl Track {
    pub(crate) fn new(track_id: u64, det: &Detection, frame_area: i64) -> Self {
        let area = det.area();

        Self {
            track_id,
            bbox: det.bbox,
            confidence: det.confidence,
            class: det.class,
            age: 0,
            area,
            area_ratio: detection::area_ratio(area, frame_area),
        }
    }

    /// Takes over the matched detection and resets staleness.
    pub(crate) fn update(&mut self, det: &Detection, frame_area: i64) {
        *self = Self::new(self.track_id, det, frame_area);
    }
}
