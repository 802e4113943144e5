use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltrb};

/// One detector hit: corner box, confidence and class label
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub bbox: BBox<Ltrb>,
    #[serde(rename = "p")]
    pub confidence: f32,
    #[serde(rename = "c")]
    pub class: i32,
}

impl Detection {
    #[inline]
    pub fn new(bbox: BBox<Ltrb>, confidence: f32, class: i32) -> Self {
        Self {
            bbox,
            confidence,
            class,
        }
    }

    #[inline]
    pub fn iou(&self, other: &Detection) -> f32 {
        self.bbox.iou(&other.bbox)
    }

    #[inline(always)]
    pub fn area(&self) -> i64 {
        self.bbox.area()
    }

    /// Box area relative to a frame of `frame_area` pixels, 0 for an empty frame.
    #[inline]
    pub fn area_ratio(&self, frame_area: i64) -> f32 {
        area_ratio(self.area(), frame_area)
    }
}

impl From<([i32; 4], f32, i32)> for Detection {
    fn from((bbox, confidence, class): ([i32; 4], f32, i32)) -> Self {
        Self::new(bbox.into(), confidence, class)
    }
}

#[inline]
pub(crate) fn area_ratio(area: i64, frame_area: i64) -> f32 {
    if frame_area <= 0 {
        return 0.0;
    }

    (area as f64 / frame_area as f64) as f32
}

/// Keeps only detections of `class`, for detectors that emit several labels.
pub fn of_class(detections: impl IntoIterator<Item = Detection>, class: i32) -> Vec<Detection> {
    detections
        .into_iter()
        .filter(|d| d.class == class)
        .collect()
}
