use serde_derive::{Deserialize, Serialize};

use crate::error::Error;

pub const DEFAULT_MIN_AREA_RATIO: f32 = 0.2;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.6;
pub const DEFAULT_MAX_AGE: u32 = 10;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    /// Minimum box area / frame area for a detection to start a track and
    /// for a track to be captured.
    pub min_area_ratio: f32,

    /// A track only takes a detection whose IoU is strictly above this.
    pub iou_threshold: f32,

    /// Unmatched frames a track survives before eviction.
    pub max_age: u32,
}

impl TrackerConfig {
    pub fn new(min_area_ratio: f32) -> Self {
        Self {
            min_area_ratio,
            ..Default::default()
        }
    }

    pub fn with_iou_threshold(mut self, iou_threshold: f32) -> Self {
        self.iou_threshold = iou_threshold;
        self
    }

    pub fn with_max_age(mut self, max_age: u32) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        check_unit("min_area_ratio", self.min_area_ratio)?;
        check_unit("iou_threshold", self.iou_threshold)?;

        Ok(())
    }

    /// Forces both ratios into `[0, 1]`; NaN falls back to the default.
    pub fn clamped(self) -> Self {
        Self {
            min_area_ratio: clamp_unit(self.min_area_ratio, DEFAULT_MIN_AREA_RATIO),
            iou_threshold: clamp_unit(self.iou_threshold, DEFAULT_IOU_THRESHOLD),
            max_age: self.max_age,
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            min_area_ratio: DEFAULT_MIN_AREA_RATIO,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            max_age: DEFAULT_MAX_AGE,
        }
    }
}

fn check_unit(field: &'static str, value: f32) -> Result<(), Error> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidConfig { field, value })
    }
}

fn clamp_unit(value: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(0.0, 1.0)
    }
}
