use serde_derive::{Deserialize, Serialize};

/// Area history of a single track and its peak state.
///
/// A trajectory starts out growing. The first observation that is smaller
/// than the one right before it marks the peak. An observation above
/// `max_area` makes it growing again, so a later shrink marks a new peak;
/// `captured` stays set once a capture fired.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SizeTrajectory {
    areas: Vec<i64>,
    frames: Vec<u64>,
    max_area: i64,
    max_frame: u64,
    is_growing: bool,
    captured: bool,
}

impl SizeTrajectory {
    pub fn new(area: i64, frame: u64) -> Self {
        Self {
            areas: vec![area],
            frames: vec![frame],
            max_area: area,
            max_frame: frame,
            is_growing: true,
            captured: false,
        }
    }

    /// Records a matched observation. Returns `true` when this one marks the peak.
    pub fn push(&mut self, area: i64, frame: u64) -> bool {
        let prev = self.last_area();

        self.areas.push(area);
        self.frames.push(frame);

        if area > self.max_area {
            self.max_area = area;
            self.max_frame = frame;
            self.is_growing = true;
        } else if self.is_growing && area < prev {
            self.is_growing = false;
            return true;
        }

        false
    }

    /// Past the peak and not yet captured.
    #[inline]
    pub fn is_ready(&self) -> bool {
        !self.is_growing && !self.captured
    }

    #[inline]
    pub(crate) fn mark_captured(&mut self) {
        self.captured = true;
    }

    #[inline]
    pub fn areas(&self) -> &[i64] {
        &self.areas
    }

    #[inline]
    pub fn frames(&self) -> &[u64] {
        &self.frames
    }

    #[inline]
    pub fn last_area(&self) -> i64 {
        self.areas.last().copied().unwrap_or_default()
    }

    #[inline]
    pub fn max_area(&self) -> i64 {
        self.max_area
    }

    #[inline]
    pub fn max_frame(&self) -> u64 {
        self.max_frame
    }

    #[inline]
    pub fn is_growing(&self) -> bool {
        self.is_growing
    }

    #[inline]
    pub fn captured(&self) -> bool {
        self.captured
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.areas.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }
}
