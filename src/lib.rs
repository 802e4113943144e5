pub mod bbox;
pub mod capture;
pub mod config;
pub mod container_code;
pub mod detection;
pub mod error;
pub mod frame;
pub mod tracker;
pub mod trajectory;

mod track;

pub use capture::{CaptureEvent, CaptureRecord};
pub use config::TrackerConfig;
pub use container_code::ContainerCode;
pub use detection::Detection;
pub use error::{DetectorError, Error};
pub use frame::Frame;
pub use track::Track;
pub use tracker::CaptureTracker;
pub use trajectory::SizeTrajectory;

use std::collections::HashMap;
use std::rc::Rc;

pub trait Tracking {
    fn update(&mut self, frame: &Frame<'_>, src: &str) -> Vec<CaptureEvent>;
    fn tracks(&self, src: &str) -> Rc<[Track]>;
}

/// One isolated [`CaptureTracker`] per video source, created on first use.
pub struct MultiStreamTracker {
    config: TrackerConfig,
    streams: HashMap<String, CaptureTracker>,
}

impl MultiStreamTracker {
    pub fn new(config: TrackerConfig) -> Result<Self, Error> {
        config.validate()?;

        Ok(Self {
            config,
            streams: HashMap::new(),
        })
    }

    #[inline]
    pub fn stream(&self, src: &str) -> Option<&CaptureTracker> {
        self.streams.get(src)
    }

    /// Forgets a source; its next frame starts a fresh tracker.
    pub fn remove(&mut self, src: &str) -> Option<CaptureTracker> {
        self.streams.remove(src)
    }

    #[inline]
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.streams.keys().map(String::as_str)
    }
}

impl Default for MultiStreamTracker {
    fn default() -> Self {
        Self {
            config: TrackerConfig::default(),
            streams: HashMap::new(),
        }
    }
}

impl crate::Tracking for MultiStreamTracker {
    fn update(&mut self, frame: &Frame<'_>, src: &str) -> Vec<CaptureEvent> {
        let item = self.streams.get_mut(src);
        let tracker = if let Some(tracker) = item {
            tracker
        } else {
            let config = self.config;

            self.streams
                .entry(src.to_string())
                .or_insert_with(|| CaptureTracker::from_config(config))
        };

        let (captures, _) = tracker.update_frame(frame);
        captures
    }

    #[inline]
    fn tracks(&self, src: &str) -> Rc<[Track]> {
        if let Some(tracker) = self.streams.get(src) {
            return tracker.tracks().copied().collect();
        }

        Rc::new([])
    }
}
