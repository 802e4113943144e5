use std::collections::{BTreeMap, BTreeSet};

use log::{debug, trace, warn};
use ndarray::ArrayView3;

use crate::capture::CaptureEvent;
use crate::config::TrackerConfig;
use crate::error::Error;
use crate::frame::{self, Frame};
use crate::trajectory::SizeTrajectory;
use crate::{Detection, Track};

/// Track and its size history, created and dropped together.
#[derive(Debug, Clone)]
struct Entry {
    track: Track,
    trajectory: SizeTrajectory,
}

/// Greedy IoU tracker that fires one [`CaptureEvent`] per object, on the
/// frame where its box stops growing.
///
/// `update` must be called once per frame, in frame order.
#[derive(Debug, Clone)]
pub struct CaptureTracker {
    config: TrackerConfig,
    entries: BTreeMap<u64, Entry>,
    captured: BTreeSet<u64>,
    next_id: u64,
}

impl CaptureTracker {
    /// Tracker with default IoU threshold and max age. An out of range
    /// `min_area_ratio` is clamped into `[0, 1]`.
    pub fn new(min_area_ratio: f32) -> Self {
        Self::from_config(TrackerConfig::new(min_area_ratio).clamped())
    }

    pub fn with_config(config: TrackerConfig) -> Result<Self, Error> {
        config.validate()?;

        Ok(Self::from_config(config))
    }

    /// Skips validation; callers pass an already validated config.
    pub(crate) fn from_config(config: TrackerConfig) -> Self {
        Self {
            config,
            entries: BTreeMap::new(),
            captured: BTreeSet::new(),
            next_id: 0,
        }
    }

    /// Feeds one frame. Returns the captures fired on it (ascending track id)
    /// and a snapshot of the live tracks (ascending track id).
    pub fn update(
        &mut self,
        detections: &[Detection],
        image: ArrayView3<'_, u8>,
        frame_index: u64,
        fps: f32,
    ) -> (Vec<CaptureEvent>, Vec<Track>) {
        let (w, h) = frame::dims(&image);
        let frame_area = (w as i64).saturating_mul(h as i64);

        self.age_tracks();
        let assigned = self.associate(detections, frame_area, frame_index);
        self.spawn_tracks(detections, &assigned, frame_area, frame_index);
        let captures = self.collect_captures(&image, frame_index, fps);

        (captures, self.tracks().copied().collect())
    }

    /// Same as [`update`](Self::update), taking the detector outcome with the
    /// frame. A failed detector counts as a frame without detections.
    pub fn update_frame(&mut self, frame: &Frame<'_>) -> (Vec<CaptureEvent>, Vec<Track>) {
        if let Err(err) = &frame.detections {
            warn!("frame {}: {}, tracks left to age", frame.index, err);
        }

        self.update(frame.detections(), frame.image.view(), frame.index, frame.fps)
    }

    fn age_tracks(&mut self) {
        let max_age = self.config.max_age;

        for entry in self.entries.values_mut() {
            entry.track.age = entry.track.age.saturating_add(1);
        }

        self.entries.retain(|id, entry| {
            let alive = entry.track.age <= max_age;
            if !alive {
                debug!("track {} evicted after {} missed frames", id, entry.track.age);
            }

            alive
        });
    }

    /// One greedy pass in ascending track id; a detection taken by a track
    /// is not offered to the following ones.
    fn associate(&mut self, detections: &[Detection], frame_area: i64, frame_index: u64) -> Vec<bool> {
        let iou_threshold = self.config.iou_threshold;
        let mut assigned = vec![false; detections.len()];

        for (id, entry) in self.entries.iter_mut() {
            let mut best_iou = iou_threshold;
            let mut best = None;

            for (i, det) in detections.iter().enumerate() {
                if assigned[i] {
                    continue;
                }

                let iou = entry.track.bbox.iou(&det.bbox);
                if iou > best_iou {
                    best_iou = iou;
                    best = Some(i);
                }
            }

            let Some(i) = best else {
                continue;
            };

            assigned[i] = true;
            entry.track.update(&detections[i], frame_area);
            trace!("track {} matched detection {} (iou {:.3})", id, i, best_iou);

            if entry.trajectory.push(entry.track.area, frame_index) {
                debug!(
                    "track {} peaked at frame {} (max area {})",
                    id,
                    entry.trajectory.max_frame(),
                    entry.trajectory.max_area()
                );
            }
        }

        assigned
    }

    fn spawn_tracks(
        &mut self,
        detections: &[Detection],
        assigned: &[bool],
        frame_area: i64,
        frame_index: u64,
    ) {
        let unassigned = detections
            .iter()
            .zip(assigned)
            .filter(|(_, taken)| !**taken)
            .map(|(det, _)| det);

        for det in unassigned {
            if det.area_ratio(frame_area) < self.config.min_area_ratio {
                continue;
            }

            let id = self.next_id;
            self.next_id += 1;

            let track = Track::new(id, det, frame_area);
            debug!(
                "track {} created at frame {} (area ratio {:.3})",
                id, frame_index, track.area_ratio
            );

            self.entries.insert(
                id,
                Entry {
                    trajectory: SizeTrajectory::new(track.area, frame_index),
                    track,
                },
            );
        }
    }

    fn collect_captures(
        &mut self,
        image: &ArrayView3<'_, u8>,
        frame_index: u64,
        fps: f32,
    ) -> Vec<CaptureEvent> {
        let min_area_ratio = self.config.min_area_ratio;
        let mut captures = Vec::new();

        for (&id, entry) in self.entries.iter_mut() {
            // the id set is a second guard next to the per-trajectory flag
            if !entry.trajectory.is_ready()
                || entry.track.area_ratio < min_area_ratio
                || self.captured.contains(&id)
            {
                continue;
            }

            entry.trajectory.mark_captured();
            self.captured.insert(id);

            let capture_time = frame::timestamp(frame_index, fps);
            debug!(
                "track {} captured at frame {} ({:.2}s, area ratio {:.3})",
                id, frame_index, capture_time, entry.track.area_ratio
            );

            captures.push(CaptureEvent {
                track_id: id,
                bbox: entry.track.bbox,
                confidence: entry.track.confidence,
                area_ratio: entry.track.area_ratio,
                frame: image.to_owned(),
                capture_time,
            });
        }

        captures
    }

    /// Live tracks in ascending id order.
    #[inline]
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.entries.values().map(|e| &e.track)
    }

    #[inline]
    pub fn track(&self, id: u64) -> Option<&Track> {
        self.entries.get(&id).map(|e| &e.track)
    }

    #[inline]
    pub fn trajectory(&self, id: u64) -> Option<&SizeTrajectory> {
        self.entries.get(&id).map(|e| &e.trajectory)
    }

    /// Whether `id` has ever fired a capture, live or not.
    #[inline]
    pub fn is_captured(&self, id: u64) -> bool {
        self.captured.contains(&id)
    }

    #[inline]
    pub fn captured_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.captured.iter().copied()
    }

    #[inline]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops all tracks and capture history. Ids keep counting up.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.captured.clear();
    }
}

impl Default for CaptureTracker {
    fn default() -> Self {
        Self::from_config(TrackerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::BBox;
    use crate::error::DetectorError;
    use ndarray::Array3;

    fn det(x1: i32, y1: i32, x2: i32, y2: i32) -> Detection {
        Detection::new(BBox::ltrb(x1, y1, x2, y2), 0.9, 0)
    }

    fn image(w: usize, h: usize) -> Array3<u8> {
        Array3::zeros((h, w, 3))
    }

    #[test]
    fn test_new_tracker() {
        let tracker = CaptureTracker::default();
        assert!(tracker.is_empty());
        assert_eq!(tracker.config(), &TrackerConfig::default());

        let clamped = CaptureTracker::new(3.0);
        assert_eq!(clamped.config().min_area_ratio, 1.0);

        assert!(CaptureTracker::with_config(TrackerConfig::new(-0.5)).is_err());
    }

    #[test]
    fn test_capture_on_first_decrease() {
        let mut tracker = CaptureTracker::new(0.2);
        let img = image(20, 20);
        // areas 100, 150, 200, 180, 160 in a 400 px frame
        let frames = [
            det(0, 0, 10, 10),
            det(0, 0, 10, 15),
            det(0, 0, 10, 20),
            det(0, 0, 10, 18),
            det(0, 0, 10, 16),
        ];

        let mut fired = Vec::new();
        for (i, d) in frames.iter().enumerate() {
            let index = i as u64 + 1;
            let (captures, tracks) = tracker.update(&[*d], img.view(), index, 10.0);
            assert_eq!(tracks.len(), 1);
            assert_eq!(tracks[0].track_id, 0);

            for c in captures {
                fired.push((index, c));
            }
        }

        assert_eq!(fired.len(), 1);
        let (index, capture) = &fired[0];
        assert_eq!(*index, 4);
        assert_eq!(capture.track_id, 0);
        assert_eq!(capture.bbox, BBox::ltrb(0, 0, 10, 18));
        assert!((capture.area_ratio - 0.45).abs() < 1e-6);
        assert!((capture.capture_time - 0.4).abs() < 1e-6);

        let traj = tracker.trajectory(0).unwrap();
        assert_eq!(traj.areas(), &[100, 150, 200, 180, 160]);
        assert_eq!(traj.frames(), &[1, 2, 3, 4, 5]);
        assert_eq!(traj.max_frame(), 3);
        assert!(traj.captured());
        assert!(tracker.is_captured(0));
    }

    #[test]
    fn test_capture_is_one_shot() {
        let mut tracker = CaptureTracker::new(0.2);
        let img = image(20, 20);
        // peak, shrink, regrow past the old max, shrink again: the second
        // peak is seen but the track already fired
        let frames = [
            det(0, 0, 10, 10),
            det(0, 0, 10, 14),
            det(0, 0, 10, 12),
            det(0, 0, 10, 16),
            det(0, 0, 10, 20),
            det(0, 0, 10, 17),
        ];

        let mut total = 0;
        for (i, d) in frames.iter().enumerate() {
            let (captures, _) = tracker.update(&[*d], img.view(), i as u64, 10.0);
            total += captures.len();
        }

        assert_eq!(total, 1);
        assert_eq!(tracker.len(), 1);

        let traj = tracker.trajectory(0).unwrap();
        assert!(!traj.is_growing());
        assert!(traj.captured());
        assert_eq!(traj.max_area(), 200);
    }

    #[test]
    fn test_peak_below_min_ratio_rearms_on_new_max() {
        let config = TrackerConfig::new(0.2).with_iou_threshold(0.3);
        let mut tracker = CaptureTracker::with_config(config).unwrap();
        let img = image(20, 20);
        // areas 100, 120, 70 (ratio 0.175, too small), 140, 160, 150
        let frames = [
            det(0, 0, 10, 10),
            det(0, 0, 10, 12),
            det(0, 0, 10, 7),
            det(0, 0, 10, 14),
            det(0, 0, 10, 16),
            det(0, 0, 10, 15),
        ];

        let mut fired = Vec::new();
        for (i, d) in frames.iter().enumerate() {
            let (captures, _) = tracker.update(&[*d], img.view(), i as u64, 10.0);
            fired.extend(captures.into_iter().map(|c| (i, c)));
        }

        // no capture while the box grows again, one at the first shrink after 160
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].0, 5);
        assert_eq!(fired[0].1.bbox, BBox::ltrb(0, 0, 10, 15));
        assert_eq!(tracker.trajectory(0).unwrap().max_frame(), 4);
    }

    #[test]
    fn test_threshold_gating() {
        let mut tracker = CaptureTracker::new(0.2);
        let img = image(100, 100);
        // 1900 / 10000 = 0.19
        let small = Detection::new(BBox::ltrb(0, 0, 38, 50), 1.0, 0);

        let (captures, tracks) = tracker.update(&[small], img.view(), 0, 30.0);
        assert!(captures.is_empty());
        assert!(tracks.is_empty());

        // 2000 / 10000 = 0.2 exactly
        let (_, tracks) = tracker.update(&[det(0, 0, 40, 50)], img.view(), 1, 30.0);
        assert_eq!(tracks.len(), 1);
    }

    #[test]
    fn test_no_capture_while_below_min_ratio() {
        let config = TrackerConfig::new(0.2).with_iou_threshold(0.5);
        let mut tracker = CaptureTracker::with_config(config).unwrap();
        let img = image(20, 20);

        // 100, 120 then down to 70 (ratio 0.175): peaked but too small
        let (c, _) = tracker.update(&[det(0, 0, 10, 10)], img.view(), 1, 1.0);
        assert!(c.is_empty());
        let (c, _) = tracker.update(&[det(0, 0, 10, 12)], img.view(), 2, 1.0);
        assert!(c.is_empty());
        let (c, _) = tracker.update(&[det(0, 0, 10, 7)], img.view(), 3, 1.0);
        assert!(c.is_empty());
        assert!(!tracker.trajectory(0).unwrap().is_growing());

        // back to ratio 0.2, still past the peak
        let (c, _) = tracker.update(&[det(0, 0, 10, 8)], img.view(), 4, 1.0);
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].track_id, 0);
    }

    #[test]
    fn test_eviction() {
        let mut tracker = CaptureTracker::new(0.2);
        let img = image(100, 100);
        let d = det(0, 0, 60, 60);

        tracker.update(&[d], img.view(), 0, 30.0);
        assert_eq!(tracker.len(), 1);

        for i in 1..=10 {
            let (_, tracks) = tracker.update(&[], img.view(), i, 30.0);
            assert_eq!(tracks.len(), 1);
            assert_eq!(tracks[0].age, i as u32);
        }

        let (captures, tracks) = tracker.update(&[], img.view(), 11, 30.0);
        assert!(captures.is_empty());
        assert!(tracks.is_empty());
        assert!(tracker.track(0).is_none());
        assert!(tracker.trajectory(0).is_none());

        // same object again gets a fresh id
        let (_, tracks) = tracker.update(&[d], img.view(), 12, 30.0);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].track_id, 1);
    }

    #[test]
    fn test_match_resets_age() {
        let mut tracker = CaptureTracker::new(0.2);
        let img = image(100, 100);
        let d = det(0, 0, 60, 60);

        tracker.update(&[d], img.view(), 0, 30.0);
        for i in 1..=5 {
            tracker.update(&[], img.view(), i, 30.0);
        }
        assert_eq!(tracker.track(0).unwrap().age, 5);

        let (_, tracks) = tracker.update(&[d], img.view(), 6, 30.0);
        assert_eq!(tracks[0].age, 0);
        assert_eq!(tracks[0].track_id, 0);
        assert_eq!(tracker.trajectory(0).unwrap().frames(), &[0, 6]);
    }

    #[test]
    fn test_greedy_association_order() {
        let config = TrackerConfig::new(0.2).with_iou_threshold(0.3);
        let mut tracker = CaptureTracker::with_config(config).unwrap();
        let img = image(100, 100);

        tracker.update(&[det(0, 0, 50, 50), det(10, 0, 60, 50)], img.view(), 0, 30.0);
        assert_eq!(tracker.len(), 2);

        // d1 is a perfect fit for track 1 but track 0 (iou 0.67) claims it first;
        // track 1 falls back to d2 (iou 0.43), which track 0 rejects (0.25)
        let d1 = det(10, 0, 60, 50);
        let d2 = det(30, 0, 80, 50);
        let (_, tracks) = tracker.update(&[d2, d1], img.view(), 1, 30.0);

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].track_id, 0);
        assert_eq!(tracks[0].bbox, d1.bbox);
        assert_eq!(tracks[1].track_id, 1);
        assert_eq!(tracks[1].bbox, d2.bbox);
    }

    #[test]
    fn test_iou_must_exceed_threshold() {
        let config = TrackerConfig::new(0.0).with_iou_threshold(0.5);
        let mut tracker = CaptureTracker::with_config(config).unwrap();
        let img = image(100, 100);

        tracker.update(&[det(0, 0, 20, 10)], img.view(), 0, 30.0);
        // iou exactly 0.5 does not match, a new track is created instead
        let (_, tracks) = tracker.update(&[det(0, 0, 10, 10)], img.view(), 1, 30.0);

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].age, 1);
        assert_eq!(tracks[1].track_id, 1);
    }

    #[test]
    fn test_empty_frames_evict_everything() {
        let mut tracker = CaptureTracker::new(0.2);
        let img = image(100, 100);

        tracker.update(&[det(0, 0, 50, 50), det(50, 50, 100, 100)], img.view(), 0, 30.0);
        assert_eq!(tracker.len(), 2);

        let mut last = (Vec::new(), Vec::new());
        for i in 1..=11 {
            last = tracker.update(&[], img.view(), i, 30.0);
            assert!(last.0.is_empty());
        }

        assert!(last.1.is_empty());
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_captures_in_ascending_id() {
        let mut tracker = CaptureTracker::new(0.1);
        let img = image(100, 100);

        tracker.update(&[det(0, 0, 40, 40), det(50, 50, 90, 90)], img.view(), 0, 30.0);
        tracker.update(&[det(50, 50, 95, 95), det(0, 0, 45, 45)], img.view(), 1, 30.0);
        let (captures, _) =
            tracker.update(&[det(50, 50, 92, 92), det(0, 0, 42, 42)], img.view(), 2, 30.0);

        let ids: Vec<_> = captures.iter().map(|c| c.track_id).collect();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(tracker.captured_ids().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_snapshot_is_independent_copy() {
        let mut tracker = CaptureTracker::new(0.2);
        let mut img = image(20, 20);

        tracker.update(&[det(0, 0, 10, 10)], img.view(), 0, 30.0);
        tracker.update(&[det(0, 0, 10, 12)], img.view(), 1, 30.0);
        img.fill(7);
        let (captures, _) = tracker.update(&[det(0, 0, 10, 11)], img.view(), 2, 30.0);
        img.fill(0);

        assert_eq!(captures.len(), 1);
        assert!(captures[0].frame.iter().all(|&p| p == 7));
        assert_eq!(captures[0].crop().dim(), (11, 10, 3));
    }

    #[test]
    fn test_detector_failure_ages_tracks() {
        let mut tracker = CaptureTracker::new(0.2);
        let img = image(100, 100);

        let frame = Frame::new(0, 30.0, img.view(), Ok(vec![det(0, 0, 60, 60)]));
        tracker.update_frame(&frame);

        let failed = Frame::new(1, 30.0, img.view(), Err(DetectorError::new("timeout")));
        let (captures, tracks) = tracker.update_frame(&failed);

        assert!(captures.is_empty());
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].age, 1);
    }

    #[test]
    fn test_degenerate_input_does_not_panic() {
        let mut tracker = CaptureTracker::new(0.0);
        let empty = image(0, 0);
        let dets = [det(10, 10, 0, 0), det(5, 5, 5, 5), det(i32::MIN, 0, i32::MAX, 1)];

        for i in 0..3 {
            tracker.update(&dets, empty.view(), i, 0.0);
            tracker.update(&dets, empty.view(), i, f32::NAN);
        }
    }

    #[test]
    fn test_captured_id_blocks_capture() {
        let mut tracker = CaptureTracker::new(0.2);
        let img = image(20, 20);

        tracker.update(&[det(0, 0, 10, 10)], img.view(), 0, 30.0);
        tracker.update(&[det(0, 0, 10, 12)], img.view(), 1, 30.0);

        // id already recorded as captured, trajectory flag still clear
        tracker.captured.insert(0);
        let (captures, _) = tracker.update(&[det(0, 0, 10, 11)], img.view(), 2, 30.0);

        assert!(captures.is_empty());
        let traj = tracker.trajectory(0).unwrap();
        assert!(!traj.is_growing());
        assert!(!traj.captured());
    }

    #[test]
    fn test_reset_keeps_id_counter() {
        let mut tracker = CaptureTracker::new(0.2);
        let img = image(100, 100);

        tracker.update(&[det(0, 0, 60, 60)], img.view(), 0, 30.0);
        tracker.reset();
        assert!(tracker.is_empty());

        let (_, tracks) = tracker.update(&[det(0, 0, 60, 60)], img.view(), 1, 30.0);
        assert_eq!(tracks[0].track_id, 1);
    }
}
