//! Test helpers.

use crate::{
    hand::{fingers::Finger, Hand, Handedness, LandmarkIdx, NUM_LANDMARKS},
    landmark::Landmark,
};

/// Builds [`Hand`]s from the few coordinates the classifier looks at.
///
/// Every landmark starts at `(0.5, 0.5)`, which classifies all fingers as down.
pub struct HandBuilder {
    landmarks: [Landmark; NUM_LANDMARKS],
    handedness: Handedness,
}

impl HandBuilder {
    pub fn new(handedness: Handedness) -> Self {
        Self {
            landmarks: [Landmark::new(0.5, 0.5); NUM_LANDMARKS],
            handedness,
        }
    }

    fn set(&mut self, idx: LandmarkIdx, x: Option<f32>, y: Option<f32>) {
        let old = self.landmarks[idx.index()];
        self.landmarks[idx.index()] = Landmark::new(x.unwrap_or(old.x()), y.unwrap_or(old.y()));
    }

    pub fn wrist_y(mut self, y: f32) -> Self {
        self.set(LandmarkIdx::Wrist, None, Some(y));
        self
    }

    pub fn thumb(mut self, tip_x: f32, ip_x: f32) -> Self {
        self.set(LandmarkIdx::ThumbTip, Some(tip_x), None);
        self.set(LandmarkIdx::ThumbIp, Some(ip_x), None);
        self
    }

    pub fn finger(mut self, finger: Finger, tip_y: f32, pip_y: f32, mcp_y: f32) -> Self {
        let [tip, pip, mcp] = finger.joints().expect("thumb has no PIP joint");
        self.set(tip, None, Some(tip_y));
        self.set(pip, None, Some(pip_y));
        self.set(mcp, None, Some(mcp_y));
        self
    }

    pub fn landmark(mut self, idx: LandmarkIdx, x: f32, y: f32) -> Self {
        self.set(idx, Some(x), Some(y));
        self
    }

    pub fn build(self) -> Hand {
        Hand::new(self.landmarks, self.handedness)
    }
}
