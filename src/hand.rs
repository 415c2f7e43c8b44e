//! Hand detection, landmark estimation, and finger classification.
//!
//! [`HandLandmarker`] combines the palm detector in [`detection`] with the landmark network in
//! [`landmark`] and turns a video frame into a list of [`Hand`]s. [`fingers::classify`] then
//! decides which fingers of a [`Hand`] are raised.

pub mod detection;
pub mod fingers;
pub mod landmark;

use std::{fmt, str::FromStr};

use anyhow::bail;
use nalgebra::{Rotation2, Vector2};

use crate::{
    detection::{
        nms::{NonMaxSuppression, SuppressionMode},
        Detection, Detector,
    },
    image::{AsImageView, ImageView},
    landmark::{Landmark, Landmarks},
    rect::Rect,
    resolution::{AspectRatio, Resolution},
    timer::Timer,
};

use self::{
    detection::PalmNetwork,
    landmark::{LandmarkResult, Landmarker},
};

/// Number of landmarks the hand landmark network estimates per hand.
pub const NUM_LANDMARKS: usize = 21;

/// Which hand a detected [`Hand`] is.
///
/// This names the person's actual hand. In a mirrored frame a right hand looks like a left hand,
/// so [`HandLandmarker`] flips the label the landmark network assigns to the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    /// Returns the label of the other hand, which is what a mirror image of this hand looks like.
    #[must_use]
    pub fn mirrored(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

impl fmt::Display for Handedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Left => "Left",
            Self::Right => "Right",
        })
    }
}

impl FromStr for Handedness {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Left" => Ok(Self::Left),
            "Right" => Ok(Self::Right),
            _ => bail!("invalid handedness label '{s}' (expected 'Left' or 'Right')"),
        }
    }
}

/// Names for the hand pose landmarks.
///
/// # Terminology
///
/// - **CMC**: [Carpometacarpal joint], the lowest joint of the thumb, located near the wrist.
/// - **MCP**: [Metacarpophalangeal joint], the lower joint forming the knuckles near the palm of
///   the hand.
/// - **IP**: Interphalangeal joint of the thumb, between its MCP and tip.
/// - **PIP**: Proximal Interphalangeal joint, the joint between the MCP and DIP.
/// - **DIP**: Distal Interphalangeal joint, the highest joint of a finger.
/// - **Tip**: This landmark is just placed on the tip of the finger, above the DIP.
///
/// [Carpometacarpal joint]: https://en.wikipedia.org/wiki/Carpometacarpal_joint
/// [Metacarpophalangeal joint]: https://en.wikipedia.org/wiki/Metacarpophalangeal_joint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LandmarkIdx {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexFingerMcp,
    IndexFingerPip,
    IndexFingerDip,
    IndexFingerTip,
    MiddleFingerMcp,
    MiddleFingerPip,
    MiddleFingerDip,
    MiddleFingerTip,
    RingFingerMcp,
    RingFingerPip,
    RingFingerDip,
    RingFingerTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

impl LandmarkIdx {
    /// Returns the position of this landmark in the network's output order.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// A single detected hand: 21 landmarks and a [`Handedness`] label.
#[derive(Debug, Clone, PartialEq)]
pub struct Hand {
    landmarks: [Landmark; NUM_LANDMARKS],
    handedness: Handedness,
    presence: f32,
}

impl Hand {
    /// Creates a hand from its landmarks, in [`LandmarkIdx`] order.
    pub fn new(landmarks: [Landmark; NUM_LANDMARKS], handedness: Handedness) -> Self {
        Self {
            landmarks,
            handedness,
            presence: 1.0,
        }
    }

    /// Creates a hand from a slice of landmarks.
    ///
    /// Returns an error if `landmarks` does not contain exactly [`NUM_LANDMARKS`] entries.
    pub fn from_slice(landmarks: &[Landmark], handedness: Handedness) -> anyhow::Result<Self> {
        match <[Landmark; NUM_LANDMARKS]>::try_from(landmarks) {
            Ok(landmarks) => Ok(Self::new(landmarks, handedness)),
            Err(_) => bail!(
                "a hand has {} landmarks, got {}",
                NUM_LANDMARKS,
                landmarks.len()
            ),
        }
    }

    /// Sets the landmark network's confidence that this really is a hand.
    #[must_use]
    pub fn with_presence(self, presence: f32) -> Self {
        Self { presence, ..self }
    }

    #[inline]
    pub fn landmark(&self, idx: LandmarkIdx) -> Landmark {
        self.landmarks[idx.index()]
    }

    #[inline]
    pub fn landmarks(&self) -> &[Landmark; NUM_LANDMARKS] {
        &self.landmarks
    }

    #[inline]
    pub fn handedness(&self) -> Handedness {
        self.handedness
    }

    /// Returns the landmark network's hand presence score (1.0 for manually constructed hands).
    #[inline]
    pub fn presence(&self) -> f32 {
        self.presence
    }
}

/// Options for [`HandLandmarker`].
#[derive(Debug, Clone, PartialEq)]
pub struct HandLandmarkerOptions {
    num_hands: usize,
    min_hand_detection_confidence: f32,
    min_hand_presence_confidence: f32,
    suppression_mode: SuppressionMode,
    suppression_iou_thresh: f32,
}

impl Default for HandLandmarkerOptions {
    fn default() -> Self {
        Self {
            num_hands: 1,
            min_hand_detection_confidence: 0.6,
            min_hand_presence_confidence: 0.6,
            suppression_mode: SuppressionMode::Average,
            suppression_iou_thresh: NonMaxSuppression::DEFAULT_IOU_THRESH,
        }
    }
}

impl HandLandmarkerOptions {
    /// Sets the maximum number of hands reported per frame (default 1).
    ///
    /// # Panics
    ///
    /// Panics if `num_hands` is 0.
    pub fn num_hands(mut self, num_hands: usize) -> Self {
        assert_ne!(num_hands, 0, "`num_hands` must be at least 1");
        self.num_hands = num_hands;
        self
    }

    /// Sets the palm detection confidence a hand needs to be considered (default 0.6).
    pub fn min_hand_detection_confidence(mut self, confidence: f32) -> Self {
        self.min_hand_detection_confidence = confidence;
        self
    }

    /// Sets the landmark network presence score a hand needs to be reported (default 0.6).
    pub fn min_hand_presence_confidence(mut self, confidence: f32) -> Self {
        self.min_hand_presence_confidence = confidence;
        self
    }

    /// Sets how overlapping palm detections are merged (default [`SuppressionMode::Average`]).
    pub fn suppression_mode(mut self, mode: SuppressionMode) -> Self {
        self.suppression_mode = mode;
        self
    }

    /// Sets the intersection-over-union above which two palm detections are considered duplicates
    /// (default [`NonMaxSuppression::DEFAULT_IOU_THRESH`]).
    pub fn suppression_iou_thresh(mut self, iou_thresh: f32) -> Self {
        self.suppression_iou_thresh = iou_thresh;
        self
    }

    pub fn get_num_hands(&self) -> usize {
        self.num_hands
    }

    pub fn get_min_hand_detection_confidence(&self) -> f32 {
        self.min_hand_detection_confidence
    }

    pub fn get_min_hand_presence_confidence(&self) -> f32 {
        self.min_hand_presence_confidence
    }

    pub fn get_suppression_mode(&self) -> SuppressionMode {
        self.suppression_mode
    }

    pub fn get_suppression_iou_thresh(&self) -> f32 {
        self.suppression_iou_thresh
    }
}

/// Palm box scale that makes the crop contain the whole hand.
const ROI_SCALE: f32 = 2.6;
/// Shift of the crop center towards the fingers, relative to the palm box size.
const ROI_SHIFT: f32 = 0.5;

/// Finds hands in images and estimates their landmarks.
///
/// Frames are expected to be mirrored, the way a selfie camera preview shows them.
///
/// Every call to [`HandLandmarker::detect`] is independent of previous ones: hands are not tracked
/// across frames.
pub struct HandLandmarker {
    detector: Detector,
    landmarker: Landmarker,
    options: HandLandmarkerOptions,
}

impl HandLandmarker {
    pub fn new(
        palm_network: PalmNetwork,
        landmarker: Landmarker,
        options: HandLandmarkerOptions,
    ) -> Self {
        let mut detector = Detector::new(palm_network);
        detector.set_threshold(options.min_hand_detection_confidence);
        let nms = detector.nms_mut();
        nms.set_mode(options.suppression_mode);
        nms.set_iou_thresh(options.suppression_iou_thresh);
        Self {
            detector,
            landmarker,
            options,
        }
    }

    pub fn options(&self) -> &HandLandmarkerOptions {
        &self.options
    }

    /// Detects up to `num_hands` hands in `image`.
    ///
    /// Landmarks of the returned hands are normalized to `image`'s resolution.
    pub fn detect<V: AsImageView>(&mut self, image: &V) -> anyhow::Result<Vec<Hand>> {
        self.detect_impl(image.as_view())
    }

    fn detect_impl(&mut self, image: ImageView<'_>) -> anyhow::Result<Vec<Hand>> {
        let full_res = image.resolution();
        let rois = self
            .detector
            .detect(&image)?
            .iter()
            .take(self.options.num_hands)
            .map(hand_roi)
            .collect::<Vec<_>>();

        let mut hands = Vec::with_capacity(rois.len());
        for roi in rois {
            let Some(crop) = roi.round_to_pixels() else {
                log::trace!("skipping degenerate hand region {:?}", roi);
                continue;
            };
            let result = self.landmarker.compute(&image.view(crop))?;
            if result.presence() < self.options.min_hand_presence_confidence {
                log::trace!(
                    "dropping hand at {:?} (presence {:.2})",
                    crop,
                    result.presence()
                );
                continue;
            }

            hands.push(hand_from_crop(&result, crop, full_res)?);
        }

        Ok(hands)
    }

    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        self.detector.timers().chain(self.landmarker.timers())
    }
}

/// Computes the square region of interest the landmark network is run on.
///
/// The palm box is moved towards the fingers (along the palm's rotation) and enlarged, so that the
/// crop covers the extended fingers too.
fn hand_roi(detection: &Detection) -> Rect {
    let rect = detection.bounding_rect();
    let up = -Vector2::<f32>::y();
    let towards_fingers = Rotation2::new(detection.angle()) * up;
    let shift = towards_fingers * rect.height().max(rect.width()) * ROI_SHIFT;

    rect.move_by(shift.x, shift.y)
        .grow_to_fit_aspect(AspectRatio::SQUARE)
        .scale(ROI_SCALE)
}

/// Turns landmarks computed on `crop` into a [`Hand`] in a frame of size `full_res`.
///
/// `crop` must be the pixel-aligned rectangle the landmark network was run on.
fn hand_from_crop(
    result: &LandmarkResult,
    crop: Rect,
    full_res: Resolution,
) -> anyhow::Result<Hand> {
    let landmarks = Landmarks::from_pixels(
        result
            .positions()
            .iter()
            .map(|&(x, y)| (crop.x() + x, crop.y() + y)),
        full_res,
    );
    let handedness = result.handedness().mirrored();
    Ok(Hand::from_slice(landmarks.positions(), handedness)?.with_presence(result.presence()))
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use approx::assert_relative_eq;

    use super::*;
    use crate::detection::Keypoint as RawKeypoint;

    #[test]
    fn handedness_labels() {
        assert_eq!(Handedness::Left.to_string(), "Left");
        assert_eq!("Right".parse::<Handedness>().unwrap(), Handedness::Right);
        assert!("right".parse::<Handedness>().is_err());
        assert_eq!(Handedness::Left.mirrored(), Handedness::Right);
        assert_eq!(Handedness::Right.mirrored().mirrored(), Handedness::Right);
    }

    #[test]
    fn landmark_indices() {
        assert_eq!(LandmarkIdx::Wrist.index(), 0);
        assert_eq!(LandmarkIdx::ThumbIp.index(), 3);
        assert_eq!(LandmarkIdx::ThumbTip.index(), 4);
        assert_eq!(LandmarkIdx::IndexFingerMcp.index(), 5);
        assert_eq!(LandmarkIdx::IndexFingerPip.index(), 6);
        assert_eq!(LandmarkIdx::IndexFingerTip.index(), 8);
        assert_eq!(LandmarkIdx::MiddleFingerTip.index(), 12);
        assert_eq!(LandmarkIdx::RingFingerMcp.index(), 13);
        assert_eq!(LandmarkIdx::PinkyMcp.index(), 17);
        assert_eq!(LandmarkIdx::PinkyTip.index(), 20);
    }

    #[test]
    fn hand_from_slice() {
        let lms = vec![Landmark::new(0.5, 0.5); NUM_LANDMARKS];
        let hand = Hand::from_slice(&lms, Handedness::Left).unwrap();
        assert_eq!(hand.handedness(), Handedness::Left);
        assert_eq!(hand.presence(), 1.0);
        assert_eq!(hand.landmark(LandmarkIdx::PinkyTip), Landmark::new(0.5, 0.5));

        assert!(Hand::from_slice(&lms[..20], Handedness::Left).is_err());
        assert!(Hand::from_slice(&[], Handedness::Right).is_err());
        let too_many = vec![Landmark::default(); 22];
        assert!(Hand::from_slice(&too_many, Handedness::Right).is_err());
    }

    #[test]
    fn options_defaults() {
        let opts = HandLandmarkerOptions::default();
        assert_eq!(opts.get_num_hands(), 1);
        assert_eq!(opts.get_min_hand_detection_confidence(), 0.6);
        assert_eq!(opts.get_min_hand_presence_confidence(), 0.6);

        let opts = opts.num_hands(2).min_hand_presence_confidence(0.8);
        assert_eq!(opts.get_num_hands(), 2);
        assert_eq!(opts.get_min_hand_presence_confidence(), 0.8);
    }

    #[test]
    fn options_configure_suppression() {
        let opts = HandLandmarkerOptions::default();
        assert_eq!(opts.get_suppression_mode(), SuppressionMode::Average);
        assert_eq!(opts.get_suppression_iou_thresh(), 0.3);

        let opts = opts
            .suppression_mode(SuppressionMode::Remove)
            .suppression_iou_thresh(0.5);
        assert_eq!(opts.get_suppression_mode(), SuppressionMode::Remove);
        assert_eq!(opts.get_suppression_iou_thresh(), 0.5);
    }

    fn palm(rect: Rect, angle: f32) -> Detection {
        let mut det = Detection::with_keypoints(0.9, rect, vec![RawKeypoint::new(0.0, 0.0); 7]);
        det.set_angle(angle);
        det
    }

    #[test]
    fn roi_moves_towards_fingers() {
        // Upright palm.
        let rect = Rect::from_center(100.0, 100.0, 40.0, 20.0);
        let roi = hand_roi(&palm(rect, 0.0));
        assert_relative_eq!(roi.x_center(), 100.0);
        assert_relative_eq!(roi.y_center(), 80.0);
        assert_relative_eq!(roi.width(), 104.0);
        assert_relative_eq!(roi.height(), 104.0);

        // Fingers pointing to the right.
        let roi = hand_roi(&palm(rect, FRAC_PI_2));
        assert_relative_eq!(roi.x_center(), 120.0, epsilon = 1e-4);
        assert_relative_eq!(roi.y_center(), 100.0, epsilon = 1e-4);
        assert_relative_eq!(roi.width(), 104.0);
    }

    #[test]
    fn degenerate_palm_has_no_crop() {
        let point = Rect::from_center(100.0, 100.0, 0.0, 0.0);
        assert_eq!(hand_roi(&palm(point, 0.0)).round_to_pixels(), None);

        let nan = Rect::from_center(100.0, 100.0, f32::NAN, 20.0);
        assert_eq!(hand_roi(&palm(nan, 0.0)).round_to_pixels(), None);

        let crop = hand_roi(&palm(Rect::from_center(100.3, 99.6, 40.0, 20.0), 0.0))
            .round_to_pixels()
            .unwrap();
        assert_eq!(crop, Rect::from_top_left(48.0, 28.0, 104.0, 104.0));
    }

    #[test]
    fn crop_landmarks_are_mapped_to_frame() {
        let mut positions = [(100.0, 100.0); NUM_LANDMARKS];
        positions[LandmarkIdx::Wrist.index()] = (0.0, 200.0);
        let result = LandmarkResult::new(positions, 0.8, 0.1);
        let crop = Rect::from_top_left(100.0, 50.0, 200.0, 200.0);

        let hand = hand_from_crop(&result, crop, Resolution::new(640, 480)).unwrap();
        assert_relative_eq!(hand.landmark(LandmarkIdx::IndexFingerTip).x(), 0.3125);
        assert_relative_eq!(hand.landmark(LandmarkIdx::IndexFingerTip).y(), 0.3125);
        assert_relative_eq!(hand.landmark(LandmarkIdx::Wrist).x(), 100.0 / 640.0);
        assert_relative_eq!(hand.landmark(LandmarkIdx::Wrist).y(), 250.0 / 480.0);
        assert_relative_eq!(hand.presence(), 0.8);
    }

    #[test]
    fn mirrored_frame_names_the_actual_hand() {
        // The user's right hand shows up as a left hand in a mirrored frame, which the landmark
        // network reports with a low handedness score.
        let mut positions = [(100.0, 100.0); NUM_LANDMARKS];
        positions[LandmarkIdx::ThumbTip.index()] = (130.0, 95.0);
        let crop = Rect::from_top_left(0.0, 0.0, 200.0, 200.0);
        let res = Resolution::new(640, 480);

        let right = hand_from_crop(&LandmarkResult::new(positions, 1.0, 0.1), crop, res).unwrap();
        assert_eq!(right.handedness(), Handedness::Right);
        assert!(fingers::thumb_status(&right).is_up());

        let left = hand_from_crop(&LandmarkResult::new(positions, 1.0, 0.9), crop, res).unwrap();
        assert_eq!(left.handedness(), Handedness::Left);
        assert!(!fingers::thumb_status(&left).is_up());
    }
}
