//! Common functionality for object detection.
//!
//! The functionality defined in this module (and submodules) is meant to be reusable across
//! different detectors.

pub mod nms;
pub mod ssd;

use crate::{
    image::{AsImageView, ImageView},
    nn::{Cnn, Outputs},
    rect::Rect,
    resolution::Resolution,
    timer::Timer,
};

use self::nms::NonMaxSuppression;

/// Trait implemented by neural networks that detect objects in an input image.
pub trait Network: Send + Sync + 'static {
    /// Returns the [`Cnn`] to use for detection.
    fn cnn(&self) -> &Cnn;

    /// Extracts all detections with confidence above `threshold` from the network's output.
    ///
    /// Keypoint and detection positions are expected to be in the coordinate system of the
    /// network's input.
    fn extract(
        &self,
        outputs: &Outputs,
        threshold: f32,
        detections: &mut Detections,
    ) -> anyhow::Result<()>;
}

/// A collection of object detections.
#[derive(Debug, Default)]
pub struct Detections {
    vec: Vec<Detection>,
}

impl Detections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }

    pub fn clear(&mut self) {
        self.vec.clear();
    }

    pub fn push(&mut self, detection: Detection) {
        self.vec.push(detection);
    }

    /// Returns an iterator yielding the stored detections.
    ///
    /// After [`Detector::detect`], detections are ordered by descending confidence.
    pub fn iter(&self) -> impl Iterator<Item = &Detection> {
        self.vec.iter()
    }
}

/// A generic object detector.
///
/// This type wraps a [`Network`] for object detection.
pub struct Detector {
    network: Box<dyn Network>,
    detections: Detections,
    t_infer: Timer,
    t_extract: Timer,
    t_nms: Timer,
    thresh: f32,
    nms: NonMaxSuppression,
}

impl Detector {
    pub const DEFAULT_THRESHOLD: f32 = 0.5;

    pub fn new<N: Network>(network: N) -> Self {
        Self {
            network: Box::new(network),
            detections: Detections::new(),
            t_infer: Timer::new("infer"),
            t_extract: Timer::new("extract"),
            t_nms: Timer::new("nms"),
            thresh: Self::DEFAULT_THRESHOLD,
            nms: NonMaxSuppression::new(),
        }
    }

    pub fn input_resolution(&self) -> Resolution {
        self.network.cnn().input_resolution()
    }

    /// Sets the minimum confidence a detection needs to be reported.
    #[inline]
    pub fn set_threshold(&mut self, thresh: f32) {
        self.thresh = thresh;
    }

    /// Returns the suppression algorithm applied to raw detections, for configuration.
    pub fn nms_mut(&mut self) -> &mut NonMaxSuppression {
        &mut self.nms
    }

    /// Runs the network on `image` and returns the detections, in `image` coordinates.
    pub fn detect<V: AsImageView>(&mut self, image: &V) -> anyhow::Result<&Detections> {
        self.detect_impl(image.as_view())
    }

    fn detect_impl(&mut self, image: ImageView<'_>) -> anyhow::Result<&Detections> {
        self.detections.clear();

        let cnn = self.network.cnn();
        let input_res = cnn.input_resolution();
        let Some(input_aspect) = input_res.aspect_ratio() else {
            anyhow::bail!("detection network has an empty input resolution ({input_res})");
        };

        // If the input image's aspect ratio doesn't match the CNN's input, create an oversized view
        // that does.
        let rect = image.rect().grow_to_fit_aspect(input_aspect);
        let view = image.view(rect);
        let outputs = self.t_infer.time(|| cnn.estimate(&view))?;

        let network = &self.network;
        let (thresh, detections) = (self.thresh, &mut self.detections);
        self.t_extract
            .time(|| network.extract(&outputs, thresh, detections))?;

        let nms = &mut self.nms;
        self.t_nms.time(|| {
            let mut raw = std::mem::take(&mut detections.vec);
            detections.vec.extend(nms.process(&mut raw));
        });

        for det in &mut detections.vec {
            det.map_from_input(input_res, rect);
        }

        Ok(&self.detections)
    }

    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        [&self.t_infer, &self.t_extract, &self.t_nms].into_iter()
    }
}

/// A detected object.
///
/// A [`Detection`] consists of a [`Rect`] enclosing the detected object, a confidence value, an
/// optional rotation angle of the object, and a possibly empty set of located keypoints.
///
/// Per convention, the confidence value lies between 0.0 and 1.0, which can be achieved by passing
/// the raw network output through [`crate::num::sigmoid`]. The confidence value is used as the
/// weight when performing non-maximum suppression with [`nms::SuppressionMode::Average`].
#[derive(Debug, Clone)]
pub struct Detection {
    confidence: f32,
    angle: f32,
    rect: Rect,
    keypoints: Vec<Keypoint>,
}

impl Detection {
    pub fn with_keypoints(confidence: f32, rect: Rect, keypoints: Vec<Keypoint>) -> Self {
        Self {
            confidence,
            angle: 0.0,
            rect,
            keypoints,
        }
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Returns the angle of the detected object, in radians, clockwise.
    ///
    /// Networks that do not compute an object angle leave this at 0.0.
    pub fn angle(&self) -> f32 {
        self.angle
    }

    /// Sets the angle of the detected object, in radians, clockwise.
    pub fn set_angle(&mut self, angle: f32) {
        self.angle = angle;
    }

    /// Returns the axis-aligned bounding rectangle containing the detected object.
    pub fn bounding_rect(&self) -> Rect {
        self.rect
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    /// Maps a detection from the network's input coordinates back to the image it was run on.
    ///
    /// `view` is the (possibly oversized) rectangle of the image that was fed to the network,
    /// stretched to `input_res`.
    fn map_from_input(&mut self, input_res: Resolution, view: Rect) {
        let scale = view.width() / input_res.width() as f32;
        self.rect = Rect::from_center(
            self.rect.x_center() * scale + view.x(),
            self.rect.y_center() * scale + view.y(),
            self.rect.width() * scale,
            self.rect.height() * scale,
        );
        for kp in &mut self.keypoints {
            kp.x = kp.x * scale + view.x();
            kp.y = kp.y * scale + view.y();
        }
    }
}

/// A 2D keypoint produced as part of a [`Detection`].
///
/// The meaning of a keypoint depends on the specific detector and on its index in the keypoint
/// list. Typically keypoints are used to crop/rotate a detected object for further processing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    x: f32,
    y: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }
}
