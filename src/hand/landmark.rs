//! Hand landmark prediction.

use std::path::Path;

use anyhow::bail;

use crate::{
    hand::{Handedness, NUM_LANDMARKS},
    image::{AsImageView, ImageView},
    nn::{unadjust_aspect_ratio, Cnn, ColorMapper, NeuralNetwork},
    resolution::Resolution,
    timer::Timer,
};

/// Runs the hand landmark network on hand crops.
pub struct Landmarker {
    cnn: Cnn,
    t_resize: Timer,
    t_infer: Timer,
}

impl Landmarker {
    /// Loads the hand landmark network from an ONNX file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let nn = NeuralNetwork::from_path(path)?.load()?;
        let cnn = Cnn::new(nn, ColorMapper::linear(0.0..=1.0))?;
        Ok(Self {
            cnn,
            t_resize: Timer::new("resize"),
            t_infer: Timer::new("infer"),
        })
    }

    /// Returns the expected input resolution of the internal neural network.
    pub fn input_resolution(&self) -> Resolution {
        self.cnn.input_resolution()
    }

    /// Computes hand landmarks in `image`.
    ///
    /// `image` should be a crop that contains a single hand, roughly centered.
    pub fn compute<V: AsImageView>(&mut self, image: &V) -> anyhow::Result<LandmarkResult> {
        self.compute_impl(image.as_view())
    }

    fn compute_impl(&mut self, image: ImageView<'_>) -> anyhow::Result<LandmarkResult> {
        let input_res = self.input_resolution();
        let full_res = image.resolution();
        let Some(aspect_ratio) = full_res.aspect_ratio() else {
            bail!("cannot compute landmarks in an empty image ({full_res})");
        };

        let resized;
        let mut image = image;
        if image.resolution() != input_res {
            resized = self.t_resize.time(|| image.aspect_aware_resize(input_res));
            image = resized.as_view();
        }
        let outputs = self.t_infer.time(|| self.cnn.estimate(&image))?;
        log::trace!("cnn outputs: {:?}", outputs);

        let screen_landmarks = outputs.get(0)?;
        let presence = outputs.get(1)?;
        let handedness = outputs.get(2)?;

        if screen_landmarks.shape() != [1, NUM_LANDMARKS * 3] {
            bail!(
                "unexpected landmark tensor shape {:?}",
                screen_landmarks.shape()
            );
        }
        if presence.shape() != [1, 1] || handedness.shape() != [1, 1] {
            bail!(
                "unexpected presence/handedness tensor shapes {:?}/{:?}",
                presence.shape(),
                handedness.shape(),
            );
        }

        let mut positions = [(0.0, 0.0); NUM_LANDMARKS];
        for (i, pos) in positions.iter_mut().enumerate() {
            // Each landmark is (x, y, z); depth is not needed for classification.
            let x = screen_landmarks[[0, i * 3]];
            let y = screen_landmarks[[0, i * 3 + 1]];
            let (x, y) = unadjust_aspect_ratio(
                x / input_res.width() as f32,
                y / input_res.height() as f32,
                aspect_ratio,
            );
            *pos = (x * full_res.width() as f32, y * full_res.height() as f32);
        }

        Ok(LandmarkResult::new(
            positions,
            presence[[0, 0]],
            handedness[[0, 0]],
        ))
    }

    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        [&self.t_resize, &self.t_infer].into_iter()
    }
}

/// Landmark results returned by [`Landmarker::compute`].
#[derive(Debug, Clone)]
pub struct LandmarkResult {
    positions: [(f32, f32); NUM_LANDMARKS],
    presence: f32,
    raw_handedness: f32,
}

impl LandmarkResult {
    pub(crate) fn new(
        positions: [(f32, f32); NUM_LANDMARKS],
        presence: f32,
        raw_handedness: f32,
    ) -> Self {
        Self {
            positions,
            presence,
            raw_handedness,
        }
    }

    /// Returns the landmark positions in the input image's pixel coordinates, in
    /// [`LandmarkIdx`](crate::hand::LandmarkIdx) order.
    pub fn positions(&self) -> &[(f32, f32)] {
        &self.positions
    }

    /// Returns the presence flag, indicating the confidence of whether a hand was in the input
    /// image.
    ///
    /// The value is between 0.0 and 1.0, with higher values indicating higher confidence that a
    /// hand was present.
    pub fn presence(&self) -> f32 {
        self.presence
    }

    /// Returns the estimated handedness of the hand in the image.
    ///
    /// This assumes the image is passed in as-is: the label names the hand it looks like in the
    /// image. It should only be relied on when `presence` is over some threshold.
    pub fn handedness(&self) -> Handedness {
        if self.raw_handedness > 0.5 {
            Handedness::Right
        } else {
            Handedness::Left
        }
    }
}
