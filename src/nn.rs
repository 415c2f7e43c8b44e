//! Neural Network inference.
//!
//! Networks are ONNX files executed on the CPU with [`tract_onnx`]. Output tensors are exposed as
//! [`ndarray`] views.

use std::{
    fmt,
    ops::RangeInclusive,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context};
use ndarray::{Array4, ArrayViewD};
use tract_onnx::prelude::{
    Framework, Graph, InferenceModelExt, SimplePlan, TValue, TVec, Tensor, TypedFact, TypedOp,
};

use crate::{
    image::{AsImageView, Color, ImageView},
    resolution::{AspectRatio, Resolution},
};

type Model = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// A convolutional neural network (CNN) that operates on image data.
///
/// Like the underlying [`NeuralNetwork`], this is a cheaply [`Clone`]able handle.
#[derive(Clone)]
pub struct Cnn {
    nn: NeuralNetwork,
    input_res: Resolution,
    color_mapper: ColorMapper,
}

impl Cnn {
    /// Creates a CNN wrapper from a [`NeuralNetwork`].
    ///
    /// The network must have exactly one input of shape `[1, 3, H, W]` (RGB channels first).
    pub fn new(nn: NeuralNetwork, color_mapper: ColorMapper) -> anyhow::Result<Self> {
        let input_res = Self::get_input_res(&nn)?;
        Ok(Self {
            nn,
            input_res,
            color_mapper,
        })
    }

    fn get_input_res(nn: &NeuralNetwork) -> anyhow::Result<Resolution> {
        if nn.num_inputs() != 1 {
            bail!(
                "CNN network has to take exactly 1 input, this one takes {}",
                nn.num_inputs(),
            );
        }

        let tensor_shape = nn.input_shape(0)?;
        let [1, 3, h, w] = tensor_shape[..] else {
            bail!("invalid CNN input shape {tensor_shape:?} (expected [1, 3, H, W])");
        };

        let (w, h): (u32, u32) = (w.try_into()?, h.try_into()?);
        Ok(Resolution::new(w, h))
    }

    /// Returns the expected input image size.
    #[inline]
    pub fn input_resolution(&self) -> Resolution {
        self.input_res
    }

    /// Runs the network on an input image, returning the estimated outputs.
    ///
    /// The image is sampled to create the input tensor. If its aspect ratio does not match the
    /// network's input aspect ratio, the image will be stretched, so callers that care about
    /// proportions letterbox it first with [`aspect_aware_resize`].
    ///
    /// [`aspect_aware_resize`]: crate::image::Image::aspect_aware_resize
    pub fn estimate<V: AsImageView>(&self, image: &V) -> anyhow::Result<Outputs> {
        self.estimate_impl(image.as_view())
    }

    fn estimate_impl(&self, view: ImageView<'_>) -> anyhow::Result<Outputs> {
        let (h, w) = (
            self.input_res.height() as usize,
            self.input_res.width() as usize,
        );
        let sample = |x: usize, y: usize| {
            let sx = (x as f32 / w as f32 * view.width() as f32) as u32;
            let sy = (y as f32 / h as f32 * view.height() as f32) as u32;
            self.color_mapper.map(view.get(sx, sy))
        };

        let tensor: Tensor =
            Array4::from_shape_fn((1, 3, h, w), |(_, c, y, x)| sample(x, y)[c]).into();

        self.nn.estimate(tensor)
    }
}

/// Maps 8-bit sRGB colors onto the value range a network expects.
#[derive(Debug, Clone)]
pub struct ColorMapper {
    start: f32,
    scale: f32,
}

impl ColorMapper {
    /// Creates a color mapper that uniformly maps sRGB values `0..=255` to `target_range`.
    ///
    /// This operates on *non-linear* sRGB values, which is what the hand networks are trained on.
    pub fn linear(target_range: RangeInclusive<f32>) -> Self {
        let start = *target_range.start();
        let end = *target_range.end();
        assert!(end > start, "empty color range {:?}", target_range);

        Self {
            start,
            scale: (end - start) / 255.0,
        }
    }

    fn map(&self, color: Color) -> [f32; 3] {
        [color.r(), color.g(), color.b()].map(|col| col as f32 * self.scale + self.start)
    }
}

/// Neural network loader.
///
/// Created by [`NeuralNetwork::from_path`].
pub struct Loader {
    path: PathBuf,
}

impl Loader {
    /// Loads and optimizes the network.
    ///
    /// Returns an error if the file cannot be read, if the network data is malformed or
    /// incomplete, or if the network uses unimplemented operations.
    pub fn load(self) -> anyhow::Result<NeuralNetwork> {
        let path = self.path.display();
        let data = std::fs::read(&self.path).with_context(|| format!("reading {path}"))?;

        let graph = tract_onnx::onnx()
            .model_for_read(&mut &*data)
            .and_then(|model| model.into_optimized())
            .with_context(|| format!("failed to load ONNX network from {path}"))?;
        let outputs = graph.output_outlets()?.to_vec();
        let model = SimplePlan::new_for_outputs(graph, &outputs)?;
        log::debug!(
            "loaded network from {path} ({} inputs, {} outputs)",
            model.model().inputs.len(),
            outputs.len(),
        );

        Ok(NeuralNetwork(Arc::new(model)))
    }
}

/// A neural network that can be used for inference.
///
/// This is a cheaply [`Clone`]able handle to the underlying network structures.
#[derive(Clone)]
pub struct NeuralNetwork(Arc<Model>);

impl NeuralNetwork {
    /// Prepares loading a pre-trained model from an ONNX file path.
    ///
    /// The path must have a `.onnx` extension. The file is read by [`Loader::load`].
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Loader> {
        let path = path.as_ref();
        match path.extension() {
            Some(ext) if ext == "onnx" => {}
            _ => bail!(
                "neural network file '{}' must have `.onnx` extension",
                path.display()
            ),
        }

        Ok(Loader {
            path: path.to_path_buf(),
        })
    }

    /// Returns the number of input nodes of the network.
    pub fn num_inputs(&self) -> usize {
        self.0.model().inputs.len()
    }

    /// Returns the number of output nodes of the network.
    pub fn num_outputs(&self) -> usize {
        self.0.model().outputs.len()
    }

    /// Returns the concrete tensor shape of input `id`.
    pub fn input_shape(&self, id: usize) -> anyhow::Result<Vec<usize>> {
        let fact = self.0.model().input_fact(id)?;
        match fact.shape.as_concrete() {
            Some(shape) => Ok(shape.to_vec()),
            None => bail!("network input {id} has a symbolic shape: {:?}", fact.shape),
        }
    }

    /// Runs the network on a single input tensor, returning the estimated [`Outputs`].
    #[doc(alias = "infer")]
    pub fn estimate(&self, input: Tensor) -> anyhow::Result<Outputs> {
        let inputs: TVec<TValue> = std::iter::once(TValue::from_const(Arc::new(input))).collect();
        let outputs = self.0.run(inputs)?;
        Ok(Outputs { inner: outputs })
    }
}

impl fmt::Debug for NeuralNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NeuralNetwork({} inputs, {} outputs)",
            self.num_inputs(),
            self.num_outputs()
        )
    }
}

/// The result of a neural network inference pass.
///
/// This is a list of tensors corresponding to the network's output nodes.
#[derive(Debug)]
pub struct Outputs {
    inner: TVec<TValue>,
}

impl Outputs {
    /// Returns the number of tensors in this inference output.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns output tensor `index` as an `f32` array view.
    pub fn get(&self, index: usize) -> anyhow::Result<ArrayViewD<'_, f32>> {
        let Some(value) = self.inner.get(index) else {
            bail!("network has no output {index} (only {})", self.len());
        };
        Ok(value.to_array_view::<f32>()?)
    }
}

/// Adjusts normalized `f32` coordinates from a 1:1 aspect ratio back to `orig_aspect`.
///
/// This assumes that `orig_aspect` was originally fitted to a 1:1 ratio by adding black bars
/// ([`Image::aspect_aware_resize`]).
///
/// [`Image::aspect_aware_resize`]: crate::image::Image::aspect_aware_resize
pub(crate) fn unadjust_aspect_ratio(
    mut x: f32,
    mut y: f32,
    orig_aspect: AspectRatio,
) -> (f32, f32) {
    let ratio = orig_aspect.as_f32();
    if orig_aspect.is_wider_than(AspectRatio::SQUARE) {
        // going from 1:1 to something wider, undo letterboxing
        y = (y - 0.5) * ratio + 0.5;
    } else {
        // going from 1:1 to something taller, undo pillarboxing
        x = (x - 0.5) / ratio + 0.5;
    }

    (x, y)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn color_mapper_linear() {
        let unit = ColorMapper::linear(0.0..=1.0);
        assert_eq!(unit.map(Color::BLACK), [0.0, 0.0, 0.0]);
        assert_eq!(unit.map(Color::RED), [1.0, 0.0, 0.0]);

        let signed = ColorMapper::linear(-1.0..=1.0);
        assert_eq!(signed.map(Color::WHITE), [1.0, 1.0, 1.0]);
        assert_eq!(signed.map(Color::BLACK), [-1.0, -1.0, -1.0]);
    }

    #[test]
    fn unadjust_letterbox() {
        let wide = AspectRatio::new(2, 1).unwrap();
        // Top edge of the letterboxed content is at y=0.25 in the square input.
        let (x, y) = unadjust_aspect_ratio(0.5, 0.25, wide);
        assert_relative_eq!(x, 0.5);
        assert_relative_eq!(y, 0.0);

        let tall = AspectRatio::new(1, 2).unwrap();
        let (x, y) = unadjust_aspect_ratio(0.75, 0.5, tall);
        assert_relative_eq!(x, 1.0);
        assert_relative_eq!(y, 0.5);
    }

    #[test]
    fn loader_rejects_bad_input() {
        assert!(NeuralNetwork::from_path("palm.tflite").is_err());

        let missing = std::env::temp_dir().join("fingerstate-missing-network.onnx");
        assert!(NeuralNetwork::from_path(&missing).unwrap().load().is_err());

        let garbage = std::env::temp_dir().join(format!(
            "fingerstate-garbage-{}.onnx",
            fastrand::u64(..)
        ));
        std::fs::write(&garbage, b"garbage").unwrap();
        let result = NeuralNetwork::from_path(&garbage).unwrap().load();
        std::fs::remove_file(&garbage).unwrap();
        assert!(result.is_err());
    }
}
