//! Palm detection.
//!
//! This uses the "full" palm detection network of MediaPipe's [Hands] module. It finds palms (not
//! whole hands, since palms are rigid and roughly square) and locates 7 keypoints on each of them,
//! which are used to compute the crop that is passed to the landmark network.
//!
//! [Hands]: https://google.github.io/mediapipe/solutions/hands

use std::path::Path;

use anyhow::bail;
use nalgebra::{Rotation2, Vector2};

use crate::{
    detection::{
        self,
        ssd::{Anchor, AnchorParams, Anchors, LayerInfo},
        Detection, Detections, Network,
    },
    nn::{Cnn, ColorMapper, NeuralNetwork, Outputs},
    num::sigmoid,
    rect::Rect,
    resolution::Resolution,
};

/// Keypoints located by the palm detection network, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keypoint {
    Wrist = 0,
    IndexFingerMcp = 1,
    MiddleFingerMcp = 2,
    RingFingerMcp = 3,
    PinkyMcp = 4,
    ThumbCmc = 5,
    ThumbMcp = 6,
}

const NUM_KEYPOINTS: usize = 7;
/// 4 box parameters followed by 2 coordinates per keypoint.
const NUM_BOX_PARAMS: usize = 4 + NUM_KEYPOINTS * 2;

/// The palm detection network.
pub struct PalmNetwork {
    cnn: Cnn,
    anchors: Anchors,
}

impl PalmNetwork {
    /// Loads the palm detection network from an ONNX file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let nn = NeuralNetwork::from_path(path)?.load()?;
        let cnn = Cnn::new(nn, ColorMapper::linear(0.0..=1.0))?;
        Ok(Self {
            cnn,
            anchors: palm_anchors(),
        })
    }
}

fn palm_anchors() -> Anchors {
    Anchors::calculate(&AnchorParams {
        layers: &[LayerInfo::new(2, 24, 24), LayerInfo::new(6, 12, 12)],
    })
}

impl Network for PalmNetwork {
    fn cnn(&self) -> &Cnn {
        &self.cnn
    }

    fn extract(
        &self,
        outputs: &Outputs,
        threshold: f32,
        detections: &mut Detections,
    ) -> anyhow::Result<()> {
        let num_anchors = self.anchors.anchor_count();
        let boxes = outputs.get(0)?;
        let confidences = outputs.get(1)?;

        if boxes.shape() != [1, num_anchors, NUM_BOX_PARAMS] {
            bail!("unexpected palm box tensor shape {:?}", boxes.shape());
        }
        if confidences.shape() != [1, num_anchors, 1] {
            bail!(
                "unexpected palm confidence tensor shape {:?}",
                confidences.shape()
            );
        }

        let input_res = self.cnn.input_resolution();
        for index in 0..num_anchors {
            let conf = sigmoid(confidences[[0, index, 0]]);
            if conf < threshold {
                continue;
            }

            let mut box_params = [0.0; NUM_BOX_PARAMS];
            for (i, param) in box_params.iter_mut().enumerate() {
                *param = boxes[[0, index, i]];
            }
            detections.push(extract_detection(
                &self.anchors[index],
                input_res,
                &box_params,
                conf,
            ));
        }

        Ok(())
    }
}

/// Decodes one anchor's box parameters into a [`Detection`] in network input coordinates.
fn extract_detection(
    anchor: &Anchor,
    input_res: Resolution,
    box_params: &[f32; NUM_BOX_PARAMS],
    confidence: f32,
) -> Detection {
    let input_w = input_res.width() as f32;
    let input_h = input_res.height() as f32;

    let xc = box_params[0] + anchor.x_center() * input_w;
    let yc = box_params[1] + anchor.y_center() * input_h;
    let w = box_params[2];
    let h = box_params[3];
    let keypoints = box_params[4..]
        .chunks_exact(2)
        .map(|xy| {
            detection::Keypoint::new(
                xy[0] + anchor.x_center() * input_w,
                xy[1] + anchor.y_center() * input_h,
            )
        })
        .collect::<Vec<_>>();

    let mut det = Detection::with_keypoints(confidence, Rect::from_center(xc, yc, w, h), keypoints);
    det.set_angle(palm_angle(&det));
    det
}

/// Clockwise rotation of the palm compared to an upright hand (fingers pointing up).
fn palm_angle(det: &Detection) -> f32 {
    let kp = |which: Keypoint| {
        let kp = det.keypoints()[which as usize];
        Vector2::new(kp.x(), kp.y())
    };
    let rel = kp(Keypoint::Wrist) - kp(Keypoint::MiddleFingerMcp);
    Rotation2::rotation_between(&Vector2::y(), &rel).angle()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn decodes_box_relative_to_anchor() {
        let anchors = palm_anchors();
        assert_eq!(anchors.anchor_count(), 2016);

        let mut params = [0.0; NUM_BOX_PARAMS];
        params[..4].copy_from_slice(&[4.0, -2.0, 30.0, 20.0]);
        // Wrist below the middle finger knuckle.
        params[4..6].copy_from_slice(&[0.0, 10.0]);
        params[8..10].copy_from_slice(&[0.0, -10.0]);

        let anchor = anchors[0];
        let det = extract_detection(&anchor, Resolution::new(192, 192), &params, 0.9);
        let (ax, ay) = (anchor.x_center() * 192.0, anchor.y_center() * 192.0);
        let rect = det.bounding_rect();
        assert_relative_eq!(rect.x_center(), ax + 4.0);
        assert_relative_eq!(rect.y_center(), ay - 2.0);
        assert_relative_eq!(rect.width(), 30.0);
        assert_relative_eq!(rect.height(), 20.0);
        assert_eq!(det.keypoints().len(), NUM_KEYPOINTS);
        assert_relative_eq!(det.keypoints()[Keypoint::Wrist as usize].y(), ay + 10.0);
        assert_relative_eq!(det.confidence(), 0.9);
        assert_relative_eq!(det.angle(), 0.0);
    }

    #[test]
    fn sideways_palm_is_rotated() {
        let mut params = [0.0; NUM_BOX_PARAMS];
        // Fingers pointing to the right.
        params[4..6].copy_from_slice(&[-10.0, 0.0]);
        params[8..10].copy_from_slice(&[10.0, 0.0]);

        let anchors = palm_anchors();
        let det = extract_detection(&anchors[0], Resolution::new(192, 192), &params, 1.0);
        assert_relative_eq!(det.angle().abs(), std::f32::consts::FRAC_PI_2, epsilon = 1e-5);
    }
}
