//! Anchor/Prior generation for Single Shot MultiBox Detectors (SSDs).
//!
//! Only the fixed-size anchors used by the palm detection network are supported: every anchor of a
//! feature map cell sits at the cell center, and the network predicts absolute box sizes.

use std::ops::Index;

use crate::resolution::Resolution;

/// An anchor of an SSD network.
#[derive(Debug, Clone, Copy)]
pub struct Anchor {
    // values range from 0 to 1
    x_center: f32,
    y_center: f32,
}

impl Anchor {
    pub fn x_center(&self) -> f32 {
        self.x_center
    }

    pub fn y_center(&self) -> f32 {
        self.y_center
    }
}

/// Describes an output layer of an SSD network.
pub struct LayerInfo {
    /// Number of anchors per feature map cell/pixel. Must be non-zero.
    boxes_per_cell: u32,
    /// Feature map resolution of this layer.
    resolution: Resolution,
}

impl LayerInfo {
    /// Creates a new SSD layer description.
    ///
    /// # Parameters
    ///
    /// - `boxes_per_cell`: the number of boxes associated with each cell in this feature map.
    /// - `width`/`height`: size of this layer's feature map, in output cells.
    pub fn new(boxes_per_cell: u32, width: u32, height: u32) -> Self {
        assert_ne!(boxes_per_cell, 0);
        Self {
            boxes_per_cell,
            resolution: Resolution::new(width, height),
        }
    }
}

pub struct AnchorParams<'a> {
    /// List of output layers.
    pub layers: &'a [LayerInfo],
}

/// The list of anchors of an SSD network, in network output order.
pub struct Anchors {
    anchors: Vec<Anchor>,
}

impl Anchors {
    pub fn calculate(params: &AnchorParams<'_>) -> Self {
        let mut anchors = Vec::new();

        for layer in params.layers {
            let height = layer.resolution.height();
            let width = layer.resolution.width();

            for y in 0..height {
                for x in 0..width {
                    let x_center = (x as f32 + 0.5) / width as f32;
                    let y_center = (y as f32 + 0.5) / height as f32;

                    // All boxes of a cell share its center; the network regresses their sizes.
                    for _ in 0..layer.boxes_per_cell {
                        anchors.push(Anchor { x_center, y_center });
                    }
                }
            }
        }

        Self { anchors }
    }

    /// Returns the total number of SSD anchors/priors.
    pub fn anchor_count(&self) -> usize {
        self.anchors.len()
    }
}

impl Index<usize> for Anchors {
    type Output = Anchor;

    fn index(&self, index: usize) -> &Anchor {
        &self.anchors[index]
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn palm_anchor_layout() {
        let anchors = Anchors::calculate(&AnchorParams {
            layers: &[LayerInfo::new(2, 24, 24), LayerInfo::new(6, 12, 12)],
        });
        assert_eq!(anchors.anchor_count(), 24 * 24 * 2 + 12 * 12 * 6);
        assert_eq!(anchors.anchor_count(), 2016);

        assert_relative_eq!(anchors[0].x_center(), 0.5 / 24.0);
        assert_relative_eq!(anchors[1].x_center(), 0.5 / 24.0);
        assert_relative_eq!(anchors[2].x_center(), 1.5 / 24.0);

        // First anchor of the coarse layer.
        let first_coarse = &anchors[24 * 24 * 2];
        assert_relative_eq!(first_coarse.x_center(), 0.5 / 12.0);
        assert_relative_eq!(first_coarse.y_center(), 0.5 / 12.0);

        let last = &anchors[2015];
        assert_relative_eq!(last.x_center(), 11.5 / 12.0);
        assert_relative_eq!(last.y_center(), 11.5 / 12.0);
    }
}
