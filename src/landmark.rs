//! Normalized 2D landmarks.
//!
//! Landmark networks produce positions in the pixel coordinates of their input. Everything that
//! reaches the finger classifier is converted into frame-relative coordinates first, so that the
//! classification rules do not depend on the camera resolution.

use std::ops::Index;

use crate::resolution::Resolution;

/// A 2D point relative to the frame it was found in.
///
/// `x` grows to the right and `y` grows *downwards*. Both are in `[0.0, 1.0]` for points inside the
/// frame, but are not clamped: networks may place landmarks of partially visible hands slightly
/// outside of it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Landmark {
    x: f32,
    y: f32,
}

impl Landmark {
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Converts a pixel position in a frame of size `res` to a normalized [`Landmark`].
    pub fn from_pixel(x: f32, y: f32, res: Resolution) -> Self {
        Self {
            x: x / res.width() as f32,
            y: y / res.height() as f32,
        }
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.y
    }

    /// Returns the pixel this landmark falls on in a frame of size `res`.
    ///
    /// Coordinates are truncated towards zero.
    pub fn to_pixel(&self, res: Resolution) -> (i32, i32) {
        (
            (self.x * res.width() as f32) as i32,
            (self.y * res.height() as f32) as i32,
        )
    }
}

/// An owned list of [`Landmark`]s.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Landmarks {
    positions: Vec<Landmark>,
}

impl Landmarks {
    /// Normalizes pixel coordinates in a frame of size `res`.
    pub fn from_pixels<I: IntoIterator<Item = (f32, f32)>>(points: I, res: Resolution) -> Self {
        Self {
            positions: points
                .into_iter()
                .map(|(x, y)| Landmark::from_pixel(x, y, res))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[Landmark] {
        &self.positions
    }

    pub fn iter(&self) -> impl Iterator<Item = Landmark> + '_ {
        self.positions.iter().copied()
    }
}

impl FromIterator<Landmark> for Landmarks {
    fn from_iter<T: IntoIterator<Item = Landmark>>(iter: T) -> Self {
        Self {
            positions: iter.into_iter().collect(),
        }
    }
}

impl Index<usize> for Landmarks {
    type Output = Landmark;

    fn index(&self, index: usize) -> &Landmark {
        &self.positions[index]
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn pixel_conversion() {
        let res = Resolution::new(640, 480);
        let lm = Landmark::from_pixel(320.0, 120.0, res);
        assert_relative_eq!(lm.x(), 0.5);
        assert_relative_eq!(lm.y(), 0.25);
        assert_eq!(lm.to_pixel(res), (320, 120));

        // Truncation, not rounding.
        assert_eq!(Landmark::new(0.999, 0.999).to_pixel(res), (639, 479));
        // Off-frame landmarks are kept as-is.
        assert_eq!(Landmark::new(-0.1, 1.5).to_pixel(res), (-64, 720));
    }

    #[test]
    fn from_pixels() {
        let lms = Landmarks::from_pixels([(0.0, 0.0), (100.0, 50.0)], Resolution::new(200, 100));
        assert_eq!(lms.len(), 2);
        assert_eq!(lms[0], Landmark::new(0.0, 0.0));
        assert_eq!(lms[1], Landmark::new(0.5, 0.5));
    }
}
