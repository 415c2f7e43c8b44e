//! Rectangle type.
//!
//! Used for image views, palm detections, and hand regions of interest. Coordinates are in
//! pixels, X points right and Y points down.

use std::fmt;

use crate::resolution::AspectRatio;

/// An axis-aligned rectangle, stored as center and size.
///
/// Rectangles are allowed to have zero height and/or width.
#[derive(Clone, Copy, PartialEq)]
pub struct Rect {
    x_center: f32,
    y_center: f32,
    width: f32,
    height: f32,
}

impl Rect {
    #[inline]
    pub fn from_center(x_center: f32, y_center: f32, width: f32, height: f32) -> Self {
        Self {
            x_center,
            y_center,
            width,
            height,
        }
    }

    #[inline]
    pub fn from_top_left(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::from_center(x + width * 0.5, y + height * 0.5, width, height)
    }

    /// Scales width and height by `scale`, keeping the center in place.
    #[must_use]
    pub fn scale(&self, scale: f32) -> Self {
        Self::from_center(
            self.x_center,
            self.y_center,
            self.width * scale,
            self.height * scale,
        )
    }

    /// Extends the shorter side (relative to `aspect`) symmetrically until the rectangle has the
    /// given aspect ratio.
    #[must_use]
    pub fn grow_to_fit_aspect(&self, aspect: AspectRatio) -> Self {
        let ratio = aspect.as_f32();
        if self.height * ratio >= self.width {
            Self::from_center(self.x_center, self.y_center, self.height * ratio, self.height)
        } else {
            Self::from_center(self.x_center, self.y_center, self.width, self.width / ratio)
        }
    }

    /// Returns the largest rectangle with the given aspect ratio that is centered in `self`.
    ///
    /// This is the area an image of that aspect ratio covers when it is letterboxed (or
    /// pillarboxed) into `self`.
    #[must_use]
    pub fn shrink_to_fit_aspect(&self, aspect: AspectRatio) -> Self {
        let ratio = aspect.as_f32();
        if self.height * ratio <= self.width {
            Self::from_center(self.x_center, self.y_center, self.height * ratio, self.height)
        } else {
            Self::from_center(self.x_center, self.y_center, self.width, self.width / ratio)
        }
    }

    /// Snaps the top left corner and the size to whole pixels.
    ///
    /// Returns [`None`] if the result covers no pixels, or if any coordinate is not finite.
    pub fn round_to_pixels(&self) -> Option<Self> {
        let (x, y) = (self.x().round(), self.y().round());
        let (w, h) = (self.width.round(), self.height.round());
        if [x, y, w, h].iter().any(|v| !v.is_finite()) || w < 1.0 || h < 1.0 {
            return None;
        }
        Some(Self::from_top_left(x, y, w, h))
    }

    /// X coordinate of the left edge.
    #[inline]
    pub fn x(&self) -> f32 {
        self.x_center - self.width * 0.5
    }

    /// Y coordinate of the top edge.
    #[inline]
    pub fn y(&self) -> f32 {
        self.y_center - self.height * 0.5
    }

    #[inline]
    pub fn x_center(&self) -> f32 {
        self.x_center
    }

    #[inline]
    pub fn y_center(&self) -> f32 {
        self.y_center
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.height
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    #[must_use]
    pub fn move_by(&self, x: f32, y: f32) -> Rect {
        Self::from_center(self.x_center + x, self.y_center + y, self.width, self.height)
    }

    /// Returns the overlapping area of `self` and `other`, or [`None`] if they don't overlap.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.x().max(other.x());
        let top = self.y().max(other.y());
        let right = (self.x() + self.width).min(other.x() + other.width);
        let bottom = (self.y() + self.height).min(other.y() + other.height);
        if left > right || top > bottom {
            return None;
        }
        Some(Self::from_top_left(left, top, right - left, bottom - top))
    }

    /// Intersection over Union of `self` and `other`.
    pub fn iou(&self, other: &Self) -> f32 {
        let overlap = self.intersection(other).map_or(0.0, |rect| rect.area());
        overlap / (self.area() + other.area() - overlap)
    }
}

impl fmt::Debug for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rect @ ({},{})/{}x{}",
            self.x(),
            self.y(),
            self.width,
            self.height
        )
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn intersection() {
        let big = Rect::from_top_left(0.0, 0.0, 10.0, 10.0);
        let inner = Rect::from_top_left(2.0, 3.0, 4.0, 4.0);
        assert_eq!(big.intersection(&inner), Some(inner));

        let right = Rect::from_top_left(8.0, 5.0, 10.0, 10.0);
        assert_eq!(
            big.intersection(&right),
            Some(Rect::from_top_left(8.0, 5.0, 2.0, 5.0))
        );
        assert_eq!(big.intersection(&right.move_by(5.0, 0.0)), None);
    }

    #[test]
    fn iou() {
        let smaller = Rect::from_center(9.0, 9.0, 1.0, 1.0);
        let bigger = Rect::from_center(9.0, 9.0, 2.0, 2.0);
        assert_eq!(smaller.iou(&bigger), 1.0 / 4.0);
        assert_eq!(bigger.iou(&smaller), 1.0 / 4.0);
        assert_eq!(smaller.iou(&smaller.move_by(3.0, 0.0)), 0.0);
    }

    #[test]
    fn grow_and_shrink_to_aspect() {
        let tall = Rect::from_center(10.0, 10.0, 50.0, 100.0);
        let wide = Rect::from_center(10.0, 10.0, 100.0, 50.0);
        let square = AspectRatio::SQUARE;
        assert_eq!(
            tall.grow_to_fit_aspect(square),
            Rect::from_center(10.0, 10.0, 100.0, 100.0)
        );
        assert_eq!(
            wide.grow_to_fit_aspect(square),
            Rect::from_center(10.0, 10.0, 100.0, 100.0)
        );
        assert_eq!(
            tall.shrink_to_fit_aspect(square),
            Rect::from_center(10.0, 10.0, 50.0, 50.0)
        );

        // A 640x480 frame letterboxed into a square network input.
        let frame = AspectRatio::new(640, 480).unwrap();
        let input = Rect::from_top_left(0.0, 0.0, 192.0, 192.0);
        let content = input.shrink_to_fit_aspect(frame);
        assert_relative_eq!(content.x(), 0.0);
        assert_relative_eq!(content.y(), 24.0, epsilon = 1e-4);
        assert_relative_eq!(content.width(), 192.0);
        assert_relative_eq!(content.height(), 144.0, epsilon = 1e-4);
    }

    #[test]
    fn round_to_pixels() {
        let rect = Rect::from_top_left(10.4, 19.6, 99.7, 50.2);
        assert_eq!(
            rect.round_to_pixels(),
            Some(Rect::from_top_left(10.0, 20.0, 100.0, 50.0))
        );

        assert_eq!(Rect::from_center(100.0, 100.0, 0.0, 0.0).round_to_pixels(), None);
        assert_eq!(Rect::from_center(100.0, 100.0, 40.0, 0.3).round_to_pixels(), None);
        assert_eq!(Rect::from_center(100.0, 100.0, -4.0, 8.0).round_to_pixels(), None);
        assert_eq!(Rect::from_center(f32::NAN, 0.0, 8.0, 8.0).round_to_pixels(), None);
    }
}
