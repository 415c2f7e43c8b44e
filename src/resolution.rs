//! Image sizes and aspect ratios.

use std::fmt;

use crate::rect::Rect;

/// Size of an image, camera frame, or window, in whole pixels.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    width: u32,
    height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn num_pixels(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Returns the width-to-height ratio, or [`None`] if there are no pixels.
    pub fn aspect_ratio(&self) -> Option<AspectRatio> {
        AspectRatio::new(self.width, self.height)
    }

    /// Returns a [`Rect`] of this size with its top left corner at the origin.
    pub fn rect(&self) -> Rect {
        Rect::from_top_left(0.0, 0.0, self.width as f32, self.height as f32)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Width divided by height of a non-empty image or rectangle.
#[derive(Clone, Copy, PartialEq)]
pub struct AspectRatio(f32);

impl AspectRatio {
    /// 1:1, the input shape of both hand networks.
    pub const SQUARE: Self = Self(1.0);

    /// Returns [`None`] if `width` or `height` is zero.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self(width as f32 / height as f32))
    }

    #[inline]
    pub fn as_f32(&self) -> f32 {
        self.0
    }

    /// Whether a rectangle of this ratio is wider than one of `other`.
    pub fn is_wider_than(&self, other: AspectRatio) -> bool {
        self.0 > other.0
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}:1", self.0)
    }
}

impl fmt::Debug for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn ratios() {
        assert_eq!(AspectRatio::new(1920, 1080), AspectRatio::new(1280, 720));
        assert_eq!(AspectRatio::new(0, 720), None);
        assert_eq!(Resolution::new(64, 0).aspect_ratio(), None);
        assert_eq!(Resolution::new(50, 50).aspect_ratio(), Some(AspectRatio::SQUARE));

        let wide = Resolution::new(640, 480).aspect_ratio().unwrap();
        assert_relative_eq!(wide.as_f32(), 4.0 / 3.0);
        assert!(wide.is_wider_than(AspectRatio::SQUARE));
        assert!(!AspectRatio::SQUARE.is_wider_than(wide));
        assert_eq!(wide.to_string(), "1.333:1");
    }

    #[test]
    fn resolution_rect() {
        let res = Resolution::new(640, 480);
        assert_eq!(res.to_string(), "640x480");
        assert_eq!(res.num_pixels(), 307_200);
        assert_eq!(res.rect(), Rect::from_top_left(0.0, 0.0, 640.0, 480.0));
    }
}
