//! Image manipulation.
//!
//! This module provides:
//!
//! - The [`Image`] type, an owned RGBA image.
//! - [`ImageView`] and [`ImageViewMut`], borrowed rectangular views into an underlying [`Image`].
//! - The [`AsImageView`] and [`AsImageViewMut`] traits to abstract over images and views.
//! - A variety of freestanding `draw_*` functions used to annotate video frames.

mod draw;

#[cfg(test)]
mod tests;

use std::fmt;

use embedded_graphics::{pixelcolor::raw::RawU32, prelude::PixelColor};
use image::{
    imageops::{self, FilterType},
    GenericImageView, ImageBuffer, Rgba, RgbaImage,
};

use crate::{rect::Rect, resolution::Resolution};

pub use draw::*;

/// An 8-bit sRGB image with alpha channel.
#[derive(Clone)]
pub struct Image {
    // Row-major RGBA8, the layout the window renderer uploads as a texture.
    pub(crate) buf: RgbaImage,
}

impl Image {
    /// Decodes a JFIF JPEG or Motion JPEG from a byte slice.
    pub fn decode_jpeg(data: &[u8]) -> anyhow::Result<Self> {
        let buf = image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)?.to_rgba8();
        Ok(Self { buf })
    }

    /// Creates an empty image of a specified size.
    ///
    /// The image will start out black and fully transparent.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buf: ImageBuffer::new(width, height),
        }
    }

    /// Returns the width of this image, in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.buf.width()
    }

    /// Returns the height of this image, in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.buf.height()
    }

    /// Returns the size of this image.
    #[inline]
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width(), self.height())
    }

    /// Returns a [`Rect`] covering this image.
    #[inline]
    pub fn rect(&self) -> Rect {
        self.resolution().rect()
    }

    /// Resizes this image to a new size, adding black bars to keep the original aspect ratio.
    ///
    /// This uses nearest neighbor interpolation, which is good enough for network inputs.
    pub fn aspect_aware_resize(&self, new_res: Resolution) -> Image {
        self.as_view().aspect_aware_resize(new_res)
    }

    /// Gets the image color at the given pixel coordinates.
    ///
    /// # Panics
    ///
    /// This will panic if `(x, y)` is outside the bounds of this image.
    pub fn get(&self, x: u32, y: u32) -> Color {
        Color(self.buf[(x, y)].0)
    }

    /// Sets the image color at the given pixel coordinates.
    ///
    /// # Panics
    ///
    /// This will panic if `(x, y)` is outside the bounds of this image.
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        self.buf[(x, y)] = Rgba(color.0);
    }

    /// Creates an immutable view into an area of this image, specified by `rect`.
    ///
    /// If `rect` lies partially outside of `self`, the pixels that are outside of `self` will have
    /// the value [`Color::NULL`] and ignore writes. The returned view always has the size of
    /// `rect` (rounded to whole pixels).
    pub fn view(&self, rect: Rect) -> ImageView<'_> {
        ImageView {
            image: self,
            region: Region::full(self).view(rect),
        }
    }

    /// Creates a mutable view into an area of this image, specified by `rect`.
    ///
    /// Pixels of the view that lie outside of `self` read as [`Color::NULL`] and ignore writes.
    pub fn view_mut(&mut self, rect: Rect) -> ImageViewMut<'_> {
        ImageViewMut {
            region: Region::full(self).view(rect),
            image: self,
        }
    }

    /// Mirrors this image horizontally, so that it looks like a mirror image of the scene.
    pub fn flip_horizontal_in_place(&mut self) {
        imageops::flip_horizontal_in_place(&mut self.buf);
    }

    /// Clears the image, setting every pixel value to `color`.
    pub fn clear(&mut self, color: Color) {
        self.buf.pixels_mut().for_each(|pix| pix.0 = color.0);
    }

    #[inline]
    pub(crate) fn data(&self) -> &[u8] {
        self.buf.as_raw()
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} Image", self.width(), self.height())
    }
}

/// A whole-pixel rectangle in the root image's coordinates.
///
/// May extend past the image borders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Region {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
}

impl Region {
    fn full(image: &Image) -> Self {
        Self {
            x: 0,
            y: 0,
            width: image.width(),
            height: image.height(),
        }
    }

    /// Computes the sub-region at `rect`, which is relative to `self`.
    fn view(&self, rect: Rect) -> Self {
        Self {
            x: self.x + rect.x().round() as i32,
            y: self.y + rect.y().round() as i32,
            width: rect.width().round().max(0.0) as u32,
            height: rect.height().round().max(0.0) as u32,
        }
    }

    fn rect(&self) -> Rect {
        Rect::from_top_left(0.0, 0.0, self.width as f32, self.height as f32)
    }

    fn image_coord(&self, x: u32, y: u32, image: &Image) -> Option<(u32, u32)> {
        if x >= self.width || y >= self.height {
            return None;
        }

        let x: u32 = (self.x + i32::try_from(x).ok()?).try_into().ok()?;
        let y: u32 = (self.y + i32::try_from(y).ok()?).try_into().ok()?;
        if x >= image.width() || y >= image.height() {
            return None;
        }
        Some((x, y))
    }

    fn get(&self, x: u32, y: u32, image: &Image) -> Color {
        match self.image_coord(x, y, image) {
            Some((x, y)) => Color(image.buf[(x, y)].0),
            None => Color::NULL,
        }
    }
}

/// An immutable view of a rectangular section of an [`Image`].
#[derive(Clone, Copy)]
pub struct ImageView<'a> {
    image: &'a Image,
    region: Region,
}

impl<'a> ImageView<'a> {
    fn as_generic_image_view(&self) -> impl GenericImageView<Pixel = Rgba<u8>> + '_ {
        struct Wrapper<'a>(ImageView<'a>);

        impl GenericImageView for Wrapper<'_> {
            type Pixel = Rgba<u8>;

            fn dimensions(&self) -> (u32, u32) {
                (self.0.width(), self.0.height())
            }

            fn bounds(&self) -> (u32, u32, u32, u32) {
                (0, 0, self.0.width(), self.0.height())
            }

            fn get_pixel(&self, x: u32, y: u32) -> Self::Pixel {
                Rgba(self.0.region.get(x, y, self.0.image).0)
            }
        }

        Wrapper(*self)
    }

    /// Returns the width of this view, in pixels.
    pub fn width(&self) -> u32 {
        self.region.width
    }

    /// Returns the height of this view, in pixels.
    pub fn height(&self) -> u32 {
        self.region.height
    }

    /// Returns the size of this view.
    #[inline]
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width(), self.height())
    }

    /// Returns a [`Rect`] of the size of this view, positioned at `(0, 0)`.
    #[inline]
    pub fn rect(&self) -> Rect {
        self.region.rect()
    }

    /// Gets the image color at the given pixel coordinates.
    ///
    /// Coordinates outside of the view or the underlying image yield [`Color::NULL`].
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Color {
        self.region.get(x, y, self.image)
    }

    /// Creates an immutable subview into an area of this view, specified by `rect`.
    pub fn view(&self, rect: Rect) -> ImageView<'a> {
        ImageView {
            image: self.image,
            region: self.region.view(rect),
        }
    }

    /// Resizes this view to `new_res`, adding black bars to keep its aspect ratio.
    ///
    /// This uses nearest neighbor interpolation.
    pub fn aspect_aware_resize(&self, new_res: Resolution) -> Image {
        let mut out = Image::new(new_res.width(), new_res.height());
        let Some(ratio) = self.resolution().aspect_ratio() else {
            return out;
        };
        let Some(target) = new_res.rect().shrink_to_fit_aspect(ratio).round_to_pixels() else {
            return out;
        };
        log::trace!(
            "aspect-aware resize from {} ({}) to {:?} in {}",
            self.resolution(),
            ratio,
            target,
            new_res,
        );

        let scaled = imageops::resize(
            &self.as_generic_image_view(),
            target.width() as u32,
            target.height() as u32,
            FilterType::Nearest,
        );
        out.clear(Color::BLACK);
        imageops::replace(&mut out.buf, &scaled, target.x() as i64, target.y() as i64);
        out
    }
}

impl fmt::Debug for ImageView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} ImageView", self.width(), self.height())
    }
}

/// A mutable view of a rectangular section of an [`Image`].
pub struct ImageViewMut<'a> {
    image: &'a mut Image,
    region: Region,
}

impl<'a> ImageViewMut<'a> {
    /// Returns the width of this view, in pixels.
    pub fn width(&self) -> u32 {
        self.region.width
    }

    /// Returns the height of this view, in pixels.
    pub fn height(&self) -> u32 {
        self.region.height
    }

    /// Returns the size of this view.
    #[inline]
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width(), self.height())
    }

    /// Returns a [`Rect`] of the size of this view, positioned at `(0, 0)`.
    #[inline]
    pub fn rect(&self) -> Rect {
        self.region.rect()
    }

    /// Gets the image color at the given pixel coordinates.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Color {
        self.region.get(x, y, self.image)
    }

    /// Sets the image color at the given pixel coordinates.
    ///
    /// Writes outside of the view or the underlying image are ignored.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        if let Some((x, y)) = self.region.image_coord(x, y, self.image) {
            self.image.buf.put_pixel(x, y, Rgba(color.0));
        }
    }

    /// Borrows an identical [`ImageViewMut`] from `self` that may have a shorter lifetime.
    ///
    /// This is equivalent to the implicit "reborrowing" that happens on Rust references. It needs
    /// to be a method call here because user-defined types cannot opt into making this happen
    /// automatically.
    pub fn reborrow(&mut self) -> ImageViewMut<'_> {
        ImageViewMut {
            image: self.image,
            region: self.region,
        }
    }
}

impl fmt::Debug for ImageViewMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} ImageViewMut", self.width(), self.height())
    }
}

/// An 8-bit RGBA color.
///
/// Colors are always in the sRGB color space and use non-premultiplied alpha.
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct Color(pub(crate) [u8; 4]);

impl Color {
    /// Fully transparent black (all components are 0).
    pub const NULL: Self = Self([0, 0, 0, 0]);
    pub const BLACK: Self = Self([0, 0, 0, 255]);
    pub const WHITE: Self = Self([255, 255, 255, 255]);
    pub const RED: Self = Self([255, 0, 0, 255]);
    pub const GREEN: Self = Self([0, 255, 0, 255]);
    pub const BLUE: Self = Self([0, 0, 255, 255]);

    #[inline]
    pub fn r(&self) -> u8 {
        self.0[0]
    }

    #[inline]
    pub fn g(&self) -> u8 {
        self.0[1]
    }

    #[inline]
    pub fn b(&self) -> u8 {
        self.0[2]
    }

    #[inline]
    pub fn a(&self) -> u8 {
        self.0[3]
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:02x}{:02x}{:02x}{:02x}",
            self.r(),
            self.g(),
            self.b(),
            self.a(),
        )
    }
}

impl PixelColor for Color {
    type Raw = RawU32;
}

/// Trait for types that can be treated as read-only views of image data.
///
/// This allows abstracting over [`Image`] and [`ImageView`] and should be used by any code that
/// takes immutable image data as input.
pub trait AsImageView {
    /// Returns an [`ImageView`] covering `self`.
    fn as_view(&self) -> ImageView<'_>;
}

/// Trait for types that can be treated as mutable views of image data.
///
/// This allows abstracting over [`Image`] and [`ImageViewMut`] and should be used by any code that
/// writes to image data.
pub trait AsImageViewMut: AsImageView {
    /// Returns an [`ImageViewMut`] covering `self`.
    fn as_view_mut(&mut self) -> ImageViewMut<'_>;
}

impl AsImageView for Image {
    fn as_view(&self) -> ImageView<'_> {
        self.view(self.rect())
    }
}

impl<'a> AsImageView for ImageView<'a> {
    fn as_view(&self) -> ImageView<'_> {
        *self
    }
}

impl AsImageViewMut for Image {
    fn as_view_mut(&mut self) -> ImageViewMut<'_> {
        let rect = self.rect();
        self.view_mut(rect)
    }
}

impl<'a> AsImageView for ImageViewMut<'a> {
    fn as_view(&self) -> ImageView<'_> {
        ImageView {
            region: self.region,
            image: self.image,
        }
    }
}

impl<'a> AsImageViewMut for ImageViewMut<'a> {
    fn as_view_mut(&mut self) -> ImageViewMut<'_> {
        self.reborrow()
    }
}

impl<'a, V: AsImageView> AsImageView for &'a V {
    fn as_view(&self) -> ImageView<'_> {
        (*self).as_view()
    }
}

impl<'a, V: AsImageView> AsImageView for &'a mut V {
    fn as_view(&self) -> ImageView<'_> {
        (**self).as_view()
    }
}

impl<'a, V: AsImageViewMut> AsImageViewMut for &'a mut V {
    fn as_view_mut(&mut self) -> ImageViewMut<'_> {
        (*self).as_view_mut()
    }
}
