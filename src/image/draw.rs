use std::convert::Infallible;

use embedded_graphics::{
    draw_target::DrawTarget,
    mono_font::{ascii::FONT_10X20, MonoTextStyle},
    prelude::*,
    primitives::{Circle, Line, PrimitiveStyle, Rectangle},
    text::{self, Text, TextStyleBuilder},
};

use crate::image::{AsImageViewMut, Color, ImageViewMut};

/// Guard returned by [`draw_circle`]; draws the circle when dropped and allows customization.
pub struct DrawCircle<'a> {
    image: ImageViewMut<'a>,
    x: i32,
    y: i32,
    radius: u32,
    color: Color,
    filled: bool,
}

impl DrawCircle<'_> {
    /// Sets the circle's color.
    pub fn color(&mut self, color: Color) -> &mut Self {
        self.color = color;
        self
    }

    /// Sets the circle's radius in pixels (default 4).
    ///
    /// The drawn circle covers `2 * radius + 1` pixels across, centered on the given point.
    pub fn radius(&mut self, radius: u32) -> &mut Self {
        self.radius = radius;
        self
    }

    /// Fills the circle instead of only drawing its outline.
    pub fn filled(&mut self) -> &mut Self {
        self.filled = true;
        self
    }
}

impl Drop for DrawCircle<'_> {
    fn drop(&mut self) {
        let style = if self.filled {
            PrimitiveStyle::with_fill(self.color)
        } else {
            PrimitiveStyle::with_stroke(self.color, 1)
        };
        match Circle::with_center(Point::new(self.x, self.y), self.radius * 2 + 1)
            .into_styled(style)
            .draw(&mut Target(self.image.reborrow()))
        {
            Ok(_) => {}
            Err(infallible) => match infallible {},
        }
    }
}

/// Guard returned by [`draw_line`]; draws the line when dropped and allows customization.
pub struct DrawLine<'a> {
    image: ImageViewMut<'a>,
    start: Point,
    end: Point,
    color: Color,
    stroke_width: u32,
}

impl<'a> DrawLine<'a> {
    /// Sets the line's color.
    pub fn color(&mut self, color: Color) -> &mut Self {
        self.color = color;
        self
    }

    /// Sets the line's stroke width.
    ///
    /// By default, a stroke width of 1 is used.
    pub fn stroke_width(&mut self, width: u32) -> &mut Self {
        self.stroke_width = width;
        self
    }
}

impl<'a> Drop for DrawLine<'a> {
    fn drop(&mut self) {
        match Line::new(self.start, self.end)
            .into_styled(PrimitiveStyle::with_stroke(self.color, self.stroke_width))
            .draw(&mut Target(self.image.reborrow()))
        {
            Ok(_) => {}
            Err(infallible) => match infallible {},
        }
    }
}

/// Guard returned by [`draw_text`]; draws the text when dropped and allows customization.
pub struct DrawText<'a> {
    image: ImageViewMut<'a>,
    x: i32,
    y: i32,
    text: &'a str,
    color: Color,
    alignment: text::Alignment,
    baseline: text::Baseline,
}

impl<'a> DrawText<'a> {
    /// Sets the text color.
    pub fn color(&mut self, color: Color) -> &mut Self {
        self.color = color;
        self
    }

    /// Puts the text's baseline on the `y` coordinate, so that `(x, y)` is the bottom-left
    /// corner of the first glyph when combined with [`DrawText::align_left`].
    pub fn align_baseline(&mut self) -> &mut Self {
        self.baseline = text::Baseline::Alphabetic;
        self
    }

    /// Aligns the left side of the text with the `x` coordinate.
    pub fn align_left(&mut self) -> &mut Self {
        self.alignment = text::Alignment::Left;
        self
    }
}

impl<'a> Drop for DrawText<'a> {
    fn drop(&mut self) {
        // The built-in mono fonts only cover ASCII.
        let character_style = MonoTextStyle::new(&FONT_10X20, self.color);
        let text_style = TextStyleBuilder::new()
            .alignment(self.alignment)
            .baseline(self.baseline)
            .build();
        match Text::with_text_style(
            self.text,
            Point::new(self.x, self.y),
            character_style,
            text_style,
        )
        .draw(&mut Target(self.image.reborrow()))
        {
            Ok(_) => {}
            Err(infallible) => match infallible {},
        }
    }
}

/// Draws a circle centered on `(x, y)` onto an image.
pub fn draw_circle<I: AsImageViewMut>(image: &mut I, x: i32, y: i32) -> DrawCircle<'_> {
    DrawCircle {
        image: image.as_view_mut(),
        x,
        y,
        radius: 4,
        color: Color::GREEN,
        filled: false,
    }
}

/// Draws a line onto an image.
pub fn draw_line<I: AsImageViewMut>(
    image: &mut I,
    start_x: i32,
    start_y: i32,
    end_x: i32,
    end_y: i32,
) -> DrawLine<'_> {
    DrawLine {
        image: image.as_view_mut(),
        start: Point::new(start_x, start_y),
        end: Point::new(end_x, end_y),
        color: Color::BLUE,
        stroke_width: 1,
    }
}

/// Draws a text string onto an image.
///
/// By default, the text is drawn centered horizontally and vertically around `x` and `y`.
pub fn draw_text<'a, I: AsImageViewMut>(
    image: &'a mut I,
    x: i32,
    y: i32,
    text: &'a str,
) -> DrawText<'a> {
    DrawText {
        image: image.as_view_mut(),
        x,
        y,
        text,
        color: Color::RED,
        alignment: text::Alignment::Center,
        baseline: text::Baseline::Middle,
    }
}

struct Target<'a>(ImageViewMut<'a>);

impl Dimensions for Target<'_> {
    fn bounding_box(&self) -> Rectangle {
        let (width, height) = (self.0.width(), self.0.height());

        Rectangle {
            top_left: Point { x: 0, y: 0 },
            size: Size { width, height },
        }
    }
}

impl DrawTarget for Target<'_> {
    type Color = Color;

    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if let (Ok(x), Ok(y)) = (u32::try_from(point.x), u32::try_from(point.y)) {
                self.0.set(x, y, color);
            }
        }

        Ok(())
    }
}
