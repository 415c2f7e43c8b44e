use super::*;
use Color as C;

fn mkimage<const W: usize, const H: usize>(data: [[Color; W]; H]) -> Image {
    let mut image = Image::new(W as u32, H as u32);
    for (y, row) in data.iter().enumerate() {
        for (x, color) in row.iter().enumerate() {
            image.set(x as u32, y as u32, *color);
        }
    }
    image
}

fn count(image: &Image, color: Color) -> usize {
    image.buf.pixels().filter(|pix| pix.0 == color.0).count()
}

#[test]
fn view() {
    let image = mkimage([[C::RED, C::GREEN]]);

    let view = image.view(Rect::from_top_left(1.0, 0.0, 1.0, 1.0));
    assert_eq!(view.width(), 1);
    assert_eq!(view.height(), 1);
    assert_eq!(view.get(0, 0), C::GREEN);

    // Pixels outside the image read as NULL, but the view keeps its size.
    let view = image.view(Rect::from_top_left(1.0, 0.0, 3.0, 2.0));
    assert_eq!(view.width(), 3);
    assert_eq!(view.height(), 2);
    assert_eq!(view.get(0, 0), C::GREEN);
    assert_eq!(view.get(1, 0), C::NULL);
    assert_eq!(view.get(0, 1), C::NULL);
}

#[test]
fn view_mut_ignores_out_of_bounds_writes() {
    let mut image = mkimage([[C::RED, C::RED]]);
    let mut view = image.view_mut(Rect::from_top_left(-1.0, 0.0, 2.0, 1.0));
    view.set(0, 0, C::BLUE);
    view.set(1, 0, C::BLUE);
    assert_eq!(image.get(0, 0), C::BLUE);
    assert_eq!(image.get(1, 0), C::RED);
}

#[test]
fn flip_horizontal() {
    let mut image = mkimage([[C::RED, C::GREEN, C::BLUE]]);
    image.flip_horizontal_in_place();
    assert_eq!(image.get(0, 0), C::BLUE);
    assert_eq!(image.get(1, 0), C::GREEN);
    assert_eq!(image.get(2, 0), C::RED);
}

#[test]
fn aspect_aware_resize_letterboxes() {
    let image = mkimage([[C::WHITE, C::WHITE], [C::WHITE, C::WHITE]]);
    let wide = image.view(Rect::from_top_left(0.0, 0.0, 2.0, 1.0));
    let resized = wide.aspect_aware_resize(Resolution::new(4, 4));
    assert_eq!(resized.resolution(), Resolution::new(4, 4));
    assert_eq!(resized.get(0, 0), C::BLACK);
    assert_eq!(resized.get(0, 1), C::WHITE);
    assert_eq!(resized.get(3, 2), C::WHITE);
    assert_eq!(resized.get(3, 3), C::BLACK);
}

#[test]
fn draw_filled_circle() {
    let mut image = Image::new(20, 20);
    draw_circle(&mut image, 10, 10).radius(4).filled();
    assert_eq!(image.get(10, 10), C::GREEN);
    assert_eq!(image.get(10, 6), C::GREEN);
    assert_eq!(image.get(10, 15), C::NULL);
    assert_eq!(image.get(0, 0), C::NULL);
}

#[test]
fn draw_clipped_primitives() {
    // Shapes partially outside of the image must not panic.
    let mut image = Image::new(8, 8);
    draw_circle(&mut image, -2, 3).filled();
    draw_line(&mut image, -10, -10, 20, 20).stroke_width(2);
    draw_text(&mut image, 4, 4, "W");
    assert!(count(&image, C::GREEN) > 0);
    assert!(count(&image, C::BLUE) > 0);
    assert!(count(&image, C::RED) > 0);
}

#[test]
fn draw_text_left_baseline() {
    let mut image = Image::new(100, 40);
    draw_text(&mut image, 10, 30, "UP")
        .align_left()
        .align_baseline()
        .color(C::GREEN);
    assert!(count(&image, C::GREEN) > 0);
    // Nothing left of the anchor.
    for y in 0..40 {
        for x in 0..10 {
            assert_eq!(image.get(x, y), C::NULL);
        }
    }
}
