//! Draws detected hands and finger states on top of video frames.

use crate::{
    hand::{
        fingers::{FingerStates, FingerStatus},
        Hand, LandmarkIdx,
    },
    image::{draw_circle, draw_line, draw_text, Color, Image},
};

/// Edges of the hand skeleton, as pairs of landmark indices.
///
/// Every finger is a chain starting at the wrist, and the knuckles of the four fingers are
/// connected to each other.
pub const HAND_CONNECTIONS: [(LandmarkIdx, LandmarkIdx); 23] = {
    use LandmarkIdx::*;
    [
        (Wrist, ThumbCmc),
        (ThumbCmc, ThumbMcp),
        (ThumbMcp, ThumbIp),
        (ThumbIp, ThumbTip),
        (Wrist, IndexFingerMcp),
        (IndexFingerMcp, IndexFingerPip),
        (IndexFingerPip, IndexFingerDip),
        (IndexFingerDip, IndexFingerTip),
        (Wrist, MiddleFingerMcp),
        (MiddleFingerMcp, MiddleFingerPip),
        (MiddleFingerPip, MiddleFingerDip),
        (MiddleFingerDip, MiddleFingerTip),
        (Wrist, RingFingerMcp),
        (RingFingerMcp, RingFingerPip),
        (RingFingerPip, RingFingerDip),
        (RingFingerDip, RingFingerTip),
        (Wrist, PinkyMcp),
        (PinkyMcp, PinkyPip),
        (PinkyPip, PinkyDip),
        (PinkyDip, PinkyTip),
        (IndexFingerMcp, MiddleFingerMcp),
        (MiddleFingerMcp, RingFingerMcp),
        (RingFingerMcp, PinkyMcp),
    ]
};

const LANDMARK_RADIUS: u32 = 4;
const LANDMARK_COLOR: Color = Color::GREEN;
const CONNECTION_COLOR: Color = Color::BLUE;
const CONNECTION_WIDTH: u32 = 2;

const STATUS_X: i32 = 10;
const STATUS_Y: i32 = 40;
const STATUS_LINE_HEIGHT: i32 = 30;

pub const NO_HAND_MESSAGE: &str = "No hand detected";
const NO_HAND_POS: (i32, i32) = (10, 30);

fn status_color(status: FingerStatus) -> Color {
    match status {
        FingerStatus::Up => Color::GREEN,
        FingerStatus::Down => Color::RED,
    }
}

/// Draws the landmarks and skeleton of `hand`.
pub fn draw_hand(image: &mut Image, hand: &Hand) {
    let res = image.resolution();
    let pixel = |idx: LandmarkIdx| hand.landmark(idx).to_pixel(res);

    for lm in hand.landmarks() {
        let (x, y) = lm.to_pixel(res);
        draw_circle(image, x, y)
            .radius(LANDMARK_RADIUS)
            .color(LANDMARK_COLOR)
            .filled();
    }

    for (start, end) in HAND_CONNECTIONS {
        let (start_x, start_y) = pixel(start);
        let (end_x, end_y) = pixel(end);
        draw_line(image, start_x, start_y, end_x, end_y)
            .color(CONNECTION_COLOR)
            .stroke_width(CONNECTION_WIDTH);
    }
}

/// Writes one `Finger: STATUS` line per finger in the top left corner.
pub fn draw_finger_states(image: &mut Image, states: &FingerStates) {
    let mut y = STATUS_Y;
    for state in states.iter() {
        let label = state.to_string();
        draw_text(image, STATUS_X, y, &label)
            .align_left()
            .align_baseline()
            .color(status_color(state.status));
        y += STATUS_LINE_HEIGHT;
    }
}

/// Draws the message shown when no hand is in view.
pub fn draw_no_hand(image: &mut Image) {
    let (x, y) = NO_HAND_POS;
    draw_text(image, x, y, NO_HAND_MESSAGE)
        .align_left()
        .align_baseline()
        .color(Color::RED);
}

/// Annotates a frame with all detected hands and their finger states.
///
/// The status lines of all hands are drawn at the same position, so with several hands in view
/// the last one ends up on top.
pub fn draw_frame(image: &mut Image, hands: &[(Hand, FingerStates)]) {
    if hands.is_empty() {
        draw_no_hand(image);
        return;
    }

    for (hand, states) in hands {
        draw_hand(image, hand);
        draw_finger_states(image, states);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        hand::{fingers::classify, Handedness},
        resolution::Resolution,
        test::HandBuilder,
    };

    fn count(image: &Image, color: Color) -> usize {
        image.buf.pixels().filter(|pix| pix.0 == color.0).count()
    }

    fn blank() -> Image {
        let mut image = Image::new(320, 240);
        image.clear(Color::BLACK);
        image
    }

    #[test]
    fn connections() {
        assert_eq!(HAND_CONNECTIONS.len(), 23);
        for (a, b) in HAND_CONNECTIONS {
            assert_ne!(a, b);
        }
        // Every landmark is part of the skeleton.
        for i in 0..crate::hand::NUM_LANDMARKS {
            assert!(HAND_CONNECTIONS
                .iter()
                .any(|(a, b)| a.index() == i || b.index() == i));
        }
    }

    #[test]
    fn no_hands_draws_only_message() {
        let mut image = blank();
        draw_frame(&mut image, &[]);

        let red = count(&image, Color::RED);
        assert!(red > 0);
        assert_eq!(count(&image, Color::BLACK) + red, 320 * 240);

        // Text sits above its baseline, starting at the left margin.
        for y in 0..240 {
            for x in 0..320 {
                if image.get(x, y) == Color::RED {
                    assert!(x >= 10 && y <= 30 + 5, "stray pixel at {x},{y}");
                }
            }
        }
    }

    #[test]
    fn hand_overlay() {
        let hand = HandBuilder::new(Handedness::Right)
            .landmark(LandmarkIdx::Wrist, 0.5, 0.9)
            .landmark(LandmarkIdx::MiddleFingerTip, 0.5, 0.1)
            .build();
        let states = classify(&hand);

        let mut image = blank();
        draw_frame(&mut image, &[(hand.clone(), states)]);

        // Lines are drawn over the markers, but markers are wider.
        let res = Resolution::new(320, 240);
        let (x, y) = hand.landmark(LandmarkIdx::Wrist).to_pixel(res);
        assert_eq!(image.get(x as u32 + 3, y as u32), Color::GREEN);
        assert!(count(&image, Color::BLUE) > 0);
        // All fingers are down.
        assert!(count(&image, Color::RED) > 0);
    }
}
