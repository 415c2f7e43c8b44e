use fingerstate::{
    hand::{
        fingers::{classify, finger_status, Finger, FingerStatus},
        Hand, Handedness, LandmarkIdx, NUM_LANDMARKS,
    },
    landmark::Landmark,
};

fn hand(handedness: Handedness, points: &[(LandmarkIdx, f32, f32)]) -> Hand {
    let mut landmarks = [Landmark::new(0.5, 0.5); NUM_LANDMARKS];
    for &(idx, x, y) in points {
        landmarks[idx.index()] = Landmark::new(x, y);
    }
    Hand::new(landmarks, handedness)
}

fn index_finger(wrist: f32, tip: f32, pip: f32, mcp: f32) -> Hand {
    use LandmarkIdx::*;
    hand(
        Handedness::Right,
        &[
            (Wrist, 0.5, wrist),
            (IndexFingerTip, 0.5, tip),
            (IndexFingerPip, 0.5, pip),
            (IndexFingerMcp, 0.5, mcp),
        ],
    )
}

fn thumb(handedness: Handedness, tip: f32, ip: f32) -> FingerStatus {
    let hand = hand(
        handedness,
        &[
            (LandmarkIdx::ThumbTip, tip, 0.5),
            (LandmarkIdx::ThumbIp, ip, 0.5),
        ],
    );
    finger_status(&hand, Finger::Thumb)
}

#[test]
fn thumb_follows_handedness() {
    assert_eq!(thumb(Handedness::Right, 0.6, 0.5), FingerStatus::Up);
    assert_eq!(thumb(Handedness::Right, 0.4, 0.5), FingerStatus::Down);
    assert_eq!(thumb(Handedness::Left, 0.4, 0.5), FingerStatus::Up);
    assert_eq!(thumb(Handedness::Left, 0.6, 0.5), FingerStatus::Down);
    assert_eq!(thumb(Handedness::Right, 0.5, 0.5), FingerStatus::Down);
    assert_eq!(thumb(Handedness::Left, 0.5, 0.5), FingerStatus::Down);
}

#[test]
fn index_finger_rules() {
    let status = |hand: &Hand| finger_status(hand, Finger::Index);
    assert_eq!(status(&index_finger(0.9, 0.2, 0.4, 0.5)), FingerStatus::Up);
    assert_eq!(status(&index_finger(0.9, 0.45, 0.4, 0.5)), FingerStatus::Down);
    assert_eq!(status(&index_finger(0.42, 0.41, 0.4, 0.5)), FingerStatus::Down);
    assert_eq!(status(&index_finger(0.9, 0.4, 0.4, 0.5)), FingerStatus::Down);
    assert_eq!(status(&index_finger(0.9, 0.2, 0.5, 0.5)), FingerStatus::Down);
}

#[test]
fn only_own_landmarks_matter() {
    use LandmarkIdx::*;
    let base = [
        (Wrist, 0.5, 0.9),
        (PinkyTip, 0.5, 0.2),
        (PinkyPip, 0.5, 0.4),
        (PinkyMcp, 0.5, 0.5),
    ];
    let states = classify(&hand(Handedness::Left, &base));
    assert_eq!(states.get(Finger::Pinky), FingerStatus::Up);

    // Moving the joints of other fingers around does not change the pinky.
    let mut moved = base.to_vec();
    moved.extend([
        (RingFingerTip, 0.1, 0.95),
        (MiddleFingerPip, 0.9, 0.05),
        (IndexFingerMcp, 0.2, 0.0),
        (ThumbTip, 0.0, 0.3),
        (PinkyDip, 0.9, 0.9),
    ]);
    let moved_states = classify(&hand(Handedness::Left, &moved));
    assert_eq!(moved_states.get(Finger::Pinky), FingerStatus::Up);
}

#[test]
fn classification_is_pure() {
    let mut rng = fastrand::Rng::with_seed(0x5eed);
    for _ in 0..500 {
        let mut landmarks = [Landmark::default(); NUM_LANDMARKS];
        for lm in &mut landmarks {
            // Include off-frame positions, networks produce them for partially visible hands.
            *lm = Landmark::new(rng.f32() * 1.4 - 0.2, rng.f32() * 1.4 - 0.2);
        }
        let handedness = if rng.bool() {
            Handedness::Left
        } else {
            Handedness::Right
        };
        let hand = Hand::new(landmarks, handedness);

        let first = classify(&hand);
        assert_eq!(first, classify(&hand.clone()));
        assert_eq!(first.iter().count(), 5);
        for state in first.iter() {
            assert_eq!(state.status, finger_status(&hand, state.finger));
        }
    }
}
