//! Finger state classification.
//!
//! Decides for every finger of a [`Hand`] whether it is raised ([`FingerStatus::Up`]) or folded
//! ([`FingerStatus::Down`]) using the geometry of its landmarks in a single frame:
//!
//! - The **thumb** is up when its tip is further out sideways than its IP joint. "Out" is to the
//!   right for a [`Handedness::Right`] hand and to the left for a [`Handedness::Left`] hand.
//! - The **other fingers** are up when tip, PIP and MCP are stacked upwards in that order, and the
//!   tip is further from the wrist (vertically) than the PIP joint.
//!
//! All comparisons are strict, so ties count as [`FingerStatus::Down`]. There is no smoothing:
//! every frame is classified on its own.

use std::fmt;

use crate::hand::{Hand, Handedness, LandmarkIdx};

/// The five fingers of a hand, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    /// All fingers, thumb first.
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Finger::Thumb => "Thumb",
            Finger::Index => "Index",
            Finger::Middle => "Middle",
            Finger::Ring => "Ring",
            Finger::Pinky => "Pinky",
        }
    }

    /// Returns the (tip, PIP, MCP) landmarks of a non-thumb finger.
    ///
    /// The thumb has no PIP joint and is classified by [`thumb_status`] instead, so this returns
    /// [`None`] for [`Finger::Thumb`].
    pub fn joints(self) -> Option<[LandmarkIdx; 3]> {
        use LandmarkIdx::*;
        match self {
            Finger::Thumb => None,
            Finger::Index => Some([IndexFingerTip, IndexFingerPip, IndexFingerMcp]),
            Finger::Middle => Some([MiddleFingerTip, MiddleFingerPip, MiddleFingerMcp]),
            Finger::Ring => Some([RingFingerTip, RingFingerPip, RingFingerMcp]),
            Finger::Pinky => Some([PinkyTip, PinkyPip, PinkyMcp]),
        }
    }
}

impl fmt::Display for Finger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether a finger is raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FingerStatus {
    Up,
    Down,
}

impl FingerStatus {
    fn from_bool(up: bool) -> Self {
        if up {
            Self::Up
        } else {
            Self::Down
        }
    }

    #[inline]
    pub fn is_up(self) -> bool {
        self == Self::Up
    }
}

impl fmt::Display for FingerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Up => "UP",
            Self::Down => "DOWN",
        })
    }
}

/// The status of one finger, displayed as the overlay label (eg. `Index: UP`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerState {
    pub finger: Finger,
    pub status: FingerStatus,
}

impl fmt::Display for FingerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.finger, self.status)
    }
}

/// The statuses of all five fingers of one hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerStates {
    // Indexed by `Finger as usize`.
    statuses: [FingerStatus; 5],
}

impl FingerStates {
    #[inline]
    pub fn get(&self, finger: Finger) -> FingerStatus {
        self.statuses[finger as usize]
    }

    /// Iterates over all fingers in [`Finger::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = FingerState> + '_ {
        Finger::ALL.into_iter().map(|finger| FingerState {
            finger,
            status: self.get(finger),
        })
    }

    /// Returns how many fingers are raised.
    pub fn count_up(&self) -> usize {
        self.statuses.iter().filter(|status| status.is_up()).count()
    }
}

impl fmt::Display for FingerStates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, state) in self.iter().enumerate() {
            if i != 0 {
                f.write_str(", ")?;
            }
            write!(f, "{state}")?;
        }
        Ok(())
    }
}

/// Classifies all five fingers of `hand`.
pub fn classify(hand: &Hand) -> FingerStates {
    FingerStates {
        statuses: Finger::ALL.map(|finger| finger_status(hand, finger)),
    }
}

/// Classifies a single finger of `hand`.
pub fn finger_status(hand: &Hand, finger: Finger) -> FingerStatus {
    let Some([tip, pip, mcp]) = finger.joints() else {
        return thumb_status(hand);
    };

    let tip = hand.landmark(tip).y();
    let pip = hand.landmark(pip).y();
    let mcp = hand.landmark(mcp).y();
    let wrist = hand.landmark(LandmarkIdx::Wrist).y();

    // Y grows downwards, so "above" means smaller.
    let stacked = tip < pip && pip < mcp;
    let extended = (tip - wrist).abs() > (pip - wrist).abs();
    FingerStatus::from_bool(stacked && extended)
}

/// Classifies the thumb of `hand`.
pub fn thumb_status(hand: &Hand) -> FingerStatus {
    let tip = hand.landmark(LandmarkIdx::ThumbTip).x();
    let ip = hand.landmark(LandmarkIdx::ThumbIp).x();

    FingerStatus::from_bool(match hand.handedness() {
        Handedness::Right => tip > ip,
        Handedness::Left => tip < ip,
    })
}
