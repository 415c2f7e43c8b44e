//! Finger state detection on webcam video.
//!
//! Frames are captured from a V4L2 webcam, hands are located with the MediaPipe palm detection
//! network, 21 landmarks are estimated per hand, and every finger is classified as raised or
//! lowered by [`hand::fingers::classify`]. The result is drawn on top of the video feed.
//!
//! # Coordinates
//!
//! Landmarks handed to the classifier are normalized to the frame: X points right, Y points
//! *down*, and both lie roughly in `[0.0, 1.0]`. Everything below the [`hand`] module (detection,
//! image manipulation, drawing) works in pixel coordinates of the input image instead.
//!
//! # Environment Variables
//!
//! Runtime behavior can be configured by setting environment variables, see [`config::Config`]:
//!
//! * `FINGERSTATE_WEBCAM_NAME`: Forces the device to use for [`Webcam`]s created without an
//!   explicit device name. If unset, the first device that supports a compatible image format
//!   will be used.
//! * `FINGERSTATE_MODEL_DIR`: Directory the neural network files are stored in (`models` by
//!   default). Missing files are downloaded there once and reused afterwards.
//! * `FINGERSTATE_MODEL_URL`: Base URL to download missing model files from.
//! * `FINGERSTATE_NUM_HANDS`, `FINGERSTATE_MIN_DETECTION_CONFIDENCE`,
//!   `FINGERSTATE_MIN_PRESENCE_CONFIDENCE`: Hand landmarker options, see
//!   [`hand::HandLandmarkerOptions`].
//!
//! [`Webcam`]: webcam::Webcam

use log::LevelFilter;

pub mod config;
pub mod detection;
pub mod gui;
pub mod hand;
pub mod image;
pub mod landmark;
pub mod model;
pub mod nn;
pub mod num;
pub mod overlay;
pub mod rect;
pub mod resolution;
pub mod termination;
pub mod timer;
pub mod webcam;

#[cfg(test)]
mod test;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = LevelFilter::Debug;
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_CRATE_NAME")), log_level)
        .filter(Some("wgpu"), LevelFilter::Warn)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// The calling crate and this library will log at *debug* level, `wgpu` will log at *warn* level.
/// The `RUST_LOG` environment variable overrides these defaults.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
