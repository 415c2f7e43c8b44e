use std::time::Duration;

use fingerstate::{
    config::Config,
    gui::{self, Key},
    hand::{detection::PalmNetwork, fingers, landmark::Landmarker, HandLandmarker},
    model::{ModelAsset, ModelStore},
    overlay,
    timer::FpsCounter,
    webcam::{Webcam, WebcamOptions},
};

const WINDOW_TITLE: &str = "Finger Detection (All 5 Fingers)";
const QUIT_KEY: char = 'q';

fn main() {
    fingerstate::init_logger!();
    gui::run(run);
}

fn run() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let store = ModelStore::new(config.model_dir());
    let palm_path = store.ensure(&ModelAsset::palm_detection(config.model_url()))?;
    let hand_path = store.ensure(&ModelAsset::hand_landmark(config.model_url()))?;
    let mut landmarker = HandLandmarker::new(
        PalmNetwork::load(palm_path)?,
        Landmarker::load(hand_path)?,
        config.hand_landmarker_options(),
    );

    let mut options = WebcamOptions::default();
    if let Some(name) = config.webcam_name() {
        options = options.name(name);
    }
    let mut webcam = Webcam::open(options)?;

    log::info!("Finger detection started (Thumb included). Press '{QUIT_KEY}' to quit.");

    let mut fps = FpsCounter::new("finger detection");
    loop {
        let mut image = match webcam.read() {
            Ok(image) => image,
            Err(e) => {
                log::info!("no more frames from webcam: {}", e);
                break;
            }
        };
        // Mirror view, like looking into a mirror.
        image.flip_horizontal_in_place();

        let hands = landmarker
            .detect(&image)?
            .into_iter()
            .map(|hand| {
                let states = fingers::classify(&hand);
                log::debug!("{} hand: {}", hand.handedness(), states);
                (hand, states)
            })
            .collect::<Vec<_>>();

        overlay::draw_frame(&mut image, &hands);
        gui::show_image(WINDOW_TITLE, &image)?;

        fps.tick_with(webcam.timers().chain(landmarker.timers()));

        match gui::wait_key(Duration::from_millis(1)) {
            Some(Key::Char(QUIT_KEY) | Key::Close) => break,
            _ => {}
        }
    }

    log::info!("Program ended.");
    Ok(())
}
