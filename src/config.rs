//! Runtime configuration from environment variables.

use std::{env, path::PathBuf, str::FromStr};

use anyhow::{bail, Context};

use crate::{
    hand::HandLandmarkerOptions,
    model::{DEFAULT_MODEL_DIR, DEFAULT_MODEL_URL},
};

pub const ENV_WEBCAM_NAME: &str = "FINGERSTATE_WEBCAM_NAME";
pub const ENV_MODEL_DIR: &str = "FINGERSTATE_MODEL_DIR";
pub const ENV_MODEL_URL: &str = "FINGERSTATE_MODEL_URL";
pub const ENV_NUM_HANDS: &str = "FINGERSTATE_NUM_HANDS";
pub const ENV_MIN_DETECTION_CONFIDENCE: &str = "FINGERSTATE_MIN_DETECTION_CONFIDENCE";
pub const ENV_MIN_PRESENCE_CONFIDENCE: &str = "FINGERSTATE_MIN_PRESENCE_CONFIDENCE";

/// Application settings, read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    webcam_name: Option<String>,
    model_dir: PathBuf,
    model_url: String,
    num_hands: usize,
    min_detection_confidence: f32,
    min_presence_confidence: f32,
}

impl Default for Config {
    fn default() -> Self {
        let options = HandLandmarkerOptions::default();
        Self {
            webcam_name: None,
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            model_url: DEFAULT_MODEL_URL.to_string(),
            num_hands: options.get_num_hands(),
            min_detection_confidence: options.get_min_hand_detection_confidence(),
            min_presence_confidence: options.get_min_hand_presence_confidence(),
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// Unset variables keep their default value. Unparsable or out-of-range values are errors.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps variable names to values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(name) = lookup(ENV_WEBCAM_NAME) {
            log::debug!("webcam override: `{}` is set to '{}'", ENV_WEBCAM_NAME, name);
            config.webcam_name = Some(name);
        }
        if let Some(dir) = lookup(ENV_MODEL_DIR) {
            config.model_dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup(ENV_MODEL_URL) {
            config.model_url = url;
        }
        if let Some(n) = parse(&lookup, ENV_NUM_HANDS)? {
            if n == 0 {
                bail!("`{}` must be at least 1", ENV_NUM_HANDS);
            }
            config.num_hands = n;
        }
        if let Some(conf) = parse_confidence(&lookup, ENV_MIN_DETECTION_CONFIDENCE)? {
            config.min_detection_confidence = conf;
        }
        if let Some(conf) = parse_confidence(&lookup, ENV_MIN_PRESENCE_CONFIDENCE)? {
            config.min_presence_confidence = conf;
        }

        Ok(config)
    }

    /// Name of the capture device to use, if one is forced.
    pub fn webcam_name(&self) -> Option<&str> {
        self.webcam_name.as_deref()
    }

    pub fn model_dir(&self) -> &PathBuf {
        &self.model_dir
    }

    pub fn model_url(&self) -> &str {
        &self.model_url
    }

    pub fn hand_landmarker_options(&self) -> HandLandmarkerOptions {
        HandLandmarkerOptions::default()
            .num_hands(self.num_hands)
            .min_hand_detection_confidence(self.min_detection_confidence)
            .min_hand_presence_confidence(self.min_presence_confidence)
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .with_context(|| format!("invalid value '{value}' for `{key}`"))
        })
        .transpose()
}

fn parse_confidence(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> anyhow::Result<Option<f32>> {
    let conf = parse::<f32>(lookup, key)?;
    match conf {
        Some(c) if !(0.0..=1.0).contains(&c) => {
            bail!("`{}` must be between 0.0 and 1.0, got {}", key, c)
        }
        _ => Ok(conf),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.webcam_name(), None);
        assert_eq!(config.model_dir(), &PathBuf::from("models"));
        assert_eq!(config.model_url(), DEFAULT_MODEL_URL);
        assert_eq!(
            config.hand_landmarker_options(),
            HandLandmarkerOptions::default()
        );
    }

    #[test]
    fn overrides() {
        let config = config(&[
            (ENV_WEBCAM_NAME, "HD Webcam"),
            (ENV_MODEL_DIR, "/tmp/models"),
            (ENV_MODEL_URL, "http://localhost:8000"),
            (ENV_NUM_HANDS, "2"),
            (ENV_MIN_DETECTION_CONFIDENCE, " 0.5 "),
            (ENV_MIN_PRESENCE_CONFIDENCE, "1"),
        ])
        .unwrap();
        assert_eq!(config.webcam_name(), Some("HD Webcam"));
        assert_eq!(config.model_dir(), &PathBuf::from("/tmp/models"));
        assert_eq!(config.model_url(), "http://localhost:8000");

        let opts = config.hand_landmarker_options();
        assert_eq!(opts.get_num_hands(), 2);
        assert_eq!(opts.get_min_hand_detection_confidence(), 0.5);
        assert_eq!(opts.get_min_hand_presence_confidence(), 1.0);
    }

    #[test]
    fn invalid_values() {
        assert!(config(&[(ENV_NUM_HANDS, "0")]).is_err());
        assert!(config(&[(ENV_NUM_HANDS, "-1")]).is_err());
        assert!(config(&[(ENV_NUM_HANDS, "two")]).is_err());
        assert!(config(&[(ENV_MIN_DETECTION_CONFIDENCE, "1.5")]).is_err());
        assert!(config(&[(ENV_MIN_PRESENCE_CONFIDENCE, "-0.1")]).is_err());
        assert!(config(&[(ENV_MIN_PRESENCE_CONFIDENCE, "NaN")]).is_err());
    }
}
