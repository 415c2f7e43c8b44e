//! V4L2 webcam capture.
//!
//! Only `VIDEO_CAPTURE` devices that deliver JPEG or Motion JPEG frames are supported, which
//! covers practically all USB webcams.

use std::cmp::Reverse;

use anyhow::bail;
use linuxvideo::{
    format::{FrameIntervals, FrameSizes, PixFormat, PixelFormat},
    stream::ReadStream,
    BufType, CapabilityFlags, Device, Fract,
};

use crate::{image::Image, resolution::Resolution, timer::Timer};

/// Whether to give up frame rate or resolution first when the camera can't deliver both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamPreference {
    /// Keep the resolution, lower the frame rate.
    #[default]
    Resolution,
    /// Keep the frame rate, lower the resolution.
    Framerate,
}

#[derive(Debug, Default, Clone, Copy)]
struct FramePrefs {
    resolution: Option<Resolution>,
    fps: Option<u32>,
    pref: ParamPreference,
}

/// Device selection and format negotiation options for [`Webcam::open`].
#[derive(Debug, Default, Clone)]
pub struct WebcamOptions {
    name: Option<String>,
    frame: FramePrefs,
}

impl WebcamOptions {
    /// Only opens the device whose card name is `name`.
    pub fn name(self, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..self
        }
    }

    /// Sets the minimum desired resolution.
    pub fn resolution(mut self, resolution: Resolution) -> Self {
        self.frame.resolution = Some(resolution);
        self
    }

    /// Sets the minimum desired frame rate.
    pub fn fps(mut self, fps: u32) -> Self {
        self.frame.fps = Some(fps);
        self
    }

    /// Sets which parameter to keep when both can't be satisfied at once.
    pub fn prefer(mut self, pref: ParamPreference) -> Self {
        self.frame.pref = pref;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameFormat {
    resolution: Resolution,
    frame_interval: Fract,
}

impl FrameFormat {
    fn fps(&self) -> f32 {
        1.0 / self.frame_interval.as_f32()
    }
}

fn list_formats(device: &Device) -> anyhow::Result<(PixelFormat, Vec<FrameFormat>)> {
    let mut pixel_format = None;
    for format in device.formats(BufType::VIDEO_CAPTURE) {
        let format = format?;
        if format.pixel_format() == PixelFormat::JPEG || format.pixel_format() == PixelFormat::MJPG {
            pixel_format = Some(format.pixel_format());
            break;
        }
    }
    let Some(pixel_format) = pixel_format else {
        bail!("no supported pixel format found");
    };

    let mut formats = Vec::new();
    let FrameSizes::Discrete(sizes) = device.frame_sizes(pixel_format)? else {
        bail!("stepwise or continuous resolutions are not supported");
    };
    for size in sizes {
        let FrameIntervals::Discrete(intervals) =
            device.frame_intervals(pixel_format, size.width(), size.height())?
        else {
            bail!("stepwise or continuous frame rates are not supported");
        };
        for interval in intervals {
            formats.push(FrameFormat {
                resolution: Resolution::new(size.width(), size.height()),
                frame_interval: *interval.fract(),
            });
        }
    }

    Ok((pixel_format, formats))
}

/// Picks the best format, dropping the less preferred constraint first if nothing matches.
fn negotiate(formats: &[FrameFormat], mut prefs: FramePrefs) -> Option<FrameFormat> {
    loop {
        if let Some(fmt) = negotiate_step(formats, prefs) {
            return Some(fmt);
        }

        log::debug!("no format matches {:?}", prefs);
        let relaxed = match prefs.pref {
            ParamPreference::Resolution => {
                prefs.fps.take().is_some() || prefs.resolution.take().is_some()
            }
            ParamPreference::Framerate => {
                prefs.resolution.take().is_some() || prefs.fps.take().is_some()
            }
        };
        if !relaxed {
            return None;
        }
        log::debug!("retrying with {:?}", prefs);
    }
}

fn negotiate_step(formats: &[FrameFormat], prefs: FramePrefs) -> Option<FrameFormat> {
    let mut eligible = formats
        .iter()
        .filter(|fmt| {
            prefs.resolution.map_or(true, |res| {
                fmt.resolution.width() >= res.width() && fmt.resolution.height() >= res.height()
            }) && prefs
                .fps
                .map_or(true, |fps| fmt.fps().round() >= fps as f32)
        })
        .copied()
        .collect::<Vec<_>>();
    match prefs.pref {
        ParamPreference::Resolution => {
            eligible.sort_by_key(|fmt| (fmt.resolution.num_pixels(), Reverse(fmt.frame_interval)))
        }
        ParamPreference::Framerate => {
            eligible.sort_by_key(|fmt| (Reverse(fmt.frame_interval), fmt.resolution.num_pixels()))
        }
    }
    eligible.last().copied()
}

/// A webcam yielding a stream of [`Image`]s.
pub struct Webcam {
    stream: ReadStream,
    width: u32,
    height: u32,
    t_dequeue: Timer,
    t_decode: Timer,
}

impl Webcam {
    /// Opens the first supported webcam found (or the one selected by [`WebcamOptions::name`]).
    ///
    /// This can block for a significant amount of time while the webcam initializes (on the order
    /// of hundreds of milliseconds).
    pub fn open(options: WebcamOptions) -> anyhow::Result<Self> {
        for res in linuxvideo::list()? {
            match res {
                Ok(dev) => match Self::open_impl(dev, &options) {
                    Ok(Some(webcam)) => return Ok(webcam),
                    Ok(None) => {}
                    Err(e) => log::debug!("{}", e),
                },
                Err(e) => log::warn!("{}", e),
            }
        }

        match &options.name {
            Some(name) => bail!("no supported webcam named '{}' found", name),
            None => bail!("no supported webcam device found"),
        }
    }

    fn open_impl(dev: Device, options: &WebcamOptions) -> anyhow::Result<Option<Self>> {
        let caps = dev.capabilities()?;
        if let Some(name) = &options.name {
            if caps.card() != name.as_str() {
                return Ok(None);
            }
        }

        let cap_flags = caps.device_capabilities();
        let path = dev.path()?;
        log::debug!(
            "device {} ({}) capabilities: {:?}",
            caps.card(),
            path.display(),
            cap_flags,
        );
        if !cap_flags.contains(CapabilityFlags::VIDEO_CAPTURE) {
            return Ok(None);
        }

        let (pixel_format, formats) = list_formats(&dev)?;
        let Some(format) = negotiate(&formats, options.frame) else {
            bail!("failed to negotiate a webcam format");
        };

        let capture = dev.video_capture(PixFormat::new(
            format.resolution.width(),
            format.resolution.height(),
            pixel_format,
        ))?;
        let actual_format = capture.format();
        let (width, height) = (actual_format.width(), actual_format.height());
        let actual_interval = capture.set_frame_interval(format.frame_interval)?;

        log::info!(
            "opened {} ({}), {}x{} @ {:.1}Hz",
            caps.card(),
            path.display(),
            width,
            height,
            1.0 / actual_interval.as_f32(),
        );

        Ok(Some(Self {
            stream: capture.into_stream()?,
            width,
            height,
            t_dequeue: Timer::new("dequeue"),
            t_decode: Timer::new("decode"),
        }))
    }

    /// Reads the next frame from the camera, blocking until one is available.
    ///
    /// Frames that fail to decode are logged and replaced by a blank frame.
    pub fn read(&mut self) -> anyhow::Result<Image> {
        let dequeue_guard = self.t_dequeue.start();
        let (width, height) = (self.width, self.height);
        let t_decode = &self.t_decode;
        self.stream
            .dequeue(|buf| {
                drop(dequeue_guard);
                let image = match t_decode.time(|| Image::decode_jpeg(&buf)) {
                    Ok(image) => image,
                    Err(e) => {
                        // USB webcams occasionally deliver corrupted MJPG frames. Skipping them
                        // would cause latency spikes, a blank frame just yields no hands.
                        log::error!("webcam decode error: {}", e);
                        Image::new(width, height)
                    }
                };
                Ok(image)
            })
            .map_err(Into::into)
    }

    /// Returns profiling timers for webcam access and decoding.
    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        [&self.t_dequeue, &self.t_decode].into_iter()
    }
}
