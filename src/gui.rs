//! A minimal image viewer: show frames in windows and poll for key presses.
//!
//! The windowing event loop has to own the main thread, so applications pass their code to
//! [`run`], which executes it on a secondary thread. [`show_image`] and [`wait_key`] can then be
//! called from that thread.

mod renderer;

use std::{
    collections::HashMap,
    panic::{catch_unwind, AssertUnwindSafe},
    process,
    rc::Rc,
    sync::{
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
        Mutex, OnceLock,
    },
    time::Duration,
};

use anyhow::anyhow;
use winit::{
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopBuilder, EventLoopProxy, EventLoopWindowTarget},
    window::WindowId,
};

use crate::{image::Image, resolution::Resolution, termination::Termination};

use self::renderer::{Gpu, Renderer, Window};

/// A key press (or window event treated like one) reported by [`wait_key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// A character was typed while one of the windows had focus.
    Char(char),
    /// The user asked to close a window.
    Close,
}

#[derive(Debug)]
enum Msg {
    Image {
        key: String,
        res: Resolution,
        data: Vec<u8>,
    },
}

struct Gui {
    gpu: Rc<Gpu>,
    windows: HashMap<String, Renderer>,
    win_id_to_key: HashMap<WindowId, String>,
    keys: Sender<Key>,
}

impl Gui {
    fn new(keys: Sender<Key>) -> anyhow::Result<Self> {
        Ok(Self {
            gpu: Rc::new(pollster::block_on(Gpu::open())?),
            windows: HashMap::new(),
            win_id_to_key: HashMap::new(),
            keys,
        })
    }

    fn renderer_mut(&mut self, win: WindowId) -> Option<&mut Renderer> {
        let key = self.win_id_to_key.get(&win)?;
        self.windows.get_mut(key)
    }

    fn show(
        &mut self,
        target: &EventLoopWindowTarget<Msg>,
        key: String,
        res: Resolution,
        data: &[u8],
    ) -> anyhow::Result<()> {
        if !self.windows.contains_key(&key) {
            log::debug!("creating window for image '{key}' at {res}");

            let win = Window::open(target, &key, res)?;
            let win_id = win.id();
            let renderer = Renderer::new(win, self.gpu.clone())?;
            self.win_id_to_key.insert(win_id, key.clone());
            self.windows.insert(key.clone(), renderer);
        }

        if let Some(renderer) = self.windows.get_mut(&key) {
            renderer.update_texture(res, data);
            renderer.window().request_redraw();
        }
        Ok(())
    }

    fn run(mut self, event_loop: EventLoop<Msg>) -> ! {
        event_loop.run(move |event, target, flow| {
            *flow = ControlFlow::Wait;
            match event {
                Event::UserEvent(Msg::Image { key, res, data }) => {
                    if let Err(e) = self.show(target, key, res, &data) {
                        log::error!("failed to display image: {:?}", e);
                        *flow = ControlFlow::ExitWithCode(1);
                    }
                }
                Event::WindowEvent { event, .. } => {
                    let key = match event {
                        WindowEvent::ReceivedCharacter(c) => Key::Char(c),
                        WindowEvent::CloseRequested => Key::Close,
                        _ => return,
                    };
                    // The receiver only goes away when the process is exiting anyway.
                    self.keys.send(key).ok();
                }
                Event::RedrawRequested(window) => {
                    if let Some(renderer) = self.renderer_mut(window) {
                        renderer.redraw();
                    }
                }
                _ => {}
            }
        })
    }
}

/// Handles for talking to the event loop from the application thread.
struct Display {
    proxy: Mutex<EventLoopProxy<Msg>>,
    keys: Mutex<Receiver<Key>>,
}

static DISPLAY: OnceLock<Display> = OnceLock::new();

fn send(msg: Msg) -> anyhow::Result<()> {
    let display = DISPLAY
        .get()
        .ok_or_else(|| anyhow!("GUI not initialized, call `gui::run` first"))?;
    let proxy = display
        .proxy
        .lock()
        .map_err(|_| anyhow!("GUI proxy lock poisoned"))?;
    proxy
        .send_event(msg)
        .map_err(|_closed| anyhow!("GUI event loop has exited"))
}

/// Runs `app` on a new thread while the GUI event loop runs on the calling thread.
///
/// This must be called from the main thread and never returns. Once `app` finishes, the process
/// exits: with status 0 if it succeeded, 1 if it returned an error (which is printed), and 101 if
/// it panicked.
pub fn run<F, R>(app: F) -> !
where
    F: FnOnce() -> R + Send + 'static,
    R: Termination + Send,
{
    let event_loop = EventLoopBuilder::with_user_event().build();
    let (key_tx, key_rx) = mpsc::channel();
    let display = Display {
        proxy: Mutex::new(event_loop.create_proxy()),
        keys: Mutex::new(key_rx),
    };
    if DISPLAY.set(display).is_err() {
        panic!("`gui::run` called more than once");
    }

    std::thread::spawn(move || match catch_unwind(AssertUnwindSafe(app)) {
        Ok(r) => {
            if r.is_success() {
                process::exit(0);
            } else {
                r.report(); // prints the error
                process::exit(1);
            }
        }
        Err(_payload) => {
            // The panic hook has already printed the message, exit like libstd would.
            process::exit(101);
        }
    });

    match Gui::new(key_tx) {
        Ok(gui) => gui.run(event_loop),
        Err(e) => {
            log::error!("failed to initialize GUI: {:?}", e);
            process::exit(1);
        }
    }
}

/// Displays `image` in the window titled `title`, opening it if necessary.
///
/// Returns an error if the GUI is not running.
pub fn show_image(title: impl Into<String>, image: &Image) -> anyhow::Result<()> {
    // Image data is RGBA8 internally, so it can be uploaded as-is.
    send(Msg::Image {
        key: title.into(),
        res: image.resolution(),
        data: image.data().to_vec(),
    })
}

/// Waits up to `timeout` for a key press in any window.
///
/// Returns [`None`] if no key was pressed in time.
pub fn wait_key(timeout: Duration) -> Option<Key> {
    let Some(display) = DISPLAY.get() else {
        std::thread::sleep(timeout);
        return None;
    };
    let keys = display.keys.lock().ok()?;
    match keys.recv_timeout(timeout) {
        Ok(key) => Some(key),
        Err(RecvTimeoutError::Timeout) => None,
        Err(RecvTimeoutError::Disconnected) => Some(Key::Close),
    }
}
