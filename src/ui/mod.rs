//! Terminal stand-in for the cat window.
//!
//! Each line on stdin is a button press: an empty line or `f` fetches a cat,
//! `q` closes the window. Frames are "painted" by logging the fitted image
//! size.

use std::future::Future;
use std::sync::Arc;

use image::DynamicImage;
use log::{error, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;

use crate::api::FetchError;
use crate::client::{CatClient, FetchedCat};
use crate::config::AppConfig;
use crate::images::{CatPic, Constraints, Dimensions, RenderContext};

pub const FETCH_BUTTON_LABEL: &str = "Fetch a Cat";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    Click,
    Invalidate,
    Close,
}

pub fn parse_command(line: &str) -> Option<UiEvent> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" | "f" | "fetch" => Some(UiEvent::Click),
        "q" | "quit" | "exit" | "close" => Some(UiEvent::Close),
        _ => None,
    }
}

/// Render target that records what would be painted.
#[derive(Debug, Default)]
pub struct ConsoleCanvas {
    constraints: Constraints,
    last_painted: Option<Dimensions>,
}

impl ConsoleCanvas {
    pub fn new(max: Dimensions) -> Self {
        Self {
            constraints: Constraints {
                min: Dimensions::default(),
                max,
            },
            last_painted: None,
        }
    }

    pub fn last_painted(&self) -> Option<Dimensions> {
        self.last_painted
    }
}

impl RenderContext for ConsoleCanvas {
    fn constraints(&self) -> Constraints {
        self.constraints
    }

    fn paint_image(&mut self, _image: &DynamicImage, size: Dimensions) {
        self.last_painted = Some(size);
    }
}

/// Starts a fetch unless one is already running.
///
/// On success the fetched image replaces the current one; on failure the
/// error is logged and the image is left alone. Either way the loading flag
/// is cleared and a redraw is requested.
pub fn spawn_fetch<F>(
    pic: &Arc<CatPic>,
    events: &UnboundedSender<UiEvent>,
    fetch: F,
) -> Option<JoinHandle<()>>
where
    F: Future<Output = Result<FetchedCat, FetchError>> + Send + 'static,
{
    if !pic.try_start_loading() {
        info!("A cat is already on its way");
        return None;
    }

    let pic = Arc::clone(pic);
    let events = events.clone();
    Some(tokio::spawn(async move {
        match fetch.await {
            Ok(cat) => {
                info!("Showing cat {}", cat.metadata.id);
                pic.set_image(Some(Arc::new(cat.image)));
            }
            Err(e) => error!("Failed to fetch cat: {}", e),
        }
        pic.clear_loading();
        // The receiver is gone once the window has closed.
        let _ = events.send(UiEvent::Invalidate);
    }))
}

pub struct Window {
    title: String,
    canvas: ConsoleCanvas,
    pic: Arc<CatPic>,
}

impl Window {
    pub fn new(config: &AppConfig, pic: Arc<CatPic>) -> Self {
        Self {
            title: config.window_title.clone(),
            canvas: ConsoleCanvas::new(Dimensions::new(config.window_width, config.window_height)),
            pic,
        }
    }

    pub fn render(&mut self) -> Dimensions {
        let dims = self.pic.draw(&mut self.canvas);
        if self.pic.is_loading() {
            info!("[{}] loading... ({}x{})", self.title, dims.width, dims.height);
        } else {
            info!(
                "[{}] [{}] image {}x{}",
                self.title, FETCH_BUTTON_LABEL, dims.width, dims.height
            );
        }
        dims
    }
}

/// Runs the event loop until the window is closed or stdin ends.
pub async fn run(config: &AppConfig, client: Arc<CatClient>, pic: Arc<CatPic>) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut window = Window::new(config, Arc::clone(&pic));

    let input_tx = tx.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match parse_command(&line) {
                    Some(event) => {
                        if input_tx.send(event).is_err() {
                            break;
                        }
                    }
                    None => warn!("Unknown command {:?}", line.trim()),
                },
                Ok(None) => {
                    let _ = input_tx.send(UiEvent::Close);
                    break;
                }
                Err(e) => {
                    error!("Failed to read input: {}", e);
                    let _ = input_tx.send(UiEvent::Close);
                    break;
                }
            }
        }
    });

    info!(
        "{} ready: press Enter to {}, type q to quit",
        config.window_title,
        FETCH_BUTTON_LABEL.to_lowercase()
    );
    window.render();

    while let Some(event) = rx.recv().await {
        match event {
            UiEvent::Click => {
                let client = Arc::clone(&client);
                if spawn_fetch(&pic, &tx, async move { client.request_random_cat().await }).is_some() {
                    window.render();
                }
            }
            UiEvent::Invalidate => {
                window.render();
            }
            UiEvent::Close => {
                info!("Closing {}", config.window_title);
                break;
            }
        }
    }
}
