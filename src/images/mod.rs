use std::sync::Arc;

use image::{DynamicImage, GenericImageView};
use parking_lot::Mutex;

/// Width and height in device pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Size bounds a widget is laid out within.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Constraints {
    pub min: Dimensions,
    pub max: Dimensions,
}

/// The part of a window toolkit the image cell draws through.
pub trait RenderContext {
    fn constraints(&self) -> Constraints;

    /// Paints `image` scaled to `size`.
    fn paint_image(&mut self, image: &DynamicImage, size: Dimensions);
}

/// Largest size with the image's aspect ratio that fits in `max`.
pub fn fit_contain(image: Dimensions, max: Dimensions) -> Dimensions {
    if image.width == 0 || image.height == 0 {
        return Dimensions::default();
    }

    let scale_x = max.width as f64 / image.width as f64;
    let scale_y = max.height as f64 / image.height as f64;
    let scale = scale_x.min(scale_y);

    Dimensions {
        width: (image.width as f64 * scale) as u32,
        height: (image.height as f64 * scale) as u32,
    }
}

#[derive(Default)]
struct PicState {
    image: Option<Arc<DynamicImage>>,
    loading: bool,
}

/// The image currently on screen plus the fetch-in-progress flag.
///
/// Written by fetch workers, read by the render loop. One lock covers both
/// fields and is never held while painting.
#[derive(Default)]
pub struct CatPic {
    state: Mutex<PicState>,
}

impl CatPic {
    pub fn new(image: Option<Arc<DynamicImage>>) -> Self {
        Self {
            state: Mutex::new(PicState {
                image,
                loading: false,
            }),
        }
    }

    pub fn get_image(&self) -> Option<Arc<DynamicImage>> {
        self.state.lock().image.clone()
    }

    pub fn set_image(&self, image: Option<Arc<DynamicImage>>) {
        self.state.lock().image = image;
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    pub fn set_loading(&self) {
        self.state.lock().loading = true;
    }

    pub fn clear_loading(&self) {
        self.state.lock().loading = false;
    }

    /// Sets the loading flag unless it is already set. Returns whether this
    /// call set it.
    pub fn try_start_loading(&self) -> bool {
        let mut state = self.state.lock();
        if state.loading {
            return false;
        }
        state.loading = true;
        true
    }

    /// Draws the current image scaled to fit the context, keeping its
    /// aspect ratio. With no image nothing is painted and the minimum size
    /// is reported.
    pub fn draw<C: RenderContext + ?Sized>(&self, ctx: &mut C) -> Dimensions {
        let constraints = ctx.constraints();
        let Some(image) = self.get_image() else {
            return constraints.min;
        };

        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return constraints.min;
        }

        let size = fit_contain(Dimensions::new(width, height), constraints.max);
        ctx.paint_image(&image, size);
        size
    }
}
