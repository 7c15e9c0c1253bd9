use std::collections::HashMap;
use std::hash::Hash;

use lazy_static::lazy_static;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

// Tokens with spaces go out as %20, everything else is literal.
const TOKEN_ESCAPE: &AsciiSet = &CONTROLS.add(b' ');

fn escape_token(token: &str) -> String {
    utf8_percent_encode(token, TOKEN_ESCAPE).to_string()
}

fn build_table<T: Copy + Eq + Hash>(entries: &[(T, &str)]) -> HashMap<T, String> {
    entries
        .iter()
        .map(|(variant, token)| (*variant, escape_token(token)))
        .collect()
}

/// A closed set of option tokens understood by the image service.
///
/// The wire form of every variant is computed once, the first time its table
/// is touched.
pub trait WireToken: Copy + Eq + Hash + 'static {
    fn table() -> &'static HashMap<Self, String>;

    /// Wire form of the token, `None` when the variant has no table entry.
    fn wire(self) -> Option<&'static str> {
        Self::table().get(&self).map(String::as_str)
    }

    /// Looks a token up by its wire form or by its unescaped display form.
    fn from_wire(token: &str) -> Option<Self> {
        let escaped = escape_token(token);
        Self::table()
            .iter()
            .find(|(_, wire)| wire.as_str() == token || **wire == escaped)
            .map(|(variant, _)| *variant)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageType {
    Square,
    Medium,
    Small,
    XSmall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFilter {
    Mono,
    Negate,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFit {
    Cover,
    Contain,
    Fill,
    Inside,
    Outside,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImagePosition {
    Center,
    Top,
    RightTop,
    Right,
    RightBottom,
    Bottom,
    LeftBottom,
    Left,
    LeftTop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Font {
    Impact,
    Andale,
    Mono,
    Arial,
    ArialBlack,
    ComicSansMs,
    CourierNew,
    Georgia,
    TimesNewRoman,
    Verdana,
    Webdings,
}

lazy_static! {
    static ref IMAGE_TYPES: HashMap<ImageType, String> = build_table(&[
        (ImageType::Square, "square"),
        (ImageType::Medium, "medium"),
        (ImageType::Small, "small"),
        (ImageType::XSmall, "xsmall"),
    ]);
    static ref IMAGE_FILTERS: HashMap<ImageFilter, String> = build_table(&[
        (ImageFilter::Mono, "mono"),
        (ImageFilter::Negate, "negate"),
        (ImageFilter::Custom, "custom"),
    ]);
    static ref IMAGE_FITS: HashMap<ImageFit, String> = build_table(&[
        (ImageFit::Cover, "cover"),
        (ImageFit::Contain, "contain"),
        (ImageFit::Fill, "fill"),
        (ImageFit::Inside, "inside"),
        (ImageFit::Outside, "outside"),
    ]);
    static ref IMAGE_POSITIONS: HashMap<ImagePosition, String> = build_table(&[
        (ImagePosition::Center, "center"),
        (ImagePosition::Top, "top"),
        (ImagePosition::RightTop, "right top"),
        (ImagePosition::Right, "right"),
        (ImagePosition::RightBottom, "right bottom"),
        (ImagePosition::Bottom, "bottom"),
        (ImagePosition::LeftBottom, "left bottom"),
        (ImagePosition::Left, "left"),
        (ImagePosition::LeftTop, "left top"),
    ]);
    static ref FONTS: HashMap<Font, String> = build_table(&[
        (Font::Impact, "Impact"),
        (Font::Andale, "Andale"),
        (Font::Mono, "Mono"),
        (Font::Arial, "Arial"),
        (Font::ArialBlack, "Arial Black"),
        (Font::ComicSansMs, "Comic Sans MS"),
        (Font::CourierNew, "Courier New"),
        (Font::Georgia, "Georgia"),
        (Font::TimesNewRoman, "Times New Roman"),
        (Font::Verdana, "Verdana"),
        (Font::Webdings, "Webdings"),
    ]);
}

impl WireToken for ImageType {
    fn table() -> &'static HashMap<Self, String> {
        &IMAGE_TYPES
    }
}

impl WireToken for ImageFilter {
    fn table() -> &'static HashMap<Self, String> {
        &IMAGE_FILTERS
    }
}

impl WireToken for ImageFit {
    fn table() -> &'static HashMap<Self, String> {
        &IMAGE_FITS
    }
}

impl WireToken for ImagePosition {
    fn table() -> &'static HashMap<Self, String> {
        &IMAGE_POSITIONS
    }
}

impl WireToken for Font {
    fn table() -> &'static HashMap<Self, String> {
        &FONTS
    }
}
