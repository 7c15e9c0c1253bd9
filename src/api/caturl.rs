//! Request URL builder for the cat image service.
//!
//! A [`CatUrl`] describes one request: an optional cat id or tag, an optional
//! text overlay, query parameters in insertion order and an output format.
//! Every `with_*` call returns a new descriptor and leaves the receiver
//! untouched. Arguments that fail a precondition (out of range channel value,
//! malformed colour, option gated behind a filter or overlay that is not set)
//! return an unchanged copy instead of an error, so chains never need error
//! handling. Composite problems surface in [`CatUrl::generate`].
//!
//! Valid shapes:
//!
//! ```text
//! https://cataas.com/cat[/{id}|/{tag}][/says/{text}][?{params}][&json=true|&html=true]
//! ```

use std::fmt;

use lazy_static::lazy_static;
use log::debug;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use reqwest::Url;

use crate::api::error::{GenerateError, ParseError};
use crate::api::tags::TagRegistry;
use crate::api::types::{Font, ImageFilter, ImageFit, ImagePosition, ImageType, WireToken};

pub const CAAS_BASE_URL: &str = "https://cataas.com/cat";

const CAAS_SCHEME: &str = "https";
const CAAS_HOST: &str = "cataas.com";
const CAAS_CAT_SEGMENT: &str = "cat";
const CAAS_SAYS_SEGMENT: &str = "says";
const CAAS_QUERY_START: char = '?';
const CAAS_QUERY_AND: char = '&';
const CAAS_PATH_SEPARATOR: char = '/';
const CAAS_RETURN_JSON: &str = "json=true";
const CAAS_RETURN_HTML: &str = "html=true";
const CAAS_CUSTOM_FILTER: &str = "filter=custom";

const KEY_TYPE: &str = "type";
const KEY_FILTER: &str = "filter";
const KEY_FIT: &str = "fit";
const KEY_POSITION: &str = "position";
const KEY_WIDTH: &str = "width";
const KEY_HEIGHT: &str = "height";
const KEY_BLUR: &str = "blur";

const KEY_RED: &str = "r";
const KEY_GREEN: &str = "g";
const KEY_BLUE: &str = "b";
const KEY_BRIGHTNESS: &str = "brightness";
const KEY_SATURATION: &str = "saturation";
const KEY_HUE: &str = "hue";
const KEY_LIGHTNESS: &str = "lightness";

const KEY_FONT: &str = "font";
const KEY_FONT_SIZE: &str = "fontSize";
const KEY_FONT_COLOR: &str = "fontColor";
const KEY_FONT_BACKGROUND: &str = "fontBackground";

// Path segment escaping: everything but unreserved characters and the
// sub-delimiters that are legal inside a segment.
const SEGMENT_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b':')
    .remove(b'=')
    .remove(b'@');

const COLOR_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'%');

lazy_static! {
    static ref HEX_COLOR: Regex =
        Regex::new(r"^#(?:[0-9A-Fa-f]{3,4}|[0-9A-Fa-f]{6}|[0-9A-Fa-f]{8})$").unwrap();
}

fn valid_rgb_value(value: i32) -> bool {
    (0..=255).contains(&value)
}

fn valid_hex_color(value: &str) -> bool {
    HEX_COLOR.is_match(value)
}

#[derive(Debug, Clone)]
pub struct CatUrl {
    base_url: &'static str,
    cat_id: Option<String>,
    tag: Option<String>,
    says: Option<String>,
    custom_filter: bool,
    params: Vec<String>,
    as_json: bool,
    as_html: bool,
    tags: TagRegistry,
}

impl Default for CatUrl {
    fn default() -> Self {
        Self::new()
    }
}

impl CatUrl {
    /// A bare descriptor with an empty tag registry.
    pub fn new() -> Self {
        Self::with_registry(TagRegistry::new())
    }

    /// A bare descriptor validating tags against `tags`.
    pub fn with_registry(tags: TagRegistry) -> Self {
        Self {
            base_url: CAAS_BASE_URL,
            cat_id: None,
            tag: None,
            says: None,
            custom_filter: false,
            params: Vec::new(),
            as_json: false,
            as_html: false,
            tags,
        }
    }

    /// The cat id in its path-escaped form.
    pub fn id(&self) -> Option<&str> {
        self.cat_id.as_deref()
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn has_says(&self) -> bool {
        self.says.is_some()
    }

    /// The overlay text in its path-escaped form.
    pub fn says_text(&self) -> Option<&str> {
        self.says.as_deref()
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn is_custom_filter(&self) -> bool {
        self.custom_filter
    }

    pub fn is_json(&self) -> bool {
        self.as_json
    }

    pub fn is_html(&self) -> bool {
        self.as_html
    }

    pub fn registry(&self) -> &TagRegistry {
        &self.tags
    }

    fn with_param(&self, key: &str, value: &str) -> Self {
        let mut next = self.clone();
        next.params.push(format!("{}={}", key, value));
        next
    }

    fn with_token<T: WireToken>(&self, key: &str, token: T) -> Self {
        match token.wire() {
            Some(wire) => self.with_param(key, wire),
            None => self.clone(),
        }
    }

    /// Sets the cat id, path-escaping it. An empty id is ignored.
    pub fn with_id(&self, id: &str) -> Self {
        if id.is_empty() {
            return self.clone();
        }
        let mut next = self.clone();
        next.cat_id = Some(utf8_percent_encode(id, SEGMENT_ESCAPE).to_string());
        next
    }

    /// Sets the tag. Membership in the registry is checked by
    /// [`generate`](Self::generate), so a tag published later still works.
    /// An empty tag is ignored.
    pub fn with_tag(&self, tag: &str) -> Self {
        if tag.is_empty() {
            return self.clone();
        }
        let mut next = self.clone();
        next.tag = Some(tag.to_string());
        next
    }

    /// Sets the overlay text, path-escaping it.
    pub fn with_says(&self, text: &str) -> Self {
        let mut next = self.clone();
        next.says = Some(utf8_percent_encode(text, SEGMENT_ESCAPE).to_string());
        next
    }

    pub fn with_image_type(&self, image_type: ImageType) -> Self {
        self.with_token(KEY_TYPE, image_type)
    }

    /// Appends a filter. `ImageFilter::Custom` also unlocks the colour
    /// channel options for the rest of the chain.
    pub fn with_image_filter(&self, filter: ImageFilter) -> Self {
        let Some(wire) = filter.wire() else {
            return self.clone();
        };
        let mut next = self.with_param(KEY_FILTER, wire);
        if filter == ImageFilter::Custom {
            next.custom_filter = true;
        }
        next
    }

    pub fn with_image_fit(&self, fit: ImageFit) -> Self {
        self.with_token(KEY_FIT, fit)
    }

    pub fn with_image_position(&self, position: ImagePosition) -> Self {
        self.with_token(KEY_POSITION, position)
    }

    pub fn with_width(&self, width: u32) -> Self {
        self.with_param(KEY_WIDTH, &width.to_string())
    }

    pub fn with_height(&self, height: u32) -> Self {
        self.with_param(KEY_HEIGHT, &height.to_string())
    }

    pub fn with_blur(&self, blur: u32) -> Self {
        self.with_param(KEY_BLUR, &blur.to_string())
    }

    pub fn with_filter_r(&self, r: i32) -> Self {
        self.with_channel(KEY_RED, r)
    }

    pub fn with_filter_g(&self, g: i32) -> Self {
        self.with_channel(KEY_GREEN, g)
    }

    pub fn with_filter_b(&self, b: i32) -> Self {
        self.with_channel(KEY_BLUE, b)
    }

    fn with_channel(&self, key: &str, value: i32) -> Self {
        if !valid_rgb_value(value) {
            return self.clone();
        }
        self.with_param(key, &value.to_string())
    }

    /// Appends `r`, `g` and `b` together. Requires the custom filter and all
    /// three values in range, otherwise nothing is appended.
    pub fn with_filter_rgb(&self, r: i32, g: i32, b: i32) -> Self {
        if !self.custom_filter || ![r, g, b].into_iter().all(valid_rgb_value) {
            return self.clone();
        }
        self.with_param(KEY_RED, &r.to_string())
            .with_param(KEY_GREEN, &g.to_string())
            .with_param(KEY_BLUE, &b.to_string())
    }

    fn with_custom(&self, key: &str, value: i32) -> Self {
        if !self.custom_filter {
            return self.clone();
        }
        self.with_param(key, &value.to_string())
    }

    pub fn with_brightness(&self, brightness: i32) -> Self {
        self.with_custom(KEY_BRIGHTNESS, brightness)
    }

    pub fn with_saturation(&self, saturation: i32) -> Self {
        self.with_custom(KEY_SATURATION, saturation)
    }

    pub fn with_hue(&self, hue: i32) -> Self {
        self.with_custom(KEY_HUE, hue)
    }

    pub fn with_lightness(&self, lightness: i32) -> Self {
        self.with_custom(KEY_LIGHTNESS, lightness)
    }

    pub fn with_font(&self, font: Font) -> Self {
        if self.says.is_none() {
            return self.clone();
        }
        self.with_token(KEY_FONT, font)
    }

    pub fn with_font_size(&self, size: u32) -> Self {
        if self.says.is_none() {
            return self.clone();
        }
        self.with_param(KEY_FONT_SIZE, &size.to_string())
    }

    /// Sets the overlay text colour, `#RGB`, `#RGBA`, `#RRGGBB` or `#RRGGBBAA`.
    pub fn with_font_color(&self, hex_color: &str) -> Self {
        self.with_color(KEY_FONT_COLOR, hex_color)
    }

    pub fn with_font_background(&self, hex_color: &str) -> Self {
        self.with_color(KEY_FONT_BACKGROUND, hex_color)
    }

    // `#` would start a fragment, so it travels as %23.
    fn with_color(&self, key: &str, hex_color: &str) -> Self {
        if self.says.is_none() || !valid_hex_color(hex_color) {
            return self.clone();
        }
        let wire = utf8_percent_encode(hex_color, COLOR_ESCAPE).to_string();
        self.with_param(key, &wire)
    }

    pub fn as_json(&self) -> Self {
        let mut next = self.clone();
        next.as_json = true;
        next
    }

    pub fn as_html(&self) -> Self {
        let mut next = self.clone();
        next.as_html = true;
        next
    }

    /// Serializes the descriptor into a request URL.
    ///
    /// An output flag with no other params renders as `?&json=true`; the
    /// service accepts the empty leading pair.
    pub fn generate(&self) -> Result<String, GenerateError> {
        if self.cat_id.is_some() && self.tag.is_some() {
            return Err(GenerateError::IdAndTag);
        }
        if matches!(self.says.as_deref(), Some("")) {
            return Err(GenerateError::SaysNoText);
        }
        if let Some(tag) = &self.tag {
            if !self.tags.contains(tag) {
                return Err(GenerateError::InvalidTag);
            }
        }
        if self.as_json && self.as_html {
            return Err(GenerateError::HtmlAndJson);
        }

        let mut url = String::from(self.base_url);

        if let Some(id) = &self.cat_id {
            url.push(CAAS_PATH_SEPARATOR);
            url.push_str(id);
        } else if let Some(tag) = &self.tag {
            url.push(CAAS_PATH_SEPARATOR);
            url.extend(utf8_percent_encode(tag, SEGMENT_ESCAPE));
        }

        if let Some(text) = &self.says {
            url.push(CAAS_PATH_SEPARATOR);
            url.push_str(CAAS_SAYS_SEGMENT);
            url.push(CAAS_PATH_SEPARATOR);
            url.push_str(text);
        }

        if !self.params.is_empty() {
            url.push(CAAS_QUERY_START);
            url.push_str(&self.params.join("&"));
        } else if self.as_json || self.as_html {
            url.push(CAAS_QUERY_START);
        }

        if self.as_json {
            url.push(CAAS_QUERY_AND);
            url.push_str(CAAS_RETURN_JSON);
        }
        if self.as_html {
            url.push(CAAS_QUERY_AND);
            url.push_str(CAAS_RETURN_HTML);
        }

        debug!("Generated cat URL {}", url);
        Ok(url)
    }

    /// Rebuilds a descriptor from a URL previously produced by
    /// [`generate`](Self::generate). The first path segment is read as a tag
    /// when `tags` knows it and as a cat id otherwise.
    pub fn parse(cat_url: &str, tags: &TagRegistry) -> Result<Self, ParseError> {
        let parsed = Url::parse(cat_url).map_err(|e| ParseError::Url(e.to_string()))?;

        if parsed.scheme() != CAAS_SCHEME {
            return Err(ParseError::InvalidScheme(parsed.scheme().to_string()));
        }
        match parsed.host_str() {
            Some(CAAS_HOST) if parsed.port().is_none() => {}
            _ => {
                let host = parsed.host_str().unwrap_or_default();
                return Err(ParseError::InvalidHost(host.to_string()));
            }
        }

        // Url resolves `.` and `..` segments, which are legal overlay text.
        let path = raw_path(cat_url);
        let invalid_path = || ParseError::InvalidPath(path.to_string());

        let mut segments = path.trim_end_matches(CAAS_PATH_SEPARATOR).split(CAAS_PATH_SEPARATOR);
        if segments.next() != Some("") || segments.next() != Some(CAAS_CAT_SEGMENT) {
            return Err(invalid_path());
        }
        let extra: Vec<&str> = segments.collect();
        if extra.iter().any(|segment| segment.is_empty()) {
            return Err(invalid_path());
        }

        let mut cu = Self::with_registry(tags.clone());

        let id_or_tag = match extra.as_slice() {
            [] => None,
            [CAAS_SAYS_SEGMENT] => return Err(ParseError::SaysNoText),
            [first] => Some(*first),
            [CAAS_SAYS_SEGMENT, text] => {
                cu.says = Some(text.to_string());
                None
            }
            [_, CAAS_SAYS_SEGMENT] => return Err(ParseError::SaysNoText),
            [first, CAAS_SAYS_SEGMENT, text] => {
                cu.says = Some(text.to_string());
                Some(*first)
            }
            _ => return Err(invalid_path()),
        };

        if let Some(segment) = id_or_tag {
            let decoded = percent_decode_str(segment).decode_utf8_lossy();
            if tags.contains(&decoded) {
                cu.tag = Some(decoded.into_owned());
            } else {
                cu.cat_id = Some(segment.to_string());
            }
        }

        for pair in parsed.query().unwrap_or("").split(CAAS_QUERY_AND) {
            match pair {
                "" => {}
                CAAS_RETURN_JSON => cu.as_json = true,
                CAAS_RETURN_HTML => cu.as_html = true,
                _ => {
                    if pair == CAAS_CUSTOM_FILTER {
                        cu.custom_filter = true;
                    }
                    cu.params.push(pair.to_string());
                }
            }
        }

        Ok(cu)
    }
}

/// Path of `url` exactly as written, without dot-segment resolution.
fn raw_path(url: &str) -> &str {
    let url = url.trim();
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let rest = rest.split(|c: char| c == '?' || c == '#').next().unwrap_or_default();
    rest.find(CAAS_PATH_SEPARATOR).map_or("", |start| &rest[start..])
}

impl fmt::Display for CatUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.generate() {
            Ok(url) => f.write_str(&url),
            Err(e) => write!(f, "<{}>", e),
        }
    }
}
