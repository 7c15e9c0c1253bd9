use thiserror::Error;

/// Combinations rejected when a [`CatUrl`](super::CatUrl) is turned into a URL.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    #[error("cannot generate url with id and tag")]
    IdAndTag,

    #[error("cannot generate a Says URL with no text")]
    SaysNoText,

    #[error("invalid tag")]
    InvalidTag,

    #[error("cannot generate as both HTML and JSON")]
    HtmlAndJson,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid URL: {0}")]
    Url(String),

    #[error("invalid URL scheme {0}")]
    InvalidScheme(String),

    #[error("invalid URL host {0}")]
    InvalidHost(String),

    #[error("invalid URL path {0}")]
    InvalidPath(String),

    #[error("cannot parse a Says URL with no text")]
    SaysNoText,
}

/// Failures surfaced by the fetch pipeline and the tag fetch.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request error: {0}")]
    Request(#[from] GenerateError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Worker error: {0}")]
    Task(String),
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Network(e) if e.is_timeout())
    }
}
