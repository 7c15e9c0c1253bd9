pub mod caturl;
pub mod error;
pub mod tags;
pub mod types;

pub use caturl::CatUrl;
pub use error::{FetchError, GenerateError, ParseError};
pub use tags::TagRegistry;
pub use types::{Font, ImageFilter, ImageFit, ImagePosition, ImageType, WireToken};
