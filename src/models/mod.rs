pub mod cat;

pub use cat::{CatDbMetadata, CatMetadata};
