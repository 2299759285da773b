pub mod image_key;
pub mod text;

pub use image_key::*;
pub use text::*;
