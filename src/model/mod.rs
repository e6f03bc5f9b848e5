pub mod config;
pub mod document;
pub mod section;
pub mod tile;

pub use config::*;
pub use document::*;
pub use section::*;
pub use tile::*;
